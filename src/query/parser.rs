//! Query parser for converting query strings to [`Query`] trees.
//!
//! Supported syntax:
//! - Terms separated by whitespace, combined with an implicit AND: `pizza reno`
//! - Explicit operators: `pizza AND reno`, `pizza OR tacos`, `pizza NOT hut`
//! - Required and excluded clauses: `+pizza -hut`
//! - Grouping: `(pizza OR tacos) reno`
//! - Field targets: `city:reno`, `name:"pizza hut"`, `city:(reno OR tempe)`
//! - Phrases on the default fields: `"pizza hut"`
//! - `*` alone matches every live document
//!
//! Text for a Text field runs through that field's analyzer, exactly as at
//! index time: one token becomes a term, several become a phrase and none
//! (only stop words) become [`Query::Empty`], which is dropped. Text for the
//! other field types is coerced to the field type and matched on its
//! canonical term.

use std::sync::Arc;

use crate::analysis::PerFieldAnalyzer;
use crate::config::DEFAULT_TIMESTAMP_FORMAT;
use crate::document::FieldValue;
use crate::error::{PlacedexError, Result};
use crate::query::query::Query;
use crate::schema::{FieldType, Schema};

/// Parses query strings against one schema.
#[derive(Debug, Clone)]
pub struct QueryParser {
    schema: Arc<Schema>,
    analyzers: Arc<PerFieldAnalyzer>,
    /// Fields searched by clauses without a `field:` prefix.
    default_fields: Vec<String>,
    timestamp_format: String,
}

impl QueryParser {
    /// A parser whose default fields are all Text fields of the schema.
    pub fn new(schema: Arc<Schema>, analyzers: Arc<PerFieldAnalyzer>) -> Self {
        let default_fields = schema.text_fields().map(|f| f.name.clone()).collect();
        QueryParser {
            schema,
            analyzers,
            default_fields,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }

    pub fn with_default_field<S: Into<String>>(mut self, field: S) -> Self {
        self.default_fields = vec![field.into()];
        self
    }

    pub fn with_default_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timestamp_format<S: Into<String>>(mut self, format: S) -> Self {
        self.timestamp_format = format.into();
        self
    }

    pub fn default_fields(&self) -> &[String] {
        &self.default_fields
    }

    /// Parse against the default fields.
    pub fn parse(&self, query_str: &str) -> Result<Query> {
        let fields: Vec<&str> = self.default_fields.iter().map(String::as_str).collect();
        self.parse_fields(&fields, query_str)
    }

    /// Parse with `field` as the only default field.
    pub fn parse_field(&self, field: &str, query_str: &str) -> Result<Query> {
        self.parse_fields(&[field], query_str)
    }

    /// Parse once per listed field and OR the results, so a document matches
    /// when it matches in any of them.
    pub fn parse_fields(&self, fields: &[&str], query_str: &str) -> Result<Query> {
        if let Some(unknown) = fields.iter().find(|f| !self.schema.has_field(f)) {
            return Err(PlacedexError::invalid_argument(format!(
                "Unknown field '{unknown}'"
            )));
        }

        let tokens = lex(query_str)?;
        let node = QueryStringParser::new(&tokens, query_str.len(), &self.schema).parse()?;

        if !node.has_default_leaves() {
            return self.lower(&node, None);
        }
        match fields {
            [] => self.lower(&node, None),
            [field] => self.lower(&node, Some(*field)),
            _ => {
                let per_field = fields
                    .iter()
                    .map(|field| self.lower(&node, Some(*field)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Query::or(per_field))
            }
        }
    }

    fn lower(&self, node: &Node, default_field: Option<&str>) -> Result<Query> {
        match node {
            Node::All => Ok(Query::All),
            Node::Text {
                field,
                text,
                position,
            } => {
                let field = match (field.as_deref(), default_field) {
                    (Some(field), _) | (None, Some(field)) => field,
                    (None, None) => {
                        return Err(PlacedexError::query_syntax(
                            "no field to search: add a field prefix",
                            *position,
                        ));
                    }
                };
                self.lower_text(field, text, *position)
            }
            Node::And(clauses) => {
                let mut must = Vec::new();
                let mut must_not = Vec::new();
                for clause in clauses {
                    let query = self.lower(&clause.node, default_field)?;
                    if clause.negated {
                        must_not.push(query);
                    } else {
                        must.push(query);
                    }
                }
                Ok(Query::and_not(must, must_not))
            }
            Node::Or(nodes) => {
                let should = nodes
                    .iter()
                    .map(|node| self.lower(node, default_field))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Query::or(should))
            }
        }
    }

    fn lower_text(&self, field: &str, text: &str, position: usize) -> Result<Query> {
        let descriptor = self
            .schema
            .field(field)
            .ok_or_else(|| PlacedexError::query_syntax(format!("unknown field '{field}'"), position))?;

        if descriptor.field_type == FieldType::Text {
            let tokens: Vec<(usize, String)> = self
                .analyzers
                .analyze_field(field, text)?
                .map(|token| (token.position, token.text))
                .collect();
            return Ok(match tokens.as_slice() {
                [] => Query::Empty,
                [(_, term)] => Query::term(field, term.clone()),
                [(first, _), ..] => Query::Phrase {
                    field: field.to_string(),
                    terms: tokens
                        .iter()
                        .map(|(pos, term)| ((pos - first) as u32, term.clone()))
                        .collect(),
                },
            });
        }

        let value = FieldValue::from(text)
            .coerce(descriptor, &self.timestamp_format)
            .map_err(|e| {
                PlacedexError::query_syntax(
                    format!("invalid {} literal '{text}': {e}", descriptor.field_type),
                    position,
                )
            })?;
        let terms = value.index_terms(&self.timestamp_format);
        Ok(Query::and(
            terms.into_iter().map(|term| Query::term(field, term)),
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Word(String),
    Quoted(String),
    Field(String),
    And,
    Or,
    Not,
    Plus,
    Minus,
    Star,
    LParen,
    RParen,
}

#[derive(Debug, Clone)]
struct Lexeme {
    kind: TokenKind,
    position: usize,
}

fn is_boundary(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '"')
}

fn lex(input: &str) -> Result<Vec<Lexeme>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' | ')' => {
                chars.next();
                let kind = if c == '(' {
                    TokenKind::LParen
                } else {
                    TokenKind::RParen
                };
                tokens.push(Lexeme {
                    kind,
                    position: start,
                });
            }
            '"' => {
                let body = start + 1;
                let Some(len) = input[body..].find('"') else {
                    return Err(PlacedexError::query_syntax("unbalanced quote", start));
                };
                tokens.push(Lexeme {
                    kind: TokenKind::Quoted(input[body..body + len].to_string()),
                    position: start,
                });
                while chars.next_if(|&(i, _)| i <= body + len).is_some() {}
            }
            '+' | '-' => {
                chars.next();
                if chars.peek().is_none_or(|&(_, next)| next.is_whitespace() || next == ')') {
                    return Err(PlacedexError::query_syntax(
                        format!("dangling operator '{c}'"),
                        start,
                    ));
                }
                let kind = if c == '+' {
                    TokenKind::Plus
                } else {
                    TokenKind::Minus
                };
                tokens.push(Lexeme {
                    kind,
                    position: start,
                });
            }
            _ => {
                let mut end = start;
                while let Some((i, c)) = chars.next_if(|&(_, c)| !is_boundary(c)) {
                    end = i + c.len_utf8();
                }
                lex_word(input, start, end, chars.peek().map(|&(_, c)| c), &mut tokens)?;
            }
        }
    }

    Ok(tokens)
}

fn lex_word(
    input: &str,
    start: usize,
    end: usize,
    next: Option<char>,
    tokens: &mut Vec<Lexeme>,
) -> Result<()> {
    let word = &input[start..end];

    let Some((name, value)) = word.split_once(':') else {
        let kind = match word {
            "AND" => TokenKind::And,
            "OR" => TokenKind::Or,
            "NOT" => TokenKind::Not,
            "*" => TokenKind::Star,
            _ => TokenKind::Word(word.to_string()),
        };
        tokens.push(Lexeme {
            kind,
            position: start,
        });
        return Ok(());
    };

    if name.is_empty() {
        return Err(PlacedexError::query_syntax("empty field name", start));
    }
    if value.is_empty() && !matches!(next, Some('"' | '(')) {
        return Err(PlacedexError::query_syntax(
            format!("empty value after '{name}:'"),
            start,
        ));
    }

    tokens.push(Lexeme {
        kind: TokenKind::Field(name.to_string()),
        position: start,
    });
    if !value.is_empty() {
        let kind = if value == "*" {
            TokenKind::Star
        } else {
            TokenKind::Word(value.to_string())
        };
        tokens.push(Lexeme {
            kind,
            position: start + name.len() + 1,
        });
    }
    Ok(())
}

/// Parsed query before field defaults and analysis are applied.
#[derive(Debug, Clone)]
enum Node {
    Text {
        field: Option<String>,
        text: String,
        position: usize,
    },
    All,
    And(Vec<Clause>),
    Or(Vec<Node>),
}

#[derive(Debug, Clone)]
struct Clause {
    negated: bool,
    node: Node,
}

impl Node {
    fn has_default_leaves(&self) -> bool {
        match self {
            Node::Text { field, .. } => field.is_none(),
            Node::All => false,
            Node::And(clauses) => clauses.iter().any(|c| c.node.has_default_leaves()),
            Node::Or(nodes) => nodes.iter().any(Node::has_default_leaves),
        }
    }
}

/// Recursive descent over the token list.
///
/// ```text
/// query   := or_expr
/// or_expr := and_expr (OR and_expr)*
/// and_expr:= unary ([AND] unary)*
/// unary   := NOT unary | '+' primary | '-' primary | primary
/// primary := '(' or_expr ')' | FIELD (word | quoted | '*' | '(' or_expr ')')
///          | word | quoted | '*'
/// ```
struct QueryStringParser<'a> {
    tokens: &'a [Lexeme],
    cursor: usize,
    input_len: usize,
    schema: &'a Schema,
}

impl<'a> QueryStringParser<'a> {
    fn new(tokens: &'a [Lexeme], input_len: usize, schema: &'a Schema) -> Self {
        QueryStringParser {
            tokens,
            cursor: 0,
            input_len,
            schema,
        }
    }

    fn parse(&mut self) -> Result<Node> {
        if self.tokens.is_empty() {
            return Ok(Node::And(Vec::new()));
        }
        let node = self.parse_or(None)?;
        match self.peek() {
            None => Ok(node),
            Some(lexeme) => Err(PlacedexError::query_syntax(
                "unbalanced parenthesis",
                lexeme.position,
            )),
        }
    }

    fn peek(&self) -> Option<&'a Lexeme> {
        self.tokens.get(self.cursor)
    }

    fn next(&mut self) -> Option<&'a Lexeme> {
        let lexeme = self.tokens.get(self.cursor);
        if lexeme.is_some() {
            self.cursor += 1;
        }
        lexeme
    }

    /// An operator must be followed by an operand.
    fn expect_operand(&self, operator: &Lexeme, name: &str) -> Result<()> {
        match self.peek().map(|l| &l.kind) {
            None | Some(TokenKind::RParen | TokenKind::And | TokenKind::Or) => Err(
                PlacedexError::query_syntax(format!("dangling operator '{name}'"), operator.position),
            ),
            _ => Ok(()),
        }
    }

    fn parse_or(&mut self, scope: Option<&str>) -> Result<Node> {
        let mut nodes = vec![self.parse_and(scope)?];
        while let Some(lexeme) = self.peek().filter(|l| l.kind == TokenKind::Or) {
            self.cursor += 1;
            self.expect_operand(lexeme, "OR")?;
            nodes.push(self.parse_and(scope)?);
        }
        Ok(if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            Node::Or(nodes)
        })
    }

    fn parse_and(&mut self, scope: Option<&str>) -> Result<Node> {
        let mut clauses = vec![self.parse_unary(scope)?];
        loop {
            match self.peek() {
                None => break,
                Some(lexeme) => match lexeme.kind {
                    TokenKind::RParen | TokenKind::Or => break,
                    TokenKind::And => {
                        self.cursor += 1;
                        self.expect_operand(lexeme, "AND")?;
                    }
                    _ => {}
                },
            }
            clauses.push(self.parse_unary(scope)?);
        }
        Ok(match clauses.as_slice() {
            [Clause {
                negated: false,
                node,
            }] => node.clone(),
            _ => Node::And(clauses),
        })
    }

    fn parse_unary(&mut self, scope: Option<&str>) -> Result<Clause> {
        let Some(lexeme) = self.peek() else {
            return Err(self.unexpected_end());
        };
        match lexeme.kind {
            TokenKind::Not => {
                self.cursor += 1;
                self.expect_operand(lexeme, "NOT")?;
                let inner = self.parse_unary(scope)?;
                Ok(Clause {
                    negated: !inner.negated,
                    node: inner.node,
                })
            }
            TokenKind::Plus | TokenKind::Minus => {
                self.cursor += 1;
                Ok(Clause {
                    negated: lexeme.kind == TokenKind::Minus,
                    node: self.parse_primary(scope)?,
                })
            }
            _ => Ok(Clause {
                negated: false,
                node: self.parse_primary(scope)?,
            }),
        }
    }

    fn parse_primary(&mut self, scope: Option<&str>) -> Result<Node> {
        let Some(lexeme) = self.next() else {
            return Err(self.unexpected_end());
        };
        match &lexeme.kind {
            TokenKind::LParen => self.parse_group(lexeme, scope),
            TokenKind::Field(name) => {
                if !self.schema.has_field(name) {
                    return Err(PlacedexError::query_syntax(
                        format!("unknown field '{name}'"),
                        lexeme.position,
                    ));
                }
                let Some(value) = self.next() else {
                    return Err(self.unexpected_end());
                };
                match &value.kind {
                    TokenKind::LParen => self.parse_group(value, Some(name.as_str())),
                    TokenKind::Word(text) | TokenKind::Quoted(text) => Ok(Node::Text {
                        field: Some(name.clone()),
                        text: text.clone(),
                        position: value.position,
                    }),
                    TokenKind::Star => Ok(Node::All),
                    _ => Err(PlacedexError::query_syntax(
                        format!("empty value after '{name}:'"),
                        lexeme.position,
                    )),
                }
            }
            TokenKind::Word(text) | TokenKind::Quoted(text) => Ok(Node::Text {
                field: scope.map(str::to_string),
                text: text.clone(),
                position: lexeme.position,
            }),
            TokenKind::Star => Ok(Node::All),
            TokenKind::RParen => Err(PlacedexError::query_syntax(
                "unbalanced parenthesis",
                lexeme.position,
            )),
            TokenKind::And | TokenKind::Or | TokenKind::Not | TokenKind::Plus | TokenKind::Minus => {
                Err(PlacedexError::query_syntax(
                    "dangling operator",
                    lexeme.position,
                ))
            }
        }
    }

    fn parse_group(&mut self, open: &Lexeme, scope: Option<&str>) -> Result<Node> {
        if self
            .peek()
            .is_some_and(|l| l.kind == TokenKind::RParen)
        {
            self.cursor += 1;
            return Ok(Node::And(Vec::new()));
        }
        let node = self.parse_or(scope)?;
        match self.next() {
            Some(Lexeme {
                kind: TokenKind::RParen,
                ..
            }) => Ok(node),
            _ => Err(PlacedexError::query_syntax(
                "unbalanced parenthesis",
                open.position,
            )),
        }
    }

    fn unexpected_end(&self) -> PlacedexError {
        PlacedexError::query_syntax("unexpected end of query", self.input_len)
    }
}
