//! The query tree evaluated by a [`Searcher`](crate::query::Searcher).

use std::fmt;

/// A structured query.
///
/// Leaves name a field and already-analyzed terms, so a query built by hand
/// must use the same normalized forms the index holds (`"pizza"`, not
/// `"Pizza"`, for a Text field).
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Documents containing `term` in `field`.
    Term { field: String, term: String },

    /// Documents containing the terms at the given relative positions.
    Phrase {
        field: String,
        terms: Vec<(u32, String)>,
    },

    /// Every `must` clause matches, at least one `should` clause matches when
    /// there are no `must` clauses, and no `must_not` clause matches.
    Boolean {
        must: Vec<Query>,
        should: Vec<Query>,
        must_not: Vec<Query>,
    },

    /// Every live document, each scoring 1.0.
    All,

    /// Matches nothing. Dropped from conjunctions and disjunctions.
    Empty,
}

impl Query {
    pub fn term<F: Into<String>, T: Into<String>>(field: F, term: T) -> Self {
        Query::Term {
            field: field.into(),
            term: term.into(),
        }
    }

    /// A phrase of consecutive terms.
    pub fn phrase<F, I, T>(field: F, terms: I) -> Self
    where
        F: Into<String>,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Query::Phrase {
            field: field.into(),
            terms: (0u32..).zip(terms.into_iter().map(Into::into)).collect(),
        }
    }

    /// Conjunction of `clauses`, without the empty ones.
    pub fn and<I: IntoIterator<Item = Query>>(clauses: I) -> Self {
        let mut must: Vec<Query> = clauses.into_iter().filter(|q| !q.is_empty()).collect();
        match must.len() {
            0 => Query::Empty,
            1 => must.remove(0),
            _ => Query::Boolean {
                must,
                should: Vec::new(),
                must_not: Vec::new(),
            },
        }
    }

    /// Disjunction of `clauses`, without the empty ones.
    pub fn or<I: IntoIterator<Item = Query>>(clauses: I) -> Self {
        let mut should: Vec<Query> = clauses.into_iter().filter(|q| !q.is_empty()).collect();
        match should.len() {
            0 => Query::Empty,
            1 => should.remove(0),
            _ => Query::Boolean {
                must: Vec::new(),
                should,
                must_not: Vec::new(),
            },
        }
    }

    /// Conjunction with exclusions. A purely negative clause list matches
    /// every live document except the excluded ones.
    pub fn and_not(must: Vec<Query>, must_not: Vec<Query>) -> Self {
        let must_not: Vec<Query> = must_not.into_iter().filter(|q| !q.is_empty()).collect();
        if must_not.is_empty() {
            return Query::and(must);
        }
        let mut must: Vec<Query> = must.into_iter().filter(|q| !q.is_empty()).collect();
        if must.is_empty() {
            must.push(Query::All);
        }
        Query::Boolean {
            must,
            should: Vec::new(),
            must_not,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Query::Empty)
    }

    /// Fields referenced by the leaves of this query, in tree order.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields = Vec::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields<'a>(&'a self, fields: &mut Vec<&'a str>) {
        match self {
            Query::Term { field, .. } | Query::Phrase { field, .. } => {
                if !fields.contains(&field.as_str()) {
                    fields.push(field);
                }
            }
            Query::Boolean {
                must,
                should,
                must_not,
            } => {
                for clause in must.iter().chain(should).chain(must_not) {
                    clause.collect_fields(fields);
                }
            }
            Query::All | Query::Empty => {}
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Term { field, term } => write!(f, "{field}:{term}"),
            Query::Phrase { field, terms } => {
                let words: Vec<&str> = terms.iter().map(|(_, t)| t.as_str()).collect();
                write!(f, "{field}:\"{}\"", words.join(" "))
            }
            Query::Boolean {
                must,
                should,
                must_not,
            } => {
                let parts: Vec<String> = must
                    .iter()
                    .map(|q| format!("+{q}"))
                    .chain(should.iter().map(|q| q.to_string()))
                    .chain(must_not.iter().map(|q| format!("-{q}")))
                    .collect();
                write!(f, "({})", parts.join(" "))
            }
            Query::All => write!(f, "*"),
            Query::Empty => write!(f, "<empty>"),
        }
    }
}
