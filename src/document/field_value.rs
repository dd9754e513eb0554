//! Field value types and schema coercion.
//!
//! ```
//! use placedex::document::FieldValue;
//! use placedex::schema::FieldDescriptor;
//!
//! let stars = FieldDescriptor::numeric("stars");
//! let value = FieldValue::from("4.5").coerce(&stars, "%Y-%m-%d %H:%M:%S").unwrap();
//! assert_eq!(value, FieldValue::Numeric(4.5));
//! assert_eq!(value.index_terms("%Y-%m-%d %H:%M:%S"), vec!["4.5"]);
//! ```

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{PlacedexError, Result};
use crate::schema::{FieldDescriptor, FieldType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Numeric(f64),
    Boolean(bool),
    Tags(Vec<String>),
    Timestamp(NaiveDateTime),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            FieldValue::Numeric(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric reading of a number or of numeric text, as stored values keep
    /// the form they were supplied in.
    pub fn numeric_value(&self) -> Option<f64> {
        match self {
            FieldValue::Numeric(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|n| n.is_finite())
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_tags(&self) -> Option<&[String]> {
        match self {
            FieldValue::Tags(tags) => Some(tags),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            FieldValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Numeric(_) => "numeric",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Tags(_) => "tags",
            FieldValue::Timestamp(_) => "timestamp",
        }
    }

    /// Convert the value to the representation of `field`'s type.
    ///
    /// Failures are [`PlacedexError::Validation`], except an unparseable
    /// timestamp string, which is [`PlacedexError::Parse`] carrying the
    /// offending value.
    pub fn coerce(self, field: &FieldDescriptor, timestamp_format: &str) -> Result<FieldValue> {
        let mismatch = |value: &FieldValue| {
            PlacedexError::validation(
                &field.name,
                format!(
                    "cannot convert {} value to {}",
                    value.type_name(),
                    field.field_type
                ),
            )
        };

        match field.field_type {
            FieldType::Identifier => match self {
                FieldValue::Tags(_) => Err(mismatch(&self)),
                other => Ok(FieldValue::Text(other.render(timestamp_format))),
            },
            FieldType::Text => Ok(FieldValue::Text(self.render(timestamp_format))),
            FieldType::Numeric => match self {
                FieldValue::Numeric(n) if n.is_finite() => Ok(FieldValue::Numeric(n)),
                FieldValue::Numeric(n) => Err(PlacedexError::validation(
                    &field.name,
                    format!("{n} is not a finite number"),
                )),
                FieldValue::Text(ref s) => match s.trim().parse::<f64>() {
                    Ok(n) if n.is_finite() => Ok(FieldValue::Numeric(n)),
                    _ => Err(PlacedexError::validation(
                        &field.name,
                        format!("'{s}' is not a number"),
                    )),
                },
                other => Err(mismatch(&other)),
            },
            FieldType::Boolean => match self {
                FieldValue::Boolean(b) => Ok(FieldValue::Boolean(b)),
                FieldValue::Text(ref s) => parse_bool(s).map(FieldValue::Boolean).ok_or_else(|| {
                    PlacedexError::validation(&field.name, format!("'{s}' is not a boolean"))
                }),
                FieldValue::Numeric(n) if n == 0.0 || n == 1.0 => Ok(FieldValue::Boolean(n == 1.0)),
                other => Err(mismatch(&other)),
            },
            FieldType::TagList => match self {
                FieldValue::Tags(tags) => Ok(FieldValue::Tags(normalize_tags(tags))),
                FieldValue::Text(s) => Ok(FieldValue::Tags(split_tags(&s))),
                other => Err(mismatch(&other)),
            },
            FieldType::Timestamp => match self {
                FieldValue::Timestamp(ts) => Ok(FieldValue::Timestamp(ts)),
                FieldValue::Text(s) => NaiveDateTime::parse_from_str(s.trim(), timestamp_format)
                    .map(FieldValue::Timestamp)
                    .map_err(|_| PlacedexError::parse(&field.name, s)),
                other => Err(mismatch(&other)),
            },
        }
    }

    /// Exact terms indexed for a non-analyzed field: one canonical term per
    /// value, or one term per tag.
    pub fn index_terms(&self, timestamp_format: &str) -> Vec<String> {
        match self {
            FieldValue::Tags(tags) => tags.clone(),
            other => vec![other.render(timestamp_format)],
        }
    }

    /// Text rendering used for Text/Identifier coercion and canonical terms.
    pub fn render(&self, timestamp_format: &str) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Numeric(n) => n.to_string(),
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::Tags(tags) => tags.join(", "),
            FieldValue::Timestamp(ts) => ts.format(timestamp_format).to_string(),
        }
    }
}

/// Split comma-delimited tags, trimming whitespace and dropping empty pieces.
pub fn split_tags(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.iter().flat_map(|tag| split_tags(tag)).collect()
}

/// Accepted boolean spellings, case-insensitive.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" | "on" => Some(true),
        "false" | "f" | "no" | "n" | "0" | "off" => Some(false),
        _ => None,
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Numeric(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Numeric(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::Tags(value)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(value: NaiveDateTime) -> Self {
        FieldValue::Timestamp(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TIMESTAMP_FORMAT as FMT;

    #[test]
    fn test_numeric_coercion() {
        let field = FieldDescriptor::numeric("stars");
        assert_eq!(
            FieldValue::from(" 3.5 ").coerce(&field, FMT).unwrap(),
            FieldValue::Numeric(3.5)
        );
        assert_eq!(
            FieldValue::from(4i64).coerce(&field, FMT).unwrap(),
            FieldValue::Numeric(4.0)
        );

        let err = FieldValue::from("four").coerce(&field, FMT).unwrap_err();
        assert!(matches!(err, PlacedexError::Validation { ref field, .. } if field == "stars"));
        assert!(FieldValue::from("NaN").coerce(&field, FMT).is_err());
        assert!(FieldValue::from(true).coerce(&field, FMT).is_err());
    }

    #[test]
    fn test_boolean_coercion() {
        let field = FieldDescriptor::boolean("is_open");
        assert_eq!(
            FieldValue::from(1i64).coerce(&field, FMT).unwrap(),
            FieldValue::Boolean(true)
        );
        assert_eq!(
            FieldValue::from("No").coerce(&field, FMT).unwrap(),
            FieldValue::Boolean(false)
        );
        assert!(FieldValue::from(2i64).coerce(&field, FMT).is_err());
        assert!(FieldValue::from("maybe").coerce(&field, FMT).is_err());
    }

    #[test]
    fn test_tag_coercion() {
        let field = FieldDescriptor::tag_list("categories");
        assert_eq!(
            FieldValue::from("Pizza, Italian,,Restaurants ")
                .coerce(&field, FMT)
                .unwrap(),
            FieldValue::Tags(vec![
                "Pizza".to_string(),
                "Italian".to_string(),
                "Restaurants".to_string()
            ])
        );
        assert_eq!(
            FieldValue::Tags(vec![" Bars ".to_string(), "".to_string()])
                .coerce(&field, FMT)
                .unwrap(),
            FieldValue::Tags(vec!["Bars".to_string()])
        );
    }

    #[test]
    fn test_timestamp_coercion() {
        let field = FieldDescriptor::timestamp("date");
        let value = FieldValue::from("2021-03-04 12:30:00")
            .coerce(&field, FMT)
            .unwrap();
        assert_eq!(value.render(FMT), "2021-03-04 12:30:00");

        let err = FieldValue::from("2021-13-40 00:00:00")
            .coerce(&field, FMT)
            .unwrap_err();
        match err {
            PlacedexError::Parse { field, value } => {
                assert_eq!(field, "date");
                assert_eq!(value, "2021-13-40 00:00:00");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(FieldValue::from("2021-03-04").coerce(&field, FMT).is_err());
        assert!(FieldValue::from(5.0).coerce(&field, FMT).is_err());
    }

    #[test]
    fn test_text_and_identifier_coercion() {
        let id = FieldDescriptor::identifier("postal_code");
        assert_eq!(
            FieldValue::from(37203i64).coerce(&id, FMT).unwrap(),
            FieldValue::Text("37203".to_string())
        );
        assert!(FieldValue::Tags(vec![]).coerce(&id, FMT).is_err());

        let text = FieldDescriptor::text("hours");
        assert_eq!(
            FieldValue::Tags(vec!["a".to_string(), "b".to_string()])
                .coerce(&text, FMT)
                .unwrap(),
            FieldValue::Text("a, b".to_string())
        );
    }

    #[test]
    fn test_index_terms() {
        assert_eq!(FieldValue::Numeric(4.0).index_terms(FMT), vec!["4"]);
        assert_eq!(FieldValue::Numeric(-86.767).index_terms(FMT), vec!["-86.767"]);
        assert_eq!(FieldValue::Boolean(false).index_terms(FMT), vec!["false"]);
        assert_eq!(
            FieldValue::Tags(vec!["Pizza".to_string(), "Bars".to_string()]).index_terms(FMT),
            vec!["Pizza", "Bars"]
        );
    }

    #[test]
    fn test_numeric_value_reads_text() {
        assert_eq!(FieldValue::Numeric(4.5).numeric_value(), Some(4.5));
        assert_eq!(FieldValue::from(" 36.115 ").numeric_value(), Some(36.115));
        assert_eq!(FieldValue::from("many").numeric_value(), None);
        assert_eq!(FieldValue::from("inf").numeric_value(), None);
        assert_eq!(FieldValue::Boolean(true).numeric_value(), None);
    }
}
