//! SQL identifiers that are safe to splice into statement text.
//!
//! Table, alias and column names cannot be bound as parameters, so every name
//! that reaches generated SQL goes through [`Ident`]. Only plain identifiers are
//! accepted: each dot-separated segment must match `[A-Za-z_][A-Za-z0-9_]*`.
//! Quoted identifiers are deliberately unsupported.

use crate::error::{CrudError, CrudResult};
use std::fmt;

/// A validated, possibly qualified SQL identifier (`column`, `alias.column`,
/// `schema.table`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ident {
    segments: Vec<String>,
}

impl Ident {
    /// Parse a dotted identifier.
    pub fn parse(s: &str) -> CrudResult<Self> {
        if s.is_empty() {
            return Err(CrudError::validation("Identifier cannot be empty"));
        }
        let segments = s
            .split('.')
            .map(|segment| validate_segment(s, segment).map(str::to_owned))
            .collect::<CrudResult<Vec<_>>>()?;
        Ok(Self { segments })
    }

    /// Parse a single segment (no dots allowed), e.g. a column or alias.
    pub fn simple(s: &str) -> CrudResult<Self> {
        let ident = Self::parse(s)?;
        if ident.segments.len() != 1 {
            return Err(CrudError::validation(format!(
                "Expected an unqualified identifier, got '{s}'"
            )));
        }
        Ok(ident)
    }

    /// `qualifier.self`, e.g. `c` + `label` -> `c.label`.
    pub fn qualified_by(&self, qualifier: &Ident) -> Ident {
        let mut segments = qualifier.segments.clone();
        segments.extend(self.segments.iter().cloned());
        Ident { segments }
    }

    /// Split `alias.column` into `(Some(alias), column)`; a bare name yields `(None, name)`.
    pub(crate) fn split_last(&self) -> (Option<Ident>, &str) {
        let (last, rest) = self
            .segments
            .split_last()
            .expect("identifiers always have at least one segment");
        let qualifier = (!rest.is_empty()).then(|| Ident {
            segments: rest.to_vec(),
        });
        (qualifier, last.as_str())
    }

    /// The last segment (the column or table name itself).
    pub fn name(&self) -> &str {
        self.split_last().1
    }

    /// Render as SQL text.
    pub fn to_sql(&self) -> String {
        self.segments.join(".")
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

fn validate_segment<'s>(full: &str, segment: &'s str) -> CrudResult<&'s str> {
    let mut chars = segment.chars();
    match chars.next() {
        None => Err(CrudError::validation(format!(
            "Empty segment in identifier '{full}'"
        ))),
        Some(c) if !(c == '_' || c.is_ascii_alphabetic()) => Err(CrudError::validation(
            format!("Invalid identifier start character '{c}' in '{full}'"),
        )),
        Some(_) => match chars.find(|c| !(*c == '_' || c.is_ascii_alphanumeric())) {
            Some(c) => Err(CrudError::validation(format!(
                "Invalid character '{c}' in identifier '{full}'"
            ))),
            None => Ok(segment),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_qualified() {
        assert_eq!(Ident::parse("users").unwrap().to_sql(), "users");
        assert_eq!(Ident::parse("c.label").unwrap().to_sql(), "c.label");
        assert_eq!(
            Ident::parse("public.trip_package").unwrap().to_sql(),
            "public.trip_package"
        );
    }

    #[test]
    fn rejects_injection_shapes() {
        assert!(Ident::parse("").is_err());
        assert!(Ident::parse("1table").is_err());
        assert!(Ident::parse("my table").is_err());
        assert!(Ident::parse("users; drop table users; --").is_err());
        assert!(Ident::parse("schema..table").is_err());
        assert!(Ident::parse("schema.").is_err());
        assert!(Ident::parse(r#""quoted""#).is_err());
        assert!(Ident::parse("price$").is_err());
    }

    #[test]
    fn simple_rejects_dots() {
        assert!(Ident::simple("deleted_at").is_ok());
        assert!(Ident::simple("t.deleted_at").is_err());
    }

    #[test]
    fn qualification_and_split() {
        let alias = Ident::simple("ct").unwrap();
        let col = Ident::simple("tag").unwrap().qualified_by(&alias);
        assert_eq!(col.to_sql(), "ct.tag");

        let (qualifier, name) = col.split_last();
        assert_eq!(qualifier, Some(alias));
        assert_eq!(name, "tag");

        let bare = Ident::parse("tag").unwrap();
        let (qualifier, name) = bare.split_last();
        assert!(qualifier.is_none());
        assert_eq!(name, "tag");
    }
}
