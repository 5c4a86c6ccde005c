//! Comparison operators accepted by predicates.
//!
//! Operators are parsed once when a predicate is built. A string that is not
//! a known operator is rejected immediately; whether a grammar can render a
//! known operator is checked at compile time.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A comparison or pattern operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`
    Eq,
    /// `<>` (also parsed from `!=`)
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `<=>` (MySQL null-safe equality)
    NullSafeEq,
    /// `LIKE`
    Like,
    /// `NOT LIKE`
    NotLike,
    /// `LIKE BINARY`
    LikeBinary,
    /// `ILIKE`
    ILike,
    /// `NOT ILIKE`
    NotILike,
    /// `RLIKE`
    RLike,
    /// `NOT RLIKE`
    NotRLike,
    /// `REGEXP`
    Regexp,
    /// `NOT REGEXP`
    NotRegexp,
    /// `SIMILAR TO`
    SimilarTo,
    /// `NOT SIMILAR TO`
    NotSimilarTo,
    /// `GLOB`
    Glob,
    /// `~` (POSIX match)
    Match,
    /// `~*`
    IMatch,
    /// `!~`
    NotMatch,
    /// `!~*`
    NotIMatch,
    /// `@>`
    Contains,
    /// `<@`
    ContainedBy,
    /// `&&`
    Overlaps,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `<<`
    ShiftLeft,
    /// `>>`
    ShiftRight,
}

impl Operator {
    /// Every operator, in declaration order.
    pub const ALL: &'static [Self] = &[
        Self::Eq,
        Self::NotEq,
        Self::Lt,
        Self::LtEq,
        Self::Gt,
        Self::GtEq,
        Self::NullSafeEq,
        Self::Like,
        Self::NotLike,
        Self::LikeBinary,
        Self::ILike,
        Self::NotILike,
        Self::RLike,
        Self::NotRLike,
        Self::Regexp,
        Self::NotRegexp,
        Self::SimilarTo,
        Self::NotSimilarTo,
        Self::Glob,
        Self::Match,
        Self::IMatch,
        Self::NotMatch,
        Self::NotIMatch,
        Self::Contains,
        Self::ContainedBy,
        Self::Overlaps,
        Self::BitAnd,
        Self::BitOr,
        Self::BitXor,
        Self::ShiftLeft,
        Self::ShiftRight,
    ];

    /// Returns the SQL spelling of the operator.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::NullSafeEq => "<=>",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::LikeBinary => "LIKE BINARY",
            Self::ILike => "ILIKE",
            Self::NotILike => "NOT ILIKE",
            Self::RLike => "RLIKE",
            Self::NotRLike => "NOT RLIKE",
            Self::Regexp => "REGEXP",
            Self::NotRegexp => "NOT REGEXP",
            Self::SimilarTo => "SIMILAR TO",
            Self::NotSimilarTo => "NOT SIMILAR TO",
            Self::Glob => "GLOB",
            Self::Match => "~",
            Self::IMatch => "~*",
            Self::NotMatch => "!~",
            Self::NotIMatch => "!~*",
            Self::Contains => "@>",
            Self::ContainedBy => "<@",
            Self::Overlaps => "&&",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::ShiftLeft => "<<",
            Self::ShiftRight => ">>",
        }
    }

    /// Returns `true` for bitwise operators, which some dialects wrap
    /// so the predicate yields a boolean.
    #[must_use]
    pub const fn is_bitwise(self) -> bool {
        matches!(
            self,
            Self::BitAnd
                | Self::BitOr
                | Self::BitXor
                | Self::ShiftLeft
                | Self::ShiftRight
        )
    }

    /// Returns `true` for the `LIKE` family.
    #[must_use]
    pub const fn is_like(self) -> bool {
        matches!(
            self,
            Self::Like | Self::NotLike | Self::LikeBinary | Self::ILike | Self::NotILike
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        let normalized = normalized.to_ascii_uppercase();
        if normalized == "!=" {
            return Ok(Self::NotEq);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.as_sql() == normalized)
            .ok_or_else(|| Error::construction("operator", format!("unknown operator '{s}'")))
    }
}

impl TryFrom<&str> for Operator {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        s.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_and_space_insensitive() {
        assert_eq!("like".parse::<Operator>().unwrap(), Operator::Like);
        assert_eq!("not   like".parse::<Operator>().unwrap(), Operator::NotLike);
        assert_eq!("!=".parse::<Operator>().unwrap(), Operator::NotEq);
        assert_eq!("<>".parse::<Operator>().unwrap(), Operator::NotEq);
    }

    #[test]
    fn test_unknown_operator_is_rejected() {
        let err = "=~=".parse::<Operator>().unwrap_err();
        assert!(matches!(err, Error::Construction { context: "operator", .. }));
    }

    #[test]
    fn test_bitwise() {
        assert!(Operator::BitAnd.is_bitwise());
        assert!(!Operator::Eq.is_bitwise());
    }
}
