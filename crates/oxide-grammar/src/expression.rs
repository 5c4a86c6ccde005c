//! Verbatim SQL fragments.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A piece of SQL inserted into the output exactly as written.
///
/// Grammars never quote, wrap, or escape an expression. Use it for things
/// like `CURRENT_TIMESTAMP` or `COUNT(*) > 1` that must not be treated as an
/// identifier or a bound value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Expression(String);

impl Expression {
    /// Creates a new expression from raw SQL text.
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    /// Returns the raw SQL text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Expression {
    fn from(sql: &str) -> Self {
        Self::new(sql)
    }
}

impl From<String> for Expression {
    fn from(sql: String) -> Self {
        Self(sql)
    }
}

/// Shorthand for [`Expression::new`].
#[must_use]
pub fn raw(sql: impl Into<String>) -> Expression {
    Expression::new(sql)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_is_verbatim() {
        let expr = raw("CURRENT_TIMESTAMP");
        assert_eq!(expr.as_str(), "CURRENT_TIMESTAMP");
        assert_eq!(expr.to_string(), "CURRENT_TIMESTAMP");
    }
}
