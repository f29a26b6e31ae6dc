//! Comma-separated option values.
//!
//! [`ValueOption`] holds the raw value of an option such as `--strata=single-fields,max-fields=64`
//! and exposes its de-duplicated tokens in first-seen order.
//!
//! ```rust
//! use strata::options::ValueOption;
//!
//! let option = ValueOption::new(Some("a,b,,a,c"));
//! assert_eq!(option.values(), &["a", "b", "c"]);
//! assert!(option.contains("b"));
//! ```

use std::fmt;

/// An option whose value is a comma-separated collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueOption {
    raw: Option<String>,
    values: Vec<String>,
}

impl ValueOption {
    /// Parses `value`; `None` yields an option without values.
    #[must_use]
    pub fn new(value: Option<&str>) -> Self {
        let mut values: Vec<String> = Vec::new();
        if let Some(value) = value {
            for token in value.split(',').filter(|t| !t.is_empty()) {
                if !values.iter().any(|v| v == token) {
                    values.push(token.to_string());
                }
            }
        }

        ValueOption {
            raw: value.map(str::to_string),
            values,
        }
    }

    /// The unparsed value, if one was given.
    #[must_use]
    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// The distinct tokens in first-seen order.
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Returns `true` if `token` is one of the values.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.values.iter().any(|v| v == token)
    }

    /// Returns `true` if there are no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for ValueOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.values.join(","))
    }
}
