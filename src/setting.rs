//! Setting declarations, values, and validation.
//!
//! A [`SettingSpec`] declares one configurable value of a domain: its store
//! name, kind, and constraints. Requested values are validated against the
//! declaration before anything is written, and values read back from a store are
//! compared with [`SettingValue::matches`], which tolerates the representation
//! differences stores introduce (a DWORD read back for a string write, etc.).
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A concrete setting value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SettingValue {
    /// Signed integer (DWORD/QWORD values are widened to `i64`).
    Integer(i64),
    /// String value.
    String(String),
    /// Boolean flag.
    Boolean(bool),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "\"{s}\""),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl SettingValue {
    /// Interpret the value as an integer, accepting numeric strings and
    /// booleans as 0/1.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::String(s) => s.trim().parse().ok(),
            Self::Boolean(b) => Some(i64::from(*b)),
        }
    }

    /// Render the value the way a string-typed store holds it.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Integer(n) => n.to_string(),
            Self::String(s) => s.clone(),
            Self::Boolean(b) => u8::from(*b).to_string(),
        }
    }

    /// Whether a value read back from a store equals this desired value.
    ///
    /// Two integers compare numerically; when either side is a string the
    /// comparison falls back to numeric parsing, then to a trimmed,
    /// case-insensitive text match.
    #[must_use]
    pub fn matches(&self, actual: &Self) -> bool {
        if self == actual {
            return true;
        }
        if let (Some(a), Some(b)) = (self.as_integer(), actual.as_integer()) {
            return a == b;
        }
        self.as_text()
            .trim()
            .eq_ignore_ascii_case(actual.as_text().trim())
    }
}

/// Declared kind of a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    /// Stored as a number.
    Integer,
    /// Stored as text.
    String,
    /// Stored as 0/1.
    Boolean,
}

impl fmt::Display for SettingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "an integer"),
            Self::String => write!(f, "a string"),
            Self::Boolean => write!(f, "a boolean"),
        }
    }
}

/// A constraint on allowed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// Inclusive integer range.
    Range {
        /// Lower bound.
        min: i64,
        /// Upper bound.
        max: i64,
    },
    /// Enumerated string values (compared case-insensitively).
    OneOf(&'static [&'static str]),
    /// Comma-separated IPv4 addresses; empty means "none".
    Ipv4List,
}

/// Declaration of one setting inside a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingSpec {
    /// Value name in the store.
    pub name: &'static str,
    /// Declared kind.
    pub kind: SettingKind,
    /// Constraints applied to requested values.
    pub constraints: &'static [Constraint],
    /// Short description for `list`.
    pub description: &'static str,
}

/// What the caller wants a setting to become.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Desired {
    /// Write this value.
    Set(SettingValue),
    /// Delete the value so the OS default applies.
    Unset,
}

impl fmt::Display for Desired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set(v) => v.fmt(f),
            Self::Unset => write!(f, "<default>"),
        }
    }
}

impl SettingSpec {
    /// Validate a requested value against this setting's kind and
    /// constraints, returning the value normalised to the declared kind.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the value has the wrong type or falls
    /// outside a constraint.
    pub fn validate(&self, value: &SettingValue) -> Result<SettingValue, ValidationError> {
        let normalised = self.coerce(value)?;
        for constraint in self.constraints {
            match (constraint, &normalised) {
                (Constraint::Range { min, .. }, SettingValue::Integer(n)) if n < min => {
                    return Err(ValidationError::BelowMinimum {
                        setting: self.name.to_string(),
                        value: *n,
                        min: *min,
                    });
                }
                (Constraint::Range { max, .. }, SettingValue::Integer(n)) if n > max => {
                    return Err(ValidationError::AboveMaximum {
                        setting: self.name.to_string(),
                        value: *n,
                        max: *max,
                    });
                }
                (Constraint::OneOf(allowed), v) => {
                    let text = v.as_text();
                    if !allowed.iter().any(|a| a.eq_ignore_ascii_case(&text)) {
                        return Err(ValidationError::NotAllowed {
                            setting: self.name.to_string(),
                            value: text,
                            allowed: allowed.join(", "),
                        });
                    }
                }
                (Constraint::Ipv4List, v) => {
                    let text = v.as_text();
                    let bad = text
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .find(|s| s.parse::<std::net::Ipv4Addr>().is_err());
                    if let Some(bad) = bad {
                        return Err(ValidationError::TypeMismatch {
                            setting: self.name.to_string(),
                            expected: "comma-separated IPv4 addresses".to_string(),
                            value: bad.to_string(),
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(normalised)
    }

    /// Parse a command-line string into a value of this setting's kind.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TypeMismatch`] if the text does not parse.
    pub fn parse(&self, text: &str) -> Result<SettingValue, ValidationError> {
        self.coerce(&SettingValue::String(text.to_string()))
    }

    fn coerce(&self, value: &SettingValue) -> Result<SettingValue, ValidationError> {
        let mismatch = || ValidationError::TypeMismatch {
            setting: self.name.to_string(),
            expected: self.kind.to_string(),
            value: value.as_text(),
        };
        match self.kind {
            SettingKind::Integer => value
                .as_integer()
                .map(SettingValue::Integer)
                .ok_or_else(mismatch),
            SettingKind::String => Ok(SettingValue::String(value.as_text())),
            SettingKind::Boolean => match value {
                SettingValue::Boolean(b) => Ok(SettingValue::Boolean(*b)),
                SettingValue::Integer(0) => Ok(SettingValue::Boolean(false)),
                SettingValue::Integer(1) => Ok(SettingValue::Boolean(true)),
                SettingValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "1" | "true" | "on" | "yes" => Ok(SettingValue::Boolean(true)),
                    "0" | "false" | "off" | "no" => Ok(SettingValue::Boolean(false)),
                    _ => Err(mismatch()),
                },
                SettingValue::Integer(_) => Err(mismatch()),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const MTU: SettingSpec = SettingSpec {
        name: "MTU",
        kind: SettingKind::Integer,
        constraints: &[Constraint::Range { min: 576, max: 9000 }],
        description: "",
    };

    const LSO: SettingSpec = SettingSpec {
        name: "*LsoV2IPv4",
        kind: SettingKind::String,
        constraints: &[Constraint::OneOf(&["0", "1"])],
        description: "",
    };

    #[test]
    fn range_boundaries() {
        for (value, ok) in [(575, false), (576, true), (9000, true), (9001, false)] {
            let result = MTU.validate(&SettingValue::Integer(value));
            assert_eq!(result.is_ok(), ok, "MTU {value}");
        }
    }

    #[test]
    fn below_minimum_reports_bound() {
        let err = MTU.validate(&SettingValue::Integer(575)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::BelowMinimum {
                setting: "MTU".into(),
                value: 575,
                min: 576
            }
        );
    }

    #[test]
    fn parse_rejects_non_numeric() {
        assert!(matches!(
            MTU.parse("big"),
            Err(ValidationError::TypeMismatch { .. })
        ));
        assert_eq!(MTU.parse(" 1500 ").unwrap(), SettingValue::Integer(1500));
    }

    #[test]
    fn one_of_is_case_insensitive_and_normalises_to_string() {
        assert_eq!(
            LSO.validate(&SettingValue::Integer(0)).unwrap(),
            SettingValue::String("0".into())
        );
        assert!(matches!(
            LSO.validate(&SettingValue::String("2".into())),
            Err(ValidationError::NotAllowed { .. })
        ));
    }

    #[test]
    fn ipv4_list() {
        let spec = SettingSpec {
            name: "NameServer",
            kind: SettingKind::String,
            constraints: &[Constraint::Ipv4List],
            description: "",
        };
        let check = |s: &str| spec.validate(&SettingValue::String(s.to_string()));
        assert!(check("1.1.1.1,1.0.0.1").is_ok());
        assert!(check("").is_ok());
        let err = check("1.1.1.1,one.one").unwrap_err();
        assert!(err.to_string().contains("one.one"));
    }

    #[test]
    fn boolean_coercion() {
        let spec = SettingSpec {
            name: "EnableDHCP",
            kind: SettingKind::Boolean,
            constraints: &[],
            description: "",
        };
        assert_eq!(spec.parse("on").unwrap(), SettingValue::Boolean(true));
        assert_eq!(
            spec.validate(&SettingValue::Integer(0)).unwrap(),
            SettingValue::Boolean(false)
        );
        assert!(spec.validate(&SettingValue::Integer(2)).is_err());
    }

    #[test]
    fn matches_tolerates_representation() {
        assert!(SettingValue::String("0".into()).matches(&SettingValue::Integer(0)));
        assert!(SettingValue::Boolean(true).matches(&SettingValue::Integer(1)));
        assert!(SettingValue::String("1.1.1.1,1.0.0.1".into())
            .matches(&SettingValue::String(" 1.1.1.1,1.0.0.1 ".into())));
        assert!(!SettingValue::Integer(1500).matches(&SettingValue::Integer(1450)));
    }

    #[test]
    fn zero_is_distinct_from_empty_string() {
        assert!(!SettingValue::Integer(0).matches(&SettingValue::String(String::new())));
    }

    #[test]
    fn serde_shape_is_tagged() {
        let json = serde_json::to_string(&SettingValue::Integer(1450)).unwrap();
        assert_eq!(json, r#"{"type":"integer","value":1450}"#);
    }
}
