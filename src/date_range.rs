//! Date-range expression grammar for historical dating fields.
//!
//! Accepted forms are a single point, a point prefixed with `<` (before) or
//! `>` (after), or two points joined by the range operator `<>`. A point is a
//! four-digit year (optionally fuzzy with `~`), a `DD-MM-YYYY` day, or a
//! `MM-YYYY` month:
//!
//! ```text
//! 1522            ~1300           10-04-1516      04-1516
//! < 1500          > 1500          1300 <> 1500    ~1300 <> 04-1516
//! ```
//!
//! The grammar only classifies input; nothing downstream needs a parsed
//! calendar value. Both sides of a range are matched independently, so they
//! may differ in fuzziness and granularity.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;

/// User-visible message returned for every rejected value.
///
/// The wording is shown verbatim in the admin UI; keep it byte-identical.
pub const DATE_RANGE_DIAGNOSTIC: &str = "The input does not follow the date constraints. The supported formats are \"< 1500\", \"> 1500\", \"1300 <> 1500\", \"10-04-1516\".";

/// Values of the other fields in the form being edited.
pub type FieldValues = BTreeMap<String, serde_json::Value>;

const POINT: &str = r"(?:~?[0-9]{4}|[0-9]{2}-[0-9]{2}-[0-9]{4}|[0-9]{2}-[0-9]{4})";

static STRICT_GRAMMAR: LazyLock<DateRangeGrammar> =
    LazyLock::new(|| DateRangeGrammar::new(OpenRangePolicy::Strict));
static OPEN_END_GRAMMAR: LazyLock<DateRangeGrammar> =
    LazyLock::new(|| DateRangeGrammar::new(OpenRangePolicy::AllowOpenEnd));

/// Whether a range may omit its upper bound (`"1300 <>"`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenRangePolicy {
    /// Both sides of `<>` are required.
    #[default]
    Strict,
    /// The right-hand side of `<>` may be empty. The left side never may.
    AllowOpenEnd,
}

/// Classification of one input value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRangeVerdict {
    Valid,
    Invalid { message: &'static str },
}

impl DateRangeVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Diagnostic text for rejected input, `None` when the value is accepted.
    pub fn message(&self) -> Option<&'static str> {
        match *self {
            DateRangeVerdict::Valid => None,
            DateRangeVerdict::Invalid { message } => Some(message),
        }
    }
}

/// User input rejected by a field validator. Surfaced inline, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationRejected {
    pub value: String,
    pub message: &'static str,
}

/// Compiled date-range grammar.
#[derive(Debug, Clone)]
pub struct DateRangeGrammar {
    policy: OpenRangePolicy,
    pattern: Regex,
}

impl DateRangeGrammar {
    pub fn new(policy: OpenRangePolicy) -> Self {
        let upper = match policy {
            OpenRangePolicy::Strict => POINT.to_string(),
            OpenRangePolicy::AllowOpenEnd => format!("{POINT}?"),
        };
        let source = format!(r"^(?:{POINT}|{POINT}\s*<>\s*{upper}|<\s*{POINT}|>\s*{POINT})$");
        let pattern = Regex::new(&source).expect("date range pattern compiles");
        Self { policy, pattern }
    }

    pub fn policy(&self) -> OpenRangePolicy {
        self.policy
    }

    /// Classify a value. Absent and empty values are valid (the field is optional).
    pub fn classify(&self, value: Option<&str>) -> DateRangeVerdict {
        match value {
            None | Some("") => DateRangeVerdict::Valid,
            Some(text) if self.pattern.is_match(text) => DateRangeVerdict::Valid,
            Some(_) => DateRangeVerdict::Invalid {
                message: DATE_RANGE_DIAGNOSTIC,
            },
        }
    }

    /// Validator entry point used at form-validation time.
    ///
    /// `all_values` is accepted for cross-field validators and ignored here.
    pub fn check(
        &self,
        value: Option<&str>,
        _all_values: &FieldValues,
    ) -> Result<(), ValidationRejected> {
        match self.classify(value) {
            DateRangeVerdict::Valid => Ok(()),
            DateRangeVerdict::Invalid { message } => Err(ValidationRejected {
                value: value.unwrap_or_default().to_string(),
                message,
            }),
        }
    }
}

impl Default for DateRangeGrammar {
    fn default() -> Self {
        Self::new(OpenRangePolicy::default())
    }
}

/// Classify with the process-wide strict grammar.
pub fn validate_date_range(value: Option<&str>) -> DateRangeVerdict {
    STRICT_GRAMMAR.classify(value)
}

/// Shared compiled grammar for a policy.
pub fn grammar_for(policy: OpenRangePolicy) -> &'static DateRangeGrammar {
    match policy {
        OpenRangePolicy::Strict => &STRICT_GRAMMAR,
        OpenRangePolicy::AllowOpenEnd => &OPEN_END_GRAMMAR,
    }
}

#[cfg(test)]
#[path = "date_range_tests.rs"]
mod tests;
