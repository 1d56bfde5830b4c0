// concord-core/src/domain/normalize.rs
//
// Whitespace and case canonicalization applied before every equality or pattern comparison.
// Callers compare twice (raw, then normalized) so a Warning can be recorded whenever
// normalization is what made two values agree.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::domain::dataset::Value;
use crate::domain::finding::Severity;

/// Which parts of normalization a comparison opts out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sensitivity {
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub whitespace_sensitive: bool,
}

/// How two values agreed, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
    Exact,
    Normalized,
    Different,
}

impl Match {
    pub fn severity(self) -> Severity {
        match self {
            Match::Exact => Severity::Pass,
            Match::Normalized => Severity::Warning,
            Match::Different => Severity::Error,
        }
    }

    pub fn is_match(self) -> bool {
        !matches!(self, Match::Different)
    }
}

impl Sensitivity {
    pub const NORMALIZED: Sensitivity = Sensitivity {
        case_sensitive: false,
        whitespace_sensitive: false,
    };

    pub const STRICT: Sensitivity = Sensitivity {
        case_sensitive: true,
        whitespace_sensitive: true,
    };

    pub fn new(case_sensitive: bool, whitespace_sensitive: bool) -> Self {
        Self {
            case_sensitive,
            whitespace_sensitive,
        }
    }

    pub fn normalize<'a>(&self, raw: &'a str) -> Cow<'a, str> {
        let spaced = if self.whitespace_sensitive {
            Cow::Borrowed(raw)
        } else {
            collapse_whitespace(raw)
        };
        if self.case_sensitive {
            spaced
        } else {
            Cow::Owned(spaced.to_lowercase())
        }
    }

    /// Normalized key text. Null and blank values have no key.
    pub fn key_of(&self, value: &Value) -> Option<String> {
        let raw = value.as_text()?;
        let key = self.normalize(&raw);
        if key.trim().is_empty() {
            None
        } else {
            Some(key.into_owned())
        }
    }

    pub fn compare(&self, left: &str, right: &str) -> Match {
        if left == right {
            Match::Exact
        } else if self.normalize(left) == self.normalize(right) {
            Match::Normalized
        } else {
            Match::Different
        }
    }
}

/// Trims and folds internal whitespace runs into a single space.
fn collapse_whitespace(raw: &str) -> Cow<'_, str> {
    let trimmed = raw.trim();
    let mut previous_was_space = false;
    let needs_folding = trimmed.chars().any(|c| {
        let irregular = c.is_whitespace() && (c != ' ' || previous_was_space);
        previous_was_space = c.is_whitespace();
        irregular
    });
    if !needs_folding {
        return Cow::Borrowed(trimmed);
    }
    Cow::Owned(trimmed.split_whitespace().collect::<Vec<_>>().join(" "))
}
