//! Duplicate-key handling policy for bulk writes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// What a bulk write does with a document whose key already exists.
///
/// | Policy | Existing key becomes |
/// |--------|----------------------|
/// | `error` | counted in `errors` (detailed on request) |
/// | `ignore` | counted in `ignored`, stored document untouched |
/// | `update` | merged with the incoming fields, counted in `updated` |
/// | `replace` | overwritten by the incoming document, counted in `updated` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Reject the duplicate.
    #[default]
    Error,
    /// Skip the duplicate.
    Ignore,
    /// Merge into the existing document.
    Update,
    /// Overwrite the existing document.
    Replace,
}

impl DuplicatePolicy {
    /// All policies, in declaration order.
    pub const ALL: [DuplicatePolicy; 4] = [
        DuplicatePolicy::Error,
        DuplicatePolicy::Ignore,
        DuplicatePolicy::Update,
        DuplicatePolicy::Replace,
    ];

    /// Wire name of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicatePolicy::Error => "error",
            DuplicatePolicy::Ignore => "ignore",
            DuplicatePolicy::Update => "update",
            DuplicatePolicy::Replace => "replace",
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DuplicatePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DuplicatePolicy::ALL
            .into_iter()
            .find(|policy| policy.as_str() == s)
            .ok_or_else(|| Error::InvalidParameter {
                name: "on_duplicate".to_string(),
                reason: format!(
                    "'{}' is not one of error, ignore, update, replace",
                    s
                ),
            })
    }
}
