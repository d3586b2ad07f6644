//! Finding identifiers.
//!
//! The store hands out one monotonically increasing sequence number across all
//! finding kinds. A [`FindingId`] pairs that number with its kind and renders as
//! `<prefix>-<seq>`, e.g. `dis-42` or `act-7`.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::FindingKind;
use crate::errors::CoreError;

pub const PREFIX_DISCOVERY: &str = "dis";
pub const PREFIX_AUDIO: &str = "aud";
pub const PREFIX_ECOSYSTEM: &str = "eco";
pub const PREFIX_ACTION: &str = "act";

/// All finding prefixes, in [`FindingKind::ALL`] order.
pub const ALL_PREFIXES: &[&str] = &[
    PREFIX_DISCOVERY,
    PREFIX_AUDIO,
    PREFIX_ECOSYSTEM,
    PREFIX_ACTION,
];

/// Stable identifier of a persisted finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "String", into = "String")]
#[schemars(with = "String")]
pub struct FindingId {
    kind: FindingKind,
    seq: i64,
}

impl FindingId {
    #[must_use]
    pub const fn new(kind: FindingKind, seq: i64) -> Self {
        Self { kind, seq }
    }

    #[must_use]
    pub const fn kind(self) -> FindingKind {
        self.kind
    }

    /// Store-wide insertion sequence number.
    #[must_use]
    pub const fn seq(self) -> i64 {
        self.seq
    }
}

impl fmt::Display for FindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind.prefix(), self.seq)
    }
}

impl FromStr for FindingId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, seq) = s
            .split_once('-')
            .ok_or_else(|| CoreError::Parse(format!("finding id '{s}' has no prefix")))?;
        let kind = FindingKind::ALL
            .into_iter()
            .find(|k| k.prefix() == prefix)
            .ok_or_else(|| CoreError::Parse(format!("unknown finding id prefix '{prefix}'")))?;
        let seq = seq
            .parse::<i64>()
            .map_err(|e| CoreError::Parse(format!("finding id '{s}': {e}")))?;
        if seq < 1 {
            return Err(CoreError::Parse(format!(
                "finding id '{s}': sequence must be positive"
            )));
        }
        Ok(Self { kind, seq })
    }
}

impl TryFrom<String> for FindingId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FindingId> for String {
    fn from(id: FindingId) -> Self {
        id.to_string()
    }
}
