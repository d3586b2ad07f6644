use std::fmt::Display;
use std::str::FromStr;

use verdant_core::ids::FindingId;

/// Parse a value through its `FromStr`, naming the offending field on error.
pub fn parse_field<T>(raw: &str, field: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>()
        .map_err(|error| anyhow::anyhow!("invalid {field} '{raw}': {error}"))
}

/// Parse a prefixed finding id such as `act-7`.
pub fn parse_finding_id(raw: &str) -> anyhow::Result<FindingId> {
    parse_field(raw, "finding id")
}
