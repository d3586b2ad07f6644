use anyhow::bail;
use schemars::{Schema, schema_for};
use verdant_core::entities::{ConservationAction, Finding, StatsSummary, StoredFinding, Subject};
use verdant_engine::Action;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::SchemaArgs;
use crate::output::output;

/// Type names `vdt schema` accepts.
pub const SCHEMA_TYPES: &[&str] = &[
    "subject",
    "finding",
    "stored-finding",
    "action",
    "stats",
    "recommended-action",
];

/// JSON schema for one output type.
pub fn schema_for_type(type_name: &str) -> anyhow::Result<Schema> {
    let schema = match type_name.trim().to_ascii_lowercase().replace('_', "-").as_str() {
        "subject" => schema_for!(Subject),
        "finding" => schema_for!(Finding),
        "stored-finding" => schema_for!(StoredFinding),
        "action" => schema_for!(ConservationAction),
        "stats" => schema_for!(StatsSummary),
        "recommended-action" => schema_for!(Action),
        other => bail!(
            "unknown schema type '{other}' (expected one of: {})",
            SCHEMA_TYPES.join(", ")
        ),
    };
    Ok(schema)
}

/// Handle `vdt schema`.
pub fn handle(args: &SchemaArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    let schema = schema_for_type(&args.type_name)?;
    output(&schema, flags.format)
}
