use anyhow::Context;
use serde::Serialize;
use verdant_core::ids::FindingId;
use verdant_engine::VerdantContext;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::CompleteArgs;
use crate::commands::shared::parse::parse_finding_id;
use crate::output::output;

#[derive(Serialize)]
struct CompleteResponse {
    completed: FindingId,
    successor: FindingId,
}

/// Handle `vdt complete`.
pub async fn handle(
    args: &CompleteArgs,
    ctx: &VerdantContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let id = parse_finding_id(&args.id)?;
    let successor = ctx
        .complete_action(id)
        .await
        .with_context(|| format!("failed to complete action {id}"))?;
    output(
        &CompleteResponse {
            completed: id,
            successor,
        },
        flags.format,
    )
}
