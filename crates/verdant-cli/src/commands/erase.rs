use anyhow::{Context, bail};
use serde::Serialize;
use verdant_engine::VerdantContext;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::EraseArgs;
use crate::output::output;

#[derive(Serialize)]
struct EraseResponse {
    deleted: u64,
}

/// Handle `vdt erase`.
pub async fn handle(
    args: &EraseArgs,
    ctx: &VerdantContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    if !args.yes {
        bail!("refusing to erase all findings without --yes");
    }
    let deleted = ctx.erase_all().await.context("failed to erase findings")?;
    tracing::info!(deleted, "all findings and preferences erased");
    output(&EraseResponse { deleted }, flags.format)
}
