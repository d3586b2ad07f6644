use anyhow::Context;
use verdant_engine::VerdantContext;

use crate::cli::GlobalFlags;
use crate::output::output;

/// Handle `vdt stats`.
pub async fn handle(ctx: &VerdantContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let stats = ctx.get_stats().await.context("failed to aggregate stats")?;
    output(&stats, flags.format)
}
