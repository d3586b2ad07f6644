use verdant_engine::VerdantContext;

use crate::cli::GlobalFlags;
use crate::output::output;

/// Handle `vdt models`.
pub fn handle(ctx: &VerdantContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    output(&ctx.variants(), flags.format)
}
