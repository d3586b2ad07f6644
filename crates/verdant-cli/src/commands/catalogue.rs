use anyhow::Context;
use verdant_engine::VerdantContext;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::CatalogueCommands;
use crate::commands::shared::limit::effective_limit;
use crate::output::output;

/// Handle `vdt catalogue`.
pub fn handle(
    action: &CatalogueCommands,
    ctx: &VerdantContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        CatalogueCommands::Get { id } => {
            let subject = ctx
                .subject(id)
                .with_context(|| format!("subject '{id}' is not in the catalogue"))?;
            output(subject, flags.format)
        }
        CatalogueCommands::Search { text } => {
            let limit = effective_limit(None, flags.limit, &ctx.config().general);
            let hits: Vec<_> = ctx
                .search_subjects(text)
                .into_iter()
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .collect();
            output(&hits, flags.format)
        }
    }
}
