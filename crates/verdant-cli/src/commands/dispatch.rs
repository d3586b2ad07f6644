use verdant_engine::VerdantContext;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(
    command: Commands,
    ctx: &VerdantContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match command {
        Commands::Image(args) => commands::process::handle_image(args, ctx, flags).await,
        Commands::Audio(args) => commands::process::handle_audio(args, ctx, flags).await,
        Commands::Ecosystem(args) => commands::process::handle_ecosystem(args, ctx, flags).await,
        Commands::Findings(args) => commands::findings::handle_list(&args, ctx, flags).await,
        Commands::Show(args) => commands::findings::handle_show(&args, ctx, flags).await,
        Commands::Stats => commands::stats::handle(ctx, flags).await,
        Commands::Complete(args) => commands::complete::handle(&args, ctx, flags).await,
        Commands::Erase(args) => commands::erase::handle(&args, ctx, flags).await,
        Commands::Pref { action } => commands::pref::handle(&action, ctx, flags).await,
        Commands::Catalogue { action } => commands::catalogue::handle(&action, ctx, flags),
        Commands::Models => commands::models::handle(ctx, flags),
        Commands::Schema(_) => unreachable!("schema is pre-dispatched in main"),
    }
}
