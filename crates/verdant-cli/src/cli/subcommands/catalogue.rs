use clap::Subcommand;

/// Reference catalogue commands.
#[derive(Clone, Debug, Subcommand)]
pub enum CatalogueCommands {
    /// Show one subject by id.
    Get { id: String },
    /// Case-insensitive search over names and categories.
    Search { text: String },
}
