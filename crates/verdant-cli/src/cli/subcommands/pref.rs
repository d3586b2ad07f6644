use clap::Subcommand;

/// User preference commands.
#[derive(Clone, Debug, Subcommand)]
pub enum PrefCommands {
    /// Read a preference.
    Get { key: String },
    /// Insert or overwrite a preference.
    Set { key: String, value: String },
}
