use clap::Parser;

pub mod global;
pub mod root_commands;
pub mod subcommands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `vdt` binary.
#[derive(Debug, Parser)]
#[command(name = "vdt", version, about = "Verdant - offline conservation field assistant")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Max results to return
    #[arg(short, long, global = true)]
    pub limit: Option<u32>,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Finding store path (overrides `store.path`; `:memory:` for a scratch store)
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// Per-modality pipeline timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,
}

impl Cli {
    /// Extract ergonomic global flags struct for command handlers.
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            limit: self.limit,
            quiet: self.quiet,
            verbose: self.verbose,
            store: self.store.clone(),
            timeout_ms: self.timeout_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::subcommands::PrefCommands;
    use super::{Cli, Commands, OutputFormat};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_before_and_after_subcommand() {
        let cli = Cli::try_parse_from(["vdt", "--format", "raw", "--limit", "5", "stats"])
            .expect("cli should parse");
        assert_eq!(cli.format, OutputFormat::Raw);
        assert_eq!(cli.limit, Some(5));
        assert!(matches!(cli.command, Commands::Stats));

        let cli = Cli::try_parse_from(["vdt", "stats", "--store", ":memory:", "--quiet"])
            .expect("cli should parse");
        assert!(cli.quiet);
        assert_eq!(cli.global_flags().store.as_deref(), Some(":memory:"));
    }

    #[test]
    fn output_format_rejects_table() {
        assert!(Cli::try_parse_from(["vdt", "--format", "table", "stats"]).is_err());
    }

    #[test]
    fn audio_requires_duration() {
        assert!(Cli::try_parse_from(["vdt", "audio", "dawn.wav"]).is_err());

        let cli = Cli::try_parse_from([
            "vdt",
            "audio",
            "dawn.wav",
            "--duration",
            "45",
            "--lat",
            "12.9",
            "--lng",
            "77.6",
            "--place",
            "Urban Park",
        ])
        .expect("cli should parse");
        let Commands::Audio(args) = cli.command else {
            panic!("expected audio");
        };
        assert!((args.duration - 45.0).abs() < f64::EPSILON);
        assert_eq!(args.request.location.place.as_deref(), Some("Urban Park"));
    }

    #[test]
    fn pref_set_takes_key_and_value() {
        let cli = Cli::try_parse_from(["vdt", "pref", "set", "units", "metric"])
            .expect("cli should parse");
        assert!(matches!(
            cli.command,
            Commands::Pref {
                action: PrefCommands::Set { ref key, ref value }
            } if key == "units" && value == "metric"
        ));
    }
}
