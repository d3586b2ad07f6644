use clap::{Args, Subcommand};

use crate::cli::subcommands::{CatalogueCommands, PrefCommands};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Identify the species in an image capture.
    Image(ImageArgs),
    /// Analyze a soundscape recording.
    Audio(AudioArgs),
    /// Assess habitat health from an image, a recording, or both.
    Ecosystem(EcosystemArgs),
    /// List recorded findings, newest first.
    Findings(FindingsArgs),
    /// Show one finding by id.
    Show(ShowArgs),
    /// Aggregate statistics over all findings.
    Stats,
    /// Mark a conservation action as completed.
    Complete(CompleteArgs),
    /// Delete every finding and preference.
    Erase(EraseArgs),
    /// User preferences.
    Pref {
        #[command(subcommand)]
        action: PrefCommands,
    },
    /// Reference catalogue.
    Catalogue {
        #[command(subcommand)]
        action: CatalogueCommands,
    },
    /// List the registered model variants.
    Models,
    /// Print the JSON schema of an output type.
    Schema(SchemaArgs),
}

/// Device, accuracy and location options shared by processing commands.
#[derive(Clone, Debug, Args)]
pub struct RequestArgs {
    /// Remaining battery as a fraction in [0, 1]
    #[arg(long, default_value_t = 1.0)]
    pub battery: f64,

    /// Device is charging
    #[arg(long)]
    pub plugged_in: bool,

    /// Accuracy requirement: low, standard, high
    #[arg(long, default_value = "standard")]
    pub accuracy: String,

    #[command(flatten)]
    pub location: LocationArgs,
}

/// Capture location. Latitude, longitude and place are given together or not at all.
#[derive(Clone, Debug, Default, Args)]
pub struct LocationArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub lat: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    pub lng: Option<f64>,

    /// Human-readable place name
    #[arg(long)]
    pub place: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct ImageArgs {
    /// Opaque image reference (path or handle)
    pub media: String,

    #[command(flatten)]
    pub request: RequestArgs,
}

#[derive(Clone, Debug, Args)]
pub struct AudioArgs {
    /// Opaque audio reference (path or handle)
    pub media: String,

    /// Recording length in seconds
    #[arg(long)]
    pub duration: f64,

    #[command(flatten)]
    pub request: RequestArgs,
}

#[derive(Clone, Debug, Args)]
pub struct EcosystemArgs {
    /// Image reference
    #[arg(long)]
    pub image: Option<String>,

    /// Audio reference
    #[arg(long)]
    pub audio: Option<String>,

    #[command(flatten)]
    pub request: RequestArgs,
}

#[derive(Clone, Debug, Args)]
pub struct FindingsArgs {
    /// Finding kind: discovery, audio, ecosystem, action
    #[arg(long)]
    pub kind: Option<String>,

    /// Only findings referencing this catalogue subject
    #[arg(long)]
    pub subject: Option<String>,

    /// Also list actions superseded by a completion
    #[arg(long)]
    pub all: bool,

    /// Rows to skip
    #[arg(long, default_value_t = 0)]
    pub offset: u32,

    /// Max results (overrides the global --limit)
    #[arg(long = "max")]
    pub max: Option<u32>,
}

#[derive(Clone, Debug, Args)]
pub struct ShowArgs {
    /// Finding id, e.g. `dis-3`
    pub id: String,
}

#[derive(Clone, Debug, Args)]
pub struct CompleteArgs {
    /// Action id, e.g. `act-7`
    pub id: String,
}

#[derive(Clone, Debug, Args)]
pub struct EraseArgs {
    /// Required; erasing is irreversible
    #[arg(long)]
    pub yes: bool,
}

#[derive(Clone, Debug, Args)]
pub struct SchemaArgs {
    /// Type name: subject, finding, action, stats, recommended-action
    pub type_name: String,
}
