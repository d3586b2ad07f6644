use verdant_config::VerdantConfig;

use crate::cli::GlobalFlags;

/// Load layered configuration (`.env`, TOML files, `VERDANT_*`), then apply
/// command-line overrides.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<VerdantConfig> {
    let mut config = VerdantConfig::load_with_dotenv()?;
    if let Some(store) = &flags.store {
        config.store.path.clone_from(store);
    }
    if let Some(timeout_ms) = flags.timeout_ms {
        config.orchestrator.modality_timeout_ms = timeout_ms;
    }
    config.validate()?;
    Ok(config)
}
