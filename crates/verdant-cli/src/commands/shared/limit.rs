use verdant_config::GeneralConfig;

/// A command's own limit beats the global `--limit`; the configured
/// default fills in and `general.max_limit` caps the result.
#[must_use]
pub fn effective_limit(local: Option<u32>, global: Option<u32>, general: &GeneralConfig) -> u32 {
    general.clamp_limit(local.or(global))
}
