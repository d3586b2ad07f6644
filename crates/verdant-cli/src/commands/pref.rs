use anyhow::Context;
use serde::Serialize;
use verdant_engine::VerdantContext;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::PrefCommands;
use crate::output::output;

#[derive(Serialize)]
struct PreferenceResponse<'a> {
    key: &'a str,
    value: Option<String>,
}

/// Handle `vdt pref`.
pub async fn handle(
    action: &PrefCommands,
    ctx: &VerdantContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        PrefCommands::Get { key } => {
            let value = ctx
                .get_preference(key)
                .await
                .with_context(|| format!("failed to read preference '{key}'"))?;
            output(&PreferenceResponse { key, value }, flags.format)
        }
        PrefCommands::Set { key, value } => {
            ctx.set_preference(key, value)
                .await
                .with_context(|| format!("failed to write preference '{key}'"))?;
            output(
                &PreferenceResponse {
                    key,
                    value: Some(value.clone()),
                },
                flags.format,
            )
        }
    }
}
