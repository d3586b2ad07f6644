use anyhow::Context;
use tokio_util::sync::CancellationToken;
use verdant_core::entities::MediaRef;
use verdant_core::enums::AccuracyRequirement;
use verdant_core::location::Location;
use verdant_core::score::Score;
use verdant_engine::{EngineError, Processed, RequestOptions, VerdantContext};
use verdant_models::DeviceContext;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::{AudioArgs, EcosystemArgs, ImageArgs, RequestArgs};
use crate::commands::shared::parse::parse_field;
use crate::output::output;

/// Handle `vdt image`.
pub async fn handle_image(
    args: ImageArgs,
    ctx: &VerdantContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let (location, options) = request_parts(&args.request)?;
    let _guard = cancel_on_ctrl_c(&options.cancel);
    let result = ctx
        .process_image(MediaRef::new(args.media), location, &options)
        .await;
    finish(result, ctx, flags).await
}

/// Handle `vdt audio`.
pub async fn handle_audio(
    args: AudioArgs,
    ctx: &VerdantContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let (location, options) = request_parts(&args.request)?;
    let _guard = cancel_on_ctrl_c(&options.cancel);
    let result = ctx
        .process_audio(MediaRef::new(args.media), args.duration, location, &options)
        .await;
    finish(result, ctx, flags).await
}

/// Handle `vdt ecosystem`.
pub async fn handle_ecosystem(
    args: EcosystemArgs,
    ctx: &VerdantContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let (location, options) = request_parts(&args.request)?;
    let _guard = cancel_on_ctrl_c(&options.cancel);
    let result = ctx
        .process_ecosystem(
            args.image.map(MediaRef::new),
            args.audio.map(MediaRef::new),
            location,
            &options,
        )
        .await;
    finish(result, ctx, flags).await
}

/// Build the location and request options from shared command-line arguments.
pub fn request_parts(args: &RequestArgs) -> anyhow::Result<(Option<Location>, RequestOptions)> {
    let location = Location::from_parts(
        args.location.lat,
        args.location.lng,
        args.location.place.clone(),
    )
    .context("invalid --lat/--lng/--place")?;
    let battery_level = Score::new(args.battery).context("invalid --battery")?;
    let accuracy: AccuracyRequirement = parse_field(&args.accuracy, "accuracy")?;

    let options = RequestOptions {
        device: DeviceContext {
            battery_level,
            is_plugged_in: args.plugged_in,
            ..DeviceContext::default()
        },
        accuracy,
        cancel: CancellationToken::new(),
    };
    Ok((location, options))
}

/// Cancel `token` on Ctrl-C for as long as the returned guard lives.
fn cancel_on_ctrl_c(token: &CancellationToken) -> tokio_util::sync::DropGuard {
    let watcher = CancellationToken::new();
    let request = token.clone();
    let stop = watcher.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = stop.cancelled() => {}
            signal = tokio::signal::ctrl_c() => {
                if signal.is_ok() {
                    tracing::warn!("interrupt received, cancelling request");
                    request.cancel();
                }
            }
        }
    });
    watcher.drop_guard()
}

/// Print the processed result. A `PersistenceFailed` is retried once; rows the
/// store rejects arrive as a constraint violation instead and are not retried.
async fn finish(
    result: Result<Processed, EngineError>,
    ctx: &VerdantContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let processed = match result {
        Ok(processed) => processed,
        Err(error @ EngineError::PersistenceFailed { .. }) => {
            tracing::warn!(%error, "retrying write of computed result");
            let Some(pending) = error.into_pending() else {
                unreachable!("persistence failures carry their pending result");
            };
            ctx.retry_persist(pending)
                .await
                .context("failed to store finding")?
        }
        Err(error) => {
            let kind = error.kind();
            return Err(anyhow::Error::new(error).context(format!("request failed ({kind})")));
        }
    };
    output(&processed, flags.format)
}
