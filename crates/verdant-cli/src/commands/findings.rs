use anyhow::Context;
use verdant_core::enums::FindingKind;
use verdant_db::FindingFilter;
use verdant_engine::VerdantContext;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::{FindingsArgs, ShowArgs};
use crate::commands::shared::limit::effective_limit;
use crate::commands::shared::parse::{parse_field, parse_finding_id};
use crate::output::output;

/// Handle `vdt findings`.
pub async fn handle_list(
    args: &FindingsArgs,
    ctx: &VerdantContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let kind = args
        .kind
        .as_deref()
        .map(|raw| parse_field::<FindingKind>(raw, "kind"))
        .transpose()?;
    let filter = FindingFilter {
        subject_ref: args.subject.clone(),
        include_superseded: args.all,
        ..FindingFilter::default()
    };
    let limit = effective_limit(args.max, flags.limit, &ctx.config().general);

    let findings = ctx
        .list_findings(kind, &filter, Some(limit), args.offset)
        .await
        .context("failed to list findings")?;
    output(&findings, flags.format)
}

/// Handle `vdt show`.
pub async fn handle_show(
    args: &ShowArgs,
    ctx: &VerdantContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let id = parse_finding_id(&args.id)?;
    let finding = ctx
        .get_finding(id)
        .await
        .with_context(|| format!("failed to read finding {id}"))?
        .with_context(|| format!("finding {id} not found"))?;
    output(&finding, flags.format)
}
