use anyhow::Result;
use folio_core::history::short_id;

use super::Context;
use crate::cli::OutputFormat;
use crate::output;

pub async fn history(ctx: &Context, slug: &str, limit: Option<usize>) -> Result<String> {
    let limit = limit.unwrap_or(ctx.history_limit);
    let revisions = ctx.store.list_history_limited(&ctx.cap, slug, limit).await?;
    output::revisions(ctx.format, slug, &revisions)
}

pub async fn rollback(ctx: &Context, slug: &str, revision: &str) -> Result<String> {
    let doc = ctx.store.rollback(&ctx.cap, slug, revision).await?;
    let rendered = output::document(ctx.format, slug, &doc)?;
    Ok(match ctx.format {
        OutputFormat::Json => rendered,
        OutputFormat::Table => {
            format!("Rolled back {slug} to {}\n\n{rendered}", short_id(revision))
        }
    })
}

pub async fn show_at(ctx: &Context, slug: &str, revision: &str) -> Result<String> {
    let doc = ctx.store.content_at(&ctx.cap, slug, revision).await?;
    output::document(ctx.format, slug, &doc)
}

pub async fn diff(ctx: &Context, slug: &str, revision: &str) -> Result<String> {
    let diff = ctx.store.diff(&ctx.cap, slug, revision).await?;
    output::diff(ctx.format, &diff)
}
