use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use folio_core::{document, Document, DocumentPatch, ErrorKind, Slug};
use tracing::warn;

use super::Context;
use crate::cli::DocumentArgs;
use crate::output::{self, Change, Listing};

pub fn list(ctx: &Context) -> Result<String> {
    let mut rows = Vec::new();
    for slug in ctx.store.list(&ctx.cap)? {
        let doc = match ctx.store.read(&ctx.cap, slug.as_str()) {
            Ok(doc) => Some(doc),
            Err(e) if e.kind() == ErrorKind::MalformedDocument => {
                warn!(slug = %slug, error = %e, "Skipping unreadable document");
                None
            }
            Err(e) => return Err(e.into()),
        };
        rows.push(Listing::new(slug, doc.as_ref()));
    }
    output::listings(ctx.format, &rows)
}

pub fn show(ctx: &Context, slug: &str) -> Result<String> {
    let doc = ctx.store.read(&ctx.cap, slug)?;
    output::document(ctx.format, slug, &doc)
}

pub async fn create(
    ctx: &Context,
    slug: Option<String>,
    from: Option<PathBuf>,
    fields: DocumentArgs,
) -> Result<String> {
    let mut doc = match from {
        Some(path) => {
            let raw = std::fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            document::decode(&raw)
                .with_context(|| format!("{} is not a valid document", path.display()))?
        }
        None => Document::default(),
    };
    fields.into_patch().apply_to(&mut doc);

    let slug = match slug {
        Some(slug) => slug,
        None => Slug::from_title(doc.title())
            .context("cannot derive a slug from the title; pass --slug")?
            .into(),
    };
    let revision = ctx.store.create(&ctx.cap, &slug, doc).await?;
    output::change(
        ctx.format,
        &Change {
            action: "Created",
            slug: &slug,
            revision: revision.as_ref(),
        },
    )
}

pub async fn update(
    ctx: &Context,
    slug: &str,
    from: Option<PathBuf>,
    fields: DocumentArgs,
) -> Result<String> {
    let base = match from {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a valid JSON patch", path.display()))?
        }
        None => DocumentPatch::default(),
    };
    let patch = overlay(base, fields.into_patch());
    if patch.is_empty() {
        bail!("nothing to update; pass a field flag or --from");
    }

    let revision = ctx.store.update(&ctx.cap, slug, patch).await?;
    output::change(
        ctx.format,
        &Change {
            action: "Updated",
            slug,
            revision: revision.as_ref(),
        },
    )
}

pub async fn delete(ctx: &Context, slug: &str) -> Result<String> {
    let revision = ctx.store.delete(&ctx.cap, slug).await?;
    output::change(
        ctx.format,
        &Change {
            action: "Deleted",
            slug,
            revision: revision.as_ref(),
        },
    )
}

/// `top` wins field by field; extra keys from both are kept
fn overlay(base: DocumentPatch, top: DocumentPatch) -> DocumentPatch {
    let mut extra = base.extra;
    extra.extend(top.extra);
    DocumentPatch {
        title: top.title.or(base.title),
        description: top.description.or(base.description),
        metric: top.metric.or(base.metric),
        tags: top.tags.or(base.tags),
        summary: top.summary.or(base.summary),
        background: top.background.or(base.background),
        solution: top.solution.or(base.solution),
        decisions: top.decisions.or(base.decisions),
        highlights: top.highlights.or(base.highlights),
        results: top.results.or(base.results),
        retrospective: top.retrospective.or(base.retrospective),
        code_url: top.code_url.or(base.code_url),
        demo_url: top.demo_url.or(base.demo_url),
        body: top.body.or(base.body),
        extra,
    }
}
