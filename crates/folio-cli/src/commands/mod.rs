//! Subcommand handlers. Each returns the text to print.

mod documents;
mod revisions;
mod status;

use anyhow::Result;
use folio_core::{Capability, ContentStore};

use crate::cli::{Commands, OutputFormat};
use crate::gate::LocalOperator;

/// Everything a handler needs for one invocation
pub struct Context {
    pub store: ContentStore,
    pub cap: Capability,
    pub format: OutputFormat,
    /// Default for `history --limit`
    pub history_limit: usize,
}

impl Context {
    pub fn new(store: ContentStore, format: OutputFormat, history_limit: usize) -> Result<Self> {
        Ok(Self {
            store,
            cap: Capability::grant(&LocalOperator)?,
            format,
            history_limit,
        })
    }
}

pub async fn execute(ctx: &Context, command: Commands) -> Result<String> {
    match command {
        Commands::List => documents::list(ctx),
        Commands::Show { slug } => documents::show(ctx, &slug),
        Commands::Create { slug, from, fields } => documents::create(ctx, slug, from, fields).await,
        Commands::Update { slug, from, fields } => documents::update(ctx, &slug, from, fields).await,
        Commands::Delete { slug } => documents::delete(ctx, &slug).await,
        Commands::History { slug, limit } => revisions::history(ctx, &slug, limit).await,
        Commands::Rollback { slug, revision } => revisions::rollback(ctx, &slug, &revision).await,
        Commands::ShowAt { slug, revision } => revisions::show_at(ctx, &slug, &revision).await,
        Commands::Diff { slug, revision } => revisions::diff(ctx, &slug, &revision).await,
        Commands::Status => status::execute(ctx).await,
    }
}
