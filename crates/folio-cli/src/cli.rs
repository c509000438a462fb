use clap::{Args, Parser, Subcommand, ValueEnum};
use folio_core::DocumentPatch;
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors (default)
    Warn,
    /// Completed mutations
    Info,
    /// Per-step traces
    Debug,
    /// Everything
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Output rendering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "folio - git-versioned case studies")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace).
    /// If not specified, uses FOLIO_LOG or the config file, defaulting to warn
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to ~/.config/folio/config.toml)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Repository root (overrides config file)
    #[arg(short = 'r', long, global = true)]
    pub repo: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every document
    List,

    /// Show one document
    Show { slug: String },

    /// Create a document and commit it
    Create {
        /// Slug; derived from the title when omitted
        #[arg(long)]
        slug: Option<String>,

        /// Start from an existing document file (frontmatter + body)
        #[arg(long)]
        from: Option<PathBuf>,

        #[command(flatten)]
        fields: DocumentArgs,
    },

    /// Change fields of a document and commit it
    Update {
        slug: String,

        /// JSON patch file; flags given on the command line win over it
        #[arg(long)]
        from: Option<PathBuf>,

        #[command(flatten)]
        fields: DocumentArgs,
    },

    /// Delete a document and commit the removal
    Delete { slug: String },

    /// Revisions of a document, newest first
    History {
        slug: String,

        /// Maximum revisions to show (defaults to history.limit)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Restore a document as of a revision, recorded as a new revision
    Rollback { slug: String, revision: String },

    /// Show a document as recorded in a revision
    ShowAt { slug: String, revision: String },

    /// Diff a revision of a document against the working file
    Diff { slug: String, revision: String },

    /// Documents whose working file differs from the last revision
    Status,
}

/// Field flags shared by `create` and `update`
#[derive(Args, Debug, Clone, Default)]
pub struct DocumentArgs {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// Headline metric
    #[arg(long)]
    pub metric: Option<String>,
    /// Tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    #[arg(long)]
    pub summary: Option<String>,
    #[arg(long)]
    pub background: Option<String>,
    #[arg(long)]
    pub solution: Option<String>,
    /// Key decision (repeatable)
    #[arg(long = "decision")]
    pub decisions: Vec<String>,
    /// Highlight (repeatable)
    #[arg(long = "highlight")]
    pub highlights: Vec<String>,
    #[arg(long)]
    pub results: Option<String>,
    /// Retrospective item (repeatable)
    #[arg(long = "retrospective")]
    pub retrospective: Vec<String>,
    /// Source link; pass "" to remove
    #[arg(long)]
    pub code_url: Option<String>,
    /// Demo link; pass "" to remove
    #[arg(long)]
    pub demo_url: Option<String>,
    /// Markdown body
    #[arg(long)]
    pub body: Option<String>,
}

impl DocumentArgs {
    /// Flags as a patch; list flags that were not given leave the list alone
    pub fn into_patch(self) -> DocumentPatch {
        fn list(values: Vec<String>) -> Option<Vec<String>> {
            (!values.is_empty()).then_some(values)
        }

        DocumentPatch {
            title: self.title,
            description: self.description,
            metric: self.metric,
            tags: list(self.tags),
            summary: self.summary,
            background: self.background,
            solution: self.solution,
            decisions: list(self.decisions),
            highlights: list(self.highlights),
            results: self.results,
            retrospective: list(self.retrospective),
            code_url: self.code_url,
            demo_url: self.demo_url,
            body: self.body,
            extra: Default::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_create_with_repeated_tags() {
        let cli = Cli::try_parse_from([
            "folio",
            "create",
            "--title",
            "Ising Model Simulator",
            "--tag",
            "physics",
            "--tag",
            "monte-carlo",
        ])
        .unwrap();

        let Commands::Create { slug, fields, .. } = cli.command else {
            panic!("expected create");
        };
        assert_eq!(slug, None);
        let patch = fields.into_patch();
        assert_eq!(patch.title.as_deref(), Some("Ising Model Simulator"));
        assert_eq!(
            patch.tags,
            Some(vec!["physics".to_string(), "monte-carlo".to_string()])
        );
        assert_eq!(patch.decisions, None);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["folio", "list", "--format", "json", "-v"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.verbose);
    }

    #[test]
    fn show_at_takes_slug_and_revision() {
        let cli = Cli::try_parse_from(["folio", "show-at", "ising-model", "abc1234"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::ShowAt { ref slug, ref revision } if slug == "ising-model" && revision == "abc1234"
        ));
    }
}
