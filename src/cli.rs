use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "sentence-eval",
    version,
    about = "Human evaluation of generated sentences against reference sentences"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the store and its Data, Score and Finished sheets.
    Init(InitArgs),
    /// Append comparison items to the Data sheet from a JSON file.
    Import(ImportArgs),
    /// List groups that still need annotation.
    Groups(GroupsArgs),
    /// Run an interactive evaluation session.
    Annotate(AnnotateArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    #[arg(long, default_value = ".cache/sentence-eval")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// Workflow configuration (JSON). Defaults to `<cache-root>/workflow.json` when present.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl StoreArgs {
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.cache_root.join("annotations.sqlite"))
    }

    pub fn default_config_path(&self) -> PathBuf {
        self.cache_root.join("workflow.json")
    }
}

#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Write the effective configuration to `<cache-root>/workflow.json` if it is missing.
    #[arg(long, default_value_t = false)]
    pub write_config: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// JSON array of objects keyed by Data column name.
    #[arg(long)]
    pub input: PathBuf,

    /// Import even if an identical file was imported before.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct GroupsArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AnnotateArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Annotator name used when `load` is given only a group.
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}
