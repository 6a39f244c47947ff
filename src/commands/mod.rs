use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::StoreArgs;
use crate::config::WorkflowConfig;
use crate::store::SqliteStore;
use crate::util::ensure_parent_directory;

pub mod annotate;
pub mod groups;
pub mod import;
pub mod init;
pub mod status;

pub(crate) fn load_config(args: &StoreArgs) -> Result<WorkflowConfig> {
    let config = WorkflowConfig::load(args.config.as_deref(), &args.default_config_path())?;
    debug!(
        ranking_enabled = config.ranking_enabled,
        cache_ttl_secs = config.cache_ttl_secs,
        "loaded workflow configuration"
    );
    Ok(config)
}

pub(crate) fn open_store(args: &StoreArgs) -> Result<(SqliteStore, WorkflowConfig)> {
    let config = load_config(args)?;
    let db_path = args.resolved_db_path();
    ensure_parent_directory(&db_path)?;
    let store = SqliteStore::open(&db_path)?;
    prepare_sheets(&store, &config)?;
    Ok((store, config))
}

/// Creates missing sheets; existing sheets must match the configured headers.
pub(crate) fn prepare_sheets(store: &SqliteStore, config: &WorkflowConfig) -> Result<()> {
    let sheets = [
        (&config.tables.data, config.columns.data_header()),
        (&config.tables.score, config.columns.score_header()),
        (&config.tables.finished, config.columns.finished_header()),
    ];

    for (name, header) in sheets {
        let created = store
            .ensure_sheet(name, &header)
            .with_context(|| format!("failed to prepare sheet {name}"))?;
        if created {
            info!(sheet = %name, columns = header.len(), "created sheet");
        }
    }
    Ok(())
}
