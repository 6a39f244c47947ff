use anyhow::Result;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::load_config;
use crate::schema::finished_groups;
use crate::store::{DataStore, SqliteStore};
use crate::workflow::Workflow;

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = args.store.resolved_db_path();
    info!(cache_root = %args.store.cache_root.display(), "status requested");

    if !db_path.exists() {
        warn!(path = %db_path.display(), "database file missing, run `init` first");
        return Ok(());
    }

    let config = load_config(&args.store)?;
    let workflow = Workflow::new(SqliteStore::open(&db_path)?, config);
    let store = workflow.store().inner();
    let config = workflow.config();

    info!(
        path = %db_path.display(),
        db_schema_version = %store.metadata("db_schema_version")?.unwrap_or_default(),
        db_updated_at = %store.metadata("db_updated_at")?.unwrap_or_default(),
        ranking_enabled = config.ranking_enabled,
        "database status"
    );

    let mut missing = false;
    for sheet in [&config.tables.data, &config.tables.score, &config.tables.finished] {
        if store.header(sheet)?.is_none() {
            warn!(sheet = %sheet, "sheet missing");
            missing = true;
            continue;
        }
        info!(sheet = %sheet, rows = store.row_count(sheet)?, "sheet status");
    }
    if missing {
        return Ok(());
    }

    let finished_records = store.read_table(&config.tables.finished)?;
    let finished = finished_groups(&config.tables.finished, &finished_records, &config.columns)?;
    let loadable = workflow.loadable_groups()?;

    info!(
        loadable_groups = loadable.len(),
        loadable_items = loadable.values().sum::<usize>(),
        finished_groups = finished.len(),
        "annotation progress"
    );
    Ok(())
}
