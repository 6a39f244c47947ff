use anyhow::Result;
use tracing::info;

use crate::cli::InitArgs;
use crate::commands::open_store;
use crate::util::write_json_pretty;

pub fn run(args: InitArgs) -> Result<()> {
    let db_path = args.store.resolved_db_path();
    info!(db_path = %db_path.display(), "initializing store");

    let (store, config) = open_store(&args.store)?;

    if args.write_config {
        let config_path = args.store.default_config_path();
        if config_path.exists() {
            info!(path = %config_path.display(), "configuration already present, leaving it");
        } else {
            write_json_pretty(&config_path, &config)?;
            info!(path = %config_path.display(), "wrote workflow configuration");
        }
    }

    info!(
        data_rows = store.row_count(&config.tables.data)?,
        score_rows = store.row_count(&config.tables.score)?,
        finished_rows = store.row_count(&config.tables.finished)?,
        "store ready"
    );
    Ok(())
}
