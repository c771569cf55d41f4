use serde::Serialize;
use vest_config::VestConfig;

use crate::cli::GlobalFlags;
use crate::output;

#[derive(Debug, Serialize)]
struct MigrateReport {
    database: String,
    tables: Vec<String>,
}

pub async fn handle(config: &VestConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let service = super::open_service(config).await?;
    let tables = service.db().table_names().await?;
    let database = if service.db().is_remote() {
        config.database.url.clone()
    } else {
        config.database.path.clone()
    };
    tracing::info!(%database, tables = tables.len(), "migrations applied");
    output::print(&MigrateReport { database, tables }, flags.format)
}
