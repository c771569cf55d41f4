use vest_config::VestConfig;

use crate::cli::{GlobalFlags, IndexCommands};
use crate::output;

pub async fn handle(action: &IndexCommands, config: &VestConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let service = super::open_service(config).await?;
    match action {
        IndexCommands::List { all } => {
            let indices = service.list_indices(*all).await?;
            output::print(&indices, flags.format)
        }
    }
}
