use vest_config::VestConfig;

use crate::cli::GlobalFlags;
use crate::output;

pub async fn handle(config: &VestConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let service = super::open_service(config).await?;
    output::print(&service.platform_stats().await?, flags.format)
}
