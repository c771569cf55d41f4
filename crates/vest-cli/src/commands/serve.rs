use anyhow::Context;
use vest_config::VestConfig;
use vest_server::AppState;

use crate::cli::ServeArgs;

pub async fn handle(args: &ServeArgs, mut config: VestConfig) -> anyhow::Result<()> {
    if let Some(host) = &args.host {
        config.server.host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config
        .auth
        .validate()
        .context("refusing to serve: set VEST_AUTH__JWT_SECRET to at least 32 random bytes")?;

    let addr = config.server.bind_addr();
    let state = AppState::from_config(config)
        .await
        .context("failed to initialize the API")?;
    vest_server::serve(state, &addr)
        .await
        .with_context(|| format!("server on {addr} failed"))
}
