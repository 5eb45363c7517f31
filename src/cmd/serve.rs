//! `aurora serve`.

use anyhow::Result;

use aurora_genesis::config::Config;
use aurora_genesis::server::start_server;

pub async fn cmd_serve(config: &Config) -> Result<()> {
    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }
    start_server(config).await
}
