use cspnet::config::{ServerConfig, set_config};
use cspnet::net::server::Server;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env();
    // a policy that cannot be built would fail every page, refuse to start instead
    let policy = config.csp.validate(config.development)?;
    tracing::info!(development = config.development, %policy, "content security policy");
    set_config(config)?;

    async_std::task::block_on(async {
        let server = Server::bind().await?;
        server.run().await
    })?;
    Ok(())
}
