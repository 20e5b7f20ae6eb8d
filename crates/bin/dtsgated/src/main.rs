use anyhow::Context;
use dtsgated::Gateway;
use dtsgated::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    let filter = EnvFilter::try_new(&config.logging.filter).context("parsing log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let gateway = Gateway::new(&config.manager);
    gateway.add_devices(&config).context("building devices")?;
    if let Some(period) = config.logging.status_interval() {
        gateway.report_status_every(period);
    }
    tracing::info!(
        dts = config.dts.len(),
        relays = config.relay.len(),
        "dtsgated started"
    );

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    tracing::info!("shutdown requested");
    gateway.shutdown().await;

    Ok(())
}
