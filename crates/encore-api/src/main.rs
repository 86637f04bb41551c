use encore_core::Config;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    encore_api::telemetry::init_telemetry();

    // Root token for every background component. Cancelled by the shutdown
    // signal handler; schedulers stop polling, pools drain, in-flight jobs
    // observe it through their own context.
    let cancel = CancellationToken::new();

    let (_state, router) = encore_api::setup::initialize_app(config.clone(), cancel.clone()).await?;

    encore_api::setup::server::start_server(&config, router, cancel).await?;

    Ok(())
}
