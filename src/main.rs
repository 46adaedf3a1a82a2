use realm_auth::configuration::get_configuration;
use realm_auth::startup::Application;
use realm_auth::telemetry::get_subscriber;
use realm_auth::telemetry::init_subscriber;

/// Initialise telemetry, load config, and serve until stopped
#[tokio::main] // requires tokio features: macros, rt-multi-thread
async fn main() -> Result<(), anyhow::Error> {
    let subscriber = get_subscriber("realm-auth", "info", std::io::stdout);
    init_subscriber(subscriber)?;

    let cfg = get_configuration()?;

    let app = Application::build(cfg).await?;
    match app.run_until_stopped().await {
        Ok(()) => tracing::info!("Server exited gracefully"),
        Err(e) => {
            tracing::error!(
                error.cause_chain = ?e,
                error.message = %e,
                "Server failed"
            );
            return Err(e.into());
        }
    }

    Ok(())
}
