use std::error::Error;

use tracing::Level;
use tracing_subscriber::{Layer, filter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // A missing .env is fine: settings may come from the real environment.
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        return Err(e.into());
    }

    let filter = ai_llm_service::telemetry::env_filter_with_level("info", Level::INFO);

    // ai_llm_service events go through its own layer only.
    let app_layer = fmt::layer().with_target(false).with_filter(filter::filter_fn(|meta| {
        !meta.target().starts_with(ai_llm_service::telemetry::TARGET_PREFIX)
    }));

    tracing_subscriber::registry()
        .with(filter)
        .with(app_layer)
        .with(ai_llm_service::telemetry::layer())
        .try_init()?;

    api::start().await?;

    Ok(())
}
