use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use std::sync::Arc;
use techfood_auth::AppResources;
use techfood_auth::api::start_webserver;
use techfood_auth::config::load_config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_standard_tracing() {
    let default_directives = "techfood_auth=info,tower_http=info,sea_orm=warn";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let registry = tracing_subscriber::registry().with(env_filter);
    let layer = fmt::layer().with_target(true).with_level(true);

    registry.with(layer).init();
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;

    // A missing .env is fine; real deployments use the environment directly.
    dotenvy::dotenv().ok();

    initialize_standard_tracing();

    let config = Arc::new(load_config()?);
    tracing::info!(
        listen_addr = %config.listen_addr,
        base_path = %config.base_path,
        issuer = %config.authentication.jwt.issuer,
        audience = %config.authentication.jwt.audience,
        usage_write_failure_fatal = config.authentication.usage_write_failure_fatal,
        "configuration loaded"
    );

    let db = Arc::new(Database::connect(&config.database_url).await?);

    if config.run_migrations {
        Migrator::up(db.as_ref(), None).await?;
        tracing::info!("database migrations applied");
    }

    start_webserver(AppResources { db, config }).await?;
    Ok(())
}
