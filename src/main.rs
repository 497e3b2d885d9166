use chirpy::configuration::get_configuration;
use chirpy::error::ConfigError;
use chirpy::startup::{run, Stores};
use chirpy::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting Chirpy");

    let configuration = get_configuration()
        .map_err(ConfigError::from)
        .and_then(|settings| settings.validate().map(|_| settings))
        .map_err(|e| {
            tracing::error!("Failed to read configuration: {}", e);
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "Configuration error")
        })?;

    tracing::info!(
        platform = %configuration.application.platform,
        "Configuration loaded successfully"
    );

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to run migrations: {}", e);
            std::io::Error::new(std::io::ErrorKind::Other, "Migration error")
        })?;

    let stores = Stores::postgres(pool, configuration.jwt.refresh_token_lifetime());

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, &configuration, stores)?.await
}
