//! recipe-relay HTTP server
//!
//! Starts an Axum web server that relays prompts to the upstream AI services.

use clap::Parser;
use recipe_relay::{
    cli::{Cli, Command, generate_config_template},
    config::{Config, Credentials},
    handlers::AppState,
    server, telemetry,
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = cli.command {
        let template = generate_config_template();
        match output {
            Some(path) => {
                std::fs::write(&path, template)?;
                println!("Wrote configuration template to {}", path);
            }
            None => print!("{}", template),
        }
        return Ok(());
    }

    // A missing .env is normal in production
    let _ = dotenv::dotenv();

    let config_missing = !Path::new(&cli.config).exists();
    let config = if config_missing {
        Config::default()
    } else {
        Config::from_file(&cli.config)?
    };

    telemetry::init(&config.observability.log_level);

    if config_missing {
        tracing::warn!(path = %cli.config, "Config file not found, using defaults");
    }

    let credentials = Credentials::from_env();
    credentials.warn_missing();

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .unwrap_or_else(|_| std::net::IpAddr::from([0, 0, 0, 0])),
        config.server.port,
    ));

    let state = AppState::new(Arc::new(config), credentials)?;
    let app = server::build_router(state);

    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    Ok(())
}
