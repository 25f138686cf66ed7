use anyhow::Result;
use clap::Parser;
use meeting_scribe::{create_router, AppState, Config};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "meeting-scribe", about = "Streaming meeting transcription pipeline")]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/meeting-scribe")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v0.1.0", cfg.service.name);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let state = AppState::new(cfg);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Control API listening on {}", addr);
    axum::serve(listener, router).await?;

    Ok(())
}
