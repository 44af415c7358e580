use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;

use recap_server::{
    AppState, ServerArgs, create_router,
    logging::{LogFormat, init_tracing},
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = ServerArgs::parse();

    init_tracing(LogFormat::from_env());

    let pipeline = args.build_pipeline()?;

    // Requests probe again on their own; this only reports the setup early.
    let runner = pipeline.runner();
    match runner.check_available().await {
        Ok(version) => tracing::info!(
            binary = %runner.binary().display(),
            source = %runner.source(),
            %version,
            "Transcoder ready"
        ),
        Err(e) => tracing::warn!(
            binary = %runner.binary().display(),
            source = %runner.source(),
            error = %e,
            "Transcoder unavailable, uploads will fail until it is installed"
        ),
    }

    let state = AppState::new(pipeline, args.max_upload_bytes());
    let router = create_router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, max_upload_mb = args.max_upload_mb, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
