//! Product Search Main Entry Point
//!
//! Runs the catalog event pipeline and the HTTP search API in one process.

use std::env;

use dotenv::dotenv;
use product_search::server::{self, AppState};
use product_search::{Dependencies, ServiceError, Settings};
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() -> Result<(), ServiceError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("product_search=info,product_search_repository=info,tower_http=info")
    });

    let json = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()
            .map_err(|e| ServiceError::config(e.to_string()))?;

        info!(
            service_name = "product-search",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .try_init()
            .map_err(|e| ServiceError::config(e.to_string()))?;

        info!(
            service_name = "product-search",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing()?;

    info!("Starting product search service");

    let settings = Settings::from_env();

    let deps = match Dependencies::new(&settings).await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    if settings.warmup_enabled {
        let processor = deps.processor.clone();
        let page_size = settings.warmup_page_size;
        tokio::spawn(async move {
            if let Err(e) = processor.rebuild_indexes(page_size).await {
                warn!(error = %e, "Index rebuild failed; indexes fill from new events only");
            }
        });
    }

    // The server stops on Ctrl-C or when the pipeline exits; the pipeline stops when
    // the server does.
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let app = server::create_app(AppState { query: deps.query });
    let addr = settings.server_addr;
    let mut server_handle = tokio::spawn(async move {
        server::run_server(app, addr, async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = stop_rx => {}
            }
        })
        .await
    });

    let orchestrator = deps.orchestrator;
    let pipeline = orchestrator.run();
    tokio::pin!(pipeline);

    let (pipeline_result, server_result) = tokio::select! {
        result = &mut pipeline => {
            let _ = stop_tx.send(());
            (result, server_outcome(server_handle.await))
        }
        joined = &mut server_handle => {
            let server_result = server_outcome(joined);
            if let Err(e) = &server_result {
                error!(error = %e, "HTTP server failed, stopping the pipeline");
            }
            orchestrator.shutdown();
            (pipeline.await, server_result)
        }
    };

    match pipeline_result {
        Ok(()) => {
            info!("Product search service stopped");
            server_result
        }
        Err(e) => {
            error!(error = %e, "Product search pipeline failed");
            Err(e.into())
        }
    }
}

fn server_outcome(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), ServiceError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ServiceError::server(e.to_string())),
        Err(e) => Err(ServiceError::server(format!("Server task failed: {}", e))),
    }
}
