use std::convert::Infallible;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::Server;
use kan_backend::{handle, AppState, Config};
use kan_model::{KanModel, ModelSource};
use log::{error, info, warn};
use structopt::StructOpt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = Config::from_args();

    let model = load_model(config.model_path.clone()).await;
    let state = Arc::new(AppState::new(model, &config)?);

    // A `MakeService` that produces a `Service` to handle each connection.
    let make_service = make_service_fn(move |_conn: &AddrStream| {
        let state = Arc::clone(&state);

        let service = service_fn(move |req| handle(req, Arc::clone(&state)));

        async move { Ok::<_, Infallible>(service) }
    });

    let server = Server::try_bind(&config.socket_addr())?.serve(make_service);
    info!("Kan AI Backend listening on http://{}", server.local_addr());

    if let Err(e) = server.with_graceful_shutdown(shutdown_signal()).await {
        error!("server error: {}", e);
    }

    Ok(())
}

/// Builds or loads the network off the async workers. A failure leaves the
/// service up with an uninitialized model so the other routes keep working.
async fn load_model(path: Option<PathBuf>) -> KanModel {
    match tokio::task::spawn_blocking(move || KanModel::new(path.as_deref())).await {
        Ok(Ok(model)) => {
            if let Some(ModelSource::Loaded(path)) = model.source() {
                info!("Serving model from {}", path.display());
            }
            model
        }
        Ok(Err(e)) => {
            error!("Could not initialise model: {}", e);
            KanModel::uninitialized()
        }
        Err(e) => {
            error!("Model initialisation panicked: {}", e);
            KanModel::uninitialized()
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not install Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
