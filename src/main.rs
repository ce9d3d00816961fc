use std::path::PathBuf;

use rawframe::http::response::{ResponseBuilder, StatusCode};
use rawframe::{Config, Dispatcher, Events, Reply, Response, Server, ServerEvent};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let cfg = Config::load(path.as_deref())?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .init();

    let (server, events) = Server::listen(&cfg).await?;
    let handler = tokio::spawn(answer_requests(events, server.dispatcher()));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    server.stop().await;
    handler.abort();

    Ok(())
}

/// Answers requests from the demo routes in [`respond`].
async fn answer_requests(mut events: Events, dispatcher: Dispatcher) {
    while let Some(event) = events.recv().await {
        match event {
            ServerEvent::RequestReady { id, request } => {
                let line = request.lines().next().unwrap_or_default();
                tracing::info!(id = %id, "{}", line);

                dispatcher.send(&Reply::new(id, respond(line)));
            }
            ServerEvent::ConnectionClosed { id } => {
                tracing::debug!(id = %id, "Connection closed");
            }
        }
    }
}

/// `GET /` echoes the request line, `GET /health` is empty, anything else
/// is refused.
fn respond(request_line: &str) -> Response {
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(path), Some(_version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Response::bad_request();
    };

    match (method, path) {
        ("GET", "/") => Response::ok(format!("Received: {}\n", request_line)),
        ("GET", "/health") => ResponseBuilder::new(StatusCode::NoContent).build(),
        ("GET", _) => Response::not_found(),
        _ => ResponseBuilder::new(StatusCode::MethodNotAllowed)
            .header("Allow", "GET")
            .build(),
    }
}
