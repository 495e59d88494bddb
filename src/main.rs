use clap::Parser; // for cli
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use todo_gateway::config::Args;
use todo_gateway::state::AppState;
use todo_gateway::todos::TodoList;

// this is main async function with tokio
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // parse cli arguments
    let args = Args::parse();

    let todos = TodoList::load(&args.data)?;
    let state = Arc::new(AppState::from_args(todos, &args));
    let app = todo_gateway::app(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port)).await?;

    info!(port = args.port, "todo gateway listening");
    info!(
        limit = args.rate_limit,
        window_secs = args.rate_window,
        header = args.client_ip_header.as_str(),
        memory_store = args.memory_store,
        "rate limit configured; limiter connects on first request"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
