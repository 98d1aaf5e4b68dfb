use jsonprop::{Binding, Config, Server};
use tracing_subscriber::EnvFilter;

mod controllers;
mod routes;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    Config::init(std::path::Path::new("."));
    Binding::enable_json_properties();

    Server::from_config(routes::router()).run().await
}
