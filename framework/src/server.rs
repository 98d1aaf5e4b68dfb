use crate::binding::{register_handler_parameters, Binding};
use crate::config::{AppConfig, Config, ServerConfig};
use crate::error::FrameworkError;
use crate::http::{HttpResponse, Request};
use crate::routing::Router;
use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct Server {
    router: Arc<Router>,
    config: ServerConfig,
}

impl Server {
    pub fn new(router: impl Into<Router>) -> Self {
        Self {
            router: Arc::new(router.into()),
            config: ServerConfig::builder().host("127.0.0.1").port(8000).build(),
        }
    }

    /// Build a server from the registered [`ServerConfig`]
    ///
    /// Also builds the global model binder, so call it after the binding
    /// options have been configured.
    pub fn from_config(router: impl Into<Router>) -> Self {
        let config = Config::get::<ServerConfig>().unwrap_or_else(ServerConfig::from_env);
        Binding::init();

        Self {
            router: Arc::new(router.into()),
            config,
        }
    }

    pub fn host(mut self, host: &str) -> Self {
        self.config.host = host.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    fn get_addr(&self) -> Result<SocketAddr, FrameworkError> {
        let ip: IpAddr = self.config.host.parse().map_err(|_| {
            FrameworkError::configuration(format!("invalid server host '{}'", self.config.host))
        })?;
        Ok(SocketAddr::new(ip, self.config.port))
    }

    /// Register handler parameters, then serve until the listener fails
    ///
    /// A misconfigured `#[from_json_property]` parameter stops the server
    /// before it binds the port.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let parameters = register_handler_parameters().map_err(|err| {
            tracing::error!(error = %err, "invalid handler parameter configuration");
            err
        })?;

        let addr = self.get_addr()?;
        let listener = TcpListener::bind(addr).await?;

        let app = Config::get::<AppConfig>().unwrap_or_default();
        tracing::info!(app = %app.name, %addr, parameters, "server running on http://{}", addr);

        let router = self.router;
        let config = Arc::new(self.config);

        loop {
            let (stream, _) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let router = router.clone();
            let config = config.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
                    let router = router.clone();
                    let config = config.clone();
                    async move { Ok::<_, Infallible>(handle_request(router, config, req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::error!(error = ?err, "error serving connection");
                }
            });
        }
    }
}

async fn handle_request(
    router: Arc<Router>,
    config: Arc<ServerConfig>,
    req: hyper::Request<hyper::body::Incoming>,
) -> hyper::Response<Full<Bytes>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match router.match_route(&method, &path) {
        Some((handler, params)) => {
            let request = Request::new(req)
                .with_params(params)
                .with_server_config(&config);

            // Both Ok and Err carry a response
            let response = handler(request).await.unwrap_or_else(|e| e);
            tracing::debug!(%method, path, status = response.status_code(), "request handled");
            response.into_hyper()
        }
        None => HttpResponse::text("404 Not Found").status(404).into_hyper(),
    }
}
