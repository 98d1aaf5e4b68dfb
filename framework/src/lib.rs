//! Bind handler parameters to named properties of a JSON request body
//!
//! ```rust,ignore
//! use jsonprop::{handler, json, Binding, Config, Response, Router, Server};
//!
//! #[handler]
//! pub async fn store(
//!     #[from_json_property] count: i32,
//!     #[from_json_property("user.name")] name: String,
//! ) -> Response {
//!     json(serde_json::json!({ "name": name, "count": count }))
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     Config::init(std::path::Path::new("."));
//!     Binding::enable_json_properties();
//!
//!     let router = Router::new().post("/orders", store);
//!     Server::from_config(router).run().await.unwrap();
//! }
//! ```

extern crate self as jsonprop;

pub mod binding;
pub mod config;
pub mod error;
pub mod http;
pub mod routing;
pub mod server;

pub use binding::{
    add_json_property_formatter, Binding, BindingOptions, BindingSource, FromJsonProperty,
    InputFormatter, JsonInputFormatter, JsonPropertyInputFormatter, ModelState, ParameterMetadata,
};
pub use config::{env, env_optional, AppConfig, Config, Environment, ServerConfig};
pub use error::{FrameworkError, ValidationErrors};
pub use http::{json, text, FromRequest, HttpResponse, Json, Request, Response, ResponseExt};
pub use routing::Router;
pub use server::Server;

pub use jsonprop_macros::handler;

// Used by code generated with `#[handler]`
#[doc(hidden)]
pub use inventory;
