//! Configuration for the binding pipeline and the HTTP server
//!
//! Settings come from `.env` files and process environment variables and
//! are kept in a typed repository:
//! - `AppConfig` for the application name, environment and debug flag
//! - `ServerConfig` for the listener and request body handling
//! - `BindingOptions` for the input formatter list and binding policy
//!
//! # Example
//!
//! ```rust,no_run
//! use jsonprop::{Config, ServerConfig};
//!
//! Config::init(std::path::Path::new("."));
//!
//! let server = Config::get::<ServerConfig>().unwrap();
//! assert!(server.max_body_size > 0);
//! ```

pub mod env;
pub mod providers;
pub mod repository;

pub use env::{env, env_flag, env_optional, load_dotenv, Environment};
pub use providers::{AppConfig, AppConfigBuilder, ServerConfig, ServerConfigBuilder};

use crate::binding::BindingOptions;
use std::path::Path;

/// Facade over the global config repository
pub struct Config;

impl Config {
    /// Load `.env` files and register the default configs
    ///
    /// Call once at startup, before building the server. Configs registered
    /// earlier with [`Config::register`] are replaced by the env-derived ones.
    pub fn init(project_root: &Path) -> Environment {
        let env = env::load_dotenv(project_root);

        repository::register(AppConfig::from_env());
        repository::register(ServerConfig::from_env());
        repository::register(BindingOptions::from_env());

        tracing::debug!(environment = %env, "configuration loaded");
        env
    }

    /// Get a typed config struct from the repository
    pub fn get<T: std::any::Any + Send + Sync + Clone + 'static>() -> Option<T> {
        repository::get::<T>()
    }

    /// Register or replace a config struct
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use jsonprop::{Config, ServerConfig};
    ///
    /// Config::register(ServerConfig::builder().port(3000).build());
    /// ```
    pub fn register<T: std::any::Any + Send + Sync + 'static>(config: T) {
        repository::register(config);
    }

    /// Check if a config type is registered
    pub fn has<T: std::any::Any + 'static>() -> bool {
        repository::has::<T>()
    }

    /// Get the current environment
    pub fn environment() -> Environment {
        Config::get::<AppConfig>()
            .map(|c| c.environment)
            .unwrap_or_else(Environment::detect)
    }

    /// Check if debug mode is enabled
    pub fn is_debug() -> bool {
        Config::get::<AppConfig>().map(|c| c.debug).unwrap_or(true)
    }
}
