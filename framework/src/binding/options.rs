//! Binding options and the global binder

use super::{BodyModelBinder, FormatterCollection, JsonInputFormatter, JsonPropertyInputFormatter};
use super::model_state::DEFAULT_MAX_MODEL_ERRORS;
use crate::config::{env, env_flag, Config, ServerConfig};
use std::sync::{Arc, OnceLock};

/// Settings of the body binding pipeline
///
/// Environment variables:
/// - `BINDING_TREAT_EMPTY_AS_DEFAULT` - bind JSON `null` when the body has no
///   value for a parameter (default: false)
/// - `BINDING_MAX_MODEL_ERRORS` - errors kept per request (default: 200)
#[derive(Debug, Clone)]
pub struct BindingOptions {
    /// Input formatters, asked in order
    pub formatters: FormatterCollection,
    pub treat_empty_input_as_default: bool,
    pub max_model_errors: usize,
}

impl BindingOptions {
    pub fn from_env() -> Self {
        Self {
            treat_empty_input_as_default: env_flag("BINDING_TREAT_EMPTY_AS_DEFAULT", false),
            max_model_errors: env("BINDING_MAX_MODEL_ERRORS", DEFAULT_MAX_MODEL_ERRORS),
            ..Self::default()
        }
    }
}

impl Default for BindingOptions {
    fn default() -> Self {
        let mut formatters = FormatterCollection::new();
        formatters.push(JsonInputFormatter::new());
        Self {
            formatters,
            treat_empty_input_as_default: false,
            max_model_errors: DEFAULT_MAX_MODEL_ERRORS,
        }
    }
}

/// Register the JSON-property formatter ahead of every other formatter
///
/// Also turns on synchronous body access, which the formatter needs to parse
/// the buffered body. Calling it twice changes nothing.
pub fn add_json_property_formatter(options: &mut BindingOptions, server: &mut ServerConfig) {
    if !options.formatters.contains("JsonPropertyInputFormatter") {
        options.formatters.insert(0, JsonPropertyInputFormatter::new());
    }
    server.allow_synchronous_io = true;
}

static BINDER: OnceLock<Arc<BodyModelBinder>> = OnceLock::new();

/// Global access to the model binder
///
/// The binder is built from the registered [`BindingOptions`] the first time
/// it is used and never changes afterwards.
pub struct Binding;

impl Binding {
    /// Enable `#[from_json_property]` on the registered configuration
    ///
    /// Call after [`Config::init`] and before the server starts.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use jsonprop::{Binding, Config};
    ///
    /// Config::init(std::path::Path::new("."));
    /// Binding::enable_json_properties();
    /// ```
    pub fn enable_json_properties() {
        let mut options = Config::get::<BindingOptions>().unwrap_or_else(BindingOptions::from_env);
        let mut server = Config::get::<ServerConfig>().unwrap_or_else(ServerConfig::from_env);
        add_json_property_formatter(&mut options, &mut server);
        Config::register(options);
        Config::register(server);

        if BINDER.get().is_some() {
            tracing::warn!("binder already initialized; JSON property formatter takes effect on restart");
        }
    }

    /// Build the global binder from the registered options
    pub fn init() -> Arc<BodyModelBinder> {
        BINDER
            .get_or_init(|| {
                let options = Config::get::<BindingOptions>().unwrap_or_else(BindingOptions::from_env);
                tracing::debug!(formatters = ?options.formatters, "model binder initialized");
                Arc::new(BodyModelBinder::new(&options))
            })
            .clone()
    }

    pub fn binder() -> Arc<BodyModelBinder> {
        Self::init()
    }
}
