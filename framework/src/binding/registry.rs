//! Registry of handler parameter metadata
//!
//! `#[handler]` submits one [`HandlerParameterEntry`] per annotated
//! parameter. The server registers them all before it accepts connections,
//! so a misconfigured parameter stops startup instead of failing a request.

use super::metadata::{ParameterKey, ParameterMetadata};
use crate::error::FrameworkError;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

/// Compile-time declaration of one handler parameter
pub struct HandlerParameterEntry {
    /// Full path of the handler function
    pub handler: &'static str,
    pub parameter: &'static str,
    pub build: fn() -> ParameterMetadata,
}

inventory::collect!(HandlerParameterEntry);

/// Parameter metadata keyed by handler and parameter name
#[derive(Debug, Default)]
pub struct BindingRegistry {
    parameters: HashMap<ParameterKey, Arc<ParameterMetadata>>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store `metadata`
    ///
    /// Registering an identical declaration again returns the stored entry.
    /// A second, different declaration of the same parameter is an error.
    pub fn register(&mut self, metadata: ParameterMetadata) -> Result<Arc<ParameterMetadata>, FrameworkError> {
        metadata.validate()?;

        if let Some(existing) = self.parameters.get(&metadata.key()) {
            if existing.same_binding(&metadata) {
                return Ok(existing.clone());
            }
            return Err(FrameworkError::configuration(format!(
                "parameter {} is declared twice with different bindings",
                metadata.key()
            )));
        }

        let metadata = Arc::new(metadata);
        self.parameters.insert(metadata.key(), metadata.clone());
        Ok(metadata)
    }

    pub fn lookup(&self, handler: &'static str, parameter: &'static str) -> Option<Arc<ParameterMetadata>> {
        self.parameters
            .get(&ParameterKey { handler, parameter })
            .cloned()
    }

    /// Re-check every stored parameter
    pub fn validate_all(&self) -> Result<(), FrameworkError> {
        self.parameters.values().try_for_each(|metadata| metadata.validate())
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

static REGISTRY: OnceLock<RwLock<BindingRegistry>> = OnceLock::new();

fn registry() -> &'static RwLock<BindingRegistry> {
    REGISTRY.get_or_init(|| RwLock::new(BindingRegistry::new()))
}

fn poisoned() -> FrameworkError {
    FrameworkError::internal("binding registry lock poisoned")
}

/// Register parameter metadata in the global registry
pub fn register(metadata: ParameterMetadata) -> Result<Arc<ParameterMetadata>, FrameworkError> {
    registry().write().map_err(|_| poisoned())?.register(metadata)
}

/// Look up registered parameter metadata
pub fn lookup(handler: &'static str, parameter: &'static str) -> Option<Arc<ParameterMetadata>> {
    registry().read().ok()?.lookup(handler, parameter)
}

/// The registered metadata of a parameter, registering it on first use
pub fn resolve_parameter(
    handler: &'static str,
    parameter: &'static str,
    build: fn() -> ParameterMetadata,
) -> Result<Arc<ParameterMetadata>, FrameworkError> {
    match lookup(handler, parameter) {
        Some(metadata) => Ok(metadata),
        None => register(build()),
    }
}

/// Register every parameter declared with `#[handler]`
///
/// Returns the number of registered parameters, or the first configuration
/// error.
pub fn register_handler_parameters() -> Result<usize, FrameworkError> {
    let mut count = 0;
    for entry in inventory::iter::<HandlerParameterEntry> {
        let metadata = (entry.build)();
        tracing::debug!(
            handler = entry.handler,
            parameter = entry.parameter,
            source = ?metadata.binding_source(),
            "registering handler parameter"
        );
        register(metadata)?;
        count += 1;
    }
    registry().read().map_err(|_| poisoned())?.validate_all()?;
    Ok(count)
}
