use std::path::Path;

/// Environment type enumeration
#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Local,
    Development,
    Staging,
    Production,
    Testing,
    Custom(String),
}

impl Environment {
    /// Detect environment from APP_ENV or default to Local
    pub fn detect() -> Self {
        match std::env::var("APP_ENV").ok().as_deref() {
            Some("production") => Self::Production,
            Some("staging") => Self::Staging,
            Some("development") => Self::Development,
            Some("testing") => Self::Testing,
            Some("local") | None => Self::Local,
            Some(other) => Self::Custom(other.to_string()),
        }
    }

    /// Get the .env file suffix for this environment
    pub fn env_file_suffix(&self) -> Option<&str> {
        match self {
            Self::Local => Some("local"),
            Self::Production => Some("production"),
            Self::Staging => Some("staging"),
            Self::Development => Some("development"),
            Self::Testing => Some("testing"),
            Self::Custom(name) => Some(name.as_str()),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Development => write!(f, "development"),
            Self::Staging => write!(f, "staging"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
            Self::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// Load `.env` files for the detected environment
///
/// Files are read most specific first and never overwrite a variable that is
/// already set, so process variables beat `.env.{env}.local`, which beats
/// `.env.{env}`, `.env.local` and finally `.env`.
pub fn load_dotenv(project_root: &Path) -> Environment {
    let env = Environment::detect();

    let mut files = Vec::new();
    if let Some(suffix) = env.env_file_suffix() {
        files.push(format!(".env.{}.local", suffix));
        files.push(format!(".env.{}", suffix));
    }
    files.push(".env.local".to_string());
    files.push(".env".to_string());

    for file in files {
        match dotenvy::from_path(project_root.join(&file)) {
            Ok(_) => tracing::debug!(file = %file, "loaded env file"),
            Err(err) if err.not_found() => {}
            Err(err) => tracing::warn!(file = %file, error = %err, "failed to load env file"),
        }
    }

    env
}

/// Get an environment variable with a default value
///
/// # Example
/// ```no_run
/// use jsonprop::config::env;
///
/// let port: u16 = env("SERVER_PORT", 8080);
/// let treat_empty = env("BINDING_TREAT_EMPTY_AS_DEFAULT", false);
/// ```
pub fn env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Get an optional environment variable
///
/// # Example
/// ```no_run
/// use jsonprop::config::env_optional;
///
/// let limit: Option<usize> = env_optional("BINDING_MAX_MODEL_ERRORS");
/// ```
pub fn env_optional<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Parse a boolean flag the way `.env` files usually spell them
///
/// Accepts `true`/`false`, `1`/`0`, `yes`/`no` and `on`/`off`, case-insensitively.
pub fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| parse_flag(&v))
        .unwrap_or(default)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag_variants() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" on "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("No"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_env_falls_back_on_unparseable_value() {
        std::env::set_var("JSONPROP_TEST_PORT", "not-a-port");
        let port: u16 = env("JSONPROP_TEST_PORT", 8080);
        assert_eq!(port, 8080);
        std::env::remove_var("JSONPROP_TEST_PORT");
    }

    #[test]
    fn test_environment_display_matches_suffix() {
        assert_eq!(Environment::Production.to_string(), "production");
        assert_eq!(Environment::Testing.env_file_suffix(), Some("testing"));
    }
}
