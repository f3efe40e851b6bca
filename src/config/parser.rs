use crate::config::env::{apply_env, process_env};
use crate::config::types::Config;
use crate::ConfigError;
use std::path::Path;

/// Loads the run configuration from an optional campaign file and the process environment
///
/// Layering, lowest precedence first: built-in defaults, the TOML campaign
/// file, environment variables. The result is not validated; call
/// [`validate`](crate::config::validate) once command-line overrides have
/// been applied.
///
/// # Arguments
///
/// * `path` - Optional path to a TOML campaign file
///
/// # Returns
///
/// * `Ok(Config)` - The merged configuration
/// * `Err(ConfigError)` - Failed to read or parse the file, or an environment value is invalid
///
/// # Example
///
/// ```no_run
/// use sponsor_scout::config::load_config;
/// use std::path::Path;
///
/// let config = load_config(Some(Path::new("campaign.toml"))).unwrap();
/// println!("Writing leads to {}", config.output.path);
/// ```
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    load_config_with_env(path, process_env)
}

/// Same as [`load_config`] but reads environment values through `lookup`
pub fn load_config_with_env<F>(path: Option<&Path>, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            parse_config(&content)?
        }
        None => Config::default(),
    };

    apply_env(&mut config, lookup)?;

    Ok(config)
}

/// Parses a TOML campaign document
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    Ok(config)
}
