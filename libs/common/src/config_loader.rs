//! Layered configuration loading
//!
//! Priority (lowest to highest):
//! 1. `T::default()`
//! 2. optional config file (TOML, YAML or JSON, chosen by extension)
//! 3. environment variables with the given prefix

use std::path::Path;

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

/// Build the figment for `T` without extracting it
pub fn figment_for<T>(file: Option<&Path>, env_prefix: &str) -> Figment
where
    T: Serialize + Default,
{
    let mut figment = Figment::from(Serialized::defaults(T::default()));

    if let Some(path) = file {
        if path.exists() {
            debug!("Loading config file: {}", path.display());
            figment = match path.extension().and_then(|e| e.to_str()) {
                Some("yaml") | Some("yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        } else {
            warn!("Config file not found, using defaults: {}", path.display());
        }
    }

    figment.merge(Env::prefixed(env_prefix))
}

/// Load `T` from defaults, an optional file and prefixed environment variables
///
/// # Arguments
/// * `file` - Config file path; a missing file is skipped with a warning
/// * `env_prefix` - Environment prefix, e.g. `PLUGIN_STATE_`
pub fn load_layered<T>(file: Option<&Path>, env_prefix: &str) -> Result<T, figment::Error>
where
    T: Serialize + DeserializeOwned + Default,
{
    figment_for::<T>(file, env_prefix).extract()
}

/// Treat blank strings as absent
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    struct Sample {
        name: Option<String>,
        port: u16,
    }

    #[test]
    fn test_defaults_only() {
        let loaded: Sample = load_layered(None, "COMMON_TEST_DEFAULTS_").unwrap();
        assert_eq!(loaded, Sample::default());
    }

    #[test]
    fn test_file_then_env() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "name = \"from-file\"\nport = 8848").unwrap();

        let loaded: Sample = load_layered(Some(file.path()), "COMMON_TEST_LAYERED_").unwrap();
        assert_eq!(loaded.name.as_deref(), Some("from-file"));
        assert_eq!(loaded.port, 8848);

        std::env::set_var("COMMON_TEST_LAYERED_PORT", "9848");
        let loaded: Sample = load_layered(Some(file.path()), "COMMON_TEST_LAYERED_").unwrap();
        std::env::remove_var("COMMON_TEST_LAYERED_PORT");
        assert_eq!(loaded.port, 9848);
    }

    #[test]
    fn test_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "name: yaml\nport: 1").unwrap();
        let loaded: Sample = load_layered(Some(file.path()), "COMMON_TEST_YAML_").unwrap();
        assert_eq!(loaded.name.as_deref(), Some("yaml"));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let loaded: Sample =
            load_layered(Some(Path::new("/nonexistent/x.toml")), "COMMON_TEST_MISSING_").unwrap();
        assert_eq!(loaded.port, 0);
    }

    #[test]
    fn test_bad_value_is_error() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();
        assert!(load_layered::<Sample>(Some(file.path()), "COMMON_TEST_BAD_").is_err());
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  mysql ")), Some("mysql"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
