//! Configuration file loading and error types.

use std::{fs, path::Path};

use crate::types::Config;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unsupported config format")]
    UnsupportedFormat,
    #[error("validation: {0}")]
    Validation(String),
}

pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)?;
    match path.extension().and_then(|s| s.to_str()).unwrap_or("") {
        "json" | "jsonc" => {
            let stripped = json_comments::StripComments::new(data.as_bytes());
            Ok(serde_json::from_reader(stripped)?)
        }
        "yaml" | "yml" => Ok(serde_yaml::from_str(&data)?),
        "toml" => Ok(toml::from_str(&data)?),
        _ => Err(ConfigError::UnsupportedFormat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(ext: &str, contents: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("genquota-config-test-{}.{}", std::process::id(), ext));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_toml_with_defaults() {
        let path = write_temp(
            "toml",
            r#"
[database]
url = "sqlite::memory:"

[limits]
anonymous = 3
"#,
        );
        let config = load_config(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.limits.anonymous, 3);
        // Unspecified fields fall back to defaults
        assert_eq!(config.limits.free_daily, 10);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_load_yaml() {
        let path = write_temp(
            "yaml",
            r#"
database:
  url: "postgres://localhost/quota"
rate_limit:
  generation_anonymous:
    limit: 2
    window_secs: 60
"#,
        );
        let config = load_config(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.rate_limit.generation_anonymous.limit, 2);
        assert_eq!(config.rate_limit.generation_paid.limit, 1000);
    }

    #[test]
    fn test_load_json_with_comments() {
        let path = write_temp(
            "json",
            r#"
{
    // inline comment
    "database": { "url": "sqlite:quota.db" }
}
"#,
        );
        let config = load_config(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.database.url, "sqlite:quota.db");
    }

    #[test]
    fn test_unsupported_extension() {
        let path = write_temp("ini", "database.url = x");
        let result = load_config(&path);
        fs::remove_file(&path).ok();

        assert!(matches!(result, Err(ConfigError::UnsupportedFormat)));
    }
}
