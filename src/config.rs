use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the hosted platform.
    pub url: String,
    /// Public access key sent with every request.
    pub key: String,
}

impl Config {
    /// Optional TOML file under the home directory, then environment
    /// overrides; the environment wins.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Config::default(),
        };
        config.apply_overrides(
            std::env::var("PLAZA_REMOTE_URL").ok(),
            std::env::var("PLAZA_REMOTE_KEY").ok(),
        );
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".plaza").join("config.toml"))
    }

    pub fn apply_overrides(&mut self, url: Option<String>, key: Option<String>) {
        if let Some(url) = url {
            self.remote.url = url;
        }
        if let Some(key) = key {
            self.remote.key = key;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.remote.url.trim().is_empty() {
            anyhow::bail!("Remote endpoint URL is not configured (PLAZA_REMOTE_URL)");
        }
        if self.remote.key.trim().is_empty() {
            anyhow::bail!("Remote access key is not configured (PLAZA_REMOTE_KEY)");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_are_read() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[remote]
url = "https://example.invalid"
key = "public-key"
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.remote.url, "https://example.invalid");
        assert_eq!(config.remote.key, "public-key");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn environment_overrides_beat_file_values() {
        let mut config = Config {
            remote: RemoteConfig {
                url: "https://from-file.invalid".to_string(),
                key: "file-key".to_string(),
            },
        };
        config.apply_overrides(Some("https://from-env.invalid".to_string()), None);
        assert_eq!(config.remote.url, "https://from-env.invalid");
        assert_eq!(config.remote.key, "file-key");
    }

    #[test]
    fn missing_key_is_a_hard_error() {
        let config = Config {
            remote: RemoteConfig {
                url: "https://example.invalid".to_string(),
                key: String::new(),
            },
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("PLAZA_REMOTE_KEY"));
    }
}
