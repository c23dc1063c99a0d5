//! Async file-based config source with SHA-256 change detection.
//!
//! [`FileSource`] implements [`ConfigSource`] for any file format by
//! taking a deserialization function at construction time. The file is
//! read through Tokio, validated, and hashed so the reload loop can tell
//! when the route table changed.

use std::path::PathBuf;

use async_trait::async_trait;

use super::sha256_hex;
use crate::config::model::Config;
use crate::config::validation::validate;
use crate::config::{ConfigSource, ConfigVersion};
use crate::error::GatewayError;

pub struct FileSource {
    path: PathBuf,
    name: &'static str,
    deserialize: fn(&str) -> Result<Config, Box<dyn std::error::Error + Send + Sync>>,
}

impl FileSource {
    #[must_use]
    pub fn new(
        path: PathBuf,
        name: &'static str,
        deserialize: fn(&str) -> Result<Config, Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            path,
            name,
            deserialize,
        }
    }

    #[cfg(feature = "yaml")]
    #[must_use]
    pub fn yaml(path: PathBuf) -> Self {
        Self::new(path, "yaml", |content| {
            serde_yml::from_str::<Config>(content).map_err(boxed)
        })
    }

    #[cfg(feature = "json")]
    #[must_use]
    pub fn json(path: PathBuf) -> Self {
        Self::new(path, "json", |content| {
            serde_json::from_str::<Config>(content).map_err(boxed)
        })
    }

    #[cfg(feature = "toml")]
    #[must_use]
    pub fn toml(path: PathBuf) -> Self {
        Self::new(path, "toml", |content| {
            toml::from_str::<Config>(content).map_err(boxed)
        })
    }

    async fn read_content(&self) -> Result<String, GatewayError> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GatewayError::ConfigFileNotFound {
                    path: self.path.clone(),
                }
            } else {
                GatewayError::Io(e)
            }
        })
    }
}

#[allow(dead_code)]
fn boxed<E>(e: E) -> Box<dyn std::error::Error + Send + Sync>
where
    E: std::error::Error + Send + Sync + 'static,
{
    Box::new(e)
}

#[async_trait]
impl ConfigSource for FileSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn load(&self) -> Result<(Config, ConfigVersion), GatewayError> {
        let content = self.read_content().await?;

        let config = (self.deserialize)(&content).map_err(|e| GatewayError::ConfigParse {
            path: self.path.display().to_string(),
            source: e,
        })?;

        if let Err(errors) = validate(&config) {
            return Err(GatewayError::ConfigValidation { errors });
        }

        let hash = sha256_hex(content.as_bytes());
        Ok((config, ConfigVersion::Hash(hash)))
    }

    async fn has_changed(&self, current: &ConfigVersion) -> Result<bool, GatewayError> {
        let content = self.read_content().await?;
        let hash = sha256_hex(content.as_bytes());
        Ok(*current != ConfigVersion::Hash(hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_source(path: PathBuf) -> FileSource {
        FileSource::new(path, "json", |content| {
            serde_json::from_str::<Config>(content).map_err(boxed)
        })
    }

    fn scratch_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "tollgate-{}-{name}.json",
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&path, content).unwrap();
        path
    }

    const ROUTES: &str = r#"{"routes": [{"path": "/api/*", "upstream": "http://localhost:5001"}]}"#;

    #[tokio::test]
    async fn loads_validates_and_hashes() {
        let path = scratch_file("load", ROUTES);
        let (config, version) = json_source(path.clone()).load().await.unwrap();
        assert_eq!(config.routes.len(), 1);
        assert_eq!(version, ConfigVersion::Hash(sha256_hex(ROUTES.as_bytes())));
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn missing_file_is_reported_by_path() {
        let path = std::env::temp_dir().join("tollgate-definitely-missing.json");
        let err = json_source(path.clone()).load().await.unwrap_err();
        assert!(matches!(err, GatewayError::ConfigFileNotFound { path: ref p } if *p == path));
    }

    #[tokio::test]
    async fn invalid_routes_fail_validation() {
        let path = scratch_file("invalid", r#"{"routes": []}"#);
        let err = json_source(path.clone()).load().await.unwrap_err();
        assert!(matches!(err, GatewayError::ConfigValidation { .. }));
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn detects_changes_on_disk() {
        let path = scratch_file("change", ROUTES);
        let source = json_source(path.clone());
        let (_, version) = source.load().await.unwrap();
        assert!(!source.has_changed(&version).await.unwrap());

        std::fs::write(
            &path,
            r#"{"routes": [{"path": "/v2/*", "upstream": "http://localhost:5002"}]}"#,
        )
        .unwrap();
        assert!(source.has_changed(&version).await.unwrap());
        std::fs::remove_file(path).unwrap();
    }
}
