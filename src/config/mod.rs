//! Configuration loading, validation, and hot-reloading.
//!
//! Defines the [`ConfigSource`] trait for pluggable config backends,
//! the [`ConfigResolver`] for primary/fallback source resolution, and
//! the [`ConfigVersion`] enum for change detection. Submodules provide
//! the data model, validation logic, and concrete source implementations.

pub mod model;
pub mod sources;
pub mod validation;

use async_trait::async_trait;

use crate::error::GatewayError;
use model::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigVersion {
    Hash(String),
}

impl ConfigVersion {
    /// First eight characters of the hash, for humans.
    #[must_use]
    pub fn short(&self) -> &str {
        match self {
            Self::Hash(h) => h.get(..8).unwrap_or(h),
        }
    }
}

// async_trait is required here because ConfigSource is used as Box<dyn ConfigSource>
// and native async fn in traits (Rust 1.75+) does not support dyn dispatch.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn load(&self) -> Result<(Config, ConfigVersion), GatewayError>;
    async fn has_changed(&self, current: &ConfigVersion) -> Result<bool, GatewayError>;
}

pub struct ConfigResolver {
    primary: Box<dyn ConfigSource>,
    fallback: Option<Box<dyn ConfigSource>>,
}

impl ConfigResolver {
    #[must_use]
    pub fn new(primary: Box<dyn ConfigSource>, fallback: Option<Box<dyn ConfigSource>>) -> Self {
        Self { primary, fallback }
    }

    pub async fn load_with_fallback(&self) -> Result<(Config, ConfigVersion), GatewayError> {
        match self.primary.load().await {
            Ok(result) => Ok(result),
            Err(primary_err) => {
                if let Some(ref fallback) = self.fallback {
                    tracing::warn!(
                        primary = self.primary.name(),
                        fallback = fallback.name(),
                        error = %primary_err,
                        "primary config source failed, using fallback"
                    );
                    fallback.load().await
                } else {
                    Err(primary_err)
                }
            }
        }
    }

    #[must_use]
    pub fn primary_name(&self) -> &str {
        self.primary.name()
    }

    #[must_use]
    pub fn primary(&self) -> &dyn ConfigSource {
        &*self.primary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<&'static str, ()>);

    #[async_trait]
    impl ConfigSource for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn load(&self) -> Result<(Config, ConfigVersion), GatewayError> {
            match self.0 {
                Ok(path) => {
                    let json = format!(r#"{{"routes": [{{"path": "{path}", "upstream": "http://a:80"}}]}}"#);
                    let config = serde_json::from_str(&json).map_err(|e| GatewayError::ConfigParse {
                        path: "fixed".into(),
                        source: Box::new(e),
                    })?;
                    Ok((config, ConfigVersion::Hash("0123456789abcdef".into())))
                }
                Err(()) => Err(GatewayError::NoConfigSource { hint: "down".into() }),
            }
        }

        async fn has_changed(&self, _current: &ConfigVersion) -> Result<bool, GatewayError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn fallback_is_used_when_primary_fails() {
        let resolver = ConfigResolver::new(Box::new(Fixed(Err(()))), Some(Box::new(Fixed(Ok("/fb")))));
        let (config, _) = resolver.load_with_fallback().await.unwrap();
        assert_eq!(config.routes[0].path, "/fb");
    }

    #[tokio::test]
    async fn primary_error_surfaces_without_fallback() {
        let resolver = ConfigResolver::new(Box::new(Fixed(Err(()))), None);
        assert!(resolver.load_with_fallback().await.is_err());
    }

    #[test]
    fn short_version_truncates_hash() {
        assert_eq!(ConfigVersion::Hash("0123456789abcdef".into()).short(), "01234567");
        assert_eq!(ConfigVersion::Hash("abc".into()).short(), "abc");
    }
}
