//! TOML configuration for building a [`LayeredFs`].
//!
//! ```toml
//! [policy]
//! tolerance = "best-effort"
//! directory_mode = "overlay"
//!
//! [[layers]]
//! kind = "local"
//! path = "./overrides"
//!
//! [[layers]]
//! kind = "local"
//! path = "/usr/share/app/defaults"
//! ```
//!
//! Layers are listed highest priority first.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layered::LayeredFs;
use crate::local::LocalFs;
use crate::policy::ResolutionPolicy;
use crate::traits::Filesystem;

/// Errors from loading a [`LayerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// One layer in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", deny_unknown_fields)]
pub enum LayerSource {
    /// A directory on the host, served by [`LocalFs`].
    Local { path: PathBuf },
}

impl LayerSource {
    fn build(&self) -> Arc<dyn Filesystem> {
        match self {
            LayerSource::Local { path } => Arc::new(LocalFs::new(path)),
        }
    }

    fn rebase(&mut self, base: &Path) {
        match self {
            LayerSource::Local { path } if path.is_relative() => *path = base.join(&*path),
            LayerSource::Local { .. } => {}
        }
    }
}

/// Policy plus ordered layer list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayerConfig {
    pub policy: ResolutionPolicy,
    pub layers: Vec<LayerSource>,
}

impl LayerConfig {
    /// Parse a configuration. Relative layer paths are kept as written.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a configuration file.
    ///
    /// Relative layer paths are resolved against the file's directory.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let mut config = Self::from_toml_str(&content)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        for layer in &mut config.layers {
            layer.rebase(base);
        }

        tracing::debug!(
            path = %path.display(),
            layers = config.layers.len(),
            "loaded layer config"
        );
        Ok(config)
    }

    /// Append a host directory as the lowest-priority layer.
    pub fn push_local(&mut self, path: impl Into<PathBuf>) {
        self.layers.push(LayerSource::Local { path: path.into() });
    }

    /// Instantiate the providers and compose them.
    pub fn build(&self) -> LayeredFs {
        LayeredFs::new(self.layers.iter().map(LayerSource::build), self.policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{DirectoryMode, Tolerance};
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_is_default() {
        let config = LayerConfig::from_toml_str("").unwrap();
        assert_eq!(config, LayerConfig::default());
        assert!(config.build().is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let config = LayerConfig::from_toml_str(
            r#"
[policy]
tolerance = "best-effort"
directory_mode = "overlay"

[[layers]]
kind = "local"
path = "overrides"

[[layers]]
kind = "local"
path = "/srv/defaults"
"#,
        )
        .unwrap();

        assert_eq!(config.policy.tolerance, Tolerance::BestEffort);
        assert_eq!(config.policy.directory_mode, DirectoryMode::Overlay);
        assert_eq!(
            config.layers,
            vec![
                LayerSource::Local {
                    path: PathBuf::from("overrides")
                },
                LayerSource::Local {
                    path: PathBuf::from("/srv/defaults")
                },
            ]
        );
        assert_eq!(config.build().len(), 2);
    }

    #[test]
    fn test_unknown_layer_kind_rejected() {
        let err = LayerConfig::from_toml_str(
            r#"
[[layers]]
kind = "ftp"
path = "x"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(LayerConfig::from_toml_str("layer = []").is_err());
    }

    #[test]
    fn test_push_local_appends_lowest_priority() {
        let mut config = LayerConfig::default();
        config.push_local("a");
        config.push_local("b");
        assert_eq!(
            config.layers.last(),
            Some(&LayerSource::Local {
                path: PathBuf::from("b")
            })
        );
    }

    #[tokio::test]
    async fn test_load_rebases_relative_paths() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("overrides")).unwrap();
        std::fs::write(dir.path().join("overrides/a.txt"), b"override").unwrap();
        let config_path = dir.path().join("layers.toml");
        std::fs::write(
            &config_path,
            "[[layers]]\nkind = \"local\"\npath = \"overrides\"\n",
        )
        .unwrap();

        let config = LayerConfig::load(&config_path).await.unwrap();
        assert_eq!(
            config.layers[0],
            LayerSource::Local {
                path: dir.path().join("overrides")
            }
        );
        let fs = config.build();
        assert_eq!(fs.read_file("a.txt").await.unwrap(), b"override");
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = LayerConfig::load("/definitely/not/here.toml").await.unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
