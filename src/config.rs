//! Site configuration module.
//!
//! Handles loading and validating the optional `config.toml` at the posts
//! root. Configuration is threaded explicitly into every build step — nothing
//! outside `main` reads ambient process state.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! title = "My Personal Blog"
//! description = "A blog about my thoughts and experiences."
//! author = ""
//! base_url = "https://example.com"  # No trailing slash
//! base_path = ""                    # Path prefix for project-site deploys, e.g. "/blog"
//!
//! [images]
//! max_width = 1600          # Downscale cap in pixels (never upscales)
//! quality = 80              # WebP quality (1-100)
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse — override just the values you want. Unknown keys
//! are rejected to catch typos early.
//!
//! ## Deployment Base Path
//!
//! When the site is published under a sub-path (a project site rather than a
//! domain root), `base_path` is prefixed to every generated absolute URL.
//! `main` may override it once from the deployment environment (see
//! [`resolve_base_path`]); the resolved value travels inside [`SiteConfig`]
//! from there on.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site title, shown on the home page and in `<title>` suffixes.
    pub title: String,
    /// Site description for the home page and meta tags.
    pub description: String,
    /// Author name for article meta tags. Empty omits the tag.
    pub author: String,
    /// Canonical site origin, no trailing slash.
    pub base_url: String,
    /// Path prefix for project-site deploys (`""` or `"/name"`).
    pub base_path: String,
    /// Image optimization settings (width cap, quality).
    pub images: ImagesConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "My Personal Blog".to_string(),
            description: "A blog about my thoughts and experiences.".to_string(),
            author: String::new(),
            base_url: "https://example.com".to_string(),
            base_path: String::new(),
            images: ImagesConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.images.quality == 0 || self.images.quality > 100 {
            return Err(ConfigError::Validation(
                "images.quality must be 1-100".into(),
            ));
        }
        if self.images.max_width == 0 {
            return Err(ConfigError::Validation(
                "images.max_width must be non-zero".into(),
            ));
        }
        if self.base_url.is_empty() {
            return Err(ConfigError::Validation("base_url must not be empty".into()));
        }
        if self.base_url.ends_with('/') {
            return Err(ConfigError::Validation(
                "base_url must not end with a slash".into(),
            ));
        }
        if !self.base_path.is_empty() && !self.base_path.starts_with('/') {
            return Err(ConfigError::Validation(
                "base_path must start with a slash or be empty".into(),
            ));
        }
        Ok(())
    }

    /// Site origin plus path prefix, the base of every generated absolute URL.
    pub fn site_root(&self) -> String {
        format!("{}{}", self.base_url, self.base_path)
    }
}

/// Image optimization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Width cap in pixels; wider rasters are downscaled, narrower untouched.
    pub max_width: u32,
    /// WebP quality (1-100).
    pub quality: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            max_width: 1600,
            quality: 80,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Load configuration from `config.toml` in the posts root.
///
/// Missing file means defaults; a present file must parse and validate.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let path = root.join("config.toml");
    let config = if path.exists() {
        let content = fs::read_to_string(&path)?;
        toml::from_str(&content)?
    } else {
        SiteConfig::default()
    };
    config.validate()?;
    Ok(config)
}

/// Derive the deployment path prefix from environment variables.
///
/// `BLOG_BASE_PATH` wins when set. Otherwise a `GITHUB_REPOSITORY` of the
/// form `owner/name` yields `/name` for project sites; repositories named
/// `*.github.io` are user sites served from the domain root and yield `""`.
/// Returns `None` when neither variable applies, leaving `config.toml`
/// (or the default) in effect.
pub fn resolve_base_path(
    explicit: Option<&str>,
    github_repository: Option<&str>,
) -> Option<String> {
    if let Some(path) = explicit {
        let path = path.trim_end_matches('/');
        if path.is_empty() {
            return Some(String::new());
        }
        return Some(if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        });
    }

    let repo_name = github_repository?.split('/').nth(1)?;
    if repo_name.is_empty() || repo_name.ends_with(".github.io") {
        Some(String::new())
    } else {
        Some(format!("/{repo_name}"))
    }
}
