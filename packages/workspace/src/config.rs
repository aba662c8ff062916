use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_NAME: &str = "sitecraft.config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Sitecraft configuration file format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Page template, relative to the project root
    #[serde(default = "default_template_path")]
    pub template_path: String,

    /// Directory holding the preview and production snapshots
    #[serde(default = "default_content_dir")]
    pub content_dir: String,

    /// Directory backing the blob store, one subdirectory per container
    #[serde(default = "default_blob_dir")]
    pub blob_dir: String,

    /// Prefix of public blob URLs
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    #[serde(default = "default_site_container")]
    pub site_container: String,

    #[serde(default = "default_image_container")]
    pub image_container: String,

    /// Where the in-process builder writes `index.html`
    #[serde(default = "default_out_dir")]
    pub out_dir: String,

    /// External build command; the in-process compiler is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,

    #[serde(default = "default_build_timeout_secs")]
    pub build_timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<ReviewsConfig>,

    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewsConfig {
    pub place_id: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_reviews_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_reviews_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_reviews_limit")]
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_template_path() -> String {
    "site/index.html".to_string()
}

fn default_content_dir() -> String {
    "content".to_string()
}

fn default_blob_dir() -> String {
    "blobs".to_string()
}

fn default_public_base_url() -> String {
    "/assets".to_string()
}

fn default_site_container() -> String {
    "site".to_string()
}

fn default_image_container() -> String {
    "images".to_string()
}

fn default_out_dir() -> String {
    "dist".to_string()
}

fn default_build_timeout_secs() -> u64 {
    120
}

fn default_api_key_env() -> String {
    "GOOGLE_PLACES_API_KEY".to_string()
}

fn default_reviews_endpoint() -> String {
    "https://maps.googleapis.com/maps/api/place/details/json".to_string()
}

fn default_reviews_timeout_secs() -> u64 {
    10
}

fn default_reviews_limit() -> usize {
    5
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3030
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template_path: default_template_path(),
            content_dir: default_content_dir(),
            blob_dir: default_blob_dir(),
            public_base_url: default_public_base_url(),
            site_container: default_site_container(),
            image_container: default_image_container(),
            out_dir: default_out_dir(),
            build_command: None,
            build_timeout_secs: default_build_timeout_secs(),
            reviews: None,
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a directory. A missing file yields the defaults.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(DEFAULT_CONFIG_NAME);
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn template_path(&self, root: &Path) -> PathBuf {
        root.join(&self.template_path)
    }

    pub fn content_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.content_dir)
    }

    pub fn blob_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.blob_dir)
    }

    pub fn out_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.out_dir)
    }
}
