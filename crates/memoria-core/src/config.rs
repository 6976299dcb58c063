//! Process-wide configuration, assembled once at startup from environment variables.
//!
//! Every recognized option lives under the `MEMORIA_` prefix (e.g. `MEMORIA_MAX_IMAGES`).
//! Unknown environment keys are ignored rather than rejected, matching the upstream service's
//! own permissive settings loader. `RUST_LOG` is read separately by the composition root for
//! `tracing-subscriber`'s `EnvFilter`, since logging is an ambient concern, not a builder limit.

use std::env;
use std::path::PathBuf;

use directories::ProjectDirs;
use thiserror::Error;

const ENV_PREFIX: &str = "MEMORIA_";

/// Errors that can occur while assembling [`Config`] from the environment.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{key} must be a positive integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("could not determine a default index directory for this platform")]
    NoDefaultIndexDir,
}

/// Builder limits, caption control, embedding provider settings, and persisted-state paths.
///
/// Defaults, where `SPEC_FULL.md` is silent, are taken from the upstream `Settings` defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub max_tags: usize,
    pub max_images: usize,
    pub max_attachments: usize,
    pub attachment_snippet_len: usize,
    pub attachment_text_max_len: usize,

    pub use_image_caption: bool,
    pub image_caption_model: String,
    pub vision_provider: String,

    pub jina_text_model: String,
    pub jina_image_model: String,
    pub jina_api_key: Option<String>,

    pub memos_base_url: Option<String>,
    pub memos_session_cookie: Option<String>,

    pub index_base_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_tags: 5,
            max_images: 3,
            max_attachments: 5,
            attachment_snippet_len: 200,
            attachment_text_max_len: 4000,
            use_image_caption: true,
            image_caption_model: "qwen3-vl-plus".to_string(),
            vision_provider: "qwen".to_string(),
            jina_text_model: "jina-embeddings-v3".to_string(),
            jina_image_model: "jina-embeddings-v4".to_string(),
            jina_api_key: None,
            memos_base_url: None,
            memos_session_cookie: None,
            index_base_dir: default_index_base_dir().unwrap_or_else(|| PathBuf::from(".memoria")),
        }
    }
}

impl Config {
    /// Reads every recognized `MEMORIA_*` environment variable, falling back to defaults for
    /// anything unset. Numeric fields are validated; an invalid value is an error, not a panic.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(v) = env_usize("MAX_TAGS")? {
            config.max_tags = v;
        }
        if let Some(v) = env_usize("MAX_IMAGES")? {
            config.max_images = v;
        }
        if let Some(v) = env_usize("MAX_ATTACHMENTS")? {
            config.max_attachments = v;
        }
        if let Some(v) = env_usize("ATTACHMENT_SNIPPET_LEN")? {
            config.attachment_snippet_len = v;
        }
        if let Some(v) = env_usize("ATTACHMENT_TEXT_MAX_LEN")? {
            config.attachment_text_max_len = v;
        }
        if let Some(v) = env_var("USE_IMAGE_CAPTION") {
            config.use_image_caption = matches!(v.as_str(), "1" | "true" | "yes");
        }
        if let Some(v) = env_var("IMAGE_CAPTION_MODEL") {
            config.image_caption_model = v;
        }
        if let Some(v) = env_var("VISION_PROVIDER") {
            config.vision_provider = v;
        }
        if let Some(v) = env_var("JINA_TEXT_MODEL") {
            config.jina_text_model = v;
        }
        if let Some(v) = env_var("JINA_IMAGE_MODEL") {
            config.jina_image_model = v;
        }
        config.jina_api_key = env_var("JINA_API_KEY");
        config.memos_base_url = env_var("MEMOS_BASE_URL");
        config.memos_session_cookie = env_var("MEMOS_SESSION_COOKIE");
        if let Some(v) = env_var("INDEX_BASE_DIR") {
            config.index_base_dir = PathBuf::from(v);
        }

        Ok(config)
    }

    pub fn text_store_dir(&self) -> PathBuf {
        self.index_base_dir.join("text")
    }

    pub fn image_store_dir(&self) -> PathBuf {
        self.index_base_dir.join("image")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.text_store_dir().join("memo_vector_map.json")
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}{name}")).ok().filter(|v| !v.is_empty())
}

fn env_usize(name: &'static str) -> Result<Option<usize>, ConfigError> {
    match env_var(name) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { key: name, value: raw }),
    }
}

fn default_index_base_dir() -> Option<PathBuf> {
    ProjectDirs::from("dev", "memoria", "memoria").map(|dirs| dirs.data_dir().join("index"))
}
