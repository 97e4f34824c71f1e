//! Configuration module
//!
//! Configuration for the DAM connection, the caption service, intake limits
//! and pipeline behavior. Everything is read from the environment (a `.env`
//! file is honored) by [`IngestConfig::from_env`].

use std::env;
use std::fmt;
use std::time::Duration;

const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4-turbo";
const DEFAULT_MAX_TOKENS: u32 = 50;
const HTTP_TIMEOUT_SECS: u64 = 60;
const MAX_FILE_SIZE_MB: u64 = 5;

/// Connection settings for the DAM
#[derive(Clone)]
pub struct DamConfig {
    /// Host root; the token endpoint lives at `{base_url}/oauth/token`
    pub base_url: String,
    /// API root for upload, finalize and entity endpoints
    pub api_url: String,
    pub client_id: String,
    pub client_secret: String,
}

impl DamConfig {
    /// Build with the conventional API root of `{base_url}/api`.
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let api_url = format!("{}/api", base_url);
        Self {
            base_url,
            api_url,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for DamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DamConfig")
            .field("base_url", &self.base_url)
            .field("api_url", &self.api_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Settings for the vision completion endpoint
#[derive(Clone)]
pub struct CaptionConfig {
    pub api_key: String,
    /// API root; `/chat/completions` is appended
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
}

impl CaptionConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_OPENAI_API_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl fmt::Debug for CaptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptionConfig")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Limits applied to files before they may join a batch
#[derive(Clone, Debug)]
pub struct FileLimits {
    pub max_file_size_bytes: u64,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
}

impl Default for FileLimits {
    fn default() -> Self {
        Self {
            max_file_size_bytes: MAX_FILE_SIZE_MB * 1024 * 1024,
            allowed_extensions: parse_list("jpg,jpeg,png"),
            allowed_content_types: parse_list("image/jpeg,image/png"),
        }
    }
}

impl FileLimits {
    /// Intake limits alone; needs no credentials.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let max_file_size_bytes = match env::var("MAX_FILE_SIZE_MB") {
            Ok(value) if !value.trim().is_empty() => parse_max_file_size(&value)?,
            _ => MAX_FILE_SIZE_MB * 1024 * 1024,
        };

        Ok(Self {
            max_file_size_bytes,
            allowed_extensions: env::var("ALLOWED_EXTENSIONS")
                .map(|s| parse_list(&s))
                .unwrap_or_else(|_| FileLimits::default().allowed_extensions),
            allowed_content_types: env::var("ALLOWED_CONTENT_TYPES")
                .map(|s| parse_list(&s))
                .unwrap_or_else(|_| FileLimits::default().allowed_content_types),
        })
    }
}

/// Megabytes from `MAX_FILE_SIZE_MB`, converted to bytes.
pub fn parse_max_file_size(value: &str) -> Result<u64, anyhow::Error> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|mb| mb.checked_mul(1024 * 1024))
        .ok_or_else(|| {
            anyhow::anyhow!(
                "MAX_FILE_SIZE_MB must be a whole number of megabytes, got '{}'",
                value
            )
        })
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub dam: DamConfig,
    pub caption: CaptionConfig,
    pub limits: FileLimits,
    pub http_timeout_secs: u64,
    /// Cap on concurrently running file pipelines; `None` runs the whole batch at once
    pub max_concurrency: Option<usize>,
}

impl IngestConfig {
    pub fn new(dam: DamConfig, caption: CaptionConfig) -> Self {
        Self {
            dam,
            caption,
            limits: FileLimits::default(),
            http_timeout_secs: HTTP_TIMEOUT_SECS,
            max_concurrency: None,
        }
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let base_url = env::var("DAM_BASE_URL")
            .map_err(|_| anyhow::anyhow!("DAM_BASE_URL must be set"))?
            .trim_end_matches('/')
            .to_string();

        let api_url = env::var("DAM_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| format!("{}/api", base_url));

        let dam = DamConfig {
            base_url,
            api_url,
            client_id: env::var("DAM_CLIENT_ID")
                .map_err(|_| anyhow::anyhow!("DAM_CLIENT_ID must be set"))?,
            client_secret: env::var("DAM_CLIENT_SECRET")
                .map_err(|_| anyhow::anyhow!("DAM_CLIENT_SECRET must be set"))?,
        };

        let caption = CaptionConfig {
            api_key: env::var("OPENAI_API_KEY")
                .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY must be set for caption generation"))?,
            api_url: env::var("OPENAI_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_OPENAI_API_URL.to_string()),
            model: env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.to_string()),
            max_tokens: env::var("OPENAI_MAX_TOKENS")
                .unwrap_or_else(|_| DEFAULT_MAX_TOKENS.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("OPENAI_MAX_TOKENS must be a valid number"))?,
        };

        let limits = FileLimits::from_env()?;

        let max_concurrency = match env::var("INGEST_MAX_CONCURRENCY") {
            Ok(value) if !value.trim().is_empty() => Some(
                value
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| anyhow::anyhow!("INGEST_MAX_CONCURRENCY must be a valid number"))?,
            ),
            _ => None,
        };

        let config = Self {
            dam,
            caption,
            limits,
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| HTTP_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(HTTP_TIMEOUT_SECS),
            max_concurrency,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        for (name, url) in [
            ("DAM_BASE_URL", &self.dam.base_url),
            ("DAM_API_URL", &self.dam.api_url),
            ("OPENAI_API_URL", &self.caption.api_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(anyhow::anyhow!(
                    "{} must be an http(s) URL, got '{}'",
                    name,
                    url
                ));
            }
        }

        if self.dam.client_id.trim().is_empty() || self.dam.client_secret.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "DAM_CLIENT_ID and DAM_CLIENT_SECRET must not be empty"
            ));
        }

        if self.caption.api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("OPENAI_API_KEY must not be empty"));
        }

        if self.caption.max_tokens == 0 {
            return Err(anyhow::anyhow!("OPENAI_MAX_TOKENS must be greater than 0"));
        }

        if self.max_concurrency == Some(0) {
            return Err(anyhow::anyhow!(
                "INGEST_MAX_CONCURRENCY must be greater than 0 when set"
            ));
        }

        if self.limits.allowed_extensions.is_empty() || self.limits.allowed_content_types.is_empty()
        {
            return Err(anyhow::anyhow!(
                "ALLOWED_EXTENSIONS and ALLOWED_CONTENT_TYPES must not be empty"
            ));
        }

        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Split a comma separated setting into trimmed, lowercase, non-empty entries.
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> IngestConfig {
        IngestConfig::new(
            DamConfig::new("https://dam.example.com/", "client", "secret"),
            CaptionConfig::new("sk-test-key"),
        )
    }

    #[test]
    fn test_dam_config_derives_api_url() {
        let dam = DamConfig::new("https://dam.example.com/", "id", "secret");
        assert_eq!(dam.base_url, "https://dam.example.com");
        assert_eq!(dam.api_url, "https://dam.example.com/api");
    }

    #[test]
    fn test_defaults() {
        let config = valid_config();
        assert_eq!(config.caption.model, "gpt-4-turbo");
        assert_eq!(config.caption.max_tokens, 50);
        assert_eq!(config.limits.max_file_size_bytes, 5_242_880);
        assert_eq!(config.max_concurrency, None);
        assert_eq!(config.http_timeout(), Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let mut config = valid_config();
        config.dam.base_url = "SITECORE_CONTENT_HUB_URL".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("DAM_BASE_URL"));
    }

    #[test]
    fn test_validate_rejects_empty_secret() {
        let mut config = valid_config();
        config.dam.client_secret = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = valid_config();
        config.max_concurrency = Some(0);
        assert!(config.validate().is_err());
        config.max_concurrency = Some(4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_max_file_size() {
        assert_eq!(parse_max_file_size("5").unwrap(), 5_242_880);
        assert_eq!(parse_max_file_size(" 12 ").unwrap(), 12 * 1024 * 1024);
    }

    #[test]
    fn test_parse_max_file_size_rejects_garbage_and_overflow() {
        let err = parse_max_file_size("five").unwrap_err();
        assert!(err.to_string().contains("MAX_FILE_SIZE_MB"));
        assert!(parse_max_file_size("-1").is_err());
        assert!(parse_max_file_size(&u64::MAX.to_string()).is_err());
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list(" JPG, png ,,"), vec!["jpg", "png"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", valid_config());
        assert!(!rendered.contains("sk-test-key"));
        assert!(!rendered.contains("\"secret\""));
    }
}
