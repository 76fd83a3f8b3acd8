//! Configuration module
//!
//! Environment-variable driven configuration for the worker daemon and
//! services: database, storage backend, AI providers, and task queue tuning.

use std::env;
use std::str::FromStr;

use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const WORKER_MAX_WORKERS: usize = 4;
const WORKER_POLL_INTERVAL_MS: u64 = 1000;
const WORKER_MAX_RETRIES: i32 = 3;
const WORKER_TASK_TIMEOUT_SECS: i32 = 600;
const STALE_TASK_REAP_INTERVAL_SECS: u64 = 60;
const STALE_TASK_GRACE_PERIOD_SECS: i64 = 300;
const PROVIDER_TIMEOUT_SECS: u64 = 60;
const MAX_SOURCE_CHARS: usize = 24_000;

/// Which provider a fallback chain should try, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Stability,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "stability" => Ok(ProviderKind::Stability),
            other => Err(anyhow::anyhow!("Unknown provider: {}", other)),
        }
    }
}

/// Application configuration (worker daemon).
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Storage configuration
    pub storage_backend: Option<StorageBackend>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Provider configuration
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_image_model: String,
    pub openai_image_size: String,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub stability_api_key: Option<String>,
    pub stability_api_host: String,
    pub stability_engine_id: String,
    pub text_provider_order: Vec<ProviderKind>,
    pub image_provider_order: Vec<ProviderKind>,
    pub provider_timeout_seconds: u64,
    /// Deterministic cap on source text handed to providers.
    pub max_source_chars: usize,
    // Task queue configuration
    pub worker_max_workers: usize,
    pub worker_poll_interval_ms: u64,
    pub worker_max_retries: i32,
    pub worker_task_timeout_seconds: i32,
    /// Interval in seconds between runs of the stale task reaper. 0 = disabled.
    pub stale_task_reap_interval_secs: u64,
    /// Grace period in seconds added to task timeout before reaping stale running tasks.
    pub stale_task_grace_period_secs: i64,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn parse_provider_order(name: &str, default: &str) -> Result<Vec<ProviderKind>, anyhow::Error> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    let order = raw
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse())
        .collect::<Result<Vec<ProviderKind>, _>>()
        .map_err(|e| anyhow::anyhow!("{} is invalid: {}", name, e))?;
    if order.is_empty() {
        return Err(anyhow::anyhow!("{} must name at least one provider", name));
    }
    Ok(order)
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let storage_backend = env::var("STORAGE_BACKEND")
            .ok()
            .and_then(|s| s.parse::<StorageBackend>().ok());

        let config = Config {
            environment,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: env_or("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            aws_region: env::var("AWS_REGION").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|s| !s.is_empty()),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            openai_image_model: env::var("OPENAI_IMAGE_MODEL")
                .unwrap_or_else(|_| "dall-e-3".to_string()),
            openai_image_size: env::var("OPENAI_IMAGE_SIZE")
                .unwrap_or_else(|_| "1024x1024".to_string()),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok().filter(|s| !s.is_empty()),
            anthropic_model: env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string()),
            stability_api_key: env::var("STABILITY_API_KEY").ok().filter(|s| !s.is_empty()),
            stability_api_host: env::var("STABILITY_API_HOST")
                .unwrap_or_else(|_| "https://api.stability.ai".to_string()),
            stability_engine_id: env::var("STABILITY_ENGINE_ID")
                .unwrap_or_else(|_| "stable-diffusion-xl-1024-v1-0".to_string()),
            text_provider_order: parse_provider_order("TEXT_PROVIDER_ORDER", "openai,anthropic")?,
            image_provider_order: parse_provider_order("IMAGE_PROVIDER_ORDER", "openai,stability")?,
            provider_timeout_seconds: env_or("PROVIDER_TIMEOUT_SECONDS", PROVIDER_TIMEOUT_SECS),
            max_source_chars: env_or("MAX_SOURCE_CHARS", MAX_SOURCE_CHARS),
            worker_max_workers: env_or("WORKER_MAX_WORKERS", WORKER_MAX_WORKERS),
            worker_poll_interval_ms: env_or("WORKER_POLL_INTERVAL_MS", WORKER_POLL_INTERVAL_MS),
            worker_max_retries: env_or("WORKER_MAX_RETRIES", WORKER_MAX_RETRIES),
            worker_task_timeout_seconds: env_or(
                "WORKER_TASK_TIMEOUT_SECONDS",
                WORKER_TASK_TIMEOUT_SECS,
            ),
            stale_task_reap_interval_secs: env_or(
                "STALE_TASK_REAP_INTERVAL_SECS",
                STALE_TASK_REAP_INTERVAL_SECS,
            ),
            stale_task_grace_period_secs: env_or(
                "STALE_TASK_GRACE_PERIOD_SECS",
                STALE_TASK_GRACE_PERIOD_SECS,
            ),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// True when the chain order includes the provider and its key is configured.
    fn key_for(&self, kind: ProviderKind) -> Option<&str> {
        match kind {
            ProviderKind::OpenAi => self.openai_api_key.as_deref(),
            ProviderKind::Anthropic => self.anthropic_api_key.as_deref(),
            ProviderKind::Stability => self.stability_api_key.as_deref(),
        }
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        // Validate storage backend configuration
        let backend = self.storage_backend.unwrap_or(StorageBackend::Local);
        match backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        // Every provider named in a chain order needs its API key
        for kind in self
            .text_provider_order
            .iter()
            .chain(self.image_provider_order.iter())
        {
            if self.key_for(*kind).is_none() {
                return Err(anyhow::anyhow!(
                    "Provider order names {:?} but its API key is not configured",
                    kind
                ));
            }
        }

        if self.text_provider_order.contains(&ProviderKind::Stability) {
            return Err(anyhow::anyhow!(
                "TEXT_PROVIDER_ORDER cannot include stability (image-only provider)"
            ));
        }
        if self.image_provider_order.contains(&ProviderKind::Anthropic) {
            return Err(anyhow::anyhow!(
                "IMAGE_PROVIDER_ORDER cannot include anthropic (text-only provider)"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            environment: "test".to_string(),
            database_url: "postgresql://localhost/recast".to_string(),
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            storage_backend: Some(StorageBackend::Local),
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            aws_region: None,
            local_storage_path: Some("/tmp/recast".to_string()),
            local_storage_base_url: Some("http://localhost:4000/files".to_string()),
            openai_api_key: Some("sk-test".to_string()),
            openai_model: "gpt-4o".to_string(),
            openai_image_model: "dall-e-3".to_string(),
            openai_image_size: "1024x1024".to_string(),
            anthropic_api_key: Some("sk-ant-test".to_string()),
            anthropic_model: "claude-sonnet-4-20250514".to_string(),
            stability_api_key: Some("sk-stab-test".to_string()),
            stability_api_host: "https://api.stability.ai".to_string(),
            stability_engine_id: "stable-diffusion-xl-1024-v1-0".to_string(),
            text_provider_order: vec![ProviderKind::OpenAi, ProviderKind::Anthropic],
            image_provider_order: vec![ProviderKind::OpenAi, ProviderKind::Stability],
            provider_timeout_seconds: PROVIDER_TIMEOUT_SECS,
            max_source_chars: MAX_SOURCE_CHARS,
            worker_max_workers: WORKER_MAX_WORKERS,
            worker_poll_interval_ms: WORKER_POLL_INTERVAL_MS,
            worker_max_retries: WORKER_MAX_RETRIES,
            worker_task_timeout_seconds: WORKER_TASK_TIMEOUT_SECS,
            stale_task_reap_interval_secs: STALE_TASK_REAP_INTERVAL_SECS,
            stale_task_grace_period_secs: STALE_TASK_GRACE_PERIOD_SECS,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_postgres_url() {
        let mut config = base_config();
        config.database_url = "mysql://localhost/recast".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_s3_backend_requires_bucket_and_region() {
        let mut config = base_config();
        config.storage_backend = Some(StorageBackend::S3);
        assert!(config.validate().is_err());

        config.s3_bucket = Some("recast-media".to_string());
        assert!(config.validate().is_err());

        config.s3_region = Some("us-east-1".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_local_backend_requires_path_and_base_url() {
        let mut config = base_config();
        config.local_storage_base_url = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_provider_order_requires_key() {
        let mut config = base_config();
        config.anthropic_api_key = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_provider_families_enforced() {
        let mut config = base_config();
        config.text_provider_order = vec![ProviderKind::OpenAi, ProviderKind::Stability];
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.image_provider_order = vec![ProviderKind::Anthropic];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!(" OpenAI ".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("anthropic".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        assert!("dalle".parse::<ProviderKind>().is_err());
    }
}
