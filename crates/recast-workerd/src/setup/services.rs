//! Repository, provider, and pipeline wiring.

use anyhow::{Context, Result};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use recast_core::config::ProviderKind;
use recast_core::Config;
use recast_db::{JobRepository, OutputRepository, TaskRepository};
use recast_generators::{
    AnthropicProvider, ImageGenerator, ImageProvider, ImageProviderChain, OpenAiProvider,
    StabilityProvider, TextGenerator, TextProvider, TextProviderChain,
};
use recast_pipeline::Orchestrator;
use recast_storage::Storage;

use crate::state::AppState;

fn openai_provider(config: &Config, timeout: Duration) -> Result<OpenAiProvider> {
    let api_key = config
        .openai_api_key
        .clone()
        .context("OPENAI_API_KEY not configured")?;
    OpenAiProvider::new(
        api_key,
        config.openai_model.clone(),
        config.openai_image_model.clone(),
        config.openai_image_size.clone(),
        timeout,
    )
}

fn build_text_chain(config: &Config, timeout: Duration) -> Result<TextProviderChain> {
    let mut providers: Vec<Arc<dyn TextProvider>> = Vec::new();
    for kind in &config.text_provider_order {
        match kind {
            ProviderKind::OpenAi => {
                providers.push(Arc::new(openai_provider(config, timeout)?));
            }
            ProviderKind::Anthropic => {
                let api_key = config
                    .anthropic_api_key
                    .clone()
                    .context("ANTHROPIC_API_KEY not configured")?;
                providers.push(Arc::new(AnthropicProvider::new(
                    api_key,
                    config.anthropic_model.clone(),
                    timeout,
                )?));
            }
            ProviderKind::Stability => {
                // Rejected by Config::validate; stability has no text capability.
                anyhow::bail!("stability cannot appear in the text provider chain");
            }
        }
    }
    TextProviderChain::new(providers)
}

fn build_image_chain(config: &Config, timeout: Duration) -> Result<ImageProviderChain> {
    let mut providers: Vec<Arc<dyn ImageProvider>> = Vec::new();
    for kind in &config.image_provider_order {
        match kind {
            ProviderKind::OpenAi => {
                providers.push(Arc::new(openai_provider(config, timeout)?));
            }
            ProviderKind::Stability => {
                let api_key = config
                    .stability_api_key
                    .clone()
                    .context("STABILITY_API_KEY not configured")?;
                providers.push(Arc::new(StabilityProvider::new(
                    api_key,
                    config.stability_api_host.clone(),
                    config.stability_engine_id.clone(),
                    timeout,
                )?));
            }
            ProviderKind::Anthropic => {
                anyhow::bail!("anthropic cannot appear in the image provider chain");
            }
        }
    }
    ImageProviderChain::new(providers)
}

/// Build repositories, generators, and the orchestrator.
pub fn initialize_services(
    config: &Config,
    pool: PgPool,
    storage: Arc<dyn Storage>,
) -> Result<Arc<AppState>> {
    let jobs = JobRepository::new(pool.clone());
    let outputs = OutputRepository::new(pool.clone());
    let tasks = TaskRepository::new(pool);

    let timeout = Duration::from_secs(config.provider_timeout_seconds);

    let text_chain = build_text_chain(config, timeout)?;
    let image_chain = build_image_chain(config, timeout)?;

    let text_generator = Arc::new(TextGenerator::new(text_chain.clone(), config.max_source_chars));
    let image_generator = Arc::new(ImageGenerator::new(
        text_chain,
        image_chain,
        storage,
        config.max_source_chars,
    ));

    let orchestrator = Orchestrator::new(
        Arc::new(jobs.clone()),
        Arc::new(outputs),
        text_generator,
        image_generator,
    );

    tracing::info!(
        text_providers = config.text_provider_order.len(),
        image_providers = config.image_provider_order.len(),
        "Generation pipeline initialized"
    );

    Ok(Arc::new(AppState {
        jobs,
        tasks,
        orchestrator,
    }))
}
