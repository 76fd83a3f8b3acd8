use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use recast_core::models::{ContentType, GenerationOptions, NewJob};
use recast_core::Config;
use recast_db::{JobRepository, TaskRepository};

#[derive(Parser, Debug)]
#[command(name = "submit_job")]
#[command(about = "Submit a repurposing job: create the pending record and enqueue a task")]
struct Args {
    /// Title of the blog post
    #[arg(long)]
    title: String,

    /// Path to a file holding the source content (reads stdin if omitted)
    #[arg(long, value_name = "PATH")]
    content_file: Option<String>,

    /// Content types to generate, comma-separated
    /// (twitter, instagram, linkedin, facebook, thumbnail, twitter_image, ...)
    #[arg(long, default_value = "twitter,linkedin,thumbnail")]
    content_types: String,

    /// Optional tone for the generated text
    #[arg(long)]
    tone: Option<String>,

    /// Optional visual style for generated images
    #[arg(long)]
    visual_style: Option<String>,

    /// Hashtags to include, comma-separated
    #[arg(long, default_value = "")]
    hashtags: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let content = match &args.content_file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read content file {}", path))?,
        None => {
            use std::io::Read;
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read content from stdin")?;
            buf
        }
    };

    let content_types = args
        .content_types
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().parse::<ContentType>())
        .collect::<Result<Vec<_>, _>>()?;
    if content_types.is_empty() {
        return Err(anyhow::anyhow!("At least one content type is required"));
    }

    let hashtags: Vec<String> = args
        .hashtags
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().to_string())
        .collect();

    let config = Config::from_env()?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    let jobs = JobRepository::new(pool.clone());
    let tasks = TaskRepository::new(pool);

    let job = jobs
        .create_job(&NewJob {
            title: args.title,
            original_content: content,
            content_types,
            options: GenerationOptions {
                tone: args.tone,
                visual_style: args.visual_style,
                hashtags,
            },
        })
        .await?;

    let task = tasks
        .enqueue(
            job.id,
            config.worker_max_retries,
            Some(config.worker_task_timeout_seconds),
        )
        .await?;

    println!("job:  {}", job.id);
    println!("task: {}", task.id);

    Ok(())
}
