use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use recast_core::Config;
use recast_db::{JobRepository, OutputRepository};

#[derive(Parser, Debug)]
#[command(name = "job_status")]
#[command(about = "Show a job's status and its produced outputs")]
struct Args {
    /// Job ID
    #[arg(value_name = "UUID")]
    job_id: Uuid,

    /// Output format: json or table (default: table)
    #[arg(long, default_value = "table")]
    format: String,
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

    let config = Config::from_env()?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    let jobs = JobRepository::new(pool.clone());
    let outputs = OutputRepository::new(pool);

    let job = jobs
        .get_job(args.job_id)
        .await?
        .with_context(|| format!("Job {} not found", args.job_id))?;
    let job_outputs = outputs.list_outputs(args.job_id).await?;

    if args.format == "json" {
        let value = serde_json::json!({
            "job": job,
            "outputs": job_outputs,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("id:        {}", job.id);
    println!("title:     {}", job.title);
    println!("status:    {}", job.status);
    println!(
        "requested: {}",
        job.content_types
            .iter()
            .map(|ct| ct.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    if let Some(error) = &job.error_message {
        println!("error:     {}", error);
    }
    if let Some(completed_at) = job.completed_at {
        println!("finished:  {}", completed_at);
    }

    // Partial success is visible here: a completed job may hold fewer
    // outputs than requested types.
    println!("outputs ({}):", job_outputs.len());
    for output in &job_outputs {
        match (&output.content, &output.storage_locator) {
            (Some(content), _) => {
                let preview: String = content.chars().take(60).collect();
                println!("  {:<16} text: {}", output.content_type.to_string(), preview);
            }
            (_, Some(locator)) => {
                println!("  {:<16} file: {}", output.content_type.to_string(), locator);
            }
            _ => {}
        }
    }

    Ok(())
}
