use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rwb_pipeline::{
    pg_pool, HttpRenderer, JobRunner, OpenAiNarrative, PgFactStore, PgJobStore, WorkerConfig,
};
use rwb_storage::FsObjectStore;
use rwb_web::AppState;

#[derive(Debug, Parser)]
#[command(name = "rwb-cli")]
#[command(about = "Retail Weekly Brief worker command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one job to completion (the external scheduler's re-invocation path).
    Process {
        #[arg(long)]
        job_id: i64,
    },
    /// Serve the HTTP trigger endpoint.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = WorkerConfig::from_env();
    let runner = build_runner(config.clone()).await?;

    match cli.command {
        Commands::Process { job_id } => {
            let outcome = runner.run(job_id, None).await?;
            println!(
                "job {} done: ingested={} aggregates={} anomalies={} brief={}",
                outcome.job_id,
                outcome.ingested_rows,
                outcome.aggregate_rows,
                outcome.anomalies,
                outcome
                    .brief_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "none".to_string()),
            );
        }
        Commands::Serve => {
            let port = config.web_port;
            let state = AppState {
                runner: Arc::new(runner),
                shared_secret: config.shared_secret,
            };
            rwb_web::serve(state, port).await?;
        }
    }

    Ok(())
}

async fn build_runner(config: WorkerConfig) -> Result<JobRunner> {
    let pool = pg_pool(&config.database_url).await?;
    let narrative = OpenAiNarrative::from_config(&config)?;
    let renderer = HttpRenderer::new(config.renderer_url.clone())?;
    let objects = FsObjectStore::new(config.data_dir.clone());

    Ok(JobRunner::new(
        config,
        Arc::new(PgJobStore::new(pool.clone())),
        Arc::new(PgFactStore::new(pool)),
        Arc::new(objects),
        Arc::new(narrative),
        Arc::new(renderer),
    ))
}
