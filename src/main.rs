use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use count_transformer::cli::{CliOptions, Command};
use count_transformer::config::Config;
use count_transformer::executor::{
    CountEvent, CountExecutor, DynamoScanStore, make_scan_request,
};
use count_transformer::transform::{BindingStrategy, CountTransformer};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "count_transformer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let cli = CliOptions::from_args()?;
    match cli.command {
        Command::Transform {
            schema,
            out_dir,
            strategy,
        } => run_transform(&config, &schema, &out_dir, strategy).await,
        Command::ScanRequest => print_scan_request().await,
        Command::Count => run_count(&config).await,
    }
}

async fn run_transform(
    config: &Config,
    schema_path: &Path,
    out_dir: &Path,
    strategy: Option<BindingStrategy>,
) -> Result<()> {
    let mut options = config.transform_options();
    if let Some(strategy) = strategy {
        options.binding_strategy = strategy;
    }

    let sdl = tokio::fs::read_to_string(schema_path)
        .await
        .with_context(|| format!("Failed to read schema {}", schema_path.display()))?;

    let mut output = CountTransformer::new(options.clone())
        .transform(&sdl)
        .with_context(|| format!("Failed to transform {}", schema_path.display()))?;

    match tokio::fs::read(&options.handler_artifact).await {
        Ok(artifact) => output.plan = output.plan.with_artifact_digest(&artifact),
        Err(e) => tracing::warn!(
            artifact = %options.handler_artifact,
            error = %e,
            "Executor artifact not readable, plan carries no code digest"
        ),
    }

    let (schema_out, plan_out) = output
        .write_to(out_dir)
        .await
        .with_context(|| format!("Failed to write output to {}", out_dir.display()))?;

    tracing::info!(
        schema = %schema_out.display(),
        plan = %plan_out.display(),
        resolvers = output.plan.resolvers.len(),
        "Wrote transform output"
    );
    Ok(())
}

async fn read_stdin() -> Result<String> {
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("Failed to read event from stdin")?;
    Ok(input)
}

async fn print_scan_request() -> Result<()> {
    let input = read_stdin().await?;
    let event: CountEvent = serde_json::from_str(&input).context("Invalid count event")?;
    let request = make_scan_request(&event, None).context("Failed to encode filter values")?;
    println!("{}", serde_json::to_string_pretty(&request)?);
    Ok(())
}

async fn run_count(config: &Config) -> Result<()> {
    let input = read_stdin().await?;
    let payload: serde_json::Value = serde_json::from_str(&input).context("Invalid count event")?;

    let store = DynamoScanStore::from_env(config.dynamo_endpoint.as_deref()).await;
    let executor = CountExecutor::with_limits(store, config.scan_limits());

    match executor.handle(payload).await {
        Ok(count) => {
            println!("{count}");
            Ok(())
        }
        Err(error) => {
            println!("{}", serde_json::to_string(&error)?);
            anyhow::bail!("count failed ({}): {}", error.error_type, error.message)
        }
    }
}
