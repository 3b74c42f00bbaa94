mod cli;

use terratag::inject::RunContext;
use terratag::run::{RunError, RunOptions, RunSummary};
use terratag::schema::ProviderSchema;
use terratag::tag_set::TagSet;
use terratag::terraform;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("TERRATAG_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = tag(cli) {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn tag(cli: cli::Cli) -> anyhow::Result<()> {
    // malformed tags abort before anything else happens
    let tags = TagSet::from_json(&cli.tags)?;

    if !terraform::is_init_run(&cli.dir) {
        return Err(RunError::NotInitialized(cli.dir).into());
    }

    let version = match cli.terraform_version {
        Some(version) => version,
        None => terraform::detect_version(&cli.dir)?,
    };

    let oracle = match &cli.schema {
        Some(path) => ProviderSchema::load(path)?,
        None => ProviderSchema::from_terraform(&cli.dir)?,
    };
    tracing::debug!(resources = oracle.resource_count(), "provider schema loaded");

    let mut context = RunContext::new(tags, version);
    if let Some(filter) = cli.filter {
        context = context.with_filter(filter);
    }

    let options = RunOptions {
        dir: cli.dir,
        skip_terratag_files: cli.skip_terratag_files,
        rename_originals: cli.rename,
    };

    let summary = terratag::run::run(&options, &context, &oracle)?;

    if let Some(format) = &cli.report {
        output(format, &summary)?;
    }

    Ok(())
}

fn output(format: &cli::OutputFormat, summary: &RunSummary) -> anyhow::Result<()> {
    match format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), summary)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), summary)?,
    };

    Ok(())
}
