use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

use shapedify::catalog::SourceCatalog;
use shapedify::cli::{Cli, Command, ConvertArgs, SourcesArgs};
use shapedify::config::DataLayout;
use shapedify::reference::Dnd5eRules;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    shapedify::logging::init().context("init logging")?;

    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        Command::Sources(args) => sources(args).await.context("sources")?,
        Command::Convert(args) => convert(args).await.context("convert")?,
    }

    Ok(())
}

async fn sources(args: SourcesArgs) -> anyhow::Result<()> {
    let catalog = SourceCatalog::load(DataLayout::from_env(&args.data), &Dnd5eRules).await?;
    for source in catalog.sources() {
        println!("{}\t{}", source.key, source.name);
    }
    Ok(())
}

async fn convert(args: ConvertArgs) -> anyhow::Result<()> {
    let mut catalog =
        SourceCatalog::load(DataLayout::from_env(&args.data), &Dnd5eRules).await?;
    let bundles = catalog.generate(&args.sources, &Dnd5eRules).await?;
    let encoded = shapedify::export::encode(&bundles, args.format)?;
    shapedify::export::write_output(args.out.as_deref(), &encoded, args.force)
}
