mod cli;
mod error;
mod session;

use crate::cli::{Cli, Command, ExportArgs, describe};
use crate::error::{ErrorKind, Result};
use crate::session::Session;
use clap::Parser;
use exn::ResultExt;
use rotten_checker::{CheckType, validator};
use rotten_config::Settings;
use rotten_download::Downloader;
use std::path::Path;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            if err.is_retryable() {
                eprintln!("This may succeed if retried.");
            }
            ExitCode::FAILURE
        },
    }
}

/// Logs go to stderr so command output on stdout stays parseable. `RUST_LOG`
/// overrides the verbosity flag.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::{fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        true => EnvFilter::new("rotten=debug,rotten_checker=debug,rotten_config=debug,rotten_download=debug,warn"),
        false => EnvFilter::new("warn"),
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    match cli.command {
        Command::Scan { root } => scan(root.as_deref().unwrap_or(&settings.search_root)).await,
        Command::Count { export } => count(export).await,
        Command::Check { export, ids } => check(export, &ids).await,
        Command::Releases => releases(&settings).await,
        Command::Download { tag, dest } => download(&settings, &tag, dest.as_deref()).await,
    }
}

async fn scan(root: &Path) -> Result<()> {
    let directories = validator::discover(root).await.or_raise(|| ErrorKind::Validation(root.to_path_buf()))?;
    if directories.is_empty() {
        eprintln!("No exports found under {}", root.display());
    }
    for directory in directories {
        let mut line = directory.display().to_string();
        for check_type in [CheckType::User, CheckType::Group] {
            let available = validator::available_storage_types(&directory, check_type).await;
            if !available.is_empty() {
                let names: Vec<&str> = available.iter().map(|storage| storage.as_str()).collect();
                line.push_str(&format!("\t{check_type}: {}", names.join(",")));
            }
        }
        println!("{line}");
    }
    Ok(())
}

async fn count(export: ExportArgs) -> Result<()> {
    let session = Session::open(&export.dir, export.check_type, export.storage).await?;
    println!("{}", session.hash_count());
    Ok(())
}

async fn check(export: ExportArgs, ids: &[u64]) -> Result<()> {
    let session = Session::open(&export.dir, export.check_type, export.storage).await?;
    for (id, result) in session.lookup_many(ids).await? {
        println!("{}", describe(id, &result));
    }
    Ok(())
}

fn downloader(settings: &Settings) -> Result<Downloader> {
    Downloader::new(settings.feed.releases_url(), settings.engine_version).or_raise(|| ErrorKind::Download)
}

async fn releases(settings: &Settings) -> Result<()> {
    let catalog = downloader(settings)?.available_exports().await.or_raise(|| ErrorKind::Download)?;
    for release in &catalog.releases {
        let engine = release.engine_version().map(|v| v.to_string()).unwrap_or_default();
        println!("{}\t{}\t{engine}\t{}", release.tag_name, release.name, release.html_url);
    }
    if let Some(newer) = catalog.newer_version {
        eprintln!(
            "Exports for engine {newer} are available; upgrade rotten (engine {}) to use them.",
            settings.engine_version
        );
    }
    Ok(())
}

async fn download(settings: &Settings, tag: &str, dest: Option<&Path>) -> Result<()> {
    let downloader = downloader(settings)?;
    let catalog = downloader.available_exports().await.or_raise(|| ErrorKind::Download)?;
    let Some(release) = catalog.releases.iter().find(|release| release.tag_name == tag) else {
        exn::bail!(ErrorKind::UnknownRelease(tag.to_string()));
    };

    let destination = dest.unwrap_or(&settings.download_dir);
    downloader.download_export(release, destination).await.or_raise(|| ErrorKind::Download)?;
    println!("{}", destination.display());
    Ok(())
}
