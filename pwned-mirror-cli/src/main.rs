use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pwned_core::{MirrorConfig, MirrorEngine, Status, UpdateResult};
use pwned_provider::{FileRangeImporter, MockProvider, RangeProvider, UpstreamClient};

#[derive(Parser, Debug)]
#[command(version, about = "Run and query a mirrored Pwned Password range dataset", long_about = None)]
struct Cli {
    /// Directory the mirrored dataset and control file live in.
    resource_dir: std::path::PathBuf,

    /// Number of concurrent fetch workers.
    #[arg(
        short = 'c',
        long,
        default_value_t = pwned_core::DEFAULT_WORKERS,
        value_parser = clap::value_parser!(usize).range(1..=pwned_core::MAX_WORKERS as i64)
    )]
    coroutines: usize,

    /// Import ranges from a single sorted bulk file instead of the network.
    #[arg(long, value_name = "PATH")]
    data_file: Option<std::path::PathBuf>,

    /// Use the deterministic mock provider instead of a real source.
    #[arg(long, conflicts_with = "data_file")]
    mocked: bool,

    #[cfg(feature = "binary-layout")]
    /// Store the mirrored dataset in the compact binary layout.
    #[arg(long)]
    binary_layout: bool,

    /// Look up a single prefix and print its range body, then exit.
    #[arg(long, value_name = "PREFIX")]
    lookup: Option<String>,
}

fn make_provider(cli: &Cli) -> Result<Arc<dyn RangeProvider>, Box<dyn Error>> {
    if cli.mocked {
        return Ok(Arc::new(MockProvider::new()));
    }
    if let Some(path) = &cli.data_file {
        return Ok(Arc::new(FileRangeImporter::new(path)));
    }
    Ok(Arc::new(UpstreamClient::new()?))
}

fn make_progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}%",
        )
        .unwrap()
        .progress_chars("#>-"),
    );
    bar
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let provider = make_provider(&cli)?;
    let mut config = MirrorConfig::new(&cli.resource_dir).with_workers(cli.coroutines);
    #[cfg(feature = "binary-layout")]
    if cli.binary_layout {
        config = config.with_binary_layout(pwned_core::BinaryLayoutConfig::default());
    }

    let engine = Arc::new(MirrorEngine::new(config, provider).await);

    if let Some(prefix) = &cli.lookup {
        let body = engine.get_range(prefix).await?;
        println!("{body}");
        return Ok(());
    }

    let progress_bar = make_progress_bar();
    let watcher = {
        let engine = engine.clone();
        let progress_bar = progress_bar.clone();
        tokio::spawn(async move {
            loop {
                let revision = engine.revision();
                if let Some(progress) = revision.progress() {
                    progress_bar.set_position(progress as u64);
                }
                if revision.status() == Status::Completed || revision.status() == Status::Failed {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        })
    };

    let result = engine.update().await;
    watcher.await.ok();

    match result {
        UpdateResult::Done => {
            progress_bar.finish_with_message("mirror update complete");
            Ok(())
        }
        UpdateResult::Failed => {
            let revision = engine.revision();
            progress_bar.finish_with_message("mirror update failed");
            Err(revision.error().unwrap_or("unknown failure").into())
        }
        UpdateResult::Irrelevant => {
            progress_bar.finish_with_message("an update was already in progress");
            Ok(())
        }
    }
}
