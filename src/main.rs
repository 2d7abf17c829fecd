use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::cli::CliArgs;
use crate::global::{
    config::{AppConfig, LogRotation},
    console::Console,
    error::AppError,
    http::HttpClientManager,
};
use crate::imdb::{locator::PosterLocator, module::ImdbModule, source::Site};
use crate::picture::progress::DotProgress;

mod cli;
mod global;
mod imdb;
mod picture;

const NOTHING_TO_DO: &str = "Nothing to do. Bye.";

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse_args();
    let silent = args.silent;

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            if !silent {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CliArgs) -> Result<ExitCode> {
    let console = Console::new(!args.silent);

    let config = AppConfig::load(&args.config).context("Failed to load configuration")?;

    // Keep the guard alive so buffered file logs get flushed on exit
    let _log_guard = init_logging(&config, args.silent)?;
    debug!(?config, ?args, "Loaded configuration");

    if let Some(message) = nothing_to_do(&args.movies, &args.scrape) {
        console.println(message);
        return Ok(ExitCode::SUCCESS);
    }

    let site = Site::new(&config.site.base_url)?;
    let http = HttpClientManager::new(&config.http)?;
    let locator = PosterLocator::new(Arc::new(http.clone()), site, args.all);
    let module = ImdbModule::new(locator, http.downloads().clone(), args.launch_delay());

    let mut movies = args.movies.clone();
    if !args.scrape.is_empty() {
        console.println("Scraping...");
        let (found, errors) = module.scrape_references(&args.scrape).await;
        report_errors(&console, &errors);
        movies.extend(found);
    }

    if let Some(message) = nothing_to_do(&movies, &[]) {
        console.println(message);
        return Ok(ExitCode::SUCCESS);
    }

    info!(movies = movies.len(), "Starting");

    if args.list && console.is_verbose() {
        console.println("Listing movies");
        for listing in module.list_titles(&movies).await {
            console.println(listing);
        }
        console.newline();
    }

    if args.collect {
        console.print("Collecting posters");
        let (urls, errors) = module.find_posters(&movies, || console.print(".")).await;
        console.newline();
        for line in numbered_urls(&urls) {
            console.println(line);
        }
        console.newline();
        report_errors(&console, &errors);
    } else {
        console.print("Downloading posters");
        let progress = Arc::new(DotProgress::new(console));
        let (collect_errors, downloaded) = module
            .download_posters(&movies, &args.dir, progress, || console.print("."))
            .await;
        console.newline();
        report_errors(&console, &collect_errors);

        match downloaded {
            Ok(report) => {
                report_errors(&console, &report.errors);
                info!(saved = report.saved.len(), failed = report.errors.len(), "Downloads complete");
            }
            Err(e) => {
                console.println(&e);
                error!(error = %e, "Download phase aborted");
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    console.println("Done.");
    Ok(ExitCode::SUCCESS)
}

/// Farewell for a run without any movie or page to work on
fn nothing_to_do(movies: &[String], pages: &[String]) -> Option<&'static str> {
    (movies.is_empty() && pages.is_empty()).then_some(NOTHING_TO_DO)
}

/// `#<n>: <url>`, numbered from one
fn numbered_urls(urls: &[String]) -> Vec<String> {
    urls.iter()
        .enumerate()
        .map(|(i, url)| format!("#{}: {}", i + 1, url))
        .collect()
}

fn report_errors(console: &Console, errors: &[AppError]) {
    for e in errors {
        console.println(e);
    }
}

/// Console layer on stderr (off in silent mode) plus an optional rolling
/// file layer. `RUST_LOG` overrides the configured level.
fn init_logging(config: &AppConfig, silent: bool) -> Result<Option<WorkerGuard>> {
    let logging = &config.app.logging;
    let log_level = config.app.log_level.clone();
    let filter = move || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("poster_collector={}", log_level).into())
    };

    let console_layer = (logging.log_to_console && !silent).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(filter())
    });

    let (file_layer, guard) = if logging.log_to_file {
        let rotation = match logging.log_rotation {
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Never => Rotation::NEVER,
        };
        let appender = RollingFileAppender::builder()
            .rotation(rotation)
            .filename_prefix(logging.log_file_prefix.as_str())
            .filename_suffix("log")
            .build(&logging.log_directory)?;
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(filter());
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_says_goodbye() {
        assert_eq!(nothing_to_do(&[], &[]), Some("Nothing to do. Bye."));
    }

    #[test]
    fn any_movie_or_page_is_work() {
        assert_eq!(nothing_to_do(&["tt2861424".to_string()], &[]), None);
        assert_eq!(nothing_to_do(&[], &["www.imdb.com/chart/top/".to_string()]), None);
    }

    #[test]
    fn collected_urls_are_numbered_from_one() {
        let url = "https://m.media-amazon.com/images/M/tt2861424.jpg".to_string();

        assert_eq!(numbered_urls(&[url.clone()]), vec![format!("#1: {url}")]);
    }

    #[test]
    fn numbering_follows_list_order() {
        let urls = vec!["https://img/a.jpg".to_string(), "https://img/b.jpg".to_string()];

        assert_eq!(numbered_urls(&urls), vec!["#1: https://img/a.jpg", "#2: https://img/b.jpg"]);
        assert!(numbered_urls(&[]).is_empty());
    }
}
