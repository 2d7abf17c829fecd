use clap::{ArgAction, Parser};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Find and download movie posters from IMDb", long_about = None)]
pub struct CliArgs {
    /// Movie title ID (e.g. tt2861424) or IMDb URL (e.g. www.imdb.com/title/tt0149460/), repeatable
    #[arg(short = 'm', long = "movie", value_name = "MOVIE")]
    pub movies: Vec<String>,

    /// Add every movie linked from an IMDb page (a chart, a list, search results), repeatable
    #[arg(short = 's', long = "scrape", value_name = "URL")]
    pub scrape: Vec<String>,

    /// Target directory
    #[arg(long, value_name = "DIR", default_value = "./")]
    pub dir: PathBuf,

    /// Wait for n milliseconds between requests
    #[arg(long, visible_alias = "delay", value_name = "MS", default_value_t = 0)]
    pub wait: u64,

    /// Download all poster resolutions
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true", default_value_t = false, action = ArgAction::Set)]
    pub all: bool,

    /// Don't download posters. Collect only.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true", default_value_t = false, action = ArgAction::Set)]
    pub collect: bool,

    /// List movie titles before doing anything else
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true", default_value_t = false, action = ArgAction::Set)]
    pub list: bool,

    /// Speak nothing, friend, and do not enter.
    #[arg(long, visible_alias = "shhh", num_args = 0..=1, require_equals = true, default_missing_value = "true", default_value_t = false, action = ArgAction::Set)]
    pub silent: bool,

    /// Configuration file, extension optional
    #[arg(long, value_name = "FILE", default_value = "config")]
    pub config: PathBuf,
}

impl CliArgs {
    pub fn parse_args() -> Self {
        Self::parse_from(gnu_style(std::env::args_os()))
    }

    pub fn launch_delay(&self) -> Duration {
        Duration::from_millis(self.wait)
    }
}

/// Accept single dash long flags (`-dir`, `-all=false`) next to the usual
/// `--dir` by rewriting them before clap sees them. `-m=x` becomes `-m x`.
pub fn gnu_style<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut rewritten = Vec::new();
    let mut passthrough = false;

    for (position, arg) in args.into_iter().enumerate() {
        let text = match arg.to_str() {
            Some(text) if position > 0 && !passthrough => text.to_string(),
            _ => {
                rewritten.push(arg);
                continue;
            }
        };

        if text == "--" {
            passthrough = true;
            rewritten.push(arg);
            continue;
        }

        let Some(flag) = text.strip_prefix('-').filter(|flag| !flag.starts_with('-')) else {
            rewritten.push(arg);
            continue;
        };

        let (name, value) = match flag.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (flag, None),
        };

        if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
            rewritten.push(arg);
        } else if name.len() > 1 {
            rewritten.push(OsString::from(format!("-{text}")));
        } else if let Some(value) = value {
            rewritten.push(OsString::from(format!("-{name}")));
            rewritten.push(OsString::from(value));
        } else {
            rewritten.push(arg);
        }
    }

    rewritten
}
