use std::time::Duration;

use clap::builder::TypedValueParser;
use clap::{ArgAction, Parser};

use crate::domain::{
    DEFAULT_BASE_URL, DEFAULT_EVENT_POLL_TIME, DEFAULT_PAGE_SIZE, DEFAULT_WINDOW_SIZE, TVConfig,
};
use crate::logging::DEFAULT_LOG_FILE;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rtv",
    version,
    about = "A tui viewer for remote tabular resources.",
    long_about = "rtv fetches GET {base-url}/api/{resource} and shows the json array as a \
searchable, sortable and paginated table.\n\nExamples:\n  rtv users\n  rtv -u http://api.local:8080 -p 20 orders"
)]
pub struct CliArgs {
    #[arg(value_name = "RESOURCE", help = "Resource to open on start.")]
    pub resource: Option<String>,

    #[arg(
        short = 'u',
        long = "base-url",
        env = "RTV_BASE_URL",
        default_value = DEFAULT_BASE_URL,
        value_name = "URL",
        help = "Server that serves /api/{resource}."
    )]
    pub base_url: String,

    #[arg(
        short = 'p',
        long = "page-size",
        default_value_t = DEFAULT_PAGE_SIZE,
        value_parser = clap::value_parser!(u16).range(1..).map(|v| v as usize),
        help = "Records per page."
    )]
    pub page_size: usize,

    #[arg(
        short = 'w',
        long = "window-size",
        default_value_t = DEFAULT_WINDOW_SIZE,
        help = "Page links shown around the current page."
    )]
    pub window_size: usize,

    #[arg(
        long = "clamp-page",
        help = "Move back to the last page when the page count shrinks."
    )]
    pub clamp_page: bool,

    #[arg(long = "timeout", value_name = "SECS", help = "Fetch timeout in seconds.")]
    pub timeout: Option<u64>,

    #[arg(
        long = "log-file",
        default_value = DEFAULT_LOG_FILE,
        value_name = "FILE",
        help = "Where to write logs."
    )]
    pub log_file: String,

    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        help = "Increase log verbosity (-v, -vv, -vvv)."
    )]
    pub verbose: u8,
}

impl CliArgs {
    pub fn to_config(&self) -> TVConfig {
        TVConfig::default()
            .base_url(self.base_url.clone())
            .page_size(self.page_size)
            .window_size(self.window_size)
            .clamp_page(self.clamp_page)
            .request_timeout(self.timeout.map(Duration::from_secs))
            .event_poll_time(DEFAULT_EVENT_POLL_TIME)
    }
}
