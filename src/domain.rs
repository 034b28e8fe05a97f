use std::time::Duration;

use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3300";
pub const DEFAULT_PAGE_SIZE: usize = 5;
pub const DEFAULT_WINDOW_SIZE: usize = 3;
pub const DEFAULT_EVENT_POLL_TIME: u64 = 100;
pub const NULL_PLACEHOLDER: &str = "Null";

pub const HELP_TEXT: &str = "\
q        quit
/        search all fields
:        open a resource (or jump to a page number)
s        sort by the selected column (again to flip)
h l      select column
j k      select row
n p      next / previous page
g G      first / last page
r        reload the current resource
c        copy selected cell
y        copy selected row as csv
?        this help
Esc      close popup / cancel input";

#[derive(Debug, Error)]
pub enum TVError {
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("fetching `{resource}` returned status {status}")]
    Status { resource: String, status: u16 },
    #[error("payload is not valid json: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unexpected payload: {0}")]
    UnexpectedPayload(String),
    #[error("invalid base url `{0}`")]
    InvalidBaseUrl(String),
    #[error("failed to set up logging: {0}")]
    Logging(String),
}

#[derive(Debug, Clone, Setters)]
pub struct TVConfig {
    pub base_url: String,
    pub page_size: usize,
    pub window_size: usize,
    pub clamp_page: bool,
    pub request_timeout: Option<Duration>,
    pub event_poll_time: u64,
}

impl Default for TVConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            window_size: DEFAULT_WINDOW_SIZE,
            clamp_page: false,
            request_timeout: None,
            event_poll_time: DEFAULT_EVENT_POLL_TIME,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    Search,
    Resource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    NextPage,
    PreviousPage,
    FirstPage,
    LastPage,
    GoToPage(usize),
    Sort,
    SortBy(String),
    Search,
    SearchChanged(String),
    EnterCommand,
    SelectResource(String),
    Reload,
    CopyCell,
    CopyRow,
    Help,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}
