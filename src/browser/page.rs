use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::portal::storage_state::StorageState;

/// Locator for a portal element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sel {
    Css(&'static str),
    XPath(&'static str),
}

impl Sel {
    pub fn describe(&self) -> String {
        match self {
            Sel::Css(s) => format!("css={}", s),
            Sel::XPath(s) => format!("xpath={}", s),
        }
    }
}

/// One iframe of the current document, in document order.
#[derive(Debug, Clone)]
pub struct FrameHandle {
    pub index: u16,
    pub url: String,
}

/// File captured from the browser download directory.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Counters from applying a storage-state snapshot to a live page.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportStats {
    pub cookies_set: usize,
    pub cookies_skipped: usize,
    pub local_storage_set: usize,
    pub origins_skipped: usize,
}

#[derive(Debug, Error)]
pub enum PageError {
    #[error("webdriver: {0}")]
    WebDriver(String),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

/// Operations the refresh flow needs from a live portal page.
/// Implemented by the WebDriver client, and by a scripted page in tests.
#[async_trait]
pub trait PortalPage: Send + Sync {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), PageError>;

    async fn current_url(&self) -> Result<String, PageError>;

    async fn ready_state(&self) -> Result<String, PageError>;

    /// Best-effort quiet-network wait; true when the page settled in time.
    async fn settle(&self, timeout: Duration) -> bool;

    /// Number of elements matching the selector in the current context.
    async fn count(&self, sel: &Sel) -> Result<usize, PageError>;

    /// Clears and types into the first visible match. False when nothing matched.
    async fn fill(&self, sel: &Sel, value: &str) -> Result<bool, PageError>;

    /// Clicks the first visible match. False when nothing matched.
    async fn click(&self, sel: &Sel) -> Result<bool, PageError>;

    /// Sends Enter to the first visible match. False when nothing matched.
    async fn press_enter(&self, sel: &Sel) -> Result<bool, PageError>;

    async fn body_text(&self) -> Result<String, PageError>;

    async fn frames(&self) -> Result<Vec<FrameHandle>, PageError>;

    async fn enter_frame(&self, index: u16) -> Result<(), PageError>;

    async fn enter_top(&self) -> Result<(), PageError>;

    /// Attaches cookies and localStorage from a snapshot to the current origin.
    async fn import_state(&self, state: &StorageState) -> Result<ImportStats, PageError>;

    /// Captures cookies and localStorage of the live session.
    async fn export_state(&self) -> Result<StorageState, PageError>;

    /// Snapshots the download directory before a click.
    async fn arm_download(&self) -> Result<(), PageError>;

    /// Waits for a new completed file since the last `arm_download`.
    async fn await_download(&self, timeout: Duration) -> Result<Option<DownloadedFile>, PageError>;
}
