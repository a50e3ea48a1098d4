use std::path::PathBuf;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::browser::driver::create_webdriver_client;
use crate::browser::page::{DownloadedFile, PageError, PortalPage};
use crate::browser::webdriver::WebDriverPage;
use crate::config::Config;
use crate::utils::{normalize_portal_date, parse_input_date};

use super::error::SessionError;
use super::frames::select_content_frame;
use super::log::RunLog;
use super::login::{self, Credentials};
use super::parser::{parse_load_curve, LoadCurveRow, ParseStats};
use super::selectors::EdisSelectors;
use super::storage_state::{StateStore, StorageState};

/// Inputs for one refresh run.
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub pod: String,
    pub date_from: String,
    pub date_to: String,
    pub use_storage: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl SessionParams {
    /// Rejects bad requests before any browser side effect.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.pod.trim().is_empty() {
            return Err(SessionError::Input("pod is required".to_string()));
        }
        let from = parse_input_date(&self.date_from).map_err(SessionError::Input)?;
        let to = parse_input_date(&self.date_to).map_err(SessionError::Input)?;
        if from > to {
            return Err(SessionError::Input(format!(
                "date_from {} is after date_to {}",
                self.date_from, self.date_to
            )));
        }
        if !self.use_storage && self.credentials().is_none() {
            return Err(SessionError::Input(
                "username and password are required when use_storage is false".to_string(),
            ));
        }
        Ok(())
    }

    pub fn pod_normalized(&self) -> String {
        self.pod.trim().to_uppercase()
    }

    fn credentials(&self) -> Option<Credentials> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some(Credentials {
                username: u.to_string(),
                password: p.to_string(),
            }),
            _ => None,
        }
    }
}

/// Behavior knobs for one run, derived from `Config`.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub start_url: String,
    pub nav_timeout: Duration,
    pub idle_wait: Duration,
    pub login_timeout: Duration,
    pub download_timeout: Duration,
    pub persist_session: bool,
    pub state_path: PathBuf,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            start_url: config.start_url.clone(),
            nav_timeout: Duration::from_millis(config.nav_timeout_ms),
            idle_wait: Duration::from_millis(config.idle_wait_ms),
            login_timeout: Duration::from_millis(config.login_timeout_ms),
            download_timeout: Duration::from_millis(config.download_timeout_ms),
            persist_session: config.persist_session,
            state_path: PathBuf::from(&config.storage_state_path),
        }
    }

    pub fn state_store(&self) -> StateStore {
        StateStore::new(&self.state_path)
    }
}

/// Result of a successful refresh.
#[derive(Debug)]
pub struct RefreshOutcome {
    pub csv: String,
    pub file_name: String,
    pub rows: Vec<LoadCurveRow>,
    pub stats: ParseStats,
}

/// Runs one full refresh against a live browser. Input validation and the
/// storage-state read happen before the WebDriver connection, so rejected
/// requests never cost a browser session.
pub async fn refresh_load_curve(
    config: &Config,
    params: &SessionParams,
    log: &mut RunLog,
) -> Result<RefreshOutcome, SessionError> {
    params.validate()?;

    let settings = SessionSettings::from_config(config);
    let state = if params.use_storage {
        let state = settings.state_store().load()?;
        log.push(format!(
            "storage state loaded: {} cookies, {} origins",
            state.cookies.len(),
            state.origins.len()
        ));
        Some(state)
    } else {
        None
    };

    let download_dir = PathBuf::from(&config.download_dir).join(Uuid::new_v4().to_string());
    let client = create_webdriver_client(config, &download_dir)
        .await
        .map_err(|e| {
            SessionError::Browser(PageError::Other(format!("webdriver session: {}", e)))
        })?;
    log.push("browser session started");

    let page = WebDriverPage::new(client, download_dir);
    let result = run_session(&page, &settings, params, state, log).await;
    page.shutdown().await;
    log.push("browser session closed");

    result
}

/// Drives the portal flow on an already-open page. Split from the browser
/// bootstrap so tests can script the page.
pub async fn run_session(
    page: &dyn PortalPage,
    settings: &SessionSettings,
    params: &SessionParams,
    state: Option<StorageState>,
    log: &mut RunLog,
) -> Result<RefreshOutcome, SessionError> {
    let pod = params.pod_normalized();
    if !pod.starts_with("IT") {
        log.push(format!("warning: pod '{}' does not look like an IT… code", pod));
    }

    // Cookies attach only on the portal origin, so restoration navigates
    // twice: origin first, target after.
    if let Some(state) = &state {
        let origin = origin_of(&settings.start_url);
        navigate_with_fallback(page, &origin, settings, log).await?;
        let stats = page.import_state(state).await?;
        log.push(format!(
            "storage state applied: {} cookies set, {} skipped, {} localStorage keys",
            stats.cookies_set, stats.cookies_skipped, stats.local_storage_set
        ));
    }

    navigate_with_fallback(page, &settings.start_url, settings, log).await?;
    if page.settle(settings.idle_wait).await {
        log.push("page settled");
    } else {
        log.push("page still busy after idle wait, continuing");
    }

    if let Some(reason) = login::detect_challenge(page).await? {
        log.push(format!("navigation: {}", reason));
        return Err(SessionError::VerificationChallenge(reason));
    }

    if login::is_login_page(page).await? {
        log.push("login page detected");
        let creds = params.credentials().ok_or_else(|| {
            SessionError::Input("login required but no credentials available".to_string())
        })?;
        login::perform_login(page, &creds, settings.login_timeout, log).await?;

        if settings.persist_session {
            persist_state(page, settings, log).await;
        }

        // The portal may land on a dashboard after login.
        let url = page.current_url().await.map_err(SessionError::Browser)?;
        if !url.to_lowercase().contains(EdisSelectors::LOAD_CURVE_ROUTE) {
            navigate_with_fallback(page, &settings.start_url, settings, log).await?;
        }
        page.settle(settings.idle_wait).await;
    }

    select_content_frame(page, log)
        .await
        .map_err(SessionError::Browser)?;

    fill_query_form(page, &pod, params, log).await?;

    let file = capture_download(page, settings, log).await?;
    let (rows, stats) = parse_load_curve(&file.bytes);
    log.push(format!(
        "csv parsed: {} rows used, {} skipped (delimiter '{}')",
        stats.rows_used, stats.rows_skipped, stats.delimiter
    ));

    Ok(RefreshOutcome {
        csv: String::from_utf8_lossy(&file.bytes).into_owned(),
        file_name: file.file_name,
        rows,
        stats,
    })
}

/// Saves the live session back to disk. Failures degrade to log warnings.
async fn persist_state(page: &dyn PortalPage, settings: &SessionSettings, log: &mut RunLog) {
    match page.export_state().await {
        Ok(new_state) => match settings.state_store().save(&new_state) {
            Ok(()) => log.push(format!(
                "storage state saved to {} ({} cookies)",
                settings.state_path.display(),
                new_state.cookies.len()
            )),
            Err(e) => log.push(format!("warning: storage state not saved: {}", e)),
        },
        Err(e) => log.push(format!("warning: storage state export failed: {}", e)),
    }
}

/// Primary goto, one retry, then a readyState poll before giving up.
async fn navigate_with_fallback(
    page: &dyn PortalPage,
    url: &str,
    settings: &SessionSettings,
    log: &mut RunLog,
) -> Result<(), SessionError> {
    match page.navigate(url, settings.nav_timeout).await {
        Ok(()) => {
            log.push(format!("goto {}", url));
            return Ok(());
        }
        Err(e) => log.push(format!("goto failed ({}), retrying once", e)),
    }

    tokio::time::sleep(Duration::from_millis(1000)).await;
    match page.navigate(url, settings.nav_timeout).await {
        Ok(()) => {
            log.push(format!("goto {} (second attempt)", url));
            return Ok(());
        }
        Err(e) => log.push(format!("second goto failed ({}), polling readyState", e)),
    }

    let start = Instant::now();
    loop {
        let ready = page.ready_state().await.unwrap_or_default();
        if ready == "interactive" || ready == "complete" {
            log.push(format!("document reached readyState={}", ready));
            return Ok(());
        }
        if start.elapsed() >= settings.nav_timeout {
            return Err(SessionError::timeout(
                "navigation",
                format!("{} stuck in readyState '{}'", url, ready),
            ));
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}

/// Fills POD and the date range. A missing field is a logged warning, not
/// an abort.
async fn fill_query_form(
    page: &dyn PortalPage,
    pod: &str,
    params: &SessionParams,
    log: &mut RunLog,
) -> Result<(), SessionError> {
    match login::fill_first(page, EdisSelectors::POD_INPUTS, pod).await? {
        Some(sel) => log.push(format!("pod filled via {}", sel.describe())),
        None => log.push("warning: pod input not found, skipping"),
    }

    let date_from = normalize_portal_date(&params.date_from).map_err(SessionError::Input)?;
    let date_to = normalize_portal_date(&params.date_to).map_err(SessionError::Input)?;

    match login::fill_first(page, EdisSelectors::DATE_FROM_INPUTS, &date_from).await? {
        Some(sel) => log.push(format!("date_from {} filled via {}", date_from, sel.describe())),
        None => log.push("warning: date_from input not found, skipping"),
    }

    match login::fill_first(page, EdisSelectors::DATE_TO_INPUTS, &date_to).await? {
        Some(sel) => log.push(format!("date_to {} filled via {}", date_to, sel.describe())),
        None => log.push("warning: date_to input not found, skipping"),
    }

    Ok(())
}

/// Walks the download candidates in order. Every attempt lands in the log
/// with its match count; a clicked-but-silent control is reported apart
/// from a missing one.
async fn capture_download(
    page: &dyn PortalPage,
    settings: &SessionSettings,
    log: &mut RunLog,
) -> Result<DownloadedFile, SessionError> {
    let mut clicked_any = false;

    for sel in EdisSelectors::DOWNLOAD_CONTROLS {
        let count = page.count(sel).await?;
        log.push(format!("download candidate {} match={}", sel.describe(), count));
        if count == 0 {
            continue;
        }

        page.arm_download().await?;
        if !page.click(sel).await? {
            log.push(format!(
                "download candidate {} present but not clickable",
                sel.describe()
            ));
            continue;
        }
        clicked_any = true;
        log.push(format!("download candidate {} clicked", sel.describe()));

        match page.await_download(settings.download_timeout).await? {
            Some(file) => {
                log.push(format!(
                    "download captured: {} ({} bytes)",
                    file.file_name,
                    file.bytes.len()
                ));
                return Ok(file);
            }
            None => log.push(format!(
                "no download event within {:?} after {}",
                settings.download_timeout,
                sel.describe()
            )),
        }
    }

    if clicked_any {
        Err(SessionError::DownloadNotCaptured(
            "a download control was clicked but no file arrived; the export may run as an in-page fetch".to_string(),
        ))
    } else {
        Err(SessionError::ControlNotFound(
            "no download control matched on the load-curve page".to_string(),
        ))
    }
}

fn origin_of(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(u) => u.origin().ascii_serialization(),
        Err(_) => url.to_string(),
    }
}
