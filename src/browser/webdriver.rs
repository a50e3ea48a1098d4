use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use fantoccini::cookies::Cookie;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, Locator};
use serde_json::json;
use tokio::sync::Mutex;

use crate::portal::storage_state::{OriginState, StorageItem, StorageState, StoredCookie};

use super::page::{DownloadedFile, FrameHandle, ImportStats, PageError, PortalPage, Sel};

fn wd(e: CmdError) -> PageError {
    PageError::WebDriver(e.to_string())
}

fn locator(sel: &Sel) -> Locator<'static> {
    match *sel {
        Sel::Css(s) => Locator::Css(s),
        Sel::XPath(s) => Locator::XPath(s),
    }
}

fn is_partial(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("crdownload") | Some("tmp") | Some("part")
    )
}

/// WebDriver-backed page. Downloads are observed through the per-run
/// download directory the Chrome profile points at.
pub struct WebDriverPage {
    client: Client,
    download_dir: PathBuf,
    baseline: Mutex<HashSet<PathBuf>>,
}

impl WebDriverPage {
    pub fn new(client: Client, download_dir: PathBuf) -> Self {
        Self {
            client,
            download_dir,
            baseline: Mutex::new(HashSet::new()),
        }
    }

    /// Closes the browser session and removes the per-run download directory.
    pub async fn shutdown(self) {
        if let Err(e) = self.client.close().await {
            tracing::warn!("⚠️ WebDriver close failed: {}", e);
        }
        if self.download_dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.download_dir) {
                tracing::warn!("⚠️ download dir cleanup failed: {}", e);
            }
        }
    }

    async fn first_displayed(&self, sel: &Sel) -> Result<Option<Element>, PageError> {
        let elems = self.client.find_all(locator(sel)).await.map_err(wd)?;
        for elem in elems {
            if elem.is_displayed().await.unwrap_or(false) {
                return Ok(Some(elem));
            }
        }
        Ok(None)
    }

    fn list_downloads(&self) -> HashSet<PathBuf> {
        let mut files = HashSet::new();
        if let Ok(entries) = std::fs::read_dir(&self.download_dir) {
            for entry in entries.flatten() {
                files.insert(entry.path());
            }
        }
        files
    }
}

#[async_trait]
impl PortalPage for WebDriverPage {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), PageError> {
        match tokio::time::timeout(timeout, self.client.goto(url)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(wd(e)),
            Err(_) => Err(PageError::Timeout(format!(
                "goto {} exceeded {:?}",
                url, timeout
            ))),
        }
    }

    async fn current_url(&self) -> Result<String, PageError> {
        self.client
            .current_url()
            .await
            .map(|u| u.to_string())
            .map_err(wd)
    }

    async fn ready_state(&self) -> Result<String, PageError> {
        let value = self
            .client
            .execute("return document.readyState;", vec![])
            .await
            .map_err(wd)?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn settle(&self, timeout: Duration) -> bool {
        let js = r#"
            return {
                readyState: document.readyState,
                activeRequests: performance.getEntriesByType('resource')
                    .filter(r => !r.responseEnd).length
            };
        "#;

        let start = Instant::now();
        while start.elapsed() < timeout {
            tokio::time::sleep(Duration::from_millis(500)).await;

            if let Ok(value) = self.client.execute(js, vec![]).await {
                let ready = value
                    .get("readyState")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                let active = value
                    .get("activeRequests")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(u64::MAX);
                if ready == "complete" && active == 0 {
                    return true;
                }
            }
        }
        false
    }

    async fn count(&self, sel: &Sel) -> Result<usize, PageError> {
        self.client
            .find_all(locator(sel))
            .await
            .map(|elems| elems.len())
            .map_err(wd)
    }

    async fn fill(&self, sel: &Sel, value: &str) -> Result<bool, PageError> {
        match self.first_displayed(sel).await? {
            Some(elem) => {
                if let Err(e) = elem.clear().await {
                    tracing::debug!("clear failed on {}: {}", sel.describe(), e);
                }
                elem.send_keys(value).await.map_err(wd)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn click(&self, sel: &Sel) -> Result<bool, PageError> {
        match self.first_displayed(sel).await? {
            Some(elem) => {
                elem.click().await.map_err(wd)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn press_enter(&self, sel: &Sel) -> Result<bool, PageError> {
        match self.first_displayed(sel).await? {
            Some(elem) => {
                elem.send_keys("\n").await.map_err(wd)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn body_text(&self) -> Result<String, PageError> {
        let body = match self.client.find(Locator::Css("body")).await {
            Ok(elem) => elem,
            Err(_) => return Ok(String::new()),
        };
        Ok(body.text().await.unwrap_or_default())
    }

    async fn frames(&self) -> Result<Vec<FrameHandle>, PageError> {
        let elems = self
            .client
            .find_all(Locator::Css("iframe"))
            .await
            .map_err(wd)?;
        let mut frames = Vec::with_capacity(elems.len());
        for (index, elem) in elems.into_iter().enumerate() {
            let url = elem.attr("src").await.ok().flatten().unwrap_or_default();
            frames.push(FrameHandle {
                index: index as u16,
                url,
            });
        }
        Ok(frames)
    }

    async fn enter_frame(&self, index: u16) -> Result<(), PageError> {
        self.client
            .clone()
            .enter_frame(Some(index))
            .await
            .map(|_| ())
            .map_err(wd)
    }

    async fn enter_top(&self) -> Result<(), PageError> {
        self.client
            .clone()
            .enter_frame(None)
            .await
            .map(|_| ())
            .map_err(wd)
    }

    async fn import_state(&self, state: &StorageState) -> Result<ImportStats, PageError> {
        let mut stats = ImportStats::default();

        let url = self.client.current_url().await.map_err(wd)?;
        let host = url.host_str().unwrap_or_default().to_string();

        for stored in &state.cookies {
            // WebDriver can only attach cookies for the visited origin.
            let domain = stored.domain.trim_start_matches('.');
            if !domain.is_empty() && host != domain && !host.ends_with(&format!(".{}", domain)) {
                stats.cookies_skipped += 1;
                continue;
            }

            let mut cookie = Cookie::new(stored.name.clone(), stored.value.clone());
            if !stored.domain.is_empty() {
                cookie.set_domain(stored.domain.clone());
            }
            cookie.set_path(stored.path.clone());
            cookie.set_secure(stored.secure);
            cookie.set_http_only(stored.http_only);

            match self.client.add_cookie(cookie).await {
                Ok(()) => stats.cookies_set += 1,
                Err(e) => {
                    tracing::debug!("cookie {} rejected: {}", stored.name, e);
                    stats.cookies_skipped += 1;
                }
            }
        }

        for origin in &state.origins {
            if !host.is_empty() && origin.origin.contains(&host) {
                for item in &origin.local_storage {
                    let script =
                        "window.localStorage.setItem(arguments[0], arguments[1]); return true;";
                    let args = vec![json!(item.name), json!(item.value)];
                    if self.client.execute(script, args).await.is_ok() {
                        stats.local_storage_set += 1;
                    }
                }
            } else {
                stats.origins_skipped += 1;
            }
        }

        Ok(stats)
    }

    async fn export_state(&self) -> Result<StorageState, PageError> {
        let cookies = self.client.get_all_cookies().await.map_err(wd)?;
        let stored = cookies
            .iter()
            .map(|c| StoredCookie {
                name: c.name().to_string(),
                value: c.value().to_string(),
                domain: c.domain().unwrap_or_default().to_string(),
                path: c.path().unwrap_or("/").to_string(),
                expires: c.expires_datetime().map(|t| t.unix_timestamp() as f64),
                http_only: c.http_only().unwrap_or(false),
                secure: c.secure().unwrap_or(false),
                same_site: c.same_site().map(|s| s.to_string()),
            })
            .collect();

        let url = self.client.current_url().await.map_err(wd)?;
        let origin = url.origin().ascii_serialization();

        let script = r#"
            var out = [];
            for (var i = 0; i < window.localStorage.length; i++) {
                var key = window.localStorage.key(i);
                out.push({ name: key, value: window.localStorage.getItem(key) });
            }
            return out;
        "#;
        let items: Vec<StorageItem> = match self.client.execute(script, vec![]).await {
            Ok(value) => serde_json::from_value(value).unwrap_or_default(),
            Err(_) => Vec::new(),
        };

        let origins = if items.is_empty() {
            Vec::new()
        } else {
            vec![OriginState {
                origin,
                local_storage: items,
            }]
        };

        Ok(StorageState {
            cookies: stored,
            origins,
        })
    }

    async fn arm_download(&self) -> Result<(), PageError> {
        std::fs::create_dir_all(&self.download_dir)?;
        let mut baseline = self.baseline.lock().await;
        *baseline = self.list_downloads();
        Ok(())
    }

    async fn await_download(&self, timeout: Duration) -> Result<Option<DownloadedFile>, PageError> {
        let baseline = self.baseline.lock().await.clone();
        let start = Instant::now();

        loop {
            for path in self.list_downloads() {
                if baseline.contains(&path) || is_partial(&path) {
                    continue;
                }

                // Complete once the size is non-zero and stable.
                let len1 = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(300)).await;
                let len2 = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                if len1 == 0 || len1 != len2 {
                    continue;
                }

                let bytes = std::fs::read(&path)?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "download.csv".to_string());
                return Ok(Some(DownloadedFile { file_name, bytes }));
            }

            if start.elapsed() >= timeout {
                return Ok(None);
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }
}
