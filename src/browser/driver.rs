use std::path::Path;

use fantoccini::{Client, ClientBuilder};
use serde_json::json;

use crate::config::Config;

/// Builds a chromedriver session with the profile the portal flow needs:
/// download directory preconfigured, eager page-load strategy, automation
/// markers stripped.
pub async fn create_webdriver_client(
    config: &Config,
    download_dir: &Path,
) -> Result<Client, fantoccini::error::NewSessionError> {
    let mut caps = serde_json::Map::new();

    // Chrome options
    let mut chrome_opts = serde_json::Map::new();

    let mut args = vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        "--disable-setuid-sandbox".to_string(),
        "--window-size=1366,900".to_string(),
        format!(
            "--lang={}",
            config.accept_language.split(',').next().unwrap_or("it-IT")
        ),
        "--exclude-switches=enable-automation".to_string(),
        "--disable-infobars".to_string(),
    ];

    if config.headless {
        args.push("--headless=new".to_string());
        args.push("--disable-software-rasterizer".to_string());
    }

    if let Some(proxy_url) = &config.proxy_url {
        args.push(format!("--proxy-server={}", proxy_url));
    }

    chrome_opts.insert("args".to_string(), json!(args));
    chrome_opts.insert("excludeSwitches".to_string(), json!(["enable-automation"]));

    // Downloads land in the per-run directory without a prompt.
    let mut prefs = serde_json::Map::new();
    prefs.insert(
        "download.default_directory".to_string(),
        json!(download_dir.to_string_lossy()),
    );
    prefs.insert("download.prompt_for_download".to_string(), json!(false));
    prefs.insert("download.directory_upgrade".to_string(), json!(true));
    prefs.insert("credentials_enable_service".to_string(), json!(false));
    prefs.insert("profile.password_manager_enabled".to_string(), json!(false));
    prefs.insert(
        "intl.accept_languages".to_string(),
        json!(config.accept_language),
    );
    chrome_opts.insert("prefs".to_string(), json!(prefs));

    caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));

    // Standard capabilities
    caps.insert("browserName".to_string(), json!("chrome"));
    caps.insert("acceptInsecureCerts".to_string(), json!(true));
    // Resolve navigation at document-parsed instead of the full load event.
    caps.insert("pageLoadStrategy".to_string(), json!("eager"));
    caps.insert(
        "timeouts".to_string(),
        json!({ "pageLoad": config.nav_timeout_ms, "script": 30_000 }),
    );

    tracing::info!("WebDriver session starting: {}", config.webdriver_url);

    let client = ClientBuilder::native()
        .capabilities(caps)
        .connect(&config.webdriver_url)
        .await?;

    let anti_detection_script = format!(
        r#"
        // Hide the webdriver property
        Object.defineProperty(navigator, 'webdriver', {{
            get: () => undefined
        }});

        // User agent override
        Object.defineProperty(navigator, 'userAgent', {{
            get: () => '{}'
        }});

        // Chrome runtime object
        window.navigator.chrome = {{
            runtime: {{}}
        }};

        // Permissions API
        const originalQuery = window.navigator.permissions.query;
        window.navigator.permissions.query = (parameters) => (
            parameters.name === 'notifications' ?
                Promise.resolve({{ state: Notification.permission }}) :
                originalQuery(parameters)
        );

        // Plugin array
        Object.defineProperty(navigator, 'plugins', {{
            get: () => [1, 2, 3, 4, 5]
        }});

        // Languages
        Object.defineProperty(navigator, 'languages', {{
            get: () => ['it-IT', 'it', 'en-US', 'en']
        }});
        "#,
        config.user_agent
    );

    if let Err(e) = client.execute(&anti_detection_script, vec![]).await {
        tracing::warn!("⚠️ Anti-detection script failed: {:?}", e);
    } else {
        tracing::debug!("✅ Anti-detection script applied");
    }

    tracing::info!("WebDriver session ready");

    Ok(client)
}
