use std::time::{Duration, Instant};

use crate::browser::page::{PageError, PortalPage, Sel};
use crate::utils::mask_sensitive;

use super::error::SessionError;
use super::log::RunLog;
use super::selectors::EdisSelectors;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Fills the first candidate with a visible match. Returns the selector
/// that matched, if any.
pub async fn fill_first(
    page: &dyn PortalPage,
    candidates: &[Sel],
    value: &str,
) -> Result<Option<Sel>, PageError> {
    for sel in candidates {
        if page.fill(sel, value).await? {
            return Ok(Some(*sel));
        }
    }
    Ok(None)
}

/// Clicks the first candidate with a visible match.
pub async fn click_first(page: &dyn PortalPage, candidates: &[Sel]) -> Result<Option<Sel>, PageError> {
    for sel in candidates {
        if page.click(sel).await? {
            return Ok(Some(*sel));
        }
    }
    Ok(None)
}

async fn press_enter_first(
    page: &dyn PortalPage,
    candidates: &[Sel],
) -> Result<Option<Sel>, PageError> {
    for sel in candidates {
        if page.press_enter(sel).await? {
            return Ok(Some(*sel));
        }
    }
    Ok(None)
}

/// True when the current page looks like the portal login screen: a login
/// URL marker or a visible password field.
pub async fn is_login_page(page: &dyn PortalPage) -> Result<bool, PageError> {
    let url = page.current_url().await?.to_lowercase();
    for marker in EdisSelectors::LOGIN_URL_MARKERS {
        if url.contains(marker) {
            return Ok(true);
        }
    }
    for sel in EdisSelectors::PASSWORD_INPUTS {
        if page.count(sel).await? > 0 {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Scans the page for bot-verification walls (captcha frames, challenge
/// phrases).
pub async fn detect_challenge(page: &dyn PortalPage) -> Result<Option<String>, PageError> {
    for sel in EdisSelectors::VERIFICATION_SELECTORS {
        if page.count(sel).await? > 0 {
            return Ok(Some(format!(
                "challenge element present: {}",
                sel.describe()
            )));
        }
    }
    let body = page.body_text().await?.to_lowercase();
    for marker in EdisSelectors::VERIFICATION_TEXT_MARKERS {
        if body.contains(marker) {
            return Ok(Some(format!("challenge text present: '{}'", marker)));
        }
    }
    Ok(None)
}

/// Fills credentials, submits, and waits for the URL to leave the login
/// page. Challenge detection runs before typing and again while waiting.
pub async fn perform_login(
    page: &dyn PortalPage,
    creds: &Credentials,
    timeout: Duration,
    log: &mut RunLog,
) -> Result<(), SessionError> {
    if let Some(reason) = detect_challenge(page).await? {
        log.push(format!("login: {}", reason));
        return Err(SessionError::VerificationChallenge(reason));
    }

    match fill_first(page, EdisSelectors::USERNAME_INPUTS, &creds.username).await? {
        Some(sel) => log.push(format!(
            "login: username {} filled via {}",
            mask_sensitive(&creds.username),
            sel.describe()
        )),
        None => {
            return Err(SessionError::ControlNotFound(
                "username input on login page".to_string(),
            ))
        }
    }

    match fill_first(page, EdisSelectors::PASSWORD_INPUTS, &creds.password).await? {
        Some(sel) => log.push(format!("login: password filled via {}", sel.describe())),
        None => {
            return Err(SessionError::ControlNotFound(
                "password input on login page".to_string(),
            ))
        }
    }

    match click_first(page, EdisSelectors::LOGIN_BUTTONS).await? {
        Some(sel) => log.push(format!("login: submit via {}", sel.describe())),
        None => {
            // No button matched; Enter in the password field submits the form.
            if press_enter_first(page, EdisSelectors::PASSWORD_INPUTS)
                .await?
                .is_none()
            {
                return Err(SessionError::ControlNotFound(
                    "login submit control".to_string(),
                ));
            }
            log.push("login: submit via Enter key");
        }
    }

    let start = Instant::now();
    loop {
        tokio::time::sleep(Duration::from_millis(500)).await;

        if !is_login_page(page).await? {
            log.push(format!("login: completed in {:?}", start.elapsed()));
            return Ok(());
        }

        if let Some(reason) = detect_challenge(page).await? {
            log.push(format!("login: {}", reason));
            return Err(SessionError::VerificationChallenge(reason));
        }

        if start.elapsed() >= timeout {
            log.push("login: still on the login page after submit");
            return Err(SessionError::AuthenticationFailed(
                "login page persisted after submit".to_string(),
            ));
        }
    }
}
