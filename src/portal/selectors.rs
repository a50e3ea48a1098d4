use crate::browser::page::Sel;

/// Selector candidates for the e-distribuzione customer portal.
/// Lists are walked in order; the first match wins.
pub struct EdisSelectors;

impl EdisSelectors {
    /// Route fragment of the load-curve page, also the frame URL hint.
    pub const LOAD_CURVE_ROUTE: &'static str = "curvedicarico";

    // Login form
    pub const USERNAME_INPUTS: &'static [Sel] = &[
        Sel::Css("input[name='username']"),
        Sel::Css("#username"),
        Sel::Css("input[type='email']"),
        Sel::Css("input[name='email']"),
    ];

    pub const PASSWORD_INPUTS: &'static [Sel] = &[
        Sel::Css("input[name='password']"),
        Sel::Css("#password"),
        Sel::Css("input[type='password']"),
    ];

    pub const LOGIN_BUTTONS: &'static [Sel] = &[
        Sel::XPath("//button[contains(., 'Accedi')]"),
        Sel::XPath("//button[contains(., 'Login')]"),
        Sel::Css("button[type='submit']"),
        Sel::Css("input[type='submit']"),
    ];

    /// URL fragments that mean we are on (or were bounced to) a login page.
    pub const LOGIN_URL_MARKERS: &'static [&'static str] = &["login", "signon", "sso", "selfreg"];

    // Bot-verification walls
    pub const VERIFICATION_SELECTORS: &'static [Sel] = &[
        Sel::Css("iframe[src*='recaptcha']"),
        Sel::Css("iframe[src*='captcha']"),
        Sel::Css("div.g-recaptcha"),
        Sel::Css("iframe[title*='challenge']"),
    ];

    pub const VERIFICATION_TEXT_MARKERS: &'static [&'static str] = &[
        "captcha",
        "non sono un robot",
        "verifica di sicurezza",
        "security check",
        "unusual traffic",
    ];

    // Query form
    pub const POD_INPUTS: &'static [Sel] = &[
        Sel::Css("input[name='pod']"),
        Sel::Css("input[placeholder*='POD']"),
        Sel::Css("input[aria-label*='POD']"),
        Sel::Css("#pod"),
    ];

    pub const DATE_FROM_INPUTS: &'static [Sel] = &[
        Sel::Css("input[placeholder*='Inizio']"),
        Sel::Css("input[aria-label*='Inizio']"),
        Sel::Css("input[name*='start']"),
        Sel::Css("input[name*='inizio']"),
    ];

    pub const DATE_TO_INPUTS: &'static [Sel] = &[
        Sel::Css("input[placeholder*='Fine']"),
        Sel::Css("input[aria-label*='Fine']"),
        Sel::Css("input[name*='end']"),
        Sel::Css("input[name*='fine']"),
    ];

    // Download controls, most specific phrase first. Both apostrophe
    // variants of the quarter-hour button occur in the wild.
    pub const DOWNLOAD_CONTROLS: &'static [Sel] = &[
        Sel::XPath("//button[contains(normalize-space(.), \"Scarica il dettaglio del quarto d'ora\")]"),
        Sel::XPath("//button[contains(normalize-space(.), 'Scarica il dettaglio del quarto d’ora')]"),
        Sel::XPath("//button[contains(., 'Download CSV')]"),
        Sel::XPath("//a[contains(., 'Download CSV')]"),
        Sel::XPath("//button[contains(., 'Scarica CSV')]"),
        Sel::XPath("//a[contains(., 'Scarica CSV')]"),
        Sel::Css("#downloadCsv"),
        Sel::Css("button[data-download='csv']"),
        Sel::Css("a[download*='csv']"),
    ];

    // Frame scoring
    pub const FRAME_TEXT_LABELS: &'static [&'static str] =
        &["curva di carico", "curve di carico", "quarto d'ora"];

    pub const FRAME_URL_PENALTIES: &'static [&'static str] =
        &["liveagent", "chat", "assistant", "survey"];
}
