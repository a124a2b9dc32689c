/// Dashboard client for a backend-for-frontend (BFF) deployment
///
/// The backend performs the real OAuth exchange and keeps tokens
/// server-side; this client carries only the session cookie and renders
/// what comes back.
use crate::error::{PkceError, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Configuration for reaching the backend
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Origin of the backend, e.g. `http://localhost:8080`
    pub backend_url: String,
    /// Provider registration id; login goes through
    /// `/oauth2/authorization/{provider}`
    pub provider: String,
}

/// Session status as reported by the backend
#[derive(Debug, Clone, Deserialize)]
pub struct UserStatus {
    #[serde(default)]
    pub authenticated: bool,
    pub name: Option<String>,
    pub email: Option<String>,
    pub picture: Option<String>,
}

/// HTTP client for the backend's session and proxy endpoints
pub struct DashboardClient {
    config: DashboardConfig,
    base: Url,
    http: reqwest::blocking::Client,
}

impl DashboardClient {
    /// Create a client for the configured backend.
    ///
    /// The cookie store is enabled: the backend session cookie is the only
    /// credential this side ever holds.
    pub fn new(config: DashboardConfig) -> Result<Self> {
        let base = Url::parse(&config.backend_url)?;
        let http = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { config, base, http })
    }

    /// URL that starts the backend-driven login redirect
    pub fn login_url(&self) -> Result<String> {
        Ok(self
            .base
            .join(&format!("oauth2/authorization/{}", self.config.provider))?
            .into())
    }

    /// URL that ends the backend session
    pub fn logout_url(&self) -> Result<String> {
        Ok(self.base.join("logout")?.into())
    }

    /// Open the login URL in the default browser
    pub fn open_login(&self) -> Result<()> {
        webbrowser::open(&self.login_url()?)?;
        Ok(())
    }

    /// Fetch the session status from `/api/user-status`.
    ///
    /// An anonymous session yields `authenticated: false` with no profile
    /// fields.
    pub fn user_status(&self) -> Result<UserStatus> {
        let url = self.base.join("api/user-status")?;
        let status: UserStatus = self
            .http
            .get(url)
            .send()?
            .error_for_status()?
            .json()?;
        debug!(authenticated = status.authenticated, "fetched user status");
        Ok(status)
    }

    /// Fetch protected content from `/api/photos`.
    ///
    /// The backend proxies the resource server with its stored JWT; the
    /// response body comes back verbatim. Non-2xx responses surface as
    /// `InvalidResponse` carrying the status code.
    pub fn photos(&self) -> Result<String> {
        let url = self.base.join("api/photos")?;
        let response = self.http.get(url).send()?;
        let code = response.status();
        if !code.is_success() {
            warn!(status = %code, "photos fetch failed");
            return Err(PkceError::InvalidResponse(format!(
                "photos fetch returned status {}",
                code
            )));
        }
        Ok(response.text()?)
    }
}
