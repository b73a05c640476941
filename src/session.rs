//! Session lifecycle against the dashboard.
//!
//! One [`Session`] owns the cookie-backed HTTP client, the CSRF token and
//! the renewal timestamp. Every remote operation funnels through
//! [`Session::ensure_active`], which replays the full login + one-time
//! passcode protocol once the session goes stale (300 s by default).

use crate::config::DashboardConfig;
use crate::error::{PaybatchError, Result};
use crate::extract::extract_embedded;
use crate::otp;
use reqwest::blocking::{Client, RequestBuilder};
use std::time::Instant;

const CSRF_HEADER: &str = "x-csrf-token";
const CSRF_KEY: &str = "form_authenticity_token";
const TFA_KEY: &str = "tfaInfo";

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

pub struct Session {
    http: Client,
    config: DashboardConfig,
    credentials: Credentials,
    csrf_token: Option<String>,
    renewed_at: Option<Instant>,
}

impl Session {
    /// Builds an unauthenticated session. Redirects are never followed so
    /// that served pages (and their hydration blocks) are read as-is; a
    /// redirect status on login/OTP submission counts as success.
    pub fn new(config: DashboardConfig, credentials: Credentials) -> Result<Self> {
        let http = Client::builder()
            .cookie_store(true)
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            config,
            credentials,
            csrf_token: None,
            renewed_at: None,
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// No-op while the session is fresh; otherwise runs the renewal
    /// protocol. Must precede every remote operation.
    pub fn ensure_active(&mut self) -> Result<()> {
        match self.renewed_at {
            Some(renewed_at) if renewed_at.elapsed() <= self.config.session_max_age => {
                tracing::debug!("reusing active session");
                Ok(())
            }
            _ => self.renew(),
        }
    }

    /// Strictly ordered: CSRF token, credentials, one-time passcode, stamp.
    /// Failures here are terminal for the run; there is no retry.
    fn renew(&mut self) -> Result<()> {
        tracing::info!("renewing session");
        self.refresh_csrf()?;
        self.authenticate()?;
        self.verify_otp()?;
        self.renewed_at = Some(Instant::now());
        Ok(())
    }

    /// Reads the anti-forgery token off the login page and carries it as a
    /// header on all subsequent requests. Submission endpoints call this
    /// again even within an active session.
    pub fn refresh_csrf(&mut self) -> Result<()> {
        tracing::info!("updating csrf token");
        let body = self.http_get(self.config.login_url()).send()?.text()?;
        let token = extract_embedded(&body, CSRF_KEY)?;
        let token = token
            .as_str()
            .ok_or_else(|| PaybatchError::PayloadShape {
                key: CSRF_KEY.to_string(),
                detail: "expected a JSON string".to_string(),
            })?
            .to_string();
        self.csrf_token = Some(token);
        Ok(())
    }

    fn authenticate(&mut self) -> Result<()> {
        tracing::info!("authenticating user");
        let form = [
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.as_str()),
        ];
        let response = self.http_post(self.config.login_url()).form(&form).send()?;
        let status = response.status();
        let body = response.text()?;
        if !(status.is_success() || status.is_redirection()) || body.contains("error") {
            return Err(PaybatchError::AuthenticationFailed {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Fetches the challenge page, derives the current passcode from the
    /// served seed and submits it straight away; nothing may block between
    /// derivation and submission or the 30-second window can lapse.
    fn verify_otp(&mut self) -> Result<()> {
        tracing::info!("verifying one-time passcode");
        let challenge = self.http_get(self.config.otp_url()).send()?.text()?;
        let tfa_info = extract_embedded(&challenge, TFA_KEY)?;
        let seed = tfa_info
            .get("key")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| PaybatchError::PayloadShape {
                key: TFA_KEY.to_string(),
                detail: "missing 'key' field".to_string(),
            })?
            .to_string();
        let code = otp::derive_totp_now(&seed)?;
        let form = [
            ("method", "app"),
            ("auth_code", code.as_str()),
            ("key", seed.as_str()),
            ("remember_this_device", "false"),
        ];
        let response = self.http_post(self.config.otp_url()).form(&form).send()?;
        let status = response.status();
        let body = response.text()?;
        if !(status.is_success() || status.is_redirection()) || body.contains("error") {
            return Err(PaybatchError::OtpFailed {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// GET carrying the session's identifying headers and CSRF token.
    pub(crate) fn http_get(&self, url: String) -> RequestBuilder {
        self.decorate(self.http.get(url))
    }

    /// POST carrying the session's identifying headers and CSRF token.
    pub(crate) fn http_post(&self, url: String) -> RequestBuilder {
        self.decorate(self.http.post(url))
    }

    fn decorate(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.csrf_token {
            Some(token) => builder.header(CSRF_HEADER, token),
            None => builder,
        }
    }
}
