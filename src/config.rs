use std::time::Duration;

/// Endpoints and session policy for one dashboard deployment.
///
/// The remote surface is a design contract, not a constant: every path can
/// be overridden, and the base URL always comes from the caller.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub base_url: String,
    pub login_path: String,
    pub otp_path: String,
    pub form_path: String,
    pub submit_path: String,
    pub bonus_path: String,
    /// Sessions older than this are renewed before use.
    pub session_max_age: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl DashboardConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            login_path: "/login".to_string(),
            otp_path: "/tfa".to_string(),
            form_path: "/payments/form".to_string(),
            submit_path: "/payments/submit".to_string(),
            bonus_path: "/payments/bonus".to_string(),
            session_max_age: Duration::from_secs(300),
            request_timeout: Duration::from_secs(30),
            user_agent: concat!(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_2) ",
                "AppleWebKit/537.36 (KHTML, like Gecko) ",
                "Chrome/85.0.4183.121 Safari/537.36",
            )
            .to_string(),
        }
    }

    pub fn login_url(&self) -> String {
        format!("{}{}", self.base_url, self.login_path)
    }

    pub fn otp_url(&self) -> String {
        format!("{}{}", self.base_url, self.otp_path)
    }

    pub fn form_url(&self) -> String {
        format!("{}{}", self.base_url, self.form_path)
    }

    pub fn submit_url(&self) -> String {
        format!("{}{}", self.base_url, self.submit_path)
    }

    pub fn bonus_url(&self) -> String {
        format!("{}{}", self.base_url, self.bonus_path)
    }
}
