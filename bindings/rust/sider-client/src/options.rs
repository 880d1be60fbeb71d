//! Client configuration options.

/// Options for configuring the Sider client connection.
///
/// # Example
///
/// ```rust
/// use sider_client::SiderClientOptions;
///
/// let options = SiderClientOptions::new("http://localhost:7777")
///     .with_credentials("john", "doe");
/// ```
#[derive(Clone)]
pub struct SiderClientOptions {
    /// The server URL (e.g., "http://localhost:7777")
    pub url: String,

    /// Login sent with every request
    pub login: String,

    /// Password sent with every request
    pub password: String,
}

impl SiderClientOptions {
    /// Create new options with the given server URL and empty credentials.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            login: String::new(),
            password: String::new(),
        }
    }

    /// Set the login and password used for authentication.
    pub fn with_credentials(mut self, login: impl Into<String>, password: impl Into<String>) -> Self {
        self.login = login.into();
        self.password = password.into();
        self
    }

    /// Create options from environment variables.
    ///
    /// Reads:
    /// - `SIDER_SERVER_URL` - Server URL (defaults to "http://127.0.0.1:7777")
    /// - `SIDER_LOGIN` - Login
    /// - `SIDER_PASSWORD` - Password
    pub fn from_env() -> Self {
        let url = std::env::var("SIDER_SERVER_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:7777".to_string());
        let login = std::env::var("SIDER_LOGIN").unwrap_or_default();
        let password = std::env::var("SIDER_PASSWORD").unwrap_or_default();

        Self { url, login, password }
    }
}

impl Default for SiderClientOptions {
    fn default() -> Self {
        Self::new("http://127.0.0.1:7777")
    }
}

impl std::fmt::Debug for SiderClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiderClientOptions")
            .field("url", &self.url)
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}
