use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_HOSTNAME: &str = "icenet";
pub const DEFAULT_USERNAME: &str = "icenet";
pub const DEFAULT_TIMEZONE: &str = "America/New_York";
pub const DEFAULT_LOCALE: &str = "en_US.UTF-8";

/// Everything the backend needs for one installation. Edited while the
/// wizard collects input; the session copies it when installation starts.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallConfig {
    #[serde(default)]
    pub disk_path: Option<String>,
    #[serde(default = "default_hostname")]
    pub hostname: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(skip)]
    pub password: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_locale")]
    pub locale: String,
}

fn default_hostname() -> String {
    DEFAULT_HOSTNAME.to_string()
}

fn default_username() -> String {
    DEFAULT_USERNAME.to_string()
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            disk_path: None,
            hostname: default_hostname(),
            username: default_username(),
            password: String::new(),
            timezone: default_timezone(),
            locale: default_locale(),
        }
    }
}

impl fmt::Debug for InstallConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallConfig")
            .field("disk_path", &self.disk_path)
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timezone", &self.timezone)
            .field("locale", &self.locale)
            .finish()
    }
}

/// What the summary page shows. Never carries the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallSummary {
    pub disk_path: String,
    pub hostname: String,
    pub username: String,
    pub timezone: String,
    pub locale: String,
}

impl fmt::Display for InstallSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Installation Disk: {}", self.disk_path)?;
        writeln!(f, "Hostname: {}", self.hostname)?;
        writeln!(f, "Username: {}", self.username)?;
        writeln!(f, "Timezone: {}", self.timezone)?;
        write!(f, "Locale: {}", self.locale)
    }
}
