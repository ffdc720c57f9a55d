use rocket::data::{Limits, ToByteUnit};
use rocket::figment::Figment;
use rocket::figment::providers::Env;
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "INTERNHUB_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: String,
    pub upload_dir: String,
    pub session_hours: i64,
    pub default_page_size: i64,
    pub max_page_size: i64,
    pub ccpd_code: String,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    /// Comma-separated origins, or `*`.
    pub cors_origins: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://internhub.db?mode=rwc".to_string(),
            upload_dir: "uploads".to_string(),
            session_hours: 24 * 7,
            default_page_size: 10,
            max_page_size: 100,
            ccpd_code: "nitw-ccpd-2025".to_string(),
            admin_email: None,
            admin_password: None,
            cors_origins: "*".to_string(),
        }
    }
}

impl AppConfig {
    /// Rocket's own figment plus upload limits, `INTERNHUB_*` and a bare `DATABASE_URL`.
    pub fn figment() -> Figment {
        let limits = Limits::default()
            .limit("file", 2.mebibytes())
            .limit("data-form", 3.mebibytes());

        rocket::Config::figment()
            .merge(("limits", limits))
            .merge(Env::raw().only(&["database_url"]).global())
            .merge(Env::prefixed(ENV_PREFIX).global())
    }

    pub fn from_figment(figment: &Figment) -> Result<Self, rocket::figment::Error> {
        let config: AppConfig = figment.extract()?;
        Ok(config.normalized())
    }

    fn normalized(mut self) -> Self {
        if self.max_page_size < 1 {
            self.max_page_size = AppConfig::default().max_page_size;
        }
        self.default_page_size = self.default_page_size.clamp(1, self.max_page_size);
        if self.session_hours < 1 {
            self.session_hours = AppConfig::default().session_hours;
        }
        self
    }
}
