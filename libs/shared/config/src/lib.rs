use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_url: String,
    pub store_service_key: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            store_url: env::var("LABOPS_STORE_URL")
                .unwrap_or_else(|_| {
                    warn!("LABOPS_STORE_URL not set, using empty value");
                    String::new()
                }),
            store_service_key: env::var("LABOPS_STORE_SERVICE_KEY")
                .unwrap_or_else(|_| {
                    warn!("LABOPS_STORE_SERVICE_KEY not set, using empty value");
                    String::new()
                }),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.store_url.is_empty() && !self.store_service_key.is_empty()
    }
}
