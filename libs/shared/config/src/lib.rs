use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub jwt_secret: String,
    pub token_expire_minutes: i64,
    pub gemini_api_key: String,
    pub use_mock_agents: bool,
    pub agent_runtime_url: String,
    pub use_mock_email: bool,
    pub mail_api_url: String,
    pub mail_api_key: String,
    pub mail_from: String,
    pub clinic_name: String,
    pub clinic_phone: String,
    pub reminder_poll_seconds: u64,
    pub reminder_batch_size: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            token_expire_minutes: env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1440),
            gemini_api_key: env::var("GEMINI_API_KEY").unwrap_or_default(),
            use_mock_agents: env::var("USE_MOCK_AGENTS")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(true),
            agent_runtime_url: env::var("AGENT_RUNTIME_URL").unwrap_or_default(),
            use_mock_email: env::var("USE_MOCK_EMAIL")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(true),
            mail_api_url: env::var("MAIL_API_URL").unwrap_or_default(),
            mail_api_key: env::var("MAIL_API_KEY").unwrap_or_default(),
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "no-reply@auroraclinic.example".to_string()),
            clinic_name: env::var("CLINIC_NAME")
                .unwrap_or_else(|_| "Aurora Health Clinic".to_string()),
            clinic_phone: env::var("CLINIC_PHONE")
                .unwrap_or_else(|_| "+1 (555) 014-8892".to_string()),
            reminder_poll_seconds: env::var("REMINDER_POLL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            reminder_batch_size: env::var("REMINDER_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(50),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_service_key.is_empty()
            && !self.jwt_secret.is_empty()
    }

    pub fn is_email_configured(&self) -> bool {
        self.use_mock_email
            || (!self.mail_api_url.is_empty() && !self.mail_api_key.is_empty())
    }
}
