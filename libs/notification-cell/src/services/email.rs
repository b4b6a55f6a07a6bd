use regex::Regex;
use reqwest::Client;
use serde_json::json;
use tracing::{error, info};

use shared_config::AppConfig;

/// Email delivery. Mock mode (the default) logs instead of sending; real
/// mode posts to the configured HTTP mail API. Delivery failures are
/// reported as `false`, never as errors.
pub struct EmailService {
    mock: bool,
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl EmailService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            mock: config.use_mock_email,
            client: Client::new(),
            api_url: config.mail_api_url.clone(),
            api_key: config.mail_api_key.clone(),
            from: config.mail_from.clone(),
        }
    }

    pub async fn send(
        &self,
        to_email: &str,
        subject: &str,
        html_body: &str,
        text_body: Option<&str>,
    ) -> bool {
        if self.mock {
            info!("[MOCK EMAIL] To: {}", to_email);
            info!("[MOCK EMAIL] Subject: {}", subject);
            let preview: String = html_body.chars().take(200).collect();
            info!("[MOCK EMAIL] Body preview: {}...", preview);
            return true;
        }

        if self.api_url.is_empty() || self.api_key.is_empty() {
            error!("Mail API is not configured. Set MAIL_API_URL and MAIL_API_KEY or set USE_MOCK_EMAIL=true");
            return false;
        }

        let text = text_body
            .map(str::to_string)
            .unwrap_or_else(|| html_to_text(html_body));

        let message = json!({
            "from": self.from,
            "to": to_email,
            "subject": subject,
            "html": html_body,
            "text": text,
        });

        let result = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&message)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                info!("Email sent successfully to {}", to_email);
                true
            }
            Ok(response) => {
                error!("Failed to send email to {}: status {}", to_email, response.status());
                false
            }
            Err(e) => {
                error!("Failed to send email to {}: {}", to_email, e);
                false
            }
        }
    }
}

/// Plain-text alternative derived from an HTML body.
pub fn html_to_text(html: &str) -> String {
    match Regex::new(r"<[^<]+?>") {
        Ok(re) => re.replace_all(html, "").trim().to_string(),
        Err(_) => html.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_utils::test_utils::TestConfig;

    #[tokio::test]
    async fn mock_mode_always_reports_delivery() {
        let service = EmailService::new(&TestConfig::default().to_app_config());
        assert!(
            service
                .send("jane@example.com", "Hello", "<p>Hi</p>", None)
                .await
        );
    }

    #[tokio::test]
    async fn unconfigured_real_mode_reports_failure() {
        let mut config = TestConfig::default().to_app_config();
        config.use_mock_email = false;
        let service = EmailService::new(&config);

        assert!(
            !service
                .send("jane@example.com", "Hello", "<p>Hi</p>", None)
                .await
        );
    }

    #[test]
    fn html_to_text_strips_markup() {
        assert_eq!(html_to_text("<p>Hello <strong>Jane</strong></p>"), "Hello Jane");
    }
}
