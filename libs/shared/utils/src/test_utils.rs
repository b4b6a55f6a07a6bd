use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::AuthUser;
use shared_models::records::UserRole;

use crate::jwt::create_token;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_store_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            token_expire_minutes: 1440,
            gemini_api_key: String::new(),
            use_mock_agents: true,
            agent_runtime_url: String::new(),
            use_mock_email: true,
            mail_api_url: String::new(),
            mail_api_key: String::new(),
            mail_from: "no-reply@test.example".to_string(),
            clinic_name: "Aurora Health Clinic".to_string(),
            clinic_phone: "+1 (555) 014-8892".to_string(),
            reminder_poll_seconds: 60,
            reminder_batch_size: 50,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: UserRole,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: UserRole::Patient,
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: UserRole) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role,
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, UserRole::Doctor)
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, UserRole::Patient)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, UserRole::Admin)
    }

    pub fn to_auth_user(&self) -> AuthUser {
        AuthUser {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: self.role,
            created_at: Some(Utc::now()),
        }
    }

    pub fn bearer_token(&self, secret: &str) -> String {
        create_token(&self.id, &self.email, self.role, secret, 60)
            .expect("test token creation")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert!(app_config.use_mock_email);
        assert!(!app_config.jwt_secret.is_empty());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::doctor("doc@example.com");
        assert_eq!(user.email, "doc@example.com");
        assert_eq!(user.role, UserRole::Doctor);

        let auth_user = user.to_auth_user();
        assert_eq!(auth_user.email, Some(user.email.clone()));
        assert_eq!(auth_user.id, user.id);
    }

    #[test]
    fn bearer_tokens_have_three_segments() {
        let user = TestUser::default();
        let token = user.bearer_token("test-secret");
        assert_eq!(token.split('.').count(), 3);
    }
}
