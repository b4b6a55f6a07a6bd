use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use shared_models::records::UserRole;

fn default_role() -> UserRole {
    UserRole::Patient
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(default = "default_role")]
    pub role: UserRole,
    pub phone: Option<String>,
    pub specialty: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// User data returned to clients; the password hash never leaves the cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub specialty: Option<String>,
    pub bio: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl UserResponse {
    pub fn from_row(id: &str, row: &Value, role: UserRole) -> Self {
        Self {
            id: id.to_string(),
            email: row["email"].as_str().unwrap_or_default().to_string(),
            full_name: row["full_name"].as_str().unwrap_or_default().to_string(),
            role,
            phone: row["phone"].as_str().map(str::to_string),
            specialty: row["specialty"].as_str().map(str::to_string),
            bio: row["bio"].as_str().map(str::to_string),
            created_at: row["created_at"]
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserResponse,
}

impl TokenResponse {
    pub fn bearer(access_token: String, user: UserResponse) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
            user,
        }
    }
}
