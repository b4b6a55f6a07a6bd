use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::records::UserRole;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub iat: Option<u64>,
    pub email: Option<String>,
    pub role: String,
}

/// The authenticated caller, produced by the auth middleware and attached
/// to request extensions. The role has already been checked against the
/// closed set; unknown roles never get this far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub created_at: Option<DateTime<Utc>>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_doctor(&self) -> bool {
        self.role == UserRole::Doctor
    }

    pub fn is_patient(&self) -> bool {
        self.role == UserRole::Patient
    }
}
