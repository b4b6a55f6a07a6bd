use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use tracing::debug;

use shared_models::auth::{AuthUser, JwtClaims};
use shared_models::records::UserRole;

type HmacSha256 = Hmac<Sha256>;

/// Issue an HS256 token for a user. Claims carry the subject, email, role,
/// and issue/expiry instants.
pub fn create_token(
    user_id: &str,
    email: &str,
    role: UserRole,
    jwt_secret: &str,
    expire_minutes: i64,
) -> Result<String, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let now = Utc::now();
    let exp = now + Duration::minutes(expire_minutes);

    let header = json!({
        "alg": "HS256",
        "typ": "JWT"
    });
    let claims = json!({
        "sub": user_id,
        "email": email,
        "role": role.to_string(),
        "iat": now.timestamp(),
        "exp": exp.timestamp()
    });

    let header_b64 = URL_SAFE_NO_PAD.encode(header.to_string());
    let claims_b64 = URL_SAFE_NO_PAD.encode(claims.to_string());
    let signing_input = format!("{}.{}", header_b64, claims_b64);

    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(signing_input.as_bytes());
    let signature = mac.finalize().into_bytes();

    Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
}

pub fn validate_token(token: &str, jwt_secret: &str) -> Result<AuthUser, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    // Split token into parts
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    let header_b64 = parts[0];
    let claims_b64 = parts[1];
    let signature_b64 = parts[2];

    let signature = match URL_SAFE_NO_PAD.decode(signature_b64) {
        Ok(sig) => sig,
        Err(e) => {
            debug!("Failed to decode signature: {}", e);
            return Err("Invalid signature encoding".to_string());
        }
    };

    let signing_input = format!("{}.{}", header_b64, claims_b64);

    let mut mac = match HmacSha256::new_from_slice(jwt_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return Err("Failed to create HMAC".to_string()),
    };
    mac.update(signing_input.as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err("Invalid token signature".to_string());
    }

    // Decode claims
    let claims_json = match URL_SAFE_NO_PAD.decode(claims_b64) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(json_str) => json_str,
            Err(_) => return Err("Invalid claims encoding".to_string()),
        },
        Err(_) => return Err("Invalid claims encoding".to_string()),
    };

    let claims: JwtClaims = match serde_json::from_str(&claims_json) {
        Ok(c) => c,
        Err(e) => {
            debug!("Failed to parse claims: {}", e);
            return Err("Invalid claims format".to_string());
        }
    };

    // Check expiration
    if let Some(exp) = claims.exp {
        let now = Utc::now().timestamp() as u64;
        if exp < now {
            debug!("Token expired at {} (now: {})", exp, now);
            return Err("Token expired".to_string());
        }
    }

    // Unknown roles are rejected at this boundary rather than defaulted
    let role: UserRole = claims.role.parse()?;

    let created_at = claims
        .iat
        .map(|timestamp| Utc.timestamp_opt(timestamp as i64, 0).single());

    let user = AuthUser {
        id: claims.sub,
        email: claims.email,
        role,
        created_at: created_at.flatten(),
    };

    debug!("Token validated successfully for user: {}", user.id);
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-jwt-validation-must-be-long-enough";

    #[test]
    fn issued_tokens_validate_and_carry_claims() {
        let token =
            create_token("user-1", "jane@example.com", UserRole::Patient, SECRET, 60).unwrap();
        let user = validate_token(&token, SECRET).unwrap();

        assert_eq!(user.id, "user-1");
        assert_eq!(user.email.as_deref(), Some("jane@example.com"));
        assert_eq!(user.role, UserRole::Patient);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let token =
            create_token("user-1", "jane@example.com", UserRole::Patient, SECRET, -5).unwrap();
        assert_eq!(validate_token(&token, SECRET).unwrap_err(), "Token expired");
    }

    #[test]
    fn wrong_secret_fails_signature_check() {
        let token =
            create_token("user-1", "jane@example.com", UserRole::Doctor, "other-secret", 60)
                .unwrap();
        assert!(validate_token(&token, SECRET).is_err());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(validate_token("not-a-token", SECRET).is_err());
        assert!(validate_token("a.b", SECRET).is_err());
    }
}
