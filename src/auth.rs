//! Admin bearer-key check for gallery writes.

use crate::error::AppError;
use axum::http::{header, HeaderMap};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Token from `Authorization: Bearer <token>`. The token may be empty.
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

/// Accept the request only if it carries the configured admin key.
///
/// No bearer header is 401. A wrong key, or any key while none is
/// configured, is 403. Digests are compared so timing reveals neither
/// content nor length of the key.
pub fn require_admin(headers: &HeaderMap, admin_api_key: &str) -> Result<(), AppError> {
    let token = extract_bearer(headers).ok_or(AppError::Unauthorized)?;
    if admin_api_key.is_empty() {
        tracing::warn!("gallery write rejected: no admin key configured");
        return Err(AppError::Forbidden);
    }
    if bool::from(digest(token).ct_eq(&digest(admin_api_key))) {
        Ok(())
    } else {
        tracing::warn!("gallery write rejected: invalid api key");
        Err(AppError::Forbidden)
    }
}
