// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Signed web-app payload validation.
//!
//! Bot web apps hand the front end an URL-encoded payload whose `hash`
//! field is HMAC-SHA256 over every other field:
//! - the check-string is the remaining `key=value` pairs sorted by key, joined with `\n`
//! - the signing key is HMAC-SHA256 of `"WebAppData"` keyed with the bot secret
//! - `auth_date` (Unix seconds) bounds the payload age
//!
//! Validation returns a bare `bool`. The rejection reason is only logged.

use std::collections::BTreeMap;
use std::fmt;

use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Maximum payload age accepted by default (24 hours).
pub const DEFAULT_MAX_AGE_SECS: i64 = 86_400;

const SIGNING_KEY_MESSAGE: &[u8] = b"WebAppData";
const HASH_FIELD: &str = "hash";
const AUTH_DATE_FIELD: &str = "auth_date";

/// Largest `auth_date` still read as seconds; anything above is milliseconds.
const MAX_SECONDS_TIMESTAMP: i64 = 9_999_999_999;

/// Why a payload was turned down. Never leaves this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Empty,
    MissingHash,
    InvalidKey,
    BadSignature,
    MalformedAuthDate,
    Expired,
}

/// Validates signed payloads against one secret.
#[derive(Clone)]
pub struct Validator {
    secret: String,
    max_age_secs: i64,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("secret", &"<redacted>")
            .field("max_age_secs", &self.max_age_secs)
            .finish()
    }
}

impl Validator {
    /// Create a validator with the default 24 hour expiry window.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            max_age_secs: DEFAULT_MAX_AGE_SECS,
        }
    }

    /// Set the maximum accepted payload age in seconds.
    pub fn with_max_age(mut self, max_age_secs: i64) -> Self {
        self.max_age_secs = max_age_secs;
        self
    }

    pub fn max_age_secs(&self) -> i64 {
        self.max_age_secs
    }

    /// Validate `payload` against the current wall clock.
    pub fn validate(&self, payload: &str) -> bool {
        self.validate_at(payload, chrono::Utc::now().timestamp())
    }

    /// Validate `payload` as if the current time were `now` (Unix seconds).
    pub fn validate_at(&self, payload: &str, now: i64) -> bool {
        match self.check(payload, now) {
            Ok(()) => true,
            Err(reason) => {
                debug!(?reason, "Rejected signed payload");
                false
            }
        }
    }

    fn check(&self, payload: &str, now: i64) -> Result<(), Rejection> {
        if payload.is_empty() {
            return Err(Rejection::Empty);
        }

        let mut fields = parse_fields(payload);
        let provided = fields.remove(HASH_FIELD).ok_or(Rejection::MissingHash)?;

        let expected = sign(&fields, &self.secret).map_err(|_| Rejection::InvalidKey)?;
        if !bool::from(expected.as_bytes().ct_eq(provided.as_bytes())) {
            return Err(Rejection::BadSignature);
        }

        let auth_date = match fields.get(AUTH_DATE_FIELD) {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| Rejection::MalformedAuthDate)?,
            None => 0,
        };
        let auth_date = if auth_date > MAX_SECONDS_TIMESTAMP {
            auth_date / 1000
        } else {
            auth_date
        };

        if auth_date != 0 && now.saturating_sub(auth_date) > self.max_age_secs {
            return Err(Rejection::Expired);
        }

        Ok(())
    }
}

/// Validate `payload` with `secret` and the default expiry window.
pub fn validate(payload: &str, secret: &str) -> bool {
    Validator::new(secret).validate(payload)
}

/// Compute the lowercase hex `hash` for `fields` (which must not include `hash`).
pub fn sign(fields: &BTreeMap<String, String>, secret: &str) -> Result<String, InvalidLength> {
    let mut key_mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    key_mac.update(SIGNING_KEY_MESSAGE);
    let signing_key = key_mac.finalize().into_bytes();

    let mut mac = HmacSha256::new_from_slice(&signing_key)?;
    mac.update(check_string(fields).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Encode `fields` as a query string with a matching `hash` appended.
pub fn signed_payload(
    fields: &BTreeMap<String, String>,
    secret: &str,
) -> Result<String, InvalidLength> {
    let hash = sign(fields, secret)?;
    Ok(url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .append_pair(HASH_FIELD, &hash)
        .finish())
}

/// Canonical `key=value` lines, sorted by key.
pub fn check_string(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

// A repeated key keeps its last value.
fn parse_fields(payload: &str) -> BTreeMap<String, String> {
    url::form_urlencoded::parse(payload.as_bytes())
        .into_owned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "123456:TEST-bot-token";
    const AUTH_DATE: i64 = 1_700_000_000;

    fn fields() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("auth_date".to_string(), AUTH_DATE.to_string()),
            ("query_id".to_string(), "AAH-test".to_string()),
            (
                "user".to_string(),
                r#"{"id":42,"first_name":"Ivan"}"#.to_string(),
            ),
        ])
    }

    #[test]
    fn test_check_string_is_sorted_and_newline_joined() {
        assert_eq!(
            check_string(&fields()),
            "auth_date=1700000000\nquery_id=AAH-test\nuser={\"id\":42,\"first_name\":\"Ivan\"}"
        );
    }

    #[test]
    fn test_sign_known_vector() {
        assert_eq!(
            sign(&fields(), SECRET).unwrap(),
            "e7e541d174ee3d6f19564202d52868a990e5620960a7a8deb356f3c26e12cfaa"
        );
    }

    #[test]
    fn test_validate_known_payload() {
        let payload = "auth_date=1700000000&query_id=AAH-test\
                       &user=%7B%22id%22%3A42%2C%22first_name%22%3A%22Ivan%22%7D\
                       &hash=e7e541d174ee3d6f19564202d52868a990e5620960a7a8deb356f3c26e12cfaa";
        let validator = Validator::new(SECRET);
        assert!(validator.validate_at(payload, AUTH_DATE + 60));
    }

    #[test]
    fn test_field_order_in_payload_does_not_matter() {
        let payload = "hash=e7e541d174ee3d6f19564202d52868a990e5620960a7a8deb356f3c26e12cfaa\
                       &user=%7B%22id%22%3A42%2C%22first_name%22%3A%22Ivan%22%7D\
                       &query_id=AAH-test&auth_date=1700000000";
        assert!(Validator::new(SECRET).validate_at(payload, AUTH_DATE));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let payload = signed_payload(&fields(), SECRET).unwrap();
        assert!(!Validator::new("another-secret").validate_at(&payload, AUTH_DATE));
    }

    #[test]
    fn test_missing_hash_is_rejected() {
        let payload = "auth_date=1700000000&query_id=AAH-test";
        let validator = Validator::new(SECRET);
        assert_eq!(
            validator.check(payload, AUTH_DATE),
            Err(Rejection::MissingHash)
        );
        assert!(!validator.validate_at(payload, AUTH_DATE));
    }

    #[test]
    fn test_empty_payload_is_rejected() {
        let validator = Validator::new(SECRET);
        assert_eq!(validator.check("", AUTH_DATE), Err(Rejection::Empty));
        assert!(!validator.validate(""));
    }

    #[test]
    fn test_uppercase_hash_is_rejected() {
        let hash = sign(&fields(), SECRET).unwrap().to_uppercase();
        let payload = format!(
            "auth_date={AUTH_DATE}&query_id=AAH-test&user=%7B%22id%22%3A42%2C%22first_name%22%3A%22Ivan%22%7D&hash={hash}"
        );
        assert_eq!(
            Validator::new(SECRET).check(&payload, AUTH_DATE),
            Err(Rejection::BadSignature)
        );
    }

    #[test]
    fn test_truncated_hash_is_rejected() {
        let mut hash = sign(&fields(), SECRET).unwrap();
        hash.pop();
        let mut signed = fields();
        signed.insert("hash".to_string(), hash);
        let payload = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&signed)
            .finish();
        assert_eq!(
            Validator::new(SECRET).check(&payload, AUTH_DATE),
            Err(Rejection::BadSignature)
        );
    }

    #[test]
    fn test_expiry_window_boundary() {
        let payload = signed_payload(&fields(), SECRET).unwrap();
        let validator = Validator::new(SECRET);
        assert!(validator.validate_at(&payload, AUTH_DATE + DEFAULT_MAX_AGE_SECS));
        assert_eq!(
            validator.check(&payload, AUTH_DATE + DEFAULT_MAX_AGE_SECS + 1),
            Err(Rejection::Expired)
        );
    }

    #[test]
    fn test_custom_max_age() {
        let payload = signed_payload(&fields(), SECRET).unwrap();
        let validator = Validator::new(SECRET).with_max_age(300);
        assert_eq!(validator.max_age_secs(), 300);
        assert!(validator.validate_at(&payload, AUTH_DATE + 300));
        assert!(!validator.validate_at(&payload, AUTH_DATE + 301));
    }

    #[test]
    fn test_millisecond_auth_date_is_normalized() {
        let mut fields = fields();
        fields.insert("auth_date".to_string(), (AUTH_DATE * 1000).to_string());
        let payload = signed_payload(&fields, SECRET).unwrap();
        let validator = Validator::new(SECRET);
        assert!(validator.validate_at(&payload, AUTH_DATE + 10));
        assert!(!validator.validate_at(&payload, AUTH_DATE + DEFAULT_MAX_AGE_SECS + 1));
    }

    #[test]
    fn test_missing_or_zero_auth_date_skips_expiry() {
        let mut without = fields();
        without.remove("auth_date");
        let payload = signed_payload(&without, SECRET).unwrap();
        assert!(Validator::new(SECRET).validate_at(&payload, i64::MAX));

        let mut zero = fields();
        zero.insert("auth_date".to_string(), "0".to_string());
        let payload = signed_payload(&zero, SECRET).unwrap();
        assert!(Validator::new(SECRET).validate_at(&payload, i64::MAX));
    }

    #[test]
    fn test_non_numeric_auth_date_is_rejected() {
        let mut fields = fields();
        fields.insert("auth_date".to_string(), "yesterday".to_string());
        let payload = signed_payload(&fields, SECRET).unwrap();
        assert_eq!(
            Validator::new(SECRET).check(&payload, AUTH_DATE),
            Err(Rejection::MalformedAuthDate)
        );
    }

    #[test]
    fn test_blank_values_are_signed() {
        let mut fields = fields();
        fields.insert("start_param".to_string(), String::new());
        let payload = signed_payload(&fields, SECRET).unwrap();
        assert!(payload.contains("start_param=&"));
        assert!(Validator::new(SECRET).validate_at(&payload, AUTH_DATE));
    }

    #[test]
    fn test_duplicate_key_keeps_last_value() {
        let mut fields = fields();
        fields.insert("query_id".to_string(), "second".to_string());
        let hash = sign(&fields, SECRET).unwrap();
        let payload = format!(
            "auth_date={AUTH_DATE}&query_id=first&query_id=second&user=%7B%22id%22%3A42%2C%22first_name%22%3A%22Ivan%22%7D&hash={hash}"
        );
        assert!(Validator::new(SECRET).validate_at(&payload, AUTH_DATE));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", Validator::new(SECRET));
        assert!(!rendered.contains(SECRET));
        assert!(rendered.contains("<redacted>"));
    }
}
