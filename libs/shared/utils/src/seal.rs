//! HMAC-sealed values for round-tripping server state through hidden form fields.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde::{de::DeserializeOwned, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug, PartialEq)]
pub enum SealError {
    #[error("Sealing secret is not set")]
    MissingSecret,

    #[error("Sealed value is malformed")]
    Malformed,

    #[error("Sealed value failed verification")]
    BadSignature,

    #[error("Sealed value could not be decoded: {0}")]
    Decode(String),
}

fn mac_for(secret: &str, payload: &str) -> Result<HmacSha256, SealError> {
    if secret.is_empty() {
        return Err(SealError::MissingSecret);
    }
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SealError::MissingSecret)?;
    mac.update(payload.as_bytes());
    Ok(mac)
}

/// `base64url(json).base64url(hmac_sha256(json))`
pub fn seal<T: Serialize>(value: &T, secret: &str) -> Result<String, SealError> {
    let json = serde_json::to_string(value).map_err(|e| SealError::Decode(e.to_string()))?;
    let payload = URL_SAFE_NO_PAD.encode(json);
    let signature = mac_for(secret, &payload)?.finalize().into_bytes();

    Ok(format!("{}.{}", payload, URL_SAFE_NO_PAD.encode(signature)))
}

pub fn open<T: DeserializeOwned>(sealed: &str, secret: &str) -> Result<T, SealError> {
    let (payload, signature_b64) = sealed.trim().split_once('.').ok_or(SealError::Malformed)?;
    let signature = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|_| SealError::Malformed)?;

    mac_for(secret, payload)?
        .verify_slice(&signature)
        .map_err(|_| SealError::BadSignature)?;

    let json = URL_SAFE_NO_PAD.decode(payload).map_err(|_| SealError::Malformed)?;
    serde_json::from_slice(&json).map_err(|e| SealError::Decode(e.to_string()))
}
