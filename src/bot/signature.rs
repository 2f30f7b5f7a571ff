use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("webhook secret is not valid base64")]
    BadSecret,
    #[error("signature header is missing or malformed")]
    MissingSignature,
    #[error("no signature matched the payload")]
    NoMatch,
}

fn mac_for(secret: &str, msg_id: &str, timestamp: &str, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
    // Secrets are base64, optionally carrying the provider's `whsec_` prefix.
    let key = BASE64
        .decode(secret.strip_prefix("whsec_").unwrap_or(secret))
        .map_err(|_| SignatureError::BadSecret)?;

    let mut mac =
        HmacSha256::new_from_slice(&key).map_err(|_| SignatureError::BadSecret)?;
    mac.update(msg_id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    Ok(mac)
}

/// Verify a webhook signature header against the raw payload.
///
/// The signed content is `"{id}.{timestamp}.{payload}"`; the header holds
/// space-separated `v1,<base64>` candidates and verification succeeds if any
/// candidate matches. An unverifiable webhook must be rejected before its
/// payload is trusted.
pub fn verify_signature(
    secret: &str,
    msg_id: &str,
    timestamp: &str,
    payload: &[u8],
    signature_header: &str,
) -> Result<(), SignatureError> {
    let mac = mac_for(secret, msg_id, timestamp, payload)?;

    let mut saw_candidate = false;
    for candidate in signature_header.split_whitespace() {
        let Some((version, encoded)) = candidate.split_once(',') else {
            continue;
        };
        if version != "v1" {
            continue;
        }
        saw_candidate = true;

        let Ok(signature) = BASE64.decode(encoded) else {
            continue;
        };
        if mac.clone().verify_slice(&signature).is_ok() {
            return Ok(());
        }
    }

    if saw_candidate {
        Err(SignatureError::NoMatch)
    } else {
        Err(SignatureError::MissingSignature)
    }
}

/// Produce the `v1,...` signature for a payload. Counterpart of
/// `verify_signature`, used by tests standing in for the provider.
pub fn sign_payload(
    secret: &str,
    msg_id: &str,
    timestamp: &str,
    payload: &[u8],
) -> Result<String, SignatureError> {
    let mac = mac_for(secret, msg_id, timestamp, payload)?;
    let signature = mac.finalize().into_bytes();
    Ok(format!("v1,{}", BASE64.encode(signature)))
}
