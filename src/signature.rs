//! GitHub webhook signature verification

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, error};

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_ALGORITHM: &str = "sha256";

/// Hex-encoded HMAC-SHA256 of `payload` keyed by `secret`.
pub fn compute_signature(secret: &str, payload: &[u8]) -> Option<String> {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(e) => {
            error!("Could not key HMAC: {}", e);
            return None;
        }
    };
    mac.update(payload);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Checks an `X-Hub-Signature-256` header value against the raw request body.
///
/// The header must look like `sha256=<hex>`. Anything else, including other
/// algorithms and values without `=`, is rejected. The digest comparison runs
/// in constant time.
pub fn verify(secret: &str, signature_header: &str, payload: &[u8]) -> bool {
    let Some((algorithm, their_signature)) = signature_header.split_once('=') else {
        debug!("Signature header has no '=' separator");
        return false;
    };

    if algorithm != SIGNATURE_ALGORITHM {
        debug!("Unsupported signature algorithm '{}'", algorithm);
        return false;
    }

    let Some(my_signature) = compute_signature(secret, payload) else {
        return false;
    };

    // Digest length is public, only the content must not leak
    if my_signature.len() != their_signature.len() {
        return false;
    }

    my_signature
        .as_bytes()
        .ct_eq(their_signature.as_bytes())
        .into()
}
