//! Webhook signature verification.
//!
//! The gateway signs each delivery with HMAC-SHA256 over the raw request
//! body and sends the hex digest in a header. Verification must run over the
//! exact bytes received; any upstream body transformation invalidates it.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Computes the hex HMAC-SHA256 signature for a payload.
///
/// This is what the gateway computes on its side; exposed for tests and for
/// the mock gateway.
pub fn sign(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a hex HMAC-SHA256 signature against the raw body.
///
/// The comparison runs in constant time (`Mac::verify_slice`); a plain `==`
/// over the hex strings would leak a timing side channel.
pub fn verify_signature(secret: &[u8], body: &[u8], signature_hex: &str) -> bool {
    let Ok(provided) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&provided).is_ok()
}
