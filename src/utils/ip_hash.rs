//! Visitor IP anonymization.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Keyed hasher that turns client IPs into stable, non-reversible tokens.
///
/// The same IP always maps to the same hash for a given secret, so unique
/// visitors can still be counted without storing the address.
#[derive(Clone)]
pub struct IpHasher {
    secret: Vec<u8>,
}

impl IpHasher {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Returns the lowercase hex HMAC-SHA256 of `ip`, or `None` for an empty input.
    pub fn hash(&self, ip: &str) -> Option<String> {
        let ip = ip.trim();
        if ip.is_empty() {
            return None;
        }

        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(ip.as_bytes());
        Some(hex::encode(mac.finalize().into_bytes()))
    }
}

impl std::fmt::Debug for IpHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpHasher").finish_non_exhaustive()
    }
}
