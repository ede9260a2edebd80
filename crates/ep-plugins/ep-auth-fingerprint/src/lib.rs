//! # ep-auth-fingerprint
//!
//! HMAC-SHA256 implementation of `IdentityProvider`.
//! Turns request signals into the anonymous `client_hash` that scopes likes
//! and edits. Two clients behind the same NAT with the same browser build
//! share a fingerprint; that is accepted.

use ep_core::models::{ClientHash, ClientSignals};
use ep_core::traits::IdentityProvider;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub struct HmacFingerprinter {
    /// Keyed with the deployment salt so hashes cannot be recomputed from an IP alone
    mac: HmacSha256,
}

impl HmacFingerprinter {
    /// Accepts the salt from configuration. Changing it re-identifies every client.
    pub fn new(salt: &SecretString) -> anyhow::Result<Self> {
        let mac = HmacSha256::new_from_slice(salt.expose_secret().as_bytes())
            .map_err(|e| anyhow::anyhow!("invalid fingerprint salt: {e}"))?;
        Ok(Self { mac })
    }
}

impl IdentityProvider for HmacFingerprinter {
    /// Hex digest over the IP and user agent, separated so that
    /// ("1.2.3.4", "5x") and ("1.2.3.45", "x") do not collide.
    fn fingerprint(&self, signals: &ClientSignals) -> ClientHash {
        let mut mac = self.mac.clone();
        mac.update(signals.ip.as_bytes());
        mac.update(b"\n");
        mac.update(signals.user_agent.as_bytes());
        ClientHash(hex::encode(mac.finalize().into_bytes()))
    }
}
