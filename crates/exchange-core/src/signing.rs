//! RSA-PSS request signing for exchange authentication.
//!
//! Every authenticated request carries the access-key identifier, a
//! millisecond Unix timestamp, and a base64 signature over
//! `timestamp + method + path` (path without query string).

use crate::{Error, Result};
use base64::Engine;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::pss::SigningKey;
use rsa::signature::{RandomizedSigner, SignatureEncoding};
use rsa::RsaPrivateKey;
use sha2::Sha256;
use std::path::Path;

/// Signs outbound exchange requests with the operator's RSA private key.
///
/// PSS salt length equals the SHA-256 digest length, matching the
/// exchange's verification parameters.
pub struct RequestSigner {
    access_key: String,
    signing_key: SigningKey<Sha256>,
}

impl RequestSigner {
    /// Create a signer from an already-loaded private key.
    pub fn new(access_key: String, private_key: RsaPrivateKey) -> Self {
        Self {
            access_key,
            signing_key: SigningKey::<Sha256>::new(private_key),
        }
    }

    /// Load the private key from a PEM file (PKCS#8 or PKCS#1).
    pub fn from_pem_file(access_key: String, path: impl AsRef<Path>) -> Result<Self> {
        let pem = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
            message: format!(
                "Could not read private key file {}: {}",
                path.as_ref().display(),
                e
            ),
        })?;

        let private_key = RsaPrivateKey::from_pkcs8_pem(&pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(&pem))
            .map_err(|e| Error::Signing {
                message: format!("Invalid RSA private key PEM: {}", e),
            })?;

        Ok(Self::new(access_key, private_key))
    }

    /// The access-key identifier sent alongside each signature.
    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// Sign one request. `path` must exclude the query string.
    pub fn sign(&self, timestamp_ms: i64, method: &str, path: &str) -> Result<String> {
        let message = format!("{}{}{}", timestamp_ms, method, path);
        let mut rng = rand::thread_rng();

        let signature = self
            .signing_key
            .try_sign_with_rng(&mut rng, message.as_bytes())
            .map_err(|e| Error::Signing {
                message: format!("RSA-PSS signing failed: {}", e),
            })?;

        Ok(base64::engine::general_purpose::STANDARD.encode(signature.to_bytes()))
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("access_key", &self.access_key)
            .field("signing_key", &"[REDACTED]")
            .finish()
    }
}
