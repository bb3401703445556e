//! # Authority Transaction Signing
//!
//! The issuing service signs every lifecycle transaction with one Ed25519
//! authority key. The gateway returns unsigned payload bytes; the signer
//! wraps them into a [`SignedTransaction`] carrying the operator account
//! and a detached signature over the raw payload.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};

use creda_core::AccountId;

use crate::error::GatewayError;
use crate::gateway::SignedTransaction;

/// Configuration for the authority signer.
#[derive(Debug, Clone)]
pub struct AuthorityConfig {
    /// The operator account transactions are signed on behalf of.
    pub account_id: AccountId,
    /// The Ed25519 secret key, base64-encoded (32 bytes).
    pub secret_key_b64: String,
}

/// Holds the authority's Ed25519 key and operator account.
///
/// Shared via `Arc` across the engine; signing is infallible once the key
/// has been parsed at construction time.
pub struct AuthoritySigner {
    signing_key: SigningKey,
    account_id: AccountId,
}

impl AuthoritySigner {
    /// Parse the authority key from configuration.
    pub fn from_config(config: &AuthorityConfig) -> Result<Self, GatewayError> {
        let raw = STANDARD
            .decode(&config.secret_key_b64)
            .map_err(|e| GatewayError::NotConfigured {
                reason: format!("authority secret key is not valid base64: {e}"),
            })?;
        let bytes: [u8; 32] = raw
            .as_slice()
            .try_into()
            .map_err(|_| GatewayError::NotConfigured {
                reason: format!("authority secret key must be 32 bytes, got {}", raw.len()),
            })?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&bytes),
            account_id: config.account_id.clone(),
        })
    }

    /// Generate a fresh signer. Test and provisioning plumbing.
    pub fn generate(account_id: AccountId) -> Self {
        let mut rng = rand_core::OsRng;
        Self {
            signing_key: SigningKey::generate(&mut rng),
            account_id,
        }
    }

    /// The operator account this signer acts for.
    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    /// The authority public key, multibase-encoded (base64url, `u` prefix).
    ///
    /// Passed to the gateway when registering DID documents.
    pub fn public_key_multibase(&self) -> String {
        let verifying = self.signing_key.verifying_key();
        format!("u{}", URL_SAFE_NO_PAD.encode(verifying.as_bytes()))
    }

    /// Sign an unsigned transaction payload from the gateway.
    pub fn sign(&self, payload: &[u8]) -> SignedTransaction {
        let signature = self.signing_key.sign(payload);
        SignedTransaction {
            payload: STANDARD.encode(payload),
            signature: STANDARD.encode(signature.to_bytes()),
            signer: self.account_id.clone(),
        }
    }
}

impl std::fmt::Debug for AuthoritySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthoritySigner")
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier};

    fn account() -> AccountId {
        AccountId::new("0.0.900").expect("account")
    }

    #[test]
    fn generated_signer_produces_verifiable_signatures() {
        let signer = AuthoritySigner::generate(account());
        let tx = signer.sign(b"unsigned-payload");

        assert_eq!(tx.signer, account());
        let payload = STANDARD.decode(&tx.payload).expect("payload b64");
        assert_eq!(payload, b"unsigned-payload");

        let sig_bytes = STANDARD.decode(&tx.signature).expect("signature b64");
        let signature = Signature::from_slice(&sig_bytes).expect("signature shape");
        signer
            .signing_key
            .verifying_key()
            .verify(&payload, &signature)
            .expect("signature verifies");
    }

    #[test]
    fn from_config_roundtrips_the_key() {
        let generated = AuthoritySigner::generate(account());
        let config = AuthorityConfig {
            account_id: account(),
            secret_key_b64: STANDARD.encode(generated.signing_key.to_bytes()),
        };
        let restored = AuthoritySigner::from_config(&config).expect("valid config");
        assert_eq!(
            restored.public_key_multibase(),
            generated.public_key_multibase()
        );
    }

    #[test]
    fn from_config_rejects_short_keys() {
        let config = AuthorityConfig {
            account_id: account(),
            secret_key_b64: STANDARD.encode([1u8; 16]),
        };
        assert!(matches!(
            AuthoritySigner::from_config(&config),
            Err(GatewayError::NotConfigured { .. })
        ));
    }

    #[test]
    fn multibase_key_carries_base64url_prefix() {
        let signer = AuthoritySigner::generate(account());
        let multibase = signer.public_key_multibase();
        assert!(multibase.starts_with('u'));
        assert!(URL_SAFE_NO_PAD.decode(&multibase[1..]).is_ok());
    }
}
