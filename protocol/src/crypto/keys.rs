//! # Key Management
//!
//! Ed25519 keypairs for account principals.
//!
//! Secret keys travel as `S...` strkeys (that is how operators hand them to
//! the proxy and the air-gapped signer); public keys are `G...` strkeys and
//! double as the account principal.
//!
//! ## Security considerations
//!
//! - Secret key bytes are zeroized on drop by ed25519-dalek.
//! - `Debug` only ever prints the public half.
//! - Key bytes are never logged. The tracing calls in this crate log the
//!   principal (public key) and nothing else.

use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use stellar_strkey::{ed25519, Strkey};
use thiserror::Error;

use crate::address::Principal;

/// Errors that can occur during key operations.
///
/// These never echo the offending secret back to the caller.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key: expected an ed25519 'S...' strkey")]
    InvalidSecretKey,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,

    #[error("invalid signature bytes: expected 64 bytes, got {0}")]
    InvalidSignatureLength(usize),
}

/// An account keypair.
///
/// Not `Serialize`: persisting a secret is an explicit call to
/// [`Keypair::secret_strkey`], never a side effect of writing a work-file.
///
/// # Examples
///
/// ```
/// use authgap_protocol::crypto::Keypair;
///
/// let kp = Keypair::generate();
/// let sig = kp.sign(b"payload");
/// assert!(kp.verify(b"payload", &sig));
/// ```
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Constructs a keypair deterministically from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Parses an `S...` secret strkey.
    pub fn from_secret(secret: &str) -> Result<Self, KeyError> {
        match Strkey::from_string(secret.trim()) {
            Ok(Strkey::PrivateKeyEd25519(key)) => Ok(Self::from_seed(&key.0)),
            _ => Err(KeyError::InvalidSecretKey),
        }
    }

    /// The account principal (`G...`) controlled by this keypair.
    pub fn principal(&self) -> Principal {
        Principal::Account(self.public_key_bytes())
    }

    /// Raw 32-byte public key.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// The `G...` strkey of the public key.
    pub fn public_key_strkey(&self) -> String {
        ed25519::PublicKey(self.public_key_bytes()).to_string()
    }

    /// The `S...` strkey of the secret key. Handle with care.
    pub fn secret_strkey(&self) -> String {
        ed25519::PrivateKey(self.signing_key.to_bytes()).to_string()
    }

    /// Sign a message. Ed25519 is deterministic for a given (key, message).
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Verify a signature against this keypair's public key.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        verify_signature(&self.public_key_bytes(), message, signature)
    }

    /// The last four bytes of the public key, used to decorate envelope
    /// signatures so validators can pick the right signer quickly.
    pub fn signature_hint(&self) -> [u8; 4] {
        let pk = self.public_key_bytes();
        [pk[28], pk[29], pk[30], pk[31]]
    }
}

/// Verify an Ed25519 `signature` over `message` against a raw public key.
///
/// Returns `false` for malformed keys and signatures rather than erroring;
/// callers only need a yes/no answer here.
pub fn verify_signature(public_key: &[u8; 32], message: &[u8], signature: &[u8]) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
        return false;
    };
    verifying_key
        .verify(message, &Signature::from_bytes(&sig_bytes))
        .is_ok()
}

impl Clone for Keypair {
    fn clone(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Public half only.
        write!(f, "Keypair(pub={})", self.public_key_strkey())
    }
}

impl PartialEq for Keypair {
    fn eq(&self, other: &Self) -> bool {
        self.public_key_bytes() == other.public_key_bytes()
    }
}

impl Eq for Keypair {}
