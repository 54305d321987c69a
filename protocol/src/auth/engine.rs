//! # Authorization Entry Engine
//!
//! Creates, digests, signs and checks authorization entries.
//!
//! ## Signature payload
//!
//! ```text
//!   digest = SHA-256( XDR( HashIdPreimage::SorobanAuthorization {
//!                network_id,                  // SHA-256(passphrase)
//!                nonce,
//!                signature_expiration_ledger,
//!                invocation,                  // the full root tree
//!            }))
//! ```
//!
//! Signer and verifier both go through [`digest_for_signing`]; there is no
//! second implementation of the payload anywhere in the crate.
//!
//! ## Nonces
//!
//! Every entry draws a fresh 64-bit nonce from the OS RNG. The ledger
//! records consumed nonces under the principal, so a replayed entry is
//! rejected on-chain. No registry is kept here: the OS RNG is safe to call
//! from any thread and collisions across 2^64 values are not a practical
//! concern.

use rand::rngs::OsRng;
use rand::Rng;
use stellar_xdr::curr::{
    Hash, HashIdPreimage, HashIdPreimageSorobanAuthorization, Limits, WriteXdr,
};
use tracing::{debug, warn};

use crate::address::Principal;
use crate::auth::credential::{AddressCredential, Credential, EntrySignature};
use crate::auth::entry::AuthorizationEntry;
use crate::config::Network;
use crate::crypto::hash::sha256_array;
use crate::crypto::keys::{verify_signature as verify_ed25519, Keypair};
use crate::error::{MismatchField, ProtocolError, Result};
use crate::invocation::InvocationNode;
use crate::value::Value;

/// Where fresh nonces come from.
pub trait NonceSource {
    fn next_nonce(&self) -> i64;
}

/// Uniformly random nonces from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsNonceSource;

impl NonceSource for OsNonceSource {
    fn next_nonce(&self) -> i64 {
        OsRng.gen::<i64>()
    }
}

/// A fresh unsigned entry for `principal` over `root`, with a random nonce.
pub fn create_unsigned_entry(
    principal: Principal,
    root: InvocationNode,
    expiration_ledger: u32,
) -> AuthorizationEntry {
    create_unsigned_entry_with(&OsNonceSource, principal, root, expiration_ledger)
}

/// Like [`create_unsigned_entry`] but drawing the nonce from `nonces`.
pub fn create_unsigned_entry_with(
    nonces: &dyn NonceSource,
    principal: Principal,
    root: InvocationNode,
    expiration_ledger: u32,
) -> AuthorizationEntry {
    let nonce = nonces.next_nonce();
    debug!(%principal, nonce, expiration_ledger, "created unsigned authorization entry");
    AuthorizationEntry::new(
        Credential::Address(AddressCredential {
            principal,
            nonce,
            signature_expiration_ledger: expiration_ledger,
            signature: None,
        }),
        root,
    )
}

/// The unhashed XDR preimage that [`digest_for_signing`] hashes.
pub fn signature_preimage(entry: &AuthorizationEntry, network: &Network) -> Result<Vec<u8>> {
    let credential = entry
        .address_credential()
        .ok_or(ProtocolError::NotAddressCredential)?;
    let preimage = HashIdPreimage::SorobanAuthorization(HashIdPreimageSorobanAuthorization {
        network_id: Hash(network.id()),
        nonce: credential.nonce,
        signature_expiration_ledger: credential.signature_expiration_ledger,
        invocation: entry.root_invocation().to_xdr()?,
    });
    Ok(preimage.to_xdr(Limits::none())?)
}

/// The 32 bytes a principal signs to authorize `entry` on `network`.
///
/// Deterministic: the same entry (signature excluded) and network always
/// produce the same digest.
pub fn digest_for_signing(entry: &AuthorizationEntry, network: &Network) -> Result<[u8; 32]> {
    Ok(sha256_array(&signature_preimage(entry, network)?))
}

/// Signs `entry` with `keypair`, returning the signed entry. Unsigned and
/// pending entries move to `Signed`.
///
/// # Errors
///
/// - [`ProtocolError::NotAddressCredential`] for source-account entries.
/// - [`ProtocolError::AlreadySigned`] if a signature is already attached;
///   the input entry is left as it was.
/// - [`ProtocolError::EntryRejected`] if the entry failed verification.
/// - [`ProtocolError::SignerKeyMismatch`] if the key does not belong to the
///   credential's principal.
/// - [`ProtocolError::ExpirationNotSet`] if the entry still expires at
///   ledger 0. See [`AuthorizationEntry::with_expiration`].
pub fn sign(
    entry: &AuthorizationEntry,
    keypair: &Keypair,
    network: &Network,
) -> Result<AuthorizationEntry> {
    let credential = match entry.signable_credential() {
        Ok(credential) => credential,
        Err(err) => {
            warn!(
                principal = ?entry.principal(),
                nonce = entry.nonce(),
                state = ?entry.state(),
                "refusing to sign authorization entry"
            );
            return Err(err);
        }
    };

    if keypair.principal() != credential.principal {
        return Err(ProtocolError::SignerKeyMismatch {
            principal: credential.principal.to_string(),
            key: keypair.public_key_strkey(),
        });
    }
    if credential.signature_expiration_ledger == 0 {
        return Err(ProtocolError::ExpirationNotSet {
            principal: credential.principal.to_string(),
            nonce: credential.nonce,
        });
    }

    let digest = digest_for_signing(entry, network)?;
    let signature = EntrySignature {
        public_key: keypair.public_key_bytes(),
        signature: keypair.sign(&digest),
    };

    debug!(
        principal = %credential.principal,
        nonce = credential.nonce,
        expiration_ledger = credential.signature_expiration_ledger,
        digest = %hex::encode(digest),
        "signed authorization entry"
    );

    entry.with_signature(signature)
}

/// Checks that `entry`'s root invocation is the one the signer expects.
///
/// Comparison order is contract, function name, argument count, then the
/// argument multiset. Argument order is not significant.
pub fn verify_matches(entry: &AuthorizationEntry, expected: &InvocationNode) -> Result<()> {
    let actual = entry.root_invocation();

    if actual.contract != expected.contract {
        return Err(ProtocolError::mismatch(
            MismatchField::Contract,
            expected.contract,
            actual.contract,
        ));
    }
    if actual.function != expected.function {
        return Err(ProtocolError::mismatch(
            MismatchField::FunctionName,
            &expected.function,
            &actual.function,
        ));
    }
    if actual.args.len() != expected.args.len() {
        return Err(ProtocolError::mismatch(
            MismatchField::ArgCount,
            expected.args.len(),
            actual.args.len(),
        ));
    }
    let expected_args = expected.sorted_args();
    let actual_args = actual.sorted_args();
    if expected_args != actual_args {
        return Err(ProtocolError::mismatch(
            MismatchField::Args,
            Value::Vec(expected_args),
            Value::Vec(actual_args),
        ));
    }
    Ok(())
}

/// Checks that a signed entry's signature was made by its principal over
/// its digest on `network`.
pub fn verify_signature(entry: &AuthorizationEntry, network: &Network) -> Result<()> {
    let credential = entry
        .address_credential()
        .ok_or(ProtocolError::NotAddressCredential)?;
    let signature = credential
        .signature
        .as_ref()
        .ok_or_else(|| ProtocolError::UnsignedEntryPresent {
            principal: credential.principal.to_string(),
            nonce: credential.nonce,
        })?;

    if Principal::Account(signature.public_key) != credential.principal {
        return Err(ProtocolError::SignerKeyMismatch {
            principal: credential.principal.to_string(),
            key: Principal::Account(signature.public_key).to_string(),
        });
    }

    let digest = digest_for_signing(entry, network)?;
    if !verify_ed25519(&signature.public_key, &digest, &signature.signature) {
        return Err(ProtocolError::InvalidSignature {
            principal: credential.principal.to_string(),
            nonce: credential.nonce,
        });
    }
    Ok(())
}

/// A fresh unsigned copy of `entry` with a new nonce.
///
/// Used after a failed submission: the old nonce may already be consumed,
/// and any signature over it is useless. Source-account entries carry no
/// nonce and come back unchanged.
pub fn renonce(entry: &AuthorizationEntry) -> AuthorizationEntry {
    renonce_with(&OsNonceSource, entry)
}

pub fn renonce_with(nonces: &dyn NonceSource, entry: &AuthorizationEntry) -> AuthorizationEntry {
    match entry.address_credential() {
        Some(c) => create_unsigned_entry_with(
            nonces,
            c.principal,
            entry.root_invocation().clone(),
            c.signature_expiration_ledger,
        ),
        None => entry.clone(),
    }
}
