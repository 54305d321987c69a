//! Signed transaction envelopes.
//!
//! The envelope hash is
//!
//! ```text
//!   SHA-256( XDR( TransactionSignaturePayload { network_id, Tx(tx) } ) )
//! ```
//!
//! and the source account signs it directly. Signatures are decorated with
//! a four-byte hint (the last bytes of the public key).

use stellar_xdr::curr::{
    DecoratedSignature, Hash, Limits, MuxedAccount, ReadXdr, Signature, SignatureHint,
    Transaction, TransactionEnvelope, TransactionSignaturePayload,
    TransactionSignaturePayloadTaggedTransaction, TransactionV1Envelope, Uint256, WriteXdr,
};

use crate::address::Principal;
use crate::config::Network;
use crate::crypto::hash::sha256_array;
use crate::crypto::keys::{verify_signature, Keypair};
use crate::error::{ProtocolError, Result};

/// A signed, immutable transaction envelope ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransactionEnvelope {
    envelope: TransactionV1Envelope,
    hash: [u8; 32],
}

/// The hash the source account signs.
pub fn transaction_hash(tx: &Transaction, network: &Network) -> Result<[u8; 32]> {
    let payload = TransactionSignaturePayload {
        network_id: Hash(network.id()),
        tagged_transaction: TransactionSignaturePayloadTaggedTransaction::Tx(tx.clone()),
    };
    Ok(sha256_array(&payload.to_xdr(Limits::none())?))
}

impl SignedTransactionEnvelope {
    pub(crate) fn sign(tx: Transaction, keys: &Keypair, network: &Network) -> Result<Self> {
        let hash = transaction_hash(&tx, network)?;
        let signature = DecoratedSignature {
            hint: SignatureHint(keys.signature_hint()),
            signature: Signature(keys.sign(&hash).to_vec().try_into()?),
        };
        Ok(Self {
            envelope: TransactionV1Envelope {
                tx,
                signatures: vec![signature].try_into()?,
            },
            hash,
        })
    }

    /// Decodes a base64 envelope, recomputing its hash for `network`.
    pub fn from_base64(s: &str, network: &Network) -> Result<Self> {
        match TransactionEnvelope::from_xdr_base64(s.trim(), Limits::none())? {
            TransactionEnvelope::Tx(envelope) => {
                let hash = transaction_hash(&envelope.tx, network)?;
                Ok(Self { envelope, hash })
            }
            other => Err(ProtocolError::InvalidArgValue {
                arg_type: "envelope".into(),
                reason: format!("unsupported envelope type {}", other.name()),
            }),
        }
    }

    /// The transaction hash this envelope was signed over.
    pub fn hash(&self) -> [u8; 32] {
        self.hash
    }

    pub fn sequence(&self) -> i64 {
        self.envelope.tx.seq_num.0
    }

    /// Total fee: inclusion plus resource fee.
    pub fn fee(&self) -> u32 {
        self.envelope.tx.fee
    }

    pub fn source_account(&self) -> Principal {
        match &self.envelope.tx.source_account {
            MuxedAccount::Ed25519(Uint256(key)) => Principal::Account(*key),
            MuxedAccount::MuxedEd25519(m) => Principal::Account(m.ed25519.0),
        }
    }

    pub fn transaction(&self) -> &Transaction {
        &self.envelope.tx
    }

    pub fn to_xdr(&self) -> TransactionEnvelope {
        TransactionEnvelope::Tx(self.envelope.clone())
    }

    pub fn to_xdr_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.to_xdr().to_xdr(Limits::none())?)
    }

    pub fn to_base64(&self) -> Result<String> {
        Ok(self.to_xdr().to_xdr_base64(Limits::none())?)
    }

    /// Checks that the source account signed this envelope for `network`.
    pub fn verify(&self, network: &Network) -> Result<()> {
        let hash = transaction_hash(&self.envelope.tx, network)?;
        let source = self.source_account();
        let signed = self.envelope.signatures.iter().any(|sig| {
            sig.hint.0 == source.as_bytes()[28..32]
                && verify_signature(source.as_bytes(), &hash, sig.signature.0.as_slice())
        });
        if signed {
            Ok(())
        } else {
            Err(ProtocolError::InvalidEnvelopeSignature {
                source_account: source.to_string(),
                hash: hex::encode(hash),
            })
        }
    }
}
