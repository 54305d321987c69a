//! # Footprints and Resource Estimates
//!
//! A footprint declares, ahead of execution, every ledger slot an
//! invocation may read and every slot it may write. The ledger aborts any
//! access outside it, so the footprint must be exact:
//!
//! ```text
//!   read_only   ∩   read_write   =   ∅
//! ```
//!
//! A key that is written is implicitly readable, so listing it in both sets
//! is always a construction mistake and is rejected.
//!
//! The resource estimate travels alongside the footprint. It is either what
//! a simulation reported or a figure supplied by hand; the two are labelled
//! so a manual estimate can never be mistaken for a measured one. Neither is
//! validated for sufficiency here: only the ledger can decide that.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use stellar_xdr::curr as xdr;
use tracing::debug;

use crate::auth::{AuthorizationEntry, Credential};
use crate::error::{ProtocolError, Result};
use crate::ledger::key::{nonce_key, DataKey, LedgerKey};

/// The disjoint read-only and read-write key sets of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "FootprintRepr")]
pub struct Footprint {
    read_only: Vec<LedgerKey>,
    read_write: Vec<LedgerKey>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FootprintRepr {
    read_only: Vec<LedgerKey>,
    read_write: Vec<LedgerKey>,
}

impl TryFrom<FootprintRepr> for Footprint {
    type Error = ProtocolError;

    fn try_from(repr: FootprintRepr) -> Result<Self> {
        assemble_footprint(repr.read_only, repr.read_write)
    }
}

/// Builds a footprint from declared read and write keys.
///
/// Duplicates inside one set collapse to their first occurrence. A key in
/// both sets fails with [`ProtocolError::OverlappingKeys`] naming the first
/// shared key (in read-only order).
pub fn assemble_footprint(
    read_keys: impl IntoIterator<Item = LedgerKey>,
    write_keys: impl IntoIterator<Item = LedgerKey>,
) -> Result<Footprint> {
    let (read_only, read_bytes) = dedup(read_keys, "read-only")?;
    let (read_write, write_bytes) = dedup(write_keys, "read-write")?;

    for (key, bytes) in read_only.iter().zip(read_bytes.iter()) {
        if write_bytes.contains(bytes) {
            return Err(ProtocolError::OverlappingKeys {
                key: key.to_string(),
            });
        }
    }

    Ok(Footprint {
        read_only,
        read_write,
    })
}

/// Collapses duplicates by binary encoding, keeping first-seen order.
fn dedup(
    keys: impl IntoIterator<Item = LedgerKey>,
    set: &str,
) -> Result<(Vec<LedgerKey>, Vec<Vec<u8>>)> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut encoded = Vec::new();
    for key in keys {
        let bytes = key.to_bytes()?;
        if seen.insert(bytes.clone()) {
            out.push(key);
            encoded.push(bytes);
        } else {
            debug!(set, key = %key, "collapsing duplicate footprint key");
        }
    }
    Ok((out, encoded))
}

impl Footprint {
    pub fn read_only(&self) -> &[LedgerKey] {
        &self.read_only
    }

    pub fn read_write(&self) -> &[LedgerKey] {
        &self.read_write
    }

    pub fn is_empty(&self) -> bool {
        self.read_only.is_empty() && self.read_write.is_empty()
    }

    /// Re-derives the nonce slots for `entries`.
    ///
    /// Nonce keys already present in the read-write set are dropped and the
    /// nonce of every address-credential entry is appended, so a footprint
    /// built for a previous nonce generation never leaks into a retry.
    pub fn with_nonce_keys(&self, entries: &[AuthorizationEntry]) -> Result<Footprint> {
        let retained = self
            .read_write
            .iter()
            .filter(|k| {
                !matches!(
                    k,
                    LedgerKey::ContractData {
                        key: DataKey::Nonce(_),
                        ..
                    }
                )
            })
            .cloned();
        let nonces = entries.iter().filter_map(|e| match e.credential() {
            Credential::Address(c) => Some(nonce_key(c.principal, c.nonce)),
            Credential::SourceAccount => None,
        });
        assemble_footprint(self.read_only.clone(), retained.chain(nonces))
    }

    pub fn to_xdr(&self) -> Result<xdr::LedgerFootprint> {
        let encode = |keys: &[LedgerKey]| -> Result<xdr::VecM<xdr::LedgerKey>> {
            let v = keys
                .iter()
                .map(LedgerKey::to_xdr)
                .collect::<Result<Vec<_>>>()?;
            Ok(v.try_into()?)
        };
        Ok(xdr::LedgerFootprint {
            read_only: encode(&self.read_only)?,
            read_write: encode(&self.read_write)?,
        })
    }

    /// Decodes a ledger footprint (e.g. from a simulation), re-checking
    /// disjointness.
    pub fn from_xdr(footprint: &xdr::LedgerFootprint) -> Result<Self> {
        let decode = |keys: &xdr::VecM<xdr::LedgerKey>| -> Result<Vec<LedgerKey>> {
            keys.iter().map(LedgerKey::from_xdr).collect()
        };
        assemble_footprint(
            decode(&footprint.read_only)?,
            decode(&footprint.read_write)?,
        )
    }
}

// ---------------------------------------------------------------------------
// Resource estimates
// ---------------------------------------------------------------------------

/// Where a resource estimate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateSource {
    /// Reported by a ledger simulation.
    Simulated,
    /// Supplied by hand for an offline flow.
    Manual,
}

/// Declared resource limits and the fee paid for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEstimate {
    pub instructions: u32,
    pub read_bytes: u32,
    pub write_bytes: u32,
    /// Stroops, on top of the inclusion fee.
    pub resource_fee: i64,
    pub source: EstimateSource,
}

impl ResourceEstimate {
    /// An estimate read from a simulation.
    pub fn simulated(
        instructions: u32,
        read_bytes: u32,
        write_bytes: u32,
        resource_fee: i64,
    ) -> Self {
        Self {
            instructions,
            read_bytes,
            write_bytes,
            resource_fee,
            source: EstimateSource::Simulated,
        }
    }

    /// A hand-supplied estimate. There is no default: callers always state
    /// every figure.
    pub fn manual(
        instructions: u32,
        read_bytes: u32,
        write_bytes: u32,
        resource_fee: i64,
    ) -> Self {
        Self {
            source: EstimateSource::Manual,
            ..Self::simulated(instructions, read_bytes, write_bytes, resource_fee)
        }
    }
}

/// A footprint paired with the resources declared for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcedFootprint {
    pub footprint: Footprint,
    pub estimate: ResourceEstimate,
}

/// Pairs a footprint with its estimate. The estimate is not checked.
pub fn attach_resources(footprint: Footprint, estimate: ResourceEstimate) -> ResourcedFootprint {
    debug!(
        source = ?estimate.source,
        instructions = estimate.instructions,
        resource_fee = estimate.resource_fee,
        "attaching resource estimate"
    );
    ResourcedFootprint {
        footprint,
        estimate,
    }
}

impl ResourcedFootprint {
    /// The transaction extension the ledger meters against.
    pub fn to_soroban_data(&self) -> Result<xdr::SorobanTransactionData> {
        Ok(xdr::SorobanTransactionData {
            ext: xdr::ExtensionPoint::V0,
            resources: xdr::SorobanResources {
                footprint: self.footprint.to_xdr()?,
                instructions: self.estimate.instructions,
                read_bytes: self.estimate.read_bytes,
                write_bytes: self.estimate.write_bytes,
            },
            resource_fee: self.estimate.resource_fee,
        })
    }
}
