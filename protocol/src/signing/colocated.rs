//! Co-located signing: every required key is on the same machine.

use tracing::{debug, info, warn};

use crate::auth::{sign, AuthorizationEntry};
use crate::config::Network;
use crate::crypto::keys::Keypair;
use crate::error::{ProtocolError, Result};

/// Signs every address entry with the matching key from `keyring`.
///
/// Source-account entries and entries that already carry a signature are
/// passed through unchanged. An entry whose principal has no key in the
/// keyring fails the whole batch with [`ProtocolError::UnexpectedSigner`];
/// nothing is returned half-signed. Entries from simulation need an
/// expiration set first (see [`AuthorizationEntry::with_expiration`]).
pub fn sign_all(
    entries: &[AuthorizationEntry],
    keyring: &[Keypair],
    network: &Network,
) -> Result<Vec<AuthorizationEntry>> {
    let mut signed = Vec::with_capacity(entries.len());

    for entry in entries {
        let Some(principal) = entry.principal() else {
            debug!("source-account entry covered by the envelope signature");
            signed.push(entry.clone());
            continue;
        };

        if entry.signature().is_some() {
            debug!(%principal, "entry already signed, passing through");
            signed.push(entry.clone());
            continue;
        }

        let Some(keypair) = keyring.iter().find(|k| k.principal() == principal) else {
            warn!(%principal, "no key available for required signer");
            return Err(ProtocolError::UnexpectedSigner {
                principal: principal.to_string(),
            });
        };

        signed.push(sign(entry, keypair, network)?);
    }

    info!(entries = signed.len(), network = %network, "co-located signing complete");
    Ok(signed)
}
