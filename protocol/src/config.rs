//! # Network Configuration & Constants
//!
//! Every network-dependent value in the protocol lives here: passphrases,
//! fee defaults, and ledger timing. Nothing in the core reads ambient state.
//! A [`Network`] and a [`FeeConfig`] are passed explicitly into the engine
//! and the assembler so both stay pure and testable.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::crypto::hash::sha256_array;

// ---------------------------------------------------------------------------
// Network Passphrases
// ---------------------------------------------------------------------------

/// Mainnet. Signatures made for this passphrase move real funds.
pub const PUBLIC_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";

/// The public test network.
pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";

/// The network that previews upcoming protocol versions.
pub const FUTURENET_PASSPHRASE: &str = "Test SDF Future Network ; October 2022";

/// Local quickstart containers.
pub const STANDALONE_PASSPHRASE: &str = "Standalone Network ; February 2017";

/// Local sandbox.
pub const SANDBOX_PASSPHRASE: &str = "Local Sandbox Stellar Network ; September 2022";

// ---------------------------------------------------------------------------
// Fees
// ---------------------------------------------------------------------------

/// Default inclusion fee in stroops. The resource fee is added on top.
pub const DEFAULT_INCLUSION_FEE: u32 = 1_000;

/// Protocol minimum inclusion fee (base fee) per operation.
pub const MIN_INCLUSION_FEE: u32 = 100;

// ---------------------------------------------------------------------------
// Ledger timing
// ---------------------------------------------------------------------------

/// Target close time of one ledger, in seconds.
pub const LEDGER_CLOSE_SECONDS: u32 = 5;

/// Default signature validity window used by the tooling, in minutes.
pub const DEFAULT_SIGNATURE_VALIDITY_MINUTES: u32 = 30;

/// Computes the ledger sequence at which a signature made now should expire.
///
/// `latest_ledger` is the current network height as reported by the ledger
/// query collaborator. Saturates instead of wrapping.
pub fn expiration_ledger(latest_ledger: u32, minutes_from_now: u32) -> u32 {
    let ledgers_from_now = minutes_from_now.saturating_mul(60) / LEDGER_CLOSE_SECONDS;
    latest_ledger.saturating_add(ledgers_from_now)
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// The network a signature or envelope is bound to.
///
/// The passphrase is hashed into the network id that prefixes every signed
/// payload, so an authorization made for testnet can never be replayed on
/// mainnet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Network {
    passphrase: String,
}

impl Network {
    /// A network identified by an arbitrary passphrase (private networks).
    pub fn custom(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: passphrase.into(),
        }
    }

    pub fn public() -> Self {
        Self::custom(PUBLIC_PASSPHRASE)
    }

    pub fn testnet() -> Self {
        Self::custom(TESTNET_PASSPHRASE)
    }

    pub fn futurenet() -> Self {
        Self::custom(FUTURENET_PASSPHRASE)
    }

    pub fn standalone() -> Self {
        Self::custom(STANDALONE_PASSPHRASE)
    }

    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    /// `SHA-256(passphrase)`, the 32-byte id mixed into every signature payload.
    pub fn id(&self) -> [u8; 32] {
        sha256_array(self.passphrase.as_bytes())
    }

    /// Friendly name for logging. Unknown passphrases are reported as custom.
    pub fn name(&self) -> &'static str {
        match self.passphrase.as_str() {
            PUBLIC_PASSPHRASE => "mainnet",
            TESTNET_PASSPHRASE => "testnet",
            FUTURENET_PASSPHRASE => "futurenet",
            STANDALONE_PASSPHRASE => "standalone",
            SANDBOX_PASSPHRASE => "sandbox",
            _ => "custom",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Error returned when a network name is not recognized.
#[derive(Debug, thiserror::Error)]
#[error("invalid network '{0}': must be one of mainnet, public, testnet, futurenet, standalone, sandbox")]
pub struct UnknownNetwork(pub String);

impl FromStr for Network {
    type Err = UnknownNetwork;

    /// Parses a network by name. `mainnet` is accepted as an alias of `public`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "public" => Ok(Self::public()),
            "testnet" => Ok(Self::testnet()),
            "futurenet" => Ok(Self::futurenet()),
            "standalone" => Ok(Self::standalone()),
            "sandbox" => Ok(Self::custom(SANDBOX_PASSPHRASE)),
            other => Err(UnknownNetwork(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Fee configuration
// ---------------------------------------------------------------------------

/// Fee parameters for the transaction assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeConfig {
    /// Fee paid for inclusion in a ledger, independent of resources.
    pub inclusion_fee: u32,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            inclusion_fee: DEFAULT_INCLUSION_FEE,
        }
    }
}
