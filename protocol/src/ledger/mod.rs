//! # Ledger State Access
//!
//! Naming ledger slots ([`key`]), declaring which ones an invocation touches
//! and what it may spend ([`footprint`]), and the seam through which live
//! ledger state is read ([`query`]).

pub mod footprint;
pub mod key;
pub mod query;

pub use footprint::{
    assemble_footprint, attach_resources, EstimateSource, Footprint, ResourceEstimate,
    ResourcedFootprint,
};
pub use key::{
    balance_key, build_key, code_key, instance_key, nonce_key, Asset, DataKey, Durability,
    KeyClass, LedgerKey,
};
pub use query::{LedgerQuery, SimulationResult, StaticLedger};
