//! # Multi-Party Signing
//!
//! Two ways to collect the signatures an invocation needs:
//!
//! - **Co-located** ([`colocated::sign_all`]): all keys are local.
//! - **Split**: a network-connected [`proxy`] prepares a request, an
//!   [`air_gapped`] signer verifies and signs it offline, and the proxy
//!   merges the response. The two halves share nothing but the
//!   [`request`] values passed between them.

pub mod air_gapped;
pub mod colocated;
pub mod proxy;
pub mod request;

pub use air_gapped::{AirGappedSigner, EntryReview};
pub use colocated::sign_all;
pub use proxy::{apply_response, prepare_request, PreparedRequest};
pub use request::{
    AuthPayload, PayloadFormat, SignedEntryPayload, SigningInstruction, SigningRequest,
    SigningResponse,
};
