//! JSON work-files passed between runs and between machines.

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use authgap_protocol::auth::AuthEntryParams;
use authgap_protocol::config::Network;
use authgap_protocol::invocation::InvocationParams;
use authgap_protocol::ledger::{Footprint, ResourceEstimate};
use authgap_protocol::Principal;

/// What the proxy operator wants invoked, written by hand or by tooling:
///
/// ```json
/// {
///   "sourceAccount": "G...",
///   "invocation": { "function": { ... }, "subInvocations": [] },
///   "signers": ["G..."],
///   "footprint": { "readOnly": ["AAAA..."], "readWrite": ["AAAA..."] },
///   "resources": { "instructions": 1000000, "readBytes": 1024,
///                  "writeBytes": 512, "resourceFee": 60000, "source": "manual" }
/// }
/// ```
///
/// A signer equal to `sourceAccount` is covered by the envelope signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationPlan {
    pub source_account: Principal,
    pub invocation: InvocationParams,
    pub signers: Vec<Principal>,
    pub footprint: Footprint,
    pub resources: ResourceEstimate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inclusion_fee: Option<u32>,
}

/// The proxy's state between `prepare` and `assemble`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingWork {
    pub network: Network,
    pub plan: InvocationPlan,
    pub entries: Vec<AuthEntryParams>,
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json + "\n")
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), "work-file written");
    Ok(())
}
