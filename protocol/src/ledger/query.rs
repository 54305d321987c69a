//! The ledger-query seam.
//!
//! The core never talks to the network. Anything it needs from a live ledger
//! (an account's sequence number, the current height, a simulation) comes
//! through [`LedgerQuery`]. An RPC client implements it in production;
//! [`StaticLedger`] implements it from fixed values for offline and manual
//! flows and for tests.

use std::collections::HashMap;

use stellar_xdr::curr::{Limits, ReadXdr, SorobanTransactionData};

use crate::address::Principal;
use crate::auth::AuthorizationEntry;
use crate::error::{ProtocolError, Result};
use crate::invocation::InvocationNode;
use crate::ledger::footprint::{Footprint, ResourceEstimate};

/// What a simulation reports for an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationResult {
    pub footprint: Footprint,
    pub resources: ResourceEstimate,
    /// Unsigned entries the simulation found the invocation needs.
    pub auth: Vec<AuthorizationEntry>,
}

impl SimulationResult {
    /// Decodes the `transactionData` and `auth` fields of a simulation
    /// response (both base64 XDR).
    pub fn from_xdr(transaction_data: &str, auth: &[String]) -> Result<Self> {
        let data =
            SorobanTransactionData::from_xdr_base64(transaction_data.trim(), Limits::none())?;
        let auth = auth
            .iter()
            .map(|a| AuthorizationEntry::from_base64(a))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            footprint: Footprint::from_xdr(&data.resources.footprint)?,
            resources: ResourceEstimate::simulated(
                data.resources.instructions,
                data.resources.read_bytes,
                data.resources.write_bytes,
                data.resource_fee,
            ),
            auth,
        })
    }

    /// The simulated entries with every address entry's signature
    /// expiration set to `ledger`. Simulation leaves it at 0.
    pub fn auth_expiring_at(&self, ledger: u32) -> Result<Vec<AuthorizationEntry>> {
        self.auth
            .iter()
            .map(|entry| {
                if entry.is_source_account() {
                    Ok(entry.clone())
                } else {
                    entry.with_expiration(ledger)
                }
            })
            .collect()
    }
}

pub trait LedgerQuery {
    /// Current sequence number of `account`.
    fn sequence(&self, account: &Principal) -> Result<i64>;

    /// Sequence of the most recently closed ledger.
    fn latest_ledger(&self) -> Result<u32>;

    /// Simulates `root` invoked by `source`.
    fn simulate(&self, source: &Principal, root: &InvocationNode) -> Result<SimulationResult>;
}

/// A ledger answered from fixed values.
#[derive(Debug, Clone, Default)]
pub struct StaticLedger {
    sequences: HashMap<Principal, i64>,
    latest_ledger: u32,
    simulation: Option<SimulationResult>,
}

impl StaticLedger {
    pub fn new(latest_ledger: u32) -> Self {
        Self {
            latest_ledger,
            ..Self::default()
        }
    }

    pub fn with_sequence(mut self, account: Principal, sequence: i64) -> Self {
        self.sequences.insert(account, sequence);
        self
    }

    /// Returns `result` for every simulation request.
    pub fn with_simulation(mut self, result: SimulationResult) -> Self {
        self.simulation = Some(result);
        self
    }
}

impl LedgerQuery for StaticLedger {
    fn sequence(&self, account: &Principal) -> Result<i64> {
        self.sequences
            .get(account)
            .copied()
            .ok_or_else(|| ProtocolError::LedgerQuery(format!("account {} not found", account)))
    }

    fn latest_ledger(&self) -> Result<u32> {
        Ok(self.latest_ledger)
    }

    fn simulate(&self, _source: &Principal, _root: &InvocationNode) -> Result<SimulationResult> {
        self.simulation.clone().ok_or_else(|| {
            ProtocolError::LedgerQuery("no simulation available; supply a manual estimate".into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::footprint::{assemble_footprint, attach_resources};
    use crate::ledger::key::instance_key;

    #[test]
    fn static_ledger_answers_configured_values() {
        let user = Principal::Account([1u8; 32]);
        let ledger = StaticLedger::new(1_234).with_sequence(user, 100);
        assert_eq!(ledger.sequence(&user).unwrap(), 100);
        assert_eq!(ledger.latest_ledger().unwrap(), 1_234);
        assert!(ledger.sequence(&Principal::Account([2u8; 32])).is_err());
    }

    #[test]
    fn simulation_without_result_is_a_query_error() {
        let ledger = StaticLedger::new(1);
        let root =
            InvocationNode::leaf(Principal::Contract([2u8; 32]), "hello", Vec::new()).unwrap();
        match ledger.simulate(&Principal::Account([1u8; 32]), &root) {
            Err(ProtocolError::LedgerQuery(_)) => {}
            other => panic!("expected LedgerQuery, got {:?}", other),
        }
    }

    #[test]
    fn simulation_result_decodes_transaction_data() {
        let fp = assemble_footprint(
            vec![instance_key(Principal::Contract([2u8; 32])).unwrap()],
            Vec::new(),
        )
        .unwrap();
        let data = attach_resources(fp.clone(), ResourceEstimate::simulated(10, 20, 30, 40))
            .to_soroban_data()
            .unwrap();
        let b64 = stellar_xdr::curr::WriteXdr::to_xdr_base64(&data, Limits::none()).unwrap();

        let sim = SimulationResult::from_xdr(&b64, &[]).unwrap();
        assert_eq!(sim.footprint, fp);
        assert_eq!(sim.resources, ResourceEstimate::simulated(10, 20, 30, 40));
        assert!(sim.auth.is_empty());
    }
}
