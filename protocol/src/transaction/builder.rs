//! Transaction assembly via the builder pattern.
//!
//! The [`TransactionBuilder`] collects the pieces of a single-invocation
//! transaction (source, sequence, footprint and resources, root call, signed
//! entries), checks they fit together, and produces a signed, immutable
//! [`SignedTransactionEnvelope`].
//!
//! Assembly is all-or-nothing. If anything is missing or inconsistent no
//! envelope is produced, so a half-built transaction never reaches the
//! network.

use stellar_xdr::curr::{
    HostFunction, InvokeHostFunctionOp, Memo, Operation, OperationBody, Preconditions,
    SequenceNumber, TimeBounds, TimePoint, Transaction, TransactionExt,
};
use tracing::{debug, info};

use super::envelope::SignedTransactionEnvelope;
use crate::address::Principal;
use crate::auth::AuthorizationEntry;
use crate::config::{FeeConfig, Network};
use crate::crypto::keys::Keypair;
use crate::error::{ProtocolError, Result};
use crate::invocation::InvocationNode;
use crate::ledger::footprint::ResourcedFootprint;
use crate::ledger::query::LedgerQuery;

/// Fluent builder for a signed single-invocation transaction.
///
/// # Example
///
/// ```rust,no_run
/// use authgap_protocol::config::Network;
/// use authgap_protocol::crypto::Keypair;
/// use authgap_protocol::transaction::TransactionBuilder;
/// # fn demo(
/// #     resourced: authgap_protocol::ledger::ResourcedFootprint,
/// #     root: authgap_protocol::invocation::InvocationNode,
/// #     entries: Vec<authgap_protocol::auth::AuthorizationEntry>,
/// # ) -> authgap_protocol::error::Result<()> {
/// let source = Keypair::generate();
/// let envelope = TransactionBuilder::new(source.principal(), Network::testnet())
///     .current_sequence(100)
///     .footprint(resourced)
///     .invoke(root)
///     .auth(entries)
///     .assemble(&source)?;
/// assert_eq!(envelope.sequence(), 101);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    source_account: Principal,
    network: Network,
    fees: FeeConfig,
    current_sequence: Option<i64>,
    footprint: Option<ResourcedFootprint>,
    invocation: Option<InvocationNode>,
    auth: Vec<AuthorizationEntry>,
}

impl TransactionBuilder {
    pub fn new(source_account: Principal, network: Network) -> Self {
        Self {
            source_account,
            network,
            fees: FeeConfig::default(),
            current_sequence: None,
            footprint: None,
            invocation: None,
            auth: Vec::new(),
        }
    }

    /// Fee for ledger inclusion, in stroops. Defaults to
    /// [`crate::config::DEFAULT_INCLUSION_FEE`].
    pub fn inclusion_fee(mut self, fee: u32) -> Self {
        self.fees.inclusion_fee = fee;
        self
    }

    pub fn fees(mut self, fees: FeeConfig) -> Self {
        self.fees = fees;
        self
    }

    /// The source account's sequence number as the ledger reports it now.
    /// The envelope uses the next one.
    pub fn current_sequence(mut self, sequence: i64) -> Self {
        self.current_sequence = Some(sequence);
        self
    }

    /// Reads the current sequence from `ledger`.
    pub fn current_sequence_from(self, ledger: &dyn LedgerQuery) -> Result<Self> {
        let sequence = ledger.sequence(&self.source_account)?;
        Ok(self.current_sequence(sequence))
    }

    pub fn footprint(mut self, footprint: ResourcedFootprint) -> Self {
        self.footprint = Some(footprint);
        self
    }

    pub fn invoke(mut self, root: InvocationNode) -> Self {
        self.invocation = Some(root);
        self
    }

    pub fn auth(mut self, entries: Vec<AuthorizationEntry>) -> Self {
        self.auth = entries;
        self
    }

    /// Validates the collected pieces and signs the envelope with
    /// `source_keys`.
    ///
    /// Checks run in a fixed order and the first failure wins:
    ///
    /// 1. every component is present
    /// 2. `source_keys` belongs to the source account
    /// 3. every address entry carries a signature
    /// 4. the resource fee is not negative and `inclusion_fee + resource_fee`
    ///    fits the envelope fee field
    pub fn assemble(self, source_keys: &Keypair) -> Result<SignedTransactionEnvelope> {
        let current_sequence = self
            .current_sequence
            .ok_or(ProtocolError::MissingComponent("a current sequence number"))?;
        let resourced = self
            .footprint
            .ok_or(ProtocolError::MissingComponent("a footprint"))?;
        let invocation = self
            .invocation
            .ok_or(ProtocolError::MissingComponent("an invocation"))?;

        // 2. Source key
        if source_keys.principal() != self.source_account {
            return Err(ProtocolError::SourceKeyMismatch {
                source_account: self.source_account.to_string(),
                key: source_keys.public_key_strkey(),
            });
        }
        let source = self.source_account.to_muxed_account()?;

        // 3. Unsigned entries
        for entry in &self.auth {
            if let Some(credential) = entry.address_credential() {
                if credential.signature.is_none() {
                    return Err(ProtocolError::UnsignedEntryPresent {
                        principal: credential.principal.to_string(),
                        nonce: credential.nonce,
                    });
                }
            }
        }

        // 4. Fee
        let resource_fee = resourced.estimate.resource_fee;
        if resource_fee < 0 {
            return Err(ProtocolError::NegativeResourceFee { resource_fee });
        }
        let fee = i64::from(self.fees.inclusion_fee)
            .checked_add(resource_fee)
            .and_then(|total| u32::try_from(total).ok())
            .ok_or(ProtocolError::FeeOverflow {
                inclusion_fee: self.fees.inclusion_fee,
                resource_fee,
            })?;

        let sequence = current_sequence
            .checked_add(1)
            .ok_or_else(|| ProtocolError::InvalidArgValue {
                arg_type: "sequence".into(),
                reason: "source account sequence is exhausted".into(),
            })?;

        let auth = self
            .auth
            .iter()
            .map(AuthorizationEntry::to_xdr)
            .collect::<Result<Vec<_>>>()?;

        let operation = Operation {
            source_account: None,
            body: OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
                host_function: HostFunction::InvokeContract(invocation.to_invoke_args()?),
                auth: auth.try_into()?,
            }),
        };

        let tx = Transaction {
            source_account: source,
            fee,
            seq_num: SequenceNumber(sequence),
            cond: Preconditions::Time(TimeBounds {
                min_time: TimePoint(0),
                max_time: TimePoint(0),
            }),
            memo: Memo::None,
            operations: vec![operation].try_into()?,
            ext: TransactionExt::V1(resourced.to_soroban_data()?),
        };

        debug!(
            source = %self.source_account,
            sequence,
            fee,
            entries = self.auth.len(),
            "transaction assembled, signing envelope"
        );

        let envelope = SignedTransactionEnvelope::sign(tx, source_keys, &self.network)?;
        info!(
            hash = %hex::encode(envelope.hash()),
            sequence,
            fee,
            network = %self.network,
            "signed transaction envelope"
        );
        Ok(envelope)
    }
}
