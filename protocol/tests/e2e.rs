//! End-to-end integration tests for the authorization protocol.
//!
//! These tests run the full flow from ledger keys through a signed envelope:
//! footprint assembly, invocation construction, entry creation, co-located
//! and split signing, and transaction assembly. They prove the pieces
//! compose, and that every refusal along the way leaves nothing signed.
//!
//! Each test builds its own keys and ledger. No shared state.

use authgap_protocol::address::Principal;
use authgap_protocol::auth::{
    create_unsigned_entry, sign, verify_signature, AuthorizationEntry, EntryState,
};
use authgap_protocol::config::{expiration_ledger, Network};
use authgap_protocol::crypto::Keypair;
use authgap_protocol::error::{MismatchField, ProtocolError};
use authgap_protocol::invocation::InvocationNode;
use authgap_protocol::ledger::{
    assemble_footprint, attach_resources, balance_key, instance_key, Asset, Footprint,
    LedgerQuery, ResourceEstimate, ResourcedFootprint, SimulationResult, StaticLedger,
};
use authgap_protocol::signing::{
    apply_response, prepare_request, sign_all, AirGappedSigner, AuthPayload, PayloadFormat,
    SigningInstruction, SigningRequest, SigningResponse,
};
use authgap_protocol::transaction::{classify_apply_failure, TransactionBuilder};
use authgap_protocol::value::Value;
use stellar_xdr::curr::{Limits, WriteXdr};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn native_token() -> Principal {
    Asset::Native.contract_id(&Network::testnet()).unwrap()
}

fn transfer(from: Principal, to: Principal, amount: i128) -> InvocationNode {
    InvocationNode::leaf(
        native_token(),
        "transfer",
        vec![Value::Address(from), Value::Address(to), Value::I128(amount)],
    )
    .unwrap()
}

fn transfer_footprint(from: Principal, to: Principal, resource_fee: i64) -> ResourcedFootprint {
    let fp = assemble_footprint(
        vec![instance_key(native_token()).unwrap()],
        vec![
            balance_key(native_token(), from).unwrap(),
            balance_key(native_token(), to).unwrap(),
        ],
    )
    .unwrap();
    attach_resources(fp, ResourceEstimate::manual(1_000_000, 1_024, 512, resource_fee))
}

// ---------------------------------------------------------------------------
// Scenario A: source account pays and authorizes
// ---------------------------------------------------------------------------

#[test]
fn source_account_transfer_assembles() {
    let source = Keypair::generate();
    let to = Principal::Account([9u8; 32]);
    let ledger = StaticLedger::new(1_000).with_sequence(source.principal(), 100);

    let root = transfer(source.principal(), to, 10);
    let entries = vec![AuthorizationEntry::source_account(root.clone())];

    let envelope = TransactionBuilder::new(source.principal(), Network::testnet())
        .inclusion_fee(1_000)
        .current_sequence_from(&ledger)
        .unwrap()
        .footprint(transfer_footprint(source.principal(), to, 50_000))
        .invoke(root)
        .auth(entries)
        .assemble(&source)
        .expect("assembly should succeed");

    assert_eq!(envelope.sequence(), 101);
    assert_eq!(envelope.fee(), 51_000);
    assert_eq!(envelope.source_account(), source.principal());
    envelope.verify(&Network::testnet()).unwrap();

    // The base64 form decodes back to the same envelope and hash.
    let b64 = envelope.to_base64().unwrap();
    let decoded =
        authgap_protocol::SignedTransactionEnvelope::from_base64(&b64, &Network::testnet())
            .unwrap();
    assert_eq!(decoded, envelope);

    let public_hash = authgap_protocol::transaction::transaction_hash(
        envelope.transaction(),
        &Network::public(),
    )
    .unwrap();
    match envelope.verify(&Network::public()) {
        Err(ProtocolError::InvalidEnvelopeSignature {
            source_account,
            hash,
        }) => {
            assert_eq!(source_account, source.principal().to_string());
            assert_eq!(hash, hex::encode(public_hash));
        }
        other => panic!("expected InvalidEnvelopeSignature, got {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// Scenario B: a third party's entry is never signed
// ---------------------------------------------------------------------------

#[test]
fn unsigned_third_party_blocks_envelope() {
    let source = Keypair::generate();
    let holder = Keypair::generate();
    let to = Principal::Account([9u8; 32]);
    let root = transfer(holder.principal(), to, 10);
    let entry = create_unsigned_entry(holder.principal(), root.clone(), 2_000);

    let result = TransactionBuilder::new(source.principal(), Network::testnet())
        .current_sequence(7)
        .footprint(transfer_footprint(holder.principal(), to, 10))
        .invoke(root)
        .auth(vec![entry])
        .assemble(&source);

    match result {
        Err(ProtocolError::UnsignedEntryPresent { principal, .. }) => {
            assert_eq!(principal, holder.principal().to_string())
        }
        other => panic!("expected UnsignedEntryPresent, got {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// Scenario C: air-gapped signer refuses a different function
// ---------------------------------------------------------------------------

#[test]
fn air_gapped_refuses_substituted_function() {
    let holder = Keypair::generate();
    let me = holder.principal();
    let to = Principal::Account([9u8; 32]);
    let signer = AirGappedSigner::new(holder, Network::testnet(), vec![native_token()]);

    let approve = InvocationNode::leaf(
        native_token(),
        "approve",
        vec![Value::Address(me), Value::Address(to), Value::I128(10)],
    )
    .unwrap();
    let pending = vec![create_unsigned_entry(me, approve, 2_000)];
    let request = prepare_request(&Network::testnet(), &pending, PayloadFormat::Raw)
        .unwrap()
        .request;

    let instruction = SigningInstruction::new(&transfer(me, to, 10));
    match signer.sign_request(&instruction, &request) {
        Err(ProtocolError::Mismatch { field, expected, actual }) => {
            assert_eq!(field, MismatchField::FunctionName);
            assert_eq!(expected, "transfer");
            assert_eq!(actual, "approve");
        }
        other => panic!("expected functionName mismatch, got {:?}", other),
    }
    assert!(pending[0].signature().is_none());
}

// ---------------------------------------------------------------------------
// Split flow
// ---------------------------------------------------------------------------

/// Proxy and air-gapped signer exchange JSON only; the proxy then pays for
/// and submits an invocation authorized by someone else.
fn split_flow(format: PayloadFormat) {
    let network = Network::testnet();
    let proxy_keys = Keypair::generate();
    let holder = Keypair::generate();
    let holder_principal = holder.principal();
    let to = Principal::Account([9u8; 32]);

    let ledger = StaticLedger::new(5_000).with_sequence(proxy_keys.principal(), 41);
    let root = transfer(holder_principal, to, 25);
    let expiration = expiration_ledger(ledger.latest_ledger().unwrap(), 30);
    let pending = vec![create_unsigned_entry(holder_principal, root.clone(), expiration)];

    // Proxy side.
    let prepared = prepare_request(&network, &pending, format).unwrap();
    assert_eq!(prepared.pending[0].state(), EntryState::PendingSignature);
    let request_json = serde_json::to_string_pretty(&prepared.request).unwrap();

    // Air-gapped side: never sees `pending`, only the JSON and its own
    // instruction.
    let signer = AirGappedSigner::new(holder, network.clone(), vec![native_token()]);
    let request: SigningRequest = serde_json::from_str(&request_json).unwrap();
    let response = signer
        .sign_request(&SigningInstruction::new(&root), &request)
        .unwrap();
    let response_json = serde_json::to_string(&response).unwrap();

    // Back on the proxy.
    let response: SigningResponse = serde_json::from_str(&response_json).unwrap();
    let signed = apply_response(&prepared.pending, &response, &network).unwrap();
    assert_eq!(signed[0].state(), EntryState::Signed);
    verify_signature(&signed[0], &network).unwrap();

    let footprint = transfer_footprint(holder_principal, to, 20_000);
    let footprint = ResourcedFootprint {
        footprint: footprint.footprint.with_nonce_keys(&signed).unwrap(),
        estimate: footprint.estimate,
    };
    assert_eq!(footprint.footprint.read_write().len(), 3);

    let envelope = TransactionBuilder::new(proxy_keys.principal(), network.clone())
        .current_sequence_from(&ledger)
        .unwrap()
        .footprint(footprint)
        .invoke(root)
        .auth(signed)
        .assemble(&proxy_keys)
        .unwrap();
    assert_eq!(envelope.sequence(), 42);
    assert_eq!(envelope.fee(), 21_000);
}

#[test]
fn split_flow_raw() {
    split_flow(PayloadFormat::Raw);
}

#[test]
fn split_flow_xdr() {
    split_flow(PayloadFormat::Xdr);
}

// ---------------------------------------------------------------------------
// Simulated flow
// ---------------------------------------------------------------------------

/// A ledger whose simulation of `root` returns `auth` with expiration 0, the
/// way simulation hands entries back.
fn simulating_ledger(
    source: Principal,
    holder: Principal,
    to: Principal,
    root: &InvocationNode,
) -> StaticLedger {
    let data = transfer_footprint(holder, to, 30_000)
        .to_soroban_data()
        .unwrap()
        .to_xdr_base64(Limits::none())
        .unwrap();
    let auth = vec![create_unsigned_entry(holder, root.clone(), 0)
        .to_base64()
        .unwrap()];
    StaticLedger::new(8_000)
        .with_sequence(source, 300)
        .with_simulation(SimulationResult::from_xdr(&data, &auth).unwrap())
}

#[test]
fn simulated_entries_sign_once_expiration_is_set() {
    let network = Network::testnet();
    let source = Keypair::generate();
    let holder = Keypair::generate();
    let to = Principal::Account([9u8; 32]);
    let root = transfer(holder.principal(), to, 40);
    let ledger = simulating_ledger(source.principal(), holder.principal(), to, &root);

    let sim = ledger.simulate(&source.principal(), &root).unwrap();
    assert_eq!(sim.auth[0].signature_expiration_ledger(), Some(0));

    // Signing as simulated would produce an already-expired signature.
    match sign_all(&sim.auth, &[holder.clone()], &network) {
        Err(ProtocolError::ExpirationNotSet { principal, .. }) => {
            assert_eq!(principal, holder.principal().to_string())
        }
        other => panic!("expected ExpirationNotSet, got {:?}", other),
    }

    let expiration = expiration_ledger(ledger.latest_ledger().unwrap(), 30);
    let auth = sim.auth_expiring_at(expiration).unwrap();
    assert_eq!(auth[0].nonce(), sim.auth[0].nonce());
    let signed = sign_all(&auth, &[holder], &network).unwrap();
    assert_eq!(signed[0].signature_expiration_ledger(), Some(expiration));
    verify_signature(&signed[0], &network).unwrap();

    let envelope = TransactionBuilder::new(source.principal(), network.clone())
        .inclusion_fee(100)
        .current_sequence_from(&ledger)
        .unwrap()
        .footprint(ResourcedFootprint {
            footprint: sim.footprint.with_nonce_keys(&signed).unwrap(),
            estimate: sim.resources,
        })
        .invoke(root)
        .auth(signed)
        .assemble(&source)
        .unwrap();
    assert_eq!(envelope.sequence(), 301);
    assert_eq!(envelope.fee(), 30_100);
    envelope.verify(&network).unwrap();
}

#[test]
fn batch_expiration_carries_simulated_entries_across_the_gap() {
    let network = Network::testnet();
    let source = Keypair::generate();
    let holder = Keypair::generate();
    let to = Principal::Account([9u8; 32]);
    let root = transfer(holder.principal(), to, 40);
    let ledger = simulating_ledger(source.principal(), holder.principal(), to, &root);
    let sim = ledger.simulate(&source.principal(), &root).unwrap();
    let expiration = expiration_ledger(ledger.latest_ledger().unwrap(), 10);

    // Entries still at 0, expiration stated once for the batch.
    let request = SigningRequest {
        network: network.clone(),
        auth: AuthPayload::Xdr {
            entries_xdr: sim.auth.iter().map(|e| e.to_base64().unwrap()).collect(),
            signature_expiration_ledger: expiration,
        },
    };
    let signer = AirGappedSigner::new(holder, network.clone(), vec![native_token()]);
    let response = signer
        .sign_request(
            &SigningInstruction::new(&root).with_output_format(PayloadFormat::Raw),
            &request,
        )
        .unwrap();

    let pending = sim.auth_expiring_at(expiration).unwrap();
    let signed = apply_response(&pending, &response, &network).unwrap();
    assert_eq!(signed[0].signature_expiration_ledger(), Some(expiration));
    verify_signature(&signed[0], &network).unwrap();
}

// ---------------------------------------------------------------------------
// Co-located signing
// ---------------------------------------------------------------------------

#[test]
fn colocated_multi_signer_envelope() {
    let network = Network::testnet();
    let source = Keypair::generate();
    let alice = Keypair::generate();
    let bob = Keypair::generate();

    let exchange = Principal::Contract([4u8; 32]);
    let root = InvocationNode::new(
        exchange,
        "exchange",
        vec![Value::Address(alice.principal()), Value::Address(bob.principal())],
        vec![
            transfer(alice.principal(), bob.principal(), 5),
            transfer(bob.principal(), alice.principal(), 7),
        ],
    )
    .unwrap();
    assert_eq!(root.call_count(), 3);

    let entries = vec![
        create_unsigned_entry(alice.principal(), root.clone(), 900),
        create_unsigned_entry(bob.principal(), root.clone(), 900),
    ];
    let signed = sign_all(&entries, &[alice, bob], &network).unwrap();
    for entry in &signed {
        verify_signature(entry, &network).unwrap();
    }

    let fp = assemble_footprint(vec![instance_key(exchange).unwrap()], Vec::new())
        .unwrap()
        .with_nonce_keys(&signed)
        .unwrap();
    let envelope = TransactionBuilder::new(source.principal(), network.clone())
        .current_sequence(0)
        .footprint(attach_resources(fp, ResourceEstimate::manual(2_000_000, 0, 0, 100)))
        .invoke(root)
        .auth(signed)
        .assemble(&source)
        .unwrap();
    assert_eq!(envelope.sequence(), 1);
}

#[test]
fn colocated_missing_key_signs_nothing() {
    let alice = Keypair::generate();
    let bob = Principal::Account([6u8; 32]);
    let root = transfer(alice.principal(), bob, 1);
    let entries = vec![
        create_unsigned_entry(alice.principal(), root.clone(), 900),
        create_unsigned_entry(bob, root, 900),
    ];
    match sign_all(&entries, &[alice], &Network::testnet()) {
        Err(ProtocolError::UnexpectedSigner { principal }) => {
            assert_eq!(principal, bob.to_string())
        }
        other => panic!("expected UnexpectedSigner, got {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// Codecs and refusals
// ---------------------------------------------------------------------------

#[test]
fn entry_forms_interconvert() {
    let holder = Keypair::generate();
    let root = transfer(holder.principal(), Principal::Account([9u8; 32]), 3);
    let entry = create_unsigned_entry(holder.principal(), root, 77);
    let entry = sign(&entry, &holder, &Network::testnet()).unwrap();

    let from_xdr = AuthorizationEntry::from_base64(&entry.to_base64().unwrap()).unwrap();
    let params = entry.to_params().unwrap();
    let json = serde_json::to_string(&params).unwrap();
    let from_json = AuthorizationEntry::from_params(&serde_json::from_str(&json).unwrap()).unwrap();

    assert_eq!(from_xdr, entry);
    assert_eq!(from_json, entry);
    assert_eq!(from_json.to_base64().unwrap(), entry.to_base64().unwrap());
}

#[test]
fn overlapping_footprint_is_refused() {
    let user = Principal::Account([1u8; 32]);
    let balance = balance_key(native_token(), user).unwrap();
    match assemble_footprint(vec![balance.clone()], vec![balance]) {
        Err(ProtocolError::OverlappingKeys { .. }) => {}
        other => panic!("expected OverlappingKeys, got {:?}", other),
    }
}

#[test]
fn footprint_json_round_trip() {
    let user = Principal::Account([1u8; 32]);
    let fp = assemble_footprint(
        vec![instance_key(native_token()).unwrap()],
        vec![balance_key(native_token(), user).unwrap()],
    )
    .unwrap();
    let json = serde_json::to_string(&fp).unwrap();
    let back: Footprint = serde_json::from_str(&json).unwrap();
    assert_eq!(back, fp);
}

#[test]
fn resource_rejection_is_retryable() {
    let err = classify_apply_failure("RESOURCE_LIMIT_EXCEEDED", "write bytes exceeded");
    assert!(err.is_retryable());
    assert!(!classify_apply_failure("TRAPPED", "panic").is_retryable());
}
