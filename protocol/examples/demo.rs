//! Terminal walkthrough of the split signing flow.
//!
//! A proxy prepares a token transfer on behalf of a holder whose key lives
//! on an air-gapped machine. The holder's side checks the request against
//! what the operator asked for, signs, and hands back a response; the proxy
//! attaches the signature and assembles the envelope. A tampered request is
//! then shown being refused. The output uses ANSI escape codes for a
//! storytelling-style rendering.
//!
//! Run with:
//!   cargo run --example demo

use std::time::Instant;

use authgap_protocol::address::Principal;
use authgap_protocol::auth::create_unsigned_entry;
use authgap_protocol::config::{expiration_ledger, Network};
use authgap_protocol::crypto::Keypair;
use authgap_protocol::invocation::InvocationNode;
use authgap_protocol::ledger::{
    assemble_footprint, attach_resources, balance_key, instance_key, Asset, LedgerQuery,
    ResourceEstimate, StaticLedger,
};
use authgap_protocol::signing::{
    apply_response, prepare_request, AirGappedSigner, PayloadFormat, SigningInstruction,
};
use authgap_protocol::transaction::TransactionBuilder;
use authgap_protocol::value::Value;

// ---------------------------------------------------------------------------
// ANSI color constants
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

const BG_BLUE: &str = "\x1b[44m";

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

fn banner() {
    println!();
    println!("{BG_BLUE}{BOLD}{WHITE}                                                          {RESET}");
    println!("{BG_BLUE}{BOLD}{WHITE}    AUTHGAP  --  Proxy / Air-Gapped Signing Walkthrough   {RESET}");
    println!("{BG_BLUE}{BOLD}{WHITE}                                                          {RESET}");
    println!();
}

fn section(num: u32, title: &str) {
    println!();
    println!("{BOLD}{CYAN}===[{YELLOW} Step {num} {CYAN}]=============================================={RESET}");
    println!("{BOLD}{WHITE}  {title}{RESET}");
}

fn success(text: &str) {
    println!("{GREEN}  [OK] {text}{RESET}");
}

fn refused(text: &str) {
    println!("{RED}  [REFUSED] {text}{RESET}");
}

fn info(label: &str, value: &str) {
    println!("{WHITE}  {BOLD}{label}:{RESET} {YELLOW}{value}{RESET}");
}

fn short(s: &str) -> String {
    if s.len() <= 16 {
        return s.to_string();
    }
    format!("{}...{}", &s[..6], &s[s.len() - 6..])
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    banner();
    let network = Network::testnet();

    section(1, "Parties");
    let proxy_keys = Keypair::generate();
    let holder_keys = Keypair::generate();
    let holder = holder_keys.principal();
    let recipient = Keypair::generate().principal();
    let token = Asset::Native.contract_id(&network)?;
    info("proxy", &short(&proxy_keys.public_key_strkey()));
    info("holder", &short(&holder.to_string()));
    info("token", &short(&token.to_string()));

    let ledger = StaticLedger::new(120_000).with_sequence(proxy_keys.principal(), 3_000);

    section(2, "Proxy prepares the invocation");
    let root = InvocationNode::leaf(
        token,
        "transfer",
        vec![Value::Address(holder), Value::Address(recipient), Value::I128(250)],
    )?;
    let expiration = expiration_ledger(ledger.latest_ledger()?, 30);
    let entries = vec![create_unsigned_entry(holder, root.clone(), expiration)];
    let prepared = prepare_request(&network, &entries, PayloadFormat::Raw)?;
    let request_json = serde_json::to_string_pretty(&prepared.request)?;
    info("invocation", &root.to_string());
    info("expires at ledger", &expiration.to_string());
    println!("{DIM}{request_json}{RESET}");

    section(3, "Air-gapped signer checks and signs");
    let signer = AirGappedSigner::new(holder_keys, network.clone(), vec![token]);
    let instruction = SigningInstruction::new(&root);
    let start = Instant::now();
    let response = signer.sign_request(&instruction, &serde_json::from_str(&request_json)?)?;
    success(&format!(
        "signed {} entr{} in {:.2} ms",
        response.entries.len(),
        if response.entries.len() == 1 { "y" } else { "ies" },
        start.elapsed().as_secs_f64() * 1000.0
    ));

    section(4, "Proxy attaches and assembles");
    let signed = apply_response(&prepared.pending, &response, &network)?;
    let footprint = assemble_footprint(
        vec![instance_key(token)?],
        vec![balance_key(token, holder)?, balance_key(token, recipient)?],
    )?
    .with_nonce_keys(&signed)?;
    let envelope = TransactionBuilder::new(proxy_keys.principal(), network.clone())
        .current_sequence_from(&ledger)?
        .footprint(attach_resources(
            footprint,
            ResourceEstimate::manual(1_500_000, 1_200, 400, 60_000),
        ))
        .invoke(root.clone())
        .auth(signed)
        .assemble(&proxy_keys)?;
    info("sequence", &envelope.sequence().to_string());
    info("fee", &format!("{} stroops", envelope.fee()));
    info("hash", &hex::encode(envelope.hash()));
    success("envelope ready for submission");

    section(5, "A tampered request");
    let inflated = InvocationNode::leaf(
        token,
        "transfer",
        vec![Value::Address(holder), Value::Address(recipient), Value::I128(250_000)],
    )?;
    let tampered = prepare_request(
        &network,
        &[create_unsigned_entry(holder, inflated, expiration)],
        PayloadFormat::Xdr,
    )?
    .request;
    match signer.sign_request(&instruction, &tampered) {
        Ok(_) => println!("{RED}  signer accepted a tampered request{RESET}"),
        Err(err) => refused(&err.to_string()),
    }

    let stranger = Principal::Account([0x42; 32]);
    match signer.sign_request(
        &instruction,
        &prepare_request(
            &network,
            &[create_unsigned_entry(stranger, root, expiration)],
            PayloadFormat::Raw,
        )?
        .request,
    ) {
        Ok(_) => println!("{RED}  signer signed for a stranger{RESET}"),
        Err(err) => refused(&err.to_string()),
    }

    println!();
    Ok(())
}
