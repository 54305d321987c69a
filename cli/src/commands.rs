//! Subcommand handlers. Each one reads its work-files, calls into the
//! protocol core, and writes the result.

use std::path::Path;

use anyhow::{bail, Context, Result};

use authgap_protocol::auth::{create_unsigned_entry, AuthorizationEntry};
use authgap_protocol::config::{expiration_ledger, Network, MIN_INCLUSION_FEE};
use authgap_protocol::crypto::Keypair;
use authgap_protocol::ledger::attach_resources;
use authgap_protocol::signing::{
    apply_response, prepare_request, AirGappedSigner, SigningInstruction, SigningRequest,
    SigningResponse,
};
use authgap_protocol::transaction::TransactionBuilder;
use authgap_protocol::FeeConfig;

use crate::cli::{AssembleArgs, ExpirationArgs, PrepareArgs, SignArgs};
use crate::workfile::{read_json, write_json, InvocationPlan, PendingWork};

/// `proxy prepare`
pub fn prepare(network: &Network, args: &PrepareArgs) -> Result<()> {
    let plan: InvocationPlan = read_json(&args.plan)?;
    let root = plan
        .invocation
        .to_node()
        .context("plan invocation is not valid")?;
    if plan.signers.is_empty() {
        bail!("plan names no signers");
    }

    let expiration = expiration_ledger(args.latest_ledger, args.valid_minutes);
    let entries: Vec<AuthorizationEntry> = plan
        .signers
        .iter()
        .map(|signer| {
            if *signer == plan.source_account {
                AuthorizationEntry::source_account(root.clone())
            } else {
                create_unsigned_entry(*signer, root.clone(), expiration)
            }
        })
        .collect();

    let prepared = prepare_request(network, &entries, args.format)?;
    let pending = PendingWork {
        network: network.clone(),
        entries: prepared
            .pending
            .iter()
            .map(AuthorizationEntry::to_params)
            .collect::<authgap_protocol::Result<Vec<_>>>()?,
        plan,
    };

    write_json(&args.pending_out, &pending)?;
    write_json(&args.request_out, &prepared.request)?;
    write_json(&args.instruction_out, &SigningInstruction::new(&root))?;

    tracing::info!(
        invocation = %root,
        entries = entries.len(),
        expiration,
        format = %args.format,
        "signing request prepared"
    );
    println!("Request written to     {}", args.request_out.display());
    println!("Instruction written to {}", args.instruction_out.display());
    println!("Signatures expire at ledger {}", expiration);
    Ok(())
}

/// `air-gapped sign`
pub fn sign(network: &Network, args: &SignArgs) -> Result<()> {
    let keypair = Keypair::from_secret(&args.signer_secret).context("invalid signer secret")?;
    let request: SigningRequest = read_json(&args.request)?;
    let instruction: SigningInstruction = read_json(&args.instruction)?;

    let signer = AirGappedSigner::new(keypair, network.clone(), args.allowed_contracts.clone());

    // The instruction only names the root call; show everything beneath it.
    for review in signer
        .review(&instruction, &request)
        .context("refusing to sign")?
    {
        println!(
            "Entry nonce {} ({:?}):",
            review.entry.nonce().unwrap_or_default(),
            review.entry.state()
        );
        for (depth, call) in review.entry.root_invocation().walk() {
            println!("{}{}", "  ".repeat(depth + 1), call);
        }
    }

    let response = signer
        .sign_request(&instruction, &request)
        .context("refusing to sign")?;

    write_json(&args.out, &response)?;
    println!(
        "Signed {} entr{} for {}; response written to {}",
        response.entries.len(),
        if response.entries.len() == 1 { "y" } else { "ies" },
        response.signer,
        args.out.display()
    );
    Ok(())
}

/// `proxy assemble`
pub fn assemble(network: &Network, args: &AssembleArgs) -> Result<()> {
    let pending: PendingWork = read_json(&args.pending)?;
    if pending.network != *network {
        bail!(
            "pending work was prepared for {}, not {}",
            pending.network,
            network
        );
    }
    let response: SigningResponse = read_json(&args.response)?;
    let source_keys = Keypair::from_secret(&args.source_secret).context("invalid source secret")?;

    let entries = pending
        .entries
        .iter()
        .map(AuthorizationEntry::from_params)
        .collect::<authgap_protocol::Result<Vec<_>>>()?;
    let signed = apply_response(&entries, &response, network)
        .context("signing response does not fit the pending entries")?;

    let plan = &pending.plan;
    let fees = FeeConfig {
        inclusion_fee: args
            .inclusion_fee
            .or(plan.inclusion_fee)
            .unwrap_or_else(|| FeeConfig::default().inclusion_fee),
    };
    if fees.inclusion_fee < MIN_INCLUSION_FEE {
        tracing::warn!(
            inclusion_fee = fees.inclusion_fee,
            minimum = MIN_INCLUSION_FEE,
            "inclusion fee below the network minimum"
        );
    }

    let footprint = plan.footprint.with_nonce_keys(&signed)?;
    let envelope = TransactionBuilder::new(plan.source_account, network.clone())
        .fees(fees)
        .current_sequence(args.current_sequence)
        .footprint(attach_resources(footprint, plan.resources))
        .invoke(plan.invocation.to_node()?)
        .auth(signed)
        .assemble(&source_keys)?;

    let encoded = envelope.to_base64()?;
    match &args.out {
        Some(path) => write_text(path, &encoded)?,
        None => println!("{}", encoded),
    }
    eprintln!(
        "Envelope {} (sequence {}, fee {} stroops)",
        hex::encode(envelope.hash()),
        envelope.sequence(),
        envelope.fee()
    );
    Ok(())
}

/// `expiration`
pub fn expiration(args: &ExpirationArgs) -> Result<()> {
    println!("{}", expiration_ledger(args.latest_ledger, args.minutes));
    Ok(())
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, format!("{}\n", text))
        .with_context(|| format!("failed to write {}", path.display()))
}
