//! # CLI Interface
//!
//! Defines the command-line argument structure for `authgap` using `clap`
//! derive. Two roles share the binary: the network-connected proxy
//! (`proxy prepare`, `proxy assemble`) and the offline signer
//! (`air-gapped sign`). Everything they exchange goes through JSON files.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use authgap_protocol::config::{Network, DEFAULT_SIGNATURE_VALIDITY_MINUTES};
use authgap_protocol::signing::PayloadFormat;
use authgap_protocol::Principal;

/// Multi-party authorization for contract invocations.
///
/// Prepares signing requests on a connected machine, signs them on an
/// isolated one, and assembles the signed envelope back on the connected
/// side. Submission is left to whatever tool talks to the network.
#[derive(Parser, Debug)]
#[command(name = "authgap", version, propagate_version = true)]
pub struct AuthgapCli {
    /// Log output format: "pretty" or "json".
    #[arg(long, global = true, env = "AUTHGAP_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Network passphrase alias: mainnet, testnet, futurenet, standalone, sandbox.
    #[arg(long, global = true, env = "AUTHGAP_NETWORK", default_value = "testnet")]
    pub network: Network,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connected side of the split flow.
    #[command(subcommand)]
    Proxy(ProxyCommands),
    /// Offline side of the split flow.
    #[command(subcommand)]
    AirGapped(AirGappedCommands),
    /// Print the ledger at which a signature made now should expire.
    Expiration(ExpirationArgs),
}

#[derive(Subcommand, Debug)]
pub enum ProxyCommands {
    /// Create unsigned entries for a plan and write the signing request.
    Prepare(PrepareArgs),
    /// Attach a signing response and write the signed envelope.
    Assemble(AssembleArgs),
}

#[derive(Subcommand, Debug)]
pub enum AirGappedCommands {
    /// Check a signing request against an instruction and sign it.
    Sign(SignArgs),
}

/// Arguments for `proxy prepare`.
#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Invocation plan (JSON): source, invocation, signers, footprint, resources.
    #[arg(long)]
    pub plan: PathBuf,

    /// Sequence of the most recently closed ledger.
    #[arg(long)]
    pub latest_ledger: u32,

    /// How long signatures stay valid.
    #[arg(long, default_value_t = DEFAULT_SIGNATURE_VALIDITY_MINUTES)]
    pub valid_minutes: u32,

    /// Representation of the request: "raw" or "xdr".
    #[arg(long, default_value = "raw")]
    pub format: PayloadFormat,

    /// Where the pending entries are kept for `proxy assemble`.
    #[arg(long, default_value = "pending.json")]
    pub pending_out: PathBuf,

    /// The request carried to the air-gapped machine.
    #[arg(long, default_value = "request.json")]
    pub request_out: PathBuf,

    /// The instruction for the operator to review and carry separately.
    #[arg(long, default_value = "instruction.json")]
    pub instruction_out: PathBuf,
}

/// Arguments for `proxy assemble`.
#[derive(Args, Debug)]
pub struct AssembleArgs {
    #[arg(long, default_value = "pending.json")]
    pub pending: PathBuf,

    #[arg(long, default_value = "response.json")]
    pub response: PathBuf,

    /// Current sequence number of the source account.
    #[arg(long)]
    pub current_sequence: i64,

    /// Inclusion fee in stroops. Overrides the plan's.
    #[arg(long)]
    pub inclusion_fee: Option<u32>,

    /// Source account secret key (S...).
    ///
    /// **Prefer the environment variable** over the flag so the key does not
    /// end up in shell history.
    #[arg(long, env = "AUTHGAP_SOURCE_SECRET", hide_env_values = true)]
    pub source_secret: String,

    /// Where to write the base64 envelope. Stdout when omitted.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Arguments for `air-gapped sign`.
#[derive(Args, Debug)]
pub struct SignArgs {
    #[arg(long, default_value = "request.json")]
    pub request: PathBuf,

    /// The invocation the operator intends to authorize.
    #[arg(long, default_value = "instruction.json")]
    pub instruction: PathBuf,

    /// Contract this signer may authorize. Repeatable; none means nothing
    /// is authorized.
    #[arg(long = "allow", value_name = "CONTRACT")]
    pub allowed_contracts: Vec<Principal>,

    /// Signer secret key (S...).
    #[arg(long, env = "AUTHGAP_SIGNER_SECRET", hide_env_values = true)]
    pub signer_secret: String,

    #[arg(long, default_value = "response.json")]
    pub out: PathBuf,
}

/// Arguments for `expiration`.
#[derive(Args, Debug)]
pub struct ExpirationArgs {
    #[arg(long)]
    pub latest_ledger: u32,

    #[arg(long, default_value_t = DEFAULT_SIGNATURE_VALIDITY_MINUTES)]
    pub minutes: u32,
}
