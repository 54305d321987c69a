// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Authgap Operator CLI
//!
//! Entry point for the `authgap` binary. Parses CLI arguments, initializes
//! logging, and hands each subcommand to the protocol core through JSON
//! work-files:
//!
//! - `proxy prepare`     unsigned entries + signing request + instruction
//! - `air-gapped sign`   check the request against the instruction, sign
//! - `proxy assemble`    attach signatures, write the signed envelope
//! - `expiration`        ledger at which a signature made now expires

mod cli;
mod commands;
mod logging;
mod workfile;

use anyhow::Result;
use clap::Parser;

use cli::{AirGappedCommands, AuthgapCli, Commands, ProxyCommands};
use logging::LogFormat;

fn main() -> Result<()> {
    let cli = AuthgapCli::parse();
    logging::init_logging(
        "authgap_cli=info,authgap_protocol=info",
        LogFormat::from_str_lossy(&cli.log_format),
    );

    tracing::debug!(network = %cli.network, "authgap starting");

    match &cli.command {
        Commands::Proxy(ProxyCommands::Prepare(args)) => commands::prepare(&cli.network, args),
        Commands::Proxy(ProxyCommands::Assemble(args)) => commands::assemble(&cli.network, args),
        Commands::AirGapped(AirGappedCommands::Sign(args)) => commands::sign(&cli.network, args),
        Commands::Expiration(args) => commands::expiration(args),
    }
}
