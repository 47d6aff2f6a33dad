use clap::Parser;
use ledger_chaincode::Policy;
use std::path::PathBuf;

/// Runs a batch of ledger invocations against a key/value state snapshot.
///
/// Each input row is `function,arg1,arg2,...`. One `function,status,payload`
/// row per invocation is written to stdout.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
pub struct Opts {
    /// CSV file of invocations; stdin when omitted
    pub input: Option<PathBuf>,

    /// JSON state snapshot, loaded when it exists and rewritten after the batch
    #[clap(long, env = "LEDGER_STATE")]
    pub state: Option<PathBuf>,

    /// Let createAccount overwrite an existing account
    #[clap(long)]
    pub allow_overwrite: bool,

    /// Let transfers drive a balance below zero
    #[clap(long)]
    pub allow_overdraft: bool,

    /// Default log filter when RUST_LOG is unset
    #[clap(long, env = "LEDGER_LOG", default_value = "info")]
    pub log_level: String,
}

impl Opts {
    pub fn policy(&self) -> Policy {
        Policy {
            reject_duplicates: !self.allow_overwrite,
            enforce_funds: !self.allow_overdraft,
        }
    }
}
