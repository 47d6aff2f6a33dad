use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::process;
#[macro_use]
extern crate log;

mod config;

use anyhow::Context;
use clap::Parser;
use config::Opts;
use ledger_chaincode::{Chaincode, Invocation, MemoryStore};

fn main() {
    let opts = Opts::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&opts.log_level))
        .init();

    if let Err(e) = run(&opts) {
        error!("{e:#}");
        process::exit(1);
    }
}

fn run(opts: &Opts) -> anyhow::Result<MemoryStore> {
    let mut store = match &opts.state {
        Some(path) => load_state(path)?,
        None => MemoryStore::new(),
    };
    let chaincode = Chaincode::new(opts.policy());
    debug!("running with {:?}", chaincode.ledger().policy());

    let input: Box<dyn io::Read> = match &opts.input {
        Some(path) => Box::new(
            File::open(path).with_context(|| format!("Unable to open {}", path.display()))?,
        ),
        None => Box::new(io::stdin()),
    };

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(input);
    let mut wtr = csv::Writer::from_writer(io::stdout());
    wtr.write_record(["function", "status", "payload"])?;

    for result in rdr.records() {
        let record = result?;
        let mut fields = record.iter();
        let function = match fields.next() {
            Some(function) if !function.is_empty() => function,
            _ => continue,
        };

        let invocation = Invocation::new(function, fields);
        match chaincode.dispatch(&mut store, &invocation) {
            Ok(bytes) => {
                let payload = String::from_utf8_lossy(&bytes);
                wtr.write_record([function, "ok", payload.as_ref()])?;
            }
            Err(e) => wtr.write_record([function, e.code(), e.payload().as_str()])?,
        }
    }
    wtr.flush()?;

    if let Some(path) = &opts.state {
        save_state(&store, path)?;
    }
    info!("state holds {} records", store.len());

    Ok(store)
}

fn load_state(path: &Path) -> anyhow::Result<MemoryStore> {
    if !path.exists() {
        info!("no state at {}, starting empty", path.display());
        return Ok(MemoryStore::new());
    }
    let file = File::open(path).with_context(|| format!("Unable to open {}", path.display()))?;
    MemoryStore::read_snapshot(io::BufReader::new(file))
        .with_context(|| format!("Unable to load state from {}", path.display()))
}

/// Replaces the snapshot at `path` only once the new one is fully on disk.
fn save_state(store: &MemoryStore, path: &Path) -> anyhow::Result<()> {
    let snapshot = store
        .to_snapshot()
        .with_context(|| format!("Unable to save state to {}", path.display()))?;

    let staging = path.with_extension("tmp");
    fs::write(&staging, snapshot)
        .with_context(|| format!("Unable to write {}", staging.display()))?;
    fs::rename(&staging, path)
        .with_context(|| format!("Unable to replace {}", path.display()))
}
