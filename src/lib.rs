//! Minimal account ledger run as chaincode over a key/value state store.
//!
//! Accounts are created with a fixed opening balance, read back behind a
//! credential, and moved between with transfers. A singleton index under
//! [`RESERVED_INDEX_KEY`] lists every account in creation order. The host
//! supplies persistence through [`StateStore`] and routes named invocations
//! through [`Chaincode`].

#[macro_use]
extern crate log;

mod features;

pub use features::*;
