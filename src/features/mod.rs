mod account;
mod codec;
mod dispatch;
mod ledger;
mod registry;
mod store;
mod transfer;

pub use self::{
    account::{Account, AccountError, AccountId, Credential, INITIAL_BALANCE},
    codec::{CodecError, CodecResult, Record},
    dispatch::{Chaincode, EntryPoint, Invocation, Operation},
    ledger::{Ledger, LedgerError, LedgerResult, Policy},
    registry::{AccountIndex, AccountRegistry, RESERVED_INDEX_KEY},
    store::{MemoryStore, StateStore, StoreError, StoreResult},
    transfer::{parse_amount, Transfer},
};
