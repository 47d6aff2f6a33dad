use super::account::{Account, AccountError, AccountId, Credential};
use super::codec::{CodecError, Record};
use super::dispatch::EntryPoint;
use super::registry::AccountRegistry;
use super::store::{StateStore, StoreError};
use super::transfer::Transfer;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Incorrect number of arguments for {operation}. Expecting {expected}, got {actual}")]
    ArgumentCount {
        operation: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid {argument} {value:?}: {reason}")]
    ArgumentFormat {
        argument: &'static str,
        value: String,
        reason: String,
    },

    #[error("Failed to encode record for {key}")]
    Encode {
        key: String,
        #[source]
        source: CodecError,
    },

    // The stored bytes hold the credential, so the decode detail stays in
    // the source chain and out of the message.
    #[error("Failed to decode state for {key}")]
    Decode {
        key: String,
        #[source]
        source: CodecError,
    },

    #[error("Failed to get state for {key}")]
    NotFound { key: String },

    #[error("login error for {id}")]
    Authentication { id: AccountId },

    #[error("Account {id} cannot send {requested}, only {available} is available")]
    InsufficientFunds {
        id: AccountId,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Account {id} already exists")]
    DuplicateAccount { id: AccountId },

    #[error("{id} is reserved and cannot be used as an account id")]
    ReservedId { id: AccountId },

    #[error("Balance of account {id} would overflow")]
    BalanceOverflow { id: AccountId },

    #[error("Received unknown function {entry}: {function}")]
    UnknownOperation { entry: EntryPoint, function: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<AccountError> for LedgerError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InsufficientFund {
                id,
                requested,
                available,
            } => Self::InsufficientFunds {
                id,
                requested,
                available,
            },
            AccountError::Overflow(id) => Self::BalanceOverflow { id },
        }
    }
}

impl LedgerError {
    /// Stable identifier of the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ArgumentCount { .. } => "ARGUMENT_COUNT",
            Self::ArgumentFormat { .. } => "ARGUMENT_FORMAT",
            Self::Encode { .. } => "ENCODE",
            Self::Decode { .. } => "DECODE",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Authentication { .. } => "AUTHENTICATION",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::DuplicateAccount { .. } => "DUPLICATE_ACCOUNT",
            Self::ReservedId { .. } => "RESERVED_ID",
            Self::BalanceOverflow { .. } => "BALANCE_OVERFLOW",
            Self::UnknownOperation { .. } => "UNKNOWN_OPERATION",
            Self::Store(_) => "STORE",
        }
    }

    /// The failure message handed back to the host: `{"Error":"..."}`.
    pub fn payload(&self) -> String {
        serde_json::json!({ "Error": self.to_string() }).to_string()
    }
}

/// Loads and decodes the record under `key`, keeping the raw bytes alongside.
///
/// An absent key, or an empty value (how some hosts report unset keys), is
/// `Ok(None)`. Bytes that do not decode are a [`LedgerError::Decode`].
pub(crate) fn load_record<R: Record, S: StateStore + ?Sized>(
    store: &S,
    key: &str,
) -> LedgerResult<Option<(R, Vec<u8>)>> {
    let bytes = match store.get(key)? {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => return Ok(None),
    };
    let record = R::decode(&bytes).map_err(|source| LedgerError::Decode {
        key: key.to_owned(),
        source,
    })?;
    Ok(Some((record, bytes)))
}

pub(crate) fn encode_record<R: Record>(record: &R, key: &str) -> LedgerResult<Vec<u8>> {
    record.encode().map_err(|source| LedgerError::Encode {
        key: key.to_owned(),
        source,
    })
}

/// Guards the ledger enforces on top of the bare record updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    /// Fail with [`LedgerError::DuplicateAccount`] instead of overwriting.
    pub reject_duplicates: bool,
    /// Fail with [`LedgerError::InsufficientFunds`] instead of overdrawing.
    pub enforce_funds: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            reject_duplicates: true,
            enforce_funds: true,
        }
    }
}

/// Account operations over a [`StateStore`]. Holds no state between calls.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    policy: Policy,
    registry: AccountRegistry,
}

impl Ledger {
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            registry: AccountRegistry::default(),
        }
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn registry(&self) -> &AccountRegistry {
        &self.registry
    }

    /// Creates `id` with the initial balance and records it in the index.
    ///
    /// The account and index writes are committed as one batch.
    pub fn create_account<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        id: AccountId,
        credential: Credential,
    ) -> LedgerResult<()> {
        ensure_not_reserved(&id)?;

        match load_record::<Account, S>(&*store, id.as_str()) {
            Ok(Some(_)) if self.policy.reject_duplicates => {
                return Err(LedgerError::DuplicateAccount { id })
            }
            Ok(Some(_)) => warn!("overwriting existing account {id}"),
            // An unreadable record is overwritten the same way an absent one is
            // created, unless duplicates are rejected.
            Err(LedgerError::Decode { .. }) if !self.policy.reject_duplicates => {
                warn!("overwriting undecodable record under {id}")
            }
            Err(err) => return Err(err),
            Ok(None) => {}
        }

        let account = Account::new(id, credential);
        let bytes = encode_record(&account, account.id().as_str())?;

        let mut writes = vec![(account.id().to_string(), bytes)];
        writes.extend(self.registry.stage_append(&*store, account.id())?);
        store.put_batch(writes)?;

        info!("created account {}", account.id());
        Ok(())
    }

    pub fn transfer_funds<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        transfer: Transfer,
    ) -> LedgerResult<()> {
        transfer.apply(self, store)
    }

    /// Returns the stored account bytes verbatim when `credential` matches.
    pub fn read_account<S: StateStore + ?Sized>(
        &self,
        store: &S,
        id: &AccountId,
        credential: &Credential,
    ) -> LedgerResult<Vec<u8>> {
        let (account, bytes) = self.load_account(store, id)?;
        if !account.authenticate(credential) {
            return Err(LedgerError::Authentication { id: id.clone() });
        }
        Ok(bytes)
    }

    pub fn list_accounts<S: StateStore + ?Sized>(&self, store: &S) -> LedgerResult<Vec<u8>> {
        self.registry.raw(store)
    }

    pub fn load_account<S: StateStore + ?Sized>(
        &self,
        store: &S,
        id: &AccountId,
    ) -> LedgerResult<(Account, Vec<u8>)> {
        ensure_not_reserved(id)?;
        load_record(store, id.as_str())?.ok_or_else(|| LedgerError::NotFound {
            key: id.to_string(),
        })
    }
}

pub(crate) fn ensure_not_reserved(id: &AccountId) -> LedgerResult<()> {
    if id.is_reserved() {
        return Err(LedgerError::ReservedId { id: id.clone() });
    }
    Ok(())
}
