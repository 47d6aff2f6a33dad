use super::codec::Record;
use super::registry::RESERVED_INDEX_KEY;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Balance every freshly created account starts with.
pub const INITIAL_BALANCE: Decimal = dec!(10000000);

/// Account identifier, also the storage key of the account record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, PartialOrd, Eq, Ord, Hash)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id collides with the key the account index lives under.
    pub fn is_reserved(&self) -> bool {
        self.0 == RESERVED_INDEX_KEY
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Opaque secret guarding read access to an account.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(**)")
    }
}

impl From<&str> for Credential {
    fn from(secret: &str) -> Self {
        Self::new(secret)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum AccountError {
    #[error("Account {id} cannot send {requested}, only {available} is available")]
    InsufficientFund {
        id: AccountId,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Balance of account {0} would overflow")]
    Overflow(AccountId),
}

type AccountResult<T> = Result<T, AccountError>;

/// Ledger participant, stored under its own id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Account {
    id: AccountId,

    /// Only ever compared against a caller supplied credential on reads.
    #[serde(rename = "password")]
    credential: Credential,

    #[serde(rename = "cashBalance", with = "rust_decimal::serde::arbitrary_precision")]
    balance: Decimal,
}

impl Record for Account {}

impl Account {
    pub fn new(id: AccountId, credential: Credential) -> Self {
        Self::with_balance(id, credential, INITIAL_BALANCE)
    }

    pub fn with_balance(id: AccountId, credential: Credential, balance: Decimal) -> Self {
        Self {
            id,
            credential,
            balance,
        }
    }

    pub fn id(&self) -> &AccountId {
        &self.id
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn authenticate(&self, credential: &Credential) -> bool {
        self.credential == *credential
    }

    /// Debits `amount`. With `enforce_funds` the balance may not drop below zero.
    pub fn withdraw(self, amount: Decimal, enforce_funds: bool) -> AccountResult<Self> {
        if enforce_funds && self.balance < amount {
            return Err(AccountError::InsufficientFund {
                id: self.id,
                requested: amount,
                available: self.balance,
            });
        }

        let balance = self
            .balance
            .checked_sub(amount)
            .ok_or_else(|| AccountError::Overflow(self.id.clone()))?;
        Ok(Self { balance, ..self })
    }

    pub fn deposit(self, amount: Decimal) -> AccountResult<Self> {
        let balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| AccountError::Overflow(self.id.clone()))?;
        Ok(Self { balance, ..self })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn alice() -> Account {
        Account::new("alice".into(), "pw".into())
    }

    #[test]
    fn starts_with_initial_balance() {
        assert_eq!(alice().balance(), dec!(10000000));
    }

    #[test]
    fn encodes_with_legacy_field_names() {
        let json: serde_json::Value = serde_json::from_slice(&alice().encode().unwrap()).unwrap();
        assert_eq!(json["id"], "alice");
        assert_eq!(json["password"], "pw");
        assert_eq!(json["cashBalance"].as_f64(), Some(10_000_000.0));
    }

    #[test]
    fn decodes_legacy_record() {
        let account =
            Account::decode(br#"{"id":"bob","password":"x","cashBalance":9999990.5}"#).unwrap();
        assert_eq!(account.id().as_str(), "bob");
        assert_eq!(account.balance(), dec!(9999990.5));
        assert!(account.authenticate(&"x".into()));
    }

    #[test_case(dec!(0.12345678901234567890) ; "twenty fraction digits")]
    #[test_case(dec!(9999999.999999999) ; "nano below opening balance")]
    #[test_case(dec!(10000000.000000001) ; "nano above opening balance")]
    #[test_case(dec!(-0.000000000000000001) ; "tiny negative")]
    fn balance_survives_encoding_exactly(balance: Decimal) {
        let account = Account::with_balance("a".into(), "pw".into(), balance);
        let bytes = account.encode().unwrap();
        assert_eq!(Account::decode(&bytes).unwrap().balance(), balance);
    }

    #[test]
    fn balance_is_written_digit_for_digit() {
        let account = Account::with_balance("a".into(), "pw".into(), dec!(9999999.999999999));
        let text = String::from_utf8(account.encode().unwrap()).unwrap();
        assert!(text.contains(r#""cashBalance":9999999.999999999"#));
    }

    #[test_case(dec!(0), dec!(1) ; "zero balance")]
    #[test_case(dec!(5), dec!(5.01) ; "fractional excess")]
    fn withdraw_rejects_overdraft(balance: Decimal, amount: Decimal) {
        let account = Account::with_balance("a".into(), "pw".into(), balance);
        let err = account.withdraw(amount, true).unwrap_err();
        assert_eq!(
            err,
            AccountError::InsufficientFund {
                id: "a".into(),
                requested: amount,
                available: balance,
            }
        );
    }

    #[test]
    fn withdraw_can_overdraw_when_unchecked() {
        let account = Account::with_balance("a".into(), "pw".into(), dec!(1));
        assert_eq!(account.withdraw(dec!(3), false).unwrap().balance(), dec!(-2));
    }

    #[test]
    fn withdraw_entire_balance() {
        let account = alice().withdraw(INITIAL_BALANCE, true).unwrap();
        assert_eq!(account.balance(), Decimal::ZERO);
    }

    #[test]
    fn deposit_overflow_is_reported() {
        let account = Account::with_balance("a".into(), "pw".into(), Decimal::MAX);
        assert_eq!(
            account.deposit(dec!(1)).unwrap_err(),
            AccountError::Overflow("a".into())
        );
    }

    #[test]
    fn debug_hides_credential() {
        let rendered = format!("{:?}", Account::new("a".into(), "hunter2".into()));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn reserved_id_is_detected() {
        assert!(AccountId::from("LIST").is_reserved());
        assert!(!AccountId::from("list").is_reserved());
    }
}
