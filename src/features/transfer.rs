use super::account::AccountId;
use super::ledger::{encode_record, ensure_not_reserved, Ledger, LedgerError, LedgerResult};
use super::store::StateStore;
use rust_decimal::prelude::*;

/// A request to move `amount` from one account to another.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    from: AccountId,
    to: AccountId,

    /// Never negative.
    amount: Decimal,
}

impl Transfer {
    pub fn new(from: AccountId, to: AccountId, amount: Decimal) -> LedgerResult<Self> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(LedgerError::ArgumentFormat {
                argument: "amount",
                value: amount.to_string(),
                reason: "amount must not be negative".into(),
            });
        }
        ensure_not_reserved(&from)?;
        ensure_not_reserved(&to)?;

        Ok(Self { from, to, amount })
    }

    /// Builds a transfer from the raw invocation arguments.
    pub fn parse(from: &str, to: &str, amount: &str) -> LedgerResult<Self> {
        Self::new(from.into(), to.into(), parse_amount(amount)?)
    }

    pub fn from(&self) -> &AccountId {
        &self.from
    }

    pub fn to(&self) -> &AccountId {
        &self.to
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Debits `from`, credits `to` and commits both records in one batch.
    ///
    /// Both accounts are loaded before anything is written, so a missing or
    /// unreadable account leaves the store untouched.
    pub(crate) fn apply<S: StateStore + ?Sized>(
        self,
        ledger: &Ledger,
        store: &mut S,
    ) -> LedgerResult<()> {
        let enforce_funds = ledger.policy().enforce_funds;
        let (from_account, _) = ledger.load_account(&*store, &self.from)?;
        let (to_account, _) = ledger.load_account(&*store, &self.to)?;

        let from_account = from_account.withdraw(self.amount, enforce_funds)?;

        if self.from == self.to {
            info!(
                "self transfer of {} on {} left balance unchanged",
                self.amount, self.from
            );
            return Ok(());
        }

        let to_account = to_account.deposit(self.amount)?;

        let writes = vec![
            (
                self.from.to_string(),
                encode_record(&from_account, self.from.as_str())?,
            ),
            (
                self.to.to_string(),
                encode_record(&to_account, self.to.as_str())?,
            ),
        ];
        store.put_batch(writes)?;

        info!("transferred {} from {} to {}", self.amount, self.from, self.to);
        Ok(())
    }
}

/// Parses a decimal amount, accepting scientific notation such as `1e3`.
///
/// Finite numbers outside the range of [`Decimal`] are refused rather than
/// rounded.
pub fn parse_amount(raw: &str) -> LedgerResult<Decimal> {
    let trimmed = raw.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|err| {
            let reason = match trimmed.parse::<f64>() {
                Ok(value) if value.is_finite() => {
                    "amount is outside the supported decimal range".to_owned()
                }
                _ => err.to_string(),
            };
            LedgerError::ArgumentFormat {
                argument: "amount",
                value: raw.to_owned(),
                reason,
            }
        })
}
