use super::ledger::{Ledger, LedgerError, LedgerResult, Policy};
use super::store::StateStore;
use super::transfer::Transfer;
use std::fmt;

/// Operations the host can route to the ledger, by their wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Bootstrap hook. Takes no arguments and touches no state.
    Init,
    CreateAccount,
    MoneyTransfer,
    Read,
    ListRead,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Init,
        Operation::CreateAccount,
        Operation::MoneyTransfer,
        Operation::Read,
        Operation::ListRead,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "init" => Some(Self::Init),
            "createAccount" => Some(Self::CreateAccount),
            "moneyTransfer" | "transferFunds" => Some(Self::MoneyTransfer),
            "read" => Some(Self::Read),
            "listRead" => Some(Self::ListRead),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::CreateAccount => "createAccount",
            Self::MoneyTransfer => "moneyTransfer",
            Self::Read => "read",
            Self::ListRead => "listRead",
        }
    }

    /// Number of positional arguments the operation takes.
    pub fn arity(self) -> usize {
        match self {
            Self::Init => 0,
            Self::CreateAccount | Self::Read => 2,
            Self::MoneyTransfer => 3,
            Self::ListRead => 1,
        }
    }

    /// Queries only read state and may run against a shared store.
    pub fn is_query(self) -> bool {
        matches!(self, Self::Read | Self::ListRead)
    }

    fn check_arity(self, args: &[String]) -> LedgerResult<()> {
        if args.len() != self.arity() {
            return Err(LedgerError::ArgumentCount {
                operation: self.name(),
                expected: self.arity(),
                actual: args.len(),
            });
        }
        Ok(())
    }
}

/// Which host entry point an invocation arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    /// Accepts every operation.
    Dispatch,
    /// Accepts only state changing operations.
    Invoke,
    /// Accepts only read-only operations.
    Query,
}

impl EntryPoint {
    fn accepts(self, operation: Operation) -> bool {
        match self {
            Self::Dispatch => true,
            Self::Invoke => !operation.is_query(),
            Self::Query => operation.is_query(),
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dispatch => "call",
            Self::Invoke => "invocation",
            Self::Query => "query",
        })
    }
}

/// One request from the host: a function name and its string arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub function: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, A>(function: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            function: function.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Routes host invocations to the [`Ledger`].
///
/// Every call resolves the operation and checks its argument count before any
/// state is read. Successful calls return the raw result bytes, which are
/// empty for state changing operations.
#[derive(Debug, Clone, Default)]
pub struct Chaincode {
    ledger: Ledger,
}

impl Chaincode {
    pub fn new(policy: Policy) -> Self {
        Self {
            ledger: Ledger::new(policy),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Runs any known operation.
    pub fn dispatch<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        invocation: &Invocation,
    ) -> LedgerResult<Vec<u8>> {
        let result = self
            .resolve(EntryPoint::Dispatch, invocation)
            .and_then(|operation| {
                if operation.is_query() {
                    self.run_query(operation, &*store, &invocation.args)
                } else {
                    self.run_invoke(operation, store, &invocation.args)
                }
            });
        report(invocation, result)
    }

    /// Runs a state changing operation.
    pub fn invoke<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        invocation: &Invocation,
    ) -> LedgerResult<Vec<u8>> {
        let result = self
            .resolve(EntryPoint::Invoke, invocation)
            .and_then(|operation| self.run_invoke(operation, store, &invocation.args));
        report(invocation, result)
    }

    /// Runs a read-only operation. The store is only ever borrowed shared.
    pub fn query<S: StateStore + ?Sized>(
        &self,
        store: &S,
        invocation: &Invocation,
    ) -> LedgerResult<Vec<u8>> {
        let result = self
            .resolve(EntryPoint::Query, invocation)
            .and_then(|operation| self.run_query(operation, store, &invocation.args));
        report(invocation, result)
    }

    fn resolve(&self, entry: EntryPoint, invocation: &Invocation) -> LedgerResult<Operation> {
        info!("{entry} is running {}", invocation.function);

        let operation = Operation::from_name(&invocation.function)
            .filter(|operation| entry.accepts(*operation))
            .ok_or_else(|| LedgerError::UnknownOperation {
                entry,
                function: invocation.function.clone(),
            })?;
        operation.check_arity(&invocation.args)?;
        Ok(operation)
    }

    fn run_invoke<S: StateStore + ?Sized>(
        &self,
        operation: Operation,
        store: &mut S,
        args: &[String],
    ) -> LedgerResult<Vec<u8>> {
        match (operation, args) {
            (Operation::Init, []) => {}
            (Operation::CreateAccount, [id, credential]) => {
                self.ledger
                    .create_account(store, id.as_str().into(), credential.as_str().into())?;
            }
            (Operation::MoneyTransfer, [from, to, amount]) => {
                let transfer = Transfer::parse(from, to, amount)?;
                debug!(
                    "transfer of {} from {} to {}",
                    transfer.amount(),
                    transfer.from(),
                    transfer.to()
                );
                self.ledger.transfer_funds(store, transfer)?;
            }
            (operation, args) => return Err(mismatch(operation, args)),
        }
        Ok(Vec::new())
    }

    fn run_query<S: StateStore + ?Sized>(
        &self,
        operation: Operation,
        store: &S,
        args: &[String],
    ) -> LedgerResult<Vec<u8>> {
        match (operation, args) {
            (Operation::Read, [id, credential]) => {
                self.ledger
                    .read_account(store, &id.as_str().into(), &credential.as_str().into())
            }
            (Operation::ListRead, [label]) => {
                debug!("listing accounts for {label}");
                self.ledger.list_accounts(store)
            }
            (operation, args) => Err(mismatch(operation, args)),
        }
    }
}

// Reached only when an operation is routed to the wrong runner, which
// `resolve` already prevents.
fn mismatch(operation: Operation, args: &[String]) -> LedgerError {
    LedgerError::ArgumentCount {
        operation: operation.name(),
        expected: operation.arity(),
        actual: args.len(),
    }
}

fn report(invocation: &Invocation, result: LedgerResult<Vec<u8>>) -> LedgerResult<Vec<u8>> {
    if let Err(err) = &result {
        warn!("{} failed: {err}", invocation.function);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::store::MemoryStore;
    use test_case::test_case;

    #[test_case("init", Some(Operation::Init))]
    #[test_case("createAccount", Some(Operation::CreateAccount))]
    #[test_case("moneyTransfer", Some(Operation::MoneyTransfer))]
    #[test_case("transferFunds", Some(Operation::MoneyTransfer) ; "transfer alias")]
    #[test_case("read", Some(Operation::Read))]
    #[test_case("listRead", Some(Operation::ListRead))]
    #[test_case("bogus", None)]
    #[test_case("Read", None ; "names are case sensitive")]
    fn looks_up_operations(name: &str, expected: Option<Operation>) {
        assert_eq!(Operation::from_name(name), expected);
    }

    #[test]
    fn names_round_trip_through_lookup() {
        for operation in Operation::ALL {
            assert_eq!(Operation::from_name(operation.name()), Some(operation));
        }
    }

    #[test_case(Invocation::new("init", ["x"]), 0, 1 ; "init with argument")]
    #[test_case(Invocation::new("createAccount", ["a"]), 2, 1 ; "create missing credential")]
    #[test_case(Invocation::new("moneyTransfer", ["a", "b"]), 3, 2 ; "transfer missing amount")]
    #[test_case(Invocation::new("listRead", Vec::<String>::new()), 1, 0 ; "list without label")]
    fn wrong_argument_count(invocation: Invocation, expected_count: usize, actual_count: usize) {
        let mut store = MemoryStore::new();
        let err = Chaincode::default()
            .dispatch(&mut store, &invocation)
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::ArgumentCount { expected, actual, .. }
                if expected == expected_count && actual == actual_count
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn init_succeeds_without_touching_state() {
        let mut store = MemoryStore::new();
        let chaincode = Chaincode::default();
        let empty: [&str; 0] = [];
        assert!(chaincode
            .invoke(&mut store, &Invocation::new("init", empty))
            .unwrap()
            .is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn query_refuses_state_changes() {
        let store = MemoryStore::new();
        let err = Chaincode::default()
            .query(&store, &Invocation::new("createAccount", ["a", "pw"]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Received unknown function query: createAccount");
    }

    #[test]
    fn invoke_refuses_reads() {
        let mut store = MemoryStore::new();
        let err = Chaincode::default()
            .invoke(&mut store, &Invocation::new("read", ["a", "pw"]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Received unknown function invocation: read");
    }

    #[test]
    fn unknown_operation_is_named() {
        let mut store = MemoryStore::new();
        let err = Chaincode::default()
            .dispatch(&mut store, &Invocation::new("bogus", ["a"]))
            .unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_OPERATION");
        assert!(err.payload().contains("bogus"));
    }

    #[test]
    fn list_label_is_not_a_key() {
        let mut store = MemoryStore::new();
        let chaincode = Chaincode::default();
        chaincode
            .invoke(&mut store, &Invocation::new("createAccount", ["a", "pw"]))
            .unwrap();

        let by_any_label = chaincode
            .query(&store, &Invocation::new("listRead", ["whatever"]))
            .unwrap();

        assert_eq!(by_any_label, br#"{"list":"LIST","userid":["a"]}"#.to_vec());
    }
}
