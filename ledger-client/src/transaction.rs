//! The in-memory pending transaction and the builder that assembles it
//!
//! A transaction is an ordered list of instructions executed atomically by
//! the ledger. Instructions refer to inputs (objects and pure values) and to
//! the results of earlier instructions through [`Argument`] handles. The
//! builder validates every reference as it is appended, so a malformed
//! transaction is rejected before anything is signed or sent.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    error::{LedgerClientError, TransactionError},
    types::{Address, ObjectId},
};

// -------------
// | Constants |
// -------------

/// The maximum number of inputs or instructions a transaction may hold
const MAX_ENTRIES: usize = u16::MAX as usize;

/// The separator between the components of a move call target
const TARGET_SEPARATOR: &str = "::";

// ---------
// | Types |
// ---------

/// A reference to a value available within a transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Argument {
    /// The coin used to pay for gas
    GasCoin,
    /// An input to the transaction
    Input(u16),
    /// The (single) result of an earlier instruction
    Result(u16),
    /// One element of the results of an earlier instruction
    NestedResult(u16, u16),
}

/// A pure (non-object) input value
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PureValue {
    /// An unsigned 64-bit integer
    U64(u64),
    /// An account address
    Address(Address),
    /// A byte vector
    Bytes(Vec<u8>),
}

/// An input to a transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Input {
    /// An object, resolved by the node at execution time
    Object(ObjectId),
    /// A pure value
    Pure(PureValue),
}

/// The fully qualified function targeted by a move call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveTarget {
    /// The package defining the module
    pub package: ObjectId,
    /// The module name
    pub module: String,
    /// The function name
    pub function: String,
}

impl MoveTarget {
    /// Construct a move call target, validating its identifiers
    pub fn new(
        package: ObjectId,
        module: impl Into<String>,
        function: impl Into<String>,
    ) -> Result<Self, TransactionError> {
        let module = module.into();
        let function = function.into();
        validate_identifier(&module)?;
        validate_identifier(&function)?;

        Ok(Self { package, module, function })
    }
}

impl FromStr for MoveTarget {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(TARGET_SEPARATOR).collect();
        let [package, module, function] = parts.as_slice() else {
            return Err(TransactionError::MalformedReference(format!("move target {s:?}")));
        };

        Self::new(package.parse()?, *module, *function)
    }
}

impl fmt::Display for MoveTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.package, self.module, self.function)
    }
}

/// A single instruction within a transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instruction {
    /// Split the given amounts off of a coin, producing one coin per amount
    SplitCoins {
        /// The coin to split
        coin: Argument,
        /// The amounts to split off
        amounts: Vec<Argument>,
    },
    /// Call a move function
    MoveCall {
        /// The function to call
        target: MoveTarget,
        /// The type arguments to the function
        type_arguments: Vec<String>,
        /// The value arguments to the function
        arguments: Vec<Argument>,
    },
    /// Transfer objects to a recipient
    TransferObjects {
        /// The objects to transfer
        objects: Vec<Argument>,
        /// The recipient's address
        recipient: Argument,
    },
    /// Publish a package, producing its upgrade capability
    Publish {
        /// The base64-encoded compiled modules
        modules: Vec<String>,
        /// The packages the new package depends on
        dependencies: Vec<ObjectId>,
    },
}

impl Instruction {
    /// The target of the instruction, if it is a move call
    pub fn move_target(&self) -> Option<&MoveTarget> {
        match self {
            Instruction::MoveCall { target, .. } => Some(target),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::SplitCoins { amounts, .. } => write!(f, "split_coins({})", amounts.len()),
            Instruction::MoveCall { target, .. } => write!(f, "move_call({target})"),
            Instruction::TransferObjects { objects, .. } => {
                write!(f, "transfer_objects({})", objects.len())
            },
            Instruction::Publish { modules, .. } => write!(f, "publish({})", modules.len()),
        }
    }
}

// -----------------------
// | Pending Transaction |
// -----------------------

/// An assembled, not yet submitted transaction
///
/// Produced only by [`TransactionBuilder::finish`] and consumed by value on
/// submission, so it cannot be altered or submitted twice
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingTransaction {
    /// The transaction inputs
    inputs: Vec<Input>,
    /// The ordered instructions
    instructions: Vec<Instruction>,
    /// An explicit gas budget, if one was set
    gas_budget: Option<u64>,
}

impl PendingTransaction {
    /// The transaction inputs
    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    /// The ordered instructions
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// The explicit gas budget, if one was set
    pub fn gas_budget(&self) -> Option<u64> {
        self.gas_budget
    }

    /// Resolve an argument to the pure value it refers to, if it refers to
    /// a pure input
    pub fn pure_value(&self, arg: Argument) -> Option<&PureValue> {
        match arg {
            Argument::Input(idx) => match self.inputs.get(idx as usize)? {
                Input::Pure(value) => Some(value),
                Input::Object(_) => None,
            },
            _ => None,
        }
    }

    /// Resolve an argument to the object it refers to, if it refers to an
    /// object input
    pub fn object_input(&self, arg: Argument) -> Option<ObjectId> {
        match arg {
            Argument::Input(idx) => match self.inputs.get(idx as usize)? {
                Input::Object(id) => Some(*id),
                Input::Pure(_) => None,
            },
            _ => None,
        }
    }

    /// The ids of the objects passed as inputs, in input order
    pub fn object_inputs(&self) -> impl Iterator<Item = ObjectId> {
        self.inputs.iter().filter_map(|input| match input {
            Input::Object(id) => Some(*id),
            Input::Pure(_) => None,
        })
    }

    /// Render the transaction as JSON for logging
    ///
    /// This is not the form that is signed; see
    /// [`encode_transaction`](crate::encoding::encode_transaction)
    pub fn to_json(&self) -> Result<String, LedgerClientError> {
        let rendered = RenderedTransaction {
            gas_budget: self.gas_budget,
            inputs: &self.inputs,
            instructions: &self.instructions,
        };

        serde_json::to_string(&rendered).map_err(LedgerClientError::parsing)
    }
}

/// The logged form of a transaction
#[derive(Serialize)]
struct RenderedTransaction<'a> {
    /// The explicit gas budget, if one was set
    #[serde(skip_serializing_if = "Option::is_none")]
    gas_budget: Option<u64>,
    /// The transaction inputs
    inputs: &'a [Input],
    /// The ordered instructions
    instructions: &'a [Instruction],
}

// -----------
// | Builder |
// -----------

/// Accumulates inputs and instructions into a [`PendingTransaction`]
#[derive(Clone, Debug, Default)]
pub struct TransactionBuilder {
    /// The inputs added so far
    inputs: Vec<Input>,
    /// The instructions added so far
    instructions: Vec<Instruction>,
    /// An explicit gas budget
    gas_budget: Option<u64>,
}

impl TransactionBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    // ----------
    // | Inputs |
    // ----------

    /// A reference to the gas coin
    pub fn gas(&self) -> Argument {
        Argument::GasCoin
    }

    /// Add an object input, reusing the existing input if the object was
    /// already added
    pub fn object(&mut self, id: ObjectId) -> Result<Argument, TransactionError> {
        let existing = self.inputs.iter().position(|input| input == &Input::Object(id));
        if let Some(idx) = existing {
            return Ok(Argument::Input(idx as u16));
        }

        self.push_input(Input::Object(id))
    }

    /// Add a `u64` pure input
    pub fn pure_u64(&mut self, value: u64) -> Result<Argument, TransactionError> {
        self.push_input(Input::Pure(PureValue::U64(value)))
    }

    /// Add an address pure input
    pub fn pure_address(&mut self, address: Address) -> Result<Argument, TransactionError> {
        self.push_input(Input::Pure(PureValue::Address(address)))
    }

    /// Add a byte vector pure input
    pub fn pure_bytes(&mut self, bytes: impl Into<Vec<u8>>) -> Result<Argument, TransactionError> {
        self.push_input(Input::Pure(PureValue::Bytes(bytes.into())))
    }

    // ----------------
    // | Instructions |
    // ----------------

    /// Split the given amounts off of a coin
    ///
    /// Returns one argument per amount, referring to the new coins
    pub fn split_coins(
        &mut self,
        coin: Argument,
        amounts: Vec<Argument>,
    ) -> Result<Vec<Argument>, TransactionError> {
        if amounts.is_empty() {
            return Err(TransactionError::EmptyArguments("split_coins"));
        }
        if amounts.len() > MAX_ENTRIES {
            return Err(TransactionError::Full("amounts"));
        }
        self.check_argument(coin)?;
        self.check_arguments(&amounts)?;

        let n_amounts = amounts.len() as u16;
        let idx = self.push_instruction(Instruction::SplitCoins { coin, amounts })?;
        Ok((0..n_amounts).map(|i| Argument::NestedResult(idx, i)).collect())
    }

    /// Call a move function, returning a reference to its result
    pub fn move_call(
        &mut self,
        target: MoveTarget,
        type_arguments: Vec<String>,
        arguments: Vec<Argument>,
    ) -> Result<Argument, TransactionError> {
        self.check_arguments(&arguments)?;

        let idx =
            self.push_instruction(Instruction::MoveCall { target, type_arguments, arguments })?;
        Ok(Argument::Result(idx))
    }

    /// Transfer objects to a recipient
    pub fn transfer_objects(
        &mut self,
        objects: Vec<Argument>,
        recipient: Argument,
    ) -> Result<(), TransactionError> {
        if objects.is_empty() {
            return Err(TransactionError::EmptyArguments("transfer_objects"));
        }
        self.check_arguments(&objects)?;
        self.check_argument(recipient)?;

        self.push_instruction(Instruction::TransferObjects { objects, recipient })?;
        Ok(())
    }

    /// Publish a package, returning a reference to its upgrade capability
    pub fn publish(
        &mut self,
        modules: Vec<String>,
        dependencies: Vec<ObjectId>,
    ) -> Result<Argument, TransactionError> {
        if modules.is_empty() {
            return Err(TransactionError::EmptyArguments("publish"));
        }

        let idx = self.push_instruction(Instruction::Publish { modules, dependencies })?;
        Ok(Argument::Result(idx))
    }

    /// Set an explicit gas budget
    pub fn set_gas_budget(&mut self, budget: u64) {
        self.gas_budget = Some(budget);
    }

    /// Consume the builder, producing the pending transaction
    pub fn finish(self) -> PendingTransaction {
        let TransactionBuilder { inputs, instructions, gas_budget } = self;
        PendingTransaction { inputs, instructions, gas_budget }
    }

    // -----------
    // | Helpers |
    // -----------

    /// Append an input, returning a reference to it
    fn push_input(&mut self, input: Input) -> Result<Argument, TransactionError> {
        if self.inputs.len() >= MAX_ENTRIES {
            return Err(TransactionError::Full("inputs"));
        }

        self.inputs.push(input);
        Ok(Argument::Input((self.inputs.len() - 1) as u16))
    }

    /// Append an instruction, returning its index
    fn push_instruction(&mut self, instruction: Instruction) -> Result<u16, TransactionError> {
        if self.instructions.len() >= MAX_ENTRIES {
            return Err(TransactionError::Full("instructions"));
        }

        self.instructions.push(instruction);
        Ok((self.instructions.len() - 1) as u16)
    }

    /// Check a list of arguments
    fn check_arguments(&self, args: &[Argument]) -> Result<(), TransactionError> {
        args.iter().try_for_each(|arg| self.check_argument(*arg))
    }

    /// Check that an argument refers to something already in the transaction
    fn check_argument(&self, arg: Argument) -> Result<(), TransactionError> {
        match arg {
            Argument::GasCoin => Ok(()),
            Argument::Input(idx) if (idx as usize) < self.inputs.len() => Ok(()),
            Argument::Input(idx) => Err(TransactionError::UnknownInput(idx)),
            Argument::Result(idx) if (idx as usize) < self.instructions.len() => Ok(()),
            Argument::Result(idx) => Err(TransactionError::UnknownResult(idx)),
            Argument::NestedResult(idx, sub_idx) => match self.instructions.get(idx as usize) {
                Some(Instruction::SplitCoins { amounts, .. })
                    if sub_idx as usize >= amounts.len() =>
                {
                    Err(TransactionError::UnknownResult(idx))
                },
                Some(_) => Ok(()),
                None => Err(TransactionError::UnknownResult(idx)),
            },
        }
    }
}

/// Validate a move identifier
///
/// Identifiers start with a letter, or with an underscore followed by at
/// least one more character, and contain only ASCII alphanumerics and
/// underscores
fn validate_identifier(ident: &str) -> Result<(), TransactionError> {
    let mut chars = ident.chars();
    let valid_start = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => true,
        Some('_') => ident.len() > 1,
        _ => false,
    };

    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(TransactionError::InvalidIdentifier(ident.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The package used in test move calls
    const TEST_PACKAGE: &str = "0x5";

    /// Build a move call target in the test package
    fn target(module: &str, function: &str) -> MoveTarget {
        MoveTarget::new(TEST_PACKAGE.parse().unwrap(), module, function).unwrap()
    }

    /// Tests that results chain between instructions in order
    #[test]
    fn test_build_chained_instructions() {
        let mut builder = TransactionBuilder::new();
        let amount = builder.pure_u64(1000).unwrap();
        let coins = builder.split_coins(builder.gas(), vec![amount]).unwrap();
        assert_eq!(coins, vec![Argument::NestedResult(0, 0)]);

        let created = builder.move_call(target("bank", "new_account"), vec![], vec![]).unwrap();
        assert_eq!(created, Argument::Result(1));

        let recipient = builder.pure_address("0x1".parse().unwrap()).unwrap();
        builder.transfer_objects(vec![created, coins[0]], recipient).unwrap();

        let tx = builder.finish();
        assert_eq!(tx.instructions().len(), 3);
        assert_eq!(tx.inputs().len(), 2);
        assert_eq!(tx.pure_value(amount), Some(&PureValue::U64(1000)));
    }

    /// Tests that the same object is only added as an input once
    #[test]
    fn test_object_inputs_deduplicated() {
        let mut builder = TransactionBuilder::new();
        let id: ObjectId = "0xb".parse().unwrap();
        let first = builder.object(id).unwrap();
        let second = builder.object(id).unwrap();

        assert_eq!(first, second);
        builder.pure_u64(1).unwrap();
        let tx = builder.finish();
        assert_eq!(tx.object_input(first), Some(id));
        assert_eq!(tx.object_inputs().collect::<Vec<_>>(), vec![id]);
    }

    /// Tests that references to results that do not exist are rejected
    #[test]
    fn test_reject_unknown_references() {
        let mut builder = TransactionBuilder::new();
        let err = builder
            .move_call(target("bank", "deposit"), vec![], vec![Argument::Result(0)])
            .unwrap_err();
        assert_eq!(err, TransactionError::UnknownResult(0));

        let err =
            builder.transfer_objects(vec![Argument::GasCoin], Argument::Input(3)).unwrap_err();
        assert_eq!(err, TransactionError::UnknownInput(3));

        let amount = builder.pure_u64(1).unwrap();
        builder.split_coins(builder.gas(), vec![amount]).unwrap();
        let err = builder
            .transfer_objects(vec![Argument::NestedResult(0, 1)], amount)
            .unwrap_err();
        assert_eq!(err, TransactionError::UnknownResult(0));
    }

    /// Tests that empty argument lists are rejected where arguments are
    /// required
    #[test]
    fn test_reject_empty_arguments() {
        let mut builder = TransactionBuilder::new();
        assert!(builder.split_coins(Argument::GasCoin, vec![]).is_err());
        assert!(builder.transfer_objects(vec![], Argument::GasCoin).is_err());
        assert!(builder.publish(vec![], vec![]).is_err());
        assert!(builder.finish().instructions().is_empty());
    }

    /// Tests that a split with more amounts than results can address is
    /// rejected
    #[test]
    fn test_reject_oversized_split() {
        let mut builder = TransactionBuilder::new();
        let amount = builder.pure_u64(1).unwrap();

        let err = builder.split_coins(builder.gas(), vec![amount; MAX_ENTRIES + 1]).unwrap_err();
        assert_eq!(err, TransactionError::Full("amounts"));
        assert!(builder.clone().finish().instructions().is_empty());

        let coins = builder.split_coins(builder.gas(), vec![amount; MAX_ENTRIES]).unwrap();
        assert_eq!(coins.last(), Some(&Argument::NestedResult(0, u16::MAX - 1)));
    }

    /// Tests move target parsing and identifier validation
    #[test]
    fn test_move_target_parsing() {
        let parsed: MoveTarget = "0x5::lending::borrow".parse().unwrap();
        assert_eq!(parsed, target("lending", "borrow"));

        assert!("0x5::lending".parse::<MoveTarget>().is_err());
        assert!("0x5::1bank::deposit".parse::<MoveTarget>().is_err());
        assert!("0x5::bank::_".parse::<MoveTarget>().is_err());
        assert!("0x5::bank::new-account".parse::<MoveTarget>().is_err());
        assert!("0x5::_bank::new_account".parse::<MoveTarget>().is_ok());
    }

    /// Tests the JSON rendering used in logs
    #[test]
    fn test_transaction_json() {
        let mut builder = TransactionBuilder::new();
        builder.set_gas_budget(10);
        builder.pure_u64(7).unwrap();
        let tx = builder.finish();

        let value: serde_json::Value = serde_json::from_str(&tx.to_json().unwrap()).unwrap();
        assert_eq!(value["gas_budget"], 10);
        assert_eq!(value["inputs"], serde_json::json!([{ "pure": { "u64": 7 } }]));
        assert_eq!(value["instructions"], serde_json::json!([]));
    }
}
