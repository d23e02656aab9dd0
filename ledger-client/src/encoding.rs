//! The binary transaction format the node hashes and verifies
//!
//! The wire types below mirror the node's `TransactionData` layout field for
//! field, so that `bcs` emits the exact bytes the signature covers. Objects
//! and gas coins are resolved against the node before encoding; see
//! [`ResolvedObject`] and [`GasConfig`].

use std::collections::HashMap;

use base64::engine::{Engine, general_purpose as b64_general_purpose};
use serde::{Serialize, Serializer, ser::SerializeTupleVariant};

use crate::{
    error::LedgerClientError,
    transaction::{Argument, Input, Instruction, PendingTransaction, PureValue},
    types::{Address, IDENTIFIER_LENGTH, ObjectId},
};

// -------------
// | Constants |
// -------------

/// The number of bytes in an object digest
const DIGEST_LENGTH: usize = 32;

/// The separator between the components of a struct type
const PATH_SEPARATOR: &str = "::";

/// The name the command enum is serialized under
const COMMAND_NAME: &str = "Command";

// --------------------
// | Resolved Objects |
// --------------------

/// A reference to one version of an object
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectRef {
    /// The object id
    pub object_id: ObjectId,
    /// The object version
    pub version: u64,
    /// The digest of the object's contents at this version
    pub digest: [u8; DIGEST_LENGTH],
}

impl ObjectRef {
    /// Build a reference from the forms the node reports: a numeric version
    /// and a base58 digest
    pub fn from_base58(
        object_id: ObjectId,
        version: u64,
        digest: &str,
    ) -> Result<Self, LedgerClientError> {
        let bytes = bs58::decode(digest).into_vec().map_err(LedgerClientError::parsing)?;
        let digest = bytes.try_into().map_err(|bytes: Vec<u8>| {
            LedgerClientError::parsing(format!("digest of {object_id} has {} bytes", bytes.len()))
        })?;

        Ok(Self { object_id, version, digest })
    }

    /// The wire form of the reference
    fn to_wire(&self) -> WireObjectRef {
        (*self.object_id.as_bytes(), self.version, self.digest.to_vec())
    }
}

/// How an object input is passed to the node
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedObject {
    /// An address-owned, object-owned or immutable object, passed by
    /// reference to its current version
    Owned(ObjectRef),
    /// A shared object, passed by id and the version it was shared at
    Shared {
        /// The object id
        object_id: ObjectId,
        /// The version at which the object became shared
        initial_shared_version: u64,
    },
}

impl ResolvedObject {
    /// The id of the object
    pub fn object_id(&self) -> ObjectId {
        match self {
            ResolvedObject::Owned(object_ref) => object_ref.object_id,
            ResolvedObject::Shared { object_id, .. } => *object_id,
        }
    }
}

/// The coins and price paying for a transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GasConfig {
    /// The coins merged into the gas coin
    pub payment: Vec<ObjectRef>,
    /// The gas price, at least the network's reference price
    pub price: u64,
    /// The most the transaction may spend on gas
    pub budget: u64,
}

// ------------
// | Encoding |
// ------------

/// Encode a transaction sent by `sender` into the bytes that are signed and
/// submitted
///
/// Every object input must appear in `objects`. The gas coins are owned by
/// the sender
pub fn encode_transaction(
    tx: &PendingTransaction,
    sender: Address,
    objects: &HashMap<ObjectId, ResolvedObject>,
    gas: &GasConfig,
) -> Result<Vec<u8>, LedgerClientError> {
    let inputs = tx
        .inputs()
        .iter()
        .map(|input| encode_input(input, objects))
        .collect::<Result<Vec<_>, _>>()?;
    let commands = tx.instructions().iter().map(encode_instruction).collect::<Result<_, _>>()?;

    let sender = *sender.as_bytes();
    let data = WireTransactionData::V1(WireTransactionDataV1 {
        kind: WireTransactionKind::ProgrammableTransaction(WireProgrammableTransaction {
            inputs,
            commands,
        }),
        sender,
        gas_data: WireGasData {
            payment: gas.payment.iter().map(ObjectRef::to_wire).collect(),
            owner: sender,
            price: gas.price,
            budget: gas.budget,
        },
        expiration: WireExpiration::None,
    });

    bcs::to_bytes(&data).map_err(LedgerClientError::encoding)
}

/// Encode a single input
fn encode_input(
    input: &Input,
    objects: &HashMap<ObjectId, ResolvedObject>,
) -> Result<WireCallArg, LedgerClientError> {
    match input {
        Input::Pure(value) => Ok(WireCallArg::Pure(encode_pure(value)?)),
        Input::Object(id) => {
            let resolved = objects
                .get(id)
                .ok_or_else(|| LedgerClientError::encoding(format!("object {id} is unresolved")))?;

            let arg = match resolved {
                ResolvedObject::Owned(object_ref) => {
                    WireObjectArg::ImmOrOwnedObject(object_ref.to_wire())
                },
                // Shared objects are always taken mutably
                ResolvedObject::Shared { object_id, initial_shared_version } => {
                    WireObjectArg::SharedObject {
                        id: *object_id.as_bytes(),
                        initial_shared_version: *initial_shared_version,
                        mutable: true,
                    }
                },
            };
            Ok(WireCallArg::Object(arg))
        },
    }
}

/// Encode a pure value as the move value it stands for
fn encode_pure(value: &PureValue) -> Result<Vec<u8>, LedgerClientError> {
    let bytes = match value {
        PureValue::U64(n) => bcs::to_bytes(n),
        PureValue::Address(address) => bcs::to_bytes(address.as_bytes()),
        PureValue::Bytes(bytes) => bcs::to_bytes(bytes),
    };

    bytes.map_err(LedgerClientError::encoding)
}

/// Encode a single instruction
fn encode_instruction(instruction: &Instruction) -> Result<WireCommand, LedgerClientError> {
    let command = match instruction {
        Instruction::SplitCoins { coin, amounts } => {
            WireCommand::SplitCoins(*coin, amounts.clone())
        },
        Instruction::MoveCall { target, type_arguments, arguments } => {
            let type_arguments = type_arguments
                .iter()
                .map(|tag| parse_type_tag(tag))
                .collect::<Result<_, _>>()?;

            WireCommand::MoveCall(WireMoveCall {
                package: *target.package.as_bytes(),
                module: target.module.clone(),
                function: target.function.clone(),
                type_arguments,
                arguments: arguments.clone(),
            })
        },
        Instruction::TransferObjects { objects, recipient } => {
            WireCommand::TransferObjects(objects.clone(), *recipient)
        },
        Instruction::Publish { modules, dependencies } => {
            let modules = modules
                .iter()
                .map(|module| b64_general_purpose::STANDARD.decode(module))
                .collect::<Result<_, _>>()
                .map_err(LedgerClientError::encoding)?;
            let dependencies = dependencies.iter().map(|id| *id.as_bytes()).collect();

            WireCommand::Publish(modules, dependencies)
        },
    };

    Ok(command)
}

// -------------
// | Type Tags |
// -------------

/// Parse a move type such as `u64`, `vector<u8>` or
/// `0x2::coin::Coin<0x2::sui::SUI>`
fn parse_type_tag(s: &str) -> Result<WireTypeTag, LedgerClientError> {
    let s = s.trim();
    let tag = match s {
        "bool" => WireTypeTag::Bool,
        "u8" => WireTypeTag::U8,
        "u16" => WireTypeTag::U16,
        "u32" => WireTypeTag::U32,
        "u64" => WireTypeTag::U64,
        "u128" => WireTypeTag::U128,
        "u256" => WireTypeTag::U256,
        "address" => WireTypeTag::Address,
        "signer" => WireTypeTag::Signer,
        _ => match s.strip_prefix("vector<").and_then(|rest| rest.strip_suffix('>')) {
            Some(inner) => WireTypeTag::Vector(Box::new(parse_type_tag(inner)?)),
            None => WireTypeTag::Struct(Box::new(parse_struct_tag(s)?)),
        },
    };

    Ok(tag)
}

/// Parse a struct type `address::module::Name<params>`
fn parse_struct_tag(s: &str) -> Result<WireStructTag, LedgerClientError> {
    let malformed = || LedgerClientError::encoding(format!("malformed type {s:?}"));

    let (path, type_params) = match s.split_once('<') {
        Some((path, rest)) => {
            let inner = rest.strip_suffix('>').ok_or_else(malformed)?;
            let params = split_type_params(inner)
                .into_iter()
                .map(parse_type_tag)
                .collect::<Result<_, _>>()?;
            (path, params)
        },
        None => (s, Vec::new()),
    };

    let parts: Vec<&str> = path.split(PATH_SEPARATOR).collect();
    let [address, module, name] = parts.as_slice() else {
        return Err(malformed());
    };
    if module.is_empty() || name.is_empty() {
        return Err(malformed());
    }
    let address: Address = address.parse().map_err(LedgerClientError::encoding)?;

    Ok(WireStructTag {
        address: *address.as_bytes(),
        module: module.to_string(),
        name: name.to_string(),
        type_params,
    })
}

/// Split a comma separated list of types at the outermost nesting level
fn split_type_params(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&s[start..idx]);
                start = idx + 1;
            },
            _ => {},
        }
    }

    parts.push(&s[start..]);
    parts
}

// --------------
// | Wire Types |
// --------------

/// An account address or object id on the wire
type WireId = [u8; IDENTIFIER_LENGTH];

/// An object reference on the wire: id, version and length-prefixed digest
type WireObjectRef = (WireId, u64, Vec<u8>);

/// The versioned transaction envelope
#[derive(Serialize)]
enum WireTransactionData {
    /// The only version in use
    V1(WireTransactionDataV1),
}

/// The contents of a version one transaction
#[derive(Serialize)]
struct WireTransactionDataV1 {
    /// What the transaction does
    kind: WireTransactionKind,
    /// The sender
    sender: WireId,
    /// The gas payment
    gas_data: WireGasData,
    /// When the transaction expires
    expiration: WireExpiration,
}

/// The kinds of transaction a user may send
#[derive(Serialize)]
enum WireTransactionKind {
    /// A programmable transaction
    ProgrammableTransaction(WireProgrammableTransaction),
}

/// The inputs and commands of a programmable transaction
#[derive(Serialize)]
struct WireProgrammableTransaction {
    /// The inputs
    inputs: Vec<WireCallArg>,
    /// The commands
    commands: Vec<WireCommand>,
}

/// A transaction input
#[derive(Serialize)]
enum WireCallArg {
    /// The serialized bytes of a pure value
    Pure(Vec<u8>),
    /// An object
    Object(WireObjectArg),
}

/// An object input
#[derive(Serialize)]
enum WireObjectArg {
    /// An owned or immutable object
    ImmOrOwnedObject(WireObjectRef),
    /// A shared object
    SharedObject {
        /// The object id
        id: WireId,
        /// The version at which the object became shared
        initial_shared_version: u64,
        /// Whether the object is accessed mutably
        mutable: bool,
    },
}

/// A command within a programmable transaction
///
/// Serialized by hand since the node's variant indices skip commands this
/// client never sends
enum WireCommand {
    /// A move call
    MoveCall(WireMoveCall),
    /// Transfer objects to an address
    TransferObjects(Vec<Argument>, Argument),
    /// Split amounts off of a coin
    SplitCoins(Argument, Vec<Argument>),
    /// Publish modules with their dependencies
    Publish(Vec<Vec<u8>>, Vec<WireId>),
}

impl Serialize for WireCommand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            WireCommand::MoveCall(call) => {
                serializer.serialize_newtype_variant(COMMAND_NAME, 0, "MoveCall", call)
            },
            WireCommand::TransferObjects(objects, recipient) => {
                let mut variant =
                    serializer.serialize_tuple_variant(COMMAND_NAME, 1, "TransferObjects", 2)?;
                variant.serialize_field(objects)?;
                variant.serialize_field(recipient)?;
                variant.end()
            },
            WireCommand::SplitCoins(coin, amounts) => {
                let mut variant =
                    serializer.serialize_tuple_variant(COMMAND_NAME, 2, "SplitCoins", 2)?;
                variant.serialize_field(coin)?;
                variant.serialize_field(amounts)?;
                variant.end()
            },
            WireCommand::Publish(modules, dependencies) => {
                let mut variant =
                    serializer.serialize_tuple_variant(COMMAND_NAME, 4, "Publish", 2)?;
                variant.serialize_field(modules)?;
                variant.serialize_field(dependencies)?;
                variant.end()
            },
        }
    }
}

/// A move call command
#[derive(Serialize)]
struct WireMoveCall {
    /// The package
    package: WireId,
    /// The module
    module: String,
    /// The function
    function: String,
    /// The type arguments
    type_arguments: Vec<WireTypeTag>,
    /// The value arguments
    arguments: Vec<Argument>,
}

/// A move type, with variants in the node's order
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
enum WireTypeTag {
    /// `bool`
    Bool,
    /// `u8`
    U8,
    /// `u64`
    U64,
    /// `u128`
    U128,
    /// `address`
    Address,
    /// `signer`
    Signer,
    /// `vector<T>`
    Vector(Box<WireTypeTag>),
    /// A struct type
    Struct(Box<WireStructTag>),
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `u256`
    U256,
}

/// A fully qualified struct type
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct WireStructTag {
    /// The defining package
    address: WireId,
    /// The module
    module: String,
    /// The struct name
    name: String,
    /// The type parameters
    type_params: Vec<WireTypeTag>,
}

/// The gas payment of a transaction
#[derive(Serialize)]
struct WireGasData {
    /// The coins paying for gas
    payment: Vec<WireObjectRef>,
    /// The owner of the coins
    owner: WireId,
    /// The gas price
    price: u64,
    /// The gas budget
    budget: u64,
}

/// The expiration of a transaction
#[derive(Serialize)]
enum WireExpiration {
    /// The transaction does not expire
    None,
}

#[cfg(test)]
mod tests {
    use crate::transaction::{MoveTarget, TransactionBuilder};

    use super::*;

    /// The gas payment used in tests
    fn test_gas() -> GasConfig {
        let coin = ObjectRef { object_id: id("0xa"), version: 7, digest: [9; DIGEST_LENGTH] };
        GasConfig { payment: vec![coin], price: 1000, budget: 5_000_000 }
    }

    /// Parse an object id
    fn id(s: &str) -> ObjectId {
        s.parse().unwrap()
    }

    /// The 32 bytes of a short-form identifier
    fn id_bytes(s: &str) -> Vec<u8> {
        id(s).as_bytes().to_vec()
    }

    /// Tests the exact bytes of a split-and-transfer transaction
    #[test]
    fn test_encode_split_and_transfer() {
        let mut builder = TransactionBuilder::new();
        let amount = builder.pure_u64(1000).unwrap();
        let coins = builder.split_coins(builder.gas(), vec![amount]).unwrap();
        let recipient = builder.pure_address("0x1".parse().unwrap()).unwrap();
        builder.transfer_objects(coins, recipient).unwrap();
        let tx = builder.finish();

        let sender: Address = "0x2".parse().unwrap();
        let bytes = encode_transaction(&tx, sender, &HashMap::new(), &test_gas()).unwrap();

        let mut expected = vec![0x00, 0x00];
        // Inputs: a u64 and an address
        expected.extend([0x02, 0x00, 0x08]);
        expected.extend(1000u64.to_le_bytes());
        expected.extend([0x00, 0x20]);
        expected.extend(id_bytes("0x1"));
        // Commands: split from gas, transfer the new coin
        expected.extend([0x02, 0x02, 0x00, 0x01, 0x01, 0x00, 0x00]);
        expected.extend([0x01, 0x01, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01, 0x00]);
        expected.extend(id_bytes("0x2"));
        // Gas data
        expected.push(0x01);
        expected.extend(id_bytes("0xa"));
        expected.extend(7u64.to_le_bytes());
        expected.push(0x20);
        expected.extend([9; DIGEST_LENGTH]);
        expected.extend(id_bytes("0x2"));
        expected.extend(1000u64.to_le_bytes());
        expected.extend(5_000_000u64.to_le_bytes());
        // No expiration
        expected.push(0x00);

        assert_eq!(bytes, expected);
    }

    /// Tests encoding owned and shared object inputs
    #[test]
    fn test_encode_object_inputs() {
        let owned = ObjectRef { object_id: id("0xacc"), version: 3, digest: [1; DIGEST_LENGTH] };
        let objects = HashMap::from([
            (id("0xacc"), ResolvedObject::Owned(owned)),
            (id("0xb"), ResolvedObject::Shared { object_id: id("0xb"), initial_shared_version: 5 }),
        ]);

        let mut builder = TransactionBuilder::new();
        builder.object(id("0xacc")).unwrap();
        builder.object(id("0xb")).unwrap();
        let tx = builder.finish();

        let sender: Address = "0x2".parse().unwrap();
        let bytes = encode_transaction(&tx, sender, &objects, &test_gas()).unwrap();

        let mut expected = vec![0x00, 0x00, 0x02];
        expected.extend([0x01, 0x00]);
        expected.extend(id_bytes("0xacc"));
        expected.extend(3u64.to_le_bytes());
        expected.push(0x20);
        expected.extend([1; DIGEST_LENGTH]);
        expected.extend([0x01, 0x01]);
        expected.extend(id_bytes("0xb"));
        expected.extend(5u64.to_le_bytes());
        expected.extend([0x01, 0x00]);
        assert_eq!(&bytes[..expected.len()], expected.as_slice());
    }

    /// Tests that an object input without a resolution is rejected
    #[test]
    fn test_unresolved_object() {
        let mut builder = TransactionBuilder::new();
        builder.object(id("0xb")).unwrap();

        let sender: Address = "0x2".parse().unwrap();
        let err = encode_transaction(&builder.finish(), sender, &HashMap::new(), &test_gas());
        assert!(matches!(err, Err(LedgerClientError::Encoding(_))));
    }

    /// Tests the layout of a move call and a publish command
    #[test]
    fn test_encode_move_call_and_publish() {
        let target = MoveTarget::new(id("0x5"), "bank", "new_account").unwrap();
        let mut builder = TransactionBuilder::new();
        builder.move_call(target, vec!["0x2::sui::SUI".to_string()], vec![]).unwrap();
        builder.publish(vec!["AQID".to_string()], vec![id("0x1")]).unwrap();
        let tx = builder.finish();

        let commands: Vec<_> = tx.instructions().iter().map(encode_instruction).collect();
        let call = bcs::to_bytes(commands[0].as_ref().unwrap()).unwrap();
        let mut expected = vec![0x00];
        expected.extend(id_bytes("0x5"));
        expected.extend([0x04, b'b', b'a', b'n', b'k']);
        expected.push(0x0b);
        expected.extend(b"new_account");
        expected.extend([0x01, 0x07]);
        expected.extend(id_bytes("0x2"));
        expected.extend([0x03, b's', b'u', b'i', 0x03, b'S', b'U', b'I', 0x00]);
        expected.push(0x00);
        assert_eq!(call, expected);

        let publish = bcs::to_bytes(commands[1].as_ref().unwrap()).unwrap();
        let mut expected = vec![0x04, 0x01, 0x03, 0x01, 0x02, 0x03, 0x01];
        expected.extend(id_bytes("0x1"));
        assert_eq!(publish, expected);
    }

    /// Tests parsing nested move types
    #[test]
    fn test_parse_type_tag() {
        let coin = WireStructTag {
            address: *id("0x2").as_bytes(),
            module: "coin".to_string(),
            name: "Coin".to_string(),
            type_params: vec![WireTypeTag::Struct(Box::new(WireStructTag {
                address: *id("0x2").as_bytes(),
                module: "sui".to_string(),
                name: "SUI".to_string(),
                type_params: vec![],
            }))],
        };
        let parsed = parse_type_tag("vector<0x2::coin::Coin<0x2::sui::SUI>>").unwrap();
        assert_eq!(parsed, WireTypeTag::Vector(Box::new(WireTypeTag::Struct(Box::new(coin)))));

        assert_eq!(split_type_params("u8, vector<u64>, 0x1::a::B<u8, u16>").len(), 3);
        assert_eq!(parse_type_tag(" u256 ").unwrap(), WireTypeTag::U256);
        assert!(parse_type_tag("0x2::coin").is_err());
        assert!(parse_type_tag("0x2::coin::Coin<u8").is_err());
    }

    /// Tests decoding the node's base58 digests
    #[test]
    fn test_object_ref_from_base58() {
        let digest = bs58::encode([7u8; DIGEST_LENGTH]).into_string();
        let object_ref = ObjectRef::from_base58(id("0xa"), 4, &digest).unwrap();
        assert_eq!(object_ref.digest, [7; DIGEST_LENGTH]);

        let short = bs58::encode([7u8; 4]).into_string();
        assert!(ObjectRef::from_base58(id("0xa"), 4, &short).is_err());
        assert!(ObjectRef::from_base58(id("0xa"), 4, "0OIl").is_err());
    }
}
