//! Domain types shared between the ledger client and its callers

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as DeError};

use crate::error::TransactionError;

// -------------
// | Constants |
// -------------

/// The number of bytes in an address or object identifier
pub const IDENTIFIER_LENGTH: usize = 32;

/// The hex prefix used when rendering identifiers
const HEX_PREFIX: &str = "0x";

// ---------------
// | Identifiers |
// ---------------

/// Implements parsing, display and string-based serde for a 32-byte
/// hex-rendered identifier type
macro_rules! hex_identifier {
    ($name:ident, $label:literal) => {
        impl $name {
            /// Construct the identifier from raw bytes
            pub const fn new(bytes: [u8; IDENTIFIER_LENGTH]) -> Self {
                Self(bytes)
            }

            /// The raw bytes of the identifier
            pub fn as_bytes(&self) -> &[u8; IDENTIFIER_LENGTH] {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = TransactionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_hex_identifier(s)
                    .map(Self)
                    .map_err(|e| TransactionError::MalformedReference(format!("{} {s:?}: {e}", $label)))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{HEX_PREFIX}{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({self})", stringify!($name))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(D::Error::custom)
            }
        }
    };
}

/// The identity of a ledger account
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; IDENTIFIER_LENGTH]);
hex_identifier!(Address, "address");

/// The identifier of an on-ledger object
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; IDENTIFIER_LENGTH]);
hex_identifier!(ObjectId, "object id");

/// Parse a hex identifier, left-padding short forms such as `0x2`
fn parse_hex_identifier(s: &str) -> Result<[u8; IDENTIFIER_LENGTH], String> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix(HEX_PREFIX)
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() {
        return Err("empty identifier".to_string());
    }
    if digits.len() > IDENTIFIER_LENGTH * 2 {
        return Err(format!("expected at most {} hex digits", IDENTIFIER_LENGTH * 2));
    }

    let padded = format!("{digits:0>width$}", width = IDENTIFIER_LENGTH * 2);
    let mut bytes = [0u8; IDENTIFIER_LENGTH];
    hex::decode_to_slice(padded, &mut bytes).map_err(|e| e.to_string())?;
    Ok(bytes)
}

// -----------------
// | Owned Objects |
// -----------------

/// One object owned by an address, as reported by the node
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedObject {
    /// The object's identifier
    pub object_id: ObjectId,
    /// The object's fully qualified type, if the node reported one
    pub type_tag: Option<String>,
}

impl OwnedObject {
    /// Construct an owned object record
    pub fn new(object_id: ObjectId, type_tag: impl Into<String>) -> Self {
        Self { object_id, type_tag: Some(type_tag.into()) }
    }

    /// Whether the object's type is exactly the given tag
    pub fn has_type(&self, type_tag: &str) -> bool {
        self.type_tag.as_deref() == Some(type_tag)
    }
}

/// A single page of an address's owned objects
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedObjectsPage {
    /// The objects on this page, in node order
    pub data: Vec<OwnedObject>,
    /// The opaque cursor from which to request the next page
    pub next_cursor: Option<String>,
    /// Whether the node reports further pages
    pub has_next_page: bool,
}

// ---------------------
// | Execution Results |
// ---------------------

/// The execution status of a submitted transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Every instruction in the transaction was applied
    Success,
    /// The transaction was rejected and none of its instructions applied
    Failure {
        /// The failure reason reported by the ledger
        error: String,
    },
}

/// A change to an object caused by an executed transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ObjectChange {
    /// A new object was created
    #[serde(rename_all = "camelCase")]
    Created {
        /// The created object's id
        object_id: ObjectId,
        /// The created object's type
        object_type: String,
    },
    /// An existing object was mutated
    #[serde(rename_all = "camelCase")]
    Mutated {
        /// The mutated object's id
        object_id: ObjectId,
        /// The mutated object's type
        object_type: String,
    },
    /// An existing object was transferred
    #[serde(rename_all = "camelCase")]
    Transferred {
        /// The transferred object's id
        object_id: ObjectId,
        /// The transferred object's type
        object_type: String,
    },
    /// A package was published
    #[serde(rename_all = "camelCase")]
    Published {
        /// The id of the new package
        package_id: ObjectId,
        /// The modules contained in the package
        #[serde(default)]
        modules: Vec<String>,
    },
    /// Any change kind that callers do not inspect (deletions, wrapping)
    #[serde(other)]
    Other,
}

/// The result of submitting a transaction to the ledger
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    /// The transaction digest
    pub digest: String,
    /// Whether the transaction executed
    pub status: ExecutionStatus,
    /// The object changes caused by the transaction
    pub object_changes: Vec<ObjectChange>,
}

impl SubmissionOutcome {
    /// Whether the transaction executed successfully
    pub fn is_success(&self) -> bool {
        matches!(self.status, ExecutionStatus::Success)
    }

    /// The ids of the objects of exactly the given type created by the
    /// transaction
    pub fn created_objects_of_type<'a>(
        &'a self,
        object_type: &'a str,
    ) -> impl Iterator<Item = ObjectId> + 'a {
        self.object_changes.iter().filter_map(move |change| match change {
            ObjectChange::Created { object_id, object_type: ty } if ty == object_type => {
                Some(*object_id)
            },
            _ => None,
        })
    }

    /// The id of the package published by the transaction, if any
    pub fn published_package(&self) -> Option<ObjectId> {
        self.object_changes.iter().find_map(|change| match change {
            ObjectChange::Published { package_id, .. } => Some(*package_id),
            _ => None,
        })
    }
}

/// The aggregate balance of one coin type held by an address
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// The coin type
    pub coin_type: String,
    /// The number of coin objects making up the balance
    pub coin_object_count: u64,
    /// The total balance, in the coin's smallest unit
    pub total_balance: u128,
}
