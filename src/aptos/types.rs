use std::fmt;
use std::str::FromStr;

use serde::ser::{SerializeStructVariant, Serializer};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::error::{ClientError, ClientResult};

pub const APTOS_COIN_TYPE: &str = "0x1::aptos_coin::AptosCoin";
pub const APT_DECIMALS: u32 = 8;
pub const USDC_DECIMALS: u32 = 6;

const RAW_TRANSACTION_SALT: &[u8] = b"APTOS::RawTransaction";
const ED25519_SCHEME: u8 = 0;

pub fn coin_store_type(coin_type: &str) -> String {
    format!("0x1::coin::CoinStore<{}>", coin_type)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AccountAddress([u8; 32]);

impl AccountAddress {
    pub const ONE: AccountAddress = {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        AccountAddress(bytes)
    };

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Single-signer ed25519 account address: sha3-256(public_key || scheme).
    pub fn from_ed25519_public_key(public_key: &[u8; 32]) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(public_key);
        hasher.update([ED25519_SCHEME]);
        Self(hasher.finalize().into())
    }
}

impl FromStr for AccountAddress {
    type Err = ClientError;

    fn from_str(s: &str) -> ClientResult<Self> {
        let hex_clean = s.trim().trim_start_matches("0x");
        if hex_clean.is_empty() || hex_clean.len() > 64 {
            return Err(ClientError::InvalidAddress(s.to_string()));
        }

        // Short addresses ("0x1") are left-padded
        let hex_padded = format!("{:0>64}", hex_clean);
        let bytes = hex::decode(hex_padded).map_err(|_| ClientError::InvalidAddress(s.to_string()))?;

        let mut addr = [0u8; 32];
        addr.copy_from_slice(&bytes);
        Ok(Self(addr))
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TypeTag {
    Bool,
    U8,
    U64,
    U128,
    Address,
    Signer,
    Vector(Box<TypeTag>),
    Struct(Box<StructTag>),
    U16,
    U32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructTag {
    pub address: AccountAddress,
    pub module: String,
    pub name: String,
    pub type_args: Vec<TypeTag>,
}

impl FromStr for TypeTag {
    type Err = ClientError;

    fn from_str(s: &str) -> ClientResult<Self> {
        let s = s.trim();
        let tag = match s {
            "bool" => TypeTag::Bool,
            "u8" => TypeTag::U8,
            "u16" => TypeTag::U16,
            "u32" => TypeTag::U32,
            "u64" => TypeTag::U64,
            "u128" => TypeTag::U128,
            "address" => TypeTag::Address,
            "signer" => TypeTag::Signer,
            _ => {
                if let Some(inner) = s.strip_prefix("vector<").and_then(|r| r.strip_suffix('>')) {
                    TypeTag::Vector(Box::new(inner.parse()?))
                } else {
                    TypeTag::Struct(Box::new(s.parse()?))
                }
            }
        };
        Ok(tag)
    }
}

impl FromStr for StructTag {
    type Err = ClientError;

    fn from_str(s: &str) -> ClientResult<Self> {
        let invalid = || ClientError::InvalidTypeTag(s.to_string());

        let (head, generics) = match s.find('<') {
            Some(open) => {
                let inner = s[open + 1..].strip_suffix('>').ok_or_else(invalid)?;
                (&s[..open], Some(inner))
            }
            None => (s, None),
        };

        let mut parts = head.split("::");
        let (address, module, name) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(m), Some(n), None) if !m.is_empty() && !n.is_empty() => (a, m, n),
            _ => return Err(invalid()),
        };

        let type_args = match generics {
            Some(inner) => split_top_level(inner)
                .into_iter()
                .map(str::parse)
                .collect::<ClientResult<Vec<TypeTag>>>()?,
            None => Vec::new(),
        };

        Ok(StructTag {
            address: address.parse()?,
            module: module.to_string(),
            name: name.to_string(),
            type_args,
        })
    }
}

fn split_top_level(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in s.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = s[start..].trim();
    if !last.is_empty() {
        out.push(last);
    }
    out
}

/// Argument of an entry function call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveValue {
    Bool(bool),
    U64(u64),
    U128(u128),
    Address(AccountAddress),
}

impl MoveValue {
    fn to_bcs(&self) -> ClientResult<Vec<u8>> {
        let bytes = match self {
            MoveValue::Bool(v) => bcs::to_bytes(v)?,
            MoveValue::U64(v) => bcs::to_bytes(v)?,
            MoveValue::U128(v) => bcs::to_bytes(v)?,
            MoveValue::Address(v) => bcs::to_bytes(v)?,
        };
        Ok(bytes)
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            MoveValue::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MoveValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<AccountAddress> {
        match self {
            MoveValue::Address(v) => Some(*v),
            _ => None,
        }
    }
}

// JSON view follows the node's convention: integers as strings.
impl Serialize for MoveValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MoveValue::Bool(v) => serializer.serialize_bool(*v),
            MoveValue::U64(v) => serializer.serialize_str(&v.to_string()),
            MoveValue::U128(v) => serializer.serialize_str(&v.to_string()),
            MoveValue::Address(v) => serializer.serialize_str(&v.to_string()),
        }
    }
}

/// Wallet-facing description of an entry function call, the shape a venue
/// hands to a wallet for signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryFunctionPayload {
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<MoveValue>,
}

impl EntryFunctionPayload {
    pub fn module_and_function(&self) -> Option<(&str, &str)> {
        let mut parts = self.function.rsplitn(3, "::");
        let function = parts.next()?;
        let module = parts.next()?;
        Some((module, function))
    }

    pub fn to_entry_function(&self) -> ClientResult<EntryFunction> {
        let invalid = || ClientError::InvalidTypeTag(self.function.clone());
        let mut parts = self.function.split("::");
        let (address, module, function) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(m), Some(f), None) => (a, m, f),
            _ => return Err(invalid()),
        };

        Ok(EntryFunction {
            module: ModuleId {
                address: address.parse()?,
                name: module.to_string(),
            },
            function: function.to_string(),
            ty_args: self
                .type_arguments
                .iter()
                .map(|t| t.parse())
                .collect::<ClientResult<Vec<TypeTag>>>()?,
            args: self
                .arguments
                .iter()
                .map(MoveValue::to_bcs)
                .collect::<ClientResult<Vec<Vec<u8>>>>()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleId {
    pub address: AccountAddress,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryFunction {
    pub module: ModuleId,
    pub function: String,
    pub ty_args: Vec<TypeTag>,
    pub args: Vec<Vec<u8>>,
}

/// Only the entry function variant is ever produced here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionPayload(pub EntryFunction);

impl Serialize for TransactionPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_newtype_variant("TransactionPayload", 2, "EntryFunction", &self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawTransaction {
    pub sender: AccountAddress,
    pub sequence_number: u64,
    pub payload: TransactionPayload,
    pub max_gas_amount: u64,
    pub gas_unit_price: u64,
    pub expiration_timestamp_secs: u64,
    pub chain_id: u8,
}

impl RawTransaction {
    /// Bytes an ed25519 key signs: sha3-256 of the domain salt followed by
    /// the BCS encoding of the transaction.
    pub fn signing_message(&self) -> ClientResult<Vec<u8>> {
        let prefix = Sha3_256::digest(RAW_TRANSACTION_SALT);
        let mut message = prefix.to_vec();
        message.extend(bcs::to_bytes(self)?);
        Ok(message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ed25519Authenticator {
    pub public_key: [u8; 32],
    pub signature: [u8; 64],
}

impl Serialize for Ed25519Authenticator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut variant =
            serializer.serialize_struct_variant("TransactionAuthenticator", 0, "Ed25519", 2)?;
        variant.serialize_field("public_key", serde_bytes::Bytes::new(&self.public_key))?;
        variant.serialize_field("signature", serde_bytes::Bytes::new(&self.signature))?;
        variant.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedTransaction {
    pub raw_txn: RawTransaction,
    pub authenticator: Ed25519Authenticator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountData {
    pub sequence_number: String,
    pub authentication_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerInfo {
    pub chain_id: u8,
    pub ledger_version: String,
    pub ledger_timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub hash: String,
}

/// Committed transaction as reported by `/transactions/by_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutcome {
    pub hash: String,
    pub success: bool,
    pub vm_status: String,
    pub version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_addresses_are_left_padded() {
        let addr: AccountAddress = "0x1".parse().unwrap();
        assert_eq!(addr, AccountAddress::ONE);
        assert_eq!(
            addr.to_string(),
            "0x0000000000000000000000000000000000000000000000000000000000000001"
        );
    }

    #[test]
    fn rejects_bad_addresses() {
        assert!("0x".parse::<AccountAddress>().is_err());
        assert!("0xzz".parse::<AccountAddress>().is_err());
        assert!(format!("0x{}", "a".repeat(65)).parse::<AccountAddress>().is_err());
    }

    #[test]
    fn parses_nested_struct_tags() {
        let tag: TypeTag = "0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>".parse().unwrap();
        match tag {
            TypeTag::Struct(s) => {
                assert_eq!(s.address, AccountAddress::ONE);
                assert_eq!(s.module, "coin");
                assert_eq!(s.name, "CoinStore");
                assert_eq!(s.type_args.len(), 1);
            }
            other => panic!("unexpected tag {:?}", other),
        }

        let pair: TypeTag = "0x1::pair::Pair<0x1::a::A, vector<u8>>".parse().unwrap();
        match pair {
            TypeTag::Struct(s) => {
                assert_eq!(s.type_args[1], TypeTag::Vector(Box::new(TypeTag::U8)));
            }
            other => panic!("unexpected tag {:?}", other),
        }

        assert!("0x1::coin".parse::<TypeTag>().is_err());
    }

    #[test]
    fn entry_function_payload_encodes_arguments() {
        let payload = EntryFunctionPayload {
            function: "0x1::aptos_account::transfer".to_string(),
            type_arguments: vec![],
            arguments: vec![MoveValue::Address(AccountAddress::ONE), MoveValue::U64(1000)],
        };
        let entry = payload.to_entry_function().unwrap();
        assert_eq!(entry.module.name, "aptos_account");
        assert_eq!(entry.function, "transfer");
        assert_eq!(entry.args[0].len(), 32);
        assert_eq!(entry.args[1], 1000u64.to_le_bytes().to_vec());
        assert_eq!(payload.module_and_function(), Some(("aptos_account", "transfer")));
    }

    #[test]
    fn payload_variant_index_prefixes_bcs() {
        let entry = EntryFunctionPayload {
            function: "0x1::aptos_account::transfer".to_string(),
            type_arguments: vec![],
            arguments: vec![],
        }
        .to_entry_function()
        .unwrap();
        let bytes = bcs::to_bytes(&TransactionPayload(entry)).unwrap();
        assert_eq!(bytes[0], 2);
        assert_eq!(&bytes[1..33], AccountAddress::ONE.as_bytes());
    }

    #[test]
    fn authenticator_is_length_prefixed() {
        let auth = Ed25519Authenticator {
            public_key: [7u8; 32],
            signature: [9u8; 64],
        };
        let bytes = bcs::to_bytes(&auth).unwrap();
        assert_eq!(bytes[0], 0); // variant
        assert_eq!(bytes[1], 32);
        assert_eq!(bytes[34], 64);
        assert_eq!(bytes.len(), 1 + 1 + 32 + 1 + 64);
    }

    #[test]
    fn move_values_serialize_as_node_json() {
        let json = serde_json::to_value(vec![
            MoveValue::U64(5_000_000),
            MoveValue::Bool(true),
            MoveValue::Address(AccountAddress::ONE),
        ])
        .unwrap();
        assert_eq!(json[0], "5000000");
        assert_eq!(json[1], true);
        assert!(json[2].as_str().unwrap().starts_with("0x000"));
    }
}
