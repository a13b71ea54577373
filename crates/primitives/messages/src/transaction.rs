use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Quantity, RequestHeaders};

fn abi_is_empty(abi: &JsonAbi) -> bool {
    abi.len() == 0
}

fn bytes_is_empty(bytes: &Bytes) -> bool {
    bytes.is_empty()
}

/// Fields common to deployment and invocation requests.
///
/// `private_for` and `privacy_group_id` are the two mutually exclusive
/// permissioned-transaction addressing schemes; the REST layer rejects
/// requests that set both before a message is ever built.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransactionCommon {
    #[serde(default)]
    pub headers: RequestHeaders,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub from: String,
    #[serde(default, skip_serializing_if = "Quantity::is_empty")]
    pub nonce: Quantity,
    #[serde(default, skip_serializing_if = "Quantity::is_empty")]
    pub value: Quantity,
    #[serde(default, skip_serializing_if = "Quantity::is_empty")]
    pub gas: Quantity,
    #[serde(rename = "gasPrice", default, skip_serializing_if = "Quantity::is_empty")]
    pub gas_price: Quantity,
    #[serde(rename = "privateFrom", default, skip_serializing_if = "String::is_empty")]
    pub private_from: String,
    #[serde(rename = "privateFor", default, skip_serializing_if = "Vec::is_empty")]
    pub private_for: Vec<String>,
    #[serde(rename = "privacyGroupId", default, skip_serializing_if = "String::is_empty")]
    pub privacy_group_id: String,
}

/// Constructor-deployment request.
///
/// Either `compiled` + `abi` are populated (precompiled path, including
/// everything served from a contract registry), or `solidity` carries source
/// to hand to the external compiler.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DeployContract {
    #[serde(flatten)]
    pub tx: TransactionCommon,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub solidity: String,
    #[serde(rename = "compilerVersion", default, skip_serializing_if = "String::is_empty")]
    pub compiler_version: String,
    #[serde(rename = "evmVersion", default, skip_serializing_if = "String::is_empty")]
    pub evm_version: String,
    #[serde(rename = "contractName", default, skip_serializing_if = "String::is_empty")]
    pub contract_name: String,
    #[serde(default, skip_serializing_if = "abi_is_empty")]
    pub abi: JsonAbi,
    #[serde(rename = "devDocs", default, skip_serializing_if = "String::is_empty")]
    pub dev_doc: String,
    #[serde(default, skip_serializing_if = "bytes_is_empty")]
    pub compiled: Bytes,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(rename = "registerAs", default, skip_serializing_if = "String::is_empty")]
    pub register_as: String,
    #[serde(rename = "params", default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Value>,
}

/// Method-invocation request.
///
/// `method` carries the full ABI element when the caller resolved one; the
/// inline alternative is `method_name` plus `{type, value}` parameter objects,
/// from which the ABI element is reconstructed at build time.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SendTransaction {
    #[serde(flatten)]
    pub tx: TransactionCommon,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<Function>,
    #[serde(rename = "methodName", default, skip_serializing_if = "String::is_empty")]
    pub method_name: String,
    #[serde(rename = "params", default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Value>,
}
