use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MSG_TYPE_DEPLOY_CONTRACT: &str = "DeployContract";
pub const MSG_TYPE_SEND_TRANSACTION: &str = "SendTransaction";
pub const MSG_TYPE_TX_SUCCESS: &str = "TransactionSuccess";
pub const MSG_TYPE_TX_FAILURE: &str = "TransactionFailure";
pub const MSG_TYPE_ERROR: &str = "Error";

/// Allocate a fresh message ID.
pub fn new_message_id() -> String {
    Uuid::new_v4().to_string()
}

/// Headers carried by every message, request or reply.
///
/// The `context` map is passed through opaquely: whatever the submitter puts
/// there comes back on the reply.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CommonHeaders {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub msg_type: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub context: serde_json::Map<String, serde_json::Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestHeaders {
    #[serde(flatten)]
    pub common: CommonHeaders,
    /// Reference back to the ABI a deployment was built from, so the reply
    /// path can register the resulting instance against it.
    #[serde(rename = "abiID", default, skip_serializing_if = "String::is_empty")]
    pub abi_id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplyHeaders {
    #[serde(flatten)]
    pub common: CommonHeaders,
    #[serde(rename = "requestId", default, skip_serializing_if = "String::is_empty")]
    pub req_id: String,
    /// ABI the originating deployment was built from, carried through so the
    /// reply path can register the deployed instance against it.
    #[serde(rename = "requestABIID", default, skip_serializing_if = "String::is_empty")]
    pub req_abi_id: String,
    #[serde(rename = "timeReceived", default, skip_serializing_if = "String::is_empty")]
    pub received: String,
    #[serde(rename = "timeElapsed", default)]
    pub elapsed: f64,
}
