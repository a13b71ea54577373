use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ReplyHeaders, MSG_TYPE_ERROR, MSG_TYPE_TX_SUCCESS};

/// Receipt reply produced once a transaction has been submitted (and, on the
/// synchronous path, mined). Hex twins carry the raw JSON-RPC quantities,
/// decimal twins are rendered for REST consumers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub headers: ReplyHeaders,
    #[serde(rename = "blockHash", default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<B256>,
    #[serde(rename = "blockNumber", default, skip_serializing_if = "Option::is_none")]
    pub block_number_str: Option<String>,
    #[serde(rename = "blockNumberHex", default, skip_serializing_if = "Option::is_none")]
    pub block_number_hex: Option<U256>,
    #[serde(rename = "contractAddress", default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<Address>,
    #[serde(rename = "cumulativeGasUsed", default, skip_serializing_if = "Option::is_none")]
    pub cumulative_gas_used_str: Option<String>,
    #[serde(rename = "cumulativeGasUsedHex", default, skip_serializing_if = "Option::is_none")]
    pub cumulative_gas_used_hex: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    #[serde(rename = "gasUsed", default, skip_serializing_if = "Option::is_none")]
    pub gas_used_str: Option<String>,
    #[serde(rename = "gasUsedHex", default, skip_serializing_if = "Option::is_none")]
    pub gas_used_hex: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "statusHex", default, skip_serializing_if = "Option::is_none")]
    pub status_hex: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(rename = "transactionHash", default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<B256>,
    #[serde(rename = "transactionIndex", default, skip_serializing_if = "Option::is_none")]
    pub transaction_index: Option<U256>,
    #[serde(rename = "registerAs", default, skip_serializing_if = "String::is_empty")]
    pub register_as: String,
}

impl TransactionReceipt {
    pub fn is_success(&self) -> bool {
        self.headers.common.msg_type == MSG_TYPE_TX_SUCCESS
    }
}

/// Error reply correlated back to the request that failed, carrying the
/// original payload for diagnosis.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ErrorReply {
    pub headers: ReplyHeaders,
    #[serde(rename = "errorMessage", default, skip_serializing_if = "String::is_empty")]
    pub error_message: String,
    #[serde(rename = "requestPayload", default, skip_serializing_if = "String::is_empty")]
    pub orig_msg: String,
    #[serde(rename = "txHash", default, skip_serializing_if = "String::is_empty")]
    pub tx_hash: String,
}

impl ErrorReply {
    pub fn new(err: impl std::fmt::Display, orig_msg: &[u8]) -> Self {
        let mut reply = Self {
            error_message: err.to_string(),
            orig_msg: String::from_utf8_lossy(orig_msg).into_owned(),
            ..Default::default()
        };
        reply.headers.common.msg_type = MSG_TYPE_ERROR.to_owned();
        reply
    }
}

/// Either kind of reply a processor can produce.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum ReplyMessage {
    Receipt(TransactionReceipt),
    Error(ErrorReply),
}

impl ReplyMessage {
    pub fn headers(&self) -> &ReplyHeaders {
        match self {
            ReplyMessage::Receipt(r) => &r.headers,
            ReplyMessage::Error(e) => &e.headers,
        }
    }

    pub fn headers_mut(&mut self) -> &mut ReplyHeaders {
        match self {
            ReplyMessage::Receipt(r) => &mut r.headers,
            ReplyMessage::Error(e) => &mut e.headers,
        }
    }

    pub fn as_receipt(&self) -> Option<&TransactionReceipt> {
        match self {
            ReplyMessage::Receipt(r) => Some(r),
            ReplyMessage::Error(_) => None,
        }
    }
}

/// Acknowledgement body for asynchronously accepted messages (HTTP 202).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AsyncSentMsg {
    pub sent: bool,
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub msg: String,
}

/// Result of a transaction lookup, with the calldata decoded back through the
/// method ABI into `input_args`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransactionInfo {
    #[serde(rename = "blockHash", default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<B256>,
    #[serde(rename = "blockNumberHex", default, skip_serializing_if = "Option::is_none")]
    pub block_number_hex: Option<U256>,
    #[serde(rename = "blockNumber", default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(rename = "gasHex", default, skip_serializing_if = "Option::is_none")]
    pub gas_hex: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
    #[serde(rename = "gasPriceHex", default, skip_serializing_if = "Option::is_none")]
    pub gas_price_hex: Option<U256>,
    #[serde(rename = "gasPrice", default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<B256>,
    #[serde(rename = "nonceHex", default, skip_serializing_if = "Option::is_none")]
    pub nonce_hex: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(rename = "transactionIndexHex", default, skip_serializing_if = "Option::is_none")]
    pub transaction_index_hex: Option<U256>,
    #[serde(rename = "transactionIndex", default, skip_serializing_if = "Option::is_none")]
    pub transaction_index: Option<String>,
    #[serde(rename = "valueHex", default, skip_serializing_if = "Option::is_none")]
    pub value_hex: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Bytes>,
    #[serde(rename = "inputArgs", default, skip_serializing_if = "Option::is_none")]
    pub input_args: Option<serde_json::Map<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MSG_TYPE_TX_FAILURE;

    #[test]
    fn receipt_success_follows_msg_type() {
        let mut receipt = TransactionReceipt::default();
        receipt.headers.common.msg_type = MSG_TYPE_TX_SUCCESS.to_owned();
        assert!(receipt.is_success());
        receipt.headers.common.msg_type = MSG_TYPE_TX_FAILURE.to_owned();
        assert!(!receipt.is_success());
    }

    #[test]
    fn error_reply_wraps_original_payload() {
        let reply = ErrorReply::new("pop", br#"{"headers":{}}"#);
        assert_eq!(reply.error_message, "pop");
        assert_eq!(reply.headers.common.msg_type, MSG_TYPE_ERROR);
        assert!(reply.orig_msg.contains("headers"));
    }

    #[test]
    fn reply_message_serializes_untagged() {
        let reply = ReplyMessage::Error(ErrorReply::new("pop", b"{}"));
        let v = serde_json::to_value(&reply).unwrap();
        assert_eq!(v["errorMessage"], "pop");
        assert!(v.get("blockHash").is_none());
    }
}
