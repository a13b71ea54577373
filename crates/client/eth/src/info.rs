use alloy::primitives::{Address, Bytes, B256, U256};
use ep_messages::TransactionInfo;
use serde::Deserialize;
use serde_json::json;

use crate::{EthError, EthRpc};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTransaction {
    #[serde(default)]
    block_hash: Option<B256>,
    #[serde(default)]
    block_number: Option<U256>,
    #[serde(default)]
    from: Option<Address>,
    #[serde(default)]
    to: Option<Address>,
    #[serde(default)]
    gas: Option<U256>,
    #[serde(default)]
    gas_price: Option<U256>,
    #[serde(default)]
    hash: Option<B256>,
    #[serde(default)]
    input: Option<Bytes>,
    #[serde(default)]
    nonce: Option<U256>,
    #[serde(default)]
    transaction_index: Option<U256>,
    #[serde(default)]
    value: Option<U256>,
}

/// Look up a transaction by hash and render it with both hex quantities and
/// decimal string twins. The calldata is left for the caller to decode
/// against a method ABI.
pub async fn get_transaction_info(rpc: &dyn EthRpc, tx_hash: &str) -> Result<TransactionInfo, EthError> {
    let result = rpc.call("eth_getTransactionByHash", vec![json!(tx_hash)]).await?;
    if result.is_null() {
        return Err(EthError::TxNotFound(tx_hash.to_owned()));
    }
    let tx: RpcTransaction =
        serde_json::from_value(result).map_err(|e| EthError::BadReturnData(e.to_string()))?;

    Ok(TransactionInfo {
        block_hash: tx.block_hash,
        block_number: tx.block_number.map(|v| v.to_string()),
        block_number_hex: tx.block_number,
        from: tx.from,
        to: tx.to,
        gas: tx.gas.map(|v| v.to_string()),
        gas_hex: tx.gas,
        gas_price: tx.gas_price.map(|v| v.to_string()),
        gas_price_hex: tx.gas_price,
        hash: tx.hash,
        nonce: tx.nonce.map(|v| v.to_string()),
        nonce_hex: tx.nonce,
        transaction_index: tx.transaction_index.map(|v| v.to_string()),
        transaction_index_hex: tx.transaction_index,
        value: tx.value.map(|v| v.to_string()),
        value_hex: tx.value,
        input: tx.input,
        input_args: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_rpc::TestRpc;

    #[tokio::test]
    async fn missing_transaction_is_an_error() {
        let rpc = TestRpc::new();
        let err = get_transaction_info(&rpc, "0x12345").await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to query transaction: 0x12345");
    }

    #[tokio::test]
    async fn rpc_errors_propagate() {
        let rpc = TestRpc::with_results(vec![Err("pop")]);
        let err = get_transaction_info(&rpc, "0x12345").await.unwrap_err();
        assert_eq!(err.to_string(), "pop");
    }

    #[tokio::test]
    async fn renders_decimal_twins() {
        let rpc = TestRpc::with_results(vec![Ok(json!({
            "input": "0x01",
            "blockNumber": "0xa",
            "gas": "0x1c8",
            "value": "0x0",
        }))]);
        let info = get_transaction_info(&rpc, "0x12345").await.unwrap();
        assert_eq!(info.input.unwrap().to_vec(), vec![1]);
        assert_eq!(info.block_number.as_deref(), Some("10"));
        assert_eq!(info.gas.as_deref(), Some("456"));
        assert_eq!(info.value.as_deref(), Some("0"));
    }
}
