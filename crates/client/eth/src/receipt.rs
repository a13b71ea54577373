use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::txn::Txn;
use crate::{EthError, EthRpc};

/// Raw JSON-RPC transaction receipt. All quantities stay in their hex form;
/// rendering for REST consumers happens in the reply builder.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxnReceipt {
    #[serde(default)]
    pub block_hash: Option<B256>,
    #[serde(default)]
    pub block_number: Option<U256>,
    #[serde(default)]
    pub contract_address: Option<Address>,
    #[serde(default)]
    pub cumulative_gas_used: Option<U256>,
    #[serde(default)]
    pub from: Option<Address>,
    #[serde(default)]
    pub gas_used: Option<U256>,
    #[serde(default)]
    pub status: Option<U256>,
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(default)]
    pub transaction_hash: Option<B256>,
    #[serde(default)]
    pub transaction_index: Option<U256>,
}

impl TxnReceipt {
    /// A receipt is mined once it carries a non-zero block number.
    pub fn is_mined(&self) -> bool {
        self.block_number.is_some_and(|bn| !bn.is_zero())
    }
}

impl Txn {
    /// Fetch the receipt for this transaction's hash. For private
    /// transactions, once the public receipt is mined the private variant is
    /// overlaid on top, since the privacy manager holds the contract address and
    /// status for those.
    pub async fn get_tx_receipt(&mut self, rpc: &dyn EthRpc) -> Result<bool, EthError> {
        let result = rpc
            .call("eth_getTransactionReceipt", vec![json!(self.hash)])
            .await
            .map_err(EthError::ReceiptFailed)?;
        if !result.is_null() {
            self.receipt =
                serde_json::from_value(result).map_err(|e| EthError::BadReturnData(e.to_string()))?;
        }
        let mined = self.receipt.is_mined();

        if mined && !self.privacy_group_id.is_empty() && !self.private_from.is_empty() {
            let result = rpc
                .call("priv_getTransactionReceipt", vec![json!(self.hash), json!(self.privacy_group_id)])
                .await
                .map_err(EthError::PrivReceiptFailed)?;
            if !result.is_null() {
                let private: TxnReceipt =
                    serde_json::from_value(result).map_err(|e| EthError::BadReturnData(e.to_string()))?;
                if private.contract_address.is_some() {
                    self.receipt.contract_address = private.contract_address;
                }
                if private.status.is_some() {
                    self.receipt.status = private.status;
                }
                if private.gas_used.is_some() {
                    self.receipt.gas_used = private.gas_used;
                }
            }
        }
        Ok(mined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_rpc::TestRpc;

    #[tokio::test]
    async fn mined_receipt_reports_true() {
        let mut tx = Txn { hash: "0x12345".into(), ..Default::default() };
        let rpc = TestRpc::with_results(vec![Ok(json!({"blockNumber": "0xa", "status": "0x1"}))]);
        let mined = tx.get_tx_receipt(&rpc).await.unwrap();
        assert!(mined);
        assert_eq!(rpc.captured(0).0, "eth_getTransactionReceipt");
        assert_eq!(tx.receipt.block_number, Some(U256::from(10u64)));
    }

    #[tokio::test]
    async fn zero_block_number_is_not_mined() {
        let mut tx = Txn::default();
        let rpc = TestRpc::with_results(vec![Ok(json!({"blockNumber": "0x0"}))]);
        assert!(!tx.get_tx_receipt(&rpc).await.unwrap());
    }

    #[tokio::test]
    async fn receipt_error_is_wrapped() {
        let mut tx = Txn::default();
        let rpc = TestRpc::with_results(vec![Err("pop")]);
        let err = tx.get_tx_receipt(&rpc).await.unwrap_err();
        assert_eq!(err.to_string(), "eth_getTransactionReceipt returned: pop");
    }

    #[tokio::test]
    async fn private_receipt_is_overlaid_once_mined() {
        let mut tx = Txn {
            privacy_group_id: "test".into(),
            private_from: "foo".into(),
            ..Default::default()
        };
        let rpc = TestRpc::with_results(vec![
            Ok(json!({"blockNumber": "0xa"})),
            Ok(json!({"contractAddress": "0x2b8c0ecc76d0759a8f50b2e14a6881367d805832", "status": "0x1"})),
        ]);
        let mined = tx.get_tx_receipt(&rpc).await.unwrap();
        assert!(mined);
        assert_eq!(rpc.captured(1).0, "priv_getTransactionReceipt");
        assert!(tx.receipt.contract_address.is_some());
    }

    #[tokio::test]
    async fn private_receipt_failure_is_wrapped() {
        let mut tx = Txn {
            privacy_group_id: "test".into(),
            private_from: "foo".into(),
            ..Default::default()
        };
        let rpc = TestRpc::with_results(vec![Ok(json!({"blockNumber": "0xa"})), Err("pop")]);
        let err = tx.get_tx_receipt(&rpc).await.unwrap_err();
        assert_eq!(err.to_string(), "priv_getTransactionReceipt returned: pop");
    }
}
