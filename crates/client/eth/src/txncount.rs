use serde_json::json;

use crate::txn::parse_quantity_u64;
use crate::{EthError, EthRpc};

/// Next nonce for an address at a block tag.
pub async fn get_transaction_count(
    rpc: &dyn EthRpc,
    address: &str,
    block_tag: &str,
) -> Result<u64, EthError> {
    let result = rpc
        .call("eth_getTransactionCount", vec![json!(address), json!(block_tag)])
        .await
        .map_err(EthError::TxCountFailed)?;
    parse_quantity_u64(&result)
}

/// Next nonce for an address within a privacy group.
pub async fn get_orion_tx_count(
    rpc: &dyn EthRpc,
    address: &str,
    privacy_group_id: &str,
) -> Result<u64, EthError> {
    let result = rpc
        .call("priv_getTransactionCount", vec![json!(address), json!(privacy_group_id)])
        .await
        .map_err(|err| EthError::OrionTxCountFailed { group: privacy_group_id.to_owned(), err })?;
    parse_quantity_u64(&result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_rpc::TestRpc;

    const ADDR: &str = "0xD50ce736021D9F7B0B2566a3D2FA7FA3136C003C";
    const GROUP: &str = "negmDcN2P4ODpqn/6WkJ02zT/0w0bjhGpkZ8UP6vARk=";

    #[tokio::test]
    async fn public_count() {
        let rpc = TestRpc::with_results(vec![Ok(serde_json::json!("0x7b"))]);
        let nonce = get_transaction_count(&rpc, ADDR, "latest").await.unwrap();
        assert_eq!(nonce, 123);
        assert_eq!(rpc.captured(0).0, "eth_getTransactionCount");
    }

    #[tokio::test]
    async fn public_count_error() {
        let rpc = TestRpc::with_results(vec![Err("pop")]);
        let err = get_transaction_count(&rpc, ADDR, "latest").await.unwrap_err();
        assert_eq!(err.to_string(), "eth_getTransactionCount returned: pop");
    }

    #[tokio::test]
    async fn orion_count() {
        let rpc = TestRpc::new();
        get_orion_tx_count(&rpc, ADDR, GROUP).await.unwrap();
        assert_eq!(rpc.captured(0).0, "priv_getTransactionCount");
    }

    #[tokio::test]
    async fn orion_count_error() {
        let rpc = TestRpc::with_results(vec![Err("pop")]);
        let err = get_orion_tx_count(&rpc, ADDR, GROUP).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("priv_getTransactionCount for privacy group '{GROUP}' returned: pop")
        );
    }
}
