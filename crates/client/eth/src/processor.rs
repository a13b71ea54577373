use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ep_messages::{
    DeployContract, ReplyMessage, RequestHeaders, SendTransaction, TransactionReceipt,
    MSG_TYPE_DEPLOY_CONTRACT, MSG_TYPE_SEND_TRANSACTION, MSG_TYPE_TX_FAILURE, MSG_TYPE_TX_SUCCESS,
};
use serde_json::Value;
use tokio::time::Instant;

use crate::txn::is_hex_address;
use crate::{get_orion_tx_count, get_transaction_count, EthError, EthRpc, Txn, TxnSigner};

/// One accepted message being processed. The dispatcher owns the concrete
/// implementation: it correlates the eventual reply back to the request and
/// removes the in-flight entry.
#[async_trait]
pub trait TxnContext: Send + Sync {
    fn headers(&self) -> RequestHeaders;
    fn message(&self) -> Value;
    async fn reply(&self, reply: ReplyMessage);
    async fn send_error_reply(&self, status: u16, err: String, tx_hash: String);
}

/// Processes structured transaction messages against the node.
#[async_trait]
pub trait TxnProcessor: Send + Sync {
    async fn on_message(&self, ctx: Arc<dyn TxnContext>);
    /// Resolve a `from` value: hex addresses pass through, wallet references
    /// resolve to the signing address.
    async fn resolve_address(&self, from: &str) -> Result<String, EthError>;
}

/// Resolves a `from` reference to an offline signer, when one applies.
#[async_trait]
pub trait SignerResolver: Send + Sync {
    async fn signer_for(&self, from: &str) -> anyhow::Result<Option<Arc<dyn TxnSigner>>>;
}

#[derive(Clone, Debug, Default)]
pub struct TxnProcessorConf {
    /// Maximum seconds to wait for a submitted transaction to be mined.
    pub max_tx_wait_time: u64,
    /// Query the transaction count for a nonce even when the node could
    /// assign one.
    pub always_manage_nonce: bool,
    /// Use `priv_getTransactionCount` for nonces on privacy-group
    /// transactions.
    pub orion_private_apis: bool,
}

/// Direct in-process transaction processor: builds the [`Txn`], submits it,
/// polls for the receipt and replies through the message context.
pub struct DirectTxnProcessor {
    rpc: Arc<dyn EthRpc>,
    conf: TxnProcessorConf,
    signers: Option<Arc<dyn SignerResolver>>,
}

impl DirectTxnProcessor {
    pub fn new(
        rpc: Arc<dyn EthRpc>,
        mut conf: TxnProcessorConf,
        signers: Option<Arc<dyn SignerResolver>>,
    ) -> Self {
        if conf.max_tx_wait_time < 10 {
            if conf.max_tx_wait_time > 0 {
                tracing::warn!(
                    "Maximum wait time increased from {} to minimum of 10 seconds",
                    conf.max_tx_wait_time
                );
            }
            conf.max_tx_wait_time = 10;
        }
        Self { rpc, conf, signers }
    }

    #[cfg(test)]
    fn with_conf(rpc: Arc<dyn EthRpc>, conf: TxnProcessorConf) -> Self {
        Self { rpc, conf, signers: None }
    }

    async fn resolve_signer(&self, from: &str) -> Result<Option<Arc<dyn TxnSigner>>, EthError> {
        match &self.signers {
            Some(resolver) => {
                resolver.signer_for(from).await.map_err(|e| EthError::Signer(e.to_string()))
            }
            None => Ok(None),
        }
    }

    async fn assign_nonce(&self, txn: &mut Txn) -> Result<(), EthError> {
        if txn.nonce.is_some() {
            return Ok(());
        }
        if !self.conf.always_manage_nonce && txn.signer.is_none() {
            txn.node_assign_nonce = true;
            return Ok(());
        }
        let address = if txn.from.is_empty() {
            match &txn.signer {
                Some(signer) => format!("0x{}", hex::encode(signer.address())),
                None => return Err(EthError::BadFromAddress),
            }
        } else {
            txn.from.clone()
        };
        let nonce = if self.conf.orion_private_apis && !txn.privacy_group_id.is_empty() {
            get_orion_tx_count(self.rpc.as_ref(), &address, &txn.privacy_group_id).await?
        } else {
            get_transaction_count(self.rpc.as_ref(), &address, "pending").await?
        };
        txn.nonce = Some(nonce);
        Ok(())
    }

    async fn wait_for_mined(&self, txn: &mut Txn) -> Result<(), EthError> {
        let deadline = Instant::now() + Duration::from_secs(self.conf.max_tx_wait_time);
        loop {
            if txn.get_tx_receipt(self.rpc.as_ref()).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(EthError::ReceiptTimeout);
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    async fn send_and_reply(&self, ctx: Arc<dyn TxnContext>, mut txn: Txn, register_as: String) {
        if let Err(e) = self.assign_nonce(&mut txn).await {
            ctx.send_error_reply(500, e.to_string(), String::new()).await;
            return;
        }
        let hash = match txn.send(self.rpc.as_ref()).await {
            Ok(hash) => hash,
            Err(e) => {
                ctx.send_error_reply(500, e.to_string(), String::new()).await;
                return;
            }
        };
        match self.wait_for_mined(&mut txn).await {
            Ok(()) => ctx.reply(ReplyMessage::Receipt(receipt_reply(&txn, register_as))).await,
            Err(e) => ctx.send_error_reply(500, e.to_string(), hash).await,
        }
    }

    async fn process_deploy(&self, ctx: Arc<dyn TxnContext>, msg: DeployContract) {
        let signer = match self.resolve_signer(&msg.tx.from).await {
            Ok(signer) => signer,
            Err(e) => {
                ctx.send_error_reply(500, e.to_string(), String::new()).await;
                return;
            }
        };
        match Txn::deploy_contract(&msg, signer) {
            Ok(txn) => self.send_and_reply(ctx, txn, msg.register_as.clone()).await,
            Err(e) => ctx.send_error_reply(400, e.to_string(), String::new()).await,
        }
    }

    async fn process_send(&self, ctx: Arc<dyn TxnContext>, msg: SendTransaction) {
        let signer = match self.resolve_signer(&msg.tx.from).await {
            Ok(signer) => signer,
            Err(e) => {
                ctx.send_error_reply(500, e.to_string(), String::new()).await;
                return;
            }
        };
        match Txn::send_transaction(&msg, signer) {
            Ok(txn) => self.send_and_reply(ctx, txn, String::new()).await,
            Err(e) => ctx.send_error_reply(400, e.to_string(), String::new()).await,
        }
    }
}

#[async_trait]
impl TxnProcessor for DirectTxnProcessor {
    async fn on_message(&self, ctx: Arc<dyn TxnContext>) {
        let headers = ctx.headers();
        match headers.common.msg_type.as_str() {
            MSG_TYPE_DEPLOY_CONTRACT => match serde_json::from_value(ctx.message()) {
                Ok(msg) => self.process_deploy(ctx, msg).await,
                Err(e) => ctx.send_error_reply(400, e.to_string(), String::new()).await,
            },
            MSG_TYPE_SEND_TRANSACTION => match serde_json::from_value(ctx.message()) {
                Ok(msg) => self.process_send(ctx, msg).await,
                Err(e) => ctx.send_error_reply(400, e.to_string(), String::new()).await,
            },
            other => {
                ctx.send_error_reply(400, format!("Unknown message type '{other}'"), String::new()).await
            }
        }
    }

    async fn resolve_address(&self, from: &str) -> Result<String, EthError> {
        if from.is_empty() {
            return Ok(String::new());
        }
        if let Some(signer) = self.resolve_signer(from).await? {
            return Ok(format!("0x{}", hex::encode(signer.address())));
        }
        if is_hex_address(from) {
            Ok(from.to_owned())
        } else {
            Err(EthError::BadFromAddress)
        }
    }
}

/// Render the node receipt as a reply message, with hex quantities and their
/// decimal twins.
fn receipt_reply(txn: &Txn, register_as: String) -> TransactionReceipt {
    let r = &txn.receipt;
    let success = r.status.map_or(true, |s| !s.is_zero());
    let mut reply = TransactionReceipt {
        block_hash: r.block_hash,
        block_number_hex: r.block_number,
        block_number_str: r.block_number.map(|v| v.to_string()),
        contract_address: r.contract_address,
        cumulative_gas_used_hex: r.cumulative_gas_used,
        cumulative_gas_used_str: r.cumulative_gas_used.map(|v| v.to_string()),
        from: r.from,
        gas_used_hex: r.gas_used,
        gas_used_str: r.gas_used.map(|v| v.to_string()),
        status_hex: r.status,
        status: r.status.map(|v| v.to_string()),
        to: r.to,
        transaction_hash: r.transaction_hash,
        transaction_index: r.transaction_index,
        register_as,
        ..Default::default()
    };
    reply.headers.common.msg_type =
        if success { MSG_TYPE_TX_SUCCESS.to_owned() } else { MSG_TYPE_TX_FAILURE.to_owned() };
    reply
}
