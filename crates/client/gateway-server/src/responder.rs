use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use ec_eth::{TxnContext, TxnProcessor};
use ep_messages::{new_message_id, ReplyMessage, RequestHeaders, TransactionReceipt};
use serde_json::Value;

/// The reply a synchronous request eventually receives.
#[derive(Clone, Debug)]
pub enum SyncReply {
    Receipt(TransactionReceipt),
    Error(String),
    ReceiptAndError { receipt: TransactionReceipt, error: String },
}

/// Request-scoped rendezvous between the HTTP handler and the out-of-band
/// reply: the handler parks on [`SyncResponder::wait`] until one of the reply
/// entry points fires.
#[derive(Default)]
pub struct SyncResponder {
    reply: Mutex<Option<SyncReply>>,
    notify: tokio::sync::Notify,
}

impl SyncResponder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply_with_receipt(&self, receipt: TransactionReceipt) {
        self.finish(SyncReply::Receipt(receipt));
    }

    pub fn reply_with_error(&self, error: impl ToString) {
        self.finish(SyncReply::Error(error.to_string()));
    }

    pub fn reply_with_receipt_and_error(&self, receipt: TransactionReceipt, error: impl ToString) {
        self.finish(SyncReply::ReceiptAndError { receipt, error: error.to_string() });
    }

    fn finish(&self, reply: SyncReply) {
        *self.reply.lock().expect("responder lock poisoned") = Some(reply);
        self.notify.notify_waiters();
    }

    pub async fn wait(&self) -> SyncReply {
        loop {
            let notified = self.notify.notified();
            if let Some(reply) = self.reply.lock().expect("responder lock poisoned").clone() {
                return reply;
            }
            notified.await;
        }
    }
}

/// Runs the processor against a request-scoped context that resolves the
/// [`SyncResponder`] instead of a receipt store.
pub struct SyncDispatcher {
    processor: Arc<dyn TxnProcessor>,
}

impl SyncDispatcher {
    pub fn new(processor: Arc<dyn TxnProcessor>) -> Self {
        Self { processor }
    }

    pub async fn dispatch_sync(&self, msg: Value, responder: Arc<SyncResponder>) {
        let headers: RequestHeaders =
            serde_json::from_value(msg["headers"].clone()).unwrap_or_default();
        let ctx = Arc::new(SyncTxnContext {
            headers,
            msg,
            time_received: Utc::now(),
            responder,
        });
        self.processor.on_message(ctx).await;
    }
}

struct SyncTxnContext {
    headers: RequestHeaders,
    msg: Value,
    time_received: DateTime<Utc>,
    responder: Arc<SyncResponder>,
}

#[async_trait]
impl TxnContext for SyncTxnContext {
    fn headers(&self) -> RequestHeaders {
        self.headers.clone()
    }

    fn message(&self) -> Value {
        self.msg.clone()
    }

    async fn reply(&self, mut reply: ReplyMessage) {
        let now = Utc::now();
        let headers = reply.headers_mut();
        headers.common.id = new_message_id();
        headers.common.context = self.headers.common.context.clone();
        headers.req_id = self.headers.common.id.clone();
        headers.req_abi_id = self.headers.abi_id.clone();
        headers.received = self.time_received.to_rfc3339_opts(SecondsFormat::Nanos, true);
        headers.elapsed = (now - self.time_received).num_milliseconds() as f64 / 1000.0;

        match reply {
            ReplyMessage::Receipt(receipt) => self.responder.reply_with_receipt(receipt),
            ReplyMessage::Error(err) => self.responder.reply_with_error(err.error_message),
        }
    }

    async fn send_error_reply(&self, status: u16, err: String, _tx_hash: String) {
        tracing::warn!("Failed to process message [{status}]: {err}");
        self.responder.reply_with_error(err);
    }
}
