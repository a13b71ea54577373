use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use ec_eth::{TxnContext, TxnProcessor};
use ep_messages::{new_message_id, AsyncSentMsg, ErrorReply, ReplyMessage, RequestHeaders};
use hyper::StatusCode;
use serde_json::Value;

use crate::GatewayError;

/// Accepts messages for asynchronous processing; a 202 acknowledgement is
/// returned once the message is admitted.
#[async_trait]
pub trait AsyncDispatcher: Send + Sync {
    async fn dispatch_msg_async(
        &self,
        msg: Value,
        ack: bool,
        immediate_receipt: bool,
    ) -> Result<AsyncSentMsg, GatewayError>;
}

/// Downstream sink for serialized replies (the receipt store in the full
/// deployment).
pub trait ReceiptProcessor: Send + Sync {
    fn process_reply(&self, msg: &[u8]);
}

/// Discards replies; used when no receipt store is attached.
#[derive(Default)]
pub struct NullReceiptStore;

impl ReceiptProcessor for NullReceiptStore {
    fn process_reply(&self, _msg: &[u8]) {}
}

struct InflightEntry {
    time_received: DateTime<Utc>,
}

/// In-process dispatcher with bounded admission.
///
/// Admission is deliberately non-queueing: when `max_in_flight` messages are
/// awaiting replies the next dispatch is rejected with 429 immediately, and
/// callers use that as a retry signal.
pub struct DirectDispatcher {
    max_in_flight: usize,
    processor: Arc<dyn TxnProcessor>,
    receipts: Arc<dyn ReceiptProcessor>,
    in_flight: Arc<Mutex<HashMap<String, InflightEntry>>>,
}

impl DirectDispatcher {
    pub fn new(
        max_in_flight: usize,
        processor: Arc<dyn TxnProcessor>,
        receipts: Arc<dyn ReceiptProcessor>,
    ) -> Self {
        let max_in_flight = if max_in_flight == 0 { 10 } else { max_in_flight };
        Self { max_in_flight, processor, receipts, in_flight: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Observable only while the admission lock is held; exposed for tests
    /// and metrics.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().expect("in-flight lock poisoned").len()
    }
}

#[async_trait]
impl AsyncDispatcher for DirectDispatcher {
    async fn dispatch_msg_async(
        &self,
        msg: Value,
        ack: bool,
        immediate_receipt: bool,
    ) -> Result<AsyncSentMsg, GatewayError> {
        let headers: RequestHeaders = serde_json::from_value(msg["headers"].clone()).map_err(|e| {
            tracing::error!("Unable to unmarshal headers from map payload: {e}");
            GatewayError::bad_request("Invalid headers in message")
        })?;
        let msg_id = headers.common.id.clone();

        let entry = InflightEntry { time_received: Utc::now() };
        {
            let mut in_flight = self.in_flight.lock().expect("in-flight lock poisoned");
            if in_flight.len() >= self.max_in_flight {
                tracing::error!(
                    "Failed to dispatch message: {}/{} already in-flight",
                    in_flight.len(),
                    self.max_in_flight
                );
                return Err(GatewayError::new(
                    StatusCode::TOO_MANY_REQUESTS,
                    "Too many messages currently in flight",
                ));
            }
            in_flight.insert(msg_id.clone(), entry);
        }
        tracing::debug!("Dispatching message {msg_id} (ack={ack} immediateReceipt={immediate_receipt})");

        let ctx = Arc::new(MsgContext {
            msg_id: msg_id.clone(),
            headers,
            msg,
            time_received: Utc::now(),
            in_flight: self.in_flight.clone(),
            receipts: self.receipts.clone(),
        });
        let processor = self.processor.clone();
        tokio::spawn(async move {
            processor.on_message(ctx).await;
        });

        Ok(AsyncSentMsg { sent: true, id: msg_id, msg: String::new() })
    }
}

/// One in-flight message. The reply path stamps correlation headers, hands
/// the serialized reply to the receipt processor, and clears the in-flight
/// entry under the admission lock.
struct MsgContext {
    msg_id: String,
    headers: RequestHeaders,
    msg: Value,
    time_received: DateTime<Utc>,
    in_flight: Arc<Mutex<HashMap<String, InflightEntry>>>,
    receipts: Arc<dyn ReceiptProcessor>,
}

#[async_trait]
impl TxnContext for MsgContext {
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

        match serde_json::to_vec(&reply) {
            Ok(bytes) => self.receipts.process_reply(&bytes),
            Err(e) => tracing::error!("Failed to serialize reply for {}: {e}", self.msg_id),
        }
        self.in_flight.lock().expect("in-flight lock poisoned").remove(&self.msg_id);
    }

    async fn send_error_reply(&self, status: u16, err: String, tx_hash: String) {
        tracing::warn!("Failed to process message {} [{status}]: {err}", self.msg_id);
        let orig = serde_json::to_vec(&self.msg).unwrap_or_default();
        let mut reply = ErrorReply::new(&err, &orig);
        reply.tx_hash = tx_hash;
        self.reply(ReplyMessage::Error(reply)).await;
    }
}
