//! Message model shared between the REST layer, the transaction processor and
//! downstream receipt consumers.
//!
//! Every request that flows through the gateway is normalized into one of two
//! structured messages: [`DeployContract`] for constructor deployment and
//! [`SendTransaction`] for method invocation. Replies flow back as a
//! [`TransactionReceipt`] or an [`ErrorReply`], both stamped with
//! [`ReplyHeaders`] correlating them to the originating request.
//!
//! Numeric fields on the wire (`gas`, `gasPrice`, `nonce`, `value`) accept
//! either JSON numbers or decimal strings; see [`Quantity`].

mod headers;
mod quantity;
mod reply;
mod transaction;

pub use headers::{
    new_message_id, CommonHeaders, ReplyHeaders, RequestHeaders, MSG_TYPE_DEPLOY_CONTRACT, MSG_TYPE_ERROR,
    MSG_TYPE_SEND_TRANSACTION, MSG_TYPE_TX_FAILURE, MSG_TYPE_TX_SUCCESS,
};
pub use quantity::Quantity;
pub use reply::{AsyncSentMsg, ErrorReply, ReplyMessage, TransactionInfo, TransactionReceipt};
pub use transaction::{DeployContract, SendTransaction, TransactionCommon};
