//! REST to JSON-RPC gateway server.
//!
//! The HTTP surface maps paths onto contracts and ABI elements:
//!
//! - `/contracts/:address/:method` and `/abis/:abi[/:address/:method]` are
//!   resolved against the local file-backed contract store;
//! - `/instances/:lookup/:method` (`/i/...`) and `/gateways/:lookup/...`
//!   (`/g/...`) are resolved through the remote contract registry.
//!
//! A resolved request becomes a structured message. Reads go straight to the
//! node as `eth_call`; writes become [`DeployContract`] or
//! [`SendTransaction`] messages handed either to the synchronous dispatcher
//! (the handler parks on a [`SyncResponder`] until the processor replies) or
//! to the asynchronous [`DirectDispatcher`], which enforces the in-flight
//! admission cap and acknowledges with HTTP 202.
//!
//! [`DeployContract`]: ep_messages::DeployContract
//! [`SendTransaction`]: ep_messages::SendTransaction

mod dispatcher;
mod error;
mod handler;
mod helpers;
mod params;
mod resolver;
mod responder;
mod router;
pub mod service;
mod subscription;
#[cfg(test)]
mod tests;

pub use dispatcher::{AsyncDispatcher, DirectDispatcher, NullReceiptStore, ReceiptProcessor};
pub use error::GatewayError;
pub use handler::{GatewayConf, RestGateway};
pub use params::ParamReader;
pub use responder::{SyncDispatcher, SyncReply, SyncResponder};
pub use subscription::SubscriptionManager;
