//! Transaction construction and JSON-RPC submission.
//!
//! [`Txn`] is the builder output for both deployment and invocation requests:
//! it owns the calldata, the numeric fields parsed out of the message, and an
//! optional offline [`TxnSigner`]. [`Txn::send`] chooses between
//! `eth_sendTransaction`, `eea_sendTransaction` and (when a signer is
//! configured) `eth_sendRawTransaction`, estimating gas first when none was
//! supplied.
//!
//! The node connection itself is abstracted behind [`EthRpc`]; [`HttpRpc`] is
//! the plain JSON-RPC 2.0 implementation over HTTP.

mod call;
mod compiler;
mod error;
mod info;
mod processor;
mod receipt;
mod rpc;
#[cfg(test)]
pub(crate) mod test_rpc;
mod txn;
mod txncount;

pub use call::{call_method, normalize_block_tag};
pub use compiler::{compile_contract, CompiledSolidity};
pub use error::EthError;
pub use info::get_transaction_info;
pub use processor::{
    DirectTxnProcessor, SignerResolver, TxnContext, TxnProcessor, TxnProcessorConf,
};
pub use receipt::TxnReceipt;
pub use rpc::{EthRpc, HttpRpc, RpcError};
pub use txn::{is_hex_address, Txn, TxnSigner};
pub use txncount::{get_orion_tx_count, get_transaction_count};
