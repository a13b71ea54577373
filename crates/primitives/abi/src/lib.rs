//! JSON to ABI value codec.
//!
//! Request bodies arrive as untyped JSON (or YAML lowered to JSON); the ABI
//! schema for the targeted method is the only source of type information. This
//! crate performs the explicit type dispatch in both directions:
//!
//! - [`marshal_inputs`] converts loosely-typed JSON parameters into strictly
//!   typed [`DynSolValue`]s, range-checked against the declared solidity type.
//! - [`decode_return`] / [`decode_inputs`] interpret returned or submitted
//!   calldata through the ABI and render JSON-friendly values: integers as
//!   decimal strings, byte values as lowercase `0x`-hex, tuples as objects
//!   keyed by their raw field names.
//! - [`revert`] decodes the conventional `Error(string)` revert payload.
//!
//! The encoder and decoder are symmetric: any value accepted by the marshaller
//! encodes, decodes and renders back to an equivalent JSON value.
//!
//! [`DynSolValue`]: alloy::dyn_abi::DynSolValue

mod error;
mod input;
mod output;
pub mod revert;
mod types;

pub use error::AbiError;
pub use input::{marshal_inputs, marshal_value, parse_inline_param, InlineParam};
pub use output::{decode_inputs, decode_return, encode_call, encode_params, map_output};
pub use types::resolve_type;
