//! HD-wallet signer client.
//!
//! A `from` value of the shape `hd-<instance>-<wallet>-<index>` is not an
//! address: it names a keypair held by an external HD-wallet service. This
//! crate resolves such references over HTTP and signs legacy transactions
//! with EIP-155 replay protection using the returned key.

mod hdwallet;

pub use hdwallet::{
    is_hd_wallet_request, HdWallet, HdWalletConf, HdWalletPropNames, HdWalletRef, HdWalletSigner,
    SignerError,
};
