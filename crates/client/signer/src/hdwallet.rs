use std::sync::{Arc, OnceLock};

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use ec_eth::{SignerResolver, TxnSigner};
use regex::Regex;

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("HDWallet signing failed: {0}")]
    SigningFailed(String),
    #[error("Unexpected response from HDWallet")]
    BadResponse,
}

/// JSON property names on the wallet service's response.
#[derive(Clone, Debug)]
pub struct HdWalletPropNames {
    pub address: String,
    pub private_key: String,
}

impl Default for HdWalletPropNames {
    fn default() -> Self {
        Self { address: "address".into(), private_key: "privateKey".into() }
    }
}

#[derive(Clone, Debug, Default)]
pub struct HdWalletConf {
    /// Endpoint template with `{{.InstanceID}}`, `{{.WalletID}}` and
    /// `{{.Index}}` placeholders.
    pub url_template: String,
    /// Chain ID signed into every transaction (EIP-155).
    pub chain_id: u64,
    pub prop_names: HdWalletPropNames,
}

/// A parsed `hd-<instance>-<wallet>-<index>` reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HdWalletRef {
    pub instance_id: String,
    pub wallet_id: String,
    pub index: String,
}

fn hd_wallet_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^hd-([^-]+)-([^-]+)-(\d+)$").expect("static pattern"))
}

/// Recognize an HD-wallet `from` reference.
pub fn is_hd_wallet_request(from: &str) -> Option<HdWalletRef> {
    hd_wallet_pattern().captures(from).map(|c| HdWalletRef {
        instance_id: c[1].to_owned(),
        wallet_id: c[2].to_owned(),
        index: c[3].to_owned(),
    })
}

/// Client for the HD-wallet key lookup service.
pub struct HdWallet {
    conf: HdWalletConf,
    client: reqwest::Client,
}

impl HdWallet {
    pub fn new(conf: HdWalletConf) -> Self {
        Self { conf, client: reqwest::Client::new() }
    }

    pub fn conf(&self) -> &HdWalletConf {
        &self.conf
    }

    fn lookup_url(&self, r: &HdWalletRef) -> String {
        self.conf
            .url_template
            .replace("{{.InstanceID}}", &r.instance_id)
            .replace("{{.WalletID}}", &r.wallet_id)
            .replace("{{.Index}}", &r.index)
    }

    /// Fetch the keypair for a wallet reference and wrap it as a signer.
    pub async fn signer(&self, r: &HdWalletRef) -> Result<HdWalletSigner, SignerError> {
        let url = self.lookup_url(r);
        tracing::debug!("HDWallet lookup for wallet {} index {}", r.wallet_id, r.index);
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SignerError::SigningFailed(e.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            return Err(SignerError::SigningFailed(format!("status {status}")));
        }
        let body: serde_json::Value =
            res.json().await.map_err(|e| SignerError::SigningFailed(e.to_string()))?;

        let address = body
            .get(&self.conf.prop_names.address)
            .and_then(|v| v.as_str())
            .ok_or(SignerError::BadResponse)?;
        let address_bytes = hex::decode(address.trim_start_matches("0x"))
            .ok()
            .filter(|b| b.len() == 20)
            .ok_or(SignerError::BadResponse)?;

        let key = body
            .get(&self.conf.prop_names.private_key)
            .and_then(|v| v.as_str())
            .ok_or(SignerError::BadResponse)?;
        let key_bytes = hex::decode(key.trim_start_matches("0x"))
            .ok()
            .filter(|b| !b.is_empty())
            .ok_or(SignerError::BadResponse)?;
        let signer = PrivateKeySigner::from_slice(&key_bytes).map_err(|_| SignerError::BadResponse)?;

        Ok(HdWalletSigner {
            address: Address::from_slice(&address_bytes),
            signer,
            chain_id: self.conf.chain_id,
        })
    }
}

#[async_trait]
impl SignerResolver for HdWallet {
    async fn signer_for(&self, from: &str) -> anyhow::Result<Option<Arc<dyn TxnSigner>>> {
        match is_hd_wallet_request(from) {
            Some(r) => {
                let signer = self.signer(&r).await?;
                Ok(Some(Arc::new(signer)))
            }
            None => Ok(None),
        }
    }
}

/// Signs legacy transactions with a key resolved from the HD-wallet service.
#[derive(Debug)]
pub struct HdWalletSigner {
    address: Address,
    signer: PrivateKeySigner,
    chain_id: u64,
}

impl TxnSigner for HdWalletSigner {
    fn signer_type(&self) -> String {
        "HD Wallet".into()
    }

    fn address(&self) -> Address {
        self.address
    }

    fn sign(&self, tx: &TxLegacy) -> anyhow::Result<Vec<u8>> {
        let mut tx = tx.clone();
        tx.chain_id = Some(self.chain_id);
        let signature = self.signer.sign_transaction_sync(&mut tx)?;
        let envelope = TxEnvelope::Legacy(tx.into_signed(signature));
        Ok(envelope.encoded_2718())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::consensus::Transaction;
    use alloy::eips::eip2718::Decodable2718;
    use alloy::primitives::{Bytes, TxKind, U256};
    use httpmock::MockServer;
    use serde_json::json;

    fn wallet_ref() -> HdWalletRef {
        is_hd_wallet_request("hd-testinst-testwallet-1234").unwrap()
    }

    #[test]
    fn prop_names_default() {
        let hd = HdWallet::new(HdWalletConf::default());
        assert_eq!(hd.conf().prop_names.address, "address");
        assert_eq!(hd.conf().prop_names.private_key, "privateKey");
    }

    #[test]
    fn recognizes_wallet_references() {
        let r = wallet_ref();
        assert_eq!(r.instance_id, "testinst");
        assert_eq!(r.wallet_id, "testwallet");
        assert_eq!(r.index, "1234");

        assert!(is_hd_wallet_request("0xAA983AD2a0e0eD8ac639277F37be42F2A5d2618c").is_none());
        assert!(is_hd_wallet_request("hd-too-many-dashes-1234").is_none());
        assert!(is_hd_wallet_request("hd-a-b-notanumber").is_none());
    }

    #[tokio::test]
    async fn signs_an_eip155_transaction_recoverable_to_the_wallet_address() {
        let key = PrivateKeySigner::random();
        let addr = key.address();

        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/testinst/api/v1/testwallet/1234");
            then.status(200).json_body(json!({
                "addr": format!("{addr}"),
                "key": hex::encode(key.to_bytes()),
            }));
        });

        let hd = HdWallet::new(HdWalletConf {
            url_template: format!("{}/{{{{.InstanceID}}}}/api/v1/{{{{.WalletID}}}}/{{{{.Index}}}}", server.base_url()),
            chain_id: 12345,
            prop_names: HdWalletPropNames { address: "addr".into(), private_key: "key".into() },
        });

        let signer = hd.signer(&wallet_ref()).await.unwrap();
        assert_eq!(signer.signer_type(), "HD Wallet");
        assert_eq!(signer.address(), addr);

        let tx = TxLegacy {
            chain_id: None,
            nonce: 12345,
            gas_price: 0,
            gas_limit: 90_000,
            to: TxKind::Create,
            value: U256::ZERO,
            input: Bytes::from_static(b"hello world"),
        };
        let raw = signer.sign(&tx).unwrap();

        let envelope = TxEnvelope::decode_2718(&mut raw.as_slice()).unwrap();
        assert_eq!(envelope.chain_id(), Some(12345));
        let TxEnvelope::Legacy(signed) = envelope else { panic!("expected a legacy transaction") };
        assert_eq!(signed.recover_signer().unwrap(), addr);
    }

    #[tokio::test]
    async fn server_failure_is_a_signing_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET");
            then.status(500);
        });
        let hd = HdWallet::new(HdWalletConf {
            url_template: server.base_url(),
            chain_id: 12345,
            ..Default::default()
        });
        let err = hd.signer(&wallet_ref()).await.unwrap_err();
        assert!(err.to_string().starts_with("HDWallet signing failed"), "{err}");
    }

    #[tokio::test]
    async fn unexpected_response_shapes_are_rejected() {
        for body in [json!({}), json!({"address": 12345}), json!({"address": "0x", "privateKey": 12345}), json!({"address": "0x", "privateKey": "0x"})] {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method("GET");
                then.status(200).json_body(body.clone());
            });
            let hd = HdWallet::new(HdWalletConf {
                url_template: server.base_url(),
                chain_id: 12345,
                ..Default::default()
            });
            let err = hd.signer(&wallet_ref()).await.unwrap_err();
            assert_eq!(err.to_string(), "Unexpected response from HDWallet", "body: {body}");
        }
    }

    #[tokio::test]
    async fn resolver_ignores_plain_addresses() {
        let hd = HdWallet::new(HdWalletConf::default());
        let resolved =
            hd.signer_for("0xAA983AD2a0e0eD8ac639277F37be42F2A5d2618c").await.unwrap();
        assert!(resolved.is_none());
    }
}
