use ec_signer::{HdWalletConf, HdWalletPropNames};

/// HD-wallet signing service. When the URL template is empty, `from` values
/// of the shape `hd-<instance>-<wallet>-<index>` are rejected as invalid
/// addresses.
#[derive(Clone, Debug, clap::Args)]
pub struct HdWalletParams {
    /// Key lookup endpoint, with `{{.InstanceID}}`, `{{.WalletID}}` and
    /// `{{.Index}}` placeholders.
    #[clap(env = "ETHGATE_HDWALLET_URL_TEMPLATE", long, default_value = "")]
    pub hdwallet_url_template: String,

    /// Chain ID for EIP-155 signing of offline-signed transactions.
    #[clap(env = "ETHGATE_HDWALLET_CHAIN_ID", long, default_value = "0")]
    pub hdwallet_chain_id: u64,

    /// JSON property names on the wallet service's response.
    #[clap(long, default_value = "address")]
    pub hdwallet_prop_address: String,
    #[clap(long, default_value = "privateKey")]
    pub hdwallet_prop_private_key: String,
}

impl HdWalletParams {
    pub fn as_conf(&self) -> HdWalletConf {
        HdWalletConf {
            url_template: self.hdwallet_url_template.clone(),
            chain_id: self.hdwallet_chain_id,
            prop_names: HdWalletPropNames {
                address: self.hdwallet_prop_address.clone(),
                private_key: self.hdwallet_prop_private_key.clone(),
            },
        }
    }
}
