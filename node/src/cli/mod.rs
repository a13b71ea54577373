mod registry;
mod signer;

use std::path::PathBuf;

use clap::Parser;
use url::Url;

pub use registry::RegistryParams;
pub use signer::HdWalletParams;

/// REST to Ethereum JSON-RPC gateway.
#[derive(Clone, Debug, Parser)]
#[clap(name = "ethgate", version)]
pub struct RunCmd {
    /// JSON-RPC endpoint of the Ethereum node this gateway fronts.
    #[clap(env = "ETHGATE_RPC_URL", long, value_name = "RPC URL")]
    pub rpc_url: Url,

    /// Port for the REST gateway endpoint.
    #[clap(env = "ETHGATE_PORT", long, default_value = "8080")]
    pub port: u16,

    /// Listen on all interfaces rather than localhost only.
    #[clap(env = "ETHGATE_EXTERNAL", long)]
    pub external: bool,

    /// Directory for the local contract store (`abi_*.deploy.json` and
    /// `contract_*.instance.json` files).
    #[clap(env = "ETHGATE_STORAGE_PATH", long, default_value = "./ethgate-data")]
    pub storage_path: PathBuf,

    /// External base URL rendered into stored instance API paths.
    #[clap(env = "ETHGATE_BASE_URL", long, default_value = "")]
    pub base_url: String,

    /// Capacity of the decoded-ABI LRU cache (0 selects the default of 25).
    #[clap(env = "ETHGATE_ABI_CACHE_SIZE", long, default_value = "0")]
    pub abi_cache_size: usize,

    /// Maximum asynchronous messages in flight before requests are rejected
    /// with 429 (0 selects the default of 10). There is no queueing: 429 is
    /// the retry signal.
    #[clap(env = "ETHGATE_MAX_IN_FLIGHT", long, default_value = "0")]
    pub max_in_flight: usize,

    /// Maximum seconds to wait for a transaction receipt on the synchronous
    /// path. Values below 10 are raised to 10.
    #[clap(env = "ETHGATE_MAX_TX_WAIT_TIME", long, default_value = "60")]
    pub max_tx_wait_time: u64,

    /// Always fetch the nonce from the node's transaction count rather than
    /// letting the node assign one at submission.
    #[clap(env = "ETHGATE_ALWAYS_MANAGE_NONCE", long)]
    pub always_manage_nonce: bool,

    /// Use the Orion `priv_getTransactionCount` variant for nonces on
    /// privacy-group transactions.
    #[clap(env = "ETHGATE_ORION_PRIVATE_APIS", long)]
    pub orion_private_apis: bool,

    #[clap(flatten)]
    pub registry: RegistryParams,

    #[clap(flatten)]
    pub hdwallet: HdWalletParams,
}
