//! `ethgate`, a REST to Ethereum JSON-RPC gateway.
//!
//! Wires the contract store, remote registry client, transaction processor
//! and dispatchers together, then serves the REST surface until interrupted.

mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use ec_eth::{DirectTxnProcessor, HttpRpc, SignerResolver, TxnProcessor, TxnProcessorConf};
use ec_gateway_server::{
    service::start_server, DirectDispatcher, GatewayConf, NullReceiptStore, ParamReader, RestGateway,
};
use ec_registry::{
    ContractStore, ContractStoreConf, FilesystemStore, HttpRegistry, KvStore, MemKvStore,
    RemoteRegistry,
};
use ec_signer::HdWallet;
use tracing_subscriber::EnvFilter;

use cli::RunCmd;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let run_cmd = RunCmd::parse();
    run(run_cmd).await
}

async fn run(cmd: RunCmd) -> anyhow::Result<()> {
    std::fs::create_dir_all(&cmd.storage_path)
        .with_context(|| format!("Creating storage path {}", cmd.storage_path.display()))?;

    let cache: Option<Arc<dyn KvStore>> =
        if cmd.registry.registry_cache { Some(Arc::new(MemKvStore::new())) } else { None };
    let rr = Arc::new(HttpRegistry::new(cmd.registry.as_conf(), cache));
    rr.init().context("Initializing remote registry")?;

    let store = Arc::new(FilesystemStore::new(
        ContractStoreConf {
            storage_path: cmd.storage_path.clone(),
            base_url: cmd.base_url.clone(),
            abi_cache_size: cmd.abi_cache_size,
        },
        rr.clone(),
    ));
    store.init().context("Initializing contract store")?;

    let rpc = Arc::new(HttpRpc::new(cmd.rpc_url.clone()));

    let signers: Option<Arc<dyn SignerResolver>> = if cmd.hdwallet.hdwallet_url_template.is_empty() {
        None
    } else {
        Some(Arc::new(HdWallet::new(cmd.hdwallet.as_conf())))
    };

    let processor: Arc<dyn TxnProcessor> = Arc::new(DirectTxnProcessor::new(
        rpc.clone(),
        TxnProcessorConf {
            max_tx_wait_time: cmd.max_tx_wait_time,
            always_manage_nonce: cmd.always_manage_nonce,
            orion_private_apis: cmd.orion_private_apis,
        },
        signers,
    ));

    let dispatcher = Arc::new(DirectDispatcher::new(
        cmd.max_in_flight,
        processor.clone(),
        Arc::new(NullReceiptStore),
    ));

    let conf = GatewayConf { max_in_flight: cmd.max_in_flight, params: ParamReader::default() };
    let gateway = Arc::new(RestGateway::new(
        &conf,
        store.clone(),
        rr.clone(),
        rpc,
        processor,
        dispatcher,
        None,
    ));

    tokio::select! {
        result = start_server(gateway, cmd.external, cmd.port) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
            store.close();
            Ok(())
        }
    }
}
