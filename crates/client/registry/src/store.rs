use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use ep_messages::DeployContract;

use crate::{
    ABIInfo, ABILocation, ABIType, ContractInfo, DeployContractWithAddress, RegistryError, RemoteRegistry,
};

pub const DEFAULT_ABI_CACHE_SIZE: usize = 25;

#[derive(Clone, Debug, Default)]
pub struct ContractStoreConf {
    /// Directory holding the `abi_*.deploy.json` and
    /// `contract_*.instance.json` files.
    pub storage_path: PathBuf,
    /// External base URL used when rendering instance API paths.
    pub base_url: String,
    /// Decoded-ABI LRU capacity; zero selects the default of 25.
    pub abi_cache_size: usize,
}

/// Resolution interface the REST layer works against.
#[async_trait]
pub trait ContractStore: Send + Sync {
    fn init(&self) -> Result<(), RegistryError>;
    async fn get_abi(
        &self,
        location: &ABILocation,
        refresh: bool,
    ) -> Result<Option<DeployContractWithAddress>, RegistryError>;
    fn get_contract_by_address(&self, address: &str) -> Result<ContractInfo, RegistryError>;
    fn resolve_contract_address(&self, name: &str) -> Result<String, RegistryError>;
    async fn check_name_available(&self, name: &str, is_remote: bool) -> Result<(), RegistryError>;
    fn add_contract(&self, address: &str, abi_id: &str, registered_as: &str)
        -> Result<ContractInfo, RegistryError>;
    fn add_abi(&self, id: &str, contract: &DeployContract) -> Result<ABIInfo, RegistryError>;
    fn list_contracts(&self) -> Vec<ContractInfo>;
    fn list_abis(&self) -> Vec<ABIInfo>;
    fn close(&self);
}

struct CacheEntry {
    last_used: u64,
    msg: Arc<DeployContractWithAddress>,
}

/// Decoded-ABI cache with strict least-recently-used eviction. Capacity is
/// small (default 25) so eviction scans linearly rather than keeping a
/// separate ordering structure.
struct AbiCache {
    capacity: usize,
    tick: u64,
    entries: HashMap<(ABIType, String), CacheEntry>,
}

impl AbiCache {
    fn new(capacity: usize) -> Self {
        Self { capacity, tick: 0, entries: HashMap::new() }
    }

    fn get(&mut self, key: &(ABIType, String)) -> Option<Arc<DeployContractWithAddress>> {
        self.tick += 1;
        let tick = self.tick;
        self.entries.get_mut(key).map(|e| {
            e.last_used = tick;
            e.msg.clone()
        })
    }

    fn insert(&mut self, key: (ABIType, String), msg: Arc<DeployContractWithAddress>) {
        self.tick += 1;
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            if let Some(evict) =
                self.entries.iter().min_by_key(|(_, e)| e.last_used).map(|(k, _)| k.clone())
            {
                self.entries.remove(&evict);
            }
        }
        self.entries.insert(key, CacheEntry { last_used: self.tick, msg });
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

struct StoreState {
    abi_index: HashMap<String, ABIInfo>,
    contract_index: HashMap<String, ContractInfo>,
    name_index: HashMap<String, String>,
    abi_cache: AbiCache,
}

/// File-backed contract store with in-memory indices built at startup.
pub struct FilesystemStore {
    conf: ContractStoreConf,
    rr: Arc<dyn RemoteRegistry>,
    state: RwLock<StoreState>,
}

impl FilesystemStore {
    pub fn new(conf: ContractStoreConf, rr: Arc<dyn RemoteRegistry>) -> Self {
        let capacity = if conf.abi_cache_size == 0 { DEFAULT_ABI_CACHE_SIZE } else { conf.abi_cache_size };
        Self {
            conf,
            rr,
            state: RwLock::new(StoreState {
                abi_index: HashMap::new(),
                contract_index: HashMap::new(),
                name_index: HashMap::new(),
                abi_cache: AbiCache::new(capacity),
            }),
        }
    }

    fn abi_file(&self, id: &str) -> PathBuf {
        self.conf.storage_path.join(format!("abi_{id}.deploy.json"))
    }

    fn instance_file(&self, address: &str) -> PathBuf {
        self.conf.storage_path.join(format!("contract_{address}.instance.json"))
    }

    fn load_deploy_msg(&self, id: &str) -> Result<DeployContractWithAddress, RegistryError> {
        {
            let state = self.state.read().expect("store lock poisoned");
            if !state.abi_index.contains_key(id) {
                return Err(RegistryError::AbiNotFound(id.to_owned()));
            }
        }
        let bytes = fs::read(self.abi_file(id)).map_err(|e| {
            tracing::error!("Failed to read ABI file for {id}: {e}");
            RegistryError::AbiLoadFailed(id.to_owned())
        })?;
        let contract: DeployContract = serde_json::from_slice(&bytes).map_err(|e| {
            tracing::error!("Failed to parse ABI file for {id}: {e}");
            RegistryError::AbiParseFailed(id.to_owned())
        })?;
        Ok(DeployContractWithAddress { contract, address: String::new() })
    }

    fn add_file_to_abi_index(&self, id: &str, file: &Path, mtime: SystemTime) {
        let contract: DeployContract = match fs::read(file)
            .and_then(|b| serde_json::from_slice(&b).map_err(io::Error::other))
        {
            Ok(contract) => contract,
            Err(e) => {
                tracing::warn!("Failed to load ABI deployment {}: {e}", file.display());
                return;
            }
        };
        let info = ABIInfo {
            id: id.to_owned(),
            name: contract.contract_name.clone(),
            description: contract.description.clone(),
            path: format!("/abis/{id}"),
            deployable: !contract.compiled.is_empty() || !contract.solidity.is_empty(),
            created_iso8601: iso8601(mtime),
        };
        let mut state = self.state.write().expect("store lock poisoned");
        state.abi_index.insert(id.to_owned(), info);
    }

    fn add_file_to_contract_index(&self, file: &Path) {
        let info: ContractInfo = match fs::read(file)
            .and_then(|b| serde_json::from_slice(&b).map_err(io::Error::other))
        {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!("Failed to load contract instance {}: {e}", file.display());
                return;
            }
        };
        self.index_contract(info);
    }

    /// Legacy instances were stored as full swagger files; the deployment ID
    /// and registered name travel as info-section extensions.
    fn migrate_legacy_swagger(&self, address: &str, file: &Path, mtime: SystemTime) {
        let swagger: serde_json::Value = match fs::read(file)
            .and_then(|b| serde_json::from_slice(&b).map_err(io::Error::other))
        {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Failed to load swagger file {}: {e}", file.display());
                return;
            }
        };
        let info = &swagger["info"];
        let Some(abi_id) = info["x-firefly-deployment-id"].as_str() else {
            tracing::warn!("Swagger {} cannot be migrated: missing deployment ID", file.display());
            return;
        };
        let registered_as = info["x-firefly-registered-name"].as_str().unwrap_or_default();
        self.index_contract(ContractInfo {
            address: address.to_owned(),
            abi: abi_id.to_owned(),
            path: format!("/contracts/{address}"),
            swagger_url: String::new(),
            registered_as: registered_as.to_owned(),
            created_iso8601: iso8601(mtime),
        });
    }

    fn index_contract(&self, info: ContractInfo) {
        let mut state = self.state.write().expect("store lock poisoned");
        if !info.registered_as.is_empty() {
            state.name_index.insert(info.registered_as.clone(), info.address.clone());
        }
        state.contract_index.insert(info.address.clone(), info);
    }

    fn store_contract_info(&self, info: &ContractInfo) -> Result<(), RegistryError> {
        let bytes = serde_json::to_vec_pretty(info)
            .map_err(|e| RegistryError::StoreWriteFailed(e.to_string()))?;
        atomic_write(&self.instance_file(&info.address), &bytes)
            .map_err(|e| RegistryError::StoreWriteFailed(e.to_string()))
    }
}

fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

fn iso8601(t: SystemTime) -> String {
    DateTime::<Utc>::from(t).to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl ContractStore for FilesystemStore {
    /// Scan the storage directory and build the in-memory indices. Malformed
    /// files are logged and skipped, never fatal.
    fn init(&self) -> Result<(), RegistryError> {
        let entries = match fs::read_dir(&self.conf.storage_path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    "Storage path {} not listable, starting with an empty index: {e}",
                    self.conf.storage_path.display()
                );
                return Ok(());
            }
        };
        for entry in entries.flatten() {
            let file = entry.path();
            let mtime =
                entry.metadata().and_then(|m| m.modified()).unwrap_or(SystemTime::UNIX_EPOCH);
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(id) = name.strip_prefix("abi_").and_then(|n| n.strip_suffix(".deploy.json")) {
                self.add_file_to_abi_index(id, &file, mtime);
            } else if name.starts_with("contract_") && name.ends_with(".instance.json") {
                self.add_file_to_contract_index(&file);
            } else if let Some(addr) =
                name.strip_prefix("contract_").and_then(|n| n.strip_suffix(".swagger.json"))
            {
                self.migrate_legacy_swagger(addr, &file, mtime);
            }
        }
        let state = self.state.read().expect("store lock poisoned");
        tracing::info!(
            "Contract store initialized: {} ABIs, {} contract instances",
            state.abi_index.len(),
            state.contract_index.len()
        );
        Ok(())
    }

    async fn get_abi(
        &self,
        location: &ABILocation,
        refresh: bool,
    ) -> Result<Option<DeployContractWithAddress>, RegistryError> {
        let key = (location.abi_type, location.name.clone());
        if !refresh {
            let mut state = self.state.write().expect("store lock poisoned");
            if let Some(hit) = state.abi_cache.get(&key) {
                return Ok(Some((*hit).clone()));
            }
        }
        let loaded = match location.abi_type {
            ABIType::RemoteGateway => self
                .rr
                .load_factory_for_gateway(&location.name, refresh)
                .await?
                .map(|contract| DeployContractWithAddress { contract, address: String::new() }),
            ABIType::RemoteInstance => self.rr.load_factory_for_instance(&location.name, refresh).await?,
            ABIType::LocalABI => Some(self.load_deploy_msg(&location.name)?),
        };
        if let Some(msg) = &loaded {
            let mut state = self.state.write().expect("store lock poisoned");
            state.abi_cache.insert(key, Arc::new(msg.clone()));
        }
        Ok(loaded)
    }

    fn get_contract_by_address(&self, address: &str) -> Result<ContractInfo, RegistryError> {
        let lookup = address.trim_start_matches("0x").to_lowercase();
        let state = self.state.read().expect("store lock poisoned");
        state
            .contract_index
            .get(&lookup)
            .cloned()
            .ok_or_else(|| RegistryError::ContractNotFound(address.to_owned()))
    }

    fn resolve_contract_address(&self, name: &str) -> Result<String, RegistryError> {
        let state = self.state.read().expect("store lock poisoned");
        state
            .name_index
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::ContractNameNotFound(name.to_owned()))
    }

    async fn check_name_available(&self, name: &str, is_remote: bool) -> Result<(), RegistryError> {
        if is_remote {
            if let Some(msg) = self.rr.load_factory_for_instance(name, false).await? {
                if !msg.address.is_empty() {
                    return Err(RegistryError::NameTaken {
                        address: msg.address,
                        name: name.to_owned(),
                    });
                }
            }
            return Ok(());
        }
        let state = self.state.read().expect("store lock poisoned");
        match state.name_index.get(name) {
            Some(address) => {
                Err(RegistryError::NameTaken { address: address.clone(), name: name.to_owned() })
            }
            None => Ok(()),
        }
    }

    fn add_contract(
        &self,
        address: &str,
        abi_id: &str,
        registered_as: &str,
    ) -> Result<ContractInfo, RegistryError> {
        let address = address.trim_start_matches("0x").to_lowercase();
        if !registered_as.is_empty() {
            let state = self.state.read().expect("store lock poisoned");
            if let Some(existing) = state.name_index.get(registered_as) {
                if *existing != address {
                    return Err(RegistryError::NameTaken {
                        address: existing.clone(),
                        name: registered_as.to_owned(),
                    });
                }
            }
        }
        let path = if registered_as.is_empty() {
            format!("/contracts/{address}")
        } else {
            format!("/contracts/{registered_as}")
        };
        let info = ContractInfo {
            address,
            abi: abi_id.to_owned(),
            swagger_url: format!("{}{}?swagger", self.conf.base_url, path),
            path,
            registered_as: registered_as.to_owned(),
            created_iso8601: iso8601(SystemTime::now()),
        };
        self.store_contract_info(&info)?;
        self.index_contract(info.clone());
        Ok(info)
    }

    fn add_abi(&self, id: &str, contract: &DeployContract) -> Result<ABIInfo, RegistryError> {
        let bytes = serde_json::to_vec_pretty(contract)
            .map_err(|e| RegistryError::StoreWriteFailed(e.to_string()))?;
        atomic_write(&self.abi_file(id), &bytes)
            .map_err(|e| RegistryError::StoreWriteFailed(e.to_string()))?;
        let info = ABIInfo {
            id: id.to_owned(),
            name: contract.contract_name.clone(),
            description: contract.description.clone(),
            path: format!("/abis/{id}"),
            deployable: !contract.compiled.is_empty() || !contract.solidity.is_empty(),
            created_iso8601: iso8601(SystemTime::now()),
        };
        let mut state = self.state.write().expect("store lock poisoned");
        state.abi_index.insert(id.to_owned(), info.clone());
        Ok(info)
    }

    fn list_contracts(&self) -> Vec<ContractInfo> {
        let state = self.state.read().expect("store lock poisoned");
        let mut contracts: Vec<_> = state.contract_index.values().cloned().collect();
        contracts.sort_by(|a, b| a.address.cmp(&b.address));
        contracts
    }

    fn list_abis(&self) -> Vec<ABIInfo> {
        let state = self.state.read().expect("store lock poisoned");
        let mut abis: Vec<_> = state.abi_index.values().cloned().collect();
        abis.sort_by(|a, b| a.created_iso8601.cmp(&b.created_iso8601).then_with(|| a.id.cmp(&b.id)));
        abis
    }

    fn close(&self) {
        self.rr.close();
    }
}
