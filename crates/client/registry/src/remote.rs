use std::sync::Arc;

use alloy::primitives::Bytes;
use async_trait::async_trait;
use ep_messages::DeployContract;
use serde_json::{json, Value};
use url::form_urlencoded;

use crate::{DeployContractWithAddress, KvStore, RegistryError, REMOTE_REGISTRY_CONTEXT_KEY};

/// JSON property names to extract from registry responses. Registries differ
/// on these, so each is configurable.
#[derive(Clone, Debug)]
pub struct PropNames {
    pub id: String,
    pub name: String,
    pub abi: String,
    pub bytecode: String,
    pub devdoc: String,
    pub deployable: String,
    pub address: String,
}

impl Default for PropNames {
    fn default() -> Self {
        Self {
            id: "id".into(),
            name: "name".into(),
            abi: "abi".into(),
            bytecode: "bytecode".into(),
            devdoc: "devdoc".into(),
            deployable: "deployable".into(),
            address: "address".into(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RemoteRegistryConf {
    /// Base URL for factory ABI lookups (no address binding). Empty disables
    /// the gateway routes.
    pub gateway_url_prefix: String,
    /// Base URL for instance ABI lookups. Empty disables the instance routes.
    pub instance_url_prefix: String,
    pub prop_names: PropNames,
}

/// Lookup of ABI, bytecode and devdocs against a conformant REST registry.
#[async_trait]
pub trait RemoteRegistry: Send + Sync {
    async fn load_factory_for_gateway(
        &self,
        lookup: &str,
        refresh: bool,
    ) -> Result<Option<DeployContract>, RegistryError>;
    async fn load_factory_for_instance(
        &self,
        lookup: &str,
        refresh: bool,
    ) -> Result<Option<DeployContractWithAddress>, RegistryError>;
    async fn register_instance(&self, lookup: &str, address: &str) -> Result<(), RegistryError>;
    fn init(&self) -> Result<(), RegistryError>;
    fn close(&self);
}

/// HTTP implementation, with an optional key-value cache of successful
/// lookups.
pub struct HttpRegistry {
    conf: RemoteRegistryConf,
    client: reqwest::Client,
    cache: Option<Arc<dyn KvStore>>,
}

fn normalize_prefix(mut prefix: String) -> String {
    if !prefix.is_empty() && !prefix.ends_with('/') {
        prefix.push('/');
    }
    prefix
}

fn query_escape(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

impl HttpRegistry {
    pub fn new(mut conf: RemoteRegistryConf, cache: Option<Arc<dyn KvStore>>) -> Self {
        conf.gateway_url_prefix = normalize_prefix(conf.gateway_url_prefix);
        conf.instance_url_prefix = normalize_prefix(conf.instance_url_prefix);
        Self { conf, client: reqwest::Client::new(), cache }
    }

    pub fn conf(&self) -> &RemoteRegistryConf {
        &self.conf
    }

    fn load_from_cache(&self, cache_key: &str) -> Option<DeployContractWithAddress> {
        let cache = self.cache.as_ref()?;
        let bytes = match cache.get(cache_key) {
            Ok(bytes) => bytes?,
            Err(e) => {
                tracing::warn!("Failed to read cache for key {cache_key}: {e}");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(msg) => Some(msg),
            Err(e) => {
                tracing::warn!("Failed to deserialize cached bytes for key {cache_key}: {e}");
                None
            }
        }
    }

    fn store_to_cache(&self, cache_key: &str, msg: &DeployContractWithAddress) {
        let Some(cache) = self.cache.as_ref() else { return };
        let bytes = match serde_json::to_vec(msg) {
            Ok(bytes) => bytes,
            Err(_) => return,
        };
        if let Err(e) = cache.put(cache_key, &bytes) {
            tracing::warn!("Failed to write cache for key {cache_key}: {e}");
        }
    }

    async fn load_factory_from_url(
        &self,
        base_url: &str,
        ns: &str,
        lookup: &str,
        refresh: bool,
    ) -> Result<Option<DeployContractWithAddress>, RegistryError> {
        let safe_lookup = query_escape(lookup);
        let cache_key = format!("{ns}/{safe_lookup}");
        if !refresh {
            if let Some(msg) = self.load_from_cache(&cache_key) {
                return Ok(Some(msg));
            }
        }

        let query_url = format!("{base_url}{safe_lookup}");
        let res = self
            .client
            .get(&query_url)
            .send()
            .await
            .map_err(|e| RegistryError::LookupFailed(e.to_string()))?;
        let status = res.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body: Value = res.json().await.unwrap_or(Value::Null);
            if let Some(message) = body.get("errorMessage").and_then(|v| v.as_str()) {
                return Err(RegistryError::RegistryErrorResponse {
                    status: status.as_u16(),
                    message: message.to_owned(),
                });
            }
            return Err(RegistryError::RegistryBadResponse(status.as_u16()));
        }
        let body: Value = res
            .json()
            .await
            .map_err(|_| RegistryError::RegistryBadResponse(status.as_u16()))?;

        let props = &self.conf.prop_names;
        let id = body
            .get(&props.id)
            .and_then(|v| v.as_str())
            .ok_or_else(|| RegistryError::PropertyMissing(props.id.clone()))?;

        let abi_value =
            body.get(&props.abi).ok_or_else(|| RegistryError::PropertyMissing(props.abi.clone()))?;
        let abi = match abi_value {
            Value::String(s) => serde_json::from_str(s),
            other => serde_json::from_value(other.clone()),
        }
        .map_err(|e| {
            tracing::error!("GET {query_url} <-- !Failed to decode ABI: {e}");
            RegistryError::ResponseProcessingFailed
        })?;

        // Some registries serve devdoc as a raw object; serialize it back to
        // a string in that case. Scalars other than strings are malformed.
        let devdoc = match body.get(&props.devdoc) {
            Some(Value::Null) | None => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other @ (Value::Object(_) | Value::Array(_))) => {
                serde_json::to_string(other).unwrap_or_default()
            }
            Some(_) => return Err(RegistryError::PropertyNotAString(props.devdoc.clone())),
        };

        let bytecode_str = match body.get(&props.bytecode) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => return Err(RegistryError::PropertyEmpty(props.bytecode.clone())),
        };
        let bytecode =
            hex::decode(bytecode_str.trim_start_matches("0x")).map_err(|e| {
                tracing::error!("GET {query_url} <-- !Failed to parse bytecode: {e}");
                RegistryError::ResponseProcessingFailed
            })?;

        let address = body
            .get(&props.address)
            .and_then(|v| v.as_str())
            .map(|s| s.trim_start_matches("0x").to_lowercase())
            .unwrap_or_default();

        let mut contract = DeployContract {
            abi,
            dev_doc: devdoc,
            compiled: Bytes::from(bytecode),
            ..Default::default()
        };
        contract.tx.headers.common.id = id.to_owned();
        contract.tx.headers.common.context.insert(REMOTE_REGISTRY_CONTEXT_KEY.into(), json!(true));

        let msg = DeployContractWithAddress { contract, address };
        self.store_to_cache(&cache_key, &msg);
        Ok(Some(msg))
    }
}

#[async_trait]
impl RemoteRegistry for HttpRegistry {
    async fn load_factory_for_gateway(
        &self,
        lookup: &str,
        refresh: bool,
    ) -> Result<Option<DeployContract>, RegistryError> {
        if self.conf.gateway_url_prefix.is_empty() {
            return Ok(None);
        }
        let msg =
            self.load_factory_from_url(&self.conf.gateway_url_prefix, "gateways", lookup, refresh).await?;
        // There is no address on a gateway, only the deploy message matters.
        Ok(msg.map(|m| m.contract))
    }

    async fn load_factory_for_instance(
        &self,
        lookup: &str,
        refresh: bool,
    ) -> Result<Option<DeployContractWithAddress>, RegistryError> {
        if self.conf.instance_url_prefix.is_empty() {
            return Ok(None);
        }
        self.load_factory_from_url(&self.conf.instance_url_prefix, "instances", lookup, refresh).await
    }

    async fn register_instance(&self, lookup: &str, address: &str) -> Result<(), RegistryError> {
        if self.conf.instance_url_prefix.is_empty() {
            return Err(RegistryError::RemoteNotConfigured);
        }
        let request_url = self.conf.instance_url_prefix.trim_end_matches('/');
        let props = &self.conf.prop_names;
        let mut body = serde_json::Map::new();
        body.insert(props.name.clone(), json!(query_escape(lookup)));
        body.insert(props.address.clone(), json!(address));
        let body = Value::Object(body);
        tracing::debug!("Registering contract: {body}");
        let res = self
            .client
            .post(request_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RegistryError::RegistrationFailed(e.to_string()))?;
        if !res.status().is_success() {
            return Err(RegistryError::RegistrationFailed(format!("status {}", res.status())));
        }
        Ok(())
    }

    fn init(&self) -> Result<(), RegistryError> {
        if let Some(cache) = &self.cache {
            cache.init().map_err(|e| RegistryError::CacheInitFailed(e.to_string()))?;
        }
        Ok(())
    }

    fn close(&self) {
        if let Some(cache) = &self.cache {
            cache.close();
        }
    }
}
