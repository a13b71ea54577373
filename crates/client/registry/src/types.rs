use ep_messages::{CommonHeaders, DeployContract};
use serde::{Deserialize, Serialize};

/// Context-map key stamped onto messages whose ABI came from the remote
/// registry, so downstream registration knows which store to target.
pub const REMOTE_REGISTRY_CONTEXT_KEY: &str = "fromRemoteRegistry";

/// Which registry a path resolves against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ABIType {
    /// The gateway's own file-backed store. The location name is an ABI UUID,
    /// or empty when the route goes through a contract address instead.
    LocalABI,
    /// A factory ABI served by the remote registry (deployable, no address).
    RemoteGateway,
    /// An instance ABI served by the remote registry (bound to an address).
    RemoteInstance,
}

/// A tagged reference to an ABI.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ABILocation {
    pub abi_type: ABIType,
    pub name: String,
}

impl ABILocation {
    pub fn local(name: impl Into<String>) -> Self {
        Self { abi_type: ABIType::LocalABI, name: name.into() }
    }
}

/// Index record for an uploaded ABI.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ABIInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default)]
    pub deployable: bool,
    #[serde(rename = "createdISO8601", default, skip_serializing_if = "String::is_empty")]
    pub created_iso8601: String,
}

/// Index record for a deployed contract instance. The address is the primary
/// key, held lowercase without the `0x` prefix; `registered_as` is a unique
/// secondary key when non-empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractInfo {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub abi: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(rename = "openapi", default, skip_serializing_if = "String::is_empty")]
    pub swagger_url: String,
    #[serde(rename = "registeredAs", default, skip_serializing_if = "String::is_empty")]
    pub registered_as: String,
    #[serde(rename = "createdISO8601", default, skip_serializing_if = "String::is_empty")]
    pub created_iso8601: String,
}

/// A deployment message plus the instance address it is bound to (empty for
/// factory ABIs).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DeployContractWithAddress {
    #[serde(flatten)]
    pub contract: DeployContract,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address: String,
}

/// Whether a message's ABI was resolved through the remote registry.
pub fn is_remote(headers: &CommonHeaders) -> bool {
    headers
        .context
        .get(REMOTE_REGISTRY_CONTEXT_KEY)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}
