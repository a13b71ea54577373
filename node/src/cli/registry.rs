use ec_registry::{PropNames, RemoteRegistryConf};

/// Remote contract registry connection. Both URL prefixes are optional; an
/// empty prefix disables the corresponding routes.
#[derive(Clone, Debug, clap::Args)]
pub struct RegistryParams {
    /// Base URL for factory ("gateway") ABI lookups in the remote registry.
    #[clap(env = "ETHGATE_GATEWAY_URL_PREFIX", long, default_value = "")]
    pub gateway_url_prefix: String,

    /// Base URL for instance ABI lookups in the remote registry.
    #[clap(env = "ETHGATE_INSTANCE_URL_PREFIX", long, default_value = "")]
    pub instance_url_prefix: String,

    /// Cache successful registry lookups in memory.
    #[clap(env = "ETHGATE_REGISTRY_CACHE", long)]
    pub registry_cache: bool,

    /// JSON property names on the registry's responses.
    #[clap(long, default_value = "id")]
    pub registry_prop_id: String,
    #[clap(long, default_value = "name")]
    pub registry_prop_name: String,
    #[clap(long, default_value = "abi")]
    pub registry_prop_abi: String,
    #[clap(long, default_value = "bytecode")]
    pub registry_prop_bytecode: String,
    #[clap(long, default_value = "devdoc")]
    pub registry_prop_devdoc: String,
    #[clap(long, default_value = "deployable")]
    pub registry_prop_deployable: String,
    #[clap(long, default_value = "address")]
    pub registry_prop_address: String,
}

impl RegistryParams {
    pub fn as_conf(&self) -> RemoteRegistryConf {
        RemoteRegistryConf {
            gateway_url_prefix: self.gateway_url_prefix.clone(),
            instance_url_prefix: self.instance_url_prefix.clone(),
            prop_names: PropNames {
                id: self.registry_prop_id.clone(),
                name: self.registry_prop_name.clone(),
                abi: self.registry_prop_abi.clone(),
                bytecode: self.registry_prop_bytecode.clone(),
                devdoc: self.registry_prop_devdoc.clone(),
                deployable: self.registry_prop_deployable.clone(),
                address: self.registry_prop_address.clone(),
            },
        }
    }
}
