/// Errors from the local contract store and the remote registry client.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("No ABI found with ID {0}")]
    AbiNotFound(String),
    #[error("Failed to load ABI with ID {0}")]
    AbiLoadFailed(String),
    #[error("Failed to parse ABI with ID {0}")]
    AbiParseFailed(String),
    #[error("No contract instance registered with address {0}")]
    ContractNotFound(String),
    #[error("No contract registered with name '{0}'")]
    ContractNameNotFound(String),
    #[error("Contract address {address} is already registered for name '{name}'")]
    NameTaken { address: String, name: String },
    #[error("Failed to write ABI JSON: {0}")]
    StoreWriteFailed(String),
    #[error("Failed to initialize contract store: {0}")]
    StoreInitFailed(String),
    #[error("'{0}' missing in Contract registry response")]
    PropertyMissing(String),
    #[error("'{0}' not a string")]
    PropertyNotAString(String),
    #[error("'{0}' empty (or null)")]
    PropertyEmpty(String),
    #[error("Error processing contract registry response")]
    ResponseProcessingFailed,
    #[error("Could not reach Contract registry: {0}")]
    LookupFailed(String),
    #[error("Contract registry returned [{status}]: {message}")]
    RegistryErrorResponse { status: u16, message: String },
    #[error("Could not process Contract registry [{0}] response")]
    RegistryBadResponse(u16),
    #[error("Failed to register instance in remote registry: {0}")]
    RegistrationFailed(String),
    #[error("Remote registry is not configured")]
    RemoteNotConfigured,
    #[error("Failed to initialize cache for remote registry: {0}")]
    CacheInitFailed(String),
}
