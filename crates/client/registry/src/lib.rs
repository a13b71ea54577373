//! Contract registry: where ABIs live and how they are found.
//!
//! Two backing stores cooperate behind one resolution seam:
//!
//! - [`FilesystemStore`]: the file-backed model. Uploaded ABIs are
//!   `abi_<uuid>.deploy.json` files, deployed instances are
//!   `contract_<address>.instance.json` files, and startup builds in-memory
//!   indices over both (plus a migration path for the legacy
//!   `contract_<address>.swagger.json` form). Decoded ABIs are held in a
//!   bounded LRU cache.
//! - [`HttpRegistry`]: a remote REST contract registry serving factory
//!   ("gateway") and instance ABIs, with an optional [`KvStore`]-backed cache
//!   of its responses.
//!
//! An [`ABILocation`] names which of the two a request resolves against.

mod error;
mod kvstore;
mod remote;
mod store;
mod types;

pub use error::RegistryError;
pub use kvstore::{KvStore, MemKvStore};
pub use remote::{HttpRegistry, PropNames, RemoteRegistry, RemoteRegistryConf};
pub use store::{ContractStore, ContractStoreConf, FilesystemStore, DEFAULT_ABI_CACHE_SIZE};
pub use types::{
    is_remote, ABIInfo, ABILocation, ABIType, ContractInfo, DeployContractWithAddress,
    REMOTE_REGISTRY_CONTEXT_KEY,
};
