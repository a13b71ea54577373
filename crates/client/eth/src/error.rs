use crate::rpc::RpcError;
use ep_abi::AbiError;

/// Errors from transaction construction, submission and node queries.
#[derive(Debug, thiserror::Error)]
pub enum EthError {
    #[error(transparent)]
    Abi(#[from] AbiError),
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("Converting supplied 'nonce' to integer: {0}")]
    BadNonce(String),
    #[error("Converting supplied 'value' to big integer: {0}")]
    BadValue(String),
    #[error("Converting supplied 'gas' to integer: {0}")]
    BadGas(String),
    #[error("Converting supplied 'gasPrice' to big integer: {0}")]
    BadGasPrice(String),
    #[error("Supplied value for 'from' is not a valid hex address")]
    BadFromAddress,
    #[error("Supplied value for 'to' is not a valid hex address")]
    BadToAddress,
    #[error("Missing Compiled Code + ABI, or Solidity")]
    MissingCompiledCodeOrSolidity,
    #[error("Method missing")]
    MethodMissing,
    #[error("Failed to calculate gas for transaction: {0}")]
    GasEstimationFailed(String),
    #[error("Call failed: {0}")]
    CallFailed(String),
    #[error("{0}")]
    Reverted(String),
    #[error("EVM reverted. Failed to decode error message")]
    RevertDecodeFailed,
    #[error("Failed to decode return data: {0}")]
    BadReturnData(String),
    #[error("Invalid blocknumber. Failed to parse into big integer")]
    BadBlockNumber,
    #[error("private-from is required when submitting private transactions via Orion")]
    OrionMissingPrivateFrom,
    #[error("Signing with {0} is not currently supported with private transactions")]
    PrivateSigningUnsupported(String),
    #[error("{0}")]
    Signer(String),
    #[error("eth_getTransactionReceipt returned: {0}")]
    ReceiptFailed(RpcError),
    #[error("priv_getTransactionReceipt returned: {0}")]
    PrivReceiptFailed(RpcError),
    #[error("eth_getTransactionCount returned: {0}")]
    TxCountFailed(RpcError),
    #[error("priv_getTransactionCount for privacy group '{group}' returned: {err}")]
    OrionTxCountFailed { group: String, err: RpcError },
    #[error("Failed to query transaction: {0}")]
    TxNotFound(String),
    #[error("Timed out waiting for transaction receipt")]
    ReceiptTimeout,
    #[error("Solidity compilation failed: {0}")]
    CompilationFailed(String),
    #[error("More than one contract in Solidity file, please set one to call")]
    MultipleContracts,
    #[error("Contract '{0}' not found in Solidity source")]
    ContractNotFound(String),
    #[error("Could not find a configured compiler for requested Solidity major version {0}")]
    CompilerVersionNotFound(String),
    #[error("Invalid Solidity version requested for compiler. Ensure the string starts with two dot separated numbers, such as 0.5")]
    BadCompilerVersion,
}
