use std::collections::HashMap;
use std::io::Write;
use std::process::{Command, Stdio};

use alloy::json_abi::JsonAbi;
use alloy::primitives::Bytes;
use serde::Deserialize;

use crate::EthError;

/// Output of an external `solc` invocation, reduced to what the deployment
/// path needs.
#[derive(Clone, Debug)]
pub struct CompiledSolidity {
    pub contract_name: String,
    pub compiled: Bytes,
    pub abi: JsonAbi,
    pub dev_doc: String,
}

#[derive(Deserialize)]
struct CombinedJsonOutput {
    #[serde(default)]
    contracts: HashMap<String, CombinedJsonContract>,
}

#[derive(Deserialize)]
struct CombinedJsonContract {
    #[serde(default)]
    bin: String,
    #[serde(default)]
    abi: serde_json::Value,
    #[serde(default)]
    devdoc: serde_json::Value,
}

/// Pick the `solc` binary for a requested Solidity version.
///
/// An explicit `major.minor` request looks up `ETHGATE_SOLC_<MAJ>_<MIN>`;
/// otherwise `ETHGATE_SOLC_DEFAULT` applies, falling back to `solc` on the
/// path.
fn solc_executable(requested_version: &str) -> Result<String, EthError> {
    if requested_version.is_empty() {
        return Ok(std::env::var("ETHGATE_SOLC_DEFAULT").ok().filter(|v| !v.is_empty()).unwrap_or_else(|| "solc".to_owned()));
    }
    let mut parts = requested_version.splitn(3, '.');
    let major = parts.next().and_then(|p| p.parse::<u32>().ok());
    let minor = parts.next().and_then(|p| p.parse::<u32>().ok());
    let (major, minor) = match (major, minor) {
        (Some(major), Some(minor)) => (major, minor),
        _ => return Err(EthError::BadCompilerVersion),
    };
    std::env::var(format!("ETHGATE_SOLC_{major}_{minor}"))
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| EthError::CompilerVersionNotFound(format!("{major}.{minor}")))
}

/// Compile Solidity source by shelling out to the selected `solc` binary, and
/// pick the requested contract from the output. With more than one contract
/// in the source, `contract_name` is required to disambiguate.
pub fn compile_contract(
    solidity: &str,
    contract_name: &str,
    compiler_version: &str,
    evm_version: &str,
) -> Result<CompiledSolidity, EthError> {
    let solc = solc_executable(compiler_version)?;
    let mut cmd = Command::new(&solc);
    cmd.args(["--combined-json", "bin,abi,devdoc"]);
    if !evm_version.is_empty() {
        cmd.args(["--evm-version", evm_version]);
    }
    cmd.arg("-").stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| EthError::CompilationFailed(format!("running {solc}: {e}")))?;
    if let Some(stdin) = child.stdin.as_mut() {
        stdin
            .write_all(solidity.as_bytes())
            .map_err(|e| EthError::CompilationFailed(e.to_string()))?;
    }
    let output = child.wait_with_output().map_err(|e| EthError::CompilationFailed(e.to_string()))?;
    if !output.status.success() {
        return Err(EthError::CompilationFailed(String::from_utf8_lossy(&output.stderr).into_owned()));
    }
    let combined: CombinedJsonOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| EthError::CompilationFailed(format!("parsing solc output: {e}")))?;

    let (qualified_name, contract) = if contract_name.is_empty() {
        if combined.contracts.len() > 1 {
            return Err(EthError::MultipleContracts);
        }
        combined
            .contracts
            .into_iter()
            .next()
            .ok_or_else(|| EthError::CompilationFailed("no contracts in solc output".to_owned()))?
    } else {
        let wanted = format!("<stdin>:{contract_name}");
        let found = combined.contracts.into_iter().find(|(name, _)| *name == wanted || name.ends_with(&format!(":{contract_name}")));
        found.ok_or_else(|| EthError::ContractNotFound(wanted.clone()))?
    };

    pack_contract(&qualified_name, contract)
}

// "<stdin>:stuff:watsit" reduces to "watsit".
fn short_name(qualified: &str) -> &str {
    qualified.rsplit(':').next().unwrap_or(qualified)
}

fn pack_contract(qualified_name: &str, contract: CombinedJsonContract) -> Result<CompiledSolidity, EthError> {
    let bin = contract.bin.trim_start_matches("0x");
    let compiled =
        hex::decode(bin).map_err(|e| EthError::CompilationFailed(format!("Decoding bytecode: {e}")))?;
    if compiled.is_empty() {
        return Err(EthError::CompilationFailed(format!(
            "Specified contract compiled ok, but did not result in any bytecode: {qualified_name}"
        )));
    }
    // Some solc versions emit the ABI as a JSON string rather than an array.
    let abi: JsonAbi = match &contract.abi {
        serde_json::Value::String(s) => serde_json::from_str(s),
        other => serde_json::from_value(other.clone()),
    }
    .map_err(|e| EthError::CompilationFailed(format!("Parsing ABI: {e}")))?;
    let dev_doc = match &contract.devdoc {
        serde_json::Value::String(s) => s.clone(),
        other => serde_json::to_string(other)
            .map_err(|e| EthError::CompilationFailed(format!("Serializing DevDoc: {e}")))?,
    };
    Ok(CompiledSolidity {
        contract_name: short_name(qualified_name).to_owned(),
        compiled: Bytes::from(compiled),
        abi,
        dev_doc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names_strip_the_stdin_prefix() {
        assert_eq!(short_name("<stdin>:stuff:watsit"), "watsit");
        assert_eq!(short_name("thingymobob"), "thingymobob");
    }

    #[test]
    fn pack_rejects_empty_bytecode() {
        let contract = CombinedJsonContract {
            bin: "".into(),
            abi: serde_json::json!([]),
            devdoc: serde_json::Value::Null,
        };
        let err = pack_contract("<stdin>:empty", contract).unwrap_err();
        assert!(err.to_string().contains("did not result in any bytecode"), "{err}");
    }

    #[test]
    fn pack_rejects_bad_hex() {
        let contract = CombinedJsonContract {
            bin: "Not Hex".into(),
            abi: serde_json::json!([]),
            devdoc: serde_json::Value::Null,
        };
        let err = pack_contract("<stdin>:bad", contract).unwrap_err();
        assert!(err.to_string().contains("Decoding bytecode"), "{err}");
    }

    #[test]
    fn invalid_version_request_is_rejected() {
        let err = solc_executable("zero.four").unwrap_err();
        assert!(err.to_string().contains("Invalid Solidity version requested for compiler"), "{err}");
        let err = solc_executable("0.").unwrap_err();
        assert!(err.to_string().contains("Invalid Solidity version requested for compiler"), "{err}");
    }

    #[test]
    fn unconfigured_version_is_reported() {
        let err = solc_executable("9.9").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Could not find a configured compiler for requested Solidity major version 9.9"
        );
    }

    #[test]
    fn version_env_var_selects_binary() {
        std::env::set_var("ETHGATE_SOLC_0_4", "solc04");
        assert_eq!(solc_executable("0.4").unwrap(), "solc04");
        assert_eq!(solc_executable("0.4.23.some interesting things").unwrap(), "solc04");
        std::env::remove_var("ETHGATE_SOLC_0_4");
    }
}
