use alloy::json_abi::{Event, Function, JsonAbi, StateMutability};
use ec_registry::{ABILocation, ABIType, ContractStore, DeployContractWithAddress};
use ec_signer::is_hd_wallet_request;
use hyper::HeaderMap;
use serde_json::{Map, Value};

use crate::params::ParamReader;
use crate::router::RouteMatch;
use crate::GatewayError;

/// A fully resolved REST command: the ABI element being addressed, the
/// contract it lives at, and the marshaled parameter vector.
#[derive(Clone, Debug)]
pub(crate) struct RestCmd {
    pub from: String,
    pub addr: String,
    pub value: String,
    pub abi_location: ABILocation,
    pub method: Option<Function>,
    pub event: Option<Event>,
    pub is_deploy: bool,
    pub deploy_msg: DeployContractWithAddress,
    pub body: Map<String, Value>,
    pub msg_params: Vec<Value>,
    pub blocknumber: String,
    pub transaction_hash: String,
}

fn is_40_hex(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

pub(crate) fn is_constant(function: &Function) -> bool {
    matches!(function.state_mutability, StateMutability::Pure | StateMutability::View)
}

/// Resolve routing parameters to an ABI element per the documented order:
/// location, contract, method, event (with the `subscribe` special case),
/// then constructor.
pub(crate) async fn resolve_params(
    store: &dyn ContractStore,
    params: &ParamReader,
    route: &RouteMatch,
    query: &[(String, String)],
    headers: &HeaderMap,
    body: Map<String, Value>,
) -> Result<RestCmd, GatewayError> {
    let addr_param = route.address.as_str();
    let mut addr = addr_param.strip_prefix("0x").unwrap_or(addr_param).to_lowercase();
    let mut valid_address = is_40_hex(&addr);

    // Determine the registry to consult, resolving local routes that address
    // the contract (or its registered name) down to an ABI UUID.
    let location = match route.abi_type {
        Some(ABIType::RemoteGateway) => {
            ABILocation { abi_type: ABIType::RemoteGateway, name: route.lookup.clone() }
        }
        Some(ABIType::RemoteInstance) => {
            // The registry only returns valid addresses.
            valid_address = true;
            ABILocation { abi_type: ABIType::RemoteInstance, name: route.lookup.clone() }
        }
        Some(ABIType::LocalABI) if !route.abi_id.is_empty() => ABILocation::local(&route.abi_id),
        Some(ABIType::LocalABI) => {
            if !valid_address {
                // Try the path segment as a registered name instead.
                addr = store
                    .resolve_contract_address(addr_param)
                    .map_err(GatewayError::not_found)?;
            }
            valid_address = true;
            let info =
                store.get_contract_by_address(&addr).map_err(GatewayError::not_found)?;
            ABILocation::local(info.abi)
        }
        None => return Err(GatewayError::not_found("Not found")),
    };

    let deploy_msg = store
        .get_abi(&location, false)
        .await
        .map_err(GatewayError::server_error)?
        .ok_or_else(|| GatewayError::not_found("Contract instance not found in the registry"))?;
    if !deploy_msg.address.is_empty() {
        addr = deploy_msg.address.clone();
    }
    let abi = &deploy_msg.contract.abi;

    let method_param = route.method.as_str();
    let method_param_lc = method_param.to_lowercase();

    let mut method = None;
    let mut event = None;
    let mut is_deploy = false;

    if !method_param.is_empty() {
        method = find_function(abi, method_param);
    }
    // Solidity guarantees method and event names are disjoint per contract;
    // first match wins either way.
    if method.is_none() && !method_param.is_empty() {
        event = find_event(abi, method_param);
        if event.is_none() && method_param_lc == "subscribe" {
            // /abis/:abi/EVENTNAME/subscribe carries the event name in the
            // :address position, with no contract address at all.
            event = find_event(abi, addr_param);
            if event.is_some() {
                addr.clear();
            }
        }
    }
    debug_assert!(
        method.is_none() || find_event(abi, method_param).is_none(),
        "method and event names must be disjoint"
    );

    if method_param.is_empty() && method.is_none() && event.is_none() {
        // Constructor deployment; synthesize an empty constructor when the
        // ABI does not declare one (any supplied parameters are ignored).
        is_deploy = true;
        method = Some(constructor_as_function(abi));
    }

    if method.is_none() && event.is_none() {
        if method_param_lc == "subscribe" {
            return Err(GatewayError::not_found(format!("Event '{addr_param}' is not declared")));
        }
        return Err(GatewayError::not_found(format!(
            "Method or Event '{method_param}' is not declared in this contract"
        )));
    }

    if !addr.is_empty() && !valid_address {
        tracing::error!("Invalid to address: '{addr_param}'");
        return Err(GatewayError::not_found(
            "To Address must be a 40 character hex string (0x prefix is optional)",
        ));
    }
    if !addr.is_empty() {
        addr = format!("0x{addr}");
    }

    let from_param = params.get("from", query, headers);
    let from_no_prefix = from_param.strip_prefix("0x").unwrap_or(&from_param).to_lowercase();
    let mut from = String::new();
    if !from_no_prefix.is_empty() {
        if is_40_hex(&from_no_prefix) {
            from = format!("0x{from_no_prefix}");
        } else if is_hd_wallet_request(&from_no_prefix).is_some() {
            from = from_no_prefix;
        } else {
            tracing::error!("Invalid from address: '{from_param}'");
            return Err(GatewayError::not_found(
                "From Address must be a 40 character hex string (0x prefix is optional)",
            ));
        }
    }

    let value = params.get("ethvalue", query, headers);
    let blocknumber = params.get("blocknumber", query, headers);
    let transaction_hash = params.get("transaction", query, headers);

    let mut cmd = RestCmd {
        from,
        addr,
        value,
        abi_location: location,
        method,
        event,
        is_deploy,
        deploy_msg,
        body,
        msg_params: vec![],
        blocknumber,
        transaction_hash,
    };

    if cmd.event.is_some() || !cmd.transaction_hash.is_empty() {
        return Ok(cmd);
    }

    // Marshal inputs from the body by argument name, falling back to a
    // query-string parameter of the same name. Unnamed inputs are addressed
    // as input, input1, input2...
    let function = cmd.method.as_ref().expect("method resolved above");
    let mut msg_params = Vec::with_capacity(function.inputs.len());
    for (i, input) in function.inputs.iter().enumerate() {
        let arg_name = if input.name.is_empty() {
            if i == 0 {
                "input".to_owned()
            } else {
                format!("input{i}")
            }
        } else {
            input.name.clone()
        };
        if let Some(v) = cmd.body.get(&arg_name) {
            msg_params.push(v.clone());
        } else if let Some((_, v)) = query.iter().find(|(k, _)| *k == arg_name) {
            msg_params.push(Value::String(v.clone()));
        } else {
            return Err(GatewayError::bad_request(format!(
                "Parameter '{arg_name}' of method '{}' was not specified",
                function.name
            )));
        }
    }
    cmd.msg_params = msg_params;
    Ok(cmd)
}

fn find_function(abi: &JsonAbi, name: &str) -> Option<Function> {
    abi.functions().find(|f| f.name == name).cloned()
}

fn find_event(abi: &JsonAbi, name: &str) -> Option<Event> {
    abi.events().find(|e| e.name == name).cloned()
}

/// The constructor rendered as a callable element so parameter marshaling is
/// uniform. The name is only used in error messages.
fn constructor_as_function(abi: &JsonAbi) -> Function {
    Function {
        name: "constructor".to_owned(),
        inputs: abi.constructor.as_ref().map(|c| c.inputs.clone()).unwrap_or_default(),
        outputs: vec![],
        state_mutability: abi
            .constructor
            .as_ref()
            .map(|c| c.state_mutability)
            .unwrap_or(StateMutability::NonPayable),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::parse_query;
    use ec_registry::{ContractStoreConf, FilesystemStore, HttpRegistry, RemoteRegistryConf};
    use ep_messages::DeployContract;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    const ADDR: &str = "2b8c0ecc76d0759a8f50b2e14a6881367d805832";

    fn simple_abi() -> Value {
        json!([
            {"type": "constructor", "inputs": [{"name": "initVal", "type": "uint256"}]},
            {"type": "function", "name": "set", "inputs": [{"name": "x", "type": "uint256"}], "outputs": []},
            {"type": "function", "name": "get", "inputs": [], "outputs": [{"name": "retVal", "type": "uint256"}], "stateMutability": "view"},
            {"type": "event", "name": "Changed", "inputs": [{"name": "from", "type": "address", "indexed": true}]},
        ])
    }

    fn store_with_contract(dir: &TempDir) -> Arc<FilesystemStore> {
        let contract: DeployContract =
            serde_json::from_value(json!({"abi": simple_abi(), "compiled": "0x6001"})).unwrap();
        std::fs::write(
            dir.path().join("abi_abi1.deploy.json"),
            serde_json::to_vec(&contract).unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.path().join(format!("contract_{ADDR}.instance.json")),
            json!({"address": ADDR, "abi": "abi1", "registeredAs": "simple"}).to_string(),
        )
        .unwrap();
        let rr = Arc::new(HttpRegistry::new(RemoteRegistryConf::default(), None));
        let store = Arc::new(FilesystemStore::new(
            ContractStoreConf { storage_path: dir.path().to_path_buf(), ..Default::default() },
            rr,
        ));
        store.init().unwrap();
        store
    }

    async fn resolve(
        store: &FilesystemStore,
        path: &str,
        query: &str,
        body: Value,
    ) -> Result<RestCmd, GatewayError> {
        let route = crate::router::match_route(path).unwrap();
        let body = match body {
            Value::Object(m) => m,
            _ => Map::new(),
        };
        resolve_params(
            store,
            &ParamReader::new("fly", "firefly"),
            &route,
            &parse_query(query),
            &HeaderMap::new(),
            body,
        )
        .await
    }

    #[tokio::test]
    async fn resolves_method_by_contract_address() {
        let dir = TempDir::new().unwrap();
        let store = store_with_contract(&dir);
        let cmd = resolve(&store, &format!("/contracts/0x{ADDR}/get"), "", Value::Null).await.unwrap();
        assert_eq!(cmd.addr, format!("0x{ADDR}"));
        assert!(is_constant(cmd.method.as_ref().unwrap()));
        assert!(!cmd.is_deploy);
    }

    #[tokio::test]
    async fn resolves_registered_name_to_address() {
        let dir = TempDir::new().unwrap();
        let store = store_with_contract(&dir);
        let cmd = resolve(&store, "/contracts/simple/get", "", Value::Null).await.unwrap();
        assert_eq!(cmd.addr, format!("0x{ADDR}"));
    }

    #[tokio::test]
    async fn unknown_name_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = store_with_contract(&dir);
        let err = resolve(&store, "/contracts/nonexistent/get", "", Value::Null).await.unwrap_err();
        assert_eq!(err.status, hyper::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn resolves_constructor_for_abi_route() {
        let dir = TempDir::new().unwrap();
        let store = store_with_contract(&dir);
        let cmd = resolve(&store, "/abis/abi1", "", json!({"initVal": "999999"})).await.unwrap();
        assert!(cmd.is_deploy);
        assert_eq!(cmd.msg_params, vec![json!("999999")]);
        assert!(cmd.addr.is_empty());
    }

    #[tokio::test]
    async fn marshals_params_from_body_then_query() {
        let dir = TempDir::new().unwrap();
        let store = store_with_contract(&dir);
        let cmd = resolve(&store, &format!("/contracts/0x{ADDR}/set"), "", json!({"x": "42"}))
            .await
            .unwrap();
        assert_eq!(cmd.msg_params, vec![json!("42")]);

        let cmd =
            resolve(&store, &format!("/contracts/0x{ADDR}/set"), "x=43", Value::Null).await.unwrap();
        assert_eq!(cmd.msg_params, vec![json!("43")]);

        let err =
            resolve(&store, &format!("/contracts/0x{ADDR}/set"), "", Value::Null).await.unwrap_err();
        assert_eq!(err.to_string(), "Parameter 'x' of method 'set' was not specified");
        assert_eq!(err.status, hyper::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn resolves_events_including_subscribe_form() {
        let dir = TempDir::new().unwrap();
        let store = store_with_contract(&dir);

        let cmd = resolve(&store, &format!("/contracts/0x{ADDR}/Changed/subscribe"), "", Value::Null)
            .await
            .unwrap();
        assert_eq!(cmd.event.as_ref().unwrap().name, "Changed");
        assert_eq!(cmd.addr, format!("0x{ADDR}"));

        // Event name in the :address position clears the address.
        let cmd = resolve(&store, "/abis/abi1/Changed/subscribe", "", Value::Null).await.unwrap();
        assert_eq!(cmd.event.as_ref().unwrap().name, "Changed");
        assert!(cmd.addr.is_empty());

        let err = resolve(&store, "/abis/abi1/Nope/subscribe", "", Value::Null).await.unwrap_err();
        assert_eq!(err.to_string(), "Event 'Nope' is not declared");
    }

    #[tokio::test]
    async fn unknown_method_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = store_with_contract(&dir);
        let err =
            resolve(&store, &format!("/contracts/0x{ADDR}/missing"), "", Value::Null).await.unwrap_err();
        assert_eq!(err.to_string(), "Method or Event 'missing' is not declared in this contract");
    }

    #[tokio::test]
    async fn validates_the_from_parameter() {
        let dir = TempDir::new().unwrap();
        let store = store_with_contract(&dir);

        let cmd = resolve(
            &store,
            &format!("/contracts/0x{ADDR}/set"),
            "x=1&fly-from=0xAA983AD2a0e0eD8ac639277F37be42F2A5d2618c",
            Value::Null,
        )
        .await
        .unwrap();
        assert_eq!(cmd.from, "0xaa983ad2a0e0ed8ac639277f37be42f2a5d2618c");

        let cmd = resolve(
            &store,
            &format!("/contracts/0x{ADDR}/set"),
            "x=1&fly-from=hd-inst-wallet-1234",
            Value::Null,
        )
        .await
        .unwrap();
        assert_eq!(cmd.from, "hd-inst-wallet-1234");

        let err = resolve(&store, &format!("/contracts/0x{ADDR}/set"), "x=1&fly-from=badness", Value::Null)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("From Address"), "{err}");
    }

    #[tokio::test]
    async fn reserved_params_are_captured() {
        let dir = TempDir::new().unwrap();
        let store = store_with_contract(&dir);
        let cmd = resolve(
            &store,
            &format!("/contracts/0x{ADDR}/get"),
            "fly-blocknumber=12345&fly-transaction=0xtxhash",
            Value::Null,
        )
        .await
        .unwrap();
        assert_eq!(cmd.blocknumber, "12345");
        assert_eq!(cmd.transaction_hash, "0xtxhash");
        // Transaction lookup skips parameter marshaling.
        assert!(cmd.msg_params.is_empty());
    }
}
