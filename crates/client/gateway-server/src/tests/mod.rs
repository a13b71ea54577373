//! End-to-end handler tests: a real store, processor and dispatcher over a
//! recording RPC stub.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ec_eth::{DirectTxnProcessor, EthRpc, RpcError, TxnContext, TxnProcessor, TxnProcessorConf};
use ec_registry::{ContractStore, ContractStoreConf, FilesystemStore, HttpRegistry, RemoteRegistryConf};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Request, Response, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::{
    DirectDispatcher, GatewayConf, NullReceiptStore, ParamReader, RestGateway, SubscriptionManager,
};

const ADDR: &str = "2b8c0ecc76d0759a8f50b2e14a6881367d805832";
const FROM: &str = "0xAA983AD2a0e0eD8ac639277F37be42F2A5d2618c";

struct MockRpc {
    calls: Mutex<Vec<(String, Vec<Value>)>>,
    results: Mutex<VecDeque<Result<Value, String>>>,
}

impl MockRpc {
    fn with_results(results: Vec<Result<Value, &str>>) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(vec![]),
            results: Mutex::new(results.into_iter().map(|r| r.map_err(|e| e.to_owned())).collect()),
        })
    }

    fn captured(&self, i: usize) -> (String, Vec<Value>) {
        self.calls.lock().unwrap()[i].clone()
    }
}

#[async_trait]
impl EthRpc for MockRpc {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        self.calls.lock().unwrap().push((method.to_owned(), params));
        match self.results.lock().unwrap().pop_front() {
            Some(Ok(v)) => Ok(v),
            Some(Err(message)) => Err(RpcError::Server { code: -32000, message }),
            None => Ok(Value::Null),
        }
    }
}

/// Processor that accepts messages and never replies, for admission tests.
struct ParkedProcessor;

#[async_trait]
impl TxnProcessor for ParkedProcessor {
    async fn on_message(&self, _ctx: Arc<dyn TxnContext>) {
        std::future::pending::<()>().await;
    }
    async fn resolve_address(&self, from: &str) -> Result<String, ec_eth::EthError> {
        Ok(from.to_owned())
    }
}

struct Harness {
    gateway: Arc<RestGateway>,
    rpc: Arc<MockRpc>,
    dir: TempDir,
}

fn harness(rpc_results: Vec<Result<Value, &str>>) -> Harness {
    harness_opts(rpc_results, 10, false, None)
}

fn harness_opts(
    rpc_results: Vec<Result<Value, &str>>,
    max_in_flight: usize,
    park_processor: bool,
    sub_mgr: Option<Arc<dyn SubscriptionManager>>,
) -> Harness {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("abi_abi1.deploy.json"),
        json!({
            "abi": [
                {"type": "constructor", "inputs": [{"name": "initVal", "type": "uint256"}]},
                {"type": "function", "name": "set", "inputs": [{"name": "x", "type": "uint256"}], "outputs": []},
                {"type": "function", "name": "get", "inputs": [], "outputs": [{"name": "retVal", "type": "uint256"}], "stateMutability": "view"},
                {"type": "event", "name": "Changed", "inputs": [{"name": "from", "type": "address", "indexed": true}]},
            ],
            "compiled": "0x600160015560aa60005260206000f3",
        })
        .to_string(),
    )
    .unwrap();
    std::fs::write(
        dir.path().join(format!("contract_{ADDR}.instance.json")),
        json!({"address": ADDR, "abi": "abi1"}).to_string(),
    )
    .unwrap();

    let rr = Arc::new(HttpRegistry::new(RemoteRegistryConf::default(), None));
    let store = Arc::new(FilesystemStore::new(
        ContractStoreConf { storage_path: dir.path().to_path_buf(), ..Default::default() },
        rr.clone(),
    ));
    store.init().unwrap();

    let rpc = MockRpc::with_results(rpc_results);
    let processor: Arc<dyn TxnProcessor> = if park_processor {
        Arc::new(ParkedProcessor)
    } else {
        Arc::new(DirectTxnProcessor::new(rpc.clone(), TxnProcessorConf::default(), None))
    };
    let dispatcher =
        Arc::new(DirectDispatcher::new(max_in_flight, processor.clone(), Arc::new(NullReceiptStore)));

    let conf = GatewayConf { max_in_flight, params: ParamReader::new("fly", "firefly") };
    let gateway = Arc::new(RestGateway::new(
        &conf,
        store,
        rr,
        rpc.clone(),
        processor,
        dispatcher,
        sub_mgr,
    ));
    Harness { gateway, rpc, dir }
}

fn get(uri: &str) -> Request<Full<Bytes>> {
    Request::builder().method("GET").uri(uri).body(Full::new(Bytes::new())).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Full<Bytes>> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

fn body_json(response: &Response<String>) -> Value {
    serde_json::from_str(response.body()).unwrap()
}

#[tokio::test]
async fn deploy_via_gateway_sync_returns_the_receipt() {
    let deployed = "de36a3cf64b0e1ccb10a9db0a8290c7e2cbce2a9";
    let h = harness(vec![
        Ok(json!("0xtxhash")),
        Ok(json!({
            "blockNumber": "0xa",
            "status": "0x1",
            "contractAddress": format!("0x{deployed}"),
            "gasUsed": "0x5208",
        })),
    ]);

    let res = h
        .gateway
        .handle(post(
            &format!("/abis/abi1?fly-sync=true&fly-from={FROM}&fly-gas=456&fly-gasprice=789"),
            json!({"initVal": "999999"}),
        ))
        .await;

    let (method, args) = h.rpc.captured(0);
    assert_eq!(method, "eth_sendTransaction");
    assert_eq!(args[0]["gas"], "0x1c8");
    assert_eq!(args[0]["gasPrice"], "0x315");
    assert_eq!(args[0]["from"], FROM.to_lowercase());
    let data = args[0]["data"].as_str().unwrap();
    assert!(data.ends_with("00000000000000000000000000000000000000000000000000000000000f423f"), "{data}");

    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(&res);
    assert_eq!(body["blockNumber"], "10");
    assert_eq!(body["headers"]["type"], "TransactionSuccess");

    // Post-deploy hook stored the new instance against the ABI.
    let instance_file = h.dir.path().join(format!("contract_{deployed}.instance.json"));
    let instance: Value = serde_json::from_slice(&std::fs::read(instance_file).unwrap()).unwrap();
    assert_eq!(instance["abi"], "abi1");
}

#[tokio::test]
async fn constant_method_call_decodes_the_return() {
    let h = harness(vec![Ok(json!(
        "0x0000000000000000000000000000000000000000000000000000000000000001"
    ))]);

    let res = h.gateway.handle(get(&format!("/contracts/0x{ADDR}/get"))).await;

    let (method, args) = h.rpc.captured(0);
    assert_eq!(method, "eth_call");
    assert_eq!(args[0]["to"], format!("0x{ADDR}"));
    assert_eq!(args[1], "latest");
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(&res)["retVal"], "1");
}

#[tokio::test]
async fn revert_reason_is_surfaced_as_the_error() {
    let h = harness(vec![Ok(json!(
        "0x08c379a0\
         0000000000000000000000000000000000000000000000000000000000000020\
         0000000000000000000000000000000000000000000000000000000000000011\
         4d75707065747279206465746563746564000000000000000000000000000000"
    ))]);

    let res = h.gateway.handle(get(&format!("/contracts/0x{ADDR}/get"))).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(&res)["error"], "Muppetry detected");
}

#[tokio::test]
async fn mixed_privacy_fields_are_rejected() {
    let h = harness(vec![]);
    let res = h
        .gateway
        .handle(post(
            &format!(
                "/contracts/0x{ADDR}/set?fly-from={FROM}&fly-privatefor=X&fly-privacygroupid=Y"
            ),
            json!({"x": "1"}),
        ))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(&res)["error"],
        "'fly-privatefor' and 'fly-privacygroupid' are mutually exclusive"
    );
}

#[tokio::test]
async fn async_send_is_accepted_then_capped() {
    let h = harness_opts(vec![], 1, true, None);

    let res = h
        .gateway
        .handle(post(&format!("/contracts/0x{ADDR}/set?fly-from={FROM}"), json!({"x": "1"})))
        .await;
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    let body = body_json(&res);
    assert_eq!(body["sent"], true);
    assert!(body["id"].as_str().is_some());

    let res = h
        .gateway
        .handle(post(&format!("/contracts/0x{ADDR}/set?fly-from={FROM}"), json!({"x": "2"})))
        .await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_json(&res)["error"], "Too many messages currently in flight");
}

#[tokio::test]
async fn writes_require_a_from_address() {
    let h = harness(vec![]);
    let res =
        h.gateway.handle(post(&format!("/contracts/0x{ADDR}/set"), json!({"x": "1"}))).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(&res)["error"],
        "Please specify a valid address in the 'fly-from' query string parameter or 'x-firefly-from' HTTP header"
    );
}

#[tokio::test]
async fn explicit_call_forces_a_read_of_a_writable_method() {
    let h = harness(vec![Ok(json!("0x"))]);
    let res = h
        .gateway
        .handle(post(&format!("/contracts/0x{ADDR}/set?fly-call=true"), json!({"x": "1"})))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(h.rpc.captured(0).0, "eth_call");
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let h = harness(vec![]);
    let res = h.gateway.handle(get("/nope")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = h.gateway.handle(get(&format!("/contracts/0x{ADDR}/missing"))).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(&res)["error"],
        "Method or Event 'missing' is not declared in this contract"
    );
}

#[tokio::test]
async fn transaction_lookup_decodes_the_input() {
    // set(42): selector + uint256.
    let set_calldata = {
        let function: alloy::json_abi::Function = serde_json::from_value(json!({
            "name": "set",
            "inputs": [{"name": "x", "type": "uint256"}],
            "outputs": [],
        }))
        .unwrap();
        let args = vec![ep_abi::marshal_value("t", "uint256", &[], &json!(42)).unwrap()];
        format!("0x{}", hex::encode(ep_abi::encode_call(&function, args)))
    };
    let h = harness(vec![Ok(json!({
        "hash": "0x2222222222222222222222222222222222222222222222222222222222222222",
        "blockNumber": "0xa",
        "input": set_calldata,
    }))]);

    let res = h
        .gateway
        .handle(get(&format!("/contracts/0x{ADDR}/set?fly-transaction=0x2222")))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(&res);
    assert_eq!(body["blockNumber"], "10");
    assert_eq!(body["inputArgs"]["x"], "42");
}

struct MockSubMgr;

#[async_trait]
impl SubscriptionManager for MockSubMgr {
    async fn add_subscription(
        &self,
        address: Option<alloy::primitives::Address>,
        _location: &ec_registry::ABILocation,
        event: &alloy::json_abi::Event,
        stream_id: &str,
        _from_block: &str,
        _name: &str,
    ) -> anyhow::Result<Value> {
        Ok(json!({
            "id": "sub1",
            "event": event.name,
            "stream": stream_id,
            "address": address.map(|a| format!("0x{}", hex::encode(a))),
        }))
    }
}

#[tokio::test]
async fn event_subscription_requires_support_and_a_stream() {
    let h = harness(vec![]);
    let res = h
        .gateway
        .handle(post(&format!("/contracts/0x{ADDR}/Changed/subscribe"), json!({"stream": "es1"})))
        .await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body_json(&res)["error"], "Event support is not configured on this gateway");

    let h = harness_opts(vec![], 10, false, Some(Arc::new(MockSubMgr)));
    let res = h
        .gateway
        .handle(post(&format!("/contracts/0x{ADDR}/Changed/subscribe"), json!({})))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(&res)["error"], "Must supply a 'stream' parameter in the body or query");

    let res = h
        .gateway
        .handle(post(&format!("/contracts/0x{ADDR}/Changed/subscribe"), json!({"stream": "es1"})))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(&res);
    assert_eq!(body["event"], "Changed");
    assert_eq!(body["address"], format!("0x{ADDR}"));
}
