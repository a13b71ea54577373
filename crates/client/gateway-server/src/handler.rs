use std::sync::Arc;

use alloy::primitives::{Address, U256};
use ec_eth::{call_method, get_transaction_info, EthRpc, TxnProcessor};
use ec_registry::{is_remote, ContractStore, RemoteRegistry};
use ep_messages::{
    new_message_id, Quantity, SendTransaction, TransactionCommon, TransactionReceipt,
    MSG_TYPE_DEPLOY_CONTRACT, MSG_TYPE_SEND_TRANSACTION,
};
use http_body_util::BodyExt;
use hyper::body::Body;
use hyper::http::request::Parts;
use hyper::{HeaderMap, Method, Request, Response, StatusCode};
use serde_json::Value;

use crate::dispatcher::AsyncDispatcher;
use crate::helpers::{error_response, json_response, yaml_or_json_payload};
use crate::params::{double_url_decode, parse_query, ParamReader};
use crate::resolver::{is_constant, resolve_params, RestCmd};
use crate::responder::{SyncDispatcher, SyncReply, SyncResponder};
use crate::router::{match_route, RouteMatch};
use crate::subscription::SubscriptionManager;
use crate::GatewayError;

#[derive(Clone, Debug, Default)]
pub struct GatewayConf {
    /// Maximum concurrently in-flight async messages; zero selects the
    /// dispatcher default of 10.
    pub max_in_flight: usize,
    /// Reserved-parameter prefixes (`fly-*` query params, `x-firefly-*`
    /// headers by default).
    pub params: ParamReader,
}

/// The REST to messages translation layer, dispatching resolved commands to
/// the node, the sync dispatcher or the async dispatcher.
pub struct RestGateway {
    params: ParamReader,
    store: Arc<dyn ContractStore>,
    rr: Arc<dyn RemoteRegistry>,
    rpc: Arc<dyn EthRpc>,
    processor: Arc<dyn TxnProcessor>,
    async_dispatcher: Arc<dyn AsyncDispatcher>,
    sync_dispatcher: SyncDispatcher,
    sub_mgr: Option<Arc<dyn SubscriptionManager>>,
}

impl RestGateway {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        conf: &GatewayConf,
        store: Arc<dyn ContractStore>,
        rr: Arc<dyn RemoteRegistry>,
        rpc: Arc<dyn EthRpc>,
        processor: Arc<dyn TxnProcessor>,
        async_dispatcher: Arc<dyn AsyncDispatcher>,
        sub_mgr: Option<Arc<dyn SubscriptionManager>>,
    ) -> Self {
        Self {
            params: conf.params.clone(),
            store,
            rr,
            rpc,
            processor: processor.clone(),
            async_dispatcher,
            sync_dispatcher: SyncDispatcher::new(processor),
            sub_mgr,
        }
    }

    pub async fn handle<B>(&self, req: Request<B>) -> Response<String>
    where
        B: Body,
        B::Error: std::fmt::Display,
    {
        let (parts, body) = req.into_parts();
        tracing::info!("--> {} {}", parts.method, parts.uri);

        if parts.method != Method::GET && parts.method != Method::POST {
            return error_response(StatusCode::NOT_FOUND, "Not found");
        }
        let Some(route) = match_route(parts.uri.path()) else {
            return error_response(StatusCode::NOT_FOUND, "Not found");
        };
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                return error_response(StatusCode::BAD_REQUEST, &format!("Failed to read request body: {e}"))
            }
        };
        match self.process(&parts, route, &body).await {
            Ok(response) => {
                tracing::info!("<-- {} {} [{}]", parts.method, parts.uri, response.status());
                response
            }
            Err(e) => {
                tracing::info!("<-- {} {} [{}]", parts.method, parts.uri, e.status);
                e.into()
            }
        }
    }

    async fn process(
        &self,
        parts: &Parts,
        route: RouteMatch,
        body: &[u8],
    ) -> Result<Response<String>, GatewayError> {
        let query = parse_query(parts.uri.query().unwrap_or(""));
        let headers = &parts.headers;
        let body = yaml_or_json_payload(body).map_err(GatewayError::bad_request)?;
        let cmd =
            resolve_params(self.store.as_ref(), &self.params, &route, &query, headers, body).await?;

        if cmd.event.is_some() {
            self.subscribe_event(&cmd, &query).await
        } else if !cmd.transaction_hash.is_empty() {
            self.lookup_transaction(&cmd).await
        } else if cmd.is_deploy && parts.method != Method::POST {
            // Deployment routes are POST-only.
            Err(GatewayError::not_found("Not found"))
        } else if parts.method != Method::POST
            || cmd.method.as_ref().is_some_and(is_constant)
            || self.params.get_bool("call", &query, headers)
        {
            self.call_contract(&cmd).await
        } else if cmd.from.is_empty() {
            Err(GatewayError::bad_request(format!(
                "Please specify a valid address in the '{}-from' query string parameter or 'x-{}-from' HTTP header",
                self.params.prefix_short, self.params.prefix_long
            )))
        } else if cmd.is_deploy {
            self.deploy_contract(&cmd, &query, headers).await
        } else {
            self.send_transaction(&cmd, &query, headers).await
        }
    }

    fn fill_tx_common(
        &self,
        tx: &mut TransactionCommon,
        cmd: &RestCmd,
        msg_type: &str,
        query: &[(String, String)],
        headers: &HeaderMap,
    ) -> Result<(), GatewayError> {
        let id = self.params.get("id", query, headers);
        tx.headers.common.id = if id.is_empty() { new_message_id() } else { id };
        tx.headers.common.msg_type = msg_type.to_owned();
        tx.from = cmd.from.clone();
        tx.value = Quantity::new(cmd.value.clone());
        tx.gas = Quantity::new(self.params.get("gas", query, headers));
        tx.gas_price = Quantity::new(self.params.get("gasprice", query, headers));
        tx.nonce = Quantity::new(self.params.get("nonce", query, headers));

        tx.private_from = double_url_decode(&self.params.get("privatefrom", query, headers));
        tx.private_for = self
            .params
            .get_multi("privatefor", query, headers)
            .iter()
            .map(|v| double_url_decode(v))
            .collect();
        tx.privacy_group_id = double_url_decode(&self.params.get("privacygroupid", query, headers));
        if !tx.private_for.is_empty() && !tx.privacy_group_id.is_empty() {
            return Err(GatewayError::bad_request(format!(
                "'{0}-privatefor' and '{0}-privacygroupid' are mutually exclusive",
                self.params.prefix_short
            )));
        }
        Ok(())
    }

    async fn deploy_contract(
        &self,
        cmd: &RestCmd,
        query: &[(String, String)],
        headers: &HeaderMap,
    ) -> Result<Response<String>, GatewayError> {
        let mut msg = cmd.deploy_msg.contract.clone();
        // Reference to the original ABI flows through for registration.
        let abi_id = msg.tx.headers.common.id.clone();
        msg.tx.headers.abi_id = if abi_id.is_empty() { cmd.abi_location.name.clone() } else { abi_id };
        self.fill_tx_common(&mut msg.tx, cmd, MSG_TYPE_DEPLOY_CONTRACT, query, headers)?;
        msg.parameters = cmd.msg_params.clone();
        msg.register_as = self.params.get("register", query, headers);
        if !msg.register_as.is_empty() {
            self.store
                .check_name_available(&msg.register_as, is_remote(&msg.tx.headers.common))
                .await
                .map_err(|e| GatewayError::new(StatusCode::CONFLICT, e))?;
        }
        let msg = serde_json::to_value(&msg).map_err(GatewayError::server_error)?;
        self.dispatch(msg, query, headers).await
    }

    async fn send_transaction(
        &self,
        cmd: &RestCmd,
        query: &[(String, String)],
        headers: &HeaderMap,
    ) -> Result<Response<String>, GatewayError> {
        let mut msg = SendTransaction {
            method: cmd.method.clone(),
            to: cmd.addr.clone(),
            parameters: cmd.msg_params.clone(),
            ..Default::default()
        };
        self.fill_tx_common(&mut msg.tx, cmd, MSG_TYPE_SEND_TRANSACTION, query, headers)?;
        let msg = serde_json::to_value(&msg).map_err(GatewayError::server_error)?;
        self.dispatch(msg, query, headers).await
    }

    async fn dispatch(
        &self,
        msg: Value,
        query: &[(String, String)],
        headers: &HeaderMap,
    ) -> Result<Response<String>, GatewayError> {
        if self.params.get_bool("sync", query, headers) {
            let responder = Arc::new(SyncResponder::new());
            self.sync_dispatcher.dispatch_sync(msg, responder.clone()).await;
            let reply = responder.wait().await;
            self.render_sync_reply(reply).await
        } else {
            let ack = !self.params.get_bool("noack", query, headers);
            let immediate_receipt =
                self.params.get("acktype", query, headers).eq_ignore_ascii_case("receipt");
            let sent = self.async_dispatcher.dispatch_msg_async(msg, ack, immediate_receipt).await?;
            Ok(json_response(StatusCode::ACCEPTED, &sent))
        }
    }

    async fn render_sync_reply(&self, reply: SyncReply) -> Result<Response<String>, GatewayError> {
        match reply {
            SyncReply::Receipt(receipt) => {
                if receipt.contract_address.is_some() {
                    if let Err(e) = self.post_deploy(&receipt).await {
                        tracing::warn!("Failed to perform post-deploy processing: {e}");
                        return Ok(receipt_and_error_response(&receipt, &e.to_string()));
                    }
                }
                let status = if receipt.is_success() {
                    StatusCode::OK
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                Ok(json_response(status, &receipt))
            }
            SyncReply::Error(message) => Err(GatewayError::server_error(message)),
            SyncReply::ReceiptAndError { receipt, error } => {
                Ok(receipt_and_error_response(&receipt, &error))
            }
        }
    }

    /// After a successful deployment, bind the new instance: into the local
    /// store always, and into the remote registry when the ABI came from
    /// there and a registration name was supplied.
    async fn post_deploy(&self, receipt: &TransactionReceipt) -> anyhow::Result<()> {
        let Some(address) = receipt.contract_address else { return Ok(()) };
        let address = hex::encode(address);
        if is_remote(&receipt.headers.common) {
            if !receipt.register_as.is_empty() {
                self.rr.register_instance(&receipt.register_as, &format!("0x{address}")).await?;
            }
            return Ok(());
        }
        let abi_id = &receipt.headers.req_abi_id;
        if abi_id.is_empty() {
            anyhow::bail!("No ABI recorded for the deployed contract");
        }
        self.store.add_contract(&address, abi_id, &receipt.register_as)?;
        Ok(())
    }

    async fn call_contract(&self, cmd: &RestCmd) -> Result<Response<String>, GatewayError> {
        let from =
            self.processor.resolve_address(&cmd.from).await.map_err(GatewayError::server_error)?;
        let value = if cmd.value.is_empty() {
            U256::ZERO
        } else {
            U256::from_str_radix(&cmd.value, 10)
                .map_err(|_| GatewayError::bad_request("Could not parse ethvalue as a number"))?
        };
        let method = cmd.method.as_ref().expect("call path always has a method");
        let result = call_method(
            self.rpc.as_ref(),
            &from,
            &cmd.addr,
            value,
            method,
            &cmd.msg_params,
            &cmd.blocknumber,
        )
        .await
        .map_err(GatewayError::server_error)?;
        Ok(json_response(StatusCode::OK, &result))
    }

    async fn lookup_transaction(&self, cmd: &RestCmd) -> Result<Response<String>, GatewayError> {
        let mut info = get_transaction_info(self.rpc.as_ref(), &cmd.transaction_hash)
            .await
            .map_err(GatewayError::server_error)?;
        let method = cmd.method.as_ref().expect("lookup path always has a method");
        let calldata = info.input.clone().unwrap_or_default();
        let args =
            ep_abi::decode_inputs(method, &calldata).map_err(GatewayError::server_error)?;
        info.input_args = Some(args);
        Ok(json_response(StatusCode::OK, &info))
    }

    async fn subscribe_event(
        &self,
        cmd: &RestCmd,
        query: &[(String, String)],
    ) -> Result<Response<String>, GatewayError> {
        let Some(sub_mgr) = &self.sub_mgr else {
            return Err(GatewayError::new(
                StatusCode::METHOD_NOT_ALLOWED,
                "Event support is not configured on this gateway",
            ));
        };
        let stream = from_body_or_form(&cmd.body, query, "stream");
        if stream.is_empty() {
            return Err(GatewayError::bad_request(
                "Must supply a 'stream' parameter in the body or query",
            ));
        }
        let from_block = from_body_or_form(&cmd.body, query, "fromBlock");
        let name = from_body_or_form(&cmd.body, query, "name");
        let address = if cmd.addr.is_empty() {
            None
        } else {
            let bytes = hex::decode(cmd.addr.trim_start_matches("0x"))
                .map_err(|_| GatewayError::bad_request("Invalid address for subscription"))?;
            Some(Address::from_slice(&bytes))
        };
        let event = cmd.event.as_ref().expect("subscription path always has an event");
        let sub = sub_mgr
            .add_subscription(address, &cmd.abi_location, event, &stream, &from_block, &name)
            .await
            .map_err(GatewayError::bad_request)?;
        Ok(json_response(StatusCode::OK, &sub))
    }
}

fn from_body_or_form(
    body: &serde_json::Map<String, Value>,
    query: &[(String, String)],
    param: &str,
) -> String {
    if let Some(v) = body.get(param).and_then(|v| v.as_str()).filter(|v| !v.is_empty()) {
        return v.to_owned();
    }
    query.iter().find(|(k, _)| k == param).map(|(_, v)| v.clone()).unwrap_or_default()
}

fn receipt_and_error_response(receipt: &TransactionReceipt, error: &str) -> Response<String> {
    let mut body = match serde_json::to_value(receipt) {
        Ok(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };
    body.insert("error".to_owned(), Value::String(error.to_owned()));
    json_response(StatusCode::INTERNAL_SERVER_ERROR, &Value::Object(body))
}
