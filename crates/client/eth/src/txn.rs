use std::sync::Arc;

use alloy::consensus::TxLegacy;
use alloy::json_abi::{Function, Param};
use alloy::primitives::{Address, Bytes, TxKind, U256};
use ep_abi::AbiError;
use ep_messages::{DeployContract, Quantity, SendTransaction, TransactionCommon};
use serde_json::{json, Map, Value};

use crate::receipt::TxnReceipt;
use crate::{compile_contract, EthError, EthRpc};

/// Offline transaction signer. The HD-wallet client implements this; tests
/// substitute their own.
pub trait TxnSigner: Send + Sync {
    fn signer_type(&self) -> String;
    fn address(&self) -> Address;
    fn sign(&self, tx: &TxLegacy) -> anyhow::Result<Vec<u8>>;
}

/// Check a supplied string is a 20-byte hex address, with or without the
/// `0x` prefix.
pub fn is_hex_address(s: &str) -> bool {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    stripped.len() == 40 && stripped.bytes().all(|b| b.is_ascii_hexdigit())
}

fn parse_hex_address(s: &str) -> Option<Address> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    if stripped.len() != 40 {
        return None;
    }
    hex::decode(stripped).ok().map(|b| Address::from_slice(&b))
}

/// A single transaction owned by one handler invocation: calldata, parsed
/// numeric fields, privacy addressing and (optionally) an offline signer.
#[derive(Default)]
pub struct Txn {
    pub hash: String,
    pub receipt: TxnReceipt,
    pub node_assign_nonce: bool,
    pub private_from: String,
    pub private_for: Vec<String>,
    pub privacy_group_id: String,
    pub from: String,
    pub to: Option<String>,
    pub nonce: Option<u64>,
    pub gas: u64,
    pub gas_supplied: bool,
    pub gas_price: U256,
    pub value: U256,
    pub data: Vec<u8>,
    pub signer: Option<Arc<dyn TxnSigner>>,
}

impl std::fmt::Debug for Txn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Txn")
            .field("hash", &self.hash)
            .field("receipt", &self.receipt)
            .field("node_assign_nonce", &self.node_assign_nonce)
            .field("private_from", &self.private_from)
            .field("private_for", &self.private_for)
            .field("privacy_group_id", &self.privacy_group_id)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("nonce", &self.nonce)
            .field("gas", &self.gas)
            .field("gas_supplied", &self.gas_supplied)
            .field("gas_price", &self.gas_price)
            .field("value", &self.value)
            .field("data", &self.data)
            .field("signer", &self.signer.as_ref().map(|s| s.signer_type()))
            .finish()
    }
}

impl Txn {
    /// Build a constructor-deployment transaction. Requires precompiled
    /// bytecode + ABI, or Solidity source to hand to the external compiler.
    /// When the ABI declares no constructor, supplied parameters are ignored.
    pub fn deploy_contract(
        msg: &DeployContract,
        signer: Option<Arc<dyn TxnSigner>>,
    ) -> Result<Self, EthError> {
        let (compiled, abi) = if !msg.compiled.is_empty() && msg.abi.len() > 0 {
            (msg.compiled.to_vec(), msg.abi.clone())
        } else if !msg.solidity.is_empty() {
            let c = compile_contract(&msg.solidity, &msg.contract_name, &msg.compiler_version, &msg.evm_version)?;
            (c.compiled.to_vec(), c.abi)
        } else {
            return Err(EthError::MissingCompiledCodeOrSolidity);
        };

        let mut data = compiled;
        if let Some(constructor) = &abi.constructor {
            let (inputs, values) = effective_inputs("Constructor", &constructor.inputs, &msg.parameters)?;
            let args = ep_abi::marshal_inputs("Constructor", &inputs, &values)?;
            data.extend(ep_abi::encode_params(args));
        }

        let mut txn = Self::from_common(&msg.tx, signer)?;
        txn.data = data;
        Ok(txn)
    }

    /// Build a method-invocation transaction from a resolved ABI element, or
    /// from a method name plus inline `{type, value}` parameters.
    pub fn send_transaction(
        msg: &SendTransaction,
        signer: Option<Arc<dyn TxnSigner>>,
    ) -> Result<Self, EthError> {
        let function = match &msg.method {
            Some(m) if !m.name.is_empty() => m.clone(),
            None if !msg.method_name.is_empty() => Function {
                name: msg.method_name.clone(),
                inputs: vec![],
                outputs: vec![],
                state_mutability: Default::default(),
            },
            _ => return Err(EthError::MethodMissing),
        };
        let (_, data) = build_calldata(&function, &msg.parameters)?;

        let mut txn = Self::from_common(&msg.tx, signer)?;
        if !msg.to.is_empty() {
            if !is_hex_address(&msg.to) {
                return Err(EthError::BadToAddress);
            }
            txn.to = Some(msg.to.clone());
        }
        txn.data = data;
        Ok(txn)
    }

    fn from_common(tx: &TransactionCommon, signer: Option<Arc<dyn TxnSigner>>) -> Result<Self, EthError> {
        let mut txn = Txn { signer, ..Default::default() };
        if !tx.nonce.is_empty() {
            let nonce = tx
                .nonce
                .as_str()
                .parse::<u64>()
                .map_err(|_| EthError::BadNonce(tx.nonce.as_str().to_owned()))?;
            txn.nonce = Some(nonce);
        }
        txn.value = parse_quantity_u256(&tx.value).ok_or_else(|| EthError::BadValue(tx.value.to_string()))?;
        if !tx.gas.is_empty() {
            txn.gas =
                tx.gas.as_str().parse::<u64>().map_err(|_| EthError::BadGas(tx.gas.as_str().to_owned()))?;
            txn.gas_supplied = true;
        }
        txn.gas_price = parse_quantity_u256(&tx.gas_price)
            .ok_or_else(|| EthError::BadGasPrice(tx.gas_price.to_string()))?;

        // With a signer the wallet reference resolves to the signing address,
        // so there is no hex from to validate.
        if txn.signer.is_none() {
            if !is_hex_address(&tx.from) {
                return Err(EthError::BadFromAddress);
            }
            txn.from = tx.from.clone();
        }

        txn.private_from = tx.private_from.clone();
        txn.private_for = tx.private_for.clone();
        txn.privacy_group_id = tx.privacy_group_id.clone();
        Ok(txn)
    }

    /// Submit the transaction, estimating gas first when none was supplied.
    /// Returns the transaction hash.
    pub async fn send(&mut self, rpc: &dyn EthRpc) -> Result<String, EthError> {
        if !self.gas_supplied {
            self.calculate_gas(rpc).await?;
        }

        let result = if let Some(signer) = self.signer.clone() {
            if !self.private_from.is_empty() || !self.private_for.is_empty() || !self.privacy_group_id.is_empty()
            {
                return Err(EthError::PrivateSigningUnsupported(signer.signer_type()));
            }
            let tx = self.to_legacy()?;
            let raw = signer.sign(&tx).map_err(|e| EthError::Signer(e.to_string()))?;
            rpc.call("eth_sendRawTransaction", vec![json!(format!("0x{}", hex::encode(raw)))]).await?
        } else if !self.privacy_group_id.is_empty() {
            if self.private_from.is_empty() {
                return Err(EthError::OrionMissingPrivateFrom);
            }
            rpc.call("eea_sendTransaction", vec![self.to_send_args()]).await?
        } else {
            rpc.call("eth_sendTransaction", vec![self.to_send_args()]).await?
        };

        self.hash = result.as_str().unwrap_or_default().to_owned();
        tracing::info!("Sent transaction {}", self.hash);
        Ok(self.hash.clone())
    }

    async fn calculate_gas(&mut self, rpc: &dyn EthRpc) -> Result<(), EthError> {
        let args = self.to_send_args();
        match rpc.call("eth_estimateGas", vec![args.clone()]).await {
            Ok(estimate) => {
                self.gas = parse_quantity_u64(&estimate)?;
                Ok(())
            }
            Err(estimate_err) => {
                // Re-issue as a call: a revert reason beats an opaque
                // estimation failure.
                match rpc.call("eth_call", vec![args, json!("latest")]).await {
                    Err(call_err) => Err(EthError::CallFailed(call_err.to_string())),
                    Ok(ret) => {
                        if let Some(reason) = revert_reason_from_return(&ret) {
                            return Err(EthError::Reverted(reason));
                        }
                        Err(EthError::GasEstimationFailed(estimate_err.to_string()))
                    }
                }
            }
        }
    }

    /// JSON-RPC transaction object for `eth_sendTransaction` and friends.
    fn to_send_args(&self) -> Value {
        let mut obj = Map::new();
        let from = if self.from.is_empty() {
            self.signer.as_ref().map(|s| format!("0x{}", hex::encode(s.address()))).unwrap_or_default()
        } else {
            self.from.clone()
        };
        obj.insert("from".into(), json!(from));
        if let Some(to) = &self.to {
            obj.insert("to".into(), json!(to));
        }
        if !self.node_assign_nonce {
            if let Some(nonce) = self.nonce {
                obj.insert("nonce".into(), json!(format!("0x{nonce:x}")));
            }
        }
        obj.insert("gas".into(), json!(format!("0x{:x}", self.gas)));
        obj.insert("gasPrice".into(), json!(format!("0x{:x}", self.gas_price)));
        obj.insert("value".into(), json!(format!("0x{:x}", self.value)));
        obj.insert("data".into(), json!(format!("0x{}", hex::encode(&self.data))));
        if !self.private_from.is_empty() {
            obj.insert("privateFrom".into(), json!(self.private_from));
        }
        if !self.private_for.is_empty() {
            obj.insert("privateFor".into(), json!(self.private_for));
        }
        if !self.privacy_group_id.is_empty() {
            obj.insert("privacyGroupId".into(), json!(self.privacy_group_id));
        }
        Value::Object(obj)
    }

    fn to_legacy(&self) -> Result<TxLegacy, EthError> {
        let to = match &self.to {
            Some(s) => TxKind::Call(parse_hex_address(s).ok_or(EthError::BadToAddress)?),
            None => TxKind::Create,
        };
        Ok(TxLegacy {
            chain_id: None,
            nonce: self.nonce.unwrap_or_default(),
            gas_price: self.gas_price.min(U256::from(u128::MAX)).to::<u128>(),
            gas_limit: self.gas,
            to,
            value: self.value,
            input: Bytes::from(self.data.clone()),
        })
    }
}

/// A decimal quantity, defaulting to zero when absent.
fn parse_quantity_u256(q: &Quantity) -> Option<U256> {
    if q.is_empty() {
        return Some(U256::ZERO);
    }
    U256::from_str_radix(q.as_str(), 10).ok()
}

/// A JSON-RPC quantity result (`0x`-hex), tolerating null.
pub(crate) fn parse_quantity_u64(v: &Value) -> Result<u64, EthError> {
    match v {
        Value::Null => Ok(0),
        Value::Number(n) => n.as_u64().ok_or_else(|| EthError::BadReturnData(v.to_string())),
        Value::String(s) => {
            let stripped = s.strip_prefix("0x").unwrap_or(s);
            u64::from_str_radix(stripped, 16).map_err(|_| EthError::BadReturnData(s.clone()))
        }
        _ => Err(EthError::BadReturnData(v.to_string())),
    }
}

pub(crate) fn revert_reason_from_return(ret: &Value) -> Option<String> {
    let s = ret.as_str()?;
    if !s.starts_with("0x08c379a0") {
        return None;
    }
    let data = hex::decode(&s[2..]).ok()?;
    ep_abi::revert::decode_reason(&data)
}

/// Reconcile declared inputs with supplied parameters, expanding inline
/// `{type, value}` parameter objects into synthetic input declarations.
pub(crate) fn effective_inputs(
    method_desc: &str,
    declared: &[Param],
    params: &[Value],
) -> Result<(Vec<Param>, Vec<Value>), EthError> {
    let mut inputs = Vec::with_capacity(params.len());
    let mut values = Vec::with_capacity(params.len());
    for (i, p) in params.iter().enumerate() {
        let decl = declared.get(i);
        let declared_tuple = decl.is_some_and(|d| d.ty.starts_with("tuple"));
        if p.is_object() && !declared_tuple {
            let inline = ep_abi::parse_inline_param(&format!("Param {i}"), p)?;
            let name = decl.map(|d| d.name.clone()).unwrap_or_default();
            inputs.push(Param { ty: inline.ty, name, components: vec![], internal_type: None });
            values.push(inline.value);
        } else {
            let decl = decl.ok_or_else(|| arg_count_mismatch(method_desc, declared.len(), params.len()))?;
            inputs.push(decl.clone());
            values.push(p.clone());
        }
    }
    if params.len() < declared.len() {
        return Err(arg_count_mismatch(method_desc, declared.len(), params.len()));
    }
    Ok((inputs, values))
}

fn arg_count_mismatch(method_desc: &str, want: usize, got: usize) -> EthError {
    AbiError::ArgCountMismatch { method: method_desc.to_owned(), want, got }.into()
}

/// Marshal parameters against a method and produce the full calldata. The
/// returned function reflects any inline parameter types and is the one whose
/// outputs should be used for decoding.
pub(crate) fn build_calldata(function: &Function, params: &[Value]) -> Result<(Function, Vec<u8>), EthError> {
    if function.name.is_empty() {
        return Err(EthError::MethodMissing);
    }
    let desc = format!("Method '{}'", function.name);
    let (inputs, values) = effective_inputs(&desc, &function.inputs, params)?;
    let eff = Function {
        name: function.name.clone(),
        inputs,
        outputs: function.outputs.clone(),
        state_mutability: function.state_mutability,
    };
    let args = ep_abi::marshal_inputs(&desc, &eff.inputs, &values)?;
    let data = ep_abi::encode_call(&eff, args);
    Ok((eff, data))
}
