use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::json_abi::{Function, Param};
use serde_json::{Map, Value};

use crate::{resolve_type, AbiError};

/// ABI-encode a parameter vector (no selector).
pub fn encode_params(values: Vec<DynSolValue>) -> Vec<u8> {
    DynSolValue::Tuple(values).abi_encode_params()
}

/// Build calldata for a method invocation: 4-byte selector followed by the
/// packed arguments.
pub fn encode_call(function: &Function, values: Vec<DynSolValue>) -> Vec<u8> {
    let mut data = function.selector().to_vec();
    data.extend(encode_params(values));
    data
}

/// Render a decoded ABI value as its JSON-friendly form: integers as decimal
/// strings, byte values and addresses as lowercase `0x`-hex, tuples as
/// objects keyed by the raw field names from `components`.
pub fn map_output(path: &str, ty: &str, components: &[Param], value: &DynSolValue) -> Result<Value, AbiError> {
    match value {
        DynSolValue::Bool(b) => Ok(Value::Bool(*b)),
        DynSolValue::Uint(u, _) => Ok(Value::String(u.to_string())),
        DynSolValue::Int(i, _) => Ok(Value::String(i.to_string())),
        DynSolValue::FixedBytes(word, size) => Ok(Value::String(format!("0x{}", hex::encode(&word[..*size])))),
        DynSolValue::Address(a) => Ok(Value::String(format!("0x{}", hex::encode(a.as_slice())))),
        DynSolValue::Bytes(b) => Ok(Value::String(format!("0x{}", hex::encode(b)))),
        DynSolValue::String(s) => Ok(Value::String(s.clone())),
        DynSolValue::Array(vals) | DynSolValue::FixedArray(vals) => {
            let elem_ty = element_type(ty);
            let rendered = vals
                .iter()
                .enumerate()
                .map(|(i, v)| map_output(&format!("{path}[{i}]"), elem_ty, components, v))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(rendered))
        }
        DynSolValue::Tuple(vals) => {
            if components.len() != vals.len() {
                return Err(AbiError::Unpack(format!(
                    "tuple for {path} has {} fields, ABI declares {}",
                    vals.len(),
                    components.len()
                )));
            }
            let mut obj = Map::new();
            for (component, v) in components.iter().zip(vals) {
                obj.insert(
                    component.name.clone(),
                    map_output(&format!("{path}.{}", component.name), &component.ty, &component.components, v)?,
                );
            }
            Ok(Value::Object(obj))
        }
        other => Err(AbiError::Unpack(format!("unsupported value for {path}: {other:?}"))),
    }
}

// "uint8[3]" / "uint8[]" both index with element type "uint8".
fn element_type(ty: &str) -> &str {
    if let Some(base) = ty.strip_suffix("[]") {
        return base;
    }
    match ty.rfind('[') {
        Some(open) if ty.ends_with(']') => &ty[..open],
        _ => ty,
    }
}

fn default_name(prefix: &str, declared: &str, index: usize) -> String {
    if !declared.is_empty() {
        declared.to_owned()
    } else if index == 0 {
        prefix.to_owned()
    } else {
        format!("{prefix}{index}")
    }
}

/// Decode an `eth_call` return payload through the declared outputs into a
/// JSON object. Unnamed outputs land under `output`, `output1`, ...
pub fn decode_return(outputs: &[Param], data: &[u8]) -> Result<Map<String, Value>, AbiError> {
    if outputs.is_empty() {
        if !data.is_empty() {
            return Err(AbiError::UnexpectedReturnData { data: hex::encode(data) });
        }
        return Ok(Map::new());
    }
    let types = outputs.iter().map(|p| resolve_type(&p.ty, &p.components)).collect::<Result<Vec<_>, _>>()?;
    let decoded = DynSolType::Tuple(types)
        .abi_decode_params(data)
        .map_err(|e| AbiError::Unpack(e.to_string()))?;
    let values = match decoded {
        DynSolValue::Tuple(values) => values,
        single => vec![single],
    };
    if values.len() != outputs.len() {
        return Err(AbiError::OutputCountMismatch { want: outputs.len(), got: values.len() });
    }
    let mut result = Map::new();
    for (i, (output, value)) in outputs.iter().zip(&values).enumerate() {
        let name = default_name("output", &output.name, i);
        result.insert(name.clone(), map_output(&name, &output.ty, &output.components, value)?);
    }
    Ok(result)
}

/// Decode submitted calldata back through a method's input ABI. The leading
/// 4 bytes must be the method's selector.
pub fn decode_inputs(function: &Function, calldata: &[u8]) -> Result<Map<String, Value>, AbiError> {
    if calldata.len() < 4 || calldata[..4] != function.selector()[..] {
        return Err(AbiError::SignatureMismatch);
    }
    let types =
        function.inputs.iter().map(|p| resolve_type(&p.ty, &p.components)).collect::<Result<Vec<_>, _>>()?;
    let decoded = DynSolType::Tuple(types)
        .abi_decode_params(&calldata[4..])
        .map_err(|e| AbiError::Unpack(e.to_string()))?;
    let values = match decoded {
        DynSolValue::Tuple(values) => values,
        single => vec![single],
    };
    if values.len() != function.inputs.len() {
        return Err(AbiError::OutputCountMismatch { want: function.inputs.len(), got: values.len() });
    }
    let mut result = Map::new();
    for (i, (input, value)) in function.inputs.iter().zip(&values).enumerate() {
        let name = default_name("input", &input.name, i);
        result.insert(name.clone(), map_output(&name, &input.ty, &input.components, value)?);
    }
    Ok(result)
}
