use alloy::dyn_abi::DynSolValue;
use alloy::json_abi::Param;
use alloy::primitives::{Address, Sign, B256, I256, U256};
use serde_json::Value;

use crate::{resolve_type, AbiError};

/// A parameter supplied in the self-describing `{"type": ..., "value": ...}`
/// form, used when the method ABI is reconstructed from the request itself.
#[derive(Clone, Debug)]
pub struct InlineParam {
    pub ty: String,
    pub value: Value,
}

/// Split an inline parameter object into its declared type and value.
///
/// The type must resolve to a known solidity type; the value may be anything
/// [`marshal_value`] accepts for that type (null is rejected there).
pub fn parse_inline_param(path: &str, v: &Value) -> Result<InlineParam, AbiError> {
    let obj = v.as_object().ok_or_else(|| AbiError::InlineMissingTypeValue { path: path.to_owned() })?;
    let (ty, value) = match (obj.get("type"), obj.get("value")) {
        (Some(ty), Some(value)) => (ty, value),
        _ => return Err(AbiError::InlineMissingTypeValue { path: path.to_owned() }),
    };
    let ty = ty.as_str().ok_or_else(|| AbiError::InlineTypeNotString { path: path.to_owned() })?;
    if resolve_type(ty, &[]).is_err() {
        return Err(AbiError::InlineBadType { path: path.to_owned(), ty: ty.to_owned() });
    }
    Ok(InlineParam { ty: ty.to_owned(), value: value.clone() })
}

/// Marshal the full parameter vector for a method. `method_desc` is the error
/// prefix, e.g. `Method 'set'`.
pub fn marshal_inputs(method_desc: &str, params: &[Param], values: &[Value]) -> Result<Vec<DynSolValue>, AbiError> {
    if params.len() != values.len() {
        return Err(AbiError::ArgCountMismatch {
            method: method_desc.to_owned(),
            want: params.len(),
            got: values.len(),
        });
    }
    params
        .iter()
        .zip(values)
        .enumerate()
        .map(|(i, (param, value))| {
            let path = format!("{method_desc} param {i}");
            marshal_value(&path, &param.ty, &param.components, value)
        })
        .collect()
}

/// Convert one JSON value to the strictly-typed ABI value for the declared
/// solidity type, recursing through arrays and tuples.
pub fn marshal_value(path: &str, ty: &str, components: &[Param], v: &Value) -> Result<DynSolValue, AbiError> {
    if v.is_null() {
        return Err(AbiError::NullValue { path: path.to_owned() });
    }

    let ty = ty.trim();
    if let Some(base) = ty.strip_suffix("[]") {
        return marshal_array(path, base, components, v, None);
    }
    if ty.ends_with(']') {
        if let Some(open) = ty.rfind('[') {
            if let Ok(size) = ty[open + 1..ty.len() - 1].parse::<usize>() {
                return marshal_array(path, &ty[..open], components, v, Some(size));
            }
        }
        return Err(AbiError::TypeNotSupported { ty: ty.to_owned() });
    }

    match ty {
        "tuple" => marshal_tuple(path, components, v),
        "bool" => marshal_bool(path, v),
        "address" => marshal_address(path, v),
        "string" => match v {
            Value::String(s) => Ok(DynSolValue::String(s.clone())),
            _ => Err(AbiError::NotString { path: path.to_owned() }),
        },
        "bytes" => marshal_bytes(path, v),
        "byte" => marshal_fixed_bytes(path, "byte", 1, v),
        _ => {
            if let Some(suffix) = ty.strip_prefix("bytes") {
                let size: usize = suffix.parse().map_err(|_| AbiError::TypeNotSupported { ty: ty.to_owned() })?;
                if size == 0 || size > 32 {
                    return Err(AbiError::TypeNotSupported { ty: ty.to_owned() });
                }
                return marshal_fixed_bytes(path, ty, size, v);
            }
            if ty.starts_with("uint") || ty.starts_with("int") {
                // Re-resolve to validate the bit width before converting.
                match resolve_type(ty, &[])? {
                    alloy::dyn_abi::DynSolType::Uint(bits) => return marshal_uint(path, ty, bits, v),
                    alloy::dyn_abi::DynSolType::Int(bits) => return marshal_int(path, ty, bits, v),
                    _ => unreachable!("integer prefixes resolve to integer types"),
                }
            }
            Err(AbiError::TypeNotSupported { ty: ty.to_owned() })
        }
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Render the supplied number or decimal string to canonical digits, without
/// interpreting it yet.
fn decimal_digits(path: &str, v: &Value) -> Result<String, AbiError> {
    match v {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Ok(u.to_string())
            } else if let Some(i) = n.as_i64() {
                Ok(i.to_string())
            } else {
                // Fractional JSON numbers cannot be represented as an integer.
                let f = n.as_f64().unwrap_or(f64::NAN);
                if f.is_finite() && f.fract() == 0.0 {
                    Ok(format!("{}", f as i128))
                } else {
                    Err(AbiError::BadNumber { path: path.to_owned() })
                }
            }
        }
        Value::String(s) => Ok(s.trim().to_owned()),
        _ => Err(AbiError::NotNumber { path: path.to_owned() }),
    }
}

fn marshal_uint(path: &str, ty: &str, bits: usize, v: &Value) -> Result<DynSolValue, AbiError> {
    let digits = decimal_digits(path, v)?;
    if digits.starts_with('-') {
        return Err(AbiError::NumberOutOfRange { path: path.to_owned(), ty: ty.to_owned() });
    }
    let value =
        U256::from_str_radix(&digits, 10).map_err(|_| AbiError::BadNumber { path: path.to_owned() })?;
    if bits < 256 && value.bit_len() > bits {
        return Err(AbiError::NumberOutOfRange { path: path.to_owned(), ty: ty.to_owned() });
    }
    Ok(DynSolValue::Uint(value, bits))
}

fn marshal_int(path: &str, ty: &str, bits: usize, v: &Value) -> Result<DynSolValue, AbiError> {
    let digits = decimal_digits(path, v)?;
    let (sign, magnitude) = match digits.strip_prefix('-') {
        Some(rest) => (Sign::Negative, rest),
        None => (Sign::Positive, digits.as_str()),
    };
    let abs =
        U256::from_str_radix(magnitude, 10).map_err(|_| AbiError::BadNumber { path: path.to_owned() })?;
    // Two's complement bounds: [-2^(bits-1), 2^(bits-1) - 1].
    let limit = U256::from(1) << (bits - 1);
    let in_range = match sign {
        Sign::Negative => abs <= limit,
        Sign::Positive => abs < limit,
    };
    if !in_range {
        return Err(AbiError::NumberOutOfRange { path: path.to_owned(), ty: ty.to_owned() });
    }
    let value = I256::checked_from_sign_and_abs(sign, abs)
        .ok_or_else(|| AbiError::NumberOutOfRange { path: path.to_owned(), ty: ty.to_owned() })?;
    Ok(DynSolValue::Int(value, bits))
}

fn marshal_bool(path: &str, v: &Value) -> Result<DynSolValue, AbiError> {
    match v {
        Value::Bool(b) => Ok(DynSolValue::Bool(*b)),
        // Any string other than (case-insensitive) "true" is false.
        Value::String(s) => Ok(DynSolValue::Bool(s.eq_ignore_ascii_case("true"))),
        _ => Err(AbiError::NotBool { path: path.to_owned() }),
    }
}

fn marshal_address(path: &str, v: &Value) -> Result<DynSolValue, AbiError> {
    let s = match v {
        Value::String(s) => s,
        _ => return Err(AbiError::NotAddress { path: path.to_owned() }),
    };
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    if stripped.len() != 40 {
        return Err(AbiError::BadAddress { path: path.to_owned() });
    }
    let bytes = hex::decode(stripped).map_err(|_| AbiError::BadAddress { path: path.to_owned() })?;
    Ok(DynSolValue::Address(Address::from_slice(&bytes)))
}

fn marshal_fixed_bytes(path: &str, ty: &str, size: usize, v: &Value) -> Result<DynSolValue, AbiError> {
    let s = match v {
        Value::String(s) => s,
        _ => return Err(AbiError::NotHex { path: path.to_owned() }),
    };
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(stripped).map_err(|_| AbiError::BadHex { path: path.to_owned() })?;
    if bytes.len() != size {
        return Err(AbiError::FixedBytesLength { path: path.to_owned(), ty: ty.to_owned(), got: bytes.len() });
    }
    let mut word = B256::ZERO;
    word[..size].copy_from_slice(&bytes);
    Ok(DynSolValue::FixedBytes(word, size))
}

fn marshal_bytes(path: &str, v: &Value) -> Result<DynSolValue, AbiError> {
    match v {
        Value::String(s) => {
            let stripped = s.strip_prefix("0x").unwrap_or(s);
            let bytes = hex::decode(stripped).map_err(|_| AbiError::BadHex { path: path.to_owned() })?;
            Ok(DynSolValue::Bytes(bytes))
        }
        Value::Array(entries) => {
            let mut bytes = Vec::with_capacity(entries.len());
            for entry in entries {
                bytes.push(marshal_byte_entry(path, entry)?);
            }
            Ok(DynSolValue::Bytes(bytes))
        }
        _ => Err(AbiError::NotHex { path: path.to_owned() }),
    }
}

fn marshal_byte_entry(path: &str, v: &Value) -> Result<u8, AbiError> {
    let n = match v {
        Value::Number(n) => n,
        _ => return Err(AbiError::BadByteEntry { path: path.to_owned() }),
    };
    let value = if let Some(i) = n.as_i64() {
        i as i128
    } else if let Some(f) = n.as_f64().filter(|f| f.fract() == 0.0) {
        f as i128
    } else {
        return Err(AbiError::BadByteEntry { path: path.to_owned() });
    };
    u8::try_from(value)
        .map_err(|_| AbiError::ByteOutOfRange { path: path.to_owned(), value: value.to_string() })
}

fn marshal_array(
    path: &str,
    elem_ty: &str,
    components: &[Param],
    v: &Value,
    fixed_size: Option<usize>,
) -> Result<DynSolValue, AbiError> {
    let entries = match v {
        Value::Array(entries) => entries,
        _ => return Err(AbiError::NotArray { path: path.to_owned() }),
    };
    if let Some(want) = fixed_size {
        if entries.len() != want {
            return Err(AbiError::FixedArrayLength { path: path.to_owned(), want, got: entries.len() });
        }
    }
    let values = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| marshal_value(&format!("{path}[{i}]"), elem_ty, components, entry))
        .collect::<Result<Vec<_>, _>>()?;
    match fixed_size {
        Some(_) => Ok(DynSolValue::FixedArray(values)),
        None => Ok(DynSolValue::Array(values)),
    }
}

fn marshal_tuple(path: &str, components: &[Param], v: &Value) -> Result<DynSolValue, AbiError> {
    let obj = match v {
        Value::Object(obj) => obj,
        _ => {
            return Err(AbiError::NotObject { path: path.to_owned(), supplied: json_type_name(v).to_owned() })
        }
    };
    let mut values = Vec::with_capacity(components.len());
    for component in components {
        let field = obj.get(&component.name).filter(|f| !f.is_null()).ok_or_else(|| {
            AbiError::TupleFieldMissing {
                path: path.to_owned(),
                field: component.name.clone(),
                ty: component.ty.clone(),
            }
        })?;
        values.push(marshal_value(
            &format!("{path}.{}", component.name),
            &component.ty,
            &component.components,
            field,
        )?);
    }
    Ok(DynSolValue::Tuple(values))
}
