use alloy::dyn_abi::DynSolType;
use alloy::json_abi::Param;

use crate::AbiError;

/// Resolve a declared solidity type string (plus tuple components, when the
/// base type is `tuple`) into a [`DynSolType`].
///
/// The legacy `byte` alias is accepted as `bytes1`. Anything the gateway does
/// not handle maps to [`AbiError::TypeNotSupported`].
pub fn resolve_type(ty: &str, components: &[Param]) -> Result<DynSolType, AbiError> {
    let ty = ty.trim();
    if let Some(base) = ty.strip_suffix("[]") {
        return Ok(DynSolType::Array(Box::new(resolve_type(base, components)?)));
    }
    if ty.ends_with(']') {
        let open = ty.rfind('[').ok_or_else(|| AbiError::TypeNotSupported { ty: ty.to_owned() })?;
        let size: usize =
            ty[open + 1..ty.len() - 1].parse().map_err(|_| AbiError::TypeNotSupported { ty: ty.to_owned() })?;
        return Ok(DynSolType::FixedArray(Box::new(resolve_type(&ty[..open], components)?), size));
    }

    match ty {
        "tuple" => {
            let elems =
                components.iter().map(|c| resolve_type(&c.ty, &c.components)).collect::<Result<Vec<_>, _>>()?;
            Ok(DynSolType::Tuple(elems))
        }
        "bool" => Ok(DynSolType::Bool),
        "address" => Ok(DynSolType::Address),
        "string" => Ok(DynSolType::String),
        "bytes" => Ok(DynSolType::Bytes),
        "byte" => Ok(DynSolType::FixedBytes(1)),
        _ => {
            if let Some(suffix) = ty.strip_prefix("bytes") {
                let size: usize = suffix.parse().map_err(|_| AbiError::TypeNotSupported { ty: ty.to_owned() })?;
                if size == 0 || size > 32 {
                    return Err(AbiError::TypeNotSupported { ty: ty.to_owned() });
                }
                return Ok(DynSolType::FixedBytes(size));
            }
            if let Some(suffix) = ty.strip_prefix("uint") {
                return Ok(DynSolType::Uint(parse_bits(ty, suffix)?));
            }
            if let Some(suffix) = ty.strip_prefix("int") {
                return Ok(DynSolType::Int(parse_bits(ty, suffix)?));
            }
            Err(AbiError::TypeNotSupported { ty: ty.to_owned() })
        }
    }
}

fn parse_bits(ty: &str, suffix: &str) -> Result<usize, AbiError> {
    if suffix.is_empty() {
        return Ok(256);
    }
    let bits: usize = suffix.parse().map_err(|_| AbiError::TypeNotSupported { ty: ty.to_owned() })?;
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(AbiError::TypeNotSupported { ty: ty.to_owned() });
    }
    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_primitives() {
        assert_eq!(resolve_type("uint256", &[]).unwrap(), DynSolType::Uint(256));
        assert_eq!(resolve_type("uint", &[]).unwrap(), DynSolType::Uint(256));
        assert_eq!(resolve_type("int24", &[]).unwrap(), DynSolType::Int(24));
        assert_eq!(resolve_type("bytes4", &[]).unwrap(), DynSolType::FixedBytes(4));
        assert_eq!(resolve_type("byte", &[]).unwrap(), DynSolType::FixedBytes(1));
        assert_eq!(resolve_type("bool", &[]).unwrap(), DynSolType::Bool);
    }

    #[test]
    fn resolves_nested_arrays() {
        assert_eq!(
            resolve_type("uint8[3][]", &[]).unwrap(),
            DynSolType::Array(Box::new(DynSolType::FixedArray(Box::new(DynSolType::Uint(8)), 3)))
        );
    }

    #[test]
    fn rejects_unknown_types() {
        let err = resolve_type("function", &[]).unwrap_err();
        assert_eq!(err.to_string(), "Type 'function' is not yet supported");
        assert!(resolve_type("uint7", &[]).is_err());
        assert!(resolve_type("bytes33", &[]).is_err());
        assert!(resolve_type("badness", &[]).is_err());
    }
}
