use alloy::json_abi::Function;
use alloy::primitives::U256;
use serde_json::{json, Map, Value};

use crate::txn::{build_calldata, is_hex_address, revert_reason_from_return};
use crate::{EthError, EthRpc};

/// Normalize a block tag: the named tags pass through, a decimal or hex block
/// number becomes lowercase `0x`-hex, and the empty tag defaults to "latest".
pub fn normalize_block_tag(tag: &str) -> Result<String, EthError> {
    match tag {
        "" => Ok("latest".to_owned()),
        "latest" | "pending" | "earliest" => Ok(tag.to_owned()),
        t if t.starts_with("0x") => Ok(t.to_lowercase()),
        t => {
            let n = U256::from_str_radix(t, 10).map_err(|_| EthError::BadBlockNumber)?;
            Ok(format!("0x{n:x}"))
        }
    }
}

/// Perform a read-only `eth_call` against a method and decode the return
/// bytes through the output ABI.
pub async fn call_method(
    rpc: &dyn EthRpc,
    from: &str,
    to: &str,
    value: U256,
    function: &Function,
    params: &[Value],
    blocknumber: &str,
) -> Result<Map<String, Value>, EthError> {
    if !from.is_empty() && !is_hex_address(from) {
        return Err(EthError::BadFromAddress);
    }
    let (function, data) = build_calldata(function, params)?;
    let block_tag = normalize_block_tag(blocknumber)?;

    let mut args = Map::new();
    if !from.is_empty() {
        args.insert("from".into(), json!(from));
    }
    args.insert("to".into(), json!(to));
    args.insert("gasPrice".into(), json!("0x0"));
    args.insert("value".into(), json!(format!("0x{value:x}")));
    args.insert("data".into(), json!(format!("0x{}", hex::encode(&data))));

    let ret = rpc
        .call("eth_call", vec![Value::Object(args), json!(block_tag)])
        .await
        .map_err(|e| EthError::CallFailed(e.to_string()))?;

    let hex_ret = ret.as_str().unwrap_or_default();
    if hex_ret.starts_with("0x08c379a0") {
        return match revert_reason_from_return(&ret) {
            Some(reason) => Err(EthError::Reverted(reason)),
            None => Err(EthError::RevertDecodeFailed),
        };
    }
    let mut stripped = hex_ret.strip_prefix("0x").unwrap_or(hex_ret).to_owned();
    if stripped.len() % 2 == 1 {
        // Some nodes return odd-length quantities; left-pad as geth does.
        stripped.insert(0, '0');
    }
    let bytes = hex::decode(&stripped).map_err(|e| EthError::BadReturnData(e.to_string()))?;
    Ok(ep_abi::decode_return(&function.outputs, &bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_rpc::TestRpc;
    use rstest::rstest;

    const FROM: &str = "0xAA983AD2a0e0eD8ac639277F37be42F2A5d2618c";
    const TO: &str = "0x2b8c0ECc76d0759a8F50b2E14A6881367D805832";

    fn test_func() -> Function {
        serde_json::from_value(json!({
            "name": "testFunc",
            "inputs": [],
            "outputs": [{"name": "retval1", "type": "uint256"}],
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn calls_and_decodes_return_value() {
        let function: Function = serde_json::from_value(json!({
            "name": "testFunc",
            "inputs": [
                {"name": "param1", "type": "uint8"},
                {"name": "param2", "type": "int256"},
                {"name": "param3", "type": "string"},
                {"name": "param4", "type": "address"},
            ],
            "outputs": [{"name": "retval1", "type": "uint256"}],
        }))
        .unwrap();
        let params = vec![
            json!({"type": "uint8", "value": "123"}),
            json!({"type": "int256", "value": 123}),
            json!({"type": "string", "value": "abc"}),
            json!({"type": "address", "value": FROM}),
        ];
        // Odd-length return value, as some nodes produce.
        let rpc = TestRpc::with_results(vec![Ok(json!(
            "0x000000000000000000000000000000000000000000000000000000000000001"
        ))]);

        let res = call_method(&rpc, FROM, TO, U256::from(12345u64), &function, &params, "").await.unwrap();
        assert_eq!(res["retval1"], "1");

        let (method, args) = rpc.captured(0);
        assert_eq!(method, "eth_call");
        assert_eq!(args[0]["from"], FROM);
        assert_eq!(args[0]["to"], TO);
        assert_eq!(args[0]["gasPrice"], "0x0");
        assert_eq!(args[0]["value"], "0x3039");
        assert!(args[0].get("nonce").is_none());
        assert!(args[0].get("gas").is_none());
        assert_eq!(
            args[0]["data"],
            "0xe5537abb000000000000000000000000000000000000000000000000000000000000007b000000000000000000000000000000000000000000000000000000000000007b0000000000000000000000000000000000000000000000000000000000000080000000000000000000000000aa983ad2a0e0ed8ac639277f37be42f2a5d2618c00000000000000000000000000000000000000000000000000000000000000036162630000000000000000000000000000000000000000000000000000000000"
        );
        assert_eq!(args[1], "latest");
    }

    #[rstest]
    #[case("", "latest")]
    #[case("latest", "latest")]
    #[case("pending", "pending")]
    #[case("earliest", "earliest")]
    #[case("0x1234", "0x1234")]
    #[case("12345", "0x3039")]
    #[case("0", "0x0")]
    fn block_tags_normalize(#[case] tag: &str, #[case] want: &str) {
        assert_eq!(normalize_block_tag(tag).unwrap(), want);
    }

    #[test]
    fn invalid_block_tag_is_rejected() {
        let err = normalize_block_tag("ab2345").unwrap_err();
        assert_eq!(err.to_string(), "Invalid blocknumber. Failed to parse into big integer");
    }

    #[tokio::test]
    async fn rpc_failure_becomes_call_failed() {
        let rpc = TestRpc::with_results(vec![Err("pop")]);
        let err = call_method(&rpc, FROM, TO, U256::ZERO, &test_func(), &[], "").await.unwrap_err();
        assert_eq!(err.to_string(), "Call failed: pop");
    }

    #[tokio::test]
    async fn revert_reason_is_decoded() {
        let revert = "0x08c379a0\
            0000000000000000000000000000000000000000000000000000000000000020\
            0000000000000000000000000000000000000000000000000000000000000011\
            4d75707065747279206465746563746564000000000000000000000000000000";
        let rpc = TestRpc::with_results(vec![Ok(json!(revert))]);
        let err = call_method(&rpc, FROM, TO, U256::ZERO, &test_func(), &[], "").await.unwrap_err();
        assert_eq!(err.to_string(), "Muppetry detected");
    }

    #[tokio::test]
    async fn oversized_revert_length_is_clamped() {
        let revert = "0x08c379a0\
            0000000000000000000000000000000000000000000000000000000000000020\
            0000000000000000000000000000000000000000000000000000000001111111\
            4d75707065747279206465746563746564000000000000000000000000000000";
        let rpc = TestRpc::with_results(vec![Ok(json!(revert))]);
        let err = call_method(&rpc, FROM, TO, U256::ZERO, &test_func(), &[], "").await.unwrap_err();
        assert!(err.to_string().starts_with("Muppetry detected"), "{err}");
    }

    #[tokio::test]
    async fn malformed_revert_payload_is_reported() {
        let rpc = TestRpc::with_results(vec![Ok(json!("0x08c379a000000000000000000000000000000000"))]);
        let err = call_method(&rpc, FROM, TO, U256::ZERO, &test_func(), &[], "").await.unwrap_err();
        assert_eq!(err.to_string(), "EVM reverted. Failed to decode error message");
    }

    #[tokio::test]
    async fn bad_from_address_is_rejected() {
        let rpc = TestRpc::new();
        let err = call_method(&rpc, "badness", "", U256::ZERO, &test_func(), &[], "").await.unwrap_err();
        assert_eq!(err.to_string(), "Supplied value for 'from' is not a valid hex address");
    }
}
