use ec_registry::ABIType;

/// Extracted routing parameters, before any registry resolution.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct RouteMatch {
    pub abi_type: Option<ABIType>,
    /// `:abi`: local ABI UUID.
    pub abi_id: String,
    /// `:gateway_lookup` / `:instance_lookup`: remote registry identifier.
    pub lookup: String,
    /// `:address`: contract address, registered name, or (for the
    /// `subscribe` special case) an event name.
    pub address: String,
    /// `:method`: method or event name.
    pub method: String,
    /// `:subcommand`: trailing segment, e.g. `subscribe`.
    pub subcommand: String,
}

/// Match the gateway route table. Returns `None` for anything outside it.
///
///   /contracts/:address/:method[/:subcommand]
///   /abis/:abi[/:address/:method[/:subcommand]]
///   /instances/:instance_lookup/:method[/:subcommand]   (alias /i)
///   /gateways/:gateway_lookup[/:address/:method[/:subcommand]]  (alias /g)
pub(crate) fn match_route(path: &str) -> Option<RouteMatch> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();
    let mut m = RouteMatch::default();
    match segments.as_slice() {
        ["contracts", address, method] => {
            m.abi_type = Some(ABIType::LocalABI);
            m.address = (*address).to_owned();
            m.method = (*method).to_owned();
        }
        ["contracts", address, method, subcommand] => {
            m.abi_type = Some(ABIType::LocalABI);
            m.address = (*address).to_owned();
            m.method = (*method).to_owned();
            m.subcommand = (*subcommand).to_owned();
        }
        ["abis", abi] => {
            m.abi_type = Some(ABIType::LocalABI);
            m.abi_id = (*abi).to_owned();
        }
        ["abis", abi, address, method] => {
            m.abi_type = Some(ABIType::LocalABI);
            m.abi_id = (*abi).to_owned();
            m.address = (*address).to_owned();
            m.method = (*method).to_owned();
        }
        ["abis", abi, address, method, subcommand] => {
            m.abi_type = Some(ABIType::LocalABI);
            m.abi_id = (*abi).to_owned();
            m.address = (*address).to_owned();
            m.method = (*method).to_owned();
            m.subcommand = (*subcommand).to_owned();
        }
        ["instances" | "i", lookup, method] => {
            m.abi_type = Some(ABIType::RemoteInstance);
            m.lookup = (*lookup).to_owned();
            m.method = (*method).to_owned();
        }
        ["instances" | "i", lookup, method, subcommand] => {
            m.abi_type = Some(ABIType::RemoteInstance);
            m.lookup = (*lookup).to_owned();
            m.method = (*method).to_owned();
            m.subcommand = (*subcommand).to_owned();
        }
        ["gateways" | "g", lookup] => {
            m.abi_type = Some(ABIType::RemoteGateway);
            m.lookup = (*lookup).to_owned();
        }
        ["gateways" | "g", lookup, address, method] => {
            m.abi_type = Some(ABIType::RemoteGateway);
            m.lookup = (*lookup).to_owned();
            m.address = (*address).to_owned();
            m.method = (*method).to_owned();
        }
        ["gateways" | "g", lookup, address, method, subcommand] => {
            m.abi_type = Some(ABIType::RemoteGateway);
            m.lookup = (*lookup).to_owned();
            m.address = (*address).to_owned();
            m.method = (*method).to_owned();
            m.subcommand = (*subcommand).to_owned();
        }
        _ => return None,
    }
    Some(m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_the_route_table() {
        let m = match_route("/contracts/0x2b8c/get").unwrap();
        assert_eq!(m.abi_type, Some(ABIType::LocalABI));
        assert_eq!(m.address, "0x2b8c");
        assert_eq!(m.method, "get");

        let m = match_route("/abis/840b629f").unwrap();
        assert_eq!(m.abi_id, "840b629f");
        assert!(m.method.is_empty());

        let m = match_route("/abis/840b629f/Changed/subscribe").unwrap();
        assert_eq!(m.address, "Changed");
        assert_eq!(m.method, "subscribe");

        let m = match_route("/i/inst1/set").unwrap();
        assert_eq!(m.abi_type, Some(ABIType::RemoteInstance));
        assert_eq!(m.lookup, "inst1");

        let m = match_route("/gateways/gw1/0xabcd/set/subscribe").unwrap();
        assert_eq!(m.abi_type, Some(ABIType::RemoteGateway));
        assert_eq!(m.subcommand, "subscribe");

        assert!(match_route("/").is_none());
        assert!(match_route("/contracts").is_none());
        assert!(match_route("/other/things").is_none());
    }
}
