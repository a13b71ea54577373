use hyper::HeaderMap;
use url::form_urlencoded;

/// Query parameters, order-preserving so repeatable parameters keep every
/// value.
pub(crate) type QueryParams = Vec<(String, String)>;

pub(crate) fn parse_query(query: &str) -> QueryParams {
    form_urlencoded::parse(query.as_bytes()).into_owned().collect()
}

/// Reader for the reserved gateway control parameters.
///
/// Each parameter is taken from the query string under the short prefix
/// (`fly-from`) or from an HTTP header under the long prefix
/// (`x-firefly-from`). Both prefixes are configurable, with environment
/// overrides applied by the node at startup.
#[derive(Clone, Debug)]
pub struct ParamReader {
    pub prefix_short: String,
    pub prefix_long: String,
}

impl Default for ParamReader {
    fn default() -> Self {
        Self {
            prefix_short: std::env::var("ETHGATE_PREFIX_SHORT").unwrap_or_else(|_| "fly".to_owned()),
            prefix_long: std::env::var("ETHGATE_PREFIX_LONG").unwrap_or_else(|_| "firefly".to_owned()),
        }
    }
}

impl ParamReader {
    pub fn new(prefix_short: impl Into<String>, prefix_long: impl Into<String>) -> Self {
        Self { prefix_short: prefix_short.into(), prefix_long: prefix_long.into() }
    }

    pub(crate) fn get(&self, name: &str, query: &[(String, String)], headers: &HeaderMap) -> String {
        let query_key = format!("{}-{name}", self.prefix_short);
        if let Some((_, v)) = query.iter().find(|(k, _)| *k == query_key) {
            return v.clone();
        }
        let header_key = format!("x-{}-{name}", self.prefix_long);
        headers
            .get(&header_key)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_owned())
            .unwrap_or_default()
    }

    pub(crate) fn get_bool(&self, name: &str, query: &[(String, String)], headers: &HeaderMap) -> bool {
        self.get(name, query, headers).eq_ignore_ascii_case("true")
    }

    pub(crate) fn get_multi(&self, name: &str, query: &[(String, String)], headers: &HeaderMap) -> Vec<String> {
        let query_key = format!("{}-{name}", self.prefix_short);
        let mut values: Vec<String> =
            query.iter().filter(|(k, _)| *k == query_key).map(|(_, v)| v.clone()).collect();
        if values.is_empty() {
            let header_key = format!("x-{}-{name}", self.prefix_long);
            values.extend(
                headers.get_all(&header_key).iter().filter_map(|v| v.to_str().ok()).map(|v| v.to_owned()),
            );
        }
        values
    }
}

/// Undo the double URL-encoding some swagger UIs apply to base64 values.
/// Decoding turns `+` into a space, so spaces are folded back to `+`.
pub(crate) fn double_url_decode(s: &str) -> String {
    let decoded: String = form_urlencoded::parse(format!("v={s}").as_bytes())
        .find(|(k, _)| k == "v")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_else(|| s.to_owned());
    decoded.replace(' ', "+")
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::{HeaderName, HeaderValue};

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.append(k.parse::<HeaderName>().unwrap(), HeaderValue::from_str(v).unwrap());
        }
        map
    }

    #[test]
    fn query_wins_over_header() {
        let reader = ParamReader::new("fly", "firefly");
        let query = parse_query("fly-from=0x1234&other=x");
        let hdrs = headers(&[("x-firefly-from", "0x9999")]);
        assert_eq!(reader.get("from", &query, &hdrs), "0x1234");
        assert_eq!(reader.get("from", &[], &hdrs), "0x9999");
        assert_eq!(reader.get("from", &[], &HeaderMap::new()), "");
    }

    #[test]
    fn booleans_are_case_insensitive() {
        let reader = ParamReader::new("fly", "firefly");
        assert!(reader.get_bool("sync", &parse_query("fly-sync=TRUE"), &HeaderMap::new()));
        assert!(!reader.get_bool("sync", &parse_query("fly-sync=1"), &HeaderMap::new()));
    }

    #[test]
    fn multi_values_collect_every_repeat() {
        let reader = ParamReader::new("fly", "firefly");
        let query = parse_query("fly-privatefor=a&fly-privatefor=b");
        assert_eq!(reader.get_multi("privatefor", &query, &HeaderMap::new()), vec!["a", "b"]);

        let hdrs = headers(&[("x-firefly-privatefor", "c"), ("x-firefly-privatefor", "d")]);
        assert_eq!(reader.get_multi("privatefor", &[], &hdrs), vec!["c", "d"]);
    }

    #[test]
    fn double_decode_preserves_base64_plus() {
        assert_eq!(double_url_decode("oD76ZRgu6py%2FWKrsXbtF9%2B%2BMf1mxVxzq"), "oD76ZRgu6py/WKrsXbtF9++Mf1mxVxzq");
        assert_eq!(double_url_decode("abc+def"), "abc+def");
        assert_eq!(double_url_decode("plain"), "plain");
    }
}
