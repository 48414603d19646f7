/*
[INPUT]:  Environment selection and path templates
[OUTPUT]: Base URLs, WebSocket URLs, concrete request paths
[POS]:    HTTP layer - static addressing data used by the transport
[UPDATE]: When hosts move or the runner needs another endpoint
*/

/// Production and sandbox addresses for one protocol
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentUrls {
    pub production: &'static str,
    pub sandbox: &'static str,
}

pub const BASE_URLS: EnvironmentUrls = EnvironmentUrls {
    production: "https://api.ripple.com/prime",
    sandbox: "https://sandbox.api.ripple.com/prime",
};

pub const WS_URLS: EnvironmentUrls = EnvironmentUrls {
    production: "wss://ws.ripple.com/prime",
    sandbox: "wss://sandbox.ws.ripple.com/prime",
};

pub const HEALTH: &str = "/v1/health";
pub const STATUS: &str = "/v1/status";
pub const UTILITY_PING: &str = "/v1/utility/ping";
pub const UTILITY_TIME: &str = "/v1/utility/time";
pub const ACCOUNT_BALANCES: &str = "/v1/accounts/{accountId}/balances";
pub const TRADING_ORDER: &str = "/v1/trading/orders/{orderId}";

/// Substitute `{key}` placeholders with percent-encoded values.
///
/// Only the first occurrence of each placeholder is replaced; placeholders
/// without a matching key are left untouched.
pub fn replace_path_params<K, V>(template: &str, params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut result = template.to_string();
    for (key, value) in params {
        let placeholder = format!("{{{}}}", key.as_ref());
        result = result.replacen(&placeholder, &urlencoding::encode(value.as_ref()), 1);
    }
    result
}
