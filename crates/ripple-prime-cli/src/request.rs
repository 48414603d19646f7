/*
[INPUT]:  Request specs from CLI flags or a batch file
[OUTPUT]: Request descriptors and JSON results from the signed client
[POS]:    Command layer - one-shot and batch REST calls
[UPDATE]: When adding request options to the runner
*/

use std::collections::BTreeMap;

use anyhow::{Context, bail};
use ripple_prime_adapter::http::Method;
use ripple_prime_adapter::{
    FailurePolicy, PrimeClient, PrimeError, QueryValue, RequestDescriptor, replace_path_params,
    run_batch,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

/// One REST call as written in a batch file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RequestSpec {
    #[serde(default = "default_method")]
    pub method: String,
    /// Endpoint template, e.g. `/v1/accounts/{accountId}/balances`
    pub path: String,
    #[serde(default)]
    pub path_params: BTreeMap<String, String>,
    /// Query parameters in order; null values are skipped
    #[serde(default)]
    pub query: Vec<(String, Value)>,
    #[serde(default)]
    pub body: Option<Value>,
    /// Use the paginated form with this page size
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub paginate: bool,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Parse `key=value` from the command line
pub fn parse_query_pair(raw: &str) -> anyhow::Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => bail!("query parameter must look like key=value: {raw}"),
    }
}

fn query_value(value: &Value) -> anyhow::Result<Option<QueryValue>> {
    Ok(match value {
        Value::Null => None,
        Value::Bool(flag) => Some(QueryValue::from(*flag)),
        Value::String(text) => Some(QueryValue::from(text.as_str())),
        Value::Number(number) => match number.as_i64() {
            Some(int) => Some(QueryValue::from(int)),
            None => Some(QueryValue::from(number.as_f64().context("non-finite number")?)),
        },
        other => bail!("query values must be scalars, got {other}"),
    })
}

impl RequestSpec {
    pub fn descriptor(&self) -> anyhow::Result<RequestDescriptor> {
        let method = reqwest_method(&self.method)?;
        let params: Vec<(&str, &str)> = self
            .path_params
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        let path = replace_path_params(&self.path, &params);
        if path.contains('{') {
            bail!("unresolved path parameter in {path}");
        }

        let mut descriptor = RequestDescriptor::new(method, path);
        for (key, value) in &self.query {
            descriptor = descriptor.query_opt(key.clone(), query_value(value)?);
        }
        if let Some(body) = &self.body {
            descriptor = descriptor.body(body.clone());
        }
        Ok(descriptor)
    }

    /// Perform the call, paginated when requested
    pub async fn execute(&self, client: &PrimeClient) -> anyhow::Result<Value> {
        Ok(execute_spec(client, self).await?)
    }
}

fn reqwest_method(name: &str) -> anyhow::Result<Method> {
    let upper = name.to_ascii_uppercase();
    Method::from_bytes(upper.as_bytes())
        .with_context(|| format!("invalid HTTP method: {name}"))
}

async fn execute_spec(client: &PrimeClient, spec: &RequestSpec) -> ripple_prime_adapter::Result<Value> {
    let descriptor = spec
        .descriptor()
        .map_err(|err| PrimeError::Config(format!("{err:#}")))?;
    info!(method = %descriptor.method, path = %descriptor.path, "executing request");
    if spec.paginate || spec.limit.is_some() {
        let page = client.paginated_request(descriptor, spec.limit).await?;
        return Ok(serde_json::to_value(page)?);
    }
    client.request(descriptor).await
}

/// Load a YAML (or JSON) list of request specs
pub fn load_batch(path: &str) -> anyhow::Result<Vec<RequestSpec>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("read {path}"))?;
    let specs: Vec<RequestSpec> = serde_yaml::from_str(&content).context("parse batch file")?;
    Ok(specs)
}

/// Run every spec in order and collect one JSON result per item
pub async fn execute_batch(
    client: &PrimeClient,
    specs: &[RequestSpec],
    policy: FailurePolicy,
) -> anyhow::Result<Vec<Value>> {
    let outcomes = run_batch(specs, policy, |_, spec| execute_spec(client, spec)).await?;
    Ok(outcomes.iter().map(|outcome| outcome.to_json()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_query_pair() {
        assert_eq!(
            parse_query_pair("symbol=BTC/USD").unwrap(),
            ("symbol".to_string(), "BTC/USD".to_string())
        );
        assert_eq!(parse_query_pair("flag=").unwrap().1, "");
        assert!(parse_query_pair("novalue").is_err());
        assert!(parse_query_pair("=x").is_err());
    }

    #[test]
    fn test_descriptor_substitutes_and_skips_nulls() {
        let spec = RequestSpec {
            path: "/v1/accounts/{accountId}/balances".into(),
            path_params: BTreeMap::from([("accountId".to_string(), "ACC 1".to_string())]),
            query: vec![
                ("currency".into(), json!("USD")),
                ("asOf".into(), Value::Null),
                ("limit".into(), json!(10)),
            ],
            method: "get".into(),
            ..RequestSpec::default()
        };
        let descriptor = spec.descriptor().unwrap();
        assert_eq!(descriptor.method.as_str(), "GET");
        assert_eq!(
            descriptor.path_with_query(),
            "/v1/accounts/ACC%201/balances?currency=USD&limit=10"
        );
    }

    #[test]
    fn test_descriptor_rejects_unresolved_params() {
        let spec = RequestSpec {
            method: "GET".into(),
            path: "/v1/trading/orders/{orderId}".into(),
            ..RequestSpec::default()
        };
        assert!(spec.descriptor().is_err());
    }

    #[test]
    fn test_batch_yaml_shape() {
        let specs: Vec<RequestSpec> = serde_yaml::from_str(
            r#"
- path: /v1/status
- method: POST
  path: /v1/trading/orders
  body: {symbol: BTC/USD, side: buy}
- path: /v1/trading/orders
  query: [[status, open]]
  limit: 25
"#,
        )
        .unwrap();
        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].method, "GET");
        assert_eq!(specs[1].body.as_ref().unwrap()["side"], "buy");
        assert_eq!(specs[2].query[0], ("status".to_string(), json!("open")));
        assert_eq!(specs[2].limit, Some(25));
    }
}
