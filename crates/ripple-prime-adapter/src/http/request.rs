/*
[INPUT]:  Method, path, ordered query parameters, optional JSON body, extra headers
[OUTPUT]: Request descriptor with the exact query string and body bytes to sign
[POS]:    HTTP layer - per-call request description
[UPDATE]: When adding request options
*/

use std::fmt;

use reqwest::Method;
use serde::Serialize;

use crate::http::Result;

/// Scalar query parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Str(value) => f.write_str(value),
            QueryValue::Int(value) => write!(f, "{value}"),
            QueryValue::Float(value) => write!(f, "{value}"),
            QueryValue::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Str(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Str(value)
    }
}

impl From<&String> for QueryValue {
    fn from(value: &String) -> Self {
        QueryValue::Str(value.clone())
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Int(value)
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        QueryValue::Int(i64::from(value))
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Float(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

/// One REST call: consumed by [`PrimeClient::request`](crate::http::PrimeClient::request)
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, Option<QueryValue>)>,
    pub body: Option<serde_json::Value>,
    pub headers: Vec<(String, String)>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query.push((key.into(), Some(value.into())));
        self
    }

    /// Append a query parameter that is skipped when `None`
    pub fn query_opt<V: Into<QueryValue>>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.query.push((key.into(), value.map(Into::into)));
        self
    }

    /// Set or replace a query parameter, keeping its position when present
    pub fn set_query(mut self, key: &str, value: impl Into<QueryValue>) -> Self {
        let value = Some(value.into());
        match self.query.iter_mut().find(|(existing, _)| existing == key) {
            Some(entry) => entry.1 = value,
            None => self.query.push((key.to_string(), value)),
        }
        self
    }

    /// Attach a JSON body
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Percent-encoded query string in insertion order, absent values skipped.
    ///
    /// Empty when no parameter survives; otherwise starts with `?`.
    pub fn query_string(&self) -> String {
        let pairs: Vec<String> = self
            .query
            .iter()
            .filter_map(|(key, value)| {
                value.as_ref().map(|value| {
                    format!(
                        "{}={}",
                        urlencoding::encode(key),
                        urlencoding::encode(&value.to_string())
                    )
                })
            })
            .collect();

        if pairs.is_empty() {
            String::new()
        } else {
            format!("?{}", pairs.join("&"))
        }
    }

    /// Path plus query string, the form that is signed
    pub fn path_with_query(&self) -> String {
        format!("{}{}", self.path, self.query_string())
    }

    /// Serialized body, `None` when no body is attached
    pub fn body_string(&self) -> Result<Option<String>> {
        self.body
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_skips_absent_values_in_order() {
        let request = RequestDescriptor::get("/v1/trading/fills")
            .query("symbol", "BTC/USD")
            .query_opt::<&str>("startDate", None)
            .query("limit", 50u32)
            .query("includeFees", true);

        assert_eq!(
            request.path_with_query(),
            "/v1/trading/fills?symbol=BTC%2FUSD&limit=50&includeFees=true"
        );
    }

    #[test]
    fn test_query_all_absent_adds_nothing() {
        let request = RequestDescriptor::get("/v1/status").query_opt::<i64>("limit", None);
        assert_eq!(request.path_with_query(), "/v1/status");
    }

    #[test]
    fn test_set_query_replaces_in_place() {
        let request = RequestDescriptor::get("/v1/x")
            .query("limit", 10u32)
            .query("offset", 0i64)
            .set_query("limit", 100u32);
        assert_eq!(request.query_string(), "?limit=100&offset=0");
    }

    #[test]
    fn test_body_presence_is_distinguished() {
        let none = RequestDescriptor::post("/v1/orders");
        assert_eq!(none.body_string().unwrap(), None);

        let empty = RequestDescriptor::post("/v1/orders").body(json!({}));
        assert_eq!(empty.body_string().unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_key_is_encoded() {
        let request = RequestDescriptor::get("/v1/x").query("a b", "c&d");
        assert_eq!(request.query_string(), "?a%20b=c%26d");
    }
}
