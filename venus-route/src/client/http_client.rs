use anyerror::AnyError;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::{debug, info};

use super::Transport;
use crate::{Context, ErrorResp, RpcError};

/// [`Transport`] over plain HTTP with JSON bodies.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base: String,
    prefix: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RpcError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| RpcError::Transport(AnyError::new(&e)))?;
        let base = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base,
            prefix: String::new(),
        })
    }

    /// Like [`HttpTransport::new`], but fails unless the daemon answers its
    /// version probe.
    pub async fn connect(base_url: impl Into<String>) -> Result<Self, RpcError> {
        let transport = Self::new(base_url)?;
        let version = transport.version().await?;
        info!("connected to {} ({version})", transport.base);
        Ok(transport)
    }

    /// Prefixes every call path, e.g. with `/api/v0`.
    pub fn with_version(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// `GET /version` on the daemon root, outside the version prefix.
    pub async fn version(&self) -> Result<Value, RpcError> {
        let resp = self
            .client
            .get(format!("{}/version", self.base))
            .send()
            .await
            .map_err(|e| RpcError::Transport(AnyError::new(&e)))?;
        read_response(resp).await
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn call(
        &self,
        _ctx: &Context,
        method: &http::Method,
        path: &str,
        payload: Option<Value>,
    ) -> Result<Value, RpcError> {
        let url = format!("{}{}{}", self.base, self.prefix, path);
        debug!("{method} {url}");
        let mut req = self.client.request(method.clone(), url);
        if let Some(payload) = payload {
            let in_query = *method == http::Method::GET || *method == http::Method::DELETE;
            match query_pairs(&payload).filter(|_| in_query) {
                Some(pairs) => req = req.query(&pairs),
                None => req = req.json(&payload),
            }
        }
        let resp = req
            .send()
            .await
            .map_err(|e| RpcError::Transport(AnyError::new(&e)))?;
        read_response(resp).await
    }
}

async fn read_response(resp: reqwest::Response) -> Result<Value, RpcError> {
    let status = resp.status();
    let body = resp
        .bytes()
        .await
        .map_err(|e| RpcError::Transport(AnyError::new(&e)))?;

    if !status.is_success() {
        return Err(match serde_json::from_slice::<ErrorResp>(&body) {
            Ok(envelope) => RpcError::Remote {
                status: status.as_u16(),
                message: envelope.error,
            },
            Err(_) => RpcError::Status(status.as_u16()),
        });
    }
    if body.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&body).map_err(|e| RpcError::Decode(e.to_string()))
}

/// A flat object of scalars as `key=value` pairs. Nulls are left out so the
/// server keeps the field's zero value.
fn query_pairs(payload: &Value) -> Option<Vec<(String, String)>> {
    let Value::Object(fields) = payload else {
        return None;
    };
    let mut pairs = Vec::with_capacity(fields.len());
    for (key, value) in fields {
        let value = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Array(_) | Value::Object(_) => return None,
        };
        pairs.push((key.clone(), value));
    }
    Some(pairs)
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::{HttpTransport, query_pairs};

    #[test]
    fn scalars_become_pairs() {
        let pairs = query_pairs(&json!({"from": "f01", "nonce": 3, "failed": true, "to": null}));
        assert_eq!(
            pairs,
            Some(vec![
                ("failed".to_string(), "true".to_string()),
                ("from".to_string(), "f01".to_string()),
                ("nonce".to_string(), "3".to_string()),
            ])
        );
        assert_eq!(query_pairs(&json!({"params": [1, 2]})), None);
        assert_eq!(query_pairs(&json!("7")), None);
    }

    #[test]
    fn url_parts_are_normalized() {
        let t = HttpTransport::new("http://127.0.0.1:1/").unwrap().with_version("/api/v0/");
        assert_eq!(t.base_url(), "http://127.0.0.1:1");
        assert_eq!(t.prefix, "/api/v0");
    }
}
