use bytes::Bytes;
use serde_json::Value;
use tracing::warn;

use crate::method::Payload;
use crate::{BindingError, Channel};

/// The parts of an inbound request a payload can be read from.
#[derive(Clone, Debug, Default)]
pub struct RequestParts {
    pub body: Bytes,
    pub query: Option<String>,
    pub params: Vec<(String, String)>,
}

impl RequestParts {
    /// Builds a payload starting from `T::default()`: the JSON body, then
    /// the query string, then the URI parameters each overwrite the fields
    /// they name. A channel that fails to decode is left out entirely.
    pub fn bind<T: Payload>(&self) -> Result<T, BindingError> {
        let mut merged = serde_json::to_value(T::default())
            .map_err(|e| BindingError::new(Channel::Body, e))?;
        let mut touched = false;
        let mut failed = BindingError::default();

        if !self.body.is_empty() {
            match bind_body::<T>(&merged, &self.body) {
                Ok(value) => {
                    merged = value;
                    touched = true;
                }
                Err(e) => {
                    warn!("try to bind with json failed: {e}");
                    failed.push(Channel::Body, e);
                }
            }
        }

        if let Some(query) = self.query.as_deref().filter(|q| !q.is_empty()) {
            let pairs = serde_urlencoded::from_str::<Vec<(String, String)>>(query)
                .map_err(|e| e.to_string())
                .and_then(|pairs| bind_pairs::<T>(&merged, &pairs));
            match pairs {
                Ok(value) => {
                    merged = value;
                    touched = true;
                }
                Err(e) => {
                    warn!("try to bind with query failed: {e}");
                    failed.push(Channel::Query, e);
                }
            }
        }

        if !self.params.is_empty() {
            match bind_pairs::<T>(&merged, &self.params) {
                Ok(value) => {
                    merged = value;
                    touched = true;
                }
                Err(e) => {
                    warn!("try to bind with uri failed: {e}");
                    failed.push(Channel::Uri, e);
                }
            }
        }

        if !failed.is_empty() {
            return Err(failed);
        }
        if !touched {
            return Ok(T::default());
        }
        serde_json::from_value(merged).map_err(|e| BindingError::new(Channel::Body, e))
    }
}

fn bind_body<T: Payload>(base: &Value, body: &[u8]) -> Result<Value, String> {
    let incoming: Value = serde_json::from_slice(body).map_err(|e| e.to_string())?;
    let merged = match (base, incoming) {
        (Value::Object(base), Value::Object(fields)) => {
            let mut base = base.clone();
            base.extend(fields);
            Value::Object(base)
        }
        (_, incoming) => incoming,
    };
    check::<T>(&merged)?;
    Ok(merged)
}

/// Sets each `key=value` pair on `base`. A value takes the JSON type of the
/// field it lands on; string fields keep it verbatim, anything else tries
/// the parsed JSON scalar before falling back to the string.
fn bind_pairs<T: Payload>(base: &Value, pairs: &[(String, String)]) -> Result<Value, String> {
    let Value::Object(base) = base else {
        return Err("parameters can only bind into a struct".into());
    };
    let mut fields = base.clone();
    for (key, raw) in pairs {
        let parsed = serde_json::from_str::<Value>(raw)
            .ok()
            .filter(|v| !v.is_object() && !v.is_array());
        let verbatim = Value::String(raw.clone());
        let candidates = match (fields.get(key), parsed) {
            (Some(Value::String(_)), _) | (_, None) => vec![verbatim],
            (_, Some(parsed)) => vec![parsed, verbatim],
        };

        let mut last = String::new();
        let mut accepted = false;
        for candidate in candidates {
            let prev = fields.insert(key.clone(), candidate);
            match check::<T>(&Value::Object(fields.clone())) {
                Ok(()) => {
                    accepted = true;
                    break;
                }
                Err(e) => {
                    last = format!("{key}: {e}");
                    match prev {
                        Some(prev) => fields.insert(key.clone(), prev),
                        None => fields.remove(key),
                    };
                }
            }
        }
        if !accepted {
            return Err(last);
        }
    }
    Ok(Value::Object(fields))
}

fn check<T: Payload>(value: &Value) -> Result<(), String> {
    serde_json::from_value::<T>(value.clone())
        .map(|_| ())
        .map_err(|e| e.to_string())
}
