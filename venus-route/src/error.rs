use std::fmt;

use anyerror::AnyError;

/// A method signature that does not follow the
/// `([Context], [payload]) -> [result], [error]` convention.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("context must be first of two parameters")]
    ContextNotFirst,
    #[error("at most two parameters supported")]
    TooManyParams(usize),
    #[error("error must be second of two return values")]
    ErrorNotLast,
    #[error("at most two return values supported")]
    TooManyReturns(usize),
}

/// Raised while binding a service description to a router or a transport.
/// Always fatal: the service must not start with a partial route set.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WiringError {
    #[error("method `{method}`: {source}")]
    Shape {
        method: &'static str,
        #[source]
        source: ShapeError,
    },
    #[error("field `{0}` carries a route tag but is not callable")]
    NotCallable(&'static str),
    #[error("method `{method}` has invalid path `{path}`")]
    InvalidPath { method: &'static str, path: String },
    #[error("route {verb} {path} is declared twice")]
    DuplicateRoute { verb: http::Method, path: String },
    #[error("route {path} names its parameter both `{first}` and `{second}`")]
    ConflictingParam {
        path: String,
        first: String,
        second: String,
    },
    #[error("method `{method}` uses unsupported verb {verb}")]
    UnsupportedVerb {
        method: &'static str,
        verb: http::Method,
    },
}

/// Where a request value was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Body,
    Query,
    Uri,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Body => f.write_str("json body"),
            Channel::Query => f.write_str("query"),
            Channel::Uri => f.write_str("uri"),
        }
    }
}

/// Request decoding failed on one or more channels.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Default)]
#[error("{}", render(.failures))]
pub struct BindingError {
    failures: Vec<(Channel, String)>,
}

fn render(failures: &[(Channel, String)]) -> String {
    failures
        .iter()
        .map(|(channel, msg)| format!("bind {channel}: {msg}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl BindingError {
    pub fn new(channel: Channel, msg: impl ToString) -> Self {
        Self {
            failures: vec![(channel, msg.to_string())],
        }
    }

    pub fn failures(&self) -> &[(Channel, String)] {
        &self.failures
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn push(&mut self, channel: Channel, msg: impl ToString) {
        self.failures.push((channel, msg.to_string()));
    }
}

/// The error-carrying type of bound methods.
///
/// Server side, any error a method returns is written as a 500 envelope.
/// Client side, stubs report both remote failures and local transport
/// failures through it.
#[derive(thiserror::Error, Debug, Clone)]
pub enum RpcError {
    #[error("{0}")]
    Handler(String),
    #[error("{message}")]
    Remote { status: u16, message: String },
    #[error("http error: {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(AnyError),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("method is not implemented")]
    Unimplemented,
    #[error("context cancelled")]
    Cancelled,
}

impl RpcError {
    pub fn msg(msg: impl Into<String>) -> Self {
        RpcError::Handler(msg.into())
    }
}

/// Body of every 400/500 response.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorResp {
    pub error: String,
}

impl ErrorResp {
    pub fn new(err: &impl ToString) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}
