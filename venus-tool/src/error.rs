use venus_route::{RpcError, WiringError};

#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    #[error("no from")]
    NoFrom,
    #[error("no sender indicated")]
    NoSender,
    #[error("message {0} not found")]
    MessageNotFound(String),
    #[error("address {0} not found")]
    AddressNotFound(String),
    #[error("address {0} is forbidden")]
    AddressForbidden(String),
    #[error("actor {0} not found")]
    ActorNotFound(String),
    #[error("param error: {0}")]
    InvalidArgument(String),
    #[error("repo error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config decode error: {0}")]
    ConfigDecode(#[from] toml::de::Error),
    #[error("config encode error: {0}")]
    ConfigEncode(#[from] toml::ser::Error),
    #[error("{0}")]
    Wiring(#[from] WiringError),
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl From<ToolError> for RpcError {
    fn from(value: ToolError) -> Self {
        match value {
            ToolError::Rpc(e) => e,
            _ => RpcError::Handler(value.to_string()),
        }
    }
}
