mod bind;
pub mod client;
mod context;
mod error;
mod meta;
mod method;
pub mod server;
mod shape;
mod tag;

pub use bind::RequestParts;
pub use client::Transport;
pub use client::provide;
pub use client::provide_into;
pub use context::Context;
pub use error::BindingError;
pub use error::Channel;
pub use error::ErrorResp;
pub use error::RpcError;
pub use error::ShapeError;
pub use error::WiringError;
pub use meta::Field;
pub use meta::FieldKind;
pub use meta::Fields;
pub use meta::RouteDescriptor;
pub use meta::Service;
pub use meta::ServiceDescription;
pub use meta::VERBS;
pub use meta::parse;
pub use method::Arg;
pub use method::BoxFuture;
pub use method::Callable;
pub use method::ErrorSlot;
pub use method::Handler;
pub use method::Method;
pub use method::MethodSlot;
pub use method::Outgoing;
pub use method::Params;
pub use method::Payload;
pub use method::Reply;
pub use method::Returns;
pub use server::register;
pub use shape::Signature;
pub use shape::SignatureShape;
pub use shape::TypeSlot;
pub use tag::Tag;
