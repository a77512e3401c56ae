#[cfg(feature = "http-client")]
mod http_client;

use serde_json::Value;
use tracing::debug;

use crate::meta::{RouteDescriptor, Service, resolve};
use crate::method::Params;
use crate::{Context, RpcError, WiringError};

#[cfg(feature = "http-client")]
pub use self::http_client::HttpTransport;

/// Performs one HTTP exchange on behalf of a client stub.
///
/// The transport owns connection handling, headers, the base URL and any
/// version prefix; stubs only hand it the verb, the route path and the
/// encoded payload.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn call(
        &self,
        ctx: &Context,
        method: &http::Method,
        path: &str,
        payload: Option<Value>,
    ) -> Result<Value, RpcError>;
}

/// Builds an `S` whose every routed method calls through `transport`.
pub fn provide<S: Service>(
    transport: std::sync::Arc<dyn Transport>,
) -> Result<S, WiringError> {
    let mut dest = S::default();
    provide_into(&mut dest, transport)?;
    Ok(dest)
}

/// Rebinds the routed methods of an existing `dest`. Fields without a route
/// tag keep whatever they held.
pub fn provide_into<S: Service>(
    dest: &mut S,
    transport: std::sync::Arc<dyn Transport>,
) -> Result<(), WiringError> {
    let mut fields = Default::default();
    dest.describe(&mut fields);
    for entry in resolve(fields, true)? {
        debug!("provide {}", entry.route);
        entry.slot.provide(entry.route, transport.clone());
    }
    Ok(())
}

pub(crate) async fn dispatch<A: Params>(
    transport: &dyn Transport,
    route: &RouteDescriptor,
    args: A,
) -> Result<Value, RpcError> {
    let out = args.export()?;
    let ctx = out.ctx.unwrap_or_else(Context::background);
    tokio::select! {
        res = transport.call(&ctx, &route.method, route.static_path(), out.payload) => res,
        _ = ctx.cancelled() => Err(RpcError::Cancelled),
    }
}
