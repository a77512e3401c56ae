use std::any::TypeId;
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::bind::RequestParts;
use crate::client::{Transport, dispatch};
use crate::meta::RouteDescriptor;
use crate::shape::{Signature, TypeSlot};
use crate::{BindingError, Context, RpcError};

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

type Func<A, R> = Arc<dyn Fn(A) -> BoxFuture<R> + Send + Sync>;

/// Type-erased server side of a bound method.
pub type Handler = Arc<
    dyn Fn(Context, RequestParts) -> BoxFuture<Result<Reply, BindingError>>
        + Send
        + Sync,
>;

/// Any value that can travel as a request payload or a result.
pub trait Payload: Serialize + DeserializeOwned + Default + Send + 'static {}

impl<T> Payload for T where T: Serialize + DeserializeOwned + Default + Send + 'static
{}

/// What a method produced, ready to be written to the wire.
#[derive(Debug)]
pub enum Reply {
    Empty,
    Value(Value),
    Error(RpcError),
}

/// Request values and context pulled out of a client call.
#[derive(Debug, Default)]
pub struct Outgoing {
    pub ctx: Option<Context>,
    pub payload: Option<Value>,
}

/// A single parameter position: either the [`Context`] or a payload.
pub trait Arg: Sized + Send + 'static {
    fn slot() -> TypeSlot;

    fn extract(ctx: &Context, req: &RequestParts) -> Result<Self, BindingError>;

    fn export(self, out: &mut Outgoing) -> Result<(), RpcError>;
}

impl Arg for Context {
    fn slot() -> TypeSlot {
        TypeSlot::of::<Context>()
    }

    fn extract(ctx: &Context, _req: &RequestParts) -> Result<Self, BindingError> {
        Ok(ctx.clone())
    }

    fn export(self, out: &mut Outgoing) -> Result<(), RpcError> {
        out.ctx = Some(self);
        Ok(())
    }
}

impl<T: Payload> Arg for T {
    fn slot() -> TypeSlot {
        TypeSlot::of::<T>()
    }

    fn extract(_ctx: &Context, req: &RequestParts) -> Result<Self, BindingError> {
        req.bind::<T>()
    }

    fn export(self, out: &mut Outgoing) -> Result<(), RpcError> {
        let value = serde_json::to_value(&self)
            .map_err(|e| RpcError::Encode(e.to_string()))?;
        out.payload = Some(value);
        Ok(())
    }
}

/// The parameter list of a method, as a tuple of [`Arg`]s.
pub trait Params: Sized + Send + 'static {
    fn slots() -> Vec<TypeSlot>;

    fn extract(ctx: &Context, req: &RequestParts) -> Result<Self, BindingError>;

    fn export(self) -> Result<Outgoing, RpcError>;
}

impl Params for () {
    fn slots() -> Vec<TypeSlot> {
        vec![]
    }

    fn extract(_ctx: &Context, _req: &RequestParts) -> Result<Self, BindingError> {
        Ok(())
    }

    fn export(self) -> Result<Outgoing, RpcError> {
        Ok(Outgoing::default())
    }
}

impl<A1: Arg> Params for (A1,) {
    fn slots() -> Vec<TypeSlot> {
        vec![A1::slot()]
    }

    fn extract(ctx: &Context, req: &RequestParts) -> Result<Self, BindingError> {
        Ok((A1::extract(ctx, req)?,))
    }

    fn export(self) -> Result<Outgoing, RpcError> {
        let mut out = Outgoing::default();
        self.0.export(&mut out)?;
        Ok(out)
    }
}

impl<A1: Arg, A2: Arg> Params for (A1, A2) {
    fn slots() -> Vec<TypeSlot> {
        vec![A1::slot(), A2::slot()]
    }

    fn extract(ctx: &Context, req: &RequestParts) -> Result<Self, BindingError> {
        Ok((A1::extract(ctx, req)?, A2::extract(ctx, req)?))
    }

    fn export(self) -> Result<Outgoing, RpcError> {
        let mut out = Outgoing::default();
        self.0.export(&mut out)?;
        self.1.export(&mut out)?;
        Ok(out)
    }
}

// Three positions never classify; the impl exists so such a method can be
// declared and then rejected when the service is wired.
impl<A1: Arg, A2: Arg, A3: Arg> Params for (A1, A2, A3) {
    fn slots() -> Vec<TypeSlot> {
        vec![A1::slot(), A2::slot(), A3::slot()]
    }

    fn extract(ctx: &Context, req: &RequestParts) -> Result<Self, BindingError> {
        Ok((
            A1::extract(ctx, req)?,
            A2::extract(ctx, req)?,
            A3::extract(ctx, req)?,
        ))
    }

    fn export(self) -> Result<Outgoing, RpcError> {
        let mut out = Outgoing::default();
        self.0.export(&mut out)?;
        self.1.export(&mut out)?;
        self.2.export(&mut out)?;
        Ok(out)
    }
}

/// The error position of a `Result` return.
///
/// [`RpcError`] fills the error slot; [`Infallible`] declares a method with
/// a result and no error slot.
pub trait ErrorSlot: Sized + Send + 'static {
    fn slot() -> Option<TypeSlot>;

    fn into_rpc(self) -> RpcError;

    fn from_rpc(err: RpcError) -> Result<Self, RpcError>;
}

impl ErrorSlot for RpcError {
    fn slot() -> Option<TypeSlot> {
        Some(TypeSlot::of::<RpcError>())
    }

    fn into_rpc(self) -> RpcError {
        self
    }

    fn from_rpc(err: RpcError) -> Result<Self, RpcError> {
        Ok(err)
    }
}

impl ErrorSlot for Infallible {
    fn slot() -> Option<TypeSlot> {
        None
    }

    fn into_rpc(self) -> RpcError {
        match self {}
    }

    fn from_rpc(err: RpcError) -> Result<Self, RpcError> {
        Err(err)
    }
}

/// The return positions of a method.
pub trait Returns: Send + 'static {
    fn slots() -> Vec<TypeSlot>;

    fn into_reply(self) -> Reply;

    /// Rebuilds the return value from what the transport delivered.
    fn from_response(res: Result<Value, RpcError>) -> Self;
}

impl Returns for () {
    fn slots() -> Vec<TypeSlot> {
        vec![]
    }

    fn into_reply(self) -> Reply {
        Reply::Empty
    }

    fn from_response(res: Result<Value, RpcError>) -> Self {
        if let Err(e) = res {
            warn!("call failed with no error slot to report it: {e}");
        }
    }
}

fn is_unit<T: 'static>() -> bool {
    TypeId::of::<T>() == TypeId::of::<()>()
}

impl<T: Payload, E: ErrorSlot> Returns for Result<T, E> {
    fn slots() -> Vec<TypeSlot> {
        let mut slots = Vec::with_capacity(2);
        if !is_unit::<T>() {
            slots.push(TypeSlot::of::<T>());
        }
        slots.extend(E::slot());
        slots
    }

    fn into_reply(self) -> Reply {
        match self {
            Ok(_) if is_unit::<T>() => Reply::Empty,
            Ok(value) => match serde_json::to_value(&value) {
                Ok(value) => Reply::Value(value),
                Err(e) => Reply::Error(RpcError::Encode(e.to_string())),
            },
            Err(err) => Reply::Error(err.into_rpc()),
        }
    }

    fn from_response(res: Result<Value, RpcError>) -> Self {
        let decoded = res.and_then(|value| {
            serde_json::from_value::<T>(value)
                .map_err(|e| RpcError::Decode(e.to_string()))
        });
        match decoded {
            Ok(value) => Ok(value),
            Err(err) => match E::from_rpc(err) {
                Ok(err) => Err(err),
                Err(lost) => {
                    warn!("call failed with no error slot to report it: {lost}");
                    Ok(T::default())
                }
            },
        }
    }
}

/// Closures that can implement a method taking the parameter tuple `A`.
pub trait Callable<A, R>: Send + Sync + 'static {
    fn call(&self, args: A) -> BoxFuture<R>;
}

impl<F, Fut, R> Callable<(), R> for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    fn call(&self, _args: ()) -> BoxFuture<R> {
        Box::pin((self)())
    }
}

impl<F, Fut, R, A1> Callable<(A1,), R> for F
where
    F: Fn(A1) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    fn call(&self, (a1,): (A1,)) -> BoxFuture<R> {
        Box::pin((self)(a1))
    }
}

impl<F, Fut, R, A1, A2> Callable<(A1, A2), R> for F
where
    F: Fn(A1, A2) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    fn call(&self, (a1, a2): (A1, A2)) -> BoxFuture<R> {
        Box::pin((self)(a1, a2))
    }
}

impl<F, Fut, R, A1, A2, A3> Callable<(A1, A2, A3), R> for F
where
    F: Fn(A1, A2, A3) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    fn call(&self, (a1, a2, a3): (A1, A2, A3)) -> BoxFuture<R> {
        Box::pin((self)(a1, a2, a3))
    }
}

/// One callable field of a service description.
///
/// `A` is the parameter tuple and `R` the return type, e.g.
/// `Method<(Context, MsgSendReq), Result<String, RpcError>>`. A default
/// `Method` is unbound: the server skips it and calling it fails with
/// [`RpcError::Unimplemented`].
pub struct Method<A, R> {
    func: Option<Func<A, R>>,
}

impl<A, R> Default for Method<A, R> {
    fn default() -> Self {
        Self { func: None }
    }
}

impl<A, R> Clone for Method<A, R> {
    fn clone(&self) -> Self {
        Self {
            func: self.func.clone(),
        }
    }
}

impl<A, R> fmt::Debug for Method<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("bound", &self.func.is_some())
            .finish()
    }
}

impl<A: Params, R: Returns> Method<A, R> {
    pub fn new<F: Callable<A, R>>(f: F) -> Self {
        Self {
            func: Some(Arc::new(move |args: A| -> BoxFuture<R> { f.call(args) })),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.func.is_some()
    }

    pub fn type_signature() -> Signature {
        Signature::new(A::slots(), R::slots())
    }

    pub fn invoke(&self, args: A) -> BoxFuture<R> {
        match &self.func {
            Some(func) => func(args),
            None => Box::pin(async {
                R::from_response(Err(RpcError::Unimplemented))
            }),
        }
    }
}

impl<R: Returns> Method<(), R> {
    pub async fn call(&self) -> R {
        self.invoke(()).await
    }
}

impl<A1: Arg, R: Returns> Method<(A1,), R> {
    pub async fn call(&self, a1: A1) -> R {
        self.invoke((a1,)).await
    }
}

impl<A1: Arg, A2: Arg, R: Returns> Method<(A1, A2), R> {
    pub async fn call(&self, a1: A1, a2: A2) -> R {
        self.invoke((a1, a2)).await
    }
}

/// Object-safe view of a [`Method`] field used by both binders.
pub trait MethodSlot: Send + Sync {
    fn signature(&self) -> Signature;

    /// The server handler, or `None` when the field is unbound.
    fn handler(&self) -> Option<Handler>;

    /// Rebinds the field to a stub that calls `route` over `transport`.
    fn provide(
        &mut self,
        route: Arc<RouteDescriptor>,
        transport: Arc<dyn Transport>,
    );
}

impl<A: Params, R: Returns> MethodSlot for Method<A, R> {
    fn signature(&self) -> Signature {
        Self::type_signature()
    }

    fn handler(&self) -> Option<Handler> {
        let func = self.func.clone()?;
        let handler: Handler = Arc::new(
            move |ctx: Context,
                  req: RequestParts|
                  -> BoxFuture<Result<Reply, BindingError>> {
                let func = func.clone();
                Box::pin(async move {
                    let args = A::extract(&ctx, &req)?;
                    Ok(func(args).await.into_reply())
                })
            },
        );
        Some(handler)
    }

    fn provide(
        &mut self,
        route: Arc<RouteDescriptor>,
        transport: Arc<dyn Transport>,
    ) {
        self.func = Some(Arc::new(move |args: A| -> BoxFuture<R> {
            let route = route.clone();
            let transport = transport.clone();
            Box::pin(async move {
                R::from_response(dispatch(transport.as_ref(), &route, args).await)
            })
        }));
    }
}
