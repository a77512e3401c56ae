use std::net::SocketAddr;

use axum::Json;
use axum::Router;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use http::{HeaderValue, Method, StatusCode, header};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::ToolError;
use crate::service::GatewayApi;

pub const API_PREFIX: &str = "/api/v0";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `/version`, plus the gateway routes under [`API_PREFIX`], all behind
/// permissive CORS.
pub fn router(api: GatewayApi) -> Result<Router, ToolError> {
    let api = venus_route::register(Router::new(), api)?;
    Ok(Router::new()
        .route("/version", get(version))
        .nest(API_PREFIX, api)
        .layer(middleware::from_fn(cors)))
}

async fn version() -> Json<serde_json::Value> {
    Json(json!({ "Version": VERSION }))
}

async fn cors(req: Request, next: Next) -> Response {
    let mut resp = if req.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(req).await
    };
    let headers = resp.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    resp
}

/// A running daemon. Dropping it without [`GatewayServer::stop`] leaves the
/// server task running.
pub struct GatewayServer {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl GatewayServer {
    pub async fn start(listen_addr: &str, router: Router) -> Result<Self, ToolError> {
        let listener = TcpListener::bind(listen_addr).await?;
        let addr = listener.local_addr()?;
        let (shutdown, rx) = oneshot::channel::<()>();
        info!("start on {addr}");
        let task = tokio::spawn(async move {
            let res = axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await;
            if let Err(e) = res {
                error!("server error: {e}");
            }
        });
        Ok(Self {
            addr,
            shutdown,
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stops accepting and waits for in-flight requests.
    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            error!("server task failed: {e}");
        }
        info!("server stopped");
    }
}

#[cfg(test)]
mod test {
    use axum::body::Body;
    use http::{Request, StatusCode, header};
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::router;
    use crate::service::GatewayApi;

    async fn call(
        method: &str,
        uri: &str,
    ) -> anyhow::Result<(StatusCode, http::HeaderMap, String)> {
        let app = router(GatewayApi::default())?;
        let resp = app
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty())?)
            .await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
        Ok((status, headers, String::from_utf8(body.to_vec())?))
    }

    #[tokio::test]
    async fn version_route() -> anyhow::Result<()> {
        let (status, headers, body) = call("GET", "/version").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, format!(r#"{{"Version":"{}"}}"#, super::VERSION));
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        Ok(())
    }

    #[tokio::test]
    async fn preflight_is_answered() -> anyhow::Result<()> {
        let (status, headers, _) = call("OPTIONS", "/api/v0/msg/send").await?;
        assert_eq!(status, StatusCode::OK);
        assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
        Ok(())
    }

    #[tokio::test]
    async fn unbound_gateway_routes_nothing() -> anyhow::Result<()> {
        let (status, _, _) = call("GET", "/api/v0/chain/head").await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        Ok(())
    }
}
