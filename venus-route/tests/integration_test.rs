use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use serde_json::json;
use tracing::info;
use tracing_test::traced_test;
use venus_route::client::HttpTransport;
use venus_route::{Context, Fields, Method, RpcError, Service, provide, register};

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
struct Filter {
    from: Option<String>,
    nonce: u64,
    failed: bool,
    label: String,
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
struct Batch {
    #[serde(rename = "To")]
    to: String,
    #[serde(rename = "From")]
    from: String,
    values: Vec<u64>,
    filter: Filter,
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
struct ItemReq {
    #[serde(rename = "ID")]
    id: String,
}

#[derive(Default)]
struct TestApi {
    head: Method<(Context,), Result<u64, RpcError>>,
    send: Method<(Context, Batch), Result<Batch, RpcError>>,
    list: Method<(Context, Filter), Result<Filter, RpcError>>,
    item: Method<(Context, ItemReq), Result<ItemReq, RpcError>>,
    remove: Method<(Context, Filter), Result<(), RpcError>>,
    absent: Method<(), Result<u64, RpcError>>,
}

impl Service for TestApi {
    fn describe<'a>(&'a mut self, fields: &mut Fields<'a>) {
        fields
            .method("Head", r#"GET:"/chain/head""#, &mut self.head)
            .method("Send", r#"POST:"/msg/send""#, &mut self.send)
            .method("List", r#"GET:"/msg/list""#, &mut self.list)
            .method("Item", r#"GET:"/item/:ID""#, &mut self.item)
            .method("Remove", r#"DELETE:"/msg/remove""#, &mut self.remove)
            .method("Absent", r#"GET:"/absent""#, &mut self.absent);
    }
}

fn backing() -> TestApi {
    TestApi {
        head: Method::new(|_ctx: Context| async { Ok(42) }),
        send: Method::new(|_ctx: Context, batch: Batch| async move {
            if batch.from.is_empty() {
                return Err(RpcError::msg("no from"));
            }
            Ok(batch)
        }),
        list: Method::new(|_ctx: Context, filter: Filter| async move { Ok(filter) }),
        item: Method::new(|_ctx: Context, req: ItemReq| async move { Ok(req) }),
        remove: Method::new(|_ctx: Context, filter: Filter| async move {
            if filter.nonce == 0 {
                return Err(RpcError::msg("nonce required"));
            }
            Ok(())
        }),
        ..Default::default()
    }
}

async fn start() -> anyhow::Result<String> {
    let api = register(Router::new(), backing())?;
    let app = Router::new()
        .route("/version", get(|| async { axum::Json(json!({"Version": "test"})) }))
        .nest("/api/v0", api);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            info!("server stopped: {e}");
        }
    });
    Ok(format!("http://{addr}"))
}

async fn client(url: &str) -> anyhow::Result<TestApi> {
    let transport = HttpTransport::connect(url).await?.with_version("/api/v0");
    Ok(provide(Arc::new(transport))?)
}

#[traced_test]
#[tokio::test(flavor = "multi_thread")]
async fn payloads_round_trip() -> anyhow::Result<()> {
    let url = start().await?;
    let client = client(&url).await?;
    let ctx = Context::background();

    info!("head");
    assert_eq!(client.head.call(ctx.clone()).await?, 42);

    info!("query payload");
    let filter = Filter {
        from: Some("f01".into()),
        nonce: 9,
        failed: true,
        label: "12".into(),
    };
    assert_eq!(client.list.call(ctx.clone(), filter.clone()).await?, filter);
    assert_eq!(
        client.list.call(ctx.clone(), Filter::default()).await?,
        Filter::default()
    );

    info!("body payload");
    let batch = Batch {
        to: "t01".into(),
        from: "t02".into(),
        values: vec![1, 2, 3],
        filter,
    };
    assert_eq!(client.send.call(ctx.clone(), batch.clone()).await?, batch);

    info!("dynamic route through its prefix");
    let item = ItemReq { id: "msg-3".into() };
    assert_eq!(client.item.call(ctx, item.clone()).await?, item);
    Ok(())
}

#[traced_test]
#[tokio::test(flavor = "multi_thread")]
async fn errors_cross_the_wire() -> anyhow::Result<()> {
    let url = start().await?;
    let client = client(&url).await?;
    let ctx = Context::background();

    let err = client
        .send
        .call(ctx.clone(), Batch { to: "x".into(), ..Default::default() })
        .await
        .expect_err("send without from should fail");
    info!("return err = {:?}", err);
    match err {
        RpcError::Remote { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "no from");
        }
        other => panic!("unexpected error {other:?}"),
    }

    let err = client.remove.call(ctx.clone(), Filter::default()).await.unwrap_err();
    assert_eq!(err.to_string(), "nonce required");
    client
        .remove
        .call(ctx, Filter { nonce: 1, ..Default::default() })
        .await?;

    let err = client.absent.call().await.unwrap_err();
    assert!(matches!(err, RpcError::Status(404)));
    assert!(logs_contain("method `Absent` is not implemented"));
    Ok(())
}

#[tokio::test]
async fn unreachable_daemon_fails_to_connect() {
    let err = HttpTransport::connect("http://127.0.0.1:9").await.unwrap_err();
    assert!(matches!(err, RpcError::Transport(_)));
}
