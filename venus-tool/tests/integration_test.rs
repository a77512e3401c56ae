use std::sync::Arc;

use tracing::info;
use tracing_test::traced_test;
use venus_route::client::HttpTransport;
use venus_route::{Context, RpcError};
use venus_tool::server::{API_PREFIX, GatewayServer, router};
use venus_tool::service::api::{
    AddrOperateType, AddrState, AddrsOperateReq, Address, MsgId, MsgQueryReq, MsgSendReq,
    MsgState,
};
use venus_tool::service::{LocalChain, MemoryMessager};
use venus_tool::{GatewayApi, ServiceImpl};

async fn start() -> anyhow::Result<(GatewayServer, Arc<LocalChain>)> {
    let chain = Arc::new(LocalChain::new("localnet"));
    chain.set_balance("f0100", "1000").await;
    let service = Arc::new(ServiceImpl::new(
        chain.clone(),
        Arc::new(MemoryMessager::new()),
        vec!["f01".into()],
        vec!["f01000".into()],
    ));
    let server = GatewayServer::start("127.0.0.1:0", router(service.bind())?).await?;
    Ok((server, chain))
}

async fn client(server: &GatewayServer) -> anyhow::Result<GatewayApi> {
    let transport = HttpTransport::connect(server.url())
        .await?
        .with_version(API_PREFIX);
    Ok(venus_route::provide(Arc::new(transport))?)
}

#[traced_test]
#[tokio::test(flavor = "multi_thread")]
async fn gateway_round_trip() -> anyhow::Result<()> {
    let (server, chain) = start().await?;
    let api = client(&server).await?;
    let ctx = Context::background();

    chain.advance(5);
    assert_eq!(api.chain_head.call(ctx.clone()).await?.height, 5);
    assert_eq!(api.chain_network_name.call(ctx.clone()).await?, "localnet");
    assert_eq!(api.wallet_list.call(ctx.clone()).await?, vec!["f01".to_string()]);
    assert_eq!(api.miner_list.call(ctx.clone()).await?, vec!["f01000".to_string()]);

    info!("send");
    let req = MsgSendReq {
        from: "f01".into(),
        to: "f0100".into(),
        value: "10".into(),
        ..Default::default()
    };
    let id = api.msg_send.call(ctx.clone(), req.clone()).await?;
    assert_eq!(id, "msg-1");
    assert_eq!(api.msg_send.call(ctx.clone(), req).await?, "msg-2");

    info!("query through the dynamic route");
    let msg = api.msg.call(ctx.clone(), MsgId { id: "msg-2".into() }).await?;
    assert_eq!(msg.message.nonce, 1);
    assert_eq!(msg.method_name, "Send");

    let all = api.msg_query.call(ctx.clone(), MsgQueryReq::default()).await?;
    assert_eq!(all.len(), 2);
    let from_f01 = api
        .msg_query
        .call(
            ctx.clone(),
            MsgQueryReq {
                from: Some("f01".into()),
                nonce: 1,
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(from_f01[0].message.id, "msg-2");

    api.msg_mark_bad.call(ctx.clone(), MsgId { id: "msg-1".into() }).await?;
    let failed = api
        .msg_query
        .call(
            ctx.clone(),
            MsgQueryReq {
                is_failed: true,
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].message.state, MsgState::Failed);

    info!("addresses");
    let info = api
        .addr_info
        .call(ctx.clone(), Address { address: "f0100".into() })
        .await?;
    assert_eq!(info.actor.balance, "1000");
    api.addr_operate
        .call(
            ctx.clone(),
            AddrsOperateReq {
                address: "f01".into(),
                operate: AddrOperateType::Forbidden,
                ..Default::default()
            },
        )
        .await?;
    let addrs = api.addr_list.call(ctx).await?;
    assert_eq!(addrs.len(), 1);
    assert_eq!(addrs[0].address.state, AddrState::Forbidden);

    server.stop().await;
    Ok(())
}

#[traced_test]
#[tokio::test(flavor = "multi_thread")]
async fn business_errors_reach_the_client() -> anyhow::Result<()> {
    let (server, _) = start().await?;
    let api = client(&server).await?;
    let ctx = Context::background();

    let err = api
        .msg_send
        .call(
            ctx.clone(),
            MsgSendReq {
                to: "x".into(),
                ..Default::default()
            },
        )
        .await
        .expect_err("send without from should fail");
    match err {
        RpcError::Remote { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "no from");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(logs_contain("method `MsgSend` failed: no from"));

    let err = api
        .msg
        .call(ctx.clone(), MsgId { id: "msg-7".into() })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "message msg-7 not found");

    let err = api
        .addr_operate
        .call(
            ctx,
            AddrsOperateReq {
                address: "f09".into(),
                operate: AddrOperateType::Active,
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "address f09 not found");

    server.stop().await;
    Ok(())
}
