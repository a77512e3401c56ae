use std::error::Error;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use venus_route::Context;
use venus_route::client::HttpTransport;
use venus_tool::GatewayApi;
use venus_tool::ServiceImpl;
use venus_tool::cli::{
    AddrOperation, ChainOperation, ConnectionArgs, ListOperation, MsgOperation,
    RunArgs, ToolCommands, VenusToolCli,
};
use venus_tool::config::Repo;
use venus_tool::server::{API_PREFIX, GatewayServer, router};
use venus_tool::service::api::{
    AddrOperateType, AddrsOperateReq, Address, MsgId, MsgQueryReq, MsgSendReq,
};
use venus_tool::service::{LocalChain, MemoryMessager};

pub async fn start_server(
    repo: &str,
    options: RunArgs,
) -> Result<GatewayServer, Box<dyn Error>> {
    info!("use option {options:?}");
    let repo = Repo::open(repo)?;
    let mut config = repo.load_config()?;
    if let Some(listen) = options.listen {
        config.server.listen_addr = listen;
    }
    info!("use config {config:?}");

    let chain = Arc::new(LocalChain::new(config.chain.network_name.clone()));
    let service = Arc::new(ServiceImpl::new(
        chain,
        Arc::new(MemoryMessager::new()),
        config.wallets.clone(),
        config.miners.clone(),
    ));
    let router = router(service.bind())?;
    let server = GatewayServer::start(&config.server.listen_addr, router).await?;
    Ok(server)
}

pub async fn handle_cli(cli: VenusToolCli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        ToolCommands::Run(args) => handle_server(&cli.repo, args).await,
        ToolCommands::Chain { opt, connection } => {
            let api = connect(&connection).await?;
            handle_chain(&api, opt).await
        }
        ToolCommands::Message { opt, connection } => {
            let api = connect(&connection).await?;
            handle_msg(&api, opt).await
        }
        ToolCommands::Address { opt, connection } => {
            let api = connect(&connection).await?;
            handle_addr(&api, opt).await
        }
        ToolCommands::Wallet {
            opt: ListOperation::List,
            connection,
        } => {
            let api = connect(&connection).await?;
            print(&api.wallet_list.call(Context::background()).await?)
        }
        ToolCommands::Miner {
            opt: ListOperation::List,
            connection,
        } => {
            let api = connect(&connection).await?;
            print(&api.miner_list.call(Context::background()).await?)
        }
    }
}

async fn handle_server(repo: &str, args: RunArgs) -> Result<(), Box<dyn Error>> {
    let server = start_server(repo, args).await?;

    match tokio::signal::ctrl_c().await {
        Ok(()) => {}
        Err(err) => {
            eprintln!("Unable to listen for shutdown signal: {}", err);
        }
    }
    info!("starting a clean up for shutdown");
    server.stop().await;
    info!("done clean up");
    Ok(())
}

async fn connect(connection: &ConnectionArgs) -> Result<GatewayApi, Box<dyn Error>> {
    let transport = HttpTransport::connect(&connection.server)
        .await?
        .with_version(API_PREFIX);
    Ok(venus_route::provide(Arc::new(transport))?)
}

fn print<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn handle_chain(api: &GatewayApi, opt: ChainOperation) -> Result<(), Box<dyn Error>> {
    let ctx = Context::background();
    match opt {
        ChainOperation::Head => print(&api.chain_head.call(ctx).await?),
        ChainOperation::Network => print(&api.chain_network_name.call(ctx).await?),
    }
}

async fn handle_msg(api: &GatewayApi, opt: MsgOperation) -> Result<(), Box<dyn Error>> {
    info!("message {:?}", opt);
    let ctx = Context::background();
    match opt {
        MsgOperation::Send {
            to,
            value,
            from,
            method,
        } => {
            let req = MsgSendReq {
                from: from.unwrap_or_default(),
                to,
                value,
                method,
                params: None,
            };
            print(&api.msg_send.call(ctx, req).await?)
        }
        MsgOperation::List { from, failed } => {
            let req = MsgQueryReq {
                from,
                is_failed: failed,
                ..Default::default()
            };
            print(&api.msg_query.call(ctx, req).await?)
        }
        MsgOperation::Get { id } => print(&api.msg.call(ctx, MsgId { id }).await?),
        MsgOperation::MarkBad { id } => {
            api.msg_mark_bad.call(ctx, MsgId { id }).await?;
            Ok(())
        }
    }
}

async fn handle_addr(api: &GatewayApi, opt: AddrOperation) -> Result<(), Box<dyn Error>> {
    info!("address {:?}", opt);
    let ctx = Context::background();
    match opt {
        AddrOperation::List => print(&api.addr_list.call(ctx).await?),
        AddrOperation::Info { addr } => {
            print(&api.addr_info.call(ctx, Address { address: addr }).await?)
        }
        AddrOperation::Set {
            addr,
            state,
            sel_msg_num,
        } => {
            let operate = state.map(AddrOperateType::from).unwrap_or(AddrOperateType::Set);
            let req = AddrsOperateReq {
                address: addr,
                operate,
                sel_msg_num,
            };
            api.addr_operate.call(ctx, req).await?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use venus_tool::cli::RunArgs;

    use super::start_server;

    #[tokio::test]
    async fn server_starts_from_repo() -> anyhow::Result<()> {
        let dir = std::env::temp_dir().join(format!("venus-cli-{}", std::process::id()));
        let repo = dir.to_string_lossy().to_string();
        let server = start_server(
            &repo,
            RunArgs {
                listen: Some("127.0.0.1:0".into()),
            },
        )
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
        assert!(dir.join("config.toml").exists());
        assert!(server.local_addr().port() != 0);
        server.stop().await;
        std::fs::remove_dir_all(dir)?;
        Ok(())
    }
}
