pub mod api;
mod chain;
mod messager;

use std::sync::Arc;

use tracing::{info, warn};
use venus_route::{Context, Method, RpcError};

pub use self::api::GatewayApi;
pub use self::chain::{ACCOUNT_ACTOR, ChainNode, LocalChain};
pub use self::messager::{MemoryMessager, Messager};
use self::api::{
    AddrInfo, AddrOperateType, AddrState, AddrsOperateReq, AddrsResp, Address,
    EncodedParams, EncodingType, Message, MsgId, MsgQueryReq, MsgResp, MsgSendReq, TipSet,
};
use crate::error::ToolError;

/// The gateway's business methods, over its external collaborators.
pub struct ServiceImpl {
    chain: Arc<dyn ChainNode>,
    messager: Arc<dyn Messager>,
    wallets: Vec<String>,
    miners: Vec<String>,
}

impl ServiceImpl {
    pub fn new(
        chain: Arc<dyn ChainNode>,
        messager: Arc<dyn Messager>,
        wallets: Vec<String>,
        miners: Vec<String>,
    ) -> Self {
        Self {
            chain,
            messager,
            wallets,
            miners,
        }
    }

    pub async fn chain_head(&self, ctx: &Context) -> Result<TipSet, ToolError> {
        self.chain.chain_head(ctx).await
    }

    pub async fn chain_network_name(&self, ctx: &Context) -> Result<String, ToolError> {
        self.chain.network_name(ctx).await
    }

    fn default_wallet(&self) -> Result<&str, ToolError> {
        self.wallets
            .first()
            .map(String::as_str)
            .ok_or_else(|| ToolError::InvalidArgument("no wallet configured".into()))
    }

    pub async fn msg_send(&self, ctx: &Context, req: MsgSendReq) -> Result<String, ToolError> {
        info!(
            "msg send: from({}), to({}), value({}), method({})",
            req.from, req.to, req.value, req.method
        );
        if req.from.is_empty() {
            return Err(ToolError::NoFrom);
        }
        if req.to.is_empty() {
            return Err(ToolError::InvalidArgument("no to".into()));
        }
        let value = if req.value.is_empty() {
            "0".to_string()
        } else {
            req.value
                .parse::<u128>()
                .map_err(|e| ToolError::InvalidArgument(format!("value `{}`: {e}", req.value)))?
                .to_string()
        };
        if let Some(params) = &req.params {
            check_params(params)?;
        }

        let msg = Message {
            from: req.from,
            to: req.to,
            value,
            method: req.method,
            params: req.params,
            ..Default::default()
        };
        self.messager.push_message(ctx, msg).await
    }

    pub async fn msg_query(
        &self,
        ctx: &Context,
        req: MsgQueryReq,
    ) -> Result<Vec<MsgResp>, ToolError> {
        let msgs = if !req.id.is_empty() {
            vec![self.messager.get_message(ctx, &req.id).await?]
        } else if req.nonce != 0 {
            let from = match &req.from {
                Some(from) => from.as_str(),
                None => self.default_wallet().map_err(|e| {
                    warn!("get default wallet failed: {e}");
                    ToolError::NoSender
                })?,
            };
            vec![
                self.messager
                    .get_message_by_from_nonce(ctx, from, req.nonce)
                    .await?,
            ]
        } else if req.is_failed {
            self.messager.list_failed_message(ctx).await?
        } else {
            self.messager.list_message(ctx, req.from.as_deref()).await?
        };

        let mut ret = Vec::with_capacity(msgs.len());
        for msg in msgs {
            ret.push(self.msg_resp(ctx, msg).await);
        }
        Ok(ret)
    }

    pub async fn msg(&self, ctx: &Context, id: MsgId) -> Result<MsgResp, ToolError> {
        let msg = self.messager.get_message(ctx, &id.id).await?;
        Ok(self.msg_resp(ctx, msg).await)
    }

    async fn msg_resp(&self, ctx: &Context, message: Message) -> MsgResp {
        let code = match self.chain.get_actor(ctx, &message.to).await {
            Ok(actor) => actor.code,
            Err(e) => {
                warn!("get actor failed: {e}");
                String::new()
            }
        };
        let method_name = method_name(&code, message.method).unwrap_or_default();
        MsgResp {
            message,
            method_name,
        }
    }

    pub async fn msg_mark_bad(&self, ctx: &Context, id: MsgId) -> Result<(), ToolError> {
        self.messager.mark_bad_message(ctx, &id.id).await
    }

    pub async fn addr_list(&self, ctx: &Context) -> Result<Vec<AddrsResp>, ToolError> {
        let known = self.messager.list_address(ctx).await?;
        let mut all: Vec<AddrInfo> = self
            .wallets
            .iter()
            .filter(|w| !known.iter().any(|k| &k.addr == *w))
            .map(|w| AddrInfo {
                addr: w.clone(),
                ..Default::default()
            })
            .collect();
        all.extend(known);

        let mut ret = Vec::with_capacity(all.len());
        for address in all {
            let actor = match self.chain.get_actor(ctx, &address.addr).await {
                Ok(actor) => actor,
                Err(e) => {
                    warn!("get address({}) actor failed: {e}", address.addr);
                    Default::default()
                }
            };
            ret.push(AddrsResp { address, actor });
        }
        Ok(ret)
    }

    pub async fn addr_info(&self, ctx: &Context, addr: Address) -> Result<AddrsResp, ToolError> {
        if addr.address.is_empty() {
            return Err(ToolError::InvalidArgument("address is empty".into()));
        }
        let actor = self.chain.get_actor(ctx, &addr.address).await?;
        let address = match self.messager.get_address(ctx, &addr.address).await {
            Ok(info) => info,
            Err(ToolError::AddressNotFound(_)) => AddrInfo::default(),
            Err(e) => return Err(e),
        };
        Ok(AddrsResp { address, actor })
    }

    pub async fn addr_operate(&self, ctx: &Context, req: AddrsOperateReq) -> Result<(), ToolError> {
        if !self.messager.has_address(ctx, &req.address).await? {
            return Err(ToolError::AddressNotFound(req.address));
        }
        let state = match req.operate {
            AddrOperateType::Delete => AddrState::Removed,
            AddrOperateType::Active => AddrState::Alive,
            AddrOperateType::Forbidden => AddrState::Forbidden,
            AddrOperateType::Set => {
                if req.sel_msg_num != 0 {
                    self.messager
                        .set_select_msg_num(ctx, &req.address, req.sel_msg_num)
                        .await?;
                }
                return Ok(());
            }
            AddrOperateType::Unknown => {
                return Err(ToolError::InvalidArgument("unknown operate type".into()));
            }
        };
        self.messager.set_address_state(ctx, &req.address, state).await
    }

    pub fn wallet_list(&self) -> Vec<String> {
        self.wallets.clone()
    }

    pub fn miner_list(&self) -> Vec<String> {
        self.miners.clone()
    }

    /// Fills every method of the gateway description from `self`.
    pub fn bind(self: Arc<Self>) -> GatewayApi {
        let s = self;
        GatewayApi {
            chain_head: {
                let s = s.clone();
                Method::new(move |ctx: Context| {
                    let s = s.clone();
                    async move { s.chain_head(&ctx).await.map_err(RpcError::from) }
                })
            },
            chain_network_name: {
                let s = s.clone();
                Method::new(move |ctx: Context| {
                    let s = s.clone();
                    async move { s.chain_network_name(&ctx).await.map_err(RpcError::from) }
                })
            },
            msg_send: {
                let s = s.clone();
                Method::new(move |ctx: Context, req: MsgSendReq| {
                    let s = s.clone();
                    async move { s.msg_send(&ctx, req).await.map_err(RpcError::from) }
                })
            },
            msg_query: {
                let s = s.clone();
                Method::new(move |ctx: Context, req: MsgQueryReq| {
                    let s = s.clone();
                    async move { s.msg_query(&ctx, req).await.map_err(RpcError::from) }
                })
            },
            msg: {
                let s = s.clone();
                Method::new(move |ctx: Context, id: MsgId| {
                    let s = s.clone();
                    async move { s.msg(&ctx, id).await.map_err(RpcError::from) }
                })
            },
            msg_mark_bad: {
                let s = s.clone();
                Method::new(move |ctx: Context, id: MsgId| {
                    let s = s.clone();
                    async move { s.msg_mark_bad(&ctx, id).await.map_err(RpcError::from) }
                })
            },
            addr_list: {
                let s = s.clone();
                Method::new(move |ctx: Context| {
                    let s = s.clone();
                    async move { s.addr_list(&ctx).await.map_err(RpcError::from) }
                })
            },
            addr_info: {
                let s = s.clone();
                Method::new(move |ctx: Context, addr: Address| {
                    let s = s.clone();
                    async move { s.addr_info(&ctx, addr).await.map_err(RpcError::from) }
                })
            },
            addr_operate: {
                let s = s.clone();
                Method::new(move |ctx: Context, req: AddrsOperateReq| {
                    let s = s.clone();
                    async move { s.addr_operate(&ctx, req).await.map_err(RpcError::from) }
                })
            },
            wallet_list: {
                let s = s.clone();
                Method::new(move |_ctx: Context| {
                    let wallets = s.wallet_list();
                    async move { Ok(wallets) }
                })
            },
            miner_list: Method::new(move |_ctx: Context| {
                let miners = s.miner_list();
                async move { Ok(miners) }
            }),
        }
    }
}

fn check_params(params: &EncodedParams) -> Result<(), ToolError> {
    let data = params.data.as_str();
    match params.enc_type {
        EncodingType::Null if data.is_empty() => Ok(()),
        EncodingType::Null => Err(ToolError::InvalidArgument(
            "decode params failed: unknown encoding type".into(),
        )),
        EncodingType::Hex => {
            if data.len() % 2 == 0 && data.chars().all(|c| c.is_ascii_hexdigit()) {
                Ok(())
            } else {
                Err(ToolError::InvalidArgument(
                    "decode params failed: invalid hex".into(),
                ))
            }
        }
        EncodingType::Json => serde_json::from_str::<serde_json::Value>(data)
            .map(|_| ())
            .map_err(|e| ToolError::InvalidArgument(format!("decode params failed: {e}"))),
    }
}

/// Method names of the account actor, the only actor the gateway decodes.
fn method_name(code: &str, method: u64) -> Option<String> {
    if method == 0 {
        return Some("Send".into());
    }
    if code != ACCOUNT_ACTOR {
        return None;
    }
    let name = match method {
        1 => "Constructor",
        2 => "PubkeyAddress",
        3 => "AuthenticateMessage",
        _ => return None,
    };
    Some(name.into())
}
