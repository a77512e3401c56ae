use std::collections::{BTreeMap, HashMap};

use tokio::sync::RwLock;
use tracing::info;
use venus_route::Context;

use super::api::{AddrInfo, AddrState, Message, MsgState};
use crate::error::ToolError;

/// The message pool the gateway pushes to and queries.
#[async_trait::async_trait]
pub trait Messager: Send + Sync {
    /// Queues `msg` and returns its id. The nonce is assigned here.
    async fn push_message(&self, ctx: &Context, msg: Message) -> Result<String, ToolError>;

    async fn get_message(&self, ctx: &Context, id: &str) -> Result<Message, ToolError>;

    async fn get_message_by_from_nonce(
        &self,
        ctx: &Context,
        from: &str,
        nonce: u64,
    ) -> Result<Message, ToolError>;

    async fn list_message(
        &self,
        ctx: &Context,
        from: Option<&str>,
    ) -> Result<Vec<Message>, ToolError>;

    async fn list_failed_message(&self, ctx: &Context) -> Result<Vec<Message>, ToolError>;

    async fn mark_bad_message(&self, ctx: &Context, id: &str) -> Result<(), ToolError>;

    async fn has_address(&self, ctx: &Context, addr: &str) -> Result<bool, ToolError>;

    async fn get_address(&self, ctx: &Context, addr: &str) -> Result<AddrInfo, ToolError>;

    async fn list_address(&self, ctx: &Context) -> Result<Vec<AddrInfo>, ToolError>;

    async fn set_address_state(
        &self,
        ctx: &Context,
        addr: &str,
        state: AddrState,
    ) -> Result<(), ToolError>;

    async fn set_select_msg_num(
        &self,
        ctx: &Context,
        addr: &str,
        num: u64,
    ) -> Result<(), ToolError>;
}

#[derive(Default)]
struct PoolState {
    seq: u64,
    /// Keyed by sequence so listing follows push order.
    messages: BTreeMap<u64, Message>,
    addresses: HashMap<String, AddrInfo>,
}

/// In-process message pool. Ids are `msg-<n>` in push order; a sender is
/// registered as an address on its first message.
#[derive(Default)]
pub struct MemoryMessager {
    state: RwLock<PoolState>,
}

impl MemoryMessager {
    pub fn new() -> Self {
        Self::default()
    }
}

fn seq_of(id: &str) -> Option<u64> {
    id.strip_prefix("msg-")?.parse().ok()
}

#[async_trait::async_trait]
impl Messager for MemoryMessager {
    async fn push_message(
        &self,
        _ctx: &Context,
        mut msg: Message,
    ) -> Result<String, ToolError> {
        let mut state = self.state.write().await;
        let addr = state
            .addresses
            .entry(msg.from.clone())
            .or_insert_with(|| AddrInfo {
                addr: msg.from.clone(),
                ..Default::default()
            });
        match addr.state {
            AddrState::Alive => {}
            AddrState::Forbidden | AddrState::Removed => {
                return Err(ToolError::AddressForbidden(msg.from));
            }
        }
        msg.nonce = addr.nonce;
        addr.nonce += 1;

        state.seq += 1;
        let seq = state.seq;
        msg.id = format!("msg-{seq}");
        msg.state = MsgState::Unfilled;
        info!("push message {} from {} nonce {}", msg.id, msg.from, msg.nonce);
        let id = msg.id.clone();
        state.messages.insert(seq, msg);
        Ok(id)
    }

    async fn get_message(&self, _ctx: &Context, id: &str) -> Result<Message, ToolError> {
        let state = self.state.read().await;
        seq_of(id)
            .and_then(|seq| state.messages.get(&seq))
            .cloned()
            .ok_or_else(|| ToolError::MessageNotFound(id.to_string()))
    }

    async fn get_message_by_from_nonce(
        &self,
        _ctx: &Context,
        from: &str,
        nonce: u64,
    ) -> Result<Message, ToolError> {
        let state = self.state.read().await;
        state
            .messages
            .values()
            .find(|m| m.from == from && m.nonce == nonce)
            .cloned()
            .ok_or_else(|| ToolError::MessageNotFound(format!("{from}/{nonce}")))
    }

    async fn list_message(
        &self,
        _ctx: &Context,
        from: Option<&str>,
    ) -> Result<Vec<Message>, ToolError> {
        let state = self.state.read().await;
        Ok(state
            .messages
            .values()
            .filter(|m| from.is_none_or(|from| m.from == from))
            .cloned()
            .collect())
    }

    async fn list_failed_message(&self, _ctx: &Context) -> Result<Vec<Message>, ToolError> {
        let state = self.state.read().await;
        Ok(state
            .messages
            .values()
            .filter(|m| m.state == MsgState::Failed)
            .cloned()
            .collect())
    }

    async fn mark_bad_message(&self, _ctx: &Context, id: &str) -> Result<(), ToolError> {
        let mut state = self.state.write().await;
        let msg = seq_of(id)
            .and_then(|seq| state.messages.get_mut(&seq))
            .ok_or_else(|| ToolError::MessageNotFound(id.to_string()))?;
        info!("mark message {id} bad");
        msg.state = MsgState::Failed;
        Ok(())
    }

    async fn has_address(&self, _ctx: &Context, addr: &str) -> Result<bool, ToolError> {
        Ok(self.state.read().await.addresses.contains_key(addr))
    }

    async fn get_address(&self, _ctx: &Context, addr: &str) -> Result<AddrInfo, ToolError> {
        self.state
            .read()
            .await
            .addresses
            .get(addr)
            .cloned()
            .ok_or_else(|| ToolError::AddressNotFound(addr.to_string()))
    }

    async fn list_address(&self, _ctx: &Context) -> Result<Vec<AddrInfo>, ToolError> {
        let state = self.state.read().await;
        let mut addrs: Vec<_> = state.addresses.values().cloned().collect();
        addrs.sort_by(|a, b| a.addr.cmp(&b.addr));
        Ok(addrs)
    }

    async fn set_address_state(
        &self,
        _ctx: &Context,
        addr: &str,
        state: AddrState,
    ) -> Result<(), ToolError> {
        let mut pool = self.state.write().await;
        let entry = pool
            .addresses
            .get_mut(addr)
            .ok_or_else(|| ToolError::AddressNotFound(addr.to_string()))?;
        info!("address {addr}: {:?} -> {state:?}", entry.state);
        entry.state = state;
        Ok(())
    }

    async fn set_select_msg_num(
        &self,
        _ctx: &Context,
        addr: &str,
        num: u64,
    ) -> Result<(), ToolError> {
        let mut pool = self.state.write().await;
        let entry = pool
            .addresses
            .get_mut(addr)
            .ok_or_else(|| ToolError::AddressNotFound(addr.to_string()))?;
        entry.sel_msg_num = num;
        Ok(())
    }
}
