use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use venus_route::Context;

use super::api::{Actor, TipSet};
use crate::error::ToolError;

pub const ACCOUNT_ACTOR: &str = "fil/account";

/// The full node the gateway reads chain state from.
#[async_trait::async_trait]
pub trait ChainNode: Send + Sync {
    async fn chain_head(&self, ctx: &Context) -> Result<TipSet, ToolError>;

    async fn network_name(&self, ctx: &Context) -> Result<String, ToolError>;

    async fn get_actor(&self, ctx: &Context, addr: &str) -> Result<Actor, ToolError>;
}

/// In-process chain: a head that only moves when told to, and a table of
/// account actors.
pub struct LocalChain {
    network_name: String,
    height: AtomicU64,
    actors: RwLock<HashMap<String, Actor>>,
}

impl LocalChain {
    pub fn new(network_name: impl Into<String>) -> Self {
        Self {
            network_name: network_name.into(),
            height: AtomicU64::new(0),
            actors: RwLock::new(HashMap::new()),
        }
    }

    pub async fn set_balance(&self, addr: &str, balance: impl Into<String>) {
        let mut actors = self.actors.write().await;
        let actor = actors.entry(addr.to_string()).or_insert_with(|| Actor {
            code: ACCOUNT_ACTOR.into(),
            ..Default::default()
        });
        actor.balance = balance.into();
    }

    /// Moves the head forward and returns the new height.
    pub fn advance(&self, epochs: u64) -> u64 {
        self.height.fetch_add(epochs, Ordering::SeqCst) + epochs
    }
}

#[async_trait::async_trait]
impl ChainNode for LocalChain {
    async fn chain_head(&self, _ctx: &Context) -> Result<TipSet, ToolError> {
        let height = self.height.load(Ordering::SeqCst);
        Ok(TipSet {
            height,
            key: vec![format!("local-{height}")],
        })
    }

    async fn network_name(&self, _ctx: &Context) -> Result<String, ToolError> {
        Ok(self.network_name.clone())
    }

    async fn get_actor(&self, _ctx: &Context, addr: &str) -> Result<Actor, ToolError> {
        self.actors
            .read()
            .await
            .get(addr)
            .cloned()
            .ok_or_else(|| ToolError::ActorNotFound(addr.to_string()))
    }
}
