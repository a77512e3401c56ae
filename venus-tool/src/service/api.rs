use serde::{Deserialize, Serialize};
use venus_route::{Context, Fields, Method, RpcError, Service};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct TipSet {
    pub height: u64,
    pub key: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct Actor {
    pub code: String,
    pub nonce: u64,
    pub balance: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EncodingType {
    #[default]
    #[serde(rename = "")]
    Null,
    #[serde(rename = "hex")]
    Hex,
    #[serde(rename = "json")]
    Json,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct EncodedParams {
    pub data: String,
    pub enc_type: EncodingType,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct MsgSendReq {
    pub from: String,
    pub to: String,
    /// Amount in attoFIL, as a decimal string.
    pub value: String,
    pub method: u64,
    pub params: Option<EncodedParams>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct MsgQueryReq {
    pub from: Option<String>,
    pub is_failed: bool,
    #[serde(rename = "ID")]
    pub id: String,
    pub nonce: u64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MsgState {
    #[default]
    Unfilled,
    Filled,
    OnChain,
    Failed,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct Message {
    #[serde(rename = "ID")]
    pub id: String,
    pub from: String,
    pub to: String,
    pub value: String,
    pub method: u64,
    pub params: Option<EncodedParams>,
    pub nonce: u64,
    pub state: MsgState,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct MsgResp {
    #[serde(flatten)]
    pub message: Message,
    #[serde(rename = "MethodName")]
    pub method_name: String,
}

/// Binds from the `:ID` path segment, or `ID` in the query or body.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct MsgId {
    #[serde(rename = "ID")]
    pub id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct Address {
    pub address: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AddrState {
    #[default]
    Alive,
    Forbidden,
    Removed,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct AddrInfo {
    pub addr: String,
    pub nonce: u64,
    pub state: AddrState,
    pub sel_msg_num: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct AddrsResp {
    pub address: AddrInfo,
    pub actor: Actor,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AddrOperateType {
    #[default]
    #[serde(rename = "")]
    Unknown,
    Delete,
    Active,
    Forbidden,
    Set,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct AddrsOperateReq {
    pub address: String,
    pub operate: AddrOperateType,
    pub sel_msg_num: u64,
}

/// Every route the gateway serves. The daemon fills it from
/// [`ServiceImpl`](super::ServiceImpl); clients fill it with
/// [`venus_route::provide`].
#[derive(Default)]
pub struct GatewayApi {
    pub chain_head: Method<(Context,), Result<TipSet, RpcError>>,
    pub chain_network_name: Method<(Context,), Result<String, RpcError>>,

    pub msg_send: Method<(Context, MsgSendReq), Result<String, RpcError>>,
    pub msg_query: Method<(Context, MsgQueryReq), Result<Vec<MsgResp>, RpcError>>,
    pub msg: Method<(Context, MsgId), Result<MsgResp, RpcError>>,
    pub msg_mark_bad: Method<(Context, MsgId), Result<(), RpcError>>,

    pub addr_list: Method<(Context,), Result<Vec<AddrsResp>, RpcError>>,
    pub addr_info: Method<(Context, Address), Result<AddrsResp, RpcError>>,
    pub addr_operate: Method<(Context, AddrsOperateReq), Result<(), RpcError>>,

    pub wallet_list: Method<(Context,), Result<Vec<String>, RpcError>>,
    pub miner_list: Method<(Context,), Result<Vec<String>, RpcError>>,
}

impl Service for GatewayApi {
    fn describe<'a>(&'a mut self, fields: &mut Fields<'a>) {
        fields
            .method("ChainHead", r#"GET:"/chain/head""#, &mut self.chain_head)
            .method(
                "ChainNetworkName",
                r#"GET:"/chain/networkname""#,
                &mut self.chain_network_name,
            )
            .method("MsgSend", r#"POST:"/msg/send""#, &mut self.msg_send)
            .method("MsgQuery", r#"GET:"/msg/query""#, &mut self.msg_query)
            .method("Msg", r#"GET:"/msg/:ID""#, &mut self.msg)
            .method("MsgMarkBad", r#"POST:"/msg/markbad/:ID""#, &mut self.msg_mark_bad)
            .method("AddrList", r#"GET:"/addr/list""#, &mut self.addr_list)
            .method("AddrInfo", r#"GET:"/addr/info/:Address""#, &mut self.addr_info)
            .method("AddrOperate", r#"PUT:"/addr/operate""#, &mut self.addr_operate)
            .method("WalletList", r#"GET:"/wallet/list""#, &mut self.wallet_list)
            .method("MinerList", r#"GET:"/miner/list""#, &mut self.miner_list);
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::{GatewayApi, Message, MsgResp, MsgState};

    #[test]
    fn gateway_routes() {
        let desc = venus_route::parse::<GatewayApi>().unwrap();
        assert_eq!(desc.len(), 11);
        let msg = desc.get("Msg").unwrap();
        assert_eq!(msg.static_path(), "/msg");
        assert_eq!(msg.dynamic_param(), Some("ID"));
        let bad = desc.get("MsgMarkBad").unwrap();
        assert_eq!(bad.method, http::Method::POST);
        assert_eq!(bad.static_path(), "/msg/markbad");
    }

    #[test]
    fn msg_resp_is_flat() {
        let resp = MsgResp {
            message: Message {
                id: "msg-1".into(),
                state: MsgState::Failed,
                ..Default::default()
            },
            method_name: "Send".into(),
        };
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["ID"], json!("msg-1"));
        assert_eq!(value["State"], json!("Failed"));
        assert_eq!(value["MethodName"], json!("Send"));
        let back: MsgResp = serde_json::from_value(value).unwrap();
        assert_eq!(back, resp);
    }
}
