use crate::service::api::AddrOperateType;

#[derive(clap::Parser, Clone, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct VenusToolCli {
    /// Repo directory holding config.toml
    #[arg(long, env = "VENUS_TOOL_PATH", default_value = "~/.venustool")]
    pub repo: String,
    #[command(subcommand)]
    pub command: ToolCommands,
}

#[derive(clap::Subcommand, Clone, Debug)]
pub enum ToolCommands {
    /// Start the gateway daemon
    Run(RunArgs),
    /// Chain state
    Chain {
        #[command(subcommand)]
        opt: ChainOperation,
        #[clap(flatten)]
        connection: ConnectionArgs,
    },
    /// Message pool operation
    #[clap(aliases = &["msg", "m"])]
    Message {
        #[command(subcommand)]
        opt: MsgOperation,
        #[clap(flatten)]
        connection: ConnectionArgs,
    },
    /// Sender address operation
    #[clap(aliases = &["addr", "a"])]
    Address {
        #[command(subcommand)]
        opt: AddrOperation,
        #[clap(flatten)]
        connection: ConnectionArgs,
    },
    /// Wallet operation
    Wallet {
        #[command(subcommand)]
        opt: ListOperation,
        #[clap(flatten)]
        connection: ConnectionArgs,
    },
    /// Miner operation
    Miner {
        #[command(subcommand)]
        opt: ListOperation,
        #[clap(flatten)]
        connection: ConnectionArgs,
    },
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Listen address, overrides the repo config
    #[arg(short, long)]
    pub listen: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ConnectionArgs {
    #[arg(
        short,
        long,
        global = true,
        env = "VENUS_TOOL_SERVER",
        default_value = "http://127.0.0.1:12580"
    )]
    pub server: String,
}

#[derive(clap::Subcommand, Clone, Debug)]
pub enum ChainOperation {
    Head,
    #[clap(aliases = &["net"])]
    Network,
}

#[derive(clap::Subcommand, Clone, Debug)]
pub enum MsgOperation {
    Send {
        to: String,
        /// Amount in attoFIL
        value: String,
        #[arg(long)]
        from: Option<String>,
        #[arg(long, default_value_t = 0)]
        method: u64,
    },
    #[clap(aliases = &["ls"])]
    List {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        failed: bool,
    },
    Get {
        id: String,
    },
    MarkBad {
        id: String,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddrStateArg {
    Active,
    Forbidden,
    Delete,
}

impl From<AddrStateArg> for AddrOperateType {
    fn from(value: AddrStateArg) -> Self {
        match value {
            AddrStateArg::Active => AddrOperateType::Active,
            AddrStateArg::Forbidden => AddrOperateType::Forbidden,
            AddrStateArg::Delete => AddrOperateType::Delete,
        }
    }
}

#[derive(clap::Subcommand, Clone, Debug)]
pub enum AddrOperation {
    #[clap(aliases = &["ls"])]
    List,
    Info {
        addr: String,
    },
    Set {
        addr: String,
        #[arg(long, value_enum)]
        state: Option<AddrStateArg>,
        /// Messages selected per round
        #[arg(long, default_value_t = 0)]
        sel_msg_num: u64,
    },
}

#[derive(clap::Subcommand, Clone, Debug)]
pub enum ListOperation {
    #[clap(aliases = &["ls"])]
    List,
}

#[cfg(test)]
mod test {
    use clap::Parser;

    use super::{AddrOperation, AddrStateArg, MsgOperation, ToolCommands, VenusToolCli};

    #[test]
    fn parse_commands() {
        let cli = VenusToolCli::try_parse_from([
            "venus-tool", "--repo", "/tmp/vt", "msg", "send", "f0100", "10", "--from", "f01",
        ])
        .unwrap();
        assert_eq!(cli.repo, "/tmp/vt");
        match cli.command {
            ToolCommands::Message {
                opt: MsgOperation::Send { to, value, from, method },
                ..
            } => {
                assert_eq!((to.as_str(), value.as_str()), ("f0100", "10"));
                assert_eq!(from.as_deref(), Some("f01"));
                assert_eq!(method, 0);
            }
            other => panic!("unexpected {other:?}"),
        }

        let cli = VenusToolCli::try_parse_from([
            "venus-tool", "addr", "set", "f01", "--state", "forbidden", "--server", "http://h:1",
        ])
        .unwrap();
        match cli.command {
            ToolCommands::Address {
                opt: AddrOperation::Set { state, .. },
                connection,
            } => {
                assert_eq!(state, Some(AddrStateArg::Forbidden));
                assert_eq!(connection.server, "http://h:1");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
