use crate::wallet::{
    WalletError,
    keystore::resolve_wallet_dir,
};
use clap::Parser;
use std::path::PathBuf;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:9002";
pub const DEFAULT_NODE_URL: &str = "http://localhost:4321";
pub const DEFAULT_INDEXER_URL: &str = "http://localhost:4321";
pub const DEFAULT_FAUCET_URL: &str = "http://localhost:9002/api/faucet";
/// Used when the backend does not tell us which contract runs the tables.
pub const DEFAULT_CONTRACT_NAME: &str = "blackjack";

#[derive(Parser, Debug)]
#[command(version, about = "Terminal blackjack client", long_about = None)]
pub struct Args {
    /// Game backend serving the /api endpoints
    #[arg(long, env = "EZCASINO_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: Url,

    /// Node the transactions settle on
    #[arg(long, env = "EZCASINO_NODE_URL", default_value = DEFAULT_NODE_URL)]
    pub node_url: Url,

    #[arg(long, env = "EZCASINO_INDEXER_URL", default_value = DEFAULT_INDEXER_URL)]
    pub indexer_url: Url,

    #[arg(long, env = "EZCASINO_FAUCET_URL", default_value = DEFAULT_FAUCET_URL)]
    pub faucet_url: Url,

    /// Keystore wallet to play with
    #[arg(short, long, env = "EZCASINO_WALLET")]
    pub wallet: String,

    /// Directory holding `<name>.wallet` keystores (defaults to ~/.ezcasino/wallets)
    #[arg(long, env = "EZCASINO_WALLET_DIR")]
    pub wallet_dir: Option<String>,

    /// Where log files are written
    #[arg(long, env = "EZCASINO_LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_url: Url,
    pub node_url: Url,
    pub indexer_url: Url,
    pub faucet_url: Url,
    pub wallet: String,
    pub wallet_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl TryFrom<Args> for AppConfig {
    type Error = WalletError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let wallet_dir = resolve_wallet_dir(args.wallet_dir.as_deref())?;
        Ok(Self {
            api_url: args.api_url,
            node_url: args.node_url,
            indexer_url: args.indexer_url,
            faucet_url: args.faucet_url,
            wallet: args.wallet,
            wallet_dir,
            log_dir: args.log_dir,
        })
    }
}
