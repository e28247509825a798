use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::future::Future;

pub mod keystore;

pub const SESSION_KEY_TTL_DAYS: i64 = 7;
pub const SESSION_KEY_WHITELIST: [&str; 2] = ["blackjack", "oranj"];

/// Opaque signed payload attached to a transaction.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    pub contract_name: String,
    #[serde(with = "hex_data")]
    pub data: Vec<u8>,
}

/// Identity assertion sent with every game action.
pub type IdentityBlobs = [Blob; 2];

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionKey {
    pub public_key: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub whitelist: Vec<String>,
}

impl SessionKey {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("Wallet not connected")]
    NotConnected,
    #[error("No session key found")]
    NoSessionKey,
    #[error("Invalid password for wallet '{0}'")]
    InvalidPassword(String),
    #[error("Wallet '{name}' not found in {dir}")]
    NotFound { name: String, dir: String },
    #[error("wallet storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed wallet data: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The wallet library the game delegates identity and session keys to.
pub trait WalletProvider {
    /// `None` while no wallet is connected.
    fn address(&self) -> Option<&str>;

    fn session_key(&self) -> Option<&SessionKey>;

    fn create_identity_blobs(&self) -> Result<IdentityBlobs, WalletError>;

    fn register_session_key(
        &mut self,
        password: &str,
        expiration: DateTime<Utc>,
        whitelist: &[&str],
    ) -> impl Future<Output = Result<(), WalletError>>;

    fn clean_expired_session_key(&mut self, now: DateTime<Utc>);

    fn logout(&mut self);
}

mod hex_data {
    use serde::{
        Deserialize,
        Deserializer,
        Serializer,
    };

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        hex::decode(raw.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}
