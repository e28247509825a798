//! Local wallet backed by eth-keystore files.
//!
//! Wallets live as `<name>.wallet` keystores in a directory; the session key
//! registered for a wallet is kept next to it in `<name>.session.json` so it
//! survives restarts, the same way the browser wallet keeps it in local
//! storage.

use super::{
    Blob,
    IdentityBlobs,
    SessionKey,
    WalletError,
    WalletProvider,
};
use chrono::{
    DateTime,
    Utc,
};
use eth_keystore::decrypt_key;
use rand::RngCore;
use rpassword::prompt_password;
use serde::{
    Deserialize,
    Serialize,
};
use sha2::{
    Digest,
    Sha256,
};
use std::{
    fs,
    io,
    path::{
        Path,
        PathBuf,
    },
};
use tracing::{
    info,
    warn,
};

const WALLET_EXTENSION: &str = "wallet";
const SESSION_SUFFIX: &str = "session.json";

#[derive(Clone, Debug)]
pub struct WalletDescriptor {
    pub name: String,
    pub path: PathBuf,
}

impl WalletDescriptor {
    pub fn new(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }

    pub fn account(&self) -> String {
        format!("{}@wallet", self.name)
    }

    fn session_path(&self) -> PathBuf {
        self.path.with_extension(SESSION_SUFFIX)
    }
}

pub fn default_wallet_dir() -> Result<PathBuf, WalletError> {
    let home = std::env::var("HOME").map_err(|_| {
        io::Error::new(io::ErrorKind::NotFound, "HOME environment variable not set")
    })?;
    Ok(PathBuf::from(home).join(".ezcasino").join("wallets"))
}

pub fn resolve_wallet_dir(dir: Option<&str>) -> Result<PathBuf, WalletError> {
    match dir {
        Some(raw) => {
            let expanded = shellexpand::tilde(raw);
            Ok(PathBuf::from(expanded.into_owned()))
        }
        None => default_wallet_dir(),
    }
}

pub fn list_wallets(dir: &Path) -> Result<Vec<WalletDescriptor>, WalletError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut wallets = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some(WALLET_EXTENSION) {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
            warn!(?path, "skipping wallet with non UTF-8 name");
            continue;
        };
        wallets.push(WalletDescriptor::new(name.to_owned(), path.clone()));
    }
    wallets.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(wallets)
}

pub fn find_wallet(dir: &Path, name: &str) -> Result<WalletDescriptor, WalletError> {
    list_wallets(dir)?
        .into_iter()
        .find(|w| w.name == name)
        .ok_or_else(|| WalletError::NotFound {
            name: name.to_string(),
            dir: dir.to_string_lossy().into_owned(),
        })
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredSessionKey {
    #[serde(flatten)]
    key: SessionKey,
    private_key: String,
}

#[derive(Debug)]
pub struct KeystoreWallet {
    descriptor: WalletDescriptor,
    account: String,
    secret: Option<Vec<u8>>,
    session: Option<StoredSessionKey>,
}

impl KeystoreWallet {
    /// Prompts for the wallet password on the terminal and decrypts it.
    pub fn unlock(descriptor: WalletDescriptor) -> Result<Self, WalletError> {
        let prompt = format!("Enter password for wallet '{}': ", descriptor.name);
        let password = prompt_password(prompt)?;
        let secret = decrypt_key(&descriptor.path, password.as_bytes())
            .map_err(|_| WalletError::InvalidPassword(descriptor.name.clone()))?;
        Self::from_secret(descriptor, secret)
    }

    /// Builds a connected wallet from already decrypted key material and
    /// picks up a previously registered session key, if any.
    pub fn from_secret(
        descriptor: WalletDescriptor,
        secret: Vec<u8>,
    ) -> Result<Self, WalletError> {
        let session = load_session(&descriptor.session_path())?;
        let account = descriptor.account();
        info!(%account, has_session_key = session.is_some(), "wallet unlocked");
        Ok(Self {
            descriptor,
            account,
            secret: Some(secret),
            session,
        })
    }

    pub fn descriptor(&self) -> &WalletDescriptor {
        &self.descriptor
    }

    fn issue_session_key(
        &mut self,
        expiration: DateTime<Utc>,
        whitelist: &[&str],
    ) -> Result<(), WalletError> {
        let mut private = [0u8; 32];
        rand::rng().fill_bytes(&mut private);
        let public_key = hex::encode(Sha256::digest(private));
        let stored = StoredSessionKey {
            key: SessionKey {
                public_key,
                expires_at: expiration,
                whitelist: whitelist.iter().map(|s| s.to_string()).collect(),
            },
            private_key: hex::encode(private),
        };
        let path = self.descriptor.session_path();
        fs::write(&path, serde_json::to_vec_pretty(&stored)?)?;
        info!(account = %self.account, expires_at = %expiration, "session key registered");
        self.session = Some(stored);
        Ok(())
    }

    fn forget_session(&mut self) {
        self.session = None;
        let path = self.descriptor.session_path();
        if let Err(err) = fs::remove_file(&path)
            && err.kind() != io::ErrorKind::NotFound
        {
            warn!(?err, ?path, "failed to remove session key file");
        }
    }

    fn sign(&self, private_key: &str, nonce: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(private_key.as_bytes());
        hasher.update(self.account.as_bytes());
        hasher.update(nonce.to_be_bytes());
        hex::encode(hasher.finalize())
    }
}

impl WalletProvider for KeystoreWallet {
    fn address(&self) -> Option<&str> {
        self.secret.as_ref().map(|_| self.account.as_str())
    }

    fn session_key(&self) -> Option<&SessionKey> {
        self.session.as_ref().map(|stored| &stored.key)
    }

    fn create_identity_blobs(&self) -> Result<IdentityBlobs, WalletError> {
        if self.secret.is_none() {
            return Err(WalletError::NotConnected);
        }
        let stored = self.session.as_ref().ok_or(WalletError::NoSessionKey)?;
        let nonce = Utc::now().timestamp_millis();
        let signature = self.sign(&stored.private_key, nonce);
        let signature_blob = Blob {
            contract_name: "secp256k1".to_string(),
            data: serde_json::to_vec(&serde_json::json!({
                "identity": self.account,
                "public_key": stored.key.public_key,
                "signature": signature,
                "nonce": nonce,
            }))?,
        };
        let identity_blob = Blob {
            contract_name: "wallet".to_string(),
            data: serde_json::to_vec(&serde_json::json!({
                "VerifySessionKey": {
                    "account": self.account,
                    "nonce": nonce,
                }
            }))?,
        };
        Ok([signature_blob, identity_blob])
    }

    async fn register_session_key(
        &mut self,
        password: &str,
        expiration: DateTime<Utc>,
        whitelist: &[&str],
    ) -> Result<(), WalletError> {
        if self.secret.is_none() {
            return Err(WalletError::NotConnected);
        }
        let path = self.descriptor.path.clone();
        let password = password.to_owned();
        let verified = tokio::task::spawn_blocking(move || decrypt_key(path, password))
            .await
            .map_err(io::Error::other)?;
        if verified.is_err() {
            return Err(WalletError::InvalidPassword(self.descriptor.name.clone()));
        }
        self.issue_session_key(expiration, whitelist)
    }

    fn clean_expired_session_key(&mut self, now: DateTime<Utc>) {
        if self
            .session
            .as_ref()
            .is_some_and(|stored| stored.key.is_expired(now))
        {
            info!(account = %self.account, "dropping expired session key");
            self.forget_session();
        }
    }

    fn logout(&mut self) {
        info!(account = %self.account, "wallet logged out");
        self.forget_session();
        self.secret = None;
    }
}

fn load_session(path: &Path) -> Result<Option<StoredSessionKey>, WalletError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}
