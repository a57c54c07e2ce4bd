//! JSON-file wallet storage.
//!
//! One record per user id: a base58-encoded secret key and the derived
//! public address. The whole map is held in memory behind a lock and
//! rewritten on every mutation; wallet counts are small.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use solana_sdk::signature::{Keypair, Signer};
use tracing::info;

use crate::wallet::{Credential, WalletProvider};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredWallet {
    private_key: String,
    address: String,
}

pub struct FileWalletStore {
    path: PathBuf,
    users: RwLock<HashMap<u64, StoredWallet>>,
}

impl FileWalletStore {
    /// Open the users file, starting empty when it does not exist yet.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let users = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("malformed users file {}", path.display()))?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read users file {}", path.display()));
            }
        };

        Ok(Self {
            path,
            users: RwLock::new(users),
        })
    }

    fn persist(&self, users: &HashMap<u64, StoredWallet>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let raw = serde_json::to_string_pretty(users).context("failed to encode users file")?;
        fs::write(&self.path, raw)
            .with_context(|| format!("failed to write users file {}", self.path.display()))
    }

    fn decode_credential(wallet: &StoredWallet) -> Result<Credential> {
        let bytes = bs58::decode(&wallet.private_key)
            .into_vec()
            .context("stored private key is not valid base58")?;
        let keypair =
            Keypair::try_from(&bytes[..]).context("stored private key has invalid length")?;
        Ok(Credential::new(keypair))
    }
}

#[async_trait]
impl WalletProvider for FileWalletStore {
    async fn credential(&self, user_id: u64) -> Result<Option<Credential>> {
        let users = self.users.read();
        users
            .get(&user_id)
            .map(Self::decode_credential)
            .transpose()
    }

    async fn address(&self, user_id: u64) -> Result<Option<String>> {
        Ok(self.users.read().get(&user_id).map(|w| w.address.clone()))
    }

    async fn ensure_wallet(&self, user_id: u64) -> Result<String> {
        let mut users = self.users.write();
        if let Some(existing) = users.get(&user_id) {
            return Ok(existing.address.clone());
        }

        let keypair = Keypair::new();
        let address = keypair.pubkey().to_string();
        users.insert(
            user_id,
            StoredWallet {
                private_key: bs58::encode(keypair.to_bytes()).into_string(),
                address: address.clone(),
            },
        );
        self.persist(&users)?;
        info!("created wallet {} for user {}", address, user_id);
        Ok(address)
    }
}
