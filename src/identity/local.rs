use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::Rng as _;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{info, warn};

use super::{IdentityEvents, IdentityFeed, IdentityService};
use crate::error::AuthError;
use crate::models::{Identity, UserId};

const ACCOUNTS_FILE: &str = "accounts.json";
const SESSION_FILE: &str = "session.json";
pub const BCRYPT_COST: u32 = 11u32;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone, Debug, Deserialize, Serialize)]
struct Account {
    uid: UserId,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl Account {
    fn identity(&self) -> Identity {
        Identity {
            uid: self.uid.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct SessionFile {
    uid: Option<UserId>,
}

/// Identity service keeping bcrypt-hashed accounts in the data directory.
///
/// The signed-in user survives restarts through `session.json`.
pub struct LocalIdentityService {
    accounts: RwLock<HashMap<String, Account>>,
    bcrypt_cost: u32,
    data_dir: PathBuf,
    feed: IdentityFeed,
    // held from snapshot to rename, so files on disk follow the in-memory order
    writes: tokio::sync::Mutex<()>,
}

impl LocalIdentityService {
    pub async fn open(data_dir: &Path) -> Result<Self, AuthError> {
        tokio::fs::create_dir_all(data_dir).await?;
        let accounts: Vec<Account> = read_json(&data_dir.join(ACCOUNTS_FILE))
            .await?
            .unwrap_or_default();
        let session: SessionFile = read_json(&data_dir.join(SESSION_FILE))
            .await?
            .unwrap_or_default();
        let accounts: HashMap<String, Account> = accounts
            .into_iter()
            .map(|a| (a.email.clone(), a))
            .collect();
        let current = session.uid.and_then(|uid| {
            let restored = accounts.values().find(|a| a.uid == uid).map(Account::identity);
            if restored.is_none() {
                warn!(%uid, "session refers to an unknown account, signed out");
            }
            restored
        });
        info!(accounts = accounts.len(), restored = current.is_some(), "identity store opened");
        Ok(Self {
            accounts: RwLock::new(accounts),
            bcrypt_cost: BCRYPT_COST,
            data_dir: data_dir.to_path_buf(),
            feed: IdentityFeed::new(current),
            writes: tokio::sync::Mutex::new(()),
        })
    }

    /// Override the bcrypt cost, mostly to keep tests fast
    #[must_use]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    pub fn current(&self) -> Option<Identity> {
        self.feed.current()
    }

    async fn persist_accounts(&self) -> Result<(), AuthError> {
        let _guard = self.writes.lock().await;
        let mut accounts: Vec<Account> = self.accounts.read().values().cloned().collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        write_json(&self.data_dir.join(ACCOUNTS_FILE), &accounts).await
    }

    async fn switch_session(&self, identity: Option<Identity>) -> Result<(), AuthError> {
        let session = SessionFile {
            uid: identity.as_ref().map(|i| i.uid.clone()),
        };
        let _guard = self.writes.lock().await;
        write_json(&self.data_dir.join(SESSION_FILE), &session).await?;
        self.feed.publish(identity);
        Ok(())
    }
}

#[async_trait]
impl IdentityService for LocalIdentityService {
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword(MIN_PASSWORD_LEN));
        }
        if self.accounts.read().contains_key(&email) {
            return Err(AuthError::AccountExists(email));
        }
        let cost = self.bcrypt_cost;
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
        let account = Account {
            uid: UserId::generate(),
            email: email.clone(),
            password_hash,
            created_at: Utc::now(),
        };
        {
            let mut accounts = self.accounts.write();
            // re-checked, another sign-up may have won while hashing
            if accounts.contains_key(&email) {
                return Err(AuthError::AccountExists(email));
            }
            accounts.insert(email, account.clone());
        }
        if let Err(err) = self.persist_accounts().await {
            self.accounts.write().remove(&account.email);
            return Err(err);
        }
        let identity = account.identity();
        info!(uid = %identity.uid, "account created");
        self.switch_session(Some(identity.clone())).await?;
        Ok(identity)
    }

    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let email = normalize_email(email)?;
        let account = self
            .accounts
            .read()
            .get(&email)
            .cloned()
            .ok_or_else(|| AuthError::AccountNotFound(email.clone()))?;
        let password = password.to_string();
        let hash = account.password_hash.clone();
        let verified =
            tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
        if !verified {
            return Err(AuthError::InvalidCredentials);
        }
        let identity = account.identity();
        self.switch_session(Some(identity.clone())).await?;
        Ok(identity)
    }

    async fn end_session(&self) -> Result<(), AuthError> {
        self.switch_session(None).await
    }

    fn subscribe(&self) -> IdentityEvents {
        self.feed.subscribe()
    }
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_ascii_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(AuthError::InvalidEmail(email))
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, AuthError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AuthError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension(format!("json.{:016x}.tmp", rand::rng().random::<u64>()));
    let written = match tokio::fs::write(&tmp, bytes).await {
        Ok(()) => tokio::fs::rename(&tmp, path).await,
        Err(err) => Err(err),
    };
    if written.is_err() {
        let _ = tokio::fs::remove_file(&tmp).await;
    }
    Ok(written?)
}
