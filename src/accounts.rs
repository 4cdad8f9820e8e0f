//! Accounts and best scores, kept in one flat JSON file.
//!
//! The file maps an email address to its password digest and best score. It
//! is rewritten whole after every change; there is no journaling.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot read score file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("cannot write score file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("score file {path} is not valid: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("cannot encode accounts: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Why an account request was turned down. The message is shown to the player
/// as is; they can fix the input and try again.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("that is not an email address")]
    InvalidEmail,
    #[error("an account with this email already exists")]
    AlreadyRegistered,
    #[error("password must be at least 8 characters")]
    PasswordTooShort,
    #[error("no account with this email")]
    UnknownAccount,
    #[error("wrong password")]
    WrongPassword,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccountRecord {
    password: String,
    #[serde(default)]
    best_score: u32,
    /// Registration sequence number; breaks ranking ties.
    #[serde(default)]
    registered: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankEntry {
    pub account: String,
    pub best_score: u32,
}

pub struct ScoreStore {
    path: PathBuf,
    accounts: BTreeMap<String, AccountRecord>,
}

impl ScoreStore {
    /// Loads the store, creating an empty file when none exists yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let accounts = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let store = Self {
                    path,
                    accounts: BTreeMap::new(),
                };
                store.persist()?;
                info!(path = %store.path.display(), "created score file");
                return Ok(store);
            }
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        debug!(path = %path.display(), accounts = accounts.len(), "score file loaded");
        Ok(Self { path, accounts })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn register(&mut self, id: &str, password: &str) -> Result<(), AccountError> {
        if !is_valid_email(id) {
            return Err(AccountError::InvalidEmail);
        }
        if self.accounts.contains_key(id) {
            return Err(AccountError::AlreadyRegistered);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AccountError::PasswordTooShort);
        }
        let registered = self
            .accounts
            .values()
            .map(|r| r.registered + 1)
            .max()
            .unwrap_or(0);
        self.accounts.insert(
            id.to_string(),
            AccountRecord {
                password: hash_password(password),
                best_score: 0,
                registered,
            },
        );
        if let Err(e) = self.persist() {
            self.accounts.remove(id);
            return Err(e.into());
        }
        info!(account = id, "account registered");
        Ok(())
    }

    pub fn login(&self, id: &str, password: &str) -> Result<(), AccountError> {
        let record = self.accounts.get(id).ok_or(AccountError::UnknownAccount)?;
        if record.password != hash_password(password) {
            return Err(AccountError::WrongPassword);
        }
        Ok(())
    }

    pub fn best_score(&self, id: &str) -> Option<u32> {
        self.accounts.get(id).map(|r| r.best_score)
    }

    /// Records `score` if it beats the account's best. Returns whether it did.
    pub fn save_score(&mut self, id: &str, score: u32) -> Result<bool, AccountError> {
        let record = self
            .accounts
            .get_mut(id)
            .ok_or(AccountError::UnknownAccount)?;
        if score <= record.best_score {
            return Ok(false);
        }
        let previous = record.best_score;
        record.best_score = score;
        if let Err(e) = self.persist() {
            if let Some(record) = self.accounts.get_mut(id) {
                record.best_score = previous;
            }
            return Err(e.into());
        }
        info!(account = id, score, previous, "new best score");
        Ok(true)
    }

    /// Best scores, highest first. Equal scores keep registration order.
    pub fn top_ranking(&self, n: usize) -> Vec<RankEntry> {
        let mut rows: Vec<(&String, &AccountRecord)> = self.accounts.iter().collect();
        rows.sort_by(|(_, a), (_, b)| {
            b.best_score
                .cmp(&a.best_score)
                .then(a.registered.cmp(&b.registered))
        });
        rows.into_iter()
            .take(n)
            .map(|(id, r)| RankEntry {
                account: id.clone(),
                best_score: r.best_score,
            })
            .collect()
    }

    fn persist(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.accounts)?;
        fs::write(&self.path, json).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn is_word_or(c: char, extra: &[char]) -> bool {
    c.is_alphanumeric() || c == '_' || extra.contains(&c)
}

/// `local@domain.tld`, where local and domain use word characters, dots and
/// hyphens and the top-level part is word characters only.
pub fn is_valid_email(id: &str) -> bool {
    let Some((local, domain)) = id.split_once('@') else {
        return false;
    };
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    let part_ok = |s: &str| !s.is_empty() && s.chars().all(|c| is_word_or(c, &['.', '-']));
    part_ok(local) && part_ok(host) && !tld.is_empty() && tld.chars().all(|c| is_word_or(c, &[]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn temp_store() -> (ScoreStore, PathBuf) {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "signal-runner-accounts-{}-{n}.json",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        (ScoreStore::open(&path).unwrap(), path)
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("rider@example.com"));
        assert!(is_valid_email("a.b-c_d@mail.example.co"));
        assert!(!is_valid_email("rider.example.com"));
        assert!(!is_valid_email("rider@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("rider@.com"));
        assert!(!is_valid_email("rider@example."));
        assert!(!is_valid_email("ri der@example.com"));
        assert!(!is_valid_email("a@b@example.com"));
    }

    #[test]
    fn open_creates_empty_file() {
        let (store, path) = temp_store();
        assert!(store.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "{}");
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn malformed_id_is_rejected_without_writing() {
        let (mut store, path) = temp_store();
        let before = fs::read_to_string(&path).unwrap();

        let err = store.register("not-an-email", "longenough").unwrap_err();
        assert!(matches!(err, AccountError::InvalidEmail));
        assert_eq!(err.to_string(), "that is not an email address");
        assert!(store.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn register_validates_then_logs_in() {
        let (mut store, path) = temp_store();
        assert!(matches!(
            store.register("rider@example.com", "short"),
            Err(AccountError::PasswordTooShort)
        ));
        store.register("rider@example.com", "handsignal").unwrap();
        assert!(matches!(
            store.register("rider@example.com", "handsignal"),
            Err(AccountError::AlreadyRegistered)
        ));

        store.login("rider@example.com", "handsignal").unwrap();
        assert!(matches!(
            store.login("rider@example.com", "wrong-pass"),
            Err(AccountError::WrongPassword)
        ));
        assert!(matches!(
            store.login("nobody@example.com", "handsignal"),
            Err(AccountError::UnknownAccount)
        ));

        // The digest, not the password, lands on disk.
        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("handsignal"));
        assert!(raw.contains(&hash_password("handsignal")));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn save_score_only_raises_best() {
        let (mut store, path) = temp_store();
        store.register("rider@example.com", "handsignal").unwrap();

        assert!(store.save_score("rider@example.com", 210).unwrap());
        assert!(!store.save_score("rider@example.com", 140).unwrap());
        assert!(!store.save_score("rider@example.com", 210).unwrap());
        assert_eq!(store.best_score("rider@example.com"), Some(210));
        assert!(matches!(
            store.save_score("ghost@example.com", 10),
            Err(AccountError::UnknownAccount)
        ));

        let reopened = ScoreStore::open(&path).unwrap();
        assert_eq!(reopened.best_score("rider@example.com"), Some(210));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn ranking_sorted_descending_with_registration_tiebreak() {
        let (mut store, path) = temp_store();
        for (id, score) in [
            ("zed@example.com", 140),
            ("amy@example.com", 350),
            ("kim@example.com", 140),
            ("bob@example.com", 70),
        ] {
            store.register(id, "handsignal").unwrap();
            store.save_score(id, score).unwrap();
        }

        let top = store.top_ranking(3);
        let ids: Vec<&str> = top.iter().map(|r| r.account.as_str()).collect();
        assert_eq!(ids, ["amy@example.com", "zed@example.com", "kim@example.com"]);

        let all = store.top_ranking(10);
        assert_eq!(all.len(), 4);
        assert!(all.windows(2).all(|w| w[0].best_score >= w[1].best_score));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn corrupt_file_is_reported() {
        let (_, path) = temp_store();
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            ScoreStore::open(&path),
            Err(StoreError::Parse { .. })
        ));
        fs::remove_file(path).unwrap();
    }
}
