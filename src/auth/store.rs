//! Usage: Token file persistence (single JSON record, overwritten wholesale).

use crate::auth::token::TokenRecord;
use crate::shared::error::{AppError, AppResult};
use std::path::{Path, PathBuf};

const TOKEN_FILE: &str = "token.json";

#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(config_dir: &Path) -> Self {
        Self {
            path: config_dir.join(TOKEN_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted record, `None` when no file exists. A loaded record
    /// may be expired; the caller must check against the current clock.
    pub fn load(&self) -> AppResult<Option<TokenRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| AppError::TokenStore(format!("read {}: {e}", self.path.display())))?;
        let record: TokenRecord = serde_json::from_str(&content)
            .map_err(|e| AppError::TokenStore(format!("parse {}: {e}", self.path.display())))?;
        Ok(Some(record))
    }

    /// Overwrite via temp file + rename so a crash mid-write never leaves a
    /// truncated token file.
    pub fn save(&self, record: &TokenRecord) -> AppResult<()> {
        let content = serde_json::to_vec_pretty(record)
            .map_err(|e| AppError::TokenStore(format!("serialize token: {e}")))?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)
            .map_err(|e| AppError::TokenStore(format!("write {}: {e}", tmp_path.display())))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            AppError::TokenStore(format!("finalize {}: {e}", self.path.display()))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(expires_at: i64) -> TokenRecord {
        TokenRecord {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at,
            token_type: "Bearer".to_string(),
            scope: vec!["offline_access".to_string()],
        }
    }

    #[test]
    fn load_returns_none_without_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TokenStore::new(dir.path());
        assert!(store.load().expect("load").is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TokenStore::new(dir.path());
        store.save(&record(1234)).expect("save");
        let loaded = store.load().expect("load").expect("record");
        assert_eq!(loaded, record(1234));
    }

    #[test]
    fn save_overwrites_previous_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TokenStore::new(dir.path());
        store.save(&record(1000)).expect("first save");
        store.save(&record(2000)).expect("second save");
        let loaded = store.load().expect("load").expect("record");
        assert_eq!(loaded.expires_at, 2000);
    }

    #[test]
    fn corrupt_file_is_a_store_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TokenStore::new(dir.path());
        std::fs::write(store.path(), "not json").expect("write");
        assert!(matches!(
            store.load().expect_err("must fail"),
            AppError::TokenStore(_)
        ));
    }
}
