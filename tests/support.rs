use std::ffi::OsString;
use std::sync::{Mutex, MutexGuard, OnceLock};

use tempfile::TempDir;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("lock test env")
}

#[derive(Default)]
struct EnvRestore {
    saved: Vec<(&'static str, Option<OsString>)>,
}

impl EnvRestore {
    fn save_once(&mut self, key: &'static str) {
        if self.saved.iter().any(|(k, _)| *k == key) {
            return;
        }
        self.saved.push((key, std::env::var_os(key)));
    }

    fn set_var(&mut self, key: &'static str, value: impl Into<OsString>) {
        self.save_once(key);
        std::env::set_var(key, value.into());
    }

    fn remove_var(&mut self, key: &'static str) {
        self.save_once(key);
        std::env::remove_var(key);
    }
}

impl Drop for EnvRestore {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain(..).rev() {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

/// Serialized, isolated process environment for tests touching env vars or
/// the config directory.
pub struct TestEnv {
    _lock: MutexGuard<'static, ()>,
    env: EnvRestore,
    config_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let lock = env_lock();
        let config_dir = tempfile::tempdir().expect("tempdir");

        let mut env = EnvRestore::default();
        env.set_var(
            "XERO_CONFIG_DIR",
            config_dir.path().as_os_str().to_os_string(),
        );
        env.set_var("XERO_CLIENT_ID", "test-client-id");
        env.set_var("XERO_CLIENT_SECRET", "test-client-secret");

        Self {
            _lock: lock,
            env,
            config_dir,
        }
    }

    #[allow(dead_code)]
    pub fn config_dir(&self) -> &std::path::Path {
        self.config_dir.path()
    }

    #[allow(dead_code)]
    pub fn set_var(&mut self, key: &'static str, value: &str) {
        self.env.set_var(key, value);
    }

    #[allow(dead_code)]
    pub fn remove_var(&mut self, key: &'static str) {
        self.env.remove_var(key);
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
