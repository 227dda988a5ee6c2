//! Usage: Per-flow auth session state (anti-CSRF random state value).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

const STATE_ENTROPY_BYTES: usize = 32;

/// One authorization flow's identity. A fresh state is mandatory per flow;
/// sessions are never reused.
#[derive(Debug, Clone)]
pub struct AuthSession {
    state: String,
}

impl AuthSession {
    pub fn new() -> Self {
        let mut bytes = [0u8; STATE_ENTROPY_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self {
            state: URL_SAFE_NO_PAD.encode(bytes),
        }
    }

    pub fn state(&self) -> &str {
        &self.state
    }
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::new()
    }
}
