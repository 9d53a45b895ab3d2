//!
//! rollcall configuration
//! ----------------------
//! Runtime settings read from `ROLLCALL_*` environment variables, plus the
//! process secret key. The key is generated once at startup, lives only in
//! memory, and is never persisted or logged; restarting the process
//! invalidates every outstanding token.

use std::fmt;

use anyhow::anyhow;

use crate::identity::DEFAULT_TOKEN_LIFESPAN_DAYS;

pub const DEFAULT_HTTP_PORT: u16 = 4680;
pub const DEFAULT_DB_FOLDER: &str = "data";

/// Upper bound on the configurable token lifespan (ten years). Values outside
/// 1..=TOKEN_DAYS_MAX fall back to the default; an unbounded value would
/// overflow expiry arithmetic in the codec.
pub const TOKEN_DAYS_MAX: i64 = 3650;

/// Server settings resolved from the environment with fixed defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub db_root: String,
    pub token_lifespan_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            db_root: DEFAULT_DB_FOLDER.to_string(),
            token_lifespan_days: DEFAULT_TOKEN_LIFESPAN_DAYS,
        }
    }
}

impl Config {
    /// Read `ROLLCALL_HTTP_PORT`, `ROLLCALL_DB_FOLDER` and `ROLLCALL_TOKEN_DAYS`,
    /// falling back to the defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut cfg = Config::default();
        if let Some(port) = std::env::var("ROLLCALL_HTTP_PORT").ok().and_then(|s| s.parse().ok()) {
            cfg.http_port = port;
        }
        if let Ok(folder) = std::env::var("ROLLCALL_DB_FOLDER") {
            cfg.db_root = folder;
        }
        if let Some(days) = std::env::var("ROLLCALL_TOKEN_DAYS").ok().and_then(|s| s.parse().ok()) {
            if (1..=TOKEN_DAYS_MAX).contains(&days) {
                cfg.token_lifespan_days = days;
            }
        }
        cfg
    }
}

/// 32 bytes of signing key material for the token codec.
///
/// Held immutably for the process lifetime. The Debug impl is redacted so the
/// key cannot leak through logs or error formatting.
pub struct SecretKey([u8; 32]);

impl SecretKey {
    /// Generate a fresh key from the OS entropy source.
    pub fn generate() -> anyhow::Result<Self> {
        let mut bytes = [0u8; 32];
        getrandom::getrandom(&mut bytes)
            .map_err(|e| anyhow!("secret key generation failed: {}", e))?;
        Ok(Self(bytes))
    }

    /// Build a key from caller-supplied bytes. Intended for tests and benches
    /// that need deterministic signatures.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}
