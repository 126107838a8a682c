use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, TransferError};
use crate::relay::HttpRelayClient;
use crate::rpc::{HttpEvmRpc, HttpSolanaRpc};
use crate::types::{Chain, ChainFamily};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SOLANA_RPC: &str = "https://api.mainnet-beta.solana.com";
const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_SOLANA_MAX_RETRIES: usize = 5;
const DEFAULT_CONFIRM_POLL_MS: u64 = 500;

pub const ENV_RELAY_URL: &str = "TRANSFER_RELAY_URL";
pub const ENV_RPC_PREFIX: &str = "TRANSFER_RPC_";

/// Solana commitment level for reads and preflight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolanaConfig {
    /// Passed as `maxRetries` to `sendTransaction`; the RPC node retries.
    pub max_retries: Option<usize>,
    pub commitment: Commitment,
    pub confirm_poll_interval_ms: u64,
}

impl Default for SolanaConfig {
    fn default() -> Self {
        Self {
            max_retries: Some(DEFAULT_SOLANA_MAX_RETRIES),
            commitment: Commitment::Confirmed,
            confirm_poll_interval_ms: DEFAULT_CONFIRM_POLL_MS,
        }
    }
}

/// Endpoints and transport settings for the protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferConfig {
    pub rpc_urls: BTreeMap<Chain, String>,
    pub relay_url: String,
    pub http_timeout_secs: u64,
    #[serde(default)]
    pub solana: SolanaConfig,
}

impl Default for TransferConfig {
    fn default() -> Self {
        let rpc_urls = Chain::ALL
            .into_iter()
            .filter_map(|chain| match chain.family() {
                Ok(ChainFamily::Evm(evm)) => Some((chain, evm.rpc_url.to_string())),
                Ok(ChainFamily::Solana) => Some((chain, DEFAULT_SOLANA_RPC.to_string())),
                Err(_) => None,
            })
            .collect();

        Self {
            rpc_urls,
            relay_url: DEFAULT_RELAY_URL.to_string(),
            http_timeout_secs: DEFAULT_TIMEOUT_SECS,
            solana: SolanaConfig::default(),
        }
    }
}

impl TransferConfig {
    /// Load from a JSON file, falling back to defaults when it is missing.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| TransferError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;

        info!(path = %path.display(), "loaded transfer config");
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Apply `TRANSFER_RELAY_URL` and `TRANSFER_RPC_<CHAIN>` from the
    /// environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub(crate) fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup(ENV_RELAY_URL) {
            check_url(&url)?;
            self.relay_url = url;
        }

        for chain in Chain::ALL {
            let key = format!("{ENV_RPC_PREFIX}{}", chain.key().to_uppercase());
            if let Some(url) = lookup(&key) {
                self.set_rpc_url(chain, url)?;
            }
        }

        Ok(self)
    }

    /// Point `chain` at a custom RPC endpoint.
    pub fn set_rpc_url(&mut self, chain: Chain, url: String) -> Result<()> {
        chain.family()?;
        check_url(&url)?;
        self.rpc_urls.insert(chain, url);
        Ok(())
    }

    pub fn rpc_url(&self, chain: Chain) -> Result<&str> {
        chain.family()?;
        self.rpc_urls
            .get(&chain)
            .map(String::as_str)
            .ok_or_else(|| TransferError::Config(format!("no RPC URL configured for {chain}")))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        check_url(&self.relay_url)?;
        for (chain, url) in &self.rpc_urls {
            chain.family()?;
            check_url(url)?;
        }
        if self.http_timeout_secs == 0 {
            return Err(TransferError::Config("http_timeout_secs must be > 0".into()));
        }
        Ok(())
    }

    pub fn evm_rpc(&self, chain: Chain) -> Result<HttpEvmRpc> {
        match chain.family()? {
            ChainFamily::Evm(_) => HttpEvmRpc::new(self.rpc_url(chain)?, self.http_timeout()),
            ChainFamily::Solana => Err(TransferError::Config(format!("{chain} is not an EVM chain"))),
        }
    }

    pub fn solana_rpc(&self) -> Result<HttpSolanaRpc> {
        HttpSolanaRpc::new(
            self.rpc_url(Chain::Solana)?,
            self.http_timeout(),
            self.solana.commitment,
            self.solana.max_retries,
        )
    }

    pub fn relay_client(&self) -> Result<HttpRelayClient> {
        HttpRelayClient::new(&self.relay_url, self.http_timeout())
    }
}

/// Accept only http(s) URLs with a host.
pub fn validate_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            (scheme == "http" || scheme == "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}

fn check_url(url: &str) -> Result<()> {
    if !validate_url(url) {
        return Err(TransferError::Config(format!("invalid URL: {url}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_cover_supported_chains_only() {
        let config = TransferConfig::default();
        assert_eq!(config.rpc_url(Chain::Ethereum).unwrap(), "https://eth.llamarpc.com");
        assert_eq!(config.rpc_url(Chain::Solana).unwrap(), DEFAULT_SOLANA_RPC);
        assert!(config.rpc_url(Chain::Bnb).is_ok());
        assert!(matches!(
            config.rpc_url(Chain::Tron),
            Err(TransferError::UnsupportedChain(Chain::Tron))
        ));
        config.validate().unwrap();
    }

    #[test]
    fn set_rpc_url_rejects_bad_urls() {
        let mut config = TransferConfig::default();
        assert!(config.set_rpc_url(Chain::Base, "not-a-url".into()).is_err());
        assert!(config.set_rpc_url(Chain::Base, "ftp://files.example.com".into()).is_err());
        config
            .set_rpc_url(Chain::Base, "http://localhost:8545".into())
            .unwrap();
        assert_eq!(config.rpc_url(Chain::Base).unwrap(), "http://localhost:8545");
    }

    #[test]
    fn overrides_apply_relay_and_chain_urls() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("TRANSFER_RELAY_URL", "https://relay.example.com"),
            ("TRANSFER_RPC_SOLANA", "https://sol.example.com"),
            ("TRANSFER_RPC_BNB", "https://bsc.example.com"),
        ]);

        let config = TransferConfig::default()
            .with_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.relay_url, "https://relay.example.com");
        assert_eq!(config.rpc_url(Chain::Solana).unwrap(), "https://sol.example.com");
        assert_eq!(config.rpc_url(Chain::Bnb).unwrap(), "https://bsc.example.com");
    }

    #[test]
    fn overrides_reject_invalid_url() {
        let result = TransferConfig::default().with_overrides(|key| {
            (key == "TRANSFER_RPC_ETHEREUM").then(|| "garbage".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("transfer.json");

        let mut config = TransferConfig::default();
        config.solana.max_retries = Some(2);
        config.http_timeout_secs = 5;
        config.save_to_path(&path).unwrap();

        let loaded = TransferConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = TransferConfig::load_from_path(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, TransferConfig::default());
    }

    #[test]
    fn load_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(TransferConfig::load_from_path(&path).is_err());
    }

    #[test]
    fn zero_timeout_is_invalid() {
        let config = TransferConfig {
            http_timeout_secs: 0,
            ..TransferConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_url_cases() {
        assert!(validate_url("https://rpc.example.com"));
        assert!(validate_url("http://localhost:8545"));
        assert!(!validate_url(""));
        assert!(!validate_url("file:///etc/passwd"));
    }
}
