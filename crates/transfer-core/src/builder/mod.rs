//! Per-chain builders that turn a confirmed record into an unsigned
//! transaction and the bytes the sender's wallet must sign.

pub mod evm;
pub mod solana;

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::TransferConfig;
use crate::error::{Result, TransferError};
use crate::rpc::{EvmRpc, SolanaRpc};
use crate::state::TxStateMachine;
use crate::types::{Chain, ChainFamily};

pub use evm::{build_evm_call_payload, fee_params};
pub use solana::{build_solana_call_payload, MAX_SAFE_INTEGER};

/// Chain RPC handles keyed by network.
#[derive(Clone, Default)]
pub struct ChainClients {
    evm: HashMap<Chain, Arc<dyn EvmRpc>>,
    solana: Option<Arc<dyn SolanaRpc>>,
}

impl ChainClients {
    pub fn new() -> Self {
        Self::default()
    }

    /// HTTP clients for every chain with a configured endpoint.
    pub fn from_config(config: &TransferConfig) -> Result<Self> {
        let mut clients = Self::new();
        for chain in config.rpc_urls.keys().copied() {
            match chain.family()? {
                ChainFamily::Evm(_) => {
                    clients = clients.with_evm(chain, Arc::new(config.evm_rpc(chain)?));
                }
                ChainFamily::Solana => {
                    clients = clients.with_solana(Arc::new(config.solana_rpc()?));
                }
            }
        }
        Ok(clients)
    }

    pub fn with_evm(mut self, chain: Chain, rpc: Arc<dyn EvmRpc>) -> Self {
        self.evm.insert(chain, rpc);
        self
    }

    pub fn with_solana(mut self, rpc: Arc<dyn SolanaRpc>) -> Self {
        self.solana = Some(rpc);
        self
    }

    pub fn evm(&self, chain: Chain) -> Result<&dyn EvmRpc> {
        self.evm
            .get(&chain)
            .map(|rpc| rpc.as_ref())
            .ok_or_else(|| TransferError::Config(format!("no RPC client for {chain}")))
    }

    pub fn solana(&self) -> Result<&dyn SolanaRpc> {
        self.solana
            .as_deref()
            .ok_or_else(|| TransferError::Config("no RPC client for Solana".into()))
    }
}

/// Build the call payload for the sender's network.
///
/// The record must be in the receiver-confirmed group. Unsupported chains
/// fail before any network call.
pub async fn prepare_call_payload(
    record: &TxStateMachine,
    clients: &ChainClients,
) -> Result<TxStateMachine> {
    let status = record.status_tag();
    if !status.is_receiver_confirmed() {
        return Err(TransferError::transition(status, "build a transaction"));
    }

    match record.sender_address_network.family()? {
        ChainFamily::Evm(_) => {
            let rpc = clients.evm(record.sender_address_network)?;
            build_evm_call_payload(record, rpc).await
        }
        ChainFamily::Solana => build_solana_call_payload(record, clients.solana()?).await,
    }
}
