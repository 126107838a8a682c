use serde::Serialize;

use crate::transaction::TxType;

/// Definition of an EVM-compatible blockchain network.
#[derive(Debug, Clone, Serialize)]
pub struct EvmChain {
    pub chain_id: u64,
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
    pub rpc_url: &'static str,
    pub explorer_url: &'static str,
    /// Envelope the protocol builds for this network.
    pub tx_type: TxType,
}

/// Ethereum Mainnet (chain ID 1).
pub const ETHEREUM: EvmChain = EvmChain {
    chain_id: 1,
    name: "Ethereum",
    symbol: "ETH",
    decimals: 18,
    rpc_url: "https://eth.llamarpc.com",
    explorer_url: "https://etherscan.io",
    tx_type: TxType::Eip1559,
};

/// Polygon PoS (chain ID 137).
pub const POLYGON: EvmChain = EvmChain {
    chain_id: 137,
    name: "Polygon",
    symbol: "POL",
    decimals: 18,
    rpc_url: "https://polygon-rpc.com",
    explorer_url: "https://polygonscan.com",
    tx_type: TxType::Eip1559,
};

/// Arbitrum One (chain ID 42161).
pub const ARBITRUM: EvmChain = EvmChain {
    chain_id: 42161,
    name: "Arbitrum One",
    symbol: "ETH",
    decimals: 18,
    rpc_url: "https://arb1.arbitrum.io/rpc",
    explorer_url: "https://arbiscan.io",
    tx_type: TxType::Eip1559,
};

/// Base (chain ID 8453).
pub const BASE: EvmChain = EvmChain {
    chain_id: 8453,
    name: "Base",
    symbol: "ETH",
    decimals: 18,
    rpc_url: "https://mainnet.base.org",
    explorer_url: "https://basescan.org",
    tx_type: TxType::Eip1559,
};

/// Optimism (chain ID 10).
pub const OPTIMISM: EvmChain = EvmChain {
    chain_id: 10,
    name: "Optimism",
    symbol: "ETH",
    decimals: 18,
    rpc_url: "https://mainnet.optimism.io",
    explorer_url: "https://optimistic.etherscan.io",
    tx_type: TxType::Eip1559,
};

/// BNB Smart Chain (chain ID 56). Transfers use EIP-155 legacy envelopes.
pub const BSC: EvmChain = EvmChain {
    chain_id: 56,
    name: "BNB Smart Chain",
    symbol: "BNB",
    decimals: 18,
    rpc_url: "https://bsc-dataseed.binance.org",
    explorer_url: "https://bscscan.com",
    tx_type: TxType::Legacy,
};

const ALL_CHAINS: &[&EvmChain] = &[&ETHEREUM, &POLYGON, &ARBITRUM, &BASE, &OPTIMISM, &BSC];

/// Returns the chain definition for a given chain ID, or `None` if unsupported.
pub fn get_chain(chain_id: u64) -> Option<&'static EvmChain> {
    ALL_CHAINS
        .iter()
        .find(|c| c.chain_id == chain_id)
        .copied()
}

/// Returns all supported EVM chain definitions.
pub fn supported_chains() -> Vec<&'static EvmChain> {
    ALL_CHAINS.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_ethereum() {
        let chain = get_chain(1).expect("Ethereum should be supported");
        assert_eq!(chain.name, "Ethereum");
        assert_eq!(chain.symbol, "ETH");
        assert_eq!(chain.tx_type, TxType::Eip1559);
    }

    #[test]
    fn get_bsc_uses_legacy() {
        let chain = get_chain(56).expect("BSC should be supported");
        assert_eq!(chain.symbol, "BNB");
        assert_eq!(chain.tx_type, TxType::Legacy);
    }

    #[test]
    fn only_bsc_is_legacy() {
        let legacy: Vec<_> = supported_chains()
            .into_iter()
            .filter(|c| c.tx_type == TxType::Legacy)
            .collect();
        assert_eq!(legacy.len(), 1);
        assert_eq!(legacy[0].chain_id, 56);
    }

    #[test]
    fn unsupported_chain_returns_none() {
        assert!(get_chain(999999).is_none());
        // Avalanche is not part of the transfer protocol.
        assert!(get_chain(43114).is_none());
    }

    #[test]
    fn supported_chains_includes_all() {
        assert_eq!(supported_chains().len(), 6);
    }

    #[test]
    fn all_chains_have_18_decimals() {
        for chain in supported_chains() {
            assert_eq!(chain.decimals, 18, "{} should have 18 decimals", chain.name);
        }
    }

    #[test]
    fn all_chains_have_https_urls() {
        for chain in supported_chains() {
            assert!(chain.rpc_url.starts_with("https://"), "{}", chain.name);
            assert!(chain.explorer_url.starts_with("https://"), "{}", chain.name);
        }
    }
}
