use std::fmt;

use chain_eth::chains::{self, EvmChain};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TransferError};

/// Networks a transfer record can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Chain {
    Ethereum,
    Base,
    Polygon,
    Optimism,
    Arbitrum,
    Bnb,
    Solana,
    Polkadot,
    Tron,
    Bitcoin,
}

/// How transactions for a chain are built and signed.
#[derive(Debug, Clone, Copy)]
pub enum ChainFamily {
    /// EVM network; the chain table says which envelope it uses.
    Evm(&'static EvmChain),
    Solana,
}

impl Chain {
    pub const ALL: [Chain; 10] = [
        Chain::Ethereum,
        Chain::Base,
        Chain::Polygon,
        Chain::Optimism,
        Chain::Arbitrum,
        Chain::Bnb,
        Chain::Solana,
        Chain::Polkadot,
        Chain::Tron,
        Chain::Bitcoin,
    ];

    /// Builder family for this chain. Recognized chains without a builder
    /// return `UnsupportedChain`.
    pub fn family(&self) -> Result<ChainFamily> {
        let evm = |chain: &'static EvmChain| Ok(ChainFamily::Evm(chain));
        match self {
            Chain::Ethereum => evm(&chains::ETHEREUM),
            Chain::Base => evm(&chains::BASE),
            Chain::Polygon => evm(&chains::POLYGON),
            Chain::Optimism => evm(&chains::OPTIMISM),
            Chain::Arbitrum => evm(&chains::ARBITRUM),
            Chain::Bnb => evm(&chains::BSC),
            Chain::Solana => Ok(ChainFamily::Solana),
            Chain::Polkadot | Chain::Tron | Chain::Bitcoin => {
                Err(TransferError::UnsupportedChain(*self))
            }
        }
    }

    /// Look up the chain for an EVM chain ID.
    pub fn from_evm_chain_id(chain_id: u64) -> Option<Chain> {
        Chain::ALL.into_iter().find(|chain| {
            matches!(chain.family(), Ok(ChainFamily::Evm(evm)) if evm.chain_id == chain_id)
        })
    }

    pub fn is_supported(&self) -> bool {
        self.family().is_ok()
    }

    /// Native asset symbol
    pub fn native_symbol(&self) -> &'static str {
        match self {
            Chain::Ethereum | Chain::Base | Chain::Optimism | Chain::Arbitrum => "ETH",
            Chain::Polygon => "POL",
            Chain::Bnb => "BNB",
            Chain::Solana => "SOL",
            Chain::Polkadot => "DOT",
            Chain::Tron => "TRX",
            Chain::Bitcoin => "BTC",
        }
    }

    /// Decimals of the native asset's base unit
    pub fn native_decimals(&self) -> u8 {
        match self {
            Chain::Ethereum
            | Chain::Base
            | Chain::Polygon
            | Chain::Optimism
            | Chain::Arbitrum
            | Chain::Bnb => 18,
            Chain::Solana => 9,
            Chain::Polkadot => 10,
            Chain::Tron => 6,
            Chain::Bitcoin => 8,
        }
    }

    /// Lower-case key used in config files and environment variables.
    pub fn key(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Base => "base",
            Chain::Polygon => "polygon",
            Chain::Optimism => "optimism",
            Chain::Arbitrum => "arbitrum",
            Chain::Bnb => "bnb",
            Chain::Solana => "solana",
            Chain::Polkadot => "polkadot",
            Chain::Tron => "tron",
            Chain::Bitcoin => "bitcoin",
        }
    }

    /// Check that `address` is well formed for this chain.
    pub fn validate_address(&self, address: &str) -> Result<()> {
        match self.family()? {
            ChainFamily::Evm(_) => {
                if !chain_eth::address::validate_address(address)? {
                    return Err(TransferError::Validation(format!(
                        "{address} fails its EIP-55 checksum"
                    )));
                }
            }
            ChainFamily::Solana => {
                chain_sol::validate_address(address)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A token that lives on a chain under that chain's token standard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FungibleToken {
    /// Contract address (EVM, Tron) or mint address (Solana).
    pub address: String,
    pub name: String,
    pub decimals: u8,
}

/// Token choice on an EVM network with ERC-20 tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvmToken {
    Native,
    #[serde(rename = "ERC20")]
    Erc20(FungibleToken),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BnbToken {
    Native,
    #[serde(rename = "BEP20")]
    Bep20(FungibleToken),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolanaToken {
    Native,
    #[serde(rename = "SPL")]
    Spl(FungibleToken),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TronToken {
    Native,
    #[serde(rename = "TRC20")]
    Trc20(FungibleToken),
}

/// Chains whose only transferable asset is the native one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NativeToken {
    Native,
}

/// The asset being transferred. The outer tag is the chain it lives on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Token {
    Ethereum(EvmToken),
    Base(EvmToken),
    Polygon(EvmToken),
    Optimism(EvmToken),
    Arbitrum(EvmToken),
    Bnb(BnbToken),
    Solana(SolanaToken),
    Tron(TronToken),
    Polkadot(NativeToken),
    Bitcoin(NativeToken),
}

impl Token {
    /// The native asset of `chain`.
    pub fn native(chain: Chain) -> Token {
        match chain {
            Chain::Ethereum => Token::Ethereum(EvmToken::Native),
            Chain::Base => Token::Base(EvmToken::Native),
            Chain::Polygon => Token::Polygon(EvmToken::Native),
            Chain::Optimism => Token::Optimism(EvmToken::Native),
            Chain::Arbitrum => Token::Arbitrum(EvmToken::Native),
            Chain::Bnb => Token::Bnb(BnbToken::Native),
            Chain::Solana => Token::Solana(SolanaToken::Native),
            Chain::Tron => Token::Tron(TronToken::Native),
            Chain::Polkadot => Token::Polkadot(NativeToken::Native),
            Chain::Bitcoin => Token::Bitcoin(NativeToken::Native),
        }
    }

    /// The chain's standard fungible token. Fails for chains without one.
    pub fn fungible(chain: Chain, token: FungibleToken) -> Result<Token> {
        Ok(match chain {
            Chain::Ethereum => Token::Ethereum(EvmToken::Erc20(token)),
            Chain::Base => Token::Base(EvmToken::Erc20(token)),
            Chain::Polygon => Token::Polygon(EvmToken::Erc20(token)),
            Chain::Optimism => Token::Optimism(EvmToken::Erc20(token)),
            Chain::Arbitrum => Token::Arbitrum(EvmToken::Erc20(token)),
            Chain::Bnb => Token::Bnb(BnbToken::Bep20(token)),
            Chain::Solana => Token::Solana(SolanaToken::Spl(token)),
            Chain::Tron => Token::Tron(TronToken::Trc20(token)),
            Chain::Polkadot | Chain::Bitcoin => {
                return Err(TransferError::Validation(format!(
                    "{chain} has no fungible token standard"
                )))
            }
        })
    }

    /// The chain this token lives on.
    pub fn chain(&self) -> Chain {
        match self {
            Token::Ethereum(_) => Chain::Ethereum,
            Token::Base(_) => Chain::Base,
            Token::Polygon(_) => Chain::Polygon,
            Token::Optimism(_) => Chain::Optimism,
            Token::Arbitrum(_) => Chain::Arbitrum,
            Token::Bnb(_) => Chain::Bnb,
            Token::Solana(_) => Chain::Solana,
            Token::Tron(_) => Chain::Tron,
            Token::Polkadot(_) => Chain::Polkadot,
            Token::Bitcoin(_) => Chain::Bitcoin,
        }
    }

    /// The token descriptor, or `None` for a native asset.
    pub fn as_fungible(&self) -> Option<&FungibleToken> {
        match self {
            Token::Ethereum(EvmToken::Erc20(t))
            | Token::Base(EvmToken::Erc20(t))
            | Token::Polygon(EvmToken::Erc20(t))
            | Token::Optimism(EvmToken::Erc20(t))
            | Token::Arbitrum(EvmToken::Erc20(t))
            | Token::Bnb(BnbToken::Bep20(t))
            | Token::Solana(SolanaToken::Spl(t))
            | Token::Tron(TronToken::Trc20(t)) => Some(t),
            _ => None,
        }
    }

    pub fn is_native(&self) -> bool {
        self.as_fungible().is_none()
    }

    pub fn decimals(&self) -> u8 {
        self.as_fungible()
            .map(|t| t.decimals)
            .unwrap_or_else(|| self.chain().native_decimals())
    }

    /// Display symbol: the chain's native symbol or the token name.
    pub fn symbol(&self) -> &str {
        self.as_fungible()
            .map(|t| t.name.as_str())
            .unwrap_or_else(|| self.chain().native_symbol())
    }
}
