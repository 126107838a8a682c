//! SPL Token operations for Solana.
//!
//! Implements the `TransferChecked` and idempotent associated token account
//! (ATA) creation instructions, plus ATA address derivation, without pulling
//! in the `solana-sdk` or the `spl-token` crates. Both the original Token
//! program and Token-2022 are supported; the program owning the mint decides
//! which one an instruction targets.

use sha2::{Digest, Sha256};

use crate::address::is_on_curve;
use crate::error::SolError;
use crate::transaction::{SolAccountMeta, SolInstruction, SYSTEM_PROGRAM_ID};

// ---------------------------------------------------------------------------
// Well-known program IDs
// ---------------------------------------------------------------------------

/// SPL Token Program ID: `TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`
pub const TOKEN_PROGRAM_ID: [u8; 32] = [
    0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb, 0x79, 0xac,
    0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85, 0x7e, 0xff, 0x00, 0xa9,
];

/// Token-2022 Program ID: `TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb`
pub const TOKEN_2022_PROGRAM_ID: [u8; 32] = [
    0x06, 0xdd, 0xf6, 0xe1, 0xee, 0x75, 0x8f, 0xde, 0x18, 0x42, 0x5d, 0xbc, 0xe4, 0x6c, 0xcd, 0xda,
    0xb6, 0x1a, 0xfc, 0x4d, 0x83, 0xb9, 0x0d, 0x27, 0xfe, 0xbd, 0xf9, 0x28, 0xd8, 0xa1, 0x8b, 0xfc,
];

/// Associated Token Account Program ID: `ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`
pub const ASSOCIATED_TOKEN_PROGRAM_ID: [u8; 32] = [
    0x8c, 0x97, 0x25, 0x8f, 0x4e, 0x24, 0x89, 0xf1, 0xbb, 0x3d, 0x10, 0x29, 0x14, 0x8e, 0x0d, 0x83,
    0x0b, 0x5a, 0x13, 0x99, 0xda, 0xff, 0x10, 0x84, 0x04, 0x8e, 0x7b, 0xd8, 0xdb, 0xe9, 0xf8, 0x59,
];

/// The string appended to PDA derivation: "ProgramDerivedAddress".
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Token instruction index for `TransferChecked`.
const TRANSFER_CHECKED_IX: u8 = 12;

/// ATA program instruction index for `CreateIdempotent`.
const CREATE_IDEMPOTENT_IX: u8 = 1;

/// Minimum size of a mint account (the base `Mint` layout).
pub const MINT_ACCOUNT_LEN: usize = 82;

/// Byte offset of the `decimals` field in mint account data.
const MINT_DECIMALS_OFFSET: usize = 44;

// ---------------------------------------------------------------------------
// Token program selection
// ---------------------------------------------------------------------------

/// Which token program owns a mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenProgram {
    Token,
    Token2022,
}

impl TokenProgram {
    pub fn program_id(&self) -> [u8; 32] {
        match self {
            TokenProgram::Token => TOKEN_PROGRAM_ID,
            TokenProgram::Token2022 => TOKEN_2022_PROGRAM_ID,
        }
    }

    /// Resolve the program from a mint account's owner.
    pub fn from_owner(owner: &[u8; 32]) -> Result<Self, SolError> {
        if *owner == TOKEN_PROGRAM_ID {
            Ok(TokenProgram::Token)
        } else if *owner == TOKEN_2022_PROGRAM_ID {
            Ok(TokenProgram::Token2022)
        } else {
            Err(SolError::InvalidAccountData(format!(
                "mint is owned by {}, not a token program",
                bs58::encode(owner).into_string()
            )))
        }
    }
}

/// Read the `decimals` field from raw mint account data.
pub fn parse_mint_decimals(data: &[u8]) -> Result<u8, SolError> {
    if data.len() < MINT_ACCOUNT_LEN {
        return Err(SolError::InvalidAccountData(format!(
            "mint account data is {} bytes, expected at least {MINT_ACCOUNT_LEN}",
            data.len()
        )));
    }
    Ok(data[MINT_DECIMALS_OFFSET])
}

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

/// Build a `TransferChecked` instruction.
///
/// # Wire format
///
/// `[12] || amount (u64 LE) || decimals (u8)`, 10 bytes total. Accounts are
/// source (writable), mint, destination (writable), owner (signer).
pub fn build_transfer_checked(
    program: TokenProgram,
    source: &[u8; 32],
    mint: &[u8; 32],
    destination: &[u8; 32],
    owner: &[u8; 32],
    amount: u64,
    decimals: u8,
) -> Result<SolInstruction, SolError> {
    if amount == 0 {
        return Err(SolError::TransactionBuildError(
            "SPL transfer amount must be > 0".into(),
        ));
    }

    let mut data = Vec::with_capacity(10);
    data.push(TRANSFER_CHECKED_IX);
    data.extend_from_slice(&amount.to_le_bytes());
    data.push(decimals);

    Ok(SolInstruction {
        program_id: program.program_id(),
        accounts: vec![
            SolAccountMeta {
                pubkey: *source,
                is_signer: false,
                is_writable: true,
            },
            SolAccountMeta {
                pubkey: *mint,
                is_signer: false,
                is_writable: false,
            },
            SolAccountMeta {
                pubkey: *destination,
                is_signer: false,
                is_writable: true,
            },
            SolAccountMeta {
                pubkey: *owner,
                is_signer: true,
                is_writable: false,
            },
        ],
        data,
    })
}

/// Build an ATA program `CreateIdempotent` instruction.
///
/// Succeeds on-chain whether or not the account already exists, so it can be
/// prepended unconditionally when the recipient's ATA is missing.
pub fn build_create_associated_token_account_idempotent(
    program: TokenProgram,
    payer: &[u8; 32],
    wallet: &[u8; 32],
    mint: &[u8; 32],
) -> Result<SolInstruction, SolError> {
    let ata = derive_associated_token_address(wallet, mint, program)?;

    let readonly = |pubkey: [u8; 32]| SolAccountMeta {
        pubkey,
        is_signer: false,
        is_writable: false,
    };

    Ok(SolInstruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM_ID,
        accounts: vec![
            SolAccountMeta {
                pubkey: *payer,
                is_signer: true,
                is_writable: true,
            },
            SolAccountMeta {
                pubkey: ata,
                is_signer: false,
                is_writable: true,
            },
            readonly(*wallet),
            readonly(*mint),
            readonly(SYSTEM_PROGRAM_ID),
            readonly(program.program_id()),
        ],
        data: vec![CREATE_IDEMPOTENT_IX],
    })
}

// ---------------------------------------------------------------------------
// Associated Token Account (PDA) derivation
// ---------------------------------------------------------------------------

/// Derive the associated token account address for a wallet + mint pair.
///
/// The ATA is a Program Derived Address (PDA) with seeds
/// `[wallet_address, token_program_id, mint_address]` derived from the
/// Associated Token Account program. The token program is part of the seed,
/// so the same wallet and mint give different ATAs under Token and
/// Token-2022.
pub fn derive_associated_token_address(
    wallet: &[u8; 32],
    mint: &[u8; 32],
    program: TokenProgram,
) -> Result<[u8; 32], SolError> {
    find_program_address(
        &[wallet.as_ref(), &program.program_id(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .map(|(address, _bump)| address)
}

/// Find a valid Program Derived Address (PDA) for the given seeds and program.
///
/// Iterates bump seeds from 255 down to 0, computing
/// `SHA-256(seed_0 || seed_1 || ... || bump || program_id || "ProgramDerivedAddress")`
/// and returning the first result that is NOT a valid Ed25519 point.
fn find_program_address(
    seeds: &[&[u8]],
    program_id: &[u8; 32],
) -> Result<([u8; 32], u8), SolError> {
    for bump in (0u8..=255).rev() {
        if let Some(address) = try_create_program_address(seeds, &[bump], program_id) {
            return Ok((address, bump));
        }
    }

    Err(SolError::InvalidAddress(
        "could not find valid PDA bump seed".into(),
    ))
}

/// Returns `None` when the hash lands on the curve and the next bump must be
/// tried.
fn try_create_program_address(
    seeds: &[&[u8]],
    bump_seed: &[u8],
    program_id: &[u8; 32],
) -> Option<[u8; 32]> {
    let mut hasher = Sha256::new();

    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(bump_seed);
    hasher.update(program_id);
    hasher.update(PDA_MARKER);

    let hash: [u8; 32] = hasher.finalize().into();

    if is_on_curve(&hash) {
        return None;
    }

    Some(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address;

    // -- Constant verification ----------------------------------------------

    #[test]
    fn token_program_id_roundtrip() {
        let addr = address::bytes_to_address(&TOKEN_PROGRAM_ID);
        assert_eq!(addr, "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
    }

    #[test]
    fn token_2022_program_id_roundtrip() {
        let addr = address::bytes_to_address(&TOKEN_2022_PROGRAM_ID);
        assert_eq!(addr, "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb");
    }

    #[test]
    fn associated_token_program_id_roundtrip() {
        let addr = address::bytes_to_address(&ASSOCIATED_TOKEN_PROGRAM_ID);
        assert_eq!(addr, "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");
    }

    // -- Program selection ----------------------------------------------------

    #[test]
    fn token_program_from_owner() {
        assert_eq!(
            TokenProgram::from_owner(&TOKEN_PROGRAM_ID).unwrap(),
            TokenProgram::Token
        );
        assert_eq!(
            TokenProgram::from_owner(&TOKEN_2022_PROGRAM_ID).unwrap(),
            TokenProgram::Token2022
        );
        assert!(TokenProgram::from_owner(&SYSTEM_PROGRAM_ID).is_err());
    }

    #[test]
    fn mint_decimals_read_at_offset_44() {
        let mut data = vec![0u8; MINT_ACCOUNT_LEN];
        data[44] = 6;
        assert_eq!(parse_mint_decimals(&data).unwrap(), 6);

        // Token-2022 mints carry extensions after the base layout.
        data.extend_from_slice(&[0xFF; 100]);
        assert_eq!(parse_mint_decimals(&data).unwrap(), 6);
    }

    #[test]
    fn mint_decimals_short_data_fails() {
        assert!(parse_mint_decimals(&[0u8; 81]).is_err());
    }

    // -- TransferChecked ----------------------------------------------------

    #[test]
    fn transfer_checked_data_encoding() {
        let ix = build_transfer_checked(
            TokenProgram::Token,
            &[1u8; 32],
            &[4u8; 32],
            &[2u8; 32],
            &[3u8; 32],
            500_000,
            6,
        )
        .unwrap();

        assert_eq!(ix.data.len(), 10);
        assert_eq!(ix.data[0], 12);
        assert_eq!(u64::from_le_bytes(ix.data[1..9].try_into().unwrap()), 500_000);
        assert_eq!(ix.data[9], 6);
    }

    #[test]
    fn transfer_checked_account_roles() {
        let (source, mint, dest, owner) = ([1u8; 32], [4u8; 32], [2u8; 32], [3u8; 32]);
        let ix =
            build_transfer_checked(TokenProgram::Token, &source, &mint, &dest, &owner, 100, 9)
                .unwrap();

        let keys: Vec<_> = ix.accounts.iter().map(|a| a.pubkey).collect();
        assert_eq!(keys, vec![source, mint, dest, owner]);

        assert!(ix.accounts[0].is_writable && !ix.accounts[0].is_signer);
        assert!(!ix.accounts[1].is_writable && !ix.accounts[1].is_signer);
        assert!(ix.accounts[2].is_writable && !ix.accounts[2].is_signer);
        assert!(ix.accounts[3].is_signer && !ix.accounts[3].is_writable);
    }

    #[test]
    fn transfer_checked_targets_selected_program() {
        let ix = build_transfer_checked(
            TokenProgram::Token2022,
            &[1u8; 32],
            &[4u8; 32],
            &[2u8; 32],
            &[3u8; 32],
            1,
            0,
        )
        .unwrap();
        assert_eq!(ix.program_id, TOKEN_2022_PROGRAM_ID);
    }

    #[test]
    fn transfer_checked_zero_amount_fails() {
        let result = build_transfer_checked(
            TokenProgram::Token,
            &[1u8; 32],
            &[4u8; 32],
            &[2u8; 32],
            &[3u8; 32],
            0,
            6,
        );
        assert!(result.is_err());
    }

    // -- CreateIdempotent ---------------------------------------------------

    #[test]
    fn create_ata_idempotent_layout() {
        let payer = [0x10u8; 32];
        let wallet = [0x20u8; 32];
        let mint = [0x30u8; 32];

        let ix = build_create_associated_token_account_idempotent(
            TokenProgram::Token,
            &payer,
            &wallet,
            &mint,
        )
        .unwrap();
        let ata = derive_associated_token_address(&wallet, &mint, TokenProgram::Token).unwrap();

        assert_eq!(ix.program_id, ASSOCIATED_TOKEN_PROGRAM_ID);
        assert_eq!(ix.data, vec![1]);

        let keys: Vec<_> = ix.accounts.iter().map(|a| a.pubkey).collect();
        assert_eq!(
            keys,
            vec![payer, ata, wallet, mint, SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID]
        );
        assert!(ix.accounts[0].is_signer && ix.accounts[0].is_writable);
        assert!(ix.accounts[1].is_writable && !ix.accounts[1].is_signer);
        assert!(ix.accounts[2..].iter().all(|a| !a.is_writable && !a.is_signer));
    }

    // -- PDA derivation -----------------------------------------------------

    #[test]
    fn pda_is_not_on_curve() {
        let ata =
            derive_associated_token_address(&[0xAA; 32], &[0xBB; 32], TokenProgram::Token)
                .unwrap();
        assert!(!is_on_curve(&ata), "PDA must NOT be on the Ed25519 curve");
    }

    #[test]
    fn pda_derivation_is_deterministic() {
        let wallet = [0x11u8; 32];
        let mint = [0x22u8; 32];

        let ata1 = derive_associated_token_address(&wallet, &mint, TokenProgram::Token).unwrap();
        let ata2 = derive_associated_token_address(&wallet, &mint, TokenProgram::Token).unwrap();
        assert_eq!(ata1, ata2);
    }

    #[test]
    fn pda_differs_by_wallet_and_mint() {
        let p = TokenProgram::Token;
        let a = derive_associated_token_address(&[0x01; 32], &[0xFF; 32], p).unwrap();
        let b = derive_associated_token_address(&[0x02; 32], &[0xFF; 32], p).unwrap();
        let c = derive_associated_token_address(&[0x01; 32], &[0xFE; 32], p).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn pda_differs_by_token_program() {
        let wallet = [0x42u8; 32];
        let mint = [0x43u8; 32];

        let classic = derive_associated_token_address(&wallet, &mint, TokenProgram::Token).unwrap();
        let t22 = derive_associated_token_address(&wallet, &mint, TokenProgram::Token2022).unwrap();
        assert_ne!(classic, t22);
    }

    #[test]
    fn derive_ata_for_usdc_mint_is_valid_address() {
        let usdc_mint =
            address::address_to_bytes("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v").unwrap();

        let ata =
            derive_associated_token_address(&[0x42u8; 32], &usdc_mint, TokenProgram::Token)
                .unwrap();

        assert!(!is_on_curve(&ata));
        let ata_addr = address::bytes_to_address(&ata);
        assert!(address::validate_address(&ata_addr).is_ok());
    }
}
