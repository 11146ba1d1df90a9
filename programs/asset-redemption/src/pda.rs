//! Deterministic addresses for the redemption record and the custody vault.
//!
//! Both addresses are pure functions of the asset mint, so neither the program
//! nor its clients keep a directory of pending redemptions:
//!
//! - record: `[mint, b"redemption"]`
//! - vault:  `[mint]`

use anchor_lang::prelude::*;

use crate::constants::REDEMPTION_SEED;
use crate::error::RedemptionError;
use crate::state::RedemptionRecord;

pub fn find_redemption_record_address(mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[mint.as_ref(), REDEMPTION_SEED], &crate::ID)
}

pub fn find_custody_vault_address(mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[mint.as_ref()], &crate::ID)
}

/// Recomputes the record address from a stored bump.
pub fn redemption_record_address(mint: &Pubkey, bump: u8) -> Result<Pubkey> {
    Pubkey::create_program_address(&[mint.as_ref(), REDEMPTION_SEED, &[bump]], &crate::ID)
        .map_err(|_| error!(RedemptionError::DerivationMismatch))
}

/// Recomputes the vault address from a stored bump.
pub fn custody_vault_address(mint: &Pubkey, bump: u8) -> Result<Pubkey> {
    Pubkey::create_program_address(&[mint.as_ref(), &[bump]], &crate::ID)
        .map_err(|_| error!(RedemptionError::DerivationMismatch))
}

/// Signing capability over the custody vault.
///
/// The vault is its own token authority, so whoever can produce its seeds can
/// move or burn the escrowed unit. Only this program can sign with them.
pub(crate) struct CustodyAuthority {
    mint: Pubkey,
    bump: [u8; 1],
}

impl CustodyAuthority {
    pub(crate) fn new(mint: Pubkey, bump: u8) -> Self {
        Self { mint, bump: [bump] }
    }

    pub(crate) fn for_record(record: &RedemptionRecord) -> Self {
        Self::new(record.mint, record.custody_bump)
    }

    pub(crate) fn seeds(&self) -> [&[u8]; 2] {
        [self.mint.as_ref(), &self.bump]
    }
}
