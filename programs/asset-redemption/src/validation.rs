use anchor_lang::prelude::*;

use crate::constants::{ASSET_DECIMALS, ASSET_UNIT};
use crate::error::RedemptionError;

/// The mint must describe exactly one outstanding, indivisible unit.
pub fn require_single_unit_supply(supply: u64, decimals: u8) -> Result<()> {
    require!(
        supply == ASSET_UNIT && decimals == ASSET_DECIMALS,
        RedemptionError::SupplyInvariantViolation
    );
    Ok(())
}

pub fn require_single_unit_balance(amount: u64) -> Result<()> {
    require!(amount == ASSET_UNIT, RedemptionError::InsufficientBalance);
    Ok(())
}

/// A caller-supplied address must equal the one recomputed from the mint.
pub fn require_derived(supplied: &Pubkey, derived: &Pubkey) -> Result<()> {
    require_keys_eq!(*supplied, *derived, RedemptionError::DerivationMismatch);
    Ok(())
}

/// A caller-supplied account must equal the one the record was created with.
pub fn require_matching(supplied: &Pubkey, recorded: &Pubkey) -> Result<()> {
    require_keys_eq!(*supplied, *recorded, RedemptionError::AuthorizationMismatch);
    Ok(())
}

pub fn require_burnable(supply: u64, vault_amount: u64) -> Result<()> {
    require!(
        supply == ASSET_UNIT && vault_amount == ASSET_UNIT,
        RedemptionError::BurnFailed
    );
    Ok(())
}
