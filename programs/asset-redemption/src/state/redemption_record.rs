use anchor_lang::prelude::*;

use crate::{pda, validation};

/// Anchors one pending redemption to the accounts allowed to resolve it.
#[account]
#[derive(Default, Debug, PartialEq)]
pub struct RedemptionRecord {
    /// The asset mint under redemption
    pub mint: Pubkey,
    /// Holding account the unit was taken from and is returned to
    pub customer_token_account: Pubkey,
    /// Receives every storage refund when the redemption resolves
    pub customer_payment_account: Pubkey,
    /// Escrow holding the unit while the redemption is pending
    pub custody_vault: Pubkey,
    /// Bump seed for the custody vault PDA
    pub custody_bump: u8,
    /// Bump seed for this record's PDA
    pub record_bump: u8,
    pub initiated_at: i64,
}

impl RedemptionRecord {
    pub const LEN: usize = 8 + // discriminator
        32 + // mint
        32 + // customer_token_account
        32 + // customer_payment_account
        32 + // custody_vault
        1 + // custody_bump
        1 + // record_bump
        8; // initiated_at

    /// Writes the record, discriminator included, into a freshly allocated account.
    pub(crate) fn store(&self, account: &AccountInfo) -> Result<()> {
        let mut data = account.try_borrow_mut_data()?;
        let mut writer: &mut [u8] = &mut data[..];
        self.try_serialize(&mut writer)
    }

    /// The stored bumps must reproduce both the record's own address and the
    /// custody vault it names.
    pub(crate) fn verify_addresses(&self, record_address: &Pubkey) -> Result<()> {
        let record = pda::redemption_record_address(&self.mint, self.record_bump)?;
        validation::require_derived(record_address, &record)?;

        let vault = pda::custody_vault_address(&self.mint, self.custody_bump)?;
        validation::require_derived(&self.custody_vault, &vault)
    }
}
