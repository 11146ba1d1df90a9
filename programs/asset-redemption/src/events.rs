use anchor_lang::prelude::*;

#[event]
pub struct RedemptionInitiated {
    pub mint: Pubkey,
    pub customer_token_account: Pubkey,
    pub customer_payment_account: Pubkey,
    pub custody_vault: Pubkey,
    pub initiated_at: i64,
}

#[event]
pub struct AssetTokenReturned {
    pub mint: Pubkey,
    pub customer_token_account: Pubkey,
    pub refund_to: Pubkey,
}

#[event]
pub struct AssetTokenBurned {
    pub mint: Pubkey,
    pub remaining_supply: u64,
    pub refund_to: Pubkey,
}
