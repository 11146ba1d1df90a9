use anchor_lang::prelude::*;

/// Role tag appended to the mint when deriving the redemption record address.
#[constant]
pub const REDEMPTION_SEED: &[u8] = b"redemption";

/// The only quantity ever escrowed, returned or burned.
#[constant]
pub const ASSET_UNIT: u64 = 1;

/// Redeemable assets are indivisible.
#[constant]
pub const ASSET_DECIMALS: u8 = 0;

/// Size of a plain SPL token account (no extensions).
pub const CUSTODY_VAULT_LEN: usize = 165;
