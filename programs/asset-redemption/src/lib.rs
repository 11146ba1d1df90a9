pub mod constants;
pub mod error;
pub mod events;
pub mod instructions;
pub mod pda;
pub mod state;
pub mod validation;

use anchor_lang::prelude::*;

pub use constants::*;
pub use instructions::*;
pub use state::*;

declare_id!("5ZJJZkgc9wiSFEq1dFDX5sx63e9ExVcUdYYx6tbCVcxt");

#[program]
pub mod asset_redemption {
    use super::*;

    /// Locks the customer's single asset unit into the custody vault and
    /// records who may resolve the redemption.
    pub fn initialize_redemption(ctx: Context<InitializeRedemption>) -> Result<()> {
        initialize_redemption::handler(ctx)
    }

    /// Cancels a pending redemption and hands the unit back to the customer.
    pub fn return_asset_token(ctx: Context<ReturnAssetToken>) -> Result<()> {
        return_asset_token::handler(ctx)
    }

    /// Fulfils a pending redemption by destroying the custodied unit.
    pub fn burn_asset_token(ctx: Context<BurnAssetToken>) -> Result<()> {
        burn_asset_token::handler(ctx)
    }
}
