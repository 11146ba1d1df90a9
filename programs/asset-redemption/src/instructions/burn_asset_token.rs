use anchor_lang::prelude::*;
use anchor_spl::token_interface::{burn, Burn, Mint, TokenInterface};

use crate::constants::ASSET_UNIT;
use crate::events::AssetTokenBurned;
use crate::instructions::custody::{authorize_resolution, release_custody, ResolutionAccounts};

#[derive(Accounts)]
pub struct BurnAssetToken<'info> {
    /// CHECK: Derivation and stored fields are checked by the handler
    #[account(mut)]
    pub redemption_record: UncheckedAccount<'info>,

    /// CHECK: Must be the account recorded at initiation
    pub customer_token_account: UncheckedAccount<'info>,

    /// CHECK: Must be the account recorded at initiation; receives both refunds
    #[account(mut)]
    pub customer_payment_account: UncheckedAccount<'info>,

    #[account(mut)]
    pub asset_mint: InterfaceAccount<'info, Mint>,

    /// CHECK: Must be the vault recorded at initiation, checked by the handler
    #[account(mut)]
    pub custody_vault: UncheckedAccount<'info>,

    pub token_program: Interface<'info, TokenInterface>,
}

pub fn handler(ctx: Context<BurnAssetToken>) -> Result<()> {
    let resolution = authorize_resolution(&ResolutionAccounts {
        redemption_record: &ctx.accounts.redemption_record,
        asset_mint: ctx.accounts.asset_mint.key(),
        customer_token_account: &ctx.accounts.customer_token_account,
        customer_payment_account: ctx.accounts.customer_payment_account.key(),
        custody_vault: &ctx.accounts.custody_vault,
        token_program: ctx.accounts.token_program.key(),
    })?;
    let supply_before = ctx.accounts.asset_mint.supply;
    resolution.require_burnable(supply_before)?;

    let seeds = resolution.authority.seeds();
    burn(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            Burn {
                mint: ctx.accounts.asset_mint.to_account_info(),
                from: ctx.accounts.custody_vault.to_account_info(),
                authority: ctx.accounts.custody_vault.to_account_info(),
            },
            &[&seeds[..]],
        ),
        ASSET_UNIT,
    )?;

    release_custody(
        ctx.accounts.token_program.to_account_info(),
        ctx.accounts.custody_vault.to_account_info(),
        ctx.accounts.redemption_record.to_account_info(),
        ctx.accounts.customer_payment_account.to_account_info(),
        &resolution.authority,
    )?;

    let record = &resolution.record;
    let remaining_supply = supply_before - ASSET_UNIT;
    emit!(AssetTokenBurned {
        mint: record.mint,
        remaining_supply,
        refund_to: record.customer_payment_account,
    });

    msg!("Asset token burned!");
    msg!("Mint: {}", record.mint);
    msg!("Remaining supply: {}", remaining_supply);
    msg!("Deposits refunded to: {}", record.customer_payment_account);

    Ok(())
}
