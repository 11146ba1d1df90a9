use anchor_lang::prelude::*;
use anchor_spl::token_interface::{transfer_checked, Mint, TokenInterface, TransferChecked};

use crate::constants::ASSET_UNIT;
use crate::events::AssetTokenReturned;
use crate::instructions::custody::{authorize_resolution, release_custody, ResolutionAccounts};

#[derive(Accounts)]
pub struct ReturnAssetToken<'info> {
    /// CHECK: Derivation and stored fields are checked by the handler
    #[account(mut)]
    pub redemption_record: UncheckedAccount<'info>,

    /// CHECK: Must be the account recorded at initiation; receives the unit back
    #[account(mut)]
    pub customer_token_account: UncheckedAccount<'info>,

    /// CHECK: Must be the account recorded at initiation; receives both refunds
    #[account(mut)]
    pub customer_payment_account: UncheckedAccount<'info>,

    pub asset_mint: InterfaceAccount<'info, Mint>,

    /// CHECK: Must be the vault recorded at initiation, checked by the handler
    #[account(mut)]
    pub custody_vault: UncheckedAccount<'info>,

    pub token_program: Interface<'info, TokenInterface>,
}

pub fn handler(ctx: Context<ReturnAssetToken>) -> Result<()> {
    let resolution = authorize_resolution(&ResolutionAccounts {
        redemption_record: &ctx.accounts.redemption_record,
        asset_mint: ctx.accounts.asset_mint.key(),
        customer_token_account: &ctx.accounts.customer_token_account,
        customer_payment_account: ctx.accounts.customer_payment_account.key(),
        custody_vault: &ctx.accounts.custody_vault,
        token_program: ctx.accounts.token_program.key(),
    })?;
    resolution.require_returnable()?;

    let seeds = resolution.authority.seeds();
    transfer_checked(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            TransferChecked {
                from: ctx.accounts.custody_vault.to_account_info(),
                mint: ctx.accounts.asset_mint.to_account_info(),
                to: ctx.accounts.customer_token_account.to_account_info(),
                authority: ctx.accounts.custody_vault.to_account_info(),
            },
            &[&seeds[..]],
        ),
        ASSET_UNIT,
        ctx.accounts.asset_mint.decimals,
    )?;

    release_custody(
        ctx.accounts.token_program.to_account_info(),
        ctx.accounts.custody_vault.to_account_info(),
        ctx.accounts.redemption_record.to_account_info(),
        ctx.accounts.customer_payment_account.to_account_info(),
        &resolution.authority,
    )?;

    let record = &resolution.record;
    emit!(AssetTokenReturned {
        mint: record.mint,
        customer_token_account: record.customer_token_account,
        refund_to: record.customer_payment_account,
    });

    msg!("Asset token returned!");
    msg!("Mint: {}", record.mint);
    msg!("Returned to: {}", record.customer_token_account);
    msg!("Deposits refunded to: {}", record.customer_payment_account);

    Ok(())
}
