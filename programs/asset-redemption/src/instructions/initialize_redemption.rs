use anchor_lang::prelude::*;
use anchor_spl::token_interface::{
    initialize_account3, transfer_checked, InitializeAccount3, Mint, TokenAccount,
    TokenInterface, TransferChecked,
};

use crate::constants::{ASSET_UNIT, CUSTODY_VAULT_LEN, REDEMPTION_SEED};
use crate::error::RedemptionError;
use crate::events::RedemptionInitiated;
use crate::instructions::custody::create_pda_account;
use crate::pda::{self, CustodyAuthority};
use crate::state::{RedemptionRecord, RedemptionState};
use crate::validation;

#[derive(Accounts)]
pub struct InitializeRedemption<'info> {
    /// CHECK: Re-derived from the mint and allocated by the handler
    #[account(mut)]
    pub redemption_record: UncheckedAccount<'info>,

    /// The customer's holding account for the asset
    #[account(mut)]
    pub customer_token_account: InterfaceAccount<'info, TokenAccount>,

    /// Owns the customer token account and funds both allocations
    #[account(mut)]
    pub customer_payment_account: Signer<'info>,

    pub asset_mint: InterfaceAccount<'info, Mint>,

    /// CHECK: Re-derived from the mint and allocated by the handler
    #[account(mut)]
    pub custody_vault: UncheckedAccount<'info>,

    pub token_program: Interface<'info, TokenInterface>,

    pub rent: Sysvar<'info, Rent>,

    pub system_program: Program<'info, System>,
}

pub fn handler(ctx: Context<InitializeRedemption>) -> Result<()> {
    let mint_key = ctx.accounts.asset_mint.key();
    let customer = ctx.accounts.customer_payment_account.key();

    let (record_address, record_bump) = pda::find_redemption_record_address(&mint_key);
    let (vault_address, custody_bump) = pda::find_custody_vault_address(&mint_key);
    validation::require_derived(&ctx.accounts.redemption_record.key(), &record_address)?;
    validation::require_derived(&ctx.accounts.custody_vault.key(), &vault_address)?;

    // A live record or vault at the derived address means a redemption is in flight
    RedemptionState::load(&ctx.accounts.redemption_record)?.require_vacant()?;
    require!(
        ctx.accounts.custody_vault.data_is_empty(),
        RedemptionError::RedemptionAlreadyPending
    );

    let decimals = ctx.accounts.asset_mint.decimals;
    validation::require_single_unit_supply(ctx.accounts.asset_mint.supply, decimals)?;

    let customer_token_account = &ctx.accounts.customer_token_account;
    validation::require_matching(&customer_token_account.mint, &mint_key)?;
    validation::require_matching(&customer_token_account.owner, &customer)?;
    validation::require_single_unit_balance(customer_token_account.amount)?;

    let payer = ctx.accounts.customer_payment_account.to_account_info();
    let system = ctx.accounts.system_program.to_account_info();
    let token_program = ctx.accounts.token_program.to_account_info();
    let custody_vault = ctx.accounts.custody_vault.to_account_info();
    let redemption_record = ctx.accounts.redemption_record.to_account_info();

    let custody = CustodyAuthority::new(mint_key, custody_bump);
    create_pda_account(
        &payer,
        &custody_vault,
        &system,
        &ctx.accounts.rent,
        CUSTODY_VAULT_LEN,
        &ctx.accounts.token_program.key(),
        &custody.seeds(),
    )?;
    initialize_account3(CpiContext::new(
        token_program.clone(),
        InitializeAccount3 {
            account: custody_vault.clone(),
            mint: ctx.accounts.asset_mint.to_account_info(),
            authority: custody_vault.clone(),
        },
    ))?;

    let record_bump_seed = [record_bump];
    let record_seeds: &[&[u8]] = &[mint_key.as_ref(), REDEMPTION_SEED, &record_bump_seed];
    create_pda_account(
        &payer,
        &redemption_record,
        &system,
        &ctx.accounts.rent,
        RedemptionRecord::LEN,
        &crate::ID,
        record_seeds,
    )?;

    let record = RedemptionRecord {
        mint: mint_key,
        customer_token_account: customer_token_account.key(),
        customer_payment_account: customer,
        custody_vault: vault_address,
        custody_bump,
        record_bump,
        initiated_at: Clock::get()?.unix_timestamp,
    };
    record.store(&redemption_record)?;

    // Move the unit into custody on the customer's own signature
    transfer_checked(
        CpiContext::new(
            token_program,
            TransferChecked {
                from: customer_token_account.to_account_info(),
                mint: ctx.accounts.asset_mint.to_account_info(),
                to: custody_vault,
                authority: payer,
            },
        ),
        ASSET_UNIT,
        decimals,
    )?;

    emit!(RedemptionInitiated {
        mint: mint_key,
        customer_token_account: record.customer_token_account,
        customer_payment_account: customer,
        custody_vault: vault_address,
        initiated_at: record.initiated_at,
    });

    msg!("Redemption initiated!");
    msg!("Mint: {}", mint_key);
    msg!("Redemption record: {}", record_address);
    msg!("Custody vault: {}", vault_address);

    Ok(())
}
