//! Account plumbing shared by the three redemption instructions.

use anchor_lang::prelude::*;
use anchor_lang::system_program::{self, Allocate, Assign, CreateAccount, Transfer};
use anchor_spl::token_interface::{close_account, CloseAccount, TokenAccount};

use crate::error::RedemptionError;
use crate::pda::{self, CustodyAuthority};
use crate::state::{RedemptionRecord, RedemptionState};
use crate::validation;

/// Allocates `target` at its derived address, the same way Anchor's `init`
/// constraint does, so lamports dropped on the address beforehand don't block it.
pub(crate) fn create_pda_account<'info>(
    payer: &AccountInfo<'info>,
    target: &AccountInfo<'info>,
    system: &AccountInfo<'info>,
    rent: &Rent,
    space: usize,
    owner: &Pubkey,
    signer_seeds: &[&[u8]],
) -> Result<()> {
    let required = rent.minimum_balance(space);
    let current = target.lamports();

    if current == 0 {
        return system_program::create_account(
            CpiContext::new_with_signer(
                system.clone(),
                CreateAccount {
                    from: payer.clone(),
                    to: target.clone(),
                },
                &[signer_seeds],
            ),
            required,
            space as u64,
            owner,
        );
    }

    let top_up = required.saturating_sub(current);
    if top_up > 0 {
        system_program::transfer(
            CpiContext::new(
                system.clone(),
                Transfer {
                    from: payer.clone(),
                    to: target.clone(),
                },
            ),
            top_up,
        )?;
    }
    system_program::allocate(
        CpiContext::new_with_signer(
            system.clone(),
            Allocate {
                account_to_allocate: target.clone(),
            },
            &[signer_seeds],
        ),
        space as u64,
    )?;
    system_program::assign(
        CpiContext::new_with_signer(
            system.clone(),
            Assign {
                account_to_assign: target.clone(),
            },
            &[signer_seeds],
        ),
        owner,
    )
}

/// Accounts handed to Return or Burn, before any of them is trusted.
pub(crate) struct ResolutionAccounts<'a, 'info> {
    pub redemption_record: &'a AccountInfo<'info>,
    pub asset_mint: Pubkey,
    pub customer_token_account: &'a AccountInfo<'info>,
    pub customer_payment_account: Pubkey,
    pub custody_vault: &'a AccountInfo<'info>,
    pub token_program: Pubkey,
}

/// A record that every supplied account has been matched against.
pub(crate) struct AuthorizedResolution {
    pub record: RedemptionRecord,
    pub authority: CustodyAuthority,
    pub vault_amount: u64,
}

impl AuthorizedResolution {
    /// Return hands back exactly the unit taken into custody.
    pub(crate) fn require_returnable(&self) -> Result<()> {
        validation::require_single_unit_balance(self.vault_amount)
    }

    pub(crate) fn require_burnable(&self, supply: u64) -> Result<()> {
        validation::require_burnable(supply, self.vault_amount)
    }
}

/// Runs every Return/Burn precondition; nothing is mutated here.
///
/// Addresses are compared before any supplied account is decoded, so a forged
/// account of any shape fails with `AuthorizationMismatch`.
pub(crate) fn authorize_resolution(accounts: &ResolutionAccounts) -> Result<AuthorizedResolution> {
    let (record_address, _) = pda::find_redemption_record_address(&accounts.asset_mint);
    validation::require_derived(accounts.redemption_record.key, &record_address)?;

    let record = RedemptionState::load(accounts.redemption_record)?.into_pending()?;

    validation::require_matching(&accounts.asset_mint, &record.mint)?;
    validation::require_matching(
        accounts.customer_token_account.key,
        &record.customer_token_account,
    )?;
    validation::require_matching(
        &accounts.customer_payment_account,
        &record.customer_payment_account,
    )?;
    validation::require_matching(accounts.custody_vault.key, &record.custody_vault)?;

    // The recorded holding account must still be the customer's
    let customer_token_owner = read_token_account(accounts.customer_token_account)
        .map_err(|_| error!(RedemptionError::AuthorizationMismatch))?
        .owner;
    validation::require_matching(&customer_token_owner, &record.customer_payment_account)?;

    record.verify_addresses(accounts.redemption_record.key)?;

    require_keys_eq!(
        *accounts.custody_vault.owner,
        accounts.token_program,
        RedemptionError::TokenProgramMismatch
    );
    let vault_amount = read_token_account(accounts.custody_vault)?.amount;

    Ok(AuthorizedResolution {
        authority: CustodyAuthority::for_record(&record),
        record,
        vault_amount,
    })
}

fn read_token_account(account: &AccountInfo) -> Result<TokenAccount> {
    let data = account.try_borrow_data()?;
    TokenAccount::try_deserialize(&mut &data[..])
}

/// Closes the emptied vault and then the record, refunding both deposits.
pub(crate) fn release_custody<'info>(
    token_program: AccountInfo<'info>,
    custody_vault: AccountInfo<'info>,
    redemption_record: AccountInfo<'info>,
    refund_to: AccountInfo<'info>,
    authority: &CustodyAuthority,
) -> Result<()> {
    let seeds = authority.seeds();
    close_account(CpiContext::new_with_signer(
        token_program,
        CloseAccount {
            account: custody_vault.clone(),
            destination: refund_to.clone(),
            authority: custody_vault,
        },
        &[&seeds[..]],
    ))?;

    close_program_account(&redemption_record, &refund_to)
}

fn close_program_account(account: &AccountInfo, refund_to: &AccountInfo) -> Result<()> {
    let refunded = refund_to
        .lamports()
        .checked_add(account.lamports())
        .ok_or(ProgramError::ArithmeticOverflow)?;
    **refund_to.try_borrow_mut_lamports()? = refunded;
    **account.try_borrow_mut_lamports()? = 0;

    account.assign(&system_program::ID);
    account.resize(0)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolution_holding(vault_amount: u64) -> AuthorizedResolution {
        let record = RedemptionRecord {
            mint: Pubkey::new_unique(),
            ..Default::default()
        };
        AuthorizedResolution {
            authority: CustodyAuthority::for_record(&record),
            record,
            vault_amount,
        }
    }

    #[test]
    fn return_requires_the_unit_in_custody() {
        assert!(resolution_holding(1).require_returnable().is_ok());
        for amount in [0, 2] {
            assert_eq!(
                resolution_holding(amount).require_returnable().unwrap_err(),
                error!(RedemptionError::InsufficientBalance)
            );
        }
    }

    #[test]
    fn burn_requires_the_last_outstanding_unit() {
        assert!(resolution_holding(1).require_burnable(1).is_ok());
        assert_eq!(
            resolution_holding(0).require_burnable(1).unwrap_err(),
            error!(RedemptionError::BurnFailed)
        );
        assert_eq!(
            resolution_holding(1).require_burnable(0).unwrap_err(),
            error!(RedemptionError::BurnFailed)
        );
    }
}
