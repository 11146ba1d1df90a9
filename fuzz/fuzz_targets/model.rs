//! In-memory reference model of the redemption state machine.
//!
//! Ledger accounts are replaced by a map keyed by mint identity, so the
//! expected outcome of any operation sequence can be computed off chain and
//! compared with what the program actually did.

use std::collections::HashMap;

use asset_redemption::error::RedemptionError;
use solana_sdk::pubkey::Pubkey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    NoRedemption,
    Pending {
        customer_token_account: Pubkey,
        customer_payment_account: Pubkey,
    },
}

/// What a caller presented to Return or Burn
#[derive(Debug, Clone, Copy)]
pub struct Resolution {
    pub customer_token_account: Pubkey,
    pub customer_payment_account: Pubkey,
    /// Whether the supplied vault is the one derived for the mint
    pub genuine_vault: bool,
}

#[derive(Debug, Clone)]
pub struct AssetLedger {
    pub supply: u64,
    pub decimals: u8,
    pub balances: HashMap<Pubkey, u64>,
    pub vault_balance: Option<u64>,
    pub state: ModelState,
}

impl AssetLedger {
    pub fn balance_of(&self, token_account: &Pubkey) -> u64 {
        self.balances.get(token_account).copied().unwrap_or(0)
    }
}

#[derive(Debug, Default)]
pub struct RedemptionModel {
    assets: HashMap<Pubkey, AssetLedger>,
}

impl RedemptionModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a mint whose whole supply sits in the given token accounts
    pub fn register_asset(&mut self, mint: Pubkey, decimals: u8, holdings: &[(Pubkey, u64)]) {
        let balances: HashMap<Pubkey, u64> = holdings.iter().copied().collect();
        let supply = balances.values().sum();
        self.assets.insert(
            mint,
            AssetLedger {
                supply,
                decimals,
                balances,
                vault_balance: None,
                state: ModelState::NoRedemption,
            },
        );
    }

    pub fn asset(&self, mint: &Pubkey) -> Option<&AssetLedger> {
        self.assets.get(mint)
    }

    pub fn initiate(
        &mut self,
        mint: &Pubkey,
        customer_token_account: Pubkey,
        customer_payment_account: Pubkey,
    ) -> Result<(), RedemptionError> {
        let ledger = self
            .assets
            .get_mut(mint)
            .ok_or(RedemptionError::SupplyInvariantViolation)?;

        if ledger.state != ModelState::NoRedemption {
            return Err(RedemptionError::RedemptionAlreadyPending);
        }
        if ledger.supply != 1 || ledger.decimals != 0 {
            return Err(RedemptionError::SupplyInvariantViolation);
        }
        if ledger.balance_of(&customer_token_account) != 1 {
            return Err(RedemptionError::InsufficientBalance);
        }

        ledger.balances.insert(customer_token_account, 0);
        ledger.vault_balance = Some(1);
        ledger.state = ModelState::Pending {
            customer_token_account,
            customer_payment_account,
        };
        Ok(())
    }

    pub fn return_asset(&mut self, mint: &Pubkey, resolution: &Resolution) -> Result<(), RedemptionError> {
        let ledger = Self::authorize(&mut self.assets, mint, resolution)?;

        ledger
            .balances
            .insert(resolution.customer_token_account, 1);
        ledger.vault_balance = None;
        ledger.state = ModelState::NoRedemption;
        Ok(())
    }

    pub fn burn(&mut self, mint: &Pubkey, resolution: &Resolution) -> Result<(), RedemptionError> {
        let ledger = Self::authorize(&mut self.assets, mint, resolution)?;
        if ledger.supply != 1 || ledger.vault_balance != Some(1) {
            return Err(RedemptionError::BurnFailed);
        }

        ledger.supply -= 1;
        ledger.vault_balance = None;
        ledger.state = ModelState::NoRedemption;
        Ok(())
    }

    fn authorize<'a>(
        assets: &'a mut HashMap<Pubkey, AssetLedger>,
        mint: &Pubkey,
        resolution: &Resolution,
    ) -> Result<&'a mut AssetLedger, RedemptionError> {
        let ledger = assets.get_mut(mint).ok_or(RedemptionError::RecordNotFound)?;

        let ModelState::Pending {
            customer_token_account,
            customer_payment_account,
        } = ledger.state
        else {
            return Err(RedemptionError::RecordNotFound);
        };

        if resolution.customer_token_account != customer_token_account
            || resolution.customer_payment_account != customer_payment_account
            || !resolution.genuine_vault
        {
            return Err(RedemptionError::AuthorizationMismatch);
        }
        Ok(ledger)
    }
}
