use anchor_lang::prelude::*;

use crate::error::RedemptionError;
use crate::state::RedemptionRecord;

/// Lifecycle of a single mint, read off the record account.
///
/// The record address is fixed by the mint, so whether a program-owned record
/// lives there is the whole state: `NoRedemption -> Pending -> NoRedemption`.
#[derive(Debug, PartialEq)]
pub enum RedemptionState {
    NoRedemption,
    Pending(RedemptionRecord),
}

impl RedemptionState {
    pub fn load(record: &AccountInfo) -> Result<Self> {
        let data = record.try_borrow_data()?;
        Self::from_account_data(record.owner, &data)
    }

    pub fn from_account_data(owner: &Pubkey, data: &[u8]) -> Result<Self> {
        // A closed or pre-funded address is still system-owned and empty.
        if owner != &crate::ID || data.is_empty() {
            return Ok(Self::NoRedemption);
        }
        let record = RedemptionRecord::try_deserialize(&mut &data[..])?;
        Ok(Self::Pending(record))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    pub fn require_vacant(&self) -> Result<()> {
        require!(!self.is_pending(), RedemptionError::RedemptionAlreadyPending);
        Ok(())
    }

    pub fn into_pending(self) -> Result<RedemptionRecord> {
        match self {
            Self::Pending(record) => Ok(record),
            Self::NoRedemption => err!(RedemptionError::RecordNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> RedemptionRecord {
        RedemptionRecord {
            mint: Pubkey::new_unique(),
            customer_token_account: Pubkey::new_unique(),
            customer_payment_account: Pubkey::new_unique(),
            custody_vault: Pubkey::new_unique(),
            custody_bump: 254,
            record_bump: 253,
            initiated_at: 1_700_000_000,
        }
    }

    #[test]
    fn empty_system_account_has_no_redemption() {
        let system = anchor_lang::system_program::ID;
        let state = RedemptionState::from_account_data(&system, &[]).unwrap();
        assert_eq!(state, RedemptionState::NoRedemption);
        assert!(state.require_vacant().is_ok());
        assert_eq!(
            state.into_pending().unwrap_err(),
            error!(RedemptionError::RecordNotFound)
        );
    }

    #[test]
    fn program_owned_record_is_pending() {
        let record = sample_record();
        let mut data = Vec::new();
        record.try_serialize(&mut data).unwrap();

        let state = RedemptionState::from_account_data(&crate::ID, &data).unwrap();
        assert!(state.is_pending());
        assert_eq!(
            state.require_vacant().unwrap_err(),
            error!(RedemptionError::RedemptionAlreadyPending)
        );
        assert_eq!(state.into_pending().unwrap(), record);
    }

    #[test]
    fn foreign_owner_is_never_trusted_as_a_record() {
        let mut data = Vec::new();
        sample_record().try_serialize(&mut data).unwrap();

        let state = RedemptionState::from_account_data(&Pubkey::new_unique(), &data).unwrap();
        assert_eq!(state, RedemptionState::NoRedemption);
    }

    #[test]
    fn corrupt_record_is_rejected() {
        let data = vec![7u8; RedemptionRecord::LEN];
        assert!(RedemptionState::from_account_data(&crate::ID, &data).is_err());
    }
}
