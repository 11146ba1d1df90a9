use anchor_lang::prelude::*;

#[error_code]
pub enum RedemptionError {
    #[msg("Token account must hold exactly one unit of the asset")]
    InsufficientBalance,
    #[msg("Asset mint must have a supply of exactly one indivisible unit")]
    SupplyInvariantViolation,
    #[msg("A redemption is already pending for this asset")]
    RedemptionAlreadyPending,
    #[msg("No pending redemption exists for this asset")]
    RecordNotFound,
    #[msg("Supplied account does not match the redemption record")]
    AuthorizationMismatch,
    #[msg("The custodied asset could not be burned")]
    BurnFailed,
    #[msg("Supplied address does not match its derived address")]
    DerivationMismatch,
    #[msg("Custody vault is not owned by the supplied token program")]
    TokenProgramMismatch,
}
