pub mod burn_asset_token;
pub(crate) mod custody;
pub mod initialize_redemption;
pub mod return_asset_token;

pub use burn_asset_token::*;
pub use initialize_redemption::*;
pub use return_asset_token::*;
