pub mod redemption_record;
pub mod redemption_state;

pub use redemption_record::*;
pub use redemption_state::*;
