pub mod error;
pub mod floor;
pub mod options;
pub mod traits;
pub mod types;

pub use error::*;
pub use floor::{compute_floors, floor_price};
pub use options::{find_match, match_targets, nearest_strike, sort_by_strike, StrikeMatch};
pub use traits::*;
pub use types::*;
