//! Mock world directories for testing collectors.

mod filesystem;
mod scenarios;

pub use filesystem::MockFs;
pub use scenarios::PlayerFixture;
