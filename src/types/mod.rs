pub mod analysis;
pub mod message;
pub mod state;
