pub mod client;
pub mod gemini;
pub mod service;

pub use service::{ModelService, RigModelService};
