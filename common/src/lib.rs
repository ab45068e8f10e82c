//! Common Utilities and Types Library
//! 
//! This crate provides the DVB-S2 physical layer signalling types and small
//! helpers shared by the codec, the IQ interfaces and the command line tool.

pub mod types;
pub mod utils;

// Re-export commonly used items
pub use types::*;
pub use utils::*;
