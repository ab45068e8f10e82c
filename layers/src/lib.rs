//! Physical Layer Signalling Library
//!
//! This crate implements the DVB-S2 PLHEADER signalling according to
//! ETSI EN 302 307.

pub mod phy;

use common::types::ModCod;
use thiserror::Error;

/// Errors reported at the PHY boundary
#[derive(Error, Debug)]
pub enum PhyError {
    #[error("Invalid PLSC value: {0}")]
    InvalidPlsc(u8),

    #[error("Invalid MODCOD: {0}")]
    InvalidModcod(u8),

    #[error("Dummy PLFRAME cannot signal short FECFRAME or pilots")]
    InvalidDummyFrame,

    #[error("{0} is not defined for short FECFRAMEs")]
    UnsupportedShortFrame(ModCod),

    #[error("Invalid input length: expected {expected} symbols, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
