//! Sample I/O Interfaces Library
//!
//! This crate moves baseband IQ samples between files and the PHY.

pub mod iq_file;

use thiserror::Error;

/// Interface errors
#[derive(Error, Debug)]
pub enum InterfaceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid sample data: {0} bytes is not a whole number of cf32 samples")]
    InvalidSampleData(usize),

    #[error("Window of {len} samples at offset {offset} exceeds buffer of {available}")]
    OutOfRange {
        offset: usize,
        len: usize,
        available: usize,
    },
}
