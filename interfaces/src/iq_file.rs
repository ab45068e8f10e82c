//! IQ Capture Files
//!
//! Raw `cf32` captures: interleaved little-endian `f32` I and Q, 8 bytes per
//! sample, no header.

use crate::InterfaceError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use num_complex::Complex32;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Bytes per complex sample
pub const CF32_SAMPLE_BYTES: usize = 8;

/// IQ sample buffer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IqBuffer {
    /// Complex IQ samples
    pub samples: Vec<Complex32>,
}

impl IqBuffer {
    /// Create from raw samples
    pub fn from_samples(samples: Vec<Complex32>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Borrow `len` samples starting at `offset`
    pub fn window(&self, offset: usize, len: usize) -> Result<&[Complex32], InterfaceError> {
        offset
            .checked_add(len)
            .and_then(|end| self.samples.get(offset..end))
            .ok_or(InterfaceError::OutOfRange {
                offset,
                len,
                available: self.samples.len(),
            })
    }

    /// Serialize to cf32 bytes
    pub fn to_bytes(&self) -> Bytes {
        let mut bytes = BytesMut::with_capacity(self.samples.len() * CF32_SAMPLE_BYTES);
        for sample in &self.samples {
            bytes.put_f32_le(sample.re);
            bytes.put_f32_le(sample.im);
        }
        bytes.freeze()
    }

    /// Parse cf32 bytes
    pub fn from_bytes(mut bytes: Bytes) -> Result<Self, InterfaceError> {
        if bytes.len() % CF32_SAMPLE_BYTES != 0 {
            return Err(InterfaceError::InvalidSampleData(bytes.len()));
        }

        let mut samples = Vec::with_capacity(bytes.len() / CF32_SAMPLE_BYTES);
        while bytes.has_remaining() {
            let re = bytes.get_f32_le();
            let im = bytes.get_f32_le();
            samples.push(Complex32::new(re, im));
        }
        Ok(Self { samples })
    }
}

/// Read a cf32 capture
pub fn read_cf32<P: AsRef<Path>>(path: P) -> Result<IqBuffer, InterfaceError> {
    let path = path.as_ref();
    let buffer = IqBuffer::from_bytes(Bytes::from(fs::read(path)?))?;
    debug!("Read {} samples from {}", buffer.len(), path.display());
    Ok(buffer)
}

/// Write a cf32 capture, replacing any existing file
pub fn write_cf32<P: AsRef<Path>>(path: P, buffer: &IqBuffer) -> Result<(), InterfaceError> {
    let path = path.as_ref();
    fs::write(path, buffer.to_bytes())?;
    debug!("Wrote {} samples to {}", buffer.len(), path.display());
    Ok(())
}
