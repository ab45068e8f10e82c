//! PLSC Error Rate Simulation
//!
//! Sends PLHEADERs through a phase-offset AWGN channel and counts PLSC
//! decoding errors per demapping mode and Es/N0.

use crate::config::SimConfig;
use anyhow::Result;
use common::types::Plsc;
use common::utils::db_to_linear;
use layers::phy::{sof_symbols, Demapping, PlscDecoder, PlscEncoder, PLSC_INPUT_LEN, SOF_LEN};
use num_complex::Complex32;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::Serialize;
use tracing::{debug, info};

/// Error count of one mode at one Es/N0
#[derive(Debug, Clone, Serialize)]
pub struct SimPoint {
    pub demapping: Demapping,
    pub snr_db: f32,
    pub trials: usize,
    pub errors: usize,
}

impl SimPoint {
    /// PLSC error rate
    pub fn error_rate(&self) -> f64 {
        self.errors as f64 / self.trials as f64
    }
}

/// Constant phase rotation followed by complex AWGN (unit symbol energy)
struct Channel {
    rotation: Complex32,
    noise: Normal<f32>,
}

impl Channel {
    fn new(snr_db: f32, phase_offset_deg: f32) -> Result<Self> {
        let sigma = (0.5 / db_to_linear(snr_db)).sqrt();
        Ok(Self {
            rotation: Complex32::from_polar(1.0, phase_offset_deg.to_radians()),
            noise: Normal::new(0.0, sigma)?,
        })
    }

    fn apply(&self, symbols: &mut [Complex32], rng: &mut StdRng) {
        for s in symbols.iter_mut() {
            let noise = Complex32::new(self.noise.sample(rng), self.noise.sample(rng));
            *s = *s * self.rotation + noise;
        }
    }
}

/// Run the configured sweep
pub fn run(config: &SimConfig) -> Result<Vec<SimPoint>> {
    config.validate()?;

    let encoder = PlscEncoder::new();
    let mut decoder = PlscDecoder::new();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let last_sof = sof_symbols()[SOF_LEN - 1];

    let mut points = Vec::with_capacity(config.modes.len() * config.snr_db.len());
    for &demapping in &config.modes {
        for &snr_db in &config.snr_db {
            let channel = Channel::new(snr_db, config.phase_offset_deg)?;
            let mut errors = 0;

            for _ in 0..config.trials {
                let value = config.plsc.unwrap_or_else(|| rng.gen_range(0..=Plsc::MAX));
                let plsc = Plsc::new(value).ok_or(layers::PhyError::InvalidPlsc(value))?;

                let mut input = [Complex32::new(0.0, 0.0); PLSC_INPUT_LEN];
                input[0] = last_sof;
                input[1..].copy_from_slice(&encoder.encode(plsc));
                channel.apply(&mut input, &mut rng);

                let decoded = decoder.decode(&input, demapping.options());
                if decoded.plsc() != plsc {
                    debug!("PLSC {} decoded as {} at {} dB", plsc, decoded.plsc(), snr_db);
                    errors += 1;
                }
            }

            let point = SimPoint {
                demapping,
                snr_db,
                trials: config.trials,
                errors,
            };
            info!(
                "{:?} at {:+.1} dB: {}/{} errors (PER {:.2e})",
                demapping,
                snr_db,
                errors,
                config.trials,
                point.error_rate()
            );
            points.push(point);
        }
    }

    Ok(points)
}
