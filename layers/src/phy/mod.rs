//! Physical Layer (PHY) Submodules
//!
//! PLHEADER processing of the DVB-S2 physical layer according to
//! ETSI EN 302 307 Section 5.5.

pub mod pi2_bpsk;
pub mod plframe;
pub mod plsc;
pub mod reed_muller;

// Re-export commonly used types
pub use plframe::{sof_symbols, PlFrameInfo, PLHEADER_LEN, PLSC_LEN, SOF_LEN};
pub use plsc::{
    plsc_from_params, DecodeOptions, Demapping, PlsFilter, PlscDecoded, PlscDecoder, PlscEncoder,
    Reliability, PLSC_INPUT_LEN, PLSC_SCRAMBLER,
};
pub use reed_muller::{HardDecision, ReedMuller, SoftDecision};
