//! DVB-S2 PLSC Tool
//!
//! Encodes PLHEADERs to cf32 captures, decodes PLSCs from captures, lists the
//! PLFRAME parameters of every PLSC and measures decoding performance.

mod config;
mod sim;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use common::types::Plsc;
use common::utils::format_bits;
use interfaces::iq_file::{self, IqBuffer};
use layers::phy::{
    plsc_from_params, DecodeOptions, PlFrameInfo, PlsFilter, PlscDecoder, PlscEncoder,
    PLSC_INPUT_LEN,
};
use layers::PhyError;
use num_complex::Complex32;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use config::SimConfig;

/// DVB-S2 PLSC encoder, decoder and simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a PLSC into pi/2 BPSK symbols
    Encode(EncodeArgs),
    /// Decode a PLSC from a cf32 capture
    Decode(DecodeArgs),
    /// Print the PLFRAME parameters of all 128 PLSC values
    Table {
        /// Print JSON instead of a text table
        #[arg(long)]
        json: bool,
    },
    /// Run an AWGN PLSC error rate simulation
    Simulate {
        /// Path to the TOML simulation configuration
        #[arg(short, long, default_value = "sim.toml")]
        config: String,
        /// Print JSON results
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Raw PLSC value (0-127, decimal or 0x-prefixed hex)
    #[arg(long, value_parser = parse_u8, conflicts_with = "modcod")]
    plsc: Option<u8>,

    /// MODCOD (0 for a dummy PLFRAME)
    #[arg(long, required_unless_present = "plsc")]
    modcod: Option<u8>,

    /// Short FECFRAME
    #[arg(long, requires = "modcod")]
    short: bool,

    /// Pilot blocks present
    #[arg(long, requires = "modcod")]
    pilots: bool,

    /// Prepend the SOF to produce the full 90-symbol PLHEADER
    #[arg(long)]
    header: bool,

    /// Write symbols to a cf32 file instead of stdout
    #[arg(short, long)]
    output: Option<String>,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// cf32 capture
    #[arg(short, long)]
    input: String,

    /// Offset of the last SOF symbol in the capture
    #[arg(long, default_value = "0")]
    offset: usize,

    /// Differential demapping (no phase reference)
    #[arg(long)]
    non_coherent: bool,

    /// Hard-decision decoding
    #[arg(long)]
    hard: bool,

    /// Accepted PLSC values; any value is accepted when empty
    #[arg(long, value_delimiter = ',', value_parser = parse_u8)]
    accept: Vec<u8>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

fn parse_u8(value: &str) -> Result<u8, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => value.parse::<u8>(),
    };
    parsed.map_err(|e| format!("invalid value '{}': {}", value, e))
}

fn parse_plsc(value: u8) -> Result<Plsc, PhyError> {
    Plsc::new(value).ok_or(PhyError::InvalidPlsc(value))
}

fn init_logging(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // The simulation config may carry the log level
    let sim_config = match &cli.command {
        Command::Simulate { config, .. } => Some(SimConfig::from_toml_file(config)?),
        _ => None,
    };
    let log_level = cli
        .log_level
        .clone()
        .or_else(|| sim_config.as_ref().map(|c| c.log.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    init_logging(&log_level);

    match cli.command {
        Command::Encode(args) => run_encode(&args),
        Command::Decode(args) => run_decode(&args),
        Command::Table { json } => run_table(json),
        Command::Simulate { config, json } => {
            info!("Simulation configuration: {}", config);
            run_simulate(&sim_config.unwrap_or_default(), json)
        }
    }
}

fn run_encode(args: &EncodeArgs) -> Result<()> {
    let plsc = match (args.plsc, args.modcod) {
        (Some(value), _) => parse_plsc(value)?,
        (None, Some(modcod)) => plsc_from_params(modcod, args.short, args.pilots)?,
        (None, None) => bail!("Either --plsc or --modcod is required"),
    };

    let encoder = PlscEncoder::new();
    let symbols: Vec<Complex32> = if args.header {
        encoder.encode_header(plsc).to_vec()
    } else {
        encoder.encode(plsc).to_vec()
    };

    let info = PlFrameInfo::from_plsc(plsc);
    info!(
        "PLSC {} ({}): modcod={} short={} pilots={} plframe_len={}",
        plsc,
        format_bits(plsc.value() as u64, 7),
        info.modcod,
        info.short_fecframe,
        info.has_pilots,
        info.plframe_len
    );

    match &args.output {
        Some(path) => {
            iq_file::write_cf32(path, &IqBuffer::from_samples(symbols))
                .with_context(|| format!("Failed to write {}", path))?;
            info!("Symbols written to {}", path);
        }
        None => {
            for s in &symbols {
                println!("{:+.6} {:+.6}", s.re, s.im);
            }
        }
    }
    Ok(())
}

fn run_decode(args: &DecodeArgs) -> Result<()> {
    let capture =
        iq_file::read_cf32(&args.input).with_context(|| format!("Failed to read {}", args.input))?;
    let window = capture.window(args.offset, PLSC_INPUT_LEN)?;

    let opts = DecodeOptions::new(!args.non_coherent, !args.hard);
    let mut decoder = PlscDecoder::new();
    let decoded = decoder.decode_slice(window, opts)?;

    let filter = if args.accept.is_empty() {
        PlsFilter::accept_all()
    } else {
        let plscs = args
            .accept
            .iter()
            .map(|&v| parse_plsc(v))
            .collect::<Result<Vec<_>, _>>()?;
        PlsFilter::from_plscs(plscs)
    };
    if !filter.accepts(decoded.plsc()) {
        bail!("PLSC {} is not in the accepted set", decoded.plsc());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&decoded)?);
    } else {
        let info = &decoded.info;
        println!("plsc:           {} ({})", info.plsc, format_bits(info.plsc.value() as u64, 7));
        match info.modcod() {
            Some(mc) => println!("modcod:         {} ({})", info.modcod, mc),
            None if info.dummy_frame => println!("modcod:         0 (dummy PLFRAME)"),
            None => println!("modcod:         {} (reserved)", info.modcod),
        }
        println!("short_fecframe: {}", info.short_fecframe);
        println!("has_pilots:     {}", info.has_pilots);
        println!("n_mod:          {}", info.n_mod);
        println!("slots:          {}", info.slots);
        println!("n_pilots:       {}", info.n_pilots);
        println!("plframe_len:    {}", info.plframe_len);
        println!("demapping:      {:?}", decoded.demapping);
        println!("reliability:    {:?}", decoded.reliability);
        println!("confidence:     {:.3}", decoded.confidence());
    }
    Ok(())
}

fn run_table(json: bool) -> Result<()> {
    let table: Vec<PlFrameInfo> = Plsc::all().map(PlFrameInfo::from_plsc).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }

    println!("plsc  modcod  description   short  pilots  n_mod  slots  n_pilots  plframe_len");
    for info in &table {
        let description = match info.modcod() {
            Some(mc) => mc.to_string(),
            None if info.dummy_frame => "dummy".to_string(),
            None => "reserved".to_string(),
        };
        println!(
            "{}  {:>6}  {:<12}  {:>5}  {:>6}  {:>5}  {:>5}  {:>8}  {:>11}",
            info.plsc,
            info.modcod,
            description,
            info.short_fecframe as u8,
            info.has_pilots as u8,
            info.n_mod,
            info.slots,
            info.n_pilots,
            info.plframe_len
        );
    }
    Ok(())
}

fn run_simulate(config: &SimConfig, json: bool) -> Result<()> {
    let points = sim::run(config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&points)?);
    } else {
        println!("mode            snr_db  errors/trials      per");
        for p in &points {
            println!(
                "{:<14}  {:>6.1}  {:>13}  {:.2e}",
                format!("{:?}", p.demapping),
                p.snr_db,
                format!("{}/{}", p.errors, p.trials),
                p.error_rate()
            );
        }
    }
    Ok(())
}
