//! Where the magic happens for `uac-topology` binary!
use clap::Parser;
use std::fs;
use std::path::PathBuf;

use uac_topology::config::Config;
use uac_topology::display;
use uac_topology::error::{Error, ErrorKind, Result};
use uac_topology::usb::descriptors::bytes_from_hex;
use uac_topology::ConfigurationModel;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, max_term_width = 80)]
struct Args {
    /// Configuration descriptor file: raw bytes, or hex text with --hex
    file: PathBuf,

    /// AudioControl interface number to decode; defaults to config then the first found
    #[arg(short, long)]
    interface: Option<u8>,

    /// Candidate sample rates merged into UAC2 alternate settings
    #[arg(short, long, value_delimiter = ',', num_args = 1..)]
    sample_rates: Option<Vec<u32>>,

    /// Input file is whitespace separated hex text
    #[arg(long, default_value_t = false)]
    hex: bool,

    /// Output as json format after parsing
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Path to user config file to use for custom defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Disable coloured output, can also use NO_COLOR environment variable
    #[arg(short = 'z', long, default_value_t = false)]
    no_colour: bool,

    /// Turn debugging information on. Alternatively can use RUST_LOG env: INFO, DEBUG, TRACE
    #[arg(short = 'd', long, action = clap::ArgAction::Count)]
    debug: u8,
}

fn read_descriptor(args: &Args, hex: bool) -> Result<Vec<u8>> {
    if hex {
        let text = fs::read_to_string(&args.file)?;
        bytes_from_hex(&text)
    } else {
        Ok(fs::read(&args.file)?)
    }
}

fn run(args: Args) -> Result<()> {
    uac_topology::set_log_level(args.debug)?;

    let config = match args.config.as_ref() {
        Some(p) => Config::from_file(p)?,
        None => Config::sys()?,
    };
    log::debug!("{:?}", config);

    if args.no_colour || std::env::var_os("NO_COLOR").is_some() {
        colored::control::set_override(false);
    }

    let data = read_descriptor(&args, args.hex || config.hex)?;
    if data.is_empty() {
        return Err(Error::new(
            ErrorKind::InvalidArg,
            &format!("{:?} contains no descriptor bytes", args.file),
        ));
    }

    let interface = match args.interface.or(config.control_interface) {
        Some(i) => i,
        None => ConfigurationModel::first_control_interface(&data)?,
    };
    log::info!("Decoding AudioControl interface {}", interface);

    let mut model = ConfigurationModel::parse(&data, interface)?;

    let rates = args.sample_rates.unwrap_or(config.sample_rates);
    if !rates.is_empty() {
        let added = model.add_sample_rates_to_all(&rates);
        log::info!("Added {} sample rates", added);
    }

    if args.json || config.json {
        println!("{}", serde_json::to_string_pretty(&model)?);
    } else {
        display::dump_model(&model);
    }

    Ok(())
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
