use std::{
    io::{self, IsTerminal as _},
    net::IpAddr,
    path::PathBuf,
    process,
};

use argh::FromArgs;
use ipam::Ipam;
use snafu::{OptionExt as _, ResultExt as _, whatever};
use snafu_utils::{GenericError, Report};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

mod state;

/// Allocate, free and reserve addresses of a single CIDR range.
#[derive(Debug, FromArgs)]
struct Args {
    /// log filter used when RUST_LOG is unset (default: warn)
    #[argh(option, default = "String::from(\"warn\")")]
    log_level: String,

    #[argh(subcommand)]
    command: Command,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Info(InfoArgs),
    Allocate(AllocateArgs),
    Free(FreeArgs),
    Reserve(ReserveArgs),
    Show(ShowArgs),
}

/// Print the bounds and size of a CIDR range.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "info")]
struct InfoArgs {
    #[argh(positional)]
    cidr: String,
}

/// Allocate addresses.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "allocate")]
struct AllocateArgs {
    /// JSON state file; created when missing
    #[argh(option, short = 's')]
    state: Option<PathBuf>,

    /// CIDR range to start from when there is no state yet
    #[argh(option, short = 'c')]
    cidr: Option<String>,

    /// number of addresses to allocate (default: 1)
    #[argh(option, short = 'n', default = "1")]
    count: u64,

    /// reserve the first and last address of a new range
    #[argh(switch)]
    reserve_first_and_last: bool,

    /// print the resulting state as JSON
    #[argh(switch)]
    export: bool,
}

/// Free allocated addresses.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "free")]
struct FreeArgs {
    /// JSON state file
    #[argh(option, short = 's')]
    state: PathBuf,

    #[argh(positional)]
    addrs: Vec<IpAddr>,
}

/// Reserve specific addresses.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "reserve")]
struct ReserveArgs {
    /// JSON state file
    #[argh(option, short = 's')]
    state: PathBuf,

    #[argh(positional)]
    addrs: Vec<IpAddr>,
}

/// Print the allocation state.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "show")]
struct ShowArgs {
    /// JSON state file
    #[argh(option, short = 's')]
    state: PathBuf,
}

fn main() {
    let args: Args = argh::from_env();
    init_logging(&args.log_level);

    if let Err(err) = run(args.command) {
        let report = Report::new(err).with_color(io::stderr().is_terminal());
        eprintln!("{report}");
        process::exit(1);
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn run(command: Command) -> Result<(), GenericError> {
    match command {
        Command::Info(args) => info_range(&args),
        Command::Allocate(args) => allocate(&args),
        Command::Free(args) => free(&args),
        Command::Reserve(args) => reserve(&args),
        Command::Show(args) => show(&args),
    }
}

fn info_range(args: &InfoArgs) -> Result<(), GenericError> {
    let ipam = Ipam::new(&args.cidr).whatever_context("failed to parse CIDR range")?;
    println!("cidr:        {}", ipam.cidr());
    println!("first:       {}", ipam.first());
    println!("last:        {}", ipam.last());
    println!("mode:        {}", ipam.mode());
    println!("unallocated: {}", ipam.unallocated());
    Ok(())
}

fn allocate(args: &AllocateArgs) -> Result<(), GenericError> {
    let existing = match &args.state {
        Some(path) => state::load(path)?,
        None => None,
    };
    let mut ipam = match existing {
        Some(ipam) => {
            if let Some(cidr) = &args.cidr {
                if cidr.parse::<Ipam>().map(|new| new.cidr()).ok() != Some(ipam.cidr()) {
                    whatever!("state holds {}, not {cidr}", ipam.cidr());
                }
            }
            ipam
        }
        None => {
            let cidr = args
                .cidr
                .as_deref()
                .whatever_context("no state found, --cidr is required")?;
            let mut ipam = Ipam::new(cidr).whatever_context("failed to parse CIDR range")?;
            if args.reserve_first_and_last {
                ipam.reserve_first_and_last();
            }
            info!(cidr = %ipam.cidr(), "starting new allocation state");
            ipam
        }
    };

    for _ in 0..args.count {
        let addr = ipam
            .allocate()
            .whatever_context("failed to allocate address")?;
        println!("{addr}");
    }

    if let Some(path) = &args.state {
        state::save(path, &ipam)?;
    }
    if args.export {
        println!("{}", state::to_json(&ipam)?);
    }
    Ok(())
}

fn free(args: &FreeArgs) -> Result<(), GenericError> {
    let mut ipam = state::load_existing(&args.state)?;
    for addr in &args.addrs {
        ipam.free(*addr);
    }
    state::save(&args.state, &ipam)
}

fn reserve(args: &ReserveArgs) -> Result<(), GenericError> {
    let mut ipam = state::load_existing(&args.state)?;
    for addr in &args.addrs {
        ipam.reserve(*addr)
            .with_whatever_context(|_| format!("failed to reserve {addr}"))?;
    }
    state::save(&args.state, &ipam)
}

fn show(args: &ShowArgs) -> Result<(), GenericError> {
    let ipam = state::load_existing(&args.state)?;
    println!("cidr:        {}", ipam.cidr());
    println!("mode:        {}", ipam.mode());
    println!("current:     {}", ipam.current());
    println!("unallocated: {}", ipam.unallocated());
    for (key, value) in ipam.flags() {
        println!("flag:        {key}={value}");
    }
    for addr in ipam.allocated() {
        println!("allocated:   {addr}");
    }
    Ok(())
}
