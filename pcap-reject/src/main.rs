#![warn(clippy::all)]

#[macro_use]
extern crate log;

use clap::{crate_version, Parser};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use libreject_tools::{Config, DispatchEngine, DivertSession, Error};
use pcap_reject::{RejectTemplates, Rejecter};

/// Stateless reject engine: answer matching packets with TCP resets and ICMP
/// port unreachable messages
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<String>,

    /// Capture interface (default: first capture device)
    #[arg(short, long)]
    interface: Option<String>,

    /// Do not print a line for every blocked packet
    #[arg(short, long)]
    quiet: bool,

    /// Filter expression selecting the packets to reject
    filter: String,

    /// Filter priority
    #[arg(allow_negative_numbers = true, default_value_t = 0)]
    priority: i16,
}

fn load_config(config: &mut Config, filename: &str) -> Result<(), io::Error> {
    debug!("Loading configuration {filename}");
    let path = Path::new(&filename);
    let file = File::open(path).map_err(|e| {
        error!("Could not open config file '{filename}'");
        e
    })?;
    config.load_config(file)
}

#[cfg(feature = "live")]
fn open_session(
    filter: &str,
    priority: i16,
    config: &Config,
) -> Result<Box<dyn DivertSession>, Error> {
    let session = libreject_live::PcapDivertSession::open(filter, priority, config)?;
    Ok(Box::new(session))
}

#[cfg(not(feature = "live"))]
fn open_session(
    _filter: &str,
    _priority: i16,
    _config: &Config,
) -> Result<Box<dyn DivertSession>, Error> {
    Err(Error::DriverOpenFailed(
        "no capture backend (rebuild with the `live` feature)".to_owned(),
    ))
}

#[cfg(feature = "live")]
fn install_stop_handler(running: &Arc<AtomicBool>) {
    use std::sync::atomic::Ordering;
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Could not install Ctrl-C handler: {e}");
    }
}

#[cfg(not(feature = "live"))]
fn install_stop_handler(_running: &Arc<AtomicBool>) {}

fn run<S: DivertSession>(session: S, config: &Config) -> Result<(), Error> {
    let templates = Arc::new(RejectTemplates::new());
    let rejecter = Rejecter::new(templates, config);
    let mut engine = DispatchEngine::new(session, rejecter, config);
    let running = Arc::new(AtomicBool::new(true));
    install_stop_handler(&running);
    engine.run(running)
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::try_from_env("PCAP_REJECT_LOG")
        .unwrap_or_else(|_| EnvFilter::from_default_env().add_directive(Level::INFO.into()));
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(env_filter)
        .with_ansi(io::stderr().is_terminal())
        .compact()
        .init();

    // load config
    let mut config = Config::default();
    if let Some(filename) = args.config.as_ref() {
        load_config(&mut config, filename)?;
    }
    // override config options from command-line arguments
    if let Some(interface) = args.interface.as_ref() {
        config.set("live.interface", interface.as_str());
    }
    if args.quiet {
        config.set("report.enabled", false);
    }

    info!("pcap-reject {}", crate_version!());

    let session = match open_session(&args.filter, args.priority, &config) {
        Ok(session) => session,
        Err(e) => {
            error!("Could not open filter session: {e}");
            eprintln!("pcap-reject: {e}");
            ::std::process::exit(1);
        }
    };

    if let Err(e) = run(session, &config) {
        error!("pcap-reject: {e}");
        eprintln!("pcap-reject: {e}");
        ::std::process::exit(1);
    }

    info!("pcap-reject: done, exiting");
    Ok(())
}
