//! NMEA 2000 router: wires the `nmea2k` ingestion core to live CAN hardware
//! (or log replay), the state cache, and the four downstream consumers
//! (NMEA 0183 broadcast, JSON broadcast, CSV logger, stdout printer).
//!
//! Zero arguments: open the configured CAN interface and run until
//! interrupted. One or more arguments: treat each as a log file path and
//! replay it through the same pipeline.

mod broadcast;
mod can_transport;
mod config;
mod csv_logger;
mod json_stream;
mod log_replay;
mod logging;
mod nmea0183;
mod periodic;
mod printer;

use std::error::Error;
use std::sync::Arc;

use nmea2k::{Catalog, Consumer, ConsumerError, DecodedRecord, Fanout, Ingest, PgnDescriptor, StateCache};
use tracing::{error, info};

use broadcast::BroadcastServer;
use config::Config;
use csv_logger::CsvLogger;
use json_stream::JsonStream;
use printer::PgnPrinter;

/// Adapts a shared [`StateCache`] to the [`Consumer`] interface: the cache's
/// own mutex is all the synchronization `observe` needs, so this wrapper
/// never needs real exclusive access despite the trait's `&mut self`.
struct CacheConsumer(Arc<StateCache>);

impl Consumer for CacheConsumer {
    fn consume(&mut self, pgn: u32, record: &DecodedRecord, _descriptor: &PgnDescriptor) -> Result<(), ConsumerError> {
        self.0.observe(pgn, record);
        Ok(())
    }
}

/// Adapts a shared [`JsonStream`] the same way `CacheConsumer` adapts the
/// state cache.
struct JsonConsumer(Arc<JsonStream>);

impl Consumer for JsonConsumer {
    fn consume(&mut self, pgn: u32, record: &DecodedRecord, descriptor: &PgnDescriptor) -> Result<(), ConsumerError> {
        self.0.record(pgn, record, descriptor)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_file("config.json").unwrap_or_else(|e| {
        eprintln!("could not load config.json ({e}), using defaults");
        Config::default()
    });

    let _log_guard = logging::init(&config.logging);
    info!("nmea_router starting");

    let mut catalog = Catalog::load_from_file(&config.pgn_catalog_path)?;
    if config.apply_catalog_corrections {
        catalog.apply_known_corrections();
    }
    info!(pgns = catalog.len(), path = %config.pgn_catalog_path, "pgn catalog loaded");

    let cache = Arc::new(StateCache::new(&catalog));
    let json_stream = Arc::new(JsonStream::new());

    let mut fanout = Fanout::new();
    fanout.register(Box::new(CacheConsumer(cache.clone())));
    fanout.register(Box::new(JsonConsumer(json_stream.clone())));
    fanout.register(Box::new(PgnPrinter));

    let _csv_logger = CsvLogger::new(&config.csv.directory, config.csv.interval(), cache.clone())?;

    let nmea0183_cache = cache.clone();
    let _nmea0183_server = BroadcastServer::new(
        config.nmea0183.port,
        config.nmea0183.interval(),
        move || nmea0183::render(&nmea0183_cache).into_bytes(),
        |count| info!(count, "nmea 0183 client count changed"),
    )?;

    let json_producer = json_stream.clone();
    let _json_server = BroadcastServer::new(
        config.json.port,
        config.json.interval(),
        move || json_producer.produce(),
        |count| info!(count, "json client count changed"),
    )?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut ingest = Ingest::new(&catalog, fanout);

    if args.is_empty() {
        run_live(&config, &mut ingest)
    } else {
        for path in &args {
            info!(path, "replaying log file");
            if let Err(e) = log_replay::replay_file(path, &mut ingest, &config.source_filter) {
                error!(path, error = %e, "failed to replay log file");
            }
        }
        Ok(())
    }
}

fn run_live(config: &Config, ingest: &mut Ingest) -> Result<(), Box<dyn Error>> {
    let mut socket = can_transport::open_with_retry(&config.can_interface);
    can_transport::configure(&mut socket)?;
    info!(interface = %config.can_interface, "listening for nmea2000 traffic");

    loop {
        match can_transport::read_frame(&socket) {
            Ok((raw_id, data)) => {
                if log_replay::frame_is_accepted(&config.source_filter, raw_id) {
                    ingest.handle_frame(raw_id, &data);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {
                // Nothing arrived this tick; loop back around so periodic
                // workers keep going.
                continue;
            }
            Err(e) => {
                error!(error = %e, "can bus read failed, reopening interface");
                socket = can_transport::open_with_retry(&config.can_interface);
                can_transport::configure(&mut socket)?;
            }
        }
    }
}
