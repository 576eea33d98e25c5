use anyhow::{Context, Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use serde_json::Value;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use geoipenrich::input::RecordSource;
use geoipenrich::{DatabaseVendor, EnrichmentConfig, GeoIpResolverEngine, Message};

const MAXMIND_CITY_DB: &str = "GeoLite2-City.mmdb";
const MAXMIND_ASN_DB: &str = "GeoLite2-ASN.mmdb";
const IPINFO_LOCATION_DB: &str = "standard_location.mmdb";
const IPINFO_ASN_DB: &str = "asn.mmdb";

/// Check if the error chain contains a broken pipe error.
#[inline(always)]
fn is_broken_pipe(err: &Error) -> bool {
    for cause in err.chain() {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::BrokenPipe {
                return true;
            }
        }
    }
    false
}

/// Enrich newline-delimited JSON log records with location and ASN fields
/// for the IP addresses they carry
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Load settings from a JSON configuration file. Other options override it
    #[clap(short, long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    config: Option<Utf8PathBuf>,

    /// Database vendor: MAXMIND or IPINFO
    #[clap(long, value_name = "VENDOR")]
    vendor: Option<DatabaseVendor>,

    /// Location (city) database file
    #[clap(long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    city_db: Option<Utf8PathBuf>,

    /// ASN database file
    #[clap(long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    asn_db: Option<Utf8PathBuf>,

    /// Specify directory containing the MMDB database files. Used for any database
    /// not given explicitly
    #[clap(
        short = 'I',
        value_name = "DIR",
        value_hint = clap::ValueHint::DirPath,
        env = "GEOIP_MMDB_DIR"
    )]
    include: Option<Utf8PathBuf>,

    /// Range table consulted when the location database has no answer
    #[clap(long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    fallback_ranges: Option<Utf8PathBuf>,

    /// Inspect every field and write legacy field names instead of the strict schema
    #[clap(long)]
    legacy: bool,

    /// Leave out the time zone field in legacy mode
    #[clap(long)]
    no_legacy_timezone: bool,

    /// Preferred language for city, region and country names
    #[clap(long, value_name = "LOCALE")]
    locale: Option<String>,

    /// Print lookup timing statistics to stderr when done
    #[clap(long)]
    stats: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG takes precedence
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Input file(s) to process. Leave empty or use "-" to read from stdin
    #[clap(value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    input: Vec<Utf8PathBuf>,
}

fn main() -> ExitCode {
    let err = match run_main() {
        Ok(code) => return code,
        Err(err) => err,
    };

    if is_broken_pipe(&err) {
        return ExitCode::SUCCESS;
    }

    // Print detailed error information based on environment variables
    let mut stderr = io::stderr();
    if std::env::var("RUST_BACKTRACE").is_ok_and(|v| v == "1")
        && std::env::var("RUST_LIB_BACKTRACE").map_or(true, |v| v == "1")
    {
        let _ = writeln!(stderr, "{:?}", err);
    } else {
        let _ = writeln!(stderr, "{:#}", err);
    }

    ExitCode::FAILURE
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // stdout carries records, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_main() -> Result<ExitCode> {
    let mut args = Args::parse();
    init_logging(args.verbose);

    // if no files specified, add stdin
    if args.input.is_empty() {
        args.input.push(Utf8PathBuf::from("-"));
    }

    let config = build_config(&args)?;
    debug!(?config, "effective configuration");

    let engine = GeoIpResolverEngine::new(&config);
    if !engine.is_enabled() {
        warn!("no usable geo database, records are passed through unchanged");
    }

    run(&args.input, &engine)?;

    if args.stats {
        writeln!(io::stderr(), "lookups: {}", engine.resolve_time())?;
    }

    Ok(ExitCode::SUCCESS)
}

/// Layer command line options over the configuration file (or the defaults).
fn build_config(args: &Args) -> Result<EnrichmentConfig> {
    let mut config = match &args.config {
        Some(path) => EnrichmentConfig::from_path(path)
            .with_context(|| format!("failed to load configuration: {}", path))?,
        None => EnrichmentConfig::default().with_enabled(true),
    };

    if let Some(vendor) = args.vendor {
        config = config.with_vendor(vendor);
    }
    if args.legacy {
        config = config.with_enforce_schema(false);
    }
    if args.no_legacy_timezone {
        config = config.with_legacy_timezone(false);
    }
    if let Some(locale) = &args.locale {
        config = config.with_locale(locale.as_str());
    }
    if let Some(path) = &args.fallback_ranges {
        config = config.with_fallback_range_table(path.clone());
    }

    let (city_file, asn_file) = match config.db_vendor_type {
        DatabaseVendor::MaxMind => (MAXMIND_CITY_DB, MAXMIND_ASN_DB),
        DatabaseVendor::IpInfo => (IPINFO_LOCATION_DB, IPINFO_ASN_DB),
    };
    if let Some(path) = pick_db(args.city_db.as_deref(), args.include.as_deref(), city_file) {
        config = config.with_city_db(path);
    }
    if let Some(path) = pick_db(args.asn_db.as_deref(), args.include.as_deref(), asn_file) {
        config = config.with_asn_db(path);
    }

    config.validate()?;
    Ok(config)
}

/// An explicit file wins over one found in the database directory.
fn pick_db(
    explicit: Option<&Utf8Path>,
    dir: Option<&Utf8Path>,
    file: &str,
) -> Option<Utf8PathBuf> {
    match (explicit, dir) {
        (Some(path), _) => Some(path.to_owned()),
        (None, Some(dir)) => Some(dir.join(file)),
        (None, None) => None,
    }
}

fn run(inputs: &[Utf8PathBuf], engine: &GeoIpResolverEngine) -> Result<()> {
    let mut out = io::BufWriter::with_capacity(65536, io::stdout());
    let mut buf = Vec::with_capacity(4096);

    for path in inputs {
        let source = RecordSource::from_path(path.clone());
        let mut reader = source.reader()?;

        reader.for_each_line(|line| {
            if line.is_blank() {
                return Ok(true);
            }

            match serde_json::from_slice::<Value>(line.bytes()) {
                Ok(Value::Object(map)) => {
                    let mut msg = Message::from(map);
                    engine.filter(&mut msg);

                    buf.clear();
                    serde_json::to_writer(&mut buf, &msg.into_json())?;
                    buf.push(b'\n');
                    out.write_all(&buf)?;
                }
                parsed => {
                    if let Err(err) = parsed {
                        debug!(
                            %source,
                            line = line.number(),
                            error = %err,
                            "not JSON, passed through"
                        );
                    }
                    out.write_all(line.bytes())?;
                    out.write_all(b"\n")?;
                }
            }
            Ok(true)
        })?;
        out.flush()?;
    }

    Ok(())
}
