mod background;
mod handlers;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use clap::Parser;
use clap::builder::BoolishValueParser;
use tower_http::compression::CompressionLayer;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use mcstat_core::collector::identity::{DEFAULT_PROFILE_URL, parse_usercache};
use mcstat_core::collector::{
    Collector, IdentityResolver, MojangLookup, RconConfig, RconSession, RealFs, ReportToggles,
};

use state::{ExporterCollector, SharedState, WebAppInner};

// ============================================================
// CLI
// ============================================================

#[derive(Parser)]
#[command(
    name = "mcstat-web",
    about = "Prometheus exporter for Minecraft server statistics",
    version = mcstat_core::VERSION
)]
struct Args {
    /// Listen address.
    #[arg(long, default_value = "0.0.0.0:8000", env = "MCSTAT_LISTEN")]
    listen: String,

    /// Listen port; overrides the port of --listen.
    #[arg(long, env = "HTTP_PORT")]
    http_port: Option<u16>,

    /// World directory containing stats/, playerdata/ and advancements/.
    #[arg(long, default_value = "/world", env = "MCSTAT_WORLD")]
    world: PathBuf,

    /// Server usercache.json, consulted before the remote profile service.
    #[arg(long, env = "MCSTAT_USERCACHE")]
    usercache: Option<PathBuf>,

    /// Remote profile service; the player id is appended to this URL.
    #[arg(long, default_value = DEFAULT_PROFILE_URL, env = "MCSTAT_PROFILE_URL")]
    profile_url: String,

    /// Disable remote profile lookups entirely.
    #[arg(long)]
    no_remote_lookup: bool,

    /// RCON host. RCON is disabled unless host and password are both set.
    #[arg(long, env = "RCON_HOST")]
    rcon_host: Option<String>,

    /// RCON port.
    #[arg(long, default_value_t = mcstat_core::collector::rcon::DEFAULT_PORT, env = "RCON_PORT")]
    rcon_port: u16,

    /// RCON password.
    #[arg(long, env = "RCON_PASSWORD", hide_env_values = true)]
    rcon_password: Option<String>,

    /// Timeout in seconds for RCON and profile requests.
    #[arg(long, default_value = "10", env = "RCON_TIMEOUT")]
    rcon_timeout: u64,

    /// Collect Paper `tps` report.
    #[arg(long, env = "PAPER_SERVER", default_value_t = false, action = clap::ArgAction::Set, num_args = 0..=1,
          default_missing_value = "true", value_parser = BoolishValueParser::new())]
    paper: bool,

    /// Collect Forge `forge tps` and `forge entity list` reports.
    #[arg(long, env = "FORGE_SERVER", default_value_t = false, action = clap::ArgAction::Set, num_args = 0..=1,
          default_missing_value = "true", value_parser = BoolishValueParser::new())]
    forge: bool,

    /// Collect Dynmap `dynmap stats` report.
    #[arg(long, env = "DYNMAP_ENABLED", default_value_t = false, action = clap::ArgAction::Set, num_args = 0..=1,
          default_missing_value = "true", value_parser = BoolishValueParser::new())]
    dynmap: bool,

    /// Local hour (0-23) at which the player name cache is flushed.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(0..24))]
    flush_at: u32,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber with the appropriate log level.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["mcstat_web", "mcstat_core"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

// ============================================================
// Main
// ============================================================

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let addr = match listen_addr(&args) {
        Ok(addr) => addr,
        Err(e) => {
            error!(listen = %args.listen, error = %e, "invalid listen address");
            process::exit(2);
        }
    };

    // The blocking HTTP client of the profile lookup must be built outside the runtime.
    let collector = create_collector(&args);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
        .block_on(async_main(args, addr, collector));
}

async fn async_main(args: Args, addr: SocketAddr, collector: ExporterCollector) {
    let identity = collector.identity();
    let state: SharedState = Arc::new(Mutex::new(WebAppInner::new(collector)));

    let flush_at = args.flush_at;
    tokio::spawn(async move {
        background::flush_loop(identity, flush_at).await;
    });

    let app = Router::new()
        .route("/metrics", get(handlers::handle_metrics))
        .route("/health", get(handlers::handle_health))
        .with_state(state)
        .layer(CompressionLayer::new());

    info!(%addr, "listening");
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "failed to bind");
            process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "server error");
        process::exit(1);
    }
}

fn listen_addr(args: &Args) -> Result<SocketAddr, std::net::AddrParseError> {
    let mut addr: SocketAddr = args.listen.parse()?;
    if let Some(port) = args.http_port {
        addr.set_port(port);
    }
    Ok(addr)
}

fn create_collector(args: &Args) -> ExporterCollector {
    info!(
        version = mcstat_core::VERSION,
        world = %args.world.display(),
        "starting exporter"
    );
    let timeout = Duration::from_secs(args.rcon_timeout);

    let mut identity = IdentityResolver::new();
    if let Some(ref path) = args.usercache {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let ledger = parse_usercache(&content);
                info!(path = %path.display(), players = ledger.len(), "loaded usercache");
                identity = identity.with_local(ledger);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "cannot read usercache"),
        }
    }
    if !args.no_remote_lookup {
        match MojangLookup::new(args.profile_url.clone(), timeout) {
            Ok(lookup) => identity = identity.with_remote(lookup),
            Err(e) => warn!(error = %e, "remote profile lookup disabled"),
        }
    }

    let rcon = RconSession::from_config(&RconConfig {
        host: args.rcon_host.clone(),
        port: args.rcon_port,
        password: args.rcon_password.clone(),
        timeout,
    });

    let reports = ReportToggles {
        paper: args.paper,
        forge: args.forge,
        dynmap: args.dynmap,
    };
    info!(
        paper = reports.paper,
        forge = reports.forge,
        dynmap = reports.dynmap,
        "server reports"
    );

    Collector::new(RealFs::new(), &args.world)
        .with_identity(Arc::new(identity))
        .with_rcon(rcon)
        .with_reports(reports)
}
