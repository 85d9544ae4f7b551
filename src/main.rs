//! FlashLink - An In-Memory, Time-Bounded Alias Store
//!
//! Entry point for the FlashLink server. Sets up the alias store, the
//! expiry sweeper and the TCP listener.

use flashlink::commands::CommandHandler;
use flashlink::connection::{handle_connection, ConnectionStats};
use flashlink::service::Shortener;
use flashlink::storage::{AliasStore, StoreConfig, Sweeper};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Server configuration
struct Config {
    /// Host to bind to
    host: String,
    /// Port to listen on
    port: u16,
    /// Prefix for reported short URLs
    base_url: String,
    store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: flashlink::DEFAULT_HOST.to_string(),
            port: flashlink::DEFAULT_PORT,
            base_url: flashlink::DEFAULT_BASE_URL.to_string(),
            store: StoreConfig::default(),
        }
    }
}

/// Returns the variable's value if it is set and not empty.
fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

fn exit_with(message: &str) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

impl Config {
    /// Reads `FLASHLINK_*` variables, then command-line arguments.
    ///
    /// Arguments win over the environment.
    fn load() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config.apply_args();
        config
    }

    fn apply_env(&mut self) {
        if let Some(base_url) = env_var("FLASHLINK_BASE_URL") {
            self.base_url = base_url;
        }

        if let Some(secs) = env_var("FLASHLINK_DEFAULT_TTL_SECONDS") {
            let secs: u64 = secs
                .parse()
                .unwrap_or_else(|_| exit_with("FLASHLINK_DEFAULT_TTL_SECONDS must be a number"));
            self.store = self.store.clone().with_default_ttl(Duration::from_secs(secs));
        }

        let alphabet = env_var("FLASHLINK_ALIAS_ALPHABET");
        let length = env_var("FLASHLINK_ALIAS_LENGTH").map(|len| {
            len.parse::<usize>()
                .unwrap_or_else(|_| exit_with("FLASHLINK_ALIAS_LENGTH must be a number"))
        });
        if alphabet.is_some() || length.is_some() {
            let alphabet = alphabet.unwrap_or_else(|| self.store.alias_alphabet.clone());
            let length = length.unwrap_or(self.store.alias_length);
            self.store = self.store.clone().with_alias_shape(alphabet, length);
        }
    }

    fn apply_args(&mut self) {
        let args: Vec<String> = env::args().collect();

        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1);
            match (args[i].as_str(), value) {
                ("--host" | "-h", Some(host)) => {
                    self.host = host.clone();
                    i += 2;
                }
                ("--port" | "-p", Some(port)) => {
                    self.port = port
                        .parse()
                        .unwrap_or_else(|_| exit_with("invalid port number"));
                    i += 2;
                }
                ("--base-url" | "-b", Some(base_url)) => {
                    self.base_url = base_url.clone();
                    i += 2;
                }
                ("--host" | "-h" | "--port" | "-p" | "--base-url" | "-b", None) => {
                    exit_with(&format!("{} requires a value", args[i]));
                }
                ("--help", _) => {
                    print_help();
                    std::process::exit(0);
                }
                ("--version" | "-v", _) => {
                    println!("FlashLink version {}", flashlink::VERSION);
                    std::process::exit(0);
                }
                (other, _) => {
                    eprintln!("Unknown argument: {}", other);
                    print_help();
                    std::process::exit(1);
                }
            }
        }
    }

    /// Returns the bind address as a string
    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn print_help() {
    println!(
        r#"
FlashLink - An In-Memory, Time-Bounded Alias Store

USAGE:
    flashlink [OPTIONS]

OPTIONS:
    -h, --host <HOST>        Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>        Port to listen on (default: 6380)
    -b, --base-url <URL>     Prefix for short URLs (default: http://localhost:3000/api/urls)
    -v, --version            Print version information
        --help               Print this help message

ENVIRONMENT (also read from .env):
    FLASHLINK_BASE_URL               Same as --base-url
    FLASHLINK_DEFAULT_TTL_SECONDS    TTL for aliases created without one (default: 120)
    FLASHLINK_ALIAS_ALPHABET         Characters for generated aliases
    FLASHLINK_ALIAS_LENGTH           Length of generated aliases (default: 8)
    RUST_LOG                         Log filter (default: info)

CONNECTING:
    $ redis-cli -p 6380
    127.0.0.1:6380> SHORTEN https://www.rust-lang.org ALIAS rust TTL 60
    1) "rust"
    2) "http://localhost:3000/api/urls/rust"
    127.0.0.1:6380> RESOLVE rust
    "https://www.rust-lang.org"
"#
    );
}

/// Resolves once Ctrl+C or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received, stopping server...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if url::Url::parse(&config.base_url).is_err() {
        warn!(base_url = %config.base_url, "Base URL is not an absolute URL");
    }

    let store = Arc::new(AliasStore::with_config(config.store.clone()));
    info!(
        default_ttl_secs = config.store.default_ttl.as_secs(),
        sweep_interval_ms = config.store.sweep_interval.as_millis() as u64,
        "Alias store initialized"
    );

    let sweeper = Sweeper::start(Arc::clone(&store));

    let handler = CommandHandler::new(Shortener::new(Arc::clone(&store)), config.base_url.clone());
    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!(
        version = flashlink::VERSION,
        address = %config.bind_address(),
        base_url = %config.base_url,
        "FlashLink listening"
    );

    tokio::select! {
        _ = accept_loop(listener, handler, Arc::clone(&stats)) => {}
        _ = shutdown_signal() => {}
    }

    sweeper.shutdown().await;

    let store_stats = store.stats();
    info!(
        aliases = store_stats.aliases,
        created = store_stats.created,
        resolved = store_stats.resolved,
        "Server shutdown complete"
    );
    Ok(())
}

/// Accepts connections until the task is cancelled.
async fn accept_loop(listener: TcpListener, handler: CommandHandler, stats: Arc<ConnectionStats>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = handler.clone();
                let stats = Arc::clone(&stats);
                tokio::spawn(handle_connection(stream, addr, handler, stats));
            }
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
            }
        }
    }
}
