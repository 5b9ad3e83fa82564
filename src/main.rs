//! Townsquare server binary.
//!
//! Assembles the document store, upload store, mailer, and token keys into
//! the shared state, builds the router, and serves. If the primary port is
//! occupied the server falls back through a fixed list of alternates.

use std::net::Ipv4Addr;
use std::path::Path;

use clap::Parser;
use tokio::net::TcpListener;

use townsquare::auth::AuthTokens;
use townsquare::db::Database;
use townsquare::email::{MailConfig, Mailer};
use townsquare::state::{AppState, ServerConfig};
use townsquare::upload::UploadStore;

/// Ports tried in order when the primary is already in use.
const FALLBACK_PORTS: [u16; 3] = [5001, 4001, 5002];

#[derive(Parser, Debug)]
#[command(name = "townsquare", version, about = "Community social platform server")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 5000, env = "PORT")]
    port: u16,

    /// Data directory for the document store and uploads.
    /// Omit to run in-memory only.
    #[arg(long, env = "DATA_DIR")]
    data_dir: Option<String>,

    /// Secret used to sign bearer tokens
    #[arg(long, env = "JWT_SECRET")]
    jwt_secret: String,

    /// Front-end origin, used for CORS and password-reset links
    #[arg(long, default_value = "http://localhost:3000", env = "FRONTEND_URL")]
    frontend_url: String,

    /// Skip the MX deliverability check on registration (offline/dev use)
    #[arg(long, default_value_t = false, env = "SKIP_MX_CHECK")]
    skip_mx_check: bool,

    /// Allow any CORS origin (development)
    #[arg(long, default_value_t = false, env = "CORS_PERMISSIVE")]
    permissive_cors: bool,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "townsquare=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();

    let db = Database::open(args.data_dir.as_deref().map(Path::new));
    let uploads = UploadStore::new(args.data_dir.as_deref());
    let mailer = Mailer::from_config(&MailConfig::from_env());

    let state = AppState {
        db,
        uploads,
        mailer,
        tokens: AuthTokens::new(&args.jwt_secret),
        config: ServerConfig {
            frontend_url: args.frontend_url,
            skip_mx_check: args.skip_mx_check,
            permissive_cors: args.permissive_cors,
        },
    };

    let app = townsquare::build_router(state);

    // Bind the primary port, falling back through the alternates when it is
    // already occupied.
    let mut listener = None;
    for port in std::iter::once(args.port).chain(FALLBACK_PORTS) {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(bound) => {
                if port != args.port {
                    tracing::warn!(
                        requested = args.port,
                        bound = port,
                        "Primary port in use, bound fallback port"
                    );
                }
                listener = Some(bound);
                break;
            }
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::warn!(port, "Port in use, trying next");
            }
            Err(e) => {
                tracing::error!(port, error = %e, "Failed to bind");
                break;
            }
        }
    }

    let listener = listener.expect("No available port — stop the other process or set PORT");

    let addr = listener
        .local_addr()
        .expect("Listener has no local address");
    tracing::info!("Townsquare server starting on {}", addr);

    axum::serve(listener, app).await.expect("Server error");
}
