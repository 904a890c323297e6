pub mod auth;
pub mod error;
pub mod gallery;
pub mod handlers;
pub mod helpers;
pub mod identity;
pub mod models;
pub mod session;
pub mod state;
pub mod storage;
#[cfg(test)]
mod testing;

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::{Context as _, bail};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

pub use error::{AppError, AppResult, AuthError, StorageError};
pub use gallery::{Gallery, GalleryFollower};
pub use handlers::{Healthz, VERSION};
pub use identity::{IdentityFeed, IdentityService, LocalIdentityService};
pub use models::{Identity, Listing, SessionStatus, StoredObjectRef, UserId};
pub use session::{SessionManager, SessionSubscription};
pub use state::AppState;
pub use storage::{LocalObjectStore, Namespace, ObjectStore};

use crate::helpers::settle;

const OBJECTS_DIR: &str = "objects";
/// Request body limit for uploads, in bytes
pub const DEFAULT_MAX_UPLOAD: usize = 32 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(author, version=VERSION, about, long_about=None)]
pub struct Cli {
    /// Bind host & port
    #[arg(long, short = 'b', env = "BIND", default_value = "127.0.0.1:8080")]
    pub bind: String,

    /// Debug mode
    #[arg(long, short = 'd', env = "DEBUG")]
    pub debug: bool,

    /// Data directory holding accounts, the session and uploaded photos
    #[arg(long, env = "DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Log format
    #[arg(long, env = "LOG_FORMAT", default_value = "full")]
    pub log_format: LogFormat,

    /// No color <https://no-color.org/>
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Seed to version photo addresses
    #[arg(long, env = "SEED")]
    pub seed: Option<u64>,

    /// Largest upload request accepted, in bytes
    #[arg(long, env = "MAX_UPLOAD", default_value_t = DEFAULT_MAX_UPLOAD)]
    pub max_upload: usize,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Full,
    Compact,
    Pretty,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an account
    #[command()]
    Signup {
        #[arg(long, short = 'e', env = "EMAIL")]
        email: String,
        /// Prompted when omitted
        #[arg(long, env = "PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// List photos
    #[command(alias = "ls")]
    List {
        #[arg(long, short = 'e', env = "EMAIL")]
        email: String,
        /// Prompted when omitted
        #[arg(long, env = "PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Upload photos
    #[command()]
    Upload {
        #[arg(long, short = 'e', env = "EMAIL")]
        email: String,
        /// Prompted when omitted
        #[arg(long, env = "PASSWORD", hide_env_values = true)]
        password: Option<String>,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Delete a photo
    #[command(alias = "rm")]
    Delete {
        #[arg(long, short = 'e', env = "EMAIL")]
        email: String,
        /// Prompted when omitted
        #[arg(long, env = "PASSWORD", hide_env_values = true)]
        password: Option<String>,
        name: String,
    },
}

/// The composed application. Owns the identity subscription and the gallery
/// follower; dropping it stops both.
pub struct App {
    pub state: Arc<AppState>,
    _follower: GalleryFollower,
    _subscription: SessionSubscription,
}

impl App {
    /// Wire the session manager and gallery over the given collaborators
    pub fn compose(identity: Arc<dyn IdentityService>, store: Arc<dyn ObjectStore>) -> Self {
        let session = SessionManager::new(identity);
        let gallery = Gallery::new(store.clone(), session.clone());
        let follower = gallery.follow(session.watch());
        let subscription = session.start();
        Self {
            state: Arc::new(AppState {
                gallery,
                max_upload: DEFAULT_MAX_UPLOAD,
                session,
                store,
            }),
            _follower: follower,
            _subscription: subscription,
        }
    }

    /// Override the upload body limit
    #[must_use]
    pub fn with_max_upload(mut self, bytes: usize) -> Self {
        self.state = Arc::new(AppState {
            max_upload: bytes,
            ..(*self.state).clone()
        });
        self
    }

    /// Open the local identity service and object store under `data_dir`
    pub async fn open(data_dir: &Path, seed: u64) -> anyhow::Result<Self> {
        let identity = LocalIdentityService::open(data_dir)
            .await
            .with_context(|| format!("failed to open identity store in {}", data_dir.display()))?;
        let store = LocalObjectStore::new(data_dir.join(OBJECTS_DIR), seed);
        Ok(Self::compose(Arc::new(identity), Arc::new(store)))
    }
}

fn seed_or_epoch(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        warn!(%seed, "no seed provided, use seconds since UNIX epoch as seed");
        seed
    })
}

pub fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::builder()
        .with_default_directive(if cli.debug {
            Level::DEBUG.into()
        } else {
            Level::INFO.into()
        })
        .from_env_lossy();
    let builder = tracing_subscriber::fmt()
        .with_ansi(!cli.no_color)
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Full => builder.init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

pub fn init_route(state: Arc<AppState>) -> Router {
    let max_upload = state.max_upload;
    Router::new()
        .route("/", get(handlers::index_route))
        .route("/signup", post(handlers::signup_route))
        .route("/login", post(handlers::login_route))
        .route("/logout", post(handlers::logout_route))
        .route(
            "/photos",
            get(handlers::list_photos_route)
                .post(handlers::upload_photos_route)
                .layer(DefaultBodyLimit::max(max_upload)),
        )
        .route("/photos/{name}/delete", post(handlers::delete_photo_route))
        .route("/data/{*path}", get(handlers::show_data_route))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_resolved,
        ))
        .route("/healthz", get(handlers::healthz_route))
        .layer(
            ServiceBuilder::new().layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            ),
        )
        .with_state(state)
}

pub async fn run_server(addr: SocketAddr, cli: &Cli) -> anyhow::Result<()> {
    let app = App::open(&cli.data_dir, seed_or_epoch(cli.seed))
        .await?
        .with_max_upload(cli.max_upload);
    let router = init_route(app.state.clone());
    let version = VERSION;
    let listener = TcpListener::bind(&addr).await?;
    let local_addr: SocketAddr = listener.local_addr()?;
    info!(addr = %local_addr, %version, "server started");
    let status = app.state.session.wait_resolved().await;
    info!(status = status.label(), "session resolved");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(%err, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("shutting down");
        })
        .await
        .context("server failed")?;
    Ok(())
}

fn read_password(password: Option<&String>, confirm: bool) -> anyhow::Result<String> {
    if let Some(password) = password {
        return Ok(password.clone());
    }
    let password = rpassword::prompt_password("Password: ")?;
    if confirm {
        let confirmation = rpassword::prompt_password("Confirmation: ")?;
        if password != confirmation {
            bail!("password mismatched");
        }
    }
    Ok(password)
}

async fn login(app: &App, email: &str, password: Option<&String>) -> anyhow::Result<()> {
    let password = read_password(password, false)?;
    let session = &app.state.session;
    session.login(email, &password).await?;
    let email = email.trim().to_ascii_lowercase();
    let status = settle(session, |s| s.identity().is_some_and(|i| i.email == email)).await;
    if !status.is_authenticated() {
        bail!("session did not switch to {email}");
    }
    Ok(())
}

fn print_listing(gallery: &Gallery) {
    let objects = gallery.objects();
    println!("{} photo(s)", objects.len());
    for object in objects {
        println!("{}\t{}", object.name, object.url);
    }
}

pub async fn run_command(cli: &Cli, command: &Commands) -> anyhow::Result<()> {
    let app = App::open(&cli.data_dir, seed_or_epoch(cli.seed)).await?;
    app.state.session.wait_resolved().await;
    let gallery = &app.state.gallery;
    match command {
        Commands::Signup { email, password } => {
            let password = read_password(password.as_ref(), true)?;
            app.state.session.signup(email, &password).await?;
            println!("signed up {email}");
        }
        Commands::List { email, password } => {
            login(&app, email, password.as_ref()).await?;
            gallery.load_objects().await?;
            print_listing(gallery);
        }
        Commands::Upload {
            email,
            password,
            files,
        } => {
            login(&app, email, password.as_ref()).await?;
            let mut payloads = Vec::with_capacity(files.len());
            for file in files {
                let name = file
                    .file_name()
                    .and_then(|s| s.to_str())
                    .with_context(|| format!("invalid path: {}", file.display()))?
                    .to_string();
                let bytes = tokio::fs::read(file)
                    .await
                    .with_context(|| format!("failed to read {}", file.display()))?;
                payloads.push((name, bytes));
            }
            gallery.upload_objects(payloads).await?;
            print_listing(gallery);
        }
        Commands::Delete {
            email,
            password,
            name,
        } => {
            login(&app, email, password.as_ref()).await?;
            gallery.delete_object(name).await?;
            print_listing(gallery);
        }
    }
    Ok(())
}
