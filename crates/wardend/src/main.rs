//! wardend - the warden background service
//!
//! Wires together the components:
//! - Configuration loading
//! - Store initialization (SQLite)
//! - Reconciliation engine
//! - Browser bridge (IPC-backed rule enforcement, views, navigation)
//! - Expiry timer slot
//! - IPC server and command handling
//!
//! All triggers funnel through one `select!` loop, so the engine handles them
//! strictly one at a time.

mod bridge;
mod config;
mod timer;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use warden_api::{
    BlockedDomain, Command, ErrorCode, ErrorInfo, Event, EventPayload, Request, Response,
    ResponsePayload, ServiceState, SessionRecord, API_VERSION,
};
use warden_core::{Engine, EngineOptions, Trigger, enforced_domains, next_expiry};
use warden_ipc::{IpcServer, ServerMessage};
use warden_store::{SessionStore, SqliteStore, StoreError};
use warden_util::{SessionId, normalize_domain};

use bridge::BridgeHost;
use config::load_config;
use timer::TokioTimer;

/// wardend - time-bounded website blocking service
#[derive(Parser, Debug)]
#[command(name = "wardend")]
#[command(about = "Time-bounded website blocking service", long_about = None)]
struct Args {
    /// Configuration file path (TOML, optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Socket path override (or set WARDEN_SOCKET env var)
    #[arg(short, long, env = "WARDEN_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set WARDEN_DATA_DIR env var)
    #[arg(short, long, env = "WARDEN_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    engine: Engine,
    ipc: Arc<IpcServer>,
    bridge: Arc<BridgeHost>,
    store: Arc<SqliteStore>,
    timer_fires: mpsc::UnboundedReceiver<()>,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let mut config = load_config(args.config.as_deref())?;

        if let Some(socket) = &args.socket {
            config.socket_path = socket.clone();
        }
        if let Some(data_dir) = &args.data_dir {
            config.data_dir = data_dir.clone();
        }

        info!(
            socket_path = %config.socket_path.display(),
            data_dir = %config.data_dir.display(),
            "Configuration loaded"
        );

        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("Failed to create data directory {:?}", config.data_dir)
        })?;

        let db_path = config.data_dir.join("wardend.db");
        let store = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {db_path:?}"))?,
        );

        if store.is_healthy() {
            info!(db_path = %db_path.display(), "Store initialized");
        } else {
            warn!(db_path = %db_path.display(), "Store failed its health check, continuing without enforcement");
        }

        let mut ipc = IpcServer::new(&config.socket_path);
        ipc.start().await?;
        let ipc = Arc::new(ipc);

        let bridge = Arc::new(BridgeHost::new(ipc.clone()));

        let (fire_tx, timer_fires) = mpsc::unbounded_channel();
        let timer = Arc::new(TokioTimer::new(fire_tx));

        let engine = Engine::new(
            store.clone(),
            bridge.clone(),
            bridge.clone(),
            timer,
            EngineOptions {
                redirect_url: config.redirect_url.clone(),
                rule_base_id: config.rule_base_id,
            },
        );

        Ok(Self {
            engine,
            ipc,
            bridge,
            store,
            timer_fires,
        })
    }

    async fn run(self) -> Result<()> {
        let Service {
            mut engine,
            ipc,
            bridge,
            store,
            mut timer_fires,
        } = self;

        let mut ipc_messages = ipc
            .take_message_receiver()
            .await
            .expect("Message receiver should be available");

        // Spawn IPC accept task
        let ipc_accept = ipc.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                warn!(error = %e, "IPC server error");
            }
        });

        // Set up signal handlers
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        // Bring enforcement in line with whatever is persisted before
        // accepting triggers.
        let now = Utc::now();
        broadcast_ended(&ipc, engine.expire_stale_sessions(now));
        engine.handle(Trigger::Startup, now).await;

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                // The expiry timer slot fired
                Some(()) = timer_fires.recv() => {
                    let now = Utc::now();
                    engine.handle(Trigger::TimerFired, now).await;
                    broadcast_ended(&ipc, engine.expire_stale_sessions(now));
                }

                // IPC messages
                Some(msg) = ipc_messages.recv() => {
                    match msg {
                        ServerMessage::Request { client_id, request } => {
                            let request_id = request.request_id;
                            let response =
                                handle_command(&mut engine, &store, &bridge, &ipc, request).await;
                            if let Err(e) = ipc.send_response(&client_id, response).await {
                                debug!(client_id = %client_id, error = %e, "Failed to send response");
                            } else {
                                debug!(client_id = %client_id, request_id, "Request handled");
                            }
                        }
                        ServerMessage::ClientConnected { client_id } => {
                            debug!(client_id = %client_id, "Client registered");
                        }
                        ServerMessage::ClientDisconnected { client_id } => {
                            debug!(client_id = %client_id, "Client gone");
                        }
                    }
                }
            }
        }

        info!("Shutting down wardend");
        ipc.shutdown();
        Ok(())
    }
}

/// Broadcast a SessionEnded event per deactivated session
fn broadcast_ended(ipc: &IpcServer, session_ids: Vec<SessionId>) {
    for session_id in session_ids {
        ipc.broadcast_event(Event::new(EventPayload::SessionEnded { session_id }));
    }
}

fn store_error(request_id: u64, e: StoreError) -> Response {
    warn!(error = %e, "Store operation failed");
    Response::error(
        request_id,
        ErrorInfo::new(ErrorCode::StoreError, e.to_string()),
    )
}

/// Normalize and dedup a user-supplied domain list, keeping input order
fn normalize_list(domains: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for domain in domains {
        let candidate = normalize_domain(domain);
        if !candidate.is_empty() && !normalized.contains(&candidate) {
            normalized.push(candidate);
        }
    }
    normalized
}

async fn handle_command(
    engine: &mut Engine,
    store: &Arc<SqliteStore>,
    bridge: &Arc<BridgeHost>,
    ipc: &Arc<IpcServer>,
    request: Request,
) -> Response {
    let request_id = request.request_id;

    match request.command {
        Command::GetState => {
            let now = Utc::now();
            let sessions = match store.load_sessions() {
                Ok(sessions) => sessions,
                Err(e) => return store_error(request_id, e),
            };
            let blocked = match store.load_blocked_domains() {
                Ok(blocked) => blocked,
                Err(e) => return store_error(request_id, e),
            };

            Response::success(
                request_id,
                ResponsePayload::State(ServiceState {
                    api_version: API_VERSION,
                    enforced_domains: enforced_domains(&sessions, now),
                    next_expiry: next_expiry(&sessions, now),
                    session_count: sessions.len(),
                    blocked_domain_count: blocked.len(),
                }),
            )
        }

        Command::StartSession {
            domains,
            duration_minutes,
        } => {
            let normalized = normalize_list(&domains);
            if normalized.is_empty() {
                return Response::error(
                    request_id,
                    ErrorInfo::new(ErrorCode::InvalidDomain, "No valid domains to block"),
                );
            }
            if duration_minutes == 0 {
                return Response::error(
                    request_id,
                    ErrorInfo::new(
                        ErrorCode::InvalidDuration,
                        "Duration must be at least one minute",
                    ),
                );
            }

            let now = Utc::now();
            let record = SessionRecord {
                id: SessionId::new(),
                domains: normalized.clone(),
                duration_minutes,
                start_time: now,
                end_time: now + chrono::Duration::minutes(duration_minutes as i64),
                is_active: true,
                created_date: now,
            };

            let mut sessions = match store.load_sessions() {
                Ok(sessions) => sessions,
                Err(e) => return store_error(request_id, e),
            };
            sessions.push(record.clone());
            if let Err(e) = store.save_sessions(&sessions) {
                return store_error(request_id, e);
            }

            // The domain list is known; no need to re-resolve it.
            engine
                .handle(
                    Trigger::UpdateRequest {
                        sites: normalized.clone(),
                    },
                    now,
                )
                .await;

            info!(
                session_id = %record.id,
                domain_count = normalized.len(),
                end_time = %record.end_time,
                "Session started"
            );

            ipc.broadcast_event(Event::new(EventPayload::SessionStarted {
                session_id: record.id.clone(),
                domains: record.domains.clone(),
                end_time: record.end_time,
            }));

            Response::success(request_id, ResponsePayload::SessionStarted(record))
        }

        Command::StopSession => {
            let now = Utc::now();
            let mut sessions = match store.load_sessions() {
                Ok(sessions) => sessions,
                Err(e) => return store_error(request_id, e),
            };

            let Some(index) = sessions
                .iter()
                .enumerate()
                .filter(|(_, s)| s.is_active)
                .max_by_key(|(_, s)| s.created_date)
                .map(|(index, _)| index)
            else {
                return Response::error(
                    request_id,
                    ErrorInfo::new(ErrorCode::NoActiveSession, "No active session"),
                );
            };

            sessions[index].is_active = false;
            let session_id = sessions[index].id.clone();
            if let Err(e) = store.save_sessions(&sessions) {
                return store_error(request_id, e);
            }

            engine.handle(Trigger::SessionsChanged, now).await;

            info!(session_id = %session_id, "Session stopped");
            ipc.broadcast_event(Event::new(EventPayload::SessionEnded { session_id }));

            Response::success(
                request_id,
                ResponsePayload::Ack {
                    status: "session stopped".into(),
                },
            )
        }

        Command::ListSessions => match store.load_sessions() {
            Ok(sessions) => Response::success(request_id, ResponsePayload::Sessions(sessions)),
            Err(e) => store_error(request_id, e),
        },

        Command::ListDomains => match store.load_blocked_domains() {
            Ok(domains) => Response::success(request_id, ResponsePayload::Domains(domains)),
            Err(e) => store_error(request_id, e),
        },

        Command::AddDomain { domain } => {
            let normalized = normalize_domain(&domain);
            if normalized.is_empty() {
                return Response::error(
                    request_id,
                    ErrorInfo::new(ErrorCode::InvalidDomain, format!("Invalid domain: {domain}")),
                );
            }

            let mut domains = match store.load_blocked_domains() {
                Ok(domains) => domains,
                Err(e) => return store_error(request_id, e),
            };

            if !domains
                .iter()
                .any(|d| normalize_domain(&d.domain) == normalized)
            {
                domains.push(BlockedDomain {
                    id: uuid::Uuid::new_v4().to_string(),
                    domain: normalized.clone(),
                    added_at: Utc::now(),
                });
                if let Err(e) = store.save_blocked_domains(&domains) {
                    return store_error(request_id, e);
                }
                debug!(domain = %normalized, "Domain added to pick list");
            }

            Response::success(request_id, ResponsePayload::Domains(domains))
        }

        Command::RemoveDomain { domain } => {
            let normalized = normalize_domain(&domain);
            let mut domains = match store.load_blocked_domains() {
                Ok(domains) => domains,
                Err(e) => return store_error(request_id, e),
            };

            let before = domains.len();
            domains.retain(|d| normalize_domain(&d.domain) != normalized);
            if domains.len() == before {
                return Response::error(
                    request_id,
                    ErrorInfo::new(
                        ErrorCode::DomainNotFound,
                        format!("Domain not found: {domain}"),
                    ),
                );
            }

            if let Err(e) = store.save_blocked_domains(&domains) {
                return store_error(request_id, e);
            }

            debug!(domain = %normalized, "Domain removed from pick list");
            Response::success(request_id, ResponsePayload::Domains(domains))
        }

        Command::UpdateRules { sites } => {
            engine
                .handle(Trigger::UpdateRequest { sites }, Utc::now())
                .await;

            Response::success(
                request_id,
                ResponsePayload::Ack {
                    status: "rules updated".into(),
                },
            )
        }

        Command::SubscribeEvents => Response::success(
            request_id,
            ResponsePayload::Ack {
                status: "subscribed".into(),
            },
        ),

        Command::ReportViews { views } => {
            bridge.set_views(views);
            Response::success(
                request_id,
                ResponsePayload::Ack {
                    status: "views recorded".into(),
                },
            )
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.log_level.clone())),
        )
        .init();

    info!("wardend starting");

    let service = Service::new(&args).await?;
    service.run().await
}
