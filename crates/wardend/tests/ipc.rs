//! Socket-level tests: a real Unix socket, the NDJSON protocol, and a
//! responder loop built from the same library pieces the daemon wires up.

use chrono::Utc;
use std::sync::Arc;
use tokio::time::{Duration, timeout};
use warden_api::{
    Command, Event, EventPayload, Request, Response, ResponsePayload, ResponseResult,
    SessionRecord, API_VERSION,
};
use warden_core::{enforced_domains, next_expiry, Engine, EngineOptions, Trigger};
use warden_host_api::{MockEnforcer, MockTimer, MockViews};
use warden_ipc::{IpcClient, IpcServer, ServerMessage};
use warden_store::{SessionStore, SqliteStore};
use warden_util::{normalize_domain, SessionId};

/// Spin up a server plus a responder task handling GetState and StartSession
/// the way the daemon does, and return the socket path.
async fn start_responder(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let socket_path = dir.path().join("wardend-test.sock");

    let mut server = IpcServer::new(&socket_path);
    server.start().await.unwrap();
    let server = Arc::new(server);

    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let mut engine = Engine::new(
        store.clone(),
        Arc::new(MockEnforcer::new()),
        Arc::new(MockViews::new()),
        Arc::new(MockTimer::new()),
        EngineOptions::default(),
    );

    let mut messages = server.take_message_receiver().await.unwrap();
    let accept = server.clone();
    tokio::spawn(async move {
        let _ = accept.run().await;
    });

    let responder = server.clone();
    tokio::spawn(async move {
        while let Some(msg) = messages.recv().await {
            let ServerMessage::Request { client_id, request } = msg else {
                continue;
            };
            let response = respond(&mut engine, &store, &responder, request).await;
            let _ = responder.send_response(&client_id, response).await;
        }
    });

    socket_path
}

async fn respond(
    engine: &mut Engine,
    store: &Arc<SqliteStore>,
    server: &Arc<IpcServer>,
    request: Request,
) -> Response {
    match request.command {
        Command::GetState => {
            let now = Utc::now();
            let sessions = store.load_sessions().unwrap();
            Response::success(
                request.request_id,
                ResponsePayload::State(warden_api::ServiceState {
                    api_version: API_VERSION,
                    enforced_domains: enforced_domains(&sessions, now),
                    next_expiry: next_expiry(&sessions, now),
                    session_count: sessions.len(),
                    blocked_domain_count: 0,
                }),
            )
        }
        Command::StartSession {
            domains,
            duration_minutes,
        } => {
            let now = Utc::now();
            let normalized: Vec<String> =
                domains.iter().map(|d| normalize_domain(d)).collect();
            let record = SessionRecord {
                id: SessionId::new(),
                domains: normalized.clone(),
                duration_minutes,
                start_time: now,
                end_time: now + chrono::Duration::minutes(duration_minutes as i64),
                is_active: true,
                created_date: now,
            };
            let mut sessions = store.load_sessions().unwrap();
            sessions.push(record.clone());
            store.save_sessions(&sessions).unwrap();
            engine
                .handle(Trigger::UpdateRequest { sites: normalized }, now)
                .await;
            server.broadcast_event(Event::new(EventPayload::SessionStarted {
                session_id: record.id.clone(),
                domains: record.domains.clone(),
                end_time: record.end_time,
            }));
            Response::success(request.request_id, ResponsePayload::SessionStarted(record))
        }
        Command::SubscribeEvents => Response::success(
            request.request_id,
            ResponsePayload::Ack {
                status: "subscribed".into(),
            },
        ),
        _ => Response::success(
            request.request_id,
            ResponsePayload::Ack {
                status: "ok".into(),
            },
        ),
    }
}

#[tokio::test]
async fn start_session_then_get_state_over_socket() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = start_responder(&dir).await;

    let mut client = IpcClient::connect(&socket_path).await.unwrap();

    // Fresh daemon enforces nothing
    let response = client.send(Command::GetState).await.unwrap();
    let ResponseResult::Ok(ResponsePayload::State(state)) = response.result else {
        panic!("expected state response");
    };
    assert!(state.enforced_domains.is_empty());
    assert_eq!(state.session_count, 0);

    let response = client
        .send(Command::StartSession {
            domains: vec!["https://www.Reddit.com/".into()],
            duration_minutes: 25,
        })
        .await
        .unwrap();
    let ResponseResult::Ok(ResponsePayload::SessionStarted(record)) = response.result else {
        panic!("expected session-started response");
    };
    assert_eq!(record.domains, ["reddit.com"]);
    assert!(record.is_active);

    let response = client.send(Command::GetState).await.unwrap();
    let ResponseResult::Ok(ResponsePayload::State(state)) = response.result else {
        panic!("expected state response");
    };
    assert_eq!(state.enforced_domains, ["reddit.com"]);
    assert_eq!(state.session_count, 1);
    assert!(state.next_expiry.is_some());
}

#[tokio::test]
async fn subscribed_client_receives_session_events() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = start_responder(&dir).await;

    let subscriber = IpcClient::connect(&socket_path).await.unwrap();
    let mut events = subscriber.subscribe().await.unwrap();

    let mut client = IpcClient::connect(&socket_path).await.unwrap();
    client
        .send(Command::StartSession {
            domains: vec!["x.com".into()],
            duration_minutes: 10,
        })
        .await
        .unwrap();

    let event = timeout(Duration::from_secs(2), events.next())
        .await
        .expect("event should arrive")
        .unwrap();
    assert!(matches!(
        event.payload,
        EventPayload::SessionStarted { domains, .. } if domains == ["x.com"]
    ));
}

#[tokio::test]
async fn unsubscribed_client_gets_responses_but_no_events() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = start_responder(&dir).await;

    let mut client = IpcClient::connect(&socket_path).await.unwrap();
    let response = client
        .send(Command::StartSession {
            domains: vec!["x.com".into()],
            duration_minutes: 10,
        })
        .await
        .unwrap();

    // The response line is the session record, not a broadcast that happened
    // to arrive first.
    assert!(matches!(
        response.result,
        ResponseResult::Ok(ResponsePayload::SessionStarted(_))
    ));
}
