use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use maze_chase::constants::{CELL_SIZE, FRAME_MS};
use maze_chase::engine::Session;
use maze_chase::maze::MazeGrid;
use maze_chase::score_store::ScoreStore;
use maze_chase::server_protocol::{parse_client_message, ParsedClientMessage};
use maze_chase::server_utils::{parse_score_limit, sanitize_name};
use maze_chase::types::SessionConfig;
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tower_http::services::{ServeDir, ServeFile};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type SharedState = Arc<Mutex<ServerState>>;

/// One connected presentation client. Each client owns an isolated
/// single-player session; there is no shared game.
struct ClientContext {
    tx: mpsc::Sender<String>,
    name: Option<String>,
    session: Option<Session>,
    summary_sent: bool,
}

struct ServerState {
    clients: HashMap<String, ClientContext>,
    score_store: ScoreStore,
}

impl ServerState {
    fn new(score_store: ScoreStore) -> Self {
        Self {
            clients: HashMap::new(),
            score_store,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScoreQuery {
    limit: Option<String>,
}

#[tokio::main]
async fn main() {
    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let scores_path = std::env::var("SCORE_DB_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".data/scores.json"));

    let state = Arc::new(Mutex::new(ServerState::new(ScoreStore::new(scores_path))));
    start_tick_loop(state.clone());

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/scores", get(scores_handler))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir() {
        let index_file = static_dir.join("index.html");
        println!(
            "[server] static file root: {}",
            static_dir.to_string_lossy()
        );
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        eprintln!("[server] static file root not found; serving API and /ws only.");
        app
    };

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind server socket");

    println!("[server] listening on :{port}");
    axum::serve(listener, app)
        .await
        .expect("server runtime failed");
}

fn resolve_static_dir() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var("STATIC_DIR") {
        let path = PathBuf::from(raw);
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }

    let candidates = [PathBuf::from("public"), PathBuf::from("../public")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn scores_handler(
    State(state): State<SharedState>,
    Query(query): Query<ScoreQuery>,
) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(
        guard
            .score_store
            .build_response(parse_score_limit(query.limit.as_deref())),
    )
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<String>(256);

    {
        let mut guard = state.lock().await;
        guard.clients.insert(
            client_id.clone(),
            ClientContext {
                tx: tx.clone(),
                name: None,
                session: None,
                summary_sent: false,
            },
        );
    }

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                handle_client_message(state.clone(), &client_id, raw.to_string()).await;
            }
            Message::Binary(raw) => {
                if let Ok(text) = String::from_utf8(raw.to_vec()) {
                    handle_client_message(state.clone(), &client_id, text).await;
                } else {
                    send_error_to_client(&state, &client_id, "invalid utf8 message").await;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    {
        let mut guard = state.lock().await;
        guard.clients.remove(&client_id);
    }
    drop(tx);
    let _ = writer.await;
}

async fn handle_client_message(state: SharedState, client_id: &str, raw: String) {
    let Some(message) = parse_client_message(&raw) else {
        send_error_to_client(&state, client_id, "invalid message").await;
        return;
    };

    match message {
        ParsedClientMessage::Hello { name } => {
            handle_hello(state, client_id, name).await;
        }
        ParsedClientMessage::Ping { t } => {
            let mut guard = state.lock().await;
            send_to_client(&mut guard, client_id, &json!({ "type": "pong", "t": t }));
        }
        ParsedClientMessage::Start => {
            let mut needs_hello = false;
            {
                let mut guard = state.lock().await;
                if let Some(client) = guard.clients.get_mut(client_id) {
                    match client.session.as_mut() {
                        Some(session) => {
                            session.start();
                            client.summary_sent = false;
                        }
                        None => needs_hello = true,
                    }
                }
            }
            if needs_hello {
                send_error_to_client(&state, client_id, "send hello first").await;
            }
        }
        ParsedClientMessage::Pause => {
            let mut guard = state.lock().await;
            if let Some(session) = guard
                .clients
                .get_mut(client_id)
                .and_then(|client| client.session.as_mut())
            {
                session.toggle_pause();
            }
        }
        ParsedClientMessage::Input { dir } => {
            let mut guard = state.lock().await;
            if let Some(session) = guard
                .clients
                .get_mut(client_id)
                .and_then(|client| client.session.as_mut())
            {
                session.request_direction(dir);
            }
        }
    }
}

async fn handle_hello(state: SharedState, client_id: &str, name: String) {
    let name = sanitize_name(&name);
    let seed: u32 = rand::rng().random();
    let session = Session::new(MazeGrid::reference(CELL_SIZE), SessionConfig::default(), seed);

    let init = json!({
        "type": "init",
        "name": name,
        "config": session.config,
        "tiles": session.maze().tile_rows(),
        "collectibles": session.collectible_views(),
    });

    let mut guard = state.lock().await;
    let Some(client) = guard.clients.get_mut(client_id) else {
        return;
    };
    client.name = Some(name.clone());
    client.session = Some(session);
    client.summary_sent = false;
    send_to_client(&mut guard, client_id, &json!({ "type": "welcome", "name": name }));
    send_to_client(&mut guard, client_id, &init);
}

fn start_tick_loop(state: SharedState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_micros((FRAME_MS * 1000.0) as u64));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            tick_sessions(&mut guard);
        }
    });
}

fn tick_sessions(state: &mut ServerState) {
    let client_ids: Vec<String> = state.clients.keys().cloned().collect();
    for client_id in client_ids {
        let Some(client) = state.clients.get_mut(&client_id) else {
            continue;
        };
        let Some(session) = client.session.as_mut() else {
            continue;
        };

        session.step(FRAME_MS);
        let snapshot = session.build_snapshot(true);
        let finished = session.is_over() && !client.summary_sent;
        let summary = finished.then(|| session.build_summary());
        let name = client.name.clone().unwrap_or_else(|| "Player".to_string());
        if finished {
            client.summary_sent = true;
        }

        send_to_client(state, &client_id, &json!({ "type": "state", "snapshot": snapshot }));
        if let Some(summary) = summary {
            state.score_store.record_session(&name, &summary);
            send_to_client(
                state,
                &client_id,
                &json!({ "type": "summary", "summary": summary }),
            );
        }
    }
}

fn send_to_client(state: &mut ServerState, client_id: &str, payload: &Value) {
    let Some(client) = state.clients.get(client_id) else {
        return;
    };
    let text = match serde_json::to_string(payload) {
        Ok(text) => text,
        Err(error) => {
            eprintln!("[server] failed to serialize payload: {error}");
            return;
        }
    };
    // A slow consumer loses frames rather than stalling the tick loop.
    if client.tx.try_send(text).is_err() {
        eprintln!("[server] outbound queue full for {client_id}; dropping frame");
    }
}

fn make_id(prefix: &str) -> String {
    format!("{}_{}", prefix, NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

async fn send_error_to_client(state: &SharedState, client_id: &str, reason: &str) {
    let mut guard = state.lock().await;
    send_to_client(
        &mut guard,
        client_id,
        &json!({ "type": "error", "message": reason }),
    );
}
