//! WebSocket handler: bidirectional frame relay.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID and enters a `select!` loop:
//! - Incoming client frames → decode + dispatch by syscall prefix
//! - Broadcast frames from room peers → forward to client
//!
//! Handler functions are pure business logic. They validate, mutate state,
//! and return an `Outcome`. The dispatch layer owns all outbound concerns:
//! reply to sender and broadcast to peers.
//!
//! Frames travel as binary protobuf. A client that speaks JSON text frames
//! is answered in JSON from its first text frame on.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `session:connected` with `client_id`
//! 2. Optional auto-join when the upgrade URL names a room
//! 3. Client sends frames → dispatch → handler returns Outcome
//! 4. Dispatch applies Outcome (reply / broadcast / both)
//! 5. Close → broadcast `room:part` → cleanup

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::frame::{Data, ErrorCode, Frame, FrameError, Status};
use crate::services;
use crate::services::history::Patch;
use crate::state::AppState;

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer uses this to
/// decide who receives what; handlers never send frames directly.
enum Outcome {
    /// Broadcast done+data to ALL room clients including sender.
    /// Sender's copy carries `parent_id` for correlation.
    Broadcast(Data),
    /// Broadcast data to all room peers EXCLUDING sender. No reply to sender.
    /// Used for presence and reactions (ephemeral, no persistence).
    BroadcastExcludeSender(Data),
    /// Send done+data to sender only.
    Reply(Data),
    /// Send empty done to sender only.
    Done,
    /// Reply to sender with one payload, broadcast different data to peers.
    ReplyAndBroadcast { reply: Data, broadcast: Data },
    /// Nothing goes out.
    Silent,
}

/// Protocol-level failures that aren't owned by a service.
#[derive(Debug, thiserror::Error)]
enum WsError {
    #[error("must join a room first")]
    NotInRoom,
    #[error("{0} required")]
    MissingField(&'static str),
    #[error("unknown syscall: {0}")]
    UnknownSyscall(String),
}

impl ErrorCode for WsError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotInRoom => "E_NOT_IN_ROOM",
            Self::MissingField(_) => "E_MISSING_FIELD",
            Self::UnknownSyscall(_) => "E_UNKNOWN_SYSCALL",
        }
    }
}

/// Encoding the peer speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wire {
    Binary,
    Json,
}

/// Per-connection session state owned by the socket task.
struct Connection {
    client_id: Uuid,
    room_id: Option<String>,
    /// Display name from the upgrade URL, used when `room:join` carries none.
    default_name: Option<String>,
    tx: mpsc::Sender<Frame>,
    wire: Wire,
}

impl Connection {
    fn new(client_id: Uuid, default_name: Option<String>, tx: mpsc::Sender<Frame>) -> Self {
        Self { client_id, room_id: None, default_name, tx, wire: Wire::Binary }
    }
}

// =============================================================================
// UPGRADE
// =============================================================================

/// `GET /api/ws?room=<id>&name=<name>`: upgrade to a frame socket.
pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let room_id = params.get("room").cloned();
    if let Some(room_id) = &room_id {
        if let Err(e) = services::room::validate_room_id(room_id) {
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    }
    let name = params.get("name").cloned();

    ws.on_upgrade(move |socket| run_ws(socket, state, room_id, name))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(
    mut socket: WebSocket,
    state: AppState,
    room_id: Option<String>,
    name: Option<String>,
) {
    let client_id = Uuid::new_v4();

    // Per-connection channel for receiving broadcast frames from peers.
    let capacity = state.config.client_channel_capacity.max(1);
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(capacity);
    let mut conn = Connection::new(client_id, name, client_tx);

    let welcome = Frame::request("session:connected", Data::new())
        .with_data("client_id", client_id.to_string());
    if send_frame(&mut socket, conn.wire, &welcome).await.is_err() {
        return;
    }
    info!(%client_id, "ws: client connected");

    if let Some(room_id) = room_id {
        let join = Frame::request("room:join", Data::new()).with_room_id(room_id);
        for frame in process_frame(&state, &mut conn, join).await {
            if send_frame(&mut socket, conn.wire, &frame).await.is_err() {
                leave_room(&state, &mut conn).await;
                return;
            }
        }
    }

    'session: loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break 'session };
                let Ok(msg) = msg else { break 'session };
                let replies = match msg {
                    Message::Binary(bytes) => {
                        process_inbound_bytes(&state, &mut conn, &bytes).await
                    }
                    Message::Text(text) => {
                        conn.wire = Wire::Json;
                        process_inbound_text(&state, &mut conn, text.as_str()).await
                    }
                    Message::Close(_) => break 'session,
                    _ => continue,
                };
                for frame in replies {
                    if send_frame(&mut socket, conn.wire, &frame).await.is_err() {
                        break 'session;
                    }
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, conn.wire, &frame).await.is_err() {
                    break 'session;
                }
            }
        }
    }

    leave_room(&state, &mut conn).await;
    info!(%client_id, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Decode one binary protobuf frame and return frames for the sender.
async fn process_inbound_bytes(
    state: &AppState,
    conn: &mut Connection,
    bytes: &[u8],
) -> Vec<Frame> {
    let decoded = frames::decode_frame(bytes)
        .map_err(FrameError::from)
        .and_then(Frame::try_from);
    match decoded {
        Ok(req) => process_frame(state, conn, req).await,
        Err(e) => vec![gateway_error(conn.client_id, &e)],
    }
}

/// Decode one JSON text frame and return frames for the sender.
async fn process_inbound_text(state: &AppState, conn: &mut Connection, text: &str) -> Vec<Frame> {
    let decoded = frames::decode_json(text)
        .map_err(FrameError::from)
        .and_then(Frame::try_from);
    match decoded {
        Ok(req) => process_frame(state, conn, req).await,
        Err(e) => vec![gateway_error(conn.client_id, &e)],
    }
}

fn gateway_error(client_id: Uuid, err: &FrameError) -> Frame {
    warn!(%client_id, error = %err, "ws: invalid inbound frame");
    Frame::request("gateway:error", Data::new())
        .with_data("code", err.error_code())
        .with_data("message", err.to_string())
}

/// Dispatch one decoded request and apply its outcome.
async fn process_frame(state: &AppState, conn: &mut Connection, mut req: Frame) -> Vec<Frame> {
    // The server decides who a frame is from.
    req.from = Some(conn.client_id.to_string());

    let prefix = req.prefix().to_owned();
    let is_ephemeral = matches!(prefix.as_str(), "presence" | "event");
    if !is_ephemeral {
        info!(
            client_id = %conn.client_id,
            id = %req.id,
            syscall = %req.syscall,
            status = ?req.status,
            "ws: recv frame"
        );
    }

    let result = match prefix.as_str() {
        "room" => handle_room(state, conn, &req).await,
        "storage" => handle_storage(state, conn.room_id.as_deref(), conn.client_id, &req).await,
        "presence" => {
            Ok(handle_presence(state, conn.room_id.as_deref(), conn.client_id, &req).await)
        }
        "event" => handle_event(state, conn.room_id.as_deref(), conn.client_id, &req).await,
        "history" => handle_history(state, conn.room_id.as_deref(), conn.client_id, &req).await,
        _ => Err(req.error_from(&WsError::UnknownSyscall(req.syscall.clone()))),
    };

    // Apply outcome; the dispatch layer owns all outbound logic.
    let room_id = conn.room_id.clone();
    match result {
        Ok(Outcome::Broadcast(data)) => {
            let sender_frame = req.done_with(data);
            // Peers get a copy without parent_id (they didn't originate the request).
            let mut peer_frame = sender_frame.clone();
            peer_frame.id = Uuid::new_v4();
            peer_frame.parent_id = None;
            peer_frame.from = req.from.clone();
            if let Some(rid) = &room_id {
                services::room::broadcast(state, rid, &peer_frame, Some(conn.client_id)).await;
            }
            vec![sender_frame]
        }
        Ok(Outcome::BroadcastExcludeSender(data)) => {
            if let Some(rid) = &room_id {
                let frame = notification(&req, rid, data);
                services::room::broadcast(state, rid, &frame, Some(conn.client_id)).await;
            }
            vec![]
        }
        Ok(Outcome::Reply(data)) => vec![req.done_with(data)],
        Ok(Outcome::Done) => vec![req.done()],
        Ok(Outcome::ReplyAndBroadcast { reply, broadcast }) => {
            let sender_frame = req.done_with(reply);
            if let Some(rid) = &room_id {
                let frame = notification(&req, rid, broadcast);
                services::room::broadcast(state, rid, &frame, Some(conn.client_id)).await;
            }
            vec![sender_frame]
        }
        Ok(Outcome::Silent) => vec![],
        Err(err_frame) => vec![err_frame],
    }
}

fn notification(req: &Frame, room_id: &str, data: Data) -> Frame {
    let mut frame = Frame::request(&req.syscall, data).with_room_id(room_id);
    frame.from = req.from.clone();
    frame
}

// =============================================================================
// ROOM HANDLERS
// =============================================================================

async fn handle_room(
    state: &AppState,
    conn: &mut Connection,
    req: &Frame,
) -> Result<Outcome, Frame> {
    match req.op() {
        "join" => {
            let Some(room_id) = req
                .room_id
                .clone()
                .or_else(|| req.str_field("room_id").map(str::to_owned))
            else {
                return Err(req.error_from(&WsError::MissingField("room_id")));
            };
            let name = req
                .str_field("name")
                .map(str::to_owned)
                .or_else(|| conn.default_name.clone());

            // Switching rooms parts the current one first.
            leave_room(state, conn).await;

            let snap = services::room::join_room(
                state,
                &room_id,
                conn.client_id,
                name.as_deref(),
                conn.tx.clone(),
            )
            .await
            .map_err(|e| req.error_from(&e))?;
            conn.room_id = Some(room_id.clone());

            let mut reply = Data::new();
            reply.insert("room_id".into(), json!(room_id));
            reply.insert("client_id".into(), json!(conn.client_id));
            reply.insert("connection_id".into(), json!(snap.connection_id));
            reply.insert("color".into(), json!(snap.color));
            reply.insert("name".into(), json!(snap.name));
            reply.insert("objects".into(), services::room::shapes_to_value(snap.objects));
            reply.insert("others".into(), json!(snap.others));

            let broadcast = services::presence::view_of(state, &room_id, conn.client_id)
                .await
                .map(|view| view.to_data())
                .unwrap_or_default();

            Ok(Outcome::ReplyAndBroadcast { reply, broadcast })
        }
        "part" => {
            if conn.room_id.is_none() {
                return Err(req.error_from(&WsError::NotInRoom));
            }
            leave_room(state, conn).await;
            Ok(Outcome::Done)
        }
        op => Err(req.error_from(&WsError::UnknownSyscall(format!("room:{op}")))),
    }
}

/// Tell peers this client left, then drop it from the room.
async fn leave_room(state: &AppState, conn: &mut Connection) {
    let Some(room_id) = conn.room_id.take() else {
        return;
    };

    // Broadcast before part_room, which may evict the room.
    if let Some(connection_id) =
        services::room::connection_id_of(state, &room_id, conn.client_id).await
    {
        let part = Frame::request("room:part", Data::new())
            .with_room_id(room_id.clone())
            .with_data("client_id", conn.client_id.to_string())
            .with_data("connection_id", connection_id);
        services::room::broadcast(state, &room_id, &part, Some(conn.client_id)).await;
    }
    services::room::part_room(state, &room_id, conn.client_id).await;
}

// =============================================================================
// STORAGE HANDLERS
// =============================================================================

async fn handle_storage(
    state: &AppState,
    room_id: Option<&str>,
    client_id: Uuid,
    req: &Frame,
) -> Result<Outcome, Frame> {
    let Some(room_id) = room_id else {
        return Err(req.error_from(&WsError::NotInRoom));
    };

    match req.op() {
        "get" => {
            let objects = services::storage::snapshot(state, room_id)
                .await
                .map_err(|e| req.error_from(&e))?;
            let mut data = Data::new();
            data.insert("objects".into(), services::room::shapes_to_value(objects));
            Ok(Outcome::Reply(data))
        }
        "set" => {
            let Some(key) = req.str_field("id") else {
                return Err(req.error_from(&WsError::MissingField("id")));
            };
            let Some(shape) = req.data.get("shape").cloned() else {
                return Err(req.error_from(&WsError::MissingField("shape")));
            };
            let stored = services::storage::set_shape(state, room_id, client_id, key, shape)
                .await
                .map_err(|e| req.error_from(&e))?;

            let mut data = Data::new();
            data.insert("id".into(), json!(key));
            data.insert("shape".into(), stored);
            Ok(Outcome::Broadcast(data))
        }
        "delete" => {
            let Some(key) = req.str_field("id") else {
                return Err(req.error_from(&WsError::MissingField("id")));
            };
            let removed = services::storage::delete_shape(state, room_id, client_id, key)
                .await
                .map_err(|e| req.error_from(&e))?;
            if removed.is_none() {
                return Ok(Outcome::Done);
            }
            let mut data = Data::new();
            data.insert("id".into(), json!(key));
            Ok(Outcome::Broadcast(data))
        }
        "reset" => {
            let removed = services::storage::reset(state, room_id, client_id)
                .await
                .map_err(|e| req.error_from(&e))?;
            info!(%room_id, %client_id, removed, "storage reset");
            Ok(Outcome::Broadcast(Data::new()))
        }
        op => Err(req.error_from(&WsError::UnknownSyscall(format!("storage:{op}")))),
    }
}

// =============================================================================
// PRESENCE / EVENT HANDLERS
// =============================================================================

async fn handle_presence(
    state: &AppState,
    room_id: Option<&str>,
    client_id: Uuid,
    req: &Frame,
) -> Outcome {
    // Presence before joining is cosmetic noise; drop it.
    let Some(room_id) = room_id else {
        return Outcome::Silent;
    };

    let view = match req.op() {
        "update" => services::presence::update_presence(state, room_id, client_id, &req.data).await,
        "clear" => services::presence::clear_presence(state, room_id, client_id).await,
        _ => None,
    };
    match view {
        Some(view) => Outcome::BroadcastExcludeSender(view.to_data()),
        None => Outcome::Silent,
    }
}

async fn handle_event(
    state: &AppState,
    room_id: Option<&str>,
    client_id: Uuid,
    req: &Frame,
) -> Result<Outcome, Frame> {
    let Some(room_id) = room_id else {
        return Ok(Outcome::Silent);
    };
    if req.op() != "broadcast" {
        return Err(req.error_from(&WsError::UnknownSyscall(req.syscall.clone())));
    }
    let Some(event) = req.data.get("event").filter(|v| v.is_object()).cloned() else {
        return Err(req.error_from(&WsError::MissingField("event")));
    };
    let Some(connection_id) = services::room::connection_id_of(state, room_id, client_id).await
    else {
        return Ok(Outcome::Silent);
    };

    let mut data = Data::new();
    data.insert("client_id".into(), json!(client_id));
    data.insert("connection_id".into(), json!(connection_id));
    data.insert("event".into(), event);
    Ok(Outcome::BroadcastExcludeSender(data))
}

// =============================================================================
// HISTORY HANDLERS
// =============================================================================

async fn handle_history(
    state: &AppState,
    room_id: Option<&str>,
    client_id: Uuid,
    req: &Frame,
) -> Result<Outcome, Frame> {
    let Some(room_id) = room_id else {
        return Err(req.error_from(&WsError::NotInRoom));
    };

    let patch = match req.op() {
        "undo" => services::history::undo(state, room_id, client_id).await,
        "redo" => services::history::redo(state, room_id, client_id).await,
        "pause" => {
            return services::history::pause(state, room_id, client_id)
                .await
                .map(|()| Outcome::Done)
                .map_err(|e| req.error_from(&e));
        }
        "resume" => {
            return services::history::resume(state, room_id, client_id)
                .await
                .map(|()| Outcome::Done)
                .map_err(|e| req.error_from(&e));
        }
        op => return Err(req.error_from(&WsError::UnknownSyscall(format!("history:{op}")))),
    }
    .map_err(|e| req.error_from(&e))?;

    if patch.is_empty() {
        return Ok(Outcome::Reply(patch_to_data(&patch)));
    }
    Ok(Outcome::Broadcast(patch_to_data(&patch)))
}

fn patch_to_data(patch: &Patch) -> Data {
    match serde_json::to_value(patch) {
        Ok(Value::Object(map)) => map.into_iter().collect(),
        _ => Data::new(),
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_frame(socket: &mut WebSocket, wire: Wire, frame: &Frame) -> Result<(), ()> {
    let is_ephemeral =
        frame.syscall.starts_with("presence:") || frame.syscall.starts_with("event:");
    if frame.status == Status::Error {
        let code = frame
            .data
            .get("code")
            .and_then(|v| v.as_str())
            .unwrap_or("-");
        let message = frame
            .data
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("-");
        warn!(
            id = %frame.id,
            syscall = %frame.syscall,
            code,
            message,
            "ws: send frame status=Error"
        );
    } else if !is_ephemeral {
        info!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
    }

    let wire_frame = frames::Frame::from(frame);
    let message = match wire {
        Wire::Binary => Message::Binary(frames::encode_frame(&wire_frame).into()),
        Wire::Json => match frames::encode_json(&wire_frame) {
            Ok(text) => Message::Text(text.into()),
            Err(e) => {
                warn!(error = %e, "ws: failed to serialize frame");
                return Err(());
            }
        },
    };
    socket.send(message).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
