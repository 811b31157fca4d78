use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::{Args, Parser, Subcommand};
use frames::{Frame, Status};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Map, Value};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing room; pass --room or set SKETCH_ROOM")]
    MissingRoom,
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("websocket error: {0}")]
    Ws(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("frame decode failed: {0}")]
    Decode(#[from] frames::CodecError),
    #[error("timed out waiting for websocket frame")]
    Timeout,
    #[error("server returned error for {syscall}: {message}")]
    ServerError { syscall: String, message: String },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("input failed: {0}")]
    Input(#[from] io::Error),
    #[error("bad session command: {0}")]
    BadCommand(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for CliError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Ws(Box::new(error))
    }
}

#[derive(Parser, Debug)]
#[command(name = "sketch-cli", about = "Sketch room REST and websocket CLI")]
struct Cli {
    #[arg(long, env = "SKETCH_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[arg(long, env = "SKETCH_ROOM")]
    room: Option<String>,

    #[arg(long, env = "SKETCH_NAME")]
    name: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone)]
struct CliContext {
    base_url: String,
    room: Option<String>,
    name: Option<String>,
}

impl CliContext {
    fn room(&self) -> Result<&str, CliError> {
        self.room.as_deref().ok_or(CliError::MissingRoom)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the server is up.
    Ping,
    /// List live rooms.
    Rooms,
    /// Print the room's shared map.
    Storage,
    /// Clear the room's shared map.
    Reset,
    /// Write one shape.
    Set {
        id: String,
        #[arg(long, help = "Shape JSON")]
        data: String,
    },
    /// Delete one shape.
    Delete { id: String },
    /// Send a reaction at a canvas point.
    React {
        emoji: String,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        x: f64,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        y: f64,
    },
    /// Run line commands on one connection, so `undo`/`redo` see its own edits.
    Session(SessionArgs),
    /// Print every frame the room sends.
    Watch,
    /// Stream JSON-lines shapes into the room.
    Import(ImportArgs),
}

#[derive(Args, Debug)]
struct ImportArgs {
    #[arg(long, default_value = "-", help = "Input file path, or - for stdin")]
    input: String,

    #[arg(long, help = "Send without waiting for each acknowledgement")]
    no_wait: bool,

    #[arg(long, help = "Stop after this many shapes")]
    max_shapes: Option<usize>,

    #[arg(long, default_value_t = 1000)]
    progress_every: usize,
}

#[derive(Args, Debug)]
struct SessionArgs {
    #[arg(long, default_value = "-", help = "Command file path, or - for stdin")]
    input: String,
}

/// One line of a session: `set <id> <json>`, `delete <id>`, `undo`, `redo`,
/// or `react <emoji> <x> <y>`.
#[derive(Debug, PartialEq)]
enum SessionCommand {
    Set { id: String, shape: Value },
    Delete { id: String },
    Undo,
    Redo,
    React { emoji: String, x: f64, y: f64 },
}

impl SessionCommand {
    fn syscall(&self) -> &'static str {
        match self {
            Self::Set { .. } => "storage:set",
            Self::Delete { .. } => "storage:delete",
            Self::Undo => "history:undo",
            Self::Redo => "history:redo",
            Self::React { .. } => "event:broadcast",
        }
    }

    fn payload(&self) -> Value {
        match self {
            Self::Set { id, shape } => set_payload(id, shape.clone()),
            Self::Delete { id } => id_payload(id),
            Self::Undo | Self::Redo => Value::Object(Map::new()),
            Self::React { emoji, x, y } => reaction_payload(emoji, *x, *y),
        }
    }

    /// Events fan out to peers only; everything else gets a terminal reply.
    fn expects_reply(&self) -> bool {
        !matches!(self, Self::React { .. })
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let ctx = CliContext { base_url: cli.base_url, room: cli.room, name: cli.name };

    match cli.command {
        Command::Ping => run_ping(&ctx).await,
        Command::Rooms => {
            let json = api_request(&ctx, reqwest::Method::GET, "/api/rooms").await?;
            print_json(&json)
        }
        Command::Storage => {
            let path = storage_path(ctx.room()?);
            let json = api_request(&ctx, reqwest::Method::GET, &path).await?;
            print_json(&json)
        }
        Command::Reset => {
            let path = storage_path(ctx.room()?);
            let json = api_request(&ctx, reqwest::Method::DELETE, &path).await?;
            print_json(&json)
        }
        Command::Set { id, data } => {
            let shape = serde_json::from_str::<Value>(&data)?;
            ws_call(&ctx, "storage:set", set_payload(&id, shape)).await
        }
        Command::Delete { id } => ws_call(&ctx, "storage:delete", id_payload(&id)).await,
        Command::React { emoji, x, y } => ws_react(&ctx, &emoji, x, y).await,
        Command::Session(args) => ws_session(&ctx, args).await,
        Command::Watch => ws_watch(&ctx).await,
        Command::Import(args) => ws_import(&ctx, args).await,
    }
}

async fn run_ping(cli: &CliContext) -> Result<(), CliError> {
    let client = reqwest::Client::new();
    let url = format!("{}/healthz", cli.base_url.trim_end_matches('/'));
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::ServerError {
            syscall: format!("HTTP {}", status.as_u16()),
            message: "health check failed".to_owned(),
        });
    }
    println!("ok");
    Ok(())
}

// =============================================================================
// WEBSOCKET COMMANDS
// =============================================================================

/// Send one request and print its terminal reply.
async fn ws_call(cli: &CliContext, syscall: &str, data: Value) -> Result<(), CliError> {
    let mut stream = open_room(cli).await?;
    let req = request_frame(syscall, cli.room()?, data);
    send(&mut stream, &req).await?;
    let reply = wait_for_terminal_response(&mut stream, &req.id, syscall).await?;
    print_json(&reply.data)?;
    stream.close(None).await?;
    Ok(())
}

/// Events get no reply; the server fans them out to peers only.
async fn ws_react(cli: &CliContext, emoji: &str, x: f64, y: f64) -> Result<(), CliError> {
    let mut stream = open_room(cli).await?;
    let req = request_frame("event:broadcast", cli.room()?, reaction_payload(emoji, x, y));
    send(&mut stream, &req).await?;
    stream.close(None).await?;
    eprintln!("sent {emoji} at ({x}, {y})");
    Ok(())
}

async fn ws_watch(cli: &CliContext) -> Result<(), CliError> {
    let mut stream = open_room(cli).await?;
    loop {
        let frame = match recv_frame(&mut stream).await {
            Ok(frame) => frame,
            Err(CliError::WsClosed) => return Ok(()),
            Err(error) => return Err(error),
        };
        println!("{}", frames::encode_json(&frame)?);
    }
}

async fn ws_import(cli: &CliContext, args: ImportArgs) -> Result<(), CliError> {
    let mut stream = open_room(cli).await?;
    let room_id = cli.room()?;

    let mut reader = open_input(&args.input)?;

    let mut sent = 0_usize;
    let mut skipped = 0_usize;
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }

        let Some((id, shape)) = parse_shape_line(&line)? else {
            skipped = skipped.saturating_add(1);
            continue;
        };

        let req = request_frame("storage:set", room_id, set_payload(&id, shape));
        send(&mut stream, &req).await?;
        if !args.no_wait {
            wait_for_terminal_response(&mut stream, &req.id, "storage:set").await?;
        }

        sent = sent.saturating_add(1);
        if args.progress_every > 0 && sent.is_multiple_of(args.progress_every) {
            eprintln!("imported {sent} shapes...");
        }
        if args.max_shapes.is_some_and(|limit| sent >= limit) {
            break;
        }
    }

    stream.close(None).await?;
    eprintln!(
        "import complete: room={room_id} imported={sent} skipped={skipped} wait_for_ack={}",
        !args.no_wait
    );
    Ok(())
}

/// History is per connection, so edits and their undo must share one socket.
async fn ws_session(cli: &CliContext, args: SessionArgs) -> Result<(), CliError> {
    let mut stream = open_room(cli).await?;
    let room_id = cli.room()?;
    let mut reader = open_input(&args.input)?;

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }

        let command = match parse_session_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(error) => {
                eprintln!("{error}");
                continue;
            }
        };

        let req = request_frame(command.syscall(), room_id, command.payload());
        send(&mut stream, &req).await?;
        if !command.expects_reply() {
            continue;
        }
        match wait_for_terminal_response(&mut stream, &req.id, command.syscall()).await {
            Ok(reply) => println!("{}", serde_json::to_string(&reply.data)?),
            Err(CliError::ServerError { syscall, message }) => eprintln!("{syscall}: {message}"),
            Err(error) => return Err(error),
        }
    }

    stream.close(None).await?;
    Ok(())
}

fn open_input(path: &str) -> Result<Box<dyn BufRead>, CliError> {
    if path == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    Ok(Box::new(BufReader::new(File::open(path)?)))
}

/// Connect with `?room=` so the server joins on upgrade, then wait for that join.
async fn open_room(cli: &CliContext) -> Result<WsStream, CliError> {
    let url = ws_url(&cli.base_url, cli.room()?, cli.name.as_deref())?;
    let (mut stream, _) = connect_async(url).await?;

    let frame = recv_within(&mut stream, Duration::from_secs(5)).await?;
    if frame.syscall != "session:connected" {
        return Err(CliError::ServerError {
            syscall: frame.syscall,
            message: "expected session:connected".to_owned(),
        });
    }

    loop {
        let frame = recv_within(&mut stream, Duration::from_secs(15)).await?;
        if frame.syscall != "room:join" || !frame.status.is_terminal() {
            continue;
        }
        if let Some(message) = frame.error_message() {
            return Err(CliError::ServerError {
                syscall: frame.syscall.clone(),
                message: message.to_owned(),
            });
        }
        let connection_id = frame
            .data
            .get("connection_id")
            .and_then(Value::as_f64)
            .unwrap_or_default();
        eprintln!("joined {} as connection {connection_id}", cli.room()?);
        return Ok(stream);
    }
}

async fn send(stream: &mut WsStream, frame: &Frame) -> Result<(), CliError> {
    stream.send(Message::Binary(frames::encode_frame(frame).into())).await?;
    Ok(())
}

async fn wait_for_terminal_response(
    stream: &mut WsStream,
    request_id: &str,
    syscall: &str,
) -> Result<Frame, CliError> {
    loop {
        let frame = recv_within(stream, Duration::from_secs(15)).await?;
        if !is_reply_to(&frame, request_id, syscall) {
            continue;
        }
        if frame.status == Status::Error {
            return Err(CliError::ServerError {
                message: frame.error_message().unwrap_or("unknown websocket error").to_owned(),
                syscall: frame.syscall,
            });
        }
        return Ok(frame);
    }
}

fn is_reply_to(frame: &Frame, request_id: &str, syscall: &str) -> bool {
    frame.parent_id.as_deref() == Some(request_id)
        && frame.syscall == syscall
        && frame.status.is_terminal()
}

async fn recv_within(stream: &mut WsStream, timeout: Duration) -> Result<Frame, CliError> {
    tokio::time::timeout(timeout, recv_frame(stream))
        .await
        .map_err(|_| CliError::Timeout)?
}

async fn recv_frame(stream: &mut WsStream) -> Result<Frame, CliError> {
    loop {
        let Some(message) = stream.next().await else {
            return Err(CliError::WsClosed);
        };
        match message? {
            Message::Binary(bytes) => return frames::decode_frame(&bytes).map_err(CliError::from),
            Message::Text(text) => {
                return frames::decode_json(text.as_str()).map_err(CliError::from)
            }
            Message::Close(_) => return Err(CliError::WsClosed),
            _ => {}
        }
    }
}

// =============================================================================
// REST
// =============================================================================

async fn api_request(
    cli: &CliContext,
    method: reqwest::Method,
    path: &str,
) -> Result<Value, CliError> {
    let client = reqwest::Client::new();
    let url = format!("{}{}", cli.base_url.trim_end_matches('/'), path);

    let response = client.request(method, &url).send().await?;
    let status = response.status();
    let value = response.json::<Value>().await.unwrap_or(Value::Null);

    if !status.is_success() {
        return Err(CliError::ServerError {
            syscall: format!("HTTP {}", status.as_u16()),
            message: value.to_string(),
        });
    }

    Ok(value)
}

fn storage_path(room_id: &str) -> String {
    format!("/api/rooms/{room_id}/storage")
}

// =============================================================================
// FRAMES AND PAYLOADS
// =============================================================================

fn ws_url(base_url: &str, room_id: &str, name: Option<&str>) -> Result<String, CliError> {
    let base_url = base_url.trim_end_matches('/');
    let rest = if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else {
        return Err(CliError::InvalidBaseUrl(base_url.to_owned()));
    };

    let mut url = reqwest::Url::parse(&format!("{rest}/api/ws"))
        .map_err(|_| CliError::InvalidBaseUrl(base_url.to_owned()))?;
    url.query_pairs_mut().append_pair("room", room_id);
    if let Some(name) = name {
        url.query_pairs_mut().append_pair("name", name);
    }
    Ok(url.into())
}

fn request_frame(syscall: &str, room_id: &str, data: Value) -> Frame {
    Frame {
        id: Uuid::new_v4().to_string(),
        parent_id: None,
        ts: now_ms(),
        room_id: Some(room_id.to_owned()),
        from: None,
        syscall: syscall.to_owned(),
        status: Status::Request,
        data,
    }
}

fn id_payload(id: &str) -> Value {
    serde_json::json!({ "id": id })
}

fn set_payload(id: &str, shape: Value) -> Value {
    serde_json::json!({ "id": id, "shape": shape })
}

fn reaction_payload(emoji: &str, x: f64, y: f64) -> Value {
    serde_json::json!({ "event": { "x": x, "y": y, "value": emoji } })
}

/// One import line: a shape object keyed by its `objectId`. Blank lines and
/// anything without an id are skipped.
fn parse_shape_line(line: &str) -> Result<Option<(String, Value)>, CliError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value = serde_json::from_str::<Value>(trimmed)?;
    let Some(id) = value.get("objectId").and_then(Value::as_str).filter(|id| !id.is_empty()) else {
        return Ok(None);
    };
    Ok(Some((id.to_owned(), value)))
}

/// Parse one session line. Blank lines and `#` comments yield `None`.
fn parse_session_line(line: &str) -> Result<Option<SessionCommand>, CliError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let (verb, rest) = trimmed.split_once(char::is_whitespace).unwrap_or((trimmed, ""));
    let rest = rest.trim();
    let bad = || CliError::BadCommand(trimmed.to_owned());

    let command = match verb {
        "undo" if rest.is_empty() => SessionCommand::Undo,
        "redo" if rest.is_empty() => SessionCommand::Redo,
        "delete" if !rest.is_empty() && !rest.contains(char::is_whitespace) => {
            SessionCommand::Delete { id: rest.to_owned() }
        }
        "set" => {
            let (id, json) = rest.split_once(char::is_whitespace).ok_or_else(bad)?;
            SessionCommand::Set { id: id.to_owned(), shape: serde_json::from_str(json.trim())? }
        }
        "react" => {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            let [emoji, x, y] = parts.as_slice() else {
                return Err(bad());
            };
            let x = x.parse::<f64>().map_err(|_| bad())?;
            let y = y.parse::<f64>().map_err(|_| bad())?;
            SessionCommand::React { emoji: (*emoji).to_owned(), x, y }
        }
        _ => return Err(bad()),
    };
    Ok(Some(command))
}

fn now_ms() -> i64 {
    let Ok(duration) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(duration.as_millis()).unwrap_or(0)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
