//! Client for the VNDB TCP API.
//!
//! Every message in either direction is a UTF-8 command terminated by `0x04`.
//! The server answers requests strictly in order, so a single task owns the
//! socket and serves queued requests one at a time.

use std::{fmt, io};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_native_tls::{native_tls, TlsConnector};

pub const HOST: &str = "api.vndb.org";
pub const PORT: u16 = 19535;
const TERMINATOR: u8 = 0x04;
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");
const QUEUE_DEPTH: usize = 16;
const READ_CHUNK: usize = 4096;

#[derive(Debug)]
pub enum VndbError {
    Io(io::Error),
    Tls(native_tls::Error),
    Json(serde_json::Error),
    /// The server answered with `error {...}`.
    Api { id: String, msg: String },
    Protocol(String),
    Closed,
}

impl fmt::Display for VndbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "VNDB connection failed: {err}"),
            Self::Tls(err) => write!(f, "VNDB TLS handshake failed: {err}"),
            Self::Json(err) => write!(f, "VNDB sent malformed JSON: {err}"),
            Self::Api { id, msg } => write!(f, "VNDB refused the request ({id}): {msg}"),
            Self::Protocol(msg) => write!(f, "VNDB protocol error: {msg}"),
            Self::Closed => f.write_str("VNDB connection is closed"),
        }
    }
}

impl std::error::Error for VndbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Tls(err) => Some(err),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for VndbError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<native_tls::Error> for VndbError {
    fn from(err: native_tls::Error) -> Self {
        Self::Tls(err)
    }
}

impl From<serde_json::Error> for VndbError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

/// Splits a byte stream into `0x04`-terminated frames.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Returns the next complete frame without its terminator.
    pub fn next_frame(&mut self) -> Option<Result<String, VndbError>> {
        let end = self.buffer.iter().position(|&byte| byte == TERMINATOR)?;
        let mut frame: Vec<u8> = self.buffer.drain(..=end).collect();
        frame.pop();
        Some(String::from_utf8(frame).map_err(|err| VndbError::Protocol(format!("frame is not UTF-8: {err}"))))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiError {
    pub id: String,
    #[serde(default)]
    pub msg: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ok,
    Results(Value),
    DbStats(Value),
    Error(ApiError),
}

impl Reply {
    pub fn parse(frame: &str) -> Result<Self, VndbError> {
        let (name, body) = frame.split_once(' ').unwrap_or((frame, ""));
        match name.trim() {
            "ok" => Ok(Self::Ok),
            "results" => Ok(Self::Results(serde_json::from_str(body)?)),
            "dbstats" => Ok(Self::DbStats(serde_json::from_str(body)?)),
            "error" => Ok(Self::Error(serde_json::from_str(body)?)),
            other => Err(VndbError::Protocol(format!("unknown response {other:?}"))),
        }
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct GetOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct GetResults<T> {
    pub num: usize,
    pub more: bool,
    pub items: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DbStats {
    pub users: u64,
    pub threads: u64,
    pub tags: u64,
    pub releases: u64,
    pub producers: u64,
    pub chars: u64,
    pub posts: u64,
    pub vn: u64,
    pub traits: u64,
}

struct Request {
    command: String,
    reply: oneshot::Sender<Result<Reply, VndbError>>,
}

/// Handle to one VNDB connection. Clones share the connection, which closes
/// once every handle is dropped.
#[derive(Clone)]
pub struct Vndb {
    requests: mpsc::Sender<Request>,
}

impl Vndb {
    pub async fn connect(client_name: &str) -> Result<Self, VndbError> {
        let tcp = TcpStream::connect((HOST, PORT)).await?;
        let connector = TlsConnector::from(native_tls::TlsConnector::new()?);
        let stream = connector.connect(HOST, tcp).await?;

        let vndb = Self::from_stream(stream);
        vndb.login(client_name).await?;
        Ok(vndb)
    }

    pub fn from_stream<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (requests, queue) = mpsc::channel(QUEUE_DEPTH);
        tokio::spawn(serve(stream, queue));
        Self { requests }
    }

    async fn request(&self, command: String) -> Result<Reply, VndbError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request { command, reply })
            .await
            .map_err(|_| VndbError::Closed)?;

        match response.await.map_err(|_| VndbError::Closed)?? {
            Reply::Error(err) => Err(VndbError::Api { id: err.id, msg: err.msg }),
            reply => Ok(reply),
        }
    }

    pub async fn login(&self, client_name: &str) -> Result<(), VndbError> {
        let body = json!({ "protocol": 1, "client": client_name, "clientver": CLIENT_VERSION });
        match self.request(format!("login {body}")).await? {
            Reply::Ok => Ok(()),
            other => Err(unexpected("login", &other)),
        }
    }

    pub async fn dbstats(&self) -> Result<DbStats, VndbError> {
        match self.request("dbstats".to_owned()).await? {
            Reply::DbStats(stats) => Ok(serde_json::from_value(stats)?),
            other => Err(unexpected("dbstats", &other)),
        }
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        kind: &str,
        flags: &[&str],
        filter: &str,
        options: Option<&GetOptions>,
    ) -> Result<GetResults<T>, VndbError> {
        let mut command = format!("get {kind} {} {filter}", flags.join(","));
        if let Some(options) = options {
            command.push(' ');
            command.push_str(&serde_json::to_string(options)?);
        }

        match self.request(command).await? {
            Reply::Results(results) => Ok(serde_json::from_value(results)?),
            other => Err(unexpected("get", &other)),
        }
    }
}

fn unexpected(command: &str, reply: &Reply) -> VndbError {
    VndbError::Protocol(format!("unexpected answer to {command}: {reply:?}"))
}

/// Quotes a user string for use inside a filter expression.
pub fn quote(value: &str) -> String {
    Value::String(value.to_owned()).to_string()
}

async fn serve<S>(mut stream: S, mut queue: mpsc::Receiver<Request>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut decoder = FrameDecoder::default();
    while let Some(request) = queue.recv().await {
        let reply = exchange(&mut stream, &mut decoder, &request.command).await;
        let broken = matches!(reply, Err(VndbError::Io(_) | VndbError::Closed));
        if let Err(err) = &reply {
            log::warn!("VNDB request failed: {err}");
        }
        // The caller may have given up waiting.
        let _ = request.reply.send(reply);
        if broken {
            break;
        }
    }
    if let Err(err) = stream.shutdown().await {
        log::debug!("Unable to shut down VNDB connection: {err}");
    }
}

async fn exchange<S>(stream: &mut S, decoder: &mut FrameDecoder, command: &str) -> Result<Reply, VndbError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut message = Vec::with_capacity(command.len() + 1);
    message.extend_from_slice(command.as_bytes());
    message.push(TERMINATOR);
    stream.write_all(&message).await?;
    stream.flush().await?;

    let mut chunk = [0u8; READ_CHUNK];
    loop {
        if let Some(frame) = decoder.next_frame() {
            return Reply::parse(&frame?);
        }
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            return Err(VndbError::Closed);
        }
        decoder.push(&chunk[..read]);
    }
}
