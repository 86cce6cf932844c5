//! Email summarizer -- handler for `summarize_emails`.
//!
//! Reads the most recent messages of one mailbox folder over IMAP and returns
//! `{"emails": [{From, Subject, Date, Body}, ...]}`.  The connection is raw
//! TLS to port 993; credentials come from environment variables read at call
//! time so they never live in configuration.
//!
//! Protocol handling is split into pure command builders and response
//! parsers (unit tested below) and a small [`ImapSession`] that works over
//! any async byte stream.  Message bodies are decoded by [`crate::mime`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rustls::ClientConfig;
use serde::{Deserialize, Serialize};
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf,
    WriteHalf,
};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, info, warn};

use deskflow_kernel::{ActionHandler, HandlerError, HandlerResult, Parameters, ValidatedParameters};

use crate::error::{AdapterError, Result};
use crate::mime::Part;

/// Default IMAP server.
const DEFAULT_IMAP_HOST: &str = "imap.gmail.com";

/// Default IMAP-over-TLS port.
const DEFAULT_IMAP_PORT: u16 = 993;

/// Timeout for connecting and for each server response.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Largest literal accepted from the server (16 MB).
const MAX_LITERAL_BYTES: usize = 16 * 1024 * 1024;

/// `[email]` configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub imap_host: String,
    pub imap_port: u16,
    pub timeout_secs: u64,
    /// Name of the environment variable holding the login.
    pub user_env: String,
    /// Name of the environment variable holding the password.
    pub password_env: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            imap_host: DEFAULT_IMAP_HOST.to_string(),
            imap_port: DEFAULT_IMAP_PORT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_env: "EMAIL_USER".to_string(),
            password_env: "EMAIL_PASSWORD".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// IMAP command builders (pure functions, testable)
// ---------------------------------------------------------------------------

/// Quote an IMAP string argument.
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Build an IMAP LOGIN command.
pub fn imap_login_command(tag: &str, username: &str, password: &str) -> String {
    format!("{tag} LOGIN {} {}\r\n", quote(username), quote(password))
}

/// Build an IMAP SELECT command.
pub fn imap_select_command(tag: &str, mailbox: &str) -> String {
    format!("{tag} SELECT {}\r\n", quote(mailbox))
}

/// Build an IMAP SEARCH command matching every message.
pub fn imap_search_all_command(tag: &str) -> String {
    format!("{tag} SEARCH ALL\r\n")
}

/// Build a FETCH for the whole message without setting `\Seen`.
pub fn imap_fetch_message_command(tag: &str, sequence_number: u64) -> String {
    format!("{tag} FETCH {sequence_number} (BODY.PEEK[])\r\n")
}

/// Build a STORE that marks a message read.
pub fn imap_store_seen_command(tag: &str, sequence_number: u64) -> String {
    format!("{tag} STORE {sequence_number} +FLAGS (\\Seen)\r\n")
}

/// Build an IMAP LOGOUT command.
pub fn imap_logout_command(tag: &str) -> String {
    format!("{tag} LOGOUT\r\n")
}

// ---------------------------------------------------------------------------
// IMAP response parsing
// ---------------------------------------------------------------------------

/// Completion status of a tagged response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImapStatus {
    Ok,
    No,
    Bad,
}

/// One untagged response line plus the literal that followed it, if any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImapLine {
    pub text: String,
    pub literal: Option<String>,
}

/// Everything the server sent for one command.
#[derive(Debug, Clone, PartialEq)]
pub struct ImapResponse {
    pub untagged: Vec<ImapLine>,
    pub status: ImapStatus,
    /// Text after the status word, e.g. `[AUTHENTICATIONFAILED] Invalid credentials`.
    pub status_text: String,
}

impl ImapResponse {
    pub fn is_ok(&self) -> bool {
        self.status == ImapStatus::Ok
    }
}

/// Parse `"<tag> OK|NO|BAD text"`.  Returns `None` for any other line.
fn parse_tagged_status(line: &str, tag: &str) -> Option<(ImapStatus, String)> {
    let rest = line.strip_prefix(tag)?.strip_prefix(' ')?;
    let (word, text) = rest.split_once(' ').unwrap_or((rest, ""));
    let status = match word.to_ascii_uppercase().as_str() {
        "OK" => ImapStatus::Ok,
        "NO" => ImapStatus::No,
        "BAD" => ImapStatus::Bad,
        _ => return None,
    };
    Some((status, text.trim().to_string()))
}

/// Size of the literal announced at the end of a line (`... {123}`).
fn parse_literal_size(line: &str) -> Option<usize> {
    let inner = line.trim_end().strip_suffix('}')?;
    let open = inner.rfind('{')?;
    inner[open + 1..].parse().ok()
}

/// Parse IMAP SEARCH response lines into sequence numbers.
fn parse_search_results(lines: &[ImapLine]) -> Vec<u64> {
    lines
        .iter()
        .filter_map(|line| line.text.trim().strip_prefix("* SEARCH"))
        .flat_map(|nums| nums.split_whitespace().filter_map(|t| t.parse::<u64>().ok()))
        .collect()
}

/// The last `count` entries of `ids`.
fn most_recent(ids: &[u64], count: usize) -> &[u64] {
    &ids[ids.len().saturating_sub(count)..]
}

/// A summarized message, serialized with the capitalized header names.
/// `Body` is omitted when the message has no text part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmailSummary {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "Subject")]
    pub subject: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Body", skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl EmailSummary {
    /// Summarize a full RFC 5322 message.
    pub fn from_message(raw: &str) -> Self {
        let message = Part::parse(raw);
        let header = |name: &str| message.header(name).unwrap_or_default().to_string();
        Self {
            from: header("from"),
            subject: header("subject"),
            date: header("date"),
            body: message
                .first_text_body()
                .map(|body| body.trim().to_string()),
        }
    }
}

/// Build a summary from the untagged lines of a message FETCH.
fn parse_fetch_summary(lines: &[ImapLine]) -> EmailSummary {
    lines
        .iter()
        .find_map(|line| {
            let text = line.text.to_ascii_uppercase();
            let whole = text.contains("BODY[]") || text.contains("RFC822");
            line.literal.as_deref().filter(|_| whole)
        })
        .map(EmailSummary::from_message)
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// TLS connection helpers
// ---------------------------------------------------------------------------

/// Build a rustls `ClientConfig` using Mozilla's bundled root certificates.
fn tls_client_config() -> Arc<ClientConfig> {
    let root_store = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();
    Arc::new(config)
}

/// Establish a TLS connection to the given host and port.
async fn connect_tls(
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>> {
    let connector = TlsConnector::from(tls_client_config());
    let server_name = rustls::pki_types::ServerName::try_from(host.to_owned()).map_err(|e| {
        AdapterError::Connection {
            host: host.to_string(),
            reason: format!("invalid server name: {e}"),
        }
    })?;

    let addr = format!("{host}:{port}");

    let tcp_stream = tokio::time::timeout(timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| AdapterError::Timeout {
            seconds: timeout.as_secs(),
            reason: format!("TCP connection to {addr} timed out"),
        })?
        .map_err(|e| AdapterError::Connection {
            host: addr.clone(),
            reason: e.to_string(),
        })?;

    let tls_stream = tokio::time::timeout(timeout, connector.connect(server_name, tcp_stream))
        .await
        .map_err(|_| AdapterError::Timeout {
            seconds: timeout.as_secs(),
            reason: format!("TLS handshake with {host} timed out"),
        })?
        .map_err(|e| AdapterError::Connection {
            host: host.to_string(),
            reason: format!("TLS handshake failed: {e}"),
        })?;

    Ok(tls_stream)
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A logged-out IMAP connection over any byte stream.
pub struct ImapSession<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    next_tag: u32,
    timeout: Duration,
}

impl<S: AsyncRead + AsyncWrite + Unpin> ImapSession<S> {
    pub fn new(stream: S, timeout: Duration) -> Self {
        let (read_half, writer) = tokio::io::split(stream);
        Self {
            reader: BufReader::new(read_half),
            writer,
            next_tag: 0,
            timeout,
        }
    }

    /// Consume the server greeting.
    pub async fn greeting(&mut self) -> Result<()> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        let line = self.read_line(deadline).await?;
        if line.starts_with("* OK") || line.starts_with("* PREAUTH") {
            Ok(())
        } else {
            Err(AdapterError::Protocol {
                reason: format!("unexpected greeting: {line}"),
            })
        }
    }

    /// Send one command built from a fresh tag and collect its response.
    pub async fn command(&mut self, build: impl FnOnce(&str) -> String) -> Result<ImapResponse> {
        self.next_tag += 1;
        let tag = format!("A{:03}", self.next_tag);
        let line = build(&tag);
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        self.read_response(&tag).await
    }

    async fn read_line(&mut self, deadline: tokio::time::Instant) -> Result<String> {
        let seconds = self.timeout.as_secs();
        let mut line = String::new();
        let read = tokio::time::timeout_at(deadline, self.reader.read_line(&mut line))
            .await
            .map_err(|_| timed_out(seconds))??;
        if read == 0 {
            return Err(AdapterError::Protocol {
                reason: "connection closed by server".into(),
            });
        }
        let line = line.trim_end_matches(['\r', '\n']).to_string();
        debug!(imap_line = %line, "IMAP response line");
        Ok(line)
    }

    async fn read_response(&mut self, tag: &str) -> Result<ImapResponse> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        let seconds = self.timeout.as_secs();
        let mut untagged = Vec::new();

        loop {
            let text = self.read_line(deadline).await?;
            if let Some((status, status_text)) = parse_tagged_status(&text, tag) {
                return Ok(ImapResponse {
                    untagged,
                    status,
                    status_text,
                });
            }

            let literal = match parse_literal_size(&text) {
                Some(size) if size > MAX_LITERAL_BYTES => {
                    return Err(AdapterError::Protocol {
                        reason: format!("literal of {size} bytes exceeds limit"),
                    });
                }
                Some(size) => {
                    let mut buf = vec![0u8; size];
                    tokio::time::timeout_at(deadline, self.reader.read_exact(&mut buf))
                        .await
                        .map_err(|_| timed_out(seconds))??;
                    Some(String::from_utf8_lossy(&buf).into_owned())
                }
                None => None,
            };
            untagged.push(ImapLine { text, literal });
        }
    }
}

fn timed_out(seconds: u64) -> AdapterError {
    AdapterError::Timeout {
        seconds,
        reason: "IMAP response timed out".into(),
    }
}

// ---------------------------------------------------------------------------
// Summary flow
// ---------------------------------------------------------------------------

/// Login pair read from the environment.
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Validated arguments of one summary request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRequest {
    pub count: usize,
    pub folder: String,
    pub mark_as_read: bool,
}

fn imap_error(err: AdapterError) -> HandlerError {
    HandlerError::declared(format!("IMAP error: {err}"))
}

/// Log in, select the folder, and summarize its last `count` messages.
pub async fn summarize_mailbox<S: AsyncRead + AsyncWrite + Unpin>(
    session: &mut ImapSession<S>,
    credentials: &Credentials,
    request: &SummaryRequest,
) -> HandlerResult {
    session.greeting().await.map_err(imap_error)?;

    let login = session
        .command(|tag| imap_login_command(tag, &credentials.user, &credentials.password))
        .await
        .map_err(imap_error)?;
    if !login.is_ok() {
        return Err(HandlerError::declared(format!(
            "IMAP error: {}",
            login.status_text
        )));
    }

    let folder = &request.folder;
    let select = session
        .command(|tag| imap_select_command(tag, folder))
        .await
        .map_err(imap_error)?;
    if !select.is_ok() {
        return Err(HandlerError::declared(format!(
            "Failed to select folder: {folder}"
        )));
    }

    let search = session
        .command(imap_search_all_command)
        .await
        .map_err(imap_error)?;
    if !search.is_ok() {
        return Err(HandlerError::declared("Failed to search for emails"));
    }
    let ids = parse_search_results(&search.untagged);
    if ids.is_empty() {
        return Err(HandlerError::declared(format!(
            "No emails found in folder: {folder}"
        )));
    }

    let mut summaries = Vec::new();
    for &id in most_recent(&ids, request.count) {
        let fetch = session
            .command(|tag| imap_fetch_message_command(tag, id))
            .await
            .map_err(imap_error)?;
        if !fetch.is_ok() {
            return Err(HandlerError::declared(format!(
                "Failed to fetch email with ID: {id}"
            )));
        }
        summaries.push(parse_fetch_summary(&fetch.untagged));

        if request.mark_as_read {
            let store = session
                .command(|tag| imap_store_seen_command(tag, id))
                .await
                .map_err(imap_error)?;
            if !store.is_ok() {
                warn!(id = id, status = %store.status_text, "failed to mark message read");
            }
        }
    }

    if let Err(e) = session.command(imap_logout_command).await {
        debug!(error = %e, "IMAP logout failed");
    }

    let emails = serde_json::to_value(&summaries)
        .map_err(|e| HandlerError::fault(format!("email summary serialization: {e}")))?;
    let mut payload = Parameters::new();
    payload.insert("emails".into(), emails);
    Ok(payload)
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// Handler for `summarize_emails`.
#[derive(Debug, Clone, Default)]
pub struct EmailSummarizer {
    config: EmailConfig,
}

impl EmailSummarizer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Read the login pair from the configured environment variables.
    fn credentials(&self) -> Result<Credentials> {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        match (read(&self.config.user_env), read(&self.config.password_env)) {
            (Some(user), Some(password)) => Ok(Credentials { user, password }),
            _ => Err(AdapterError::MissingCredentials),
        }
    }
}

#[async_trait]
impl ActionHandler for EmailSummarizer {
    async fn handle(&self, params: ValidatedParameters) -> HandlerResult {
        let count = params.require_i64("email_count")?;
        let request = SummaryRequest {
            count: usize::try_from(count)
                .ok()
                .filter(|c| *c > 0)
                .ok_or_else(|| HandlerError::declared("email_count must be at least 1"))?,
            folder: params.require_str("folder")?.to_string(),
            mark_as_read: params.require_bool("mark_as_read")?,
        };

        let credentials = self.credentials()?;
        let timeout = Duration::from_secs(self.config.timeout_secs);

        info!(
            host = %self.config.imap_host,
            folder = %request.folder,
            count = request.count,
            "summarizing emails"
        );

        let stream = connect_tls(&self.config.imap_host, self.config.imap_port, timeout)
            .await
            .map_err(imap_error)?;
        let mut session = ImapSession::new(stream, timeout);
        summarize_mailbox(&mut session, &credentials, &request).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
