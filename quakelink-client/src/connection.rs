use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use quakelink_rs_protocol::{
    Command, ContentType, FormatSpec, HeaderBlock, Options, RequestFormat, Response, SelectKind,
    SelectParams, SelectScope, SessionOption, StatusLine, capability,
};
use tracing::{debug, error, info, trace, warn};

use crate::error::{ClientError, Result};
use crate::handle::{AbortHandle, SessionSignals};
use crate::transport::{Target, Transport};

/// Configuration for [`Connection`] sessions.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Timeout for the initial TCP/TLS connection. Default: 10 seconds.
    pub connect_timeout: Duration,
    /// Timeout for individual read operations. Default: 30 seconds.
    pub read_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
        }
    }
}

/// Greeting lines scanned for `WELCOME` before the handshake fails.
const MAX_HELLO_LINES: usize = 20;

/// Payload read granularity.
const PAYLOAD_CHUNK: usize = 4096;

enum Wake {
    Line(Result<String>),
    Abort,
    Hangup,
}

/// One QuakeLink session: a single connection to an event query server.
///
/// Operations auto-connect: after `init`, the first query opens the
/// transport, performs the `HELLO` handshake, authenticates if credentials
/// were configured, and resends the session options. After any transport or
/// protocol failure the connection is torn down and the next operation
/// re-establishes it the same way.
///
/// A `Connection` runs one operation at a time. To end a long-running
/// [`select`](Self::select) from another task, take an
/// [`abort_handle`](Self::abort_handle) before starting it.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> quakelink_rs_client::Result<()> {
/// use quakelink_rs_client::Connection;
/// use quakelink_rs_protocol::{FormatSpec, Options, RequestFormat};
///
/// let mut connection = Connection::default();
/// connection.init("ql://localhost", Options::DEFAULTS | Options::KEEPALIVE).await?;
///
/// let format = FormatSpec::new(RequestFormat::Xml, 1);
/// if let Some(event) = connection.get("gfz2024abcd", None, format).await? {
///     println!("{} bytes of {}", event.data.len(), event.format);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Connection {
    config: ClientConfig,
    target: Option<Target>,
    transport: Option<Transport>,
    options: Options,
    server_id: String,
    server_api: u32,
    signals: Arc<SessionSignals>,
}

impl Default for Connection {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl Connection {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            target: None,
            transport: None,
            options: Options::empty(),
            server_id: String::new(),
            server_api: 0,
            signals: Arc::new(SessionSignals::default()),
        }
    }

    /// Store a new target and option set. Tears down any existing
    /// connection; does not connect.
    pub async fn init(&mut self, url: &str, options: Options) -> Result<()> {
        debug!(url, "initializing service");
        self.disconnect().await;
        self.target = None;
        self.set_options(options).await?;

        let target = match Target::parse(url) {
            Ok(target) => target,
            Err(e) => {
                error!(url, error = %e, "invalid connection URL");
                return Err(e);
            }
        };
        debug!(host = %target.host, tls = target.tls, "service initialized");
        self.target = Some(target);
        Ok(())
    }

    /// True while the transport is open.
    pub fn connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Server identification line, valid only while connected.
    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// Server API level, valid only while connected (0 otherwise).
    pub fn server_api(&self) -> u32 {
        self.server_api
    }

    /// The currently configured option mask.
    pub fn options(&self) -> Options {
        self.options
    }

    /// Handle for aborting a running `select` from another task.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle::new(Arc::clone(&self.signals))
    }

    /// True if the connected server supports `version` of `format`.
    /// Version 1 is supported unconditionally.
    pub fn is_supported(&self, format: RequestFormat, version: u32) -> bool {
        capability::is_supported(format, version, self.server_api)
    }

    /// Highest `format` version the connected server supports.
    pub fn maximum_supported_version(&self, format: RequestFormat) -> u32 {
        capability::max_supported_version(format, self.server_api)
    }

    /// Close the transport and clear the learned server identity.
    pub async fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.shutdown().await.ok();
            debug!("connection closed");
        }
        self.server_id.clear();
        self.server_api = 0;
    }

    /// Perform the `HELLO` handshake, opening the transport if needed.
    ///
    /// Scans the greeting for the server identification (a line beginning
    /// `QuakeLink`) and the API level (`API=<n>`), then requires `WELCOME`
    /// followed by a blank line.
    pub async fn hello(&mut self) -> Result<()> {
        self.ensure_transport().await?;
        self.send_command(&Command::Hello).await?;

        let mut server_id = String::new();
        let mut server_api = 0u32;
        for _ in 0..MAX_HELLO_LINES {
            let line = self.read_line().await?;
            if line.starts_with("QuakeLink") {
                server_id = line;
            } else if let Some(value) = line.strip_prefix("API=") {
                server_api = value.trim().parse().unwrap_or(0);
            } else if line == "WELCOME" {
                let blank = self.read_line().await?;
                if !blank.is_empty() {
                    return Err(self.protocol_failure("blank line after WELCOME", &blank).await);
                }
                self.server_id = server_id;
                self.server_api = server_api;
                debug!(
                    server_id = %self.server_id,
                    server_api = self.server_api,
                    "handshake complete"
                );
                return Ok(());
            }
        }
        Err(self
            .protocol_failure("WELCOME", "no WELCOME within greeting")
            .await)
    }

    /// Update the session options. Only changed bits generate traffic, and
    /// only while connected; the full mask is resent on every connect.
    pub async fn set_options(&mut self, options: Options) -> Result<()> {
        if self.options == options {
            return Ok(());
        }
        let changed = self.options ^ options;
        self.options = options;
        if !self.connected() {
            return Ok(());
        }
        self.send_options(changed).await
    }

    /// Fetch one event: the latest revision, or a specific one.
    ///
    /// `Ok(None)` means the event or revision is unknown to the server;
    /// the connection stays up.
    pub async fn get(
        &mut self,
        event_id: &str,
        revision: Option<i32>,
        format: FormatSpec,
    ) -> Result<Option<Response>> {
        self.connect().await?;
        self.check_format(format)?;

        let command = match revision {
            Some(revision) => Command::GetUpdate {
                revision,
                event_id: event_id.to_owned(),
                format,
            },
            None => Command::GetEvent {
                event_id: event_id.to_owned(),
                format,
            },
        };
        self.send_command(&command).await?;
        self.read_get_outcome().await
    }

    /// Fetch the update log of one event.
    ///
    /// `Ok(None)` means the event is unknown to the server.
    pub async fn get_updates(
        &mut self,
        event_id: &str,
        format: FormatSpec,
    ) -> Result<Option<Response>> {
        self.connect().await?;
        self.check_format(format)?;

        let command = Command::GetUpdates {
            event_id: event_id.to_owned(),
            format,
        };
        self.send_command(&command).await?;
        self.read_get_outcome().await
    }

    /// Bounded query over archived events; returns the collected results
    /// once the server signals the end of the result set.
    pub async fn select_archived(&mut self, params: &SelectParams) -> Result<Vec<Response>> {
        self.connect().await?;
        self.check_select(params)?;

        self.send_command(&Command::Select {
            scope: SelectScope::Archived,
            params: params.clone(),
        })
        .await?;

        let mut responses = Vec::new();
        loop {
            let (status, line) = self.read_status().await?;
            match status {
                StatusLine::EodSelectArchived => {
                    let (next, line) = self.read_status().await?;
                    if next != StatusLine::EodSelect {
                        return Err(self.protocol_failure("EOD/SELECT", &line).await);
                    }
                    return Ok(responses);
                }
                StatusLine::DataSelect {
                    kind: SelectKind::Archived,
                    code: 200,
                } => {
                    let response = self.read_response().await?;
                    // XML items are unusable downstream without an origin time
                    if response.content_type == ContentType::Xml && response.timestamp.is_none() {
                        warn!("archived XML item without timestamp, skipping");
                    } else {
                        responses.push(response);
                    }
                }
                _ => return Err(self.protocol_failure("DATA/SELECT/ARCHIVED 200", &line).await),
            }
        }
    }

    /// Combined archived + live query, delivering each result to `sink`.
    ///
    /// With `archived`, the server first replays matching archived events
    /// and then switches to live updates; updates arriving during the
    /// replay are buffered (at most `updated_buffer_size` of them, negative
    /// disables buffering and delivers immediately) and flushed in arrival
    /// order at the phase switch. An update that overflows the buffer is
    /// dropped with a warning.
    ///
    /// The call runs until the server ends the stream with `EOD/SELECT`,
    /// which only happens after [`AbortHandle::abort`] or a server-side
    /// termination. Each response is delivered exactly once.
    pub async fn select<F>(
        &mut self,
        archived: bool,
        params: &SelectParams,
        updated_buffer_size: i32,
        mut sink: F,
    ) -> Result<()>
    where
        F: FnMut(Response),
    {
        self.connect().await?;
        self.check_select(params)?;

        let scope = if archived {
            SelectScope::All
        } else {
            SelectScope::Updated
        };
        self.send_command(&Command::Select {
            scope,
            params: params.clone(),
        })
        .await?;

        // draining: archived replay still in progress
        let mut draining = archived;
        let mut buffered: Vec<Response> = Vec::new();
        loop {
            let (status, line) = self.read_status().await?;
            match status {
                StatusLine::EodSelect if !draining => {
                    info!("EOD/SELECT");
                    return Ok(());
                }
                StatusLine::EodSelectArchived if draining => {
                    draining = false;
                    info!("EOD/SELECT/ARCHIVED");
                    if !buffered.is_empty() {
                        info!(
                            count = buffered.len(),
                            "dispatching updates received in between"
                        );
                        for update in buffered.drain(..) {
                            sink(update);
                        }
                    }
                    info!("waiting for data updates");
                }
                StatusLine::DataSelect { kind, code } => {
                    let mut response = self.read_response().await?;
                    if draining && kind == SelectKind::Archived && code == 200 {
                        sink(response);
                    } else if kind == SelectKind::Updated && code == 200 {
                        response.timestamp = Some(Utc::now());
                        if !draining || updated_buffer_size < 0 {
                            sink(response);
                        } else if buffered.len() < updated_buffer_size as usize {
                            buffered.push(response);
                        } else {
                            warn!(
                                "too many updates while still draining archived events, \
                                 dropping update"
                            );
                        }
                    } else {
                        warn!(status = %line, "unsupported DATA/SELECT mode, discarding");
                    }
                }
                _ => return Err(self.protocol_failure("DATA/SELECT/*", &line).await),
            }
        }
    }

    /// Politely ask the server to end a running stream. The server
    /// eventually answers with `EOD/SELECT` or closes the connection.
    pub async fn abort(&mut self) -> Result<()> {
        if self.connected() {
            self.send_command(&Command::Abort).await
        } else {
            Ok(())
        }
    }

    // -- Private helpers --

    /// Establish the session: transport, handshake, auth, options.
    ///
    /// Already-connected sessions return immediately, which keeps
    /// [`hello`](Self::hello) independently callable without reentry.
    async fn connect(&mut self) -> Result<()> {
        if self.connected() {
            return Ok(());
        }
        self.ensure_transport().await?;
        self.hello().await?;

        let credentials = self
            .target
            .as_ref()
            .filter(|target| target.has_credentials())
            .map(|target| (target.user.clone(), target.pass.clone()));
        match credentials {
            Some((user, pass)) => {
                // fire and forget: the protocol has no auth acknowledgement
                debug!("performing authentication");
                self.send_command(&Command::Auth { user, pass }).await?;
            }
            None => debug!("skipping authentication"),
        }

        self.send_options(Options::all()).await
    }

    async fn ensure_transport(&mut self) -> Result<()> {
        if self.transport.is_some() {
            return Ok(());
        }
        let target = self.target.as_ref().ok_or_else(|| {
            error!("instance not initialized");
            ClientError::NotInitialized
        })?;
        let transport = match Transport::open(
            target,
            self.config.connect_timeout,
            self.config.read_timeout,
        )
        .await
        {
            Ok(transport) => transport,
            Err(e) => {
                error!(host = %target.host, error = %e, "could not connect to service");
                return Err(e);
            }
        };
        self.transport = Some(transport);
        Ok(())
    }

    /// Emit `SET` commands for `changed` bits against the configured mask.
    /// `SET DEFAULTS` always goes out first when configured.
    async fn send_options(&mut self, changed: Options) -> Result<()> {
        if changed.is_empty() {
            return Ok(());
        }
        if !self.connected() {
            return Err(ClientError::Disconnected);
        }
        if self.options.contains(Options::DEFAULTS) {
            self.send_command(&Command::SetDefaults).await?;
        }
        for option in SessionOption::ALL {
            if changed.contains(option.bit()) {
                let enabled = self.options.contains(option.bit());
                self.send_command(&Command::Set { option, enabled }).await?;
            }
        }
        Ok(())
    }

    fn check_format(&self, format: FormatSpec) -> Result<()> {
        if self.is_supported(format.format(), format.version()) {
            return Ok(());
        }
        warn!(%format, server_api = self.server_api, "format version not supported by server");
        Err(ClientError::Unsupported(format!(
            "format {format} requires a higher server API level"
        )))
    }

    fn check_select(&self, params: &SelectParams) -> Result<()> {
        self.check_format(params.format)?;
        if params.uses_extended_clauses() && self.server_api == 0 {
            warn!("ORDER BY, LIMIT and OFFSET require server API support");
            return Err(ClientError::Unsupported(
                "ORDER BY, LIMIT and OFFSET require server API support".into(),
            ));
        }
        Ok(())
    }

    async fn send_command(&mut self, command: &Command) -> Result<()> {
        if command.is_sensitive() {
            debug!("sending request: ***");
        } else {
            debug!(request = %command.to_wire(), "sending request");
        }
        let transport = self.transport.as_mut().ok_or(ClientError::Disconnected)?;
        match transport.send_line(&command.to_wire()).await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!(error = %e, "could not send request, disconnecting");
                self.disconnect().await;
                Err(e)
            }
        }
    }

    async fn read_line(&mut self) -> Result<String> {
        let transport = self.transport.as_mut().ok_or(ClientError::Disconnected)?;
        match transport.read_line().await {
            Ok(line) => Ok(line),
            Err(e) => {
                error!(error = %e, "read failed, disconnecting");
                self.disconnect().await;
                Err(e)
            }
        }
    }

    /// Read the next status line, filtering `ALIVE` keepalives and waiting
    /// on the cancellation signals in parallel.
    async fn read_status(&mut self) -> Result<(StatusLine, String)> {
        loop {
            let signals = Arc::clone(&self.signals);
            let transport = self.transport.as_mut().ok_or(ClientError::Disconnected)?;
            let wake = tokio::select! {
                line = transport.read_line() => Wake::Line(line),
                _ = signals.abort.notified() => Wake::Abort,
                _ = signals.hangup.notified() => Wake::Hangup,
            };
            match wake {
                Wake::Line(Ok(line)) => {
                    let status = StatusLine::parse(&line);
                    if status == StatusLine::Alive {
                        debug!("received ALIVE message");
                        continue;
                    }
                    trace!(%line, "read status line");
                    return Ok((status, line));
                }
                Wake::Line(Err(e)) => {
                    error!(error = %e, "could not read status line, disconnecting");
                    self.disconnect().await;
                    return Err(e);
                }
                Wake::Abort => {
                    debug!("abort requested");
                    self.send_command(&Command::Abort).await?;
                }
                Wake::Hangup => {
                    info!("disconnect requested, closing connection");
                    self.disconnect().await;
                    return Err(ClientError::Disconnected);
                }
            }
        }
    }

    async fn read_get_outcome(&mut self) -> Result<Option<Response>> {
        let (status, line) = self.read_status().await?;
        match status {
            StatusLine::DataGet { code: 200 } => Ok(Some(self.read_response().await?)),
            StatusLine::DataGet { code: 404 } => {
                self.assert_line_break().await?;
                Ok(None)
            }
            _ => Err(self.protocol_failure("DATA/GET 200", &line).await),
        }
    }

    /// Read one header block, its payload, and the mandatory trailing
    /// line break.
    async fn read_response(&mut self) -> Result<Response> {
        let mut header = HeaderBlock::default();
        loop {
            let line = self.read_line().await?;
            if line.is_empty() {
                break;
            }
            match header.apply_line(&line) {
                Ok(true) => {}
                Ok(false) => debug!(%line, "unsupported response header line"),
                Err(e) => {
                    error!(error = %e, "invalid response header, disconnecting");
                    self.disconnect().await;
                    return Err(e.into());
                }
            }
        }

        let mut response = match header.finish() {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "incomplete response header, disconnecting");
                self.disconnect().await;
                return Err(e.into());
            }
        };

        trace!(bytes = response.length, "reading payload");
        let mut data = vec![0u8; response.length];
        let mut read = 0;
        while read < data.len() {
            let end = usize::min(read + PAYLOAD_CHUNK, data.len());
            let transport = self.transport.as_mut().ok_or(ClientError::Disconnected)?;
            if let Err(e) = transport.read_exact(&mut data[read..end]).await {
                error!(error = %e, "could not read response payload, disconnecting");
                self.disconnect().await;
                return Err(e);
            }
            read = end;
        }
        response.data = data;

        self.assert_line_break().await?;
        Ok(response)
    }

    /// Consume the line break that terminates a payload or a 404.
    async fn assert_line_break(&mut self) -> Result<()> {
        let mut byte = self.read_byte().await?;
        if byte == b'\r' {
            byte = self.read_byte().await?;
        }
        if byte == b'\n' {
            return Ok(());
        }
        Err(self
            .protocol_failure("line break", &format!("byte 0x{byte:02x}"))
            .await)
    }

    async fn read_byte(&mut self) -> Result<u8> {
        let transport = self.transport.as_mut().ok_or(ClientError::Disconnected)?;
        match transport.read_byte().await {
            Ok(byte) => Ok(byte),
            Err(e) => {
                error!(error = %e, "could not read line break, disconnecting");
                self.disconnect().await;
                Err(e)
            }
        }
    }

    /// Log an expected-vs-actual protocol violation and force a disconnect.
    async fn protocol_failure(&mut self, expected: &'static str, actual: &str) -> ClientError {
        error!(expected, actual, "unexpected response, disconnecting");
        self.disconnect().await;
        ClientError::UnexpectedResponse {
            expected,
            actual: actual.to_owned(),
        }
    }
}
