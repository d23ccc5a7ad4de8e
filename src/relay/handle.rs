use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use tokio::{
    net::UdpSocket,
    sync::{broadcast, mpsc, oneshot},
    time::{Duration, Instant},
};
use tracing::debug;

use crate::{
    contact::ContactRecord,
    proto::message::{self, MessageBody},
    types::{CLIENT_TTL_MS, RelaySettings, RelayStatus, SWEEP_INTERVAL_MS},
};

use super::{events::RelayEvent, mapping::AddressMappingTable};

/// Failures surfaced through [`RelayHandle`] calls.
#[derive(Debug)]
pub enum RelayError {
    /// The listen socket could not be bound; fatal to that start attempt.
    Bind(String),
    /// The relay task is gone.
    ChannelClosed,
}

/// Cloneable handle to the relay task.
pub struct RelayHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<RelayEvent>,
}

impl Clone for RelayHandle {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
            events_tx: self.events_tx.clone(),
        }
    }
}

enum Command {
    Start {
        resp: oneshot::Sender<Result<(), RelayError>>,
    },
    Stop {
        resp: oneshot::Sender<()>,
    },
    UpdateSettings {
        settings: RelaySettings,
        resp: oneshot::Sender<Result<(), RelayError>>,
    },
    Inject {
        data: Vec<u8>,
        source: Option<SocketAddr>,
        resp: oneshot::Sender<()>,
    },
    Resend {
        records: Vec<ContactRecord>,
        resp: oneshot::Sender<()>,
    },
    IsRunning {
        resp: oneshot::Sender<RelayStatus>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

/// Spawns the relay task in the stopped state and returns its handle.
///
/// One task owns the socket, the mapping table, and the sweep deadline, so
/// the receive path and the sweep timer are serialized by construction.
pub fn spawn_relay(settings: RelaySettings) -> RelayHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(256);
    let (events_tx, _) = broadcast::channel::<RelayEvent>(1024);

    let events_tx_loop = events_tx.clone();

    tokio::spawn(async move {
        let mut core = RelayCore {
            settings,
            mapping: AddressMappingTable::new(),
            socket: None,
            next_sweep: Instant::now(),
            events_tx: events_tx_loop,
        };
        let mut buf = vec![0u8; 65_535];

        loop {
            match core.socket.clone() {
                Some(socket) => {
                    tokio::select! {
                        cmd = cmd_rx.recv() => {
                            let Some(cmd) = cmd else { break };
                            if handle_command(cmd, &mut core).await {
                                break;
                            }
                        }
                        _ = tokio::time::sleep_until(core.next_sweep) => {
                            core.mapping.sweep(now_ms(), CLIENT_TTL_MS);
                            core.next_sweep = Instant::now()
                                + Duration::from_millis(SWEEP_INTERVAL_MS);
                            debug!(buckets = core.mapping.len(), "mapping sweep");
                        }
                        received = socket.recv_from(&mut buf) => match received {
                            Ok((len, src)) => {
                                core.handle_datagram(&buf[..len], Some(src)).await;
                            }
                            Err(err) => {
                                core.emit(RelayEvent::Error(format!("Socket error: {err}")));
                            }
                        }
                    }
                }
                None => {
                    let Some(cmd) = cmd_rx.recv().await else { break };
                    if handle_command(cmd, &mut core).await {
                        break;
                    }
                }
            }
        }
    });

    RelayHandle { cmd_tx, events_tx }
}

impl RelayHandle {
    /// Subscribes to the relay event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.events_tx.subscribe()
    }

    /// Binds the listen socket and starts receiving and sweeping.
    /// No-op when already running.
    pub async fn start(&self) -> Result<(), RelayError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Start { resp: tx })
            .await
            .map_err(|_| RelayError::ChannelClosed)?;
        rx.await.map_err(|_| RelayError::ChannelClosed)?
    }

    /// Closes the socket, cancels the sweep, and clears the mapping table.
    /// No-op when already stopped; safe to call from any state.
    pub async fn stop(&self) -> Result<(), RelayError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Stop { resp: tx })
            .await
            .map_err(|_| RelayError::ChannelClosed)?;
        rx.await.map_err(|_| RelayError::ChannelClosed)
    }

    /// Applies new settings. Nothing happens unless the listen port or the
    /// forward set materially changed (compared by value); on a material
    /// change a running relay is stopped and restarted.
    pub async fn update_settings(&self, settings: RelaySettings) -> Result<(), RelayError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::UpdateSettings { settings, resp: tx })
            .await
            .map_err(|_| RelayError::ChannelClosed)?;
        rx.await.map_err(|_| RelayError::ChannelClosed)?
    }

    /// Dispatches a datagram as if it had arrived on the socket. A `None`
    /// source marks synthetic injection (manually entered data): the bytes
    /// fan out to every forward but no mapping entry is recorded.
    pub async fn inject(
        &self,
        data: Vec<u8>,
        source: Option<SocketAddr>,
    ) -> Result<(), RelayError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Inject {
                data,
                source,
                resp: tx,
            })
            .await
            .map_err(|_| RelayError::ChannelClosed)?;
        rx.await.map_err(|_| RelayError::ChannelClosed)
    }

    /// Frames each record as a Logged ADIF packet and sends it to every
    /// configured forward. Logged no-op when no forwards are configured.
    pub async fn resend(&self, records: Vec<ContactRecord>) -> Result<(), RelayError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Resend { records, resp: tx })
            .await
            .map_err(|_| RelayError::ChannelClosed)?;
        rx.await.map_err(|_| RelayError::ChannelClosed)
    }

    /// Reports the current lifecycle state.
    pub async fn is_running(&self) -> Result<RelayStatus, RelayError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::IsRunning { resp: tx })
            .await
            .map_err(|_| RelayError::ChannelClosed)?;
        rx.await.map_err(|_| RelayError::ChannelClosed)
    }

    /// Stops the relay and terminates the task.
    pub async fn shutdown(&self) -> Result<(), RelayError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Shutdown { resp: tx })
            .await
            .map_err(|_| RelayError::ChannelClosed)?;
        rx.await.map_err(|_| RelayError::ChannelClosed)
    }
}

struct RelayCore {
    settings: RelaySettings,
    mapping: AddressMappingTable,
    socket: Option<Arc<UdpSocket>>,
    next_sweep: Instant,
    events_tx: broadcast::Sender<RelayEvent>,
}

impl RelayCore {
    fn emit(&self, event: RelayEvent) {
        let _ = self.events_tx.send(event);
    }

    async fn start(&mut self) -> Result<(), RelayError> {
        if self.socket.is_some() {
            return Ok(());
        }

        match UdpSocket::bind((Ipv4Addr::UNSPECIFIED, self.settings.listen_port)).await {
            Ok(socket) => {
                self.socket = Some(Arc::new(socket));
                self.next_sweep = Instant::now() + Duration::from_millis(SWEEP_INTERVAL_MS);
                let forwards = self
                    .settings
                    .forwards
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                self.emit(RelayEvent::Log(format!(
                    "Listening on 0.0.0.0:{}, forwarding to: {forwards}",
                    self.settings.listen_port
                )));
                self.emit(RelayEvent::Status(RelayStatus::Running));
                Ok(())
            }
            Err(err) => {
                self.emit(RelayEvent::Error(format!(
                    "Bind failed on port {}: {err}",
                    self.settings.listen_port
                )));
                self.emit(RelayEvent::Status(RelayStatus::Stopped));
                Err(RelayError::Bind(err.to_string()))
            }
        }
    }

    fn stop(&mut self) {
        if self.socket.is_none() {
            return;
        }
        self.socket = None;
        self.mapping.clear();
        self.emit(RelayEvent::Log("Relay stopped".to_string()));
        self.emit(RelayEvent::Status(RelayStatus::Stopped));
    }

    async fn update_settings(&mut self, settings: RelaySettings) -> Result<(), RelayError> {
        if self.settings.same_as(&settings) {
            return Ok(());
        }
        let was_running = self.socket.is_some();
        if was_running {
            self.stop();
        }
        self.settings = settings;
        if was_running {
            return self.start().await;
        }
        Ok(())
    }

    async fn handle_datagram(&mut self, data: &[u8], source: Option<SocketAddr>) {
        let from_forward = source.filter(|src| self.settings.is_forward(src));

        if let Some(forward) = from_forward {
            // Reply from a forward: route back to every mapped client.
            let clients = self.mapping.lookup_clients(&forward);
            if clients.is_empty() {
                self.emit(RelayEvent::Log(format!(
                    "{forward} -> <no-mapping> (dropped) ({} bytes)",
                    data.len()
                )));
                return;
            }
            for client in &clients {
                if let Err(err) = self.send_to(data, client).await {
                    self.emit(RelayEvent::Error(format!(
                        "Error sending to client {client}: {err}"
                    )));
                }
            }
            let summary = self.decode_and_publish(data);
            self.emit(RelayEvent::Log(format!("{forward} -> {summary}")));
        } else {
            // Client traffic (or synthetic injection): fan out to every
            // forward and refresh the mapping for real sources.
            for forward in self.settings.forwards.clone() {
                if let Err(err) = self.send_to(data, &forward).await {
                    self.emit(RelayEvent::Error(format!(
                        "Error sending to forward {forward}: {err}"
                    )));
                }
                if let Some(src) = source {
                    self.mapping.record_activity(forward, src, now_ms());
                }
            }
            let summary = self.decode_and_publish(data);
            let prefix = match source {
                Some(src) => src.to_string(),
                None => "Manual QSO".to_string(),
            };
            self.emit(RelayEvent::Log(format!("{prefix} -> {summary}")));
        }
    }

    async fn resend(&mut self, records: Vec<ContactRecord>) {
        if self.settings.forwards.is_empty() {
            self.emit(RelayEvent::Log(
                "No forwards configured, resend skipped".to_string(),
            ));
            return;
        }
        for record in &records {
            let packet = message::encode_logged_adif(record);
            self.handle_datagram(&packet, None).await;
        }
    }

    async fn send_to(&self, data: &[u8], dest: &SocketAddr) -> std::io::Result<()> {
        match &self.socket {
            Some(socket) => socket.send_to(data, dest).await.map(|_| ()),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "relay not running",
            )),
        }
    }

    /// Decodes `data` for observability and returns the log-line summary.
    /// Decode failures surface as error events only; forwarding has already
    /// happened by the time this runs.
    fn decode_and_publish(&self, data: &[u8]) -> String {
        let frame = match message::decode(data) {
            Ok(frame) => frame,
            Err(err) => {
                self.emit(RelayEvent::Error(format!("Decode failed: {err:?}")));
                return "Not decoded".to_string();
            }
        };

        self.emit(RelayEvent::Decoded(frame.clone()));

        let mut summary = frame.kind_name().to_string();
        match &frame.body {
            MessageBody::Status(status) => {
                let mhz = status.dial_frequency_hz as f64 / 1_000_000.0;
                summary.push_str(&format!(" Freq: {mhz:.4} MHz"));
                if let Some(mode) = &status.mode {
                    summary.push_str(&format!(" Mode: {mode}"));
                }
                if status.tx_enabled {
                    summary.push_str(" TX Enabled");
                }
                if status.transmitting {
                    summary.push_str(&format!(
                        " Transmitting {}",
                        status.tx_message.as_deref().unwrap_or("")
                    ));
                }
                self.emit(RelayEvent::StatusUpdate(status.clone()));
            }
            MessageBody::Decode(decode) => {
                summary.push_str(&format!(
                    " {} {}",
                    message::hhmmss(decode.time_ms),
                    decode.message.as_deref().unwrap_or("")
                ));
            }
            MessageBody::QsoLogged(qso) => {
                summary.push_str(&format!(
                    " {} {} {} Hz",
                    qso.mode.as_deref().unwrap_or(""),
                    qso.dx_call.as_deref().unwrap_or(""),
                    qso.dial_frequency_hz
                ));
            }
            MessageBody::LoggedAdif(adif) => {
                summary.push_str(&format!(" ADIF: {}", adif.adif.as_deref().unwrap_or("")));
                for contact in &adif.contacts {
                    self.emit(RelayEvent::ContactLogged(contact.clone()));
                }
            }
            MessageBody::Unknown(kind) => {
                summary = format!("Unknown message type: {kind}");
            }
            _ => {}
        }
        summary
    }
}

async fn handle_command(cmd: Command, core: &mut RelayCore) -> bool {
    match cmd {
        Command::Start { resp } => {
            let _ = resp.send(core.start().await);
        }
        Command::Stop { resp } => {
            core.stop();
            let _ = resp.send(());
        }
        Command::UpdateSettings { settings, resp } => {
            let _ = resp.send(core.update_settings(settings).await);
        }
        Command::Inject { data, source, resp } => {
            core.handle_datagram(&data, source).await;
            let _ = resp.send(());
        }
        Command::Resend { records, resp } => {
            core.resend(records).await;
            let _ = resp.send(());
        }
        Command::IsRunning { resp } => {
            let status = if core.socket.is_some() {
                RelayStatus::Running
            } else {
                RelayStatus::Stopped
            };
            let _ = resp.send(status);
        }
        Command::Shutdown { resp } => {
            core.stop();
            let _ = resp.send(());
            return true;
        }
    }

    false
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
