//! The Control Panel façade: multiplexes multiple Buses, exposes a
//! synchronous request/reply API over the asynchronous polling loop via a
//! token-keyed reply-matching registry, and dispatches typed event
//! callbacks. Redesigned per spec §9 away from the source's self-mutating
//! reply-handler closure list.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};

use crate::bus::{run_polling_loop, Bus};
use crate::command::{
    Command, OutputControl, ReaderBuzzerControl, ReaderLedControl, ReaderTextOutput,
};
use crate::config::{BusConfig, DeviceConfig, TransportConfig};
use crate::error::OsdpError;
use crate::reply::{
    DeviceCapabilities, DeviceIdentification, InputStatus, KeypadData, LocalStatus, Nak,
    OutputStatus, RawCardData, ReaderStatus, Reply, ReplyType,
};
use crate::transport::{SerialTransport, TcpClientTransport, TcpListenerTransport, Transport};

/// Opaque Bus identifier, assigned at `start_connection`. A random 128-bit
/// value rather than a `uuid` dependency the teacher doesn't already carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusId(u128);

impl BusId {
    fn new() -> Self {
        BusId(rand::random())
    }
}

/// Handlers a caller can install to observe replies as they arrive,
/// independent of any outstanding synchronous request. Mirrors the
/// `on_*_reply_received` hooks on the reference `ControlPanel`.
#[derive(Default)]
pub struct EventHandlers {
    pub on_nak: Option<Box<dyn Fn(u8, Nak) + Send + Sync>>,
    pub on_local_status_report: Option<Box<dyn Fn(u8, LocalStatus) + Send + Sync>>,
    pub on_input_status_report: Option<Box<dyn Fn(u8, InputStatus) + Send + Sync>>,
    pub on_output_status_report: Option<Box<dyn Fn(u8, OutputStatus) + Send + Sync>>,
    pub on_reader_status_report: Option<Box<dyn Fn(u8, ReaderStatus) + Send + Sync>>,
    pub on_formatted_reader_data: Option<Box<dyn Fn(u8, Vec<u8>) + Send + Sync>>,
    pub on_raw_card_data: Option<Box<dyn Fn(u8, RawCardData) + Send + Sync>>,
    pub on_keypad_data: Option<Box<dyn Fn(u8, KeypadData) + Send + Sync>>,
}

struct PendingRequest {
    /// The Bus this request was issued on. Needed because PD addresses are
    /// only unique within a Bus — two Buses can both have a device at 0x01,
    /// and without this a reply on one Bus could resolve a request issued
    /// on the other.
    bus_id: BusId,
    address: u8,
    token: u64,
    /// Reply types this request's issuing command can be satisfied by.
    /// Needed because a Device's automatic keep-alive POLLs and handshake
    /// steps (§4.3) can produce intervening replies on the same address
    /// while a synchronous request is outstanding; matching on address alone
    /// would let an unrelated Ack resolve the wrong request.
    expected: &'static [ReplyType],
    completion: oneshot::Sender<Reply>,
}

/// Multiplexes any number of Buses behind one synchronous request API.
pub struct ControlPanel {
    buses: Arc<Mutex<HashMap<BusId, Bus>>>,
    pending: Arc<StdMutex<Vec<PendingRequest>>>,
    next_token: AtomicU64,
    request_timeout: Duration,
    handlers: Arc<EventHandlers>,
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::with_handlers(EventHandlers::default())
    }

    pub fn with_handlers(handlers: EventHandlers) -> Self {
        Self::with_config(handlers, crate::config::OsdpConfig::default())
    }

    pub fn with_config(handlers: EventHandlers, config: crate::config::OsdpConfig) -> Self {
        Self {
            buses: Arc::new(Mutex::new(HashMap::new())),
            pending: Arc::new(StdMutex::new(Vec::new())),
            next_token: AtomicU64::new(0),
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            handlers: Arc::new(handlers),
        }
    }

    /// Constructs a Bus over `transport`, starts its polling loop as an
    /// independent task, and returns its id.
    pub async fn start_connection(&self, transport: Box<dyn Transport>) -> BusId {
        let id = BusId::new();
        let bus = Bus::new(id);
        let devices = bus.devices();
        let shutdown = bus.shutdown_flag();

        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_polling_loop(transport, devices, shutdown, reply_tx));

        let pending = self.pending.clone();
        let handlers = self.handlers.clone();
        tokio::spawn(dispatch_replies(id, reply_rx, pending, handlers));

        self.buses.lock().await.insert(id, bus);
        id
    }

    /// Builds the `Transport` named by `config.transport` and starts a Bus
    /// over it, per spec §10.3's `BusConfig`. The Bus's own timing knobs
    /// (`poll_tick_ms` etc.) are informational at this layer today — they
    /// document the defaults actually baked into [`crate::constants`]; a
    /// fully pluggable per-Bus tick/timeout override is open work (see
    /// DESIGN.md).
    pub async fn start_bus(&self, config: &BusConfig) -> BusId {
        let transport: Box<dyn Transport> = match &config.transport {
            TransportConfig::Serial { port, baud_rate } => {
                Box::new(SerialTransport::new(port.clone(), *baud_rate))
            }
            TransportConfig::TcpClient { addr } => Box::new(TcpClientTransport::new(addr.clone())),
            TransportConfig::TcpListener { bind_addr } => {
                Box::new(TcpListenerTransport::new(bind_addr.clone()))
            }
        };
        self.start_connection(transport).await
    }

    pub async fn add_device(&self, bus_id: BusId, address: u8, use_crc: bool, use_scs: bool) {
        if let Some(bus) = self.buses.lock().await.get(&bus_id) {
            bus.add_device(address, use_crc, use_scs).await;
        }
    }

    /// Adds a device using a [`DeviceConfig`] (carries an explicit SCBK
    /// rather than the well-known default).
    pub async fn add_device_from_config(&self, bus_id: BusId, config: &DeviceConfig) {
        if let Some(bus) = self.buses.lock().await.get(&bus_id) {
            bus.add_device_with_scbk(config.address, config.use_crc, config.use_scs, config.scbk)
                .await;
        }
    }

    pub async fn remove_device(&self, bus_id: BusId, address: u8) {
        if let Some(bus) = self.buses.lock().await.get(&bus_id) {
            bus.remove_device(address).await;
        }
    }

    pub async fn is_online(&self, bus_id: BusId, address: u8) -> bool {
        match self.buses.lock().await.get(&bus_id) {
            Some(bus) => bus.is_online(address).await,
            None => false,
        }
    }

    /// Enqueues `command` and awaits the matching reply, failing with
    /// `RequestTimeout` if none arrives within the configured deadline.
    pub async fn send_command(&self, bus_id: BusId, command: Command) -> Result<Reply, OsdpError> {
        let address = command.address();
        let expected = command.expected_reply_types();
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        {
            let buses = self.buses.lock().await;
            buses.get(&bus_id).ok_or(OsdpError::BusNotFound(bus_id))?;
        }

        {
            let mut pending = self.pending.lock().unwrap();
            pending.push(PendingRequest {
                bus_id,
                address,
                token,
                expected,
                completion: tx,
            });
        }

        {
            let buses = self.buses.lock().await;
            let bus = buses.get(&bus_id).ok_or(OsdpError::BusNotFound(bus_id))?;
            bus.send_command(command).await;
        }

        let result = tokio::time::timeout(self.request_timeout, rx).await;
        remove_pending(&self.pending, token);

        match result {
            Ok(Ok(reply)) => Ok(reply),
            _ => Err(OsdpError::RequestTimeout),
        }
    }

    pub async fn id_report(&self, bus_id: BusId, address: u8) -> Result<DeviceIdentification, OsdpError> {
        let reply = self.send_command(bus_id, Command::IdReport { address }).await?;
        DeviceIdentification::parse(&reply.payload)
    }

    pub async fn device_capabilities(
        &self,
        bus_id: BusId,
        address: u8,
    ) -> Result<DeviceCapabilities, OsdpError> {
        let reply = self
            .send_command(bus_id, Command::DeviceCapabilities { address })
            .await?;
        DeviceCapabilities::parse(&reply.payload)
    }

    pub async fn local_status(&self, bus_id: BusId, address: u8) -> Result<LocalStatus, OsdpError> {
        let reply = self
            .send_command(bus_id, Command::LocalStatusReport { address })
            .await?;
        LocalStatus::parse(&reply.payload)
    }

    pub async fn input_status(&self, bus_id: BusId, address: u8) -> Result<InputStatus, OsdpError> {
        let reply = self
            .send_command(bus_id, Command::InputStatusReport { address })
            .await?;
        Ok(InputStatus::parse(&reply.payload))
    }

    pub async fn output_status(&self, bus_id: BusId, address: u8) -> Result<OutputStatus, OsdpError> {
        let reply = self
            .send_command(bus_id, Command::OutputStatusReport { address })
            .await?;
        Ok(OutputStatus::parse(&reply.payload))
    }

    pub async fn reader_status(&self, bus_id: BusId, address: u8) -> Result<ReaderStatus, OsdpError> {
        let reply = self
            .send_command(bus_id, Command::ReaderStatusReport { address })
            .await?;
        Ok(ReaderStatus::parse(&reply.payload))
    }

    pub async fn output_control(
        &self,
        bus_id: BusId,
        address: u8,
        controls: Vec<OutputControl>,
    ) -> Result<bool, OsdpError> {
        let reply = self
            .send_command(bus_id, Command::OutputControlCmd { address, controls })
            .await?;
        Ok(reply.reply_type == ReplyType::Ack || reply.reply_type == ReplyType::OutputStatusReport)
    }

    pub async fn reader_led_control(
        &self,
        bus_id: BusId,
        address: u8,
        controls: Vec<ReaderLedControl>,
    ) -> Result<bool, OsdpError> {
        let reply = self
            .send_command(bus_id, Command::ReaderLedControlCmd { address, controls })
            .await?;
        Ok(reply.reply_type == ReplyType::Ack)
    }

    pub async fn reader_buzzer_control(
        &self,
        bus_id: BusId,
        address: u8,
        control: ReaderBuzzerControl,
    ) -> Result<bool, OsdpError> {
        let reply = self
            .send_command(bus_id, Command::ReaderBuzzerControlCmd { address, control })
            .await?;
        Ok(reply.reply_type == ReplyType::Ack)
    }

    pub async fn reader_text_output(
        &self,
        bus_id: BusId,
        address: u8,
        output: ReaderTextOutput,
    ) -> Result<bool, OsdpError> {
        let reply = self
            .send_command(bus_id, Command::ReaderTextOutputCmd { address, output })
            .await?;
        Ok(reply.reply_type == ReplyType::Ack)
    }

    pub async fn keyset(&self, bus_id: BusId, address: u8, scbk: [u8; 16]) -> Result<bool, OsdpError> {
        let reply = self.send_command(bus_id, Command::KeySet { address, scbk }).await?;
        Ok(reply.reply_type == ReplyType::Ack)
    }

    pub async fn send_custom_command(&self, bus_id: BusId, command: Command) -> Result<Reply, OsdpError> {
        self.send_command(bus_id, command).await
    }

    /// Closes every Bus. Workers exit at their next loop head.
    pub async fn shutdown(&self) {
        let buses = self.buses.lock().await;
        for bus in buses.values() {
            bus.close();
        }
    }
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self::new()
    }
}

fn remove_pending(pending: &Arc<StdMutex<Vec<PendingRequest>>>, token: u64) {
    let mut pending = pending.lock().unwrap();
    pending.retain(|p| p.token != token);
}

/// Drains replies forwarded by one Bus's polling loop: resolves the first
/// matching pending request (by Bus, address, and expected reply type — PD
/// addresses are only unique within a Bus, so the Bus id must be part of the
/// predicate or a reply on one Bus could resolve a request issued on
/// another; a Device's own keep-alive polls and handshake steps can also
/// produce intervening replies on the same address while a request is
/// outstanding, so address alone isn't a safe predicate either; a reply
/// whose command/type doesn't match any registrant is simply not consumed by
/// one), then dispatches typed event hooks regardless of whether a match was
/// found.
async fn dispatch_replies(
    bus_id: BusId,
    mut reply_rx: mpsc::UnboundedReceiver<Reply>,
    pending: Arc<StdMutex<Vec<PendingRequest>>>,
    handlers: Arc<EventHandlers>,
) {
    while let Some(reply) = reply_rx.recv().await {
        let matched = {
            let mut pending = pending.lock().unwrap();
            let position = pending.iter().position(|p| {
                p.bus_id == bus_id
                    && p.address == reply.address
                    && (reply.reply_type == ReplyType::Nak || p.expected.contains(&reply.reply_type))
            });
            position.map(|i| pending.remove(i))
        };

        let reply_for_handlers = reply.clone();
        if let Some(entry) = matched {
            let _ = entry.completion.send(reply);
        }
        dispatch_event(&reply_for_handlers, &handlers);
    }
}

fn dispatch_event(reply: &Reply, handlers: &EventHandlers) {
    match reply.reply_type {
        ReplyType::Nak => {
            if let (Some(cb), Ok(nak)) = (&handlers.on_nak, Nak::parse(&reply.payload)) {
                cb(reply.address, nak);
            }
        }
        ReplyType::LocalStatusReport => {
            if let (Some(cb), Ok(status)) = (
                &handlers.on_local_status_report,
                LocalStatus::parse(&reply.payload),
            ) {
                cb(reply.address, status);
            }
        }
        ReplyType::InputStatusReport => {
            if let Some(cb) = &handlers.on_input_status_report {
                cb(reply.address, InputStatus::parse(&reply.payload));
            }
        }
        ReplyType::OutputStatusReport => {
            if let Some(cb) = &handlers.on_output_status_report {
                cb(reply.address, OutputStatus::parse(&reply.payload));
            }
        }
        ReplyType::ReaderStatusReport => {
            if let Some(cb) = &handlers.on_reader_status_report {
                cb(reply.address, ReaderStatus::parse(&reply.payload));
            }
        }
        ReplyType::FormattedReaderData => {
            if let Some(cb) = &handlers.on_formatted_reader_data {
                cb(reply.address, reply.payload.clone());
            }
        }
        ReplyType::RawReaderData => {
            if let (Some(cb), Ok(data)) = (&handlers.on_raw_card_data, RawCardData::parse(&reply.payload)) {
                cb(reply.address, data);
            }
        }
        ReplyType::KeypadData => {
            if let (Some(cb), Ok(data)) = (&handlers.on_keypad_data, KeypadData::parse(&reply.payload)) {
                cb(reply.address, data);
            }
        }
        _ => {}
    }
}
