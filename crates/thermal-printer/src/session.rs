//! Transport session: discovery, connection lifecycle and paced delivery.
//!
//! ```text
//! Idle -> Discovering -> Connecting -> Connected -> Transmitting -> Connected
//!                                          |                          \-> Idle (disconnect / link loss)
//!                any step's error -------> Failed(reason)
//! ```
//!
//! At most one job is in flight per session. Concurrent `transmit` calls
//! wait on the link mutex, which hands out access in FIFO order, so jobs
//! are queued rather than interleaved.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::matcher::{DeviceMatcher, matchers_for, select_device};
use crate::options::TransportOptions;
use crate::protocol::job::PrintJob;
use crate::transport::{BleBackend, Channel, DiscoveredDevice, WriteMode, select_channel};
use crate::{PrinterError, Result};

/// Slack on top of the scan window before discovery is abandoned.
const SCAN_GRACE: Duration = Duration::from_secs(2);

/// Observable session state.
#[derive(Debug, Clone)]
pub enum SessionState {
    Idle,
    Discovering,
    Connecting,
    Connected,
    Transmitting,
    Failed(PrinterError),
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected | Self::Transmitting)
    }
}

/// The live connection: device, characteristic and negotiated write mode.
#[derive(Debug, Clone)]
struct ActiveLink {
    device: DiscoveredDevice,
    channel: Channel,
    mode: WriteMode,
}

/// Owns one printer connection and serializes jobs sent over it.
pub struct TransportSession<B: BleBackend> {
    backend: B,
    options: TransportOptions,
    name_patterns: Vec<String>,
    state: watch::Sender<SessionState>,
    link: Mutex<Option<ActiveLink>>,
}

impl<B: BleBackend> TransportSession<B> {
    pub fn new(backend: B, options: TransportOptions) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            backend,
            options,
            name_patterns: Vec::new(),
            state,
            link: Mutex::new(None),
        }
    }

    /// Replace the default printer name fragments used during discovery.
    pub fn with_name_patterns(mut self, patterns: Vec<String>) -> Self {
        self.name_patterns = patterns;
        self
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Current state snapshot.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receive every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    fn set_state(&self, next: SessionState) {
        tracing::debug!(state = ?next, "Session state change");
        self.state.send_replace(next);
    }

    fn fail(&self, err: PrinterError) -> PrinterError {
        tracing::warn!(error = %err, kind = ?err.kind(), "Session step failed");
        self.set_state(SessionState::Failed(err.clone()));
        err
    }

    /// Device the session is connected to, if any.
    pub async fn connected_device(&self) -> Option<DiscoveredDevice> {
        self.link.lock().await.as_ref().map(|l| l.device.clone())
    }

    /// Scan and pick the target printer.
    ///
    /// `identity` (a persisted address/UUID) takes priority over name
    /// fragments. The scan is bounded; no match is
    /// [`PrinterError::DeviceNotFound`].
    pub async fn discover(&self, identity: Option<&str>) -> Result<DiscoveredDevice> {
        self.set_state(SessionState::Discovering);
        self.discover_inner(identity).await.map_err(|e| self.fail(e))
    }

    async fn discover_inner(&self, identity: Option<&str>) -> Result<DiscoveredDevice> {
        let window = self.options.scan_timeout;
        let not_found = PrinterError::DeviceNotFound {
            timeout_secs: window.as_secs(),
        };
        let matchers = matchers_for(identity, &self.name_patterns);
        let identity_matcher = matchers
            .first()
            .filter(|m| matches!(m, DeviceMatcher::Identity(_)))
            .cloned();
        let stop_when = move |d: &DiscoveredDevice| identity_matcher.as_ref().is_some_and(|m| m.matches(d));

        tracing::info!(scan_secs = window.as_secs(), identity = ?identity, "Discovering printer");
        let devices = match tokio::time::timeout(window + SCAN_GRACE, self.backend.scan(window, &stop_when)).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!("Scan did not return in time, stopping it");
                if let Err(e) = self.backend.stop_scan().await {
                    tracing::warn!(error = %e, "Failed to stop abandoned scan");
                }
                return Err(not_found);
            }
        };

        let device = select_device(&devices, &matchers).ok_or(not_found)?;
        tracing::info!(name = %device.name, id = %device.id, seen = devices.len(), "Selected printer");
        Ok(device)
    }

    /// Discover and connect, locating the writable characteristic.
    ///
    /// An existing connection to a matching device is reused; a connection
    /// to a different device is closed first.
    pub async fn connect(&self, identity: Option<&str>) -> Result<DiscoveredDevice> {
        let mut link = self.link.lock().await;

        if let Some(active) = link.as_ref() {
            let same = identity.is_none_or(|id| DeviceMatcher::identity(id).matches(&active.device));
            if same && self.backend.is_connected().await {
                self.set_state(SessionState::Connected);
                return Ok(active.device.clone());
            }
            tracing::info!(id = %active.device.id, "Dropping previous connection");
            *link = None;
            if let Err(e) = self.backend.disconnect().await {
                tracing::warn!(error = %e, "Disconnect of previous link failed");
            }
        }

        let device = self.discover(identity).await?;
        self.set_state(SessionState::Connecting);

        match self.establish(&device).await {
            Ok(active) => {
                tracing::info!(
                    id = %device.id,
                    characteristic = %active.channel.characteristic,
                    mode = ?active.mode,
                    "Connected to printer"
                );
                *link = Some(active);
                self.set_state(SessionState::Connected);
                Ok(device)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn establish(&self, device: &DiscoveredDevice) -> Result<ActiveLink> {
        tracing::info!(id = %device.id, name = %device.name, "Connecting to device");
        let timeout = self.options.connect_timeout;
        let channels = tokio::time::timeout(timeout, self.backend.connect(device))
            .await
            .map_err(|_| PrinterError::ConnectionFailed(format!("timed out after {}s", timeout.as_secs())))??;

        let Some(channel) = select_channel(&channels) else {
            if let Err(e) = self.backend.disconnect().await {
                tracing::warn!(error = %e, "Disconnect after missing characteristic failed");
            }
            return Err(PrinterError::NoWritableChannel(device.id.clone()));
        };

        Ok(ActiveLink {
            device: device.clone(),
            mode: channel.preferred_mode(),
            channel,
        })
    }

    /// Close the link and return to `Idle`.
    pub async fn disconnect(&self) -> Result<()> {
        let mut link = self.link.lock().await;
        let was_connected = link.take().is_some();
        let result = if was_connected {
            tracing::info!("Disconnecting printer");
            self.backend.disconnect().await
        } else {
            Ok(())
        };
        self.set_state(SessionState::Idle);
        result
    }

    /// Clear the link when the OS reports the link dropped.
    pub async fn on_connection_lost(&self, reason: &str) {
        tracing::warn!(reason, "Printer connection lost");
        self.link.lock().await.take();
        self.set_state(SessionState::Idle);
    }

    /// Send a job in paced chunks. Waits behind any job already in flight.
    pub async fn transmit(&self, job: &PrintJob) -> Result<()> {
        self.transmit_with_cancel(job, &CancellationToken::new()).await
    }

    /// [`Self::transmit`], abandoning the job between chunks when `cancel`
    /// fires. A cancelled job closes the link so a later session can
    /// reconnect cleanly.
    pub async fn transmit_with_cancel(&self, job: &PrintJob, cancel: &CancellationToken) -> Result<()> {
        let mut guard = self.link.lock().await;
        let Some(active) = guard.clone() else {
            return Err(self.fail(PrinterError::NotConnected));
        };

        if !self.backend.is_connected().await {
            *guard = None;
            self.set_state(SessionState::Idle);
            return Err(PrinterError::ConnectionLost(format!("{} is no longer connected", active.device.id)));
        }

        self.set_state(SessionState::Transmitting);

        let data = job.to_bytes();
        let total = data.len();
        let chunk_size = self.options.chunk_size;
        let delay = self.options.chunk_delay;
        let chunk_count = total.div_ceil(chunk_size);
        let mut sent = 0usize;

        tracing::debug!(chunk_count, chunk_size, total_bytes = total, mode = ?active.mode, "Writing job in chunks");

        for (i, chunk) in data.chunks(chunk_size).enumerate() {
            if cancel.is_cancelled() {
                return Err(self.abort_cancelled(&mut guard, sent).await);
            }

            if let Err(e) = self.backend.write(&active.channel, chunk, active.mode).await {
                let err = PrinterError::TransmissionInterrupted {
                    sent,
                    total,
                    reason: format!("chunk {}/{}: {}", i + 1, chunk_count, e),
                };
                if !self.backend.is_connected().await {
                    tracing::warn!(id = %active.device.id, "Link dropped during transmission");
                    *guard = None;
                }
                return Err(self.fail(err));
            }
            sent += chunk.len();

            // The printer has no flow control; this pause is what keeps its
            // receive buffer from overrunning.
            tokio::select! {
                _ = cancel.cancelled(), if sent < total => {
                    return Err(self.abort_cancelled(&mut guard, sent).await);
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        tracing::info!(total_bytes = total, chunk_count, "Job transmitted");
        self.set_state(SessionState::Connected);
        Ok(())
    }

    async fn abort_cancelled(&self, link: &mut Option<ActiveLink>, sent: usize) -> PrinterError {
        tracing::info!(sent, "Transmission cancelled, closing link");
        *link = None;
        if let Err(e) = self.backend.disconnect().await {
            tracing::warn!(error = %e, "Disconnect after cancellation failed");
        }
        self.set_state(SessionState::Idle);
        PrinterError::Cancelled { sent }
    }
}

impl<B: BleBackend + 'static> TransportSession<B> {
    /// Follow the backend's disconnect events until `cancel` fires.
    ///
    /// An event for the connected device clears the link and returns the
    /// session to `Idle`; events for other devices are ignored.
    pub fn watch_link(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            let mut events = match session.backend.disconnections().await {
                Ok(events) => events,
                Err(e) => {
                    tracing::warn!(error = %e, "Disconnect events unavailable");
                    return;
                }
            };

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = events.next() => {
                        let Some(id) = event else { break };
                        let ours = session.connected_device().await.is_some_and(|d| d.id == id);
                        if ours {
                            session.on_connection_lost(&format!("{id} disconnected")).await;
                        } else {
                            tracing::debug!(%id, "Ignoring disconnect of another device");
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use tokio::time::Instant;
    use uuid::Uuid;

    use super::*;
    use crate::ErrorKind;
    use crate::transport::{DisconnectEvents, StopWhen};

    #[derive(Debug, Clone)]
    struct WriteRecord {
        at: Instant,
        len: usize,
        first_byte: u8,
        mode: WriteMode,
    }

    #[derive(Default)]
    struct MockState {
        writes: Vec<WriteRecord>,
        disconnects: usize,
        stop_scans: usize,
    }

    /// In-memory backend recording every write.
    #[derive(Clone)]
    struct MockBackend {
        devices: Vec<DiscoveredDevice>,
        channels: Vec<Channel>,
        hang_scan: bool,
        fail_write_at: Option<usize>,
        drop_link_on_failure: bool,
        connected: Arc<AtomicBool>,
        state: Arc<StdMutex<MockState>>,
        link_events: Arc<StdMutex<Option<mpsc::UnboundedReceiver<String>>>>,
    }

    impl MockBackend {
        fn new(devices: Vec<DiscoveredDevice>) -> Self {
            Self {
                devices,
                channels: vec![Channel {
                    service: Uuid::from_u128(0x18f0),
                    characteristic: Uuid::from_u128(0x2af1),
                    write: true,
                    write_without_response: true,
                }],
                hang_scan: false,
                fail_write_at: None,
                drop_link_on_failure: false,
                connected: Arc::new(AtomicBool::new(false)),
                state: Arc::new(StdMutex::new(MockState::default())),
                link_events: Arc::new(StdMutex::new(None)),
            }
        }

        fn with_link_events(self, rx: mpsc::UnboundedReceiver<String>) -> Self {
            *self.link_events.lock().unwrap() = Some(rx);
            self
        }

        fn printer() -> Self {
            Self::new(vec![
                DiscoveredDevice::new("Headphones", "00:00:00:00:00:01"),
                DiscoveredDevice::new("MTP-3", "AA:BB:CC:DD:EE:FF"),
            ])
        }

        fn writes(&self) -> Vec<WriteRecord> {
            self.state.lock().unwrap().writes.clone()
        }
    }

    #[async_trait]
    impl BleBackend for MockBackend {
        async fn scan(&self, window: Duration, stop_when: StopWhen<'_>) -> Result<Vec<DiscoveredDevice>> {
            if self.hang_scan {
                std::future::pending::<()>().await;
            }
            if self.devices.iter().any(|d| stop_when(d)) {
                return Ok(self.devices.clone());
            }
            tokio::time::sleep(window).await;
            Ok(self.devices.clone())
        }

        async fn connect(&self, _device: &DiscoveredDevice) -> Result<Vec<Channel>> {
            self.connected.store(true, Ordering::SeqCst);
            Ok(self.channels.clone())
        }

        async fn write(&self, _channel: &Channel, data: &[u8], mode: WriteMode) -> Result<()> {
            let mut st = self.state.lock().unwrap();
            if Some(st.writes.len()) == self.fail_write_at {
                if self.drop_link_on_failure {
                    self.connected.store(false, Ordering::SeqCst);
                }
                return Err(PrinterError::ConnectionFailed("gatt write failed".into()));
            }
            st.writes.push(WriteRecord {
                at: Instant::now(),
                len: data.len(),
                first_byte: data[0],
                mode,
            });
            Ok(())
        }

        async fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        async fn disconnect(&self) -> Result<()> {
            self.connected.store(false, Ordering::SeqCst);
            self.state.lock().unwrap().disconnects += 1;
            Ok(())
        }

        async fn stop_scan(&self) -> Result<()> {
            self.state.lock().unwrap().stop_scans += 1;
            Ok(())
        }

        async fn disconnections(&self) -> Result<DisconnectEvents> {
            let Some(rx) = self.link_events.lock().unwrap().take() else {
                return Ok(futures::stream::pending::<String>().boxed());
            };
            Ok(futures::stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|id| (id, rx)) }).boxed())
        }
    }

    fn options() -> TransportOptions {
        TransportOptions::new()
            .with_chunk_size(150)
            .with_chunk_delay(Duration::from_millis(20))
            .with_scan_timeout(Duration::from_secs(3))
    }

    fn job_of(len: usize, fill: u8) -> PrintJob {
        PrintJob::from_raw(vec![fill; len])
    }

    #[tokio::test(start_paused = true)]
    async fn thousand_bytes_in_seven_paced_chunks() {
        let backend = MockBackend::printer();
        let session = TransportSession::new(backend.clone(), options());
        session.connect(None).await.unwrap();

        let start = Instant::now();
        session.transmit(&job_of(1000, 0xaa)).await.unwrap();
        let elapsed = start.elapsed();

        let writes = backend.writes();
        let sizes: Vec<usize> = writes.iter().map(|w| w.len).collect();
        assert_eq!(sizes, vec![150, 150, 150, 150, 150, 150, 100]);
        for pair in writes.windows(2) {
            assert!(pair[1].at - pair[0].at >= Duration::from_millis(20));
        }
        // The last chunk is followed by a pause too.
        assert!(elapsed >= Duration::from_millis(140));
        assert!(writes.iter().all(|w| w.mode == WriteMode::WithoutResponse));
        assert!(matches!(session.state(), SessionState::Connected));
    }

    #[tokio::test(start_paused = true)]
    async fn falls_back_to_write_with_response() {
        let mut backend = MockBackend::printer();
        backend.channels[0].write_without_response = false;
        let session = TransportSession::new(backend.clone(), options());
        session.connect(None).await.unwrap();
        session.transmit(&job_of(10, 1)).await.unwrap();
        assert_eq!(backend.writes()[0].mode, WriteMode::WithResponse);
    }

    #[tokio::test(start_paused = true)]
    async fn discovery_without_match_is_device_not_found() {
        let backend = MockBackend::new(vec![DiscoveredDevice::new("Watch", "01")]);
        let session = TransportSession::new(backend, options());
        let err = session.connect(None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceNotFound);
        assert!(matches!(session.state(), SessionState::Failed(PrinterError::DeviceNotFound { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_scan_times_out() {
        let mut backend = MockBackend::printer();
        backend.hang_scan = true;
        let session = TransportSession::new(backend.clone(), options());
        let err = session.discover(None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceNotFound);
        assert_eq!(backend.state.lock().unwrap().stop_scans, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn finished_scan_is_not_stopped_again() {
        let backend = MockBackend::printer();
        let session = TransportSession::new(backend.clone(), options());
        session.discover(None).await.unwrap();
        assert_eq!(backend.state.lock().unwrap().stop_scans, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn identity_hint_wins_and_stops_scan_early() {
        let backend = MockBackend::new(vec![
            DiscoveredDevice::new("POS-58", "11:11:11:11:11:11"),
            DiscoveredDevice::new("Back office", "22:22:22:22:22:22"),
        ]);
        let session = TransportSession::new(backend, options());
        let start = Instant::now();
        let device = session.connect(Some("222222222222")).await.unwrap();
        assert_eq!(device.name, "Back office");
        assert!(start.elapsed() < Duration::from_secs(3));
        assert_eq!(session.connected_device().await.unwrap().id, "22:22:22:22:22:22");
    }

    #[tokio::test(start_paused = true)]
    async fn missing_writable_characteristic() {
        let mut backend = MockBackend::printer();
        backend.channels[0].write = false;
        backend.channels[0].write_without_response = false;
        let session = TransportSession::new(backend.clone(), options());
        let err = session.connect(None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoWritableChannel);
        assert!(!backend.is_connected().await);
    }

    #[tokio::test(start_paused = true)]
    async fn transmit_without_connection() {
        let session = TransportSession::new(MockBackend::printer(), options());
        let err = session.transmit(&job_of(10, 0)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConnected);
    }

    #[tokio::test(start_paused = true)]
    async fn write_failure_reports_bytes_sent() {
        let mut backend = MockBackend::printer();
        backend.fail_write_at = Some(3);
        let session = TransportSession::new(backend.clone(), options());
        session.connect(None).await.unwrap();

        let err = session.transmit(&job_of(1000, 0)).await.unwrap_err();
        match err {
            PrinterError::TransmissionInterrupted { sent, total, ref reason } => {
                assert_eq!(sent, 450);
                assert_eq!(total, 1000);
                assert!(reason.starts_with("chunk 4/7"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_retryable());
        // Link still up: the session keeps it for a retry.
        assert!(session.connected_device().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn link_drop_clears_connection() {
        let mut backend = MockBackend::printer();
        backend.fail_write_at = Some(1);
        backend.drop_link_on_failure = true;
        let session = TransportSession::new(backend, options());
        session.connect(None).await.unwrap();

        let err = session.transmit(&job_of(400, 0)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransmissionInterrupted);
        assert!(session.connected_device().await.is_none());

        let err = session.transmit(&job_of(10, 0)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConnected);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_link_is_connection_lost() {
        let backend = MockBackend::printer();
        let session = TransportSession::new(backend.clone(), options());
        session.connect(None).await.unwrap();
        backend.connected.store(false, Ordering::SeqCst);

        let err = session.transmit(&job_of(10, 0)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionLost);
        assert!(matches!(session.state(), SessionState::Idle));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_jobs_are_not_interleaved() {
        let backend = MockBackend::printer();
        let session = Arc::new(TransportSession::new(backend.clone(), options()));
        session.connect(None).await.unwrap();

        let first = {
            let s = session.clone();
            tokio::spawn(async move { s.transmit(&job_of(600, 1)).await })
        };
        tokio::task::yield_now().await;
        let second = {
            let s = session.clone();
            tokio::spawn(async move { s.transmit(&job_of(600, 2)).await })
        };
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        let order: Vec<u8> = backend.writes().iter().map(|w| w.first_byte).collect();
        assert_eq!(order, vec![1, 1, 1, 1, 2, 2, 2, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_between_chunks_closes_link() {
        let backend = MockBackend::printer();
        let session = Arc::new(TransportSession::new(backend.clone(), options()));
        session.connect(None).await.unwrap();

        let cancel = CancellationToken::new();
        let task = {
            let s = session.clone();
            let c = cancel.clone();
            tokio::spawn(async move { s.transmit_with_cancel(&job_of(1000, 0), &c).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let err = task.await.unwrap().unwrap_err();
        match err {
            PrinterError::Cancelled { sent } => assert!(sent > 0 && sent < 1000),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(session.state(), SessionState::Idle));
        assert!(!backend.is_connected().await);
        assert_eq!(backend.state.lock().unwrap().disconnects, 1);

        // A fresh connect works after cancellation.
        session.connect(None).await.unwrap();
        session.transmit(&job_of(10, 0)).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_reuses_live_link() {
        let backend = MockBackend::printer();
        let session = TransportSession::new(backend.clone(), options());
        let a = session.connect(None).await.unwrap();
        let b = session.connect(Some("AA:BB:CC:DD:EE:FF")).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(backend.state.lock().unwrap().disconnects, 0);

        session.disconnect().await.unwrap();
        assert!(matches!(session.state(), SessionState::Idle));
        assert!(session.connected_device().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn connection_lost_notification_returns_to_idle() {
        let session = TransportSession::new(MockBackend::printer(), options());
        session.connect(None).await.unwrap();
        session.on_connection_lost("supervision timeout").await;
        assert!(matches!(session.state(), SessionState::Idle));
        assert!(session.connected_device().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_after_failed_write_reports_connected() {
        let mut backend = MockBackend::printer();
        backend.fail_write_at = Some(0);
        let session = TransportSession::new(backend, options());
        session.connect(None).await.unwrap();

        session.transmit(&job_of(10, 0)).await.unwrap_err();
        assert!(matches!(session.state(), SessionState::Failed(_)));

        session.connect(None).await.unwrap();
        assert!(matches!(session.state(), SessionState::Connected));
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_event_for_printer_clears_link() {
        let (tx, rx) = mpsc::unbounded_channel();
        let backend = MockBackend::printer().with_link_events(rx);
        let session = Arc::new(TransportSession::new(backend, options()));
        session.connect(None).await.unwrap();

        let cancel = CancellationToken::new();
        let watcher = session.watch_link(cancel.clone());

        tx.send("00:00:00:00:00:01".to_string()).unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(session.connected_device().await.is_some());
        assert!(matches!(session.state(), SessionState::Connected));

        tx.send("AA:BB:CC:DD:EE:FF".to_string()).unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(session.connected_device().await.is_none());
        assert!(matches!(session.state(), SessionState::Idle));

        cancel.cancel();
        watcher.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn watcher_without_events_ends_on_cancel() {
        let session = Arc::new(TransportSession::new(MockBackend::printer(), options()));
        let cancel = CancellationToken::new();
        let watcher = session.watch_link(cancel.clone());
        cancel.cancel();
        watcher.await.unwrap();
    }
}
