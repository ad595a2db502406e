//! Serial (USB virtual COM port) transport: 8-N-1, 115200 baud default,
//! 0.5 s read-timeout used to mark burst-end (§6).

use std::{
    io::ErrorKind,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

use hdc_proto::packetizer::{self, Packetizer};

use crate::{error::TransportError, OnConnectionLost, OnMessage, Transport};

/// Default baud rate used unless overridden with [`SerialTransport::with_baud_rate`].
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Read-timeout used both as the port's configured timeout and as the
/// packetizer's burst-end signal.
pub const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// A serial port transport.
pub struct SerialTransport {
    port_name: String,
    baud_rate: u32,
    url: String,
    port: Arc<Mutex<Option<Box<dyn serialport::SerialPort>>>>,
    receiver_thread: Option<thread::JoinHandle<()>>,
    connected: Arc<AtomicBool>,
}

impl SerialTransport {
    /// Create a transport for `port_name` (e.g. `/dev/ttyUSB0`, `COM3`) at
    /// [`DEFAULT_BAUD_RATE`].
    #[must_use]
    pub fn new(port_name: impl Into<String>) -> Self {
        let port_name = port_name.into();
        let url = format!("serial://{port_name}");
        Self {
            port_name,
            baud_rate: DEFAULT_BAUD_RATE,
            url,
            port: Arc::new(Mutex::new(None)),
            receiver_thread: None,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Override the baud rate before connecting.
    #[must_use]
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }
}

impl Transport for SerialTransport {
    fn connect(
        &mut self,
        on_message: OnMessage,
        on_connection_lost: OnConnectionLost,
    ) -> Result<(), TransportError> {
        if self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::AlreadyConnected);
        }

        let port = serialport::new(&self.port_name, self.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(READ_TIMEOUT)
            .open()?;

        *self.port.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(port);
        self.connected.store(true, Ordering::SeqCst);

        let port = Arc::clone(&self.port);
        let connected = Arc::clone(&self.connected);
        let port_name = self.port_name.clone();

        let handle = thread::spawn(move || {
            let mut packetizer = Packetizer::new();
            let mut buf = [0u8; 1024];

            while connected.load(Ordering::SeqCst) {
                let read_result = {
                    let mut guard = port.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                    guard.as_mut().map(|p| p.read(&mut buf))
                };

                match read_result {
                    Some(Ok(0)) | None => break,
                    Some(Ok(n)) => packetizer.feed(&buf[..n]),
                    Some(Err(err)) if err.kind() == ErrorKind::TimedOut => packetizer.feed(&[]),
                    Some(Err(err)) => {
                        tracing::warn!(port = %port_name, error = %err, "serial transport read failed");
                        connected.store(false, Ordering::SeqCst);
                        on_connection_lost(Some(TransportError::Io(err)));
                        return;
                    },
                }

                for message in packetizer.drain_messages() {
                    on_message(message);
                }
            }

            on_connection_lost(None);
        });

        self.receiver_thread = Some(handle);
        Ok(())
    }

    fn send_message(&self, message: &[u8]) -> Result<(), TransportError> {
        let mut guard = self.port.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let port = guard.as_mut().ok_or(TransportError::NotConnected)?;
        for packet in packetizer::packetize(message) {
            port.write_all(&packet)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), TransportError> {
        let mut guard = self.port.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let port = guard.as_mut().ok_or(TransportError::NotConnected)?;
        port.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);
        self.port.lock().unwrap_or_else(std::sync::PoisonError::into_inner).take();
        if let Some(handle) = self.receiver_thread.take() {
            let _ = handle.join();
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn url(&self) -> &str {
        &self.url
    }
}
