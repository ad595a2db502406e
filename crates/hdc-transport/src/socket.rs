//! Device-side TCP socket-server transport: listens on `socket://host:port`
//! and accepts a single client (§6).

use std::{
    io::ErrorKind,
    net::{TcpListener, TcpStream, ToSocketAddrs},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

use hdc_proto::packetizer::{self, Packetizer};

use crate::{error::TransportError, OnConnectionLost, OnMessage, Transport};

/// Read-timeout used both on the accepted stream and as the packetizer's
/// burst-end signal.
pub const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Parse a `socket://host:port` URL into a socket address string.
///
/// # Errors
///
/// [`TransportError::InvalidUrl`] if `url` does not have the `socket://` scheme.
pub fn parse_socket_url(url: &str) -> Result<String, TransportError> {
    url.strip_prefix("socket://")
        .map(str::to_owned)
        .ok_or_else(|| TransportError::InvalidUrl(url.to_owned()))
}

/// A TCP socket-server transport, accepting one client connection.
pub struct SocketServerTransport {
    url: String,
    bind_addr: String,
    stream: Arc<Mutex<Option<TcpStream>>>,
    accept_thread: Option<thread::JoinHandle<()>>,
    connected: Arc<AtomicBool>,
}

impl SocketServerTransport {
    /// Build a transport that will listen on `socket://host:port`.
    ///
    /// # Errors
    ///
    /// [`TransportError::InvalidUrl`] if `url` is not `socket://host:port`.
    pub fn bind(url: impl Into<String>) -> Result<Self, TransportError> {
        let url = url.into();
        let bind_addr = parse_socket_url(&url)?;
        Ok(Self {
            url,
            bind_addr,
            stream: Arc::new(Mutex::new(None)),
            accept_thread: None,
            connected: Arc::new(AtomicBool::new(false)),
        })
    }
}

impl Transport for SocketServerTransport {
    fn connect(
        &mut self,
        on_message: OnMessage,
        on_connection_lost: OnConnectionLost,
    ) -> Result<(), TransportError> {
        if self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::AlreadyConnected);
        }

        let addr = self
            .bind_addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| TransportError::InvalidUrl(self.url.clone()))?;
        let listener = TcpListener::bind(addr)?;

        let stream_slot = Arc::clone(&self.stream);
        let connected = Arc::clone(&self.connected);
        let url = self.url.clone();

        let handle = thread::spawn(move || {
            let (stream, peer) = match listener.accept() {
                Ok(accepted) => accepted,
                Err(err) => {
                    on_connection_lost(Some(TransportError::Io(err)));
                    return;
                },
            };
            tracing::info!(%url, %peer, "socket transport accepted client");

            if let Err(err) = stream.set_read_timeout(Some(READ_TIMEOUT)) {
                on_connection_lost(Some(TransportError::Io(err)));
                return;
            }

            let mut reader = match stream.try_clone() {
                Ok(clone) => clone,
                Err(err) => {
                    on_connection_lost(Some(TransportError::Io(err)));
                    return;
                },
            };
            *stream_slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(stream);
            connected.store(true, Ordering::SeqCst);

            let mut packetizer = Packetizer::new();
            let mut buf = [0u8; 1024];

            while connected.load(Ordering::SeqCst) {
                use std::io::Read;
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => packetizer.feed(&buf[..n]),
                    Err(err) if err.kind() == ErrorKind::TimedOut || err.kind() == ErrorKind::WouldBlock => {
                        packetizer.feed(&[]);
                    },
                    Err(err) => {
                        connected.store(false, Ordering::SeqCst);
                        on_connection_lost(Some(TransportError::Io(err)));
                        return;
                    },
                }

                for message in packetizer.drain_messages() {
                    on_message(message);
                }
            }

            connected.store(false, Ordering::SeqCst);
            on_connection_lost(None);
        });

        self.accept_thread = Some(handle);
        Ok(())
    }

    fn send_message(&self, message: &[u8]) -> Result<(), TransportError> {
        use std::io::Write;
        let mut guard = self.stream.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let stream = guard.as_mut().ok_or(TransportError::NotConnected)?;
        for packet in packetizer::packetize(message) {
            stream.write_all(&packet)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), TransportError> {
        use std::io::Write;
        let mut guard = self.stream.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let stream = guard.as_mut().ok_or(TransportError::NotConnected)?;
        stream.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(stream) = self.stream.lock().unwrap_or_else(std::sync::PoisonError::into_inner).take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
        if let Some(handle) = self.accept_thread.take() {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_socket_url() {
        assert!(matches!(SocketServerTransport::bind("tcp://127.0.0.1:9"), Err(TransportError::InvalidUrl(_))));
    }

    #[test]
    fn parses_socket_url() {
        assert_eq!(parse_socket_url("socket://127.0.0.1:9999").unwrap(), "127.0.0.1:9999");
    }
}
