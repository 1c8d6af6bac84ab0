use super::{HandlerTable, PacketStream};
use crate::error::ProtocolError;
use crate::estimator::HeuristicEstimator;
use log::{info, warn};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};

/// Loopback server that handles one client at a time.
///
/// A connection's packets are processed strictly in order until the client closes
/// it or a protocol error ends it; only then is the next client accepted. The
/// estimator is the single piece of state shared between connections.
pub struct HeuristicServer<E> {
    listener: TcpListener,
    estimator: E,
    handlers: HandlerTable<E, TcpStream>,
}

impl<E: HeuristicEstimator> HeuristicServer<E> {
    /// Binds `127.0.0.1:port`. Port 0 picks a free port.
    pub fn bind(port: u16, estimator: E) -> io::Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port))?;
        Ok(Self::from_listener(listener, estimator))
    }

    pub fn from_listener(listener: TcpListener, estimator: E) -> Self {
        Self {
            listener,
            estimator,
            handlers: HandlerTable::new(),
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn into_estimator(self) -> E {
        self.estimator
    }

    /// Serves clients until the process is interrupted.
    pub fn run(&mut self) -> io::Result<()> {
        info!("Listening on {}", self.local_addr()?);
        loop {
            info!("Waiting for client...");
            if let Err(e) = self.serve_next() {
                warn!("Failed to accept client: {}", e);
            }
        }
    }

    /// Accepts one client and handles its packets until the connection ends.
    ///
    /// Returns the error that ended the session; a clean disconnect is
    /// [`ProtocolError::ConnectionClosed`]. The connection is closed on return.
    pub fn serve_next(&mut self) -> io::Result<ProtocolError> {
        let (socket, addr) = self.listener.accept()?;
        info!("Client connected at {}.", addr);

        let mut stream = PacketStream::new(socket);
        let reason = loop {
            if let Err(e) = self.handlers.handle_packet(&mut self.estimator, &mut stream) {
                break e;
            }
        };

        match &reason {
            ProtocolError::ConnectionClosed => {}
            ProtocolError::Range(e) => warn!("Rejected request from {}: {}", addr, e),
            other => warn!("Closing connection to {}: {}", addr, other),
        }
        info!("Client {} disconnected.", addr);
        Ok(reason)
    }
}
