use log::{debug, error, info, warn};
use shared::{encode_request, Ack, ChannelError, PlayerState, MAX_DATAGRAM, SUBSCRIBE, UNSUBSCRIBE};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{lookup_host, UdpSocket};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};

/// Payloads buffered between the receive task and the frame loop
const INBOX_CAPACITY: usize = 64;

/// First IPv4 candidate, otherwise the first candidate of any family
///
/// The authority binds IPv4 by default, while `localhost` often resolves to
/// `::1` first.
fn pick_address(candidates: impl IntoIterator<Item = SocketAddr>) -> Option<SocketAddr> {
    let mut fallback = None;
    for addr in candidates {
        if addr.is_ipv4() {
            return Some(addr);
        }
        fallback.get_or_insert(addr);
    }
    fallback
}

async fn resolve(server: &str) -> Result<SocketAddr, ChannelError> {
    pick_address(lookup_host(server).await?).ok_or_else(|| {
        ChannelError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no address for {}", server),
        ))
    })
}

/// Binds an ephemeral local socket of the same family as `server`
async fn bind_for(server: SocketAddr) -> Result<UdpSocket, ChannelError> {
    let local: SocketAddr = if server.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };

    UdpSocket::bind(local)
        .await
        .map_err(|source| ChannelError::Bind {
            addr: local.to_string(),
            source,
        })
}

/// Client end of the reply channel: one request, then one acknowledgment
pub struct Requester {
    socket: UdpSocket,
    timeout: Duration,
}

impl Requester {
    pub async fn connect(server: &str, timeout: Duration) -> Result<Self, ChannelError> {
        let server = resolve(server).await?;
        let socket = bind_for(server).await?;
        socket.connect(server).await?;

        info!("Reply channel ready: {}", server);

        Ok(Self { socket, timeout })
    }

    /// Reports the local player and waits (bounded) for the acknowledgment
    ///
    /// Any acknowledgment other than an explicit rejection completes the call.
    pub async fn send_state(&self, state: &PlayerState) -> Result<Ack, ChannelError> {
        let mut buffer = [0u8; 1024];

        // Acks that arrived after an earlier timeout would otherwise be
        // mistaken for the answer to this request
        while let Ok(len) = self.socket.try_recv(&mut buffer) {
            debug!("Discarding late ack ({} bytes)", len);
        }

        self.socket.send(encode_request(state).as_bytes()).await?;

        let len = match timeout(self.timeout, self.socket.recv(&mut buffer)).await {
            Ok(result) => result?,
            Err(_) => return Err(ChannelError::Timeout(self.timeout)),
        };

        match Ack::parse(String::from_utf8_lossy(&buffer[..len]).as_ref()) {
            Ack::Rejected(reason) => Err(ChannelError::Rejected(reason)),
            ack => Ok(ack),
        }
    }
}

/// Client end of the broadcast channel
///
/// A background task keeps the subscription alive and pushes each received
/// payload, whole, into an inbox the frame loop drains.
pub struct Subscriber {
    socket: Arc<UdpSocket>,
    server: SocketAddr,
    inbox: mpsc::Receiver<String>,
    task: JoinHandle<()>,
    unsubscribed: bool,
}

impl Subscriber {
    pub async fn spawn(server: &str, keepalive: Duration) -> Result<Self, ChannelError> {
        let server = resolve(server).await?;
        let socket = Arc::new(bind_for(server).await?);
        socket.send_to(SUBSCRIBE.as_bytes(), server).await?;

        let (sender, inbox) = mpsc::channel(INBOX_CAPACITY);
        let task = tokio::spawn(Self::receive_loop(
            socket.clone(),
            server,
            keepalive,
            sender,
        ));

        info!("Subscribed to broadcasts from {}", server);

        Ok(Self {
            socket,
            server,
            inbox,
            task,
            unsubscribed: false,
        })
    }

    async fn receive_loop(
        socket: Arc<UdpSocket>,
        server: SocketAddr,
        keepalive: Duration,
        sender: mpsc::Sender<String>,
    ) {
        let mut keepalive = interval(keepalive);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut buffer = vec![0u8; MAX_DATAGRAM];

        loop {
            tokio::select! {
                _ = keepalive.tick() => {
                    if let Err(e) = socket.send_to(SUBSCRIBE.as_bytes(), server).await {
                        warn!("Failed to send keepalive: {}", e);
                    }
                }

                result = socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, from)) if from == server => {
                            let payload = String::from_utf8_lossy(&buffer[..len]).into_owned();
                            match sender.try_send(payload) {
                                Ok(()) => {}
                                Err(mpsc::error::TrySendError::Full(_)) => {
                                    debug!("Inbox full, dropping snapshot");
                                }
                                Err(mpsc::error::TrySendError::Closed(_)) => return,
                            }
                        }
                        Ok((_, from)) => debug!("Ignoring datagram from {}", from),
                        Err(e) => {
                            error!("Broadcast receive failed: {}", e);
                            return;
                        }
                    }
                }
            }
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ChannelError> {
        Ok(self.socket.local_addr()?)
    }

    /// Next buffered payload, if any, without waiting
    pub fn try_next(&mut self) -> Result<Option<String>, ChannelError> {
        match self.inbox.try_recv() {
            Ok(payload) => Ok(Some(payload)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(ChannelError::Closed),
        }
    }

    /// Everything buffered since the last call, oldest first
    ///
    /// Fails with [`ChannelError::Closed`] only once the receive task has
    /// stopped and nothing is left to hand out.
    pub fn drain(&mut self) -> Result<Vec<String>, ChannelError> {
        let mut payloads = Vec::new();
        loop {
            match self.try_next() {
                Ok(Some(payload)) => payloads.push(payload),
                Ok(None) => return Ok(payloads),
                Err(e) if payloads.is_empty() => return Err(e),
                Err(_) => return Ok(payloads),
            }
        }
    }

    /// Waits for the next payload
    pub async fn recv(&mut self) -> Result<String, ChannelError> {
        self.inbox.recv().await.ok_or(ChannelError::Closed)
    }

    /// Stops the receive task and tells the authority to stop sending
    pub async fn unsubscribe(mut self) -> Result<(), ChannelError> {
        self.task.abort();
        self.unsubscribed = true;
        self.socket.send_to(UNSUBSCRIBE.as_bytes(), self.server).await?;
        info!("Unsubscribed from {}", self.server);
        Ok(())
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.task.abort();
        if !self.unsubscribed {
            // Best effort; an unsent UNSUBSCRIBE is covered by subscriber expiry
            let _ = self.socket.try_send_to(UNSUBSCRIBE.as_bytes(), self.server);
        }
    }
}
