use crate::distributed::frame::{read_frame, write_frame};
use crate::distributed::message::Packet;
use crate::distributed::transport::{Envelope, Inbox, Transport};
use crate::error::{DistevoError, Result};
use crate::types::{Rank, COORDINATOR_RANK};
use std::collections::HashMap;
use std::net::{Shutdown, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{channel, Sender};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

/// Internal frame assigning a worker its rank: payload is `u32 BE rank | u32 BE size`
const HANDSHAKE_TAG: i32 = 0;
/// Internal frame carrying an abort code as `i32 BE`
const ABORT_TAG: i32 = -1;

/// Star topology over TCP: the coordinator holds one stream per worker
pub struct TcpTransport {
    rank: Rank,
    size: usize,
    peers: HashMap<Rank, Mutex<TcpStream>>,
    inbox: Inbox,
}

impl TcpTransport {
    /// Accept `worker_count` workers on `listener`, assigning ranks in accept order
    pub fn coordinator(listener: TcpListener, worker_count: usize, max_frame_bytes: usize) -> Result<Self> {
        let size = worker_count + 1;
        let (sender, receiver) = channel();
        let mut peers = HashMap::with_capacity(worker_count);

        for rank in 1..size {
            let (mut stream, address) = listener.accept()?;
            stream.set_nodelay(true)?;
            let mut handshake = (rank as u32).to_be_bytes().to_vec();
            handshake.extend_from_slice(&(size as u32).to_be_bytes());
            write_frame(&mut stream, &Packet::new(HANDSHAKE_TAG, handshake))?;
            log::info!("worker {} connected from {}", rank, address);

            spawn_reader(stream.try_clone()?, rank, max_frame_bytes, sender.clone())?;
            peers.insert(rank, Mutex::new(stream));
        }

        Ok(Self {
            rank: COORDINATOR_RANK,
            size,
            peers,
            inbox: Inbox::new(receiver),
        })
    }

    /// Connect to the coordinator, retrying while it is not yet listening
    pub fn worker<A: ToSocketAddrs>(
        address: A,
        connect_attempts: usize,
        retry_delay: Duration,
        max_frame_bytes: usize,
    ) -> Result<Self> {
        let mut stream = connect_with_retry(address, connect_attempts.max(1), retry_delay)?;
        stream.set_nodelay(true)?;

        let handshake = read_frame(&mut stream, max_frame_bytes)?
            .ok_or_else(|| DistevoError::Transport("coordinator closed before the handshake".to_string()))?;
        if handshake.tag != HANDSHAKE_TAG || handshake.payload.len() != 8 {
            return Err(DistevoError::Protocol(format!(
                "expected handshake, got tag {} with {} bytes",
                handshake.tag,
                handshake.payload.len()
            )));
        }
        let p = &handshake.payload;
        let rank = u32::from_be_bytes([p[0], p[1], p[2], p[3]]) as Rank;
        let size = u32::from_be_bytes([p[4], p[5], p[6], p[7]]) as usize;
        log::info!("connected to coordinator as rank {} of {}", rank, size);

        let (sender, receiver) = channel();
        spawn_reader(stream.try_clone()?, COORDINATOR_RANK, max_frame_bytes, sender)?;

        let mut peers = HashMap::with_capacity(1);
        peers.insert(COORDINATOR_RANK, Mutex::new(stream));
        Ok(Self {
            rank,
            size,
            peers,
            inbox: Inbox::new(receiver),
        })
    }
}

fn connect_with_retry<A: ToSocketAddrs>(address: A, attempts: usize, delay: Duration) -> Result<TcpStream> {
    let mut last_error = None;
    for attempt in 1..=attempts {
        match TcpStream::connect(&address) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                log::debug!("connect attempt {}/{} failed: {}", attempt, attempts, e);
                last_error = Some(e);
                thread::sleep(delay);
            }
        }
    }
    Err(match last_error {
        Some(e) => DistevoError::Io(e),
        None => DistevoError::Transport("no connection attempt was made".to_string()),
    })
}

/// Decode frames from one peer into the shared queue until it hangs up
fn spawn_reader(
    mut stream: TcpStream,
    source: Rank,
    max_frame_bytes: usize,
    sender: Sender<Envelope>,
) -> Result<()> {
    thread::Builder::new()
        .name(format!("distevo-reader-{}", source))
        .spawn(move || loop {
            let envelope = match read_frame(&mut stream, max_frame_bytes) {
                Ok(Some(packet)) if packet.tag == ABORT_TAG => Envelope::Abort {
                    source,
                    code: decode_abort_code(&packet.payload),
                },
                Ok(Some(packet)) => Envelope::Packet { source, packet },
                Ok(None) => Envelope::Closed { source },
                Err(error) => Envelope::Failure { source, error },
            };
            let keep_reading = matches!(envelope, Envelope::Packet { .. });
            if sender.send(envelope).is_err() || !keep_reading {
                break;
            }
        })?;
    Ok(())
}

fn decode_abort_code(payload: &[u8]) -> i32 {
    payload
        .try_into()
        .map(i32::from_be_bytes)
        .unwrap_or(1)
}

impl Transport for TcpTransport {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&self, target: Rank, packet: Packet) -> Result<()> {
        let peer = self
            .peers
            .get(&target)
            .ok_or_else(|| DistevoError::Transport(format!("rank {} has no route to rank {}", self.rank, target)))?;
        let mut stream = peer
            .lock()
            .map_err(|_| DistevoError::Transport(format!("stream to rank {} is poisoned", target)))?;
        write_frame(&mut *stream, &packet)
    }

    fn recv_any(&mut self) -> Result<(Rank, Packet)> {
        self.inbox.recv_any()
    }

    fn recv_from(&mut self, source: Rank) -> Result<Packet> {
        self.inbox.recv_from(source)
    }

    fn abort(&self, code: i32) {
        log::error!("rank {} aborting the run with code {}", self.rank, code);
        for (rank, peer) in &self.peers {
            if let Ok(mut stream) = peer.lock() {
                if let Err(e) = write_frame(&mut *stream, &Packet::new(ABORT_TAG, code.to_be_bytes().to_vec())) {
                    log::debug!("could not deliver abort to rank {}: {}", rank, e);
                }
                let _ = stream.shutdown(Shutdown::Both);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::frame::DEFAULT_MAX_FRAME_BYTES;
    use crate::distributed::message::GENOME_TAG;

    #[test]
    fn test_workers_exchange_packets_with_coordinator() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();

        let worker = thread::spawn(move || {
            let mut transport =
                TcpTransport::worker(address, 20, Duration::from_millis(50), DEFAULT_MAX_FRAME_BYTES).unwrap();
            assert_eq!(transport.rank(), 1);
            assert_eq!(transport.size(), 2);
            transport.send(0, Packet::work_request()).unwrap();
            transport.recv_from(0).unwrap()
        });

        let mut coordinator = TcpTransport::coordinator(listener, 1, DEFAULT_MAX_FRAME_BYTES).unwrap();
        let (source, packet) = coordinator.recv_any().unwrap();
        assert_eq!((source, packet), (1, Packet::work_request()));
        coordinator.send(1, Packet::genome(vec![4, 2])).unwrap();

        let reply = worker.join().unwrap();
        assert_eq!(reply.tag, GENOME_TAG);
        assert_eq!(reply.payload, vec![4, 2]);
    }

    #[test]
    fn test_abort_is_delivered_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();

        let worker = thread::spawn(move || {
            let mut transport =
                TcpTransport::worker(address, 20, Duration::from_millis(50), DEFAULT_MAX_FRAME_BYTES).unwrap();
            transport.recv_from(0)
        });

        let coordinator = TcpTransport::coordinator(listener, 1, DEFAULT_MAX_FRAME_BYTES).unwrap();
        coordinator.abort(3);

        let received = worker.join().unwrap();
        assert!(matches!(received, Err(DistevoError::Aborted { rank: 0, code: 3 })));
    }
}
