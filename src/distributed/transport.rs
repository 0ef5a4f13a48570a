use crate::distributed::message::Packet;
use crate::error::{DistevoError, Result};
use crate::types::Rank;
use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};

/// Point-to-point message passing between numbered ranks
///
/// Packets from one source arrive in the order they were sent. `recv_from` must not
/// reorder packets from other sources relative to each other.
pub trait Transport: Send {
    fn rank(&self) -> Rank;

    /// Number of ranks, coordinator included
    fn size(&self) -> usize;

    fn send(&self, target: Rank, packet: Packet) -> Result<()>;

    /// Block for the next packet from any source
    fn recv_any(&mut self) -> Result<(Rank, Packet)>;

    /// Block for the next packet from `source`, buffering everything else
    fn recv_from(&mut self, source: Rank) -> Result<Packet>;

    /// Tear down the whole run; every other rank's next receive fails
    fn abort(&self, code: i32);
}

/// What a rank's single-consumer queue carries
pub(crate) enum Envelope {
    Packet { source: Rank, packet: Packet },
    Abort { source: Rank, code: i32 },
    /// Peer hung up between frames
    Closed { source: Rank },
    Failure { source: Rank, error: DistevoError },
}

/// Single-consumer queue with a holding area for out-of-turn packets
pub(crate) struct Inbox {
    receiver: Receiver<Envelope>,
    pending: VecDeque<(Rank, Packet)>,
}

impl Inbox {
    pub(crate) fn new(receiver: Receiver<Envelope>) -> Self {
        Self {
            receiver,
            pending: VecDeque::new(),
        }
    }

    pub(crate) fn recv_any(&mut self) -> Result<(Rank, Packet)> {
        if let Some(front) = self.pending.pop_front() {
            return Ok(front);
        }
        loop {
            if let Some(delivered) = self.next_packet()? {
                return Ok(delivered);
            }
        }
    }

    pub(crate) fn recv_from(&mut self, source: Rank) -> Result<Packet> {
        if let Some(pos) = self.pending.iter().position(|(s, _)| *s == source) {
            if let Some((_, packet)) = self.pending.remove(pos) {
                return Ok(packet);
            }
        }
        loop {
            match self.next_packet()? {
                Some((s, packet)) if s == source => return Ok(packet),
                Some(other) => self.pending.push_back(other),
                None => {}
            }
        }
    }

    fn next_packet(&mut self) -> Result<Option<(Rank, Packet)>> {
        let envelope = self
            .receiver
            .recv()
            .map_err(|_| DistevoError::Transport("every sender has disconnected".to_string()))?;
        match envelope {
            Envelope::Packet { source, packet } => Ok(Some((source, packet))),
            Envelope::Abort { source, code } => Err(DistevoError::Aborted { rank: source, code }),
            Envelope::Closed { source } => {
                log::debug!("rank {} closed its connection", source);
                Ok(None)
            }
            Envelope::Failure { source, error } => {
                log::error!("receive from rank {} failed: {}", source, error);
                Err(error)
            }
        }
    }
}

/// In-process ranks connected by `std::sync::mpsc` channels
pub struct ChannelTransport {
    rank: Rank,
    senders: Vec<Sender<Envelope>>,
    inbox: Inbox,
}

impl ChannelTransport {
    /// Fully connected mesh of `size` ranks; element `i` is rank `i`
    pub fn mesh(size: usize) -> Vec<ChannelTransport> {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..size).map(|_| channel()).unzip();
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, receiver)| ChannelTransport {
                rank,
                senders: senders.clone(),
                inbox: Inbox::new(receiver),
            })
            .collect()
    }
}

impl Transport for ChannelTransport {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.senders.len()
    }

    fn send(&self, target: Rank, packet: Packet) -> Result<()> {
        let sender = self
            .senders
            .get(target)
            .ok_or_else(|| DistevoError::Transport(format!("no rank {} in a mesh of {}", target, self.senders.len())))?;
        sender
            .send(Envelope::Packet {
                source: self.rank,
                packet,
            })
            .map_err(|_| DistevoError::Transport(format!("rank {} is no longer receiving", target)))
    }

    fn recv_any(&mut self) -> Result<(Rank, Packet)> {
        self.inbox.recv_any()
    }

    fn recv_from(&mut self, source: Rank) -> Result<Packet> {
        self.inbox.recv_from(source)
    }

    fn abort(&self, code: i32) {
        log::error!("rank {} aborting the run with code {}", self.rank, code);
        for (rank, sender) in self.senders.iter().enumerate() {
            if rank != self.rank {
                let _ = sender.send(Envelope::Abort {
                    source: self.rank,
                    code,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::message::{Packet, GENOME_TAG, WORK_REQUEST_TAG};

    #[test]
    fn test_recv_from_buffers_other_sources() {
        let mut mesh = ChannelTransport::mesh(3);
        let mut coordinator = mesh.remove(0);
        let worker_a = mesh.remove(0);
        let worker_b = mesh.remove(0);

        worker_a.send(0, Packet::work_request()).unwrap();
        worker_b.send(0, Packet::genome(vec![1, 2])).unwrap();
        worker_a.send(0, Packet::genome(vec![9])).unwrap();

        // Pull worker 2's packet first; worker 1's packets stay in order
        assert_eq!(coordinator.recv_from(2).unwrap().tag, GENOME_TAG);
        assert_eq!(coordinator.recv_any().unwrap(), (1, Packet::work_request()));
        assert_eq!(coordinator.recv_any().unwrap(), (1, Packet::genome(vec![9])));
    }

    #[test]
    fn test_abort_reaches_every_other_rank() {
        let mut mesh = ChannelTransport::mesh(3);
        mesh[1].abort(7);
        assert!(matches!(mesh[0].recv_any(), Err(DistevoError::Aborted { rank: 1, code: 7 })));
        assert!(matches!(mesh[2].recv_from(0), Err(DistevoError::Aborted { rank: 1, code: 7 })));
    }

    #[test]
    fn test_send_to_unknown_rank_fails() {
        let mesh = ChannelTransport::mesh(2);
        assert!(mesh[0].send(5, Packet::new(WORK_REQUEST_TAG, vec![])).is_err());
    }
}
