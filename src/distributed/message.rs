use crate::distributed::transport::Transport;
use crate::engines::generation::genome::Genome;
use crate::error::{DistevoError, Result};
use crate::types::Rank;

pub const WORK_REQUEST_TAG: i32 = 1;
pub const GENOME_LENGTH_TAG: i32 = 2;
pub const GENOME_TAG: i32 = 3;
pub const TERMINATE_TAG: i32 = 4;

/// Unit of transfer: a typed tag and an opaque payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub tag: i32,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn new(tag: i32, payload: Vec<u8>) -> Self {
        Self { tag, payload }
    }

    pub fn work_request() -> Self {
        Self::new(WORK_REQUEST_TAG, Vec::new())
    }

    pub fn terminate() -> Self {
        Self::new(TERMINATE_TAG, Vec::new())
    }

    pub fn genome_length(length: i32) -> Self {
        Self::new(GENOME_LENGTH_TAG, length.to_be_bytes().to_vec())
    }

    pub fn genome(bytes: Vec<u8>) -> Self {
        Self::new(GENOME_TAG, bytes)
    }
}

/// Protocol-level message kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    WorkRequest,
    GenomeLength,
    Genome,
    Terminate,
}

impl Tag {
    pub fn from_code(code: i32) -> Option<Tag> {
        match code {
            WORK_REQUEST_TAG => Some(Tag::WorkRequest),
            GENOME_LENGTH_TAG => Some(Tag::GenomeLength),
            GENOME_TAG => Some(Tag::Genome),
            TERMINATE_TAG => Some(Tag::Terminate),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Tag::WorkRequest => WORK_REQUEST_TAG,
            Tag::GenomeLength => GENOME_LENGTH_TAG,
            Tag::Genome => GENOME_TAG,
            Tag::Terminate => TERMINATE_TAG,
        }
    }
}

pub fn send_work_request<T: Transport + ?Sized>(transport: &T, target: Rank) -> Result<()> {
    transport.send(target, Packet::work_request())
}

pub fn send_terminate<T: Transport + ?Sized>(transport: &T, target: Rank) -> Result<()> {
    transport.send(target, Packet::terminate())
}

/// Send the length packet followed by the serialized genome
pub fn send_genome<G: Genome, T: Transport + ?Sized>(transport: &T, target: Rank, genome: &G) -> Result<()> {
    let bytes = genome.to_bytes()?;
    let length = i32::try_from(bytes.len()).map_err(|_| {
        DistevoError::MalformedFrame(format!("genome of {} bytes exceeds the i32 length prefix", bytes.len()))
    })?;
    log::debug!(
        "rank {} sending genome {} ({} bytes) to {}",
        transport.rank(),
        genome.generation_id(),
        length,
        target
    );
    transport.send(target, Packet::genome_length(length))?;
    transport.send(target, Packet::genome(bytes))
}

/// Decode the announced length, then read the genome bytes that must follow from `source`
pub fn receive_genome<G: Genome, T: Transport + ?Sized>(
    transport: &mut T,
    source: Rank,
    length_packet: &Packet,
) -> Result<G> {
    let length = decode_length(length_packet)?;

    let body = transport.recv_from(source)?;
    if body.tag != GENOME_TAG {
        return Err(DistevoError::Protocol(format!(
            "expected genome bytes from rank {} after length prefix, got tag {}",
            source, body.tag
        )));
    }
    if body.payload.len() != length {
        return Err(DistevoError::MalformedFrame(format!(
            "rank {} announced {} genome bytes but sent {}",
            source,
            length,
            body.payload.len()
        )));
    }

    G::from_bytes(&body.payload)
}

fn decode_length(packet: &Packet) -> Result<usize> {
    let bytes: [u8; 4] = packet.payload.as_slice().try_into().map_err(|_| {
        DistevoError::MalformedFrame(format!(
            "length prefix must be 4 bytes, got {}",
            packet.payload.len()
        ))
    })?;
    let length = i32::from_be_bytes(bytes);
    usize::try_from(length)
        .map_err(|_| DistevoError::MalformedFrame(format!("negative genome length {}", length)))
}
