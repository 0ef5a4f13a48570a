use crate::distributed::message::Packet;
use crate::error::{DistevoError, Result};
use std::io::{ErrorKind, Read, Write};

/// Default ceiling for a single frame payload (64 MiB)
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Write `i32 BE tag | i32 BE length | payload`
pub fn write_frame<W: Write>(writer: &mut W, packet: &Packet) -> Result<()> {
    let length = i32::try_from(packet.payload.len()).map_err(|_| {
        DistevoError::MalformedFrame(format!("payload of {} bytes is too large", packet.payload.len()))
    })?;
    writer.write_all(&packet.tag.to_be_bytes())?;
    writer.write_all(&length.to_be_bytes())?;
    writer.write_all(&packet.payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame; `Ok(None)` when the stream ends cleanly on a frame boundary
pub fn read_frame<R: Read>(reader: &mut R, max_frame_bytes: usize) -> Result<Option<Packet>> {
    let mut header = [0u8; 8];
    if !read_header(reader, &mut header)? {
        return Ok(None);
    }

    let tag = i32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    let length = i32::from_be_bytes([header[4], header[5], header[6], header[7]]);
    if length < 0 {
        return Err(DistevoError::MalformedFrame(format!("negative length {} for tag {}", length, tag)));
    }
    let length = length as usize;
    if length > max_frame_bytes {
        return Err(DistevoError::MalformedFrame(format!(
            "frame of {} bytes exceeds the {} byte limit",
            length, max_frame_bytes
        )));
    }

    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => DistevoError::MalformedFrame(format!(
            "stream ended inside a {} byte payload",
            length
        )),
        _ => DistevoError::Io(e),
    })?;
    Ok(Some(Packet { tag, payload }))
}

fn read_header<R: Read>(reader: &mut R, header: &mut [u8; 8]) -> Result<bool> {
    let mut filled = 0;
    while filled < header.len() {
        match reader.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(DistevoError::MalformedFrame(format!(
                    "stream ended after {} header bytes",
                    filled
                )))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::message::GENOME_TAG;
    use std::io::Cursor;

    #[test]
    fn test_frames_follow_each_other() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, &Packet::work_request()).unwrap();
        write_frame(&mut buffer, &Packet::genome(b"abc".to_vec())).unwrap();
        assert_eq!(buffer.len(), 8 + 8 + 3);

        let mut reader = Cursor::new(buffer);
        assert_eq!(read_frame(&mut reader, 1024).unwrap(), Some(Packet::work_request()));
        let genome = read_frame(&mut reader, 1024).unwrap().unwrap();
        assert_eq!(genome.tag, GENOME_TAG);
        assert_eq!(genome.payload, b"abc");
        assert_eq!(read_frame(&mut reader, 1024).unwrap(), None);
    }

    #[test]
    fn test_negative_length_is_malformed() {
        let mut bytes = GENOME_TAG.to_be_bytes().to_vec();
        bytes.extend_from_slice(&(-5i32).to_be_bytes());
        let result = read_frame(&mut Cursor::new(bytes), 1024);
        assert!(matches!(result, Err(DistevoError::MalformedFrame(_))));
    }

    #[test]
    fn test_oversized_frame_is_malformed() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, &Packet::genome(vec![0; 64])).unwrap();
        let result = read_frame(&mut Cursor::new(buffer), 16);
        assert!(matches!(result, Err(DistevoError::MalformedFrame(_))));
    }

    #[test]
    fn test_truncated_payload_is_malformed() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, &Packet::genome(vec![7; 10])).unwrap();
        buffer.truncate(12);
        let result = read_frame(&mut Cursor::new(buffer), 1024);
        assert!(matches!(result, Err(DistevoError::MalformedFrame(_))));
    }
}
