//! Decoder for `mozLz40` session frames.
//!
//! A frame is `[8 byte magic][u32 LE decompressed length][LZ4 block]`. Only
//! the block format is implemented, not the streaming frame format.
//!
//! Every write into the output buffer is checked against the declared
//! length, and every back-reference is checked against the bytes already
//! produced. Hostile input yields an error, never a panic or a short read.

use crate::config::FrameConfig;
use crate::error::{Result, TabkitError};
use std::path::Path;
use tracing::debug;

/// Decode a complete frame into its raw bytes.
pub fn decode(frame: &[u8]) -> Result<Vec<u8>> {
    if frame.len() < FrameConfig::HEADER_LEN {
        return Err(TabkitError::format(
            frame.len(),
            format!(
                "frame is {} bytes, shorter than the {} byte header",
                frame.len(),
                FrameConfig::HEADER_LEN
            ),
        ));
    }
    if &frame[..FrameConfig::LENGTH_OFFSET] != FrameConfig::MAGIC {
        return Err(TabkitError::format(0, "unrecognized magic prefix"));
    }

    let declared = read_u32_le(frame, FrameConfig::LENGTH_OFFSET) as usize;
    let output = decode_block(frame, FrameConfig::HEADER_LEN, declared)?;
    debug!(
        "Decoded frame: {} compressed bytes into {} bytes",
        frame.len() - FrameConfig::HEADER_LEN,
        output.len()
    );
    Ok(output)
}

/// Read and decode a frame file.
pub async fn decode_file(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let frame = tokio::fs::read(path)
        .await
        .map_err(|e| TabkitError::io_with_path(e, path))?;
    decode(&frame)
}

/// Build the 12 byte header for a block that decompresses to `len` bytes.
pub fn encode_header(len: u32) -> [u8; FrameConfig::HEADER_LEN] {
    let mut header = [0u8; FrameConfig::HEADER_LEN];
    header[..FrameConfig::LENGTH_OFFSET].copy_from_slice(FrameConfig::MAGIC);
    header[FrameConfig::LENGTH_OFFSET..].copy_from_slice(&len.to_le_bytes());
    header
}

fn read_u32_le(input: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([input[at], input[at + 1], input[at + 2], input[at + 3]])
}

/// Output buffer that refuses to grow past the declared length.
struct BoundedOutput {
    bytes: Vec<u8>,
    limit: usize,
}

impl BoundedOutput {
    fn new(limit: usize, compressed_len: usize) -> Self {
        // A block cannot expand by more than 255x; a larger declared length
        // is rejected later, so don't let it drive the allocation.
        let capacity = limit.min(compressed_len.saturating_mul(255));
        Self {
            bytes: Vec::with_capacity(capacity),
            limit,
        }
    }

    fn ensure_room(&self, extra: usize, offset: usize) -> Result<()> {
        match self.bytes.len().checked_add(extra) {
            Some(end) if end <= self.limit => Ok(()),
            _ => Err(TabkitError::format(
                offset,
                format!(
                    "sequence writes past the declared length of {} bytes",
                    self.limit
                ),
            )),
        }
    }
}

fn decode_block(input: &[u8], start: usize, declared: usize) -> Result<Vec<u8>> {
    let end = input.len();
    let mut pos = start;
    let mut out = BoundedOutput::new(declared, end - start);

    while pos < end {
        let token_at = pos;
        let token = input[pos];
        pos += 1;

        let literal_len = read_length(input, &mut pos, (token >> 4) as usize)?;
        let literal_end = pos
            .checked_add(literal_len)
            .filter(|&e| e <= end)
            .ok_or_else(|| {
                TabkitError::format(token_at, "literal run extends past the end of input")
            })?;
        out.ensure_room(literal_len, token_at)?;
        out.bytes.extend_from_slice(&input[pos..literal_end]);
        pos = literal_end;

        if pos == end {
            break;
        }

        if pos + 2 > end {
            return Err(TabkitError::format(
                pos,
                "back-reference offset is truncated",
            ));
        }
        let offset_at = pos;
        let offset = u16::from_le_bytes([input[pos], input[pos + 1]]) as usize;
        pos += 2;

        if offset == 0 {
            return Err(TabkitError::corruption(
                offset_at,
                "back-reference offset is zero",
            ));
        }
        if offset > out.bytes.len() {
            return Err(TabkitError::corruption(
                offset_at,
                format!(
                    "back-reference offset {} reaches before the {} bytes written",
                    offset,
                    out.bytes.len()
                ),
            ));
        }

        let match_len = read_length(input, &mut pos, (token & 0x0f) as usize)?
            .checked_add(FrameConfig::MIN_MATCH)
            .ok_or_else(|| TabkitError::format(token_at, "match length overflows"))?;
        out.ensure_room(match_len, token_at)?;

        // Byte by byte: the source may overlap the bytes being written.
        let mut from = out.bytes.len() - offset;
        for _ in 0..match_len {
            let byte = out.bytes[from];
            out.bytes.push(byte);
            from += 1;
        }
    }

    if out.bytes.len() != declared {
        return Err(TabkitError::format(
            pos,
            format!(
                "declared length {} but decoded {} bytes",
                declared,
                out.bytes.len()
            ),
        ));
    }
    Ok(out.bytes)
}

/// Decode a 4-bit length with its extension bytes.
fn read_length(input: &[u8], pos: &mut usize, nibble: usize) -> Result<usize> {
    let mut len = nibble;
    if nibble != 15 {
        return Ok(len);
    }
    loop {
        let byte = *input
            .get(*pos)
            .ok_or_else(|| TabkitError::format(*pos, "length extension is truncated"))?;
        *pos += 1;
        len = len
            .checked_add(byte as usize)
            .ok_or_else(|| TabkitError::format(*pos, "length overflows"))?;
        if byte != 255 {
            return Ok(len);
        }
    }
}
