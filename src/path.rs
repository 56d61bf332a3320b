//! Play-by-path encoding.
//!
//! After the first character the module wants every directory separator
//! preceded by a `*` marker and every extension dot replaced by one, so
//! `/music/song.mp3` goes out as `/MUSIC*/SONG*MP3`. The length byte is the
//! uppercased path length plus one for every slash after the first
//! character, which is exactly the number of path bytes on the wire.
//!
//! This has not been verified against real hardware.

use crate::codec::{FrameError, checksum};

const ESCAPE: u8 = b'*';

/// Length byte the module expects for `path`, also the escaped size of it.
pub fn declared_length(path: &[u8]) -> usize {
    let extra_slashes = path.iter().skip(1).filter(|&&c| c == b'/').count();
    path.len() + extra_slashes
}

/// Encodes a complete play-by-path frame into `buffer`:
/// `[prefix][declared length][device][path[0]][escaped rest][checksum]`.
pub fn encode_path(
    prefix: &[u8],
    device: u8,
    path: &str,
    buffer: &mut [u8],
) -> Result<usize, FrameError> {
    if !path.is_ascii() {
        return Err(FrameError::InvalidPath);
    }
    let raw = path.as_bytes();
    if raw.strip_prefix(b"/").unwrap_or(raw).is_empty() {
        return Err(FrameError::EmptyPath);
    }

    let declared = declared_length(raw);
    if declared > u8::MAX as usize {
        return Err(FrameError::PathTooLong { declared });
    }

    let size = prefix.len() + 2 + declared + 1;
    if buffer.len() < size {
        return Err(FrameError::EncodeBufferTooSmall {
            expected: size,
            found: buffer.len(),
        });
    }

    buffer[..prefix.len()].copy_from_slice(prefix);
    let mut i = prefix.len();
    buffer[i] = declared as u8;
    buffer[i + 1] = device;
    buffer[i + 2] = raw[0].to_ascii_uppercase();
    i += 3;
    for &c in &raw[1..] {
        match c {
            b'.' => {
                buffer[i] = ESCAPE;
                i += 1;
            }
            b'/' => {
                buffer[i] = ESCAPE;
                buffer[i + 1] = b'/';
                i += 2;
            }
            _ => {
                buffer[i] = c.to_ascii_uppercase();
                i += 1;
            }
        }
    }
    buffer[i] = checksum(&buffer[..i]);
    log::trace!("play-by-path {path:?} -> {:02x?}", &buffer[..=i]);
    Ok(i + 1)
}
