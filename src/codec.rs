//! Frame encoding and validation.
//!
//! Frame format:
//! - HEADER (1 byte): always `0xAA`
//! - OPCODE (1 byte)
//! - LENGTH (1 byte): payload length, `0x00` for fixed commands
//! - PAYLOAD (0..n bytes)
//! - CHECKSUM (1 byte): sum of every preceding byte, mod 255
//!
//! The checksum is a plain modular sum. It is not a two's or ones' complement
//! checksum, and it has to match the module exactly.

use core::fmt;

use crate::Encode;
use crate::path;
use crate::types::{Equalizer, PlayMode};

pub const HEADER: u8 = 0xAA;

/// Largest volume the module accepts.
pub const MAX_VOLUME: u8 = 30;

/// A play-by-path frame with a full length byte: header, opcode, length,
/// device, path bytes, checksum.
pub const MAX_FRAME_SIZE: usize = 4 + u8::MAX as usize + 1;

pub type FrameBuf = heapless::Vec<u8, MAX_FRAME_SIZE>;

pub const PLAY_BY_NUMBER: [u8; 3] = [HEADER, 0x07, 0x02];
pub const PLAY_BY_PATH: [u8; 2] = [HEADER, 0x08];
pub const SET_VOLUME: [u8; 3] = [HEADER, 0x13, 0x01];
pub const SET_CYCLE_MODE: [u8; 3] = [HEADER, 0x18, 0x01];
pub const SET_CYCLE_TIMES: [u8; 3] = [HEADER, 0x19, 0x01];
pub const SET_EQ: [u8; 2] = [HEADER, 0x01];

/// Drive id sent with play-by-path. `1` is the SD card.
pub const PATH_DEVICE_SD: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Frame would not fit in `MAX_FRAME_SIZE`
    TooLong,
    /// Nothing to play after the leading slash
    EmptyPath,
    /// Path contains characters the module cannot address
    InvalidPath,
    /// Escaped length does not fit the one-byte length field
    PathTooLong { declared: usize },
    EncodeBufferTooSmall { expected: usize, found: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::TooLong => write!(f, "frame exceeds {MAX_FRAME_SIZE} bytes"),
            FrameError::EmptyPath => write!(f, "empty path"),
            FrameError::InvalidPath => write!(f, "path is not ascii"),
            FrameError::PathTooLong { declared } => {
                write!(f, "path length {declared} does not fit in one byte")
            }
            FrameError::EncodeBufferTooSmall { expected, found } => {
                write!(f, "encode buffer too small: need {expected}, have {found}")
            }
        }
    }
}

impl core::error::Error for FrameError {}

pub fn checksum(data: &[u8]) -> u8 {
    let sum = data.iter().fold(0u32, |acc, &b| (acc + b as u32) % 255);
    sum as u8
}

pub fn append_checksum(data: &[u8]) -> Result<FrameBuf, FrameError> {
    let mut frame = FrameBuf::new();
    frame
        .extend_from_slice(data)
        .map_err(|_| FrameError::TooLong)?;
    frame
        .push(checksum(data))
        .map_err(|_| FrameError::TooLong)?;
    Ok(frame)
}

/// True when the last byte of `frame` is the checksum of the rest.
/// Anything shorter than two bytes cannot carry a checksum and is rejected.
pub fn validate(frame: &[u8]) -> bool {
    match frame.split_last() {
        Some((found, body)) if !body.is_empty() => checksum(body) == *found,
        _ => false,
    }
}

pub fn clamp_volume(volume: i32) -> u8 {
    volume.clamp(0, MAX_VOLUME as i32) as u8
}

/// Fixed, pre-checksummed frames from the module datasheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Play,
    Pause,
    Stop,
    Prev,
    Next,
    VolumeUp,
    VolumeDown,
    PrevFile,
    NextFile,
    StopPlaying,
    QueryPlayStatus,
    QueryOnlineDrive,
    QueryPlayDrive,
    QueryNumSongs,
    QueryCurrentSong,
    QueryFolderDirSong,
    QueryFolderNumSong,
}

impl Command {
    pub const ALL: [Command; 17] = [
        Command::Play,
        Command::Pause,
        Command::Stop,
        Command::Prev,
        Command::Next,
        Command::VolumeUp,
        Command::VolumeDown,
        Command::PrevFile,
        Command::NextFile,
        Command::StopPlaying,
        Command::QueryPlayStatus,
        Command::QueryOnlineDrive,
        Command::QueryPlayDrive,
        Command::QueryNumSongs,
        Command::QueryCurrentSong,
        Command::QueryFolderDirSong,
        Command::QueryFolderNumSong,
    ];

    pub const fn bytes(self) -> &'static [u8; 4] {
        match self {
            Command::Play => &[0xAA, 0x02, 0x00, 0xAC],
            Command::Pause => &[0xAA, 0x03, 0x00, 0xAD],
            Command::Stop => &[0xAA, 0x04, 0x00, 0xAE],
            Command::Prev => &[0xAA, 0x05, 0x00, 0xAF],
            Command::Next => &[0xAA, 0x06, 0x00, 0xB0],
            Command::VolumeUp => &[0xAA, 0x14, 0x00, 0xBE],
            Command::VolumeDown => &[0xAA, 0x15, 0x00, 0xBF],
            Command::PrevFile => &[0xAA, 0x0E, 0x00, 0xB8],
            Command::NextFile => &[0xAA, 0x0F, 0x00, 0xB9],
            Command::StopPlaying => &[0xAA, 0x10, 0x00, 0xBA],
            Command::QueryPlayStatus => &[0xAA, 0x01, 0x00, 0xAB],
            Command::QueryOnlineDrive => &[0xAA, 0x09, 0x00, 0xB3],
            Command::QueryPlayDrive => &[0xAA, 0x0A, 0x00, 0xB4],
            Command::QueryNumSongs => &[0xAA, 0x0C, 0x00, 0xB6],
            Command::QueryCurrentSong => &[0xAA, 0x0D, 0x00, 0xB7],
            Command::QueryFolderDirSong => &[0xAA, 0x11, 0x00, 0xBB],
            Command::QueryFolderNumSong => &[0xAA, 0x12, 0x00, 0xBC],
        }
    }

    pub const fn opcode(self) -> u8 {
        self.bytes()[1]
    }
}

/// Every frame the host can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request<'a> {
    Fixed(Command),
    /// Song index as a big-endian u16. Not checked against the song count.
    PlayByNumber(u16),
    /// Clamped to `0..=MAX_VOLUME` on encode.
    SetVolume(i32),
    SetCycleMode(PlayMode),
    SetCycleTimes(u16),
    SetEq(Equalizer),
    /// Experimental, see [`path::encode_path`].
    PlayByPath(&'a str),
}

impl Request<'_> {
    pub fn to_frame(&self) -> Result<FrameBuf, FrameError> {
        let mut buf = [0; MAX_FRAME_SIZE];
        let size = self.encode(&mut buf)?;
        let mut frame = FrameBuf::new();
        frame
            .extend_from_slice(&buf[..size])
            .map_err(|_| FrameError::TooLong)?;
        Ok(frame)
    }
}

fn write_with_checksum(buffer: &mut [u8], parts: &[&[u8]]) -> Result<usize, FrameError> {
    let mut body = FrameBuf::new();
    for part in parts {
        body.extend_from_slice(part).map_err(|_| FrameError::TooLong)?;
    }
    let frame = append_checksum(&body)?;
    if buffer.len() < frame.len() {
        return Err(FrameError::EncodeBufferTooSmall {
            expected: frame.len(),
            found: buffer.len(),
        });
    }
    buffer[..frame.len()].copy_from_slice(&frame);
    Ok(frame.len())
}

impl Encode for Request<'_> {
    type Error = FrameError;

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        match *self {
            Request::Fixed(cmd) => {
                let bytes = cmd.bytes();
                if buffer.len() < bytes.len() {
                    return Err(FrameError::EncodeBufferTooSmall {
                        expected: bytes.len(),
                        found: buffer.len(),
                    });
                }
                buffer[..bytes.len()].copy_from_slice(bytes);
                Ok(bytes.len())
            }
            Request::PlayByNumber(n) => {
                write_with_checksum(buffer, &[&PLAY_BY_NUMBER, &n.to_be_bytes()])
            }
            Request::SetVolume(v) => write_with_checksum(buffer, &[&SET_VOLUME, &[clamp_volume(v)]]),
            Request::SetCycleMode(mode) => {
                write_with_checksum(buffer, &[&SET_CYCLE_MODE, &[mode.byte()]])
            }
            Request::SetCycleTimes(times) => {
                write_with_checksum(buffer, &[&SET_CYCLE_TIMES, &times.to_be_bytes()])
            }
            Request::SetEq(eq) => write_with_checksum(buffer, &[&SET_EQ, &[eq.byte()]]),
            Request::PlayByPath(p) => path::encode_path(&PLAY_BY_PATH, PATH_DEVICE_SD, p, buffer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn checksum_matches_play_command() {
        assert_eq!(checksum(&[0xAA, 0x02, 0x00]), 0xAC);
    }

    #[test]
    fn checksum_wraps_mod_255() {
        // 0xFF alone is 255, which is 0 mod 255
        assert_eq!(checksum(&[0xFF]), 0x00);
        assert_eq!(checksum(&[0xFF, 0xFF, 0x02]), 0x02);
        assert_eq!(checksum(&[]), 0x00);
    }

    #[test]
    fn command_table_is_checksummed() {
        for cmd in Command::ALL {
            let bytes = cmd.bytes();
            assert_eq!(bytes[0], HEADER, "{cmd:?}");
            assert_eq!(bytes[2], 0x00, "{cmd:?}");
            assert!(validate(bytes), "{cmd:?} has a bad checksum");
        }
    }

    #[test]
    fn validate_rejects_short_frames() {
        assert!(!validate(&[]));
        assert!(!validate(&[0x00]));
        assert!(validate(&[0x05, 0x05]));
    }

    #[test]
    fn validate_rejects_corrupted_checksum() {
        assert!(!validate(&[0xAA, 0x02, 0x00, 0xAD]));
    }

    #[test]
    fn volume_is_clamped() {
        let low = Request::SetVolume(-5).to_frame().unwrap();
        let zero = Request::SetVolume(0).to_frame().unwrap();
        assert_eq!(low, zero);
        assert_eq!(zero.as_slice(), &[0xAA, 0x13, 0x01, 0x00, 0xBE]);

        let high = Request::SetVolume(99).to_frame().unwrap();
        let max = Request::SetVolume(30).to_frame().unwrap();
        assert_eq!(high, max);
        assert_eq!(max[3], 30);
    }

    #[test]
    fn play_by_number_is_big_endian() {
        let frame = Request::PlayByNumber(300).to_frame().unwrap();
        assert_eq!(&frame[..3], &PLAY_BY_NUMBER);
        assert_eq!(&frame[3..5], &[0x01, 0x2C]);
        assert!(validate(&frame));
    }

    #[test]
    fn cycle_mode_and_times() {
        let mode = Request::SetCycleMode(PlayMode::RepeatOne).to_frame().unwrap();
        assert_eq!(mode.as_slice(), &[0xAA, 0x18, 0x01, 0x01, 0xC4]);

        let times = Request::SetCycleTimes(0x0203).to_frame().unwrap();
        assert_eq!(&times[..5], &[0xAA, 0x19, 0x01, 0x02, 0x03]);
        assert!(validate(&times));
    }

    #[test]
    fn parameterized_frames_are_prefix_payload_checksum() {
        let cases: [(Request<'_>, &[u8]); 4] = [
            (Request::PlayByNumber(0x0102), &[0xAA, 0x07, 0x02, 0x01, 0x02]),
            (Request::SetVolume(12), &[0xAA, 0x13, 0x01, 0x0C]),
            (Request::SetCycleTimes(7), &[0xAA, 0x19, 0x01, 0x00, 0x07]),
            (Request::SetEq(Equalizer::Jazz), &[0xAA, 0x01, 0x03]),
        ];
        for (request, body) in cases {
            let frame = request.to_frame().unwrap();
            assert_eq!(frame, append_checksum(body).unwrap(), "{request:?}");
        }
    }

    #[test]
    fn set_eq_uses_short_prefix() {
        let frame = Request::SetEq(Equalizer::Rock).to_frame().unwrap();
        assert_eq!(frame.as_slice(), &[0xAA, 0x01, 0x02, 0xAD]);
    }

    #[test]
    fn fixed_request_is_verbatim() {
        let frame = Request::Fixed(Command::Stop).to_frame().unwrap();
        assert_eq!(frame.as_slice(), Command::Stop.bytes());
    }

    #[test]
    fn encode_reports_small_buffer() {
        let mut buf = [0; 3];
        assert_eq!(
            Request::PlayByNumber(1).encode(&mut buf),
            Err(FrameError::EncodeBufferTooSmall { expected: 6, found: 3 })
        );
    }

    proptest! {
        #[test]
        fn appended_checksum_validates(data in proptest::collection::vec(any::<u8>(), 1..64)) {
            let frame = append_checksum(&data).unwrap();
            prop_assert!(validate(&frame));
        }
    }
}
