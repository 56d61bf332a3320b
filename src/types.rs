use core::fmt;

use bilge::prelude::*;

/// Playback status reported at offset 3 of a play-status response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    /// The module reports `-1`, sent as `0xFF`.
    Failed,
    Stopped,
    Playing,
    Paused,
}

impl PlayState {
    pub const FAILED: u8 = 0xFF;
    pub const STOPPED: u8 = 0x00;
    pub const PLAYING: u8 = 0x01;
    pub const PAUSED: u8 = 0x02;
}

impl TryFrom<u8> for PlayState {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            PlayState::STOPPED => Ok(PlayState::Stopped),
            PlayState::PLAYING => Ok(PlayState::Playing),
            PlayState::PAUSED => Ok(PlayState::Paused),
            PlayState::FAILED => Ok(PlayState::Failed),
            x => Err(DecodeError::InvalidPlayState(x)),
        }
    }
}

/// Loop behaviour written with the set-cycle-mode command.
#[bitsize(3)]
#[derive(FromBits, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMode {
    /// Play everything in sequence, then start over
    Repeat = 0x00,
    /// Repeat the current file
    RepeatOne = 0x01,
    /// Play one file and stop
    OneOff = 0x02,
    Random = 0x03,
    /// Repeat the current directory
    RepeatDir = 0x04,
    /// Random file from the current directory
    RandomDir = 0x05,
    /// Play the current directory in sequence, then stop
    SequenceDir = 0x06,
    /// Play the whole drive in sequence, then stop
    Sequence = 0x07,
}

impl PlayMode {
    pub fn byte(self) -> u8 {
        self as u8
    }
}

/// Equalizer preset written with the set-EQ command.
#[bitsize(3)]
#[derive(TryFromBits, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Equalizer {
    Normal = 0x00,
    Pop = 0x01,
    Rock = 0x02,
    Jazz = 0x03,
    Classic = 0x04,
}

impl Equalizer {
    pub fn byte(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Offset 3 of a play-status response held something other than a known state
    InvalidPlayState(u8),
    /// The frame validated but ends before the field being read
    ResponseTooShort { expected: usize, found: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidPlayState(b) => write!(f, "invalid play state byte {b:#04x}"),
            DecodeError::ResponseTooShort { expected, found } => {
                write!(f, "response too short: need {expected} bytes, got {found}")
            }
        }
    }
}

impl core::error::Error for DecodeError {}
