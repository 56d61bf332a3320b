//! Host-side driver for DY-SV5W style UART audio playback modules.
//!
//! Commands go out as `[0xAA][opcode][length][payload..][checksum]` frames and
//! queries are answered in the same format. The checksum is the sum of all
//! preceding bytes mod 255.
//!
//! Set the module's DIP switches to UART mode and connect at [`BAUD_RATE`]
//! 8N1. Wrap the port in [`NbSerial`] or [`IoSerial`], or implement
//! [`Transport`] directly, then drive it through a [`Player`].

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod codec;
pub mod config;
pub mod path;
mod session;
pub mod time;
pub mod transport;
mod types;

pub trait Encode {
    type Error;

    /// Writes into `buffer` and returns the number of bytes used.
    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error>;
}

pub use codec::{Command, FrameError, Request};
pub use config::{BAUD_RATE, PlayerConfig, QueryLatency};
pub use session::{Error, LONG_RESPONSE, Player, Query, SHORT_RESPONSE};
pub use time::TimeSource;
#[cfg(feature = "std")]
pub use time::{StdClock, StdDelay};
pub use transport::{IoSerial, NbSerial, Transport};
pub use types::{DecodeError, Equalizer, PlayMode, PlayState};
