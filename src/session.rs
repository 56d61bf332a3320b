use core::fmt::{self, Debug};

use embedded_hal::delay::DelayNs;
use log::{debug, trace, warn};

use crate::Encode;
use crate::codec::{Command, FrameError, MAX_FRAME_SIZE, Request, checksum, validate};
use crate::config::{PlayerConfig, QueryLatency};
use crate::time::TimeSource;
use crate::transport::Transport;
use crate::types::{DecodeError, Equalizer, PlayMode, PlayState};

/// Buffer for play-state, song and count responses.
pub const SHORT_RESPONSE: usize = 16;
/// Buffer for drive responses.
pub const LONG_RESPONSE: usize = 32;

/// Offset of the first data byte in a response frame: header, opcode, length.
const DATA_OFFSET: usize = 3;

#[derive(Debug)]
pub enum Error<E> {
    Transport(E),
    /// Request could not be encoded. Nothing was sent.
    Frame(FrameError),
    /// No bytes arrived before the response timeout
    Timeout,
    ChecksumMismatch { calculated: u8, found: u8 },
    /// Frame was intact but its contents made no sense
    Decode(DecodeError),
}

impl<E> From<FrameError> for Error<E> {
    fn from(value: FrameError) -> Self {
        Error::Frame(value)
    }
}

impl<E> From<DecodeError> for Error<E> {
    fn from(value: DecodeError) -> Self {
        Error::Decode(value)
    }
}

impl<E: Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(e) => write!(f, "transport error: {e:?}"),
            Error::Frame(e) => write!(f, "cannot encode request: {e}"),
            Error::Timeout => write!(f, "no response from module"),
            Error::ChecksumMismatch { calculated, found } => write!(
                f,
                "response checksum mismatch: calculated {calculated:#04x}, found {found:#04x}"
            ),
            Error::Decode(e) => write!(f, "cannot decode response: {e}"),
        }
    }
}

impl<E: Debug> core::error::Error for Error<E> {}

/// Questions the module can answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    PlayState,
    CurrentSong,
    NumSongs,
    /// First song of the current folder
    FolderDirSong,
    /// Number of songs in the current folder
    FolderNumSong,
    PlayDrive,
    OnlineDrive,
}

impl Query {
    pub const fn command(self) -> Command {
        match self {
            Query::PlayState => Command::QueryPlayStatus,
            Query::CurrentSong => Command::QueryCurrentSong,
            Query::NumSongs => Command::QueryNumSongs,
            Query::FolderDirSong => Command::QueryFolderDirSong,
            Query::FolderNumSong => Command::QueryFolderNumSong,
            Query::PlayDrive => Command::QueryPlayDrive,
            Query::OnlineDrive => Command::QueryOnlineDrive,
        }
    }

    pub fn latency_ms(self, latency: &QueryLatency) -> u32 {
        match self {
            Query::PlayState => latency.play_state_ms,
            Query::CurrentSong | Query::NumSongs | Query::FolderDirSong | Query::FolderNumSong => {
                latency.song_ms
            }
            Query::PlayDrive | Query::OnlineDrive => latency.drive_ms,
        }
    }

    pub const fn capacity(self) -> usize {
        match self {
            Query::PlayDrive | Query::OnlineDrive => LONG_RESPONSE,
            _ => SHORT_RESPONSE,
        }
    }
}

/// Everything before the checksum byte.
fn body(frame: &[u8]) -> &[u8] {
    &frame[..frame.len().saturating_sub(1)]
}

fn byte_at(frame: &[u8], index: usize) -> Result<u8, DecodeError> {
    body(frame).get(index).copied().ok_or(DecodeError::ResponseTooShort {
        expected: index + 2,
        found: frame.len(),
    })
}

/// Big-endian u16 at `index..index + 2`.
fn u16_at(frame: &[u8], index: usize) -> Result<u16, DecodeError> {
    match body(frame).get(index..index + 2) {
        Some(&[hi, lo]) => Ok(u16::from_be_bytes([hi, lo])),
        _ => Err(DecodeError::ResponseTooShort {
            expected: index + 3,
            found: frame.len(),
        }),
    }
}

/// Driver for one module on one serial link.
///
/// Only one command is in flight at a time; every method takes `&mut self`.
/// Control commands are fire-and-forget. Queries wait the configured latency,
/// then poll for at most `response_timeout_ms`.
#[derive(Debug)]
pub struct Player<T, C, D> {
    transport: T,
    clock: C,
    delay: D,
    config: PlayerConfig,
}

impl<T, C, D> Player<T, C, D>
where
    T: Transport,
    C: TimeSource,
    D: DelayNs,
{
    pub fn new(transport: T, clock: C, delay: D) -> Self {
        Self::with_config(transport, clock, delay, PlayerConfig::default())
    }

    pub fn with_config(transport: T, clock: C, delay: D, config: PlayerConfig) -> Self {
        Player {
            transport,
            clock,
            delay,
            config,
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: PlayerConfig) {
        self.config = config;
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<(), Error<T::Error>> {
        trace!("tx {frame:02x?}");
        self.transport.write(frame).map_err(Error::Transport)
    }

    /// Writes a fixed command verbatim.
    pub fn send_command(&mut self, command: Command) -> Result<(), Error<T::Error>> {
        self.write_frame(command.bytes())
    }

    /// Encodes and writes any request. No response is read.
    pub fn send(&mut self, request: Request<'_>) -> Result<(), Error<T::Error>> {
        let mut buf = [0; MAX_FRAME_SIZE];
        let size = request.encode(&mut buf)?;
        self.write_frame(&buf[..size])
    }

    /// Copies everything the transport has right now into `buf`.
    ///
    /// Bytes that do not fit are read and dropped so they cannot leak into
    /// the next response.
    fn drain(&mut self, buf: &mut [u8]) -> Result<usize, Error<T::Error>> {
        let mut n = 0;
        while n < buf.len() {
            if self.transport.bytes_available().map_err(Error::Transport)? == 0 {
                return Ok(n);
            }
            let read = self.transport.read(&mut buf[n..]).map_err(Error::Transport)?;
            if read == 0 {
                return Ok(n);
            }
            n += read;
        }

        let overflow = self.transport.bytes_available().map_err(Error::Transport)?;
        if overflow > 0 {
            let mut scratch = [0; LONG_RESPONSE];
            let mut dropped = 0;
            while dropped < overflow {
                let want = (overflow - dropped).min(scratch.len());
                let read = self
                    .transport
                    .read(&mut scratch[..want])
                    .map_err(Error::Transport)?;
                if read == 0 {
                    break;
                }
                dropped += read;
            }
            warn!("response overflowed {} byte buffer, dropped {dropped} bytes", buf.len());
        }
        Ok(n)
    }

    /// Drops anything left over from earlier traffic.
    fn discard_input(&mut self) -> Result<(), Error<T::Error>> {
        let mut scratch = [0; LONG_RESPONSE];
        let stale = self.drain(&mut scratch)?;
        if stale > 0 {
            debug!("discarded {stale} stale bytes: {:02x?}", &scratch[..stale]);
        }
        Ok(())
    }

    /// Polls the transport until a burst of bytes has arrived and gone quiet,
    /// or until `timeout_ms` has passed. Returns the number of bytes placed in
    /// `buf`, `0` on timeout.
    pub fn get_response(&mut self, buf: &mut [u8], timeout_ms: u64) -> Result<usize, Error<T::Error>> {
        let start = self.clock.now();
        loop {
            let n = self.drain(buf)?;
            if n > 0 {
                trace!("rx {:02x?}", &buf[..n]);
                return Ok(n);
            }
            let elapsed = self.clock.elapsed_ms(start);
            if elapsed >= timeout_ms {
                return Ok(0);
            }
            let wait = (timeout_ms - elapsed).min(self.config.poll_interval_ms as u64) as u32;
            self.delay.delay_ms(wait.max(1));
        }
    }

    fn query<R>(
        &mut self,
        query: Query,
        decode: impl FnOnce(&[u8]) -> Result<R, DecodeError>,
    ) -> Result<R, Error<T::Error>> {
        self.discard_input()?;
        self.send_command(query.command())?;

        let latency = query.latency_ms(&self.config.latency);
        if latency > 0 {
            self.delay.delay_ms(latency);
        }

        let mut buf = [0; LONG_RESPONSE];
        let buf = &mut buf[..query.capacity()];
        let n = self.get_response(buf, self.config.response_timeout_ms)?;
        if n == 0 {
            warn!("{query:?}: no response within {} ms", self.config.response_timeout_ms);
            return Err(Error::Timeout);
        }

        let frame = &buf[..n];
        if !validate(frame) {
            let (found, rest) = frame.split_last().map_or((0, &[][..]), |(f, r)| (*f, r));
            let calculated = checksum(rest);
            warn!("{query:?}: checksum mismatch in {frame:02x?}");
            return Err(Error::ChecksumMismatch { calculated, found });
        }

        let value = decode(frame)?;
        debug!("{query:?}: ok");
        Ok(value)
    }

    pub fn play(&mut self) -> Result<(), Error<T::Error>> {
        self.send_command(Command::Play)
    }

    pub fn pause(&mut self) -> Result<(), Error<T::Error>> {
        self.send_command(Command::Pause)
    }

    pub fn stop(&mut self) -> Result<(), Error<T::Error>> {
        self.send_command(Command::Stop)
    }

    pub fn stop_playing(&mut self) -> Result<(), Error<T::Error>> {
        self.send_command(Command::StopPlaying)
    }

    pub fn next(&mut self) -> Result<(), Error<T::Error>> {
        self.send_command(Command::Next)
    }

    pub fn prev(&mut self) -> Result<(), Error<T::Error>> {
        self.send_command(Command::Prev)
    }

    pub fn next_file(&mut self) -> Result<(), Error<T::Error>> {
        self.send_command(Command::NextFile)
    }

    pub fn prev_file(&mut self) -> Result<(), Error<T::Error>> {
        self.send_command(Command::PrevFile)
    }

    pub fn volume_up(&mut self) -> Result<(), Error<T::Error>> {
        self.send_command(Command::VolumeUp)
    }

    pub fn volume_down(&mut self) -> Result<(), Error<T::Error>> {
        self.send_command(Command::VolumeDown)
    }

    /// Out of range volumes are clamped to `0..=30`.
    pub fn set_volume(&mut self, volume: i32) -> Result<(), Error<T::Error>> {
        self.send(Request::SetVolume(volume))
    }

    /// Songs are numbered from 1. The number is sent as-is; what the module
    /// does with a number past the last song is undefined.
    pub fn play_by_number(&mut self, number: u16) -> Result<(), Error<T::Error>> {
        self.send(Request::PlayByNumber(number))
    }

    /// Plays a file on the SD card by path, e.g. `/music/song.mp3`.
    ///
    /// Experimental: the escaping follows the datasheet but has not been
    /// confirmed on hardware. Empty paths are rejected before anything is sent.
    pub fn play_by_path(&mut self, path: &str) -> Result<(), Error<T::Error>> {
        self.send(Request::PlayByPath(path))
    }

    pub fn set_cycle_mode(&mut self, mode: PlayMode) -> Result<(), Error<T::Error>> {
        self.send(Request::SetCycleMode(mode))
    }

    pub fn set_cycle_times(&mut self, times: u16) -> Result<(), Error<T::Error>> {
        self.send(Request::SetCycleTimes(times))
    }

    pub fn set_eq(&mut self, eq: Equalizer) -> Result<(), Error<T::Error>> {
        self.send(Request::SetEq(eq))
    }

    pub fn query_play_state(&mut self) -> Result<PlayState, Error<T::Error>> {
        self.query(Query::PlayState, |f| PlayState::try_from(byte_at(f, DATA_OFFSET)?))
    }

    /// The song `play` would start.
    pub fn query_current_song(&mut self) -> Result<u16, Error<T::Error>> {
        self.query(Query::CurrentSong, |f| u16_at(f, DATA_OFFSET))
    }

    pub fn query_num_songs(&mut self) -> Result<u16, Error<T::Error>> {
        self.query(Query::NumSongs, |f| u16_at(f, DATA_OFFSET))
    }

    pub fn query_folder_dir_song(&mut self) -> Result<u16, Error<T::Error>> {
        self.query(Query::FolderDirSong, |f| u16_at(f, DATA_OFFSET))
    }

    pub fn query_folder_num_song(&mut self) -> Result<u16, Error<T::Error>> {
        self.query(Query::FolderNumSong, |f| u16_at(f, DATA_OFFSET))
    }

    /// Drive currently playing, as the raw byte the module reports.
    pub fn query_play_drive(&mut self) -> Result<u8, Error<T::Error>> {
        self.query(Query::PlayDrive, |f| byte_at(f, DATA_OFFSET))
    }

    /// Drives currently connected, as the raw byte the module reports.
    pub fn query_online_drive(&mut self) -> Result<u8, Error<T::Error>> {
        self.query(Query::OnlineDrive, |f| byte_at(f, DATA_OFFSET))
    }
}

#[cfg(feature = "std")]
impl<T: Transport> Player<T, crate::time::StdClock, crate::time::StdDelay> {
    /// Player timed by the host's monotonic clock and `thread::sleep`.
    pub fn std(transport: T) -> Self {
        Player::new(transport, crate::time::StdClock, crate::time::StdDelay)
    }
}
