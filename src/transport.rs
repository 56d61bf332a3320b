use core::fmt::Debug;

use embedded_hal_nb::serial;
use heapless::Deque;

/// Bytes held between polls by the buffered adapters.
pub const RX_BUFFER_SIZE: usize = 64;

/// Raw byte link to the module.
///
/// Reads are non-blocking: `read` hands back whatever is buffered right now,
/// possibly nothing.
pub trait Transport {
    type Error: Debug;

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    fn bytes_available(&mut self) -> Result<usize, Self::Error>;

    /// Copies up to `buf.len()` buffered bytes into `buf`.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    type Error = T::Error;

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        (**self).write(bytes)
    }

    fn bytes_available(&mut self) -> Result<usize, Self::Error> {
        (**self).bytes_available()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        (**self).read(buf)
    }
}

fn pop_into(rx: &mut Deque<u8, RX_BUFFER_SIZE>, buf: &mut [u8]) -> usize {
    let mut n = 0;
    while n < buf.len() {
        match rx.pop_front() {
            Some(b) => {
                buf[n] = b;
                n += 1;
            }
            None => break,
        }
    }
    n
}

/// Adapts a word-at-a-time `embedded-hal-nb` UART.
#[derive(Debug)]
pub struct NbSerial<S> {
    serial: S,
    rx: Deque<u8, RX_BUFFER_SIZE>,
}

impl<S> NbSerial<S>
where
    S: serial::Read + serial::Write,
{
    pub fn new(serial: S) -> NbSerial<S> {
        NbSerial {
            serial,
            rx: Deque::new(),
        }
    }

    /// Pull from the UART until it would block or our buffer is full.
    pub fn buffer(&mut self) -> Result<(), S::Error> {
        while !self.rx.is_full() {
            match self.serial.read() {
                Ok(b) => {
                    let _ = self.rx.push_back(b);
                }
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(e)) => return Err(e),
            }
        }
        Ok(())
    }

    pub fn into_inner(self) -> S {
        self.serial
    }
}

impl<S> Transport for NbSerial<S>
where
    S: serial::Read + serial::Write,
{
    type Error = S::Error;

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        for &b in bytes {
            nb::block!(self.serial.write(b))?;
        }
        nb::block!(self.serial.flush())
    }

    fn bytes_available(&mut self) -> Result<usize, Self::Error> {
        self.buffer()?;
        Ok(self.rx.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.buffer()?;
        Ok(pop_into(&mut self.rx, buf))
    }
}

/// Adapts an `embedded-io` port that can report read readiness.
#[derive(Debug)]
pub struct IoSerial<P> {
    port: P,
    rx: Deque<u8, RX_BUFFER_SIZE>,
}

impl<P> IoSerial<P>
where
    P: embedded_io::Read + embedded_io::Write + embedded_io::ReadReady,
{
    pub fn new(port: P) -> IoSerial<P> {
        IoSerial {
            port,
            rx: Deque::new(),
        }
    }

    pub fn buffer(&mut self) -> Result<(), P::Error> {
        let mut chunk = [0; 32];
        while !self.rx.is_full() && self.port.read_ready()? {
            let space = (RX_BUFFER_SIZE - self.rx.len()).min(chunk.len());
            let n = self.port.read(&mut chunk[..space])?;
            if n == 0 {
                break;
            }
            for &b in &chunk[..n] {
                let _ = self.rx.push_back(b);
            }
        }
        Ok(())
    }

    pub fn into_inner(self) -> P {
        self.port
    }
}

impl<P> Transport for IoSerial<P>
where
    P: embedded_io::Read + embedded_io::Write + embedded_io::ReadReady,
{
    type Error = P::Error;

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }

    fn bytes_available(&mut self) -> Result<usize, Self::Error> {
        self.buffer()?;
        Ok(self.rx.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.buffer()?;
        Ok(pop_into(&mut self.rx, buf))
    }
}

#[cfg(test)]
mod tests {
    use core::convert::Infallible;
    use std::collections::VecDeque;
    use std::vec::Vec;

    use super::*;

    #[derive(Debug, Default)]
    struct LoopbackUart {
        tx: Vec<u8>,
        rx: VecDeque<u8>,
    }

    impl serial::ErrorType for LoopbackUart {
        type Error = Infallible;
    }

    impl serial::Read for LoopbackUart {
        fn read(&mut self) -> nb::Result<u8, Self::Error> {
            self.rx.pop_front().ok_or(nb::Error::WouldBlock)
        }
    }

    impl serial::Write for LoopbackUart {
        fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
            self.tx.push(word);
            Ok(())
        }

        fn flush(&mut self) -> nb::Result<(), Self::Error> {
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct IoPort {
        tx: Vec<u8>,
        rx: VecDeque<u8>,
    }

    impl embedded_io::ErrorType for IoPort {
        type Error = Infallible;
    }

    impl embedded_io::Read for IoPort {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            let mut n = 0;
            while n < buf.len() {
                match self.rx.pop_front() {
                    Some(b) => buf[n] = b,
                    None => break,
                }
                n += 1;
            }
            Ok(n)
        }
    }

    impl embedded_io::ReadReady for IoPort {
        fn read_ready(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.rx.is_empty())
        }
    }

    impl embedded_io::Write for IoPort {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            self.tx.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[test]
    fn nb_serial_writes_every_byte() {
        let mut t = NbSerial::new(LoopbackUart::default());
        t.write(&[0xAA, 0x02, 0x00, 0xAC]).unwrap();
        assert_eq!(t.into_inner().tx, [0xAA, 0x02, 0x00, 0xAC]);
    }

    #[test]
    fn nb_serial_reports_and_drains_available_bytes() {
        let uart = LoopbackUart {
            rx: VecDeque::from([1, 2, 3, 4, 5]),
            ..Default::default()
        };
        let mut t = NbSerial::new(uart);
        assert_eq!(t.bytes_available().unwrap(), 5);

        let mut buf = [0; 3];
        assert_eq!(t.read(&mut buf).unwrap(), 3);
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(t.bytes_available().unwrap(), 2);
        assert_eq!(t.read(&mut buf).unwrap(), 2);
        assert_eq!(t.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn nb_serial_stops_buffering_when_full() {
        let uart = LoopbackUart {
            rx: (0..100).collect(),
            ..Default::default()
        };
        let mut t = NbSerial::new(uart);
        assert_eq!(t.bytes_available().unwrap(), RX_BUFFER_SIZE);
        let mut buf = [0; RX_BUFFER_SIZE];
        t.read(&mut buf).unwrap();
        assert_eq!(t.bytes_available().unwrap(), 100 - RX_BUFFER_SIZE);
    }

    #[test]
    fn io_serial_round_trip() {
        let port = IoPort {
            rx: VecDeque::from([0xAA, 0x01, 0x01, 0x01, 0xAD]),
            ..Default::default()
        };
        let mut t = IoSerial::new(port);
        t.write(&[0xAA, 0x01, 0x00, 0xAB]).unwrap();
        assert_eq!(t.bytes_available().unwrap(), 5);
        let mut buf = [0; 16];
        assert_eq!(t.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf[..5], &[0xAA, 0x01, 0x01, 0x01, 0xAD]);
        assert_eq!(t.into_inner().tx, [0xAA, 0x01, 0x00, 0xAB]);
    }
}
