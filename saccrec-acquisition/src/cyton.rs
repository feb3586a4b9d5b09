//! OpenBCI Cyton over a serial line.

use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use saccrec_core::hardware::CHANNEL_COUNT;
use saccrec_core::{ChannelConfig, Gain, SampleRate};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::board::{Board, RawSample};
use crate::error::AcquisitionError;

pub const BAUD_RATE: u32 = 115_200;
pub const PACKET_LEN: usize = 33;
const HEADER: u8 = 0xA0;
const HANDSHAKE_END: &[u8] = b"$$$";
const READ_TIMEOUT: Duration = Duration::from_millis(100);
const REFERENCE_VOLTS: f64 = 4.5;
const FULL_SCALE: f64 = 8_388_607.0; // 2^23 - 1

/// Converts a raw ADS1299 count into microvolts for the given gain.
pub fn scale_to_microvolts(raw: i32, gain: Gain) -> f64 {
    f64::from(raw) * REFERENCE_VOLTS / f64::from(gain.factor()) / FULL_SCALE * 1_000_000.0
}

fn decode_i24(bytes: &[u8]) -> i32 {
    let raw = (i32::from(bytes[0]) << 16) | (i32::from(bytes[1]) << 8) | i32::from(bytes[2]);
    if raw & 0x80_0000 != 0 { raw - 0x100_0000 } else { raw }
}

fn is_footer(byte: u8) -> bool {
    (0xC0..=0xCF).contains(&byte)
}

/// Reassembles 33-byte packets from arbitrarily split serial reads.
#[derive(Debug, Default)]
pub struct PacketParser {
    buffer: Vec<u8>,
    dropped: usize,
}

impl PacketParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes discarded while resynchronizing on a packet header.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn push(&mut self, bytes: &[u8], gains: &[Gain; CHANNEL_COUNT]) -> Vec<RawSample> {
        self.buffer.extend_from_slice(bytes);
        let mut samples = Vec::new();
        let mut start = 0;

        while self.buffer.len() - start >= PACKET_LEN {
            let packet = &self.buffer[start..start + PACKET_LEN];
            if packet[0] != HEADER || !is_footer(packet[PACKET_LEN - 1]) {
                start += 1;
                self.dropped += 1;
                continue;
            }

            let mut channels = [0.0; CHANNEL_COUNT];
            for (ch, value) in channels.iter_mut().enumerate() {
                let offset = 2 + ch * 3;
                *value = scale_to_microvolts(decode_i24(&packet[offset..offset + 3]), gains[ch]);
            }
            samples.push(RawSample {
                index: packet[1],
                channels,
            });
            start += PACKET_LEN;
        }

        self.buffer.drain(..start);
        samples
    }
}

/// Channel settings command: power up with the configured gain, normal
/// input, no bias, SRB2 connected, SRB1 disconnected. Inactive channels are
/// powered down with their single-character command.
pub fn channel_command(channel: usize, active: bool, gain: Gain) -> Vec<u8> {
    const POWER_DOWN: &[u8; CHANNEL_COUNT] = b"12345678";
    if !active {
        return vec![POWER_DOWN[channel]];
    }
    let number = POWER_DOWN[channel] as char;
    format!("x{number}0{}0010X", gain.cyton_code()).into_bytes()
}

pub fn sample_rate_command(rate: SampleRate) -> Vec<u8> {
    format!("~{}", rate.cyton_code()).into_bytes()
}

pub struct CytonBoard<P: Read + Write> {
    port: P,
    parser: PacketParser,
    gains: [Gain; CHANNEL_COUNT],
    streaming: bool,
}

impl CytonBoard<Box<dyn SerialPort>> {
    /// Opens `path` at 115200 baud, 8N1, and runs the handshake.
    pub fn open(
        path: &str,
        rate: SampleRate,
        channels: &ChannelConfig,
    ) -> Result<Self, AcquisitionError> {
        let not_connected =
            |err: serialport::Error| AcquisitionError::DeviceNotConnected(format!("{path}: {err}"));
        let port = serialport::new(path, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(not_connected)?;
        port.clear(ClearBuffer::All).map_err(not_connected)?;
        tracing::info!(port = %path, baud = BAUD_RATE, "serial port opened");
        Self::connect(port, rate, channels, Duration::from_secs(3))
    }
}

impl<P: Read + Write> CytonBoard<P> {
    /// Resets the board over `port`, waits for its banner and pushes the
    /// sample rate and channel configuration.
    pub fn connect(
        port: P,
        rate: SampleRate,
        channels: &ChannelConfig,
        handshake_timeout: Duration,
    ) -> Result<Self, AcquisitionError> {
        let mut board = Self {
            port,
            parser: PacketParser::new(),
            gains: channels.channels().map(|c| c.gain),
            streaming: false,
        };

        board.command(b"v")?;
        board.await_banner(handshake_timeout)?;

        board.command(&sample_rate_command(rate))?;
        board.await_banner(handshake_timeout)?;

        for (ch, setting) in channels.channels().iter().enumerate() {
            board.command(&channel_command(ch, setting.active, setting.gain))?;
        }
        tracing::info!(%rate, active = channels.active_count(), "cyton configured");
        Ok(board)
    }

    fn command(&mut self, bytes: &[u8]) -> Result<(), AcquisitionError> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }

    fn await_banner(&mut self, timeout: Duration) -> Result<String, AcquisitionError> {
        let deadline = Instant::now() + timeout;
        let mut reply = Vec::new();
        let mut chunk = [0u8; 256];
        while Instant::now() < deadline {
            match self.port.read(&mut chunk) {
                Ok(0) => std::thread::sleep(Duration::from_millis(5)),
                Ok(n) => {
                    reply.extend_from_slice(&chunk[..n]);
                    if reply.ends_with(HANDSHAKE_END) {
                        let text = String::from_utf8_lossy(&reply).into_owned();
                        tracing::debug!(reply = %text.trim(), "cyton replied");
                        return Ok(text);
                    }
                }
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted) => {}
                Err(err) => return Err(err.into()),
            }
        }
        Err(AcquisitionError::DeviceNotConnected(
            "no handshake from board".into(),
        ))
    }
}

impl<P: Read + Write> Board for CytonBoard<P> {
    fn start_stream(&mut self) -> Result<(), AcquisitionError> {
        self.command(b"b")?;
        self.streaming = true;
        Ok(())
    }

    fn read(&mut self) -> Result<Vec<RawSample>, AcquisitionError> {
        if !self.streaming {
            return Ok(Vec::new());
        }
        let mut chunk = [0u8; PACKET_LEN * 32];
        let n = match self.port.read(&mut chunk) {
            Ok(n) => n,
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted) => 0,
            Err(err) => return Err(err.into()),
        };
        Ok(self.parser.push(&chunk[..n], &self.gains))
    }

    fn stop_stream(&mut self) -> Result<(), AcquisitionError> {
        if self.streaming {
            self.command(b"s")?;
            self.streaming = false;
            if self.parser.dropped() > 0 {
                tracing::warn!(dropped = self.parser.dropped(), "discarded bytes while streaming");
            }
        }
        Ok(())
    }
}
