use core::fmt::Debug;

use embedded_hal::can::ErrorKind;

use crate::{regs::OpMode, regs::TxbCtrl, timing::TimingNotSupported};

pub type Result<T, SPIE, CSE> = core::result::Result<T, Error<SPIE, CSE>>;

#[derive(Debug)]
pub enum Error<SPIE, CSE> {
    /// SPI transfer failed.
    Spi(SPIE),
    /// Chip select pin could not be driven.
    Hal(CSE),
    /// CANCTRL did not read back the requested mode. The chip's mode is
    /// unknown until the next successful transition.
    ModeTransition { requested: OpMode },
    /// No bit timing entry for this oscillator frequency and bit rate.
    TimingNotSupported { oscillator_hz: u32, bit_rate: u32 },
    /// ABTF, MLOA or TXERR remained set after transmission finished.
    TxFailed(TxbCtrl),
    /// TXB0 still had a transmission pending, nothing was loaded.
    TxBusy,
    /// TXREQ did not clear before the deadline. The pending transmission was
    /// aborted.
    TxTimeout,
    /// No message pending in either receive buffer.
    NoMessage,
    /// SPI clock above what the chip accepts.
    InvalidSpiFrequency(u32),
}

impl<SPIE, CSE> From<TimingNotSupported> for Error<SPIE, CSE> {
    fn from(e: TimingNotSupported) -> Self {
        Error::TimingNotSupported {
            oscillator_hz: e.oscillator_hz,
            bit_rate: e.bit_rate,
        }
    }
}

impl<SPIE: Debug, CSE: Debug> embedded_hal::can::Error for Error<SPIE, CSE> {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}
