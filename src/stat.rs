//! Status bytes returned by the quick status instructions, and the error
//! flag register.

use bitflags::bitflags;
use modular_bitfield::prelude::*;

/// Byte returned by the READ STATUS instruction.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    #[skip(setters)]
    pub rx0if: bool,
    #[skip(setters)]
    pub rx1if: bool,
    #[skip(setters)]
    pub tx0req: bool,
    #[skip(setters)]
    pub tx0if: bool,
    #[skip(setters)]
    pub tx1req: bool,
    #[skip(setters)]
    pub tx1if: bool,
    #[skip(setters)]
    pub tx2req: bool,
    #[skip(setters)]
    pub tx2if: bool,
}

/// Byte returned by the RX STATUS instruction.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxStatus {
    /// Filter that accepted the most recent message.
    #[skip(setters)]
    pub filter_match: B3,
    /// Most recent message was a remote frame.
    #[skip(setters)]
    pub remote: bool,
    /// Most recent message had an extended identifier.
    #[skip(setters)]
    pub extended: bool,
    #[skip]
    __: B1,
    /// Message pending in RXB0.
    #[skip(setters)]
    pub rx0: bool,
    /// Message pending in RXB1.
    #[skip(setters)]
    pub rx1: bool,
}

bitflags! {
    /// Error flags (EFLG).
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct ErrorFlags: u8 {
        /// Error warning, TEC or REC at or above 96.
        const EWARN = 0x01;
        /// Receive error warning, REC at or above 96.
        const RXWAR = 0x02;
        /// Transmit error warning, TEC at or above 96.
        const TXWAR = 0x04;
        /// Receive error-passive, REC at or above 128.
        const RXEP = 0x08;
        /// Transmit error-passive, TEC at or above 128.
        const TXEP = 0x10;
        /// Bus-off, TEC reached 255.
        const TXBO = 0x20;
        /// RXB0 overflow.
        const RX0OVR = 0x40;
        /// RXB1 overflow.
        const RX1OVR = 0x80;
    }
}

/// Transmit and receive error counters (TEC and REC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "ufmt", derive(ufmt::derive::uDebug))]
pub struct ErrorCounters {
    pub tec: u8,
    pub rec: u8,
}
