//! Bit timing configuration.
//!
//! The CNF1/CNF2/CNF3 values are taken from a fixed table keyed by the
//! oscillator frequency and the bus bit rate. Only exact matches are
//! accepted; there is no attempt to derive timings for other combinations.

use crate::regs::{Cnf1, Cnf2, Cnf3};

/// Values for the three bit timing registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "ufmt", derive(ufmt::derive::uDebug))]
pub struct TimingConfig {
    pub cnf1: u8,
    pub cnf2: u8,
    pub cnf3: u8,
}

/// No table entry for the requested oscillator frequency and bit rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "ufmt", derive(ufmt::derive::uDebug))]
pub struct TimingNotSupported {
    pub oscillator_hz: u32,
    pub bit_rate: u32,
}

const fn row(oscillator_hz: u32, bit_rate: u32, cnf: [u8; 3]) -> (u32, u32, TimingConfig) {
    (
        oscillator_hz,
        bit_rate,
        TimingConfig {
            cnf1: cnf[0],
            cnf2: cnf[1],
            cnf3: cnf[2],
        },
    )
}

/// `(oscillator Hz, bit rate, CNF1..3)`.
#[rustfmt::skip]
pub const TIMING_TABLE: [(u32, u32, TimingConfig); 24] = [
    row( 8_000_000, 1_000_000, [0x00, 0x80, 0x00]),
    row( 8_000_000,   500_000, [0x00, 0x90, 0x02]),
    row( 8_000_000,   250_000, [0x00, 0xB1, 0x05]),
    row( 8_000_000,   200_000, [0x00, 0xB4, 0x06]),
    row( 8_000_000,   125_000, [0x01, 0xB1, 0x05]),
    row( 8_000_000,   100_000, [0x01, 0xB4, 0x06]),
    row( 8_000_000,    80_000, [0x01, 0xBF, 0x07]),
    row( 8_000_000,    50_000, [0x03, 0xB4, 0x06]),
    row( 8_000_000,    40_000, [0x03, 0xBF, 0x07]),
    row( 8_000_000,    20_000, [0x07, 0xBF, 0x07]),
    row( 8_000_000,    10_000, [0x0F, 0xBF, 0x07]),
    row( 8_000_000,     5_000, [0x1F, 0xBF, 0x07]),

    row(16_000_000, 1_000_000, [0x00, 0xD0, 0x82]),
    row(16_000_000,   500_000, [0x00, 0xF0, 0x86]),
    row(16_000_000,   250_000, [0x41, 0xF1, 0x85]),
    row(16_000_000,   200_000, [0x01, 0xFA, 0x87]),
    row(16_000_000,   125_000, [0x03, 0xF0, 0x86]),
    row(16_000_000,   100_000, [0x03, 0xFA, 0x87]),
    row(16_000_000,    80_000, [0x03, 0xFF, 0x87]),
    row(16_000_000,    50_000, [0x07, 0xFA, 0x87]),
    row(16_000_000,    40_000, [0x07, 0xFF, 0x87]),
    row(16_000_000,    20_000, [0x0F, 0xFF, 0x87]),
    row(16_000_000,    10_000, [0x1F, 0xFF, 0x87]),
    row(16_000_000,     5_000, [0x3F, 0xFF, 0x87]),
];

impl TimingConfig {
    /// Looks up the register values for `bit_rate` on a chip clocked at
    /// `oscillator_hz`.
    pub fn select(oscillator_hz: u32, bit_rate: u32) -> Result<Self, TimingNotSupported> {
        TIMING_TABLE
            .iter()
            .find(|(osc, rate, _)| *osc == oscillator_hz && *rate == bit_rate)
            .map(|(_, _, cnf)| *cnf)
            .ok_or(TimingNotSupported {
                oscillator_hz,
                bit_rate,
            })
    }

    #[inline]
    pub fn cnf1(&self) -> Cnf1 {
        Cnf1::from_bytes([self.cnf1])
    }

    #[inline]
    pub fn cnf2(&self) -> Cnf2 {
        Cnf2::from_bytes([self.cnf2])
    }

    #[inline]
    pub fn cnf3(&self) -> Cnf3 {
        Cnf3::from_bytes([self.cnf3])
    }
}
