//! MCP2515 registers.
//!
//! Only the fixed, single-instance registers live in [`Register`]. The
//! indexed families (acceptance filters, masks, Tx and Rx buffers) compute
//! their addresses from a base and an index, see [`crate::filter`] and
//! [`crate::buffer`].

use modular_bitfield::prelude::*;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "ufmt", derive(ufmt::derive::uDebug))]
pub enum Register {
    BFPCTRL = 0x0C,
    TXRTSCTRL = 0x0D,
    CANSTAT = 0x0E,
    CANCTRL = 0x0F,
    TEC = 0x1C,
    REC = 0x1D,
    CNF3 = 0x28,
    CNF2 = 0x29,
    CNF1 = 0x2A,
    CANINTE = 0x2B,
    /// Interrupt flags. Must only be changed with the BIT MODIFY instruction,
    /// the chip sets flags concurrently.
    CANINTF = 0x2C,
    EFLG = 0x2D,
}

impl From<Register> for u8 {
    #[inline]
    fn from(reg: Register) -> u8 {
        reg as u8
    }
}

/// A single byte register with a typed layout.
pub trait Reg: Copy {
    /// Address of the register.
    const ADDRESS: Register;

    /// Read the register from its raw content.
    fn from_byte(content: u8) -> Self;

    /// Raw content of the register.
    fn into_byte(self) -> u8;
}

/// Marker trait implemented on registers which support the BIT MODIFY
/// instruction.
pub trait BitModifiable: Reg {}

#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanCtrl {
    /// CLKOUT prescaler
    pub clkpre: ClkPre,
    /// CLKOUT enable
    pub clken: bool,
    /// One-shot mode
    pub osm: bool,
    /// Abort all pending transmissions
    pub abat: bool,
    /// Request operation mode
    pub reqop: OpMode,
}

impl CanCtrl {
    /// Mask to modify the `reqop` bits.
    pub const MASK_REQOP: Self = Self::from_bytes([0b1110_0000]);
    /// Mask to modify the `abat` bit.
    pub const MASK_ABAT: Self = Self::from_bytes([0b0001_0000]);
}

impl BitModifiable for CanCtrl {}

#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanStat {
    #[skip]
    __: B1,
    #[skip(setters)]
    pub icod: IntFlagCode,
    #[skip]
    __: B1,
    #[skip(setters)]
    pub opmod: OpMode,
}

#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanIntf {
    pub rx0if: bool,
    pub rx1if: bool,
    pub tx0if: bool,
    pub tx1if: bool,
    pub tx2if: bool,
    pub errif: bool,
    pub wakif: bool,
    pub merrf: bool,
}

impl CanIntf {
    pub const MASK_RX0IF: Self = Self::from_bytes([0b0000_0001]);
    pub const MASK_RX1IF: Self = Self::from_bytes([0b0000_0010]);
    pub const MASK_TX0IF: Self = Self::from_bytes([0b0000_0100]);
    pub const MASK_TX1IF: Self = Self::from_bytes([0b0000_1000]);
    pub const MASK_TX2IF: Self = Self::from_bytes([0b0001_0000]);
    pub const MASK_WAKIF: Self = Self::from_bytes([0b0100_0000]);
}

impl BitModifiable for CanIntf {}

#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanInte {
    pub rx0ie: bool,
    pub rx1ie: bool,
    pub tx0ie: bool,
    pub tx1ie: bool,
    pub tx2ie: bool,
    pub errie: bool,
    pub wakie: bool,
    pub merre: bool,
}

impl CanInte {
    pub const MASK_WAKIE: Self = Self::from_bytes([0b0100_0000]);
}

impl BitModifiable for CanInte {}

#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cnf1 {
    pub brp: B6,
    pub sjw: SyncJumpWidth,
}

#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cnf2 {
    pub prseg: B3,
    pub phseg1: B3,
    pub sam: bool,
    pub btlmode: bool,
}

#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cnf3 {
    pub phseg2: B3,
    #[skip]
    __: B3,
    pub wakfil: bool,
    pub sof: bool,
}

#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rxb0Ctrl {
    /// Filter hit.
    #[skip(setters)]
    pub filhit0: bool,
    /// Read-only copy of the BUKT bit (used internally by MCP2515).
    #[skip(setters)]
    pub bukt1: bool,
    /// Rollover enable: a full RXB0 spills into RXB1.
    pub bukt: bool,
    /// Received remote transfer request.
    #[skip(setters)]
    pub rxrtr: bool,
    #[skip]
    __: B1,
    /// Receive buffer operating mode.
    pub rxm: RecvBufOpMode,
    #[skip]
    __: B1,
}

#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rxb1Ctrl {
    /// Filter hit.
    #[skip(setters)]
    pub filhit: FilterHit,
    /// Received remote transfer request.
    #[skip(setters)]
    pub rxrtr: bool,
    #[skip]
    __: B1,
    /// Receive buffer operating mode.
    pub rxm: RecvBufOpMode,
    #[skip]
    __: B1,
}

#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxbCtrl {
    pub txp: TxBufPriority,
    #[skip]
    __: B1,
    /// Transmission pending.
    pub txreq: bool,
    /// A bus error occurred while the message was being transmitted.
    #[skip(setters)]
    pub txerr: bool,
    /// Message lost arbitration.
    #[skip(setters)]
    pub mloa: bool,
    /// Message was aborted.
    #[skip(setters)]
    pub abtf: bool,
    #[skip]
    __: B1,
}

impl TxbCtrl {
    /// Mask to modify the `txreq` bit.
    pub const MASK_TXREQ: Self = Self::from_bytes([0b0000_1000]);

    /// Whether any of ABTF, MLOA or TXERR is set.
    #[inline]
    pub fn failed(&self) -> bool {
        self.abtf() || self.mloa() || self.txerr()
    }
}

///////////////////
/// Enums
///////////////////

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, BitfieldSpecifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[bits = 2]
pub enum TxBufPriority {
    Low,
    LowIntermediate,
    HighIntermediate,
    High,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, BitfieldSpecifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[bits = 3]
pub enum FilterHit {
    /// Acceptance filter 0 (only if the BUKT bit is set in RXB0CTRL).
    Filter0,
    /// Acceptance filter 1 (only if the BUKT bit is set in RXB0CTRL).
    Filter1,
    Filter2,
    Filter3,
    Filter4,
    Filter5,
}

/// Receive buffer operating mode (RXM bits of RXBnCTRL).
///
/// The two single-bit settings are documented on older revisions of the
/// datasheet only. Newer revisions mark them reserved.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, BitfieldSpecifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "ufmt", derive(ufmt::derive::uDebug))]
#[bits = 2]
pub enum RecvBufOpMode {
    /// Receives all valid messages that meet the filter criteria.
    FilterOn = 0x0,
    /// Only accept messages with standard identifiers (RXM0).
    StandardOnly = 0x1,
    /// Only accept messages with extended identifiers (RXM1).
    ExtendedOnly = 0x2,
    /// Turns masks/filters off; receives any message.
    FilterOff = 0x3,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, BitfieldSpecifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[bits = 2]
pub enum SyncJumpWidth {
    Tq1,
    Tq2,
    Tq3,
    Tq4,
}

/// Operation mode, as requested through REQOP and reported through OPMOD.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, BitfieldSpecifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "ufmt", derive(ufmt::derive::uDebug))]
#[bits = 3]
pub enum OpMode {
    Normal,
    Sleep,
    Loopback,
    ListenOnly,
    Configuration,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, BitfieldSpecifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[bits = 2]
pub enum ClkPre {
    Div1,
    Div2,
    Div4,
    Div8,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, BitfieldSpecifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[bits = 3]
pub enum IntFlagCode {
    None,
    Error,
    WakeUp,
    TXB0,
    TXB1,
    TXB2,
    RXB0,
    RXB1,
}

macro_rules! reg {
    ($($s:ty => $reg:expr),*) => {
        $(
            impl Reg for $s {
                const ADDRESS: Register = $reg;

                #[inline]
                fn from_byte(content: u8) -> Self {
                    Self::from_bytes([content])
                }

                #[inline]
                fn into_byte(self) -> u8 {
                    self.into_bytes()[0]
                }
            }
        )*
    };
}

reg! {
    CanCtrl => Register::CANCTRL,
    CanStat => Register::CANSTAT,
    CanIntf => Register::CANINTF,
    CanInte => Register::CANINTE,
    Cnf1 => Register::CNF1,
    Cnf2 => Register::CNF2,
    Cnf3 => Register::CNF3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reqop_occupies_top_three_bits() {
        for (mode, bits) in [
            (OpMode::Normal, 0x00),
            (OpMode::Sleep, 0x20),
            (OpMode::Loopback, 0x40),
            (OpMode::ListenOnly, 0x60),
            (OpMode::Configuration, 0x80),
        ] {
            assert_eq!(CanCtrl::new().with_reqop(mode).into_byte(), bits);
        }
        assert_eq!(CanCtrl::new().with_abat(true).into_byte(), 0x10);
    }

    #[test]
    fn rx_buffer_mode_bits() {
        let std_only = Rxb0Ctrl::new().with_rxm(RecvBufOpMode::StandardOnly);
        assert_eq!(std_only.into_bytes(), [0x20]);
        let ext_only = Rxb1Ctrl::new().with_rxm(RecvBufOpMode::ExtendedOnly);
        assert_eq!(ext_only.into_bytes(), [0x40]);
        let off = Rxb1Ctrl::new().with_rxm(RecvBufOpMode::FilterOff);
        assert_eq!(off.into_bytes(), [0x60]);
        assert_eq!(Rxb0Ctrl::new().with_bukt(true).into_bytes(), [0x04]);
    }

    #[test]
    fn txb_ctrl_failure_bits() {
        assert!(!TxbCtrl::from_bytes([0x08]).failed());
        assert!(TxbCtrl::from_bytes([0x10]).failed());
        assert!(TxbCtrl::from_bytes([0x20]).failed());
        assert!(TxbCtrl::from_bytes([0x40]).failed());
        assert!(TxbCtrl::from_bytes([0x18]).txreq());
    }

    #[test]
    fn canstat_invalid_mode_is_an_error() {
        assert_eq!(CanStat::from_bytes([0x80]).opmod_or_err(), Ok(OpMode::Configuration));
        assert!(CanStat::from_bytes([0xE0]).opmod_or_err().is_err());
    }
}
