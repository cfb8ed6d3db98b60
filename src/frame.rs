//! CAN frames and their register encoding.
//!
//! The chip stores an arbitration id in four consecutive registers, `SIDH`,
//! `SIDL`, `EID8` and `EID0`, followed by `DLC` and up to eight data bytes in
//! Tx and Rx buffers. Filters and masks reuse the same four-register id
//! layout.

use embedded_hal::can::{ExtendedId, Frame, Id, StandardId};
use modular_bitfield::prelude::*;

/// Number of id registers (`SIDH`, `SIDL`, `EID8`, `EID0`).
pub const ID_LEN: usize = 4;
/// Number of header registers, the id registers followed by `DLC`.
pub const HEADER_LEN: usize = ID_LEN + 1;
/// Largest on-wire encoding of a frame: header plus eight data bytes.
pub const MAX_ENCODED_LEN: usize = HEADER_LEN + 8;

const STANDARD_MASK: u32 = 0x7FF;
const EXTENDED_MASK: u32 = 0x1FFF_FFFF;

/// Identifier width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "ufmt", derive(ufmt::derive::uDebug))]
pub enum IdKind {
    /// 11-bit identifier.
    Standard,
    /// 29-bit identifier.
    Extended,
}

impl IdKind {
    /// Truncates a raw identifier to the width of this kind.
    #[inline]
    pub const fn truncate(self, raw: u32) -> u32 {
        match self {
            IdKind::Standard => raw & STANDARD_MASK,
            IdKind::Extended => raw & EXTENDED_MASK,
        }
    }
}

/// Identifier registers.
///
/// Occupies 4 registers. Fields are listed LSB first, so `into_bytes` yields
/// `EID0, EID8, SIDL, SIDH`; use [`IdRegs::to_wire`] for register order.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IdRegs {
    /// Extended identifier bits 17:0.
    pub eid: B18,
    #[skip]
    __: B1,
    /// Extended identifier enable (IDE on received frames).
    pub exide: bool,
    /// Standard remote request, only meaningful on received standard frames.
    pub srr: bool,
    /// Standard identifier, or bits 28:18 of an extended identifier.
    pub sid: B11,
}

impl IdRegs {
    /// Encodes a raw identifier, truncated to the width of `kind`.
    pub fn from_raw(raw: u32, kind: IdKind) -> Self {
        let raw = kind.truncate(raw);
        match kind {
            IdKind::Standard => IdRegs::new().with_sid(raw as u16),
            IdKind::Extended => IdRegs::new()
                .with_exide(true)
                .with_eid(raw & 0x3FFFF) // Lower 18 bits in EID
                .with_sid((raw >> 18) as u16), // Upper 11 bits in SID
        }
    }

    /// Encodes a CAN identifier.
    pub fn from_id(id: Id) -> Self {
        match id {
            Id::Standard(id) => Self::from_raw(id.as_raw() as u32, IdKind::Standard),
            Id::Extended(id) => Self::from_raw(id.as_raw(), IdKind::Extended),
        }
    }

    /// Decodes the identifier, using the IDE bit to pick its width.
    pub fn id(&self) -> Id {
        if self.exide() {
            let raw = ((self.sid() as u32) << 18) | self.eid();
            // 29 bits by construction
            Id::Extended(ExtendedId::new(raw).unwrap_or(ExtendedId::ZERO))
        } else {
            // 11 bits by construction
            Id::Standard(StandardId::new(self.sid()).unwrap_or(StandardId::ZERO))
        }
    }

    /// Registers in bus order: `SIDH, SIDL, EID8, EID0`.
    #[inline]
    pub fn to_wire(self) -> [u8; ID_LEN] {
        let [eid0, eid8, sidl, sidh] = self.into_bytes();
        [sidh, sidl, eid8, eid0]
    }

    /// Parses registers given in bus order: `SIDH, SIDL, EID8, EID0`.
    #[inline]
    pub fn from_wire(wire: [u8; ID_LEN]) -> Self {
        let [sidh, sidl, eid8, eid0] = wire;
        Self::from_bytes([eid0, eid8, sidl, sidh])
    }
}

/// `DLC` register of a Tx or Rx buffer.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DlcReg {
    /// Data length code. Values above 8 are stored by the chip as is.
    pub dlc: B4,
    #[skip]
    __: B2,
    /// Remote transmission request (extended frames on receive).
    pub rtr: bool,
    #[skip]
    __: B1,
}

/// CAN frame.
#[derive(Debug, Clone, Copy)]
pub struct CanFrame {
    /// ID of CAN frame.
    pub(crate) id: Id,
    /// Whether the frame is an RTR frame.
    pub(crate) rtr: bool,
    /// Data length code. For remote frames this is the requested length.
    pub(crate) dlc: u8,
    /// Data, maximum 8 bytes.
    pub(crate) data: [u8; 8],
}

#[cfg(feature = "defmt")]
impl defmt::Format for CanFrame {
    fn format(&self, fmt: defmt::Formatter) {
        // [`Id`] does not implement `defmt::Format`
        #[derive(defmt::Format)]
        enum InnerId {
            Standard(u16),
            Extended(u32),
        }

        defmt::write!(
            fmt,
            "CanFrame {{ id: {:#X}, rtr: {}, dlc: {}, data: {:#X} }}",
            match self.id {
                Id::Standard(id) => InnerId::Standard(id.as_raw()),
                Id::Extended(id) => InnerId::Extended(id.as_raw()),
            },
            self.rtr,
            self.dlc,
            self.data()
        );
    }
}

impl PartialEq for CanFrame {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.rtr == other.rtr
            && self.dlc == other.dlc
            && self.data() == other.data()
    }
}

impl Eq for CanFrame {}

impl CanFrame {
    /// Number of payload bytes carried on the wire. Remote frames carry none
    /// regardless of their DLC, and the chip holds at most eight.
    #[inline]
    pub fn payload_len(&self) -> usize {
        if self.rtr {
            0
        } else {
            (self.dlc as usize).min(8)
        }
    }

    /// Header registers in bus order: `SIDH, SIDL, EID8, EID0, DLC`.
    ///
    /// A standard remote frame flags RTR in both `DLC` and the SRR bit of
    /// `SIDL`, so the header decodes the way the chip reports it on receive.
    /// The chip ignores SRR in Tx buffers.
    pub fn header(&self) -> [u8; HEADER_LEN] {
        let ident = IdRegs::from_id(self.id);
        let ident = ident.with_srr(self.rtr && !ident.exide());
        let [sidh, sidl, eid8, eid0] = ident.to_wire();
        let dlc = DlcReg::new().with_dlc(self.dlc & 0x0F).with_rtr(self.rtr);
        [sidh, sidl, eid8, eid0, dlc.into_bytes()[0]]
    }

    /// Builds a frame from header registers read from an Rx buffer. The
    /// payload is left zeroed, [`CanFrame::payload_len`] tells how many data
    /// bytes follow on the wire.
    pub fn from_header(header: [u8; HEADER_LEN]) -> Self {
        let [sidh, sidl, eid8, eid0, dlc] = header;
        let ident = IdRegs::from_wire([sidh, sidl, eid8, eid0]);
        let dlc = DlcReg::from_bytes([dlc]);
        // Standard frames flag RTR through SRR, extended frames through DLC.
        let rtr = if ident.exide() { dlc.rtr() } else { ident.srr() };
        CanFrame {
            id: ident.id(),
            rtr,
            dlc: dlc.dlc(),
            data: [0; 8],
        }
    }

    /// Mutable access to the payload bytes present on the wire.
    #[inline]
    pub(crate) fn payload_mut(&mut self) -> &mut [u8] {
        let len = self.payload_len();
        &mut self.data[..len]
    }

    /// Encodes the frame into `out` as it is written with LOAD TX BUFFER:
    /// header registers followed by the payload. Returns the number of bytes
    /// used (5 to 13).
    pub fn encode(&self, out: &mut [u8; MAX_ENCODED_LEN]) -> usize {
        out[..HEADER_LEN].copy_from_slice(&self.header());
        let len = self.payload_len();
        out[HEADER_LEN..HEADER_LEN + len].copy_from_slice(&self.data[..len]);
        HEADER_LEN + len
    }

    /// Decodes a frame from header registers followed by payload bytes.
    ///
    /// Returns `None` when `bytes` is shorter than the header plus the payload
    /// the header announces.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let header: [u8; HEADER_LEN] = bytes.get(..HEADER_LEN)?.try_into().ok()?;
        let mut frame = Self::from_header(header);
        let len = frame.payload_len();
        let payload = bytes.get(HEADER_LEN..HEADER_LEN + len)?;
        frame.payload_mut().copy_from_slice(payload);
        Some(frame)
    }
}

impl Frame for CanFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        if data.len() > 8 {
            return None;
        }
        let mut frame = CanFrame {
            id: id.into(),
            rtr: false,
            dlc: data.len() as u8, // Already asserted data.len() <= 8
            data: [0; 8],
        };
        frame.data[..data.len()].copy_from_slice(data);
        Some(frame)
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > 8 {
            return None;
        }
        Some(CanFrame {
            id: id.into(),
            rtr: true,
            dlc: dlc as u8, // Already asserted dlc <= 8
            data: [0; 8],
        })
    }

    #[inline]
    fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    #[inline]
    fn is_remote_frame(&self) -> bool {
        self.rtr
    }

    #[inline]
    fn id(&self) -> Id {
        self.id
    }

    #[inline]
    fn dlc(&self) -> usize {
        self.dlc as usize
    }

    #[inline]
    fn data(&self) -> &[u8] {
        &self.data[..self.payload_len()]
    }
}
