//! Transmit and receive buffers.
//!
//! Every buffer occupies 16 bytes of register space starting at its `CTRL`
//! register. The rest is only accessed through the LOAD TX BUFFER and READ RX
//! BUFFER instructions, which address it sequentially from `SIDH`.

use crate::regs::{CanIntf, RecvBufOpMode, Rxb0Ctrl, Rxb1Ctrl};

const TXB_BASE: u8 = 0x30;
const RXB_BASE: u8 = 0x60;
const BUF_STRIDE: u8 = 0x10;

bank_def! {
    /// Transmit buffer.
    TxBuf {
        /// TXB0
        B0 = 0,
        /// TXB1
        B1 = 1,
        /// TXB2
        B2 = 2
    }
}

impl TxBuf {
    /// Address of `TXBnCTRL`.
    pub const fn ctrl(self) -> u8 {
        TXB_BASE + BUF_STRIDE * self.index()
    }

    /// LOAD TX BUFFER instruction, starting the sequential write at `TXBnSIDH`.
    pub const fn load_instruction(self) -> u8 {
        0b0100_0000 | (self.index() << 1)
    }

    /// RTS instruction, which sets `TXREQ` for this buffer and clears its
    /// `ABTF`, `MLOA` and `TXERR` bits.
    pub const fn rts_instruction(self) -> u8 {
        0b1000_0000 | (1 << self.index())
    }

    /// `TXnIF` bit of `CANINTF` belonging to this buffer.
    pub const fn intf_mask(self) -> CanIntf {
        match self {
            TxBuf::B0 => CanIntf::MASK_TX0IF,
            TxBuf::B1 => CanIntf::MASK_TX1IF,
            TxBuf::B2 => CanIntf::MASK_TX2IF,
        }
    }
}

bank_def! {
    /// Receive buffer.
    RxBuf {
        /// RXB0
        B0 = 0,
        /// RXB1
        B1 = 1
    }
}

impl RxBuf {
    /// Address of `RXBnCTRL`.
    pub const fn ctrl(self) -> u8 {
        RXB_BASE + BUF_STRIDE * self.index()
    }

    /// READ RX BUFFER instruction, starting the sequential read at `RXBnSIDH`.
    pub const fn read_instruction(self) -> u8 {
        0x90 | (self.index() * 0x04)
    }

    /// Content written to `RXBnCTRL` for a receive mode. Rollover only exists
    /// on RXB0 and is ignored for RXB1.
    pub fn ctrl_value(self, rxm: RecvBufOpMode, rollover: bool) -> u8 {
        match self {
            RxBuf::B0 => Rxb0Ctrl::new().with_rxm(rxm).with_bukt(rollover).into_bytes()[0],
            RxBuf::B1 => Rxb1Ctrl::new().with_rxm(rxm).into_bytes()[0],
        }
    }

    /// `RXnIF` bit of `CANINTF` belonging to this buffer.
    pub const fn intf_mask(self) -> CanIntf {
        match self {
            RxBuf::B0 => CanIntf::MASK_RX0IF,
            RxBuf::B1 => CanIntf::MASK_RX1IF,
        }
    }
}
