//! Acceptance filters and masks.
//!
//! RXB0 is gated by mask 0 and filters 0-1, RXB1 by mask 1 and filters 2-5.
//! Filters and masks use the same `SIDH`, `SIDL`, `EID8`, `EID0` id layout
//! as the Tx/Rx buffers, see [`IdRegs`].

use crate::frame::{IdKind, IdRegs, ID_LEN};

bank_def! {
    /// Receive filters.
    RxFilter {
        /// RXF0
        F0 = 0,
        /// RXF1
        F1 = 1,
        /// RXF2
        F2 = 2,
        /// RXF3
        F3 = 3,
        /// RXF4
        F4 = 4,
        /// RXF5
        F5 = 5
    }
}

impl RxFilter {
    /// Address of `RXFnSIDH`. There is a 4-register gap (CANSTAT, CANCTRL and
    /// the pin control registers) between RXF2EID0 and RXF3SIDH.
    pub const fn sidh(self) -> u8 {
        let n = self.index();
        let slot = if n >= 3 { n + 1 } else { n };
        slot * ID_LEN as u8
    }

    /// Addresses of `SIDH`, `SIDL`, `EID8`, `EID0` (in that order).
    pub const fn registers(self) -> [u8; ID_LEN] {
        let base = self.sidh();
        [base, base + 1, base + 2, base + 3]
    }
}

bank_def! {
    /// Receive masks.
    RxMask {
        /// Mask 0, applies to RXB0.
        Mask0 = 0,
        /// Mask 1, applies to RXB1.
        Mask1 = 1
    }
}

impl RxMask {
    /// Address of `RXMnSIDH`.
    pub const fn sidh(self) -> u8 {
        0x20 + self.index() * ID_LEN as u8
    }

    /// Addresses of `SIDH`, `SIDL`, `EID8`, `EID0` (in that order).
    pub const fn registers(self) -> [u8; ID_LEN] {
        let base = self.sidh();
        [base, base + 1, base + 2, base + 3]
    }
}

/// Mask and filter values for both receive buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FilterBanks {
    /// Width all masks and filters are truncated to.
    pub kind: IdKind,
    /// Mask for RXB0.
    pub mask0: u32,
    /// Filters 0 and 1, for RXB0.
    pub filters0: [u32; 2],
    /// Mask for RXB1.
    pub mask1: u32,
    /// Filters 2 to 5, for RXB1.
    pub filters1: [u32; 4],
}

impl FilterBanks {
    /// The same id and mask on every filter and both masks.
    pub const fn uniform(kind: IdKind, id: u32, mask: u32) -> Self {
        Self {
            kind,
            mask0: mask,
            filters0: [id; 2],
            mask1: mask,
            filters1: [id; 4],
        }
    }

    /// Mask value for `mask`.
    pub const fn mask(&self, mask: RxMask) -> u32 {
        match mask {
            RxMask::Mask0 => self.mask0,
            RxMask::Mask1 => self.mask1,
        }
    }

    /// Filter value for `filter`.
    pub const fn filter(&self, filter: RxFilter) -> u32 {
        match filter {
            RxFilter::F0 => self.filters0[0],
            RxFilter::F1 => self.filters0[1],
            RxFilter::F2 => self.filters1[0],
            RxFilter::F3 => self.filters1[1],
            RxFilter::F4 => self.filters1[2],
            RxFilter::F5 => self.filters1[3],
        }
    }

    /// Register content for `mask`, in bus order.
    pub fn mask_registers(&self, mask: RxMask) -> [u8; ID_LEN] {
        IdRegs::from_raw(self.mask(mask), self.kind).to_wire()
    }

    /// Register content for `filter`, in bus order.
    pub fn filter_registers(&self, filter: RxFilter) -> [u8; ID_LEN] {
        IdRegs::from_raw(self.filter(filter), self.kind).to_wire()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_addresses_skip_the_gap() {
        let sidh: [u8; 6] = RxFilter::ALL.map(RxFilter::sidh);
        assert_eq!(sidh, [0x00, 0x04, 0x08, 0x10, 0x14, 0x18]);
        assert_eq!(RxFilter::F2.registers(), [0x08, 0x09, 0x0A, 0x0B]);
        assert_eq!(RxFilter::F3.registers(), [0x10, 0x11, 0x12, 0x13]);
    }

    #[test]
    fn mask_addresses() {
        assert_eq!(RxMask::Mask0.registers(), [0x20, 0x21, 0x22, 0x23]);
        assert_eq!(RxMask::Mask1.registers(), [0x24, 0x25, 0x26, 0x27]);
    }

    #[test]
    fn uniform_banks() {
        let banks = FilterBanks::uniform(IdKind::Standard, 0x123, 0x7FF);
        for filter in RxFilter::ALL {
            assert_eq!(banks.filter(filter), 0x123);
        }
        for mask in RxMask::ALL {
            assert_eq!(banks.mask(mask), 0x7FF);
        }
    }

    #[test]
    fn values_are_truncated_to_kind() {
        let banks = FilterBanks::uniform(IdKind::Standard, 0xFFFF_FFFF, 0xFFFF_FFFF);
        assert_eq!(banks.filter_registers(RxFilter::F5), [0xFF, 0xE0, 0x00, 0x00]);
        assert_eq!(banks.mask_registers(RxMask::Mask1), [0xFF, 0xE0, 0x00, 0x00]);

        let banks = FilterBanks::uniform(IdKind::Extended, 0xFFFF_FFFF, 0x0000_0001);
        assert_eq!(banks.filter_registers(RxFilter::F0), [0xFF, 0xEB, 0xFF, 0xFF]);
        assert_eq!(banks.mask_registers(RxMask::Mask0), [0x00, 0x08, 0x00, 0x01]);
    }
}
