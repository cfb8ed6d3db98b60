//! Interrupt hand-off.
//!
//! SPI transfers must not run inside the interrupt handler: the bus may be in
//! use by the main context, and the chip frames each instruction by the chip
//! select edge. The handler for the MCP2515 `INT` line only calls
//! [`PendingIrq::signal`]. The main loop then calls
//! [`MCP2515::service`](crate::MCP2515::service), which drains the receive
//! buffers and runs the registered callback.
//!
//! ```ignore
//! static CAN_IRQ: PendingIrq = PendingIrq::new();
//!
//! #[interrupt]
//! fn EXTI0() {
//!     CAN_IRQ.signal();
//! }
//!
//! loop {
//!     can.service(&CAN_IRQ)?;
//! }
//! ```

use core::cell::Cell;

use critical_section::Mutex;

/// Flag set from interrupt context and consumed from the main context.
pub struct PendingIrq {
    pending: Mutex<Cell<bool>>,
}

impl PendingIrq {
    pub const fn new() -> Self {
        Self {
            pending: Mutex::new(Cell::new(false)),
        }
    }

    /// Marks the interrupt as pending. Safe to call from interrupt context.
    #[inline]
    pub fn signal(&self) {
        critical_section::with(|cs| self.pending.borrow(cs).set(true));
    }

    /// Clears the flag, returning whether it was set.
    #[inline]
    pub fn take(&self) -> bool {
        critical_section::with(|cs| self.pending.borrow(cs).replace(false))
    }

    /// Whether an interrupt is pending, without clearing it.
    #[inline]
    pub fn is_pending(&self) -> bool {
        critical_section::with(|cs| self.pending.borrow(cs).get())
    }
}

impl Default for PendingIrq {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_clears() {
        let irq = PendingIrq::new();
        assert!(!irq.take());
        irq.signal();
        irq.signal();
        assert!(irq.is_pending());
        assert!(irq.take());
        assert!(!irq.take());
    }
}
