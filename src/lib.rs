#![cfg_attr(not(test), no_std)]

#[macro_use]
mod macros;

pub mod buffer;
pub mod error;
pub mod filter;
pub mod frame;
pub mod irq;
pub mod regs;
pub mod stat;
pub mod timing;

use core::fmt::Debug;

use buffer::{RxBuf, TxBuf};
use embedded_hal::{
    blocking::{can::Can, delay::DelayUs, spi::Transfer},
    digital::v2::OutputPin,
    spi::{Mode, MODE_0},
};
use filter::{FilterBanks, RxFilter, RxMask};
use frame::{CanFrame, IdKind, HEADER_LEN, MAX_ENCODED_LEN};
use irq::PendingIrq;
use regs::{OpMode, Register};
use stat::{ErrorCounters, ErrorFlags, RxStatus, Status};
use timing::TimingConfig;

use crate::{
    error::{Error, Result},
    regs::{BitModifiable, CanCtrl, CanInte, CanIntf, CanStat, RecvBufOpMode, Reg, TxbCtrl},
};

#[repr(u8)]
enum Instruction {
    Write = 0x02,
    Read = 0x03,
    Bitmod = 0x05,
    ReadStatus = 0xA0,
    RxStatus = 0xB0,
    Reset = 0xC0,
    // LOAD TX BUFFER, RTS and READ RX BUFFER encode the buffer index, see
    // `TxBuf` and `RxBuf`.
}

/// SPI mode required by the MCP2515. Data is clocked MSB first.
pub const SPI_MODE: Mode = MODE_0;

/// Highest SPI clock the MCP2515 supports.
pub const MAX_SPI_HZ: u32 = 10_000_000;

/// Time waited between two polls of `TXBnCTRL` while a transmission is
/// pending.
pub const TX_POLL_INTERVAL_US: u16 = 10;

/// The only Tx buffer used. Every transmission waits for completion, so one
/// buffer is enough.
const TX_BUF: TxBuf = TxBuf::B0;

/// Called for every frame drained by [`MCP2515::handle_interrupt`].
pub type ReceiveCallback = fn(&CanFrame);

/// Settings used to initialize the MCP2515.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "ufmt", derive(ufmt::derive::uDebug))]
pub struct Settings {
    /// Mode to switch to once initialized. [`OpMode::Configuration`] leaves
    /// the chip in configuration mode.
    pub mode: OpMode,
    /// Frequency of the oscillator attached to the MCP2515.
    pub oscillator_hz: u32,
    /// CAN bus bit rate.
    pub bit_rate: u32,
    /// SPI clock the bus is configured with. Configuring the SPI peripheral is
    /// up to the HAL, this is only checked against [`MAX_SPI_HZ`].
    pub spi_hz: u32,
    /// How long [`MCP2515::transmit`] waits for a frame to leave the chip.
    pub tx_timeout_us: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: OpMode::Normal,
            oscillator_hz: 16_000_000,
            bit_rate: 500_000,
            spi_hz: MAX_SPI_HZ,
            tx_timeout_us: 100_000,
        }
    }
}

/// MCP2515 driver.
pub struct MCP2515<SPI, CS, D> {
    /// SPI interface to interact with the MCP2515.
    spi: SPI,
    /// Chip select pin to select the MCP2515.
    cs: CS,
    /// Delay used after reset and between Tx completion polls.
    delay: D,
    settings: Settings,
    /// Last mode the chip confirmed, `None` when unknown.
    mode: Option<OpMode>,
    on_receive: Option<ReceiveCallback>,
}

impl<SPI, CS, D, SPIE, CSE> MCP2515<SPI, CS, D>
where
    SPI: Transfer<u8, Error = SPIE>,
    CS: OutputPin<Error = CSE>,
    D: DelayUs<u16>,
    SPIE: Debug,
    CSE: Debug,
{
    /// Creates a new MCP2515 driver. The chip is not touched until
    /// [`MCP2515::init`] is called.
    ///
    /// # Configuration
    ///
    /// As this driver only takes ownership of the SPI interface, it is up to
    /// the user to create and configure the SPI interface. Namely, the MCP2515
    /// requires the following options:
    ///
    /// * **Data Order**: MSB first.
    /// * **Clock**: at most [`MAX_SPI_HZ`].
    /// * **Mode**: [`SPI_MODE`].
    ///
    /// # Parameters
    ///
    /// * `spi` - SPI interface.
    /// * `cs` - Chip-select pin for the MCP2515.
    /// * `delay` - Delay interface from downstream HAL.
    pub fn new(spi: SPI, cs: CS, delay: D) -> Self {
        Self {
            spi,
            cs,
            delay,
            settings: Settings::default(),
            mode: None,
            on_receive: None,
        }
    }

    /// Gives back the SPI interface, chip select pin and delay.
    pub fn release(self) -> (SPI, CS, D) {
        (self.spi, self.cs, self.delay)
    }

    /// Current settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Sets the oscillator frequency used for the reset delay and for the next
    /// [`MCP2515::init`].
    pub fn set_oscillator_frequency(&mut self, hz: u32) {
        self.settings.oscillator_hz = hz;
    }

    /// Records the SPI clock the HAL was configured with.
    pub fn set_spi_frequency(&mut self, hz: u32) -> Result<(), SPIE, CSE> {
        if hz == 0 || hz > MAX_SPI_HZ {
            return Err(Error::InvalidSpiFrequency(hz));
        }
        self.settings.spi_hz = hz;
        Ok(())
    }

    /// Initializes the MCP2515. This should be called once at the start of
    /// the program, and again to recover from a failed mode transition.
    ///
    /// The chip is reset and configured for `settings.bit_rate`, interrupts
    /// are enabled for both Rx buffers and acceptance filtering is turned off.
    ///
    /// # Parameters
    ///
    /// * `settings` - Settings for MCP2515. See [`Settings`].
    pub fn init(&mut self, settings: Settings) -> Result<(), SPIE, CSE> {
        self.set_spi_frequency(settings.spi_hz)?;
        self.settings = settings;

        self.cs.set_high().map_err(Error::Hal)?;
        self.reset()?;
        self.set_mode(OpMode::Configuration)?;

        let timing = TimingConfig::select(settings.oscillator_hz, settings.bit_rate)?;
        self.set_bit_timing(timing)?;

        // Enable interrupts on both Rx buffers.
        self.write_register(CanInte::new().with_rx0ie(true).with_rx1ie(true))?;
        self.write_register_addr(Register::BFPCTRL.into(), 0x00)?;
        self.write_register_addr(Register::TXRTSCTRL.into(), 0x00)?;

        // Masks and filters off, receive any message.
        for buf in RxBuf::ALL {
            self.write_register_addr(buf.ctrl(), buf.ctrl_value(RecvBufOpMode::FilterOff, false))?;
        }

        if settings.mode != OpMode::Configuration {
            self.set_mode(settings.mode)?;
        }

        debug!("mcp2515 initialized, {=u32} bit/s", settings.bit_rate);
        Ok(())
    }

    /// Resets the MCP2515. The chip returns to configuration mode.
    pub fn reset(&mut self) -> Result<(), SPIE, CSE> {
        self.transfer(&mut [Instruction::Reset as u8])?;
        self.mode = Some(OpMode::Configuration);

        // The oscillator start-up timer holds the chip in reset for 128 OSC1
        // cycles, no SPI instruction may be sent before it expires.
        self.delay.delay_us(reset_delay_us(self.settings.oscillator_hz));
        Ok(())
    }

    /// Writes the bit timing registers. Only has an effect in configuration
    /// mode.
    pub fn set_bit_timing(&mut self, timing: TimingConfig) -> Result<(), SPIE, CSE> {
        self.write_register(timing.cnf1())?;
        self.write_register(timing.cnf2())?;
        self.write_register(timing.cnf3())?;
        Ok(())
    }

    /// Last operation mode confirmed by the chip, `None` if unknown.
    #[inline]
    pub fn mode(&self) -> Option<OpMode> {
        self.mode
    }

    /// Set the operation mode of the device.
    ///
    /// The REQOP bits are written and CANCTRL is read back. The transition
    /// fails, leaving the mode unknown, unless the read back REQOP bits match
    /// `mode`. There is no retry.
    pub fn set_mode(&mut self, mode: OpMode) -> Result<(), SPIE, CSE> {
        self.mode = None;
        self.modify_register(CanCtrl::new().with_reqop(mode), CanCtrl::MASK_REQOP)?;

        let ctrl: CanCtrl = self.read_register()?;
        if ctrl.reqop_or_err() != Ok(mode) {
            warn!("mode transition to {} failed", mode);
            return Err(Error::ModeTransition { requested: mode });
        }

        trace!("mode {}", mode);
        self.mode = Some(mode);
        Ok(())
    }

    /// Mode the chip reports in CANSTAT. This lags behind [`MCP2515::mode`]
    /// while a transition is in progress, e.g. while a frame is still being
    /// sent before sleep.
    pub fn read_opmode(&mut self) -> Result<Option<OpMode>, SPIE, CSE> {
        let stat: CanStat = self.read_register()?;
        Ok(stat.opmod_or_err().ok())
    }

    /// Listen-only mode: receive everything, never acknowledge or transmit.
    pub fn observe(&mut self) -> Result<(), SPIE, CSE> {
        self.set_mode(OpMode::ListenOnly)
    }

    /// Loopback mode: transmitted frames are received internally.
    pub fn loopback(&mut self) -> Result<(), SPIE, CSE> {
        self.set_mode(OpMode::Loopback)
    }

    pub fn sleep(&mut self) -> Result<(), SPIE, CSE> {
        self.set_mode(OpMode::Sleep)
    }

    /// Wakes the chip from sleep and switches to normal mode.
    pub fn wakeup(&mut self) -> Result<(), SPIE, CSE> {
        // Setting WAKIF with the wake-up interrupt enabled starts the
        // oscillator.
        let inte: CanInte = self.read_register()?;
        if !inte.wakie() {
            let data = CanInte::new().with_wakie(true);
            self.modify_register(data, data)?;
        }
        let data = CanIntf::new().with_wakif(true);
        self.modify_register(data, CanIntf::MASK_WAKIF)?;

        let result = self.set_mode(OpMode::Normal);

        if !inte.wakie() {
            self.modify_register(CanInte::new(), CanInte::MASK_WAKIE)?;
        }
        self.modify_register(CanIntf::new(), CanIntf::MASK_WAKIF)?;
        result
    }

    /// Sends a CAN frame, waiting at most `settings.tx_timeout_us` for it to
    /// leave the chip.
    pub fn transmit(&mut self, frame: &CanFrame) -> Result<(), SPIE, CSE> {
        self.transmit_with_timeout(frame, self.settings.tx_timeout_us)
    }

    /// Sends a CAN frame through TXB0 and waits for the transmission to finish.
    ///
    /// A bus error during transmission aborts it. The abort is reported as
    /// [`Error::TxFailed`], as is a lost arbitration. Fails with
    /// [`Error::TxBusy`] without loading anything if TXB0 still has a
    /// transmission pending.
    ///
    /// # Parameters
    ///
    /// * `frame` - Frame to send.
    /// * `timeout_us` - Time to wait for TXREQ to clear. When it passes, the
    ///   transmission is aborted and [`Error::TxTimeout`] returned.
    pub fn transmit_with_timeout(
        &mut self,
        frame: &CanFrame,
        timeout_us: u32,
    ) -> Result<(), SPIE, CSE> {
        if self.read_txb_ctrl(TX_BUF)?.txreq() {
            return Err(Error::TxBusy);
        }

        let mut encoded = [0u8; MAX_ENCODED_LEN];
        let len = frame.encode(&mut encoded);

        // LOAD TX BUFFER writes sequentially, starting from TXBnSIDH.
        let mut load = [0u8; 1 + MAX_ENCODED_LEN];
        load[0] = TX_BUF.load_instruction();
        load[1..=len].copy_from_slice(&encoded[..len]);
        self.transfer(&mut load[..=len])?;

        // RTS sets TXREQ and clears ABTF, MLOA and TXERR.
        self.transfer(&mut [TX_BUF.rts_instruction()])?;
        trace!("tx {}", frame);

        let mut aborted = false;
        let mut waited: u32 = 0;
        loop {
            let ctrl = self.read_txb_ctrl(TX_BUF)?;
            if !ctrl.txreq() {
                break;
            }
            if ctrl.txerr() {
                // The chip clears TXREQ once the abort is processed, keep
                // polling until then.
                self.set_abat(true)?;
                aborted = true;
            }
            if waited >= timeout_us {
                warn!("tx timed out after {=u32} us", waited);
                // ABAT only takes effect once the bus is idle, so TXREQ is
                // also cleared directly to release the buffer.
                self.set_abat(true)?;
                self.modify_register_addr(TX_BUF.ctrl(), TxbCtrl::MASK_TXREQ.into_bytes()[0], 0)?;
                self.set_abat(false)?;
                self.modify_register(CanIntf::new(), TX_BUF.intf_mask())?;
                return Err(Error::TxTimeout);
            }
            self.delay.delay_us(TX_POLL_INTERVAL_US);
            waited = waited.saturating_add(TX_POLL_INTERVAL_US as u32);
        }

        if aborted {
            self.set_abat(false)?;
        }
        self.modify_register(CanIntf::new(), TX_BUF.intf_mask())?;

        let ctrl = self.read_txb_ctrl(TX_BUF)?;
        if ctrl.failed() {
            warn!("tx failed: {}", ctrl);
            Err(Error::TxFailed(ctrl))
        } else {
            Ok(())
        }
    }

    /// Reads a pending frame, if any. RXB0 is served before RXB1.
    ///
    /// `Ok(None)` means no frame was pending; a received zero-length frame is
    /// `Ok(Some(frame))` with `frame.dlc() == 0`.
    pub fn poll_message(&mut self) -> Result<Option<CanFrame>, SPIE, CSE> {
        let status = self.read_rx_status()?;
        let buf = if status.rx0() {
            RxBuf::B0
        } else if status.rx1() {
            RxBuf::B1
        } else {
            return Ok(None);
        };

        let frame = self.read_rx_buffer(buf)?;
        // READ RX BUFFER clears RXnIF when CS goes high. Clear it explicitly
        // anyway so the flag state does not depend on that side effect.
        self.modify_register(CanIntf::new(), buf.intf_mask())?;
        trace!("rx {}", frame);
        Ok(Some(frame))
    }

    /// Reads a message from the MCP2515 Rx buffers, failing with
    /// [`Error::NoMessage`] when none is pending.
    pub fn read_message(&mut self) -> Result<CanFrame, SPIE, CSE> {
        self.poll_message()?.ok_or(Error::NoMessage)
    }

    /// Reads header and payload of an Rx buffer in one READ RX BUFFER
    /// instruction.
    fn read_rx_buffer(&mut self, buf: RxBuf) -> Result<CanFrame, SPIE, CSE> {
        let mut instruction = [buf.read_instruction()];
        let mut header = [0u8; HEADER_LEN];
        self.with_cs(|spi| -> Result<CanFrame, SPIE, CSE> {
            spi.transfer(&mut instruction).map_err(Error::Spi)?;
            // The MCP2515 ignores what is sent while reading, so the buffers
            // are transferred as they are and overwritten with the response.
            spi.transfer(&mut header).map_err(Error::Spi)?;
            let mut frame = CanFrame::from_header(header);
            if frame.payload_len() > 0 {
                spi.transfer(frame.payload_mut()).map_err(Error::Spi)?;
            }
            Ok(frame)
        })?
    }

    /// Accepts only frames matching `id` under `mask` into both Rx buffers,
    /// standard identifiers only.
    pub fn set_standard_filter(&mut self, id: u16, mask: u16) -> Result<(), SPIE, CSE> {
        self.set_filters(&FilterBanks::uniform(IdKind::Standard, id as u32, mask as u32))
    }

    /// Accepts only frames matching `id` under `mask` into both Rx buffers,
    /// extended identifiers only.
    pub fn set_extended_filter(&mut self, id: u32, mask: u32) -> Result<(), SPIE, CSE> {
        self.set_filters(&FilterBanks::uniform(IdKind::Extended, id, mask))
    }

    /// Programs masks and filters, restricting both Rx buffers to
    /// `banks.kind` identifiers.
    ///
    /// Switches to configuration mode and back to normal mode, both verified.
    pub fn set_filters(&mut self, banks: &FilterBanks) -> Result<(), SPIE, CSE> {
        self.set_mode(OpMode::Configuration)?;

        let rxm = match banks.kind {
            IdKind::Standard => RecvBufOpMode::StandardOnly,
            IdKind::Extended => RecvBufOpMode::ExtendedOnly,
        };
        for (buf, mask) in RxBuf::ALL.into_iter().zip(RxMask::ALL) {
            // RXBnCTRL is written twice in a row. Hardware behaviour with a
            // single write has not been verified, keep the sequence.
            let ctrl = buf.ctrl_value(rxm, false);
            self.write_register_addr(buf.ctrl(), ctrl)?;
            self.write_register_addr(buf.ctrl(), ctrl)?;

            self.write_mask(banks, mask)?;
        }
        for filter in RxFilter::ALL {
            self.write_filter(banks, filter)?;
        }

        self.set_mode(OpMode::Normal)
    }

    /// Programs masks and filters with filtering on for both identifier
    /// widths.
    ///
    /// # Parameters
    ///
    /// * `banks` - Masks and filters, truncated to `banks.kind`.
    /// * `allow_rollover` - Let frames spill into RXB1 while RXB0 is full.
    pub fn set_filter_banks(
        &mut self,
        banks: &FilterBanks,
        allow_rollover: bool,
    ) -> Result<(), SPIE, CSE> {
        self.set_mode(OpMode::Configuration)?;

        for buf in RxBuf::ALL {
            let ctrl = buf.ctrl_value(RecvBufOpMode::FilterOn, allow_rollover);
            self.write_register_addr(buf.ctrl(), ctrl)?;
        }
        for mask in RxMask::ALL {
            self.write_mask(banks, mask)?;
        }
        for filter in RxFilter::ALL {
            self.write_filter(banks, filter)?;
        }

        self.set_mode(OpMode::Normal)
    }

    fn write_mask(&mut self, banks: &FilterBanks, mask: RxMask) -> Result<(), SPIE, CSE> {
        let regs = mask.registers();
        let data = banks.mask_registers(mask);
        for (reg, value) in regs.into_iter().zip(data) {
            self.write_register_addr(reg, value)?;
        }
        Ok(())
    }

    fn write_filter(&mut self, banks: &FilterBanks, filter: RxFilter) -> Result<(), SPIE, CSE> {
        let regs = filter.registers();
        let data = banks.filter_registers(filter);
        for (reg, value) in regs.into_iter().zip(data) {
            self.write_register_addr(reg, value)?;
        }
        Ok(())
    }

    /// Registers the callback run by [`MCP2515::handle_interrupt`] for each
    /// received frame. `None` unregisters it.
    pub fn on_receive(&mut self, callback: Option<ReceiveCallback>) {
        self.on_receive = callback;
    }

    /// Services the chip's interrupt if `irq` was signalled since the last
    /// call. Returns the number of frames passed to the receive callback.
    ///
    /// Call this from the main context, never from the interrupt handler.
    pub fn service(&mut self, irq: &PendingIrq) -> Result<usize, SPIE, CSE> {
        if irq.take() {
            self.handle_interrupt()
        } else {
            Ok(0)
        }
    }

    /// Drains both Rx buffers into the registered receive callback. Without a
    /// callback, frames are left for [`MCP2515::poll_message`].
    pub fn handle_interrupt(&mut self) -> Result<usize, SPIE, CSE> {
        match self.on_receive {
            Some(callback) => self.handle_interrupt_with(callback),
            None => Ok(0),
        }
    }

    /// Drains both Rx buffers into `f`. Returns the number of frames read.
    pub fn handle_interrupt_with(
        &mut self,
        mut f: impl FnMut(&CanFrame),
    ) -> Result<usize, SPIE, CSE> {
        let intf: CanIntf = self.read_register()?;
        if intf.into_byte() == 0 {
            return Ok(0);
        }

        let mut count = 0;
        while let Some(frame) = self.poll_message()? {
            f(&frame);
            count += 1;
        }
        Ok(count)
    }

    /// Reads the READ STATUS byte.
    pub fn read_status(&mut self) -> Result<Status, SPIE, CSE> {
        let mut data = [Instruction::ReadStatus as u8, 0];
        self.transfer(&mut data).map(|b| Status::from_bytes([b]))
    }

    /// Reads the RX STATUS byte.
    pub fn read_rx_status(&mut self) -> Result<RxStatus, SPIE, CSE> {
        let mut data = [Instruction::RxStatus as u8, 0];
        self.transfer(&mut data).map(|b| RxStatus::from_bytes([b]))
    }

    /// Reads the pending interrupt flags.
    pub fn interrupt_flags(&mut self) -> Result<CanIntf, SPIE, CSE> {
        self.read_register()
    }

    /// Reads the error flag register (EFLG).
    pub fn error_flags(&mut self) -> Result<ErrorFlags, SPIE, CSE> {
        let eflg = self.read_register_addr(Register::EFLG.into())?;
        Ok(ErrorFlags::from_bits_truncate(eflg))
    }

    /// Reads the transmit and receive error counters.
    pub fn error_counters(&mut self) -> Result<ErrorCounters, SPIE, CSE> {
        Ok(ErrorCounters {
            tec: self.read_register_addr(Register::TEC.into())?,
            rec: self.read_register_addr(Register::REC.into())?,
        })
    }

    fn set_abat(&mut self, abat: bool) -> Result<(), SPIE, CSE> {
        self.modify_register(CanCtrl::new().with_abat(abat), CanCtrl::MASK_ABAT)
    }

    /// Read the `CTRL` register of a Tx buffer.
    fn read_txb_ctrl(&mut self, buffer: TxBuf) -> Result<TxbCtrl, SPIE, CSE> {
        let ctrl = self.read_register_addr(buffer.ctrl())?;
        Ok(TxbCtrl::from_bytes([ctrl]))
    }

    /// Read a register via a register object.
    #[inline]
    pub fn read_register<R: Reg>(&mut self) -> Result<R, SPIE, CSE> {
        let content = self.read_register_addr(R::ADDRESS.into())?;
        Ok(R::from_byte(content))
    }

    /// Write to a register using a register object.
    #[inline]
    pub fn write_register<R: Reg>(&mut self, reg: R) -> Result<(), SPIE, CSE> {
        self.write_register_addr(R::ADDRESS.into(), reg.into_byte())
    }

    /// Modifies a register.
    ///
    /// # Parameters
    ///
    /// * `reg` - New register content.
    /// * `mask` - Mask register. The bits must be 1 in the positions you want
    ///   to modify.
    #[inline]
    pub fn modify_register<R: BitModifiable>(
        &mut self,
        reg: R,
        mask: R,
    ) -> Result<(), SPIE, CSE> {
        self.modify_register_addr(R::ADDRESS.into(), mask.into_byte(), reg.into_byte())
    }

    /// Reads the register at `addr` with the READ instruction.
    pub fn read_register_addr(&mut self, addr: u8) -> Result<u8, SPIE, CSE> {
        self.transfer(&mut [Instruction::Read as u8, addr, 0])
    }

    /// Writes `value` to the register at `addr` with the WRITE instruction.
    pub fn write_register_addr(&mut self, addr: u8, value: u8) -> Result<(), SPIE, CSE> {
        self.transfer(&mut [Instruction::Write as u8, addr, value])?;
        Ok(())
    }

    /// Sets the bits selected by `mask` in the register at `addr` to those of
    /// `value` with the BIT MODIFY instruction. The chip applies it
    /// atomically, other bits are left untouched.
    pub fn modify_register_addr(
        &mut self,
        addr: u8,
        mask: u8,
        value: u8,
    ) -> Result<(), SPIE, CSE> {
        self.transfer(&mut [Instruction::Bitmod as u8, addr, mask, value])?;
        Ok(())
    }

    /// Transfers an array of bytes via SPI, returning the slave response inside
    /// the given mutable bytes array.
    ///
    /// # Returns
    ///
    /// Returns the last element received from the slave. If no bytes were sent,
    /// 0 is returned.
    fn transfer(&mut self, bytes: &mut [u8]) -> Result<u8, SPIE, CSE> {
        self.with_cs(|spi| spi.transfer(bytes).map(|_| ()))?
            .map_err(Error::Spi)?;
        if let [.., data] = bytes {
            Ok(*data)
        } else {
            Ok(0)
        }
    }

    /// Calls a function `f` after bringing the chip select pin low, restoring
    /// it to high after the function has finished.
    fn with_cs<T>(&mut self, f: impl FnOnce(&mut SPI) -> T) -> Result<T, SPIE, CSE> {
        self.cs.set_low().map_err(Error::Hal)?;
        let result = f(&mut self.spi);
        self.cs.set_high().map_err(Error::Hal)?;
        Ok(result)
    }
}

/// Microseconds covering 160 oscillator cycles, rounded up.
fn reset_delay_us(oscillator_hz: u32) -> u16 {
    let hz = u64::from(oscillator_hz.max(1));
    let us = (160 * 1_000_000 + hz - 1) / hz;
    us.min(u16::MAX as u64) as u16
}

impl<SPI, CS, D, SPIE, CSE> Can for MCP2515<SPI, CS, D>
where
    SPI: Transfer<u8, Error = SPIE>,
    CS: OutputPin<Error = CSE>,
    D: DelayUs<u16>,
    SPIE: Debug,
    CSE: Debug,
{
    type Frame = CanFrame;
    type Error = Error<SPIE, CSE>;

    #[inline]
    fn transmit(&mut self, frame: &Self::Frame) -> Result<(), SPIE, CSE> {
        MCP2515::transmit(self, frame)
    }

    #[inline]
    fn receive(&mut self) -> Result<Self::Frame, SPIE, CSE> {
        self.read_message()
    }
}

impl<SPI, CS, D, SPIE, CSE> embedded_hal::can::nb::Can for MCP2515<SPI, CS, D>
where
    SPI: Transfer<u8, Error = SPIE>,
    CS: OutputPin<Error = CSE>,
    D: DelayUs<u16>,
    SPIE: Debug,
    CSE: Debug,
{
    type Frame = CanFrame;
    type Error = Error<SPIE, CSE>;

    /// Blocks until the frame is sent, never replaces a pending frame.
    fn transmit(&mut self, frame: &Self::Frame) -> nb::Result<Option<Self::Frame>, Self::Error> {
        MCP2515::transmit(self, frame)?;
        Ok(None)
    }

    fn receive(&mut self) -> nb::Result<Self::Frame, Self::Error> {
        self.poll_message()?.ok_or(nb::Error::WouldBlock)
    }
}
