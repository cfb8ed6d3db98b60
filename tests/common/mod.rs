//! Register-level MCP2515 model driven through the driver's SPI and CS pins.

#![allow(dead_code)]

use std::{cell::RefCell, convert::Infallible, rc::Rc};

use embedded_hal::{
    blocking::{delay::DelayUs, spi::Transfer},
    digital::v2::OutputPin,
};
use mcp2515_can::MCP2515;

pub const CANSTAT: u8 = 0x0E;
pub const CANCTRL: u8 = 0x0F;
pub const CANINTF: u8 = 0x2C;
pub const TXB0CTRL: u8 = 0x30;

const TXREQ: u8 = 0x08;
const TXERR: u8 = 0x10;
const MLOA: u8 = 0x20;
const ABTF: u8 = 0x40;
const ABAT: u8 = 0x10;

/// One chip select framed instruction as seen by the chip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Reset,
    Read(u8),
    Write { addr: u8, value: u8 },
    Modify { addr: u8, mask: u8, value: u8 },
    ReadStatus,
    RxStatus,
    /// READ RX BUFFER, with the number of bytes clocked after the opcode.
    ReadRx { buf: u8, len: usize },
    Load { buf: u8, bytes: Vec<u8> },
    Rts(u8),
}

/// How TXB0 behaves once a transmission is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxBehavior {
    /// TXREQ clears on the n-th poll of TXB0CTRL.
    CompleteAfter(usize),
    /// TXERR is raised until ABAT is set, then the transmission aborts.
    ErrorUntilAbort,
    /// Arbitration is lost, TXREQ clears with MLOA set.
    LoseArbitration,
    /// TXREQ never clears.
    Never,
}

pub struct ChipState {
    pub regs: [u8; 0x80],
    /// REQOP bits reported by CANCTRL reads regardless of what was requested.
    pub stuck_mode: Option<u8>,
    pub tx: TxBehavior,
    pub log: Vec<Access>,
    /// Total time waited through the delay, in microseconds.
    pub elapsed_us: u32,
    tx_polls: usize,
    session: Vec<u8>,
    selected: bool,
}

impl ChipState {
    fn new() -> Self {
        let mut chip = ChipState {
            regs: [0; 0x80],
            stuck_mode: None,
            tx: TxBehavior::CompleteAfter(1),
            log: Vec::new(),
            elapsed_us: 0,
            tx_polls: 0,
            session: Vec::new(),
            selected: false,
        };
        chip.power_on();
        chip
    }

    fn power_on(&mut self) {
        self.regs = [0; 0x80];
        self.regs[CANSTAT as usize] = 0x80;
        self.regs[CANCTRL as usize] = 0x87;
    }

    /// Places a frame in an Rx buffer as the chip would on reception:
    /// `bytes` holds SIDH, SIDL, EID8, EID0, DLC and the payload.
    pub fn inject_rx(&mut self, buf: u8, bytes: &[u8]) {
        let base = 0x61 + 0x10 * buf as usize;
        self.regs[base..base + bytes.len()].copy_from_slice(bytes);
        self.regs[CANINTF as usize] |= 1 << buf;
    }

    pub fn reg(&self, addr: u8) -> u8 {
        self.regs[addr as usize]
    }

    pub fn regs_at(&self, addr: u8, len: usize) -> &[u8] {
        &self.regs[addr as usize..addr as usize + len]
    }

    /// Register writes in the log, in order.
    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.log
            .iter()
            .filter_map(|access| match access {
                Access::Write { addr, value } => Some((*addr, *value)),
                _ => None,
            })
            .collect()
    }

    fn select(&mut self) {
        assert!(!self.selected, "chip selected twice");
        self.selected = true;
        self.session.clear();
    }

    fn deselect(&mut self) {
        if !self.selected {
            return;
        }
        self.selected = false;
        let session = std::mem::take(&mut self.session);
        if session.is_empty() {
            return;
        }
        let access = match session[0] {
            0xC0 => Access::Reset,
            0x03 => Access::Read(session[1]),
            0x02 => Access::Write {
                addr: session[1],
                value: session[2],
            },
            0x05 => Access::Modify {
                addr: session[1],
                mask: session[2],
                value: session[3],
            },
            0xA0 => Access::ReadStatus,
            0xB0 => Access::RxStatus,
            op @ 0x90..=0x96 => {
                let buf = (op >> 2) & 0x01;
                // The chip clears RXnIF when CS rises after READ RX BUFFER.
                self.regs[CANINTF as usize] &= !(1 << buf);
                Access::ReadRx {
                    buf,
                    len: session.len() - 1,
                }
            }
            op @ 0x40..=0x45 => Access::Load {
                buf: (op >> 1) & 0x03,
                bytes: session[1..].to_vec(),
            },
            op @ 0x81..=0x87 => Access::Rts(op.trailing_zeros() as u8),
            op => panic!("unknown instruction {:#04X}", op),
        };
        self.log.push(access);
    }

    fn exchange(&mut self, byte: u8) -> u8 {
        assert!(self.selected, "SPI transfer without chip select");
        let index = self.session.len();
        self.session.push(byte);
        let op = self.session[0];

        if index == 0 {
            match op {
                0xC0 => self.power_on(),
                0x81..=0x87 => {
                    for n in 0..3u8 {
                        if op & (1 << n) != 0 {
                            let ctrl = &mut self.regs[(TXB0CTRL + 0x10 * n) as usize];
                            *ctrl = (*ctrl & !(ABTF | MLOA | TXERR)) | TXREQ;
                        }
                    }
                    self.tx_polls = 0;
                }
                _ => {}
            }
            return 0;
        }

        match op {
            0x03 if index >= 2 => self.read(self.session[1] + (index - 2) as u8),
            0x02 if index >= 2 => {
                let addr = self.session[1] + (index - 2) as u8;
                self.write(addr, byte);
                0
            }
            0x05 if index == 3 => {
                let (addr, mask) = (self.session[1], self.session[2]);
                let current = self.regs[addr as usize];
                self.write(addr, (current & !mask) | (byte & mask));
                0
            }
            0xA0 => self.status(),
            0xB0 => self.rx_status(),
            0x90..=0x96 => {
                let start = 0x61 + 0x10 * ((op >> 2) & 0x01) + ((op >> 1) & 0x01) * 5;
                self.regs[(start + (index - 1) as u8) as usize]
            }
            0x40..=0x45 => {
                let start = 0x31 + 0x10 * ((op >> 1) & 0x03) + (op & 0x01) * 5;
                self.regs[(start + (index - 1) as u8) as usize] = byte;
                0
            }
            _ => 0,
        }
    }

    fn read(&mut self, addr: u8) -> u8 {
        if addr == TXB0CTRL {
            self.step_tx();
        }
        let value = self.regs[addr as usize];
        match (addr, self.stuck_mode) {
            (CANCTRL, Some(mode)) => (value & 0x1F) | (mode << 5),
            _ => value,
        }
    }

    fn write(&mut self, addr: u8, value: u8) {
        self.regs[addr as usize] = value;
        if addr == CANCTRL && self.stuck_mode.is_none() {
            let stat = &mut self.regs[CANSTAT as usize];
            *stat = (*stat & 0x1F) | (value & 0xE0);
        }
    }

    fn step_tx(&mut self) {
        let ctrl = self.regs[TXB0CTRL as usize];
        if ctrl & TXREQ == 0 {
            return;
        }
        self.tx_polls += 1;
        let ctrl = match self.tx {
            TxBehavior::CompleteAfter(n) if self.tx_polls >= n => {
                self.regs[CANINTF as usize] |= 0x04;
                ctrl & !TXREQ
            }
            TxBehavior::ErrorUntilAbort if self.regs[CANCTRL as usize] & ABAT != 0 => {
                (ctrl & !TXREQ) | ABTF
            }
            TxBehavior::ErrorUntilAbort => ctrl | TXERR,
            TxBehavior::LoseArbitration => (ctrl & !TXREQ) | MLOA,
            _ => ctrl,
        };
        self.regs[TXB0CTRL as usize] = ctrl;
    }

    fn status(&self) -> u8 {
        let intf = self.regs[CANINTF as usize];
        let txreq = |n: u8| (self.regs[(TXB0CTRL + 0x10 * n) as usize] & TXREQ) != 0;
        (intf & 0x01)
            | (intf & 0x02)
            | (txreq(0) as u8) << 2
            | ((intf >> 2) & 0x01) << 3
            | (txreq(1) as u8) << 4
            | ((intf >> 3) & 0x01) << 5
            | (txreq(2) as u8) << 6
            | ((intf >> 4) & 0x01) << 7
    }

    fn rx_status(&self) -> u8 {
        let intf = self.regs[CANINTF as usize];
        ((intf & 0x01) << 6) | ((intf & 0x02) << 6)
    }
}

pub type Chip = Rc<RefCell<ChipState>>;

pub struct FakeSpi(Chip);

impl Transfer<u8> for FakeSpi {
    type Error = Infallible;

    fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], Self::Error> {
        let mut chip = self.0.borrow_mut();
        for word in words.iter_mut() {
            *word = chip.exchange(*word);
        }
        Ok(words)
    }
}

pub struct FakeCs(Chip);

impl OutputPin for FakeCs {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().select();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().deselect();
        Ok(())
    }
}

pub struct FakeDelay(Chip);

impl DelayUs<u16> for FakeDelay {
    fn delay_us(&mut self, us: u16) {
        self.0.borrow_mut().elapsed_us += us as u32;
    }
}

pub type Driver = MCP2515<FakeSpi, FakeCs, FakeDelay>;

pub fn driver() -> (Driver, Chip) {
    let chip = Rc::new(RefCell::new(ChipState::new()));
    let can = MCP2515::new(
        FakeSpi(chip.clone()),
        FakeCs(chip.clone()),
        FakeDelay(chip.clone()),
    );
    (can, chip)
}

/// A driver initialized with default settings, log and clock cleared.
pub fn initialized() -> (Driver, Chip) {
    let (mut can, chip) = driver();
    can.init(Default::default()).unwrap();
    chip.borrow_mut().log.clear();
    chip.borrow_mut().elapsed_us = 0;
    (can, chip)
}
