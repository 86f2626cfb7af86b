//! Recording bus and delay doubles for the driver tests.

use std::boxed::Box;
use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::rc::Rc;
use std::vec::Vec;

use embassy_futures::yield_now;
use embedded_hal_async::delay::DelayNs;

use crate::bus::BusTransport;

/// One observed interaction, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transfer {
    Start(u8),
    Write(u8, Vec<u8>),
    Read(u8, usize),
    /// A delay, in nanoseconds.
    Delay(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockBusError;

type Log = Rc<RefCell<Vec<Transfer>>>;

/// Scripted transport: records every call, answers reads from a queue and
/// fails the calls it was told to fail.
///
/// Every call yields once before completing, like a real transfer would, so
/// joined futures get to contend for a shared bus.
pub struct MockBus {
    log: Log,
    absent: BTreeSet<u8>,
    responses: VecDeque<Vec<u8>>,
    failing_writes: Vec<(Vec<u8>, usize)>,
    failing_reads: BTreeSet<usize>,
    reads: usize,
}

impl MockBus {
    pub fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
            absent: BTreeSet::new(),
            responses: VecDeque::new(),
            failing_writes: Vec::new(),
            failing_reads: BTreeSet::new(),
            reads: 0,
        }
    }

    /// Device at `address` never acknowledges `start`.
    pub fn absent(mut self, address: u8) -> Self {
        self.absent.insert(address);
        self
    }

    /// Queue the bytes returned by the next read. Short vectors model short reads.
    pub fn respond(mut self, bytes: &[u8]) -> Self {
        self.responses.push_back(bytes.to_vec());
        self
    }

    /// Fail the next `times` writes whose payload equals `bytes`.
    pub fn fail_write(mut self, bytes: &[u8], times: usize) -> Self {
        self.failing_writes.push((bytes.to_vec(), times));
        self
    }

    /// Fail the read with this zero-based index.
    pub fn fail_read(mut self, index: usize) -> Self {
        self.failing_reads.insert(index);
        self
    }

    /// A delay that logs into the same transfer log as this bus.
    pub fn delay(&self) -> MockDelay<'static> {
        MockDelay {
            log: self.log.clone(),
            hook: None,
            yields: 1,
        }
    }

    /// A view of the transfer log that outlives moving the bus into a driver.
    pub fn log(&self) -> TransferLog {
        TransferLog(self.log.clone())
    }
}

#[derive(Clone)]
pub struct TransferLog(Log);

impl TransferLog {
    pub fn transfers(&self) -> Vec<Transfer> {
        self.0.borrow().clone()
    }

    /// Transfers with delays filtered out.
    pub fn bus_transfers(&self) -> Vec<Transfer> {
        self.0
            .borrow()
            .iter()
            .filter(|t| !matches!(t, Transfer::Delay(_)))
            .cloned()
            .collect()
    }

    pub fn writes(&self) -> Vec<(u8, Vec<u8>)> {
        self.0
            .borrow()
            .iter()
            .filter_map(|t| match t {
                Transfer::Write(address, bytes) => Some((*address, bytes.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl BusTransport for MockBus {
    type Error = MockBusError;

    async fn start(&mut self, address: u8) -> Result<(), Self::Error> {
        self.log.borrow_mut().push(Transfer::Start(address));
        yield_now().await;
        if self.absent.contains(&address) {
            return Err(MockBusError);
        }
        Ok(())
    }

    async fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        self.log
            .borrow_mut()
            .push(Transfer::Write(address, bytes.to_vec()));
        yield_now().await;
        if let Some((_, times)) = self
            .failing_writes
            .iter_mut()
            .find(|(pattern, times)| *times > 0 && pattern.as_slice() == bytes)
        {
            *times -= 1;
            return Err(MockBusError);
        }
        Ok(())
    }

    async fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.log.borrow_mut().push(Transfer::Read(address, buf.len()));
        yield_now().await;
        let index = self.reads;
        self.reads += 1;
        if self.failing_reads.contains(&index) {
            return Err(MockBusError);
        }
        match self.responses.pop_front() {
            Some(bytes) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            None => {
                buf.fill(0);
                Ok(buf.len())
            }
        }
    }
}

/// Delay that records how long it was asked to wait and yields instead of sleeping.
pub struct MockDelay<'a> {
    log: Log,
    hook: Option<Box<dyn FnMut(u64) + 'a>>,
    yields: usize,
}

impl<'a> MockDelay<'a> {
    /// Run `hook` with the requested duration (ns) on every delay.
    pub fn with_hook<'b>(self, hook: impl FnMut(u64) + 'b) -> MockDelay<'b> {
        MockDelay {
            log: self.log,
            hook: Some(Box::new(hook)),
            yields: self.yields,
        }
    }

    /// Stay pending for `yields` polls per delay, to model a long wait.
    pub fn yielding(mut self, yields: usize) -> Self {
        self.yields = yields;
        self
    }

    async fn record(&mut self, ns: u64) {
        self.log.borrow_mut().push(Transfer::Delay(ns));
        if let Some(hook) = self.hook.as_mut() {
            hook(ns);
        }
        for _ in 0..self.yields {
            yield_now().await;
        }
    }
}

impl DelayNs for MockDelay<'_> {
    async fn delay_ns(&mut self, ns: u32) {
        self.record(ns as u64).await;
    }

    async fn delay_us(&mut self, us: u32) {
        self.record(us as u64 * 1_000).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.record(ms as u64 * 1_000_000).await;
    }
}

pub const fn ms(ms: u64) -> Transfer {
    Transfer::Delay(ms * 1_000_000)
}

pub const fn us(us: u64) -> Transfer {
    Transfer::Delay(us * 1_000)
}
