//! State shared between a sensor poller and the rest of the application

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embedded_hal_async::delay::DelayNs;
use log::{info, warn};

use super::{CalibratedReading, SensorError};

/// Latest reading plus the stop handshake for one poller.
///
/// The reading lives in a single-slot cell behind a critical-section mutex, so
/// a reader never observes half of an update. Intended to live in a `static`:
///
/// ```rust,ignore
/// static BAROMETER: SensorShared = SensorShared::new();
/// ```
pub struct SensorShared {
    latest: BlockingMutex<CriticalSectionRawMutex, Cell<Option<CalibratedReading>>>,
    stop: AtomicBool,
    stopped: Signal<CriticalSectionRawMutex, ()>,
}

impl SensorShared {
    pub const fn new() -> Self {
        Self {
            latest: BlockingMutex::new(Cell::new(None)),
            stop: AtomicBool::new(false),
            stopped: Signal::new(),
        }
    }

    /// The most recent calibrated reading, `None` until the first successful cycle.
    pub fn latest(&self) -> Option<CalibratedReading> {
        self.latest.lock(|cell| cell.get())
    }

    pub(crate) fn store(&self, reading: CalibratedReading) {
        self.latest.lock(|cell| cell.set(Some(reading)));
    }

    /// Ask the poller to leave its loop at the top of its next cycle.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Clear a previous stop so a newly started poller can run.
    /// The last reading is kept.
    pub(crate) fn rearm(&self) {
        self.stop.store(false, Ordering::Release);
        self.stopped.reset();
    }

    pub(crate) fn mark_stopped(&self) {
        self.stopped.signal(());
    }

    /// Stop the poller and wait at most `timeout_ms` for it to exit.
    pub async fn halt<D: DelayNs>(
        &self,
        sensor: &'static str,
        delay: &mut D,
        timeout_ms: u32,
    ) -> Result<(), SensorError> {
        self.request_stop();
        match select(self.stopped.wait(), delay.delay_ms(timeout_ms)).await {
            Either::First(()) => {
                // Keep the signal set so repeated halts return immediately.
                self.stopped.signal(());
                info!("{}: poller halted", sensor);
                Ok(())
            }
            Either::Second(()) => {
                warn!("{}: poller still running after {} ms", sensor, timeout_ms);
                Err(SensorError::ShutdownTimeout {
                    sensor,
                    timeout_ms,
                })
            }
        }
    }
}

impl Default for SensorShared {
    fn default() -> Self {
        Self::new()
    }
}
