//! Sensor event channel
//!
//! The polling loop reports non-fatal problems here instead of returning
//! errors, so it can keep running after a transient bus fault.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pubsub::{PubSubChannel, Publisher, Subscriber};

/// Channel capacity for sensor events.
/// Set to 8 so a burst of bus faults does not evict events before a subscriber wakes.
pub const EVENT_CHANNEL_CAPACITY: usize = 8;

/// Number of subscribers that can listen to sensor events
/// - Subscriber 0: display/application task
/// - Subscriber 1: diagnostics logger
pub const EVENT_SUBSCRIBERS: usize = 2;

/// Number of publishers (one per sensor poller)
pub const EVENT_PUBLISHERS: usize = 1;

/// Events published by the sensor poller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorEvent {
    /// A bus transaction failed during a polling cycle
    BusError {
        /// Which step of the cycle failed
        operation: &'static str,
    },
    /// A read returned fewer bytes than the protocol step needs.
    /// Only published when malformed read reporting is enabled.
    MalformedRead { expected: usize, got: usize },
}

pub type SensorEventChannel = PubSubChannel<
    CriticalSectionRawMutex,
    SensorEvent,
    EVENT_CHANNEL_CAPACITY,
    EVENT_SUBSCRIBERS,
    EVENT_PUBLISHERS,
>;

pub type SensorEventPublisher<'a> = Publisher<
    'a,
    CriticalSectionRawMutex,
    SensorEvent,
    EVENT_CHANNEL_CAPACITY,
    EVENT_SUBSCRIBERS,
    EVENT_PUBLISHERS,
>;

pub type SensorEventSubscriber<'a> = Subscriber<
    'a,
    CriticalSectionRawMutex,
    SensorEvent,
    EVENT_CHANNEL_CAPACITY,
    EVENT_SUBSCRIBERS,
    EVENT_PUBLISHERS,
>;
