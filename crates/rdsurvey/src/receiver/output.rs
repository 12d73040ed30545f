use std::fmt;

use crate::decoder::ClockTime;

/// Receiver event, with the time it occurred
///
/// RDS decoding occurs at two separate layers:
///
/// 1. **Link layer**: the synchronizer frames the bitstream
///    into groups of four blocks. It reports when
///    synchronization is acquired or lost.
///
/// 2. **Station layer**: the group decoder accumulates
///    station information from each group. It reports
///    stations which are tuned or lost, clock time, and
///    switches to other networks.
///
/// The [`what()`](RdsEvent::what) method returns the event.
/// Every event is stamped with the lifetime bit count of the
/// receiver.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RdsEvent {
    what: LogEvent,
    bit_time: u64,
}

impl RdsEvent {
    /// The event which triggered the output
    pub fn what(&self) -> &LogEvent {
        &self.what
    }

    /// Event time, measured in received bits
    ///
    /// Reports the "time" of the event using a monotonic count
    /// of input bits. When decoding a group dump, each group
    /// counts as 104 bits.
    pub fn bit_time(&self) -> u64 {
        self.bit_time
    }

    /// Consume the event
    pub fn into_inner(self) -> LogEvent {
        self.what
    }
}

impl RdsEvent {
    /// Create from event and time
    pub(crate) fn new<E>(what: E, bit_time: u64) -> Self
    where
        E: Into<LogEvent>,
    {
        Self {
            what: what.into(),
            bit_time,
        }
    }
}

impl fmt::Display for RdsEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:<14}]: {}", self.bit_time, self.what)
    }
}

/// Discrete events of the receiver
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum LogEvent {
    /// A new station, with the given PI, is being decoded
    StationTuned { pi: u16 },

    /// The station with the given PI is no longer received
    StationLost { pi: u16 },

    /// The station transmitted its clock time
    ClockTime(ClockTime),

    /// Traffic announcement on another network
    ///
    /// The receiver should switch to the station with the
    /// given PI.
    EonSwitch { pi: u16 },

    /// Traffic announcement on another network has ended
    EonReturn { pi: u16 },

    /// The synchronizer has locked to the group structure
    SyncAcquired,

    /// The synchronizer has lost lock
    SyncLost,

    /// The input source is exhausted
    EndOfStream,
}

impl LogEvent {
    /// Station PI associated with the event, if any
    pub fn pi(&self) -> Option<u16> {
        match self {
            LogEvent::StationTuned { pi }
            | LogEvent::StationLost { pi }
            | LogEvent::EonSwitch { pi }
            | LogEvent::EonReturn { pi } => Some(*pi),
            _ => None,
        }
    }

    /// True if the event ends the input
    pub fn is_end(&self) -> bool {
        matches!(self, LogEvent::EndOfStream)
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEvent::StationTuned { pi } => write!(f, "station tuned: PI={:04X}", pi),
            LogEvent::StationLost { pi } => write!(f, "station lost: PI={:04X}", pi),
            LogEvent::ClockTime(ct) => write!(f, "clock time: {}", ct),
            LogEvent::EonSwitch { pi } => write!(f, "EON switch to PI={:04X}", pi),
            LogEvent::EonReturn { pi } => write!(f, "EON return from PI={:04X}", pi),
            LogEvent::SyncAcquired => f.write_str("sync acquired"),
            LogEvent::SyncLost => f.write_str("sync lost"),
            LogEvent::EndOfStream => f.write_str("end of stream"),
        }
    }
}

impl From<ClockTime> for LogEvent {
    fn from(ct: ClockTime) -> Self {
        LogEvent::ClockTime(ct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let evt = RdsEvent::new(LogEvent::StationTuned { pi: 0xf202 }, 104);
        assert_eq!("[104           ]: station tuned: PI=F202", evt.to_string());
        assert_eq!(Some(0xf202), evt.what().pi());
        assert!(!evt.what().is_end());

        let evt = RdsEvent::new(LogEvent::EndOfStream, 208);
        assert!(evt.into_inner().is_end());
    }
}
