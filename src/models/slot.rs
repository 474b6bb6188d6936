use serde::{Deserialize, Serialize};

/// First bookable hour of the day.
pub const OPENING_HOUR: u8 = 4;
/// Hour at which the last slot ends.
pub const CLOSING_HOUR: u8 = 22;

/// Half-open range of whole hours, `[start, end)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HourRange {
    pub start: u8,
    pub end: u8,
}

impl HourRange {
    /// Builds a range inside the operating window, or `None` when it falls outside
    /// `[OPENING_HOUR, CLOSING_HOUR]` or is shorter than one hour.
    pub fn new(start: u8, end: u8) -> Option<Self> {
        let in_window = start >= OPENING_HOUR
            && start < CLOSING_HOUR
            && end > OPENING_HOUR
            && end <= CLOSING_HOUR;
        if in_window && end > start {
            Some(Self { start, end })
        } else {
            None
        }
    }

    pub fn overlaps(&self, other: &HourRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn hours(&self) -> std::ops::Range<u8> {
        self.start..self.end
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SlotAvailability {
    pub slot: String,
    pub available_slots: u32,
}

impl SlotAvailability {
    pub fn label(hour: u8) -> String {
        format!("{}:00 - {}:00", hour, hour + 1)
    }
}
