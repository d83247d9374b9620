//! Card topology
//!
//! Which tracks and counters exist and where they sit on the shift
//! register chains. The layout is fixed for a board revision, so it
//! is expressed as constants rather than configuration.

use slotio_protocol::MAX_LINE_BYTES;

/// Bytes sampled from the 74HC165 input chain
pub const INPUT_BYTES: usize = 3;

/// Bytes pushed to the 74HC595 output chain
pub const OUTPUT_BYTES: usize = 3;

/// Number of monitored coin/ticket tracks
pub const ALL_TRACKS: usize = 6;

/// Number of tracks that can be commanded to dispense
pub const EJECT_TRACKS: usize = 2;

/// Number of mechanical audit counters
pub const COUNTERS: usize = 4;

/// Reserved track index that never names a track
pub const NOT_A_TRACK: u8 = 0xFF;

/// Reserved counter index that never names a counter
pub const NOT_A_COUNTER: u8 = 0xFF;

/// Output bits the host may overwrite with `SET_OUTPUT`
///
/// Everything except the audit counter strobes and the eject motors.
pub const HOST_OUTPUT_MASK: [u8; OUTPUT_BYTES] = [0b0011_0000, 0xFF, 0xFF];

/// Input bits that go through a debounce filter
///
/// All other input bits are passed to the host unfiltered.
pub const DEBOUNCE_MASK: [u8; INPUT_BYTES] = [0b0000_0000, 0b1111_1000, 0b0000_0010];

const _: () = assert!(INPUT_BYTES <= MAX_LINE_BYTES && OUTPUT_BYTES <= MAX_LINE_BYTES);

/// A single bit in a line image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Line {
    pub byte: u8,
    pub bit: u8,
}

impl Line {
    pub const fn new(byte: u8, bit: u8) -> Self {
        Self { byte, bit }
    }

    /// Bit mask within the line's byte
    pub const fn mask(self) -> u8 {
        1 << self.bit
    }

    /// Read this line from an image (true = high)
    pub fn read(self, image: &[u8]) -> bool {
        image
            .get(self.byte as usize)
            .is_some_and(|b| b & self.mask() != 0)
    }

    /// Set this line in an image
    pub fn write(self, image: &mut [u8], high: bool) {
        if let Some(b) = image.get_mut(self.byte as usize) {
            if high {
                *b |= self.mask();
            } else {
                *b &= !self.mask();
            }
        }
    }
}

/// Coin/ticket tracks
///
/// The discriminant is the wire index used by the host protocol and
/// the slot index in the persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Track {
    Hopper = 0,
    Ticket = 1,
    Insert1 = 2,
    Insert2 = 3,
    Insert3 = 4,
    Banknote = 5,
}

impl Track {
    pub const ALL: [Track; ALL_TRACKS] = [
        Track::Hopper,
        Track::Ticket,
        Track::Insert1,
        Track::Insert2,
        Track::Insert3,
        Track::Banknote,
    ];

    /// Look up a track by wire index
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Sensor line on the input chain
    pub fn sensor(self) -> Line {
        match self {
            Track::Hopper => Line::new(1, 3),
            Track::Insert1 => Line::new(1, 4),
            Track::Insert2 => Line::new(1, 5),
            Track::Insert3 => Line::new(1, 6),
            Track::Banknote => Line::new(1, 7),
            Track::Ticket => Line::new(2, 1),
        }
    }

    /// The eject channel behind this track, if it can dispense
    pub fn eject(self) -> Option<EjectTrack> {
        match self {
            Track::Hopper => Some(EjectTrack::Hopper),
            Track::Ticket => Some(EjectTrack::Ticket),
            _ => None,
        }
    }

    /// Audit counter pulsed once per coin seen on this track
    pub fn audit_counter(self) -> Option<Counter> {
        match self {
            Track::Hopper => Some(Counter::CoinOut),
            Track::Insert1 | Track::Insert2 | Track::Insert3 => Some(Counter::CoinIn),
            Track::Ticket | Track::Banknote => None,
        }
    }
}

/// Tracks capable of dispensing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum EjectTrack {
    Hopper = 0,
    Ticket = 1,
}

impl EjectTrack {
    pub const ALL: [EjectTrack; EJECT_TRACKS] = [EjectTrack::Hopper, EjectTrack::Ticket];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn track(self) -> Track {
        match self {
            EjectTrack::Hopper => Track::Hopper,
            EjectTrack::Ticket => Track::Ticket,
        }
    }

    /// Motor (SSR) line on the output chain
    pub fn motor(self) -> Line {
        match self {
            EjectTrack::Hopper => Line::new(0, 7),
            EjectTrack::Ticket => Line::new(0, 6),
        }
    }
}

/// Mechanical audit counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Counter {
    Score = 0,
    WashScore = 1,
    CoinIn = 2,
    CoinOut = 3,
}

impl Counter {
    pub const ALL: [Counter; COUNTERS] = [
        Counter::Score,
        Counter::WashScore,
        Counter::CoinIn,
        Counter::CoinOut,
    ];

    /// Look up a counter by wire index
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Strobe line on the output chain
    pub fn output(self) -> Line {
        Line::new(0, self as u8)
    }
}
