//! Cooperative control loop
//!
//! One [`ControlLoop::step`] is one iteration of the card's main loop:
//!
//! 1. Sample the raw input lines
//! 2. Evaluate the ack timeout, then every eject deadline
//! 3. Feed every debounce filter with its line and persisted active level
//! 4. React to debounced edges (arrivals, inserts)
//! 5. Advance the audit counter pulse generators
//! 6. Report changes of the unfiltered input lines
//! 7. Execute at most one host command
//! 8. Latch the output image if anything changed
//!
//! The order is load-bearing: deadlines are checked before new arrivals
//! can restart them, and all output changes of an iteration are latched
//! together at the end.

mod commands;
mod eject;
mod outputs;

pub use commands::CommandError;
pub use eject::{EjectChannel, EjectState};
pub use outputs::OutputImage;

use heapless::Vec;
use slotio_protocol::{DeviceEvent, ErrorEvent, MAX_LINE_BYTES};

use crate::config::{BoardConfig, ConfigError};
use crate::storage::{ConfigRecord, OpenOutcome, PersistentStore};
use crate::timing::{DebounceFilter, Edge, PulseGenerator, PulsePhase, TimeoutTracker};
use crate::topology::{
    Counter, EjectTrack, Track, ALL_TRACKS, COUNTERS, DEBOUNCE_MASK, EJECT_TRACKS, INPUT_BYTES,
};
use crate::traits::{HostLink, IoBoard, IoError, NvError, NvStorage, Watchdog};

/// Whether the loop should keep running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Flow {
    Continue,
    /// Reboot requested; the watchdog is no longer fed
    Halted,
}

/// Device failures that abort the rest of an iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoopError {
    Io(IoError),
    Storage(NvError),
    Config(ConfigError),
}

impl From<IoError> for LoopError {
    fn from(e: IoError) -> Self {
        LoopError::Io(e)
    }
}

impl From<NvError> for LoopError {
    fn from(e: NvError) -> Self {
        LoopError::Storage(e)
    }
}

impl From<ConfigError> for LoopError {
    fn from(e: ConfigError) -> Self {
        LoopError::Config(e)
    }
}

/// The card's device context
///
/// Owns every collaborator and every piece of runtime state; nothing is
/// shared outside of it.
pub struct ControlLoop<IO, NV, H, W> {
    io: IO,
    store: PersistentStore<NV>,
    host: H,
    watchdog: W,
    board: BoardConfig,

    inputs: [u8; INPUT_BYTES],
    /// Last reported state of the lines outside [`DEBOUNCE_MASK`]
    unfiltered: [u8; INPUT_BYTES],
    outputs: OutputImage,

    filters: [DebounceFilter; ALL_TRACKS],
    pulses: [PulseGenerator; COUNTERS],
    ejects: [EjectChannel; EJECT_TRACKS],
    ack_timeout: TimeoutTracker,

    halted: bool,
}

impl<IO, NV, H, W> ControlLoop<IO, NV, H, W>
where
    IO: IoBoard,
    NV: NvStorage,
    H: HostLink,
    W: Watchdog,
{
    /// Bring the card up
    ///
    /// Arms the watchdog, opens the store, clears the outputs, seeds the
    /// debounce filters from the current inputs and announces the boot to
    /// the host. Eject tracks always start idle. The watchdog is armed as
    /// soon as the configuration is known to be valid, so a device failure
    /// later in boot ends in a reset.
    pub fn boot(
        mut io: IO,
        nv: NV,
        mut host: H,
        mut watchdog: W,
        board: BoardConfig,
        now: u32,
    ) -> Result<(Self, OpenOutcome), LoopError> {
        board.validate()?;
        let t = &board.timing;
        watchdog.arm(t.watchdog_us);

        let defaults = ConfigRecord::defaults(board.track_levels, board.timing.eject_timeout_us);
        let (store, outcome) = PersistentStore::open(nv, board.storage, defaults)?;

        let mut outputs = OutputImage::new();
        io.assert_outputs(outputs.bytes())?;
        outputs.mark_clean();

        let mut inputs = [0u8; INPUT_BYTES];
        io.sample_inputs(&mut inputs)?;

        let mut filters = [DebounceFilter::new(t.debounce_us); ALL_TRACKS];
        for track in Track::ALL {
            let active = track.sensor().read(&inputs) == store.track_level(track);
            filters[track.index()].begin(active, now);
        }

        let mut ejects = [EjectChannel::new(t.eject_timeout_us); EJECT_TRACKS];
        for eject in EjectTrack::ALL {
            ejects[eject.index()].set_timeout(store.eject_timeout(eject));
        }

        host.send_event(DeviceEvent::Boot {
            storage: outcome.code(),
        });

        let control = Self {
            io,
            store,
            host,
            watchdog,
            board,
            unfiltered: unfiltered_bits(&inputs),
            inputs,
            outputs,
            filters,
            pulses: [PulseGenerator::new(t.pulse_high_us, t.pulse_low_us); COUNTERS],
            ejects,
            ack_timeout: TimeoutTracker::new(t.ack_timeout_us),
            halted: false,
        };

        Ok((control, outcome))
    }

    /// Run one iteration
    ///
    /// A device error aborts the rest of the iteration, but output changes
    /// made before it are still latched. Output that fails to latch stays
    /// dirty and is retried on the next iteration. The watchdog is fed
    /// unless a reboot was requested.
    pub fn step(&mut self, now: u32) -> Result<Flow, LoopError> {
        if self.halted {
            return Ok(Flow::Halted);
        }

        let result = self.iterate(now);
        let latched = self.latch_outputs();
        let result = result.and(latched);

        if self.halted {
            return result.map(|_| Flow::Halted);
        }
        self.watchdog.feed();
        result.map(|_| Flow::Continue)
    }

    fn iterate(&mut self, now: u32) -> Result<(), LoopError> {
        self.io.sample_inputs(&mut self.inputs)?;
        self.check_timeouts(now);
        self.feed_filters(now)?;
        self.update_pulses(now)?;
        self.report_unfiltered();

        if let Some(frame) = self.host.recv_command() {
            self.dispatch(&frame, now)?;
        }
        Ok(())
    }

    fn latch_outputs(&mut self) -> Result<(), LoopError> {
        if self.outputs.is_dirty() {
            self.io.assert_outputs(self.outputs.bytes())?;
            self.outputs.mark_clean();
        }
        Ok(())
    }

    fn check_timeouts(&mut self, now: u32) {
        if self.ack_timeout.trigger(now) {
            // Host stopped acknowledging: halt every track
            for eject in EjectTrack::ALL {
                if self.ejects[eject.index()].is_dispensing() {
                    self.stop_dispensing(eject);
                    self.report_timeout(eject);
                }
            }
        }

        for eject in EjectTrack::ALL {
            if self.ejects[eject.index()].timed_out(now) {
                self.stop_dispensing(eject);
                self.report_timeout(eject);
            }
        }
    }

    fn report_timeout(&mut self, eject: EjectTrack) {
        self.host.send_event(DeviceEvent::Error(ErrorEvent::EjectTimeout {
            track: eject.track() as u8,
            remaining: self.store.coins_to_eject(eject),
        }));
    }

    fn feed_filters(&mut self, now: u32) -> Result<(), LoopError> {
        for track in Track::ALL {
            let observed = track.sensor().read(&self.inputs);
            let active_level = self.store.track_level(track);

            if let Some(Edge::Raise) = self.filters[track.index()].feed(observed, active_level, now) {
                match track.eject() {
                    Some(eject) => self.on_arrival(eject, now)?,
                    None => self.count_coin(track)?,
                }
            }
        }
        Ok(())
    }

    /// A unit left an eject track
    fn on_arrival(&mut self, eject: EjectTrack, now: u32) -> Result<(), LoopError> {
        if !self.ejects[eject.index()].is_dispensing() {
            return Ok(());
        }

        let remaining = self.store.coins_to_eject(eject).saturating_sub(1);

        // One more unit is already on its way when the motor stops.
        // The motor must be decided before the writes below can fail.
        if remaining < 2 {
            self.stop_dispensing(eject);
        } else {
            self.ejects[eject.index()].restart(now);
            self.ack_timeout.start(now);
        }

        self.store.set_coins_to_eject(eject, remaining)?;
        self.count_coin(eject.track())
    }

    /// Persist, pulse and report one coin on `track`
    fn count_coin(&mut self, track: Track) -> Result<(), LoopError> {
        let count = self.store.coin_count(track).wrapping_add(1);
        self.store.set_coin_count(track, count)?;

        if let Some(counter) = track.audit_counter() {
            self.pulses[counter.index()].pulse(1);
        }

        self.host.send_event(DeviceEvent::CoinCounter {
            track: track as u8,
            count,
        });
        Ok(())
    }

    fn start_dispensing(&mut self, eject: EjectTrack, now: u32) {
        self.ejects[eject.index()].start(now);
        self.ack_timeout.start(now);
        self.outputs.set(eject.motor(), true);
    }

    fn stop_dispensing(&mut self, eject: EjectTrack) {
        self.ejects[eject.index()].stop();
        self.outputs.set(eject.motor(), false);

        // The ack deadline is shared; keep it while another track runs
        if !self.ejects.iter().any(EjectChannel::is_dispensing) {
            self.ack_timeout.stop();
        }
    }

    fn update_pulses(&mut self, now: u32) -> Result<(), LoopError> {
        for counter in Counter::ALL {
            let pulse = &mut self.pulses[counter.index()];
            let before = pulse.phase();
            if !pulse.update(now) {
                continue;
            }

            let level = pulse.get();
            self.outputs.set(counter.output(), level);

            if before == PulsePhase::Low {
                let ticks = self.store.counter_ticks(counter).wrapping_add(1);
                self.store.set_counter_ticks(counter, ticks)?;
            }
        }
        Ok(())
    }

    fn report_unfiltered(&mut self) {
        let unfiltered = unfiltered_bits(&self.inputs);
        if unfiltered != self.unfiltered {
            self.unfiltered = unfiltered;
            let keys = self.keys();
            self.host.send_event(DeviceEvent::Keys(keys));
        }
    }

    /// Input snapshot: debounced lines at their settled physical level,
    /// every other line as sampled
    pub fn keys(&self) -> Vec<u8, MAX_LINE_BYTES> {
        let mut keys = unfiltered_bits(&self.inputs);
        for track in Track::ALL {
            let active_level = self.store.track_level(track);
            let level = if self.filters[track.index()].output() {
                active_level
            } else {
                !active_level
            };
            track.sensor().write(&mut keys, level);
        }
        line_bytes(&keys)
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn eject_state(&self, eject: EjectTrack) -> EjectState {
        self.ejects[eject.index()].state()
    }

    pub fn store(&self) -> &PersistentStore<NV> {
        &self.store
    }

    pub fn io(&self) -> &IO {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut IO {
        &mut self.io
    }

    #[cfg(test)]
    pub(crate) fn storage_mut(&mut self) -> &mut NV {
        self.store.device_mut()
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn watchdog(&self) -> &W {
        &self.watchdog
    }
}

fn unfiltered_bits(inputs: &[u8; INPUT_BYTES]) -> [u8; INPUT_BYTES] {
    let mut bits = *inputs;
    for (b, mask) in bits.iter_mut().zip(DEBOUNCE_MASK) {
        *b &= !mask;
    }
    bits
}

fn line_bytes(bytes: &[u8]) -> Vec<u8, MAX_LINE_BYTES> {
    Vec::from_slice(&bytes[..bytes.len().min(MAX_LINE_BYTES)]).unwrap_or_default()
}
