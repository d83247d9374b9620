//! Host command interpreter

use heapless::Vec;
use slotio_protocol::{DeviceEvent, ErrorEvent, Frame, HostCommand, ParseError, MAX_STORAGE_CHUNK};

use crate::topology::{Counter, EjectTrack, Track, DEBOUNCE_MASK, HOST_OUTPUT_MASK};
use crate::traits::{HostLink, IoBoard, NvStorage, Watchdog};

use super::{line_bytes, ControlLoop, LoopError};

/// Rejected host request
///
/// Detected before any state is touched and reported to the host as an
/// [`ErrorEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    NotATrack(u8),
    NotACounter(u8),
    EjectInterrupted { track: EjectTrack, remaining: u8 },
    ProtectedStorage(u16),
    TooLong { max: u8, requested: u8 },
    OutOfRange { address: u16, length: u8 },
    UnknownCommand(u8),
}

impl From<ParseError> for CommandError {
    fn from(e: ParseError) -> Self {
        // Short payloads are indistinguishable from garbage for the host
        CommandError::UnknownCommand(e.opcode())
    }
}

impl From<CommandError> for ErrorEvent {
    fn from(e: CommandError) -> Self {
        match e {
            CommandError::NotATrack(track) => ErrorEvent::NotATrack { track },
            CommandError::NotACounter(counter) => ErrorEvent::NotACounter { counter },
            CommandError::EjectInterrupted { track, remaining } => ErrorEvent::EjectInterrupted {
                track: track.track() as u8,
                remaining,
            },
            CommandError::ProtectedStorage(address) => ErrorEvent::ProtectedStorage { address },
            CommandError::TooLong { max, requested } => ErrorEvent::TooLong { max, requested },
            CommandError::OutOfRange { address, length } => {
                ErrorEvent::OutOfRange { address, length }
            }
            CommandError::UnknownCommand(opcode) => ErrorEvent::UnknownCommand { opcode },
        }
    }
}

/// Reply to send, if any, or the reason the command was rejected
type Outcome = Result<Option<DeviceEvent>, CommandError>;

fn track(index: u8) -> Result<Track, CommandError> {
    Track::from_index(index).ok_or(CommandError::NotATrack(index))
}

fn eject_track(index: u8) -> Result<EjectTrack, CommandError> {
    track(index)?.eject().ok_or(CommandError::NotATrack(index))
}

fn counter(index: u8) -> Result<Counter, CommandError> {
    Counter::from_index(index).ok_or(CommandError::NotACounter(index))
}

impl<IO, NV, H, W> ControlLoop<IO, NV, H, W>
where
    IO: IoBoard,
    NV: NvStorage,
    H: HostLink,
    W: Watchdog,
{
    /// Decode and run one command frame, then report the outcome
    pub(super) fn dispatch(&mut self, frame: &Frame, now: u32) -> Result<(), LoopError> {
        let outcome = match HostCommand::from_frame(frame) {
            Ok(command) => self.execute(command, now)?,
            Err(e) => Err(e.into()),
        };

        match outcome {
            Ok(Some(reply)) => self.host.send_event(reply),
            Ok(None) => {}
            Err(e) => self.host.send_event(DeviceEvent::Error(e.into())),
        }
        Ok(())
    }

    fn execute(&mut self, command: HostCommand, now: u32) -> Result<Outcome, LoopError> {
        let outcome = match command {
            HostCommand::Ack => {
                self.ack_timeout.stop();
                Ok(None)
            }
            HostCommand::GetInfo => Ok(Some(DeviceEvent::Info(self.board.identity))),
            HostCommand::GetKeyMasks => Ok(Some(DeviceEvent::KeyMasks(line_bytes(&DEBOUNCE_MASK)))),
            HostCommand::GetKeys => Ok(Some(DeviceEvent::Keys(self.keys()))),
            HostCommand::SetOutput { bytes } => {
                self.outputs.overwrite_masked(&bytes, &HOST_OUTPUT_MASK);
                Ok(None)
            }
            HostCommand::GetCoinCounter { track: index } => match track(index) {
                Ok(t) => Ok(Some(DeviceEvent::CoinCounter {
                    track: index,
                    count: self.store.coin_count(t),
                })),
                Err(e) => Err(e),
            },
            HostCommand::ResetCoinCounter { track: index } => match track(index) {
                Ok(t) => {
                    self.store.set_coin_count(t, 0)?;
                    Ok(Some(DeviceEvent::CoinCounter {
                        track: index,
                        count: 0,
                    }))
                }
                Err(e) => Err(e),
            },
            HostCommand::TickAuditCounter {
                counter: index,
                ticks,
            } => counter(index).map(|c| {
                self.pulses[c.index()].pulse(ticks);
                None
            }),
            HostCommand::Eject { track: index, count } => match eject_track(index) {
                Ok(eject) => self.eject(eject, count, now)?,
                Err(e) => Err(e),
            },
            HostCommand::SetTrackLevel {
                track: index,
                active_high,
            } => match track(index) {
                Ok(t) => {
                    self.store.set_track_level(t, active_high)?;
                    Ok(None)
                }
                Err(e) => Err(e),
            },
            HostCommand::SetEjectTimeout {
                track: index,
                timeout_us,
            } => match eject_track(index) {
                Ok(eject) => {
                    self.store.set_eject_timeout(eject, timeout_us)?;
                    self.ejects[eject.index()].set_timeout(timeout_us);
                    Ok(None)
                }
                Err(e) => Err(e),
            },
            HostCommand::ReadStorage { address, length } => {
                match self.check_storage(address, length as usize) {
                    Ok(()) => self.read_storage(address, length)?,
                    Err(e) => Err(e),
                }
            }
            HostCommand::WriteStorage { address, data } => {
                match self.check_storage(address, data.len()) {
                    Ok(()) => {
                        self.store.write_bytes(address, &data)?;
                        Ok(Some(DeviceEvent::StorageWritten {
                            address,
                            length: data.len() as u8,
                        }))
                    }
                    Err(e) => Err(e),
                }
            }
            HostCommand::Reboot => {
                for eject in EjectTrack::ALL {
                    if self.ejects[eject.index()].is_dispensing() {
                        self.stop_dispensing(eject);
                    }
                }
                self.halted = true;
                Ok(None)
            }
        };

        Ok(outcome)
    }

    /// Start (`count > 0`) or cancel (`count == 0`) dispensing
    fn eject(&mut self, eject: EjectTrack, count: u8, now: u32) -> Result<Outcome, LoopError> {
        if count == 0 {
            self.stop_dispensing(eject);
            self.store.set_coins_to_eject(eject, 0)?;
            return Ok(Ok(None));
        }

        if self.ejects[eject.index()].is_dispensing() {
            return Ok(Err(CommandError::EjectInterrupted {
                track: eject,
                remaining: self.store.coins_to_eject(eject),
            }));
        }

        self.store.set_coins_to_eject(eject, count)?;
        self.start_dispensing(eject, now);
        Ok(Ok(None))
    }

    fn read_storage(&mut self, address: u16, length: u8) -> Result<Outcome, LoopError> {
        let mut data = Vec::<u8, MAX_STORAGE_CHUNK>::new();
        if data.resize(length as usize, 0).is_err() {
            return Ok(Err(CommandError::TooLong {
                max: MAX_STORAGE_CHUNK as u8,
                requested: length,
            }));
        }
        self.store.read_bytes(address, &mut data)?;
        Ok(Ok(Some(DeviceEvent::StorageRead { address, data })))
    }

    /// Validate a host storage access against the user region
    fn check_storage(&self, address: u16, length: usize) -> Result<(), CommandError> {
        let s = &self.board.storage;

        if address < s.user_start {
            return Err(CommandError::ProtectedStorage(address));
        }
        if length > s.max_transfer as usize {
            return Err(CommandError::TooLong {
                max: s.max_transfer,
                requested: length.min(u8::MAX as usize) as u8,
            });
        }
        if address as u32 + length as u32 > s.capacity {
            return Err(CommandError::OutOfRange {
                address,
                length: length as u8,
            });
        }
        Ok(())
    }
}
