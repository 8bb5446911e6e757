pub use crate::audio::{GainStage, SessionGraph, SessionId};
use crate::error::Error;

pub enum AudioCommand {
    // The engine can't build graphs (it would allocate on the audio thread),
    // so the middle layer builds a whole session and moves it over.
    Attach(Box<SessionGraph>),

    // Drop the current session; the engine hands it back as `Retired`.
    Detach,

    SetPitch(f32),
    SetGain(GainStage, f32),
}

pub enum EngineEvent {
    // The session's source ran out and everything it owed has been played.
    Finished(SessionId),

    // A detached session, returned so it is freed off the audio thread.
    Retired(Box<SessionGraph>),
}

/// What the middle layer needs from the output side. The real one is a cpal
/// stream; tests drive an engine directly.
pub trait AudioOutput {
    // Hands the command back when the queue is full.
    fn send(&mut self, cmd: AudioCommand) -> Result<(), AudioCommand>;
    fn suspend(&mut self) -> Result<(), Error>;
    fn resume(&mut self) -> Result<(), Error>;
    fn sample_rate(&self) -> u32;
    fn poll_event(&mut self) -> Option<EngineEvent>;
}
