use crossbeam_channel::Sender;

use super::frame::StereoFrame;
use super::session::SessionGraph;
use super::session_id::SessionId;
use crate::audio_api::{AudioCommand, EngineEvent};

// Lives inside the output callback. Owns at most one session at a time and
// only ever talks to the rest of the app through channels.
pub struct Engine {
    session: Option<Box<SessionGraph>>,
    tap: Option<rtrb::Producer<f32>>, // post-gain mono feed for the analyser
    events: Sender<EngineEvent>,
    unreported_end: Option<SessionId>, // Finished that didn't fit in the event channel yet
}

impl Engine {
    pub fn new(tap: Option<rtrb::Producer<f32>>, events: Sender<EngineEvent>) -> Self {
        Self {
            session: None,
            tap,
            events,
            unreported_end: None,
        }
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::Attach(graph) => {
                // never two sessions connected at once
                if let Some(old) = self.session.replace(graph) {
                    self.retire(old);
                }
                self.unreported_end = None;
            }
            AudioCommand::Detach => {
                if let Some(old) = self.session.take() {
                    self.retire(old);
                }
                self.unreported_end = None;
            }
            AudioCommand::SetPitch(semitones) => {
                if let Some(s) = self.session.as_mut() {
                    s.set_pitch(semitones);
                }
            }
            AudioCommand::SetGain(stage, value) => {
                if let Some(s) = self.session.as_mut() {
                    s.set_gain(stage, value);
                }
            }
        }
    }

    fn retire(&mut self, mut graph: Box<SessionGraph>) {
        graph.teardown();
        // if the channel is full the graph is dropped right here instead
        let _ = self.events.try_send(EngineEvent::Retired(graph));
    }

    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        match self.session.as_mut() {
            Some(session) => {
                if session.render(out) {
                    self.unreported_end = Some(session.id());
                }
            }
            None => out.fill(StereoFrame::zero()),
        }

        // retried every block until the controller has room for it
        if let Some(id) = self.unreported_end {
            if self.events.try_send(EngineEvent::Finished(id)).is_ok() {
                self.unreported_end = None;
            }
        }

        if let Some(tap) = self.tap.as_mut() {
            for f in out.iter() {
                if tap.push(f.mono()).is_err() {
                    break; // analyser is behind, it only wants the latest anyway
                }
            }
        }
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    #[cfg(test)]
    pub(crate) fn session(&self) -> Option<&SessionGraph> {
        self.session.as_deref()
    }
}
