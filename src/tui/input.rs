use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use crate::shared::{InputEvent, MASTER_STEP, PITCH_STEP, TRIM_STEP_DB, VisMode};

// poll for a key press from the terminal and resolve it into input events
// for the middle layer; waits at most `timeout`, which paces the main loop
pub fn poll_input(timeout: Duration) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        return Ok(handle_key(key.code).into_iter().collect());
    }
    Ok(vec![])
}

fn handle_key(code: KeyCode) -> Option<InputEvent> {
    let event = match code {
        KeyCode::Esc | KeyCode::Char('q') => InputEvent::Quit,

        // transport
        KeyCode::Char(' ') => InputEvent::Play,
        KeyCode::Char('p') => InputEvent::PauseToggle,
        KeyCode::Char('s') => InputEvent::Stop,
        KeyCode::Char('l') => InputEvent::Reload,

        // sliders, lower key = down
        KeyCode::Char('[') => InputEvent::NudgePitch(-PITCH_STEP),
        KeyCode::Char(']') => InputEvent::NudgePitch(PITCH_STEP),
        KeyCode::Char('0') => InputEvent::ResetPitch,
        KeyCode::Char('-') => InputEvent::NudgeMaster(-MASTER_STEP),
        KeyCode::Char('=') => InputEvent::NudgeMaster(MASTER_STEP),
        KeyCode::Char(';') => InputEvent::NudgeTrim(-TRIM_STEP_DB),
        KeyCode::Char('\'') => InputEvent::NudgeTrim(TRIM_STEP_DB),

        KeyCode::Char(c) => InputEvent::SelectVis(VisMode::from_digit(c)?),
        _ => return None,
    };
    Some(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_keys() {
        assert_eq!(handle_key(KeyCode::Char(' ')), Some(InputEvent::Play));
        assert_eq!(handle_key(KeyCode::Char('p')), Some(InputEvent::PauseToggle));
        assert_eq!(handle_key(KeyCode::Char('s')), Some(InputEvent::Stop));
        assert_eq!(handle_key(KeyCode::Esc), Some(InputEvent::Quit));
    }

    #[test]
    fn slider_keys_step_both_ways() {
        assert_eq!(handle_key(KeyCode::Char('[')), Some(InputEvent::NudgePitch(-0.5)));
        assert_eq!(handle_key(KeyCode::Char('=')), Some(InputEvent::NudgeMaster(0.05)));
        assert_eq!(handle_key(KeyCode::Char(';')), Some(InputEvent::NudgeTrim(-1.0)));
    }

    #[test]
    fn digits_pick_visualization() {
        assert_eq!(handle_key(KeyCode::Char('3')), Some(InputEvent::SelectVis(VisMode::Lightning)));
        assert_eq!(handle_key(KeyCode::Char('7')), None);
        assert_eq!(handle_key(KeyCode::Tab), None);
    }
}
