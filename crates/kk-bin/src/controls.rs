//! Keyboard controls for the interactive player.

use anyhow::Result;
use core_player::Player;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::debug;

/// Seek step for the arrow keys, in ms.
pub const SEEK_STEP_MS: f64 = 1000.0;
/// Multiplier applied by `+` / divided by `-`.
pub const SPEED_STEP: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Control {
    Quit,
    TogglePause,
    Restart,
    SeekBy(f64),
    ScaleSpeed(f64),
}

pub fn control_for(key: KeyEvent) -> Option<Control> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Control::Quit),
        KeyCode::Char('q') | KeyCode::Esc => Some(Control::Quit),
        KeyCode::Char(' ') => Some(Control::TogglePause),
        KeyCode::Char('r') | KeyCode::Home => Some(Control::Restart),
        KeyCode::Left => Some(Control::SeekBy(-SEEK_STEP_MS)),
        KeyCode::Right => Some(Control::SeekBy(SEEK_STEP_MS)),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(Control::ScaleSpeed(SPEED_STEP)),
        KeyCode::Char('-') => Some(Control::ScaleSpeed(1.0 / SPEED_STEP)),
        _ => None,
    }
}

/// Apply a control to the player. Returns false when the loop should exit.
pub fn apply(player: &mut Player, control: Control) -> Result<bool> {
    debug!(target: "runtime.input", ?control, "control");
    match control {
        Control::Quit => return Ok(false),
        Control::TogglePause => {
            if player.state().is_playing {
                player.pause();
            } else {
                player.play()?;
            }
        }
        Control::Restart => {
            player.stop();
            player.play()?;
        }
        Control::SeekBy(delta) => {
            let target = player.state().current_time + delta;
            player.seek(target)?;
        }
        Control::ScaleSpeed(factor) => {
            let speed = player.state().speed * factor;
            player.set_speed(speed.clamp(0.1, 64.0))?;
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::{Document, Event, SessionMeta};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn loaded() -> Player {
        let mut p = Player::new();
        p.load(Document::new(
            SessionMeta::default(),
            "",
            vec![
                Event::input(0.0, "insertText", Some("a")),
                Event::input(2000.0, "insertText", Some("b")),
                Event::input(4000.0, "insertText", Some("c")),
            ],
        ))
        .unwrap();
        p
    }

    #[test]
    fn maps_keys() {
        assert_eq!(control_for(press(KeyCode::Char('q'))), Some(Control::Quit));
        assert_eq!(
            control_for(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Control::Quit)
        );
        assert_eq!(control_for(press(KeyCode::Char('c'))), None);
        assert_eq!(control_for(press(KeyCode::Char(' '))), Some(Control::TogglePause));
        assert_eq!(control_for(press(KeyCode::Left)), Some(Control::SeekBy(-SEEK_STEP_MS)));
    }

    #[test]
    fn ignores_key_release() {
        let mut key = press(KeyCode::Char('q'));
        key.kind = KeyEventKind::Release;
        assert_eq!(control_for(key), None);
    }

    #[test]
    fn toggle_and_seek_drive_the_player() {
        let mut p = loaded();
        assert!(apply(&mut p, Control::TogglePause).unwrap());
        assert!(p.state().is_playing);
        apply(&mut p, Control::TogglePause).unwrap();
        assert!(!p.state().is_playing);

        apply(&mut p, Control::SeekBy(2500.0)).unwrap();
        assert_eq!(p.text_state().text, "ab");
        apply(&mut p, Control::SeekBy(-SEEK_STEP_MS * 10.0)).unwrap();
        assert_eq!(p.state().current_time, 0.0);
        assert_eq!(p.text_state().text, "a");
    }

    #[test]
    fn speed_is_bounded() {
        let mut p = loaded();
        for _ in 0..40 {
            apply(&mut p, Control::ScaleSpeed(SPEED_STEP)).unwrap();
        }
        assert_eq!(p.state().speed, 64.0);
        assert!(!apply(&mut p, Control::Quit).unwrap());
    }
}
