/// Keyboard input tracker.
///
/// Tracks which keys are currently held down, enabling:
///   - Continuous movement while a direction key is held
///   - Edge-triggered bomb placement (fires once per key press)
///
/// Keys are looked up through `Action`, so the rest of the game never
/// names a `KeyCode` directly.
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

/// Logical keyboard actions.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    Left,
    Right,
    Up,
    Down,
    Bomb,
    Confirm,
    Cancel,
    Pause,
    Quit,
}

impl Action {
    /// Keys bound to this action (arrows / WASD, Space or X for bombs).
    pub fn keys(self) -> &'static [KeyCode] {
        match self {
            Action::Left => &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')],
            Action::Right => &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')],
            Action::Up => &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')],
            Action::Down => &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')],
            Action::Bomb => &[KeyCode::Char(' '), KeyCode::Char('x'), KeyCode::Char('X')],
            Action::Confirm => &[KeyCode::Enter],
            Action::Cancel => &[KeyCode::Esc],
            Action::Pause => &[KeyCode::F(1), KeyCode::Char('p'), KeyCode::Char('P')],
            Action::Quit => &[KeyCode::Char('q'), KeyCode::Char('Q')],
        }
    }
}

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from released to held during the latest drain.
    fresh_presses: Vec<KeyCode>,

    /// Ctrl+C seen during the latest drain.
    interrupted: bool,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            interrupted: false,
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before the simulation tick.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.interrupted = false;

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.apply(key, Instant::now());
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn apply(&mut self, key: KeyEvent, now: Instant) {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            self.interrupted = true;
            return;
        }
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            // Without enhancement, releases are unreliable; rely on the timeout
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.is_held_at(key.code, now);
                self.last_active.insert(key.code, now);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    /// Is any key of this action currently held down?
    pub fn held(&self, action: Action) -> bool {
        let now = Instant::now();
        action.keys().iter().any(|&c| self.is_held_at(c, now))
    }

    /// Was any key of this action freshly pressed this frame? (edge trigger)
    pub fn pressed(&self, action: Action) -> bool {
        action.keys().iter().any(|c| self.fresh_presses.contains(c))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.interrupted
    }

    fn is_held_at(&self, code: KeyCode, now: Instant) -> bool {
        self.last_active
            .get(&code)
            .map_or(false, |t| now.duration_since(*t) < HOLD_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, kind)
    }

    #[test]
    fn press_is_edge_then_held() {
        let mut input = InputState::new();
        let now = Instant::now();
        input.apply(key(KeyCode::Char(' '), KeyEventKind::Press), now);
        assert!(input.pressed(Action::Bomb));
        assert!(input.held(Action::Bomb));

        input.fresh_presses.clear();
        input.apply(key(KeyCode::Char(' '), KeyEventKind::Repeat), now);
        assert!(!input.pressed(Action::Bomb), "repeat must not re-trigger");
    }

    #[test]
    fn release_only_counts_with_enhancement() {
        let mut input = InputState::new();
        let now = Instant::now();
        input.apply(key(KeyCode::Left, KeyEventKind::Press), now);
        input.apply(key(KeyCode::Left, KeyEventKind::Release), now);
        assert!(input.held(Action::Left));

        input.honor_release = true;
        input.apply(key(KeyCode::Left, KeyEventKind::Release), now);
        assert!(!input.held(Action::Left));
    }

    #[test]
    fn ctrl_c_is_not_a_bomb() {
        let mut input = InputState::new();
        let ev = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        input.apply(ev, Instant::now());
        assert!(input.ctrl_c_pressed());
        assert!(input.fresh_presses.is_empty());
    }

    #[test]
    fn bindings_do_not_overlap() {
        let all = [
            Action::Left, Action::Right, Action::Up, Action::Down, Action::Bomb,
            Action::Confirm, Action::Cancel, Action::Pause, Action::Quit,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert!(
                    a.keys().iter().all(|k| !b.keys().contains(k)),
                    "{a:?} and {b:?} share a key"
                );
            }
        }
    }
}
