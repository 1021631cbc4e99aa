//! Notifications pushed to the keypad/display adapter
//!
//! Every notification is fire-and-forget and delivered synchronously while
//! the triggering keypad operation runs.

/// A single notification from the entry session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeypadEvent {
    /// Render the entry buffer, masked or revealed
    Display(String),
    /// Advisory message; empty clears it
    Message(String),
    /// Per-position "being changed" indicator
    PositionChanging { position: u32, active: bool },
    /// Aggregate "changing is active" indicator
    ChangingActive(bool),
    /// An entered PIN matched
    ValidPinEntered,
    /// An entered PIN matched the PIN at this position
    ValidPinAt(u32),
    /// An entered PIN matched the backdoor
    BackdoorPinEntered,
    /// An entered PIN matched nothing
    InvalidPinEntered,
    /// Change mode was cancelled, or the edited PIN was deleted
    ChangeCancelled,
    /// The edited PIN was saved
    ChangeSuccessful,
}

impl KeypadEvent {
    /// Whether this is a one-shot pulse rather than a level/text output
    pub fn is_pulse(&self) -> bool {
        !matches!(
            self,
            KeypadEvent::Display(_)
                | KeypadEvent::Message(_)
                | KeypadEvent::PositionChanging { .. }
                | KeypadEvent::ChangingActive(_)
        )
    }
}

/// Receiver for session notifications
pub trait KeypadObserver {
    fn notify(&mut self, event: KeypadEvent);
}

impl<F> KeypadObserver for F
where
    F: FnMut(KeypadEvent),
{
    fn notify(&mut self, event: KeypadEvent) {
        self(event)
    }
}

/// Observer that records every notification in order
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<KeypadEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, oldest first
    pub fn events(&self) -> &[KeypadEvent] {
        &self.events
    }

    /// Remove and return all recorded events
    pub fn drain(&mut self) -> Vec<KeypadEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn contains(&self, event: &KeypadEvent) -> bool {
        self.events.contains(event)
    }

    /// Most recent display text, if any was rendered
    pub fn last_display(&self) -> Option<&str> {
        self.events.iter().rev().find_map(|event| match event {
            KeypadEvent::Display(text) => Some(text.as_str()),
            _ => None,
        })
    }

    /// Most recent advisory message, if any was set
    pub fn last_message(&self) -> Option<&str> {
        self.events.iter().rev().find_map(|event| match event {
            KeypadEvent::Message(text) => Some(text.as_str()),
            _ => None,
        })
    }

    /// Latest state of the indicator for `position`
    pub fn position_changing(&self, position: u32) -> bool {
        self.events
            .iter()
            .rev()
            .find_map(|event| match event {
                KeypadEvent::PositionChanging { position: p, active } if *p == position => {
                    Some(*active)
                }
                _ => None,
            })
            .unwrap_or(false)
    }

    /// Recorded pulses only, in order
    pub fn pulses(&self) -> Vec<&KeypadEvent> {
        self.events.iter().filter(|event| event.is_pulse()).collect()
    }
}

impl KeypadObserver for EventLog {
    fn notify(&mut self, event: KeypadEvent) {
        self.events.push(event);
    }
}
