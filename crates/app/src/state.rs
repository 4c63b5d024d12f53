//! State machine for a conversion

use frames::Sequence;

/// Application state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppState {
    /// Nothing loaded yet
    Idle,
    /// Sequence loaded, ready to convert
    Loaded,
    /// Conversion in progress
    Converting,
    /// Conversion finished, output available
    Converted,
}

impl AppState {
    /// Get display text for current state
    pub fn display_text(&self) -> &'static str {
        match self {
            AppState::Idle => "Ready",
            AppState::Loaded => "Sequence loaded",
            AppState::Converting => "Converting...",
            AppState::Converted => "Converted",
        }
    }

    /// Check if convert should be enabled
    pub fn can_convert(&self) -> bool {
        matches!(self, AppState::Loaded | AppState::Converted)
    }

    /// Check if a new sequence may be loaded
    pub fn can_load(&self) -> bool {
        !matches!(self, AppState::Converting)
    }
}

/// Loaded sequence and the result of its last conversion
#[derive(Debug, Clone)]
pub struct ConversionSession {
    pub sequence: Sequence,
    /// Size of the last encoded output in bytes
    pub encoded_len: Option<usize>,
    /// Message of the last failed conversion
    pub last_error: Option<String>,
}

/// State machine transitions
pub struct StateMachine {
    state: AppState,
    session: Option<ConversionSession>,
}

impl StateMachine {
    /// Create a new state machine
    pub fn new() -> Self {
        Self {
            state: AppState::Idle,
            session: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get current session
    pub fn session(&self) -> Option<&ConversionSession> {
        self.session.as_ref()
    }

    /// Load a sequence; an empty one leaves nothing to convert
    pub fn load(&mut self, sequence: Sequence) -> bool {
        if !self.state.can_load() {
            return false;
        }
        if sequence.is_empty() {
            self.reset();
            return false;
        }
        self.session = Some(ConversionSession {
            sequence,
            encoded_len: None,
            last_error: None,
        });
        self.state = AppState::Loaded;
        true
    }

    /// Start converting
    pub fn start_converting(&mut self) -> bool {
        let has_frames = self.session.as_ref().map_or(false, |s| !s.sequence.is_empty());
        if self.state.can_convert() && has_frames {
            self.state = AppState::Converting;
            true
        } else {
            false
        }
    }

    /// Conversion finished
    pub fn finish_converting(&mut self, encoded_len: usize) {
        if matches!(self.state, AppState::Converting) {
            if let Some(session) = self.session.as_mut() {
                session.encoded_len = Some(encoded_len);
                session.last_error = None;
            }
            self.state = AppState::Converted;
        }
    }

    /// Conversion failed, return to loaded
    pub fn fail_converting(&mut self, message: String) {
        if matches!(self.state, AppState::Converting) {
            if let Some(session) = self.session.as_mut() {
                session.last_error = Some(message);
            }
            self.state = AppState::Loaded;
        }
    }

    /// Reset to idle
    pub fn reset(&mut self) {
        self.state = AppState::Idle;
        self.session = None;
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded() -> StateMachine {
        let mut sm = StateMachine::new();
        assert!(sm.load(Sequence::from_paths(["a/1.png", "a/2.png"])));
        sm
    }

    #[test]
    fn idle_cannot_convert() {
        let mut sm = StateMachine::new();
        assert!(!sm.start_converting());
        assert_eq!(sm.state(), &AppState::Idle);
    }

    #[test]
    fn empty_sequence_is_not_loaded() {
        let mut sm = StateMachine::new();
        assert!(!sm.load(Sequence::default()));
        assert_eq!(sm.state(), &AppState::Idle);
        assert!(sm.session().is_none());
    }

    #[test]
    fn successful_conversion() {
        let mut sm = loaded();
        assert!(sm.start_converting());
        // No second conversion while one is in flight
        assert!(!sm.start_converting());
        assert!(!sm.load(Sequence::from_paths(["b/1.png"])));

        sm.finish_converting(1024);
        assert_eq!(sm.state(), &AppState::Converted);
        assert_eq!(sm.session().unwrap().encoded_len, Some(1024));
        assert!(sm.state().can_convert());
    }

    #[test]
    fn failed_conversion_returns_to_loaded() {
        let mut sm = loaded();
        assert!(sm.start_converting());
        sm.fail_converting("boom".to_string());
        assert_eq!(sm.state(), &AppState::Loaded);
        assert_eq!(sm.session().unwrap().last_error.as_deref(), Some("boom"));
    }

    #[test]
    fn reloading_after_conversion_clears_result() {
        let mut sm = loaded();
        assert!(sm.start_converting());
        sm.finish_converting(10);
        assert!(sm.load(Sequence::from_paths(["c/1.png"])));
        assert_eq!(sm.state().display_text(), "Sequence loaded");
        assert_eq!(sm.session().unwrap().encoded_len, None);
    }
}
