//! Folds the decoded frame sequence into the caller-visible result.
//!
//! Contract:
//! - Text frames append, and the update callback receives the **full**
//!   accumulated text each time. Callers overwrite their display state, so a
//!   replayed callback cannot diverge from the aggregate.
//! - A server error frame is terminal; every later frame is ignored.
//! - Exactly one terminal transition happens per reducer, enforced by the
//!   consuming `finish` / `fail` / `cancel` methods.

use crate::frame::Frame;

/// Final disposition of one stream aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalStatus {
    Completed,
    Failed(String),
    Cancelled,
}

/// Accumulated text plus how the stream ended. `text` holds whatever
/// fragments arrived before the end, including on failure and cancellation;
/// partial output is never discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregated {
    pub text: String,
    pub status: TerminalStatus,
}

/// Frame reducer. One instance per stream; never reused across requests.
#[derive(Debug, Default)]
pub struct Reducer {
    text: String,
    status: Option<TerminalStatus>,
}

impl Reducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one frame. Returns `false` once the reducer has reached a
    /// terminal status and the read loop should stop.
    pub fn push(&mut self, frame: Frame, on_update: &mut (dyn FnMut(&str) + Send)) -> bool {
        if self.status.is_some() {
            return false;
        }
        match frame {
            Frame::Text(fragment) => {
                self.text.push_str(&fragment);
                on_update(&self.text);
                true
            }
            Frame::ServerError(message) => {
                on_update(&message);
                self.status = Some(TerminalStatus::Failed(message));
                false
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_some()
    }

    /// Transport end-of-body. Completed unless a server error was seen.
    pub fn finish(self) -> Aggregated {
        self.into_result(TerminalStatus::Completed)
    }

    /// The transport dropped mid-stream or never produced a usable response.
    pub fn fail(self, reason: impl Into<String>) -> Aggregated {
        self.into_result(TerminalStatus::Failed(reason.into()))
    }

    /// The caller requested early termination.
    pub fn cancel(self) -> Aggregated {
        self.into_result(TerminalStatus::Cancelled)
    }

    fn into_result(self, fallback: TerminalStatus) -> Aggregated {
        // An already-recorded terminal status (server error) always wins.
        let status = self.status.unwrap_or(fallback);
        Aggregated {
            text: self.text,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_frames_append_and_report_full_text() {
        let mut updates: Vec<String> = Vec::new();
        let mut on_update = |t: &str| updates.push(t.to_string());
        let mut r = Reducer::new();
        assert!(r.push(Frame::Text("Hel".into()), &mut on_update));
        assert!(r.push(Frame::Text("lo".into()), &mut on_update));
        assert_eq!(updates, vec!["Hel", "Hello"]);
        let out = r.finish();
        assert_eq!(out.text, "Hello");
        assert_eq!(out.status, TerminalStatus::Completed);
    }

    #[test]
    fn empty_fragment_still_notifies() {
        let mut updates: Vec<String> = Vec::new();
        let mut on_update = |t: &str| updates.push(t.to_string());
        let mut r = Reducer::new();
        r.push(Frame::Text(String::new()), &mut on_update);
        assert_eq!(updates, vec![""]);
    }

    #[test]
    fn server_error_is_terminal_and_ignores_later_frames() {
        let mut updates: Vec<String> = Vec::new();
        let mut on_update = |t: &str| updates.push(t.to_string());
        let mut r = Reducer::new();
        assert!(r.push(Frame::Text("A".into()), &mut on_update));
        assert!(!r.push(Frame::ServerError("boom".into()), &mut on_update));
        assert!(r.is_terminal());
        // frames after the terminal transition neither mutate nor notify
        assert!(!r.push(Frame::Text("B".into()), &mut on_update));
        assert_eq!(updates, vec!["A", "boom"]);
        let out = r.finish();
        assert_eq!(out.text, "A");
        assert_eq!(out.status, TerminalStatus::Failed("boom".into()));
    }

    #[test]
    fn fail_preserves_partial_text() {
        let mut on_update = |_: &str| {};
        let mut r = Reducer::new();
        r.push(Frame::Text("partial".into()), &mut on_update);
        let out = r.fail("connection interrupted");
        assert_eq!(out.text, "partial");
        assert_eq!(
            out.status,
            TerminalStatus::Failed("connection interrupted".into())
        );
    }

    #[test]
    fn cancel_preserves_partial_text() {
        let mut on_update = |_: &str| {};
        let mut r = Reducer::new();
        r.push(Frame::Text("so far".into()), &mut on_update);
        let out = r.cancel();
        assert_eq!(out.text, "so far");
        assert_eq!(out.status, TerminalStatus::Cancelled);
    }

    #[test]
    fn recorded_server_error_wins_over_later_disposition() {
        let mut on_update = |_: &str| {};
        let mut r = Reducer::new();
        r.push(Frame::ServerError("boom".into()), &mut on_update);
        // the read loop drains remaining bytes, then finishes; the failure
        // recorded at the error frame must survive
        let out = r.finish();
        assert_eq!(out.status, TerminalStatus::Failed("boom".into()));
    }
}
