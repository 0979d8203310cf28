use crate::types::{
    GenerationRequest, GenerationStatus, Track, DEFAULT_TRACK_STYLE, DEFAULT_TRACK_TITLE,
};
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("a generation is already in progress")]
    Busy,
    #[error("Please add a title, style, or lyrics")]
    EmptyPrompt,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no generation is in progress")]
    NotActive,
    #[error("cannot move generation from {from:?} to {to:?}")]
    InvalidTransition { from: GenerationStatus, to: GenerationStatus },
}

#[derive(Debug, Clone)]
struct PendingGeneration {
    request: GenerationRequest,
    prompt: String,
}

/// The single generation slot of a studio.
#[derive(Debug, Default)]
pub struct GenerationSession {
    status: GenerationStatus,
    elapsed_seconds: u64,
    pending: Option<PendingGeneration>,
    failure: Option<String>,
    ids: TrackIdGenerator,
}

impl GenerationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> GenerationStatus {
        self.status
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn pending_prompt(&self) -> Option<&str> {
        self.pending.as_ref().map(|pending| pending.prompt.as_str())
    }

    pub fn status_message(&self) -> String {
        self.status.status_message(self.elapsed_seconds)
    }

    /// Accepts a request and moves the session to `Starting`, returning the
    /// composed prompt.
    pub fn submit(&mut self, request: GenerationRequest) -> Result<String, SubmitError> {
        if self.status.is_active() {
            return Err(SubmitError::Busy);
        }
        if request.is_empty() {
            return Err(SubmitError::EmptyPrompt);
        }
        let prompt = request.compose_prompt();
        self.status = GenerationStatus::Starting;
        self.elapsed_seconds = 0;
        self.failure = None;
        self.pending = Some(PendingGeneration { request, prompt: prompt.clone() });
        Ok(prompt)
    }

    /// One elapsed-counter tick. Ignored once the counter has been stopped.
    pub fn tick(&mut self) {
        if matches!(
            self.status,
            GenerationStatus::Starting | GenerationStatus::Pending | GenerationStatus::Processing
        ) {
            self.elapsed_seconds = self.elapsed_seconds.saturating_add(1);
        }
    }

    pub fn advance(&mut self, next: GenerationStatus) -> Result<(), SessionError> {
        use GenerationStatus::*;
        let allowed = matches!(
            (self.status, next),
            (Starting, Pending | Processing | Success | Failed)
                | (Pending, Processing | Success | Failed)
                | (Processing, Success | Failed)
        );
        if !allowed {
            return Err(SessionError::InvalidTransition { from: self.status, to: next });
        }
        self.status = next;
        Ok(())
    }

    /// Finishes the active generation and synthesizes its track.
    pub fn complete(
        &mut self,
        file_url: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Track, SessionError> {
        if !self.status.is_active() || self.status == GenerationStatus::Failed {
            return Err(SessionError::NotActive);
        }
        let pending = self.pending.take().ok_or(SessionError::NotActive)?;
        self.status = GenerationStatus::Idle;

        let PendingGeneration { request, prompt } = pending;
        let title =
            if request.title.is_empty() { DEFAULT_TRACK_TITLE.to_string() } else { request.title };
        let style =
            if request.style.is_empty() { DEFAULT_TRACK_STYLE.to_string() } else { request.style };
        Ok(Track {
            id: self.ids.next(created_at),
            prompt,
            title: Some(title),
            style: Some(style),
            lyrics: Some(request.lyrics),
            file_url: file_url.to_string(),
            created_at,
            thumbnail_url: None,
        })
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), SessionError> {
        self.advance(GenerationStatus::Failed)?;
        self.pending = None;
        self.failure = Some(reason.into());
        Ok(())
    }

    /// Returns a finished (`Success`/`Failed`) session to `Idle`.
    pub fn acknowledge(&mut self) -> Result<(), SessionError> {
        if !self.status.is_terminal() {
            return Err(SessionError::NotActive);
        }
        self.status = GenerationStatus::Idle;
        self.pending = None;
        self.failure = None;
        Ok(())
    }
}

/// Millisecond timestamps, bumped forward whenever the clock would repeat or
/// go backwards.
#[derive(Debug, Default)]
struct TrackIdGenerator {
    last: i64,
}

impl TrackIdGenerator {
    fn next(&mut self, now: DateTime<Utc>) -> String {
        let candidate = now.timestamp_millis();
        let id = if candidate > self.last { candidate } else { self.last + 1 };
        self.last = id;
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEMO_URL: &str = "https://example.com/demo.mp3";

    fn neon_dreams() -> GenerationRequest {
        GenerationRequest::new("Neon Dreams", "Synthwave", "City lights, endless nights")
    }

    #[test]
    fn submit_moves_idle_session_to_starting() {
        let mut session = GenerationSession::new();
        let prompt = session.submit(neon_dreams()).unwrap();
        assert_eq!(session.status(), GenerationStatus::Starting);
        assert_eq!(session.elapsed_seconds(), 0);
        assert!(prompt.starts_with("Title: Neon Dreams. Style: Synthwave"));
    }

    #[test]
    fn submit_rejects_blank_request_without_state_change() {
        let mut session = GenerationSession::new();
        assert_eq!(session.submit(GenerationRequest::default()), Err(SubmitError::EmptyPrompt));
        assert_eq!(session.status(), GenerationStatus::Idle);
        assert!(session.pending_prompt().is_none());
    }

    #[test]
    fn submit_rejects_while_another_generation_runs() {
        let mut session = GenerationSession::new();
        session.submit(neon_dreams()).unwrap();
        session.tick();
        let second = GenerationRequest::new("Other", "", "");
        assert_eq!(session.submit(second), Err(SubmitError::Busy));
        assert_eq!(session.elapsed_seconds(), 1);
        assert!(session.pending_prompt().unwrap().contains("Neon Dreams"));
    }

    #[test]
    fn complete_synthesizes_track_with_defaults() {
        let mut session = GenerationSession::new();
        session.submit(GenerationRequest::new("", "", "just vibes")).unwrap();
        let track = session.complete(DEMO_URL, Utc::now()).unwrap();
        assert_eq!(session.status(), GenerationStatus::Idle);
        assert_eq!(track.title.as_deref(), Some("Demo Track"));
        assert_eq!(track.style.as_deref(), Some("Lo-fi"));
        assert_eq!(track.prompt, "Lyrics: just vibes");
        assert_eq!(track.file_url, DEMO_URL);
    }

    #[test]
    fn complete_without_active_generation_fails() {
        let mut session = GenerationSession::new();
        assert_eq!(session.complete(DEMO_URL, Utc::now()), Err(SessionError::NotActive));
    }

    #[test]
    fn ticks_stop_counting_after_completion() {
        let mut session = GenerationSession::new();
        session.submit(neon_dreams()).unwrap();
        session.tick();
        session.tick();
        assert_eq!(session.status_message(), "[2s] >> Initializing AI composer...");
        session.complete(DEMO_URL, Utc::now()).unwrap();
        session.tick();
        assert_eq!(session.elapsed_seconds(), 2);
    }

    #[test]
    fn advance_walks_backend_states() {
        let mut session = GenerationSession::new();
        session.submit(neon_dreams()).unwrap();
        session.advance(GenerationStatus::Pending).unwrap();
        assert_eq!(session.status().progress_percent(), 35);
        session.advance(GenerationStatus::Processing).unwrap();
        assert_eq!(session.status().progress_percent(), 75);
        assert_eq!(
            session.advance(GenerationStatus::Pending),
            Err(SessionError::InvalidTransition {
                from: GenerationStatus::Processing,
                to: GenerationStatus::Pending,
            })
        );
        session.advance(GenerationStatus::Success).unwrap();
        assert!(session.is_active());
        let track = session.complete(DEMO_URL, Utc::now()).unwrap();
        assert_eq!(track.title.as_deref(), Some("Neon Dreams"));
    }

    #[test]
    fn failed_generation_blocks_until_acknowledged() {
        let mut session = GenerationSession::new();
        session.submit(neon_dreams()).unwrap();
        session.fail("backend unavailable").unwrap();
        assert_eq!(session.failure(), Some("backend unavailable"));
        assert_eq!(session.submit(neon_dreams()), Err(SubmitError::Busy));
        assert_eq!(session.complete(DEMO_URL, Utc::now()), Err(SessionError::NotActive));
        session.acknowledge().unwrap();
        assert_eq!(session.status(), GenerationStatus::Idle);
        assert_eq!(session.failure(), None);
        assert!(session.submit(neon_dreams()).is_ok());
    }

    #[test]
    fn idle_session_never_enters_backend_states() {
        let mut session = GenerationSession::new();
        assert!(session.advance(GenerationStatus::Processing).is_err());
        assert_eq!(session.status(), GenerationStatus::Idle);
    }

    #[test]
    fn track_ids_are_unique_under_a_frozen_clock() {
        let mut session = GenerationSession::new();
        let now = Utc::now();
        let mut ids = Vec::new();
        for _ in 0..3 {
            session.submit(neon_dreams()).unwrap();
            ids.push(session.complete(DEMO_URL, now).unwrap().id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }
}
