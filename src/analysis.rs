use std::{fmt, time::Duration};

use crossbeam::channel::{unbounded, Receiver, Sender};
use instant::Instant;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::{CacheCategory, CacheSettings, ResponseCache};

/// Monotonic request counter. Only a response carrying the latest generation is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    latest: Generation,
}

impl RequestTracker {
    /// Issues a new generation, superseding every earlier one.
    pub fn issue(&mut self) -> Generation {
        self.latest = Generation(self.latest.0 + 1);
        self.latest
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        generation == self.latest
    }

    pub fn latest(&self) -> Generation {
        self.latest
    }
}

/// Failure reported by the analysis collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("analysis failed: {message}")]
pub struct AnalysisError {
    pub message: String,
}

impl AnalysisError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub generation: Generation,
    pub content: String,
    pub category: CacheCategory,
}

#[derive(Debug)]
struct AnalysisResponse<P> {
    generation: Generation,
    result: Result<P, AnalysisError>,
}

/// One-shot reply handle handed to an [`Analyzer`]. May be moved to another thread.
#[derive(Debug)]
pub struct Responder<P> {
    generation: Generation,
    tx: Sender<AnalysisResponse<P>>,
}

impl<P> Responder<P> {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn respond(self, result: Result<P, AnalysisError>) {
        let response = AnalysisResponse {
            generation: self.generation,
            result,
        };
        if self.tx.send(response).is_err() {
            log::debug!("analysis session gone, response {} dropped", self.generation);
        }
    }
}

/// External analysis collaborator. It may answer synchronously from `analyze` or later,
/// from any thread, through the responder.
pub trait Analyzer<P> {
    fn analyze(&self, request: AnalysisRequest, responder: Responder<P>);
}

impl<P, F> Analyzer<P> for F
where
    F: Fn(AnalysisRequest, Responder<P>),
{
    fn analyze(&self, request: AnalysisRequest, responder: Responder<P>) {
        self(request, responder);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisState<P> {
    Idle,
    /// Waiting for the debounce window or for the collaborator.
    Pending,
    Ready(P),
    Failed(AnalysisError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Quiet period after the last input change before a request is sent.
    pub debounce: Duration,
    pub category: CacheCategory,
    pub cache: CacheSettings,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(400),
            category: CacheCategory::Graph,
            cache: CacheSettings::default(),
        }
    }
}

impl AnalysisSettings {
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_category(mut self, category: CacheCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_cache(mut self, cache: CacheSettings) -> Self {
        self.cache = cache;
        self
    }
}

#[derive(Debug, Clone)]
struct PendingInput {
    content: String,
    fire_at: Instant,
}

/// Debounced, generation-counted, cached access to an analysis collaborator.
///
/// Frame driven: hosts report input changes and call [`AnalysisSession::poll`] once per
/// frame. Failures are terminal until [`AnalysisSession::retry`] is called.
#[derive(Debug)]
pub struct AnalysisSession<P> {
    settings: AnalysisSettings,
    tracker: RequestTracker,
    cache: ResponseCache<P>,
    state: AnalysisState<P>,

    pending: Option<PendingInput>,
    in_flight: Option<(Generation, String)>,
    last_content: Option<String>,

    tx: Sender<AnalysisResponse<P>>,
    rx: Receiver<AnalysisResponse<P>>,
}

impl<P: Clone> Default for AnalysisSession<P> {
    fn default() -> Self {
        Self::new(AnalysisSettings::default())
    }
}

impl<P: Clone> AnalysisSession<P> {
    pub fn new(settings: AnalysisSettings) -> Self {
        let (tx, rx) = unbounded();
        Self {
            cache: ResponseCache::new(settings.cache.clone()),
            settings,
            tracker: RequestTracker::default(),
            state: AnalysisState::Idle,
            pending: None,
            in_flight: None,
            last_content: None,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> &AnalysisState<P> {
        &self.state
    }

    pub fn generation(&self) -> Generation {
        self.tracker.latest()
    }

    pub fn cache(&self) -> &ResponseCache<P> {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ResponseCache<P> {
        &mut self.cache
    }

    /// Time left until the debounced request fires, if one is waiting.
    pub fn time_until_fire(&self, now: Instant) -> Option<Duration> {
        self.pending.as_ref().map(|p| {
            if p.fire_at > now {
                p.fire_at.duration_since(now)
            } else {
                Duration::ZERO
            }
        })
    }

    /// Records new input. Restarts the debounce window and supersedes anything in flight.
    pub fn input_changed(&mut self, content: impl Into<String>, now: Instant) {
        self.schedule(content.into(), now + self.settings.debounce);
    }

    /// Sends the last failed input again on the next poll.
    pub fn retry(&mut self, now: Instant) -> bool {
        if !matches!(self.state, AnalysisState::Failed(_)) {
            return false;
        }
        let Some(content) = self.last_content.clone() else {
            return false;
        };
        log::debug!("retrying analysis");
        self.schedule(content, now);
        true
    }

    /// Drops pending input and ignores any response still in flight.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.in_flight = None;
        self.tracker.issue();
        self.state = AnalysisState::Idle;
    }

    fn schedule(&mut self, content: String, fire_at: Instant) {
        let superseded = self.tracker.issue();
        log::trace!("analysis input scheduled as {superseded}");
        self.in_flight = None;
        self.pending = Some(PendingInput { content, fire_at });
        self.state = AnalysisState::Pending;
    }

    /// Fires a due request and applies responses. Returns `true` when the state changed.
    pub fn poll(&mut self, now: Instant, analyzer: &dyn Analyzer<P>) -> bool {
        let mut changed = false;

        if self.pending.as_ref().is_some_and(|p| now >= p.fire_at) {
            if let Some(pending) = self.pending.take() {
                changed |= self.fire(pending.content, now, analyzer);
            }
        }

        while let Ok(response) = self.rx.try_recv() {
            changed |= self.apply(response, now);
        }

        changed
    }

    fn fire(&mut self, content: String, now: Instant, analyzer: &dyn Analyzer<P>) -> bool {
        let category = self.settings.category;
        self.last_content = Some(content.clone());

        if let Some(hit) = self.cache.get_at(&content, category, now) {
            log::debug!("analysis served from cache");
            self.state = AnalysisState::Ready(hit);
            return true;
        }

        let generation = self.tracker.latest();
        log::debug!("analysis request {generation} sent");
        self.in_flight = Some((generation, content.clone()));
        analyzer.analyze(
            AnalysisRequest {
                generation,
                content,
                category,
            },
            Responder {
                generation,
                tx: self.tx.clone(),
            },
        );
        false
    }

    fn apply(&mut self, response: AnalysisResponse<P>, now: Instant) -> bool {
        if !self.tracker.is_current(response.generation) {
            log::debug!("stale analysis response {} dropped", response.generation);
            return false;
        }
        let Some((_, content)) = self
            .in_flight
            .take_if(|(generation, _)| *generation == response.generation)
        else {
            log::debug!("unexpected analysis response {} dropped", response.generation);
            return false;
        };

        match response.result {
            Ok(payload) => {
                self.cache
                    .set_at(&content, self.settings.category, payload.clone(), now);
                self.state = AnalysisState::Ready(payload);
            }
            Err(err) => {
                log::debug!("analysis {} failed: {err}", response.generation);
                self.state = AnalysisState::Failed(err);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    const MS: Duration = Duration::from_millis(1);

    /// Keeps responders so tests decide when and how to answer.
    #[derive(Default)]
    struct Deferred {
        calls: RefCell<Vec<(AnalysisRequest, Responder<String>)>>,
    }

    impl Analyzer<String> for Deferred {
        fn analyze(&self, request: AnalysisRequest, responder: Responder<String>) {
            self.calls.borrow_mut().push((request, responder));
        }
    }

    impl Deferred {
        fn take(&self, i: usize) -> (AnalysisRequest, Responder<String>) {
            self.calls.borrow_mut().remove(i)
        }

        fn count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    #[test]
    fn test_debounce_coalesces_input() {
        let analyzer = Deferred::default();
        let mut session = AnalysisSession::<String>::default();
        let t0 = Instant::now();

        session.input_changed("a", t0);
        session.input_changed("ab", t0 + 200 * MS);
        session.poll(t0 + 500 * MS, &analyzer);
        assert_eq!(analyzer.count(), 0);
        assert_eq!(session.time_until_fire(t0 + 500 * MS), Some(100 * MS));

        session.poll(t0 + 600 * MS, &analyzer);
        assert_eq!(analyzer.count(), 1);
        let (request, responder) = analyzer.take(0);
        assert_eq!(request.content, "ab");
        assert_eq!(request.category, CacheCategory::Graph);

        responder.respond(Ok("graph".into()));
        assert!(session.poll(t0 + 700 * MS, &analyzer));
        assert_eq!(session.state(), &AnalysisState::Ready("graph".to_string()));
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let analyzer = Deferred::default();
        let mut session = AnalysisSession::<String>::default();
        let t0 = Instant::now();

        session.input_changed("first", t0);
        session.poll(t0 + 400 * MS, &analyzer);
        session.input_changed("second", t0 + 500 * MS);
        session.poll(t0 + 900 * MS, &analyzer);
        assert_eq!(analyzer.count(), 2);

        let (_, second) = analyzer.take(1);
        let (_, first) = analyzer.take(0);
        second.respond(Ok("second result".into()));
        first.respond(Ok("first result".into()));

        session.poll(t0 + 1000 * MS, &analyzer);
        assert_eq!(
            session.state(),
            &AnalysisState::Ready("second result".to_string())
        );
        assert_eq!(session.cache().len(), 1);
    }

    #[test]
    fn test_cache_hit_skips_collaborator() {
        let analyzer = Deferred::default();
        let mut session = AnalysisSession::<String>::default();
        let t0 = Instant::now();

        session.input_changed("code", t0);
        session.poll(t0 + 400 * MS, &analyzer);
        let (_, responder) = analyzer.take(0);
        responder.respond(Ok("cached".into()));
        session.poll(t0 + 410 * MS, &analyzer);

        session.input_changed("code", t0 + 1000 * MS);
        assert_eq!(session.state(), &AnalysisState::Pending);
        assert!(session.poll(t0 + 1400 * MS, &analyzer));
        assert_eq!(analyzer.count(), 0);
        assert_eq!(session.state(), &AnalysisState::Ready("cached".to_string()));
    }

    #[test]
    fn test_failure_is_terminal_until_retry() {
        let analyzer = |request: AnalysisRequest, responder: Responder<String>| {
            if request.generation.value() == 1 {
                responder.respond(Err(AnalysisError::new("rate limited")));
            } else {
                responder.respond(Ok(format!("ok {}", request.content)));
            }
        };
        let mut session = AnalysisSession::<String>::new(
            AnalysisSettings::default().with_debounce(Duration::ZERO),
        );
        let t0 = Instant::now();

        session.input_changed("src", t0);
        session.poll(t0, &analyzer);
        assert_eq!(
            session.state(),
            &AnalysisState::Failed(AnalysisError::new("rate limited"))
        );
        session.poll(t0 + 10_000 * MS, &analyzer);
        assert!(matches!(session.state(), AnalysisState::Failed(_)));

        assert!(session.retry(t0 + 10_000 * MS));
        session.poll(t0 + 10_000 * MS, &analyzer);
        assert_eq!(session.state(), &AnalysisState::Ready("ok src".to_string()));
        assert!(!session.retry(t0 + 10_000 * MS));
    }

    #[test]
    fn test_cancel_ignores_in_flight() {
        let analyzer = Deferred::default();
        let mut session = AnalysisSession::<String>::default();
        let t0 = Instant::now();

        session.input_changed("code", t0);
        session.poll(t0 + 400 * MS, &analyzer);
        session.cancel();
        let (_, responder) = analyzer.take(0);
        responder.respond(Ok("late".into()));
        assert!(!session.poll(t0 + 500 * MS, &analyzer));
        assert_eq!(session.state(), &AnalysisState::Idle);
    }

    #[test]
    fn test_response_from_another_thread() {
        let analyzer = |request: AnalysisRequest, responder: Responder<String>| {
            std::thread::spawn(move || responder.respond(Ok(request.content.to_uppercase())))
                .join()
                .unwrap();
        };
        let mut session = AnalysisSession::<String>::new(
            AnalysisSettings::default().with_debounce(Duration::ZERO),
        );
        let t0 = Instant::now();
        session.input_changed("loop", t0);
        session.poll(t0, &analyzer);
        assert_eq!(session.state(), &AnalysisState::Ready("LOOP".to_string()));
    }

    #[test]
    fn test_generations_are_monotonic() {
        let mut tracker = RequestTracker::default();
        let a = tracker.issue();
        let b = tracker.issue();
        assert!(b > a);
        assert!(tracker.is_current(b));
        assert!(!tracker.is_current(a));
    }
}
