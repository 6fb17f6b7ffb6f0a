use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::metrics::{ANSWERS_SUBMITTED_TOTAL, SESSIONS_ACTIVE, SESSIONS_TOTAL};
use crate::models::{
    Attempt, CreateSessionRequest, CreateSessionResponse, DifficultyTier, Puzzle, PuzzleView,
    SessionStatus, SessionSummary, SessionView, SubmitAnswerRequest, SubmitAnswerResponse,
};
use crate::services::adaptive::{AdaptiveCoordinator, AttemptHistory};
use crate::services::puzzle_generator::generate_puzzle;

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("Session {0} not found")]
    NotFound(String),
    #[error("Session {0} is already completed")]
    Completed(String),
    #[error("Session {0} has no puzzle awaiting an answer")]
    NoPendingPuzzle(String),
}

/// Window size and round count applied when a request leaves them out,
/// plus how long an idle session is kept.
#[derive(Debug, Clone, Copy)]
pub struct SessionDefaults {
    pub window_size: usize,
    pub rounds: u32,
    pub session_ttl: Duration,
}

struct PendingPuzzle {
    puzzle: Puzzle,
    issued_at: Instant,
}

/// State of one practice session. Only the owning request flow mutates it.
pub struct TutorSession {
    pub id: String,
    pub user_name: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub current_level: DifficultyTier,
    pub window_size: usize,
    pub use_learned: bool,
    pub rounds_left: u32,
    pub history: AttemptHistory,
    pending: Option<PendingPuzzle>,
    last_active: Instant,
}

impl TutorSession {
    pub fn new(
        user_name: String,
        initial_level: DifficultyTier,
        window_size: usize,
        rounds: u32,
        use_learned: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_name,
            status: SessionStatus::Active,
            started_at: Utc::now(),
            ended_at: None,
            current_level: initial_level,
            window_size,
            use_learned,
            rounds_left: rounds,
            history: AttemptHistory::new(),
            pending: None,
            last_active: Instant::now(),
        }
    }

    /// Appends the outcome of an answered puzzle to the session history.
    pub fn record_attempt(
        &mut self,
        puzzle: &Puzzle,
        given_answer: &str,
        correct: bool,
        response_time: f64,
    ) {
        let attempt = Attempt {
            ordinal: self.history.next_ordinal(),
            timestamp: Utc::now(),
            question_id: puzzle.id.clone(),
            question: puzzle.question.clone(),
            level: puzzle.level,
            correct,
            given_answer: given_answer.to_string(),
            correct_answer: puzzle.answer_text(),
            response_time,
        };
        self.history.append(attempt);
    }

    fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.last_active.elapsed() > ttl
    }

    /// Pending puzzle, generating one at the current level if none is out.
    fn issue_puzzle(&mut self) -> PuzzleView {
        let level = self.current_level;
        self.pending
            .get_or_insert_with(|| PendingPuzzle {
                puzzle: generate_puzzle(level, None),
                issued_at: Instant::now(),
            })
            .puzzle
            .view()
    }

    fn complete(&mut self) {
        if self.status == SessionStatus::Completed {
            return;
        }
        self.status = SessionStatus::Completed;
        self.ended_at = Some(Utc::now());
        self.pending = None;
        SESSIONS_TOTAL.with_label_values(&["completed"]).inc();
        SESSIONS_ACTIVE.dec();
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            session_id: self.id.clone(),
            user: self.user_name.clone(),
            status: self.status,
            started_at: self.started_at,
            current_level: self.current_level,
            rounds_left: self.rounds_left,
            window_size: self.window_size,
            use_learned: self.use_learned,
            num_attempts: self.history.len(),
            accuracy: self.history.accuracy(),
            avg_response_time: self.history.average_response_time(),
            level_counts: self.history.tier_counts(),
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id.clone(),
            user: self.user_name.clone(),
            started_at: self.started_at,
            ended_at: self.ended_at,
            num_attempts: self.history.len(),
            accuracy: self.history.accuracy(),
            avg_response_time: self.history.average_response_time(),
            final_level: self.current_level,
            attempts: self.history.attempts().to_vec(),
        }
    }
}

/// In-process session registry shared by all request handlers.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, TutorSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

fn live<'a>(
    sessions: &'a HashMap<String, TutorSession>,
    session_id: &str,
    ttl: Duration,
) -> Result<&'a TutorSession, SessionError> {
    sessions
        .get(session_id)
        .filter(|session| !session.is_expired(ttl))
        .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
}

fn live_mut<'a>(
    sessions: &'a mut HashMap<String, TutorSession>,
    session_id: &str,
    ttl: Duration,
) -> Result<&'a mut TutorSession, SessionError> {
    match sessions.get_mut(session_id) {
        Some(session) if !session.is_expired(ttl) => {
            session.touch();
            Ok(session)
        }
        _ => Err(SessionError::NotFound(session_id.to_string())),
    }
}

/// Drops sessions idle for longer than `ttl`, completed or not.
fn evict_expired(sessions: &mut HashMap<String, TutorSession>, ttl: Duration) -> usize {
    let before = sessions.len();
    sessions.retain(|id, session| {
        if !session.is_expired(ttl) {
            return true;
        }
        if session.status == SessionStatus::Active {
            SESSIONS_TOTAL.with_label_values(&["expired"]).inc();
            SESSIONS_ACTIVE.dec();
        }
        tracing::debug!("Evicting idle session {}", id);
        false
    });
    before - sessions.len()
}

pub struct SessionService {
    store: Arc<SessionStore>,
    coordinator: Arc<AdaptiveCoordinator>,
    defaults: SessionDefaults,
}

impl SessionService {
    pub fn new(
        store: Arc<SessionStore>,
        coordinator: Arc<AdaptiveCoordinator>,
        defaults: SessionDefaults,
    ) -> Self {
        Self {
            store,
            coordinator,
            defaults,
        }
    }

    pub async fn create_session(&self, req: CreateSessionRequest) -> CreateSessionResponse {
        let mut session = TutorSession::new(
            req.user_name,
            req.initial_level.unwrap_or_default(),
            req.window_size.unwrap_or(self.defaults.window_size),
            req.rounds.unwrap_or(self.defaults.rounds),
            req.use_learned,
        );
        let puzzle = session.issue_puzzle();

        let response = CreateSessionResponse {
            session_id: session.id.clone(),
            current_level: session.current_level,
            rounds_left: session.rounds_left,
            window_size: session.window_size,
            use_learned: session.use_learned,
            puzzle,
        };

        SESSIONS_TOTAL.with_label_values(&["created"]).inc();
        SESSIONS_ACTIVE.inc();

        tracing::info!(
            "Session created: {} for user: {} at level {}",
            session.id,
            session.user_name,
            session.current_level
        );

        let mut sessions = self.store.sessions.write().await;
        let evicted = evict_expired(&mut sessions, self.defaults.session_ttl);
        if evicted > 0 {
            tracing::info!("Evicted {} idle sessions", evicted);
        }
        sessions.insert(session.id.clone(), session);

        response
    }

    pub async fn get_session(&self, session_id: &str) -> Result<SessionView, SessionError> {
        let sessions = self.store.sessions.read().await;
        live(&sessions, session_id, self.defaults.session_ttl).map(TutorSession::view)
    }

    pub async fn current_puzzle(&self, session_id: &str) -> Result<PuzzleView, SessionError> {
        let mut sessions = self.store.sessions.write().await;
        let session = live_mut(&mut sessions, session_id, self.defaults.session_ttl)?;
        if session.status == SessionStatus::Completed {
            return Err(SessionError::Completed(session_id.to_string()));
        }
        Ok(session.issue_puzzle())
    }

    /// Checks the answer, records the attempt, moves the session to the
    /// decided tier and hands out the next puzzle.
    pub async fn submit_answer(
        &self,
        session_id: &str,
        req: &SubmitAnswerRequest,
    ) -> Result<SubmitAnswerResponse, SessionError> {
        let mut sessions = self.store.sessions.write().await;
        let session = live_mut(&mut sessions, session_id, self.defaults.session_ttl)?;
        if session.status == SessionStatus::Completed {
            return Err(SessionError::Completed(session_id.to_string()));
        }
        let pending = session
            .pending
            .take()
            .ok_or_else(|| SessionError::NoPendingPuzzle(session_id.to_string()))?;

        let response_time = req
            .response_time_seconds
            .unwrap_or_else(|| pending.issued_at.elapsed().as_secs_f64());
        let correct = pending.puzzle.check_answer(&req.answer);
        session.record_attempt(&pending.puzzle, req.answer.trim(), correct, response_time);

        let correct_label = if correct { "true" } else { "false" };
        ANSWERS_SUBMITTED_TOTAL
            .with_label_values(&[correct_label])
            .inc();

        let previous_level = session.current_level;
        let decision = self.coordinator.decide(
            &session.history,
            previous_level,
            session.window_size,
            session.use_learned,
        );
        session.current_level = decision.next_tier;
        session.rounds_left = session.rounds_left.saturating_sub(1);

        let next_puzzle = if session.rounds_left > 0 {
            Some(session.issue_puzzle())
        } else {
            session.complete();
            None
        };

        tracing::info!(
            "Answer processed: session={}, correct={}, rt={:.1}s, {} -> {} ({})",
            session_id,
            correct,
            response_time,
            previous_level,
            decision.next_tier,
            decision.rationale
        );

        Ok(SubmitAnswerResponse {
            correct,
            correct_answer: pending.puzzle.answer_text(),
            response_time,
            previous_level,
            next_level: decision.next_tier,
            decision,
            rounds_left: session.rounds_left,
            next_puzzle,
        })
    }

    pub async fn summary(&self, session_id: &str) -> Result<SessionSummary, SessionError> {
        let sessions = self.store.sessions.read().await;
        live(&sessions, session_id, self.defaults.session_ttl).map(TutorSession::summary)
    }

    /// Attempt log of the session as CSV, with the owning user name.
    pub async fn export_attempts(
        &self,
        session_id: &str,
    ) -> Result<(String, String), SessionError> {
        let sessions = self.store.sessions.read().await;
        let session = live(&sessions, session_id, self.defaults.session_ttl)?;
        Ok((
            session.user_name.clone(),
            crate::services::export::attempts_csv(session.history.attempts()),
        ))
    }

    /// Ends the session. Completing twice returns the same summary.
    pub async fn complete_session(&self, session_id: &str) -> Result<SessionSummary, SessionError> {
        let mut sessions = self.store.sessions.write().await;
        let session = live_mut(&mut sessions, session_id, self.defaults.session_ttl)?;
        session.complete();

        tracing::info!(
            "Session completed: {} ({} attempts, accuracy {:.2})",
            session_id,
            session.history.len(),
            session.history.accuracy()
        );

        Ok(session.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DecisionSource, TierAction};

    fn service() -> SessionService {
        service_with_ttl(Duration::from_secs(3600))
    }

    fn service_with_ttl(session_ttl: Duration) -> SessionService {
        SessionService::new(
            Arc::new(SessionStore::new()),
            Arc::new(AdaptiveCoordinator::rule_only()),
            SessionDefaults {
                window_size: 3,
                rounds: 12,
                session_ttl,
            },
        )
    }

    fn create_request(rounds: Option<u32>) -> CreateSessionRequest {
        CreateSessionRequest {
            user_name: "Ada".to_string(),
            initial_level: Some(DifficultyTier::Easy),
            rounds,
            window_size: None,
            use_learned: false,
        }
    }

    async fn answer_pending(
        service: &SessionService,
        session_id: &str,
        right: bool,
        rt: f64,
    ) -> SubmitAnswerResponse {
        let answer = {
            let sessions = service.store.sessions.read().await;
            let pending = sessions[session_id].pending.as_ref().unwrap();
            if right {
                pending.puzzle.answer_text()
            } else {
                "not a number".to_string()
            }
        };
        service
            .submit_answer(
                session_id,
                &SubmitAnswerRequest {
                    answer,
                    response_time_seconds: Some(rt),
                },
            )
            .await
            .unwrap()
    }

    #[test]
    fn test_record_attempt_appends_in_order() {
        let mut session = TutorSession::new("Ada".into(), DifficultyTier::Easy, 3, 5, false);
        let puzzle = generate_puzzle(DifficultyTier::Easy, Some(3));
        session.record_attempt(&puzzle, "4", false, 3.5);
        session.record_attempt(&puzzle, &puzzle.answer_text(), true, 2.5);
        let attempts = session.history.attempts();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].ordinal, 1);
        assert_eq!(attempts[1].ordinal, 2);
        assert_eq!(attempts[1].correct_answer, puzzle.answer_text());
        assert!((session.history.average_response_time() - 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_create_session_issues_first_puzzle() {
        let service = service();
        let response = service.create_session(create_request(None)).await;
        assert_eq!(response.current_level, DifficultyTier::Easy);
        assert_eq!(response.rounds_left, 12);
        assert_eq!(response.window_size, 3);
        assert_eq!(response.puzzle.level, DifficultyTier::Easy);

        let again = service.current_puzzle(&response.session_id).await.unwrap();
        assert_eq!(again.id, response.puzzle.id);
    }

    #[tokio::test]
    async fn test_fast_correct_answers_promote() {
        let service = service();
        let session_id = service.create_session(create_request(None)).await.session_id;

        let first = answer_pending(&service, &session_id, true, 2.0).await;
        assert!(first.correct);
        assert_eq!(first.decision.source, DecisionSource::Rule);
        assert_eq!(first.decision.action, TierAction::Promote);
        assert_eq!(first.next_level, DifficultyTier::Medium);
        assert_eq!(first.next_puzzle.unwrap().level, DifficultyTier::Medium);

        let view = service.get_session(&session_id).await.unwrap();
        assert_eq!(view.num_attempts, 1);
        assert_eq!(view.current_level, DifficultyTier::Medium);
        assert_eq!(view.rounds_left, 11);
    }

    #[tokio::test]
    async fn test_wrong_answers_demote() {
        let service = service();
        let mut req = create_request(None);
        req.initial_level = Some(DifficultyTier::Hard);
        let session_id = service.create_session(req).await.session_id;

        let response = answer_pending(&service, &session_id, false, 40.0).await;
        assert!(!response.correct);
        assert_eq!(response.previous_level, DifficultyTier::Hard);
        assert_eq!(response.next_level, DifficultyTier::Medium);
    }

    #[tokio::test]
    async fn test_session_completes_when_rounds_run_out() {
        let service = service();
        let session_id = service
            .create_session(create_request(Some(3)))
            .await
            .session_id;
        for _ in 0..2 {
            assert!(answer_pending(&service, &session_id, true, 20.0)
                .await
                .next_puzzle
                .is_some());
        }
        let last = answer_pending(&service, &session_id, true, 20.0).await;
        assert_eq!(last.rounds_left, 0);
        assert!(last.next_puzzle.is_none());

        let err = service
            .submit_answer(
                &session_id,
                &SubmitAnswerRequest {
                    answer: "1".into(),
                    response_time_seconds: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::Completed(session_id.clone()));

        let summary = service.summary(&session_id).await.unwrap();
        assert_eq!(summary.num_attempts, 3);
        assert!(summary.ended_at.is_some());
        assert!((summary.accuracy - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_complete_is_idempotent() {
        let service = service();
        let session_id = service.create_session(create_request(None)).await.session_id;
        let first = service.complete_session(&session_id).await.unwrap();
        let second = service.complete_session(&session_id).await.unwrap();
        assert_eq!(first.ended_at, second.ended_at);
        assert_eq!(
            service.current_puzzle(&session_id).await.unwrap_err(),
            SessionError::Completed(session_id.clone())
        );
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let service = service();
        assert_eq!(
            service.get_session("missing").await.unwrap_err(),
            SessionError::NotFound("missing".into())
        );
        assert!(service.export_attempts("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_export_contains_every_attempt() {
        let service = service();
        let session_id = service.create_session(create_request(None)).await.session_id;
        answer_pending(&service, &session_id, true, 5.0).await;
        answer_pending(&service, &session_id, false, 9.0).await;
        let (user, csv) = service.export_attempts(&session_id).await.unwrap();
        assert_eq!(user, "Ada");
        assert_eq!(csv.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_idle_sessions_expire_and_are_evicted() {
        let service = service_with_ttl(Duration::from_millis(50));
        let stale = service.create_session(create_request(None)).await.session_id;
        assert!(service.get_session(&stale).await.is_ok());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(
            service.get_session(&stale).await.unwrap_err(),
            SessionError::NotFound(stale.clone())
        );
        assert_eq!(
            service.current_puzzle(&stale).await.unwrap_err(),
            SessionError::NotFound(stale.clone())
        );

        let fresh = service.create_session(create_request(None)).await.session_id;
        assert_eq!(service.store.len().await, 1);
        assert!(service.get_session(&fresh).await.is_ok());
    }

    #[tokio::test]
    async fn test_activity_keeps_session_alive() {
        let service = service_with_ttl(Duration::from_millis(300));
        let session_id = service.create_session(create_request(None)).await.session_id;
        for _ in 0..3 {
            tokio::time::sleep(Duration::from_millis(150)).await;
            answer_pending(&service, &session_id, true, 20.0).await;
        }
        assert!(service.summary(&session_id).await.is_ok());
    }
}
