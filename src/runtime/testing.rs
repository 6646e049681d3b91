//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use crate::db::SessionRecord;
use crate::interview::SessionState;
use crate::llm::{LlmError, LlmRequest, LlmResponse};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock LLM client that returns queued responses
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

#[allow(dead_code)]
impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a raw text reply
    pub fn queue_text(&self, text: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(LlmResponse::text(text)));
    }

    /// Queue a JSON reply
    pub fn queue_json(&self, value: &Value) {
        self.queue_text(&value.to_string());
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn pending(&self) -> usize {
        self.responses.lock().unwrap().len()
    }

    fn next_response(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::invalid_request("No mock response queued")))
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.next_response(request)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Delayed Mock LLM Client (for concurrency testing)
// ============================================================================

/// Mock LLM client that sleeps before answering
pub struct DelayedMockLlmClient {
    pub inner: MockLlmClient,
    delay: Duration,
    /// Signalled when a request starts (permit is kept if nobody waits yet)
    pub request_started: Arc<Notify>,
}

impl DelayedMockLlmClient {
    pub fn new(model_id: impl Into<String>, delay: Duration) -> Self {
        Self {
            inner: MockLlmClient::new(model_id),
            delay,
            request_started: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl LlmClient for DelayedMockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.request_started.notify_one();
        tokio::time::sleep(self.delay).await;
        self.inner.next_response(request)
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

// ============================================================================
// In-Memory Storage
// ============================================================================

/// In-memory session store for testing
#[derive(Default)]
pub struct InMemoryStore {
    sessions: Mutex<HashMap<String, SessionRecord>>,
    next_id: Mutex<u64>,
}

#[allow(dead_code)]
impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn get(&self, id: &str) -> Option<SessionRecord> {
        self.sessions.lock().unwrap().get(id).cloned()
    }

    /// Simulate a write from another process
    pub fn bump_version(&self, id: &str) {
        if let Some(record) = self.sessions.lock().unwrap().get_mut(id) {
            record.version += 1;
        }
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn create(&self, state: &SessionState) -> Result<SessionRecord, StoreError> {
        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            format!("session-{next}")
        };
        let now = Utc::now();
        let record = SessionRecord {
            id: id.clone(),
            state: state.clone(),
            version: 1,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.sessions.lock().unwrap().insert(id, record.clone());
        Ok(record)
    }

    async fn load(&self, id: &str) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.get(id))
    }

    async fn save(
        &self,
        id: &str,
        state: &SessionState,
        expected_version: i64,
    ) -> Result<i64, StoreError> {
        let mut sessions = self.sessions.lock().unwrap();
        let record = sessions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if record.version != expected_version {
            return Err(StoreError::Conflict {
                id: id.to_string(),
                expected: expected_version,
            });
        }
        record.state = state.clone();
        record.version += 1;
        record.updated_at = Utc::now();
        Ok(record.version)
    }

    async fn deactivate(&self, id: &str) -> Result<(), StoreError> {
        let mut sessions = self.sessions.lock().unwrap();
        let record = sessions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.is_active = false;
        Ok(())
    }
}

// ============================================================================
// Canned model replies
// ============================================================================

pub fn summary_json() -> Value {
    json!({
        "skills": ["Rust", "PostgreSQL"],
        "projects": ["Built a distributed cache"],
        "achievements": ["Cut p99 latency by 40%"],
        "keywords": ["systems", "caching"]
    })
}

pub fn question_json(text: &str) -> Value {
    json!({
        "text": text,
        "topic": "General/Projects",
        "expected_points": ["context", "tradeoffs", "result"],
        "difficulty": "Medium"
    })
}

pub fn followup_json(text: &str) -> Value {
    json!({ "text": text, "expected_points": ["tradeoffs"] })
}

pub fn evaluation_json(score: u8, followup_needed: bool) -> Value {
    let missing: Vec<&str> = if followup_needed {
        vec!["tradeoffs"]
    } else {
        vec![]
    };
    let reason = followup_needed.then_some("Too shallow");
    json!({
        "correctness_score": score,
        "depth_score": score,
        "structure_score": score,
        "communication_score": score,
        "missing_points": missing,
        "feedback_text": "Clear structure.",
        "followup_needed": followup_needed,
        "followup_reason": reason
    })
}

pub fn report_json() -> Value {
    json!({
        "overall_score": 78,
        "category_scores": { "correctness": 8, "depth": 7, "structure": 8, "communication": 8 },
        "strengths": ["Concrete examples"],
        "weaknesses": ["Skips tradeoffs"],
        "improvement_plan_7_days": ["Day 1: review caching patterns"],
        "improved_answers": [{ "question_id": "q_1", "improved_answer": "Start with the goal..." }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::ContentGenerator;
    use crate::interview::{Action, Difficulty, Role};
    use crate::runtime::{
        EngineError, ErrorClass, SessionError, SessionManager, StartRequest, TurnEngine,
    };

    type TestManager = SessionManager<Arc<InMemoryStore>, MockLlmClient>;

    fn generator<L: LlmClient>(llm: &Arc<L>) -> ContentGenerator<L> {
        ContentGenerator::new(Arc::clone(llm)).with_backoff(Duration::ZERO)
    }

    fn setup() -> (TestManager, Arc<InMemoryStore>, Arc<MockLlmClient>) {
        let store = Arc::new(InMemoryStore::new());
        let llm = Arc::new(MockLlmClient::new("mock"));
        let manager = SessionManager::new(Arc::clone(&store), generator(&llm));
        (manager, store, llm)
    }

    fn start_request(total_questions: u32, max_followups: u32) -> StartRequest {
        StartRequest {
            role: Role::Sde1,
            difficulty: Difficulty::Medium,
            total_questions,
            max_followups: Some(max_followups),
            resume_text: "Backend engineer. Rust, Postgres.".to_string(),
        }
    }

    async fn start(manager: &TestManager, llm: &MockLlmClient, total: u32, cap: u32) -> String {
        llm.queue_json(&summary_json());
        llm.queue_json(&question_json("Tell me about your cache project."));
        let view = manager
            .start_session(start_request(total, cap))
            .await
            .unwrap();
        view.session_id
    }

    #[tokio::test]
    async fn test_start_session_asks_first_question() {
        let (manager, store, llm) = setup();
        let id = start(&manager, &llm, 5, 1).await;

        let view = manager.get_state(&id).await.unwrap();
        let question = view.current_question.unwrap();
        assert_eq!(question.id, "q_1");
        assert!((view.progress - 0.2).abs() < f64::EPSILON);
        assert_eq!(view.transcript.len(), 1);
        assert!(!view.is_finished);

        let record = store.get(&id).unwrap();
        assert!(record.state.resume_summary.is_some());
        assert_eq!(record.version, 1);
        assert_eq!(llm.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_strong_answers_reach_report_after_total_questions() {
        let (manager, store, llm) = setup();
        let id = start(&manager, &llm, 3, 1).await;

        for n in 2..=3 {
            llm.queue_json(&evaluation_json(9, false));
            llm.queue_json(&question_json(&format!("Question {n}")));
            let view = manager.submit_answer(&id, "A detailed answer").await.unwrap();
            assert_eq!(view.current_question.unwrap().id, format!("q_{n}"));
        }

        llm.queue_json(&evaluation_json(9, false));
        llm.queue_json(&report_json());
        let view = manager.submit_answer(&id, "Final answer").await.unwrap();
        assert!(view.is_finished);
        assert!(view.report_available);
        assert!(view.current_question.is_none());
        assert!((view.progress - 1.0).abs() < f64::EPSILON);

        let state = store.get(&id).unwrap().state;
        assert_eq!(state.asked_main_questions, 3);
        assert_eq!(state.answer_history.len(), 3);
        assert_eq!(state.eval_history.len(), 3);
        assert!(state.answer_history.iter().all(|a| !a.question_id.contains("_f")));
        // 1 summary + 3 questions + 3 evaluations + 1 report
        assert_eq!(llm.recorded_requests().len(), 8);

        let report = manager.get_report(&id).await.unwrap();
        assert_eq!(report.overall_score, 78);
    }

    #[tokio::test]
    async fn test_followup_chains_off_main_question() {
        let (manager, store, llm) = setup();
        let id = start(&manager, &llm, 4, 1).await;

        for n in 2..=3 {
            llm.queue_json(&evaluation_json(8, false));
            llm.queue_json(&question_json(&format!("Question {n}")));
            manager.submit_answer(&id, "Good answer").await.unwrap();
        }

        llm.queue_json(&evaluation_json(3, true));
        llm.queue_json(&followup_json("What tradeoffs did you weigh?"));
        let view = manager.submit_answer(&id, "Not sure").await.unwrap();

        let question = view.current_question.unwrap();
        assert_eq!(question.id, "q_3_f1");
        assert!(question.is_followup());
        let state = store.get(&id).unwrap().state;
        assert_eq!(state.followup_count_for_current, 1);
        assert_eq!(state.asked_main_questions, 3);

        // Cap of one: another weak answer moves on to q_4
        llm.queue_json(&evaluation_json(3, true));
        llm.queue_json(&question_json("Question 4"));
        let view = manager.submit_answer(&id, "Still not sure").await.unwrap();
        assert_eq!(view.current_question.unwrap().id, "q_4");
        let state = store.get(&id).unwrap().state;
        assert_eq!(state.followup_count_for_current, 0);
        assert_eq!(state.answer_history[3].question_id, "q_3_f1");
    }

    #[tokio::test]
    async fn test_end_session_short_circuits_to_report() {
        let (manager, store, llm) = setup();
        let id = start(&manager, &llm, 5, 1).await;

        llm.queue_json(&evaluation_json(8, false));
        llm.queue_json(&question_json("Question 2"));
        manager.submit_answer(&id, "Answer").await.unwrap();

        llm.queue_json(&report_json());
        let view = manager.end_session(&id).await.unwrap();
        assert!(view.is_finished);
        assert!(view.report_available);

        let record = store.get(&id).unwrap();
        assert!(!record.is_active);
        assert_eq!(record.state.asked_main_questions, 2);

        // Idempotent: no further generation
        let calls = llm.recorded_requests().len();
        manager.end_session(&id).await.unwrap();
        assert_eq!(llm.recorded_requests().len(), calls);
        assert!(manager.get_report(&id).await.is_ok());
    }

    #[tokio::test]
    async fn test_rejections_make_no_generator_call() {
        let (manager, _store, llm) = setup();
        let id = start(&manager, &llm, 2, 1).await;
        let calls = llm.recorded_requests().len();

        let err = manager.submit_answer(&id, "   ").await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::InvalidRequest);

        let err = manager.submit_answer("missing", "hi").await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));

        let err = manager.get_report(&id).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidRequest(_)));

        llm.queue_json(&report_json());
        manager.end_session(&id).await.unwrap();
        let calls_after_end = llm.recorded_requests().len();
        assert_eq!(calls_after_end, calls + 1);

        let err = manager.submit_answer(&id, "late answer").await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidRequest(_)));
        assert_eq!(llm.recorded_requests().len(), calls_after_end);
    }

    #[tokio::test]
    async fn test_start_validation() {
        let (manager, store, llm) = setup();
        for request in [
            start_request(0, 1),
            start_request(21, 1),
            start_request(3, 4),
            StartRequest {
                resume_text: " \n".to_string(),
                ..start_request(3, 1)
            },
        ] {
            let err = manager.start_session(request).await.unwrap_err();
            assert_eq!(err.class(), ErrorClass::InvalidRequest);
        }
        assert_eq!(store.len(), 0);
        assert!(llm.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_default_followups_apply_when_unspecified() {
        let store = Arc::new(InMemoryStore::new());
        let llm = Arc::new(MockLlmClient::new("mock"));
        let manager = SessionManager::new(Arc::clone(&store), generator(&llm))
            .with_default_max_followups(2);
        llm.queue_json(&summary_json());
        llm.queue_json(&question_json("Q1"));

        let view = manager
            .start_session(StartRequest {
                max_followups: None,
                ..start_request(3, 0)
            })
            .await
            .unwrap();
        let state = store.get(&view.session_id).unwrap().state;
        assert_eq!(state.max_followups_per_question, 2);
    }

    #[tokio::test]
    async fn test_failed_start_creates_no_session() {
        let (manager, store, llm) = setup();
        llm.queue_error(LlmError::auth("bad key"));

        let err = manager.start_session(start_request(3, 1)).await.unwrap_err();
        assert!(matches!(err, SessionError::Generation(_)));
        // A rejected key does not go away on retry
        assert_eq!(err.class(), ErrorClass::InternalDefect);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_generation_failure_keeps_last_saved_state() {
        let (manager, store, llm) = setup();
        let id = start(&manager, &llm, 3, 1).await;
        let before = store.get(&id).unwrap();

        for _ in 0..3 {
            llm.queue_text("not json at all");
        }
        let err = manager.submit_answer(&id, "My answer").await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::TryAgain);

        let after = store.get(&id).unwrap();
        assert_eq!(after.state, before.state);
        assert_eq!(after.version, before.version);

        // Retrying the same answer records it once
        llm.queue_json(&evaluation_json(8, false));
        llm.queue_json(&question_json("Question 2"));
        manager.submit_answer(&id, "My answer").await.unwrap();
        let state = store.get(&id).unwrap().state;
        let candidate_turns = state
            .transcript
            .iter()
            .filter(|t| t.text == "My answer")
            .count();
        assert_eq!(candidate_turns, 1);
        assert_eq!(state.answer_history.len(), 1);
    }

    #[tokio::test]
    async fn test_loop_bound_is_a_defect() {
        let llm = Arc::new(MockLlmClient::new("mock"));
        llm.queue_json(&summary_json());
        llm.queue_json(&question_json("Q1"));

        let engine = TurnEngine::new(generator(&llm)).with_max_actions(1);
        let state = SessionState::new(
            &crate::interview::SessionConfig {
                role: Role::ProductManager,
                difficulty: Difficulty::Easy,
                total_questions: 2,
                max_followups_per_question: 1,
            },
            "resume",
        );
        let err = engine.run("s", state).await.unwrap_err();
        match &err {
            EngineError::LoopBoundExceeded { limit, trail } => {
                assert_eq!(*limit, 1);
                assert_eq!(trail, &[Action::Summarize, Action::GenerateMainQuestion]);
            }
            other => panic!("expected loop bound, got {other:?}"),
        }
        assert_eq!(SessionError::from(err).class(), ErrorClass::InternalDefect);
    }

    #[tokio::test]
    async fn test_concurrent_submits_are_linearized() {
        let store = Arc::new(InMemoryStore::new());
        let llm = Arc::new(DelayedMockLlmClient::new("mock", Duration::from_millis(20)));
        let manager = Arc::new(SessionManager::new(Arc::clone(&store), generator(&llm)));

        llm.inner.queue_json(&summary_json());
        llm.inner.queue_json(&question_json("Only question"));
        let id = manager
            .start_session(start_request(1, 0))
            .await
            .unwrap()
            .session_id;
        llm.inner.queue_json(&evaluation_json(9, false));
        llm.inner.queue_json(&report_json());

        let submit = |text: &'static str| {
            let manager = Arc::clone(&manager);
            let id = id.clone();
            tokio::spawn(async move { manager.submit_answer(&id, text).await })
        };
        let (a, b) = tokio::join!(submit("first"), submit("second"));
        let results = [a.unwrap(), b.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(SessionError::InvalidRequest(_)))));

        let state = store.get(&id).unwrap().state;
        assert_eq!(state.answer_history.len(), 1);
        assert_eq!(state.eval_history.len(), 1);
        assert!(state.final_report.is_some());
    }

    #[tokio::test]
    async fn test_external_write_surfaces_conflict() {
        let store = Arc::new(InMemoryStore::new());
        let llm = Arc::new(DelayedMockLlmClient::new("mock", Duration::from_millis(20)));
        let manager = Arc::new(SessionManager::new(Arc::clone(&store), generator(&llm)));

        llm.inner.queue_json(&summary_json());
        llm.inner.queue_json(&question_json("Q1"));
        let id = manager
            .start_session(start_request(2, 0))
            .await
            .unwrap()
            .session_id;
        llm.inner.queue_json(&evaluation_json(9, false));
        llm.inner.queue_json(&question_json("Q2"));

        // Consume the permit left behind by the start turn
        let started = Arc::clone(&llm.request_started);
        started.notified().await;
        let task = {
            let manager = Arc::clone(&manager);
            let id = id.clone();
            tokio::spawn(async move { manager.submit_answer(&id, "answer").await })
        };
        started.notified().await;
        store.bump_version(&id);

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, SessionError::Conflict(_)));
        assert_eq!(err.class(), ErrorClass::TryAgain);
        assert!(store.get(&id).unwrap().state.answer_history.is_empty());
    }

    #[tokio::test]
    async fn test_database_backed_session() {
        let db = crate::db::Database::open_in_memory().unwrap();
        let llm = Arc::new(MockLlmClient::new("mock"));
        let manager = SessionManager::new(DatabaseStore::new(db.clone()), generator(&llm));

        llm.queue_json(&summary_json());
        llm.queue_json(&question_json("Q1"));
        let id = manager
            .start_session(start_request(1, 0))
            .await
            .unwrap()
            .session_id;

        llm.queue_json(&evaluation_json(7, false));
        llm.queue_json(&report_json());
        manager.submit_answer(&id, "answer").await.unwrap();

        let record = db.get_session(&id).unwrap();
        assert_eq!(record.version, 2);
        assert!(record.state.final_report.is_some());
        assert!(matches!(
            manager.get_state("unknown").await,
            Err(SessionError::NotFound(_))
        ));
    }
}
