//! The agent loop: wake, think, act, persist, and decide whether to go on.

use crate::cost::estimate_cost_cents;
use crate::prompt::{SystemPromptParams, build_system_prompt, build_wakeup_prompt};
use automaton_config::AutomatonConfig;
use automaton_core::action::{ActionRequest, ActionResult};
use automaton_core::agent::{AgentState, FinancialState, InputSource, PendingInput, Turn};
use automaton_core::error::{Error, StoreError};
use automaton_core::event::{DomainEvent, EventBus};
use automaton_core::identity::AutomatonIdentity;
use automaton_core::inference::{FinishReason, InferenceClient, InferenceOptions};
use automaton_core::memory::MemoryProvider;
use automaton_core::message::ChatMessage;
use automaton_core::sandbox::ExecutionBackend;
use automaton_core::social::SocialClient;
use automaton_core::store::{AutomatonDatabase, keys};
use automaton_core::survival::SurvivalTier;
use automaton_tools::{ActionContext, ActionGate, SLEEP_ACTION};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Number of turns summarised in the wake prompt after the first run.
const WAKE_SUMMARY_TURNS: usize = 3;

pub type StateChangeHook = Box<dyn Fn(AgentState) + Send + Sync>;
pub type TurnCompleteHook = Box<dyn Fn(&Turn) + Send + Sync>;

/// What the loop does after a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Drives the automaton through wake cycles.
///
/// One call to [`AgentLoop::run`] is one wake cycle: it returns when the
/// agent sleeps, dies, or fails too many times in a row. The caller decides
/// when to run it again.
pub struct AgentLoop {
    identity: AutomatonIdentity,
    config: Arc<AutomatonConfig>,
    db: Arc<dyn AutomatonDatabase>,
    inference: Arc<dyn InferenceClient>,
    sandbox: Arc<dyn ExecutionBackend>,
    memory: Arc<dyn MemoryProvider>,
    social: Option<Arc<dyn SocialClient>>,
    gate: ActionGate,
    event_bus: Arc<EventBus>,
    on_state_change: Option<StateChangeHook>,
    on_turn_complete: Option<TurnCompleteHook>,
}

impl AgentLoop {
    pub fn new(
        identity: AutomatonIdentity,
        config: Arc<AutomatonConfig>,
        db: Arc<dyn AutomatonDatabase>,
        inference: Arc<dyn InferenceClient>,
        sandbox: Arc<dyn ExecutionBackend>,
        memory: Arc<dyn MemoryProvider>,
    ) -> Self {
        Self {
            identity,
            config,
            db,
            inference,
            sandbox,
            memory,
            social: None,
            gate: ActionGate::builtin(),
            event_bus: Arc::new(EventBus::default()),
            on_state_change: None,
            on_turn_complete: None,
        }
    }

    /// Attach a peer-messaging client for `send_message`.
    pub fn with_social(mut self, social: Arc<dyn SocialClient>) -> Self {
        self.social = Some(social);
        self
    }

    pub fn with_gate(mut self, gate: ActionGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn on_state_change(mut self, hook: impl Fn(AgentState) + Send + Sync + 'static) -> Self {
        self.on_state_change = Some(Box::new(hook));
        self
    }

    pub fn on_turn_complete(mut self, hook: impl Fn(&Turn) + Send + Sync + 'static) -> Self {
        self.on_turn_complete = Some(Box::new(hook));
        self
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Run one wake cycle to completion. Never fails; problems are logged
    /// and, when persistent, turned into a long sleep.
    pub async fn run(&self) {
        self.run_cycles().await;

        if let Err(e) = self.memory.on_sleep().await {
            warn!(error = %e, "Memory provider failed to sleep");
        }
        let final_state = self.db.agent_state().await.unwrap_or_default();
        info!(state = %final_state, "Agent loop finished");
    }

    async fn run_cycles(&self) {
        let (mut pending, is_first_run) = self.wake().await;
        let ctx = self.action_context();
        let mut consecutive_errors: u32 = 0;

        loop {
            if self.sleep_pending().await {
                break;
            }

            match self.cycle(&mut pending, is_first_run, &ctx).await {
                Ok(Flow::Stop) => break,
                Ok(Flow::Continue) => consecutive_errors = 0,
                Err(e) => {
                    consecutive_errors += 1;
                    error!(error = %e, consecutive_errors, "Turn failed");
                    self.event_bus.publish(DomainEvent::ErrorOccurred {
                        context: "turn".into(),
                        error_message: e.to_string(),
                        timestamp: Utc::now(),
                    });

                    let limit = self.config.loop_config.max_consecutive_errors;
                    if consecutive_errors >= limit {
                        warn!(limit, "Too many consecutive errors, sleeping");
                        self.sleep_for(self.config.loop_config.error_sleep_secs).await;
                        break;
                    }
                }
            }
        }
    }

    /// Entry sequence. Returns the wake prompt and the first-run flag.
    async fn wake(&self) -> (Option<PendingInput>, bool) {
        match self.db.get_kv(keys::START_TIME).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                if let Err(e) = self.db.set_kv(keys::START_TIME, &Utc::now().to_rfc3339()).await {
                    warn!(error = %e, "Failed to record start time");
                }
            }
            Err(e) => warn!(error = %e, "Failed to read start time"),
        }

        self.set_state_logged(AgentState::Waking).await;
        let financial = self.financial_state().await;

        if let Err(e) = self.memory.on_wake(&self.identity).await {
            warn!(error = %e, "Memory provider failed to wake");
        }

        let is_first_run = match self.memory.turn_count().await {
            Ok(count) => count == 0,
            Err(e) => {
                warn!(error = %e, "Turn count unavailable, assuming not first run");
                false
            }
        };

        let recent = if is_first_run {
            Vec::new()
        } else {
            self.memory.recent_turns(WAKE_SUMMARY_TURNS).await.unwrap_or_else(|e| {
                debug!(error = %e, "Recent turns unavailable for wake prompt");
                Vec::new()
            })
        };
        let wakeup = build_wakeup_prompt(&self.identity, &self.config, &financial, &recent, is_first_run);

        self.set_state_logged(AgentState::Running).await;
        info!(
            name = %self.identity.name,
            credits_cents = financial.credits_cents,
            first_run = is_first_run,
            "Waking up"
        );

        (Some(PendingInput::new(wakeup, InputSource::Wakeup)), is_first_run)
    }

    fn action_context(&self) -> ActionContext {
        ActionContext {
            identity: self.identity.clone(),
            config: self.config.clone(),
            db: self.db.clone(),
            inference: self.inference.clone(),
            sandbox: self.sandbox.clone(),
            social: self.social.clone(),
        }
    }

    /// One think-act-persist cycle.
    async fn cycle(
        &self,
        pending: &mut Option<PendingInput>,
        is_first_run: bool,
        ctx: &ActionContext,
    ) -> Result<Flow, Error> {
        if pending.is_none() {
            *pending = self.drain_inbox().await?;
        }

        let financial = self.financial_state().await;
        let tier = SurvivalTier::classify(financial.credits_cents);
        if tier == SurvivalTier::Dead {
            info!(credits_cents = financial.credits_cents, "No credits remaining, entering dead state");
            self.set_state(AgentState::Dead).await?;
            return Ok(Flow::Stop);
        }
        self.apply_tier(tier).await?;

        let state = self.db.agent_state().await?;
        let messages = self.compose_prompt(pending.as_ref(), &financial, state, is_first_run).await?;
        let input = pending.take();

        let model = self.inference.default_model();
        info!(model = %model, "Thinking");
        let response = self
            .inference
            .chat(
                &messages,
                InferenceOptions {
                    max_tokens: Some(self.config.max_tokens_per_turn),
                    actions: self.gate.definitions(),
                    ..InferenceOptions::default()
                },
            )
            .await?;

        let mut turn = Turn::new(state);
        if let Some(input) = input {
            turn.input = Some(input.content);
            turn.input_source = Some(input.source);
        }
        turn.thinking = response.content.clone();
        turn.token_usage = response.usage;
        turn.cost_cents = estimate_cost_cents(&response.usage, &self.inference.default_model());

        let cap = self.config.loop_config.max_actions_per_turn;
        if response.tool_calls.len() > cap {
            warn!(
                requested = response.tool_calls.len(),
                cap,
                "Too many actions requested, dropping the rest"
            );
        }
        for call in response.tool_calls.iter().take(cap) {
            let request = ActionRequest::from_tool_call(call);
            info!(action = %request.name, "Action requested");
            let mut result = self.gate.execute(&request, ctx).await;
            result.id = call.id.clone();
            self.publish_action(&result);
            turn.action_results.push(result);
        }

        self.db.insert_turn(&turn).await?;
        for result in &turn.action_results {
            self.db.insert_action_result(&turn.id, result).await?;
        }
        self.memory.save_turn(&turn).await?;
        if let Some(hook) = &self.on_turn_complete {
            hook(&turn);
        }
        self.event_bus.publish(DomainEvent::TurnCompleted {
            turn_id: turn.id.clone(),
            action_count: turn.action_results.len(),
            total_tokens: turn.token_usage.total_tokens,
            cost_cents: turn.cost_cents,
            timestamp: Utc::now(),
        });
        if !turn.thinking.is_empty() {
            debug!(thought = %turn.thinking.chars().take(300).collect::<String>(), "Thought");
        }

        let slept = turn
            .action_results
            .iter()
            .any(|r| r.name == SLEEP_ACTION && r.is_success());
        if slept {
            info!("Agent chose to sleep");
            self.set_state(AgentState::Sleeping).await?;
            return Ok(Flow::Stop);
        }

        if response.tool_calls.is_empty() && response.finish_reason == FinishReason::Stop {
            info!("Nothing requested, entering brief sleep");
            let until = deadline(self.config.loop_config.idle_sleep_secs);
            self.db.set_kv(keys::SLEEP_UNTIL, &until.to_rfc3339()).await?;
            self.set_state(AgentState::Sleeping).await?;
            return Ok(Flow::Stop);
        }

        Ok(Flow::Continue)
    }

    /// Whether a sleep deadline is set and still in the future.
    async fn sleep_pending(&self) -> bool {
        let raw = match self.db.get_kv(keys::SLEEP_UNTIL).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return false,
            Err(e) => {
                warn!(error = %e, "Failed to read sleep deadline");
                return false;
            }
        };
        match DateTime::parse_from_rfc3339(&raw) {
            Ok(until) if until.with_timezone(&Utc) > Utc::now() => {
                info!(until = %raw, "Sleeping until deadline");
                true
            }
            Ok(_) => false,
            Err(e) => {
                debug!(value = %raw, error = %e, "Ignoring malformed sleep deadline");
                false
            }
        }
    }

    /// Fold unprocessed peer messages into one pending input.
    async fn drain_inbox(&self) -> Result<Option<PendingInput>, StoreError> {
        let messages = self
            .db
            .unprocessed_inbox_messages(self.config.loop_config.inbox_batch)
            .await?;
        if messages.is_empty() {
            return Ok(None);
        }

        let content = messages
            .iter()
            .map(|m| format!("[Message from {}]: {}", m.from, m.content))
            .collect::<Vec<_>>()
            .join("\n\n");
        for m in &messages {
            self.db.mark_inbox_message_processed(&m.id).await?;
        }
        info!(count = messages.len(), "Inbox messages received");
        Ok(Some(PendingInput::new(content, InputSource::Agent)))
    }

    /// Current balances; unavailable balances read as zero.
    async fn financial_state(&self) -> FinancialState {
        let credits_cents = self.sandbox.credits_balance().await.unwrap_or_else(|e| {
            debug!(error = %e, "Credits balance unavailable");
            0
        });
        let usdc_balance = self
            .sandbox
            .usdc_balance(&self.identity.address)
            .await
            .unwrap_or_else(|e| {
                debug!(error = %e, "USDC balance unavailable");
                0.0
            });
        FinancialState {
            credits_cents,
            usdc_balance,
            last_checked: Utc::now(),
        }
    }

    /// Persist the tier's state and switch the backend's model.
    async fn apply_tier(&self, tier: SurvivalTier) -> Result<(), StoreError> {
        let state = tier.agent_state();
        match tier {
            SurvivalTier::Critical => warn!("Credits critically low, limited operation"),
            SurvivalTier::LowCompute => debug!("Low credits, switching to low-compute mode"),
            _ => {}
        }

        if state != AgentState::Running || self.db.agent_state().await? != AgentState::Running {
            self.set_state(state).await?;
        }
        self.inference.set_low_compute_mode(tier.uses_low_compute());
        Ok(())
    }

    async fn compose_prompt(
        &self,
        pending: Option<&PendingInput>,
        financial: &FinancialState,
        state: AgentState,
        is_first_run: bool,
    ) -> Result<Vec<ChatMessage>, Error> {
        let actions = self.gate.definitions();
        let working_memory = self.memory.working_memory().await;
        let system = build_system_prompt(&SystemPromptParams {
            identity: &self.identity,
            config: &self.config,
            financial,
            state,
            actions: &actions,
            is_first_run,
            working_memory: working_memory.as_deref(),
        });

        let recalled = self.memory.recall(pending.map(|p| p.content.as_str())).await?;

        let mut messages = Vec::with_capacity(recalled.len() + 2);
        messages.push(ChatMessage::system(system));
        messages.extend(recalled);
        if let Some(input) = pending {
            messages.push(ChatMessage::user(format!("[{}] {}", input.source, input.content)));
        }
        Ok(messages)
    }

    fn publish_action(&self, result: &ActionResult) {
        self.event_bus.publish(DomainEvent::ActionExecuted {
            action_name: result.name.clone(),
            success: result.is_success(),
            blocked: ActionGate::is_blocked(result),
            duration_ms: result.duration_ms,
            timestamp: Utc::now(),
        });
    }

    async fn set_state(&self, state: AgentState) -> Result<(), StoreError> {
        self.db.set_agent_state(state).await?;
        if let Some(hook) = &self.on_state_change {
            hook(state);
        }
        self.event_bus.publish(DomainEvent::StateChanged {
            state,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn set_state_logged(&self, state: AgentState) {
        if let Err(e) = self.set_state(state).await {
            warn!(state = %state, error = %e, "Failed to persist agent state");
        }
    }

    /// Park for `secs` after repeated failures.
    async fn sleep_for(&self, secs: u64) {
        let until = deadline(secs);
        if let Err(e) = self.db.set_kv(keys::SLEEP_UNTIL, &until.to_rfc3339()).await {
            warn!(error = %e, "Failed to record sleep deadline");
        }
        self.set_state_logged(AgentState::Sleeping).await;
    }
}

/// `secs` from now, saturating at the latest representable time.
fn deadline(secs: u64) -> DateTime<Utc> {
    let now = Utc::now();
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        RecordingSandbox, ScriptedInference, make_action_call, stop_response, tool_call_response,
    };
    use automaton_core::error::InferenceError;
    use automaton_core::store::InboxMessage;
    use automaton_memory::{InMemoryMessageStore, PassThroughMemory, SessionMemory, SessionSettings};
    use automaton_state::InMemoryDatabase;
    use serde_json::json;
    use std::sync::Mutex;

    struct Harness {
        db: Arc<InMemoryDatabase>,
        inference: Arc<ScriptedInference>,
        sandbox: Arc<RecordingSandbox>,
        memory: Arc<dyn MemoryProvider>,
    }

    impl Harness {
        fn new(inference: ScriptedInference, credits: i64) -> Self {
            let db = Arc::new(InMemoryDatabase::new());
            Self {
                memory: Arc::new(PassThroughMemory::new(db.clone())),
                db,
                inference: Arc::new(inference),
                sandbox: Arc::new(RecordingSandbox::with_credits(credits)),
            }
        }

        fn agent(&self) -> AgentLoop {
            AgentLoop::new(
                AutomatonIdentity::new("ada", "0xabc"),
                Arc::new(AutomatonConfig::default()),
                self.db.clone(),
                self.inference.clone(),
                self.sandbox.clone(),
                self.memory.clone(),
            )
        }
    }

    #[tokio::test]
    async fn exec_runs_and_is_persisted() {
        let h = Harness::new(
            ScriptedInference::new(vec![
                tool_call_response(vec![make_action_call("exec", json!({"command": "echo hi"}))], ""),
                stop_response("Done."),
            ]),
            500,
        );
        let turns = Arc::new(Mutex::new(Vec::new()));
        let sink = turns.clone();
        h.agent().on_turn_complete(move |t| sink.lock().unwrap().push(t.clone())).run().await;

        let turns = turns.lock().unwrap();
        assert_eq!(turns.len(), 2);
        let exec = &turns[0].action_results[0];
        assert_eq!(exec.name, "exec");
        assert_eq!(exec.id, "call_exec");
        assert!(exec.error.is_none());
        assert!(exec.result.contains("hi"));
        assert_eq!(h.sandbox.commands(), ["echo hi"]);

        assert_eq!(h.db.turn_count().await.unwrap(), 2);
        assert_eq!(h.db.action_results_for(&turns[0].id).await.len(), 1);
    }

    #[tokio::test]
    async fn wake_sequence_and_first_turn_input() {
        let h = Harness::new(ScriptedInference::new(vec![stop_response("Hello world.")]), 500);
        let states = Arc::new(Mutex::new(Vec::new()));
        let sink = states.clone();
        h.agent().on_state_change(move |s| sink.lock().unwrap().push(s)).run().await;

        assert_eq!(
            *states.lock().unwrap(),
            [AgentState::Waking, AgentState::Running, AgentState::Sleeping]
        );
        assert!(h.db.get_kv(keys::START_TIME).await.unwrap().is_some());

        let prompt = &h.inference.prompts()[0];
        assert_eq!(prompt[0].role, automaton_core::message::Role::System);
        let last = prompt.last().unwrap();
        assert!(last.content.starts_with("[wakeup] You have just been created."));

        let turn = &h.db.recent_turns(1).await.unwrap()[0];
        assert_eq!(turn.input_source, Some(InputSource::Wakeup));
        assert_eq!(turn.thinking, "Hello world.");
    }

    #[tokio::test]
    async fn start_time_is_not_overwritten() {
        let h = Harness::new(ScriptedInference::new(vec![stop_response("ok")]), 500);
        h.db.set_kv(keys::START_TIME, "2026-01-01T00:00:00+00:00").await.unwrap();
        h.agent().run().await;
        assert_eq!(
            h.db.get_kv(keys::START_TIME).await.unwrap().as_deref(),
            Some("2026-01-01T00:00:00+00:00")
        );
    }

    #[tokio::test]
    async fn idle_turn_sleeps_for_a_minute() {
        let h = Harness::new(ScriptedInference::new(vec![stop_response("Nothing to do.")]), 500);
        let before = Utc::now();
        h.agent().run().await;

        assert_eq!(h.db.agent_state().await.unwrap(), AgentState::Sleeping);
        let raw = h.db.get_kv(keys::SLEEP_UNTIL).await.unwrap().unwrap();
        let until = DateTime::parse_from_rfc3339(&raw).unwrap().with_timezone(&Utc);
        let secs = (until - before).num_seconds();
        assert!((59..=61).contains(&secs));
    }

    #[tokio::test]
    async fn length_finish_without_actions_keeps_going() {
        let h = Harness::new(
            ScriptedInference::new(vec![
                ScriptedInference::response("cut off", vec![], FinishReason::Length),
                stop_response("done"),
            ]),
            500,
        );
        h.agent().run().await;
        assert_eq!(h.inference.call_count(), 2);
    }

    #[tokio::test]
    async fn sleep_action_ends_invocation() {
        let h = Harness::new(
            ScriptedInference::new(vec![tool_call_response(
                vec![make_action_call("sleep", json!({"duration_seconds": 60, "reason": "test"}))],
                "",
            )]),
            500,
        );
        h.agent().run().await;

        assert_eq!(h.inference.call_count(), 1);
        assert_eq!(h.db.agent_state().await.unwrap(), AgentState::Sleeping);
        assert!(h.db.get_kv(keys::SLEEP_UNTIL).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn future_sleep_deadline_stops_before_thinking() {
        let h = Harness::new(ScriptedInference::new(vec![]), 500);
        let until = Utc::now() + Duration::seconds(600);
        h.db.set_kv(keys::SLEEP_UNTIL, &until.to_rfc3339()).await.unwrap();
        h.agent().run().await;
        assert_eq!(h.inference.call_count(), 0);
    }

    #[tokio::test]
    async fn zero_credits_means_dead() {
        let h = Harness::new(ScriptedInference::new(vec![]), 0);
        h.agent().run().await;
        assert_eq!(h.db.agent_state().await.unwrap(), AgentState::Dead);
        assert_eq!(h.inference.call_count(), 0);
        assert_eq!(h.db.turn_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn dead_is_reevaluated_once_funds_return() {
        let h = Harness::new(ScriptedInference::new(vec![stop_response("Back in business.")]), 0);
        h.agent().run().await;
        assert_eq!(h.db.agent_state().await.unwrap(), AgentState::Dead);
        assert_eq!(h.inference.call_count(), 0);

        h.sandbox.set_credits(5000);
        let states = Arc::new(Mutex::new(Vec::new()));
        let sink = states.clone();
        h.agent().on_state_change(move |s| sink.lock().unwrap().push(s)).run().await;

        assert_eq!(h.inference.call_count(), 1);
        assert!(states.lock().unwrap().contains(&AgentState::Running));
        assert_eq!(h.db.recent_turns(1).await.unwrap()[0].state, AgentState::Running);
        assert_eq!(h.db.agent_state().await.unwrap(), AgentState::Sleeping);
    }

    #[tokio::test]
    async fn low_credits_force_low_compute() {
        let h = Harness::new(ScriptedInference::new(vec![stop_response("Low on credits.")]), 5);
        let states = Arc::new(Mutex::new(Vec::new()));
        let sink = states.clone();
        h.agent().on_state_change(move |s| sink.lock().unwrap().push(s)).run().await;

        assert!(h.inference.low_compute());
        assert!(states.lock().unwrap().contains(&AgentState::Critical));
        assert_eq!(h.db.recent_turns(1).await.unwrap()[0].state, AgentState::Critical);
    }

    #[tokio::test]
    async fn normal_credits_clear_low_compute() {
        let h = Harness::new(ScriptedInference::new(vec![stop_response("ok")]), 500);
        h.inference.set_low_compute_mode(true);
        h.agent().run().await;
        assert!(!h.inference.low_compute());
    }

    #[tokio::test]
    async fn inbox_message_becomes_next_input() {
        let h = Harness::new(
            ScriptedInference::new(vec![
                tool_call_response(vec![make_action_call("exec", json!({"command": "echo awake"}))], ""),
                stop_response("Received the message."),
            ]),
            500,
        );
        let mut msg = InboxMessage::new("0xsender", "0xabc", "Hello from another agent!");
        msg.id = "msg-1".into();
        h.db.insert_inbox_message(&msg).await.unwrap();

        h.agent().run().await;

        let prompts = h.inference.prompts();
        let last = prompts[1].last().unwrap();
        assert_eq!(
            last.content,
            "[agent] [Message from 0xsender]: Hello from another agent!"
        );
        assert_eq!(h.db.is_inbox_processed("msg-1").await, Some(true));
        assert!(h.db.unprocessed_inbox_messages(10).await.unwrap().is_empty());

        let turns = h.db.recent_turns(10).await.unwrap();
        assert_eq!(turns[1].input_source, Some(InputSource::Agent));
    }

    #[tokio::test]
    async fn repeated_failures_sleep_for_five_minutes() {
        let failures = (0..5)
            .map(|_| Err(InferenceError::Network("connection refused".into())))
            .collect();
        let h = Harness::new(ScriptedInference::from_results(failures), 500);
        let before = Utc::now();
        h.agent().run().await;

        assert_eq!(h.inference.call_count(), 5);
        assert_eq!(h.db.agent_state().await.unwrap(), AgentState::Sleeping);
        let raw = h.db.get_kv(keys::SLEEP_UNTIL).await.unwrap().unwrap();
        let until = DateTime::parse_from_rfc3339(&raw).unwrap().with_timezone(&Utc);
        assert!((until - before).num_seconds() >= 299);
        assert_eq!(h.db.turn_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn success_resets_failure_counter() {
        let mut script: Vec<Result<_, InferenceError>> = (0..4)
            .map(|_| Err(InferenceError::Network("flaky".into())))
            .collect();
        script.push(Ok(tool_call_response(
            vec![make_action_call("exec", json!({"command": "echo ok"}))],
            "",
        )));
        script.extend((0..4).map(|_| Err(InferenceError::Network("flaky".into()))));
        script.push(Ok(stop_response("recovered")));

        let h = Harness::new(ScriptedInference::from_results(script), 500);
        h.agent().run().await;

        assert_eq!(h.inference.call_count(), 10);
        assert_eq!(h.db.turn_count().await.unwrap(), 2);
        let raw = h.db.get_kv(keys::SLEEP_UNTIL).await.unwrap().unwrap();
        let until = DateTime::parse_from_rfc3339(&raw).unwrap().with_timezone(&Utc);
        assert!((until - Utc::now()).num_seconds() <= 61);
    }

    #[tokio::test]
    async fn pending_input_is_cleared_even_when_the_call_fails() {
        let h = Harness::new(
            ScriptedInference::from_results(vec![
                Err(InferenceError::Network("down".into())),
                Ok(stop_response("ok")),
            ]),
            500,
        );
        h.agent().run().await;

        let prompts = h.inference.prompts();
        assert!(prompts[0].last().unwrap().content.starts_with("[wakeup]"));
        // The wake prompt was cleared before the failed call
        assert_eq!(prompts[1].last().unwrap().role, automaton_core::message::Role::System);
    }

    #[tokio::test]
    async fn actions_beyond_cap_are_dropped() {
        let calls = (0..12)
            .map(|i| {
                let mut c = make_action_call("exec", json!({"command": format!("echo {i}")}));
                c.id = format!("call_{i}");
                c
            })
            .collect();
        let h = Harness::new(
            ScriptedInference::new(vec![tool_call_response(calls, ""), stop_response("done")]),
            500,
        );
        h.agent().run().await;

        assert_eq!(h.sandbox.commands().len(), 10);
        let turns = h.db.recent_turns(10).await.unwrap();
        assert_eq!(turns[0].action_results.len(), 10);
        assert_eq!(turns[0].action_results[9].id, "call_9");
    }

    #[tokio::test]
    async fn invalid_arguments_become_empty_mapping() {
        let mut call = make_action_call("exec", json!({}));
        call.arguments = "{not json".into();
        let h = Harness::new(
            ScriptedInference::new(vec![tool_call_response(vec![call], ""), stop_response("done")]),
            500,
        );
        h.agent().run().await;

        let turns = h.db.recent_turns(10).await.unwrap();
        let result = &turns[0].action_results[0];
        assert!(result.arguments.is_empty());
        assert!(result.error.as_deref().unwrap().contains("command"));
    }

    #[tokio::test]
    async fn forbidden_command_is_blocked_and_evented() {
        let h = Harness::new(
            ScriptedInference::new(vec![
                tool_call_response(
                    vec![make_action_call("exec", json!({"command": "rm -rf ~/.automaton"}))],
                    "",
                ),
                stop_response("OK."),
            ]),
            500,
        );
        let agent = h.agent();
        let mut events = agent.event_bus().subscribe();
        agent.run().await;

        assert!(h.sandbox.commands().is_empty());
        let turns = h.db.recent_turns(10).await.unwrap();
        assert!(turns[0].action_results[0].result.starts_with("Blocked"));

        let mut saw_block = false;
        while let Ok(event) = events.try_recv() {
            if let DomainEvent::ActionExecuted { blocked, .. } = event.as_ref() {
                saw_block |= *blocked;
            }
        }
        assert!(saw_block);
    }

    #[tokio::test]
    async fn memory_sleeps_once_and_recall_is_empty_after() {
        let store = Arc::new(InMemoryMessageStore::new());
        let session = Arc::new(SessionMemory::new(store, SessionSettings::default()));
        let db = Arc::new(InMemoryDatabase::new());
        let inference = Arc::new(ScriptedInference::new(vec![stop_response("hi")]));
        let agent = AgentLoop::new(
            AutomatonIdentity::new("ada", "0xabc"),
            Arc::new(AutomatonConfig::default()),
            db,
            inference,
            Arc::new(RecordingSandbox::with_credits(500)),
            session.clone(),
        );
        agent.run().await;

        assert_eq!(session.turn_count().await.unwrap(), 1);
        assert!(session.recall(None).await.unwrap().is_empty());
    }
}
