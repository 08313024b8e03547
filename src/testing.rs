//! Scripted agent and connector shared by the unit and integration tests.

#![cfg(test)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::agent::{
    AgentConnector, AgentError, BrowserAgent, ConnectOptions, LocateOptions, ScriptOutcome,
    ScrollParam,
};

#[derive(Default)]
struct AgentState {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<&'static str, String>>,
    query_result: Mutex<Value>,
    eval_result: Mutex<Value>,
    script_result: Mutex<Value>,
    /// Answers for successive `ai_boolean` calls; the last one repeats.
    boolean_answers: Mutex<Vec<bool>>,
    boolean_delay: Mutex<Option<Duration>>,
    closed: AtomicBool,
}

/// In-memory [`BrowserAgent`] that records every call and can be scripted
/// to fail or return canned values. Clones share state.
#[derive(Clone, Default)]
pub struct ScriptedAgent {
    state: Arc<AgentState>,
}

impl ScriptedAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(self, method: &'static str, message: &str) -> Self {
        self.state
            .failures
            .lock()
            .unwrap()
            .insert(method, message.to_string());
        self
    }

    pub fn failing_destroy(self, message: &str) -> Self {
        self.failing("destroy", message)
    }

    pub fn with_query_result(self, value: Value) -> Self {
        *self.state.query_result.lock().unwrap() = value;
        self
    }

    pub fn with_eval_result(self, value: Value) -> Self {
        *self.state.eval_result.lock().unwrap() = value;
        self
    }

    pub fn with_script_result(self, value: Value) -> Self {
        *self.state.script_result.lock().unwrap() = value;
        self
    }

    pub fn with_boolean_answers(self, answers: Vec<bool>) -> Self {
        *self.state.boolean_answers.lock().unwrap() = answers;
        self
    }

    pub fn with_boolean_delay(self, delay: Duration) -> Self {
        *self.state.boolean_delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn mark_closed(&self) {
        self.state.closed.store(true, Ordering::SeqCst);
    }

    pub fn mark_open(&self) {
        self.state.closed.store(false, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.calls.lock().unwrap().clone()
    }

    fn record(&self, method: &'static str, call: String) -> Result<(), AgentError> {
        self.state.calls.lock().unwrap().push(call);
        match self.state.failures.lock().unwrap().get(method) {
            Some(message) => Err(AgentError::Runtime(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BrowserAgent for ScriptedAgent {
    async fn destroy(&self, close_new_tabs: bool) -> Result<(), AgentError> {
        self.record("destroy", format!("destroy(close_new_tabs={close_new_tabs})"))
    }

    async fn ai_action(&self, prompt: &str) -> Result<(), AgentError> {
        self.record("ai_action", format!("ai_action({prompt})"))
    }

    async fn ai_tap(&self, locate: &str, options: LocateOptions) -> Result<(), AgentError> {
        self.record(
            "ai_tap",
            format!("ai_tap({locate}, deep_think={})", options.deep_think),
        )
    }

    async fn ai_hover(&self, locate: &str, options: LocateOptions) -> Result<(), AgentError> {
        self.record(
            "ai_hover",
            format!("ai_hover({locate}, deep_think={})", options.deep_think),
        )
    }

    async fn ai_input(
        &self,
        text: &str,
        locate: &str,
        options: LocateOptions,
    ) -> Result<(), AgentError> {
        self.record(
            "ai_input",
            format!("ai_input({text:?}, {locate}, deep_think={})", options.deep_think),
        )
    }

    async fn ai_keyboard_press(
        &self,
        key: &str,
        locate: Option<&str>,
        options: LocateOptions,
    ) -> Result<(), AgentError> {
        self.record(
            "ai_keyboard_press",
            format!(
                "ai_keyboard_press({key}, {:?}, deep_think={})",
                locate, options.deep_think
            ),
        )
    }

    async fn ai_scroll(
        &self,
        param: &ScrollParam,
        locate: Option<&str>,
        options: LocateOptions,
    ) -> Result<(), AgentError> {
        self.record(
            "ai_scroll",
            format!(
                "ai_scroll({:?}, {:?}, {:?}, {:?}, deep_think={})",
                param.direction, param.scroll_type, param.distance, locate, options.deep_think
            ),
        )
    }

    async fn ai_query(&self, data_shape: &str) -> Result<Value, AgentError> {
        self.record("ai_query", format!("ai_query({data_shape})"))?;
        Ok(self.state.query_result.lock().unwrap().clone())
    }

    async fn ai_assert(&self, assertion: &str) -> Result<(), AgentError> {
        self.record("ai_assert", format!("ai_assert({assertion})"))
    }

    async fn ai_boolean(&self, condition: &str) -> Result<bool, AgentError> {
        let delay = *self.state.boolean_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.record("ai_boolean", format!("ai_boolean({condition})"))?;
        let mut answers = self.state.boolean_answers.lock().unwrap();
        let answer = match answers.len() {
            0 => false,
            1 => answers[0],
            _ => answers.remove(0),
        };
        Ok(answer)
    }

    async fn run_yaml(&self, script: &str) -> Result<ScriptOutcome, AgentError> {
        self.record("run_yaml", format!("run_yaml({} bytes)", script.len()))?;
        Ok(ScriptOutcome {
            result: self.state.script_result.lock().unwrap().clone(),
        })
    }

    async fn set_ai_action_context(&self, context: &str) -> Result<(), AgentError> {
        self.record(
            "set_ai_action_context",
            format!("set_ai_action_context({context})"),
        )
    }

    async fn evaluate_javascript(&self, script: &str) -> Result<Value, AgentError> {
        self.record("evaluate_javascript", format!("evaluate_javascript({script})"))?;
        Ok(self.state.eval_result.lock().unwrap().clone())
    }

    fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct ConnectorState {
    connects: AtomicUsize,
    delay: Mutex<Option<Duration>>,
    failure: Mutex<Option<String>>,
    agent: Mutex<Option<ScriptedAgent>>,
    targets: Mutex<Vec<String>>,
}

/// [`AgentConnector`] that hands out [`ScriptedAgent`]s.
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<ConnectorState>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every successful connect returns (a clone of) this agent.
    pub fn with_agent(agent: ScriptedAgent) -> Self {
        let connector = Self::new();
        *connector.state.agent.lock().unwrap() = Some(agent);
        connector
    }

    pub fn with_connect_delay(self, delay: Duration) -> Self {
        *self.state.delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn failing_connect(self, message: &str) -> Self {
        *self.state.failure.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn into_arc(self) -> Arc<dyn AgentConnector> {
        Arc::new(self)
    }

    /// Number of agents actually created.
    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn targets(&self) -> Vec<String> {
        self.state.targets.lock().unwrap().clone()
    }

    async fn create(&self, target: String) -> Result<Arc<dyn BrowserAgent>, AgentError> {
        let delay = *self.state.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.state.targets.lock().unwrap().push(target);

        let failure = self.state.failure.lock().unwrap().clone();
        if let Some(message) = failure {
            return Err(AgentError::Runtime(message));
        }

        self.state.connects.fetch_add(1, Ordering::SeqCst);
        let agent = self
            .state
            .agent
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_default();
        Ok(Arc::new(agent))
    }
}

#[async_trait]
impl AgentConnector for MockConnector {
    async fn connect_current_tab(
        &self,
        options: ConnectOptions,
    ) -> Result<Arc<dyn BrowserAgent>, AgentError> {
        self.create(format!(
            "current_tab(force_same_tab={})",
            options.force_same_tab_navigation
        ))
        .await
    }

    async fn connect_new_tab(
        &self,
        url: &str,
        options: ConnectOptions,
    ) -> Result<Arc<dyn BrowserAgent>, AgentError> {
        self.create(format!(
            "new_tab({url}, force_same_tab={})",
            options.force_same_tab_navigation
        ))
        .await
    }
}
