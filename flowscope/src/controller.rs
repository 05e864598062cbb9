//! Execution controller: owns the current thread, the ordered trace steps,
//! and the single active-node highlight, and reduces incoming trace events
//! and user actions into renderable state.

use flowscope_types::{NodeId, StepRole, TraceEvent, TraceStep};
use ulid::Ulid;

use crate::api::ConsoleApi;
use crate::classify::classify;
use crate::error::Result;

/// Binds a run to the thread it was submitted against. Events arriving after
/// the active thread changed are discarded instead of mutating the newly
/// selected thread's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunToken {
    thread_id: String,
}

#[derive(Debug)]
pub struct ExecutionController {
    thread_id: String,
    steps: Vec<TraceStep>,
    active_node: Option<NodeId>,
    busy: bool,
}

fn fresh_thread_id() -> String {
    format!("thread-{}", Ulid::new().to_string().to_lowercase())
}

impl ExecutionController {
    pub fn new() -> Self {
        Self {
            thread_id: fresh_thread_id(),
            steps: Vec::new(),
            active_node: None,
            busy: false,
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    pub fn active_node(&self) -> Option<&NodeId> {
        self.active_node.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Start a run: append the optimistic user step before any network round
    /// trip and mark the controller busy. Returns `None` for empty input or
    /// while a run is already in flight.
    pub fn submit(&mut self, input: &str) -> Option<RunToken> {
        let input = input.trim();
        if input.is_empty() || self.busy {
            return None;
        }
        self.steps.push(TraceStep::user(input));
        self.busy = true;
        Some(RunToken {
            thread_id: self.thread_id.clone(),
        })
    }

    /// Reduce one trace event into state. Returns false when the token no
    /// longer matches the current thread, in which case nothing changes.
    pub fn apply_event(&mut self, token: &RunToken, event: &TraceEvent) -> bool {
        if token.thread_id != self.thread_id {
            tracing::debug!(
                run_thread = %token.thread_id,
                current_thread = %self.thread_id,
                "discarding event from abandoned run"
            );
            return false;
        }
        self.active_node = Some(event.node_id.clone());
        let payloads = event
            .updates
            .iter()
            .map(|(channel, value)| (channel.clone(), classify(value)))
            .collect();
        self.steps.push(TraceStep {
            node_id: event.node_id.clone(),
            role: StepRole::Node,
            payloads,
        });
        true
    }

    /// End of a run, clean or failed: accumulated steps stay (no rollback of
    /// the optimistic user step), the highlight and busy flag clear. No-op
    /// when the token's thread is no longer current.
    pub fn finish_run(&mut self, token: &RunToken) {
        if token.thread_id != self.thread_id {
            return;
        }
        self.active_node = None;
        self.busy = false;
    }

    /// Switch to a prior thread, replacing the step sequence wholesale with
    /// its persisted history.
    pub fn select_thread(&mut self, id: &str, history: Vec<TraceStep>) {
        self.thread_id = id.to_string();
        self.steps = history;
        self.active_node = None;
        self.busy = false;
    }

    /// Start a fresh thread with a time-derived unique id.
    pub fn new_thread(&mut self) -> &str {
        self.thread_id = fresh_thread_id();
        self.steps.clear();
        self.active_node = None;
        self.busy = false;
        &self.thread_id
    }

    /// Mirror user focus over a historical step onto the graph highlight,
    /// independent of any live run.
    pub fn hover_step(&mut self, index: usize) {
        if let Some(step) = self.steps.get(index) {
            self.active_node = Some(step.node_id.clone());
        }
    }

    pub fn clear_hover(&mut self) {
        self.active_node = None;
    }
}

impl Default for ExecutionController {
    fn default() -> Self {
        Self::new()
    }
}

/// Drive one full submission: open the stream, reduce every event as it
/// arrives, and finish the run. `on_change` fires after every state change
/// so a front end can re-render incrementally.
///
/// A transport failure ends the run with everything accumulated so far kept
/// and busy cleared; the caller decides whether to resubmit.
pub async fn run_submission(
    controller: &mut ExecutionController,
    api: &ConsoleApi,
    input: &str,
    mut on_change: impl FnMut(&ExecutionController),
) -> Result<bool> {
    let Some(token) = controller.submit(input) else {
        return Ok(false);
    };
    on_change(controller);

    let mut stream = match api
        .open_run_stream(input, Some(controller.thread_id()))
        .await
    {
        Ok(stream) => stream,
        Err(error) => {
            controller.finish_run(&token);
            on_change(controller);
            return Err(error);
        }
    };

    loop {
        match stream.next_event().await {
            Ok(Some(event)) => {
                if controller.apply_event(&token, &event) {
                    on_change(controller);
                }
            }
            Ok(None) => break,
            Err(error) => {
                controller.finish_run(&token);
                on_change(controller);
                return Err(error);
            }
        }
    }

    controller.finish_run(&token);
    on_change(controller);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowscope_types::Payload;
    use serde_json::json;

    fn event(node: &str, channel: &str, value: serde_json::Value) -> TraceEvent {
        let mut updates = serde_json::Map::new();
        updates.insert(channel.to_string(), value);
        TraceEvent {
            node_id: node.into(),
            updates,
        }
    }

    #[test]
    fn empty_submit_is_a_no_op() {
        let mut controller = ExecutionController::new();
        assert!(controller.submit("").is_none());
        assert!(controller.submit("   ").is_none());
        assert!(controller.steps().is_empty());
        assert!(!controller.is_busy());
    }

    #[test]
    fn submit_appends_optimistic_user_step() {
        let mut controller = ExecutionController::new();
        let token = controller.submit("run it").expect("token");
        assert!(controller.is_busy());
        assert_eq!(controller.steps().len(), 1);
        assert_eq!(controller.steps()[0].role, StepRole::User);
        assert_eq!(
            controller.steps()[0].payloads.get("input"),
            Some(&Payload::Text("run it".to_string()))
        );
        // Re-entrant submission is refused while busy.
        assert!(controller.submit("again").is_none());
        controller.finish_run(&token);
        assert!(!controller.is_busy());
        assert!(controller.active_node().is_none());
    }

    #[test]
    fn events_set_active_node_and_append_classified_steps() {
        let mut controller = ExecutionController::new();
        let token = controller.submit("go").expect("token");

        assert!(controller.apply_event(&token, &event("plan", "messages", json!([{"content": "hi"}]))));
        assert_eq!(controller.active_node().map(NodeId::as_str), Some("plan"));
        let step = controller.steps().last().expect("step");
        assert_eq!(step.role, StepRole::Node);
        assert!(matches!(
            step.payloads.get("messages"),
            Some(Payload::Messages(_))
        ));

        controller.finish_run(&token);
        assert!(controller.active_node().is_none());
    }

    #[test]
    fn events_from_abandoned_run_are_discarded() {
        let mut controller = ExecutionController::new();
        let token = controller.submit("go").expect("token");

        controller.select_thread("other-thread", Vec::new());
        assert!(!controller.apply_event(&token, &event("plan", "output", json!("late"))));
        assert!(controller.steps().is_empty());
        assert!(controller.active_node().is_none());

        // finish_run from the stale token must not clobber the new thread.
        controller.finish_run(&token);
        assert_eq!(controller.thread_id(), "other-thread");
    }

    #[test]
    fn select_thread_hydrates_history_and_clears_highlight() {
        let mut controller = ExecutionController::new();
        let token = controller.submit("go").expect("token");
        controller.apply_event(&token, &event("plan", "output", json!("x")));

        let history = vec![TraceStep::user("earlier"), {
            let mut payloads = std::collections::BTreeMap::new();
            payloads.insert("output".to_string(), Payload::Text("done".to_string()));
            TraceStep {
                node_id: "act".into(),
                role: StepRole::Node,
                payloads,
            }
        }];
        controller.select_thread("old-thread", history.clone());

        assert_eq!(controller.thread_id(), "old-thread");
        assert_eq!(controller.steps(), history.as_slice());
        assert!(controller.active_node().is_none());
        assert!(!controller.is_busy());
    }

    #[test]
    fn new_thread_resets_state_with_fresh_id() {
        let mut controller = ExecutionController::new();
        let token = controller.submit("go").expect("token");
        controller.apply_event(&token, &event("plan", "output", json!("x")));

        let before = controller.thread_id().to_string();
        let after = controller.new_thread().to_string();
        assert_ne!(before, after);
        assert!(controller.steps().is_empty());
        assert!(controller.active_node().is_none());
    }

    #[test]
    fn hover_replays_highlight_without_running() {
        let mut controller = ExecutionController::new();
        let token = controller.submit("go").expect("token");
        controller.apply_event(&token, &event("plan", "output", json!("x")));
        controller.finish_run(&token);

        controller.hover_step(1);
        assert_eq!(controller.active_node().map(NodeId::as_str), Some("plan"));
        controller.clear_hover();
        assert!(controller.active_node().is_none());

        // Out-of-range hover is a no-op.
        controller.hover_step(99);
        assert!(controller.active_node().is_none());
    }
}
