//! State machine engine.
//!
//! The `StateMachine` owns its node registry, its blackboard and the run data
//! `C`. Exactly one node is active once `run` succeeds, and a failed
//! transition never leaves the machine without one.
//!
//! Nodes start asynchronous work with [`MachineContext::spawn`]. The spawned
//! future resolves to a completion handler which is queued on the machine and
//! only runs when the owner drives it through [`StateMachine::dispatch_ready`]
//! or [`StateMachine::next_completion`]. All node hooks, handlers and
//! blackboard access therefore happen on the owner's call chain.

use super::blackboard::Blackboard;
use super::error::FsmError;
use super::node::{NodeId, StateNode};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Handler run against the machine when an asynchronous operation completes.
pub type Completion<I, C> = Box<dyn FnOnce(&mut StateMachine<I, C>) + Send>;

/// Observer fired on every successful `change_state` with `(new, old)`.
pub type StateObserver<I, C> = Box<dyn FnMut(&mut C, I, I) + Send>;

enum Envelope<I, C> {
    /// Result of a spawned operation. Counts against `in_flight`.
    Completed(Completion<I, C>),
    /// Push-style notification from a running operation.
    Notified(Completion<I, C>),
}

/// Handle for posting notifications back to a machine from other tasks.
///
/// Notifications share the completion queue, so a notification posted before
/// an operation finishes is always handled before that operation's completion.
pub struct Notifier<I, C> {
    tx: mpsc::UnboundedSender<Envelope<I, C>>,
}

impl<I, C> Clone for Notifier<I, C> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<I: NodeId, C: 'static> Notifier<I, C> {
    pub fn post<F>(&self, handler: F)
    where
        F: FnOnce(&mut StateMachine<I, C>) + Send + 'static,
    {
        if self.tx.send(Envelope::Notified(Box::new(handler))).is_err() {
            debug!("state machine dropped, notification discarded");
        }
    }
}

/// The view of the machine handed to node hooks.
pub struct MachineContext<I, C> {
    blackboard: Blackboard,
    data: C,
    current: Option<I>,
    previous: Option<I>,
    requested: Option<I>,
    in_flight: usize,
    tx: mpsc::UnboundedSender<Envelope<I, C>>,
}

impl<I: NodeId, C: 'static> MachineContext<I, C> {
    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn blackboard_mut(&mut self) -> &mut Blackboard {
        &mut self.blackboard
    }

    pub fn data(&self) -> &C {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut C {
        &mut self.data
    }

    pub fn current(&self) -> Option<I> {
        self.current
    }

    pub fn previous(&self) -> Option<I> {
        self.previous
    }

    /// Number of spawned operations whose completion has not been handled.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Request a transition to `target` once the running hook returns.
    ///
    /// A later request replaces an earlier one.
    pub fn change_state(&mut self, target: I) {
        if let Some(superseded) = self.requested.replace(target) {
            debug!(?superseded, ?target, "transition request replaced");
        }
    }

    /// Run `operation` on the Tokio runtime and queue the handler it resolves
    /// to as a completion.
    ///
    /// If `operation` panics or is cancelled, an empty completion is queued
    /// instead, so `in_flight` always drops back once the task ends.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn spawn<F, H>(&mut self, operation: F)
    where
        F: Future<Output = H> + Send + 'static,
        H: FnOnce(&mut StateMachine<I, C>) + Send + 'static,
    {
        let tx = self.tx.clone();
        self.in_flight += 1;
        let task = tokio::spawn(operation);
        tokio::spawn(async move {
            let handler: Completion<I, C> = match task.await {
                Ok(handler) => Box::new(handler),
                Err(err) => {
                    error!(error = %err, "spawned operation did not complete");
                    Box::new(|_: &mut StateMachine<I, C>| {})
                }
            };
            if tx.send(Envelope::Completed(handler)).is_err() {
                debug!("state machine dropped, completion discarded");
            }
        });
    }

    pub fn notifier(&self) -> Notifier<I, C> {
        Notifier {
            tx: self.tx.clone(),
        }
    }
}

/// A finite state machine over nodes keyed by `I`, carrying run data `C`.
pub struct StateMachine<I, C> {
    nodes: HashMap<I, Box<dyn StateNode<I, C>>>,
    ctx: MachineContext<I, C>,
    rx: mpsc::UnboundedReceiver<Envelope<I, C>>,
    on_state_changed: Option<StateObserver<I, C>>,
}

impl<I: NodeId, C: 'static> StateMachine<I, C> {
    pub fn new(data: C) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            nodes: HashMap::new(),
            ctx: MachineContext {
                blackboard: Blackboard::new(),
                data,
                current: None,
                previous: None,
                requested: None,
                in_flight: 0,
                tx,
            },
            rx,
            on_state_changed: None,
        }
    }

    /// Register a node under its id and call its `on_create` hook.
    ///
    /// # Errors
    ///
    /// Returns `FsmError::DuplicateNode` if the id is taken. The existing
    /// registration is kept.
    pub fn add_node<N>(&mut self, node: N) -> Result<(), FsmError>
    where
        N: StateNode<I, C> + 'static,
    {
        self.add_boxed_node(Box::new(node))
    }

    pub fn add_boxed_node(&mut self, mut node: Box<dyn StateNode<I, C>>) -> Result<(), FsmError> {
        let id = node.id();
        if self.nodes.contains_key(&id) {
            return Err(FsmError::DuplicateNode(format!("{id:?}")));
        }

        node.on_create(&mut self.ctx);
        self.nodes.insert(id, node);
        Ok(())
    }

    /// Activate `entry` and call its `on_enter` hook.
    ///
    /// # Errors
    ///
    /// Returns `FsmError::UnknownState` if `entry` is not registered; the
    /// machine is left untouched.
    pub fn run(&mut self, entry: I) -> Result<(), FsmError> {
        if !self.nodes.contains_key(&entry) {
            error!(state = ?entry, "entry state is not registered");
            return Err(FsmError::UnknownState(format!("{entry:?}")));
        }

        debug!(state = ?entry, "state machine running");
        self.ctx.current = Some(entry);
        self.ctx.previous = None;
        self.enter(entry);
        self.apply_requested();
        Ok(())
    }

    /// Exit the active node and enter `target`.
    ///
    /// The target is validated before anything changes.
    ///
    /// # Errors
    ///
    /// Returns `FsmError::UnknownState` for an unregistered target and
    /// `FsmError::NotRunning` before `run`. In both cases the active node is
    /// unchanged and no hook is called.
    pub fn change_state(&mut self, target: I) -> Result<(), FsmError> {
        self.transition(target)?;
        self.apply_requested();
        Ok(())
    }

    /// Forward to the active node's `on_update` hook, if any.
    pub fn update(&mut self) {
        let Some(current) = self.ctx.current else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(&current) {
            node.on_update(&mut self.ctx);
        }
        self.apply_requested();
    }

    pub fn set_state_observer<F>(&mut self, observer: F)
    where
        F: FnMut(&mut C, I, I) + Send + 'static,
    {
        self.on_state_changed = Some(Box::new(observer));
    }

    pub fn set_blackboard<T: Any + Send>(&mut self, key: impl Into<String>, value: T) {
        self.ctx.blackboard.set(key, value);
    }

    pub fn get_blackboard<T: Any + Clone + Default>(&self, key: &str) -> T {
        self.ctx.blackboard.get(key)
    }

    pub fn current(&self) -> Option<I> {
        self.ctx.current
    }

    pub fn previous(&self) -> Option<I> {
        self.ctx.previous
    }

    pub fn contains(&self, id: I) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Ids of all registered nodes, in no particular order.
    pub fn node_ids(&self) -> impl Iterator<Item = I> + '_ {
        self.nodes.keys().copied()
    }

    pub fn in_flight(&self) -> usize {
        self.ctx.in_flight
    }

    pub fn context(&self) -> &MachineContext<I, C> {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut MachineContext<I, C> {
        &mut self.ctx
    }

    pub fn data(&self) -> &C {
        &self.ctx.data
    }

    pub fn data_mut(&mut self) -> &mut C {
        &mut self.ctx.data
    }

    /// Handle every completion and notification queued so far without
    /// waiting. Returns how many were handled.
    pub fn dispatch_ready(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(envelope) = self.rx.try_recv() {
            self.handle(envelope);
            handled += 1;
        }
        handled
    }

    /// Wait for the next spawned operation to complete and handle it, along
    /// with any notifications queued before it.
    ///
    /// Returns `false` immediately when nothing is in flight.
    pub async fn next_completion(&mut self) -> bool {
        while self.ctx.in_flight > 0 {
            let Some(envelope) = self.rx.recv().await else {
                return false;
            };
            let completed = matches!(envelope, Envelope::Completed(_));
            self.handle(envelope);
            if completed {
                return true;
            }
        }
        false
    }

    /// Drop queued completions and stop tracking in-flight operations.
    ///
    /// Operations already running are not interrupted; their completions are
    /// still queued when they finish.
    pub fn discard_pending(&mut self) -> usize {
        let mut discarded = 0;
        while self.rx.try_recv().is_ok() {
            discarded += 1;
        }
        self.ctx.in_flight = 0;
        self.ctx.requested = None;
        discarded
    }

    fn handle(&mut self, envelope: Envelope<I, C>) {
        match envelope {
            Envelope::Completed(handler) => {
                self.ctx.in_flight = self.ctx.in_flight.saturating_sub(1);
                handler(self);
            }
            Envelope::Notified(handler) => handler(self),
        }
        self.apply_requested();
    }

    fn transition(&mut self, target: I) -> Result<(), FsmError> {
        if !self.nodes.contains_key(&target) {
            error!(
                requested = ?target,
                current = ?self.ctx.current,
                "cannot change to unregistered state"
            );
            return Err(FsmError::UnknownState(format!("{target:?}")));
        }

        let Some(current) = self.ctx.current else {
            error!(requested = ?target, "cannot change state before the machine runs");
            return Err(FsmError::NotRunning);
        };

        self.ctx.previous = Some(current);
        if let Some(node) = self.nodes.get_mut(&current) {
            node.on_exit(&mut self.ctx);
        }
        self.ctx.current = Some(target);
        debug!(from = ?current, to = ?target, "state changed");

        if let Some(observer) = self.on_state_changed.as_mut() {
            observer(&mut self.ctx.data, target, current);
        }
        self.enter(target);
        Ok(())
    }

    fn enter(&mut self, id: I) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.on_enter(&mut self.ctx);
        }
    }

    /// Apply transitions requested by hooks until none remain.
    fn apply_requested(&mut self) {
        while let Some(target) = self.ctx.requested.take() {
            // Failures are logged by `transition` and keep the active node.
            let _ = self.transition(target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Toy {
        A,
        B,
        C,
    }

    #[derive(Default)]
    struct Trace {
        calls: Vec<String>,
        changes: Vec<(Toy, Toy)>,
    }

    struct ToyNode {
        id: Toy,
        label: &'static str,
        next_on_enter: Option<Toy>,
    }

    impl ToyNode {
        fn new(id: Toy) -> Self {
            Self {
                id,
                label: "",
                next_on_enter: None,
            }
        }

        fn labeled(id: Toy, label: &'static str) -> Self {
            Self {
                label,
                ..Self::new(id)
            }
        }

        fn forwarding(id: Toy, next: Toy) -> Self {
            Self {
                next_on_enter: Some(next),
                ..Self::new(id)
            }
        }
    }

    impl StateNode<Toy, Trace> for ToyNode {
        fn id(&self) -> Toy {
            self.id
        }

        fn on_create(&mut self, ctx: &mut MachineContext<Toy, Trace>) {
            ctx.data_mut()
                .calls
                .push(format!("create {:?}{}", self.id, self.label));
        }

        fn on_enter(&mut self, ctx: &mut MachineContext<Toy, Trace>) {
            ctx.data_mut().calls.push(format!("enter {:?}", self.id));
            if let Some(next) = self.next_on_enter {
                ctx.change_state(next);
            }
        }

        fn on_update(&mut self, ctx: &mut MachineContext<Toy, Trace>) {
            ctx.data_mut().calls.push(format!("update {:?}", self.id));
        }

        fn on_exit(&mut self, ctx: &mut MachineContext<Toy, Trace>) {
            ctx.data_mut().calls.push(format!("exit {:?}", self.id));
        }
    }

    fn two_node_machine() -> StateMachine<Toy, Trace> {
        let mut machine = StateMachine::new(Trace::default());
        machine.add_node(ToyNode::new(Toy::A)).unwrap();
        machine.add_node(ToyNode::new(Toy::B)).unwrap();
        machine.set_state_observer(|trace: &mut Trace, new, old| trace.changes.push((new, old)));
        machine
    }

    #[test]
    fn test_run_enters_entry_node() {
        let mut machine = two_node_machine();
        machine.run(Toy::A).unwrap();

        assert_eq!(machine.current(), Some(Toy::A));
        assert_eq!(machine.previous(), None);
        assert_eq!(machine.data().calls.last().unwrap(), "enter A");
        assert!(machine.data().changes.is_empty());
    }

    #[test]
    fn test_run_unknown_entry_fails() {
        let mut machine = two_node_machine();
        let result = machine.run(Toy::C);

        assert_eq!(result, Err(FsmError::UnknownState("C".to_string())));
        assert_eq!(machine.current(), None);
    }

    #[test]
    fn test_duplicate_node_keeps_first_registration() {
        let mut machine = StateMachine::new(Trace::default());
        machine.add_node(ToyNode::labeled(Toy::A, "-first")).unwrap();

        let result = machine.add_node(ToyNode::labeled(Toy::A, "-second"));
        assert_eq!(result, Err(FsmError::DuplicateNode("A".to_string())));

        // Only the first node was created
        assert_eq!(machine.data().calls, vec!["create A-first".to_string()]);
        assert_eq!(machine.node_ids().count(), 1);
    }

    #[test]
    fn test_change_state_order_and_observer() {
        let mut machine = two_node_machine();
        machine.run(Toy::A).unwrap();
        machine.change_state(Toy::B).unwrap();

        assert_eq!(machine.current(), Some(Toy::B));
        assert_eq!(machine.previous(), Some(Toy::A));
        assert_eq!(machine.data().changes, vec![(Toy::B, Toy::A)]);

        let calls = &machine.data().calls;
        let tail: Vec<&str> = calls[calls.len() - 2..].iter().map(String::as_str).collect();
        assert_eq!(tail, vec!["exit A", "enter B"]);
    }

    #[test]
    fn test_change_state_to_unregistered_keeps_current() {
        let mut machine = two_node_machine();
        machine.run(Toy::A).unwrap();
        let calls_before = machine.data().calls.len();

        let result = machine.change_state(Toy::C);

        assert_eq!(result, Err(FsmError::UnknownState("C".to_string())));
        assert_eq!(machine.current(), Some(Toy::A));
        assert_eq!(machine.previous(), None);
        // A was never exited
        assert_eq!(machine.data().calls.len(), calls_before);
        assert!(machine.data().changes.is_empty());
    }

    #[test]
    fn test_change_state_before_run_fails() {
        let mut machine = two_node_machine();
        assert_eq!(machine.change_state(Toy::B), Err(FsmError::NotRunning));
        assert_eq!(machine.current(), None);
    }

    #[test]
    fn test_reenter_same_state() {
        let mut machine = two_node_machine();
        machine.run(Toy::A).unwrap();
        machine.change_state(Toy::A).unwrap();

        assert_eq!(machine.current(), Some(Toy::A));
        assert_eq!(machine.previous(), Some(Toy::A));
        assert_eq!(machine.data().changes, vec![(Toy::A, Toy::A)]);
    }

    #[test]
    fn test_hook_requested_transition_applies_after_hook() {
        let mut machine = StateMachine::new(Trace::default());
        machine.add_node(ToyNode::forwarding(Toy::A, Toy::B)).unwrap();
        machine.add_node(ToyNode::new(Toy::B)).unwrap();

        machine.run(Toy::A).unwrap();

        assert_eq!(machine.current(), Some(Toy::B));
        assert_eq!(machine.previous(), Some(Toy::A));
    }

    #[test]
    fn test_hook_requested_unknown_transition_is_dropped() {
        let mut machine = StateMachine::new(Trace::default());
        machine.add_node(ToyNode::forwarding(Toy::A, Toy::C)).unwrap();

        machine.run(Toy::A).unwrap();

        assert_eq!(machine.current(), Some(Toy::A));
    }

    #[test]
    fn test_update_forwards_to_current() {
        let mut machine = two_node_machine();
        machine.update();
        assert!(!machine.data().calls.iter().any(|c| c.starts_with("update")));

        machine.run(Toy::B).unwrap();
        machine.update();
        assert_eq!(machine.data().calls.last().unwrap(), "update B");
    }

    #[test]
    fn test_blackboard_access() {
        let mut machine = two_node_machine();
        machine.set_blackboard("PackageName", "Default".to_string());

        assert_eq!(machine.get_blackboard::<String>("PackageName"), "Default");
        assert_eq!(machine.get_blackboard::<String>("Missing"), "");
    }

    struct AsyncNode;

    impl StateNode<Toy, Trace> for AsyncNode {
        fn id(&self) -> Toy {
            Toy::C
        }

        fn on_enter(&mut self, ctx: &mut MachineContext<Toy, Trace>) {
            let notifier = ctx.notifier();
            ctx.spawn(async move {
                notifier.post(|m: &mut StateMachine<Toy, Trace>| {
                    m.data_mut().calls.push("progress".to_string());
                });
                tokio::task::yield_now().await;
                |m: &mut StateMachine<Toy, Trace>| {
                    m.data_mut().calls.push("completed".to_string());
                    m.context_mut().change_state(Toy::A);
                }
            });
        }
    }

    #[tokio::test]
    async fn test_spawned_completion_drives_transition() {
        let mut machine = two_node_machine();
        machine.add_node(AsyncNode).unwrap();
        machine.run(Toy::C).unwrap();

        assert_eq!(machine.in_flight(), 1);
        assert_eq!(machine.current(), Some(Toy::C));

        assert!(machine.next_completion().await);

        assert_eq!(machine.in_flight(), 0);
        assert_eq!(machine.current(), Some(Toy::A));

        let calls: Vec<&str> = machine.data().calls.iter().map(String::as_str).collect();
        let progress = calls.iter().position(|c| *c == "progress").unwrap();
        let completed = calls.iter().position(|c| *c == "completed").unwrap();
        assert!(progress < completed);

        // Nothing left to wait for
        assert!(!machine.next_completion().await);
    }

    struct PanickingNode;

    impl StateNode<Toy, Trace> for PanickingNode {
        fn id(&self) -> Toy {
            Toy::C
        }

        fn on_enter(&mut self, ctx: &mut MachineContext<Toy, Trace>) {
            ctx.spawn(async move {
                let fail = true;
                if fail {
                    panic!("operation blew up");
                }
                |m: &mut StateMachine<Toy, Trace>| {
                    m.context_mut().change_state(Toy::A);
                }
            });
        }
    }

    #[tokio::test]
    async fn test_panicking_operation_still_completes() {
        let mut machine = two_node_machine();
        machine.add_node(PanickingNode).unwrap();
        machine.run(Toy::C).unwrap();
        assert_eq!(machine.in_flight(), 1);

        let completed = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            machine.next_completion(),
        )
        .await
        .expect("completion queued after the panic");

        assert!(completed);
        assert_eq!(machine.in_flight(), 0);
        assert_eq!(machine.current(), Some(Toy::C));
        assert!(!machine.next_completion().await);
    }

    #[tokio::test]
    async fn test_discard_pending() {
        let mut machine = two_node_machine();
        machine.add_node(AsyncNode).unwrap();
        machine.run(Toy::C).unwrap();

        machine.discard_pending();
        assert_eq!(machine.in_flight(), 0);
        assert!(!machine.next_completion().await);
        assert_eq!(machine.current(), Some(Toy::C));
    }
}
