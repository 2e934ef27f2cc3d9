//! State node contract.

use super::machine::MachineContext;
use std::fmt;
use std::hash::Hash;

/// Stable discriminator of a node inside a machine's registry.
///
/// Implemented for any small copyable key, typically a fieldless enum.
pub trait NodeId: Copy + Eq + Hash + fmt::Debug + Send + 'static {}

impl<T> NodeId for T where T: Copy + Eq + Hash + fmt::Debug + Send + 'static {}

/// A unit of work driven by a [`StateMachine`](super::StateMachine).
///
/// Every hook receives the machine context of the engine that owns the node,
/// giving access to the blackboard, the run data and transition requests.
/// Transitions requested from a hook are applied after the hook returns.
pub trait StateNode<I, C>: Send {
    fn id(&self) -> I;

    /// Called once when the node is registered.
    fn on_create(&mut self, _ctx: &mut MachineContext<I, C>) {}

    fn on_enter(&mut self, ctx: &mut MachineContext<I, C>);

    /// Called on every `update` while this node is active.
    fn on_update(&mut self, _ctx: &mut MachineContext<I, C>) {}

    fn on_exit(&mut self, _ctx: &mut MachineContext<I, C>) {}
}
