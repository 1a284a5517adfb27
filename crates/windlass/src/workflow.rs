//! The decision-replay contract for workflow logic.

use crate::decision::Decision;
use crate::process::Process;

/// Decision logic for one workflow type.
///
/// `decide` MUST be a pure function of `process.history` (plus whatever
/// static configuration the implementation carries): no wall-clock reads, no
/// randomness, no I/O, no mutation. The backend may invoke it more than once
/// for the same logical decision point (after a crash, after redelivery) and
/// expects identical output from identical history. Any non-determinism
/// corrupts replay-based recovery; see
/// [`ManagerConfig::verify_determinism`](crate::ManagerConfig) for an
/// optional runtime check.
///
/// An implementation is registered once per workflow type and never holds
/// per-process state; every invocation receives a freshly reconstructed
/// [`Process`].
///
/// # Deciding from history
///
/// Decision logic inspects the history (completed activity results, pending
/// signals) and returns the next step. Returning an empty list is valid and
/// means "nothing to do yet", such as when waiting for a signal.
///
/// # Example
///
/// ```ignore
/// struct FooWorkflow;
///
/// impl Workflow for FooWorkflow {
///     fn decide(&self, process: &Process) -> Vec<Decision> {
///         // A completed activity ends the process with its result.
///         if let Some((_, result)) = process.history.completed_activities().last() {
///             return vec![Decision::complete(result.clone())];
///         }
///         // Nothing scheduled yet: run the multiplication activity with
///         // the process's own input.
///         if process.history.scheduled_activities().next().is_none() {
///             return vec![Decision::schedule("multiplication")];
///         }
///         vec![]
///     }
/// }
/// ```
pub trait Workflow: Send + Sync + 'static {
    /// Decide the next steps for a process, given its history.
    fn decide(&self, process: &Process) -> Vec<Decision>;
}
