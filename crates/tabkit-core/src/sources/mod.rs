//! Tab sources: the live enumerator on this machine and synced devices.

mod aggregate;
mod enumerator;

pub use aggregate::{aggregate, AggregateOutcome, SourceAggregator, SourceFailure, SourceKind};
pub use enumerator::{ScriptTabEnumerator, SessionFileEnumerator, TabEnumerator};
