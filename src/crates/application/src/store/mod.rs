pub mod counter;
pub mod delta_buffer;
pub mod membership;
pub mod relation_lookup;
pub mod snapshot_loader;

pub use counter::CounterStore;
pub use delta_buffer::{ClaimedDeltas, DeltaBuffer};
pub use membership::{InteractionStateStore, MembershipTtl};
pub use relation_lookup::RelationLookup;
pub use snapshot_loader::SnapshotLoader;

#[cfg(test)]
pub(crate) mod test_support;
