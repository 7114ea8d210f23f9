//! The statement handle: a generational key, not a raw pointer. A `StatementKey` stays valid
//! only as long as the slot it was issued from hasn't been reused, so handing a foreign or
//! finalized key back into a `Database` returns `Failure`, never undefined behaviour — the
//! `slotmap` crate gives us this for free instead of hand-rolling generation counters.

slotmap::new_key_type! {
    pub(crate) struct StatementKey;
}
