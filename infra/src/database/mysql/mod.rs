//! MySQL repository implementations

mod outbox_store;

pub use outbox_store::MySqlOutboxStore;
