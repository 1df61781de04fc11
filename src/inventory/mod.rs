pub mod reconcile;
pub mod storage;
pub mod units;

pub use reconcile::{apply, reverse, ReconcileOutcome, TransactionKind};
pub use storage::{aggregate, decode_entries, encode_entries, Aliquot, StorageEntry};
pub use units::{convert, Unit, UnitCategory};
