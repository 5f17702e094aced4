/*
    Sync subsystem - Reconcile a vault with a peer copy

    Pairwise last-write-wins on each record's updated_at; grants merge
    directionally (the incoming ledger overwrites on overlap).
*/

pub mod auto_sync;
pub mod merge;
pub mod remote;

pub use auto_sync::{spawn_auto_sync, AutoSyncSummary};
pub use merge::{MergeReport, SyncEngine};
pub use remote::{RemoteRecord, RemoteSource, RemoteState};
