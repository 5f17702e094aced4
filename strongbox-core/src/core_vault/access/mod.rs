/*
    Access subsystem - time-bounded per-record grants
*/

pub mod ledger;

pub use ledger::{validate_grant_request, AccessLedger, RecordGrants};
