//! Waybill - Package-Movement Consistency Engine
//!
//! The path from a physical barcode scan, through status transitions and
//! offline queuing, to manifest consolidation and invoice/payment
//! reconciliation. Append-only histories (scan events, payments) carry
//! the ground truth; package and invoice statuses are projections
//! recomputed on every write.

pub mod api;
pub mod config;
pub mod finance;
pub mod interfaces;
pub mod ledger;
pub mod manifest;
pub mod model;
pub mod queue;
pub mod storage;
