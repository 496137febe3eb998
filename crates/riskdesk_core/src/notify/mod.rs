//! Best-effort notification pipeline.
//!
//! # Responsibility
//! - Render event-kind templates and hand messages to the mail transport.
//! - Isolate every notification fault from the operation that emitted
//!   the event.
//!
//! # Invariants
//! - Dispatch is at-most-once per event; there is no retry or queueing
//!   for later delivery.
//! - No error crosses from this module back into a lifecycle caller.

pub mod catalog;
pub mod dispatcher;
pub mod template;
pub mod worker;
