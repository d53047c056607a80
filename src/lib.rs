//! Job-application email tracker: polls inboxes for application-related
//! messages, classifies each one into a lifecycle status, and reconciles the
//! results into a deduplicated spreadsheet ledger.

pub mod classify;
pub mod config;
pub mod google;
pub mod ledger;
pub mod normalize;
pub mod poller;
pub mod source;
pub mod store;
pub mod watermark;
