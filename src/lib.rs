//! Telegram job board service.
//!
//! Employers submit postings through a Telegram Mini App, an admin
//! approves or rejects them via inline buttons, approved postings are
//! broadcast to a public channel with a deep link back into the Mini
//! App, and job seekers apply by uploading a CV that is forwarded to
//! the employer as a Telegram document. The only persistent store is a
//! Google spreadsheet with Jobs and Applications tabs.

pub mod cli;
pub mod core;
pub mod sheets;
pub mod telegram;
pub mod web;
