//! snapvoice: client for an image → text → speech processing service.
//!
//! A job uploads one image, then polls the service while it extracts the
//! text and synthesizes audio. [`state_machine`] turns every service answer
//! into a client [`Phase`](state_machine::Phase), [`pipeline`] talks HTTP and
//! [`driver`] sequences the two for one job.

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod image;
pub mod pipeline;
pub mod state_machine;
pub mod ui;
