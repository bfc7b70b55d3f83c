//! Data models for Shelfmark

pub mod book;

pub use book::{Book, BookInput, BookQuery, LendingOutcome, LendingState};
