//! Core library for the tatame subtitle translator and media transcriber.

pub mod hash;
pub mod ledger;
pub mod media;
pub mod speech;
pub mod srt;
pub mod transcribe;
pub mod translate;
