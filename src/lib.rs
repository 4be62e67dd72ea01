//! Rastro - fallback dependency discovery for build steps
//!
//! When a build step's tool-specific dependency detector is unavailable,
//! Rastro runs the step under an external syscall tracer, interprets the
//! resulting trace log, and derives the set of files the step read (inputs)
//! and wrote (outputs) for an external build-dependency ledger. The whole
//! mechanism is best-effort: a malformed log line or a missing tracer never
//! fails the step itself.

pub mod classifier;
pub mod cli;
pub mod depfile;
pub mod parser;
pub mod session;
pub mod sink;
