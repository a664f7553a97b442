//! Modules for the 6-operator FM voice.

pub mod algorithms;
pub mod dx_units;
pub mod envelope;
pub mod operator;
pub mod patch;
pub mod sine;
pub mod sysex;
pub mod voice;

/// Operators per voice.
pub const NUM_OPERATORS: usize = 6;

/// Number of algorithms in the routing table.
pub const NUM_ALGORITHMS: usize = 32;
