//! FM algorithms and how to evaluate them.

// Based on MIT-licensed code (c) 2021 by Emilie Gillet (emilie.o.gillet@gmail.com)

use crate::error::ConfigError;

use super::{NUM_ALGORITHMS, NUM_OPERATORS};

// The raw structure of each algorithm is stored as one byte per operator,
// holding the destinations of that operator's output. This data is compact
// and is what the table resource persists.
//
// At init time, each row is "compiled" into a routing graph. Operators are
// evaluated from the highest index down, so an edge pointing to a lower index
// is consumed in the same frame. The one edge that points to the source
// itself or to a higher index closes a cycle; it is carried over to the next
// frame through the voice's feedback register.

/// Destination bit: the operator output is summed to the master bus.
pub const MASTER_OUTPUT: u8 = 0x40;

const OPERATOR_MASK: u8 = 0x3f;
const RESERVED_MASK: u8 = 0x80;

const OUT: u8 = MASTER_OUTPUT;
const OP1: u8 = 0x01;
const OP2: u8 = 0x02;
const OP3: u8 = 0x04;
const OP4: u8 = 0x08;
const OP5: u8 = 0x10;
const OP6: u8 = 0x20;

/// The 32 DX7 algorithms. Columns are operators 1 to 6.
#[rustfmt::skip]
pub const ROUTING: [[u8; NUM_OPERATORS]; NUM_ALGORITHMS] = [
    [OUT, OP1,       OUT,             OP3,       OP4,             OP5 | OP6],
    [OUT, OP1 | OP2, OUT,             OP3,       OP4,             OP5],
    [OUT, OP1,       OP2,             OUT,       OP4,             OP5 | OP6],
    [OUT, OP1,       OP2,             OUT | OP6, OP4,             OP5],
    [OUT, OP1,       OUT,             OP3,       OUT,             OP5 | OP6],
    [OUT, OP1,       OUT,             OP3,       OUT | OP6,       OP5],
    [OUT, OP1,       OUT,             OP3,       OP3,             OP5 | OP6],
    [OUT, OP1,       OUT,             OP3 | OP4, OP3,             OP5],
    [OUT, OP1 | OP2, OUT,             OP3,       OP3,             OP5],
    [OUT, OP1,       OP2 | OP3,       OUT,       OP4,             OP4],
    [OUT, OP1,       OP2,             OUT,       OP4,             OP4 | OP6],
    [OUT, OP1 | OP2, OUT,             OP3,       OP3,             OP3],
    [OUT, OP1,       OUT,             OP3,       OP3,             OP3 | OP6],
    [OUT, OP1,       OUT,             OP3,       OP4,             OP4 | OP6],
    [OUT, OP1 | OP2, OUT,             OP3,       OP4,             OP4],
    [OUT, OP1,       OP1,             OP3,       OP1,             OP5 | OP6],
    [OUT, OP1 | OP2, OP1,             OP3,       OP1,             OP5],
    [OUT, OP1,       OP1 | OP3,       OP1,       OP4,             OP5],
    [OUT, OP1,       OP2,             OUT,       OUT,             OP4 | OP5 | OP6],
    [OUT, OUT,       OP1 | OP2 | OP3, OUT,       OP4,             OP4],
    [OUT, OUT,       OP1 | OP2 | OP3, OUT,       OUT,             OP4 | OP5],
    [OUT, OP1,       OUT,             OUT,       OUT,             OP3 | OP4 | OP5 | OP6],
    [OUT, OUT,       OP2,             OUT,       OUT,             OP4 | OP5 | OP6],
    [OUT, OUT,       OUT,             OUT,       OUT,             OP3 | OP4 | OP5 | OP6],
    [OUT, OUT,       OUT,             OUT,       OUT,             OP4 | OP5 | OP6],
    [OUT, OUT,       OP2,             OUT,       OP4,             OP4 | OP6],
    [OUT, OUT,       OP2 | OP3,       OUT,       OP4,             OP4],
    [OUT, OP1,       OUT,             OP3,       OP4 | OP5,       OUT],
    [OUT, OUT,       OUT,             OP3,       OUT,             OP5 | OP6],
    [OUT, OUT,       OUT,             OP3,       OP4 | OP5,       OUT],
    [OUT, OUT,       OUT,             OUT,       OUT,             OP5 | OP6],
    [OUT, OUT,       OUT,             OUT,       OUT,             OUT | OP6],
];

/// Where one operator's output goes within the current frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// The output is summed to the master bus.
    pub to_master: bool,
    /// Bit k set: the output is added to the modulation input of operator k.
    /// Only bits below the operator's own index are ever set.
    pub modulates: u8,
}

/// The single lagged edge of an algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackPath {
    /// Operator whose output is stored into the feedback register.
    pub source: usize,
    /// Operator whose modulation input is preloaded from the register.
    pub destination: usize,
}

impl FeedbackPath {
    /// True for plain self-feedback.
    #[inline]
    pub fn is_self(&self) -> bool {
        self.source == self.destination
    }
}

/// Compiled routing graph of one algorithm.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Algorithm {
    routes: [Route; NUM_OPERATORS],
    feedback: Option<FeedbackPath>,
}

impl Algorithm {
    /// Builds the graph for one row of the routing matrix.
    pub fn compile(index: usize, row: &[u8; NUM_OPERATORS]) -> Result<Self, ConfigError> {
        let malformed = |reason| ConfigError::MalformedRouting {
            algorithm: index,
            reason,
        };

        let mut algorithm = Self::default();

        for (op, &destinations) in row.iter().enumerate() {
            if destinations & RESERVED_MASK != 0 {
                return Err(malformed("reserved destination bit is set"));
            }

            let operators = destinations & OPERATOR_MASK;
            let forward = operators & ((1 << op) - 1);
            let lagged = operators & !forward;

            if lagged != 0 {
                if lagged.count_ones() > 1 || algorithm.feedback.is_some() {
                    return Err(malformed("more than one feedback edge"));
                }
                algorithm.feedback = Some(FeedbackPath {
                    source: op,
                    destination: lagged.trailing_zeros() as usize,
                });
            }

            algorithm.routes[op] = Route {
                to_master: destinations & MASTER_OUTPUT != 0,
                modulates: forward,
            };
        }

        if !algorithm.routes.iter().any(|route| route.to_master) {
            return Err(malformed("no operator reaches the master output"));
        }

        Ok(algorithm)
    }

    #[inline]
    pub fn route(&self, op: usize) -> &Route {
        &self.routes[op]
    }

    #[inline]
    pub fn feedback(&self) -> Option<FeedbackPath> {
        self.feedback
    }

    /// True if the operator feeds the master bus.
    #[inline]
    pub fn is_carrier(&self, op: usize) -> bool {
        self.routes[op].to_master
    }

    /// True if the operator modulates any operator, itself included.
    #[inline]
    pub fn is_modulator(&self, op: usize) -> bool {
        self.routes[op].modulates != 0 || self.feedback.is_some_and(|fb| fb.source == op)
    }

    /// Indices of the operators feeding the master bus.
    pub fn carriers(&self) -> impl Iterator<Item = usize> + '_ {
        (0..NUM_OPERATORS).filter(|&op| self.is_carrier(op))
    }
}

