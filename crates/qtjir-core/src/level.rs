//! Lowering level: the stratum a node occupies on its way to machine code.

use serde::{Deserialize, Serialize};

/// `High` = semantic, `Mid` = optimized/SSA-like, `Low` = near-machine.
///
/// Newly built nodes default to `High`; passes and the emitter may move
/// nodes to lower strata but the standard transform passes never do so
/// automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    High,
    Mid,
    Low,
}

impl Default for Level {
    fn default() -> Self {
        Level::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_high() {
        assert_eq!(Level::default(), Level::High);
    }
}
