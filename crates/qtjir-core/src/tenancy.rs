//! Execution tenancy: the physical hardware domain a node is assigned to.

use serde::{Deserialize, Serialize};

/// The physical execution domain a node is assigned to.
///
/// A `GraphBuilder` tracks a `current_tenancy` field (see `builder.rs`); the
/// lowerer flips it around tensor/quantum constructs and restores it
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tenancy {
    CpuSerial,
    CpuParallel,
    NpuTensor,
    QpuQuantum,
}

impl Default for Tenancy {
    fn default() -> Self {
        Tenancy::CpuSerial
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_cpu_serial() {
        assert_eq!(Tenancy::default(), Tenancy::CpuSerial);
    }
}
