use crate::mesh_error::MeshDecomposeError;

/// Trait for validating data structure invariants.
pub trait DebugInvariants {
    /// Assert invariants in debug builds or when invariant checking is enabled.
    fn debug_assert_invariants(&self) {
        #[cfg(any(debug_assertions, feature = "strict-invariants"))]
        if let Err(e) = self.validate_invariants() {
            panic!("[invariants] {e}");
        }
    }
    /// Validate invariants and return the first error encountered.
    fn validate_invariants(&self) -> Result<(), MeshDecomposeError>;
}

/// Helper macro to run a fallible check and panic on error when invariant
/// checking is enabled.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "strict-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}
