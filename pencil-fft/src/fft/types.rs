//! Executor-level types.

use crate::traits::FftError;

/// Direction of a complex-to-complex transform.
///
/// The values match the usual FFT library convention: the forward
/// transform uses the negative-exponent kernel.
#[repr(i32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Sign {
    /// Forward transform
    Forward = -1,

    /// Backward transform
    Backward = 1,
}

/// Closed set of 1D engines a plan can be built over.
///
/// Selection is by tag, not by trait object: the driver dispatches over
/// this enum, and adding an engine means adding a variant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Backend {
    /// The built-in pure-Rust engine.
    #[default]
    Stock,
}

impl Backend {
    /// Resolve a backend from its configuration name.
    ///
    /// Rejects engines not compiled into this build.
    pub fn from_name(name: &str) -> Result<Backend, FftError> {
        match name {
            "stock" => Ok(Backend::Stock),
            other => Err(FftError::UnsupportedBackend(other.to_string())),
        }
    }
}

/// Lane count above which contiguous batched transforms run in parallel.
pub(crate) const MIN_PAR_BATCH: usize = 64;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_backend_names() {
        assert_eq!(Backend::from_name("stock").unwrap(), Backend::Stock);
        assert!(matches!(
            Backend::from_name("cufft"),
            Err(FftError::UnsupportedBackend(_))
        ));
    }
}
