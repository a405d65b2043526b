//! Mock dialect probe for testing
//!
//! Returns scripted verdicts without touching a database. Useful for:
//! - Unit testing comparator fallbacks
//! - Simulating slow or failing probes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use schemadelta_catalog::{MockProbe, DialectProbe, TypeFamily};
//!
//! let probe = MockProbe::new()
//!     .with_verdict("clob", TypeFamily::CharacterLargeObject)
//!     .with_latency(100); // 100ms delay
//! ```

use crate::probe::{DialectProbe, ProbeError, ProbeRequest, TypeFamily};
use crate::type_family::normalize_type;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Mock probe with per-type verdicts
///
/// Clones share the call counter, so a test can hand a clone to the
/// comparator and inspect the original afterwards.
#[derive(Debug, Clone)]
pub struct MockProbe {
    /// Verdicts keyed by normalized type name
    verdicts: HashMap<String, TypeFamily>,

    /// Fail every call
    fail: bool,

    /// Simulated latency (milliseconds)
    latency_ms: u64,

    calls: Arc<AtomicUsize>,
}

impl MockProbe {
    /// Create a mock probe that knows no types
    pub fn new() -> Self {
        Self {
            verdicts: HashMap::new(),
            fail: false,
            latency_ms: 0,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Answer `type_family` for a type name
    pub fn with_verdict(mut self, data_type: &str, family: TypeFamily) -> Self {
        self.verdicts.insert(normalize_type(data_type), family);
        self
    }

    /// Fail every call with a query error
    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Delay every call
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Number of calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl DialectProbe for MockProbe {
    fn name(&self) -> &'static str {
        "Mock"
    }

    fn type_family(&self, request: &ProbeRequest) -> Result<TypeFamily, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.latency_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.latency_ms));
        }

        if self.fail {
            return Err(ProbeError::QueryError("Simulated probe failure".to_string()));
        }

        self.verdicts
            .get(&normalize_type(&request.data_type))
            .copied()
            .ok_or_else(|| ProbeError::Unavailable(format!("no verdict for {}", request)))
    }
}
