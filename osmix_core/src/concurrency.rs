//! Worker count defaults derived from the number of logical CPUs.
//!
//! ```
//! use osmix_core::ConcurrencyLimits;
//!
//! let limits = ConcurrencyLimits::default();
//! assert!(limits.io_bound >= limits.cpu_bound);
//! ```

/// Concurrency limits for different workload types.
#[derive(Debug, Clone, Copy)]
pub struct ConcurrencyLimits {
	/// Threads waiting mostly on reads, 2x CPU count.
	pub io_bound: usize,
	/// Parsing, indexing and tile encoding, 1x CPU count.
	pub cpu_bound: usize,
}

impl ConcurrencyLimits {
	/// Custom limits, each at least one.
	#[must_use]
	pub fn new(io_bound: usize, cpu_bound: usize) -> Self {
		Self {
			io_bound: io_bound.max(1),
			cpu_bound: cpu_bound.max(1),
		}
	}

	#[must_use]
	pub fn cpu_count() -> usize {
		num_cpus::get()
	}
}

impl Default for ConcurrencyLimits {
	fn default() -> Self {
		let cpus = num_cpus::get().max(1);
		Self {
			io_bound: cpus * 2,
			cpu_bound: cpus,
		}
	}
}
