//! Runtime toggles
//!
//! One switch: whether the compiler front-loads ancestor-bloom probes.
//! Reads `FASTSELECT_BLOOM` once from the environment; `FASTSELECT_BLOOM=0`
//! disables the hoist. Insertion into the per-node ancestor filters is not
//! configurable, only whether compiled programs probe them early.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::OnceLock;

static BLOOM_HOIST_ENV_INITIALIZED: OnceLock<()> = OnceLock::new();
static BLOOM_HOIST_ENABLED: AtomicBool = AtomicBool::new(true);

pub fn bloom_hoist_enabled() -> bool {
  BLOOM_HOIST_ENV_INITIALIZED.get_or_init(|| {
    if let Ok(value) = std::env::var("FASTSELECT_BLOOM") {
      if value.trim() == "0" {
        BLOOM_HOIST_ENABLED.store(false, Ordering::Relaxed);
      }
    }
  });
  BLOOM_HOIST_ENABLED.load(Ordering::Relaxed)
}

/// Toggle the compiler's bloom-probe hoist for benchmarking/testing.
pub fn set_bloom_hoist_enabled(enabled: bool) {
  BLOOM_HOIST_ENV_INITIALIZED.get_or_init(|| ());
  BLOOM_HOIST_ENABLED.store(enabled, Ordering::Relaxed);
}
