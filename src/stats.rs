//! Hierarchical time and memory statistics.
//!
//! A thread-local stack of phases attributes wall time and allocation deltas
//! to nested measurement scopes.  Memory numbers come from a process-wide
//! counting allocator ([`StatAllocator`]); the driver installs it as the
//! global allocator, so library-only users simply read zeros.
//!
//! Tracking is suppressed (refcounted) around the phase machinery's own
//! allocations, including the value storage of [`StatPhase::log`].

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::RefCell;
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::time::Instant;

use serde_json::{json, Value};

// ─────────────────────────────────────────────────────────────────────────────
// Allocation tracking
// ─────────────────────────────────────────────────────────────────────────────

/// Live heap bytes, updated by the installed allocator.
static LIVE_BYTES: AtomicIsize = AtomicIsize::new(0);
/// High-water mark register; phases save/restore it around their window.
static PEAK_BYTES: AtomicIsize = AtomicIsize::new(0);
/// Suppression refcount; non-zero pauses tracking entirely.
static SUPPRESS: AtomicUsize = AtomicUsize::new(0);

/// Counting allocator; install with `#[global_allocator]` in the binary.
pub struct StatAllocator;

// SAFETY: delegates directly to the system allocator; the counters carry no
// allocation-relevant state.
unsafe impl GlobalAlloc for StatAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let p = System.alloc(layout);
        if !p.is_null() && SUPPRESS.load(Ordering::Relaxed) == 0 {
            let live = LIVE_BYTES.fetch_add(layout.size() as isize, Ordering::Relaxed)
                + layout.size() as isize;
            PEAK_BYTES.fetch_max(live, Ordering::Relaxed);
        }
        p
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
        if SUPPRESS.load(Ordering::Relaxed) == 0 {
            LIVE_BYTES.fetch_sub(layout.size() as isize, Ordering::Relaxed);
        }
    }
}

/// RAII suppression guard.
struct SuppressTracking;

impl SuppressTracking {
    fn new() -> Self {
        SUPPRESS.fetch_add(1, Ordering::Relaxed);
        SuppressTracking
    }
}

impl Drop for SuppressTracking {
    fn drop(&mut self) {
        SUPPRESS.fetch_sub(1, Ordering::Relaxed);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Phase stack
// ─────────────────────────────────────────────────────────────────────────────

struct PhaseFrame {
    title: String,
    start: Instant,
    /// Wall-clock offset of `start` relative to the epoch of the root frame.
    start_offset_ms: f64,
    paused_ms: f64,
    mem_off: isize,
    saved_peak: isize,
    stats: Vec<(String, Value)>,
    subs: Vec<Value>,
}

thread_local! {
    static STACK: RefCell<Vec<PhaseFrame>> = const { RefCell::new(Vec::new()) };
    static EPOCH: RefCell<Option<Instant>> = const { RefCell::new(None) };
}

/// An open measurement phase.  Closing (drop) folds the phase's JSON into its
/// parent; the outermost phase's JSON is retrieved through
/// [`StatPhase::finish`] or [`StatPhase::wrap_root`].
pub struct StatPhase {
    /// Depth of this phase's frame; used to catch unbalanced drops.
    depth: usize,
    enabled: bool,
}

impl StatPhase {
    pub fn new(title: &str) -> Self {
        let _guard = SuppressTracking::new();
        let now = Instant::now();
        let epoch = EPOCH.with(|e| *e.borrow_mut().get_or_insert(now));
        let live = LIVE_BYTES.load(Ordering::Relaxed);
        let saved_peak = PEAK_BYTES.swap(live, Ordering::Relaxed);
        let depth = STACK.with(|s| {
            let mut s = s.borrow_mut();
            s.push(PhaseFrame {
                title: title.to_owned(),
                start: now,
                start_offset_ms: now.duration_since(epoch).as_secs_f64() * 1000.0,
                paused_ms: 0.0,
                mem_off: live,
                saved_peak,
                stats: Vec::new(),
                subs: Vec::new(),
            });
            s.len()
        });
        StatPhase { depth, enabled: true }
    }

    /// A no-op phase for callers that do not measure.
    pub fn disabled() -> Self {
        StatPhase { depth: 0, enabled: false }
    }

    /// Logs a key/value pair onto this phase.  The value's own allocations
    /// are excluded from memory tracking.
    pub fn log(&self, key: &str, value: impl Into<Value>) {
        if !self.enabled {
            return;
        }
        let _guard = SuppressTracking::new();
        let pause_start = Instant::now();
        let value = value.into();
        STACK.with(|s| {
            let mut s = s.borrow_mut();
            debug_assert!(s.len() >= self.depth, "log on a closed phase");
            if let Some(frame) = s.get_mut(self.depth.wrapping_sub(1)) {
                frame.stats.push((key.to_owned(), value));
                frame.paused_ms += pause_start.elapsed().as_secs_f64() * 1000.0;
            }
        });
    }

    /// Runs `f` inside a fresh sub-phase.
    pub fn wrap<T>(title: &str, f: impl FnOnce() -> T) -> T {
        let _phase = StatPhase::new(title);
        f()
    }

    /// Runs `f` inside a root phase and returns its result together with the
    /// phase tree as JSON.
    pub fn wrap_root<T>(title: &str, f: impl FnOnce() -> T) -> (T, Value) {
        let phase = StatPhase::new(title);
        let result = f();
        let json = phase.finish();
        (result, json)
    }

    fn close(depth: usize) -> Option<Value> {
        let _guard = SuppressTracking::new();
        STACK.with(|s| {
            let mut s = s.borrow_mut();
            if s.len() != depth {
                // unbalanced drop ordering; drop the evidence rather than panic
                return None;
            }
            let frame = s.pop()?;
            let end = Instant::now();
            let delta_ms = end.duration_since(frame.start).as_secs_f64() * 1000.0;
            let live = LIVE_BYTES.load(Ordering::Relaxed);
            let peak = PEAK_BYTES.load(Ordering::Relaxed);

            // parent peak covers this window too
            PEAK_BYTES.store(frame.saved_peak.max(peak), Ordering::Relaxed);

            let node = json!({
                "title": frame.title,
                "timeStart": frame.start_offset_ms,
                "timeEnd": frame.start_offset_ms + delta_ms,
                "timeDelta": delta_ms,
                "timePaused": frame.paused_ms,
                "timeRun": delta_ms - frame.paused_ms,
                "memOff": frame.mem_off,
                "memPeak": peak - frame.mem_off,
                "memFinal": live - frame.mem_off,
                "sub": frame.subs,
                "stats": frame
                    .stats
                    .iter()
                    .map(|(k, v)| json!({ "key": k, "value": v }))
                    .collect::<Vec<_>>(),
            });

            if let Some(parent) = s.last_mut() {
                parent.subs.push(node);
                None
            } else {
                EPOCH.with(|e| *e.borrow_mut() = None);
                Some(node)
            }
        })
    }

    /// Closes the phase explicitly, returning its JSON when it was the
    /// outermost phase.
    pub fn finish(mut self) -> Value {
        if !self.enabled {
            return Value::Null;
        }
        self.enabled = false;
        Self::close(self.depth).unwrap_or(Value::Null)
    }
}

impl Drop for StatPhase {
    fn drop(&mut self) {
        if self.enabled {
            let _ = Self::close(self.depth);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_has_the_contract_keys() {
        let ((), json) = StatPhase::wrap_root("root", || {
            let inner = StatPhase::new("child");
            inner.log("answer", 42u64);
        });
        for key in [
            "title", "timeStart", "timeEnd", "timeDelta", "timePaused", "timeRun", "memOff",
            "memPeak", "memFinal", "sub", "stats",
        ] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(json["title"], "root");
        let subs = json["sub"].as_array().unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0]["title"], "child");
        assert_eq!(subs[0]["stats"][0]["key"], "answer");
        assert_eq!(subs[0]["stats"][0]["value"], 42);
    }

    #[test]
    fn nesting_follows_scope() {
        let ((), json) = StatPhase::wrap_root("outer", || {
            StatPhase::wrap("a", || {
                StatPhase::wrap("a1", || {});
            });
            StatPhase::wrap("b", || {});
        });
        let subs = json["sub"].as_array().unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0]["title"], "a");
        assert_eq!(subs[0]["sub"][0]["title"], "a1");
        assert_eq!(subs[1]["title"], "b");
    }

    #[test]
    fn disabled_phase_is_inert() {
        let p = StatPhase::disabled();
        p.log("ignored", 1u64);
        assert_eq!(p.finish(), Value::Null);
    }

    #[test]
    fn times_are_monotonic() {
        let ((), json) = StatPhase::wrap_root("t", || {
            std::thread::sleep(std::time::Duration::from_millis(5));
        });
        assert!(json["timeDelta"].as_f64().unwrap() >= 4.0);
        assert!(json["timeEnd"].as_f64().unwrap() >= json["timeStart"].as_f64().unwrap());
    }
}
