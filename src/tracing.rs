//! Internal tracing shims.
//!
//! When the `tracing` feature is enabled these macros forward directly to
//! [`tracing`].  When disabled they expand to nothing, so call-sites never
//! need `#[cfg]` annotations.

// Only one side of each cfg pair is active at a time.
#![allow(unused_macros)]

// ---- feature = "tracing" ----

#[cfg(feature = "tracing")]
macro_rules! trace {
    ($($tt:tt)*) => { tracing::trace!($($tt)*) }
}

#[cfg(feature = "tracing")]
macro_rules! debug {
    ($($tt:tt)*) => { tracing::debug!($($tt)*) }
}

#[cfg(feature = "tracing")]
macro_rules! warn {
    ($($tt:tt)*) => { tracing::warn!($($tt)*) }
}

// ---- not(feature = "tracing") ----

#[cfg(not(feature = "tracing"))]
macro_rules! trace {
    ($($tt:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug {
    ($($tt:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! warn {
    ($($tt:tt)*) => {};
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

/// Records the level of every event emitted while installed as the
/// thread-default subscriber.
#[cfg(all(test, feature = "tracing"))]
#[derive(Clone, Default)]
pub(crate) struct LevelRecorder {
    levels: std::sync::Arc<std::sync::Mutex<Vec<::tracing::Level>>>,
}

#[cfg(all(test, feature = "tracing"))]
impl LevelRecorder {
    /// Install a recorder for the current thread until the guard drops.
    pub(crate) fn install() -> (Self, ::tracing::subscriber::DefaultGuard) {
        let recorder = Self::default();
        let guard = ::tracing::subscriber::set_default(recorder.clone());
        (recorder, guard)
    }

    /// Number of recorded events at `level`.
    pub(crate) fn count(&self, level: ::tracing::Level) -> usize {
        self.levels.lock().unwrap().iter().filter(|l| **l == level).count()
    }
}

#[cfg(all(test, feature = "tracing"))]
impl ::tracing::Subscriber for LevelRecorder {
    fn enabled(&self, _: &::tracing::Metadata<'_>) -> bool {
        true
    }
    fn new_span(&self, _: &::tracing::span::Attributes<'_>) -> ::tracing::span::Id {
        ::tracing::span::Id::from_u64(1)
    }
    fn record(&self, _: &::tracing::span::Id, _: &::tracing::span::Record<'_>) {}
    fn record_follows_from(&self, _: &::tracing::span::Id, _: &::tracing::span::Id) {}
    fn event(&self, event: &::tracing::Event<'_>) {
        self.levels.lock().unwrap().push(*event.metadata().level());
    }
    fn enter(&self, _: &::tracing::span::Id) {}
    fn exit(&self, _: &::tracing::span::Id) {}
}

#[cfg(all(test, feature = "tracing"))]
#[test]
fn shims_reach_installed_subscriber() {
    use ::tracing::Level;

    let (recorder, _guard) = LevelRecorder::install();
    trace!(stage = 1, "trace shim");
    debug!(url = "http://localhost/", "debug shim");
    warn!("warn shim");
    for (level, label) in [(Level::TRACE, "trace"), (Level::DEBUG, "debug"), (Level::WARN, "warn")] {
        assert_eq!(recorder.count(level), 1, "{label}");
    }
}
