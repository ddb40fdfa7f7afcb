//! Logging hooks that compile away without the `tracing` feature.
//!
//! Call sites use `trace_span!` for per-call spans and `trace_event!` (info),
//! `trace_debug!`, `trace_warn!` for `key = value` events. Field values are
//! numbers, booleans or `&str` so both configurations accept the same
//! expressions.

#[cfg(feature = "tracing")]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        tracing::info_span!($name $(, $($field)*)?)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        $crate::trace::NoopSpan
    };
}

#[cfg(feature = "tracing")]
macro_rules! trace_at {
    ($level:ident, $name:expr $(, $key:ident = $value:expr)+ $(,)?) => {
        tracing::event!(name: $name, tracing::Level::$level, $($key = $value),+)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_at {
    ($level:ident, $name:expr $(, $key:ident = $value:expr)+ $(,)?) => {
        let _ = ($($value,)+);
    };
}

macro_rules! trace_event {
    ($($args:tt)+) => {
        $crate::trace::trace_at!(INFO, $($args)+)
    };
}

macro_rules! trace_debug {
    ($($args:tt)+) => {
        $crate::trace::trace_at!(DEBUG, $($args)+)
    };
}

macro_rules! trace_warn {
    ($($args:tt)+) => {
        $crate::trace::trace_at!(WARN, $($args)+)
    };
}

pub(crate) use trace_at;
pub(crate) use trace_debug;
pub(crate) use trace_event;
pub(crate) use trace_span;
pub(crate) use trace_warn;

/// Stand-in for `tracing::Span` so `trace_span!(..).entered()` works in both
/// configurations.
#[cfg(not(feature = "tracing"))]
pub struct NoopSpan;

#[cfg(not(feature = "tracing"))]
impl NoopSpan {
    #[inline]
    pub fn entered(self) -> Self {
        self
    }
}
