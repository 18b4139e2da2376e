//! Internal utilities.

/// Declares a set of items that only exist when a feature flag is enabled.
macro_rules! feature {
    (
        #![$meta:meta]
        $($item:item)*
    ) => {
        $(
            #[cfg($meta)]
            #[cfg_attr(docsrs, doc(cfg($meta)))]
            $item
        )*
    };
}

/// Emits a `tracing` trace event in test builds, and nothing otherwise, so
/// that `tracing` can stay a dev-dependency.
macro_rules! test_trace {
    ($($tt:tt)*) => {
        #[cfg(test)]
        tracing::trace!($($tt)*)
    };
}

pub(crate) mod fmt {
    #![allow(unused_imports)]
    pub(crate) use core::fmt::*;

    /// Formats an `Option` as its contents, or as a fallback string when it
    /// is `None`.
    pub(crate) struct FmtOption<'a, T> {
        opt: Option<&'a T>,
        or_else: &'a str,
    }

    #[must_use]
    #[inline]
    pub(crate) const fn opt<T>(value: &Option<T>) -> FmtOption<'_, T> {
        FmtOption {
            opt: value.as_ref(),
            or_else: "",
        }
    }

    // === impl FmtOption ===

    impl<'a, T> FmtOption<'a, T> {
        #[must_use]
        #[inline]
        pub(crate) fn or_else(self, or_else: &'a str) -> Self {
            Self { or_else, ..self }
        }
    }

    impl<T: Debug> Debug for FmtOption<'_, T> {
        #[inline]
        fn fmt(&self, f: &mut Formatter<'_>) -> Result {
            match self.opt {
                Some(val) => val.fmt(f),
                None => f.write_str(self.or_else),
            }
        }
    }

    impl<T: Display> Display for FmtOption<'_, T> {
        #[inline]
        fn fmt(&self, f: &mut Formatter<'_>) -> Result {
            match self.opt {
                Some(val) => val.fmt(f),
                None => f.write_str(self.or_else),
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn trace_init() -> tracing::dispatcher::DefaultGuard {
    use tracing_subscriber::prelude::*;
    tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .with_target(false)
        .without_time()
        .finish()
        .set_default()
}
