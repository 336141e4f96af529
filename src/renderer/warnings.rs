use std::fmt;

/// Number of warnings emitted before the limiter goes quiet.
pub const MAX_WARNINGS: u32 = 100;

/// Caps the number of binding warnings logged by one renderer.
///
/// Programs and geometries warn about missing uniforms and attributes on every
/// frame they are drawn. After [`MAX_WARNINGS`] lines the limiter writes a single
/// notice and drops everything else.
#[derive(Clone, Debug, Default)]
pub struct WarningLimiter {
    count: u32,
}

impl WarningLimiter {
    /// A limiter that has not emitted anything yet.
    pub fn new() -> Self {
        WarningLimiter::default()
    }

    /// Logs `message` unless the cap was reached.
    ///
    /// # Returns
    /// `true` if a line (the warning itself or the final notice) was written.
    pub fn warn(&mut self, message: fmt::Arguments<'_>) -> bool {
        if self.count > MAX_WARNINGS {
            return false;
        }
        self.count += 1;

        if self.count > MAX_WARNINGS {
            log::warn!("More than {MAX_WARNINGS} program warnings - stopping logs.");
        } else {
            log::warn!("{message}");
        }
        true
    }

    /// Number of warning requests that produced output.
    pub fn emitted(&self) -> u32 {
        self.count
    }

    /// Whether the limiter stopped logging.
    pub fn is_saturated(&self) -> bool {
        self.count > MAX_WARNINGS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_after_cap() {
        let mut limiter = WarningLimiter::new();
        let written = (0..150)
            .filter(|i| limiter.warn(format_args!("uniform u{i} missing")))
            .count();

        assert_eq!(written, 101);
        assert!(limiter.is_saturated());
        assert!(!limiter.warn(format_args!("one more")));
    }
}
