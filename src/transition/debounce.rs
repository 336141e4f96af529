/// A one-shot token guarding shader swaps.
///
/// The token is taken by the first swap of a frame and released at the start of
/// the next one, so at most one swap happens per frame.
#[derive(Clone, Debug, Default)]
pub struct SwapDebounce {
    held: bool,
    swaps_this_frame: u32,
}

impl SwapDebounce {
    pub fn new() -> Self {
        SwapDebounce::default()
    }

    /// Takes the token.
    ///
    /// # Returns
    /// `false` if it was already taken during this frame.
    pub fn try_acquire(&mut self) -> bool {
        if self.held {
            return false;
        }
        self.held = true;
        self.swaps_this_frame += 1;
        true
    }

    /// Gives the token back. Called once per frame.
    pub fn release(&mut self) {
        self.held = false;
        self.swaps_this_frame = 0;
    }

    #[inline]
    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Number of swaps granted since the last release.
    #[inline]
    pub fn swaps_this_frame(&self) -> u32 {
        self.swaps_this_frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_swap_per_frame() {
        let mut debounce = SwapDebounce::new();
        assert!(debounce.try_acquire());
        assert!(!debounce.try_acquire());
        assert_eq!(debounce.swaps_this_frame(), 1);

        debounce.release();
        assert!(!debounce.is_held());
        assert!(debounce.try_acquire());
    }
}
