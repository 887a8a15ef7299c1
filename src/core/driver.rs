//! Build mode for production and hot-reload builds.

/// Build mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildMode {
    /// Whether rendered pages include the live-reload header fragment.
    pub hot_reload: bool,
}

impl BuildMode {
    /// Production mode: pages are self-contained.
    pub const PRODUCTION: Self = Self { hot_reload: false };

    /// Serve mode: pages connect back to the dev server and reload on update.
    pub const HOT_RELOAD: Self = Self { hot_reload: true };

    /// Check if this is hot-reload mode.
    #[inline]
    pub const fn is_hot_reload(&self) -> bool {
        self.hot_reload
    }
}
