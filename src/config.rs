//! Tunable parameters for the pixelation effect and the viewer.

use crate::kernel::DEFAULT_KERNEL_NAME;

/// Side length, in pixels, of each square cell collapsed to one colour.
///
/// Always within [`BlockSize::MIN`]..=[`BlockSize::MAX`]. Out-of-range values are
/// clamped by [`BlockSize::new`]; use [`BlockSize::try_new`] to reject them instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockSize(u32);

impl BlockSize {
    pub const MIN: u32 = 2;
    pub const MAX: u32 = 40;
    pub const DEFAULT: BlockSize = BlockSize(3);

    /// Create a block size, clamping into the valid range.
    pub fn new(value: u32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    /// Create a block size, returning `None` when `value` is out of range.
    pub fn try_new(value: u32) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// One pixel coarser, saturating at [`BlockSize::MAX`].
    pub fn step_up(self) -> Self {
        Self::new(self.0 + 1)
    }

    /// One pixel finer, saturating at [`BlockSize::MIN`].
    pub fn step_down(self) -> Self {
        Self::new(self.0.saturating_sub(1))
    }
}

impl Default for BlockSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u32> for BlockSize {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Display for BlockSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}px", self.0)
    }
}

/// Configuration for a [`PixelateEffect`](crate::PixelateEffect).
///
/// # Example
///
/// ```
/// use pixelate::PixelateConfig;
///
/// let config = PixelateConfig::default()
///     .with_block_size(8)
///     .with_kernel_name("Pixelate");
/// assert_eq!(config.block_size.get(), 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelateConfig {
    /// Cell size in pixels.
    pub block_size: BlockSize,
    /// Name of the compute entry point to invoke.
    pub kernel_name: String,
}

impl Default for PixelateConfig {
    fn default() -> Self {
        Self {
            block_size: BlockSize::DEFAULT,
            kernel_name: DEFAULT_KERNEL_NAME.to_string(),
        }
    }
}

impl PixelateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the block size (clamped to the valid range).
    pub fn with_block_size(mut self, block_size: impl Into<BlockSize>) -> Self {
        self.block_size = block_size.into();
        self
    }

    /// Set the kernel entry point name.
    pub fn with_kernel_name(mut self, name: impl Into<String>) -> Self {
        self.kernel_name = name.into();
        self
    }
}

/// Window and effect settings for the interactive viewer.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Window title.
    pub title: String,
    /// Initial window width in logical pixels.
    pub width: u32,
    /// Initial window height in logical pixels.
    pub height: u32,
    /// Effect settings applied at startup.
    pub effect: PixelateConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "Pixelate".to_string(),
            width: 800,
            height: 600,
            effect: PixelateConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the window title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the initial window size.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the effect configuration.
    pub fn effect(mut self, effect: PixelateConfig) -> Self {
        self.effect = effect;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_size_clamps_into_range() {
        assert_eq!(BlockSize::new(0).get(), 2);
        assert_eq!(BlockSize::new(1).get(), 2);
        assert_eq!(BlockSize::new(17).get(), 17);
        assert_eq!(BlockSize::new(41).get(), 40);
        assert_eq!(BlockSize::new(u32::MAX).get(), 40);
    }

    #[test]
    fn block_size_try_new_rejects_out_of_range() {
        assert!(BlockSize::try_new(1).is_none());
        assert!(BlockSize::try_new(41).is_none());
        assert_eq!(BlockSize::try_new(2), Some(BlockSize::new(2)));
        assert_eq!(BlockSize::try_new(40), Some(BlockSize::new(40)));
    }

    #[test]
    fn block_size_steps_saturate() {
        assert_eq!(BlockSize::new(40).step_up().get(), 40);
        assert_eq!(BlockSize::new(2).step_down().get(), 2);
        assert_eq!(BlockSize::new(5).step_up().get(), 6);
        assert_eq!(BlockSize::new(5).step_down().get(), 4);
    }

    #[test]
    fn default_config_matches_documented_values() {
        let config = PixelateConfig::default();
        assert_eq!(config.block_size.get(), 3);
        assert_eq!(config.kernel_name, "Pixelate");
    }

    #[test]
    fn builder_clamps_block_size() {
        let config = PixelateConfig::new().with_block_size(100);
        assert_eq!(config.block_size, BlockSize::new(40));
    }
}
