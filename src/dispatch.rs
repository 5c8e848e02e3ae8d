//! Workgroup counts for the pixelation kernel.
//!
//! The kernel runs one invocation per block, so a `W x H` frame at block size
//! `B` needs `ceil(W / B)` by `ceil(H / B)` invocations, grouped by the kernel's
//! declared workgroup size.

use crate::config::BlockSize;

/// Number of workgroups to dispatch along each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl DispatchSize {
    /// Workgroups needed to cover a `width x height` frame.
    ///
    /// Equivalent to `ceil(width / block / group_x)` in real arithmetic, computed
    /// in integers. A zero-sized frame yields zero groups.
    pub fn for_frame(width: u32, height: u32, block: BlockSize, workgroup_size: [u32; 3]) -> Self {
        let block = block.get();
        Self {
            x: groups_for(width, block, workgroup_size[0]),
            y: groups_for(height, block, workgroup_size[1]),
            z: 1,
        }
    }

    /// `true` if nothing would run.
    pub fn is_empty(&self) -> bool {
        self.x == 0 || self.y == 0 || self.z == 0
    }

    /// Total workgroups across all axes.
    pub fn total(&self) -> u64 {
        self.x as u64 * self.y as u64 * self.z as u64
    }

    /// `true` if every pixel of a `width x height` frame falls inside some block
    /// handled by this dispatch.
    pub fn covers(&self, width: u32, height: u32, block: BlockSize, workgroup_size: [u32; 3]) -> bool {
        let reach = |groups: u32, group: u32| groups as u64 * group.max(1) as u64 * block.get() as u64;
        reach(self.x, workgroup_size[0]) >= width as u64
            && reach(self.y, workgroup_size[1]) >= height as u64
    }
}

fn groups_for(extent: u32, block: u32, group: u32) -> u32 {
    let span = block as u64 * group.max(1) as u64;
    (extent as u64).div_ceil(span) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const GROUP: [u32; 3] = [8, 8, 1];

    #[test]
    fn exact_multiple_needs_no_extra_group() {
        let groups = DispatchSize::for_frame(640, 320, BlockSize::new(10), GROUP);
        assert_eq!(groups, DispatchSize { x: 8, y: 4, z: 1 });
    }

    #[test]
    fn partial_edge_block_gets_its_own_coverage() {
        // 801 / 40 = 20.025 blocks -> 21 blocks -> 3 groups of 8
        let groups = DispatchSize::for_frame(801, 600, BlockSize::new(40), GROUP);
        assert_eq!(groups, DispatchSize { x: 3, y: 2, z: 1 });
        assert!(groups.covers(801, 600, BlockSize::new(40), GROUP));
    }

    #[test]
    fn matches_float_formula_for_default_block() {
        let block = BlockSize::DEFAULT;
        let (w, h) = (1920u32, 1080u32);
        let groups = DispatchSize::for_frame(w, h, block, GROUP);
        let expect_x = (w as f32 / block.get() as f32 / 8.0).ceil() as u32;
        let expect_y = (h as f32 / block.get() as f32 / 8.0).ceil() as u32;
        assert_eq!((groups.x, groups.y), (expect_x, expect_y));
    }

    #[test]
    fn block_larger_than_frame_collapses_to_one_group() {
        let groups = DispatchSize::for_frame(30, 20, BlockSize::new(40), GROUP);
        assert_eq!(groups, DispatchSize { x: 1, y: 1, z: 1 });
    }

    #[test]
    fn empty_frame_dispatches_nothing() {
        let groups = DispatchSize::for_frame(0, 600, BlockSize::DEFAULT, GROUP);
        assert!(groups.is_empty());
        assert_eq!(groups.total(), 0);
    }

    proptest! {
        #[test]
        fn dispatch_always_covers_frame(
            width in 1u32..8192,
            height in 1u32..8192,
            block in BlockSize::MIN..=BlockSize::MAX,
            gx in 1u32..=32,
            gy in 1u32..=32,
        ) {
            let block = BlockSize::new(block);
            let group = [gx, gy, 1];
            let groups = DispatchSize::for_frame(width, height, block, group);
            prop_assert!(groups.covers(width, height, block, group));
            // One group fewer on either axis would leave pixels uncovered.
            let fewer_x = DispatchSize { x: groups.x - 1, ..groups };
            let fewer_y = DispatchSize { y: groups.y - 1, ..groups };
            prop_assert!(!fewer_x.covers(width, height, block, group));
            prop_assert!(!fewer_y.covers(width, height, block, group));
        }
    }
}
