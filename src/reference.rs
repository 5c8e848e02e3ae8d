//! CPU rendition of the built-in kernel's sampling rule.
//!
//! Every pixel takes the colour of the top-left pixel of its block. The GPU
//! kernel and this function agree exactly for 8-bit images, which is what the
//! headless tests and `pixelate image --reference` rely on.

use image::RgbaImage;

use crate::config::BlockSize;

/// Top-left corner of the block containing `(x, y)`.
pub fn block_origin(x: u32, y: u32, block: BlockSize) -> (u32, u32) {
    let b = block.get();
    ((x / b) * b, (y / b) * b)
}

/// Pixelate `source` into a new image of the same size.
pub fn pixelate(source: &RgbaImage, block: BlockSize) -> RgbaImage {
    RgbaImage::from_fn(source.width(), source.height(), |x, y| {
        let (ox, oy) = block_origin(x, y, block);
        *source.get_pixel(ox, oy)
    })
}

/// Pixelate `image` in place.
pub fn pixelate_in_place(image: &mut RgbaImage, block: BlockSize) {
    let (width, height) = image.dimensions();
    let b = block.get();

    for oy in (0..height).step_by(b as usize) {
        for ox in (0..width).step_by(b as usize) {
            let color = *image.get_pixel(ox, oy);
            for y in oy..(oy + b).min(height) {
                for x in ox..(ox + b).min(width) {
                    image.put_pixel(x, y, color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use proptest::prelude::*;

    /// Every pixel distinct, so a wrong sample is always visible.
    fn numbered(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x / 256) + (y / 256) * 16) as u8, 255])
        })
    }

    #[test]
    fn blocks_take_top_left_color() {
        let src = numbered(8, 8);
        let out = pixelate(&src, BlockSize::new(4));
        assert_eq!(out.get_pixel(3, 3), src.get_pixel(0, 0));
        assert_eq!(out.get_pixel(5, 2), src.get_pixel(4, 0));
        assert_eq!(out.get_pixel(7, 7), src.get_pixel(4, 4));
    }

    #[test]
    fn partial_right_edge_blocks_are_defined() {
        let src = numbered(801, 600);
        let out = pixelate(&src, BlockSize::new(40));
        // Column 800 is a one-pixel-wide block starting at x = 800.
        for y in [0, 39, 40, 599] {
            let (_, oy) = block_origin(800, y, BlockSize::new(40));
            assert_eq!(out.get_pixel(800, y), src.get_pixel(800, oy));
        }
    }

    #[test]
    fn in_place_matches_copying_version() {
        let src = numbered(37, 23);
        let block = BlockSize::new(5);
        let mut in_place = src.clone();
        pixelate_in_place(&mut in_place, block);
        assert_eq!(in_place, pixelate(&src, block));
    }

    #[test]
    fn block_larger_than_image_collapses_to_one_color() {
        let src = numbered(12, 9);
        let out = pixelate(&src, BlockSize::new(40));
        assert!(out.pixels().all(|p| p == src.get_pixel(0, 0)));
    }

    #[test]
    fn second_pass_is_a_no_op_when_block_divides_frame() {
        let block = BlockSize::new(8);
        let once = pixelate(&numbered(64, 48), block);
        let twice = pixelate(&once, block);
        assert_eq!(once, twice);
    }

    proptest! {
        #[test]
        fn output_is_constant_per_block_and_sampled_inside_it(
            width in 1u32..96,
            height in 1u32..96,
            block in BlockSize::MIN..=BlockSize::MAX,
        ) {
            let block = BlockSize::new(block);
            let src = numbered(width, height);
            let out = pixelate(&src, block);
            let b = block.get();

            for (x, y, pixel) in out.enumerate_pixels() {
                let (ox, oy) = block_origin(x, y, block);
                prop_assert_eq!(pixel, out.get_pixel(ox, oy));
                prop_assert!(ox <= x && x < ox + b && oy <= y && y < oy + b);
                prop_assert_eq!(pixel, src.get_pixel(ox, oy));
            }
        }
    }
}
