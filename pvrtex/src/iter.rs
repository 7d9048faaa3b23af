/// A pixel inside a [`SquareBlockIterator`] pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPixel {
    /// Amount of blocks that have been fully processed before this pixel.
    pub block: u32,
    /// Column inside the block.
    pub local_x: u32,
    /// Row inside the block.
    pub local_y: u32,
    /// Column inside the image.
    pub x: u32,
    /// Row inside the image.
    pub y: u32,
}

/// Iterates through an image of the given width and height in square blocks with an edge of
/// `min(width, height)`, which is how twiddled rectangles and indexed textures are split up.
///
/// It works by iterating through a block row by row, before moving on to the next block to the
/// right, and to the next row of blocks once the right edge of the image is reached.
pub struct SquareBlockIterator {
    width: u32,
    height: u32,
    block_size: u32,

    blocks: u32,
    x_block: u32,
    y_block: u32,
    x: u32,
    y: u32,
}

impl SquareBlockIterator {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            block_size: width.min(height),

            blocks: 0,
            x_block: 0,
            y_block: 0,
            x: 0,
            y: 0,
        }
    }

    /// Edge length of each block.
    pub fn block_size(&self) -> u32 {
        self.block_size
    }
}

impl Iterator for SquareBlockIterator {
    type Item = BlockPixel;

    fn next(&mut self) -> Option<Self::Item> {
        if self.block_size == 0 || self.y_block >= self.height {
            return None;
        }

        let next_point = BlockPixel {
            block: self.blocks,
            local_x: self.x,
            local_y: self.y,
            x: self.x_block + self.x,
            y: self.y_block + self.y,
        };

        self.x += 1;
        if self.x == self.block_size {
            self.x = 0;
            self.y += 1;
        } else {
            return Some(next_point);
        }

        if self.y == self.block_size {
            self.y = 0;
            self.blocks += 1;
            self.x_block += self.block_size;
        } else {
            return Some(next_point);
        }

        if self.x_block >= self.width {
            self.x_block = 0;
            self.y_block += self.block_size;
        }

        Some(next_point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_image_is_one_block() {
        let pixels: Vec<_> = SquareBlockIterator::new(4, 4).collect();
        assert_eq!(pixels.len(), 16);
        assert!(pixels.iter().all(|p| p.block == 0));
        assert!(pixels.iter().all(|p| p.x == p.local_x && p.y == p.local_y));
    }

    #[test]
    fn test_wide_image_blocks_left_to_right() {
        let pixels: Vec<_> = SquareBlockIterator::new(8, 2).collect();
        assert_eq!(pixels.len(), 16);
        assert_eq!(
            pixels[4],
            BlockPixel {
                block: 1,
                local_x: 0,
                local_y: 0,
                x: 2,
                y: 0
            }
        );
        assert_eq!(pixels.last().map(|p| (p.block, p.x, p.y)), Some((3, 7, 1)));
    }

    #[test]
    fn test_tall_image_blocks_top_to_bottom() {
        let pixels: Vec<_> = SquareBlockIterator::new(2, 8).collect();
        assert_eq!(pixels.len(), 16);
        assert_eq!(pixels[4].block, 1);
        assert_eq!((pixels[4].x, pixels[4].y), (0, 2));
        assert_eq!(pixels[15].block, 3);
    }

    #[test]
    fn test_every_pixel_once() {
        let mut seen = vec![false; 16 * 4];
        for p in SquareBlockIterator::new(16, 4) {
            let idx = (p.y * 16 + p.x) as usize;
            assert!(!seen[idx]);
            seen[idx] = true;
        }
        assert!(seen.into_iter().all(|s| s));
    }
}
