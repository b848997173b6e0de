//! Colormaps
//!
//! A colormap maps pixel values to (red, green, blue) cells. For the
//! TrueColor root visual, pixels are computed from the channel masks and
//! cells are read-only; for writable classes (PseudoColor) clients
//! allocate cells and may store into them.

use std::collections::{BTreeMap, BTreeSet};

use crate::protocol::error::XError;
use crate::protocol::setup::Visual;
use crate::protocol::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColorCell {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
    /// do-red | do-green | do-blue bits, as last stored.
    pub flags: u8,
}

#[derive(Debug, Clone)]
pub struct Colormap {
    pub id: ColormapId,
    pub owner: ClientId,
    pub visual: VisualId,
    pub writable_class: bool,
    pub installed: bool,
    red_mask: u32,
    green_mask: u32,
    blue_mask: u32,
    cells: BTreeMap<u32, ColorCell>,
    writable: BTreeSet<u32>,
    next_cell: u32,
    entries: u32,
}

impl Colormap {
    pub fn new(id: ColormapId, owner: ClientId, visual: &Visual) -> Self {
        Self {
            id,
            owner,
            visual: visual.id,
            writable_class: visual.is_writable(),
            installed: false,
            red_mask: visual.red_mask,
            green_mask: visual.green_mask,
            blue_mask: visual.blue_mask,
            cells: BTreeMap::new(),
            writable: BTreeSet::new(),
            next_cell: 0,
            entries: visual.colormap_entries as u32,
        }
    }

    /// Allocate a read-only cell for the closest supported color.
    /// Returns (pixel, actual red, green, blue).
    pub fn alloc_color(
        &mut self,
        red: u16,
        green: u16,
        blue: u16,
    ) -> Result<(u32, u16, u16, u16), XError> {
        if !self.writable_class {
            // 8 bits per channel behind the visual's masks
            let pixel = (((red >> 8) as u32) << self.red_mask.trailing_zeros())
                | (((green >> 8) as u32) << self.green_mask.trailing_zeros())
                | (((blue >> 8) as u32) << self.blue_mask.trailing_zeros());
            let actual = (
                ((red >> 8) as u16) << 8 | (red >> 8),
                ((green >> 8) as u16) << 8 | (green >> 8),
                ((blue >> 8) as u16) << 8 | (blue >> 8),
            );
            self.cells.insert(
                pixel,
                ColorCell {
                    red: actual.0,
                    green: actual.1,
                    blue: actual.2,
                    flags: 0x07,
                },
            );
            return Ok((pixel, actual.0, actual.1, actual.2));
        }
        let pixel = self.take_free_cell()?;
        self.cells.insert(
            pixel,
            ColorCell {
                red,
                green,
                blue,
                flags: 0x07,
            },
        );
        Ok((pixel, red, green, blue))
    }

    /// Allocate `count` writable cells. Fails with Alloc when the visual
    /// class is immutable or the map is exhausted.
    pub fn alloc_cells(&mut self, count: u16) -> Result<Vec<u32>, XError> {
        if !self.writable_class {
            return Err(XError::alloc());
        }
        let mut pixels = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let pixel = self.take_free_cell()?;
            self.cells.insert(pixel, ColorCell::default());
            self.writable.insert(pixel);
            pixels.push(pixel);
        }
        Ok(pixels)
    }

    fn take_free_cell(&mut self) -> Result<u32, XError> {
        while self.next_cell < self.entries {
            let pixel = self.next_cell;
            self.next_cell += 1;
            if !self.cells.contains_key(&pixel) {
                return Ok(pixel);
            }
        }
        Err(XError::alloc())
    }

    /// Store into a writable cell. Value error for an unallocated pixel,
    /// Access error for a read-only cell.
    pub fn store(
        &mut self,
        pixel: u32,
        red: u16,
        green: u16,
        blue: u16,
        flags: u8,
    ) -> Result<(), XError> {
        if !self.writable.contains(&pixel) {
            return if self.cells.contains_key(&pixel) {
                Err(XError::access())
            } else {
                Err(XError::value(pixel))
            };
        }
        let cell = self.cells.get_mut(&pixel).expect("writable implies present");
        if flags & 0x01 != 0 {
            cell.red = red;
        }
        if flags & 0x02 != 0 {
            cell.green = green;
        }
        if flags & 0x04 != 0 {
            cell.blue = blue;
        }
        cell.flags = flags;
        Ok(())
    }

    pub fn free_pixels(&mut self, pixels: &[u32]) {
        for pixel in pixels {
            self.cells.remove(pixel);
            self.writable.remove(pixel);
        }
    }

    /// Look up a cell; for mask-based visuals unallocated pixels still
    /// decode through the channel masks.
    pub fn query(&self, pixel: u32) -> Result<(u16, u16, u16), XError> {
        if let Some(cell) = self.cells.get(&pixel) {
            return Ok((cell.red, cell.green, cell.blue));
        }
        if !self.writable_class {
            let r = ((pixel & self.red_mask) >> self.red_mask.trailing_zeros()) as u16;
            let g = ((pixel & self.green_mask) >> self.green_mask.trailing_zeros()) as u16;
            let b = ((pixel & self.blue_mask) >> self.blue_mask.trailing_zeros()) as u16;
            return Ok((r << 8 | r, g << 8 | g, b << 8 | b));
        }
        Err(XError::value(pixel))
    }

    pub fn allocated_pixels(&self) -> Vec<u32> {
        self.cells.keys().copied().collect()
    }

    /// Whether `pixel` names a cell clients may store into.
    pub fn is_writable_cell(&self, pixel: u32) -> bool {
        self.writable.contains(&pixel)
    }

    pub fn cell(&self, pixel: u32) -> Option<&ColorCell> {
        self.cells.get(&pixel)
    }

    /// Move every allocation out of `src` into a fresh map with the same
    /// visual, as CopyColormapAndFree does.
    pub fn copy_and_free(id: ColormapId, owner: ClientId, src: &mut Colormap) -> Colormap {
        let mut copy = Colormap {
            id,
            owner,
            visual: src.visual,
            writable_class: src.writable_class,
            installed: false,
            red_mask: src.red_mask,
            green_mask: src.green_mask,
            blue_mask: src.blue_mask,
            cells: BTreeMap::new(),
            writable: BTreeSet::new(),
            next_cell: src.next_cell,
            entries: src.entries,
        };
        std::mem::swap(&mut copy.cells, &mut src.cells);
        std::mem::swap(&mut copy.writable, &mut src.writable);
        src.next_cell = 0;
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::setup::visual_class;

    fn truecolor() -> Visual {
        Visual {
            id: ROOT_VISUAL,
            class: visual_class::TRUE_COLOR,
            depth: 24,
            bits_per_rgb: 8,
            colormap_entries: 256,
            red_mask: 0x00ff_0000,
            green_mask: 0x0000_ff00,
            blue_mask: 0x0000_00ff,
        }
    }

    fn pseudocolor() -> Visual {
        Visual {
            id: PSEUDOCOLOR_VISUAL,
            class: visual_class::PSEUDO_COLOR,
            depth: 8,
            bits_per_rgb: 8,
            colormap_entries: 256,
            red_mask: 0,
            green_mask: 0,
            blue_mask: 0,
        }
    }

    #[test]
    fn test_truecolor_alloc_computes_pixel_from_masks() {
        let mut cmap = Colormap::new(DEFAULT_COLORMAP, 0, &truecolor());
        let (pixel, r, g, b) = cmap.alloc_color(0x1000, 0x2000, 0x3000).unwrap();
        assert_eq!(pixel, 0x0010_2030);
        assert_eq!((r >> 8, g >> 8, b >> 8), (0x10, 0x20, 0x30));
    }

    #[test]
    fn test_truecolor_query_decodes_unallocated_pixels() {
        let cmap = Colormap::new(DEFAULT_COLORMAP, 0, &truecolor());
        let (r, g, b) = cmap.query(0x00ff_8000).unwrap();
        assert_eq!(r, 0xffff);
        assert_eq!(g, 0x8080);
        assert_eq!(b, 0);
    }

    #[test]
    fn test_truecolor_cells_are_not_writable() {
        let mut cmap = Colormap::new(DEFAULT_COLORMAP, 0, &truecolor());
        assert_eq!(cmap.alloc_cells(1).unwrap_err(), XError::alloc());
        let (pixel, ..) = cmap.alloc_color(1, 2, 3).unwrap();
        assert_eq!(
            cmap.store(pixel, 0, 0, 0, 0x7).unwrap_err(),
            XError::access()
        );
    }

    #[test]
    fn test_pseudocolor_alloc_and_store() {
        let mut cmap = Colormap::new(0x0040_0001, 1, &pseudocolor());
        let pixels = cmap.alloc_cells(2).unwrap();
        assert_eq!(pixels, vec![0, 1]);
        cmap.store(0, 0xaaaa, 0xbbbb, 0xcccc, 0x07).unwrap();
        assert_eq!(cmap.query(0).unwrap(), (0xaaaa, 0xbbbb, 0xcccc));
        // partial store honors the flags
        cmap.store(0, 0x1111, 0, 0, 0x01).unwrap();
        assert_eq!(cmap.query(0).unwrap(), (0x1111, 0xbbbb, 0xcccc));
    }

    #[test]
    fn test_store_unallocated_pixel_is_value_error() {
        let mut cmap = Colormap::new(0x0040_0001, 1, &pseudocolor());
        assert_eq!(
            cmap.store(40, 0, 0, 0, 0x7).unwrap_err(),
            XError::value(40)
        );
    }

    #[test]
    fn test_copy_and_free_moves_allocations() {
        let mut a = Colormap::new(0x0040_0001, 1, &truecolor());
        let (pixel, ..) = a.alloc_color(0x1000, 0x2000, 0x3000).unwrap();
        let b = Colormap::copy_and_free(0x0040_0002, 1, &mut a);
        assert!(b.cell(pixel).is_some());
        assert!(a.cell(pixel).is_none());
    }

    #[test]
    fn test_alloc_exhaustion() {
        let mut visual = pseudocolor();
        visual.colormap_entries = 2;
        let mut cmap = Colormap::new(0x0040_0001, 1, &visual);
        assert!(cmap.alloc_cells(2).is_ok());
        assert_eq!(cmap.alloc_cells(1).unwrap_err(), XError::alloc());
    }
}
