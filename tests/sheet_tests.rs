use image::{Rgba, RgbaImage};
use spritegen::{compose, Frame, SheetLayout};

#[cfg(test)]
mod sheet_tests {
    use super::*;

    fn frame(index: usize, resolution: u32) -> Frame {
        let shade = (index * 20) as u8;
        Frame::new(
            index,
            index as f32 * 45.0,
            RgbaImage::from_pixel(resolution, resolution, Rgba([shade, shade, shade, 255])),
        )
    }

    #[test]
    fn test_grid_for_eight_steps() {
        let layout = SheetLayout::for_steps(8, 64);
        assert_eq!((layout.cols, layout.rows), (3, 3));
        assert_eq!((layout.width(), layout.height()), (192, 192));
    }

    #[test]
    fn test_grid_for_sixteen_steps() {
        let layout = SheetLayout::for_steps(16, 64);
        assert_eq!((layout.cols, layout.rows), (4, 4));
        assert_eq!((layout.width(), layout.height()), (256, 256));
    }

    #[test]
    fn test_grid_for_five_steps() {
        let layout = SheetLayout::for_steps(5, 64);
        assert_eq!((layout.cols, layout.rows), (3, 2));
        assert_eq!(layout.cell_offset(4), (64, 64));
    }

    #[test]
    fn test_cell_offsets_are_row_major() {
        let layout = SheetLayout::for_steps(8, 64);
        assert_eq!(layout.cell_offset(0), (0, 0));
        assert_eq!(layout.cell_offset(2), (128, 0));
        assert_eq!(layout.cell_offset(3), (0, 64));
        assert_eq!(layout.cell_offset(7), (64, 128));
    }

    #[test]
    fn test_compose_places_each_frame_in_its_cell() {
        let frames: Vec<Frame> = (0..5).map(|i| frame(i, 16)).collect();
        let sheet = compose(&frames, 16).unwrap();
        assert_eq!((sheet.width(), sheet.height()), (48, 32));

        for (i, f) in frames.iter().enumerate() {
            let (x, y) = sheet.layout().cell_offset(i);
            assert_eq!(sheet.image().get_pixel(x + 8, y + 8), f.image().get_pixel(8, 8));
        }
        // Sixth cell is empty
        assert_eq!(sheet.image().get_pixel(40, 24)[3], 0);
    }
}
