use crate::visualizer::Surface;
use ratatui::{buffer::Buffer, layout::Rect, style::Color, widgets::Widget};

const UPPER_HALF_BLOCK: &str = "▀";

/// Pixel height backing one terminal row.
pub const PIXELS_PER_ROW: u16 = 2;

/// Paints a surface with one upper-half block per cell: the glyph takes the
/// top pixel, the cell background the bottom one.
pub struct SpectrumView<'a> {
    surface: &'a Surface,
}

impl<'a> SpectrumView<'a> {
    pub fn new(surface: &'a Surface) -> Self {
        Self { surface }
    }
}

impl Widget for SpectrumView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for row in 0..area.height {
            for column in 0..area.width {
                let x = column as usize;
                let y = (row * PIXELS_PER_ROW) as usize;
                let (Some(top), Some(bottom)) =
                    (self.surface.pixel(x, y), self.surface.pixel(x, y + 1))
                else {
                    continue;
                };
                if let Some(cell) = buf.cell_mut((area.x + column, area.y + row)) {
                    cell.set_symbol(UPPER_HALF_BLOCK)
                        .set_fg(Color::Rgb(top.0, top.1, top.2))
                        .set_bg(Color::Rgb(bottom.0, bottom.1, bottom.2));
                }
            }
        }
    }
}
