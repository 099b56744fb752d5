use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Color,
    widgets::{Block, Widget},
};

/// One-row progress bar drawn with rounded line caps.
pub struct RoundedGauge<'a> {
    ratio: f64,
    label: String,
    filled_color: Color,
    dimmed_color: Color,
    block: Option<Block<'a>>,
}

impl<'a> RoundedGauge<'a> {
    pub fn new(ratio: f64, label: String, filled_color: Color) -> Self {
        RoundedGauge {
            ratio: ratio.clamp(0.0, 1.0),
            label,
            filled_color,
            dimmed_color: Color::DarkGray,
            block: None,
        }
    }

    pub fn dimmed_color(mut self, color: Color) -> Self {
        self.dimmed_color = color;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl Widget for RoundedGauge<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if let Some(block) = self.block {
            let inner = block.inner(area);
            block.render(area, buf);
            inner
        } else {
            area
        };

        if inner.width < 2 || inner.height == 0 {
            return;
        }

        let width = inner.width as usize;
        let filled = (self.ratio * width as f64).round() as usize;
        let y = inner.y;

        for col in 0..width {
            let x = inner.x + col as u16;
            let (ch, fg) = if col < filled {
                let ch = match col {
                    0 => '╺',
                    c if c == filled - 1 && filled < width => '╸',
                    _ => '━',
                };
                (ch, self.filled_color)
            } else {
                let ch = match col {
                    0 => '╶',
                    c if c == width - 1 => '╴',
                    _ => '─',
                };
                (ch, self.dimmed_color)
            };
            buf[(x, y)].set_char(ch).set_fg(fg).set_bg(Color::Reset);
        }

        let label_len = self.label.chars().count();
        if label_len > 0 && label_len <= width {
            let start = inner.x + (width - label_len) as u16 / 2;
            for (i, ch) in self.label.chars().enumerate() {
                let x = start + i as u16;
                let fg = if ((x - inner.x) as usize) < filled {
                    Color::White
                } else {
                    Color::Gray
                };
                buf[(x, y)].set_char(ch).set_fg(fg);
            }
        }
    }
}
