use std::fs;

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};
use tracing::warn;

use crate::config::config_dir;

pub struct Theme {
    pub name: &'static str,
    pub accent: Color,
    pub secondary: Color,
    pub positive: Color,
    pub negative: Color,
    pub text: Color,
    pub dimmed: Color,
}

pub const THEMES: &[Theme] = &[
    Theme {
        name: "Blossom",
        accent: Color::Rgb(236, 72, 153),
        secondary: Color::Rgb(251, 113, 133),
        positive: Color::Rgb(34, 197, 94),
        negative: Color::Rgb(239, 68, 68),
        text: Color::White,
        dimmed: Color::DarkGray,
    },
    Theme {
        name: "Soft Rose",
        accent: Color::Rgb(251, 207, 232),
        secondary: Color::Rgb(246, 193, 119),
        positive: Color::Rgb(156, 207, 216),
        negative: Color::Rgb(235, 111, 146),
        text: Color::White,
        dimmed: Color::DarkGray,
    },
    Theme {
        name: "Terracotta",
        accent: Color::Rgb(214, 153, 62),
        secondary: Color::Rgb(250, 189, 47),
        positive: Color::Rgb(152, 151, 26),
        negative: Color::Rgb(204, 36, 29),
        text: Color::White,
        dimmed: Color::DarkGray,
    },
    Theme {
        name: "Village Green",
        accent: Color::Rgb(127, 187, 179),
        secondary: Color::Rgb(219, 188, 127),
        positive: Color::Rgb(167, 192, 128),
        negative: Color::Rgb(230, 126, 128),
        text: Color::White,
        dimmed: Color::DarkGray,
    },
    Theme {
        name: "High Contrast",
        accent: Color::Yellow,
        secondary: Color::Cyan,
        positive: Color::Green,
        negative: Color::Red,
        text: Color::White,
        dimmed: Color::Gray,
    },
];

pub fn load_theme() -> usize {
    fs::read_to_string(config_dir().join("theme"))
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .filter(|&i: &usize| i < THEMES.len())
        .unwrap_or(0)
}

pub fn save_theme(index: usize) {
    let dir = config_dir();
    let result = fs::create_dir_all(&dir).and_then(|_| fs::write(dir.join("theme"), format!("{index}")));
    if let Err(e) = result {
        warn!("Could not save theme choice: {e}");
    }
}

pub fn draw_theme_selector(frame: &mut Frame, selected: usize) {
    let area = frame.area();
    let popup_w = 36u16.min(area.width);
    let popup_h = (THEMES.len() as u16 + 4).min(area.height);
    let popup_area = Rect::new(
        area.width.saturating_sub(popup_w) / 2,
        area.height.saturating_sub(popup_h) / 2,
        popup_w,
        popup_h,
    );
    frame.render_widget(Clear, popup_area);

    let current = &THEMES[selected];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(current.accent))
        .title(" Colours ")
        .title_bottom(" ↑/↓ Pick  Enter Keep  Esc Close ");
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let mut lines = vec![Line::raw("")];
    for (i, t) in THEMES.iter().enumerate() {
        let name_style = if i == selected {
            Style::default().fg(Color::Black).bg(t.accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(t.text)
        };
        lines.push(Line::from(vec![
            Span::styled(if i == selected { " ● " } else { "   " }, Style::default().fg(t.accent)),
            Span::styled(format!("{:<15}", t.name), name_style),
            Span::styled(" ██", Style::default().fg(t.accent)),
            Span::styled("██", Style::default().fg(t.secondary)),
            Span::styled("██", Style::default().fg(t.positive)),
        ]));
    }
    frame.render_widget(Paragraph::new(lines), inner);
}
