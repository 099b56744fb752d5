use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    text::Line,
    widgets::{Block, BorderType, Borders},
};

use crate::gauge::RoundedGauge;
use crate::theme::Theme;

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn ratio(elapsed: Duration, total: Duration) -> f64 {
    if total.is_zero() {
        0.0
    } else {
        (elapsed.as_secs_f64() / total.as_secs_f64()).min(1.0)
    }
}

/// Narration progress for the current scene; empty when nothing is speaking.
pub fn draw_narration_progress(
    frame: &mut Frame,
    area: Rect,
    progress: Option<(Duration, Duration)>,
    theme: &Theme,
) {
    let (ratio, label) = match progress {
        Some((elapsed, total)) => (
            ratio(elapsed, total),
            format!(" {} / {} ", format_duration(elapsed), format_duration(total)),
        ),
        None => (0.0, String::new()),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(" Narration ")
        .title(Line::from(label).alignment(Alignment::Right));

    let gauge = RoundedGauge::new(ratio, String::new(), theme.accent)
        .dimmed_color(theme.dimmed)
        .block(block);
    frame.render_widget(gauge, area);
}
