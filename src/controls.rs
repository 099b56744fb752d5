use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};

use crate::controller::{PlaybackState, Session};
use crate::theme::Theme;

fn build_control_spans(session: Session, state: &PlaybackState, theme: &Theme) -> Vec<Span<'static>> {
    let key_style = Style::default().fg(Color::Black).bg(theme.secondary);
    let mut spans = Vec::new();
    if matches!(state, PlaybackState::ReadyPaused | PlaybackState::Error(_)) {
        spans.extend([Span::styled(" Space ", key_style), Span::raw(" Play  ")]);
    }
    spans.extend([
        Span::styled(" a ", key_style),
        Span::styled(
            if session.autoplay { " Autoplay On  " } else { " Play All  " },
            Style::default().fg(if session.autoplay { theme.accent } else { Color::Reset }),
        ),
        Span::styled(" ←/→ ", key_style),
        Span::raw(" Prev/Next  "),
        Span::styled(" 1-0 ", key_style),
        Span::raw(" Jump  "),
    ]);
    if matches!(state, PlaybackState::Error(_)) {
        spans.extend([
            Span::styled(" r ", key_style),
            Span::styled(" Retry  ", Style::default().fg(theme.negative)),
        ]);
    }
    spans.extend([
        Span::styled(" t ", key_style),
        Span::raw(" Colours  "),
        Span::styled(" q ", key_style),
        Span::raw(" Quit"),
    ]);
    spans
}

/// Wrap spans into lines, breaking at group boundaries (every 2 spans = key + label).
fn wrap_lines(spans: Vec<Span<'static>>, inner_w: usize) -> Vec<Line<'static>> {
    if inner_w == 0 {
        return vec![Line::from(spans)];
    }
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut current_w: usize = 0;
    for chunk in spans.chunks(2) {
        let group_w: usize = Line::from(chunk.to_vec()).width();
        if current_w + group_w > inner_w && current_w > 0 {
            lines.push(Line::from(std::mem::take(&mut current)));
            current_w = 0;
        }
        current.extend(chunk.iter().cloned());
        current_w += group_w;
    }
    if !current.is_empty() {
        lines.push(Line::from(current));
    }
    lines
}

pub fn controls_height(width: u16, session: Session, state: &PlaybackState, theme: &Theme) -> u16 {
    let spans = build_control_spans(session, state, theme);
    let lines = wrap_lines(spans, width.saturating_sub(2) as usize);
    lines.len() as u16 + 2
}

pub fn draw_controls(frame: &mut Frame, area: Rect, session: Session, state: &PlaybackState, theme: &Theme) {
    let spans = build_control_spans(session, state, theme);
    let lines = wrap_lines(spans, area.width.saturating_sub(2) as usize);
    let help = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(" Controls "),
    );
    frame.render_widget(help, area);
}
