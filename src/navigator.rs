use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
};

use crate::assets::AssetStatus;
use crate::catalog::{
    APP_TAGLINE, APP_TITLE, FOOTER_TEXT, HEALTH_TIPS, HealthTip, SERIES_TITLE, Scene, WELCOME_TEXT,
};
use crate::controller::Session;
use crate::theme::Theme;

pub const NAVIGATOR_HEIGHT: u16 = 4;

fn status_mark(status: Option<AssetStatus>) -> char {
    match status {
        Some(AssetStatus::Ready) => '✓',
        Some(AssetStatus::Loading) => '…',
        Some(AssetStatus::Failed) => '!',
        None => ' ',
    }
}

/// Text of one navigator tile, fitted to `width` columns.
fn tile_label(index: usize, scene: &Scene, status: Option<AssetStatus>, width: usize) -> String {
    let head = format!("{}{}", index + 1, status_mark(status));
    let mut label = if width >= head.chars().count() + 4 {
        let room = width - head.chars().count() - 2;
        let title: String = if scene.title.chars().count() > room {
            let t: String = scene.title.chars().take(room.saturating_sub(1)).collect();
            format!("{}…", t.trim_end())
        } else {
            scene.title.to_string()
        };
        format!(" {head} {title}")
    } else {
        format!(" {head}")
    };
    let len = label.chars().count();
    if len < width {
        label.push_str(&" ".repeat(width - len));
    }
    label.chars().take(width).collect()
}

fn progress_dots(count: usize, current: usize, theme: &Theme) -> Line<'static> {
    let spans: Vec<Span<'static>> = (0..count)
        .map(|i| {
            if i == current {
                Span::styled("━━ ", Style::default().fg(theme.accent))
            } else {
                Span::styled("● ", Style::default().fg(theme.dimmed))
            }
        })
        .collect();
    Line::from(spans).alignment(Alignment::Center)
}

pub fn draw_header(
    frame: &mut Frame,
    area: Rect,
    session: Session,
    total: usize,
    completed: usize,
    theme: &Theme,
) {
    let mut right = vec![Span::styled(
        format!(" {completed}/{total} ready "),
        Style::default().fg(theme.dimmed),
    )];
    if session.autoplay {
        right.push(Span::styled(
            " Autoplay ",
            Style::default().fg(Color::Black).bg(theme.accent),
        ));
        right.push(Span::raw(" "));
    }
    let left = Line::from(vec![
        Span::styled(
            format!(" {APP_TITLE} "),
            Style::default().fg(Color::Black).bg(theme.accent).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(SERIES_TITLE, Style::default().fg(theme.text)),
        Span::styled(
            format!("  ·  Scene {} of {total}", session.current_index + 1),
            Style::default().fg(theme.dimmed),
        ),
    ]);
    let header = Paragraph::new(left).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title_top(Line::from(right).alignment(Alignment::Right)),
    );
    frame.render_widget(header, area);
}

/// Scene tiles plus progress dots. `statuses[i]` is the cache status of
/// `scenes[i]`.
pub fn draw_navigator(
    frame: &mut Frame,
    area: Rect,
    scenes: &[Scene],
    statuses: &[Option<AssetStatus>],
    current: usize,
    theme: &Theme,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(" Scenes ");
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if scenes.is_empty() || inner.width == 0 || inner.height == 0 {
        return;
    }

    let tile_w = (inner.width as usize / scenes.len()).max(3);
    let tiles: Vec<Span<'static>> = scenes
        .iter()
        .enumerate()
        .map(|(i, scene)| {
            let status = statuses.get(i).copied().flatten();
            let style = if i == current {
                Style::default().fg(Color::Black).bg(theme.accent).add_modifier(Modifier::BOLD)
            } else {
                match status {
                    Some(AssetStatus::Ready) => Style::default().fg(theme.positive),
                    Some(AssetStatus::Failed) => Style::default().fg(theme.negative),
                    _ => Style::default().fg(theme.dimmed),
                }
            };
            Span::styled(tile_label(i, scene, status, tile_w), style)
        })
        .collect();

    let [tiles_area, dots_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).areas(inner);
    frame.render_widget(Paragraph::new(Line::from(tiles)), tiles_area);
    frame.render_widget(
        Paragraph::new(progress_dots(scenes.len(), current, theme)),
        dots_area,
    );
}

/// Welcome page shown before the first scene is opened.
pub fn draw_landing(frame: &mut Frame, area: Rect, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.accent))
        .title_bottom(Line::from(" t Colours  q Quit ").alignment(Alignment::Right));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let key = Style::default().fg(Color::Black).bg(theme.accent);
    let lines = vec![
        Line::styled(APP_TITLE, Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
        Line::styled(APP_TAGLINE, Style::default().fg(theme.dimmed)),
        Line::raw(""),
        Line::styled(SERIES_TITLE, Style::default().fg(theme.text).add_modifier(Modifier::BOLD)),
        Line::raw(""),
        Line::styled(WELCOME_TEXT, Style::default().fg(theme.text)),
        Line::raw(""),
        Line::from(vec![
            Span::styled(" Enter ", key),
            Span::raw(" Start Learning    "),
            Span::styled(" a ", key),
            Span::raw(" Play All"),
        ]),
    ];
    let [_, body, tips, footer] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(12u16.min(inner.height)),
        Constraint::Length(TIP_HEIGHT),
        Constraint::Length(1),
    ])
    .areas(inner);
    let [_, body, _] = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Max(72),
        Constraint::Fill(1),
    ])
    .areas(body);
    frame.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center).wrap(Wrap { trim: true }),
        body,
    );
    draw_health_tips(frame, tips, HEALTH_TIPS, theme);
    frame.render_widget(
        Paragraph::new(Line::styled(FOOTER_TEXT, Style::default().fg(theme.dimmed)))
            .alignment(Alignment::Center),
        footer,
    );
}

const TIP_HEIGHT: u16 = 6;

/// Side-by-side tip cards, one column each.
fn draw_health_tips(frame: &mut Frame, area: Rect, tips: &[HealthTip], theme: &Theme) {
    if tips.is_empty() || area.height == 0 {
        return;
    }
    let columns = Layout::horizontal(vec![Constraint::Fill(1); tips.len()]).split(area);
    for (tip, column) in tips.iter().zip(columns.iter()) {
        let card = Paragraph::new(Line::styled(tip.body, Style::default().fg(theme.text)))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(theme.secondary))
                    .title(Line::styled(
                        format!(" {} ", tip.title),
                        Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
                    )),
            );
        frame.render_widget(card, *column);
    }
}
