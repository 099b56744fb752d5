use std::{sync::mpsc, thread};

use ratatui::{
    Frame,
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Widget, Wrap},
};
use tracing::{debug, warn};

use crate::catalog::Scene;
use crate::controller::{PlaybackState, SceneFault};
use crate::generate::decode_data_url;
use crate::theme::Theme;

pub const ART_ROWS: u16 = 18;
pub const ART_COLS: u16 = 64; // 64x36 half-block pixels, 16:9

// Scene illustration pixel grid: rows of (R, G, B) tuples
pub type ArtPixels = Vec<Vec<(u8, u8, u8)>>;

const SPINNER: [char; 8] = ['⣾', '⣽', '⣻', '⢿', '⡿', '⣟', '⣯', '⣷'];

pub fn decode_art(bytes: &[u8], cols: u16, rows: u16) -> Option<ArtPixels> {
    let img = image::load_from_memory(bytes).ok()?;
    let px_w = cols as u32;
    let px_h = (rows as u32) * 2; // half-block = 2 pixels per row
    let resized = img.resize_exact(px_w, px_h, image::imageops::FilterType::Lanczos3);
    let rgb = resized.to_rgb8();
    let mut pixels = Vec::with_capacity(px_h as usize);
    for y in 0..px_h {
        let mut row = Vec::with_capacity(px_w as usize);
        for x in 0..px_w {
            let p = rgb.get_pixel(x, y);
            row.push((p[0], p[1], p[2]));
        }
        pixels.push(row);
    }
    Some(pixels)
}

/// Resolve an image reference (inline `data:` URL or remote http URL) to pixels.
pub fn load_art(url: &str, cols: u16, rows: u16) -> Option<ArtPixels> {
    let bytes = if url.starts_with("data:") {
        let (mime, bytes) = decode_data_url(url)?;
        debug!("Inline scene image: {} bytes ({mime})", bytes.len());
        bytes
    } else {
        ureq::get(url).call().ok()?.body_mut().read_to_vec().ok()?
    };
    decode_art(&bytes, cols, rows)
}

pub fn spawn_art_load(url: String, cols: u16, rows: u16) -> mpsc::Receiver<ArtPixels> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || match load_art(&url, cols, rows) {
        Some(pixels) => {
            let _ = tx.send(pixels);
        }
        None => warn!("Could not decode scene image"),
    });
    rx
}

fn color_to_rgb(c: Color) -> (u8, u8, u8) {
    match c {
        Color::Rgb(r, g, b) => (r, g, b),
        Color::White => (229, 229, 229),
        Color::DarkGray => (127, 127, 127),
        _ => (0, 0, 0),
    }
}

fn blend(art: u8, bg: u8, opacity: f32) -> u8 {
    (art as f32 * opacity + bg as f32 * (1.0 - opacity)) as u8
}

struct SceneArtWidget<'a> {
    pixels: &'a [Vec<(u8, u8, u8)>],
    opacity: f32,
}

impl<'a> SceneArtWidget<'a> {
    fn new(pixels: &'a [Vec<(u8, u8, u8)>], opacity: f32) -> Self {
        SceneArtWidget { pixels, opacity }
    }
}

impl Widget for SceneArtWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let art_rows = self.pixels.len() / 2;
        let art_cols = self.pixels.first().map(|r| r.len()).unwrap_or(0);
        let rows = (area.height as usize).min(art_rows);
        let cols = (area.width as usize).min(art_cols);
        for cy in 0..rows {
            let top_y = cy * 2;
            for cx in 0..cols {
                let top = self.pixels[top_y][cx];
                let bot = self.pixels.get(top_y + 1).map(|r| r[cx]).unwrap_or(top);
                let x = area.x + cx as u16;
                let y = area.y + cy as u16;
                let ex_bg = color_to_rgb(buf[(x, y)].bg);
                let o = self.opacity;
                buf[(x, y)]
                    .set_char('▀')
                    .set_fg(Color::Rgb(
                        blend(top.0, ex_bg.0, o),
                        blend(top.1, ex_bg.1, o),
                        blend(top.2, ex_bg.2, o),
                    ))
                    .set_bg(Color::Rgb(
                        blend(bot.0, ex_bg.0, o),
                        blend(bot.1, ex_bg.1, o),
                        blend(bot.2, ex_bg.2, o),
                    ));
            }
        }
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect::new(
        area.x + (area.width - w) / 2,
        area.y + (area.height - h) / 2,
        w,
        h,
    )
}

fn draw_banner(frame: &mut Frame, area: Rect, lines: Vec<Line<'static>>, border: Color) {
    let width = lines.iter().map(|l| l.width()).max().unwrap_or(0) as u16 + 4;
    let rect = centered(area, width, lines.len() as u16 + 2);
    frame.render_widget(Clear, rect);
    let banner = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(border)),
        );
    frame.render_widget(banner, rect);
}

fn draw_state_overlay(frame: &mut Frame, art: Rect, state: &PlaybackState, tick: usize, theme: &Theme) {
    match state {
        PlaybackState::Loading => {
            let spin = SPINNER[tick % SPINNER.len()];
            draw_banner(
                frame,
                art,
                vec![
                    Line::styled(format!("{spin} Creating scene…"), Style::default().fg(theme.accent)),
                    Line::styled("Illustrating and recording narration", Style::default().fg(theme.dimmed)),
                ],
                theme.accent,
            );
        }
        PlaybackState::Error(fault) => {
            let heading = match fault {
                SceneFault::Generation(_) => "Could not create this scene",
                SceneFault::Playback(_) => "Could not play the narration",
            };
            draw_banner(
                frame,
                art,
                vec![
                    Line::styled(heading, Style::default().fg(theme.negative).add_modifier(Modifier::BOLD)),
                    Line::styled(fault.message().to_string(), Style::default().fg(theme.dimmed)),
                    Line::from(vec![
                        Span::raw("Press "),
                        Span::styled(" r ", Style::default().fg(Color::Black).bg(theme.secondary)),
                        Span::raw(" to try again"),
                    ]),
                ],
                theme.negative,
            );
        }
        PlaybackState::ReadyPaused => {
            draw_banner(
                frame,
                art,
                vec![Line::from(vec![
                    Span::raw("Press "),
                    Span::styled(" Space ", Style::default().fg(Color::Black).bg(theme.accent)),
                    Span::raw(" to play"),
                ])],
                theme.accent,
            );
        }
        PlaybackState::Playing => {
            let badge = " ♪ Speaking ";
            let w = (badge.chars().count() as u16).min(art.width);
            let rect = Rect::new(art.x + art.width - w, art.y, w, art.height.min(1));
            frame.render_widget(
                Paragraph::new(badge).style(Style::default().fg(Color::Black).bg(theme.positive)),
                rect,
            );
        }
        PlaybackState::Idle => {}
    }
}

/// Draw the current scene: illustration, state overlay, title and the
/// narration caption.
#[allow(clippy::too_many_arguments)]
pub fn draw_scene(
    frame: &mut Frame,
    area: Rect,
    scene: &Scene,
    position: (usize, usize),
    state: &PlaybackState,
    art: Option<&ArtPixels>,
    tick: usize,
    theme: &Theme,
) {
    let (index, total) = position;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.accent))
        .title(format!(" Scene {} of {total} ", index + 1))
        .title(Line::from(format!(" {} ", scene.kind.label())).alignment(Alignment::Right));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let art_h = ART_ROWS.min(inner.height.saturating_sub(4));
    let [art_area, text_area] =
        Layout::vertical([Constraint::Length(art_h), Constraint::Min(0)]).areas(inner);

    let art_w = ART_COLS.min(art_area.width);
    let art_rect = Rect::new(
        art_area.x + (art_area.width - art_w) / 2,
        art_area.y,
        art_w,
        art_area.height,
    );
    if art_rect.width > 0 && art_rect.height > 0 {
        match art {
            Some(pixels) => {
                let opacity = if matches!(state, PlaybackState::Playing) { 1.0 } else { 0.6 };
                frame.render_widget(SceneArtWidget::new(pixels, opacity), art_rect);
            }
            None => frame.render_widget(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(theme.dimmed)),
                art_rect,
            ),
        }
        draw_state_overlay(frame, art_rect, state, tick, theme);
    }

    let text = vec![
        Line::styled(
            scene.title,
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
        ),
        Line::styled(scene.description, Style::default().fg(theme.dimmed)),
        Line::raw(""),
        Line::styled(
            format!("“{}”", scene.voiceover),
            Style::default().fg(theme.text).add_modifier(Modifier::ITALIC),
        ),
    ];
    frame.render_widget(
        Paragraph::new(text).alignment(Alignment::Center).wrap(Wrap { trim: true }),
        text_area,
    );
}
