mod assets;
mod audio;
mod catalog;
mod config;
mod controller;
mod controls;
mod error;
mod fetcher;
mod gauge;
mod generate;
mod navigator;
mod notify;
mod player;
mod progress;
mod scene_view;
#[cfg(test)]
mod testing;
mod theme;

use std::{
    collections::HashMap,
    fs, io,
    path::Path,
    sync::{Arc, Mutex, mpsc},
    time::Duration,
};

use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    DefaultTerminal, Frame,
    layout::{Constraint, Layout},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::assets::AssetStatus;
use crate::audio::RodioBackend;
use crate::catalog::{SCENES, SceneId};
use crate::config::{Args, Config};
use crate::controls::{controls_height, draw_controls};
use crate::generate::GeminiClient;
use crate::navigator::{NAVIGATOR_HEIGHT, draw_header, draw_landing, draw_navigator};
use crate::player::{Player, PlayerEvent};
use crate::progress::draw_narration_progress;
use crate::scene_view::{ART_COLS, ART_ROWS, ArtPixels, draw_scene, spawn_art_load};
use crate::theme::{THEMES, draw_theme_selector, load_theme, save_theme};

struct App {
    player: Player,
    events: mpsc::Receiver<PlayerEvent>,
    art: HashMap<SceneId, ArtPixels>,
    art_loads: HashMap<SceneId, mpsc::Receiver<ArtPixels>>,
    theme_index: usize,
    theme_selector: Option<usize>,
    tick: usize,
}

impl App {
    fn new(mut player: Player) -> Self {
        let events = player.subscribe();
        App {
            player,
            events,
            art: HashMap::new(),
            art_loads: HashMap::new(),
            theme_index: load_theme(),
            theme_selector: None,
            tick: 0,
        }
    }

    /// Start decoding illustrations for scenes whose assets just changed and
    /// collect the ones that finished.
    fn refresh_art(&mut self) {
        let changed: Vec<SceneId> = self
            .events
            .try_iter()
            .filter_map(|e| match e {
                PlayerEvent::Asset(id) => Some(id),
                PlayerEvent::Session => None,
            })
            .collect();
        for id in changed {
            self.art.remove(&id);
            self.art_loads.remove(&id);
            if let Some(url) = self.player.asset(id).and_then(|a| a.image_url.clone()) {
                self.art_loads.insert(id, spawn_art_load(url, ART_COLS, ART_ROWS));
            }
        }

        let mut settled = Vec::new();
        for (&id, rx) in &self.art_loads {
            match rx.try_recv() {
                Ok(pixels) => {
                    self.art.insert(id, pixels);
                    settled.push(id);
                }
                Err(mpsc::TryRecvError::Disconnected) => settled.push(id),
                Err(mpsc::TryRecvError::Empty) => {}
            }
        }
        for id in settled {
            self.art_loads.remove(&id);
        }
    }

    fn handle_theme_key(&mut self, code: KeyCode) {
        let Some(selected) = self.theme_selector else {
            return;
        };
        match code {
            KeyCode::Up => self.theme_selector = Some(selected.saturating_sub(1)),
            KeyCode::Down => self.theme_selector = Some((selected + 1).min(THEMES.len() - 1)),
            KeyCode::Enter => {
                self.theme_index = selected;
                save_theme(selected);
                self.theme_selector = None;
            }
            KeyCode::Esc | KeyCode::Char('t') => self.theme_selector = None,
            _ => {}
        }
    }

    /// Returns false when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.theme_selector.is_some() {
            self.handle_theme_key(code);
            return true;
        }
        match code {
            KeyCode::Char('q') => return false,
            KeyCode::Char('t') => self.theme_selector = Some(self.theme_index),
            KeyCode::Char('a') => self.player.toggle_autoplay(),
            KeyCode::Enter if !self.player.is_started() => self.player.start(),
            _ if !self.player.is_started() => {}
            KeyCode::Char(' ') => self.player.play(),
            KeyCode::Right | KeyCode::Char('n') => self.player.next(),
            KeyCode::Left | KeyCode::Char('p') => self.player.prev(),
            KeyCode::Char('r') => self.player.retry(),
            KeyCode::Char(c) if c.is_ascii_digit() => {
                if let Some(index) = digit_to_index(c) {
                    self.player.select(index);
                }
            }
            _ => {}
        }
        true
    }
}

/// `1`..`9` pick scenes 1-9, `0` picks scene 10.
fn digit_to_index(c: char) -> Option<usize> {
    match c.to_digit(10)? {
        0 => Some(9),
        d => Some(d as usize - 1),
    }
}

fn init_logging(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let log_file = fs::OpenOptions::new().create(true).append(true).open(path)?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    Ok(())
}

fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let config = match Config::from_args(args, SCENES.len()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("scene-player: {e}");
            std::process::exit(2);
        }
    };
    if let Err(e) = init_logging(&config.log_file) {
        eprintln!("Could not open log file {}: {e}", config.log_file.display());
        std::process::exit(1);
    }
    info!(
        image_model = %config.gemini.image_model,
        tts_model = %config.gemini.tts_model,
        "Starting scene player"
    );

    let generator = Arc::new(GeminiClient::new(config.gemini));
    let player = Player::new(SCENES, generator, Box::new(RodioBackend));
    let mut app = App::new(player);
    if let Some(index) = config.start_index {
        app.player.select(index);
    }
    if config.autoplay {
        app.player.toggle_autoplay();
    }

    let mut terminal = ratatui::init();
    let result = run(&mut terminal, &mut app);
    ratatui::restore();
    app.player.shutdown();
    if let Err(e) = &result {
        error!("Terminal error: {e}");
    }
    info!("Exiting");
    result
}

fn run(terminal: &mut DefaultTerminal, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, app))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && !app.handle_key(key.code) {
                    break;
                }
            }
        }

        app.player.pump();
        app.refresh_art();
        app.tick = app.tick.wrapping_add(1);
    }
    Ok(())
}

fn draw(frame: &mut Frame, app: &App) {
    let theme = &THEMES[app.theme_index];
    let player = &app.player;

    if !player.is_started() {
        draw_landing(frame, frame.area(), theme);
    } else {
        let session = player.session();
        let state = player.state();
        let scenes = player.scenes();
        let statuses: Vec<Option<AssetStatus>> = scenes
            .iter()
            .map(|s| player.asset(s.id).map(|a| a.status()))
            .collect();
        let controls_h = controls_height(frame.area().width, session, state, theme);

        let [header, body, progress, navigator, controls] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(NAVIGATOR_HEIGHT),
            Constraint::Length(controls_h),
        ])
        .areas(frame.area());

        draw_header(frame, header, session, scenes.len(), player.completed_count(), theme);
        let scene = player.scene();
        draw_scene(
            frame,
            body,
            scene,
            (session.current_index, scenes.len()),
            state,
            app.art.get(&scene.id),
            app.tick,
            theme,
        );
        draw_narration_progress(frame, progress, player.narration_progress(), theme);
        draw_navigator(frame, navigator, scenes, &statuses, session.current_index, theme);
        draw_controls(frame, controls, session, state, theme);
    }

    if let Some(selected) = app.theme_selector {
        draw_theme_selector(frame, selected);
    }
}
