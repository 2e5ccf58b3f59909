use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use tracing::{error, info, warn};

use flagmap::api::BackendClient;
use flagmap::app::App;
use flagmap::config::{Config, LocationProviderKind};
use flagmap::error::LocationError;
use flagmap::geo::LatLng;
use flagmap::location::{
    self, FixedLocation, LocationSource, NoLocation, ReplayLocation, WatchHandle,
};
use flagmap::worker::Completion;
use flagmap::{logging, map, ui};

/// Terminal map of flagged campus locations
#[derive(Parser)]
#[command(name = "flagmap", version, about)]
struct Cli {
    /// TOML config file
    #[arg(short, long, env = "FLAGMAP_CONFIG")]
    config: Option<PathBuf>,

    /// Backend base URL, e.g. http://192.168.10.83:8000
    #[arg(long)]
    base_url: Option<String>,

    /// Token sent as `Authorization: Token <token>`
    #[arg(long)]
    token: Option<String>,

    /// Directory of GeoJSON outlines to draw under the markers
    #[arg(long)]
    basemap: Option<PathBuf>,

    /// Fixed device location as `lat,lon`
    #[arg(long, value_parser = location::parse_lat_lon, conflicts_with = "replay")]
    location: Option<LatLng>,

    /// Replay a recorded track of `lat,lon` lines as the device location
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Log file (the terminal is used by the map)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Flags win over file and environment
    fn apply(&self, config: &mut Config) {
        if let Some(ref url) = self.base_url {
            config.backend.base_url = url.clone();
        }
        if let Some(ref token) = self.token {
            config.backend.token = Some(token.clone());
        }
        if let Some(ref dir) = self.basemap {
            config.map.basemap_dir = Some(dir.clone());
        }
        if let Some(here) = self.location {
            config.location.provider = LocationProviderKind::Fixed;
            config.location.latitude = Some(here.latitude);
            config.location.longitude = Some(here.longitude);
        }
        if let Some(ref track) = self.replay {
            config.location.provider = LocationProviderKind::Replay;
            config.location.replay_file = Some(track.clone());
        }
        if let Some(ref file) = self.log_file {
            config.logging.file = file.clone();
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config = match cli.config {
        Some(ref path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let mut config = config.with_env_overrides();
    cli.apply(&mut config);
    config.validate()?;
    Ok(config)
}

/// Build the configured location source before the terminal is taken over,
/// so a bad replay file is reported on stderr
fn location_source(config: &Config) -> Result<Box<dyn LocationSource>> {
    let loc = &config.location;
    Ok(match loc.provider {
        LocationProviderKind::None => Box::new(NoLocation),
        LocationProviderKind::Fixed => {
            let (lat, lon) = loc
                .latitude
                .zip(loc.longitude)
                .context("fixed location needs latitude and longitude")?;
            Box::new(FixedLocation::new(LatLng::new(lat, lon)))
        }
        LocationProviderKind::Replay => {
            let path = loc
                .replay_file
                .as_deref()
                .context("replay provider needs replay_file")?;
            Box::new(ReplayLocation::from_file(path)?)
        }
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    logging::init_logging(&config.logging, cli.verbose)?;
    info!(base_url = %config.backend.base_url, "starting flagmap");

    let source = location_source(&config)?;
    let basemap = match config.map.basemap_dir {
        Some(ref dir) => map::basemap::load_dir(dir)?,
        None => Vec::new(),
    };

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, &config, source, basemap);

    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    if let Err(ref e) = result {
        error!(error = %e, "exiting with error");
    }
    info!("flagmap stopped");
    result
}

/// Request location permission and start the watch. Denial is shown on screen.
fn start_location(
    app: &mut App,
    config: &Config,
    source: Box<dyn LocationSource>,
    tx: &Sender<Completion>,
) -> Result<Option<WatchHandle>> {
    let tx = tx.clone();
    let sink = move |fix: LatLng| {
        let _ = tx.send(Completion::Location(fix));
    };
    match location::watch_position(source, config.location.watch_options(), sink) {
        Ok(handle) => Ok(Some(handle)),
        Err(LocationError::PermissionDenied) => {
            warn!("location unavailable, map disabled");
            app.session.on_permission_denied();
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    app.set_mouse_pos(mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        // Click on a marker taps it, anywhere else starts a drag
        MouseEventKind::Down(MouseButton::Left) => {
            if !app.tap_at(mouse.column, mouse.row) {
                app.last_mouse = Some((mouse.column, mouse.row));
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => app.handle_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.end_drag(),
        _ => {}
    }
}

fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    match code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => app.quit(),
        KeyCode::Esc => app.escape(),

        KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
        KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
        KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
        KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

        KeyCode::Tab => app.select_next(),
        KeyCode::BackTab => app.select_prev(),
        KeyCode::Enter | KeyCode::Char(' ') => app.activate_selected(),
        KeyCode::Char('x') => app.session.close_profile(),

        KeyCode::Char('b') | KeyCode::Char('B') => app.map_renderer.toggle_basemap(),
        KeyCode::Char('L') => app.map_renderer.toggle_labels(),
        KeyCode::Char('c') => app.recenter(),
        KeyCode::Char('r') | KeyCode::Char('0') => app.reset_view(),
        _ => {}
    }
}

fn drain(app: &mut App, rx: &Receiver<Completion>) {
    for completion in rx.try_iter() {
        app.handle_completion(completion);
    }
}

fn run(
    terminal: &mut DefaultTerminal,
    config: &Config,
    source: Box<dyn LocationSource>,
    basemap: Vec<map::basemap::LineString>,
) -> Result<()> {
    let (tx, rx) = unbounded();
    let size = terminal.size()?;
    let client = BackendClient::new(&config.backend.base_url, config.backend.token.clone())?;
    let mut app = App::new(
        size.width as usize,
        size.height as usize,
        config.map.initial_longitude_delta,
        client,
        tx.clone(),
    );
    app.map_renderer.set_basemap(basemap);

    app.load_markers();
    // Dropped when `run` returns, on every path
    let _watch = start_location(&mut app, config, source, &tx)?;

    loop {
        terminal.draw(|frame| ui::render(frame, &app))?;

        // ~60fps
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    handle_key(&mut app, key.code, key.modifiers);
                }
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(width as usize, height as usize),
                _ => {}
            }
        }

        drain(&mut app, &rx);

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
