use crate::app::{panel_height, App};
use crate::braille::BrailleCanvas;
use crate::map::{LabelKind, MapLayers};
use crate::session::Alert;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
    Frame,
};

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Map
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    let inner = render_map(frame, app, chunks[0]);
    if app.session.selected_profile().is_some() {
        render_profile(frame, app, inner);
    }
    if let Some(alert) = app.session.alert() {
        render_alert(frame, alert, area);
    }
    render_status_bar(frame, app, chunks[1]);
}

/// Draws the bordered map (or the loading screen) and returns the inner area
fn render_map(frame: &mut Frame, app: &App, area: Rect) -> Rect {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Flagged Locations ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if !app.is_ready() {
        let loading = Paragraph::new("Loading current location...")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        let mid = Rect {
            y: inner.y + inner.height / 2,
            height: 1.min(inner.height),
            ..inner
        };
        frame.render_widget(loading, mid);
        return inner;
    }

    let mut viewport = app.viewport.clone();
    viewport.resize(inner.width as usize * 2, inner.height as usize * 4);

    let plan = app.session.plan();
    let layers = app.map_renderer.render(
        inner.width as usize,
        inner.height as usize,
        &viewport,
        &plan,
        app.session.current_location(),
    );

    let selected_cell = app
        .selected
        .and_then(|i| plan.get(i))
        .map(|m| viewport.project(m.position()))
        .and_then(|(px, py)| to_cell(px, py, inner));

    let cursor_pos = app
        .mouse_pixel_pos()
        .and_then(|(px, py)| to_cell(px, py, inner));

    frame.render_widget(
        MapWidget {
            layers,
            cursor_pos,
            selected_cell,
        },
        inner,
    );
    inner
}

/// Braille pixel to a character cell inside `inner`
fn to_cell(px: i32, py: i32, inner: Rect) -> Option<(u16, u16)> {
    if px < 0 || py < 0 {
        return None;
    }
    let cx = (px / 2) as u16;
    let cy = (py / 4) as u16;
    (cx < inner.width && cy < inner.height).then_some((cx, cy))
}

/// Braille layers with marker labels overlaid
struct MapWidget {
    layers: MapLayers,
    cursor_pos: Option<(u16, u16)>,
    selected_cell: Option<(u16, u16)>,
}

impl MapWidget {
    fn render_layer(&self, canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        for cy in 0..canvas.height().min(area.height as usize) {
            for cx in 0..canvas.width().min(area.width as usize) {
                if let Some(ch) = canvas.glyph(cx, cy) {
                    let (x, y) = (area.x + cx as u16, area.y + cy as u16);
                    buf[(x, y)].set_char(ch).set_fg(color);
                }
            }
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Back to front
        self.render_layer(&self.layers.basemap, Color::DarkGray, area, buf);
        self.render_layer(&self.layers.clusters, Color::Green, area, buf);
        self.render_layer(&self.layers.points, Color::Red, area, buf);
        self.render_layer(&self.layers.location, Color::Blue, area, buf);

        for label in &self.layers.labels {
            if label.y >= area.height || label.x >= area.width {
                continue;
            }
            let style = match label.kind {
                LabelKind::Cluster => Style::default()
                    .fg(Color::White)
                    .bg(Color::Green)
                    .add_modifier(Modifier::BOLD),
                LabelKind::Point => Style::default().fg(Color::White),
                LabelKind::Location => Style::default().fg(Color::LightBlue),
            };
            // Badges are centred on the marker
            let width = label.text.chars().count() as u16;
            let start = if label.kind == LabelKind::Cluster {
                label.x.saturating_sub(width / 2)
            } else {
                label.x
            };
            let y = area.y + label.y;
            for (i, ch) in label.text.chars().enumerate() {
                let x = start + i as u16;
                if x >= area.width {
                    break;
                }
                buf[(area.x + x, y)].set_char(ch).set_style(style);
            }
        }

        if let Some((cx, cy)) = self.selected_cell {
            let cell = &mut buf[(area.x + cx, area.y + cy)];
            let style = cell.style().add_modifier(Modifier::REVERSED);
            cell.set_style(style);
        }

        if let Some((cx, cy)) = self.cursor_pos {
            buf[(area.x + cx, area.y + cy)].set_char('╋').set_fg(Color::Red);
        }
    }
}

fn render_profile(frame: &mut Frame, app: &App, inner: Rect) {
    let Some(profile) = app.session.selected_profile() else {
        return;
    };
    let height = panel_height(inner.height).min(inner.height);
    let area = Rect {
        y: inner.y + inner.height - height,
        height,
        ..inner
    };

    let label_style = Style::default().fg(Color::DarkGray);
    let mut lines: Vec<Line> = Vec::new();
    if let Some(url) = profile.photo_url(app.client().base_url()) {
        lines.push(Line::from(vec![
            Span::styled("Photo: ", label_style),
            Span::styled(url, Style::default().fg(Color::Cyan)),
        ]));
    }
    for (label, value) in profile.rows() {
        lines.push(Line::from(vec![
            Span::styled(format!("{label}: "), label_style),
            Span::raw(value),
        ]));
    }
    if lines.is_empty() {
        lines.push(Line::from("No details on record"));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(" Profile ")
        .title_bottom(Line::from(" [x] close ").right_aligned());

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

fn render_alert(frame: &mut Frame, alert: &Alert, area: Rect) {
    let width = 50.min(area.width);
    let height = 6.min(area.height);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };
    let hint = if alert.blocking { " [q] quit " } else { " [Esc] dismiss " };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(Span::styled(
            format!(" {} ", alert.title),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ))
        .title_bottom(Line::from(hint).right_aligned());

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(alert.message.as_str())
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        popup,
    );
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let settings = &app.map_renderer.settings;
    let session = &app.session;
    let dim = Style::default().fg(Color::DarkGray);
    let toggle = |on: bool| Style::default().fg(if on { Color::Green } else { Color::DarkGray });

    let status = Line::from(vec![
        Span::styled(" Zoom: ", dim),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" (", dim),
        Span::styled(app.radius_label(), Style::default().fg(Color::Magenta)),
        Span::styled(") ", dim),
        Span::styled(
            format!(
                "{} pts/{} clusters/{} open ",
                session.points().len(),
                session.clusters().len(),
                session.expanded().len()
            ),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            if settings.show_basemap { "[B]ase " } else { "[b]ase " },
            toggle(settings.show_basemap && app.map_renderer.has_basemap()),
        ),
        Span::styled(
            if settings.show_labels { "[L]abels " } else { "[l]abels " },
            toggle(settings.show_labels),
        ),
        Span::styled("| ", dim),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(
            " | hjkl:pan +/-:zoom tab:select enter:tap c:center r:reset q:quit",
            dim,
        ),
    ]);

    frame.render_widget(Paragraph::new(status), area);
}
