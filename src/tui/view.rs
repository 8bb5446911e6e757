use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{self, Canvas, Points, Rectangle};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};
use ratatui::Frame;

use crate::middle::PlaybackState;
use crate::shared::{DisplayState, MASTER_MAX, PITCH_SLIDER, TRIM_SLIDER_DB};
use crate::visual::{self, Shape, HEIGHT, WIDTH};

const HELP: &str =
    "space play  p pause  s stop  l reload  [ ] pitch  0 reset  - = master  ; ' trim  1-4 vis  q quit";

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // file + state + status
            Constraint::Length(3), // pitch / master / trim
            Constraint::Min(8),    // visualizer
            Constraint::Length(1), // key help
        ])
        .split(area);

    draw_header(frame, sections[0], state);
    draw_controls(frame, sections[1], state);
    draw_canvas(frame, sections[2], state);
    frame.render_widget(
        Paragraph::new(HELP).style(Style::default().fg(Color::DarkGray)),
        sections[3],
    );
}

fn draw_header(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let state_color = match state.state {
        PlaybackState::Playing => Color::Green,
        PlaybackState::Paused => Color::Yellow,
        PlaybackState::Ready => Color::Cyan,
        PlaybackState::Idle => Color::DarkGray,
    };
    let line = Line::from(vec![
        Span::styled(format!(" {} ", state.state.label()), Style::default().fg(Color::Black).bg(state_color)),
        Span::raw("  "),
        Span::raw(state.file_name.as_deref().unwrap_or("no file")),
        Span::raw("  "),
        Span::styled(state.status.as_str(), Style::default().fg(Color::Gray)),
    ]);
    let block = Block::default().borders(Borders::ALL).title(" pitchscope ");
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_controls(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3); 3])
        .split(area);

    let pitch = (state.pitch + PITCH_SLIDER) / (2.0 * PITCH_SLIDER);
    let master = state.master / MASTER_MAX;
    let trim = (state.trim_db + TRIM_SLIDER_DB) / (2.0 * TRIM_SLIDER_DB);

    let gauges = [
        ("Pitch", pitch, format!("{:+.1} st", state.pitch), Color::Magenta),
        ("Master", master, format!("{}%", (state.master * 100.0).round()), Color::Green),
        ("Trim", trim, format!("{:+.1} dB", state.trim_db), Color::Blue),
    ];
    for ((title, ratio, label, color), col) in gauges.into_iter().zip(cols.iter()) {
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(title))
            .gauge_style(Style::default().fg(color))
            .ratio(ratio.clamp(0.0, 1.0) as f64) // gauge panics outside 0..=1
            .label(label);
        frame.render_widget(gauge, *col);
    }
}

fn draw_canvas(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let shapes = state
        .snapshot
        .as_ref()
        .map(|snap| visual::shapes(state.vis_mode, snap, state.frame))
        .unwrap_or_default();

    let canvas = Canvas::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", state.vis_mode.label())),
        )
        .marker(Marker::Braille)
        .x_bounds([0.0, WIDTH])
        .y_bounds([0.0, HEIGHT])
        .paint(move |ctx| {
            // shapes are y-down, the canvas is y-up
            for shape in &shapes {
                match *shape {
                    Shape::Segment { x1, y1, x2, y2, hue } => ctx.draw(&canvas::Line {
                        x1,
                        y1: HEIGHT - y1,
                        x2,
                        y2: HEIGHT - y2,
                        color: hsl(hue, 1.0, 0.5),
                    }),
                    Shape::Dot { x, y, hue } => ctx.draw(&Points {
                        coords: &[(x, HEIGHT - y)],
                        color: hsl(hue, 1.0, 0.5),
                    }),
                    Shape::Bar { x, width, height, hue } => ctx.draw(&Rectangle {
                        x,
                        y: 0.0,
                        width,
                        height,
                        color: hsl(hue, 1.0, 0.5),
                    }),
                }
            }
        });
    frame.render_widget(canvas, area);
}

// hue in degrees, saturation and lightness in 0..=1
fn hsl(hue: f64, s: f64, l: f64) -> Color {
    let h = hue.rem_euclid(360.0) / 60.0;
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let byte = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Color::Rgb(byte(r), byte(g), byte(b))
}
