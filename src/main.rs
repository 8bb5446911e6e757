use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use crossterm::terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use pitchscope::audio::{self, GainStage, SessionParams};
use pitchscope::config::Config;
use pitchscope::middle::Middle;
use pitchscope::render;
use pitchscope::shared::InputEvent;
use pitchscope::tui;

const USAGE: &str = "usage: pitchscope [FILE] [--config PATH] [--render OUT.wav] [--pitch SEMITONES] [--master LINEAR] [--trim DB]";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[derive(Debug, Default, PartialEq)]
struct Args {
    file: Option<PathBuf>,
    config: Option<PathBuf>,
    render: Option<PathBuf>,
    pitch: Option<f32>,
    master: Option<f32>,
    trim: Option<f32>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| args.next().with_context(|| format!("{flag} needs a value\n{USAGE}"));
        match arg.as_str() {
            "--config" => parsed.config = Some(value("--config")?.into()),
            "--render" => parsed.render = Some(value("--render")?.into()),
            "--pitch" => parsed.pitch = Some(value("--pitch")?.parse().context("--pitch")?),
            "--master" => parsed.master = Some(value("--master")?.parse().context("--master")?),
            "--trim" => parsed.trim = Some(value("--trim")?.parse().context("--trim")?),
            flag if flag.starts_with("--") => anyhow::bail!("unknown option {flag}\n{USAGE}"),
            _ if parsed.file.is_none() => parsed.file = Some(PathBuf::from(&arg)),
            _ => anyhow::bail!("more than one input file\n{USAGE}"),
        }
    }
    Ok(parsed)
}

fn run() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    let config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(out) = &args.render {
        let input = args.file.as_ref().context("--render needs an input file")?;
        let defaults = SessionParams::default();
        let params = SessionParams {
            semitones: args.pitch.unwrap_or(defaults.semitones),
            master: args.master.unwrap_or(defaults.master),
            trim_db: args.trim.unwrap_or(defaults.trim_db),
        };
        render::render_file(input, out, params, &config)?;
        println!("wrote {}", out.display());
        return Ok(());
    }

    // post-gain samples flow engine -> analyser through this ring
    let (tap_tx, tap_rx) = rtrb::RingBuffer::new(config.tap_capacity);
    let output = match audio::start_audio(config.command_capacity, tap_tx) {
        Ok(handle) => Some(handle),
        Err(e) => {
            log::error!("audio output unavailable: {e:#}");
            None
        }
    };
    let tick_rate = Duration::from_millis(config.tick_ms);
    let mut middle = Middle::new(output, Some(tap_rx), config);

    if let Some(p) = args.pitch {
        middle.set_pitch(p);
    }
    if let Some(m) = args.master {
        middle.set_gain(GainStage::Master, m);
    }
    if let Some(t) = args.trim {
        middle.set_gain(GainStage::Trim, t);
    }
    if let Some(file) = &args.file {
        // failure shows up in the status line
        let _ = middle.load(file);
    }

    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope
    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    loop {
        middle.tick(Instant::now());
        let ds = middle.display_state();
        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds);
        })?;

        for event in tui::input::poll_input(tick_rate)? {
            if event == InputEvent::Quit {
                middle.stop();
                term.clear()?;
                return Ok(());
            }
            middle.handle_input(event);
        }
    }
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let _ = std::io::stdout().flush();
    }
}
