//! Snapshot to geometry, one function per visualization mode.
//!
//! Everything here is a pure function of the snapshot bytes and the frame
//! counter. Coordinates live in a `WIDTH` × `HEIGHT` canvas with y growing
//! downwards; hues are degrees on the colour wheel.

use std::f64::consts::TAU;

use crate::analysis::Snapshot;
use crate::shared::VisMode;

pub const WIDTH: f64 = 600.0;
pub const HEIGHT: f64 = 300.0;

// Lightning
const BOLT_SEGMENTS: usize = 25;
const BOLT_CHAOS: f64 = 30.0;
const FRAME_MS: f64 = 16.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    Segment { x1: f64, y1: f64, x2: f64, y2: f64, hue: f64 },
    Dot { x: f64, y: f64, hue: f64 },
    Bar { x: f64, width: f64, height: f64, hue: f64 },
}

pub fn shapes(mode: VisMode, snapshot: &Snapshot, frame: u64) -> Vec<Shape> {
    let data = if mode.uses_frequency() {
        &snapshot.frequency
    } else {
        &snapshot.time_domain
    };
    if data.is_empty() {
        return Vec::new();
    }
    match mode {
        VisMode::Line => line(data),
        VisMode::Circle => circle(data, frame),
        VisMode::Lightning => lightning(data, frame),
        VisMode::Bars => bars(data),
    }
}

fn line(data: &[u8]) -> Vec<Shape> {
    let step = WIDTH / data.len() as f64;
    let point = |i: usize| (i as f64 * step, data[i] as f64 / 128.0 * HEIGHT / 2.0);
    (1..data.len())
        .map(|i| {
            let (x1, y1) = point(i - 1);
            let (x2, y2) = point(i);
            Shape::Segment { x1, y1, x2, y2, hue: 120.0 }
        })
        .collect()
}

fn circle(data: &[u8], frame: u64) -> Vec<Shape> {
    let (cx, cy) = (WIDTH / 2.0, HEIGHT / 2.0);
    let radius = 30.0;
    let step = TAU / data.len() as f64;
    let hue = (frame % 360) as f64;
    data.iter()
        .enumerate()
        .map(|(i, &v)| {
            let angle = i as f64 * step;
            let r = radius + v as f64 / 2.0;
            Shape::Dot { x: cx + angle.cos() * r, y: cy + angle.sin() * r, hue }
        })
        .collect()
}

fn bars(data: &[u8]) -> Vec<Shape> {
    let width = WIDTH / data.len() as f64;
    data.iter()
        .enumerate()
        .map(|(i, &v)| Shape::Bar {
            x: i as f64 * width,
            width,
            height: v as f64 / 255.0 * HEIGHT,
            hue: ((i * 2) % 360) as f64,
        })
        .collect()
}

// Louder means more and longer bolts, slowly rotating around the center.
fn lightning(data: &[u8], frame: u64) -> Vec<Shape> {
    let avg = data.iter().map(|&v| v as f64).sum::<f64>() / data.len() as f64;
    let bolts = (avg * 4.0 / 40.0).floor() as usize;
    if bolts == 0 {
        return Vec::new();
    }
    let length = (avg * 2.0 / 255.0) * (WIDTH.min(HEIGHT) / 2.0);
    let rotation = frame as f64 * FRAME_MS * 0.0001;
    let hue = ((frame * 2) % 360) as f64;
    let (cx, cy) = (WIDTH / 2.0, HEIGHT / 2.0);

    let mut out = Vec::with_capacity(bolts * BOLT_SEGMENTS);
    for b in 0..bolts {
        let angle = rotation + b as f64 * TAU / bolts as f64;
        let (dx, dy) = (angle.cos(), angle.sin());
        let (mut x, mut y) = (cx, cy);
        for s in 0..BOLT_SEGMENTS {
            let progress = s as f64 / BOLT_SEGMENTS as f64;
            let jx = (jitter(frame, b as u64, s as u64 * 2) - 0.5) * BOLT_CHAOS;
            let jy = (jitter(frame, b as u64, s as u64 * 2 + 1) - 0.5) * BOLT_CHAOS;
            let nx = cx + dx * length * progress + jx;
            let ny = cy + dy * length * progress + jy;
            out.push(Shape::Segment { x1: x, y1: y, x2: nx, y2: ny, hue });
            x = nx;
            y = ny;
        }
    }
    out
}

// Deterministic value in [0, 1) from the inputs (splitmix64 finalizer).
fn jitter(frame: u64, bolt: u64, n: u64) -> f64 {
    let mut z = frame
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add(bolt.wrapping_mul(0xBF58_476D_1CE4_E5B9))
        .wrapping_add(n.wrapping_mul(0x94D0_49BB_1331_11EB));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z >> 11) as f64 / (1u64 << 53) as f64
}
