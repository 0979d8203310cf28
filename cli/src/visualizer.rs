//! Bar-graph spectrum drawn onto an RGB surface.
//!
//! The surface keeps its pixels between frames; every frame starts with a
//! translucent black fill so earlier bars fade out instead of vanishing.

use crate::analyser::FrequencySource;
use tracing::debug;

pub const BAR_COUNT: usize = 32;
const BAR_GAP: f32 = 2.0;
const MAX_HEIGHT_RATIO: f32 = 0.8;
const REFLECTION_RATIO: f32 = 0.3;

pub const TRAIL_FILL: Rgba = Rgba::new(0, 0, 0, 0.2);
pub const IDLE_BAR: Rgba = Rgba::new(139, 92, 246, 0.3);
pub const REFLECTION: Rgba = Rgba::new(139, 92, 246, 0.2);
pub const SPECTRUM_GRADIENT: [Rgba; 3] = [
    Rgba::new(139, 92, 246, 0.8),
    Rgba::new(236, 72, 153, 0.8),
    Rgba::new(59, 130, 246, 0.8),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    fn lerp(self, other: Self, t: f32) -> Self {
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Self {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: self.a + (other.a - self.a) * t,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Paint {
    Solid(Rgba),
    /// Three evenly spaced stops from `bottom` (stop 0) to `top` (stop 2).
    VerticalGradient { bottom: f32, top: f32, stops: [Rgba; 3] },
}

impl Paint {
    fn color_at(&self, y: f32) -> Rgba {
        match *self {
            Paint::Solid(color) => color,
            Paint::VerticalGradient { bottom, top, stops } => {
                let span = bottom - top;
                let t = if span.abs() < f32::EPSILON {
                    0.0
                } else {
                    ((bottom - y) / span).clamp(0.0, 1.0)
                };
                if t <= 0.5 {
                    stops[0].lerp(stops[1], t * 2.0)
                } else {
                    stops[1].lerp(stops[2], (t - 0.5) * 2.0)
                }
            }
        }
    }
}

/// Opaque pixel grid, black until painted.
#[derive(Debug, Clone)]
pub struct Surface {
    width: usize,
    height: usize,
    pixels: Vec<[f32; 3]>,
}

impl Surface {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![[0.0; 3]; width * height] }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Resizes in place, discarding the old contents when the size changes.
    pub fn resize(&mut self, width: usize, height: usize) {
        if self.width != width || self.height != height {
            *self = Self::new(width, height);
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<(u8, u8, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let [r, g, b] = self.pixels[y * self.width + x];
        Some((r.round() as u8, g.round() as u8, b.round() as u8))
    }

    /// Alpha-blends `paint` over every pixel whose centre lies inside the rect.
    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, paint: Paint) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let x_range = pixel_span(x, x + width, self.width);
        let y_range = pixel_span(y, y + height, self.height);
        for py in y_range {
            let color = paint.color_at(py as f32 + 0.5);
            let alpha = color.a.clamp(0.0, 1.0);
            let source = [color.r as f32, color.g as f32, color.b as f32];
            for px in x_range.clone() {
                let pixel = &mut self.pixels[py * self.width + px];
                for (channel, value) in pixel.iter_mut().zip(source) {
                    *channel = value * alpha + *channel * (1.0 - alpha);
                }
            }
        }
    }
}

fn pixel_span(start: f32, end: f32, limit: usize) -> std::ops::Range<usize> {
    let first = (start - 0.5).ceil().max(0.0) as usize;
    let last = ((end - 0.5).ceil().max(0.0) as usize).min(limit);
    first.min(last)..last
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Idle,
    Spectrum,
}

pub fn bar_width(surface_width: f32) -> f32 {
    surface_width / BAR_COUNT as f32 - BAR_GAP
}

/// Gently bobbing bars shown when nothing is being analysed.
pub fn idle_bars(width: f32, height: f32, time_seconds: f64) -> Vec<Bar> {
    let bar_width = bar_width(width);
    (0..BAR_COUNT)
        .map(|i| {
            let phase = time_seconds * 2.0 + i as f64 * 0.2;
            let bar_height = 5.0 + phase.sin() as f32 * 3.0;
            Bar {
                x: i as f32 * (bar_width + BAR_GAP),
                y: height / 2.0 - bar_height / 2.0,
                width: bar_width,
                height: bar_height,
            }
        })
        .collect()
}

/// Buckets `data` into [`BAR_COUNT`] bars; bucket `i` reads bin
/// `floor(i * bins / BAR_COUNT)`.
pub fn spectrum_bars(data: &[u8], width: f32, height: f32) -> Vec<Bar> {
    let bins = data.len();
    let bar_width = bar_width(width);
    (0..BAR_COUNT)
        .map(|i| {
            let value = data.get(i * bins / BAR_COUNT).copied().unwrap_or(0);
            let bar_height = value as f32 / 255.0 * height * MAX_HEIGHT_RATIO;
            Bar {
                x: i as f32 * (bar_width + BAR_GAP),
                y: (height - bar_height) / 2.0,
                width: bar_width,
                height: bar_height,
            }
        })
        .collect()
}

/// Per-mount render state. Dropping it ends the frame loop.
pub struct Visualizer {
    analyser: Option<Box<dyn FrequencySource>>,
    install_attempted: bool,
    data: Vec<u8>,
}

impl Visualizer {
    pub fn new() -> Self {
        Self { analyser: None, install_attempted: false, data: Vec::new() }
    }

    #[cfg(test)]
    pub fn has_analyser(&self) -> bool {
        self.analyser.is_some()
    }

    /// Builds the analysis node on the first playing frame. Only one attempt
    /// is made per mount; `None` leaves the idle animation in place.
    pub fn ensure_analyser<F>(&mut self, playing: bool, install: F)
    where
        F: FnOnce() -> Option<Box<dyn FrequencySource>>,
    {
        if !playing || self.install_attempted {
            return;
        }
        self.install_attempted = true;
        match install() {
            Some(analyser) => {
                self.data = vec![0; analyser.frequency_bin_count()];
                self.analyser = Some(analyser);
            }
            None => debug!("audio visualization not supported; keeping idle animation"),
        }
    }

    pub fn draw_frame(&mut self, surface: &mut Surface, playing: bool, time_seconds: f64) -> FrameKind {
        let width = surface.width() as f32;
        let height = surface.height() as f32;
        surface.fill_rect(0.0, 0.0, width, height, Paint::Solid(TRAIL_FILL));

        let analyser = match self.analyser.as_mut() {
            Some(analyser) if playing => analyser,
            _ => {
                for bar in idle_bars(width, height, time_seconds) {
                    surface.fill_rect(bar.x, bar.y, bar.width, bar.height, Paint::Solid(IDLE_BAR));
                }
                return FrameKind::Idle;
            }
        };

        analyser.byte_frequency_data(&mut self.data);
        for bar in spectrum_bars(&self.data, width, height) {
            let gradient = Paint::VerticalGradient {
                bottom: bar.y + bar.height,
                top: bar.y,
                stops: SPECTRUM_GRADIENT,
            };
            surface.fill_rect(bar.x, bar.y, bar.width, bar.height, gradient);
            surface.fill_rect(
                bar.x,
                height / 2.0 + bar.height / 2.0,
                bar.width,
                bar.height * REFLECTION_RATIO,
                Paint::Solid(REFLECTION),
            );
        }
        FrameKind::Spectrum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingSource {
        reads: Rc<Cell<usize>>,
        level: u8,
    }

    impl FrequencySource for CountingSource {
        fn frequency_bin_count(&self) -> usize {
            128
        }

        fn byte_frequency_data(&mut self, out: &mut [u8]) {
            self.reads.set(self.reads.get() + 1);
            out.fill(self.level);
        }
    }

    fn counting(level: u8) -> (Rc<Cell<usize>>, Box<dyn FrequencySource>) {
        let reads = Rc::new(Cell::new(0));
        (reads.clone(), Box::new(CountingSource { reads, level }))
    }

    #[test]
    fn spectrum_buckets_sample_evenly_spaced_bins() {
        let data: Vec<u8> = (0..128).map(|i| i as u8).collect();
        let bars = spectrum_bars(&data, 300.0, 60.0);
        assert_eq!(bars.len(), BAR_COUNT);
        let expected = 4.0 / 255.0 * 60.0 * 0.8;
        assert!((bars[1].height - expected).abs() < 1e-4);
        let last = 124.0 / 255.0 * 60.0 * 0.8;
        assert!((bars[31].height - last).abs() < 1e-4);
    }

    #[test]
    fn spectrum_height_caps_at_eighty_percent() {
        let bars = spectrum_bars(&[255; 128], 300.0, 60.0);
        assert!(bars.iter().all(|bar| (bar.height - 48.0).abs() < 1e-4));
        assert!(bars.iter().all(|bar| (bar.y - 6.0).abs() < 1e-4));
    }

    #[test]
    fn idle_bars_bob_around_five_pixels() {
        let bars = idle_bars(300.0, 60.0, 0.0);
        assert_eq!(bars.len(), BAR_COUNT);
        assert!((bars[0].height - 5.0).abs() < 1e-4);
        assert!(bars.iter().all(|bar| (2.0..=8.0).contains(&bar.height)));
        assert!((bars[1].x - 300.0 / 32.0).abs() < 1e-4);
    }

    #[test]
    fn idle_frame_never_reads_analysis_data() {
        let (reads, source) = counting(200);
        let mut visualizer = Visualizer::new();
        visualizer.ensure_analyser(true, || Some(source));
        let mut surface = Surface::new(64, 32);
        assert_eq!(visualizer.draw_frame(&mut surface, false, 1.0), FrameKind::Idle);
        assert_eq!(reads.get(), 0);
    }

    #[test]
    fn playing_frame_with_analyser_draws_spectrum() {
        let (reads, source) = counting(255);
        let mut visualizer = Visualizer::new();
        visualizer.ensure_analyser(true, || Some(source));
        let mut surface = Surface::new(320, 32);
        assert_eq!(visualizer.draw_frame(&mut surface, true, 1.0), FrameKind::Spectrum);
        assert_eq!(reads.get(), 1);
        let (r, g, b) = surface.pixel(0, 16).unwrap();
        assert!(r > 0 || g > 0 || b > 0);
    }

    #[test]
    fn installation_is_attempted_once_per_mount() {
        let mut visualizer = Visualizer::new();
        let attempts = Cell::new(0);
        visualizer.ensure_analyser(false, || {
            attempts.set(attempts.get() + 1);
            None
        });
        assert_eq!(attempts.get(), 0);
        for _ in 0..3 {
            visualizer.ensure_analyser(true, || {
                attempts.set(attempts.get() + 1);
                None
            });
        }
        assert_eq!(attempts.get(), 1);
        assert!(!visualizer.has_analyser());
        let mut surface = Surface::new(64, 32);
        assert_eq!(visualizer.draw_frame(&mut surface, true, 0.5), FrameKind::Idle);
    }

    #[test]
    fn trail_fill_fades_previous_frame() {
        let mut surface = Surface::new(4, 4);
        surface.fill_rect(0.0, 0.0, 4.0, 4.0, Paint::Solid(Rgba::new(200, 100, 50, 1.0)));
        surface.fill_rect(0.0, 0.0, 4.0, 4.0, Paint::Solid(TRAIL_FILL));
        assert_eq!(surface.pixel(1, 1), Some((160, 80, 40)));
    }

    #[test]
    fn gradient_runs_from_primary_at_bottom_to_blue_at_top() {
        let paint = Paint::VerticalGradient { bottom: 10.0, top: 0.0, stops: SPECTRUM_GRADIENT };
        assert_eq!(paint.color_at(10.0), SPECTRUM_GRADIENT[0]);
        assert_eq!(paint.color_at(5.0), SPECTRUM_GRADIENT[1]);
        assert_eq!(paint.color_at(0.0), SPECTRUM_GRADIENT[2]);
    }
}
