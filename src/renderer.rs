// src/renderer.rs

use crate::model::{MetricResult, ResultSet};
use crate::visualization::Visualization;
use anyhow::Context;
use image::{Rgb, RgbImage};
use palette::{FromColor, Lch, Srgb};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::f32::consts::TAU;
use std::fs;
use std::path::{Path, PathBuf};

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const SWATCH_SIZE: u32 = 20;
const SWATCH_SPACING: u32 = 30;

/// PNG canvas the chart is drawn onto. Created once, redrawn in place.
pub struct ChartSurface {
    path: PathBuf,
    image: RgbImage,
    frames: u64,
}

impl ChartSurface {
    pub fn create(path: &Path, width: u32, height: u32) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            image: RgbImage::from_pixel(width, height, BACKGROUND),
            frames: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Number of completed draws
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn summary_path(&self) -> PathBuf {
        self.path.with_extension("json")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub label: String,
    pub count: u64,
}

#[derive(Serialize)]
struct Summary<'a> {
    metric: &'a str,
    slices: &'a [Slice],
}

/// Pie chart of the first metric's categories.
pub struct PieChart {
    output: PathBuf,
    width: u32,
    height: u32,
}

impl PieChart {
    pub fn new(output: PathBuf, width: u32, height: u32) -> Self {
        Self { output, width, height }
    }
}

impl Visualization for PieChart {
    type Surface = ChartSurface;

    fn create_surface(&mut self) -> anyhow::Result<ChartSurface> {
        ChartSurface::create(&self.output, self.width, self.height)
    }

    fn draw(&mut self, surface: &mut ChartSurface, results: &ResultSet) -> anyhow::Result<()> {
        let Some(result) = results.first() else {
            tracing::warn!("No metric results to draw");
            return Ok(());
        };

        let slices = slices(result);
        let colors = generate_slice_colors(slices.len());
        render_pie(&mut surface.image, &slices, &colors);

        surface
            .image
            .save(&surface.path)
            .with_context(|| format!("Failed to save chart to {}", surface.path.display()))?;
        let summary = serde_json::to_string_pretty(&Summary {
            metric: &result.metric,
            slices: &slices,
        })?;
        fs::write(surface.summary_path(), summary)?;
        surface.frames += 1;

        tracing::info!(
            "Drew {} ({}) to {}",
            result.metric,
            slices
                .iter()
                .map(|s| format!("{}: {}", s.label, s.count))
                .collect::<Vec<_>>()
                .join(", "),
            surface.path.display()
        );
        Ok(())
    }
}

/// One slice per category: arrays count their entries, numbers count as-is.
pub fn slices(result: &MetricResult) -> Vec<Slice> {
    result
        .values
        .iter()
        .map(|(label, value)| {
            let count = match value {
                serde_json::Value::Array(items) => items.len() as u64,
                serde_json::Value::Number(n) => n.as_u64().unwrap_or(0),
                _ => 0,
            };
            Slice {
                label: label.clone(),
                count,
            }
        })
        .collect()
}

fn render_pie(image: &mut RgbImage, slices: &[Slice], colors: &[Rgb<u8>]) {
    let (width, height) = image.dimensions();
    let legend_width = width / 4;
    let chart_width = width - legend_width;

    let cx = chart_width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let radius = 0.4 * chart_width.min(height) as f32;

    // Upper bound of each slice as a fraction of the full turn
    let total: u64 = slices.iter().map(|s| s.count).sum();
    let mut acc = 0u64;
    let bounds: Vec<f32> = slices
        .iter()
        .map(|s| {
            acc += s.count;
            acc as f32 / total.max(1) as f32
        })
        .collect();

    for (x, y, pixel) in image.enumerate_pixels_mut() {
        if x >= chart_width {
            *pixel = legend_pixel(x - chart_width, y, colors);
            continue;
        }

        let dx = x as f32 + 0.5 - cx;
        let dy = y as f32 + 0.5 - cy;
        if total == 0 || dx * dx + dy * dy > radius * radius {
            *pixel = BACKGROUND;
            continue;
        }

        // Clockwise from twelve o'clock
        let turn = (dx.atan2(-dy) / TAU).rem_euclid(1.0);
        let idx = bounds.iter().position(|&b| turn < b).unwrap_or(slices.len() - 1);
        *pixel = colors.get(idx).copied().unwrap_or(BACKGROUND);
    }
}

// Legend: a column of colour swatches, one per slice
fn legend_pixel(x: u32, y: u32, colors: &[Rgb<u8>]) -> Rgb<u8> {
    if !(SWATCH_SIZE / 2..SWATCH_SIZE / 2 + SWATCH_SIZE).contains(&x) || y < SWATCH_SIZE {
        return BACKGROUND;
    }
    let row = (y - SWATCH_SIZE) / SWATCH_SPACING;
    let within = (y - SWATCH_SIZE) % SWATCH_SPACING;
    match colors.get(row as usize) {
        Some(&color) if within < SWATCH_SIZE => color,
        _ => BACKGROUND,
    }
}

fn generate_slice_colors(num_slices: usize) -> Vec<Rgb<u8>> {
    let mut rng = StdRng::seed_from_u64(42); // Seed for deterministic colors
    (0..num_slices)
        .map(|_| {
            let hue = rng.gen_range(0.0f32..360.0f32);
            let color = Lch::new(70.0f32, 80.0f32, hue); // Bright, saturated colors
            let srgb: Srgb<f32> = Srgb::from_color(color);
            let (r, g, b) = srgb.into_components();
            let r_u8 = (r * 255.0f32) as u8;
            let g_u8 = (g * 255.0f32) as u8;
            let b_u8 = (b * 255.0f32) as u8;
            Rgb([r_u8, g_u8, b_u8])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn sar_results(sar: usize, non_sar: usize) -> ResultSet {
        let hashes = |prefix: &str, n: usize| -> serde_json::Value {
            (0..n).map(|i| format!("{prefix}{i}")).collect::<Vec<_>>().into()
        };
        ResultSet {
            results: vec![MetricResult {
                metric: "self-affirmed-refactoring".to_string(),
                values: BTreeMap::from([
                    ("Non SAR".to_string(), hashes("n", non_sar)),
                    ("SAR".to_string(), hashes("s", sar)),
                ]),
                commit_hashes: Vec::new(),
            }],
        }
    }

    #[test]
    fn slices_count_arrays_and_numbers() {
        let result = MetricResult {
            metric: "m".to_string(),
            values: BTreeMap::from([
                ("a".to_string(), serde_json::json!(["x", "y"])),
                ("b".to_string(), serde_json::json!(5)),
                ("c".to_string(), serde_json::json!("text")),
            ]),
            commit_hashes: Vec::new(),
        };
        let counts: Vec<u64> = slices(&result).iter().map(|s| s.count).collect();
        assert_eq!(counts, [2, 5, 0]);
    }

    #[test]
    fn draws_pie_and_summary_in_place() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("chart.png");
        let mut chart = PieChart::new(path.clone(), 400, 200);
        let mut surface = chart.create_surface().unwrap();

        // "Non SAR" sorts first: three quarters of the turn from twelve o'clock
        chart.draw(&mut surface, &sar_results(1, 3)).unwrap();
        chart.draw(&mut surface, &sar_results(1, 3)).unwrap();
        assert_eq!(surface.frames(), 2);
        assert!(path.exists());

        let colors = generate_slice_colors(2);
        let image = surface.image();
        // chart area is 300x200 centred at (150, 100), radius 80
        assert_eq!(*image.get_pixel(180, 70), colors[0]);
        assert_eq!(*image.get_pixel(120, 70), colors[1]);
        assert_eq!(*image.get_pixel(2, 2), BACKGROUND);
        // first legend swatch
        assert_eq!(*image.get_pixel(300 + 15, 25), colors[0]);
        assert_eq!(*image.get_pixel(300 + 15, 55), colors[1]);

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path.with_extension("json")).unwrap()).unwrap();
        assert_eq!(summary["slices"][0]["label"], "Non SAR");
        assert_eq!(summary["slices"][0]["count"], 3);
        assert_eq!(summary["slices"][1]["count"], 1);
    }

    #[test]
    fn empty_result_set_draws_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chart.png");
        let mut chart = PieChart::new(path.clone(), 40, 40);
        let mut surface = chart.create_surface().unwrap();

        chart.draw(&mut surface, &ResultSet::default()).unwrap();
        assert_eq!(surface.frames(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn colors_are_deterministic() {
        assert_eq!(generate_slice_colors(3), generate_slice_colors(3));
        assert_eq!(generate_slice_colors(3)[..2], generate_slice_colors(2)[..]);
    }
}
