//! Chart rendering: the pipeline decides *what* to draw, a [`Renderer`]
//! decides how it looks and where the file goes.

use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::RgbImage;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde::Deserialize;

use crate::color;
use crate::correlation::CorrelationMatrix;

pub const HEATMAP_FILE: &str = "correlation_heatmap.png";
pub const CLUSTER_FILE: &str = "clustering_plot.png";

// ---------------------------------------------------------------------------
// Artifact – a rendered chart and what it shows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactKind {
    CorrelatedPair { x: String, y: String },
    CorrelationHeatmap,
    ClusterPlot { k: usize, x: String, y: String },
    /// A PNG found in the output directory that this run did not draw.
    External,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::CorrelatedPair { x, y } => write!(f, "scatterplot of {x} vs {y}"),
            ArtifactKind::CorrelationHeatmap => write!(f, "correlation heatmap"),
            ArtifactKind::ClusterPlot { k, x, y } => {
                write!(f, "k-means clusters (k={k}) on {x} vs {y}")
            }
            ArtifactKind::External => write!(f, "additional image from the output directory"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
}

impl Artifact {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// File name for a pair scatterplot; whitespace and path separators become `_`.
pub fn scatter_file_name(x: &str, y: &str) -> String {
    let safe = |s: &str| -> String {
        s.chars()
            .map(|c| if c.is_whitespace() || c == '/' || c == '\\' { '_' } else { c })
            .collect()
    };
    format!("{}_{}_scatterplot.png", safe(x), safe(y))
}

// ---------------------------------------------------------------------------
// Render requests
// ---------------------------------------------------------------------------

/// What to draw.  Everything the renderer needs is borrowed from the stage
/// that made the decision.
#[derive(Debug, Clone, Copy)]
pub enum RenderRequest<'a> {
    Scatter {
        x: &'a str,
        y: &'a str,
        points: &'a [(f64, f64)],
    },
    Heatmap {
        matrix: &'a CorrelationMatrix,
    },
    Clusters {
        x: &'a str,
        y: &'a str,
        k: usize,
        points: &'a [(f64, f64)],
        labels: &'a [usize],
    },
}

pub trait Renderer {
    fn render(&self, request: &RenderRequest<'_>, out_dir: &Path) -> Result<Artifact>;
}

// ---------------------------------------------------------------------------
// PNG renderer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub point_radius: u32,
    /// Blank border around the chart, in pixels.
    pub margin: u32,
    pub caption_size: u32,
    pub label_size: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            point_radius: 4,
            margin: 15,
            caption_size: 24,
            label_size: 14,
        }
    }
}

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

const FONT: &str = "sans-serif";

/// Draws titled, labelled charts with `plotters` and encodes them as PNG.
#[derive(Debug, Clone, Default)]
pub struct PngRenderer {
    pub config: RenderConfig,
}

impl PngRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Run `draw` on a blank in-memory canvas and hand back the pixels.
    fn rasterize(&self, draw: impl FnOnce(&Area<'_>) -> Result<()>) -> Result<RgbImage> {
        let (width, height) = (self.config.width.max(1), self.config.height.max(1));
        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            root.fill(&color::BACKGROUND)?;
            draw(&root)?;
            root.present()?;
        }
        RgbImage::from_raw(width, height, buffer).context("chart buffer does not match its size")
    }

    /// Points on two labelled numeric axes.  Each entry of `series` becomes
    /// one coloured legend entry; with no series every point is drawn plain.
    fn draw_points(
        &self,
        root: &Area<'_>,
        caption: &str,
        (x, y): (&str, &str),
        points: &[(f64, f64)],
        series: &[(String, RGBColor, Vec<(f64, f64)>)],
    ) -> Result<()> {
        let mut chart = ChartBuilder::on(root)
            .caption(caption, (FONT, self.config.caption_size))
            .margin(self.config.margin)
            .x_label_area_size(45)
            .y_label_area_size(70)
            .build_cartesian_2d(
                padded_range(points.iter().map(|p| p.0)),
                padded_range(points.iter().map(|p| p.1)),
            )?;
        chart
            .configure_mesh()
            .x_desc(x)
            .y_desc(y)
            .axis_desc_style((FONT, self.config.label_size))
            .draw()?;

        let radius = self.config.point_radius;
        if series.is_empty() {
            chart.draw_series(
                points
                    .iter()
                    .map(|&p| Circle::new(p, radius, color::POINT.mix(0.7).filled())),
            )?;
            return Ok(());
        }
        for (name, colour, members) in series {
            let colour = *colour;
            chart
                .draw_series(
                    members
                        .iter()
                        .map(|&p| Circle::new(p, radius, colour.mix(0.8).filled())),
                )?
                .label(name.as_str())
                .legend(move |(lx, ly)| Circle::new((lx + 6, ly), 5, colour.filled()));
        }
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .label_font((FONT, self.config.label_size))
            .background_style(&color::BACKGROUND.mix(0.85))
            .border_style(&color::AXIS)
            .draw()?;
        Ok(())
    }

    /// One annotated cell per matrix entry; row 0 is drawn at the top.
    fn draw_heatmap(&self, root: &Area<'_>, matrix: &CorrelationMatrix) -> Result<()> {
        let n = matrix.size();
        let names = &matrix.columns;
        let longest = names.iter().map(|c| c.chars().count()).max().unwrap_or(0) as u32;
        let name_area = (longest * self.config.label_size * 6 / 10 + 15).clamp(40, 220);

        let mut chart = ChartBuilder::on(root)
            .caption("Correlation Heatmap", (FONT, self.config.caption_size))
            .margin(self.config.margin)
            .x_label_area_size(40)
            .y_label_area_size(name_area)
            .build_cartesian_2d((0..n).into_segmented(), (0..n).into_segmented())?;

        let column_at = |v: &SegmentValue<usize>| match v {
            SegmentValue::CenterOf(i) => names.get(*i).cloned().unwrap_or_default(),
            _ => String::new(),
        };
        let row_at = |v: &SegmentValue<usize>| match v {
            SegmentValue::CenterOf(i) if *i < n => names[n - 1 - *i].clone(),
            _ => String::new(),
        };
        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(n)
            .y_labels(n)
            .x_label_formatter(&column_at)
            .y_label_formatter(&row_at)
            .label_style((FONT, self.config.label_size))
            .draw()?;

        let value_style = |fill: RGBColor| {
            (FONT, self.config.label_size)
                .into_font()
                .color(&color::label_on(fill))
                .pos(Pos::new(HPos::Center, VPos::Center))
        };
        for i in 0..n {
            let row = n - 1 - i;
            for j in 0..n {
                let r = matrix.get(i, j);
                let fill = color::diverging(r);
                let corners = [
                    (SegmentValue::Exact(j), SegmentValue::Exact(row)),
                    (SegmentValue::Exact(j + 1), SegmentValue::Exact(row + 1)),
                ];
                chart.draw_series([
                    Rectangle::new(corners.clone(), fill.filled()),
                    Rectangle::new(corners, color::BACKGROUND.stroke_width(2)),
                ])?;
                if r.is_finite() {
                    chart.draw_series(std::iter::once(Text::new(
                        format!("{r:.2}"),
                        (SegmentValue::CenterOf(j), SegmentValue::CenterOf(row)),
                        value_style(fill),
                    )))?;
                }
            }
        }
        Ok(())
    }

    fn save(&self, img: &RgbImage, out_dir: &Path, file_name: &str) -> Result<PathBuf> {
        let path = out_dir.join(file_name);
        img.save(&path)
            .with_context(|| format!("saving {}", path.display()))?;
        log::info!("Saved chart to {}", path.display());
        Ok(path)
    }
}

impl Renderer for PngRenderer {
    fn render(&self, request: &RenderRequest<'_>, out_dir: &Path) -> Result<Artifact> {
        match *request {
            RenderRequest::Scatter { x, y, points } => {
                let kind = ArtifactKind::CorrelatedPair {
                    x: x.to_string(),
                    y: y.to_string(),
                };
                let caption = format!("Scatterplot of {x} vs {y}");
                let img = self.rasterize(|root| self.draw_points(root, &caption, (x, y), points, &[]))?;
                let path = self.save(&img, out_dir, &scatter_file_name(x, y))?;
                Ok(Artifact { path, kind })
            }
            RenderRequest::Heatmap { matrix } => {
                let img = self.rasterize(|root| self.draw_heatmap(root, matrix))?;
                let path = self.save(&img, out_dir, HEATMAP_FILE)?;
                Ok(Artifact {
                    path,
                    kind: ArtifactKind::CorrelationHeatmap,
                })
            }
            RenderRequest::Clusters {
                x,
                y,
                k,
                points,
                labels,
            } => {
                let series: Vec<(String, RGBColor, Vec<(f64, f64)>)> = color::generate_palette(k)
                    .into_iter()
                    .enumerate()
                    .map(|(cluster, colour)| {
                        let members = points
                            .iter()
                            .zip(labels)
                            .filter(|(_, l)| **l == cluster)
                            .map(|(&p, _)| p)
                            .collect();
                        (format!("Cluster {cluster}"), colour, members)
                    })
                    .collect();
                let caption = format!("K-means Clustering (k={k})");
                let img =
                    self.rasterize(|root| self.draw_points(root, &caption, (x, y), points, &series))?;
                let path = self.save(&img, out_dir, CLUSTER_FILE)?;
                Ok(Artifact {
                    path,
                    kind: ArtifactKind::ClusterPlot {
                        k,
                        x: x.to_string(),
                        y: y.to_string(),
                    },
                })
            }
        }
    }
}

/// Axis range over the finite values with a 5% pad; a single value gets a
/// unit-wide window around it.
fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        return 0.0..1.0;
    }
    let span = hi - lo;
    let pad = if span > 0.0 { span * 0.05 } else { 0.5 };
    (lo - pad)..(hi + pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    #[test]
    fn scatter_names_replace_spaces() {
        assert_eq!(
            scatter_file_name("unit price", "total/qty"),
            "unit_price_total_qty_scatterplot.png"
        );
    }

    #[test]
    fn renders_each_kind_to_png() {
        let dir = tempfile::tempdir().expect("tempdir");
        let renderer = PngRenderer::default();
        let points = [(1.0, 2.0), (2.0, 4.0), (3.0, 5.0)];

        let scatter = renderer
            .render(
                &RenderRequest::Scatter {
                    x: "a",
                    y: "b",
                    points: &points,
                },
                dir.path(),
            )
            .expect("scatter");
        assert_eq!(scatter.file_name(), "a_b_scatterplot.png");
        assert!(scatter.path.exists());

        let matrix = CorrelationMatrix {
            columns: vec!["a".into(), "b".into()],
            values: vec![vec![1.0, 0.5], vec![0.5, 1.0]],
        };
        let heatmap = renderer
            .render(&RenderRequest::Heatmap { matrix: &matrix }, dir.path())
            .expect("heatmap");
        assert_eq!(heatmap.kind, ArtifactKind::CorrelationHeatmap);

        let clusters = renderer
            .render(
                &RenderRequest::Clusters {
                    x: "a",
                    y: "b",
                    k: 2,
                    points: &points,
                    labels: &[0, 0, 1],
                },
                dir.path(),
            )
            .expect("clusters");
        assert_eq!(clusters.stem(), "clustering_plot");
        let img = image::open(&clusters.path).expect("readable png");
        assert_eq!(img.width(), RenderConfig::default().width);
    }

    fn pixels(path: &Path) -> Vec<u8> {
        image::open(path).expect("readable png").to_rgb8().into_raw()
    }

    #[test]
    fn charts_carry_their_column_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        let renderer = PngRenderer::default();
        let points = [(1.0, 2.0), (2.0, 4.0), (3.0, 5.0)];
        let scatter = |x, y| {
            renderer
                .render(&RenderRequest::Scatter { x, y, points: &points }, dir.path())
                .expect("scatter")
        };
        let short = scatter("a", "b");
        let long = scatter("annual income", "spend");
        assert_ne!(pixels(&short.path), pixels(&long.path));

        let heatmap = |columns: [&str; 2]| {
            let matrix = CorrelationMatrix {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                values: vec![vec![1.0, -0.4], vec![-0.4, 1.0]],
            };
            let artifact = renderer
                .render(&RenderRequest::Heatmap { matrix: &matrix }, dir.path())
                .expect("heatmap");
            pixels(&artifact.path)
        };
        assert_ne!(heatmap(["a", "b"]), heatmap(["price", "qty"]));
    }

    #[test]
    fn degenerate_ranges_are_widened() {
        assert_eq!(padded_range([3.0, 3.0].into_iter()), 2.5..3.5);
        assert_eq!(padded_range(std::iter::empty()), 0.0..1.0);
        let r = padded_range([0.0, 10.0, f64::NAN].into_iter());
        assert_eq!(r, -0.5..10.5);
    }
}
