//! Static Chart Renderer
//! Writes plain SVG charts for each view outcome.
//!
//! One file per chart, named `{view}_{chart}.svg`. A view without data gets
//! a single `{view}.svg` placeholder; an empty section of the temporal view
//! gets a placeholder in place of its chart.
//!
//! Only the headline aggregates are drawn. Box summaries, the temperature
//! scatter and the peak-hour selection stay in the JSON report, and weather
//! shares are drawn as bars rather than a pie.

use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::app::{TemporalReport, UsageReport, ViewKind, ViewOutcome, ViewReport, WeatherImpactReport};
use crate::data::schema::month_label;
use crate::data::{DayType, UsageTier};
use crate::stats::{CorrelationMatrix, CorrelationVariable, GroupValue};

// Colors
const BLUE: RGBColor = RGBColor(52, 152, 219);
const RED: RGBColor = RGBColor(231, 76, 60);
const GREEN: RGBColor = RGBColor(46, 204, 113);
const ORANGE: RGBColor = RGBColor(243, 156, 18);
const PURPLE: RGBColor = RGBColor(155, 89, 182);
const GRAY: RGBColor = RGBColor(200, 200, 200);

const PALETTE: [RGBColor; 5] = [BLUE, RED, GREEN, ORANGE, PURPLE];
const TIER_COLORS: [RGBColor; 3] = [GREEN, ORANGE, RED];

const FONT: &str = "sans-serif";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to prepare output directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to draw chart: {0}")]
    Draw(String),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for RenderError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        RenderError::Draw(err.to_string())
    }
}

/// One bar series: a value per category, `None` where the group is absent.
struct BarSeries {
    name: String,
    values: Vec<Option<f64>>,
}

/// One line series over integer x positions.
struct LineSeriesData {
    name: String,
    points: Vec<(u32, f64)>,
}

/// Renders view outcomes into SVG files.
pub struct ChartRenderer {
    out_dir: PathBuf,
    size: (u32, u32),
}

impl ChartRenderer {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            size: (900, 540),
        }
    }

    /// Render every chart of `outcome`, returning the written paths.
    pub fn render(&self, outcome: &ViewOutcome) -> Result<Vec<PathBuf>, RenderError> {
        std::fs::create_dir_all(&self.out_dir)?;

        let written = match outcome {
            ViewOutcome::NoData { view } => {
                let path = self.path(*view, None);
                self.placeholder(&path, view.title())?;
                vec![path]
            }
            ViewOutcome::Ready { report } => match report {
                ViewReport::WeatherImpact(r) => self.weather_impact(r)?,
                ViewReport::TemporalPatterns(r) => self.temporal_patterns(r)?,
                ViewReport::UsageCategorization(r) => self.usage_categorization(r)?,
            },
        };

        for path in &written {
            info!("Wrote chart {}", path.display());
        }
        Ok(written)
    }

    fn path(&self, view: ViewKind, chart: Option<&str>) -> PathBuf {
        let name = match chart {
            Some(chart) => format!("{}_{}.svg", view.slug(), chart),
            None => format!("{}.svg", view.slug()),
        };
        self.out_dir.join(name)
    }

    fn weather_impact(&self, r: &WeatherImpactReport) -> Result<Vec<PathBuf>, RenderError> {
        let view = ViewKind::WeatherImpact;

        let mut weathers: Vec<_> = r.mean_by_weather_and_day_type.iter().map(|g| g.key.0).collect();
        weathers.dedup();
        let categories: Vec<String> = weathers.iter().map(|w| w.label().to_string()).collect();
        let series: Vec<BarSeries> = DayType::ALL
            .iter()
            .map(|&day_type| BarSeries {
                name: day_type.label().to_string(),
                values: weathers
                    .iter()
                    .map(|&w| {
                        r.mean_by_weather_and_day_type
                            .iter()
                            .find(|g| g.key == (w, day_type))
                            .map(|g| g.value)
                    })
                    .collect(),
            })
            .collect();
        let means = self.path(view, Some("mean_by_weather"));
        self.grouped_bars(
            &means,
            "Mean rentals by weather and day type",
            "Mean rentals",
            &categories,
            &series,
        )?;

        let correlation = self.path(view, Some("correlation"));
        self.heatmap(&correlation, "Correlation of weather factors and rentals", &r.correlation)?;

        let shares = self.path(view, Some("share_by_weather"));
        self.grouped_bars(
            &shares,
            "Share of total rentals by weather",
            "Share of rentals (%)",
            &r.totals_by_weather
                .iter()
                .map(|g| g.key.label().to_string())
                .collect::<Vec<_>>(),
            &[BarSeries {
                name: "Share".to_string(),
                values: r.totals_by_weather.iter().map(|g| g.percent).collect(),
            }],
        )?;

        Ok(vec![means, correlation, shares])
    }

    fn temporal_patterns(&self, r: &TemporalReport) -> Result<Vec<PathBuf>, RenderError> {
        let view = ViewKind::TemporalPatterns;

        let hourly = self.path(view, Some("hourly"));
        match &r.hourly {
            Some(pattern) => {
                let series: Vec<LineSeriesData> = DayType::ALL
                    .iter()
                    .map(|&day_type| LineSeriesData {
                        name: day_type.label().to_string(),
                        points: pattern
                            .mean_by_hour_and_day_type
                            .iter()
                            .filter(|g| g.key.1 == day_type)
                            .map(|g| (g.key.0 as u32, g.value))
                            .collect(),
                    })
                    .collect();
                self.line_chart(
                    &hourly,
                    "Mean rentals by hour",
                    (0, 23),
                    &|h| format!("{h:02}"),
                    &series,
                )?;
            }
            None => self.placeholder(&hourly, "Mean rentals by hour")?,
        }

        let seasonal = self.path(view, Some("seasonal"));
        match &r.seasonal {
            Some(pattern) => self.single_bars(&seasonal, "Mean rentals by season", &pattern.mean_by_season, |s| {
                s.label().to_string()
            })?,
            None => self.placeholder(&seasonal, "Mean rentals by season")?,
        }

        let monthly = self.path(view, Some("monthly"));
        match &r.monthly {
            Some(trend) => {
                let series = [LineSeriesData {
                    name: "Mean rentals".to_string(),
                    points: trend.mean_by_month.iter().map(|g| (g.key, g.value)).collect(),
                }];
                self.line_chart(
                    &monthly,
                    "Monthly rental trend",
                    (1, 12),
                    &|m| month_label(m).to_string(),
                    &series,
                )?;
            }
            None => self.placeholder(&monthly, "Monthly rental trend")?,
        }

        Ok(vec![hourly, seasonal, monthly])
    }

    fn usage_categorization(&self, r: &UsageReport) -> Result<Vec<PathBuf>, RenderError> {
        let view = ViewKind::UsageCategorization;

        let tiers = self.path(view, Some("tiers"));
        self.grouped_bars(
            &tiers,
            "Days per usage tier",
            "Days",
            &UsageTier::ALL
                .iter()
                .map(|t| t.label().to_string())
                .collect::<Vec<_>>(),
            &[BarSeries {
                name: "Days".to_string(),
                values: r.tiers.counts.iter().map(|&c| Some(c as f64)).collect(),
            }],
        )?;

        let by_season = self.path(view, Some("by_season"));
        self.stacked_percent(
            &by_season,
            "Usage tiers by season",
            &r.by_season
                .iter()
                .map(|s| s.key.label().to_string())
                .collect::<Vec<_>>(),
            &r.by_season.iter().map(|s| s.percent).collect::<Vec<_>>(),
        )?;

        let by_weather = self.path(view, Some("by_weather"));
        self.stacked_percent(
            &by_weather,
            "Usage tiers by weather",
            &r.by_weather
                .iter()
                .map(|s| s.key.label().to_string())
                .collect::<Vec<_>>(),
            &r.by_weather.iter().map(|s| s.percent).collect::<Vec<_>>(),
        )?;

        Ok(vec![tiers, by_season, by_weather])
    }

    // -- primitives --------------------------------------------------------

    fn root<'a>(&self, path: &'a Path) -> Result<DrawingArea<SVGBackend<'a>, Shift>, RenderError> {
        let root = SVGBackend::new(path, self.size).into_drawing_area();
        root.fill(&WHITE)?;
        Ok(root)
    }

    fn placeholder(&self, path: &Path, title: &str) -> Result<(), RenderError> {
        let root = self.root(path)?;
        let style = (FONT, 22).into_font().color(&BLACK);
        root.draw(&Text::new(title.to_string(), (40, 40), style.clone()))?;
        root.draw(&Text::new(
            "No data for the current filters".to_string(),
            (40, self.size.1 as i32 / 2),
            style,
        ))?;
        root.present()?;
        Ok(())
    }

    fn single_bars<K>(
        &self,
        path: &Path,
        title: &str,
        groups: &[GroupValue<K>],
        label: impl Fn(&K) -> String,
    ) -> Result<(), RenderError> {
        let categories: Vec<String> = groups.iter().map(|g| label(&g.key)).collect();
        let series = [BarSeries {
            name: "Mean rentals".to_string(),
            values: groups.iter().map(|g| Some(g.value)).collect(),
        }];
        self.grouped_bars(path, title, "Mean rentals", &categories, &series)
    }

    fn grouped_bars(
        &self,
        path: &Path,
        title: &str,
        y_desc: &str,
        categories: &[String],
        series: &[BarSeries],
    ) -> Result<(), RenderError> {
        let root = self.root(path)?;
        let n = categories.len().max(1);
        let y_max = upper_bound(series.iter().flat_map(|s| s.values.iter().flatten().copied()));

        let mut chart = ChartBuilder::on(&root)
            .caption(title, (FONT, 22))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..y_max)?;

        let x_fmt = |x: &f64| category_label(categories, *x);
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&x_fmt)
            .y_desc(y_desc)
            .draw()?;

        let width = 0.8 / series.len().max(1) as f64;
        for (s_idx, s) in series.iter().enumerate() {
            let color = PALETTE[s_idx % PALETTE.len()];
            chart
                .draw_series(
                    s.values
                        .iter()
                        .enumerate()
                        .filter_map(|(i, v)| v.map(|v| (i, v)))
                        .map(|(i, v)| {
                            let x0 = i as f64 - 0.4 + s_idx as f64 * width;
                            Rectangle::new([(x0, 0.0), (x0 + width, v)], color.filled())
                        }),
                )?
                .label(s.name.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }

        if series.len() > 1 {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
        }
        root.present()?;
        Ok(())
    }

    /// Lines over a fixed integer domain. Absent positions break the line
    /// instead of being drawn as zero.
    fn line_chart(
        &self,
        path: &Path,
        title: &str,
        domain: (u32, u32),
        x_label: &dyn Fn(u32) -> String,
        series: &[LineSeriesData],
    ) -> Result<(), RenderError> {
        let root = self.root(path)?;
        let y_max = upper_bound(series.iter().flat_map(|s| s.points.iter().map(|p| p.1)));
        let (lo, hi) = domain;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, (FONT, 22))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d((lo as f64 - 0.5)..(hi as f64 + 0.5), 0f64..y_max)?;

        let x_fmt = |x: &f64| {
            let rounded = x.round();
            if (x - rounded).abs() < 1e-6 && rounded >= lo as f64 && rounded <= hi as f64 {
                x_label(rounded as u32)
            } else {
                String::new()
            }
        };
        chart
            .configure_mesh()
            .x_labels((hi - lo + 1) as usize)
            .x_label_formatter(&x_fmt)
            .y_desc("Mean rentals")
            .draw()?;

        for (s_idx, s) in series.iter().enumerate() {
            let color = PALETTE[s_idx % PALETTE.len()];
            for run in contiguous_runs(&s.points) {
                chart.draw_series(LineSeries::new(
                    run.iter().map(|&(x, y)| (x as f64, y)),
                    color.stroke_width(2),
                ))?;
            }
            chart
                .draw_series(
                    s.points
                        .iter()
                        .map(|&(x, y)| Circle::new((x as f64, y), 3, color.filled())),
                )?
                .label(s.name.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }

        if series.len() > 1 {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
        }
        root.present()?;
        Ok(())
    }

    fn heatmap(&self, path: &Path, title: &str, matrix: &CorrelationMatrix) -> Result<(), RenderError> {
        let root = self.root(path)?;
        let labels: Vec<String> = matrix.variables.iter().map(|v| v.label().to_string()).collect();
        let n = labels.len() as f64;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, (FONT, 22))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(90)
            .build_cartesian_2d(-0.5f64..(n - 0.5), -0.5f64..(n - 0.5))?;

        let fmt = |x: &f64| category_label(&labels, *x);
        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(labels.len())
            .y_labels(labels.len())
            .x_label_formatter(&fmt)
            .y_label_formatter(&fmt)
            .draw()?;

        let cells: Vec<(usize, usize, Option<f64>)> = CorrelationVariable::ALL
            .iter()
            .enumerate()
            .flat_map(|(i, &a)| {
                CorrelationVariable::ALL
                    .iter()
                    .enumerate()
                    .map(move |(j, &b)| (i, j, matrix.get(a, b)))
            })
            .collect();

        chart.draw_series(cells.iter().map(|&(i, j, v)| {
            let color = v.map(diverging).unwrap_or(GRAY);
            let (x, y) = (j as f64, i as f64);
            Rectangle::new([(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)], color.filled())
        }))?;
        chart.draw_series(cells.iter().map(|&(i, j, v)| {
            let text = v.map(|v| format!("{v:.2}")).unwrap_or_else(|| "n/a".to_string());
            Text::new(text, (j as f64 - 0.12, i as f64), (FONT, 16).into_font())
        }))?;

        root.present()?;
        Ok(())
    }

    /// Stacked bars of tier percentages, one bar per group.
    fn stacked_percent(
        &self,
        path: &Path,
        title: &str,
        categories: &[String],
        rows: &[[f64; 3]],
    ) -> Result<(), RenderError> {
        let root = self.root(path)?;
        let n = categories.len().max(1);

        let mut chart = ChartBuilder::on(&root)
            .caption(title, (FONT, 22))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..100.0)?;

        let x_fmt = |x: &f64| category_label(categories, *x);
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&x_fmt)
            .y_desc("Share of days (%)")
            .draw()?;

        for tier in UsageTier::ALL {
            let t = tier.index();
            let color = TIER_COLORS[t];
            chart
                .draw_series(rows.iter().enumerate().map(|(i, row)| {
                    let base: f64 = row[..t].iter().sum();
                    let x = i as f64;
                    Rectangle::new([(x - 0.35, base), (x + 0.35, base + row[t])], color.filled())
                }))?
                .label(tier.label())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
        root.present()?;
        Ok(())
    }
}

/// Label of the category at integer position `x`, empty between positions.
fn category_label(categories: &[String], x: f64) -> String {
    let rounded = x.round();
    if (x - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    categories
        .get(rounded as usize)
        .cloned()
        .unwrap_or_default()
}

/// Y axis extent with headroom; 1.0 when there is nothing to show.
fn upper_bound(values: impl Iterator<Item = f64>) -> f64 {
    let max = values.filter(|v| v.is_finite()).fold(f64::NAN, f64::max);
    if max.is_nan() || max <= 0.0 {
        1.0
    } else {
        max * 1.1
    }
}

/// Split points into runs of consecutive x positions.
fn contiguous_runs(points: &[(u32, f64)]) -> Vec<&[(u32, f64)]> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=points.len() {
        if i == points.len() || points[i].0 != points[i - 1].0 + 1 {
            if start < i {
                runs.push(&points[start..i]);
            }
            start = i;
        }
    }
    runs
}

/// Blue for negative, red for positive correlation, white at zero.
fn diverging(value: f64) -> RGBColor {
    let t = value.clamp(-1.0, 1.0);
    let (target, weight) = if t >= 0.0 { (RED, t) } else { (BLUE, -t) };
    let lerp = |c: u8| (255.0 + (c as f64 - 255.0) * weight).round() as u8;
    RGBColor(lerp(target.0), lerp(target.1), lerp(target.2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Dashboard;
    use crate::app::ViewRequest;
    use crate::data::model::fixtures::sample_days;
    use crate::data::{Datasets, FilterSpec, Season};
    use crate::stats::Categorizer;

    fn out_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("bikeshare-charts-{}-{}", std::process::id(), name))
    }

    #[test]
    fn runs_break_at_gaps() {
        let points = [(0, 1.0), (1, 2.0), (3, 1.0), (4, 1.0), (7, 0.5)];
        let runs = contiguous_runs(&points);
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].len(), 2);
        assert_eq!(runs[2].to_vec(), vec![(7u32, 0.5)]);
        assert!(contiguous_runs(&[]).is_empty());
    }

    #[test]
    fn labels_only_at_integer_positions() {
        let labels = vec!["a".to_string(), "b".to_string()];
        assert_eq!(category_label(&labels, 1.0), "b");
        assert_eq!(category_label(&labels, 0.5), "");
        assert_eq!(category_label(&labels, 2.0), "");
        assert_eq!(category_label(&labels, -1.0), "");
    }

    #[test]
    fn diverging_scale_endpoints() {
        let rgb = |c: RGBColor| (c.0, c.1, c.2);
        assert_eq!(rgb(diverging(0.0)), (255, 255, 255));
        assert_eq!(rgb(diverging(1.0)), rgb(RED));
        assert_eq!(rgb(diverging(-1.0)), rgb(BLUE));
        assert_eq!(upper_bound([f64::NAN].into_iter()), 1.0);
        assert!((upper_bound([10.0, 20.0].into_iter()) - 22.0).abs() < 1e-9);
    }

    #[test]
    fn no_data_view_renders_placeholder() {
        let renderer = ChartRenderer::new(out_dir("placeholder"));
        let written = renderer
            .render(&ViewOutcome::NoData {
                view: ViewKind::UsageCategorization,
            })
            .unwrap();
        assert_eq!(written.len(), 1);
        let svg = std::fs::read_to_string(&written[0]).unwrap();
        assert!(svg.contains("No data for the current filters"));
    }

    #[test]
    fn ready_views_write_one_file_per_chart() {
        let mut daily = sample_days();
        Categorizer::attach(&mut daily);
        let data = Datasets {
            daily,
            hourly: Vec::new(),
        };
        let renderer = ChartRenderer::new(out_dir("ready"));

        let weather = Dashboard::evaluate(&data, &ViewRequest::WeatherImpact(FilterSpec::default()));
        let written = renderer.render(&weather).unwrap();
        assert_eq!(written.len(), 3);
        assert!(written.iter().all(|p| p.exists()));

        let temporal = Dashboard::evaluate(
            &data,
            &ViewKind::TemporalPatterns.request(FilterSpec::default().with_seasons([Season::Fall])),
        );
        let written = renderer.render(&temporal).unwrap();
        assert_eq!(written.len(), 3);
        let hourly = std::fs::read_to_string(&written[0]).unwrap();
        assert!(hourly.contains("No data for the current filters"));
    }
}
