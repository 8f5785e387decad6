//! Radial "KPI circle" gauge widget.
//!
//! Draws a fixed 300° target ring with forecast and actual rings nested
//! inside it, a percentage label in the middle and the same tooltip on every
//! shape. The host supplies the data view, the tooltip service and value
//! formatting through [`host`]; the widget builds a retained [`Surface`] that
//! the host steps with [`GaugeWidget::advance`] and paints with
//! [`raster::Renderer`] or its own backend.

pub mod animation;
pub mod config;
pub mod error;
pub mod format;
pub mod host;
pub mod raster;
pub mod surface;
pub mod tooltip;

pub use animation::{Easing, Transition};
pub use config::{Color, VisualSettings, WidgetConfig};
pub use error::{Error, Result};
pub use host::{
    ConstructorOptions, Container, DataView, TooltipDataItem, TooltipService, UpdateOptions,
    ValueFormatterFactory, Viewport, VisualHost,
};
pub use surface::{ShapeId, Surface};

use std::f64::consts::PI;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, warn};

use config::{EnumerateVisualObjectInstancesOptions, VisualObjectInstance, DEFAULT_SETTINGS};
use format::{js_number, round2};
use host::PrimitiveValue;
use surface::{ArcShape, ShapeKind, TextAnchor, TextShape};
use tooltip::{attach_tooltip, build_tooltips};

// ============================================================================
// READING & ANGLES
// ============================================================================

/// Sweep of a value that meets or exceeds the target.
pub const MAX_SWEEP: f64 = 2.0 * PI;
/// Sweep of a value exactly at target (300°).
pub const THRESHOLD_SWEEP: f64 = 5.0 * PI / 3.0;
/// The target ring is a fixed reference, never derived from the reading.
pub const TARGET_SWEEP: f64 = 300.0 * (PI / 180.0);

/// The three numbers one update works from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressReading {
    pub target: f64,
    pub forecast: f64,
    pub actual: f64,
}

impl ProgressReading {
    pub const fn new(target: f64, forecast: f64, actual: f64) -> Self {
        Self {
            target,
            forecast,
            actual,
        }
    }

    /// Reads the first value of the first three series, in
    /// target/forecast/actual order. Missing series read as `NaN`.
    pub fn from_data_view(data_view: Option<&DataView>) -> Self {
        let series = |i: usize| {
            data_view
                .and_then(|view| view.categorical.values.get(i))
                .map_or(f64::NAN, |column| coerce_number(&column.values))
        };
        Self::new(series(0), series(1), series(2))
    }

    pub fn sweep_angles(&self) -> SweepAngles {
        SweepAngles {
            target: TARGET_SWEEP,
            forecast: sweep_angle(self.forecast, self.target),
            actual: sweep_angle(self.actual, self.target),
        }
    }

    /// `actual / target` as a percentage rounded to two decimals.
    pub fn display_percentage(&self) -> f64 {
        round2(self.actual * 100.0 / self.target)
    }
}

/// Full circle once `value` reaches `target`, otherwise linear in `value`
/// and reaching 300° at `target`. Not guarded against a zero target.
pub fn sweep_angle(value: f64, target: f64) -> f64 {
    if value >= target {
        MAX_SWEEP
    } else {
        (THRESHOLD_SWEEP / target) * value
    }
}

/// Numeric coercion of a series' value list: empty reads as 0, a single
/// value reads as its number, anything else is `NaN`.
pub fn coerce_number(values: &[PrimitiveValue]) -> f64 {
    match values {
        [] => 0.0,
        [single] => match single {
            PrimitiveValue::Number(n) => *n,
            PrimitiveValue::Null => 0.0,
            PrimitiveValue::Bool(_) => f64::NAN,
            PrimitiveValue::Text(s) => parse_number(s),
        },
        _ => f64::NAN,
    }
}

fn parse_number(s: &str) -> f64 {
    let s = s.trim();
    match s {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if matches!(s.get(..2), Some("0x" | "0X" | "0o" | "0O" | "0b" | "0B")) => {
            parse_radix_literal(s)
        }
        _ if s
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')) =>
        {
            s.parse().unwrap_or(f64::NAN)
        }
        _ => f64::NAN,
    }
}

/// Unsigned `0x`/`0o`/`0b` literals, case-insensitive prefix.
fn parse_radix_literal(s: &str) -> f64 {
    let (prefix, digits) = s.split_at(2);
    let radix = match prefix {
        "0x" | "0X" => 16,
        "0o" | "0O" => 8,
        "0b" | "0B" => 2,
        _ => return f64::NAN,
    };
    if digits.is_empty() {
        return f64::NAN;
    }
    digits
        .chars()
        .try_fold(0.0, |acc: f64, c| {
            c.to_digit(radix).map(|digit| acc * radix as f64 + digit as f64)
        })
        .unwrap_or(f64::NAN)
}

/// End angles in radians, all starting from 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepAngles {
    pub target: f64,
    pub forecast: f64,
    pub actual: f64,
}

// ============================================================================
// GEOMETRY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingBand {
    pub inner: f64,
    pub outer: f64,
}

/// Ring radii for a viewport. The forecast band is configured with its inner
/// radius larger than its outer one; it rasterizes as the 0.7R..0.8R band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingGeometry {
    pub center: (f64, f64),
    pub outer_radius: f64,
    pub target: RingBand,
    pub forecast: RingBand,
    pub actual: RingBand,
}

impl RingGeometry {
    pub fn for_viewport(viewport: Viewport) -> Self {
        let r = viewport.width / 3.0;
        Self {
            center: (viewport.width / 2.0, viewport.height / 2.0),
            outer_radius: r,
            target: RingBand {
                inner: r * 0.9,
                outer: r,
            },
            forecast: RingBand {
                inner: r * 0.8,
                outer: r * 0.7,
            },
            actual: RingBand {
                inner: r * 0.6,
                outer: r * 0.5,
            },
        }
    }
}

// ============================================================================
// RENDER PASS
// ============================================================================

/// Everything one `update` derived, handed back to the caller instead of
/// being kept on the widget.
#[derive(Debug, Clone)]
pub struct RenderPass {
    pub reading: ProgressReading,
    pub angles: SweepAngles,
    pub percentage: f64,
    pub geometry: RingGeometry,
    pub tooltips: Rc<[TooltipDataItem]>,
    /// Target, forecast and actual arcs, in paint order.
    pub arcs: [ShapeId; 3],
    pub label: ShapeId,
}

impl RenderPass {
    pub fn label_text(&self) -> String {
        label_text(self.percentage)
    }
}

fn label_text(percentage: f64) -> String {
    format!("{} %", js_number(percentage))
}

// ============================================================================
// WIDGET
// ============================================================================

pub struct GaugeWidget {
    host: VisualHost,
    surface: Surface,
    settings: Option<VisualSettings>,
    config: WidgetConfig,
}

impl GaugeWidget {
    pub fn new(options: ConstructorOptions) -> Self {
        Self::with_config(options, WidgetConfig::default())
    }

    pub fn with_config(options: ConstructorOptions, config: WidgetConfig) -> Self {
        Self {
            surface: Surface::new(&options.element),
            host: options.host,
            settings: None,
            config,
        }
    }

    /// Redraws the gauge for new data or a new viewport. Never fails: bad
    /// input shows up as degenerate arcs and a `NaN`/`Infinity` label.
    pub fn update(&mut self, options: &UpdateOptions) -> RenderPass {
        let data_view = options.data_views.first();
        if data_view.is_none() {
            warn!("update without a data view");
        }

        let settings = VisualSettings::parse(data_view);
        let reading = ProgressReading::from_data_view(data_view);
        let angles = reading.sweep_angles();
        let percentage = reading.display_percentage();
        debug!(?reading, ?angles, percentage, "gauge update");

        self.surface.resize(options.viewport);
        let geometry = RingGeometry::for_viewport(options.viewport);
        let tooltips: Rc<[TooltipDataItem]> =
            build_tooltips(data_view, self.host.value_formatter.as_ref(), percentage).into();

        self.surface.remove_arcs();
        let circle = &settings.kpi_circle;
        let rings = [
            (geometry.target, angles.target, circle.fill_target.as_str()),
            (geometry.forecast, angles.forecast, circle.fill_forecasted.as_str()),
            (geometry.actual, angles.actual, circle.fill_actual.as_str()),
        ];
        let arcs = rings.map(|(band, end_angle, fill)| {
            self.draw_ring(band, geometry.center, end_angle, Color::from_fill(fill), &tooltips)
        });

        self.surface.remove_text();
        let label = self.surface.append(ShapeKind::Text(TextShape {
            text: label_text(percentage),
            x: options.viewport.width / 2.0,
            y: options.viewport.height / 2.0,
            font_family: self.config.label_font_family.clone(),
            font_size: circle.font_size,
            fill: self.config.label_color,
            anchor: TextAnchor::Middle,
            bold: self.config.label_bold,
        }));
        attach_tooltip(&mut self.surface, label, &self.host.tooltip_service, &tooltips);

        self.settings = Some(settings);

        RenderPass {
            reading,
            angles,
            percentage,
            geometry,
            tooltips,
            arcs,
            label,
        }
    }

    fn draw_ring(
        &mut self,
        band: RingBand,
        center: (f64, f64),
        end_angle: f64,
        fill: Color,
        tooltips: &Rc<[TooltipDataItem]>,
    ) -> ShapeId {
        let id = self.surface.append(ShapeKind::Arc(ArcShape {
            inner_radius: band.inner,
            outer_radius: band.outer,
            start_angle: 0.0,
            end_angle,
            fill,
            translate: center,
        }));
        attach_tooltip(&mut self.surface, id, &self.host.tooltip_service, tooltips);

        let sweep = Transition::new(
            0.0,
            end_angle * (180.0 / PI),
            self.config.animation_duration(),
        )
        .with_easing(self.config.easing);
        self.surface.transition_end_angle(id, sweep);
        id
    }

    /// Steps the opening animation. Returns whether it is still running.
    pub fn advance(&mut self, dt: Duration) -> bool {
        self.surface.advance(dt)
    }

    pub fn enumerate_object_instances(
        &self,
        options: &EnumerateVisualObjectInstancesOptions,
    ) -> Vec<VisualObjectInstance> {
        self.settings
            .as_ref()
            .unwrap_or_else(|| &*DEFAULT_SETTINGS)
            .enumerate_object_instances(&options.object_name)
    }

    pub fn settings(&self) -> Option<&VisualSettings> {
        self.settings.as_ref()
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }
}
