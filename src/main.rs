//! Stand-alone host for the KPI circle: a window that feeds readings to the
//! widget, forwards the cursor to it and draws its tooltips.

use std::cell::RefCell;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use pixels::{Pixels, SurfaceTexture};
use rand::Rng;
use rusttype::{Font, Scale};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use kpi_circle::format::DefaultFormatterFactory;
use kpi_circle::host::{PrimitiveValue, TooltipHideOptions, TooltipShowOptions};
use kpi_circle::raster::{self, Canvas, Renderer};
use kpi_circle::{
    Color, ConstructorOptions, Container, DataView, Easing, GaugeWidget, TooltipDataItem,
    TooltipService, UpdateOptions, Viewport, VisualHost, WidgetConfig,
};

const FALLBACK_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\segoeuib.ttf",
];

#[derive(Parser, Debug)]
#[command(name = "kpi-circle", about = "Radial KPI gauge: target, forecast and actual")]
struct Args {
    #[arg(long, default_value_t = 100.0)]
    target: f64,
    #[arg(long, default_value_t = 80.0)]
    forecast: f64,
    #[arg(long, default_value_t = 50.0)]
    actual: f64,

    /// Data view JSON to start from; readings replace its first three series.
    #[arg(long)]
    data: Option<PathBuf>,
    /// Format string for the generated columns.
    #[arg(long, default_value = "#,0")]
    format: String,

    /// Generate a new random reading every few seconds.
    #[arg(long, conflicts_with = "stdin")]
    random: bool,
    /// Read `target forecast actual` lines from stdin.
    #[arg(long)]
    stdin: bool,

    #[arg(long, default_value_t = 600)]
    width: u32,
    #[arg(long, default_value_t = 400)]
    height: u32,
    #[arg(long, default_value_t = 60.0, value_parser = positive_framerate)]
    max_framerate: f64,

    #[arg(long, default_value_t = 2000)]
    duration_ms: u64,
    /// Ease the opening sweep instead of running it linearly.
    #[arg(long)]
    cubic: bool,

    /// TrueType/OpenType font for the label and tooltips.
    #[arg(long)]
    font: Option<PathBuf>,
}

fn positive_framerate(value: &str) -> Result<f64, String> {
    match value.parse::<f64>() {
        Ok(fps) if fps.is_finite() && fps > 0.0 => Ok(fps),
        Ok(_) => Err("frame rate must be a positive number".to_string()),
        Err(err) => Err(err.to_string()),
    }
}

// ============================================================================
// TOOLTIP OVERLAY
// ============================================================================

struct ActiveTooltip {
    lines: Vec<String>,
    at: [f64; 2],
}

/// Tooltip service that keeps the last shown tooltip for the frame painter.
#[derive(Default)]
struct OverlayTooltips {
    active: RefCell<Option<ActiveTooltip>>,
}

impl OverlayTooltips {
    fn lines(items: &[TooltipDataItem]) -> Vec<String> {
        let header = items.iter().find_map(|item| item.header.clone());
        header
            .into_iter()
            .chain(
                items
                    .iter()
                    .map(|item| format!("{}: {}", item.display_name, item.value)),
            )
            .collect()
    }

    fn paint(&self, canvas: &mut Canvas, font: &Font) {
        let active = self.active.borrow();
        let Some(tooltip) = active.as_ref() else {
            return;
        };
        let scale = Scale::uniform(14.0);
        let line_height = 18;
        let padding = 6;
        let width = tooltip
            .lines
            .iter()
            .map(|line| raster::text_width(line, font, scale).ceil() as i32)
            .max()
            .unwrap_or(0)
            + padding * 2;
        let height = tooltip.lines.len() as i32 * line_height + padding * 2;

        // keep the box inside the frame
        let mut x = tooltip.at[0] as i32 + 12;
        let mut y = tooltip.at[1] as i32 + 12;
        if x + width > canvas.width() as i32 {
            x = (tooltip.at[0] as i32 - 12 - width).max(0);
        }
        if y + height > canvas.height() as i32 {
            y = (tooltip.at[1] as i32 - 12 - height).max(0);
        }

        raster::fill_rect(canvas, x, y, width, height, Color::new(0x33, 0x33, 0x33), 0.9);
        raster::stroke_rect(canvas, x, y, width, height, Color::new(0x99, 0x99, 0x99));
        for (i, line) in tooltip.lines.iter().enumerate() {
            let baseline = y + padding + (i as i32 + 1) * line_height - 4;
            raster::draw_text(
                canvas,
                (x + padding) as f64,
                baseline as f64,
                line,
                font,
                scale,
                Color::WHITE,
            );
        }
    }
}

impl TooltipService for OverlayTooltips {
    fn show(&self, options: TooltipShowOptions<'_>) {
        info!(x = options.coordinates[0], y = options.coordinates[1], items = ?options.data_items, "tooltip shown");
        *self.active.borrow_mut() = Some(ActiveTooltip {
            lines: Self::lines(options.data_items),
            at: options.coordinates,
        });
    }

    fn move_to(&self, options: TooltipShowOptions<'_>) {
        let mut active = self.active.borrow_mut();
        match active.as_mut() {
            Some(tooltip) => tooltip.at = options.coordinates,
            None => {
                *active = Some(ActiveTooltip {
                    lines: Self::lines(options.data_items),
                    at: options.coordinates,
                })
            }
        }
    }

    fn hide(&self, options: TooltipHideOptions) {
        debug!(immediately = options.immediately, "tooltip hidden");
        *self.active.borrow_mut() = None;
    }
}

// ============================================================================
// READING SOURCES
// ============================================================================

type Reading = [f64; 3];

fn spawn_random_source() -> Receiver<Reading> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let mut rng = rand::rng();
        loop {
            let target = rng.random_range(50.0..150.0);
            let reading = [
                target,
                rng.random_range(0.0..target * 1.3),
                rng.random_range(0.0..target * 1.3),
            ];
            if sender.send(reading).is_err() {
                break;
            }
            thread::sleep(Duration::from_secs(4));
        }
    });
    receiver
}

fn spawn_stdin_source() -> Receiver<Reading> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let values: Vec<f64> = line
                .split_whitespace()
                .filter_map(|field| field.parse().ok())
                .collect();
            match values.as_slice() {
                [target, forecast, actual] => {
                    if sender.send([*target, *forecast, *actual]).is_err() {
                        break;
                    }
                }
                _ => warn!(%line, "expected `target forecast actual`"),
            }
        }
    });
    receiver
}

/// Replaces the first value of the first three series.
fn with_reading(base: &DataView, reading: Reading) -> DataView {
    let mut view = base.clone();
    for (series, value) in view.categorical.values.iter_mut().zip(reading) {
        series.values = vec![PrimitiveValue::Number(value)];
    }
    view
}

fn load_label_font(path: Option<&Path>) -> Option<Font<'static>> {
    if let Some(path) = path {
        match raster::load_font(path) {
            Ok(font) => return Some(font),
            Err(err) => warn!(%err, "falling back to system fonts"),
        }
    }
    FALLBACK_FONTS
        .iter()
        .find_map(|candidate| raster::load_font(Path::new(candidate)).ok())
}

// ============================================================================
// MAIN
// ============================================================================

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kpi_circle=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let base_view = match &args.data {
        Some(path) => DataView::from_json(&std::fs::read_to_string(path)?)?,
        None => DataView::from_values(
            ["Target", "Forecast", "Actual"],
            [args.target, args.forecast, args.actual],
            Some(&args.format),
        ),
    };

    let receiver = if args.random {
        Some(spawn_random_source())
    } else if args.stdin {
        Some(spawn_stdin_source())
    } else {
        None
    };

    let config = WidgetConfig::builder()
        .animation_duration_ms(args.duration_ms)
        .easing(if args.cubic {
            Easing::CubicInOut
        } else {
            Easing::Linear
        })
        .build();
    let renderer = Renderer::new(
        load_label_font(args.font.as_deref()),
        config.background_color,
    );

    let event_loop = EventLoop::new()?;
    let window = WindowBuilder::new()
        .with_title("KPI circle")
        .with_inner_size(LogicalSize::new(args.width as f64, args.height as f64))
        .build(&event_loop)?;
    let window = std::sync::Arc::new(window);

    let size = window.inner_size();
    let mut fb_width = size.width as usize;
    let mut fb_height = size.height as usize;
    let surface_texture = SurfaceTexture::new(size.width, size.height, &window);
    let mut pixels = Pixels::new(size.width, size.height, surface_texture)?;

    let tooltips = Rc::new(OverlayTooltips::default());
    let mut widget = GaugeWidget::with_config(
        ConstructorOptions {
            element: Container {
                origin: (0.0, 0.0),
                width: fb_width as f64,
                height: fb_height as f64,
            },
            host: VisualHost {
                tooltip_service: tooltips.clone(),
                value_formatter: Rc::new(DefaultFormatterFactory),
            },
        },
        config,
    );

    let mut current_view = base_view.clone();
    let viewport = |w: usize, h: usize| Viewport::new(w as f64, h as f64);
    widget.update(&UpdateOptions::new(
        viewport(fb_width, fb_height),
        current_view.clone(),
    ));

    let window_clone = window.clone();
    let frame_duration = Duration::from_secs_f64(1.0 / args.max_framerate);
    let mut last_frame = Instant::now();
    let mut last_tick = Instant::now();

    event_loop.run(move |event, window_target| {
        window_target.set_control_flow(ControlFlow::Poll);
        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    fb_width = new_size.width as usize;
                    fb_height = new_size.height as usize;
                    let _ = pixels.resize_buffer(new_size.width, new_size.height);
                    let _ = pixels.resize_surface(new_size.width, new_size.height);
                    widget.update(&UpdateOptions::new(
                        viewport(fb_width, fb_height),
                        current_view.clone(),
                    ));
                }
                WindowEvent::CursorMoved { position, .. } => {
                    widget.surface_mut().pointer_moved((position.x, position.y));
                }
                WindowEvent::CursorLeft { .. } => {
                    widget.surface_mut().pointer_left();
                }
                WindowEvent::RedrawRequested => {
                    if let Some(ref receiver) = receiver {
                        while let Ok(reading) = receiver.try_recv() {
                            info!(?reading, "new reading");
                            current_view = with_reading(&base_view, reading);
                            widget.update(&UpdateOptions::new(
                                viewport(fb_width, fb_height),
                                current_view.clone(),
                            ));
                        }
                    }

                    let now = Instant::now();
                    widget.advance(now - last_tick);
                    last_tick = now;

                    let frame = pixels.frame_mut();
                    let mut canvas = Canvas::new(frame, fb_width, fb_height);
                    renderer.render(&mut canvas, widget.surface());
                    if let Some(font) = renderer.font() {
                        tooltips.paint(&mut canvas, font);
                    }
                    if let Err(err) = pixels.render() {
                        warn!(%err, "frame presentation failed");
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                if last_frame.elapsed() >= frame_duration {
                    window_clone.request_redraw();
                    last_frame = Instant::now();
                }
            }
            _ => {}
        }
    })?;

    Ok(())
}
