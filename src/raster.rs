//! Software rasterizer that paints a [`Surface`] into an RGBA8 frame, the
//! layout `pixels` hands out.

use std::f64::consts::TAU;
use std::path::Path;

use rusttype::{point, Font, PositionedGlyph, Scale};
use tracing::{debug, warn};

use crate::config::Color;
use crate::surface::{clock_angle, ArcShape, ShapeKind, Surface, TextAnchor, TextShape};
use crate::{Error, Result};

// ============================================================================
// CANVAS
// ============================================================================

pub struct Canvas<'a> {
    frame: &'a mut [u8],
    width: usize,
    height: usize,
}

impl<'a> Canvas<'a> {
    pub fn new(frame: &'a mut [u8], width: usize, height: usize) -> Self {
        let height = height.min(frame.len() / (width.max(1) * 4));
        Self {
            frame,
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self, color: Color) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&[color.r, color.g, color.b, 0xff]);
        }
    }

    /// Alpha-blends one pixel; out-of-bounds writes are dropped.
    pub fn blend(&mut self, x: i32, y: i32, color: Color, alpha: f32) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let idx = (y as usize * self.width + x as usize) * 4;
        let a = alpha.clamp(0.0, 1.0);
        let mix = |src: u8, dst: u8| (src as f32 * a + dst as f32 * (1.0 - a)).round() as u8;
        let out = [
            mix(color.r, self.frame[idx]),
            mix(color.g, self.frame[idx + 1]),
            mix(color.b, self.frame[idx + 2]),
            0xff,
        ];
        self.frame[idx..idx + 4].copy_from_slice(&out);
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y * self.width + x) * 4;
        Some(Color::new(
            self.frame[idx],
            self.frame[idx + 1],
            self.frame[idx + 2],
        ))
    }
}

// ============================================================================
// FONTS
// ============================================================================

pub fn load_font(path: &Path) -> Result<Font<'static>> {
    let data = std::fs::read(path).map_err(|source| Error::FontRead {
        path: path.to_path_buf(),
        source,
    })?;
    Font::try_from_vec(data).ok_or_else(|| Error::InvalidFont(path.to_path_buf()))
}

/// Horizontal advance of a laid-out line.
pub fn text_width(text: &str, font: &Font, scale: Scale) -> f32 {
    font.layout(text, scale, point(0.0, 0.0))
        .last()
        .map(|glyph| glyph.position().x + glyph.unpositioned().h_metrics().advance_width)
        .unwrap_or(0.0)
}

// ============================================================================
// RENDERER
// ============================================================================

pub struct Renderer {
    font: Option<Font<'static>>,
    background: Color,
}

impl Renderer {
    pub fn new(font: Option<Font<'static>>, background: Color) -> Self {
        if font.is_none() {
            warn!("no label font available, text will not be drawn");
        }
        Self { font, background }
    }

    pub fn font(&self) -> Option<&Font<'static>> {
        self.font.as_ref()
    }

    /// Paints every shape in order over a cleared background.
    pub fn render(&self, canvas: &mut Canvas, surface: &Surface) {
        canvas.clear(self.background);
        for (id, shape) in surface.shapes() {
            match shape {
                ShapeKind::Arc(arc) => fill_arc(canvas, arc),
                ShapeKind::Text(text) => match &self.font {
                    Some(font) => draw_text_shape(canvas, text, font),
                    None => debug!(?id, "skipping text without a font"),
                },
            }
        }
    }
}

// ============================================================================
// DRAWING PRIMITIVES
// ============================================================================

/// Antialiased annular sector.
pub fn fill_arc(canvas: &mut Canvas, arc: &ArcShape) {
    if arc.start_angle.is_nan() || arc.end_angle.is_nan() {
        return;
    }
    let (lo, hi) = if arc.start_angle <= arc.end_angle {
        (arc.start_angle, arc.end_angle)
    } else {
        (arc.end_angle, arc.start_angle)
    };
    let span = hi - lo;
    if span <= 0.0 {
        return;
    }
    let full = span >= TAU;
    let (r_in, r_out) = arc.radial_band();
    if !r_out.is_finite() || r_out <= 0.0 {
        return;
    }

    let (cx, cy) = arc.translate;
    let min_x = ((cx - r_out).floor() as i32 - 1).max(0);
    let max_x = ((cx + r_out).ceil() as i32 + 1).min(canvas.width() as i32 - 1);
    let min_y = ((cy - r_out).floor() as i32 - 1).max(0);
    let max_y = ((cy + r_out).ceil() as i32 + 1).min(canvas.height() as i32 - 1);

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            let dist = dx.hypot(dy);

            let radial_alpha =
                (r_out - dist + 0.5).clamp(0.0, 1.0) * (dist - r_in + 0.5).clamp(0.0, 1.0);
            if radial_alpha <= 0.0 {
                continue;
            }

            let angular_alpha = if full {
                1.0
            } else {
                let rel = (clock_angle(dx, dy) - lo).rem_euclid(TAU);
                if rel <= span {
                    1.0
                } else {
                    // distance to the nearest edge, in pixels along the arc
                    let outside = (rel - span).min(TAU - rel);
                    (1.0 - outside * dist).clamp(0.0, 1.0)
                }
            };

            let alpha = radial_alpha * angular_alpha;
            if alpha > 0.01 {
                canvas.blend(x, y, arc.fill, alpha as f32);
            }
        }
    }
}

fn draw_text_shape(canvas: &mut Canvas, text: &TextShape, font: &Font) {
    let scale = Scale::uniform(text.font_size as f32);
    let width = text_width(&text.text, font, scale) as f64;
    let left = match text.anchor {
        TextAnchor::Start => text.x,
        TextAnchor::Middle => text.x - width / 2.0,
        TextAnchor::End => text.x - width,
    };
    draw_text(canvas, left, text.y, &text.text, font, scale, text.fill);
    if text.bold {
        // faux bold: overstrike one pixel to the right
        draw_text(canvas, left + 1.0, text.y, &text.text, font, scale, text.fill);
    }
}

/// Draws a line of text with its baseline starting at `(x, y)`.
pub fn draw_text(
    canvas: &mut Canvas,
    x: f64,
    y: f64,
    text: &str,
    font: &Font,
    scale: Scale,
    color: Color,
) {
    let glyphs: Vec<PositionedGlyph> = font
        .layout(text, scale, point(x as f32, y as f32))
        .collect();
    for glyph in glyphs {
        if let Some(bb) = glyph.pixel_bounding_box() {
            glyph.draw(|gx, gy, v| {
                canvas.blend(bb.min.x + gx as i32, bb.min.y + gy as i32, color, v);
            });
        }
    }
}

pub fn fill_rect(canvas: &mut Canvas, x: i32, y: i32, w: i32, h: i32, color: Color, alpha: f32) {
    for py in y..y + h {
        for px in x..x + w {
            canvas.blend(px, py, color, alpha);
        }
    }
}

pub fn stroke_rect(canvas: &mut Canvas, x: i32, y: i32, w: i32, h: i32, color: Color) {
    fill_rect(canvas, x, y, w, 1, color, 1.0);
    fill_rect(canvas, x, y + h - 1, w, 1, color, 1.0);
    fill_rect(canvas, x, y, 1, h, color, 1.0);
    fill_rect(canvas, x + w - 1, y, 1, h, color, 1.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Container;
    use std::f64::consts::PI;

    const RED: Color = Color::new(0xff, 0x00, 0x00);

    fn frame(width: usize, height: usize) -> Vec<u8> {
        vec![0; width * height * 4]
    }

    fn arc(end_angle: f64) -> ArcShape {
        ArcShape {
            inner_radius: 30.0,
            outer_radius: 40.0,
            start_angle: 0.0,
            end_angle,
            fill: RED,
            translate: (50.0, 50.0),
        }
    }

    #[test]
    fn test_blend_and_bounds() {
        let mut buf = frame(4, 4);
        let mut canvas = Canvas::new(&mut buf, 4, 4);
        canvas.clear(Color::WHITE);
        canvas.blend(1, 1, Color::BLACK, 1.0);
        canvas.blend(-1, 1, Color::BLACK, 1.0);
        canvas.blend(9, 9, Color::BLACK, 1.0);
        assert_eq!(canvas.pixel(1, 1), Some(Color::BLACK));
        assert_eq!(canvas.pixel(0, 0), Some(Color::WHITE));
        assert_eq!(canvas.pixel(4, 0), None);
    }

    #[test]
    fn test_quarter_arc_covers_only_its_sweep() {
        let mut buf = frame(100, 100);
        let mut canvas = Canvas::new(&mut buf, 100, 100);
        canvas.clear(Color::WHITE);
        fill_arc(&mut canvas, &arc(PI / 2.0));

        // 1:30 position, middle of the band
        let r = 35.0 / 2f64.sqrt();
        assert_eq!(
            canvas.pixel((50.0 + r) as usize, (50.0 - r) as usize),
            Some(RED)
        );
        // 7:30 position is outside the sweep
        assert_eq!(
            canvas.pixel((50.0 - r) as usize, (50.0 + r) as usize),
            Some(Color::WHITE)
        );
        // center hole
        assert_eq!(canvas.pixel(50, 50), Some(Color::WHITE));
    }

    #[test]
    fn test_nan_arc_draws_nothing() {
        let mut buf = frame(100, 100);
        let mut canvas = Canvas::new(&mut buf, 100, 100);
        canvas.clear(Color::WHITE);
        fill_arc(&mut canvas, &arc(f64::NAN));
        for y in 0..100 {
            for x in 0..100 {
                assert_eq!(canvas.pixel(x, y), Some(Color::WHITE));
            }
        }
    }

    #[test]
    fn test_renderer_paints_surface() {
        let mut surface = Surface::new(&Container {
            origin: (0.0, 0.0),
            width: 100.0,
            height: 100.0,
        });
        surface.append(ShapeKind::Arc(arc(TAU)));

        let mut buf = frame(100, 100);
        let mut canvas = Canvas::new(&mut buf, 100, 100);
        Renderer::new(None, Color::WHITE).render(&mut canvas, &surface);

        // full ring: 9 o'clock is painted too
        assert_eq!(canvas.pixel(15, 50), Some(RED));
        assert_eq!(canvas.pixel(0, 0), Some(Color::WHITE));
    }

    #[test]
    fn test_missing_font_file() {
        let err = load_font(Path::new("/nonexistent/font.ttf")).unwrap_err();
        assert!(matches!(err, Error::FontRead { .. }));
    }
}
