//! Retained drawing surface: the scene the widget builds on every update.
//!
//! Shapes are kept in paint order. The surface owns pointer dispatch
//! (hit testing and over/move/out bookkeeping) and the frame scheduler that
//! steps arc transitions. Rasterization lives in [`crate::raster`].

use std::collections::HashMap;
use std::f64::consts::TAU;
use std::rc::Rc;
use std::time::Duration;

use tracing::trace;

use crate::animation::Transition;
use crate::config::Color;
use crate::host::{Container, Viewport};

// ============================================================================
// SHAPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(u64);

/// An annular sector. Angles are radians measured clockwise from 12 o'clock.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcShape {
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub start_angle: f64,
    pub end_angle: f64,
    pub fill: Color,
    pub translate: (f64, f64),
}

impl ArcShape {
    /// Radii actually covered, whichever order they were configured in.
    pub fn radial_band(&self) -> (f64, f64) {
        let r0 = self.inner_radius.max(0.0);
        let r1 = self.outer_radius.max(0.0);
        (r0.min(r1), r0.max(r1))
    }

    /// Whether a surface-local point falls on the drawn arc.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let dx = x - self.translate.0;
        let dy = y - self.translate.1;
        let dist = dx.hypot(dy);
        let (lo, hi) = self.radial_band();
        if !(lo..=hi).contains(&dist) {
            return false;
        }
        contains_angle(clock_angle(dx, dy), self.start_angle, self.end_angle)
    }
}

/// Angle of an offset from the center, clockwise from 12 o'clock, in `[0, 2π)`.
pub fn clock_angle(dx: f64, dy: f64) -> f64 {
    dx.atan2(-dy).rem_euclid(TAU)
}

/// Whether `angle` lies on the sweep from `start` to `end` (either direction).
/// Sweeps of a full turn or more cover everything; `NaN` sweeps cover nothing.
pub fn contains_angle(angle: f64, start: f64, end: f64) -> bool {
    if start.is_nan() || end.is_nan() {
        return false;
    }
    let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
    let span = hi - lo;
    if span >= TAU {
        return true;
    }
    if span <= 0.0 {
        return false;
    }
    (angle - lo).rem_euclid(TAU) <= span
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAnchor {
    Start,
    #[default]
    Middle,
    End,
}

/// A single line of text positioned by its baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct TextShape {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font_family: String,
    pub font_size: f64,
    pub fill: Color,
    pub anchor: TextAnchor,
    pub bold: bool,
}

impl TextShape {
    /// Approximate box `(left, top, right, bottom)` used for hit testing.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let width = self.text.chars().count() as f64 * self.font_size * 0.6;
        let left = match self.anchor {
            TextAnchor::Start => self.x,
            TextAnchor::Middle => self.x - width / 2.0,
            TextAnchor::End => self.x - width,
        };
        let top = self.y - self.font_size * 0.8;
        let bottom = self.y + self.font_size * 0.2;
        (left, top, left + width, bottom)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        let (left, top, right, bottom) = self.bounds();
        x >= left && x <= right && y >= top && y <= bottom
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    Arc(ArcShape),
    Text(TextShape),
}

impl ShapeKind {
    fn contains(&self, x: f64, y: f64) -> bool {
        match self {
            ShapeKind::Arc(arc) => arc.contains(x, y),
            ShapeKind::Text(text) => text.contains(x, y),
        }
    }
}

// ============================================================================
// POINTER EVENTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerEventKind {
    Over,
    Move,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub shape: ShapeId,
    /// Pointer position relative to the surface's top-left corner.
    pub local: (f64, f64),
}

pub type Handler = Rc<dyn Fn(&PointerEvent)>;

struct Node {
    id: ShapeId,
    kind: ShapeKind,
    handlers: HashMap<PointerEventKind, Handler>,
    transition: Option<Transition>,
}

// ============================================================================
// SURFACE
// ============================================================================

pub struct Surface {
    origin: (f64, f64),
    width: f64,
    height: f64,
    nodes: Vec<Node>,
    next_id: u64,
    hovered: Option<ShapeId>,
}

impl Surface {
    pub fn new(container: &Container) -> Self {
        Self {
            origin: container.origin,
            width: container.width,
            height: container.height,
            nodes: Vec::new(),
            next_id: 0,
            hovered: None,
        }
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.width = viewport.width;
        self.height = viewport.height;
    }

    /// Moves the surface within the client area.
    pub fn set_origin(&mut self, origin: (f64, f64)) {
        self.origin = origin;
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn append(&mut self, kind: ShapeKind) -> ShapeId {
        let id = ShapeId(self.next_id);
        self.next_id += 1;
        self.nodes.push(Node {
            id,
            kind,
            handlers: HashMap::new(),
            transition: None,
        });
        id
    }

    /// Removes every arc. Removed shapes get no `Out` event.
    pub fn remove_arcs(&mut self) {
        self.remove_where(|kind| matches!(kind, ShapeKind::Arc(_)));
    }

    pub fn remove_text(&mut self) {
        self.remove_where(|kind| matches!(kind, ShapeKind::Text(_)));
    }

    fn remove_where(&mut self, predicate: impl Fn(&ShapeKind) -> bool) {
        self.nodes.retain(|node| !predicate(&node.kind));
        if let Some(hovered) = self.hovered {
            if self.node(hovered).is_none() {
                self.hovered = None;
            }
        }
    }

    /// Registers `handler` for `kind`, replacing any previous one.
    pub fn on(&mut self, id: ShapeId, kind: PointerEventKind, handler: Handler) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.handlers.insert(kind, handler);
                true
            }
            None => false,
        }
    }

    /// Animates an arc's end angle, given in degrees, starting right away.
    pub fn transition_end_angle(&mut self, id: ShapeId, transition: Transition) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        let ShapeKind::Arc(arc) = &mut node.kind else {
            return false;
        };
        arc.end_angle = transition.value().to_radians();
        node.transition = Some(transition);
        true
    }

    /// Frame scheduler tick. Returns whether any transition is still running.
    pub fn advance(&mut self, dt: Duration) -> bool {
        let mut running = false;
        for node in &mut self.nodes {
            let Some(transition) = node.transition.as_mut() else {
                continue;
            };
            let degrees = transition.advance(dt);
            if let ShapeKind::Arc(arc) = &mut node.kind {
                arc.end_angle = degrees * (std::f64::consts::PI / 180.0);
            }
            if transition.is_finished() {
                node.transition = None;
            } else {
                running = true;
            }
        }
        running
    }

    pub fn is_animating(&self) -> bool {
        self.nodes.iter().any(|node| node.transition.is_some())
    }

    pub fn to_local(&self, client: (f64, f64)) -> (f64, f64) {
        (client.0 - self.origin.0, client.1 - self.origin.1)
    }

    /// Dispatches a pointer position given in client coordinates.
    pub fn pointer_moved(&mut self, client: (f64, f64)) {
        let local = self.to_local(client);
        let hit = self.hit_test(local);

        if hit != self.hovered {
            if let Some(previous) = self.hovered {
                self.dispatch(previous, PointerEventKind::Out, local);
            }
            if let Some(entered) = hit {
                self.dispatch(entered, PointerEventKind::Over, local);
            }
            self.hovered = hit;
        }
        if let Some(current) = hit {
            self.dispatch(current, PointerEventKind::Move, local);
        }
    }

    /// The pointer left the surface entirely.
    pub fn pointer_left(&mut self) {
        if let Some(previous) = self.hovered.take() {
            self.dispatch(previous, PointerEventKind::Out, (f64::NAN, f64::NAN));
        }
    }

    /// Topmost shape under a surface-local point.
    pub fn hit_test(&self, local: (f64, f64)) -> Option<ShapeId> {
        self.nodes
            .iter()
            .rev()
            .find(|node| node.kind.contains(local.0, local.1))
            .map(|node| node.id)
    }

    pub fn hovered(&self) -> Option<ShapeId> {
        self.hovered
    }

    pub fn shape(&self, id: ShapeId) -> Option<&ShapeKind> {
        self.node(id).map(|node| &node.kind)
    }

    /// Shapes in paint order.
    pub fn shapes(&self) -> impl Iterator<Item = (ShapeId, &ShapeKind)> {
        self.nodes.iter().map(|node| (node.id, &node.kind))
    }

    pub fn arcs(&self) -> impl Iterator<Item = &ArcShape> {
        self.nodes.iter().filter_map(|node| match &node.kind {
            ShapeKind::Arc(arc) => Some(arc),
            ShapeKind::Text(_) => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &TextShape> {
        self.nodes.iter().filter_map(|node| match &node.kind {
            ShapeKind::Text(text) => Some(text),
            ShapeKind::Arc(_) => None,
        })
    }

    fn dispatch(&self, id: ShapeId, kind: PointerEventKind, local: (f64, f64)) {
        let Some(handler) = self
            .node(id)
            .and_then(|node| node.handlers.get(&kind))
            .cloned()
        else {
            return;
        };
        trace!(?id, ?kind, x = local.0, y = local.1, "pointer event");
        handler(&PointerEvent {
            kind,
            shape: id,
            local,
        });
    }

    fn node(&self, id: ShapeId) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    fn node_mut(&mut self, id: ShapeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::f64::consts::PI;

    fn ring(start: f64, end: f64) -> ArcShape {
        ArcShape {
            inner_radius: 40.0,
            outer_radius: 50.0,
            start_angle: start,
            end_angle: end,
            fill: Color::BLACK,
            translate: (100.0, 100.0),
        }
    }

    fn surface() -> Surface {
        Surface::new(&Container {
            origin: (10.0, 20.0),
            width: 200.0,
            height: 200.0,
        })
    }

    #[test]
    fn test_clock_angle_orientation() {
        assert!((clock_angle(0.0, -1.0) - 0.0).abs() < 1e-12);
        assert!((clock_angle(1.0, 0.0) - PI / 2.0).abs() < 1e-12);
        assert!((clock_angle(0.0, 1.0) - PI).abs() < 1e-12);
        assert!((clock_angle(-1.0, 0.0) - 3.0 * PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_contains_angle() {
        assert!(contains_angle(1.0, 0.0, 2.0));
        assert!(!contains_angle(3.0, 0.0, 2.0));
        assert!(contains_angle(6.0, 0.0, TAU));
        assert!(contains_angle(6.0, 0.0, f64::INFINITY));
        assert!(!contains_angle(0.0, 0.0, 0.0));
        assert!(!contains_angle(1.0, 0.0, f64::NAN));
        // counter-clockwise sweep from a negative end angle
        assert!(contains_angle(TAU - 0.5, 0.0, -1.0));
    }

    #[test]
    fn test_arc_contains_follows_sweep() {
        let arc = ring(0.0, PI / 2.0);
        // 3 o'clock, inside the band
        assert!(arc.contains(145.0, 100.0));
        // 9 o'clock is outside the quarter sweep
        assert!(!arc.contains(55.0, 100.0));
        // center hole
        assert!(!arc.contains(100.0, 100.0));
    }

    #[test]
    fn test_inverted_radii_cover_same_band() {
        let mut arc = ring(0.0, TAU);
        arc.inner_radius = 50.0;
        arc.outer_radius = 40.0;
        assert_eq!(arc.radial_band(), (40.0, 50.0));
        assert!(arc.contains(100.0, 55.0));
    }

    #[test]
    fn test_remove_by_kind() {
        let mut surface = surface();
        surface.append(ShapeKind::Arc(ring(0.0, 1.0)));
        surface.append(ShapeKind::Arc(ring(0.0, 2.0)));
        surface.append(ShapeKind::Text(TextShape {
            text: "x".into(),
            x: 0.0,
            y: 0.0,
            font_family: "Segoe UI".into(),
            font_size: 10.0,
            fill: Color::BLACK,
            anchor: TextAnchor::Middle,
            bold: false,
        }));

        surface.remove_arcs();
        assert_eq!(surface.arcs().count(), 0);
        assert_eq!(surface.texts().count(), 1);
        surface.remove_text();
        assert_eq!(surface.shapes().count(), 0);
    }

    #[test]
    fn test_transition_drives_end_angle_in_degrees() {
        let mut surface = surface();
        let id = surface.append(ShapeKind::Arc(ring(0.0, PI)));
        let transition = Transition::new(0.0, 180.0, Duration::from_millis(1000));
        assert!(surface.transition_end_angle(id, transition));

        let end_angle = |surface: &Surface| match surface.shape(id) {
            Some(ShapeKind::Arc(arc)) => arc.end_angle,
            _ => unreachable!(),
        };
        assert_eq!(end_angle(&surface), 0.0);

        assert!(surface.advance(Duration::from_millis(500)));
        assert!((end_angle(&surface) - PI / 2.0).abs() < 1e-12);

        assert!(!surface.advance(Duration::from_millis(500)));
        assert!((end_angle(&surface) - PI).abs() < 1e-12);
        assert!(!surface.is_animating());
    }

    #[test]
    fn test_pointer_dispatch_sequence() {
        let mut surface = surface();
        let id = surface.append(ShapeKind::Arc(ring(0.0, TAU)));
        let log: Rc<RefCell<Vec<(PointerEventKind, (f64, f64))>>> = Rc::default();

        for kind in [
            PointerEventKind::Over,
            PointerEventKind::Move,
            PointerEventKind::Out,
        ] {
            let log = log.clone();
            surface.on(
                id,
                kind,
                Rc::new(move |event: &PointerEvent| log.borrow_mut().push((event.kind, event.local))),
            );
        }

        // client (155, 120) is local (145, 100): on the ring
        surface.pointer_moved((155.0, 120.0));
        surface.pointer_moved((156.0, 120.0));
        // center hole
        surface.pointer_moved((110.0, 120.0));

        let log = log.borrow();
        assert_eq!(
            log.as_slice(),
            &[
                (PointerEventKind::Over, (145.0, 100.0)),
                (PointerEventKind::Move, (145.0, 100.0)),
                (PointerEventKind::Move, (146.0, 100.0)),
                (PointerEventKind::Out, (100.0, 100.0)),
            ]
        );
        assert_eq!(surface.hovered(), None);
    }

    #[test]
    fn test_topmost_shape_wins() {
        let mut surface = surface();
        let below = surface.append(ShapeKind::Arc(ring(0.0, TAU)));
        let above = surface.append(ShapeKind::Arc(ring(0.0, TAU)));
        assert_ne!(below, above);
        assert_eq!(surface.hit_test((145.0, 100.0)), Some(above));
    }

    #[test]
    fn test_pointer_left_fires_out() {
        let mut surface = surface();
        let id = surface.append(ShapeKind::Arc(ring(0.0, TAU)));
        let outs = Rc::new(RefCell::new(0));
        let counter = outs.clone();
        surface.on(
            id,
            PointerEventKind::Out,
            Rc::new(move |_: &PointerEvent| *counter.borrow_mut() += 1),
        );

        surface.pointer_moved((155.0, 120.0));
        surface.pointer_left();
        surface.pointer_left();
        assert_eq!(*outs.borrow(), 1);
    }

    #[test]
    fn test_moved_origin_shifts_hit_testing() {
        let mut surface = surface();
        let id = surface.append(ShapeKind::Arc(ring(0.0, TAU)));
        assert_eq!(surface.to_local((155.0, 120.0)), (145.0, 100.0));

        surface.set_origin((60.0, 20.0));
        assert_eq!(surface.to_local((155.0, 120.0)), (95.0, 100.0));
        surface.pointer_moved((155.0, 120.0));
        assert_eq!(surface.hovered(), None);
        surface.pointer_moved((205.0, 120.0));
        assert_eq!(surface.hovered(), Some(id));
    }
}
