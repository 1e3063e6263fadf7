use std::fmt;
use std::time::Duration;

/// Opaque handle to an element on a [`PresentationSurface`].
///
/// Surfaces may reuse the slot of a removed element; the generation tells a
/// stale handle apart from the slot's new occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId {
    index: u32,
    generation: u32,
}

impl ElementId {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.generation {
            0 => write!(f, "#{}", self.index),
            generation => write!(f, "#{}v{}", self.index, generation),
        }
    }
}

/// Axis-aligned rectangle in document coordinates (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Overlapping region, or `None` when the rectangles are disjoint.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right < left || bottom < top {
            return None;
        }
        Some(Rect::new(left, top, right - left, bottom - top))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scroll_offset: f64,
    pub document_height: f64,
}

impl Viewport {
    /// Visible region in document coordinates.
    pub fn visible_rect(&self) -> Rect {
        Rect::new(0.0, self.scroll_offset, self.width, self.height)
    }

    pub fn max_scroll(&self) -> f64 {
        (self.document_height - self.height).max(0.0)
    }
}

/// Visual state at one end of an [`Animation`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualState {
    pub opacity: f64,
    pub translate_y: f64,
    pub scale: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    #[default]
    Linear,
    EaseOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub from: VisualState,
    pub to: VisualState,
    pub duration: Duration,
    pub easing: Easing,
}

/// Rendering environment the page behaviours mutate.
///
/// Every operation on an element that no longer exists is a silent no-op;
/// lookups that match nothing return empty results. Timers are not part of the
/// surface: they are owned by the [`crate::Scheduler`]. Animation completion is
/// reported by the scheduler firing at `start + duration`.
pub trait PresentationSurface {
    /// All elements matching `selector`, in document order.
    fn query_all(&self, selector: &str) -> Vec<ElementId>;

    /// Descendants of `scope` matching `selector`, in document order.
    fn query_within(&self, scope: ElementId, selector: &str) -> Vec<ElementId>;

    fn query(&self, selector: &str) -> Option<ElementId> {
        self.query_all(selector).into_iter().next()
    }

    fn text(&self, element: ElementId) -> Option<String>;
    fn set_text(&mut self, element: ElementId, text: &str);

    fn add_class(&mut self, element: ElementId, class: &str);
    fn remove_class(&mut self, element: ElementId, class: &str);
    fn has_class(&self, element: ElementId, class: &str) -> bool;

    fn style(&self, element: ElementId, property: &str) -> Option<String>;
    fn set_style(&mut self, element: ElementId, property: &str, value: &str);

    fn viewport(&self) -> Viewport;
    fn set_scroll_offset(&mut self, offset: f64);

    /// Layout box of `element`, used by the intersection check.
    fn bounds(&self, element: ElementId) -> Option<Rect>;

    /// Creates a detached-from-layout element under `parent` (the document
    /// root when `None`). Returns `None` when the parent is gone.
    fn create_element(&mut self, parent: Option<ElementId>, tag: &str) -> Option<ElementId>;
    fn remove_element(&mut self, element: ElementId);

    fn animate(&mut self, element: ElementId, animation: &Animation);
}
