//! Builds an [`InMemorySurface`] from an HTML document.
//!
//! There is no real layout engine. Top-level blocks (`section`, `header`,
//! `footer`, or anything carrying `data-height`) are stacked vertically at
//! full viewport width, and everything inside a block shares its rect.

use std::fs;
use std::path::{Path, PathBuf};

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

use pulse_core::{ElementId, ElementSpec, InMemorySurface, Rect};
use pulse_logging::{pulse_debug, pulse_info, pulse_warn};

/// Landing page used when no page path is configured.
pub const DEFAULT_PAGE: &str = include_str!("../assets/index.html");

pub const DEFAULT_BLOCK_HEIGHT: f64 = 600.0;

const BLOCK_TAGS: &[&str] = &["section", "header", "footer"];
const SKIPPED_TAGS: &[&str] = &["script", "style", "template", "noscript"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read page {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("page has no <body>")]
    NoBody,
}

pub fn load_file(path: &Path, width: f64, height: f64) -> Result<InMemorySurface, LoadError> {
    let html = fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    pulse_info!("Loaded page {:?} ({} bytes)", path, html.len());
    build_surface(&html, width, height)
}

pub fn build_surface(html: &str, width: f64, height: f64) -> Result<InMemorySurface, LoadError> {
    let document = Html::parse_document(html);
    let body = Selector::parse("body")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .ok_or(LoadError::NoBody)?;

    let mut layout = Layout {
        surface: InMemorySurface::new(width, height),
        width,
        cursor: 0.0,
    };
    let root = layout.surface.root();
    layout.visit_children(body, root, None);

    pulse_debug!(
        "Built surface with {} elements, document height {}",
        layout.surface.element_count(),
        layout.cursor
    );
    Ok(layout.surface)
}

struct Layout {
    surface: InMemorySurface,
    width: f64,
    cursor: f64,
}

impl Layout {
    fn visit_children(&mut self, element: ElementRef, parent: ElementId, block: Option<Rect>) {
        for child in element.children() {
            if let Some(child) = ElementRef::wrap(child) {
                self.visit_element(child, parent, block);
            }
        }
    }

    fn visit_element(&mut self, element: ElementRef, parent: ElementId, block: Option<Rect>) {
        let tag = element.value().name();
        if SKIPPED_TAGS.contains(&tag) {
            return;
        }

        let (rect, block) = match block {
            Some(rect) => (rect, Some(rect)),
            None => match block_height(element) {
                Some(height) => {
                    let rect = Rect::new(0.0, self.cursor, self.width, height);
                    self.cursor += height;
                    (rect, Some(rect))
                }
                None => (Rect::new(0.0, self.cursor, self.width, 0.0), None),
            },
        };

        let mut spec = ElementSpec::new(tag).text(own_text(element)).rect(rect);
        if let Some(id) = element.value().id() {
            spec = spec.id(id);
        }
        for class in element.value().classes() {
            spec = spec.class(class);
        }

        if let Some(id) = self.surface.append(parent, spec) {
            self.visit_children(element, id, block);
        }
    }
}

fn block_height(element: ElementRef) -> Option<f64> {
    let tag = element.value().name();
    let default = BLOCK_TAGS.contains(&tag).then_some(DEFAULT_BLOCK_HEIGHT);
    let Some(raw) = element.value().attr("data-height") else {
        return default;
    };
    match raw.trim().parse::<f64>() {
        Ok(height) if height.is_finite() && height >= 0.0 => Some(height),
        _ => {
            pulse_warn!("Ignoring data-height={:?} on <{}>", raw, tag);
            default
        }
    }
}

/// Direct text children only, whitespace-trimmed and space-joined.
fn own_text(element: ElementRef) -> String {
    element
        .children()
        .filter_map(|child| match child.value() {
            Node::Text(text) => Some(text.trim()),
            _ => None,
        })
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
