//! In-memory element tree implementing [`PresentationSurface`].
//!
//! Used by headless hosts and by tests. Selectors support tag names, `#id`,
//! `.class` compounds (e.g. `section#status.card`) and the descendant
//! combinator (whitespace). Anything else matches nothing.

use std::collections::{BTreeMap, HashMap};

use crate::surface::{Animation, ElementId, PresentationSurface, Rect, Viewport};

#[derive(Debug, Clone, Default)]
pub struct ElementSpec {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    text: String,
    rect: Rect,
}

impl ElementSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn rect(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    text: String,
    styles: BTreeMap<String, String>,
    rect: Rect,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

impl Node {
    fn from_spec(spec: ElementSpec, parent: Option<ElementId>) -> Self {
        Self {
            tag: spec.tag,
            id: spec.id,
            classes: spec.classes,
            text: spec.text,
            styles: BTreeMap::new(),
            rect: spec.rect,
            parent,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Element tree kept in a slot arena. Removed slots go on a free list and
/// are handed out again with a bumped generation.
#[derive(Debug, Clone)]
pub struct InMemorySurface {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: ElementId,
    viewport: Viewport,
    animations: HashMap<ElementId, Animation>,
}

impl InMemorySurface {
    pub fn new(width: f64, height: f64) -> Self {
        let root = Node::from_spec(
            ElementSpec::new("body").rect(Rect::new(0.0, 0.0, width, height)),
            None,
        );
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(root),
            }],
            free: Vec::new(),
            root: ElementId::new(0, 0),
            viewport: Viewport {
                width,
                height,
                scroll_offset: 0.0,
                document_height: height,
            },
            animations: HashMap::new(),
        }
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    /// Appends a new element under `parent`. The document height grows to
    /// cover the element's layout box.
    pub fn append(&mut self, parent: ElementId, spec: ElementSpec) -> Option<ElementId> {
        self.node(parent)?;
        let rect = spec.rect;
        let id = self.insert(Node::from_spec(spec, Some(parent)));
        self.viewport.document_height = self.viewport.document_height.max(rect.bottom());
        Some(id)
    }

    pub fn set_bounds(&mut self, element: ElementId, rect: Rect) {
        if let Some(node) = self.node_mut(element) {
            node.rect = rect;
        }
        self.viewport.document_height = self.viewport.document_height.max(rect.bottom());
    }

    pub fn contains(&self, element: ElementId) -> bool {
        self.node(element).is_some()
    }

    /// Last animation started on `element`, if it still exists.
    pub fn animation(&self, element: ElementId) -> Option<&Animation> {
        self.animations.get(&element)
    }

    pub fn children(&self, element: ElementId) -> Vec<ElementId> {
        self.node(element)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    pub fn element_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Size of the arena, live and vacant slots together.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn insert(&mut self, node: Node) -> ElementId {
        let id = match self.free.pop() {
            Some(index) => ElementId::new(index, self.slots[index as usize].generation),
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: None,
                });
                ElementId::new((self.slots.len() - 1) as u32, 0)
            }
        };
        if let Some(parent) = node.parent.and_then(|parent| self.node_mut(parent)) {
            parent.children.push(id);
        }
        self.slots[id.index() as usize].node = Some(node);
        id
    }

    fn vacate(&mut self, element: ElementId) {
        let Some(slot) = self.slots.get_mut(element.index() as usize) else {
            return;
        };
        if slot.generation != element.generation() || slot.node.is_none() {
            return;
        }
        slot.node = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(element.index());
    }

    fn node(&self, element: ElementId) -> Option<&Node> {
        self.slots
            .get(element.index() as usize)
            .filter(|slot| slot.generation == element.generation())
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, element: ElementId) -> Option<&mut Node> {
        self.slots
            .get_mut(element.index() as usize)
            .filter(|slot| slot.generation == element.generation())
            .and_then(|slot| slot.node.as_mut())
    }

    fn descendants(&self, scope: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack: Vec<ElementId> = self
            .node(scope)
            .map(|node| node.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(id) = stack.pop() {
            if let Some(node) = self.node(id) {
                out.push(id);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    fn matches(&self, element: ElementId, selector: &[Compound], scope: ElementId) -> bool {
        let Some((last, ancestors)) = selector.split_last() else {
            return false;
        };
        let Some(node) = self.node(element) else {
            return false;
        };
        if !last.matches(node) {
            return false;
        }

        let mut remaining = ancestors.iter().rev().peekable();
        let mut current = node.parent;
        while let Some(compound) = remaining.peek() {
            let Some(id) = current else {
                return false;
            };
            let Some(ancestor) = self.node(id) else {
                return false;
            };
            if compound.matches(ancestor) {
                remaining.next();
            }
            if id == scope && remaining.peek().is_some() {
                return false;
            }
            current = ancestor.parent;
        }
        true
    }

    fn select(&self, scope: ElementId, selector: &str) -> Vec<ElementId> {
        let Some(compounds) = parse_selector(selector) else {
            return Vec::new();
        };
        self.descendants(scope)
            .into_iter()
            .filter(|&id| self.matches(id, &compounds, scope))
            .collect()
    }
}

impl PresentationSurface for InMemorySurface {
    fn query_all(&self, selector: &str) -> Vec<ElementId> {
        let mut matches = self.select(self.root, selector);
        if parse_selector(selector)
            .is_some_and(|compounds| compounds.len() == 1 && self.matches(self.root, &compounds, self.root))
        {
            matches.insert(0, self.root);
        }
        matches
    }

    fn query_within(&self, scope: ElementId, selector: &str) -> Vec<ElementId> {
        self.select(scope, selector)
    }

    fn text(&self, element: ElementId) -> Option<String> {
        self.node(element).map(|node| node.text.clone())
    }

    fn set_text(&mut self, element: ElementId, text: &str) {
        if let Some(node) = self.node_mut(element) {
            node.text = text.to_string();
        }
    }

    fn add_class(&mut self, element: ElementId, class: &str) {
        if let Some(node) = self.node_mut(element) {
            if !node.classes.iter().any(|existing| existing == class) {
                node.classes.push(class.to_string());
            }
        }
    }

    fn remove_class(&mut self, element: ElementId, class: &str) {
        if let Some(node) = self.node_mut(element) {
            node.classes.retain(|existing| existing != class);
        }
    }

    fn has_class(&self, element: ElementId, class: &str) -> bool {
        self.node(element)
            .is_some_and(|node| node.classes.iter().any(|existing| existing == class))
    }

    fn style(&self, element: ElementId, property: &str) -> Option<String> {
        self.node(element)
            .and_then(|node| node.styles.get(property).cloned())
    }

    fn set_style(&mut self, element: ElementId, property: &str, value: &str) {
        if let Some(node) = self.node_mut(element) {
            node.styles.insert(property.to_string(), value.to_string());
        }
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn set_scroll_offset(&mut self, offset: f64) {
        let max = self.viewport.max_scroll();
        self.viewport.scroll_offset = offset.clamp(0.0, max);
    }

    fn bounds(&self, element: ElementId) -> Option<Rect> {
        self.node(element).map(|node| node.rect)
    }

    fn create_element(&mut self, parent: Option<ElementId>, tag: &str) -> Option<ElementId> {
        let parent = parent.unwrap_or(self.root);
        self.node(parent)?;
        Some(self.insert(Node::from_spec(ElementSpec::new(tag), Some(parent))))
    }

    fn remove_element(&mut self, element: ElementId) {
        if element == self.root {
            return;
        }
        let parent = match self.node(element) {
            Some(node) => node.parent,
            None => return,
        };
        if let Some(parent) = parent.and_then(|parent| self.node_mut(parent)) {
            parent.children.retain(|&child| child != element);
        }

        let mut doomed = self.descendants(element);
        doomed.push(element);
        for id in doomed {
            self.animations.remove(&id);
            self.vacate(id);
        }
    }

    fn animate(&mut self, element: ElementId, animation: &Animation) {
        if self.contains(element) {
            self.animations.insert(element, animation.clone());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Compound {
    fn matches(&self, node: &Node) -> bool {
        if self.tag.as_deref().is_some_and(|tag| !tag.eq_ignore_ascii_case(&node.tag)) {
            return false;
        }
        if self.id.is_some() && self.id != node.id {
            return false;
        }
        self.classes
            .iter()
            .all(|class| node.classes.iter().any(|existing| existing == class))
    }
}

fn parse_selector(selector: &str) -> Option<Vec<Compound>> {
    let compounds = selector
        .split_whitespace()
        .map(parse_compound)
        .collect::<Option<Vec<_>>>()?;
    if compounds.is_empty() {
        None
    } else {
        Some(compounds)
    }
}

fn parse_compound(raw: &str) -> Option<Compound> {
    let mut compound = Compound::default();
    let mut rest = raw;

    let tag_len = rest.find(['#', '.']).unwrap_or(rest.len());
    if tag_len > 0 {
        let tag = &rest[..tag_len];
        if tag != "*" {
            compound.tag = Some(valid_ident(tag)?.to_string());
        }
        rest = &rest[tag_len..];
    }

    while let Some(marker) = rest.chars().next() {
        let body = &rest[1..];
        let len = body.find(['#', '.']).unwrap_or(body.len());
        let name = valid_ident(&body[..len])?.to_string();
        match marker {
            '#' => compound.id = Some(name),
            '.' => compound.classes.push(name),
            _ => return None,
        }
        rest = &body[len..];
    }
    Some(compound)
}

fn valid_ident(name: &str) -> Option<&str> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    ok.then_some(name)
}
