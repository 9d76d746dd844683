//! Context menu geometry and item table

use crate::view::{Point, Rect};

/// Offset of the menu from the invoking point
pub const MENU_OFFSET: f64 = 8.0;
pub const MENU_ITEM_WIDTH: f64 = 130.0;
pub const MENU_ITEM_HEIGHT: f64 = 18.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuItem {
    Delete,
    Duplicate,
    Reverse,
    Invert,
    DoubleLength,
    HalveLength,
    Quantize,
    EuclidFill,
    RandomFill,
}

impl MenuItem {
    pub const ALL: [MenuItem; 9] = [
        MenuItem::Delete,
        MenuItem::Duplicate,
        MenuItem::Reverse,
        MenuItem::Invert,
        MenuItem::DoubleLength,
        MenuItem::HalveLength,
        MenuItem::Quantize,
        MenuItem::EuclidFill,
        MenuItem::RandomFill,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MenuItem::Delete => "Delete",
            MenuItem::Duplicate => "Duplicate",
            MenuItem::Reverse => "Reverse",
            MenuItem::Invert => "Invert",
            MenuItem::DoubleLength => "×2 duration",
            MenuItem::HalveLength => "÷2 duration",
            MenuItem::Quantize => "Quantize",
            MenuItem::EuclidFill => "Euclidean fill…",
            MenuItem::RandomFill => "Random fill row",
        }
    }
}

/// An open context menu
#[derive(Clone, Debug, PartialEq)]
pub struct ContextMenu {
    pub rect: Rect,
    /// Opened over empty space: acts on the whole sequence, delete disabled
    pub global: bool,
    /// Pitch row under the invoking point
    pub row: u8,
    /// Highlighted item
    pub hover: Option<MenuItem>,
}

impl ContextMenu {
    /// Place the menu below-right of `at`, pushed up to stay inside a widget
    /// of height `bounds_height`
    pub fn open(at: Point, global: bool, row: i32, bounds_height: f64) -> Self {
        let height = MENU_ITEM_HEIGHT * MenuItem::ALL.len() as f64;
        let mut top = at.y + MENU_OFFSET;
        if top + height > bounds_height {
            top = (bounds_height - height).max(0.0);
        }
        Self {
            rect: Rect::new(at.x + MENU_OFFSET, top, MENU_ITEM_WIDTH, height),
            global,
            row: row.clamp(0, 127) as u8,
            hover: None,
        }
    }

    pub fn is_enabled(&self, item: MenuItem) -> bool {
        !(self.global && item == MenuItem::Delete)
    }

    pub fn item_rect(&self, index: usize) -> Rect {
        Rect::new(
            self.rect.x,
            self.rect.y + index as f64 * MENU_ITEM_HEIGHT,
            MENU_ITEM_WIDTH,
            MENU_ITEM_HEIGHT,
        )
    }

    pub fn item_at(&self, p: Point) -> Option<MenuItem> {
        if !self.rect.contains(p) {
            return None;
        }
        let index = ((p.y - self.rect.y) / MENU_ITEM_HEIGHT) as usize;
        MenuItem::ALL.get(index).copied()
    }

    /// Update the highlighted item; true if it changed
    pub fn hover(&mut self, p: Point) -> bool {
        let hover = self.item_at(p);
        let changed = hover != self.hover;
        self.hover = hover;
        changed
    }
}
