#![forbid(unsafe_code)]

//! Colors used by the painter.

use crossterm::style::Color;
use opview_core::Category;

const fn rgb(hex: u32) -> Color {
    Color::Rgb {
        r: (hex >> 16) as u8,
        g: (hex >> 8) as u8,
        b: hex as u8,
    }
}

/// Background of a collapsed row's class and feature cells.
#[must_use]
pub const fn category_background(category: Category) -> Color {
    match category {
        Category::Extension(1) => rgb(0xffd1c2),
        Category::Extension(2) => rgb(0xffc2c2),
        Category::Extension(3) => rgb(0xffc2e0),
        Category::Extension(4) => rgb(0xffc2ff),
        Category::Extension(5) => rgb(0xe0c2ff),
        Category::Extension(_) => rgb(0xc2c2ff),
        Category::General => rgb(0xffffc2),
        Category::AdvSimd => rgb(0xffeec0),
        Category::Float => rgb(0xe0ffc2),
        Category::FpSimd => rgb(0xc2ffc2),
        Category::Other => rgb(0xcccccc),
    }
}

/// Text drawn on top of a category background.
pub const CATEGORY_FG: Color = Color::Black;

pub const HEADER_FG: Color = Color::DarkGrey;
pub const CODE_FG: Color = Color::Cyan;
pub const LINK_FG: Color = Color::Blue;
pub const TAG_FG: Color = Color::DarkGrey;
pub const SELECTED_BG: Color = Color::DarkBlue;
pub const FACET_ON_FG: Color = Color::Green;
pub const FACET_OFF_FG: Color = Color::DarkGrey;
pub const STATUS_BG: Color = Color::DarkGrey;
pub const STATUS_FG: Color = Color::White;
