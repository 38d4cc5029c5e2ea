//! Per-element computed style.
//!
//! A [`StyleSnapshot`] holds every property the renderer consumes. Each
//! field is `None` when the property was never specified on the element
//! or (for inherited properties) any ancestor, so resolvers can apply
//! their own defaults.

use lightningcss::printer::PrinterOptions;
use lightningcss::properties::Property;
use lightningcss::stylesheet::{ParserOptions, StyleAttribute};
use lightningcss::traits::Parse;
use lightningcss::values::color::{CssColor, SRGB};

use crate::dasharray::{DashArray, parse_dash_array};
use crate::geometry::FillRule;
use crate::length::Length;
use crate::types::Color;

#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    None,
    Color { color: Color, alpha: f32 },
    CurrentColor,
    Url(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Inline,
    Block,
    InlineBlock,
    ListItem,
    Flex,
    Grid,
    Table,
    Contents,
    None,
}

impl Display {
    fn from_keyword(raw: &str) -> Option<Self> {
        let display = match raw {
            "inline" => Display::Inline,
            "block" => Display::Block,
            "inline-block" => Display::InlineBlock,
            "list-item" => Display::ListItem,
            "flex" => Display::Flex,
            "grid" => Display::Grid,
            "table" => Display::Table,
            "contents" => Display::Contents,
            "none" => Display::None,
            _ => return None,
        };
        Some(display)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
    Collapse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeLinecap {
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeLinejoin {
    Miter,
    Round,
    Bevel,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyleSnapshot {
    pub fill: Option<Paint>,
    pub fill_opacity: Option<f32>,
    pub fill_rule: Option<FillRule>,
    pub stroke: Option<Paint>,
    pub stroke_opacity: Option<f32>,
    pub stroke_width: Option<Length>,
    pub stroke_dasharray: Option<DashArray>,
    pub stroke_dashoffset: Option<Length>,
    pub stroke_linecap: Option<StrokeLinecap>,
    pub stroke_linejoin: Option<StrokeLinejoin>,
    pub stroke_miterlimit: Option<f32>,
    pub visibility: Option<Visibility>,
    pub color: Option<(Color, f32)>,
    pub opacity: Option<f32>,
    pub display: Option<Display>,
    pub clip_path: Option<String>,
    pub stop_color: Option<Paint>,
    pub stop_opacity: Option<f32>,
}

impl StyleSnapshot {
    /// Starting snapshot for a child: inherited properties carry over,
    /// the rest start unset.
    pub fn inherited_from(parent: &StyleSnapshot) -> Self {
        Self {
            fill: parent.fill.clone(),
            fill_opacity: parent.fill_opacity,
            fill_rule: parent.fill_rule,
            stroke: parent.stroke.clone(),
            stroke_opacity: parent.stroke_opacity,
            stroke_width: parent.stroke_width,
            stroke_dasharray: parent.stroke_dasharray.clone(),
            stroke_dashoffset: parent.stroke_dashoffset,
            stroke_linecap: parent.stroke_linecap,
            stroke_linejoin: parent.stroke_linejoin,
            stroke_miterlimit: parent.stroke_miterlimit,
            visibility: parent.visibility,
            color: parent.color,
            ..Self::default()
        }
    }

    pub fn is_display_none(&self) -> bool {
        self.display == Some(Display::None)
    }

    pub fn is_hidden(&self) -> bool {
        matches!(
            self.visibility,
            Some(Visibility::Hidden | Visibility::Collapse)
        )
    }

    /// Applies one `name: value` declaration. Returns `false` when the
    /// property is unknown or the value does not parse; the snapshot is
    /// left unchanged in that case.
    pub fn apply_declaration(&mut self, name: &str, value: &str) -> bool {
        let value = value.trim();
        match name.trim() {
            "fill" => set(&mut self.fill, parse_paint(value)),
            "fill-opacity" => set(&mut self.fill_opacity, parse_opacity(value)),
            "fill-rule" => set(&mut self.fill_rule, parse_fill_rule(value)),
            "stroke" => set(&mut self.stroke, parse_paint(value)),
            "stroke-opacity" => set(&mut self.stroke_opacity, parse_opacity(value)),
            "stroke-width" => set(&mut self.stroke_width, value.parse().ok()),
            "stroke-dasharray" => {
                self.stroke_dasharray = Some(parse_dash_array(value));
                true
            }
            "stroke-dashoffset" => set(&mut self.stroke_dashoffset, value.parse().ok()),
            "stroke-linecap" => {
                let cap = match value {
                    "butt" => Some(StrokeLinecap::Butt),
                    "round" => Some(StrokeLinecap::Round),
                    "square" => Some(StrokeLinecap::Square),
                    _ => None,
                };
                set(&mut self.stroke_linecap, cap)
            }
            "stroke-linejoin" => {
                let join = match value {
                    "miter" | "miter-clip" | "arcs" => Some(StrokeLinejoin::Miter),
                    "round" => Some(StrokeLinejoin::Round),
                    "bevel" => Some(StrokeLinejoin::Bevel),
                    _ => None,
                };
                set(&mut self.stroke_linejoin, join)
            }
            "stroke-miterlimit" => set(
                &mut self.stroke_miterlimit,
                value.parse::<f32>().ok().filter(|v| *v >= 1.0),
            ),
            "visibility" => {
                let visibility = match value {
                    "visible" => Some(Visibility::Visible),
                    "hidden" => Some(Visibility::Hidden),
                    "collapse" => Some(Visibility::Collapse),
                    _ => None,
                };
                set(&mut self.visibility, visibility)
            }
            "color" => set(&mut self.color, parse_color(value)),
            "opacity" => set(&mut self.opacity, parse_opacity(value)),
            "display" => set(&mut self.display, Display::from_keyword(value)),
            "clip-path" => {
                if value == "none" {
                    self.clip_path = None;
                    true
                } else {
                    set(&mut self.clip_path, parse_url_ref(value))
                }
            }
            "stop-color" => set(&mut self.stop_color, parse_paint(value)),
            "stop-opacity" => set(&mut self.stop_opacity, parse_opacity(value)),
            _ => false,
        }
    }

    /// Applies a `style="..."` attribute. Declarations go through the CSS
    /// parser, so comments, quoted values and `!important` behave as in a
    /// browser; input the parser rejects falls back to a plain `;` split.
    pub fn apply_style_attribute(&mut self, input: &str) {
        match StyleAttribute::parse(input, ParserOptions::default()) {
            Ok(attr) => {
                let block = &attr.declarations;
                for prop in block.declarations.iter().chain(&block.important_declarations) {
                    self.apply_property(prop);
                }
            }
            Err(err) => {
                log::debug!("style attribute {input:?} rejected by css parser: {err}");
                self.apply_style_legacy(input);
            }
        }
    }

    fn apply_property(&mut self, prop: &Property<'_>) {
        let id = prop.property_id();
        let name = id.name().to_ascii_lowercase();
        match prop.value_to_css_string(PrinterOptions::default()) {
            Ok(value) => {
                if !self.apply_declaration(&name, value.trim()) {
                    log::debug!("dropping style declaration {name}: {value:?}");
                }
            }
            Err(err) => log::debug!("cannot serialize {name}: {err}"),
        }
    }

    fn apply_style_legacy(&mut self, input: &str) {
        for decl in input.split(';') {
            let decl = decl.trim();
            if decl.is_empty() {
                continue;
            }
            let Some((name, value)) = decl.split_once(':') else {
                log::debug!("dropping style declaration without value: {decl:?}");
                continue;
            };
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim().trim_end_matches("!important").trim();
            if !self.apply_declaration(&name, value) {
                log::debug!("dropping style declaration {name}: {value:?}");
            }
        }
    }
}

fn set<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    match value {
        Some(v) => {
            *slot = Some(v);
            true
        }
        None => false,
    }
}

pub const PRESENTATION_ATTRIBUTES: &[&str] = &[
    "fill",
    "fill-opacity",
    "fill-rule",
    "stroke",
    "stroke-opacity",
    "stroke-width",
    "stroke-dasharray",
    "stroke-dashoffset",
    "stroke-linecap",
    "stroke-linejoin",
    "stroke-miterlimit",
    "visibility",
    "color",
    "opacity",
    "display",
    "clip-path",
    "stop-color",
    "stop-opacity",
];

pub fn parse_paint(input: &str) -> Option<Paint> {
    let v = input.trim();
    if v.eq_ignore_ascii_case("none") {
        return Some(Paint::None);
    }
    if v.eq_ignore_ascii_case("currentcolor") {
        return Some(Paint::CurrentColor);
    }
    if let Some(target) = parse_url_ref(v) {
        return Some(Paint::Url(target));
    }
    parse_color(v).map(|(color, alpha)| Paint::Color { color, alpha })
}

/// Inner target of `url(...)`, quotes removed. Any trailing fallback
/// after the closing parenthesis is ignored.
pub fn parse_url_ref(input: &str) -> Option<String> {
    let s = input.trim();
    if !s.get(..4)?.eq_ignore_ascii_case("url(") {
        return None;
    }
    let close = s.find(')')?;
    let inner = s[4..close].trim().trim_matches('"').trim_matches('\'');
    if inner.is_empty() {
        return None;
    }
    Some(inner.to_string())
}

/// Parses a CSS colour into linear components plus its own alpha.
pub fn parse_color(input: &str) -> Option<(Color, f32)> {
    let v = input.trim();
    if let Ok(color) = CssColor::parse_string(v) {
        if let Some(mapped) = css_color_to_color(&color) {
            return Some(mapped);
        }
    }
    parse_hex_color(v)
}

fn css_color_to_color(color: &CssColor) -> Option<(Color, f32)> {
    if let CssColor::RGBA(rgba) = color {
        let alpha = (rgba.alpha as f32 / 255.0).clamp(0.0, 1.0);
        return Some((Color::from_rgb8(rgba.red, rgba.green, rgba.blue), alpha));
    }
    if let Ok(srgb) = SRGB::try_from(color) {
        let alpha = if srgb.alpha.is_finite() {
            srgb.alpha.clamp(0.0, 1.0)
        } else {
            1.0
        };
        return Some((Color::rgb(srgb.r, srgb.g, srgb.b), alpha));
    }
    None
}

fn parse_hex_color(input: &str) -> Option<(Color, f32)> {
    let hex = input.strip_prefix('#')?;
    let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
    let pair = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        3 => Some((
            Color::from_rgb8(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17),
            1.0,
        )),
        6 => Some((Color::from_rgb8(pair(0)?, pair(2)?, pair(4)?), 1.0)),
        _ => None,
    }
}

fn parse_opacity(input: &str) -> Option<f32> {
    let v = input.trim();
    let value = match v.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f32>().ok()? / 100.0,
        None => v.parse::<f32>().ok()?,
    };
    value.is_finite().then(|| value.clamp(0.0, 1.0))
}

fn parse_fill_rule(input: &str) -> Option<FillRule> {
    match input {
        "nonzero" => Some(FillRule::NonZero),
        "evenodd" => Some(FillRule::EvenOdd),
        _ => None,
    }
}
