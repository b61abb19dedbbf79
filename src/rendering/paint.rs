//! Display list built from the layout tree, and its execution onto a pixel
//! buffer.

use image::{Rgba, RgbaImage};

use super::layout::{char_advance, length, BoxKind, LayoutNode, Position, Rect};
use super::raster::{self, css_color};
use crate::dom::{Document, NodeId};

/// Coordinates are CSS pixels relative to the document origin.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect {
        rect: Rect,
        color: Rgba<u8>,
    },
    StrokeRect {
        rect: Rect,
        line: f32,
        color: Rgba<u8>,
    },
    /// `y` is the top of the line box.
    Text {
        x: f32,
        y: f32,
        text: String,
        font_size: f32,
        color: Rgba<u8>,
    },
    Image {
        rect: Rect,
        bitmap: RgbaImage,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        width: f32,
        color: Rgba<u8>,
    },
    Polygon {
        points: Vec<(f32, f32)>,
        fill: Rgba<u8>,
    },
}

fn content_rect(node: &LayoutNode) -> Rect {
    let b = node.style.border.map_or(0.0, |b| b.0);
    let p = node.style.padding;
    Rect {
        x: node.rect.x + b + p.left,
        y: node.rect.y + b + p.top,
        width: (node.rect.width - 2.0 * b - p.left - p.right).max(0.0),
        height: (node.rect.height - 2.0 * b - p.top - p.bottom).max(0.0),
    }
}

fn text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(|c| char_advance(c, font_size)).sum()
}

fn svg_number(doc: &Document, id: NodeId, name: &str) -> f32 {
    doc.element(id)
        .and_then(|el| el.attr(name))
        .and_then(|v| length(v, 16.0))
        .unwrap_or(0.0)
}

fn svg_paint(doc: &Document, id: NodeId, name: &str) -> Option<Rgba<u8>> {
    doc.element(id).and_then(|el| el.attr(name)).and_then(css_color)
}

fn paint_svg(doc: &Document, svg: NodeId, origin: (f32, f32), out: &mut Vec<PaintCommand>) {
    let (ox, oy) = origin;
    for &child in doc.children(svg) {
        let Some(el) = doc.element(child) else { continue };
        let num = |name: &str| svg_number(doc, child, name);
        let stroke = svg_paint(doc, child, "stroke");
        let stroke_w = el.attr("stroke-width").and_then(|v| length(v, 16.0)).unwrap_or(1.0);
        match el.tag.as_str() {
            "g" => paint_svg(doc, child, origin, out),
            "rect" => {
                let rect = Rect {
                    x: ox + num("x"),
                    y: oy + num("y"),
                    width: num("width"),
                    height: num("height"),
                };
                if let Some(fill) = svg_paint(doc, child, "fill") {
                    out.push(PaintCommand::SolidRect { rect, color: fill });
                }
                if let Some(color) = stroke {
                    out.push(PaintCommand::StrokeRect { rect, line: stroke_w, color });
                }
            }
            "polygon" => {
                let points: Vec<(f32, f32)> = el
                    .attr("points")
                    .unwrap_or_default()
                    .split_whitespace()
                    .filter_map(|pair| {
                        let (x, y) = pair.split_once(',')?;
                        Some((ox + x.parse::<f32>().ok()?, oy + y.parse::<f32>().ok()?))
                    })
                    .collect();
                if let Some(fill) = svg_paint(doc, child, "fill") {
                    out.push(PaintCommand::Polygon { points: points.clone(), fill });
                }
                if let (Some(color), false) = (stroke, points.is_empty()) {
                    for i in 0..points.len() {
                        let to = points[(i + 1) % points.len()];
                        out.push(PaintCommand::Line { from: points[i], to, width: stroke_w, color });
                    }
                }
            }
            "line" => {
                if let Some(color) = stroke {
                    out.push(PaintCommand::Line {
                        from: (ox + num("x1"), oy + num("y1")),
                        to: (ox + num("x2"), oy + num("y2")),
                        width: stroke_w,
                        color,
                    });
                }
            }
            "text" => {
                let font_size = el.attr("font-size").and_then(|v| length(v, 16.0)).unwrap_or(16.0);
                let text = doc.text_content(child);
                let width = text_width(&text, font_size);
                let x = match el.attr("text-anchor") {
                    Some("middle") => num("x") - width / 2.0,
                    Some("end") => num("x") - width,
                    _ => num("x"),
                };
                out.push(PaintCommand::Text {
                    x: ox + x,
                    // baseline to line-box top
                    y: oy + num("y") - font_size * 1.1,
                    text,
                    font_size,
                    color: svg_paint(doc, child, "fill").unwrap_or(Rgba([0, 0, 0, 255])),
                });
            }
            _ => {}
        }
    }
}

fn paint_replaced(doc: &Document, node: &LayoutNode, out: &mut Vec<PaintCommand>) {
    let Some(id) = node.node else { return };
    let Some(el) = doc.element(id) else { return };
    let content = content_rect(node);
    match el.tag.as_str() {
        "canvas" => {
            if let Some(bitmap) = &el.bitmap {
                out.push(PaintCommand::Image {
                    rect: content,
                    bitmap: bitmap.clone(),
                });
            }
        }
        "svg" => paint_svg(doc, id, (content.x, content.y), out),
        "input" | "select" | "textarea" => {
            out.push(PaintCommand::StrokeRect {
                rect: content,
                line: 1.0,
                color: Rgba([204, 204, 204, 255]),
            });
            if let Some(value) = el.attr("value").filter(|v| !v.is_empty()) {
                out.push(PaintCommand::Text {
                    x: content.x + 4.0,
                    y: content.y,
                    text: value.to_string(),
                    font_size: node.style.font_size,
                    color: node.style.color,
                });
            }
        }
        _ => {}
    }
}

/// Append paint commands for `node` and its descendants in painting order:
/// backgrounds, borders, content, in-flow children, then positioned
/// children.
pub fn build_display_list(doc: &Document, node: &LayoutNode, out: &mut Vec<PaintCommand>) {
    if let BoxKind::Text(runs) = &node.kind {
        for run in runs.iter().filter(|r| r.visible) {
            out.push(PaintCommand::Text {
                x: run.x,
                y: run.y,
                text: run.text.clone(),
                font_size: run.font_size,
                color: run.color,
            });
        }
        return;
    }

    if node.style.visible {
        if let Some(color) = node.style.background {
            out.push(PaintCommand::SolidRect { rect: node.rect, color });
        }
        if let Some((line, color)) = node.style.border {
            out.push(PaintCommand::StrokeRect { rect: node.rect, line, color });
        }
        if node.kind == BoxKind::Replaced {
            paint_replaced(doc, node, out);
        }
    }

    let positioned = |c: &&LayoutNode| c.node.is_some() && c.style.position == Position::OutOfFlow;
    for child in node.children.iter().filter(|c| !positioned(c)) {
        build_display_list(doc, child, out);
    }
    for child in node.children.iter().filter(positioned) {
        build_display_list(doc, child, out);
    }
}

/// Maps CSS pixels to buffer pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub origin: (f32, f32),
    pub scale: f32,
}

impl Transform {
    fn x(&self, v: f32) -> i32 {
        ((v - self.origin.0) * self.scale).round() as i32
    }

    fn y(&self, v: f32) -> i32 {
        ((v - self.origin.1) * self.scale).round() as i32
    }

    fn len(&self, v: f32) -> u32 {
        (v * self.scale).round().max(0.0) as u32
    }

    fn point(&self, p: (f32, f32)) -> (f32, f32) {
        ((p.0 - self.origin.0) * self.scale, (p.1 - self.origin.1) * self.scale)
    }
}

/// Glyphs are drawn as solid blocks: one per visible character, vertically
/// centred in the line box.
fn draw_text(img: &mut RgbaImage, t: &Transform, x: f32, y: f32, text: &str, font_size: f32, color: Rgba<u8>) {
    let mut pen = x;
    let top = y + font_size * 0.35;
    for c in text.chars() {
        let advance = char_advance(c, font_size);
        if !c.is_whitespace() {
            raster::fill_rect(
                img,
                t.x(pen + advance * 0.1),
                t.y(top),
                t.len(advance * 0.8).max(1),
                t.len(font_size * 0.7).max(1),
                color,
            );
        }
        pen += advance;
    }
}

pub fn execute(commands: &[PaintCommand], img: &mut RgbaImage, t: &Transform) {
    for cmd in commands {
        match cmd {
            PaintCommand::SolidRect { rect, color } => {
                raster::fill_rect(img, t.x(rect.x), t.y(rect.y), t.len(rect.width), t.len(rect.height), *color)
            }
            PaintCommand::StrokeRect { rect, line, color } => raster::stroke_rect(
                img,
                t.x(rect.x),
                t.y(rect.y),
                t.len(rect.width),
                t.len(rect.height),
                t.len(*line).max(1),
                *color,
            ),
            PaintCommand::Text { x, y, text, font_size, color } => draw_text(img, t, *x, *y, text, *font_size, *color),
            PaintCommand::Image { rect, bitmap } => {
                raster::blit(img, bitmap, t.x(rect.x), t.y(rect.y), t.len(rect.width), t.len(rect.height))
            }
            PaintCommand::Line { from, to, width, color } => {
                raster::draw_line(img, t.point(*from), t.point(*to), width * t.scale, *color)
            }
            PaintCommand::Polygon { points, fill } => {
                let pts: Vec<(f32, f32)> = points.iter().map(|p| t.point(*p)).collect();
                raster::fill_polygon(img, &pts, *fill);
            }
        }
    }
}
