//! Block layout over the document tree.
//!
//! Only inline `style` declarations are consulted, plus a few tag defaults.
//! Blocks stack vertically, inline content is wrapped into lines with fixed
//! per-character advances, table rows split their width evenly between
//! cells, and `position: fixed | absolute` boxes are taken out of flow.

use image::Rgba;

use super::raster::css_color;
use crate::dom::{Document, Element, NodeData, NodeId};

const DEFAULT_FONT_SIZE: f32 = 16.0;
const LINE_HEIGHT: f32 = 1.4;
/// Forced break from `<br>`. Source newlines are ordinary whitespace.
const LINE_BREAK: char = '\u{2028}';

const INLINE_TAGS: &[&str] = &[
    "span", "strong", "b", "em", "i", "a", "label", "small", "code", "u", "sub", "sup", "br",
];
const SKIPPED_TAGS: &[&str] = &["head", "script", "style", "title", "meta", "link", "noscript", "template"];

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    None,
    Block,
    Inline,
    TableRow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Static,
    /// `fixed`, `absolute`: placed by `left`/`top`, no space in flow.
    OutOfFlow,
}

/// Resolved style of one element. Color, font size, visibility and
/// alignment are inherited.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    pub display: Display,
    pub position: Position,
    pub visible: bool,
    pub background: Option<Rgba<u8>>,
    pub color: Rgba<u8>,
    pub font_size: f32,
    pub margin: Edges,
    pub auto_margin_x: bool,
    pub padding: Edges,
    pub border: Option<(f32, Rgba<u8>)>,
    pub width: Option<f32>,
    pub max_width: Option<f32>,
    pub height: Option<f32>,
    pub overflow_visible: bool,
    pub center_text: bool,
    pub offset: (f32, f32),
}

impl ComputedStyle {
    pub fn root() -> Self {
        Self {
            display: Display::Block,
            position: Position::Static,
            visible: true,
            background: None,
            color: Rgba([51, 51, 51, 255]),
            font_size: DEFAULT_FONT_SIZE,
            margin: Edges::default(),
            auto_margin_x: false,
            padding: Edges::default(),
            border: None,
            width: None,
            max_width: None,
            height: None,
            overflow_visible: true,
            center_text: false,
            offset: (0.0, 0.0),
        }
    }
}

/// Parse a CSS length in px. `em` is relative to `font_size`; `%` and `auto`
/// yield `None`.
pub fn length(value: &str, font_size: f32) -> Option<f32> {
    let v = value.trim().to_ascii_lowercase();
    if v == "0" {
        return Some(0.0);
    }
    if let Some(n) = v.strip_suffix("px") {
        return n.trim().parse().ok();
    }
    if let Some(n) = v.strip_suffix("em") {
        return n.trim().trim_end_matches('r').parse::<f32>().ok().map(|f| f * font_size);
    }
    v.parse().ok()
}

/// `margin`/`padding` shorthand with 1 to 4 values. The flag reports an
/// `auto` horizontal value.
fn edges(value: &str, font_size: f32) -> (Edges, bool) {
    let parts: Vec<&str> = value.split_whitespace().collect();
    let get = |i: usize| parts.get(i).and_then(|p| length(p, font_size)).unwrap_or(0.0);
    let is_auto = |i: usize| parts.get(i).map_or(false, |p| p.eq_ignore_ascii_case("auto"));
    match parts.len() {
        1 => (Edges { top: get(0), right: get(0), bottom: get(0), left: get(0) }, is_auto(0)),
        2 => (Edges { top: get(0), right: get(1), bottom: get(0), left: get(1) }, is_auto(1)),
        3 => (Edges { top: get(0), right: get(1), bottom: get(2), left: get(1) }, is_auto(1)),
        4 => (Edges { top: get(0), right: get(1), bottom: get(2), left: get(3) }, is_auto(1) && is_auto(3)),
        _ => (Edges::default(), false),
    }
}

fn tag_defaults(tag: &str, style: &mut ComputedStyle) {
    let v = |t: f32, b: f32| Edges { top: t, right: 0.0, bottom: b, left: 0.0 };
    match tag {
        "h1" => {
            style.font_size = 32.0;
            style.margin = v(21.0, 21.0);
        }
        "h2" => {
            style.font_size = 24.0;
            style.margin = v(20.0, 20.0);
        }
        "h3" => {
            style.font_size = 19.0;
            style.margin = v(18.0, 18.0);
        }
        "h4" => style.margin = v(16.0, 16.0),
        "p" => style.margin = v(12.0, 12.0),
        "ul" | "ol" => {
            style.margin = v(12.0, 12.0);
            style.padding.left = 40.0;
        }
        "td" => style.padding = Edges { top: 4.0, right: 4.0, bottom: 4.0, left: 4.0 },
        "th" => {
            style.padding = Edges { top: 4.0, right: 4.0, bottom: 4.0, left: 4.0 };
            style.center_text = true;
        }
        _ => {}
    }
}

pub fn compute_style(el: &Element, parent: &ComputedStyle) -> ComputedStyle {
    let mut style = ComputedStyle {
        display: if INLINE_TAGS.contains(&el.tag.as_str()) {
            Display::Inline
        } else if el.tag == "tr" {
            Display::TableRow
        } else if SKIPPED_TAGS.contains(&el.tag.as_str()) {
            Display::None
        } else {
            Display::Block
        },
        color: parent.color,
        font_size: parent.font_size,
        visible: parent.visible,
        center_text: parent.center_text,
        ..ComputedStyle::root()
    };
    tag_defaults(&el.tag, &mut style);

    if let Some(size) = el.style.get("font-size").and_then(|v| length(v, parent.font_size)) {
        style.font_size = size;
    }
    let fs = style.font_size;
    for (name, value) in el.style.iter() {
        let value = value.trim();
        match name {
            "display" => {
                style.display = match value {
                    "none" => Display::None,
                    "inline" | "inline-block" => Display::Inline,
                    "table-row" => Display::TableRow,
                    _ => Display::Block,
                }
            }
            "position" => {
                style.position = match value {
                    "fixed" | "absolute" => Position::OutOfFlow,
                    _ => Position::Static,
                }
            }
            "visibility" => style.visible = value != "hidden",
            "background" | "background-color" => {
                style.background = value.split_whitespace().find_map(css_color).or_else(|| css_color(value));
            }
            "color" => {
                if let Some(c) = css_color(value) {
                    style.color = c;
                }
            }
            "margin" => (style.margin, style.auto_margin_x) = edges(value, fs),
            "margin-top" => style.margin.top = length(value, fs).unwrap_or(0.0),
            "margin-bottom" => style.margin.bottom = length(value, fs).unwrap_or(0.0),
            "padding" => style.padding = edges(value, fs).0,
            "border" => {
                let width = value.split_whitespace().find_map(|p| length(p, fs)).unwrap_or(1.0);
                let color = value.split_whitespace().find_map(css_color).unwrap_or(Rgba([0, 0, 0, 255]));
                style.border = (value != "none" && width > 0.0).then_some((width, color));
            }
            "width" => style.width = length(value, fs),
            "max-width" => style.max_width = length(value, fs),
            "height" => style.height = length(value, fs),
            "overflow" => style.overflow_visible = value == "visible",
            "text-align" => style.center_text = value == "center",
            "left" => style.offset.0 = length(value, fs).unwrap_or(0.0),
            "top" => style.offset.1 = length(value, fs).unwrap_or(0.0),
            _ => {}
        }
    }
    style
}

/// A run of text placed on one line. `y` is the top of the line box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub font_size: f32,
    pub color: Rgba<u8>,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoxKind {
    Block,
    /// Anonymous box holding wrapped inline content.
    Text(Vec<TextRun>),
    /// Canvas, svg, input or img: fixed-size content painted from the node.
    Replaced,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub node: Option<NodeId>,
    /// Border box.
    pub rect: Rect,
    pub style: ComputedStyle,
    pub kind: BoxKind,
    pub children: Vec<LayoutNode>,
    /// Vertical space taken in flow, margins included.
    pub outer_height: f32,
}

impl LayoutNode {
    /// Find the box generated for `id`.
    pub fn find(&self, id: NodeId) -> Option<&LayoutNode> {
        if self.node == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}

pub fn char_advance(c: char, font_size: f32) -> f32 {
    if (c as u32) >= 0x2E80 {
        font_size
    } else {
        font_size * 0.55
    }
}

struct Piece {
    text: String,
    font_size: f32,
    color: Rgba<u8>,
    visible: bool,
}

fn collect_inline(doc: &Document, id: NodeId, style: &ComputedStyle, out: &mut Vec<Piece>) {
    match doc.data(id) {
        Some(NodeData::Text(t)) => out.push(Piece {
            text: t.clone(),
            font_size: style.font_size,
            color: style.color,
            visible: style.visible,
        }),
        Some(NodeData::Element(el)) => {
            let child_style = compute_style(el, style);
            if child_style.display == Display::None {
                return;
            }
            if el.tag == "br" {
                out.push(Piece {
                    text: LINE_BREAK.to_string(),
                    font_size: child_style.font_size,
                    color: child_style.color,
                    visible: child_style.visible,
                });
                return;
            }
            for child in doc.children(id) {
                collect_inline(doc, *child, &child_style, out);
            }
        }
        None => {}
    }
}

/// Wrap inline pieces into lines inside `[x, x + width)`. Returns the runs
/// and the total height.
fn wrap(pieces: &[Piece], x: f32, y: f32, width: f32, center: bool) -> (Vec<TextRun>, f32) {
    let mut lines: Vec<(Vec<TextRun>, f32, f32)> = Vec::new(); // runs, width, height
    let mut runs: Vec<TextRun> = Vec::new();
    let mut line_w = 0.0f32;
    let mut line_h = 0.0f32;
    let mut pending_space = false;

    let flush = |runs: &mut Vec<TextRun>, line_w: &mut f32, line_h: &mut f32, lines: &mut Vec<(Vec<TextRun>, f32, f32)>| {
        if !runs.is_empty() || *line_h > 0.0 {
            lines.push((std::mem::take(runs), *line_w, *line_h));
        }
        *line_w = 0.0;
        *line_h = 0.0;
    };

    for piece in pieces {
        let piece_line_h = piece.font_size * LINE_HEIGHT;
        for c in piece.text.chars() {
            if c == LINE_BREAK {
                line_h = line_h.max(piece_line_h);
                flush(&mut runs, &mut line_w, &mut line_h, &mut lines);
                pending_space = false;
                continue;
            }
            if c.is_whitespace() {
                pending_space = line_w > 0.0;
                continue;
            }
            let space = if pending_space { char_advance(' ', piece.font_size) } else { 0.0 };
            let advance = char_advance(c, piece.font_size);
            if line_w + space + advance > width && line_w > 0.0 {
                flush(&mut runs, &mut line_w, &mut line_h, &mut lines);
            } else if pending_space {
                line_w += space;
            }
            pending_space = false;

            let same_run = runs.last().map_or(false, |r| {
                r.font_size == piece.font_size && r.color == piece.color && r.visible == piece.visible
            });
            let run_end = runs.last().map(|r| r.x + r.text.chars().map(|ch| char_advance(ch, r.font_size)).sum::<f32>());
            if same_run && run_end.map_or(false, |end| (end - line_w).abs() < 0.01) {
                if let Some(r) = runs.last_mut() {
                    r.text.push(c);
                }
            } else {
                runs.push(TextRun {
                    x: line_w,
                    y: 0.0,
                    text: c.to_string(),
                    font_size: piece.font_size,
                    color: piece.color,
                    visible: piece.visible,
                });
            }
            line_w += advance;
            line_h = line_h.max(piece_line_h);
        }
    }
    flush(&mut runs, &mut line_w, &mut line_h, &mut lines);

    let mut out = Vec::new();
    let mut cursor = y;
    for (mut line_runs, w, h) in lines {
        let shift = if center { ((width - w) / 2.0).max(0.0) } else { 0.0 };
        for run in &mut line_runs {
            run.x += x + shift;
            run.y = cursor;
        }
        out.extend(line_runs);
        cursor += h;
    }
    (out, cursor - y)
}

fn replaced_size(el: &Element, style: &ComputedStyle) -> Option<(f32, f32)> {
    let attr = |name: &str| el.attr(name).and_then(|v| length(v, style.font_size));
    let size = match el.tag.as_str() {
        "canvas" => {
            let (w, h) = el.canvas_size();
            (w as f32, h as f32)
        }
        "svg" => (attr("width").unwrap_or(300.0), attr("height").unwrap_or(150.0)),
        "img" => (attr("width").unwrap_or(0.0), attr("height").unwrap_or(0.0)),
        "input" | "select" | "textarea" => (200.0, style.font_size * 1.8),
        _ => return None,
    };
    Some((style.width.unwrap_or(size.0), style.height.unwrap_or(size.1)))
}

fn is_inline_node(doc: &Document, id: NodeId, parent: &ComputedStyle) -> bool {
    match doc.data(id) {
        Some(NodeData::Text(_)) => true,
        Some(NodeData::Element(el)) => compute_style(el, parent).display == Display::Inline,
        None => false,
    }
}

/// Lay out the element `id` with its top-left margin corner at `(x, y)`.
pub fn layout_element(
    doc: &Document,
    id: NodeId,
    parent: &ComputedStyle,
    x: f32,
    y: f32,
    avail_w: f32,
) -> Option<LayoutNode> {
    let el = doc.element(id)?;
    let style = compute_style(el, parent);
    if style.display == Display::None {
        return None;
    }
    if style.display == Display::TableRow {
        return Some(layout_row(doc, id, style, x, y, avail_w));
    }

    let m = style.margin;
    let border = style.border.map_or(0.0, |b| b.0);
    let p = style.padding;
    let replaced = replaced_size(el, &style);

    let mut box_w = match replaced {
        Some((w, _)) => w + p.left + p.right + 2.0 * border,
        None => style.width.unwrap_or(avail_w - m.left - m.right),
    };
    if let Some(max) = style.max_width {
        box_w = box_w.min(max);
    }
    box_w = box_w.max(0.0);
    let box_x = if style.auto_margin_x {
        x + ((avail_w - box_w) / 2.0).max(0.0)
    } else {
        x + m.left
    };
    let content_x = box_x + border + p.left;
    let content_w = (box_w - 2.0 * border - p.left - p.right).max(0.0);
    let content_y = y + m.top + border + p.top;

    let collapsed = style.height == Some(0.0) && !style.overflow_visible;
    let mut children = Vec::new();
    let mut flow_h = 0.0;
    let mut kind = BoxKind::Block;

    if let Some((_, h)) = replaced {
        kind = BoxKind::Replaced;
        flow_h = h;
    } else if !collapsed {
        let mut cursor = content_y;
        let kids = doc.children(id);
        let mut i = 0;
        while i < kids.len() {
            if is_inline_node(doc, kids[i], &style) {
                let mut pieces = Vec::new();
                while i < kids.len() && is_inline_node(doc, kids[i], &style) {
                    collect_inline(doc, kids[i], &style, &mut pieces);
                    i += 1;
                }
                let (runs, h) = wrap(&pieces, content_x, cursor, content_w, style.center_text);
                if !runs.is_empty() {
                    children.push(LayoutNode {
                        node: None,
                        rect: Rect { x: content_x, y: cursor, width: content_w, height: h },
                        style: style.clone(),
                        kind: BoxKind::Text(runs),
                        children: Vec::new(),
                        outer_height: h,
                    });
                    cursor += h;
                }
                continue;
            }
            let child = kids[i];
            i += 1;
            let Some(child_el) = doc.element(child) else { continue };
            let child_style = compute_style(child_el, &style);
            if child_style.position == Position::OutOfFlow {
                let (ox, oy) = child_style.offset;
                if let Some(node) = layout_element(doc, child, &style, content_x + ox, content_y + oy, content_w) {
                    children.push(LayoutNode { outer_height: 0.0, ..node });
                }
                continue;
            }
            if let Some(node) = layout_element(doc, child, &style, content_x, cursor, content_w) {
                cursor += node.outer_height;
                children.push(node);
            }
        }
        flow_h = cursor - content_y;
    }

    let content_h = match (replaced, style.height) {
        (Some(_), _) => flow_h,
        (None, Some(h)) => h,
        (None, None) => flow_h,
    };
    let box_h = content_h + p.top + p.bottom + 2.0 * border;
    Some(LayoutNode {
        node: Some(id),
        rect: Rect {
            x: box_x,
            y: y + m.top,
            width: box_w,
            height: box_h,
        },
        outer_height: m.top + box_h + m.bottom,
        style,
        kind,
        children,
    })
}

fn layout_row(doc: &Document, id: NodeId, style: ComputedStyle, x: f32, y: f32, avail_w: f32) -> LayoutNode {
    let cells: Vec<NodeId> = doc
        .children(id)
        .iter()
        .copied()
        .filter(|c| {
            doc.element(*c)
                .map_or(false, |el| compute_style(el, &style).display != Display::None)
        })
        .collect();
    let cell_w = if cells.is_empty() { 0.0 } else { avail_w / cells.len() as f32 };
    let mut children: Vec<LayoutNode> = cells
        .iter()
        .enumerate()
        .filter_map(|(i, c)| {
            let cell_style = ComputedStyle {
                display: Display::Block,
                ..style.clone()
            };
            layout_element(doc, *c, &cell_style, x + i as f32 * cell_w, y, cell_w)
        })
        .collect();
    let row_h = children.iter().map(|c| c.outer_height).fold(0.0, f32::max);
    for cell in &mut children {
        cell.rect.height = cell.rect.height.max(row_h);
        cell.outer_height = row_h;
    }
    LayoutNode {
        node: Some(id),
        rect: Rect { x, y, width: avail_w, height: row_h },
        style,
        kind: BoxKind::Block,
        children,
        outer_height: row_h,
    }
}

/// Lay out the whole document for a window `width` px wide.
pub fn layout_document(doc: &Document, width: f32) -> Option<LayoutNode> {
    layout_element(doc, doc.root(), &ComputedStyle::root(), 0.0, 0.0, width)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(html: &str, width: f32) -> (Document, LayoutNode) {
        let doc = Document::parse(html);
        let tree = layout_document(&doc, width).unwrap();
        (doc, tree)
    }

    #[test]
    fn blocks_stack_vertically() {
        let (doc, tree) = layout(
            r#"<body style="margin: 0"><div id="a" style="height: 50px"></div><div id="b" style="height: 30px"></div></body>"#,
            200.0,
        );
        let a = tree.find(doc.get_element_by_id("a").unwrap()).unwrap();
        let b = tree.find(doc.get_element_by_id("b").unwrap()).unwrap();
        assert_eq!(a.rect, Rect { x: 0.0, y: 0.0, width: 200.0, height: 50.0 });
        assert_eq!(b.rect.y, 50.0);
    }

    #[test]
    fn display_none_and_fixed_take_no_space() {
        let (doc, tree) = layout(
            r#"<body style="margin: 0"><div style="display: none; height: 90px"></div>
               <div style="position: fixed; top: 5px; height: 40px"></div>
               <div id="c" style="height: 10px"></div></body>"#,
            100.0,
        );
        let c = tree.find(doc.get_element_by_id("c").unwrap()).unwrap();
        assert_eq!(c.rect.y, 0.0);
    }

    #[test]
    fn auto_margins_center_constrained_box() {
        let (doc, tree) = layout(
            r#"<body style="margin: 0"><div id="c" style="max-width: 100px; margin: 0 auto; height: 10px"></div></body>"#,
            300.0,
        );
        let c = tree.find(doc.get_element_by_id("c").unwrap()).unwrap();
        assert_eq!((c.rect.x, c.rect.width), (100.0, 100.0));
    }

    #[test]
    fn text_wraps_to_available_width() {
        let (doc, tree) = layout(
            r#"<body style="margin: 0"><p id="p" style="margin: 0; font-size: 10px">测试测试测试测试</p></body>"#,
            40.0,
        );
        let p = tree.find(doc.get_element_by_id("p").unwrap()).unwrap();
        // four CJK glyphs of 10px per line, line height 14px
        assert_eq!(p.rect.height, 28.0);
    }

    #[test]
    fn table_cells_share_row_width() {
        let (doc, tree) = layout(
            r#"<body style="margin: 0"><table><tbody><tr id="r"><td>a</td><td>b</td></tr></tbody></table></body>"#,
            200.0,
        );
        let row = tree.find(doc.get_element_by_id("r").unwrap()).unwrap();
        assert_eq!(row.children.len(), 2);
        assert_eq!(row.children[1].rect.x, 100.0);
        assert_eq!(row.children[0].rect.width, 100.0);
    }

    #[test]
    fn zero_height_hidden_overflow_collapses_children() {
        let (doc, tree) = layout(
            r#"<body style="margin: 0"><div id="z" style="height: 0px; overflow: hidden"><p>x</p></div></body>"#,
            100.0,
        );
        let z = tree.find(doc.get_element_by_id("z").unwrap()).unwrap();
        assert!(z.children.is_empty());
        assert_eq!(z.rect.height, 0.0);
    }

    #[test]
    fn lengths() {
        assert_eq!(length("12px", 16.0), Some(12.0));
        assert_eq!(length("0", 16.0), Some(0.0));
        assert_eq!(length("1.5em", 10.0), Some(15.0));
        assert_eq!(length("auto", 16.0), None);
    }
}
