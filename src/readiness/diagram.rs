//! Development-path flowchart: typed description, SVG engine, static fallback

use std::fmt::Write as _;

use futures::future::{BoxFuture, FutureExt};

use crate::dom::serialize::escape_text;
use crate::report::content::{DevelopmentStage, TimePhases};
use crate::report::format_score;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    Box,
    Decision,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStyle {
    pub fill: &'static str,
    pub stroke: &'static str,
    pub stroke_width: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowNode {
    pub id: &'static str,
    pub lines: Vec<String>,
    pub shape: NodeShape,
    pub style: NodeStyle,
}

/// Flowchart description driven only by the composite score.
#[derive(Debug, Clone, PartialEq)]
pub struct Flowchart {
    pub composite: f64,
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<(&'static str, &'static str)>,
    /// Node ids per row, top to bottom.
    pub layers: Vec<Vec<&'static str>>,
}

fn node(id: &'static str, lines: &[&str], shape: NodeShape, fill: &'static str, stroke: &'static str) -> FlowNode {
    FlowNode {
        id,
        lines: lines.iter().map(|s| s.to_string()).collect(),
        shape,
        style: NodeStyle {
            fill,
            stroke,
            stroke_width: if id == "J" { 3 } else { 2 },
        },
    }
}

impl Flowchart {
    pub fn for_score(composite: f64) -> Self {
        let phases = TimePhases::for_score(composite);
        let score = format!("综合得分: {}", format_score(composite));
        let nodes = vec![
            node("A", &["📊 当前状态", score.as_str()], NodeShape::Box, "#e1f5fe", "#2196F3"),
            node("B", &["🔍 能力诊断"], NodeShape::Decision, "#fff3e0", "#FF9800"),
            node("C", &["📚 基础认知强化", "记忆、注意、感知"], NodeShape::Box, "#fff3e0", "#FF9800"),
            node("D", &["🧠 综合理解提升", "信息整合、分析推理"], NodeShape::Box, "#f3e5f5", "#9C27B0"),
            node("E", &["🚀 高阶应用发展", "创新思维、问题解决"], NodeShape::Box, "#fce4ec", "#E91E63"),
            node("F", &["⏱️ 基础训练阶段", phases.foundation], NodeShape::Box, "#ffecb3", "#FFC107"),
            node("G", &["🔄 能力整合阶段", phases.integration], NodeShape::Box, "#f1f8e9", "#8BC34A"),
            node("H", &["⭐ 高阶发展阶段", phases.advanced], NodeShape::Box, "#fde7f3", "#FF4081"),
            node("I", &["💪 进阶提升"], NodeShape::Box, "#e8f5e8", "#4CAF50"),
            node("J", &["🎯 成功上岸"], NodeShape::Box, "#c8e6c9", "#4CAF50"),
        ];
        Self {
            composite,
            nodes,
            edges: vec![
                ("A", "B"),
                ("B", "C"),
                ("B", "D"),
                ("B", "E"),
                ("C", "F"),
                ("D", "G"),
                ("E", "H"),
                ("F", "I"),
                ("G", "I"),
                ("H", "I"),
                ("I", "J"),
            ],
            layers: vec![vec!["A"], vec!["B"], vec!["C", "D", "E"], vec!["F", "G", "H"], vec!["I"], vec!["J"]],
        }
    }

    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Mermaid `graph TD` source, for external diagram engines.
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");
        let label = |n: &FlowNode| {
            let text = n.lines.join("<br/>");
            match n.shape {
                NodeShape::Box => format!("{}[\"{}\"]", n.id, text),
                NodeShape::Decision => format!("{}{{\"{}\"}}", n.id, text),
            }
        };
        let mut declared = std::collections::HashSet::new();
        for (from, to) in &self.edges {
            let mut side = |id: &str| match self.node(id) {
                Some(n) if declared.insert(n.id) => label(n),
                _ => id.to_string(),
            };
            let left = side(from);
            let right = side(to);
            let _ = writeln!(out, "    {} --> {}", left, right);
        }
        for n in &self.nodes {
            let _ = writeln!(
                out,
                "    style {} fill:{},stroke:{},stroke-width:{}px",
                n.id, n.style.fill, n.style.stroke, n.style.stroke_width
            );
        }
        out
    }
}

/// Renders a flowchart description to SVG markup.
pub trait DiagramEngine: Send + Sync {
    fn name(&self) -> &str;

    fn render<'a>(&'a self, chart: &'a Flowchart) -> BoxFuture<'a, Result<String>>;
}

/// Container markup for a successfully rendered diagram.
pub fn wrap_svg(svg: &str) -> String {
    format!(
        "<div style=\"background: white; padding: 20px; border-radius: 8px; text-align: center;\">{}</div>",
        svg
    )
}

/// Layered top-down layout emitted as plain SVG (`rect`, `polygon`, `line`,
/// `text`).
#[derive(Debug, Clone)]
pub struct SvgFlowchart {
    pub width: u32,
    pub node_width: u32,
    pub node_height: u32,
    pub row_gap: u32,
    pub font_size: u32,
}

impl Default for SvgFlowchart {
    fn default() -> Self {
        Self {
            width: 760,
            node_width: 200,
            node_height: 56,
            row_gap: 40,
            font_size: 14,
        }
    }
}

impl SvgFlowchart {
    fn positions(&self, chart: &Flowchart) -> Vec<(&'static str, u32, u32)> {
        let mut out = Vec::new();
        for (row, ids) in chart.layers.iter().enumerate() {
            let y = 10 + row as u32 * (self.node_height + self.row_gap);
            let slot = self.width / ids.len().max(1) as u32;
            for (i, id) in ids.iter().enumerate() {
                let cx = slot * i as u32 + slot / 2;
                out.push((*id, cx.saturating_sub(self.node_width / 2), y));
            }
        }
        out
    }

    pub fn to_svg(&self, chart: &Flowchart) -> String {
        let pos = self.positions(chart);
        let at = |id: &str| pos.iter().find(|(n, _, _)| *n == id).map(|(_, x, y)| (*x, *y));
        let height = 10 + chart.layers.len() as u32 * (self.node_height + self.row_gap);

        let mut svg = String::new();
        let _ = write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
            w = self.width,
            h = height
        );
        for (from, to) in &chart.edges {
            if let (Some((fx, fy)), Some((tx, ty))) = (at(from), at(to)) {
                let _ = write!(
                    svg,
                    "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"#666666\" stroke-width=\"2\"></line>",
                    fx + self.node_width / 2,
                    fy + self.node_height,
                    tx + self.node_width / 2,
                    ty
                );
            }
        }
        for n in &chart.nodes {
            let Some((x, y)) = at(n.id) else { continue };
            match n.shape {
                NodeShape::Box => {
                    let _ = write!(
                        svg,
                        "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" rx=\"6\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\"></rect>",
                        x, y, self.node_width, self.node_height, n.style.fill, n.style.stroke, n.style.stroke_width
                    );
                }
                NodeShape::Decision => {
                    let (cx, cy) = (x + self.node_width / 2, y + self.node_height / 2);
                    let _ = write!(
                        svg,
                        "<polygon points=\"{},{} {},{} {},{} {},{}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\"></polygon>",
                        cx, y, x + self.node_width, cy, cx, y + self.node_height, x, cy,
                        n.style.fill, n.style.stroke, n.style.stroke_width
                    );
                }
            }
            let line_h = self.font_size + 4;
            let block = line_h * n.lines.len() as u32;
            let first = y + (self.node_height.saturating_sub(block)) / 2 + self.font_size;
            for (i, line) in n.lines.iter().enumerate() {
                let _ = write!(
                    svg,
                    "<text x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-size=\"{}\" fill=\"#333333\">{}</text>",
                    x + self.node_width / 2,
                    first + i as u32 * line_h,
                    self.font_size,
                    escape_text(line)
                );
            }
        }
        svg.push_str("</svg>");
        svg
    }
}

impl DiagramEngine for SvgFlowchart {
    fn name(&self) -> &str {
        "svg-flowchart"
    }

    fn render<'a>(&'a self, chart: &'a Flowchart) -> BoxFuture<'a, Result<String>> {
        async move { Ok(self.to_svg(chart)) }.boxed()
    }
}

/// Static text flowchart used when no engine is available, it fails, or it
/// runs out of time.
pub fn fallback_markup(composite: f64) -> String {
    let stage = DevelopmentStage::for_score(composite);
    let phases = TimePhases::for_score(composite);
    let step = |bg: &str, title: &str, body: &str| {
        format!(
            "<div style=\"background: {}; padding: 10px; margin: 10px; border-radius: 5px;\"><strong>{}</strong><br>{}</div>",
            bg, title, body
        )
    };
    let arrow = "<div style=\"margin: 10px; font-size: 18px;\">↓</div>";
    format!(
        "<div style=\"background: #f8f9fa; padding: 20px; border-radius: 8px; text-align: center;\"><h4>进化路径流程图</h4>{}{}{}{}{}{}{}</div>",
        step(
            "#e1f5fe",
            "📊 当前状态",
            &format!("综合得分: {}<br>所处阶段: {}", format_score(composite), stage.label())
        ),
        arrow,
        step("#fff3e0", "🔍 能力诊断", "多维度评估分析"),
        arrow,
        step(
            "#ffecb3",
            "⏱️ 阶段时间规划",
            &format!(
                "基础训练阶段: {}<br>能力整合阶段: {}<br>高阶发展阶段: {}",
                phases.foundation, phases.integration, phases.advanced
            )
        ),
        arrow,
        step("#e8f5e8", "🎯 目标", "全面能力提升，成功上岸"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flowchart_carries_score_and_phases() {
        let chart = Flowchart::for_score(92.0);
        assert_eq!(chart.node("A").unwrap().lines[1], "综合得分: 92.0");
        assert_eq!(chart.node("F").unwrap().lines[1], "0.5-1个月");
        assert_eq!(chart.node("H").unwrap().lines[1], "2-3个月");
        assert_eq!(chart.edges.len(), 11);
        assert_eq!(chart.node("J").unwrap().style.stroke_width, 3);
    }

    #[test]
    fn mermaid_source_declares_each_node_once() {
        let src = Flowchart::for_score(50.0).to_mermaid();
        assert!(src.starts_with("graph TD\n"));
        assert!(src.contains("A[\"📊 当前状态<br/>综合得分: 50.0\"] --> B{\"🔍 能力诊断\"}"));
        assert_eq!(src.matches("[\"💪 进阶提升\"]").count(), 1);
        assert!(src.contains("style J fill:#c8e6c9,stroke:#4CAF50,stroke-width:3px"));
    }

    #[test]
    fn svg_has_a_shape_and_label_per_node() {
        let svg = SvgFlowchart::default().to_svg(&Flowchart::for_score(75.0));
        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("<rect").count(), 9);
        assert_eq!(svg.matches("<polygon").count(), 1);
        assert_eq!(svg.matches("<line").count(), 11);
        assert!(svg.contains("1.5-3个月"));
    }

    #[test]
    fn fallback_contains_stage_score_and_phases() {
        let html = fallback_markup(92.0);
        assert!(html.contains("综合得分: 92.0"));
        assert!(html.contains("所处阶段: 高阶发展阶段"));
        assert!(html.contains("0.5-1个月"));
        assert!(html.contains("1-2个月"));
        assert!(html.contains("2-3个月"));
        assert!(html.len() > 100);
    }
}
