//! Default report page.
//!
//! Layout-relevant styling is inline so it survives cloning and is visible to
//! the block rasterizer; the stylesheet only adds cosmetics for real browsers.

/// Element ids and classes the pipeline relies on.
pub mod ids {
    pub const INPUT_PAGE: &str = "input-page";
    pub const REPORT_PAGE: &str = "report-page";
    pub const SCORE_INPUT: &str = "score-input";
    pub const RADAR_CHART: &str = "radarChart";
    pub const EVALUATION_TBODY: &str = "evaluation-tbody";
    pub const NARRATIVE: &str = "text-evaluation-content";
    pub const DIAGRAM: &str = "mermaid-chart";
    pub const COMPASS: &str = "medical-compass-content";
    pub const INPUT_GROUP_CLASS: &str = "single-input-group";
    pub const HEADER_BUTTONS_CLASS: &str = "header-buttons";
    pub const STATUS_TIP_CLASS: &str = "image-generation-tip";
    pub const ERROR_CLASS: &str = "error-message";
    pub const REPORT_SECTION_CLASS: &str = "report-section";
}

pub const DEFAULT_PAGE: &str = r##"<!DOCTYPE html>
<html lang="zh-CN">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>CTA认知能力测评报告</title>
<style>
.page { display: none; }
.page.active { display: block; }
.report-section h3 { color: #1976d2; }
.evaluation-table td { border: 1px solid #ddd; padding: 8px; }
.ability-level-excellent { color: #2e7d32; font-weight: bold; }
.ability-level-average { color: #f57c00; font-weight: bold; }
.ability-level-poor { color: #c62828; font-weight: bold; }
.ranking-display { font-size: 20px; font-weight: bold; color: #1976d2; }
.error-message { color: #c62828; background: #ffebee; padding: 8px; }
</style>
<script src="https://cdn.jsdelivr.net/npm/chart.js"></script>
</head>
<body style="background-color: #e8f0f8; margin: 0; padding: 20px; color: #333333;">
<noscript data-capture="exclude"><div style="background-color: #ffcdd2; padding: 10px;">请启用JavaScript以获得完整体验</div></noscript>
<div class="compat-warning" data-capture="exclude" style="background-color: #fff3cd; padding: 10px; margin: 0 0 10px 0;">⚠️ 检测到浏览器兼容性问题，部分功能可能受限</div>
<div class="container" style="max-width: 1000px; margin: 0 auto; background-color: #ffffff; padding: 20px;">
  <header style="background-color: #1976d2; color: #ffffff; padding: 20px; margin: 0 0 20px 0;">
    <h1 style="font-size: 28px;">CTA认知能力测评报告</h1>
  </header>

  <div id="input-page" class="page active" style="display: block;">
    <div class="single-input-group" style="padding: 20px;">
      <label for="score-input">请输入测评分数（格式：99.9）</label>
      <input id="score-input" type="text" maxlength="4" placeholder="87.5">
    </div>
    <button id="generate-report" type="button">生成报告</button>
  </div>

  <div id="report-page" class="page" style="display: none;">
    <div class="header-buttons" style="position: fixed; top: 20px; right: 20px; padding: 5px;">
      <button id="back-btn" type="button" style="background-color: #9e9e9e; padding: 8px;">返回</button>
      <button id="generate-image-btn" type="button" style="background-color: #4caf50; padding: 8px;">生成长图</button>
    </div>

    <div class="report-section" style="padding: 15px; margin: 0 0 20px 0; background-color: #ffffff;">
      <h3 style="font-size: 20px;">📈 三维能力雷达图</h3>
      <div class="radar-container" style="padding: 10px;">
        <canvas id="radarChart" width="500" height="350"></canvas>
      </div>
      <div class="radar-legend" style="padding: 10px; background-color: #f5f5f5;">
        <p>高阶应用层：<span id="advanced-score">-</span></p>
        <p>综合理解层：<span id="comprehensive-score">-</span></p>
        <p>基础认知层：<span id="basic-score">-</span></p>
      </div>
    </div>

    <div class="report-section" style="padding: 15px; margin: 0 0 20px 0; background-color: #ffffff;">
      <h3 style="font-size: 20px;">📋 三维能力评价</h3>
      <table class="evaluation-table" style="background-color: #fafafa;">
        <thead>
          <tr style="background-color: #e3f2fd;"><th>维度</th><th>得分</th><th>能力诊断</th><th>提升建议</th></tr>
        </thead>
        <tbody id="evaluation-tbody"></tbody>
      </table>
    </div>

    <div class="report-section" style="padding: 15px; margin: 0 0 20px 0; background-color: #ffffff;">
      <h3 style="font-size: 20px;">🧭 能力进化指引</h3>
      <div id="text-evaluation-content"></div>
      <div class="mermaid-container" style="padding: 10px;">
        <div id="mermaid-chart"></div>
      </div>
    </div>

    <div class="report-section" style="padding: 15px; margin: 0 0 20px 0; background-color: #ffffff;">
      <h3 style="font-size: 20px;">🏥 医考航标塔</h3>
      <div id="medical-compass-content"></div>
    </div>
  </div>
</div>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    #[test]
    fn default_page_has_every_fragment_container() {
        let doc = Document::parse(DEFAULT_PAGE);
        for id in [
            ids::INPUT_PAGE,
            ids::REPORT_PAGE,
            ids::SCORE_INPUT,
            ids::RADAR_CHART,
            ids::EVALUATION_TBODY,
            ids::NARRATIVE,
            ids::DIAGRAM,
            ids::COMPASS,
        ] {
            assert!(doc.get_element_by_id(id).is_some(), "missing #{}", id);
        }
        let canvas = doc.get_element_by_id(ids::RADAR_CHART).unwrap();
        assert_eq!(doc.element(canvas).unwrap().canvas_size(), (500, 350));
        assert_eq!(doc.elements_by_class(ids::HEADER_BUTTONS_CLASS).len(), 1);
    }
}
