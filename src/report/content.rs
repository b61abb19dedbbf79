//! Report content generators: pure functions from scores to markup and text.

use super::score::{format_score, Dimension, DimensionScores};

/// Per-dimension performance tier (thresholds 7 and 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Excellent,
    Good,
    Poor,
}

impl Tier {
    pub fn of(score: u8) -> Self {
        if score >= 7 {
            Tier::Excellent
        } else if score >= 4 {
            Tier::Good
        } else {
            Tier::Poor
        }
    }

    /// Single-character level used by the diagnosis lookup.
    pub fn level_char(self) -> char {
        match self {
            Tier::Excellent => '高',
            Tier::Good => '中',
            Tier::Poor => '低',
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Tier::Excellent => "ability-level-excellent",
            Tier::Good => "ability-level-average",
            Tier::Poor => "ability-level-poor",
        }
    }
}

pub fn ability_label(dim: Dimension, score: u8) -> &'static str {
    match (dim, Tier::of(score)) {
        (Dimension::Basic, Tier::Excellent) => "知识仓储系统高效",
        (Dimension::Basic, Tier::Good) => "碎片化记忆效率待提升",
        (Dimension::Basic, Tier::Poor) => "考点识别机制薄弱",
        (Dimension::Comprehensive, Tier::Excellent) => "命题逻辑反向推演专家",
        (Dimension::Comprehensive, Tier::Good) => "中等难度题耗时过高",
        (Dimension::Comprehensive, Tier::Poor) => "题干解码能力不足",
        (Dimension::Advanced, Tier::Excellent) => "满分题精算师",
        (Dimension::Advanced, Tier::Good) => "风险收益评估待优化",
        (Dimension::Advanced, Tier::Poor) => "决策时间分配失衡",
    }
}

pub fn advice(dim: Dimension, score: u8) -> &'static str {
    match (dim, Tier::of(score)) {
        (Dimension::Advanced, Tier::Excellent) => "训练模糊证据处置范式，实现疑难项辨析精准度＞90%。",
        (Dimension::Advanced, Tier::Good) => {
            "开发处置方案评分卡（正确率×分值权重），优先攻克权重＞15%的战略题型。"
        }
        (Dimension::Advanced, Tier::Poor) => {
            "建立\"黄金8分钟\"机制：复杂题限时完成，超时保留标记转战基础题。"
        }
        (Dimension::Comprehensive, Tier::Excellent) => "掌握命题人思维建模技术，能预判干扰项设置逻辑。",
        (Dimension::Comprehensive, Tier::Good) => {
            "推行\"两分钟法则\"：超过时限自动启用排除法，同步训练最优选项识别眼动模式。"
        }
        (Dimension::Comprehensive, Tier::Poor) => {
            "强化题干关键词捕捉训练（但/除外/最可能），建立错题陷阱类型库。"
        }
        (Dimension::Basic, Tier::Excellent) => "优化记忆提取路径，训练跨模块概念瞬时关联能力。",
        (Dimension::Basic, Tier::Good) => "开发概念聚类记忆法，压缩记忆检索时间＜3秒/概念。",
        (Dimension::Basic, Tier::Poor) => "建立高频考点雷达图，优先掌握占分比＞5%的核心术语记忆策略。",
    }
}

/// Rows of the three-dimension evaluation table.
pub fn evaluation_rows_html(scores: &DimensionScores) -> String {
    Dimension::ALL
        .iter()
        .map(|dim| {
            let score = scores.get(*dim);
            format!(
                "<tr><td><strong>{}</strong></td><td><span class=\"score-highlight\">{}</span></td><td><span class=\"{}\">{}</span></td><td>{}</td></tr>",
                dim.label(),
                score,
                Tier::of(score).css_class(),
                ability_label(*dim, score),
                advice(*dim, score)
            )
        })
        .collect()
}

/// Strongest and weakest dimension. Ties keep report order.
pub fn strongest_and_weakest(scores: &DimensionScores) -> (Dimension, Dimension) {
    let mut dims = Dimension::ALL;
    dims.sort_by(|a, b| scores.get(*b).cmp(&scores.get(*a)));
    (dims[0], dims[2])
}

/// Personalized development narrative.
pub fn narrative_html(scores: &DimensionScores) -> String {
    let (strongest, weakest) = strongest_and_weakest(scores);
    let (s_name, s_score) = (strongest.label(), scores.get(strongest));
    let (w_name, w_score) = (weakest.label(), scores.get(weakest));
    format!(
        concat!(
            "<div style=\"line-height: 1.8;\">",
            "<h4>💡 个性化发展建议</h4>",
            "<p><strong>优势维度：</strong>{s}（{ss}分）</p>",
            "<p>继续发挥您在{s}方面的优势，这是您认知能力的核心竞争力。</p>",
            "<p><strong>提升重点：</strong>{w}（{ws}分）</p>",
            "<p>建议重点关注{w}的提升，这将显著提高您的整体认知表现。</p>",
            "<h4>🎯 发展路径规划</h4>",
            "<ul>",
            "<li><strong>短期目标（1-3个月）：</strong>针对{w}进行专项训练</li>",
            "<li><strong>中期目标（3-6个月）：</strong>整体提升各维度能力，实现均衡发展</li>",
            "<li><strong>长期目标（6-12个月）：</strong>形成个人独特的认知优势体系</li>",
            "</ul>",
            "</div>"
        ),
        s = s_name,
        ss = s_score,
        w = w_name,
        ws = w_score
    )
}

/// Development stage shown on the flowchart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevelopmentStage {
    Foundation,
    Integration,
    Advanced,
}

impl DevelopmentStage {
    pub fn for_score(composite: f64) -> Self {
        if composite >= 85.0 {
            DevelopmentStage::Advanced
        } else if composite >= 70.0 {
            DevelopmentStage::Integration
        } else {
            DevelopmentStage::Foundation
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DevelopmentStage::Foundation => "基础训练阶段",
            DevelopmentStage::Integration => "能力整合阶段",
            DevelopmentStage::Advanced => "高阶发展阶段",
        }
    }
}

/// Expected duration of the three training phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimePhases {
    pub foundation: &'static str,
    pub integration: &'static str,
    pub advanced: &'static str,
}

impl TimePhases {
    pub fn for_score(composite: f64) -> Self {
        if composite >= 85.0 {
            TimePhases {
                foundation: "0.5-1个月",
                integration: "1-2个月",
                advanced: "2-3个月",
            }
        } else if composite >= 70.0 {
            TimePhases {
                foundation: "1-1.5个月",
                integration: "1.5-3个月",
                advanced: "3-5个月",
            }
        } else {
            TimePhases {
                foundation: "1-2个月",
                integration: "2-4个月",
                advanced: "4-6个月",
            }
        }
    }
}

pub fn talent_type(composite: f64) -> &'static str {
    if composite >= 85.0 {
        "卓越型"
    } else if composite >= 70.0 {
        "稳健型"
    } else if composite >= 50.0 {
        "成长型"
    } else {
        "基础型"
    }
}

/// Percentile bucket for the national ranking. Lower bound inclusive,
/// upper bound exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingBucket {
    pub base: f64,
    pub min: f64,
    pub max: f64,
    /// How far the percentile falls across the bucket.
    pub drop: f64,
}

const RANKING_BUCKETS: [RankingBucket; 7] = [
    RankingBucket { base: 5.0, min: 95.0, max: 100.0, drop: 5.0 },
    RankingBucket { base: 19.0, min: 85.0, max: 95.0, drop: 14.0 },
    RankingBucket { base: 34.0, min: 75.0, max: 85.0, drop: 15.0 },
    RankingBucket { base: 50.0, min: 65.0, max: 75.0, drop: 16.0 },
    RankingBucket { base: 64.0, min: 45.0, max: 65.0, drop: 14.0 },
    RankingBucket { base: 74.0, min: 25.0, max: 45.0, drop: 10.0 },
    RankingBucket { base: 84.0, min: 0.0, max: 25.0, drop: 10.0 },
];

impl RankingBucket {
    pub fn for_score(composite: f64) -> Self {
        RANKING_BUCKETS
            .iter()
            .copied()
            .find(|b| composite >= b.min)
            .unwrap_or(RANKING_BUCKETS[RANKING_BUCKETS.len() - 1])
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Percentile position, interpolated linearly inside the bucket and
/// floored at 0.1.
pub fn ranking(composite: f64) -> f64 {
    let bucket = RankingBucket::for_score(composite);
    let ratio = (composite - bucket.min) / (bucket.max - bucket.min);
    round1(bucket.base - ratio * bucket.drop).max(0.1)
}

pub fn ranking_display(composite: f64) -> String {
    let r = ranking(composite);
    if composite >= 65.0 {
        format!("前{}%", r)
    } else {
        format!("{}%", r)
    }
}

/// Points missing to reach the next bucket; 0 at the top bucket.
pub fn gap_to_next_level(composite: f64) -> f64 {
    let bucket = RankingBucket::for_score(composite);
    if bucket.min >= 95.0 {
        0.0
    } else {
        round1(bucket.max - composite)
    }
}

pub fn matched_units(composite: f64) -> &'static str {
    if composite >= 90.0 {
        "省级核心（三甲省属）、一线地市（三甲）"
    } else if composite >= 80.0 {
        "一线地市（二级单位）、市级枢纽（三甲/优质三乙）"
    } else if composite >= 70.0 {
        "市级枢纽（二级单位）、县域中心（三甲）"
    } else if composite >= 60.0 {
        "县域中心（三乙/二甲）、县域副中心（三甲）"
    } else if composite >= 50.0 {
        "镇级单位（三级、二级单位）、镇级社区卫生中心"
    } else {
        "基层网络（乡镇卫生院、卫生所）"
    }
}

/// Keyed by basic, comprehensive, advanced level.
const DIAGNOSIS: [(&str, &str); 27] = [
    ("低低低", "基础薄弱且缺乏解题策略，急需系统化应试训练。"),
    ("低低中", "应用题策略初见成效，但知识储备和题干解读能力严重不足。"),
    ("低低高", "高阶应试技巧突出，但基础不牢导致整体稳定性差。"),
    ("低中低", "题干理解能力中等，但基础记忆和复杂题决策能力双弱。"),
    ("低中中", "中等题处理尚可，但基础漏洞和难题攻坚能力制约提分空间。"),
    ("低中高", "中高难度题应对良好，基础薄弱成为分数突破瓶颈。"),
    ("低高低", "阅读理解能力优秀，但知识储备与应用策略双缺。"),
    ("低高中", "理解层优势明显，基础记忆和难题精算能力需补强。"),
    ("低高高", "理解与应用能力出色，基础术语记忆拖累整体表现。"),
    ("中低低", "基础记忆中等，题干理解缺陷制约分数提升。"),
    ("中低中", "基础与应用能力中等，题干解读能力亟需强化。"),
    ("中低高", "基础与应用双优，题干解读能力不足导致中等题意外失分。"),
    ("中中低", "基础扎实、理解中等，但复杂题时间管理及决策策略存在硬伤。"),
    ("中中中", "基础与理解稳固，应用题策略中等，需聚焦压轴题得分效率。"),
    ("中中高", "基础与理解良好，应用题优势显著，具备冲击顶尖分数潜力。"),
    ("中高低", "基础与理解双优，但应用层决策失误率高，需紧急补救。"),
    ("中高中", "全科能力优异，压轴题攻坚稳定性不足阻碍满分突破。"),
    ("中高高", "接近顶尖水平，细节完善后可实现全面突破。"),
    ("高低低", "基础扎实但理解与应用双弱，需强化题干分析和解题策略。"),
    ("高低中", "基础优秀、应用中等，题干理解能力成为提分关键。"),
    ("高低高", "基础与应用双优，题干解读能力不足导致中等题意外失分。"),
    ("高中低", "基础扎实、理解中等，但复杂题时间管理及决策策略存在硬伤。"),
    ("高中中", "基础与理解稳固，应用题策略中等，需聚焦压轴题得分效率。"),
    ("高中高", "基础与理解良好，应用题优势显著，具备冲击顶尖分数潜力。"),
    ("高高低", "基础与理解双优，但应用层决策失误率高，需紧急补救。"),
    ("高高中", "全科能力优异，压轴题攻坚稳定性不足阻碍满分突破。"),
    ("高高高", "顶尖应试机器，具备精准考点定位、题干解析及难题攻坚能力。"),
];

pub fn diagnosis(scores: &DimensionScores) -> &'static str {
    let key: String = [scores.basic(), scores.comprehensive(), scores.advanced()]
        .iter()
        .map(|s| Tier::of(*s).level_char())
        .collect();
    DIAGNOSIS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .unwrap_or("评价数据异常，请重新测试。")
}

/// The "medical compass" panel: positioning, ranking, matched units, warning.
pub fn compass_html(scores: &DimensionScores) -> String {
    let composite = scores.composite();
    let score_text = format_score(composite);
    let rank = ranking_display(composite);
    let gap = gap_to_next_level(composite);
    let (warning, hint) = if gap > 0.0 {
        (
            format!("距离上一级目标差{}分", gap),
            "建议重点提升薄弱维度，通过针对性训练可快速进入下一能力等级。",
        )
    } else {
        (
            "已达到最高等级".to_string(),
            "恭喜您已达到最高等级！继续保持并发挥您的优势。",
        )
    };

    format!(
        concat!(
            "<div class=\"compass-section\"><h4>🏥 能力定位</h4>",
            "<p class=\"ranking-display\">{talent}</p><p>{diag}</p></div>",
            "<div class=\"compass-section\"><h4>📊 全国排名</h4>",
            "<p class=\"ranking-display\">{rank}</p><p>综合得分：{score}分</p>",
            "<p>您的综合能力在全国医学生排名{rank}，该排名为综合排名。</p></div>",
            "<div class=\"compass-section\"><h4>🎯 适配报考单位</h4>",
            "<p class=\"ranking-display\">{units}</p>",
            "<p>根据您的综合评分{score}分，建议您重点关注以上类型的医疗单位。</p>",
            "<p>这些单位与您当前的能力水平匹配度较高，有较大概率能成功上岸。</p></div>",
            "<div class=\"compass-section\"><h4>⚠️ 预警提示</h4>",
            "<div class=\"warning-alert\"><p><strong>{warning}</strong></p><p>{hint}</p></div></div>"
        ),
        talent = talent_type(composite),
        diag = diagnosis(scores),
        rank = rank,
        score = score_text,
        units = matched_units(composite),
        warning = warning,
        hint = hint
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(a: u8, c: u8, b: u8) -> DimensionScores {
        DimensionScores::new(a, c, b).unwrap()
    }

    #[test]
    fn ranking_bucket_boundaries_are_inclusive_lower() {
        let base = |v: f64| RankingBucket::for_score(v).base;
        assert_eq!(base(24.9), 84.0);
        assert_eq!(base(25.0), 74.0);
        assert_eq!(base(40.0), 74.0);
        assert_eq!(base(44.9), 74.0);
        assert_eq!(base(45.0), 64.0);
        assert_eq!(base(65.0), 50.0);
        assert_eq!(base(75.0), 34.0);
        assert_eq!(base(85.0), 19.0);
        assert_eq!(base(95.0), 5.0);
        assert_eq!(base(100.0), 5.0);

        let b = RankingBucket::for_score(40.0);
        assert_eq!((b.min, b.max), (25.0, 45.0));
    }

    #[test]
    fn ranking_interpolates_and_floors() {
        assert_eq!(ranking(40.0), 66.5);
        assert_eq!(ranking(45.0), 64.0);
        assert_eq!(ranking(100.0), 0.1);
        assert_eq!(ranking_display(70.0), "前42%");
        assert_eq!(ranking_display(40.0), "66.5%");
    }

    #[test]
    fn gap_to_next_level_by_bucket() {
        assert_eq!(gap_to_next_level(96.0), 0.0);
        assert_eq!(gap_to_next_level(90.0), 5.0);
        assert_eq!(gap_to_next_level(40.0), 5.0);
        assert_eq!(gap_to_next_level(10.3), 14.7);
    }

    #[test]
    fn stage_and_time_phases_for_top_scores() {
        assert_eq!(DevelopmentStage::for_score(92.0).label(), "高阶发展阶段");
        assert_eq!(DevelopmentStage::for_score(84.9).label(), "能力整合阶段");
        assert_eq!(DevelopmentStage::for_score(10.0).label(), "基础训练阶段");
        let phases = TimePhases::for_score(92.0);
        assert_eq!(
            (phases.foundation, phases.integration, phases.advanced),
            ("0.5-1个月", "1-2个月", "2-3个月")
        );
    }

    #[test]
    fn diagnosis_uses_basic_comprehensive_advanced_order() {
        assert_eq!(diagnosis(&scores(9, 9, 9)), "顶尖应试机器，具备精准考点定位、题干解析及难题攻坚能力。");
        // basic high, comprehensive low, advanced mid
        assert_eq!(diagnosis(&scores(5, 1, 8)), "基础优秀、应用中等，题干理解能力成为提分关键。");
    }

    #[test]
    fn narrative_names_strongest_and_weakest() {
        let html = narrative_html(&scores(3, 8, 5));
        assert!(html.contains("<strong>优势维度：</strong>综合理解层（8分）"));
        assert!(html.contains("<strong>提升重点：</strong>高阶应用层（3分）"));
    }

    #[test]
    fn evaluation_rows_cover_three_dimensions() {
        let html = evaluation_rows_html(&scores(8, 5, 2));
        assert_eq!(html.matches("<tr>").count(), 3);
        assert!(html.contains("满分题精算师"));
        assert!(html.contains("中等难度题耗时过高"));
        assert!(html.contains("考点识别机制薄弱"));
    }

    #[test]
    fn compass_mentions_score_and_warning() {
        let html = compass_html(&scores(9, 9, 9));
        assert!(html.contains("综合得分：100.0分"));
        assert!(html.contains("已达到最高等级"));
        assert!(html.contains("卓越型"));
    }
}
