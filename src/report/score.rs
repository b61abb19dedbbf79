//! Score model: one `NN.N` input -> three dimension scores -> composite

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::{Error, Result};

/// Upper bound of every dimension score.
pub const MAX_DIMENSION_SCORE: u8 = 9;

/// The three assessed dimensions, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Advanced,
    Comprehensive,
    Basic,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Advanced, Dimension::Comprehensive, Dimension::Basic];

    pub fn label(self) -> &'static str {
        match self {
            Dimension::Advanced => "高阶应用层",
            Dimension::Comprehensive => "综合理解层",
            Dimension::Basic => "基础认知层",
        }
    }

    /// Id suffix used by the legend elements (`#advanced-score`, ...).
    pub fn key(self) -> &'static str {
        match self {
            Dimension::Advanced => "advanced",
            Dimension::Comprehensive => "comprehensive",
            Dimension::Basic => "basic",
        }
    }
}

/// Immutable snapshot of the three dimension scores, each in `[0, 9]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DimensionScores {
    advanced: u8,
    comprehensive: u8,
    basic: u8,
}

impl DimensionScores {
    pub fn new(advanced: u8, comprehensive: u8, basic: u8) -> Result<Self> {
        for (name, v) in [("advanced", advanced), ("comprehensive", comprehensive), ("basic", basic)] {
            if v > MAX_DIMENSION_SCORE {
                return Err(Error::InvalidInput(format!(
                    "{} score {} exceeds {}",
                    name, v, MAX_DIMENSION_SCORE
                )));
            }
        }
        Ok(Self {
            advanced,
            comprehensive,
            basic,
        })
    }

    /// Parse the `NN.N` input field: tens digit -> advanced, units digit ->
    /// comprehensive, tenths digit -> basic.
    pub fn parse_input(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::InvalidInput("请输入分数".into()));
        }
        if input.chars().count() != 4 {
            return Err(Error::InvalidInput("请输入99.9格式的分数".into()));
        }
        if !input_pattern()?.is_match(input) {
            return Err(Error::InvalidInput("请输入有效的分数格式（99.9）".into()));
        }
        let value: f64 = input
            .parse()
            .map_err(|_| Error::InvalidInput("请输入有效的分数格式（99.9）".into()))?;
        if !(0.0..=99.9).contains(&value) {
            return Err(Error::InvalidInput("分数应在0.0-99.9之间".into()));
        }

        let digits: Vec<u8> = input
            .bytes()
            .filter(u8::is_ascii_digit)
            .map(|b| b - b'0')
            .collect();
        match digits.as_slice() {
            [a, c, b] => Self::new(*a, *c, *b),
            _ => Err(Error::InvalidInput("请输入有效的分数格式（99.9）".into())),
        }
    }

    pub fn advanced(&self) -> u8 {
        self.advanced
    }

    pub fn comprehensive(&self) -> u8 {
        self.comprehensive
    }

    pub fn basic(&self) -> u8 {
        self.basic
    }

    pub fn get(&self, dim: Dimension) -> u8 {
        match dim {
            Dimension::Advanced => self.advanced,
            Dimension::Comprehensive => self.comprehensive,
            Dimension::Basic => self.basic,
        }
    }

    /// Weighted blend into `[0, 100]`. Recomputed on every call.
    ///
    /// Terms are summed basic first; the tier thresholds at 50 and 90 are
    /// sensitive to the floating point order.
    pub fn composite(&self) -> f64 {
        let max = f64::from(MAX_DIMENSION_SCORE);
        let basic = f64::from(self.basic) / max;
        let comprehensive = f64::from(self.comprehensive) / max;
        let advanced = f64::from(self.advanced) / max;
        (basic * 0.2 + comprehensive * 0.3 + advanced * 0.5) * 100.0
    }

    pub fn sum(&self) -> u32 {
        u32::from(self.advanced) + u32::from(self.comprehensive) + u32::from(self.basic)
    }
}

impl fmt::Display for DimensionScores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}.{}", self.advanced, self.comprehensive, self.basic)
    }
}

fn input_pattern() -> Result<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[0-9]{2}\.[0-9]$").ok())
        .as_ref()
        .ok_or_else(|| Error::Other("score input pattern failed to compile".into()))
}

/// Format a composite score the way the report prints it.
pub fn format_score(value: f64) -> String {
    format!("{:.1}", value)
}
