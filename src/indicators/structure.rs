use serde::{Deserialize, Serialize};

use crate::models::{Bias, CandleSeries, StructureLabel};

/// Per-bar labels aligned to the series; bars without a label are `None`.
pub type Labels = Vec<Option<StructureLabel>>;

/// Bar `i` carries the break seen between bars `i-2` and `i-1`.
pub fn label_bos(series: &CandleSeries) -> Labels {
    let mut out = vec![None; series.len()];
    for i in 2..series.len() {
        let older = &series[i - 2];
        let newer = &series[i - 1];
        out[i] = if newer.high > older.high && newer.low > older.low {
            Some(StructureLabel::BullishBos)
        } else if newer.high < older.high && newer.low < older.low {
            Some(StructureLabel::BearishBos)
        } else {
            None
        };
    }
    out
}

pub fn label_order_blocks(series: &CandleSeries) -> Labels {
    let mut out = vec![None; series.len()];
    for i in 1..series.len() {
        let prev = &series[i - 1];
        let curr = &series[i];
        out[i] = if curr.is_bullish() && prev.is_bearish() && curr.open < prev.close {
            Some(StructureLabel::BullishOb)
        } else if curr.is_bearish() && prev.is_bullish() && curr.open > prev.close {
            Some(StructureLabel::BearishOb)
        } else {
            None
        };
    }
    out
}

pub fn label_fvg(series: &CandleSeries) -> Labels {
    let mut out = vec![None; series.len()];
    for i in 2..series.len() {
        let two_back = &series[i - 2];
        let curr = &series[i];
        out[i] = if two_back.high < curr.low {
            Some(StructureLabel::BullishFvg)
        } else if two_back.low > curr.high {
            Some(StructureLabel::BearishFvg)
        } else {
            None
        };
    }
    out
}

pub fn label_liquidity_grabs(series: &CandleSeries) -> Labels {
    let mut out = vec![None; series.len()];
    for i in 2..series.len() {
        let prev = &series[i - 1];
        let curr = &series[i];
        out[i] = if curr.low < prev.low && curr.is_bullish() {
            Some(StructureLabel::BullishLiquidityGrab)
        } else if curr.high > prev.high && curr.is_bearish() {
            Some(StructureLabel::BearishLiquidityGrab)
        } else {
            None
        };
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureToggles {
    pub bos: bool,
    pub order_blocks: bool,
    pub fvg: bool,
    pub liquidity_grabs: bool,
}

impl Default for StructureToggles {
    fn default() -> Self {
        Self {
            bos: true,
            order_blocks: true,
            fvg: true,
            liquidity_grabs: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureSummary {
    pub bos: Option<StructureLabel>,
    pub order_block: Option<StructureLabel>,
    pub fvg: Option<StructureLabel>,
    pub liquidity_grab: Option<StructureLabel>,
    pub overall: Bias,
}

impl StructureSummary {
    pub fn labels(&self) -> impl Iterator<Item = StructureLabel> + '_ {
        [self.bos, self.order_block, self.fvg, self.liquidity_grab]
            .into_iter()
            .flatten()
    }
}

/// Latest label from each enabled labeler, plus a strict-majority vote.
pub fn summarize_structure(series: &CandleSeries, toggles: StructureToggles) -> StructureSummary {
    let latest = |enabled: bool, f: fn(&CandleSeries) -> Labels| -> Option<StructureLabel> {
        if !enabled {
            return None;
        }
        f(series).last().copied().flatten()
    };

    let bos = latest(toggles.bos, label_bos);
    let order_block = latest(toggles.order_blocks, label_order_blocks);
    let fvg = latest(toggles.fvg, label_fvg);
    let liquidity_grab = latest(toggles.liquidity_grabs, label_liquidity_grabs);

    let mut summary = StructureSummary {
        bos,
        order_block,
        fvg,
        liquidity_grab,
        overall: Bias::Neutral,
    };
    let bullish = summary.labels().filter(|l| l.bias() == Bias::Bullish).count();
    let bearish = summary.labels().filter(|l| l.bias() == Bias::Bearish).count();
    summary.overall = Bias::from_counts(bullish, bearish);
    summary
}
