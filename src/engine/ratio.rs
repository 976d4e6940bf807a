// ==========================================
// 考试引擎 - 题型比例与分值分配
// ==========================================
// 1. 比例解析: Σ ratio == 1（残差计入编码最大的题型）
// 2. 分值分配: 非简答题按比例四舍五入到 2 位；简答题平分剩余分值
// 3. Σ 分值 == 100.00
// ==========================================

use crate::domain::types::QuestionType;
use crate::engine::error::{EngineError, EngineResult};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;

/// 试卷满分
pub const FULL_MARKS: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// 题型权重（自动比例）
pub fn type_weight(question_type: QuestionType) -> Decimal {
    match question_type {
        QuestionType::SingleChoice => Decimal::new(10, 1),
        QuestionType::MultipleChoice => Decimal::new(15, 1),
        QuestionType::TrueFalse => Decimal::new(8, 1),
        QuestionType::FillBlank => Decimal::new(12, 1),
        QuestionType::Essay => Decimal::new(20, 1),
    }
}

/// 四舍五入（0.5 远离零）到 2 位小数
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// 只保留题量为正的题型
pub fn active_counts(counts: &BTreeMap<QuestionType, u32>) -> BTreeMap<QuestionType, u32> {
    counts
        .iter()
        .filter(|(_, c)| **c > 0)
        .map(|(t, c)| (*t, *c))
        .collect()
}

/// 解析各题型比例，保证总和恰为 1
///
/// - 传入比例: 丢弃题量 ≤0 的题型，未给比例的题型按 0 计；
///   总和与 1 的差额计入编码最大的题型
/// - 未传比例: (题量/总题量) × 题型权重，归一后同样做残差吸收
pub fn resolve_ratios(
    counts: &BTreeMap<QuestionType, u32>,
    supplied: Option<&BTreeMap<QuestionType, Decimal>>,
) -> EngineResult<BTreeMap<QuestionType, Decimal>> {
    let active = active_counts(counts);
    if active.is_empty() {
        return Err(EngineError::Validation("至少需要一种题型的题量大于0".to_string()));
    }

    let mut ratios: BTreeMap<QuestionType, Decimal> = match supplied {
        Some(supplied) => {
            let mut ratios = BTreeMap::new();
            for t in active.keys() {
                let r = supplied.get(t).copied().unwrap_or(Decimal::ZERO);
                if r.is_sign_negative() && !r.is_zero() {
                    return Err(EngineError::InvalidRatioSum(format!("题型{}比例为负: {}", t, r)));
                }
                ratios.insert(*t, r);
            }
            ratios
        }
        None => {
            let total: Decimal = active.values().map(|c| Decimal::from(*c)).sum();
            let weighted: BTreeMap<QuestionType, Decimal> = active
                .iter()
                .map(|(t, c)| (*t, Decimal::from(*c) / total * type_weight(*t)))
                .collect();
            let weight_sum: Decimal = weighted.values().copied().sum();
            if weight_sum.is_zero() {
                return Err(EngineError::InvalidRatioSum("权重总和为0".to_string()));
            }
            weighted
                .into_iter()
                .map(|(t, w)| (t, w / weight_sum))
                .collect()
        }
    };

    let sum: Decimal = ratios.values().copied().sum();
    if sum.is_zero() {
        return Err(EngineError::InvalidRatioSum("比例全部为0".to_string()));
    }

    let residual = Decimal::ONE - sum;
    if !residual.is_zero() {
        // active 非空，最大键一定存在
        if let Some((largest, ratio)) = ratios.iter_mut().next_back() {
            *ratio += residual;
            if ratio.is_sign_negative() && !ratio.is_zero() {
                return Err(EngineError::InvalidRatioSum(format!(
                    "残差{}计入题型{}后比例为负",
                    residual, largest
                )));
            }
            tracing::debug!(question_type = %largest, %residual, "比例残差已吸收");
        }
    }

    Ok(ratios)
}

/// 单题型分值分配结果
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAllocation {
    pub question_type: QuestionType,
    pub count: u32,
    pub ratio: Decimal,
    /// 按题序的每题分值
    pub scores: Vec<Decimal>,
}

/// 处理顺序: 编码升序，简答题放最后
pub fn placement_order(counts: &BTreeMap<QuestionType, u32>) -> Vec<QuestionType> {
    let active = active_counts(counts);
    let mut order: Vec<QuestionType> = active
        .keys()
        .copied()
        .filter(|t| *t != QuestionType::Essay)
        .collect();
    if active.contains_key(&QuestionType::Essay) {
        order.push(QuestionType::Essay);
    }
    order
}

/// 按比例分配每题分值，保证总分恰为 100.00
///
/// - 非简答题: round_half_up(ratio × 100 / count)，累计超过满分时截断
/// - 简答题: 平分剩余分值，最后一道吸收舍入差
/// - 无简答题: 最后一道放置的题吸收舍入差
pub fn allocate_scores(
    counts: &BTreeMap<QuestionType, u32>,
    ratios: &BTreeMap<QuestionType, Decimal>,
) -> EngineResult<Vec<TypeAllocation>> {
    let order = placement_order(counts);
    let mut allocations: Vec<TypeAllocation> = Vec::with_capacity(order.len());
    let mut assigned = Decimal::ZERO;

    for t in &order {
        let count = counts.get(t).copied().unwrap_or(0);
        let ratio = ratios.get(t).copied().unwrap_or(Decimal::ZERO);
        if *t == QuestionType::Essay {
            allocations.push(TypeAllocation {
                question_type: *t,
                count,
                ratio,
                scores: Vec::new(),
            });
            continue;
        }

        let count_dec = Decimal::from(count);
        let room = FULL_MARKS - assigned;
        let exact = ratio * FULL_MARKS / count_dec;
        let mut per_question = round_half_up(exact);
        // 四舍五入后超出剩余分值则改为截断
        if per_question * count_dec > room {
            per_question = exact.round_dp_with_strategy(2, RoundingStrategy::ToZero);
        }
        if per_question * count_dec > room {
            per_question = (room / count_dec).round_dp_with_strategy(2, RoundingStrategy::ToZero);
        }
        assigned += per_question * count_dec;
        allocations.push(TypeAllocation {
            question_type: *t,
            count,
            ratio,
            scores: vec![per_question; count as usize],
        });
    }

    let remaining = FULL_MARKS - assigned;

    match allocations.last_mut() {
        Some(essay) if essay.question_type == QuestionType::Essay => {
            if remaining.is_sign_negative() && !remaining.is_zero() {
                return Err(EngineError::InvalidRatioSum(format!(
                    "非简答题已分配{}分，超过满分",
                    assigned
                )));
            }
            essay.scores = split_evenly(remaining, essay.count);
        }
        Some(last) => {
            if let Some(score) = last.scores.last_mut() {
                *score += remaining;
                if score.is_sign_negative() && !score.is_zero() {
                    return Err(EngineError::InvalidRatioSum(format!(
                        "舍入差{}无法被最后一题吸收",
                        remaining
                    )));
                }
            }
        }
        None => {
            return Err(EngineError::Validation("至少需要一种题型的题量大于0".to_string()));
        }
    }

    Ok(allocations)
}

/// 平分 total 到 n 份，最后一份吸收差额
///
/// 四舍五入基数导致最后一份为负时改为截断基数
fn split_evenly(total: Decimal, n: u32) -> Vec<Decimal> {
    if n == 0 {
        return Vec::new();
    }
    let n_dec = Decimal::from(n);
    let others = Decimal::from(n - 1);

    let mut base = round_half_up(total / n_dec);
    if total - base * others < Decimal::ZERO {
        base = (total / n_dec).round_dp_with_strategy(2, RoundingStrategy::ToZero);
    }

    let mut scores = vec![base; n as usize];
    if let Some(last) = scores.last_mut() {
        *last = total - base * others;
    }
    scores
}

/// 难度均值（2 位小数）
pub fn mean_difficulty<'a, I>(difficulties: I) -> Decimal
where
    I: IntoIterator<Item = &'a Decimal>,
{
    let mut sum = Decimal::ZERO;
    let mut n = 0u32;
    for d in difficulties {
        sum += *d;
        n += 1;
    }
    if n == 0 {
        return Decimal::ZERO;
    }
    round_half_up(sum / Decimal::from(n))
}
