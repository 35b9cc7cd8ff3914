// Rubric types and the reconciliation of a judge's score with the AI suggestion.
//
// The judging panel ("BGK") and the AI both score the same five criteria on a
// 0-20 scale. `reconcile` blends the two totals into the team's final score and
// flags criteria where the judge and the AI disagree by more than
// `FLAG_THRESHOLD` points.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CRITERION_MAX: u32 = 20;
pub const TOTAL_MAX: u32 = CRITERION_MAX * 5;
// A criterion is flagged when `|judge - ai|` is strictly greater than this.
pub const FLAG_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Criterion {
    KnowledgeApplication,
    CriticalThinkingLogic,
    ExpressionStyle,
    Ethics,
    SocialImpact,
}

impl Criterion {
    pub const ALL: [Criterion; 5] = [
        Criterion::KnowledgeApplication,
        Criterion::CriticalThinkingLogic,
        Criterion::ExpressionStyle,
        Criterion::Ethics,
        Criterion::SocialImpact,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Criterion::KnowledgeApplication => "knowledgeApplication",
            Criterion::CriticalThinkingLogic => "criticalThinkingLogic",
            Criterion::ExpressionStyle => "expressionStyle",
            Criterion::Ethics => "ethics",
            Criterion::SocialImpact => "socialImpact",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Criterion::KnowledgeApplication => "Vận dụng kiến thức",
            Criterion::CriticalThinkingLogic => "Tư duy phản biện và logic",
            Criterion::ExpressionStyle => "Phong cách diễn đạt",
            Criterion::Ethics => "Đạo đức",
            Criterion::SocialImpact => "Tác động xã hội",
        }
    }
}

// Five-criterion rubric, used both for a judge's score and the AI's breakdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rubric {
    pub knowledge_application: u32,
    pub critical_thinking_logic: u32,
    pub expression_style: u32,
    pub ethics: u32,
    pub social_impact: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RubricError {
    #[error("{criterion} must be between 0 and {max}, got {value}")]
    OutOfRange {
        criterion: &'static str,
        value: u32,
        max: u32,
    },
    #[error("totalScore must be between 0 and {max}, got {value}")]
    TotalOutOfRange { value: u32, max: u32 },
}

impl Rubric {
    pub fn uniform(value: u32) -> Self {
        Self {
            knowledge_application: value,
            critical_thinking_logic: value,
            expression_style: value,
            ethics: value,
            social_impact: value,
        }
    }

    pub fn get(&self, criterion: Criterion) -> u32 {
        match criterion {
            Criterion::KnowledgeApplication => self.knowledge_application,
            Criterion::CriticalThinkingLogic => self.critical_thinking_logic,
            Criterion::ExpressionStyle => self.expression_style,
            Criterion::Ethics => self.ethics,
            Criterion::SocialImpact => self.social_impact,
        }
    }

    pub fn set(&mut self, criterion: Criterion, value: u32) {
        let slot = match criterion {
            Criterion::KnowledgeApplication => &mut self.knowledge_application,
            Criterion::CriticalThinkingLogic => &mut self.critical_thinking_logic,
            Criterion::ExpressionStyle => &mut self.expression_style,
            Criterion::Ethics => &mut self.ethics,
            Criterion::SocialImpact => &mut self.social_impact,
        };
        *slot = value;
    }

    pub fn total(&self) -> u32 {
        Criterion::ALL
            .iter()
            .fold(0u32, |sum, &c| sum.saturating_add(self.get(c)))
    }

    pub fn validate(&self) -> Result<(), RubricError> {
        for criterion in Criterion::ALL {
            let value = self.get(criterion);
            if value > CRITERION_MAX {
                return Err(RubricError::OutOfRange {
                    criterion: criterion.key(),
                    value,
                    max: CRITERION_MAX,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    Excellent,
    Good,
    Fair,
    Average,
    Weak,
}

impl Rating {
    pub fn from_total(total: u32) -> Self {
        match total {
            90..=u32::MAX => Rating::Excellent,
            80..=89 => Rating::Good,
            70..=79 => Rating::Fair,
            60..=69 => Rating::Average,
            _ => Rating::Weak,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rating::Excellent => "Xuất sắc",
            Rating::Good => "Tốt",
            Rating::Fair => "Khá",
            Rating::Average => "Trung bình",
            Rating::Weak => "Yếu",
        }
    }
}

// AI-computed rubric plus its total, rating bucket and a short justification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSuggestion {
    #[serde(flatten)]
    pub criteria: Rubric,
    pub total_score: u32,
    pub rating: String,
    pub feedback: String,
}

impl AiSuggestion {
    // Zero suggestion used whenever the AI backend cannot produce one.
    pub fn neutral(feedback: impl Into<String>) -> Self {
        Self {
            criteria: Rubric::default(),
            total_score: 0,
            rating: Rating::Weak.label().to_string(),
            feedback: feedback.into(),
        }
    }

    // Client-supplied suggestions must stay on the rubric's scale.
    pub fn validate(&self) -> Result<(), RubricError> {
        self.criteria.validate()?;
        if self.total_score > TOTAL_MAX {
            return Err(RubricError::TotalOutOfRange {
                value: self.total_score,
                max: TOTAL_MAX,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flag {
    pub criterion: Criterion,
    pub judge_value: u32,
    pub ai_value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub bgk: u32,
    pub ai: u32,
    pub final_score: u32,
    pub flagged: Vec<Flag>,
}

impl Reconciliation {
    // Blend totals only. Used when the caller has an AI total but no breakdown.
    pub fn from_totals(judge: &Rubric, ai_total: Option<u32>) -> Self {
        let bgk = judge.total();
        let ai = ai_total.filter(|&t| t > 0).unwrap_or(0);
        Self {
            bgk,
            ai,
            final_score: blend(bgk, ai),
            flagged: Vec::new(),
        }
    }

    pub fn needs_review(&self) -> bool {
        !self.flagged.is_empty()
    }
}

// `round((bgk + ai) / 2)` with halves rounded up, or `bgk` when there is no AI score.
pub fn blend(bgk: u32, ai: u32) -> u32 {
    if ai > 0 {
        ((u64::from(bgk) + u64::from(ai) + 1) / 2) as u32
    } else {
        bgk
    }
}

pub fn divergences(judge: &Rubric, ai: &Rubric) -> Vec<Flag> {
    Criterion::ALL
        .iter()
        .filter_map(|&criterion| {
            let judge_value = judge.get(criterion);
            let ai_value = ai.get(criterion);
            (judge_value.abs_diff(ai_value) > FLAG_THRESHOLD).then_some(Flag {
                criterion,
                judge_value,
                ai_value,
            })
        })
        .collect()
}

// Merge the judge's rubric with the AI suggestion.
//
// A missing suggestion, or one with a zero total (the AI was unavailable),
// yields `final_score == bgk` and no flags.
pub fn reconcile(judge: &Rubric, ai: Option<&AiSuggestion>) -> Reconciliation {
    let mut reconciliation = Reconciliation::from_totals(judge, ai.map(|s| s.total_score));
    if let Some(suggestion) = ai.filter(|_| reconciliation.ai > 0) {
        reconciliation.flagged = divergences(judge, &suggestion.criteria);
    }
    reconciliation
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggestion(criteria: Rubric) -> AiSuggestion {
        let total = criteria.total();
        AiSuggestion {
            criteria,
            total_score: total,
            rating: Rating::from_total(total).label().to_string(),
            feedback: String::new(),
        }
    }

    #[test]
    fn perfect_judge_against_weaker_ai() {
        let judge = Rubric::uniform(20);
        let ai = suggestion(Rubric {
            knowledge_application: 12,
            critical_thinking_logic: 17,
            expression_style: 17,
            ethics: 17,
            social_impact: 17,
        });
        assert_eq!(ai.total_score, 80);

        let result = reconcile(&judge, Some(&ai));
        assert_eq!(result.bgk, 100);
        assert_eq!(result.ai, 80);
        assert_eq!(result.final_score, 90);
        assert_eq!(
            result.flagged,
            vec![Flag {
                criterion: Criterion::KnowledgeApplication,
                judge_value: 20,
                ai_value: 12,
            }]
        );
        assert!(result.needs_review());
    }

    #[test]
    fn unavailable_ai_keeps_judge_score() {
        let judge = Rubric::uniform(10);
        let neutral = AiSuggestion::neutral("AI failed");

        let result = reconcile(&judge, Some(&neutral));
        assert_eq!(result.final_score, 50);
        assert!(result.flagged.is_empty());

        let result = reconcile(&judge, None);
        assert_eq!(result.final_score, 50);
        assert_eq!(result.ai, 0);
    }

    #[test]
    fn blend_rounds_half_up() {
        assert_eq!(blend(85, 90), 88);
        assert_eq!(blend(84, 90), 87);
        assert_eq!(blend(0, 1), 1);
        assert_eq!(blend(73, 0), 73);
    }

    #[test]
    fn blend_matches_rounded_mean_for_all_totals() {
        for b in 0..=TOTAL_MAX {
            for a in 1..=TOTAL_MAX {
                let expected = ((b + a) as f64 / 2.0).round() as u32;
                assert_eq!(blend(b, a), expected, "b={b} a={a}");
            }
        }
    }

    #[test]
    fn difference_of_exactly_five_is_not_flagged() {
        let judge = Rubric::uniform(15);
        let mut ai = Rubric::uniform(10);
        assert!(divergences(&judge, &ai).is_empty());

        ai.set(Criterion::Ethics, 9);
        let flags = divergences(&judge, &ai);
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].criterion, Criterion::Ethics);
    }

    #[test]
    fn judge_below_ai_is_flagged_too() {
        let judge = Rubric::uniform(4);
        let ai = suggestion(Rubric::uniform(16));
        let result = reconcile(&judge, Some(&ai));
        assert_eq!(result.flagged.len(), 5);
        assert_eq!(result.final_score, (20 + 80 + 1) / 2);
    }

    #[test]
    fn totals_only_never_flag() {
        let judge = Rubric::uniform(20);
        let result = Reconciliation::from_totals(&judge, Some(40));
        assert_eq!(result.final_score, 70);
        assert!(result.flagged.is_empty());
    }

    #[test]
    fn validate_rejects_out_of_range_criterion() {
        let mut rubric = Rubric::uniform(20);
        assert!(rubric.validate().is_ok());
        rubric.set(Criterion::SocialImpact, 21);
        assert_eq!(
            rubric.validate(),
            Err(RubricError::OutOfRange {
                criterion: "socialImpact",
                value: 21,
                max: 20,
            })
        );
    }

    #[test]
    fn blend_does_not_overflow() {
        assert_eq!(blend(100, u32::MAX), (u32::MAX / 2) + 51);
        assert_eq!(blend(u32::MAX, u32::MAX), u32::MAX);
    }

    #[test]
    fn suggestion_validate_checks_criteria_and_total() {
        assert!(suggestion(Rubric::uniform(20)).validate().is_ok());

        let mut over = suggestion(Rubric::uniform(10));
        over.criteria.social_impact = 21;
        assert!(matches!(
            over.validate(),
            Err(RubricError::OutOfRange { criterion: "socialImpact", value: 21, .. })
        ));

        let mut total = suggestion(Rubric::uniform(10));
        total.total_score = 101;
        assert_eq!(
            total.validate(),
            Err(RubricError::TotalOutOfRange { value: 101, max: 100 })
        );
    }

    #[test]
    fn rating_buckets() {
        assert_eq!(Rating::from_total(100).label(), "Xuất sắc");
        assert_eq!(Rating::from_total(90).label(), "Xuất sắc");
        assert_eq!(Rating::from_total(89).label(), "Tốt");
        assert_eq!(Rating::from_total(70).label(), "Khá");
        assert_eq!(Rating::from_total(60).label(), "Trung bình");
        assert_eq!(Rating::from_total(59).label(), "Yếu");
    }

    #[test]
    fn suggestion_serializes_flat_camel_case() {
        let json = serde_json::to_value(suggestion(Rubric::uniform(10))).unwrap();
        assert_eq!(json["knowledgeApplication"], 10);
        assert_eq!(json["totalScore"], 50);
        assert_eq!(json["rating"], "Yếu");
    }
}
