// AI score suggestions and the consistency check shown to a judge before saving.
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use super::{parse_json_reply, AiBackend, AiError, CompletionRequest};
use crate::reader::truncate_chars;
use crate::scoring::{
    reconcile, AiSuggestion, Criterion, Flag, Rating, Rubric, CRITERION_MAX, TOTAL_MAX,
};

pub const FILE_CONTENT_PROMPT_CHARS: usize = 10_000;
pub const SUGGESTION_UNAVAILABLE: &str = "AI Service is not available.";
pub const SUGGESTION_FAILED: &str = "Failed to get an AI suggestion. Please score manually.";
pub const CONSISTENCY_UNAVAILABLE: &str = "Could not perform consistency analysis at this time.";

const SCORING_TEMPERATURE: f32 = 0.3;

#[derive(Debug, Clone, Default)]
pub struct SubmissionContext<'a> {
    pub topic: &'a str,
    pub notes: &'a str,
    pub file_content: Option<&'a str>,
}

// Lenient mirror of the schema: models sometimes return fractional or missing fields.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSuggestion {
    knowledge_application: Option<f64>,
    critical_thinking_logic: Option<f64>,
    expression_style: Option<f64>,
    ethics: Option<f64>,
    social_impact: Option<f64>,
    total_score: Option<f64>,
    rating: Option<String>,
    feedback: Option<String>,
}

impl RawSuggestion {
    fn normalize(self) -> AiSuggestion {
        let criteria = Rubric {
            knowledge_application: clamp_score(self.knowledge_application, CRITERION_MAX),
            critical_thinking_logic: clamp_score(self.critical_thinking_logic, CRITERION_MAX),
            expression_style: clamp_score(self.expression_style, CRITERION_MAX),
            ethics: clamp_score(self.ethics, CRITERION_MAX),
            social_impact: clamp_score(self.social_impact, CRITERION_MAX),
        };

        let total_score = self
            .total_score
            .filter(|t| t.is_finite() && (0.0..=TOTAL_MAX as f64).contains(t))
            .map(|t| t.round() as u32)
            .unwrap_or_else(|| criteria.total());

        let rating = self
            .rating
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| Rating::from_total(total_score).label().to_string());

        AiSuggestion {
            criteria,
            total_score,
            rating,
            feedback: self.feedback.unwrap_or_default(),
        }
    }
}

fn clamp_score(value: Option<f64>, max: u32) -> u32 {
    value
        .filter(|v| v.is_finite())
        .map(|v| v.round().clamp(0.0, max as f64) as u32)
        .unwrap_or(0)
}

fn suggestion_schema() -> serde_json::Value {
    let criterion = json!({
        "type": "number",
        "minimum": 0,
        "maximum": CRITERION_MAX,
    });
    let mut properties = serde_json::Map::new();
    for c in Criterion::ALL {
        properties.insert(c.key().to_string(), criterion.clone());
    }
    properties.insert(
        "totalScore".into(),
        json!({"type": "number", "minimum": 0, "maximum": TOTAL_MAX}),
    );
    properties.insert(
        "rating".into(),
        json!({"type": "string", "enum": ["Xuất sắc", "Tốt", "Khá", "Trung bình", "Yếu"]}),
    );
    properties.insert(
        "feedback".into(),
        json!({"type": "string", "description": "Nhận xét ngắn gọn, tối đa khoảng 100 từ."}),
    );

    let mut required: Vec<&str> = Criterion::ALL.iter().map(|c| c.key()).collect();
    required.extend(["totalScore", "rating", "feedback"]);

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

pub fn build_scoring_prompt(ctx: &SubmissionContext<'_>) -> String {
    let mut prompt = format!(
        "Bạn là giám khảo chuyên nghiệp trong một cuộc thi tranh luận chính sách về \"Kinh tế Việt Nam trong kỷ nguyên AI\". Hãy đánh giá bài nộp sau:\n\n\
         ĐỀ TÀI: \"{}\"\n\n\
         GHI CHÚ CỦA THÍ SINH: \"{}\"\n\n",
        ctx.topic, ctx.notes
    );

    if let Some(content) = ctx.file_content.filter(|c| !c.trim().is_empty()) {
        prompt.push_str("NỘI DUNG FILE BÀI THUYẾT TRÌNH:\n");
        prompt.push_str(&truncate_chars(content, FILE_CONTENT_PROMPT_CHARS));
        prompt.push_str("\n\n");
    }

    prompt.push_str("Hãy chấm điểm công bằng từ 0-20 cho mỗi tiêu chí sau:\n\n");
    for (i, c) in Criterion::ALL.iter().enumerate() {
        prompt.push_str(&format!("{}. {} ({})\n", i + 1, c.label(), c.key()));
    }
    prompt.push_str(
        "\nSau đó tính tổng điểm (0-100), xếp loại (Xuất sắc 90-100, Tốt 80-89, Khá 70-79, \
         Trung bình 60-69, Yếu <60) và viết nhận xét ngắn gọn.\n",
    );

    if ctx.file_content.map_or(true, |c| c.trim().is_empty()) {
        prompt.push_str(
            "\n⚠️ LƯU Ý: Chưa có file bài thuyết trình, chỉ đánh giá dựa trên ghi chú. \
             Điểm có thể không chính xác hoàn toàn.\n",
        );
    }

    prompt
}

// Ask the AI for a rubric score. Never fails: a disabled or failing backend
// yields the neutral zero suggestion.
pub async fn suggest_score(
    ai: Option<&dyn AiBackend>,
    ctx: &SubmissionContext<'_>,
) -> AiSuggestion {
    let Some(ai) = ai else {
        return AiSuggestion::neutral(SUGGESTION_UNAVAILABLE);
    };

    info!(
        topic_chars = ctx.topic.chars().count(),
        has_file_content = ctx.file_content.is_some(),
        "Requesting AI score suggestion"
    );

    match request_suggestion(ai, ctx).await {
        Ok(suggestion) => suggestion,
        Err(e) => {
            error!(error = %e, "AI score suggestion failed");
            AiSuggestion::neutral(SUGGESTION_FAILED)
        }
    }
}

async fn request_suggestion(
    ai: &dyn AiBackend,
    ctx: &SubmissionContext<'_>,
) -> Result<AiSuggestion, AiError> {
    let request = CompletionRequest::prompt(build_scoring_prompt(ctx))
        .with_schema(suggestion_schema())
        .with_temperature(SCORING_TEMPERATURE);
    let reply = ai.complete(request).await?;
    let raw: RawSuggestion = parse_json_reply(&reply)?;
    Ok(raw.normalize())
}

pub fn build_consistency_prompt(flags: &[Flag]) -> String {
    let lines: Vec<String> = flags
        .iter()
        .map(|f| format!("- {}: {} vs {}", f.criterion.key(), f.judge_value, f.ai_value))
        .collect();

    format!(
        "You are a helpful assistant for a hackathon judge. A judge's scores have some significant \
differences from the AI's suggestions. Your task is to provide a single, concise, and constructive \
feedback sentence to help the judge reflect on their scoring. Do not be accusatory. Frame it as a \
helpful observation.\n\n\
Here are the discrepancies (criteria, judge's score, AI's score):\n{}\n\n\
Example feedback: \"It looks like your scoring for 'ethics' and 'socialImpact' differs from the AI's \
analysis. This is perfectly fine, but you may wish to review it.\"\n\n\
Generate one sentence of feedback based on the provided discrepancies.",
        lines.join("\n")
    )
}

// One advisory sentence about large judge/AI disagreements.
//
// `None` when nothing is flagged (a zero-total suggestion flags nothing) or the
// backend is disabled; a backend failure yields a generic notice rather than an error.
pub async fn analyze_consistency(
    ai: Option<&dyn AiBackend>,
    judge: &Rubric,
    suggestion: &AiSuggestion,
) -> Option<String> {
    let flags = reconcile(judge, Some(suggestion)).flagged;
    if flags.is_empty() {
        return None;
    }
    let ai = ai?;

    match ai
        .complete(CompletionRequest::prompt(build_consistency_prompt(&flags)))
        .await
    {
        Ok(text) => Some(text.trim().to_string()),
        Err(e) => {
            error!(error = %e, "Consistency analysis failed");
            Some(CONSISTENCY_UNAVAILABLE.to_string())
        }
    }
}
