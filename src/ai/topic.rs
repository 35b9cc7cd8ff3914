use tracing::error;

use super::{AiBackend, CompletionRequest};

pub const TOPIC_UNAVAILABLE: &str = "Dịch vụ AI không khả dụng. Vui lòng thử lại sau.";
pub const TOPIC_FAILED: &str = "Không thể tạo đề tài. Vui lòng thử lại.";

const TOPIC_TEMPERATURE: f32 = 1.2;

const TOPIC_SYSTEM: &str = "Bạn là chuyên gia về chính sách kinh tế Việt Nam và công nghệ AI. \
Tạo CHỈ MỘT đề tài tranh luận chính sách cụ thể, chi tiết và độc đáo BẰNG TIẾNG VIỆT. \
Câu trả lời của bạn CHỈ là đề tài - không có phần giới thiệu, định dạng, giải thích, đánh số, \
hoặc tiền tố \"Đề tài:\". Đề tài phải cụ thể trong bối cảnh và nền kinh tế Việt Nam. \
Mỗi lần tạo phải tạo ra một đề tài khác biệt đáng kể.";

const TOPIC_PROMPT: &str = "Tạo MỘT đề tài tranh luận chính sách độc đáo, chi tiết và cụ thể \
liên quan đến chủ đề \"Kinh tế Việt Nam trong kỷ nguyên AI\".

YÊU CẦU:
- Phải là câu hỏi hoặc thách thức chính sách rõ ràng, có thể thực hiện được
- Phải liên quan đến các lĩnh vực hoặc thách thức kinh tế cụ thể của Việt Nam
- Có thể bao gồm: chatbot AI giáo dục lịch sử, AI trong hiện đại hóa nông nghiệp, \
chuyển đổi số cho doanh nghiệp vừa và nhỏ, đạo đức AI, đào tạo nguồn nhân lực AI
- Phải khác biệt với các đề tài phổ thông như \"lợi ích AI\" hay \"rủi ro AI\"

VÍ DỤ:
- \"Việt Nam nên thiết lập khung chính sách nào để quản lý việc sử dụng AI trong dịch vụ tài chính đồng thời thúc đẩy đổi mới fintech?\"
- \"Làm thế nào để nông nghiệp chính xác dựa trên AI giúp nông dân Việt Nam thích ứng với biến đổi khí hậu?\"

Tạo MỘT đề tài cụ thể, chi tiết bằng TIẾNG VIỆT ngay bây giờ:";

// A fresh debate topic, or a Vietnamese notice when the AI cannot provide one.
pub async fn generate_topic(ai: Option<&dyn AiBackend>) -> String {
    let Some(ai) = ai else {
        return TOPIC_UNAVAILABLE.to_string();
    };

    let request = CompletionRequest::prompt(TOPIC_PROMPT)
        .with_system(TOPIC_SYSTEM)
        .with_temperature(TOPIC_TEMPERATURE);

    match ai.complete(request).await {
        Ok(text) if !text.trim().is_empty() => clean_topic(&text),
        Ok(_) => TOPIC_FAILED.to_string(),
        Err(e) => {
            error!(error = %e, "Topic generation failed");
            TOPIC_FAILED.to_string()
        }
    }
}

// Models occasionally add a label or wrap the topic in quotes despite the instruction.
fn clean_topic(text: &str) -> String {
    let trimmed = text.trim();
    let without_label = trimmed
        .strip_prefix("Đề tài:")
        .map(str::trim_start)
        .unwrap_or(trimmed);
    without_label
        .trim_matches(|c| c == '"' || c == '“' || c == '”')
        .trim()
        .to_string()
}
