use crate::core::Alert;

const ELLIPSIS: &str = "…";

/// 將 Alert 轉成固定格式的文字訊息。
///
/// 若設定了最大長度（位元組），只截斷 description 與 instruction；
/// event 與 headline 一律完整保留。instruction 最多分到剩餘空間的一半，
/// 其餘給 description，截斷處以 "…" 結尾。
#[derive(Debug, Clone, Default)]
pub struct AlertFormatter {
    max_len: Option<usize>,
}

impl AlertFormatter {
    pub fn new(max_len: Option<usize>) -> Self {
        Self { max_len }
    }

    pub fn max_len(&self) -> Option<usize> {
        self.max_len
    }

    pub fn format(&self, alert: &Alert) -> String {
        let description = collapse_whitespace(alert.description());
        let instruction = collapse_whitespace(alert.instruction());

        let Some(max_len) = self.max_len else {
            return render(alert.event(), alert.headline(), &description, &instruction);
        };

        let fixed = render(alert.event(), alert.headline(), "", "").len();
        if fixed > max_len {
            tracing::warn!(
                "Event and headline need {} of {} bytes, dropping description and instruction",
                fixed,
                max_len
            );
            return render(alert.event(), alert.headline(), ELLIPSIS, ELLIPSIS);
        }
        let budget = max_len - fixed;

        if description.len() + instruction.len() <= budget {
            return render(alert.event(), alert.headline(), &description, &instruction);
        }

        let mut instruction_share = instruction.len().min(budget / 2);
        let description_share = budget - instruction_share;
        if description.len() < description_share {
            instruction_share = budget - description.len();
        }

        render(
            alert.event(),
            alert.headline(),
            &truncate(&description, description_share),
            &truncate(&instruction, instruction_share),
        )
    }
}

fn render(event: &str, headline: &str, description: &str, instruction: &str) -> String {
    format!(
        "🚨Weather Alert🚨\nEvent: {}\nHeadline: {}\nDescription: {}\nInstruction: {}",
        event, headline, description, instruction
    )
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    if limit < ELLIPSIS.len() {
        return String::new();
    }

    let mut end = limit - ELLIPSIS.len();
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}{}", text[..end].trim_end(), ELLIPSIS)
}
