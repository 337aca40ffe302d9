//! 语音文本处理 - Markdown 清洗与播报裁剪
//!
//! 助手消息多为 Markdown，直接丢给 `say` 会念出围栏和链接符号。
//! 这里先做清洗，再按配置的最大字符数裁剪：优先取首句，放不下才硬截断。

use regex::Regex;

const CODE_BLOCK_PLACEHOLDER: &str = " code block omitted ";
const ELLIPSIS: &str = "...";

/// 清洗 Markdown 文本，使其适合语音播报
///
/// 依次处理：代码围栏替换为占位文案、行内代码去反引号、
/// 链接只保留标签、去除强调符号、空白折叠。
pub fn clean_for_speech(text: &str) -> String {
    let mut cleaned = text.to_string();

    let steps: [(&str, &str); 5] = [
        (r"(?s)```.*?```", CODE_BLOCK_PLACEHOLDER),
        (r"`([^`]+)`", "$1"),
        (r"\[(.*?)\]\((.*?)\)", "$1"),
        (r"[*_~#>]", ""),
        (r"\s+", " "),
    ];

    for (pattern, replacement) in steps {
        if let Ok(re) = Regex::new(pattern) {
            cleaned = re.replace_all(&cleaned, replacement).to_string();
        }
    }

    cleaned.trim().to_string()
}

/// 裁剪播报文本到 `max_chars` 以内
///
/// 清洗后的文本放得下就原样返回；否则取首句（以 `.`/`!`/`?` 结尾、
/// 后跟空白或文本末尾），首句也放不下时硬截断为 `max_chars - 3` 个
/// 字符加省略号。
pub fn clip_for_speech(text: &str, max_chars: usize) -> String {
    let cleaned = clean_for_speech(text);
    if cleaned.is_empty() {
        return cleaned;
    }

    if char_count(&cleaned) <= max_chars {
        return cleaned;
    }

    if let Ok(re) = Regex::new(r"(.+?[.!?])(\s|$)") {
        if let Some(captures) = re.captures(&cleaned) {
            let sentence = captures[1].trim();
            if char_count(sentence) <= max_chars {
                return sentence.to_string();
            }
        }
    }

    truncate_chars(&cleaned, max_chars)
}

/// 按字符（非字节）截断并追加省略号
///
/// 字符级截断避免在多字节 UTF-8 边界上切断。
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if char_count(trimmed) <= max_chars {
        return trimmed.to_string();
    }

    let kept: String = trimmed
        .chars()
        .take(max_chars.saturating_sub(ELLIPSIS.len()))
        .collect();
    format!("{}{}", kept, ELLIPSIS)
}

fn char_count(s: &str) -> usize {
    s.chars().count()
}
