//! 文本规范化
//!
//! 引擎中所有"是否已正确本地化"的判断都通过 [`normalize_text`] 比较，
//! 不再针对单个规则做特殊的空白处理。

/// 规范化文本：把任意 Unicode 空白（包括 NBSP）序列折叠成一个空格，并去掉首尾空白
pub fn normalize_text(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());

    for word in text.split(char::is_whitespace).filter(|w| !w.is_empty()) {
        if !normalized.is_empty() {
            normalized.push(' ');
        }
        normalized.push_str(word);
    }

    normalized
}

/// 比较两段文本在规范化后是否相同
pub fn texts_match(left: &str, right: &str) -> bool {
    normalize_text(left) == normalize_text(right)
}

/// 文本是否包含全部词元（空词元列表视为不匹配）
pub fn contains_all<S: AsRef<str>>(text: &str, tokens: &[S]) -> bool {
    !tokens.is_empty() && tokens.iter().all(|token| text.contains(token.as_ref()))
}
