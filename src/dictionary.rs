//! 词典存储
//!
//! 解析扁平的 `key = value` 文本（FTL 风格的子集）。来源是远程可编辑的文件，
//! 所以格式不合法的行只会被跳过，不会让整个词典加载失败。

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::error::{LocalizerError, LocalizerResult};

fn entry_regex() -> &'static Regex {
    static ENTRY: OnceLock<Regex> = OnceLock::new();
    ENTRY.get_or_init(|| {
        Regex::new(r"^([A-Za-z0-9_-]+)\s*=\s*(.+)$").expect("词典行正则表达式无效")
    })
}

/// 只读的 key → 译文 查找表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    entries: HashMap<String, String>,
    skipped_lines: usize,
}

impl Dictionary {
    /// 解析词典文本
    ///
    /// - 空行和以 `#` 开头的行被忽略
    /// - 重复的 key 以最后一次定义为准
    /// - 值原样保留（包括其中的 `[kbd]`、`[link]` 标记）
    pub fn parse(source: &str) -> Self {
        let mut entries = HashMap::new();
        let mut skipped_lines = 0;

        for (line_number, raw_line) in source.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match entry_regex().captures(line) {
                Some(captures) => {
                    entries.insert(captures[1].to_string(), captures[2].to_string());
                }
                None => {
                    skipped_lines += 1;
                    debug!("词典第 {} 行格式无效，已跳过: {}", line_number + 1, line);
                }
            }
        }

        debug!("词典解析完成: {} 条, 跳过 {} 行", entries.len(), skipped_lines);

        Self {
            entries,
            skipped_lines,
        }
    }

    /// 从文件加载词典
    pub fn load<P: AsRef<Path>>(path: P) -> LocalizerResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| {
            LocalizerError::DictionaryError(format!("无法读取词典文件 {}: {}", path.display(), e))
        })?;
        Ok(Self::parse(&source))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// 获取译文，缺失时返回给定的后备值
    pub fn get_or<'a>(&'a self, key: &str, fallback: &'a str) -> &'a str {
        self.get(key).unwrap_or(fallback)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 被跳过的无效行数
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_comments_blank_lines_and_duplicates() {
        let dictionary = Dictionary::parse("# comment\n\nfoo = bar\nbadline\nfoo = baz");

        assert_eq!(dictionary.len(), 1);
        assert_eq!(dictionary.get("foo"), Some("baz"));
        assert_eq!(dictionary.skipped_lines(), 1);
    }

    #[test]
    fn test_values_are_kept_verbatim() {
        let dictionary = Dictionary::parse(
            "search-hint = Введите [kbd]/[/kbd] для поиска\n  cookie_note =Мы используем [link]cookie[/link].  \n",
        );

        assert_eq!(
            dictionary.get("search-hint"),
            Some("Введите [kbd]/[/kbd] для поиска")
        );
        assert_eq!(
            dictionary.get("cookie_note"),
            Some("Мы используем [link]cookie[/link].")
        );
    }

    #[test]
    fn test_invalid_keys_and_empty_values_are_skipped() {
        let dictionary = Dictionary::parse("bad key = x\nempty =\nok = 1\nно = нет");

        assert_eq!(dictionary.iter().count(), 1);
        assert!(dictionary.contains("ok"));
        assert_eq!(dictionary.get_or("empty", "fallback"), "fallback");
        assert!(dictionary.get("missing").is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "dashboard = Главная").expect("write");

        let dictionary = Dictionary::load(file.path()).expect("dictionary should load");
        assert_eq!(dictionary.get("dashboard"), Some("Главная"));

        let missing = Dictionary::load("/definitely/not/here.ftl");
        assert!(matches!(missing, Err(LocalizerError::DictionaryError(_))));
    }
}
