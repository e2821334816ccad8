//! `<relative-time>` 元素
//!
//! 宿主的时间元素自己负责渲染相对时间，只要把 `lang` 改成目标语言、
//! 去掉英文的 `prefix="on"` 并调用宿主的刷新回调即可。悬停提示 `title`
//! 里的绝对时间由这里直接翻译。

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDateTime};
use markup5ever_rcdom::Handle;
use regex::Regex;
use tracing::{debug, warn};

use super::Rule;
use crate::dictionary::Dictionary;
use crate::dom::{get_node_attr, SelectorList};
use crate::engine::{unit, Localizer};

const MONTH_KEYS: [&str; 12] = [
    "month-jan", "month-feb", "month-mar", "month-apr", "month-may", "month-jun",
    "month-jul", "month-aug", "month-sep", "month-oct", "month-nov", "month-dec",
];

/// 例如 "Oct 5, 2025, 3:45 PM GMT+3"
fn absolute_time_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^([A-Za-z]{3}) (\d{1,2}), (\d{4}),? (\d{1,2}):(\d{2})\s*([AaPp][Mm])(.*)$")
            .expect("绝对时间正则表达式无效")
    })
}

/// 翻译绝对时间文本
///
/// 无法识别的格式或词典里缺少月份名时原样返回。
pub fn translate_absolute_time(dictionary: &Dictionary, text: &str) -> String {
    let trimmed = text.trim();
    let Some(captures) = absolute_time_regex().captures(trimmed) else {
        return text.to_string();
    };

    let normalized = format!(
        "{} {:0>2} {} {:0>2}:{} {}",
        &captures[1],
        &captures[2],
        &captures[3],
        &captures[4],
        &captures[5],
        captures[6].to_uppercase()
    );
    let Ok(date) = NaiveDateTime::parse_from_str(&normalized, "%b %d %Y %I:%M %p") else {
        return text.to_string();
    };

    let Some(month) = dictionary.get(MONTH_KEYS[date.month0() as usize]) else {
        return text.to_string();
    };

    format!(
        "{} {} {}, {}{}",
        date.day(),
        month,
        date.year(),
        date.format("%H:%M"),
        captures[7].trim_end()
    )
}

#[derive(Debug)]
pub struct RelativeTimeRule {
    name: String,
    selector: SelectorList,
}

impl RelativeTimeRule {
    pub fn new(name: impl Into<String>, selector: SelectorList) -> Self {
        Self {
            name: name.into(),
            selector,
        }
    }

    fn localize(&self, ctx: &Localizer, element: &Handle) {
        let document = ctx.document();
        let target_lang = &ctx.config().target_lang;

        if let Some(title) = get_node_attr(element, "title") {
            let translated = translate_absolute_time(ctx.dictionary(), &title);
            if translated != title {
                document.set_attribute(element, "title", &translated);
            }
        }

        let needs_lang = get_node_attr(element, "lang").as_deref() != Some(target_lang.as_str());
        let has_english_prefix = get_node_attr(element, "prefix")
            .is_some_and(|prefix| prefix.trim().eq_ignore_ascii_case("on"));
        let marker = &ctx.markers().time;
        let was_translated = unit::is_marked(element, marker);

        if !needs_lang && !has_english_prefix && was_translated {
            return;
        }

        if needs_lang {
            document.set_attribute(element, "lang", target_lang);
            self.refresh(ctx, element);
        }

        if has_english_prefix {
            document.remove_attribute(element, "prefix");
            self.refresh(ctx, element);
        }

        unit::mark(ctx, element, marker);
        if !was_translated {
            ctx.record(|stats| stats.elements_changed += 1);
            debug!("{} 已本地化时间元素", ctx.config().log_prefix);
        }
    }

    /// 调用宿主刷新回调，失败只记录警告
    fn refresh(&self, ctx: &Localizer, element: &Handle) {
        if let Err(e) = ctx.hooks().update(ctx.document(), element) {
            warn!("{} 时间元素刷新失败: {}", ctx.config().log_prefix, e);
        }
    }
}

impl Rule for RelativeTimeRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, ctx: &Localizer) {
        for element in ctx.document().query_selector_all(&self.selector) {
            self.localize(ctx, &element);
        }
    }
}
