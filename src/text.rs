use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static FILTER_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{@filter ([^|{}]+)[^{}]+\}").expect("filter tag regex"));

static HIT_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{@hit (\d+)\}").expect("hit tag regex"));

static CHANCE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{@chance (\d+)[^{}]*\}").expect("chance tag regex"));

static GENERIC_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{@\w+ ((?:[^|{}]+\|?){0,3})\}").expect("generic tag regex"));

static DICE_MODIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(d\d+)([+-])(\d)").expect("dice modifier regex"));

const MINOR_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "but", "by", "for", "from", "in", "into", "of", "on", "or",
    "the", "to", "with",
];

/// Rewrites inline `{@tag ...}` markup into display text.
///
/// Nested tags unwrap innermost first until no tag is left. Tokens that do not fit the
/// tag grammar are left as they are.
pub fn normalize(text: &str) -> String {
    let mut text = text.to_owned();
    loop {
        let next = rewrite_tags(&text);
        if next == text {
            break;
        }
        text = next;
    }
    DICE_MODIFIER_RE
        .replace_all(&text, "${1} ${2} ${3}")
        .into_owned()
}

fn rewrite_tags(text: &str) -> String {
    let text = FILTER_TAG_RE.replace_all(text, "${1}");
    let text = HIT_TAG_RE.replace_all(&text, "+${1}");
    let text = CHANCE_TAG_RE.replace_all(&text, "${1} percent");
    GENERIC_TAG_RE
        .replace_all(&text, |caps: &Captures<'_>| {
            let parts = caps[1].split('|').collect::<Vec<_>>();
            if parts.len() == 3 {
                parts[2].to_owned()
            } else {
                parts[0].to_owned()
            }
        })
        .into_owned()
}

pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// `sleight of hand` -> `Sleight of Hand`.
pub fn title_case(text: &str) -> String {
    text.split(' ')
        .enumerate()
        .map(|(idx, word)| {
            if idx > 0 && MINOR_WORDS.contains(&word.to_lowercase().as_str()) {
                word.to_lowercase()
            } else {
                capitalize_first(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Case-insensitive name ordering used for every sorted output list.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
