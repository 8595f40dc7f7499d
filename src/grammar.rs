//! Small text grammars used by the converters.
//!
//! Each matcher reports whether the input fit its grammar instead of guessing, so
//! the caller decides between a fatal error and a lossy fallback.

use std::sync::LazyLock;

use regex::Regex;

static TRAIT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^(]+)(?:\(([^)]+)\))?").expect("trait name regex"));

static RECHARGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(.*), )?(\d(?: minutes?)?/(?:Day|Turn|Rest|Hour|Week|Long Rest|Short Rest)|Recharge \d(?:\x{2013}6)?|Recharges? [^),]+)(?:, ([^)]+))?$",
    )
    .expect("recharge regex")
});

static LEGENDARY_COST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^(]+)(?:\s?\((?:Costs )?(\d(?:[-\x{2013}]\d)?) [aA]ctions(?:, ([^)]+))?\))?")
        .expect("legendary cost regex")
});

static CHALLENGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)(?:\s?/\s?(\d+))?\s*$").expect("challenge regex"));

static SPECIAL_HP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+\s\(\d+d\d+[+-]\d+\))").expect("special hp regex"));

static DICE_FORMULA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+d\d+)?(?:\s?\+\s?)?(\d+)?$").expect("dice formula regex"));

static HAS_DICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+d\d+").expect("has dice regex"));

static DIE_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(d\d+)").expect("die count regex"));

static FORMULA_OPERATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)([+-])(\d)").expect("formula operator regex"));

/// Outcome of running a text grammar over free-form input.
#[derive(Debug, Clone, PartialEq)]
pub enum Parse<T> {
    Parsed(T),
    Unrecognized,
}

impl<T> Parse<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Parsed(value) => Some(value),
            Self::Unrecognized => None,
        }
    }
}

/// A trait or action name, possibly carrying a usage limit in parentheses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraitName {
    Limited { name: String, recharge: String },
    Plain(String),
}

impl TraitName {
    pub fn name(&self) -> &str {
        match self {
            Self::Limited { name, .. } | Self::Plain(name) => name,
        }
    }

    pub fn into_parts(self) -> (String, Option<String>) {
        match self {
            Self::Limited { name, recharge } => (name, Some(recharge)),
            Self::Plain(name) => (name, None),
        }
    }
}

/// `Frightful Presence (1/Day, in lair)` -> name `Frightful Presence (in lair)`, recharge `1/Day`.
pub fn parse_trait_name(raw: &str) -> TraitName {
    let Some(caps) = TRAIT_NAME_RE.captures(raw) else {
        return TraitName::Plain(raw.to_owned());
    };
    let Some(paren) = caps.get(2) else {
        return TraitName::Plain(raw.to_owned());
    };
    let Some(limit) = RECHARGE_RE.captures(paren.as_str()) else {
        return TraitName::Plain(raw.to_owned());
    };

    let mut name = caps[1].trim().to_owned();
    if let Some(condition) = limit.get(1).or_else(|| limit.get(3)) {
        name.push_str(&format!(" ({})", condition.as_str()));
    }
    TraitName::Limited {
        name,
        recharge: limit[2].to_owned(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegendaryName {
    Costed { name: String, cost: u32 },
    Plain(String),
}

/// `Wing Attack (Costs 2 Actions)` -> `Wing Attack`, cost 2.
pub fn parse_legendary_name(raw: &str) -> LegendaryName {
    let Some(caps) = LEGENDARY_COST_RE.captures(raw) else {
        return LegendaryName::Plain(raw.to_owned());
    };
    let Some(cost) = caps.get(2) else {
        return LegendaryName::Plain(raw.to_owned());
    };
    // "2-3 Actions" costs the lower bound.
    let cost = cost.as_str()[..1].parse::<u32>().unwrap_or(1);

    let mut name = caps[1].trim().to_owned();
    if let Some(condition) = caps.get(3) {
        name.push_str(&format!(" ({})", condition.as_str()));
    }
    LegendaryName::Costed { name, cost }
}

/// Challenge ratings are integers, fractions or `Unknown`.
pub fn parse_challenge(cr: &str) -> Parse<f64> {
    if cr == "Unknown" {
        return Parse::Parsed(0.0);
    }
    let Some(caps) = CHALLENGE_RE.captures(cr) else {
        return Parse::Unrecognized;
    };
    let Ok(numerator) = caps[1].parse::<u32>() else {
        return Parse::Unrecognized;
    };
    match caps.get(2) {
        Some(denominator) => match denominator.as_str().parse::<u32>() {
            Ok(0) | Err(_) => Parse::Unrecognized,
            Ok(denominator) => Parse::Parsed(f64::from(numerator) / f64::from(denominator)),
        },
        None => Parse::Parsed(f64::from(numerator)),
    }
}

/// Keeps the `45 (6d10+12)` prefix of free-form special hit point text.
pub fn parse_special_hp(special: &str) -> Parse<String> {
    match SPECIAL_HP_RE.captures(special) {
        Some(caps) => Parse::Parsed(caps[1].to_owned()),
        None => Parse::Unrecognized,
    }
}

/// `4d8+12` -> `4d8 + 12`; only the first operator is spaced.
pub fn space_formula(formula: &str) -> String {
    FORMULA_OPERATOR_RE
        .replace(formula, "${1} ${2} ${3}")
        .into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiceFormula {
    pub dice: Option<String>,
    pub bonus: Option<String>,
}

/// `2d8 + 4`, `1d6`, `10` and the empty string all fit.
pub fn parse_dice_formula(text: &str) -> Parse<DiceFormula> {
    match DICE_FORMULA_RE.captures(text) {
        Some(caps) => Parse::Parsed(DiceFormula {
            dice: caps.get(1).map(|m| m.as_str().to_owned()),
            bonus: caps.get(2).map(|m| m.as_str().to_owned()),
        }),
        None => Parse::Unrecognized,
    }
}

pub fn has_dice(text: &str) -> bool {
    HAS_DICE_RE.is_match(text)
}

/// `1d10` -> `[[ceil((@{level} + 2) / 6)]]d10`.
pub fn cantrip_scaling(formula: &str) -> String {
    let die = DIE_COUNT_RE.replace(formula, "${1}");
    format!("[[ceil((@{{level}} + 2) / 6)]]{die}")
}

/// JavaScript-style `parseInt`: the leading integer, ignoring trailing text.
pub fn leading_integer(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let end = trimmed
        .char_indices()
        .find(|(idx, c)| !(c.is_ascii_digit() || (*idx == 0 && (*c == '-' || *c == '+'))))
        .map_or(trimmed.len(), |(idx, _)| idx);
    trimmed[..end].parse().ok()
}
