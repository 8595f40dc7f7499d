use std::cmp::Reverse;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;

use crate::error::ConvertError;
use crate::formats::{Entry, SpellLevelSlots, SpellRef, SpellcastingBlock};
use crate::grammar::{leading_integer, parse_trait_name};
use crate::reference::RulesText;
use crate::shaped::TraitAction;
use crate::text::normalize;

/// Keys of an innate block that describe the block rather than a usage frequency.
const RESERVED_KEYS: &[&str] = &["headerEntries", "headerWill", "name", "footerEntries"];

/// Converts one spellcasting block into a trait whose text lists the spells by usage.
pub fn spellcasting_trait(
    block: &SpellcastingBlock,
    rules: &dyn RulesText,
) -> Result<TraitAction, ConvertError> {
    let lines = if block.name.starts_with("Innate") {
        innate_lines(block, rules)?
    } else {
        match block.usage.get("spells") {
            Some(spells) => leveled_lines(decode("spells", spells)?, rules)?,
            None => Vec::new(),
        }
    };

    let mut text = Vec::with_capacity(lines.len() + block.footer_entries.len() + 1);
    if let Some(header) = block.header_entries.first().and_then(entry_text) {
        text.push(normalize(&header));
    }
    text.extend(lines);
    text.extend(
        block
            .footer_entries
            .iter()
            .filter_map(entry_text)
            .map(|footer| normalize(&footer)),
    );

    let (name, recharge) = parse_trait_name(&block.name).into_parts();
    Ok(TraitAction {
        name,
        recharge,
        text: text.join("\n"),
    })
}

fn entry_text(entry: &Entry) -> Option<String> {
    entry.as_text().map(str::to_owned)
}

fn innate_lines(
    block: &SpellcastingBlock,
    rules: &dyn RulesText,
) -> Result<Vec<String>, ConvertError> {
    let mut lines = Vec::new();
    for (key, value) in &block.usage {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        match key.as_str() {
            "will" => {
                let spells = decode::<Vec<SpellRef>>(key, value)?;
                lines.push(format!("At will: {}", spell_list(&spells)));
            }
            "constant" => {
                let spells = decode::<Vec<SpellRef>>(key, value)?;
                lines.push(format!("Constant: {}", spell_list(&spells)));
            }
            "daily" => lines.extend(recharge_lines(key, value, "day")?),
            "rest" => lines.extend(recharge_lines(key, value, "rest")?),
            "weekly" => lines.extend(recharge_lines(key, value, "week")?),
            "spells" => lines.extend(leveled_lines(decode(key, value)?, rules)?),
            other => return Err(ConvertError::SpellFrequency(other.to_owned())),
        }
    }
    Ok(lines)
}

/// `{"2e": [...], "1": [...]}` -> `2/day each: ...`, `1/day: ...`, most uses first.
fn recharge_lines(
    key: &str,
    value: &serde_json::Value,
    period: &str,
) -> Result<Vec<String>, ConvertError> {
    let uses: IndexMap<String, Vec<SpellRef>> = decode(key, value)?;
    let mut lines = uses
        .iter()
        .map(|(count, spells)| {
            let how_many = count.chars().next().map(String::from).unwrap_or_default();
            let each = if count.ends_with('e') && spells.len() > 1 {
                " each"
            } else {
                ""
            };
            let order = leading_integer(&how_many).unwrap_or(0);
            (
                order,
                format!("{how_many}/{period}{each}: {}", spell_list(spells)),
            )
        })
        .collect::<Vec<_>>();
    lines.sort_by_key(|(order, _)| Reverse(*order));
    Ok(lines.into_iter().map(|(_, line)| line).collect())
}

fn leveled_lines(
    levels: IndexMap<String, SpellLevelSlots>,
    rules: &dyn RulesText,
) -> Result<Vec<String>, ConvertError> {
    let mut parsed = levels
        .into_iter()
        .map(|(level, slots)| {
            level
                .parse::<u32>()
                .map(|level| (level, slots))
                .map_err(|_| ConvertError::SpellFrequencyShape {
                    key: "spells".to_owned(),
                    reason: format!("spell level `{level}` is not a number"),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    parsed.sort_by_key(|(level, _)| *level);

    Ok(parsed
        .into_iter()
        .map(|(level, slots)| {
            format!(
                "{} ({}): {}",
                rules.spell_level(level),
                slot_text(slots.slots),
                spell_list(&slots.spells)
            )
        })
        .collect())
}

fn slot_text(slots: Option<u32>) -> String {
    match slots {
        None => "at will".to_owned(),
        Some(1) => "1 slot".to_owned(),
        Some(n) => format!("{n} slots"),
    }
}

fn spell_list(spells: &[SpellRef]) -> String {
    spells
        .iter()
        .map(|spell| normalize(spell.text()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn decode<T: DeserializeOwned>(key: &str, value: &serde_json::Value) -> Result<T, ConvertError> {
    serde_json::from_value(value.clone()).map_err(|err| ConvertError::SpellFrequencyShape {
        key: key.to_owned(),
        reason: err.to_string(),
    })
}
