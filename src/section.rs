//! Flattens trait, action and reaction entry trees into named text blocks.

use std::sync::LazyLock;

use regex::Regex;

use crate::formats::{Entry, EntryNode, ListItem, NamedItem, StatblockEntry};
use crate::grammar::parse_trait_name;
use crate::markdown::render_table;
use crate::shaped::TraitAction;
use crate::text::normalize;

/// Traits whose later entries each describe a separate named effect.
const SPECIAL_LISTS: &[&str] = &["Roar", "Eye Rays", "Eye Ray", "Gaze", "Call the Blood"];

static SPECIAL_ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d+\. )?([A-Z][a-z]+(?: [A-Z][a-z]+)*)\. (.*)$").expect("special item regex")
});

static ITEM_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^.]+)\.$").expect("item name regex"));

pub fn process_section(entries: &[StatblockEntry]) -> Vec<TraitAction> {
    entries.iter().flat_map(process_entry).collect()
}

fn process_entry(entry: &StatblockEntry) -> Vec<TraitAction> {
    let (name, recharge) = parse_trait_name(&entry.name).into_parts();
    let mut parent = TraitAction {
        name,
        recharge,
        text: String::new(),
    };

    if SPECIAL_LISTS.contains(&parent.name.as_str()) {
        return split_special_list(parent, &entry.entries);
    }

    let mut texts = Vec::new();
    let mut children = Vec::new();
    for item in &entry.entries {
        expand(item, &mut texts, &mut children);
    }
    parent.text = texts.join("\n");

    let mut out = Vec::with_capacity(children.len() + 1);
    out.push(parent);
    out.extend(children);
    out
}

fn expand(entry: &Entry, texts: &mut Vec<String>, children: &mut Vec<TraitAction>) {
    match entry {
        Entry::Text(text) => texts.push(normalize(text)),
        Entry::Node(EntryNode::List { items }) => {
            let mut bullets = Vec::new();
            for item in items {
                match item {
                    ListItem::Named(named) => children.push(named_child(named)),
                    ListItem::Text(text) => bullets.push(format!("\u{2022} {}", normalize(text))),
                    ListItem::Other(_) => {}
                }
            }
            if !bullets.is_empty() {
                texts.push(bullets.join("\n"));
            }
        }
        Entry::Node(EntryNode::Item(named)) => children.push(named_child(named)),
        Entry::Node(EntryNode::Table(table)) => texts.push(normalize(&render_table(table))),
        Entry::Node(EntryNode::Entries { entries, .. }) => {
            texts.push(normalize(&plain_text(entries, "\n")));
        }
        Entry::Node(EntryNode::Inline { entries }) => {
            texts.push(normalize(&plain_text(entries, "")));
        }
        Entry::Node(EntryNode::Link { text }) => texts.push(normalize(text)),
        Entry::Other(_) => {}
    }
}

fn named_child(item: &NamedItem) -> TraitAction {
    let name = ITEM_NAME_RE.replace(&item.name, "${1}").into_owned();
    TraitAction::new(name, normalize(&item.body()))
}

/// Plain text of nested entries joined by `joiner`; tables and lists are skipped.
pub fn plain_text(entries: &[Entry], joiner: &str) -> String {
    entries
        .iter()
        .filter_map(|entry| match entry {
            Entry::Text(text) => Some(text.clone()),
            Entry::Node(EntryNode::Link { text }) => Some(text.clone()),
            Entry::Node(EntryNode::Entries { entries, .. }) => Some(plain_text(entries, "\n")),
            Entry::Node(EntryNode::Inline { entries }) => Some(plain_text(entries, "")),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(joiner)
}

fn split_special_list(mut parent: TraitAction, entries: &[Entry]) -> Vec<TraitAction> {
    let mut lines = entries.iter().filter_map(|entry| match entry {
        Entry::Text(text) => Some(text.clone()),
        Entry::Node(EntryNode::Entries { entries, .. }) => Some(plain_text(entries, "\n")),
        Entry::Node(EntryNode::Inline { entries }) => Some(plain_text(entries, "")),
        _ => None,
    });

    parent.text = lines.next().map(|first| normalize(&first)).unwrap_or_default();
    let mut out = vec![parent];
    for line in lines {
        if let Some(caps) = SPECIAL_ITEM_RE.captures(&line) {
            out.push(TraitAction::new(&caps[1], normalize(&caps[2])));
        } else if let Some(last) = out.last_mut() {
            last.text.push('\n');
            last.text.push_str(&normalize(&line));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(value: serde_json::Value) -> anyhow::Result<Vec<TraitAction>> {
        let entries: Vec<StatblockEntry> = serde_json::from_value(value)?;
        Ok(process_section(&entries))
    }

    #[test]
    fn recharge_is_split_out_and_text_normalized() -> anyhow::Result<()> {
        let actions = section(serde_json::json!([{
            "name": "Bite (Recharge 5\u{2013}6)",
            "entries": ["{@atk mw} {@hit 5} to hit. {@h}7 ({@damage 1d10+2}) piercing damage."]
        }]))?;

        assert_eq!(
            actions,
            vec![TraitAction {
                name: "Bite".to_owned(),
                recharge: Some("Recharge 5\u{2013}6".to_owned()),
                text: "mw +5 to hit. {@h}7 (1d10 + 2) piercing damage.".to_owned(),
            }]
        );
        Ok(())
    }

    #[test]
    fn named_list_items_become_following_traits() -> anyhow::Result<()> {
        let actions = section(serde_json::json!([{
            "name": "Breath Weapons (Recharge 5\u{2013}6)",
            "entries": [
                "The dragon uses one of the following breath weapons.",
                {"type": "list", "items": [
                    {"type": "item", "name": "Fire Breath.", "entry": "Deals {@damage 10d6} fire."},
                    {"type": "item", "name": "Sleep Breath.", "entry": "Falls asleep."}
                ]}
            ]
        }]))?;

        let names = actions.iter().map(|a| a.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["Breath Weapons", "Fire Breath", "Sleep Breath"]);
        assert_eq!(
            actions[0].text,
            "The dragon uses one of the following breath weapons."
        );
        assert_eq!(actions[1].text, "Deals 10d6 fire.");
        assert_eq!(actions[1].recharge, None);
        Ok(())
    }

    #[test]
    fn string_lists_become_bullets() -> anyhow::Result<()> {
        let traits = section(serde_json::json!([{
            "name": "Aura",
            "entries": ["Pick one:", {"type": "list", "items": ["cold", "{@condition frightened}"]}]
        }]))?;

        assert_eq!(traits.len(), 1);
        assert_eq!(traits[0].text, "Pick one:\n\u{2022} cold\n\u{2022} frightened");
        Ok(())
    }

    #[test]
    fn inline_groups_concatenate() -> anyhow::Result<()> {
        let traits = section(serde_json::json!([{
            "name": "Note",
            "entries": [{"type": "inline", "entries": ["See ", {"type": "link", "text": "here"}, "."]}]
        }]))?;

        assert_eq!(traits[0].text, "See here.");
        Ok(())
    }

    #[test]
    fn special_lists_split_on_capitalized_phrases() -> anyhow::Result<()> {
        let actions = section(serde_json::json!([{
            "name": "Eye Rays",
            "entries": [
                "The beholder shoots three rays.",
                "1. Charm Ray. The target is {@condition charmed}.",
                "It repeats the save each day.",
                "2. Paralyzing Ray. The target is paralyzed."
            ]
        }]))?;

        assert_eq!(
            actions,
            vec![
                TraitAction::new("Eye Rays", "The beholder shoots three rays."),
                TraitAction::new(
                    "Charm Ray",
                    "The target is charmed.\nIt repeats the save each day."
                ),
                TraitAction::new("Paralyzing Ray", "The target is paralyzed."),
            ]
        );
        Ok(())
    }
}
