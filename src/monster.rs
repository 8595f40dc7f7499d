use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ConvertError;
use crate::formats::{
    ArmorClass, Entry, EntryNode, HitPoints, LegendaryEntry, LegendaryGroup, ListItem,
    MonsterRecord, StatblockEntry, Variant,
};
use crate::grammar::{
    LegendaryName, Parse, parse_challenge, parse_legendary_name, parse_special_hp,
    parse_trait_name, space_formula,
};
use crate::markdown::render_table;
use crate::reference::RulesText;
use crate::section::{plain_text, process_section};
use crate::shaped::{HitPointsText, LairContent, LegendaryAction, NormalizedMonster, TraitAction};
use crate::spellcasting::spellcasting_trait;
use crate::text::{capitalize_first, compare_names, normalize, title_case};

/// Legendary groups by name, shared across every monster of a run.
pub type LegendaryIndex = HashMap<String, LegendaryGroup>;

const DEFAULT_LEGENDARY_POINTS: u32 = 3;

/// Its variant block restates the base statblock.
const VARIANTS_SKIPPED_FOR: &[&str] = &["Shadow Mastiff"];

static ACTION_OPTIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"action options?[.:]").expect("action options regex"));

pub fn convert_monster(
    monster: &MonsterRecord,
    legendary_groups: &LegendaryIndex,
    rules: &dyn RulesText,
) -> Result<NormalizedMonster, ConvertError> {
    let cr = monster.cr.as_ref().map(|cr| cr.rating()).unwrap_or_default();
    let challenge = match parse_challenge(cr) {
        Parse::Parsed(challenge) => challenge,
        Parse::Unrecognized => return Err(ConvertError::ChallengeRating(cr.to_owned())),
    };

    let mut traits = Vec::new();
    let mut actions = Vec::new();
    let mut reactions = Vec::new();

    let mut trait_inputs = monster.traits.clone().unwrap_or_default();
    if let Some(extra) = additional_skills(monster) {
        trait_inputs.push(extra);
    }
    traits.extend(process_section(&trait_inputs));
    for block in monster.spellcasting.iter().flatten() {
        traits.push(spellcasting_trait(block, rules)?);
    }
    if let Some(entries) = &monster.actions {
        actions.extend(process_section(entries));
    }
    if let Some(entries) = &monster.reactions {
        reactions.extend(process_section(entries));
    }
    if !VARIANTS_SKIPPED_FOR.contains(&monster.name.as_str()) {
        for variant in monster.variant.iter().flatten() {
            add_variant(variant, &mut traits, &mut actions);
        }
    }

    let (legendary_points, legendary_actions) = match &monster.legendary {
        Some(entries) => (
            Some(monster.legendary_actions.unwrap_or(DEFAULT_LEGENDARY_POINTS)),
            Some(entries.iter().filter_map(legendary_action).collect()),
        ),
        None => (None, None),
    };

    let lair = monster
        .legendary_group
        .as_ref()
        .and_then(|group| legendary_groups.get(group.name()))
        .map(lair_content)
        .unwrap_or_default();

    let environments = monster
        .environment
        .as_ref()
        .filter(|environments| !environments.is_empty())
        .map(|environments| {
            let mut sorted = environments.clone();
            sorted.sort_by(|a, b| compare_names(a, b));
            sorted.iter().map(|env| title_case(env)).collect()
        });

    Ok(NormalizedMonster {
        name: monster.name.clone(),
        size: rules.size(&monster.size),
        creature_type: capitalize_first(&rules.creature_type(&monster.creature_type)),
        alignment: rules.alignment(&monster.alignment).to_lowercase(),
        ac: armor_class(&monster.ac),
        hp: hit_points(&monster.hp, &monster.name),
        speed: rules.speed(&monster.speed),
        strength: monster.strength,
        dexterity: monster.dexterity,
        constitution: monster.constitution,
        intelligence: monster.intelligence,
        wisdom: monster.wisdom,
        charisma: monster.charisma,
        saving_throws: monster.save.as_ref().map(|save| bonus_list(save.iter())),
        skills: monster
            .skill
            .as_ref()
            .map(|skill| bonus_list(skill.bonuses.iter())),
        damage_vulnerabilities: monster
            .vulnerable
            .as_deref()
            .map(|list| rules.damage_modifiers(list)),
        damage_resistances: monster
            .resist
            .as_deref()
            .map(|list| rules.damage_modifiers(list)),
        damage_immunities: monster
            .immune
            .as_deref()
            .map(|list| rules.damage_modifiers(list)),
        condition_immunities: monster
            .condition_immune
            .as_deref()
            .map(|list| rules.condition_immunities(list)),
        senses: monster.senses.as_ref().map(|senses| senses.joined()),
        languages: monster.languages.as_ref().map(|languages| languages.joined()),
        challenge,
        traits: non_empty(traits),
        actions: non_empty(actions),
        reactions: non_empty(reactions),
        legendary_points,
        legendary_actions,
        lair,
        environments,
    })
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() { None } else { Some(items) }
}

/// `dex: +5, wis: +3` -> `Dex +5, Wis +3`.
fn bonus_list<'a>(bonuses: impl Iterator<Item = (&'a String, &'a String)>) -> String {
    bonuses
        .map(|(name, bonus)| format!("{} {bonus}", title_case(name)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn additional_skills(monster: &MonsterRecord) -> Option<StatblockEntry> {
    let choice = monster.skill.as_ref()?.other.first()?;
    let skills = bonus_list(choice.one_of.iter());
    Some(StatblockEntry {
        name: "Additional Skill Proficiencies".to_owned(),
        entries: vec![Entry::Text(format!(
            "The {} also has one of the following skill proficiencies: {skills}",
            monster.name
        ))],
    })
}

/// `[12, {ac: 15, from: ["shield"]}]` -> `12, 15 (shield)`.
fn armor_class(ac: &[ArmorClass]) -> String {
    fn append(out: &mut String, item: String) {
        if !out.is_empty() {
            out.push_str(", ");
        }
        out.push_str(&item);
    }

    let mut out = String::new();
    for entry in ac {
        match entry {
            ArmorClass::Flat(value) => append(&mut out, value.to_string()),
            ArmorClass::Special { special } => append(&mut out, normalize(special)),
            ArmorClass::Detailed(detail) => match &detail.condition {
                Some(condition) if detail.braces => {
                    out.push_str(&format!(" ({} {})", detail.ac, normalize(condition)));
                }
                condition => {
                    let mut item = detail.ac.to_string();
                    if let Some(from) = &detail.from {
                        let from = from.iter().map(|f| normalize(f)).collect::<Vec<_>>();
                        item.push_str(&format!(" ({})", from.join(", ")));
                    }
                    if let Some(condition) = condition {
                        item.push(' ');
                        item.push_str(&normalize(condition));
                    }
                    append(&mut out, item);
                }
            },
        }
    }
    out
}

fn hit_points(hp: &HitPoints, monster: &str) -> HitPointsText {
    if let Some(special) = &hp.special {
        return match parse_special_hp(special) {
            Parse::Parsed(text) => HitPointsText::Known(text),
            Parse::Unrecognized => {
                tracing::warn!(monster, special, "special hit points not understood, using 0");
                HitPointsText::Unknown
            }
        };
    }
    match (&hp.average, &hp.formula) {
        (Some(average), Some(formula)) => {
            HitPointsText::Known(format!("{average} ({})", space_formula(formula)))
        }
        _ => {
            tracing::warn!(monster, "hit points missing, using 0");
            HitPointsText::Unknown
        }
    }
}

fn add_variant(variant: &Variant, traits: &mut Vec<TraitAction>, actions: &mut Vec<TraitAction>) {
    let has_groups = variant
        .entries
        .iter()
        .any(|entry| matches!(entry, Entry::Node(EntryNode::Entries { .. })));

    if !has_groups {
        let text = variant
            .entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Text(text) => Some(text.clone()),
                Entry::Node(EntryNode::List { items }) => Some(
                    items
                        .iter()
                        .filter_map(|item| match item {
                            ListItem::Named(named) => Some(format!("{} {}", named.name, named.body())),
                            ListItem::Text(text) => Some(text.clone()),
                            ListItem::Other(_) => None,
                        })
                        .collect::<Vec<_>>()
                        .join("\n"),
                ),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        push_variant(&variant.name, &text, false, traits, actions);
        return;
    }

    let mut forced_actions = false;
    for entry in &variant.entries {
        match entry {
            Entry::Text(text) => forced_actions = ACTION_OPTIONS_RE.is_match(text),
            Entry::Node(node) => {
                let name = match node {
                    EntryNode::Entries {
                        name: Some(name), ..
                    } => name.as_str(),
                    _ => variant.name.as_str(),
                };
                let text = stringify_node(node);
                push_variant(name, &text, forced_actions, traits, actions);
            }
            Entry::Other(_) => {}
        }
    }
}

/// Body text of a variant group; nested named groups keep a `Name.` lead-in.
fn stringify_node(node: &EntryNode) -> String {
    let child = |entry: &Entry| match entry {
        Entry::Text(text) => text.clone(),
        Entry::Node(EntryNode::Entries {
            name: Some(name),
            entries,
        }) => format!("{name}. {}", plain_text(entries, "\n")),
        Entry::Node(node) => stringify_node(node),
        Entry::Other(_) => String::new(),
    };
    match node {
        EntryNode::Entries { entries, .. } => {
            entries.iter().map(child).collect::<Vec<_>>().join("\n")
        }
        EntryNode::Inline { entries } => entries.iter().map(child).collect::<Vec<_>>().join(""),
        EntryNode::List { items } => items
            .iter()
            .filter_map(|item| match item {
                ListItem::Named(named) => Some(format!("{} {}", named.name, named.body())),
                ListItem::Text(text) => Some(text.clone()),
                ListItem::Other(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
        EntryNode::Table(table) => render_table(table),
        EntryNode::Item(named) => format!("{} {}", named.name, named.body()),
        EntryNode::Link { text } => text.clone(),
    }
}

fn push_variant(
    name: &str,
    text: &str,
    forced_actions: bool,
    traits: &mut Vec<TraitAction>,
    actions: &mut Vec<TraitAction>,
) {
    let (name, recharge) = parse_trait_name(name).into_parts();
    let is_attack = text.contains("{@hit") || text.contains("Attack:");
    let is_limited_action = recharge.is_some() && !text.contains("bonus action");
    let variant = TraitAction {
        name: format!("Variant: {name}"),
        recharge,
        text: normalize(text),
    };
    if forced_actions || is_attack || is_limited_action {
        actions.push(variant);
    } else {
        traits.push(variant);
    }
}

fn legendary_action(entry: &LegendaryEntry) -> Option<LegendaryAction> {
    let raw = entry.name.as_deref()?;
    let (name, cost) = match parse_legendary_name(raw) {
        LegendaryName::Costed { name, cost } => (name, cost),
        LegendaryName::Plain(name) => (name, 1),
    };
    Some(LegendaryAction {
        name,
        cost,
        text: normalize(&plain_text(&entry.entries, "\n")),
    })
}

fn list_item_text(item: &ListItem) -> Option<String> {
    match item {
        ListItem::Text(text) => Some(normalize(text)),
        ListItem::Named(named) => Some(normalize(&format!("{} {}", named.name, named.body()))),
        ListItem::Other(_) => None,
    }
}

fn first_list_items(entries: &[Entry]) -> Option<Vec<String>> {
    entries.iter().find_map(|entry| match entry {
        Entry::Node(EntryNode::List { items }) => {
            Some(items.iter().filter_map(list_item_text).collect())
        }
        _ => None,
    })
}

fn lair_content(group: &LegendaryGroup) -> LairContent {
    let mut content = LairContent::default();

    if let Some(lairs) = &group.lair_actions {
        let strings = lairs.iter().filter_map(Entry::as_text).map(normalize);
        content.lair_actions = if lairs.iter().all(|entry| entry.as_text().is_some()) {
            Some(strings.collect())
        } else {
            first_list_items(lairs).or_else(|| Some(strings.collect()))
        };
    }

    if let Some(regional) = &group.regional_effects {
        let strings = regional
            .iter()
            .filter_map(Entry::as_text)
            .map(normalize)
            .collect::<Vec<_>>();
        match first_list_items(regional) {
            Some(effects) => {
                content.regional_effects = Some(effects);
                content.regional_effects_fade = strings.last().cloned();
            }
            None => {
                if let Some((fade, effects)) = strings.split_last() {
                    content.regional_effects = Some(effects.to_vec());
                    content.regional_effects_fade = Some(fade.clone());
                }
            }
        }
    }

    content
}
