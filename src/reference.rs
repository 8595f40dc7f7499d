//! Display text for rules codes found in the source data.

use crate::formats::{
    Alignment, CastingTime, Components, ConditionImmunity, CreatureType, DamageModifier, Material,
    Speed, SpeedValue, SpellDuration, SpellRange, TypeTag,
};
use crate::text::normalize;

/// Turns rules codes and structures into the prose the statblock shows.
///
/// The converters only go through this trait, so a different ruleset can swap in
/// its own vocabulary.
pub trait RulesText: Send + Sync {
    fn size(&self, code: &str) -> String;
    fn creature_type(&self, creature_type: &CreatureType) -> String;
    fn alignment(&self, alignment: &[Alignment]) -> String;
    fn speed(&self, speed: &Speed) -> String;
    fn damage_modifiers(&self, modifiers: &[DamageModifier]) -> String;
    fn condition_immunities(&self, conditions: &[ConditionImmunity]) -> String;
    fn school(&self, code: &str) -> String;
    fn casting_time(&self, times: &[CastingTime]) -> String;
    fn range(&self, range: Option<&SpellRange>) -> String;
    fn components(&self, components: Option<&Components>) -> String;
    fn duration(&self, durations: &[SpellDuration]) -> String;
    fn source_name(&self, key: &str) -> String;
    fn spell_level(&self, level: u32) -> String;
}

/// Fifth edition vocabulary.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dnd5eRules;

const SOURCE_NAMES: &[(&str, &str)] = &[
    ("PHB", "Player's Handbook"),
    ("MM", "Monster Manual"),
    ("DMG", "Dungeon Master's Guide"),
    ("SRD", "SRD"),
    ("SCAG", "Sword Coast Adventurer's Guide"),
    ("VGM", "Volo's Guide to Monsters"),
    ("XGE", "Xanathar's Guide to Everything"),
    ("MTF", "Mordenkainen's Tome of Foes"),
    ("EEPC", "Elemental Evil Player's Companion"),
    ("UA", "Unearthed Arcana"),
    ("CoS", "Curse of Strahd"),
    ("HotDQ", "Hoard of the Dragon Queen"),
    ("LMoP", "Lost Mine of Phandelver"),
    ("OotA", "Out of the Abyss"),
    ("PotA", "Princes of the Apocalypse"),
    ("RoT", "The Rise of Tiamat"),
    ("SKT", "Storm King's Thunder"),
    ("TftYP", "Tales from the Yawning Portal"),
    ("ToA", "Tomb of Annihilation"),
    ("TYP", "Tales from the Yawning Portal"),
];

fn alignment_code(code: &str) -> &str {
    match code {
        "L" => "lawful",
        "N" | "NX" | "NY" => "neutral",
        "C" => "chaotic",
        "G" => "good",
        "E" => "evil",
        "U" => "unaligned",
        "A" => "any alignment",
        other => other,
    }
}

fn alignment_codes(codes: &[String]) -> String {
    let has = |code: &str| codes.iter().any(|c| c == code);
    match codes.len() {
        1 => alignment_code(&codes[0]).to_owned(),
        2 => codes
            .iter()
            .map(|code| alignment_code(code))
            .collect::<Vec<_>>()
            .join(" "),
        3 if has("NX") && has("NY") && has("N") => "any neutral alignment".to_owned(),
        4 if !has("L") && !has("NX") => "any chaotic alignment".to_owned(),
        4 if !has("G") && !has("NY") => "any evil alignment".to_owned(),
        4 if !has("C") && !has("NX") => "any lawful alignment".to_owned(),
        4 if !has("E") && !has("NY") => "any good alignment".to_owned(),
        5 if !has("G") => "any non-good alignment".to_owned(),
        5 if !has("E") => "any non-evil alignment".to_owned(),
        5 if !has("L") => "any non-lawful alignment".to_owned(),
        5 if !has("C") => "any non-chaotic alignment".to_owned(),
        6 => "any alignment".to_owned(),
        _ => codes
            .iter()
            .map(|code| alignment_code(code))
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn speed_value(value: &SpeedValue) -> String {
    match value {
        SpeedValue::Feet(feet) => format!("{feet} ft."),
        SpeedValue::Conditional { number, condition } => {
            format!("{number} ft. {}", normalize(condition))
        }
    }
}

fn plural(amount: u32, unit: &str) -> String {
    if amount == 1 {
        format!("{amount} {unit}")
    } else {
        format!("{amount} {unit}s")
    }
}

impl RulesText for Dnd5eRules {
    fn size(&self, code: &str) -> String {
        match code {
            "T" => "Tiny",
            "S" => "Small",
            "M" => "Medium",
            "L" => "Large",
            "H" => "Huge",
            "G" => "Gargantuan",
            "C" => "Colossal",
            "V" => "Varies",
            other => other,
        }
        .to_owned()
    }

    fn creature_type(&self, creature_type: &CreatureType) -> String {
        match creature_type {
            CreatureType::Plain(kind) => kind.clone(),
            CreatureType::Tagged {
                kind,
                swarm_size: Some(size),
                ..
            } => format!("swarm of {} {kind}s", self.size(size)),
            CreatureType::Tagged { kind, tags, .. } if tags.is_empty() => kind.clone(),
            CreatureType::Tagged { kind, tags, .. } => {
                let tags = tags
                    .iter()
                    .map(|tag| match tag {
                        TypeTag::Plain(tag) => tag.clone(),
                        TypeTag::Prefixed { tag, prefix } => format!("{prefix} {tag}"),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{kind} ({tags})")
            }
        }
    }

    fn alignment(&self, alignment: &[Alignment]) -> String {
        if alignment
            .iter()
            .all(|entry| matches!(entry, Alignment::Code(_)))
        {
            let codes = alignment
                .iter()
                .filter_map(|entry| match entry {
                    Alignment::Code(code) => Some(code.clone()),
                    _ => None,
                })
                .collect::<Vec<_>>();
            if codes.is_empty() {
                return String::new();
            }
            return alignment_codes(&codes);
        }

        alignment
            .iter()
            .map(|entry| match entry {
                Alignment::Code(code) => alignment_code(code).to_owned(),
                Alignment::Special { special } => special.clone(),
                Alignment::Chance {
                    alignment,
                    chance,
                    note,
                } => {
                    let mut text = alignment_codes(alignment);
                    if let Some(chance) = chance {
                        text.push_str(&format!(" ({chance}%)"));
                    }
                    if let Some(note) = note {
                        text.push_str(&format!(" {note}"));
                    }
                    text
                }
            })
            .collect::<Vec<_>>()
            .join(" or ")
    }

    fn speed(&self, speed: &Speed) -> String {
        let mut parts = Vec::new();
        if let Some(walk) = &speed.walk {
            parts.push(speed_value(walk));
        }
        for (mode, value) in [
            ("burrow", &speed.burrow),
            ("climb", &speed.climb),
            ("fly", &speed.fly),
            ("swim", &speed.swim),
        ] {
            let Some(value) = value else { continue };
            let mut part = format!("{mode} {}", speed_value(value));
            if mode == "fly" && speed.can_hover {
                part.push_str(" (hover)");
            }
            parts.push(part);
        }
        parts.join(", ")
    }

    fn damage_modifiers(&self, modifiers: &[DamageModifier]) -> String {
        let mut parts = Vec::new();
        let mut plain = Vec::new();
        for modifier in modifiers {
            match modifier {
                DamageModifier::Plain(kind) => plain.push(kind.clone()),
                DamageModifier::Group(group) => {
                    if !plain.is_empty() {
                        parts.push(plain.join(", "));
                        plain.clear();
                    }
                    if let Some(special) = &group.special {
                        parts.push(special.clone());
                        continue;
                    }
                    let mut text = String::new();
                    if let Some(pre_note) = &group.pre_note {
                        text.push_str(pre_note);
                        text.push(' ');
                    }
                    text.push_str(&self.damage_modifiers(&group.resist));
                    if let Some(note) = &group.note {
                        text.push(' ');
                        text.push_str(note);
                    }
                    parts.push(text);
                }
            }
        }
        if !plain.is_empty() {
            parts.push(plain.join(", "));
        }
        normalize(&parts.join("; "))
    }

    fn condition_immunities(&self, conditions: &[ConditionImmunity]) -> String {
        let parts = conditions
            .iter()
            .map(|condition| match condition {
                ConditionImmunity::Plain(name) => name.clone(),
                ConditionImmunity::Group {
                    conditions,
                    pre_note,
                    note,
                } => {
                    let inner = self.condition_immunities(conditions);
                    match (pre_note, note) {
                        (Some(pre), Some(note)) => format!("{pre} {inner} {note}"),
                        (Some(pre), None) => format!("{pre} {inner}"),
                        (None, Some(note)) => format!("{inner} {note}"),
                        (None, None) => inner,
                    }
                }
            })
            .collect::<Vec<_>>();
        let separator = if conditions
            .iter()
            .any(|c| matches!(c, ConditionImmunity::Group { .. }))
        {
            "; "
        } else {
            ", "
        };
        normalize(&parts.join(separator))
    }

    fn school(&self, code: &str) -> String {
        match code.to_uppercase().as_str() {
            "A" => "Abjuration",
            "C" => "Conjuration",
            "D" => "Divination",
            "E" => "Enchantment",
            "V" => "Evocation",
            "I" => "Illusion",
            "N" => "Necromancy",
            "T" => "Transmutation",
            "P" => "Psionic",
            _ => code,
        }
        .to_owned()
    }

    fn casting_time(&self, times: &[CastingTime]) -> String {
        times
            .iter()
            .map(|time| {
                let number = time.number.unwrap_or(1);
                let unit = match time.unit.as_str() {
                    "bonus" => "bonus action",
                    other => other,
                };
                let mut text = plural(number, unit);
                if let Some(condition) = &time.condition {
                    text.push_str(", ");
                    text.push_str(&normalize(condition));
                }
                text
            })
            .collect::<Vec<_>>()
            .join(" or ")
    }

    fn range(&self, range: Option<&SpellRange>) -> String {
        let Some(range) = range else {
            return "Special".to_owned();
        };
        match range.kind.as_str() {
            "point" => match &range.distance {
                Some(distance) => match distance.kind.as_str() {
                    "self" => "Self".to_owned(),
                    "touch" => "Touch".to_owned(),
                    "sight" => "Sight".to_owned(),
                    "unlimited" => "Unlimited".to_owned(),
                    "plane" => "Unlimited on the same plane".to_owned(),
                    "feet" => {
                        let amount = distance.amount.unwrap_or(0);
                        format!("{amount} {}", if amount == 1 { "foot" } else { "feet" })
                    }
                    "miles" => plural(distance.amount.unwrap_or(0), "mile"),
                    other => other.to_owned(),
                },
                None => "Touch".to_owned(),
            },
            "radius" | "sphere" | "cone" | "line" | "cube" | "hemisphere" | "cylinder" => {
                let amount = range
                    .distance
                    .as_ref()
                    .and_then(|distance| distance.amount)
                    .unwrap_or(0);
                format!("Self ({amount}-foot {})", range.kind)
            }
            _ => "Special".to_owned(),
        }
    }

    fn components(&self, components: Option<&Components>) -> String {
        let Some(components) = components else {
            return String::new();
        };
        let mut parts = Vec::new();
        if components.v {
            parts.push("V".to_owned());
        }
        if components.s {
            parts.push("S".to_owned());
        }
        match &components.m {
            Some(Material::Flag(true)) => parts.push("M".to_owned()),
            Some(Material::Text(text)) | Some(Material::Detailed { text }) => {
                parts.push(format!("M ({})", normalize(text)));
            }
            Some(Material::Flag(false)) | None => {}
        }
        parts.join(", ")
    }

    fn duration(&self, durations: &[SpellDuration]) -> String {
        durations
            .iter()
            .map(|duration| match duration.kind.as_str() {
                "instant" => "Instantaneous".to_owned(),
                "timed" => {
                    let Some(amount) = &duration.duration else {
                        return "Instantaneous".to_owned();
                    };
                    let span = plural(amount.amount.unwrap_or(1), &amount.kind);
                    if duration.concentration {
                        format!("Concentration, up to {span}")
                    } else if amount.up_to {
                        format!("Up to {span}")
                    } else {
                        span
                    }
                }
                "permanent" => {
                    let dispel = duration.ends.iter().any(|end| end == "dispel");
                    let trigger = duration.ends.iter().any(|end| end == "trigger");
                    match (dispel, trigger) {
                        (true, true) => "Until dispelled or triggered".to_owned(),
                        (false, true) => "Until triggered".to_owned(),
                        (true, false) => "Until dispelled".to_owned(),
                        (false, false) => "Permanent".to_owned(),
                    }
                }
                _ => "Special".to_owned(),
            })
            .collect::<Vec<_>>()
            .join(" or ")
    }

    fn source_name(&self, key: &str) -> String {
        SOURCE_NAMES
            .iter()
            .find(|(code, _)| *code == key)
            .map_or_else(|| key.to_owned(), |(_, name)| (*name).to_owned())
    }

    fn spell_level(&self, level: u32) -> String {
        let ordinal = match (level % 10, level % 100) {
            (_, 11..=13) => "th",
            (1, _) => "st",
            (2, _) => "nd",
            (3, _) => "rd",
            _ => "th",
        };
        match level {
            0 => "Cantrips".to_owned(),
            level => format!("{level}{ordinal} level"),
        }
    }
}
