use std::sync::LazyLock;

use regex::Regex;

use crate::error::ConvertError;
use crate::formats::{Entry, EntryNode, ListItem, SpellRecord, SupplementalSpellData};
use crate::grammar::{
    DiceFormula, Parse, cantrip_scaling, has_dice, leading_integer, parse_dice_formula,
};
use crate::markdown::render_table;
use crate::reference::RulesText;
use crate::section::plain_text;
use crate::shaped::{DamageInfo, NormalizedSpell, SpellHeal};
use crate::text::normalize;

static DAMAGE_INCREASES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"damage increases(?: by (?:\{[^}]+\}|one die))? when you reach")
        .expect("damage increases regex")
});

static MORE_BEAMS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"creates more than one beam when you reach").expect("more beams regex")
});

pub fn convert_spell(
    spell: &SpellRecord,
    supplemental: Option<&SupplementalSpellData>,
    rules: &dyn RulesText,
) -> Result<NormalizedSpell, ConvertError> {
    let (description, mut higher_level) = describe(&spell.entries);
    if let Some(override_text) = spell
        .entries_higher_level
        .as_deref()
        .and_then(|groups| groups.first())
        .map(higher_level_text)
    {
        higher_level = Some(override_text);
    }

    let mut out = NormalizedSpell {
        name: spell.name.clone(),
        level: spell.level,
        school: rules.school(&spell.school),
        ritual: spell
            .meta
            .as_ref()
            .filter(|meta| meta.ritual)
            .map(|_| true),
        casting_time: rules.casting_time(&spell.time),
        range: rules.range(spell.range.as_ref()),
        components: rules.components(spell.components.as_ref()),
        duration: rules.duration(&spell.duration),
        description,
        higher_level,
        attack: None,
        save: None,
        damage: None,
        heal: None,
    };

    if let Some(data) = supplemental {
        apply_supplemental(&mut out, data)?;
    }
    Ok(out)
}

/// Splits a trailing cantrip-scaling sentence off the rendered description.
fn describe(entries: &[Entry]) -> (String, Option<String>) {
    let (body, higher_level) = match entries.split_last() {
        Some((Entry::Text(last), rest))
            if DAMAGE_INCREASES_RE.is_match(last) || MORE_BEAMS_RE.is_match(last) =>
        {
            (rest, Some(normalize(last)))
        }
        _ => (entries, None),
    };
    let description = body
        .iter()
        .filter_map(render_entry)
        .collect::<Vec<_>>()
        .join("\n");
    (normalize(&description), higher_level)
}

fn higher_level_text(group: &Entry) -> String {
    match group {
        Entry::Node(EntryNode::Entries { entries, .. }) => normalize(&plain_text(entries, "\n")),
        Entry::Text(text) => normalize(text),
        other => normalize(&render_entry(other).unwrap_or_default()),
    }
}

fn render_entry(entry: &Entry) -> Option<String> {
    match entry {
        Entry::Text(text) => Some(text.clone()),
        Entry::Node(EntryNode::Table(table)) => Some(render_table(table)),
        Entry::Node(EntryNode::List { items }) => Some(
            items
                .iter()
                .filter_map(|item| match item {
                    ListItem::Text(text) => Some(format!("- {text}")),
                    ListItem::Named(named) => Some(format!("- ***{}*** {}", named.name, named.body())),
                    ListItem::Other(_) => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        Entry::Node(EntryNode::Entries {
            name: Some(name),
            entries,
        }) => Some(format!("***{name}.*** {}", render_children(entries, "\n"))),
        Entry::Node(EntryNode::Entries { name: None, entries }) => {
            Some(render_children(entries, "\n"))
        }
        Entry::Node(EntryNode::Inline { entries }) => Some(render_children(entries, "")),
        Entry::Node(EntryNode::Item(named)) => Some(format!("***{}*** {}", named.name, named.body())),
        Entry::Node(EntryNode::Link { text }) => Some(text.clone()),
        Entry::Other(_) => None,
    }
}

fn render_children(entries: &[Entry], joiner: &str) -> String {
    entries
        .iter()
        .filter_map(render_entry)
        .collect::<Vec<_>>()
        .join(joiner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Primary,
    Secondary,
}

/// One damage description from the supplemental data.
struct DamageSource<'a> {
    damage: Option<&'a str>,
    progression: Option<&'a str>,
    damage_type: Option<&'a str>,
    higher_level_dice: Option<&'a str>,
    casting_stat: Option<&'a str>,
    condition: Option<&'a str>,
    condition_field: &'static str,
}

/// Mutable views of the output fields one damage slot writes.
struct DamageFields<'a> {
    damage: &'a mut Option<String>,
    bonus: &'a mut Option<String>,
    damage_type: &'a mut Option<String>,
    higher_level_dice: &'a mut Option<serde_json::Number>,
    casting_stat: &'a mut Option<bool>,
}

fn fields(info: &mut DamageInfo, slot: Slot) -> DamageFields<'_> {
    match slot {
        Slot::Primary => DamageFields {
            damage: &mut info.damage,
            bonus: &mut info.damage_bonus,
            damage_type: &mut info.damage_type,
            higher_level_dice: &mut info.higher_level_dice,
            casting_stat: &mut info.casting_stat,
        },
        Slot::Secondary => DamageFields {
            damage: &mut info.secondary_damage,
            bonus: &mut info.secondary_damage_bonus,
            damage_type: &mut info.secondary_damage_type,
            higher_level_dice: &mut info.higher_level_secondary_dice,
            casting_stat: &mut info.secondary_casting_stat,
        },
    }
}

fn apply_supplemental(
    spell: &mut NormalizedSpell,
    data: &SupplementalSpellData,
) -> Result<(), ConvertError> {
    if let Some(attack) = &data.spell_attack {
        spell.attack.get_or_insert_with(Default::default).kind = Some(attack.to_lowercase());
    }
    if let Some(ability) = &data.save {
        let save = spell.save.get_or_insert_with(Default::default);
        save.ability = Some(ability.clone());
        save.save_success = data.save_success.as_ref().map(|s| s.to_lowercase());
    }

    let primary = DamageSource {
        damage: data.damage.as_deref(),
        progression: data.damage_progression.as_deref(),
        damage_type: data.damage_type.as_deref(),
        higher_level_dice: data.higher_spell_slot_dice.as_deref(),
        casting_stat: data.add_casting_modifier.as_deref(),
        condition: data.primary_damage_condition.as_deref(),
        condition_field: "primaryDamageCondition",
    };
    let secondary = DamageSource {
        damage: data.secondary_damage.as_deref(),
        progression: data.secondary_damage_progression.as_deref(),
        damage_type: data.secondary_damage_type.as_deref(),
        higher_level_dice: data.secondary_higher_spell_slot_dice.as_deref(),
        casting_stat: data.secondary_add_casting_modifier.as_deref(),
        condition: data.secondary_damage_condition.as_deref(),
        condition_field: "secondaryDamageCondition",
    };
    // Two damages landing in one object need distinct field names.
    let secondary_slot = if data.primary_damage_condition == data.secondary_damage_condition {
        Slot::Secondary
    } else {
        Slot::Primary
    };

    route_damage(spell, &primary, Slot::Primary)?;
    route_damage(spell, &secondary, secondary_slot)?;

    if let Some(healing) = &data.healing {
        spell.heal = Some(heal(&spell.name, healing, data));
    }
    Ok(())
}

fn route_damage(
    spell: &mut NormalizedSpell,
    source: &DamageSource<'_>,
    slot: Slot,
) -> Result<(), ConvertError> {
    let Some(formula) = source.damage else {
        return Ok(());
    };
    if source.damage_type == Some("Effect") {
        return Ok(());
    }

    let target = match source.condition {
        Some("save") => &mut spell.save.get_or_insert_with(Default::default).damage,
        Some("attack") => &mut spell.attack.get_or_insert_with(Default::default).damage,
        Some("auto") => spell.damage.get_or_insert_with(Default::default),
        _ => {
            return Err(ConvertError::DamageCondition {
                field: source.condition_field,
                spell: spell.name.clone(),
            });
        }
    };
    let out = fields(target, slot);

    match source.progression {
        Some("Cantrip Dice") => *out.damage = Some(cantrip_scaling(formula)),
        Some(_) => *out.damage = Some(formula.to_owned()),
        None => match parse_dice_formula(formula) {
            Parse::Parsed(DiceFormula { dice, bonus }) => {
                if dice.is_some() {
                    *out.damage = dice;
                }
                if bonus.is_some() {
                    *out.bonus = bonus;
                }
            }
            Parse::Unrecognized => {
                tracing::debug!(spell = %spell.name, formula, "damage formula kept verbatim");
                *out.damage = Some(formula.to_owned());
            }
        },
    }
    if let Some(kind) = source.damage_type {
        *out.damage_type = Some(kind.to_lowercase());
    }
    if let Some(dice) = source.higher_level_dice {
        *out.higher_level_dice = dice_count(dice);
    }
    if source.casting_stat == Some("Yes") {
        *out.casting_stat = Some(true);
    }
    Ok(())
}

/// `1` stays an integer; `0.5` becomes a float.
fn dice_count(text: &str) -> Option<serde_json::Number> {
    if text.contains('.') {
        text.trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
    } else {
        leading_integer(text).map(serde_json::Number::from)
    }
}

fn heal(spell: &str, healing: &str, data: &SupplementalSpellData) -> SpellHeal {
    let mut heal = SpellHeal::default();
    match parse_dice_formula(healing) {
        Parse::Parsed(DiceFormula { dice, bonus }) => {
            heal.heal = dice;
            heal.bonus = bonus.as_deref().and_then(leading_integer);
        }
        Parse::Unrecognized => {
            tracing::warn!(spell, healing, "healing formula not understood, keeping it verbatim");
            heal.heal = Some(healing.to_owned());
        }
    }
    if data.add_casting_modifier.as_deref() == Some("Yes") {
        heal.casting_stat = Some(true);
    }
    if let Some(dice) = &data.higher_spell_slot_dice
        && has_dice(healing)
    {
        heal.higher_level_dice = leading_integer(dice);
    }
    heal.higher_level_amount = data.higher_level_healing.as_deref().and_then(leading_integer);
    heal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::SupplementalRecord;
    use crate::reference::Dnd5eRules;
    use crate::shaped::{SpellAttack, SpellSave};

    fn spell(value: serde_json::Value) -> anyhow::Result<SpellRecord> {
        Ok(serde_json::from_value(value)?)
    }

    fn supplemental(data: serde_json::Value) -> anyhow::Result<SupplementalSpellData> {
        let record: SupplementalRecord =
            serde_json::from_value(serde_json::json!({"name": "x", "data": data}))?;
        Ok(record.merged()?)
    }

    fn fireball() -> serde_json::Value {
        serde_json::json!({
            "name": "Fireball",
            "level": 3,
            "school": "V",
            "time": [{"number": 1, "unit": "action"}],
            "range": {"type": "point", "distance": {"type": "feet", "amount": 150}},
            "components": {"v": true, "s": true, "m": "a tiny ball of bat guano and sulfur"},
            "duration": [{"type": "instant"}],
            "entries": ["A bright streak flashes. Each creature takes {@damage 8d6} fire damage."],
            "entriesHigherLevel": [{
                "type": "entries",
                "name": "At Higher Levels",
                "entries": ["The damage increases by {@scaledamage 8d6|3-9|1d6} for each slot level above 3rd."]
            }],
            "classes": {"fromClassList": [{"name": "Wizard", "source": "PHB"}]}
        })
    }

    #[test]
    fn fireball_routes_save_damage() -> anyhow::Result<()> {
        let data = supplemental(serde_json::json!({
            "Save": "Dexterity",
            "Save Success": "Half damage",
            "Damage": "8d6",
            "Damage Type": "Fire",
            "Higher Spell Slot Dice": "1",
            "primaryDamageCondition": "save"
        }))?;

        let out = convert_spell(&spell(fireball())?, Some(&data), &Dnd5eRules)?;
        assert_eq!(out.school, "Evocation");
        assert_eq!(out.casting_time, "1 action");
        assert_eq!(out.range, "150 feet");
        assert_eq!(out.components, "V, S, M (a tiny ball of bat guano and sulfur)");
        assert_eq!(out.duration, "Instantaneous");
        assert_eq!(
            out.description,
            "A bright streak flashes. Each creature takes 8d6 fire damage."
        );
        assert_eq!(
            out.higher_level.as_deref(),
            Some("The damage increases by 1d6 for each slot level above 3rd.")
        );
        assert_eq!(
            out.save,
            Some(SpellSave {
                ability: Some("Dexterity".to_owned()),
                save_success: Some("half damage".to_owned()),
                damage: DamageInfo {
                    damage: Some("8d6".to_owned()),
                    damage_type: Some("fire".to_owned()),
                    higher_level_dice: Some(1.into()),
                    ..DamageInfo::default()
                },
            })
        );
        assert_eq!(out.attack, None);
        Ok(())
    }

    #[test]
    fn cantrip_scaling_sentence_moves_to_higher_level() -> anyhow::Result<()> {
        let record = spell(serde_json::json!({
            "name": "Fire Bolt",
            "level": 0,
            "school": "V",
            "time": [{"number": 1, "unit": "action"}],
            "range": {"type": "point", "distance": {"type": "feet", "amount": 120}},
            "components": {"v": true, "s": true},
            "duration": [{"type": "instant"}],
            "entries": [
                "You hurl a mote of fire.",
                "This spell's damage increases by {@dice 1d10} when you reach 5th level."
            ]
        }))?;
        let data = supplemental(serde_json::json!({
            "Spell Attack": "Ranged",
            "Damage": "1d10",
            "Damage Progression": "Cantrip Dice",
            "Damage Type": "Fire",
            "primaryDamageCondition": "attack"
        }))?;

        let out = convert_spell(&record, Some(&data), &Dnd5eRules)?;
        assert_eq!(out.description, "You hurl a mote of fire.");
        assert_eq!(
            out.higher_level.as_deref(),
            Some("This spell's damage increases by 1d10 when you reach 5th level.")
        );
        assert_eq!(
            out.attack,
            Some(SpellAttack {
                kind: Some("ranged".to_owned()),
                damage: DamageInfo {
                    damage: Some("[[ceil((@{level} + 2) / 6)]]d10".to_owned()),
                    damage_type: Some("fire".to_owned()),
                    ..DamageInfo::default()
                },
            })
        );
        Ok(())
    }

    #[test]
    fn descriptions_render_tables_lists_and_named_groups() -> anyhow::Result<()> {
        let mut value = fireball();
        value["entries"] = serde_json::json!([
            "Roll on the table.",
            {"type": "table", "colLabels": ["d4", "Color"], "colStyles": ["col-2 text-center", "col-10"],
             "rows": [["1", "Red"], ["2", "Blue"]]},
            {"type": "list", "items": ["one", "two"]},
            {"type": "entries", "name": "Variant", "entries": ["Deals {@damage 2d6+1} damage."]}
        ]);
        if let Some(map) = value.as_object_mut() {
            map.remove("entriesHigherLevel");
        }

        let out = convert_spell(&spell(value)?, None, &Dnd5eRules)?;
        assert_eq!(
            out.description,
            "Roll on the table.\n| d4 | Color |\n|:----:|:----|\n| 1 | Red |\n| 2 | Blue |\n- one\n- two\n***Variant.*** Deals 2d6 + 1 damage."
        );
        assert_eq!(out.higher_level, None);
        Ok(())
    }

    #[test]
    fn equal_conditions_use_secondary_field_names() -> anyhow::Result<()> {
        let data = supplemental(serde_json::json!({
            "Save": "Constitution",
            "Damage": "3d8",
            "Damage Type": "Thunder",
            "primaryDamageCondition": "save",
            "Secondary Damage": "2d6",
            "Secondary Damage Type": "Cold",
            "secondaryDamageCondition": "save"
        }))?;

        let out = convert_spell(&spell(fireball())?, Some(&data), &Dnd5eRules)?;
        let damage = out.save.map(|save| save.damage).unwrap_or_default();
        assert_eq!(damage.damage.as_deref(), Some("3d8"));
        assert_eq!(damage.secondary_damage.as_deref(), Some("2d6"));
        assert_eq!(damage.secondary_damage_type.as_deref(), Some("cold"));
        Ok(())
    }

    #[test]
    fn different_conditions_use_primary_names_in_their_own_object() -> anyhow::Result<()> {
        let data = supplemental(serde_json::json!({
            "Spell Attack": "Melee",
            "Damage": "3d8 + 2",
            "Damage Type": "Radiant",
            "primaryDamageCondition": "attack",
            "Secondary Damage": "1d6",
            "Secondary Damage Type": "Fire",
            "Secondary Add Casting Modifier": "Yes",
            "secondaryDamageCondition": "auto"
        }))?;

        let out = convert_spell(&spell(fireball())?, Some(&data), &Dnd5eRules)?;
        let attack = out.attack.unwrap_or_default();
        assert_eq!(attack.damage.damage.as_deref(), Some("3d8"));
        assert_eq!(attack.damage.damage_bonus.as_deref(), Some("2"));
        assert_eq!(
            out.damage,
            Some(DamageInfo {
                damage: Some("1d6".to_owned()),
                damage_type: Some("fire".to_owned()),
                casting_stat: Some(true),
                ..DamageInfo::default()
            })
        );
        Ok(())
    }

    #[test]
    fn effect_damage_is_ignored_and_missing_condition_is_fatal() -> anyhow::Result<()> {
        let effect = supplemental(serde_json::json!({"Damage": "1d4", "Damage Type": "Effect"}))?;
        let out = convert_spell(&spell(fireball())?, Some(&effect), &Dnd5eRules)?;
        assert_eq!(out.damage, None);

        let missing = supplemental(serde_json::json!({"Damage": "1d4", "Damage Type": "Acid"}))?;
        let err = convert_spell(&spell(fireball())?, Some(&missing), &Dnd5eRules).unwrap_err();
        assert_eq!(err.to_string(), "missing primaryDamageCondition for spell Fireball");
        Ok(())
    }

    #[test]
    fn healing_parses_dice_and_keeps_odd_text() -> anyhow::Result<()> {
        let data = supplemental(serde_json::json!({
            "Healing": "1d8",
            "Add Casting Modifier": "Yes",
            "Higher Spell Slot Dice": 1
        }))?;
        let out = convert_spell(&spell(fireball())?, Some(&data), &Dnd5eRules)?;
        assert_eq!(
            out.heal,
            Some(SpellHeal {
                heal: Some("1d8".to_owned()),
                casting_stat: Some(true),
                higher_level_dice: Some(1),
                ..SpellHeal::default()
            })
        );

        let data = supplemental(serde_json::json!({
            "Healing": "70",
            "Higher Level Healing": "10"
        }))?;
        let out = convert_spell(&spell(fireball())?, Some(&data), &Dnd5eRules)?;
        assert_eq!(
            out.heal,
            Some(SpellHeal {
                bonus: Some(70),
                higher_level_amount: Some(10),
                ..SpellHeal::default()
            })
        );

        let data = supplemental(serde_json::json!({"Healing": "all of them"}))?;
        let out = convert_spell(&spell(fireball())?, Some(&data), &Dnd5eRules)?;
        assert_eq!(
            out.heal.and_then(|heal| heal.heal).as_deref(),
            Some("all of them")
        );
        Ok(())
    }

    #[test]
    fn ritual_flag_only_when_set() -> anyhow::Result<()> {
        let mut value = fireball();
        value["meta"] = serde_json::json!({"ritual": true});
        let out = convert_spell(&spell(value)?, None, &Dnd5eRules)?;
        assert_eq!(out.ritual, Some(true));

        let out = convert_spell(&spell(fireball())?, None, &Dnd5eRules)?;
        assert_eq!(out.ritual, None);
        Ok(())
    }
}
