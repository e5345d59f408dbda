use std::collections::HashMap;

use rand::Rng;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::types::{decode_record, ContentErrorCode, ContentIssue, ContentResource};
use super::zones::{AxisRange, ZoneRegistry};

/// Vertical coordinate of the water surface. Depth grows downward from here.
pub const SURFACE_Y: f32 = 75.0;

pub fn depth_to_y(depth_m: f32) -> f32 {
    SURFACE_Y - depth_m
}

const DEFAULT_SPEED_MPS: f32 = 1.0;
const DEFAULT_AVG_LENGTH_M: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpeciesId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RarityTier {
    Common,
    Uncommon,
    Rare,
    VeryRare,
}

impl RarityTier {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "common" => Some(Self::Common),
            "uncommon" => Some(Self::Uncommon),
            "rare" => Some(Self::Rare),
            "very_rare" | "legendary" => Some(Self::VeryRare),
            _ => None,
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Uncommon => "uncommon",
            Self::Rare => "rare",
            Self::VeryRare => "very_rare",
        }
    }

    /// Primary instance count for one species of this tier.
    pub fn sample_spawn_count<R: Rng + ?Sized>(self, rng: &mut R) -> u32 {
        match self {
            Self::Common => rng.gen_range(4..=6),
            Self::Uncommon => rng.gen_range(3..=4),
            Self::Rare => 1,
            Self::VeryRare => u32::from(rng.gen_bool(0.5)),
        }
    }
}

/// How the presentation layer should draw a species. The core carries the
/// tag and never branches on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RenderKind {
    Model,
    Mesh,
    Particle,
    #[default]
    Sprite,
}

impl RenderKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "model" => Some(Self::Model),
            "mesh" => Some(Self::Mesh),
            "particle" => Some(Self::Particle),
            "sprite" => Some(Self::Sprite),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpawnAmount {
    Fixed(u32),
    Chance(f64),
    Range { min: u32, max: u32 },
}

impl SpawnAmount {
    pub fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> u32 {
        match self {
            Self::Fixed(count) => count,
            Self::Chance(probability) => u32::from(rng.gen_bool(probability)),
            Self::Range { min, max } => rng.gen_range(min..=max),
        }
    }
}

/// Extra instances of a species placed outside its home habitat.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplementalSpawnRule {
    pub target_zone: String,
    pub amount: SpawnAmount,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Species {
    pub id: SpeciesId,
    pub key: String,
    pub common_name: String,
    pub scientific_name: String,
    pub habitat: String,
    pub rarity: RarityTier,
    pub speed_mps: f32,
    pub avg_length_m: f32,
    pub min_depth_m: f32,
    pub max_depth_m: f32,
    pub render: RenderKind,
    pub fun_fact: Option<String>,
    pub supplemental_spawns: Vec<SupplementalSpawnRule>,
}

impl Species {
    /// Preferred vertical band, converted from the species' depth range.
    pub fn preferred_y_band(&self) -> AxisRange {
        AxisRange::new(depth_to_y(self.max_depth_m), depth_to_y(self.min_depth_m))
    }
}

/// Already-typed species records, for hosts that build content in code.
#[derive(Debug, Clone)]
pub struct SpeciesResource {
    pub creatures: Vec<SpeciesRecord>,
}

/// `creatures.json` as read from disk. Each record, and each of its spawn
/// rules, is decoded separately.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SpeciesDocument {
    creatures: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SpeciesRecord {
    pub id: Option<String>,
    pub common_name: Option<String>,
    pub scientific_name: Option<String>,
    pub habitat: Option<String>,
    pub rarity: Option<String>,
    pub speed_mps: Option<f32>,
    pub avg_length_m: Option<f32>,
    pub min_depth_m: Option<f32>,
    pub max_depth_m: Option<f32>,
    pub render: Option<String>,
    pub fun_fact: Option<String>,
    pub supplemental_spawns: Vec<SpawnRuleRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SpawnRuleRecord {
    pub zone: Option<String>,
    pub count: Option<u32>,
    pub chance: Option<f64>,
    pub min: Option<u32>,
    pub max: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct SpeciesCatalog {
    species: Vec<Species>,
    ids_by_key: HashMap<String, SpeciesId>,
}

impl SpeciesCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_resource(resource: SpeciesResource) -> (SpeciesCatalog, Vec<ContentIssue>) {
        let mut issues = Vec::new();
        let records = resource.creatures.into_iter().map(Ok).collect::<Vec<_>>();
        let catalog = Self::build(records, &mut issues);
        (catalog, issues)
    }

    pub(crate) fn from_document(document: SpeciesDocument) -> (SpeciesCatalog, Vec<ContentIssue>) {
        let mut issues = Vec::new();
        let records = document
            .creatures
            .into_iter()
            .enumerate()
            .map(|(index, value)| decode_species_value(index, value, &mut issues))
            .collect::<Vec<_>>();
        let catalog = Self::build(records, &mut issues);
        (catalog, issues)
    }

    fn build(
        records: Vec<Result<SpeciesRecord, ContentIssue>>,
        issues: &mut Vec<ContentIssue>,
    ) -> SpeciesCatalog {
        let mut species = Vec::<Species>::with_capacity(records.len());
        let mut ids_by_key = HashMap::with_capacity(records.len());

        for (index, record) in records.into_iter().enumerate() {
            let validated =
                record.and_then(|record| validate_species_record(index, record, issues));
            let mut def = match validated {
                Ok(def) => def,
                Err(issue) => {
                    issues.push(issue);
                    continue;
                }
            };
            if ids_by_key.contains_key(&def.key) {
                issues.push(species_issue(
                    ContentErrorCode::DuplicateId,
                    index,
                    Some(&def.key),
                    "species key already registered; first definition wins",
                ));
                continue;
            }
            let id = SpeciesId(species.len() as u32);
            def.id = id;
            ids_by_key.insert(def.key.clone(), id);
            species.push(def);
        }

        for issue in issues.iter() {
            warn!(issue = %issue, "species_record_issue");
        }

        SpeciesCatalog {
            species,
            ids_by_key,
        }
    }

    /// Habitat and spawn-rule zones that the registry does not know. Spawning
    /// skips these; this only surfaces them at load time.
    pub fn dangling_zone_references(&self, zones: &ZoneRegistry) -> Vec<ContentIssue> {
        let mut issues = Vec::new();
        for def in &self.species {
            if zones.zone_by_key(&def.habitat).is_none() {
                issues.push(ContentIssue::new(
                    ContentErrorCode::DanglingZoneReference,
                    ContentResource::Species,
                    Some(def.id.0 as usize),
                    Some(&def.key),
                    format!("habitat '{}' is not a loaded zone", def.habitat),
                ));
            }
            for rule in &def.supplemental_spawns {
                if zones.zone_by_key(&rule.target_zone).is_none() {
                    issues.push(ContentIssue::new(
                        ContentErrorCode::DanglingZoneReference,
                        ContentResource::Species,
                        Some(def.id.0 as usize),
                        Some(&def.key),
                        format!(
                            "supplemental spawn zone '{}' is not a loaded zone",
                            rule.target_zone
                        ),
                    ));
                }
            }
        }
        issues
    }

    pub fn species(&self, id: SpeciesId) -> Option<&Species> {
        self.species.get(id.0 as usize)
    }

    pub fn species_by_key(&self, key: &str) -> Option<&Species> {
        self.ids_by_key
            .get(key)
            .and_then(|id| self.species(*id))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.ids_by_key.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Species> {
        self.species.iter()
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }
}

/// Spawn rules are split off first so a bad rule drops only itself.
fn decode_species_value(
    index: usize,
    mut value: Value,
    issues: &mut Vec<ContentIssue>,
) -> Result<SpeciesRecord, ContentIssue> {
    let raw_rules = match value.as_object_mut() {
        Some(object) => object.remove("supplemental_spawns"),
        None => None,
    };
    let record_id = value.get("id").and_then(Value::as_str).map(str::to_string);
    let prefix = format!("creatures[{index}]");
    let mut record = decode_record::<SpeciesRecord>(value, ContentResource::Species, index, &prefix)?;

    let raw_rules = match raw_rules {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(rules)) => rules,
        Some(_) => {
            issues.push(species_issue(
                ContentErrorCode::InvalidValue,
                index,
                record_id.as_deref(),
                format!("{prefix}.supplemental_spawns: expected an array"),
            ));
            Vec::new()
        }
    };
    for (rule_index, raw_rule) in raw_rules.into_iter().enumerate() {
        let rule_prefix = format!("{prefix}.supplemental_spawns[{rule_index}]");
        match decode_record::<SpawnRuleRecord>(
            raw_rule,
            ContentResource::Species,
            index,
            &rule_prefix,
        ) {
            Ok(rule) => record.supplemental_spawns.push(rule),
            Err(mut issue) => {
                issue.record_id = record_id.clone();
                issues.push(issue);
            }
        }
    }
    Ok(record)
}

fn validate_species_record(
    index: usize,
    record: SpeciesRecord,
    issues: &mut Vec<ContentIssue>,
) -> Result<Species, ContentIssue> {
    let common_name = record
        .common_name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| {
            species_issue(
                ContentErrorCode::MissingField,
                index,
                record.id.as_deref(),
                "missing common_name",
            )
        })?;
    let id = record.id.filter(|id| !id.trim().is_empty());
    let key = id.clone().unwrap_or_else(|| common_name.clone());
    let missing = |field: &str| {
        species_issue(
            ContentErrorCode::MissingField,
            index,
            Some(&key),
            format!("missing {field}"),
        )
    };
    let invalid = |message: String| {
        species_issue(ContentErrorCode::InvalidValue, index, Some(&key), message)
    };

    let habitat = record.habitat.ok_or_else(|| missing("habitat"))?;
    let raw_rarity = record.rarity.ok_or_else(|| missing("rarity"))?;
    let rarity = RarityTier::from_token(&raw_rarity)
        .ok_or_else(|| invalid(format!("unknown rarity '{raw_rarity}'")))?;
    let min_depth_m = record.min_depth_m.ok_or_else(|| missing("min_depth_m"))?;
    let max_depth_m = record.max_depth_m.ok_or_else(|| missing("max_depth_m"))?;
    if !min_depth_m.is_finite() || !max_depth_m.is_finite() || min_depth_m < 0.0 {
        return Err(invalid(
            "depth range must be finite and start at or below the surface".to_string(),
        ));
    }
    if min_depth_m > max_depth_m {
        return Err(species_issue(
            ContentErrorCode::InvertedBounds,
            index,
            Some(&key),
            format!("min_depth_m {min_depth_m} > max_depth_m {max_depth_m}"),
        ));
    }

    let speed_mps = record.speed_mps.unwrap_or(DEFAULT_SPEED_MPS);
    if !speed_mps.is_finite() || speed_mps < 0.0 {
        return Err(invalid("speed_mps must be finite and >= 0".to_string()));
    }
    let avg_length_m = record.avg_length_m.unwrap_or(DEFAULT_AVG_LENGTH_M);
    if !avg_length_m.is_finite() || avg_length_m <= 0.0 {
        return Err(invalid("avg_length_m must be finite and > 0".to_string()));
    }
    let render = match record.render.as_deref() {
        None => RenderKind::default(),
        Some(token) => RenderKind::from_token(token)
            .ok_or_else(|| invalid(format!("unknown render kind '{token}'")))?,
    };

    let mut supplemental_spawns = Vec::with_capacity(record.supplemental_spawns.len());
    for rule in record.supplemental_spawns {
        match validate_spawn_rule(index, &key, &habitat, rule) {
            Ok(rule) => supplemental_spawns.push(rule),
            Err(issue) => issues.push(issue),
        }
    }

    Ok(Species {
        id: SpeciesId(0),
        key,
        common_name,
        scientific_name: record.scientific_name.unwrap_or_default(),
        habitat,
        rarity,
        speed_mps,
        avg_length_m,
        min_depth_m,
        max_depth_m,
        render,
        fun_fact: record.fun_fact,
        supplemental_spawns,
    })
}

fn validate_spawn_rule(
    index: usize,
    key: &str,
    habitat: &str,
    rule: SpawnRuleRecord,
) -> Result<SupplementalSpawnRule, ContentIssue> {
    let invalid =
        |message: String| species_issue(ContentErrorCode::InvalidValue, index, Some(key), message);
    let target_zone = rule.zone.ok_or_else(|| {
        species_issue(
            ContentErrorCode::MissingField,
            index,
            Some(key),
            "supplemental spawn rule is missing zone",
        )
    })?;
    if target_zone == habitat {
        return Err(invalid(format!(
            "supplemental spawn zone '{target_zone}' must differ from the home habitat"
        )));
    }

    let amount = match (rule.count, rule.chance, rule.min, rule.max) {
        (Some(count), None, None, None) => SpawnAmount::Fixed(count),
        (None, Some(chance), None, None) if (0.0..=1.0).contains(&chance) => {
            SpawnAmount::Chance(chance)
        }
        (None, Some(chance), None, None) => {
            return Err(invalid(format!(
                "supplemental spawn chance {chance} is outside [0, 1]"
            )))
        }
        (None, None, Some(min), Some(max)) if min <= max => SpawnAmount::Range { min, max },
        (None, None, Some(min), Some(max)) => {
            return Err(species_issue(
                ContentErrorCode::InvertedBounds,
                index,
                Some(key),
                format!("supplemental spawn range min {min} > max {max}"),
            ))
        }
        _ => {
            return Err(invalid(format!(
                "supplemental spawn rule for '{target_zone}' needs exactly one of count, chance, or min+max"
            )))
        }
    };

    Ok(SupplementalSpawnRule {
        target_zone,
        amount,
    })
}

fn species_issue(
    code: ContentErrorCode,
    index: usize,
    key: Option<&str>,
    message: impl Into<String>,
) -> ContentIssue {
    ContentIssue::new(code, ContentResource::Species, Some(index), key, message)
}
