use std::collections::HashMap;

use rand::Rng;
use serde::Deserialize;
use tracing::warn;

use crate::math::Vec3;

use super::types::{decode_record, ContentErrorCode, ContentIssue, ContentResource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneId(pub u32);

/// Closed interval `[min, max]` on one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    pub min: f32,
    pub max: f32,
}

impl AxisRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.max(self.min).min(self.max)
    }

    pub fn intersect(&self, other: &AxisRange) -> Option<AxisRange> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        (min <= max).then_some(AxisRange { min, max })
    }

    /// Uniform sample; a degenerate range yields its single value.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        self.min + rng.gen::<f32>() * (self.max - self.min)
    }

    pub fn center(&self) -> f32 {
        (self.min + self.max) * 0.5
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: AxisRange,
    pub y: AxisRange,
    pub z: AxisRange,
}

impl Bounds {
    pub fn contains(&self, point: Vec3) -> bool {
        self.x.contains(point.x) && self.y.contains(point.y) && self.z.contains(point.z)
    }

    pub fn clamp(&self, point: Vec3) -> Vec3 {
        Vec3::new(
            self.x.clamp(point.x),
            self.y.clamp(point.y),
            self.z.clamp(point.z),
        )
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        let x = self.x.sample(rng);
        let z = self.z.sample(rng);
        let y = self.y.sample(rng);
        Vec3::new(x, y, z)
    }

    /// Narrows the vertical axis to `band`. When the band misses the zone
    /// entirely the zone's own vertical range is kept.
    pub fn with_y_band(&self, band: AxisRange) -> Bounds {
        Bounds {
            y: self.y.intersect(&band).unwrap_or(self.y),
            ..*self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn parse_hex(raw: &str) -> Option<Rgb> {
        let hex = raw.strip_prefix('#').unwrap_or(raw);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        Some(Rgb {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub id: ZoneId,
    pub key: String,
    pub label: String,
    pub bounds: Bounds,
    pub fog_color: Rgb,
    pub ambient_color: Rgb,
    pub typical_depth_range: Option<AxisRange>,
}

/// Already-typed zone records, for hosts that build content in code.
#[derive(Debug, Clone)]
pub struct ZoneResource {
    pub default_zone: String,
    pub habitats: Vec<ZoneRecord>,
}

/// `habitats.json` as read from disk. Records stay untyped until each one is
/// decoded on its own.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ZoneDocument {
    default_zone: String,
    habitats: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ZoneRecord {
    pub id: Option<String>,
    pub label: Option<String>,
    pub bounds: Option<BoundsRecord>,
    pub fog_color: Option<String>,
    pub ambient_color: Option<String>,
    pub typical_depth_range: Option<[f32; 2]>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BoundsRecord {
    pub x: [f32; 2],
    pub y: [f32; 2],
    pub z: [f32; 2],
}

#[derive(Debug, Clone, Default)]
pub struct ZoneRegistry {
    zones: Vec<Zone>,
    ids_by_key: HashMap<String, ZoneId>,
    default_zone: Option<ZoneId>,
}

impl ZoneRegistry {
    /// Registry with no zones; every containment query misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validates every record, dropping malformed ones. Fails only when the
    /// configured default zone is not among the surviving zones.
    pub fn from_resource(
        resource: ZoneResource,
    ) -> Result<(ZoneRegistry, Vec<ContentIssue>), ContentIssue> {
        Self::build(resource.default_zone, resource.habitats.into_iter().map(Ok))
    }

    pub(crate) fn from_document(
        document: ZoneDocument,
    ) -> Result<(ZoneRegistry, Vec<ContentIssue>), ContentIssue> {
        let records = document
            .habitats
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                decode_record::<ZoneRecord>(
                    value,
                    ContentResource::Zones,
                    index,
                    &format!("habitats[{index}]"),
                )
            });
        Self::build(document.default_zone, records)
    }

    fn build(
        default_zone_key: String,
        records: impl Iterator<Item = Result<ZoneRecord, ContentIssue>>,
    ) -> Result<(ZoneRegistry, Vec<ContentIssue>), ContentIssue> {
        let mut issues = Vec::new();
        let mut zones = Vec::<Zone>::new();
        let mut ids_by_key = HashMap::new();

        for (index, record) in records.enumerate() {
            match record.and_then(|record| validate_zone_record(index, record)) {
                Ok(mut zone) => {
                    if ids_by_key.contains_key(&zone.key) {
                        issues.push(ContentIssue::new(
                            ContentErrorCode::DuplicateId,
                            ContentResource::Zones,
                            Some(index),
                            Some(&zone.key),
                            "zone id already registered; first definition wins",
                        ));
                        continue;
                    }
                    let id = ZoneId(zones.len() as u32);
                    zone.id = id;
                    ids_by_key.insert(zone.key.clone(), id);
                    zones.push(zone);
                }
                Err(issue) => issues.push(issue),
            }
        }

        for issue in &issues {
            warn!(issue = %issue, "zone_record_dropped");
        }

        let Some(default_zone) = ids_by_key.get(&default_zone_key).copied() else {
            return Err(ContentIssue::new(
                ContentErrorCode::UnknownDefaultZone,
                ContentResource::Zones,
                None,
                Some(&default_zone_key),
                "default zone id does not match any loaded zone",
            ));
        };

        Ok((
            ZoneRegistry {
                zones,
                ids_by_key,
                default_zone: Some(default_zone),
            },
            issues,
        ))
    }

    /// First zone in registration order containing `point`, else the default
    /// zone. `None` only for an empty registry.
    pub fn zone_containing(&self, point: Vec3) -> Option<&Zone> {
        self.zones
            .iter()
            .find(|zone| zone.bounds.contains(point))
            .or_else(|| self.default_zone())
    }

    pub fn zone(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.get(id.0 as usize)
    }

    pub fn zone_id_by_key(&self, key: &str) -> Option<ZoneId> {
        self.ids_by_key.get(key).copied()
    }

    pub fn zone_by_key(&self, key: &str) -> Option<&Zone> {
        self.zone_id_by_key(key).and_then(|id| self.zone(id))
    }

    pub fn default_zone(&self) -> Option<&Zone> {
        self.default_zone.and_then(|id| self.zone(id))
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

fn validate_zone_record(index: usize, record: ZoneRecord) -> Result<Zone, ContentIssue> {
    let key = record
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| zone_issue(ContentErrorCode::MissingField, index, None, "missing id"))?;
    let missing = |field: &str| {
        zone_issue(
            ContentErrorCode::MissingField,
            index,
            Some(&key),
            format!("missing {field}"),
        )
    };

    let label = record.label.ok_or_else(|| missing("label"))?;
    let raw_bounds = record.bounds.ok_or_else(|| missing("bounds"))?;
    let raw_fog = record.fog_color.ok_or_else(|| missing("fog_color"))?;
    let raw_ambient = record.ambient_color.ok_or_else(|| missing("ambient_color"))?;

    let bounds = Bounds {
        x: validate_axis(index, &key, "bounds.x", raw_bounds.x)?,
        y: validate_axis(index, &key, "bounds.y", raw_bounds.y)?,
        z: validate_axis(index, &key, "bounds.z", raw_bounds.z)?,
    };
    let fog_color = parse_color(index, &key, "fog_color", &raw_fog)?;
    let ambient_color = parse_color(index, &key, "ambient_color", &raw_ambient)?;
    let typical_depth_range = record
        .typical_depth_range
        .map(|range| validate_axis(index, &key, "typical_depth_range", range))
        .transpose()?;

    Ok(Zone {
        id: ZoneId(0),
        key,
        label,
        bounds,
        fog_color,
        ambient_color,
        typical_depth_range,
    })
}

fn validate_axis(
    index: usize,
    key: &str,
    field: &str,
    [min, max]: [f32; 2],
) -> Result<AxisRange, ContentIssue> {
    if !min.is_finite() || !max.is_finite() {
        return Err(zone_issue(
            ContentErrorCode::InvalidValue,
            index,
            Some(key),
            format!("{field} must be finite"),
        ));
    }
    if min > max {
        return Err(zone_issue(
            ContentErrorCode::InvertedBounds,
            index,
            Some(key),
            format!("{field} min {min} > max {max}"),
        ));
    }
    Ok(AxisRange { min, max })
}

fn parse_color(index: usize, key: &str, field: &str, raw: &str) -> Result<Rgb, ContentIssue> {
    Rgb::parse_hex(raw).ok_or_else(|| {
        zone_issue(
            ContentErrorCode::InvalidValue,
            index,
            Some(key),
            format!("{field} '{raw}' is not a #rrggbb color"),
        )
    })
}

fn zone_issue(
    code: ContentErrorCode,
    index: usize,
    key: Option<&str>,
    message: impl Into<String>,
) -> ContentIssue {
    ContentIssue::new(code, ContentResource::Zones, Some(index), key, message)
}
