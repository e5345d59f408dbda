use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{error, info, warn};

use super::species::{SpeciesCatalog, SpeciesDocument};
use super::types::{ContentIssue, ContentResource};
use super::zones::{ZoneDocument, ZoneRegistry};

pub const ZONES_FILE_NAME: &str = "habitats.json";
pub const SPECIES_FILE_NAME: &str = "creatures.json";

#[derive(Debug, Error)]
pub enum ResourceLoadError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {origin} at {field_path}: {source}")]
    Parse {
        origin: String,
        field_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Invalid(#[from] ContentIssue),
}

#[derive(Debug, Error)]
pub enum ContentLoadError {
    #[error("no content could be loaded (zones: {zones}; species: {species})")]
    NothingLoaded {
        zones: ResourceLoadError,
        species: ResourceLoadError,
    },
}

/// Everything the simulation needs from static configuration, plus the
/// non-fatal issues found while validating it.
#[derive(Debug, Clone, Default)]
pub struct ContentBundle {
    pub zones: ZoneRegistry,
    pub species: SpeciesCatalog,
    pub issues: Vec<ContentIssue>,
    pub failed_resources: Vec<ContentResource>,
}

pub fn load_content(assets_dir: &Path) -> Result<ContentBundle, ContentLoadError> {
    let zones_path = assets_dir.join(ZONES_FILE_NAME);
    let species_path = assets_dir.join(SPECIES_FILE_NAME);
    let zones = read_resource(&zones_path).and_then(|raw| {
        zone_registry_from_json(&raw, &zones_path.display().to_string())
    });
    let species = read_resource(&species_path).and_then(|raw| {
        species_catalog_from_json(&raw, &species_path.display().to_string())
    });
    assemble_bundle(zones, species)
}

/// Same as [`load_content`] for hosts that embed both resources.
pub fn load_content_from_str(
    zones_json: &str,
    species_json: &str,
) -> Result<ContentBundle, ContentLoadError> {
    let zones = zone_registry_from_json(zones_json, ZONES_FILE_NAME);
    let species = species_catalog_from_json(species_json, SPECIES_FILE_NAME);
    assemble_bundle(zones, species)
}

fn assemble_bundle(
    zones: Result<(ZoneRegistry, Vec<ContentIssue>), ResourceLoadError>,
    species: Result<(SpeciesCatalog, Vec<ContentIssue>), ResourceLoadError>,
) -> Result<ContentBundle, ContentLoadError> {
    let mut bundle = ContentBundle::default();
    match (zones, species) {
        (Err(zones), Err(species)) => {
            return Err(ContentLoadError::NothingLoaded { zones, species });
        }
        (zones, species) => {
            match zones {
                Ok((registry, issues)) => {
                    bundle.zones = registry;
                    bundle.issues.extend(issues);
                }
                Err(error) => {
                    error!(error = %error, "zone_resource_unavailable");
                    bundle.failed_resources.push(ContentResource::Zones);
                }
            }
            match species {
                Ok((catalog, issues)) => {
                    bundle.species = catalog;
                    bundle.issues.extend(issues);
                }
                Err(error) => {
                    error!(error = %error, "species_resource_unavailable");
                    bundle.failed_resources.push(ContentResource::Species);
                }
            }
        }
    }

    if !bundle.zones.is_empty() {
        for issue in bundle.species.dangling_zone_references(&bundle.zones) {
            warn!(issue = %issue, "species_zone_reference_dangling");
            bundle.issues.push(issue);
        }
    }

    info!(
        zone_count = bundle.zones.len(),
        species_count = bundle.species.len(),
        issue_count = bundle.issues.len(),
        failed_resources = bundle.failed_resources.len(),
        "content_loaded"
    );
    Ok(bundle)
}

fn read_resource(path: &Path) -> Result<String, ResourceLoadError> {
    fs::read_to_string(path).map_err(|source| ResourceLoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn zone_registry_from_json(
    raw: &str,
    origin: &str,
) -> Result<(ZoneRegistry, Vec<ContentIssue>), ResourceLoadError> {
    let document = parse_json::<ZoneDocument>(raw, origin)?;
    Ok(ZoneRegistry::from_document(document)?)
}

fn species_catalog_from_json(
    raw: &str,
    origin: &str,
) -> Result<(SpeciesCatalog, Vec<ContentIssue>), ResourceLoadError> {
    let document = parse_json::<SpeciesDocument>(raw, origin)?;
    Ok(SpeciesCatalog::from_document(document))
}

fn parse_json<T: DeserializeOwned>(
    raw: &str,
    origin: &str,
) -> Result<T, ResourceLoadError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, T>(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        ResourceLoadError::Parse {
            origin: origin.to_string(),
            field_path: if path.is_empty() { ".".to_string() } else { path },
            source: error.into_inner(),
        }
    })
}
