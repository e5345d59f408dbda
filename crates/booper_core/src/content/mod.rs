mod loader;
mod species;
mod types;
mod zones;

pub use loader::{
    load_content, load_content_from_str, ContentBundle, ContentLoadError, ResourceLoadError,
    SPECIES_FILE_NAME, ZONES_FILE_NAME,
};
pub use species::{
    depth_to_y, RarityTier, RenderKind, SpawnAmount, Species, SpeciesCatalog, SpeciesId,
    SpeciesRecord, SpeciesResource, SpawnRuleRecord, SupplementalSpawnRule, SURFACE_Y,
};
pub use types::{ContentErrorCode, ContentIssue, ContentResource};
pub use zones::{
    AxisRange, Bounds, BoundsRecord, Rgb, Zone, ZoneId, ZoneRecord, ZoneRegistry, ZoneResource,
};
