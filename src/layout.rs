//! Named screen regions and their scaling to the capture resolution.
//!
//! Each region keeps the resolution it was measured at, so a layout can mix
//! regions picked on different screens. `regions.json` looks like:
//!
//! ```json
//! {
//!   "resolution": [1920, 1080],
//!   "boxes": {
//!     "relic_name": {
//!       "name": "relic_name",
//!       "resolution": [1920, 1080],
//!       "position_start": [1400, 130],
//!       "position_end": [1650, 160]
//!     }
//!   }
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::errors::{ScanError, ScanResult};
use crate::ocr::Rect;

/// Reference resolution of the built-in layout.
pub const REFERENCE_RESOLUTION: (u32, u32) = (1920, 1080);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    /// Resolution the corner points were measured at
    pub resolution: (u32, u32),
    pub position_start: (i32, i32),
    pub position_end: (i32, i32),
}

impl Region {
    pub fn new(name: &str, start: (i32, i32), end: (i32, i32)) -> Self {
        Self {
            name: name.to_string(),
            resolution: REFERENCE_RESOLUTION,
            position_start: start,
            position_end: end,
        }
    }

    /// Corner points as a rectangle with ordered edges.
    pub fn rect(&self) -> Rect {
        let (x1, y1) = self.position_start;
        let (x2, y2) = self.position_end;
        Rect::new(x1.min(x2), x1.max(x2), y1.min(y2), y1.max(y2))
    }
}

fn scale(coord: i32, target: u32, source: u32) -> i32 {
    // Unscaled when the source resolution is unknown
    if source == 0 {
        return coord;
    }
    (coord as f64 * (target as f64 / source as f64)) as i32
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionLayout {
    /// Resolution regions are scaled to
    pub resolution: (u32, u32),
    #[serde(rename = "boxes", default)]
    pub regions: BTreeMap<String, Region>,
}

impl Default for RegionLayout {
    fn default() -> Self {
        Self::default_relic_layout()
    }
}

impl RegionLayout {
    pub fn new(resolution: (u32, u32)) -> Self {
        Self {
            resolution,
            regions: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, region: Region) {
        self.regions.insert(region.name.clone(), region);
    }

    pub fn get(&self, name: &str) -> Option<&Region> {
        self.regions.get(name)
    }

    /// A copy of this layout targeting another resolution.
    pub fn with_resolution(&self, width: u32, height: u32) -> Self {
        Self {
            resolution: (width, height),
            regions: self.regions.clone(),
        }
    }

    /// The named region in pixels of the layout's resolution.
    pub fn scaled(&self, name: &str) -> ScanResult<Rect> {
        let region = self
            .regions
            .get(name)
            .ok_or_else(|| ScanError::UnknownRegion(name.to_string()))?;

        let rect = region.rect();
        let (tw, th) = self.resolution;
        let (sw, sh) = region.resolution;
        Ok(Rect::new(
            scale(rect.x_min, tw, sw),
            scale(rect.x_max, tw, sw),
            scale(rect.y_min, th, sh),
            scale(rect.y_max, th, sh),
        ))
    }

    /// Relic detail panel regions at 1920x1080.
    pub fn default_relic_layout() -> Self {
        let mut layout = Self::new(REFERENCE_RESOLUTION);

        layout.add(Region::new("relic_name", (1400, 130), (1650, 160)));
        layout.add(Region::new("relic_location", (1410, 280), (1500, 310)));
        layout.add(Region::new("relic_level", (1410, 311), (1500, 345)));
        layout.add(Region::new("relic_main_name", (1440, 395), (1700, 433)));
        layout.add(Region::new("relic_main_value", (1701, 395), (1842, 433)));

        let sub_rows = [(439, 477), (478, 515), (516, 553), (554, 591)];
        for (i, (top, bottom)) in sub_rows.into_iter().enumerate() {
            let n = i + 1;
            layout.add(Region::new(&format!("relic_sub{}_name", n), (1440, top), (1700, bottom)));
            layout.add(Region::new(&format!("relic_sub{}_value", n), (1701, top), (1842, bottom)));
        }

        layout.add(Region::new("backpack_type", (100, 65), (210, 95)));
        layout.add(Region::new("relic_area", (127, 200), (1250, 940)));

        layout
    }

    pub fn load_from_json(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read region layout: {}", path.display()))?;
        let layout: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse region layout: {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            regions = layout.regions.len(),
            width = layout.resolution.0,
            height = layout.resolution.1,
            "region layout loaded"
        );
        Ok(layout)
    }

    pub fn save_to_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize region layout")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write region layout: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_rect_orders_corners() {
        let region = Region::new("r", (50, 40), (10, 80));
        assert_eq!(region.rect(), Rect::new(10, 50, 40, 80));
    }

    #[test]
    fn test_scaled_same_resolution() {
        let layout = RegionLayout::default_relic_layout();
        assert_eq!(layout.scaled("relic_name").unwrap(), Rect::new(1400, 1650, 130, 160));
        assert_eq!(layout.scaled("relic_sub4_value").unwrap(), Rect::new(1701, 1842, 554, 591));
    }

    #[test]
    fn test_scaled_to_smaller_resolution() {
        let layout = RegionLayout::default_relic_layout().with_resolution(1280, 720);
        // 1400 * 2/3 = 933.3, 130 * 2/3 = 86.7; truncated
        assert_eq!(layout.scaled("relic_name").unwrap(), Rect::new(933, 1100, 86, 106));
    }

    #[test]
    fn test_scaled_unknown_region() {
        let layout = RegionLayout::default_relic_layout();
        let err = layout.scaled("relic_sub5_name").unwrap_err();
        assert!(matches!(err, ScanError::UnknownRegion(name) if name == "relic_sub5_name"));
    }

    #[test]
    fn test_default_layout_has_all_regions() {
        let layout = RegionLayout::default_relic_layout();
        assert_eq!(layout.regions.len(), 15);
        assert!(layout.get("backpack_type").is_some());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("regions.json");

        let layout = RegionLayout::default_relic_layout().with_resolution(2560, 1440);
        layout.save_to_json(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"boxes\""));
        assert!(content.contains("\"position_start\""));

        let loaded = RegionLayout::load_from_json(&path).unwrap();
        assert_eq!(loaded, layout);
        assert_eq!(loaded.scaled("relic_area").unwrap(), Rect::new(169, 1666, 266, 1253));
    }
}
