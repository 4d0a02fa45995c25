//! Reading relic fields out of screen regions.
//!
//! A [`RegionReader`] yields the text shown in one named region. Two readers
//! are provided: [`LineReader`] looks regions up in a full-screen detection
//! set, [`RecognizerReader`] crops each region from a screenshot and hands it
//! to an external single-row recognizer.

use anyhow::{Context, Result};
use image::RgbaImage;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::errors::{ScanError, ScanResult};
use crate::layout::RegionLayout;
use crate::ocr::{BoxQuery, MergedLine, TextBox, TextMerger, TextRecognizer, Tolerance, crop_rect, load_detections};
use crate::relic::{BuiltRelic, ExportedRelic, RawRelic, RelicBuilder, SubStatsInput};

pub const REGION_NAME: &str = "relic_name";
pub const REGION_LOCATION: &str = "relic_location";
pub const REGION_LEVEL: &str = "relic_level";
pub const REGION_MAIN_NAME: &str = "relic_main_name";
pub const REGION_MAIN_VALUE: &str = "relic_main_value";
pub const SUB_STAT_ROWS: usize = 4;

fn sub_name_region(row: usize) -> String {
    format!("relic_sub{}_name", row)
}

fn sub_value_region(row: usize) -> String {
    format!("relic_sub{}_value", row)
}

pub trait RegionReader {
    /// Text shown in the named region, trimmed. Empty when nothing was read.
    fn read_region(&self, name: &str) -> ScanResult<String>;
}

/// Reads regions from merged lines of a full-screen detection set.
pub struct LineReader<'a> {
    lines: Vec<MergedLine>,
    layout: &'a RegionLayout,
    merger: TextMerger,
    tolerance: Tolerance,
}

impl<'a> LineReader<'a> {
    /// Merges `fragments` once; every region lookup then filters the merged lines.
    pub fn new(fragments: Vec<TextBox>, layout: &'a RegionLayout, merger: TextMerger, tolerance: Tolerance) -> Self {
        Self {
            lines: merger.merge(fragments),
            layout,
            merger,
            tolerance,
        }
    }

    pub fn lines(&self) -> &[MergedLine] {
        &self.lines
    }
}

impl RegionReader for LineReader<'_> {
    fn read_region(&self, name: &str) -> ScanResult<String> {
        let rect = self.layout.scaled(name)?;
        let found = self
            .merger
            .find_with_box(&self.lines, &rect, self.tolerance, BoxQuery::Contain);
        let text: String = found.iter().map(|line| line.raw_text.as_str()).collect();
        Ok(text.trim().to_string())
    }
}

/// Reads regions by cropping a screenshot and running a recognizer per row.
pub struct RecognizerReader<'a, R: TextRecognizer> {
    image: &'a RgbaImage,
    layout: &'a RegionLayout,
    recognizer: &'a R,
}

impl<'a, R: TextRecognizer> RecognizerReader<'a, R> {
    pub fn new(image: &'a RgbaImage, layout: &'a RegionLayout, recognizer: &'a R) -> Self {
        Self {
            image,
            layout,
            recognizer,
        }
    }
}

impl<R: TextRecognizer> RegionReader for RecognizerReader<'_, R> {
    fn read_region(&self, name: &str) -> ScanResult<String> {
        let rect = self.layout.scaled(name)?;
        let crop = crop_rect(self.image, &rect);
        let text = self
            .recognizer
            .recognize_line(&crop)
            .map_err(|e| ScanError::Recognition {
                region: name.to_string(),
                message: format!("{:#}", e),
            })?;
        tracing::debug!(region = name, text = %text.trim(), "region recognized");
        Ok(text.trim().to_string())
    }
}

/// Reads every relic field shown on the detail panel.
///
/// The fourth sub stat row is often empty; its name is only read when a
/// value was found. Rows missing a name or a value are dropped. The set is
/// left for the builder to infer.
pub fn read_raw_relic(reader: &impl RegionReader) -> ScanResult<RawRelic> {
    let name = reader.read_region(REGION_NAME)?;
    let location = reader.read_region(REGION_LOCATION)?;
    let level = reader.read_region(REGION_LEVEL)?;
    let main_name = reader.read_region(REGION_MAIN_NAME)?;
    let main_value = reader.read_region(REGION_MAIN_VALUE)?;

    let mut subs = Vec::with_capacity(SUB_STAT_ROWS);
    for row in 1..SUB_STAT_ROWS {
        let sub_name = reader.read_region(&sub_name_region(row))?;
        let sub_value = reader.read_region(&sub_value_region(row))?;
        subs.push((sub_name, sub_value));
    }

    let last_value = reader.read_region(&sub_value_region(SUB_STAT_ROWS))?;
    let last_name = if last_value.is_empty() {
        String::new()
    } else {
        reader.read_region(&sub_name_region(SUB_STAT_ROWS))?
    };
    subs.push((last_name, last_value));

    subs.retain(|(n, v)| !n.is_empty() && !v.is_empty());

    Ok(RawRelic {
        name,
        location,
        level,
        main: vec![(main_name, main_value)],
        sub: SubStatsInput::OrderedPairs(subs),
        from_set: None,
    })
}

/// Reads and builds one relic.
pub fn scan_relic(reader: &impl RegionReader, builder: &RelicBuilder) -> ScanResult<BuiltRelic> {
    let raw = read_raw_relic(reader)?;
    tracing::debug!(?raw, "raw relic read");
    Ok(builder.build(&raw)?)
}

/// Result of scanning one detection dump.
#[derive(Debug)]
pub struct DumpOutcome {
    pub path: PathBuf,
    pub result: Result<BuiltRelic>,
}

/// Scans detection dumps with one layout and vocabulary.
pub struct DumpScanner<'a> {
    layout: &'a RegionLayout,
    builder: RelicBuilder<'a>,
    merger: TextMerger,
    tolerance: Tolerance,
}

impl<'a> DumpScanner<'a> {
    pub fn new(layout: &'a RegionLayout, builder: RelicBuilder<'a>, merger: TextMerger, tolerance: Tolerance) -> Self {
        Self {
            layout,
            builder,
            merger,
            tolerance,
        }
    }

    pub fn scan_dump(&self, path: &Path) -> Result<BuiltRelic> {
        let fragments = load_detections(path)?;
        let reader = LineReader::new(fragments, self.layout, self.merger, self.tolerance);
        let built = scan_relic(&reader, &self.builder)
            .with_context(|| format!("Failed to scan {}", path.display()))?;
        Ok(built)
    }

    /// Scans all dumps in parallel. Outcomes are returned in input order.
    pub fn scan_dumps(&self, paths: &[PathBuf]) -> Vec<DumpOutcome> {
        tracing::info!(count = paths.len(), "scanning detection dumps");
        paths
            .par_iter()
            .map(|path| DumpOutcome {
                path: path.clone(),
                result: self.scan_dump(path),
            })
            .collect()
    }
}

/// Drops exports identical to the one right before them.
///
/// Stepping through the inventory past its end leaves the same relic on
/// screen, which would otherwise be recorded repeatedly.
pub fn dedup_consecutive(exports: Vec<ExportedRelic>) -> Vec<ExportedRelic> {
    let mut unique: Vec<ExportedRelic> = Vec::with_capacity(exports.len());
    for export in exports {
        if unique.last() != Some(&export) {
            unique.push(export);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::Rect;
    use crate::relic::{Vocabulary, export};
    use image::Rgba;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Serves canned text per region and records which regions were read.
    struct FakeReader {
        texts: HashMap<String, String>,
        visited: Mutex<Vec<String>>,
    }

    impl FakeReader {
        fn new(texts: &[(&str, &str)]) -> Self {
            Self {
                texts: texts.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
                visited: Mutex::new(Vec::new()),
            }
        }
    }

    impl RegionReader for FakeReader {
        fn read_region(&self, name: &str) -> ScanResult<String> {
            self.visited.lock().unwrap().push(name.to_string());
            Ok(self.texts.get(name).cloned().unwrap_or_default())
        }
    }

    fn vocab() -> Vocabulary {
        let mut set_to_names = BTreeMap::new();
        set_to_names.insert("英豪之冠".to_string(), vec!["英豪的赴火护胫".to_string()]);
        Vocabulary {
            valid_sets: vec!["英豪之冠".into()],
            set_to_names,
            valid_locations: vec!["头部".into(), "脚部".into()],
            valid_items: ["攻击力", "攻击力百分比", "速度", "暴击率百分比"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ..Vocabulary::default()
        }
    }

    #[test]
    fn test_read_skips_empty_fourth_row() {
        let reader = FakeReader::new(&[
            ("relic_name", "英豪的赴火护胫"),
            ("relic_location", "脚部"),
            ("relic_level", "+15"),
            ("relic_main_name", "速度"),
            ("relic_main_value", "25"),
            ("relic_sub1_name", "攻击力"),
            ("relic_sub1_value", "10%"),
            ("relic_sub2_name", "暴击率"),
            ("relic_sub2_value", ""),
            ("relic_sub4_name", "速度"),
        ]);

        let raw = read_raw_relic(&reader).unwrap();

        assert!(!reader.visited.lock().unwrap().contains(&"relic_sub4_name".to_string()));
        assert_eq!(raw.main, vec![("速度".to_string(), "25".to_string())]);
        assert_eq!(
            raw.sub,
            SubStatsInput::OrderedPairs(vec![("攻击力".to_string(), "10%".to_string())])
        );
        assert_eq!(raw.from_set, None);
    }

    #[test]
    fn test_read_fourth_row_when_value_present() {
        let reader = FakeReader::new(&[
            ("relic_sub4_name", "速度"),
            ("relic_sub4_value", "+2"),
        ]);

        let raw = read_raw_relic(&reader).unwrap();

        let visited = reader.visited.lock().unwrap();
        let value_at = visited.iter().position(|r| r == "relic_sub4_value").unwrap();
        let name_at = visited.iter().position(|r| r == "relic_sub4_name").unwrap();
        assert!(value_at < name_at);
        assert_eq!(raw.sub.len(), 1);
    }

    #[test]
    fn test_scan_relic_builds() {
        let reader = FakeReader::new(&[
            ("relic_name", "英豪的赴火护胫"),
            ("relic_location", "脚"),
            ("relic_level", "+15"),
            ("relic_main_name", "攻击力"),
            ("relic_main_value", "9%"),
            ("relic_sub1_name", "速度"),
            ("relic_sub1_value", "4"),
        ]);
        let vocab = vocab();

        let built = scan_relic(&reader, &RelicBuilder::new(&vocab)).unwrap();

        assert_eq!(built.relic.location, "脚部");
        assert_eq!(built.relic.main_stat.name, "攻击力百分比");
        assert_eq!(built.relic.from_set, "英豪之冠");
        assert_eq!(built.relic.item_number, 2);
    }

    #[test]
    fn test_scan_relic_propagates_build_errors() {
        let reader = FakeReader::new(&[("relic_name", "不存在的遗器")]);
        let vocab = vocab();
        let err = scan_relic(&reader, &RelicBuilder::new(&vocab)).unwrap_err();
        assert!(matches!(err, ScanError::Relic(_)));
    }

    #[test]
    fn test_line_reader_joins_fragments_in_region() {
        let layout = RegionLayout::default_relic_layout();
        let fragments = vec![
            TextBox::new("英豪的", Rect::new(1405, 1460, 132, 158), 0.9),
            TextBox::new("赴火护胫", Rect::new(1470, 1560, 132, 158), 0.9),
            TextBox::new("速度", Rect::new(1445, 1500, 442, 470), 0.9),
        ];

        let reader = LineReader::new(fragments, &layout, TextMerger::default(), Tolerance::default());

        assert_eq!(reader.lines().len(), 2);
        assert_eq!(reader.read_region("relic_name").unwrap(), "英豪的赴火护胫");
        assert_eq!(reader.read_region("relic_sub1_name").unwrap(), "速度");
        assert_eq!(reader.read_region("relic_location").unwrap(), "");
        assert!(matches!(
            reader.read_region("nowhere"),
            Err(ScanError::UnknownRegion(_))
        ));
    }

    struct FixedRecognizer(&'static str);

    impl TextRecognizer for FixedRecognizer {
        fn recognize_line(&self, img: &RgbaImage) -> Result<String> {
            anyhow::ensure!(img.width() > 0, "empty crop");
            Ok(format!("  {}\n", self.0))
        }
    }

    #[test]
    fn test_recognizer_reader_trims_and_maps_errors() {
        let layout = RegionLayout::default_relic_layout();
        let screenshot = RgbaImage::from_pixel(1920, 1080, Rgba([0, 0, 0, 255]));
        let recognizer = FixedRecognizer("脚部");

        let reader = RecognizerReader::new(&screenshot, &layout, &recognizer);
        assert_eq!(reader.read_region("relic_location").unwrap(), "脚部");

        // Regions beyond a tiny screenshot crop to nothing
        let tiny = RgbaImage::new(10, 10);
        let reader = RecognizerReader::new(&tiny, &layout, &recognizer);
        let err = reader.read_region("relic_location").unwrap_err();
        assert!(matches!(err, ScanError::Recognition { ref region, .. } if region == "relic_location"));
    }

    #[test]
    fn test_scan_dumps_keeps_input_order() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.json");
        let bad = dir.path().join("bad.json");
        std::fs::write(
            &good,
            r#"[
                {"raw_text": "英豪的赴火护胫", "polygon": [[1405, 132], [1560, 158]], "score": 0.9},
                {"raw_text": "脚部", "polygon": [[1412, 282], [1460, 308]], "score": 0.9},
                {"raw_text": "+15", "polygon": [[1412, 313], [1450, 340]], "score": 0.9},
                {"raw_text": "速度", "polygon": [[1445, 398], [1500, 430]], "score": 0.9},
                {"raw_text": "25", "polygon": [[1710, 398], [1740, 430]], "score": 0.9}
            ]"#,
        )
        .unwrap();
        std::fs::write(&bad, "not json").unwrap();

        let vocab = vocab();
        let layout = RegionLayout::default_relic_layout();
        let scanner = DumpScanner::new(
            &layout,
            RelicBuilder::new(&vocab),
            TextMerger::default(),
            Tolerance::default(),
        );

        let outcomes = scanner.scan_dumps(&[good.clone(), bad.clone(), good.clone()]);

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].path, good);
        assert_eq!(outcomes[1].path, bad);
        assert!(outcomes[1].result.is_err());

        let relic = &outcomes[0].result.as_ref().unwrap().relic;
        assert_eq!(relic.main_stat.name, "速度");
        assert_eq!(relic.item_number, 1);

        let exports: Vec<ExportedRelic> = outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|b| export(&b.relic))
            .collect();
        assert_eq!(dedup_consecutive(exports).len(), 1);
    }

    #[test]
    fn test_dedup_consecutive_only() {
        let vocab = vocab();
        let reader_a = FakeReader::new(&[
            ("relic_name", "英豪的赴火护胫"),
            ("relic_location", "脚部"),
            ("relic_main_name", "速度"),
            ("relic_main_value", "25"),
        ]);
        let a = export(&scan_relic(&reader_a, &RelicBuilder::new(&vocab)).unwrap().relic);
        let mut b = a.clone();
        b.location = "头部".to_string();

        let unique = dedup_consecutive(vec![a.clone(), a.clone(), b.clone(), a.clone()]);
        assert_eq!(unique, vec![a.clone(), b, a]);
    }
}
