//! Relic Scanner
//!
//! Command line front end: scans OCR detection dumps (or screenshots through
//! an external recognizer) of the relic detail panel and writes the
//! validated relics as JSON.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use relic_scanner::config::ScanConfig;
use relic_scanner::layout::RegionLayout;
use relic_scanner::logging::init_logging;
use relic_scanner::ocr::{BoxQuery, TextMerger, load_detections};
use relic_scanner::paths;
use relic_scanner::relic::{CorrectionKind, RelicBuilder, Vocabulary, export, export_to_json};
use relic_scanner::scan::{DumpScanner, RecognizerReader, dedup_consecutive, scan_relic};

#[derive(Parser, Debug)]
#[command(name = "relic-scanner", version, about = "Extracts validated relic data from OCR output")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// File locations shared by all subcommands.
#[derive(Args, Debug)]
struct Common {
    /// Config file (default: config.json next to the executable)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Vocabulary file (default: taken from the config)
    #[arg(long)]
    vocab: Option<PathBuf>,

    /// Region layout file (default: taken from the config, built-in layout if absent)
    #[arg(long)]
    regions: Option<PathBuf>,

    /// Capture resolution as WIDTHxHEIGHT, overriding the layout file
    #[arg(long, value_parser = parse_resolution)]
    resolution: Option<(u32, u32)>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan detection dumps and write the relics found
    Scan {
        /// JSON detection dumps, one per screenshot, in inventory order
        #[arg(required = true)]
        dumps: Vec<PathBuf>,

        /// Result file (default: taken from the config)
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        common: Common,
    },
    /// Read one screenshot with the configured recognizer and print the relic
    ScanImage {
        image: PathBuf,

        #[command(flatten)]
        common: Common,
    },
    /// Print the merged lines of a detection dump
    Merge {
        dump: PathBuf,

        /// Only print lines matching this text (repeatable)
        #[arg(long)]
        find: Vec<String>,

        /// Only print lines inside this region
        #[arg(long, conflicts_with = "find")]
        region: Option<String>,

        #[command(flatten)]
        common: Common,
    },
    /// Validate one value against the vocabulary
    Validate {
        #[arg(value_enum)]
        kind: FieldKind,

        value: String,

        #[command(flatten)]
        common: Common,
    },
    /// Write default config.json and regions.json next to the executable
    Init,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum FieldKind {
    Location,
    Item,
    Set,
    Name,
}

fn parse_resolution(s: &str) -> std::result::Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    let w: u32 = w.trim().parse().map_err(|_| format!("invalid width '{}'", w))?;
    let h: u32 = h.trim().parse().map_err(|_| format!("invalid height '{}'", h))?;
    if w == 0 || h == 0 {
        return Err("resolution must be non-zero".to_string());
    }
    Ok((w, h))
}

impl Common {
    fn load_config(&self) -> ScanConfig {
        let path = self.config.clone().unwrap_or_else(paths::get_config_path);
        ScanConfig::load_or_default(&path)
    }

    fn load_vocabulary(&self, config: &ScanConfig) -> Result<Vocabulary> {
        let path = self.vocab.clone().unwrap_or_else(|| config.vocabulary_path());
        Vocabulary::load_from_json(&path)
    }

    fn load_layout(&self, config: &ScanConfig) -> Result<RegionLayout> {
        let layout = match &self.regions {
            Some(path) => RegionLayout::load_from_json(path)?,
            None => {
                let path = config.regions_path();
                if path.exists() {
                    RegionLayout::load_from_json(&path)?
                } else {
                    tracing::info!("{} not found. Using built-in region layout.", path.display());
                    RegionLayout::default_relic_layout()
                }
            }
        };

        Ok(match self.resolution {
            Some((w, h)) => layout.with_resolution(w, h),
            None => layout,
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();
        tracing::error!("[PANIC]{} {}", location, msg);
        eprintln!("[PANIC]{} {}", location, msg);
    }));

    if let Err(e) = paths::ensure_directories() {
        eprintln!("Failed to create output directories: {}", e);
    }
    init_logging(&paths::get_logs_dir());

    match cli.command {
        Command::Scan { dumps, output, common } => run_scan(&dumps, output, &common),
        Command::ScanImage { image, common } => run_scan_image(&image, &common),
        Command::Merge {
            dump,
            find,
            region,
            common,
        } => run_merge(&dump, &find, region.as_deref(), &common),
        Command::Validate { kind, value, common } => run_validate(kind, &value, &common),
        Command::Init => run_init(),
    }
}

fn run_scan(dumps: &[PathBuf], output: Option<PathBuf>, common: &Common) -> Result<()> {
    let config = common.load_config();
    let vocab = common.load_vocabulary(&config)?;
    let layout = common.load_layout(&config)?;

    let scanner = DumpScanner::new(
        &layout,
        RelicBuilder::with_thresholds(&vocab, config.thresholds),
        TextMerger::new(config.merge),
        config.tolerance(),
    );

    let outcomes = scanner.scan_dumps(dumps);

    let mut exports = Vec::with_capacity(outcomes.len());
    let mut failed = 0usize;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(built) => {
                tracing::info!("{}: {}", outcome.path.display(), built.relic);
                exports.push(export(&built.relic));
            }
            Err(e) => {
                failed += 1;
                tracing::error!("{}: {:#}", outcome.path.display(), e);
            }
        }
    }

    let exports = dedup_consecutive(exports);
    let output = output.unwrap_or_else(|| config.output_path());
    export_to_json(&exports, &output)?;

    tracing::info!(
        "Scanned {} dump(s): {} relic(s) written to {}, {} failed",
        dumps.len(),
        exports.len(),
        output.display(),
        failed
    );
    Ok(())
}

fn run_scan_image(image_path: &Path, common: &Common) -> Result<()> {
    let config = common.load_config();
    let vocab = common.load_vocabulary(&config)?;

    let screenshot = image::open(image_path)
        .with_context(|| format!("Failed to open screenshot: {}", image_path.display()))?
        .to_rgba8();

    let mut layout = common.load_layout(&config)?;
    if common.resolution.is_none() {
        layout = layout.with_resolution(screenshot.width(), screenshot.height());
    }

    let reader = RecognizerReader::new(&screenshot, &layout, &config.recognizer);
    let builder = RelicBuilder::with_thresholds(&vocab, config.thresholds);
    let built = scan_relic(&reader, &builder)?;

    for correction in &built.corrections {
        let how = match &correction.kind {
            CorrectionKind::CloseMatch { similarity } => format!("similarity {:.2}", similarity),
            CorrectionKind::Suggested { suggestions } => format!("best of [{}]", suggestions.join(", ")),
        };
        tracing::info!(
            "corrected {}: '{}' -> '{}' ({})",
            correction.field,
            correction.raw,
            correction.corrected,
            how
        );
    }
    println!("{}", serde_json::to_string_pretty(&export(&built.relic))?);
    Ok(())
}

fn run_merge(dump: &Path, find: &[String], region: Option<&str>, common: &Common) -> Result<()> {
    let config = common.load_config();
    let merger = TextMerger::new(config.merge);
    let lines = merger.merge(load_detections(dump)?);

    if !find.is_empty() {
        for m in merger.find_with_text(&lines, find) {
            println!("{}\t{}\t{:.3}", m.target, m.line.raw_text, m.line.score);
        }
        return Ok(());
    }

    let lines = match region {
        Some(name) => {
            let layout = common.load_layout(&config)?;
            let rect = layout.scaled(name)?;
            merger.find_with_box(&lines, &rect, config.tolerance(), BoxQuery::Contain)
        }
        None => lines,
    };

    for line in &lines {
        let r = &line.rect;
        println!(
            "[{}, {}, {}, {}]\t{:.3}\t{}",
            r.x_min, r.x_max, r.y_min, r.y_max, line.score, line.raw_text
        );
    }
    Ok(())
}

fn run_validate(kind: FieldKind, value: &str, common: &Common) -> Result<()> {
    let config = common.load_config();
    let vocab = common.load_vocabulary(&config)?;
    let builder = RelicBuilder::with_thresholds(&vocab, config.thresholds);

    let (field, candidates) = match kind {
        FieldKind::Location => ("location", vocab.valid_locations.clone()),
        FieldKind::Item => ("item", vocab.valid_items.clone()),
        FieldKind::Set => ("from_set", vocab.valid_sets.clone()),
        FieldKind::Name => ("name", vocab.all_names()),
    };

    match builder.validator().validate(field, value, &candidates) {
        Ok(validated) => {
            println!("{}", validated.value);
            if let FieldKind::Name = kind {
                let sets = vocab.sets_containing(&validated.value);
                println!("set: {}", sets.join(", "));
            }
            Ok(())
        }
        Err(e) => bail!(e),
    }
}

fn run_init() -> Result<()> {
    let config_path = paths::get_config_path();
    let config = if config_path.exists() {
        tracing::info!("{} already exists, leaving it untouched", config_path.display());
        ScanConfig::load_or_default(&config_path)
    } else {
        let config = ScanConfig::default();
        config.save(&config_path)?;
        tracing::info!("Wrote {}", config_path.display());
        config
    };

    let regions_path = config.regions_path();
    if regions_path.exists() {
        tracing::info!("{} already exists, leaving it untouched", regions_path.display());
    } else {
        RegionLayout::default_relic_layout().save_to_json(&regions_path)?;
        tracing::info!("Wrote {}", regions_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolution() {
        assert_eq!(parse_resolution("1920x1080"), Ok((1920, 1080)));
        assert_eq!(parse_resolution("2560X1440"), Ok((2560, 1440)));
        assert!(parse_resolution("1920").is_err());
        assert!(parse_resolution("0x1080").is_err());
        assert!(parse_resolution("ax1080").is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "relic-scanner",
            "scan",
            "a.json",
            "b.json",
            "--resolution",
            "1280x720",
        ])
        .unwrap();
        match cli.command {
            Command::Scan { dumps, common, .. } => {
                assert_eq!(dumps.len(), 2);
                assert_eq!(common.resolution, Some((1280, 720)));
            }
            other => panic!("unexpected command {:?}", other),
        }

        let cli = Cli::try_parse_from(["relic-scanner", "merge", "d.json", "--find", "攻击", "--find", "速度"]).unwrap();
        assert!(matches!(cli.command, Command::Merge { ref find, .. } if find.len() == 2));

        let cli = Cli::try_parse_from(["relic-scanner", "validate", "location", "脚"]).unwrap();
        assert!(matches!(cli.command, Command::Validate { kind: FieldKind::Location, .. }));

        assert!(Cli::try_parse_from(["relic-scanner", "scan"]).is_err());
    }
}
