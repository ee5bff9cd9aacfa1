//! Cyclones and loading them from forecast directories.
//!
//! A storm directory holds the forecast files of one cyclone, either at the
//! top level or in one subdirectory per model:
//!
//! ```text
//! Isaac-2012/
//!   ECMF/Isaac-2012-08-21-00.csv
//!   ECMF/Isaac-2012-08-21-12.csv
//!   GEFS/Isaac-2012-08-21-00.csv
//! ```
//!
//! The storm name and year come from the file names; the best track comes
//! from the HURDAT2 database.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::io::tigge::{FileNamePattern, ForecastFile};
use crate::io::Hurdat2;
use crate::model::Model;
use crate::track::{MatchOptions, Track};

/// A cyclone with its best track and verified forecasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cyclone {
    /// Storm name.
    pub name: String,

    /// Season year.
    pub year: i32,

    /// Best track.
    pub best_track: Track,

    /// Verified forecasts per model, keyed by model name.
    pub models: BTreeMap<String, Model>,

    /// First best-track fix.
    pub formation: Option<DateTime<Utc>>,

    /// Last best-track fix.
    pub dissipation: Option<DateTime<Utc>>,
}

impl Cyclone {
    /// Assemble a cyclone; formation and dissipation come from the best track.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        year: i32,
        best_track: Track,
        models: BTreeMap<String, Model>,
    ) -> Self {
        Self {
            name: name.into(),
            year,
            formation: best_track.formation(),
            dissipation: best_track.dissipation(),
            best_track,
            models,
        }
    }

    /// Look up a model by name (case-insensitive).
    #[must_use]
    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, model)| model)
    }

    /// Time between formation and dissipation.
    #[must_use]
    pub fn lifetime(&self) -> Option<Duration> {
        Some(self.dissipation? - self.formation?)
    }
}

/// Settings for loading and verifying cyclones.
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// How forecast fixes are matched to the best track.
    pub matching: MatchOptions,

    /// Model subdirectories to load; empty loads all.
    pub models: Vec<String>,

    /// Model assigned to files at the top of a storm directory.
    pub default_model: String,

    /// Smallest ensemble for which a spread ellipse is computed.
    pub min_members: usize,

    /// Forecast file-name convention.
    pub file_pattern: FileNamePattern,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            matching: MatchOptions::default(),
            models: Vec::new(),
            default_model: "ECMF".to_string(),
            min_members: 5,
            file_pattern: FileNamePattern::default(),
        }
    }
}

impl VerifyOptions {
    fn includes_model(&self, name: &str) -> bool {
        self.models.is_empty() || self.models.iter().any(|m| m.eq_ignore_ascii_case(name))
    }
}

/// Builds [`Cyclone`]s from forecast directories.
#[derive(Debug)]
pub struct CycloneLoader<'a> {
    best_tracks: &'a Hurdat2,
    options: VerifyOptions,
}

impl<'a> CycloneLoader<'a> {
    /// Create a loader using a best-track database.
    #[must_use]
    pub fn new(best_tracks: &'a Hurdat2, options: VerifyOptions) -> Self {
        Self {
            best_tracks,
            options,
        }
    }

    /// The loader's options.
    #[must_use]
    pub fn options(&self) -> &VerifyOptions {
        &self.options
    }

    /// Load and verify one storm directory.
    ///
    /// Forecast files that fail to parse, or that name a different storm
    /// than the first readable file, are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed, holds no readable
    /// forecast files, or the storm has no usable best track.
    pub fn load_dir(&self, dir: &Path) -> Result<Cyclone> {
        let files = self.collect_files(dir)?;
        let mut storm: Option<(String, i32)> = None;
        let mut per_model: BTreeMap<String, Vec<Track>> = BTreeMap::new();

        for (model, path) in files {
            let file = match ForecastFile::read(&path, &self.options.file_pattern) {
                Ok(file) => file,
                Err(e) if e.is_skippable() => {
                    warn!(file = %path.display(), error = %e, "Skipping forecast file");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let (name, year) = storm.get_or_insert_with(|| (file.name.storm.clone(), file.name.year));
            if !name.eq_ignore_ascii_case(&file.name.storm) || *year != file.name.year {
                warn!(
                    file = %path.display(),
                    expected = %name,
                    "Skipping forecast file for a different storm"
                );
                continue;
            }

            per_model.entry(model).or_default().extend(file.tracks);
        }

        let Some((name, year)) = storm else {
            return Err(Error::NoForecastFiles {
                path: dir.to_path_buf(),
            });
        };

        let record = self
            .best_tracks
            .find(&name, year)
            .ok_or_else(|| Error::storm_not_found(&name, year))?;
        let best_track = record.track();
        if best_track.is_empty() {
            return Err(Error::EmptyBestTrack { name, year });
        }

        let models: BTreeMap<String, Model> = per_model
            .into_iter()
            .map(|(model, tracks)| {
                let verified = Model::from_tracks(
                    model.clone(),
                    &tracks,
                    &best_track,
                    &self.options.matching,
                    self.options.min_members,
                );
                (model, verified)
            })
            .collect();

        info!(
            storm = %record.name,
            year,
            models = models.len(),
            best_track_fixes = best_track.len(),
            "Loaded cyclone"
        );
        Ok(Cyclone::new(record.name.clone(), year, best_track, models))
    }

    /// Load every storm directory below `root`.
    ///
    /// Storms that cannot be loaded for input reasons are skipped with a
    /// warning.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` cannot be listed or a storm fails for a
    /// reason other than bad input.
    pub fn load_season(&self, root: &Path) -> Result<Vec<Cyclone>> {
        let mut cyclones = Vec::new();
        for dir in sorted_entries(root)?.into_iter().filter(|p| p.is_dir()) {
            match self.load_dir(&dir) {
                Ok(cyclone) => cyclones.push(cyclone),
                Err(e) if e.is_skippable() => {
                    warn!(storm = %dir.display(), error = %e, "Skipping storm");
                }
                Err(e) => return Err(e),
            }
        }
        info!("Loaded {} cyclones from {}", cyclones.len(), root.display());
        Ok(cyclones)
    }

    /// Forecast files of a storm directory with their model names.
    fn collect_files(&self, dir: &Path) -> Result<Vec<(String, PathBuf)>> {
        let mut files = Vec::new();
        let pattern = &self.options.file_pattern;

        for path in sorted_entries(dir)? {
            if path.is_dir() {
                let Some(model) = path.file_name().map(|n| n.to_string_lossy().to_uppercase())
                else {
                    continue;
                };
                if !self.options.includes_model(&model) {
                    debug!(model = %model, "Model not selected, skipping directory");
                    continue;
                }
                for file in sorted_entries(&path)? {
                    if file.is_file() && pattern.matches(&file) {
                        files.push((model.clone(), file));
                    }
                }
            } else if pattern.matches(&path) {
                let model = self.options.default_model.to_uppercase();
                if self.options.includes_model(&model) {
                    files.push((model, path));
                }
            } else {
                trace!(path = %path.display(), "Ignoring non-forecast file");
            }
        }

        if files.is_empty() {
            return Err(Error::NoForecastFiles {
                path: dir.to_path_buf(),
            });
        }
        Ok(files)
    }
}

/// Directory entries sorted by path.
fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .map_err(|source| Error::FileRead {
            path: dir.to_path_buf(),
            source,
        })?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const HURDAT: &str = "\
AL092012,              ISAAC,      3,
20120821, 0000,  , TS, 15.0N,  52.0W,  40, 1005,
20120821, 1200,  , TS, 15.0N,  54.0W,  45, 1003,
20120822, 0000,  , TS, 15.0N,  56.0W,  50, 1000,
";

    const ECMF_RUN: &str = "\
AL,09,2012082100,03,ECMF, 0,15.0,-52.0,40,1005
AL,09,2012082100,03,ECMF,12,16.0,-54.0,45,1001
AL,09,2012082100,03,ECMF,24,15.0,-56.0,50,1000
AL,09,2012082100,03,ECMF,36,15.0,-58.0,55,995
";

    const GEFS_RUN: &str = "\
AL,09,2012082100,03,AP01, 0,15.0,-52.0,40,1005
AL,09,2012082100,03,AP02, 0,15.0,-52.0,40,1005
AL,09,2012082100,03,AP01,12,15.5,-54.0,45,1004
AL,09,2012082100,03,AP02,12,14.5,-54.0,45,1002
";

    struct Fixture {
        root: PathBuf,
    }

    impl Fixture {
        fn new(tag: &str) -> Self {
            let root = std::env::temp_dir().join(format!(
                "tcverify_cyclone_{tag}_{}",
                std::process::id()
            ));
            let _ = fs::remove_dir_all(&root);
            fs::create_dir_all(&root).unwrap();
            Self { root }
        }

        fn write(&self, relative: &str, content: &str) {
            let path = self.root.join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.root);
        }
    }

    fn hurdat() -> Hurdat2 {
        Hurdat2::parse(HURDAT.as_bytes(), "test").unwrap()
    }

    #[test]
    fn test_default_options_cap_lead_time() {
        let options = VerifyOptions::default();
        assert_eq!(options.matching.max_lead_hours, Some(144));
        assert!(options.models.is_empty());
    }

    #[test]
    fn test_load_dir_with_model_subdirectories() {
        let fx = Fixture::new("models");
        fx.write("Isaac-2012/ECMF/Isaac-2012-08-21-00.csv", ECMF_RUN);
        fx.write("Isaac-2012/gefs/Isaac-2012-08-21-00.csv", GEFS_RUN);
        fx.write("Isaac-2012/ECMF/README.txt", "not a forecast");

        let db = hurdat();
        let loader = CycloneLoader::new(&db, VerifyOptions::default());
        let cyclone = loader.load_dir(&fx.root.join("Isaac-2012")).unwrap();

        assert_eq!(cyclone.name, "ISAAC");
        assert_eq!(cyclone.year, 2012);
        assert_eq!(
            cyclone.formation,
            Some(Utc.with_ymd_and_hms(2012, 8, 21, 0, 0, 0).unwrap())
        );
        assert_eq!(cyclone.lifetime(), Some(Duration::hours(24)));
        assert_eq!(cyclone.models.keys().collect::<Vec<_>>(), vec!["ECMF", "GEFS"]);

        let ecmf = cyclone.model("ecmf").unwrap();
        assert_eq!(ecmf.runs.len(), 1);
        assert_eq!(ecmf.summary.fixes, 3);
        assert_eq!(ecmf.dropped(), 1);
        assert!((ecmf.summary.mean_intensity_error - (-2.0 / 3.0)).abs() < 1e-9);

        let gefs = cyclone.model("GEFS").unwrap();
        assert_eq!(gefs.members().count(), 2);
        assert_eq!(gefs.spread.len(), 2);
    }

    #[test]
    fn test_load_dir_root_files_use_default_model() {
        let fx = Fixture::new("root");
        fx.write("Isaac-2012-08-21-00.csv", ECMF_RUN);

        let db = hurdat();
        let options = VerifyOptions {
            default_model: "ecmf".to_string(),
            ..VerifyOptions::default()
        };
        let cyclone = CycloneLoader::new(&db, options).load_dir(&fx.root).unwrap();
        assert!(cyclone.models.contains_key("ECMF"));
    }

    #[test]
    fn test_load_dir_filters_models() {
        let fx = Fixture::new("filter");
        fx.write("ECMF/Isaac-2012-08-21-00.csv", ECMF_RUN);
        fx.write("UKMO/Isaac-2012-08-21-00.csv", ECMF_RUN);

        let db = hurdat();
        let options = VerifyOptions {
            models: vec!["ECMF".to_string(), "GEFS".to_string()],
            ..VerifyOptions::default()
        };
        let cyclone = CycloneLoader::new(&db, options).load_dir(&fx.root).unwrap();
        assert_eq!(cyclone.models.len(), 1);
        assert!(cyclone.model("UKMO").is_none());
    }

    #[test]
    fn test_load_dir_skips_malformed_and_foreign_files() {
        let fx = Fixture::new("malformed");
        fx.write("ECMF/Isaac-2012-08-21-00.csv", ECMF_RUN);
        fx.write("ECMF/Isaac-2012-08-21-12.csv", "AL,09,garbage\n");
        fx.write(
            "ECMF/Isaac-2012-08-22-00.csv",
            "AL,09,2012082200,03,ECMF,9999999999999,15.0,-56.0,50,1000\n",
        );
        fx.write("ECMF/Sandy-2012-10-25-00.csv", ECMF_RUN);

        let db = hurdat();
        let cyclone = CycloneLoader::new(&db, VerifyOptions::default())
            .load_dir(&fx.root)
            .unwrap();
        assert_eq!(cyclone.model("ECMF").unwrap().runs.len(), 1);
    }

    #[test]
    fn test_load_dir_unknown_storm() {
        let fx = Fixture::new("unknown");
        fx.write("ECMF/Sandy-2012-10-25-00.csv", ECMF_RUN);

        let db = hurdat();
        let err = CycloneLoader::new(&db, VerifyOptions::default())
            .load_dir(&fx.root)
            .unwrap_err();
        assert!(matches!(err, Error::StormNotFound { year: 2012, .. }));
    }

    #[test]
    fn test_load_dir_without_forecasts() {
        let fx = Fixture::new("empty");
        fx.write("notes.txt", "nothing here");

        let db = hurdat();
        let err = CycloneLoader::new(&db, VerifyOptions::default())
            .load_dir(&fx.root)
            .unwrap_err();
        assert!(matches!(err, Error::NoForecastFiles { .. }));
    }

    #[test]
    fn test_load_season_skips_bad_storms() {
        crate::logging::init_test_logging();
        let fx = Fixture::new("season");
        fx.write("Isaac-2012/ECMF/Isaac-2012-08-21-00.csv", ECMF_RUN);
        fx.write("Sandy-2012/ECMF/Sandy-2012-10-25-00.csv", ECMF_RUN);
        fx.write("Empty-2012/notes.txt", "");
        fx.write("stray.csv", ECMF_RUN);

        let db = hurdat();
        let cyclones = CycloneLoader::new(&db, VerifyOptions::default())
            .load_season(&fx.root)
            .unwrap();
        assert_eq!(cyclones.len(), 1);
        assert_eq!(cyclones[0].name, "ISAAC");
    }

    #[test]
    fn test_load_season_missing_root() {
        let db = hurdat();
        let err = CycloneLoader::new(&db, VerifyOptions::default())
            .load_season(Path::new("/nonexistent/season"))
            .unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }

    #[test]
    fn test_cyclone_without_best_track_fixes() {
        let cyclone = Cyclone::new("X", 2000, Track::best_track(Vec::new()), BTreeMap::new());
        assert!(cyclone.formation.is_none());
        assert!(cyclone.lifetime().is_none());
    }
}
