//! Text and JSON rendering of verification results.
//!
//! Reports are built from the verified object graph into small serializable
//! summaries, which render as plain text, a fixed-width table or JSON.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cyclone::Cyclone;
use crate::error::Result;
use crate::io::StormRecord;
use crate::model::Model;
use crate::storage::{ModelAverage, RunRecord};
use crate::track::ErrorSummary;

/// Summary of one model's verification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelReport {
    /// Model name.
    pub name: String,
    /// Number of verified runs.
    pub runs: usize,
    /// Number of runs from ensemble members.
    pub members: usize,
    /// Forecast fixes that could not be verified.
    pub dropped: usize,
    /// Errors pooled over all runs.
    pub summary: ErrorSummary,
    /// Mean absolute ensemble spread (km), if the model has members.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_spread_km: Option<f64>,
    /// Errors per lead hour, when requested.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub lead_times: BTreeMap<i64, ErrorSummary>,
}

impl ModelReport {
    /// Summarise a model.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(model: &Model, lead_times: bool) -> Self {
        let mean_spread_km = (!model.spread.is_empty()).then(|| {
            model.spread.iter().map(|p| p.absolute_spread_km).sum::<f64>()
                / model.spread.len() as f64
        });
        Self {
            name: model.name.clone(),
            runs: model.runs.len(),
            members: model.members().count(),
            dropped: model.dropped(),
            summary: model.summary,
            mean_spread_km,
            lead_times: if lead_times {
                model.by_lead_time()
            } else {
                BTreeMap::new()
            },
        }
    }
}

/// Summary of one cyclone's verification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycloneReport {
    /// Storm name.
    pub name: String,
    /// Season year.
    pub year: i32,
    /// First best-track fix.
    pub formation: Option<DateTime<Utc>>,
    /// Last best-track fix.
    pub dissipation: Option<DateTime<Utc>>,
    /// Number of best-track fixes.
    pub best_track_fixes: usize,
    /// Per-model summaries, ordered by model name.
    pub models: Vec<ModelReport>,
}

impl CycloneReport {
    /// Summarise a cyclone; `lead_times` adds per-lead-time errors.
    #[must_use]
    pub fn new(cyclone: &Cyclone, lead_times: bool) -> Self {
        Self {
            name: cyclone.name.clone(),
            year: cyclone.year,
            formation: cyclone.formation,
            dissipation: cyclone.dissipation,
            best_track_fixes: cyclone.best_track.len(),
            models: cyclone
                .models
                .values()
                .map(|m| ModelReport::new(m, lead_times))
                .collect(),
        }
    }

    /// Render as indented plain text.
    #[must_use]
    pub fn to_plain(&self) -> String {
        let mut lines = vec![
            format!("{} ({})", self.name, self.year),
            format!("  Formation:   {}", format_time(self.formation)),
            format!("  Dissipation: {}", format_time(self.dissipation)),
            format!("  Best track:  {} fixes", self.best_track_fixes),
        ];

        for model in &self.models {
            let s = &model.summary;
            lines.push(String::new());
            lines.push(format!(
                "  {}: {} runs ({} members), {} fixes verified, {} dropped",
                model.name, model.runs, model.members, s.fixes, model.dropped
            ));
            lines.push(format!("    Track error:      {:.1} km", s.mean_track_error));
            lines.push(format!("    Pressure error:   {:+.1} hPa", s.mean_intensity_error));
            lines.push(format!("    Wind error:       {:+.1} kt", s.mean_wind_error));
            lines.push(format!("    Along-track bias: {:+.1} km", s.along_track_bias));
            lines.push(format!("    Cross-track bias: {:+.1} km", s.cross_track_bias));
            if let Some(spread) = model.mean_spread_km {
                lines.push(format!("    Ensemble spread:  {spread:.1} km"));
            }
            if !model.lead_times.is_empty() {
                lines.push(String::new());
                lines.extend(lead_time_lines(&model.lead_times, "    "));
            }
        }

        lines.join("\n")
    }

    /// Render as a fixed-width table with one row per model.
    #[must_use]
    pub fn to_table(&self) -> String {
        let mut lines = vec![
            format!(
                "{} ({})  {} to {}",
                self.name,
                self.year,
                format_time(self.formation),
                format_time(self.dissipation)
            ),
            String::new(),
            model_table_header(false),
        ];
        lines.extend(self.models.iter().map(|m| model_table_row(None, m)));

        for model in self.models.iter().filter(|m| !m.lead_times.is_empty()) {
            lines.push(String::new());
            lines.push(format!("{} by lead time", model.name));
            lines.extend(lead_time_lines(&model.lead_times, ""));
        }

        lines.join("\n")
    }
}

/// Render several cyclones as one table, one row per storm and model.
#[must_use]
pub fn season_table(reports: &[CycloneReport]) -> String {
    let mut lines = vec![model_table_header(true)];
    for report in reports {
        let storm = format!("{}-{}", report.name, report.year);
        lines.extend(report.models.iter().map(|m| model_table_row(Some(&storm), m)));
    }
    lines.join("\n")
}

/// Render several cyclones as plain text.
#[must_use]
pub fn season_plain(reports: &[CycloneReport]) -> String {
    reports
        .iter()
        .map(CycloneReport::to_plain)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render a best track as plain text.
#[must_use]
pub fn best_track_plain(record: &StormRecord) -> String {
    let track = record.track();
    let mut lines = vec![
        format!("{} ({}) {}", record.name, record.year, record.id),
        format!("  Formation:   {}", format_time(track.formation())),
        format!("  Dissipation: {}", format_time(track.dissipation())),
        format!("  Fixes:       {}", track.len()),
    ];
    let landfalls: Vec<String> = record
        .landfalls()
        .map(|e| format_time(Some(e.position.time)))
        .collect();
    if !landfalls.is_empty() {
        lines.push(format!("  Landfalls:   {}", landfalls.join(", ")));
    }
    lines.join("\n")
}

/// Render a best track as a table with one row per fix.
#[must_use]
pub fn best_track_table(record: &StormRecord) -> String {
    let mut lines = vec![
        format!("{} ({}) {}", record.name, record.year, record.id),
        String::new(),
        format!(
            "{:<17} {:>3} {:>6} {:>7} {:>8} {:>5} {:>6}",
            "TIME", "ID", "STATUS", "LAT", "LON", "VMAX", "MSLP"
        ),
    ];
    for entry in &record.entries {
        let p = &entry.position;
        lines.push(format!(
            "{:<17} {:>3} {:>6} {:>7.1} {:>8.1} {:>5} {:>6}",
            format_time(Some(p.time)),
            entry.record_id.map(String::from).unwrap_or_default(),
            entry.status,
            p.lat,
            p.lon,
            format_optional(p.vmax, 0),
            format_optional(p.mslp, 0),
        ));
    }
    lines.join("\n")
}

/// Render stored run records as plain text.
#[must_use]
pub fn history_plain(records: &[RunRecord]) -> String {
    if records.is_empty() {
        return "No stored verifications.".to_string();
    }
    records
        .iter()
        .map(|r| {
            format!(
                "{}-{} {} {} init {}: {} fixes, track {:.1} km, pressure {:+.1} hPa",
                r.storm,
                r.year,
                r.model,
                r.tech,
                format_time(r.init_time),
                r.summary.fixes,
                r.summary.mean_track_error,
                r.summary.mean_intensity_error
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render stored run records as a table.
#[must_use]
pub fn history_table(records: &[RunRecord]) -> String {
    let mut lines = vec![format!(
        "{:<16} {:<6} {:<6} {:<17} {:>5} {:>10} {:>10} {:>9}",
        "STORM", "MODEL", "TECH", "INIT", "FIXES", "TRACK(km)", "MSLP(hPa)", "VMAX(kt)"
    )];
    for r in records {
        lines.push(format!(
            "{:<16} {:<6} {:<6} {:<17} {:>5} {:>10.1} {:>10.1} {:>9.1}",
            format!("{}-{}", r.storm, r.year),
            r.model,
            r.tech,
            format_time(r.init_time),
            r.summary.fixes,
            r.summary.mean_track_error,
            r.summary.mean_intensity_error,
            r.summary.mean_wind_error,
        ));
    }
    lines.join("\n")
}

/// Render per-model averages over stored runs as a table.
#[must_use]
pub fn averages_table(averages: &[ModelAverage]) -> String {
    let mut lines = vec![format!(
        "{:<8} {:>5} {:>6} {:>10} {:>10} {:>9}",
        "MODEL", "RUNS", "FIXES", "TRACK(km)", "MSLP(hPa)", "VMAX(kt)"
    )];
    for a in averages {
        lines.push(format!(
            "{:<8} {:>5} {:>6} {:>10.1} {:>10.1} {:>9.1}",
            a.model, a.runs, a.fixes, a.mean_track_error, a.mean_intensity_error, a.mean_wind_error
        ));
    }
    lines.join("\n")
}

/// Render any report value as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn model_table_header(with_storm: bool) -> String {
    let header = format!(
        "{:<8} {:>5} {:>6} {:>5} {:>10} {:>10} {:>9} {:>10} {:>10}",
        "MODEL", "RUNS", "FIXES", "DROP", "TRACK(km)", "MSLP(hPa)", "VMAX(kt)", "ALONG(km)", "CROSS(km)"
    );
    if with_storm {
        format!("{:<16} {header}", "STORM")
    } else {
        header
    }
}

fn model_table_row(storm: Option<&str>, model: &ModelReport) -> String {
    let s = &model.summary;
    let row = format!(
        "{:<8} {:>5} {:>6} {:>5} {:>10.1} {:>10.1} {:>9.1} {:>10.1} {:>10.1}",
        model.name,
        model.runs,
        s.fixes,
        model.dropped,
        s.mean_track_error,
        s.mean_intensity_error,
        s.mean_wind_error,
        s.along_track_bias,
        s.cross_track_bias,
    );
    match storm {
        Some(storm) => format!("{storm:<16} {row}"),
        None => row,
    }
}

fn lead_time_lines(lead_times: &BTreeMap<i64, ErrorSummary>, indent: &str) -> Vec<String> {
    let mut lines = vec![format!(
        "{indent}{:>5} {:>6} {:>10} {:>10} {:>9}",
        "LEAD", "FIXES", "TRACK(km)", "MSLP(hPa)", "VMAX(kt)"
    )];
    for (lead, s) in lead_times {
        lines.push(format!(
            "{indent}{:>4}h {:>6} {:>10.1} {:>10.1} {:>9.1}",
            lead, s.fixes, s.mean_track_error, s.mean_intensity_error, s.mean_wind_error
        ));
    }
    lines
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%MZ").to_string())
}

fn format_optional(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.precision$}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::io::Hurdat2;
    use crate::position::Position;
    use crate::track::{MatchOptions, Track};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2012, 8, 21, hour, 0, 0).unwrap()
    }

    fn cyclone() -> Cyclone {
        let best = Track::best_track(vec![
            Position::new(at(0), 15.0, -52.0).with_intensity(Some(1005.0), Some(40.0)),
            Position::new(at(12), 15.0, -54.0).with_intensity(Some(1003.0), Some(45.0)),
        ]);
        let run = Track::new(
            "ECMF",
            Some(at(0)),
            vec![
                Position::new(at(0), 15.0, -52.0).with_intensity(Some(1005.0), Some(40.0)),
                Position::new(at(12), 16.0, -54.0).with_intensity(Some(1001.0), Some(50.0)),
            ],
        );
        let model = Model::from_tracks("ECMF", &[run], &best, &MatchOptions::default(), 5);
        let mut models = BTreeMap::new();
        models.insert("ECMF".to_string(), model);
        Cyclone::new("ISAAC", 2012, best, models)
    }

    #[test]
    fn test_cyclone_report_summary() {
        let report = CycloneReport::new(&cyclone(), false);

        assert_eq!(report.name, "ISAAC");
        assert_eq!(report.best_track_fixes, 2);
        assert_eq!(report.models.len(), 1);
        assert_eq!(report.models[0].runs, 1);
        assert_eq!(report.models[0].summary.fixes, 2);
        assert!(report.models[0].mean_spread_km.is_none());
        assert!(report.models[0].lead_times.is_empty());
    }

    #[test]
    fn test_cyclone_report_plain() {
        let text = CycloneReport::new(&cyclone(), true).to_plain();

        assert!(text.starts_with("ISAAC (2012)"));
        assert!(text.contains("Formation:   2012-08-21 00:00Z"));
        assert!(text.contains("ECMF: 1 runs (0 members), 2 fixes verified, 0 dropped"));
        assert!(text.contains("Pressure error:   -1.0 hPa"));
        assert!(text.contains("LEAD"));
        assert!(text.contains("  12h"));
    }

    #[test]
    fn test_cyclone_report_table() {
        let text = CycloneReport::new(&cyclone(), false).to_table();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[2].starts_with("MODEL"));
        assert!(lines[3].starts_with("ECMF"));
        assert!(!text.contains("by lead time"));
    }

    #[test]
    fn test_cyclone_report_json() {
        let report = CycloneReport::new(&cyclone(), true);
        let json = to_json(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["name"], "ISAAC");
        assert_eq!(value["models"][0]["summary"]["fixes"], 2);
        assert!(value["models"][0]["lead_times"]["12"].is_object());
    }

    #[test]
    fn test_season_table_rows() {
        let reports = vec![CycloneReport::new(&cyclone(), false); 2];
        let text = season_table(&reports);

        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().nth(1).unwrap().starts_with("ISAAC-2012"));
        assert!(season_plain(&reports).contains("\n\nISAAC (2012)"));
    }

    #[test]
    fn test_best_track_rendering() {
        let db = Hurdat2::parse(
            "AL092012,              ISAAC,      2,\n\
             20120821, 0000,  , TS, 15.0N,  52.0W,  40, 1005,\n\
             20120829, 0000, L, HU, 29.0N,  90.0W,  70,  966,\n"
                .as_bytes(),
            "test",
        )
        .unwrap();
        let record = db.find("isaac", 2012).unwrap();

        let plain = best_track_plain(record);
        assert!(plain.contains("Fixes:       2"));
        assert!(plain.contains("Landfalls:   2012-08-29 00:00Z"));

        let table = best_track_table(record);
        assert_eq!(table.lines().count(), 5);
        assert!(table.contains("966"));
    }

    #[test]
    fn test_history_rendering() {
        assert_eq!(history_plain(&[]), "No stored verifications.");

        let c = cyclone();
        let run = &c.models["ECMF"].runs[0];
        let record = RunRecord::from_run("Isaac", 2012, "ecmf", run);
        let plain = history_plain(std::slice::from_ref(&record));
        assert!(plain.starts_with("ISAAC-2012 ECMF ECMF init 2012-08-21 00:00Z: 2 fixes"));

        let table = history_table(&[record]);
        assert_eq!(table.lines().count(), 2);
    }

    #[test]
    fn test_averages_table() {
        let averages = vec![ModelAverage {
            model: "ECMF".to_string(),
            runs: 2,
            fixes: 10,
            mean_track_error: 150.24,
            mean_intensity_error: -3.0,
            mean_wind_error: 2.0,
        }];
        let table = averages_table(&averages);
        assert!(table.lines().nth(1).unwrap().contains("150.2"));
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_time(None), "-");
        assert_eq!(format_optional(None, 1), "-");
        assert_eq!(format_optional(Some(1004.96), 0), "1005");
    }
}
