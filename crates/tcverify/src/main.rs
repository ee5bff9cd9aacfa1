//! `tcverify` - CLI for tropical-cyclone forecast verification
//!
//! This binary loads forecast files and the HURDAT2 best-track database,
//! verifies the forecasts and prints or records the results.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::debug;

use tcverify::cli::{
    BestTrackCommand, Cli, Command, ConfigCommand, DistanceCommand, HistoryCommand, OutputFormat,
    SeasonCommand, VerifyCommand,
};
use tcverify::report::{self, CycloneReport};
use tcverify::storage::HistoryFilter;
use tcverify::{geo, init_logging, Config, CycloneLoader, Hurdat2, Storage};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let mut config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;
    if let Some(path) = cli.hurdat2.clone() {
        config.data.hurdat2_path = Some(path);
    }

    match cli.command {
        Command::Verify(cmd) => handle_verify(&config, &cmd),
        Command::Season(cmd) => handle_season(&config, &cmd),
        Command::BestTrack(cmd) => handle_best_track(&config, &cmd),
        Command::Distance(cmd) => {
            handle_distance(&cmd);
            Ok(())
        }
        Command::History(cmd) => handle_history(&config, &cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn load_best_tracks(config: &Config) -> Result<Hurdat2> {
    let path = config.hurdat2_path();
    Hurdat2::from_path(&path)
        .with_context(|| format!("failed to load best tracks from {}", path.display()))
}

fn open_storage(config: &Config) -> Result<Storage> {
    let path = config.database_path();
    Storage::open(&path).with_context(|| format!("failed to open database {}", path.display()))
}

fn handle_verify(config: &Config, cmd: &VerifyCommand) -> Result<()> {
    let best_tracks = load_best_tracks(config)?;
    let loader = CycloneLoader::new(&best_tracks, config.verify_options()?);
    let cyclone = loader
        .load_dir(&cmd.dir)
        .with_context(|| format!("failed to verify {}", cmd.dir.display()))?;

    let report = CycloneReport::new(&cyclone, cmd.lead_times);
    match cmd.format {
        OutputFormat::Plain => println!("{}", report.to_plain()),
        OutputFormat::Table => println!("{}", report.to_table()),
        OutputFormat::Json => println!("{}", report::to_json(&report)?),
    }

    if cmd.save {
        let mut storage = open_storage(config)?;
        let recorded = storage.record_cyclone(&cyclone)?;
        debug!("Recorded {} runs in {}", recorded, storage.path().display());
    }
    Ok(())
}

fn handle_season(config: &Config, cmd: &SeasonCommand) -> Result<()> {
    let best_tracks = load_best_tracks(config)?;
    let loader = CycloneLoader::new(&best_tracks, config.verify_options()?);
    let cyclones = loader
        .load_season(&cmd.root)
        .with_context(|| format!("failed to verify season {}", cmd.root.display()))?;
    if cyclones.is_empty() {
        bail!("no storms could be verified below {}", cmd.root.display());
    }

    let reports: Vec<CycloneReport> = cyclones
        .iter()
        .map(|c| CycloneReport::new(c, false))
        .collect();
    match cmd.format {
        OutputFormat::Plain => println!("{}", report::season_plain(&reports)),
        OutputFormat::Table => println!("{}", report::season_table(&reports)),
        OutputFormat::Json => println!("{}", report::to_json(&reports)?),
    }

    if cmd.save {
        let mut storage = open_storage(config)?;
        for cyclone in &cyclones {
            storage.record_cyclone(cyclone)?;
        }
    }
    Ok(())
}

fn handle_best_track(config: &Config, cmd: &BestTrackCommand) -> Result<()> {
    let best_tracks = load_best_tracks(config)?;
    let Some(record) = best_tracks.find(&cmd.name, cmd.year) else {
        bail!("storm {} ({}) not found in best-track data", cmd.name, cmd.year);
    };

    match cmd.format {
        OutputFormat::Plain => println!("{}", report::best_track_plain(record)),
        OutputFormat::Table => println!("{}", report::best_track_table(record)),
        OutputFormat::Json => println!("{}", report::to_json(record)?),
    }
    Ok(())
}

fn handle_distance(cmd: &DistanceCommand) {
    let km = geo::haversine_km(cmd.lat1, cmd.lon1, cmd.lat2, cmd.lon2);
    println!("{km:.2} km");
}

fn handle_history(config: &Config, cmd: &HistoryCommand) -> Result<()> {
    let storage = open_storage(config)?;

    if cmd.averages {
        let averages = storage.model_averages(cmd.storm.as_deref())?;
        match cmd.format {
            OutputFormat::Json => println!("{}", report::to_json(&averages)?),
            OutputFormat::Plain | OutputFormat::Table => {
                println!("{}", report::averages_table(&averages));
            }
        }
        return Ok(());
    }

    let records = storage.history(&HistoryFilter {
        storm: cmd.storm.clone(),
        model: cmd.model.clone(),
        limit: cmd.limit,
    })?;
    match cmd.format {
        OutputFormat::Plain => println!("{}", report::history_plain(&records)),
        OutputFormat::Table => println!("{}", report::history_table(&records)),
        OutputFormat::Json => println!("{}", report::to_json(&records)?),
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                let verification = &config.verification;
                let models = if verification.models.is_empty() {
                    "(all)".to_string()
                } else {
                    verification.models.join(", ")
                };
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Data]");
                println!("  HURDAT2 path:         {}", config.hurdat2_path().display());
                println!();
                println!("[Verification]");
                println!("  Models:               {models}");
                println!("  Default model:        {}", verification.default_model);
                println!("  Match tolerance (h):  {}", verification.match_tolerance_hours);
                println!("  Max lead time (h):    {}", verification.max_lead_hours);
                println!("  Min ensemble members: {}", verification.min_ensemble_members);
                println!("  File pattern:         {}", verification.file_pattern);
                println!();
                println!("[Storage]");
                println!("  Database path:        {}", config.database_path().display());
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}
