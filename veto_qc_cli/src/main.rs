use clap::{Arg, ArgAction, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;

use libveto_qc::config::Config;
use libveto_qc::process::process;
use libveto_qc::scan_status::ScanStatus;

fn make_template_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let yaml_str = serde_yaml::to_string(&config)?;
    let mut file = File::create(path)?;
    file.write_all(yaml_str.as_bytes())?;
    Ok(())
}

fn main() {
    // Create a cli
    let matches = Command::new("veto_qc_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .required(true)
                .help("Path to the configuration file"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Log per-event diagnostics"),
        )
        .get_matches();

    let level = if matches.get_flag("verbose") {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    if let Err(e) = LogWrapper::new(pb_manager.clone(), logger).try_init() {
        eprintln!("Could not create logging/progress: {e}");
        return;
    }

    // Parse the cli
    let Some(config_path) = matches.get_one::<String>("path").map(PathBuf::from) else {
        log::error!("A configuration path is required");
        return;
    };

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        match make_template_config(&config_path) {
            Ok(()) => log::info!("Done."),
            Err(e) => log::error!("Could not write template config: {e}"),
        }
        return;
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    log::info!("Config successfully loaded.");
    log::info!("Run List: {}", config.run_list_path.to_string_lossy());
    log::info!("Data Path: {}", config.data_path.to_string_lossy());
    match &config.threshold_table_path {
        Some(path) => log::info!("Threshold Table: {}", path.to_string_lossy()),
        None => log::info!("Threshold Table: None"),
    }
    log::info!("Dataset Name: {}", config.get_dataset_name());
    log::info!("Output Path: {}", config.output_path.to_string_lossy());
    log::info!("Deactivate Channels: {}", config.deactivate_channels);

    // Setup the progress bar
    let pb = pb_manager.add(ProgressBar::new(100));
    if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}") {
        pb.set_style(style);
    }
    let (tx, rx) = channel::<ScanStatus>();
    // Spawn the task!
    let handle = std::thread::spawn(move || process(&config, &tx));

    // The channel closes once the scan thread drops its sender
    for status in rx.iter() {
        pb.set_position((status.progress * 100.0) as u64);
        pb.set_message(format!(
            "run {} ({}/{})",
            status.run_number, status.runs_done, status.runs_total
        ));
    }

    match handle.join() {
        Ok(result) => match result {
            Ok(summary) => log::info!(
                "Successfully scanned {} runs ({} skipped)!",
                summary.runs_scanned,
                summary.runs_skipped
            ),
            Err(e) => log::error!("Scan failed with error: {e}"),
        },
        Err(_) => log::error!("Failed to join scan task!"),
    }

    pb.finish();

    log::info!("Done.");
}
