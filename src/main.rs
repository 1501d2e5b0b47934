//! spectra-tree: list, load and export the spectra below a folder.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Serialize;

use oes_spectra::{
    ActivationMode, Dataset, EffectiveSignal, Intensity, LinearCalibration, LoadState, Loader, NodeId, SpectrumTree,
    TextLoader, TreeConfig,
};

#[derive(Parser)]
#[command(
    name = "spectra-tree",
    version,
    about = "List, load and export emission spectra organised in folders"
)]
struct Cli {
    /// Folders or files to open
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Tree configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read every file with the plain-text loader
    #[arg(short, long, default_value_t = false)]
    load: bool,

    /// Wavelength shift applied to every spectrum
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    shift: f64,

    /// Scalar background subtracted from every spectrum
    #[arg(long)]
    background: Option<f64>,

    /// Sensitivity curve (two-column text file: wavelength, response)
    #[arg(long)]
    calibration: Option<PathBuf>,

    /// Print the effective spectra of all loaded leaves as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Serialize)]
struct ExportedSpectrum {
    name: String,
    #[serde(flatten)]
    signal: EffectiveSignal,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();
    log::info!("Starting spectra-tree v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => TreeConfig::load(path)?,
        None => TreeConfig::default(),
    };
    let mut tree = SpectrumTree::with_config(config);
    tree.set_global_shift(cli.shift);
    let roots = tree.open_files(&cli.paths)?;

    if let Some(path) = &cli.calibration {
        let curve = read_calibration(path)?;
        tree.set_calibration(Some(Box::new(curve)));
        tree.set_calibration_enabled(true);
    }

    if cli.load || cli.json {
        let loader = TextLoader::default();
        let files: Vec<NodeId> = roots
            .iter()
            .flat_map(|r| tree.descendants(*r))
            .filter(|id| tree.is_file_node(*id))
            .collect();
        for file in files {
            if let Err(e) = tree.populate(file, &loader) {
                log::warn!("Skipping {}: {}", tree.display_name(file, false), e);
            }
        }
        if let Some(level) = cli.background {
            for root in &roots {
                let report = tree.set_background(*root, level.into())?;
                if !report.all_accepted() {
                    log::warn!("{} spectra kept their previous background", report.rejected.len());
                }
            }
        }
    }

    if cli.json {
        for root in &roots {
            tree.set_checked(*root, true)?;
        }
        let exported: Vec<ExportedSpectrum> = tree
            .active_leaves(ActivationMode::Checked)
            .into_iter()
            .filter_map(|id| {
                tree.effective(id).ok().map(|signal| ExportedSpectrum {
                    name: tree.display_name(id, false),
                    signal,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&exported)?);
    } else {
        for root in &roots {
            print_node(&tree, *root, 0);
        }
    }
    Ok(())
}

fn read_calibration(path: &Path) -> Result<LinearCalibration, Box<dyn std::error::Error>> {
    let datasets = TextLoader::default().open(path)?;
    let Some(Dataset { axis, values, .. }) = datasets.into_iter().next() else {
        return Err(format!("{} holds no calibration data", path.display()).into());
    };
    let response = match values {
        Intensity::Single(y) => y,
        Intensity::Channels(mut c) if !c.is_empty() => c.remove(0),
        Intensity::Channels(_) => Vec::new(),
    };
    let knots: Vec<(f64, f64)> = axis.into_iter().zip(response).collect();
    LinearCalibration::new(knots)
        .ok_or_else(|| format!("{} is not a usable sensitivity curve", path.display()).into())
}

fn print_node(tree: &SpectrumTree, id: NodeId, depth: usize) {
    let Ok(node) = tree.node(id) else {
        return;
    };
    let mut line = format!("{}{}", "  ".repeat(depth), tree.display_name(id, true));
    if let Some(buffer) = node.buffer() {
        line.push_str(&format!("  [{} points]", buffer.len()));
    }
    if let LoadState::Failed { reason } = node.load_state() {
        line.push_str(&format!("  (unreadable: {})", reason));
    }
    println!("{}", line);
    for child in tree.children(id) {
        print_node(tree, *child, depth + 1);
    }
}
