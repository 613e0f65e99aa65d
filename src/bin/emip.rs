use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use codegaze::PipelineConfig;
use codegaze::aoi::{
    AoiLevel, AoiRect, attach_srcml_tags, attach_tokens, emip_code_file, emip_srcml_table,
    extract_aois_from_path,
};
use codegaze::export::{write_json, write_records_tsv, write_text_file};
use codegaze::gaze::{Experiment, Fixation, Saccade};
use codegaze::hit_test::{GazeRecord, hit_test_trial};
use codegaze::ingest::{Tracker, load_experiment};
use codegaze::overlay::{OverlayStyle, render_overlay};
use codegaze::stimulus::{StimulusLayout, render_code_stimulus};

#[derive(Parser, Debug)]
#[command(
    name = "emip",
    about = "Fixation filtering, AOI extraction and gaze-to-token mapping for code-reading studies",
    version
)]
struct Cli {
    /// JSON file overriding the default thresholds
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract line or token AOIs from a code image
    Aois {
        #[arg(short = 'i', long = "image")]
        image: PathBuf,

        /// line or sub-line
        #[arg(short = 'l', long = "level")]
        level: Option<AoiLevel>,

        #[arg(long = "margin-height")]
        margin_height: Option<u32>,

        #[arg(long = "margin-width")]
        margin_width: Option<u32>,

        /// Source file whose words label the AOIs
        #[arg(long = "code")]
        code: Option<PathBuf>,

        /// srcML table (AOI / syntactic_context columns)
        #[arg(long = "srcml")]
        srcml: Option<PathBuf>,

        /// Output JSON (stdout when omitted)
        #[arg(short = 'o', long = "out")]
        out: Option<PathBuf>,
    },

    /// Print or save the fixations of every trial in a recording
    Fixations {
        #[arg(short = 'i', long = "input")]
        input: PathBuf,

        /// smi or eyelink
        #[arg(short = 't', long = "tracker")]
        tracker: Tracker,

        #[arg(short = 'o', long = "out")]
        out: Option<PathBuf>,
    },

    /// Map every fixation of a recording onto the AOIs of its stimulus
    HitTest {
        #[arg(short = 'i', long = "input")]
        input: PathBuf,

        #[arg(short = 't', long = "tracker")]
        tracker: Tracker,

        /// Directory holding the stimulus images
        #[arg(long = "images")]
        images: PathBuf,

        /// Directory holding the stimulus programs and srcML tables
        #[arg(long = "code-dir")]
        code_dir: Option<PathBuf>,

        #[arg(short = 'r', long = "radius")]
        radius: Option<f64>,

        /// Output TSV (stdout when omitted)
        #[arg(short = 'o', long = "out")]
        out: Option<PathBuf>,
    },

    /// Draw one trial's fixations (and optionally AOIs) over its stimulus
    Draw {
        #[arg(short = 'i', long = "input")]
        input: PathBuf,

        #[arg(short = 't', long = "tracker")]
        tracker: Tracker,

        #[arg(long = "image")]
        image: PathBuf,

        #[arg(long = "trial")]
        trial: u32,

        /// Also outline the extracted AOIs
        #[arg(long = "aois")]
        aois: bool,

        #[arg(short = 'o', long = "out")]
        out: PathBuf,
    },

    /// Render a source file as a block-glyph stimulus image
    Stimulus {
        #[arg(long = "code")]
        code: PathBuf,

        #[arg(short = 'o', long = "out")]
        out: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig, Box<dyn Error>> {
    match path {
        Some(p) => Ok(PipelineConfig::load(p)?),
        None => Ok(PipelineConfig::default()),
    }
}

/// Reads a recording and runs the fixation filter on sample-based trials.
fn load_filtered(
    input: &Path,
    tracker: Tracker,
    config: &PipelineConfig,
) -> Result<Experiment, Box<dyn Error>> {
    let mut experiment = load_experiment(input, tracker)?;
    if tracker == Tracker::SmiRed250 {
        for trial in experiment.trials.iter_mut() {
            let n = trial.filter_fixations(&config.fixation)?;
            log::debug!("trial {}: {n} fixations", trial.trial_id);
        }
    }
    Ok(experiment)
}

/// AOIs for one stimulus, labelled from the code directory when available.
fn stimulus_aois(
    image_path: &Path,
    code_dir: Option<&Path>,
    config: &PipelineConfig,
) -> Result<Vec<AoiRect>, Box<dyn Error>> {
    let mut aois = extract_aois_from_path(image_path, &config.aoi, &config.binarize)?;
    let Some(code_dir) = code_dir else {
        return Ok(aois);
    };
    let name = image_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if let Some(code_file) = emip_code_file(&name) {
        match fs::read_to_string(code_dir.join(code_file)) {
            Ok(code) => {
                attach_tokens(&mut aois, &code);
            }
            Err(e) => log::warn!("no tokens for {name}: {e}"),
        }
    }
    if let Some(table) = emip_srcml_table(&name) {
        match fs::read_to_string(code_dir.join(table)) {
            Ok(text) => {
                attach_srcml_tags(&mut aois, &text)?;
            }
            Err(e) => log::warn!("no srcML tags for {name}: {e}"),
        }
    }
    Ok(aois)
}

fn run_hit_test(
    input: &Path,
    tracker: Tracker,
    images: &Path,
    code_dir: Option<&Path>,
    config: &PipelineConfig,
) -> Result<Vec<GazeRecord>, Box<dyn Error>> {
    let experiment = load_filtered(input, tracker, config)?;
    let mut cache: HashMap<String, Vec<AoiRect>> = HashMap::new();
    let mut records = Vec::new();

    for trial in &experiment.trials {
        let Some(image) = trial.image.as_deref() else {
            log::warn!("trial {} has no stimulus image, skipping", trial.trial_id);
            continue;
        };
        if !cache.contains_key(image) {
            let aois = match stimulus_aois(&images.join(image), code_dir, config) {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("AOI extraction failed for {image}: {e}");
                    continue;
                }
            };
            cache.insert(image.to_string(), aois);
        }
        let aois = &cache[image];
        records.extend(hit_test_trial(trial, aois, &config.hit_test)?);
    }

    log::info!(
        "{}: {} trials -> {} gaze records",
        experiment.participant,
        experiment.trial_count(),
        records.len()
    );
    Ok(records)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Aois {
            image,
            level,
            margin_height,
            margin_width,
            code,
            srcml,
            out,
        } => {
            if let Some(level) = level {
                config.aoi.level = level;
            }
            if let Some(h) = margin_height {
                config.aoi.margin_height = h;
            }
            if let Some(w) = margin_width {
                config.aoi.margin_width = w;
            }

            let mut aois = extract_aois_from_path(&image, &config.aoi, &config.binarize)?;
            if let Some(code) = code {
                attach_tokens(&mut aois, &fs::read_to_string(code)?);
            }
            if let Some(srcml) = srcml {
                let tagged = attach_srcml_tags(&mut aois, &fs::read_to_string(srcml)?)?;
                log::info!("{tagged} of {} AOIs tagged", aois.len());
            }

            match out {
                Some(out) => write_json(&out, &aois)?,
                None => println!("{}", serde_json::to_string_pretty(&aois)?),
            }
        }

        Command::Fixations {
            input,
            tracker,
            out,
        } => {
            let experiment = load_filtered(&input, tracker, &config)?;
            let fixations: Vec<Fixation> = experiment
                .trials
                .iter()
                .flat_map(|t| t.corrected_fixations())
                .collect();
            log::info!(
                "{}: {} fixations over {} trials",
                experiment.participant,
                fixations.len(),
                experiment.trial_count()
            );
            match out {
                Some(out) => write_json(&out, &fixations)?,
                None => println!("{}", serde_json::to_string_pretty(&fixations)?),
            }
        }

        Command::HitTest {
            input,
            tracker,
            images,
            code_dir,
            radius,
            out,
        } => {
            if let Some(r) = radius {
                config.hit_test.radius = r;
            }
            let records = run_hit_test(&input, tracker, &images, code_dir.as_deref(), &config)?;
            match out {
                Some(out) => {
                    let mut buf = Vec::new();
                    write_records_tsv(&records, &mut buf)?;
                    write_text_file(&out, &String::from_utf8(buf)?)?;
                }
                None => write_records_tsv(&records, io::stdout().lock())?,
            }
        }

        Command::Draw {
            input,
            tracker,
            image: stimulus,
            trial,
            aois,
            out,
        } => {
            let experiment = load_filtered(&input, tracker, &config)?;
            let Some(trial) = experiment.trial(trial) else {
                return Err(format!("no trial {trial} in {}", input.display()).into());
            };

            let base = image::open(&stimulus)?.to_rgb8();
            let rects = if aois {
                extract_aois_from_path(&stimulus, &config.aoi, &config.binarize)?
            } else {
                Vec::new()
            };
            let fixations = trial.corrected_fixations();
            let saccades: Vec<Saccade> = trial.saccades().cloned().collect();

            let canvas = render_overlay(&base, &rects, &fixations, &saccades, &OverlayStyle::default())?;
            if let Some(parent) = out.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)?;
            }
            canvas.save(&out)?;
            log::info!("wrote {}", out.display());
        }

        Command::Stimulus { code, out } => {
            let text = fs::read_to_string(&code)?;
            let lines: Vec<&str> = text.lines().collect();
            let img = render_code_stimulus(&lines, &StimulusLayout::default());
            img.save(&out)?;
            log::info!("wrote {} ({}x{})", out.display(), img.width(), img.height());
        }
    }

    Ok(())
}
