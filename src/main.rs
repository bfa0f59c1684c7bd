use anyhow::{bail, Result};
use clap::Parser;
use scrapsmith::app::{self, BackgroundMessage};
use scrapsmith::config::{self, Config};
use scrapsmith::gemini::artist::ArtSource;
use scrapsmith::gemini::GeminiClient;
use scrapsmith::pipeline::{self, PipelineSettings, PipelineStage};
use scrapsmith::plan::RepairPlan;
use scrapsmith::ui::helpers::wrap_text;
use scrapsmith::util;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "scrapsmith",
    about = "Repair plans from two photos: the broken thing and the scrap on hand",
    version
)]
struct Args {
    /// Photo of the broken object (picker opens if omitted)
    broken: Option<PathBuf>,

    /// Photo of the scrap pile
    scrap: Option<PathBuf>,

    /// Write session artifacts into this directory instead of a stamped one
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Tour the workbench on a canned plan, no photos or API key needed
    #[arg(long)]
    demo: bool,

    /// Interactive API-key setup, then exit
    #[arg(long)]
    setup: bool,

    /// Narrate every step as soon as the plan arrives
    #[arg(long)]
    narrate: bool,

    /// Skip the TUI: print the plan, write artifacts, exit
    #[arg(long)]
    plan_only: bool,

    /// Override the analysis and chat model
    #[arg(long, value_name = "MODEL")]
    text_model: Option<String>,

    /// Override the primary illustration model
    #[arg(long, value_name = "MODEL")]
    image_model: Option<String>,

    /// Longest photo edge in pixels before upload (clamped to 512-1536)
    #[arg(long, value_name = "PX")]
    edge: Option<u32>,

    /// JPEG quality for uploaded photos (clamped to 70-85)
    #[arg(long, value_name = "PCT")]
    quality: Option<u8>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.setup {
        if let Err(e) = config::setup_api_key_interactive() {
            bail!("{e}");
        }
        return Ok(());
    }

    let mut config = Config::load();
    if let Some(model) = args.text_model {
        config.text_model = model;
    }
    if let Some(model) = args.image_model {
        config.image_model = model;
    }
    if let Some(edge) = args.edge {
        config.photo_edge = edge;
    }
    if let Some(quality) = args.quality {
        config.jpeg_quality = quality;
    }

    let mut settings = PipelineSettings::from_config(&config);
    settings.out_override = args.out;
    if args.narrate {
        settings.narrate = true;
    }

    let client = config.get_api_key().map(GeminiClient::new);

    if args.plan_only {
        return run_plan_only(client, settings, args.broken, args.scrap, args.demo).await;
    }

    app::run_tui(config, settings, client, args.broken, args.scrap, args.demo).await
}

/// Drive the pipeline without the TUI: progress on stderr, the finished
/// plan boxed on stdout, non-zero exit when no plan materializes.
async fn run_plan_only(
    client: Option<GeminiClient>,
    settings: PipelineSettings,
    broken: Option<PathBuf>,
    scrap: Option<PathBuf>,
    demo: bool,
) -> Result<()> {
    let (tx, rx) = mpsc::channel();

    let task = if demo {
        tokio::spawn(pipeline::run_demo(settings.out_override.clone(), tx))
    } else {
        let (Some(broken), Some(scrap)) = (broken, scrap) else {
            bail!("--plan-only needs both photos: the broken object, then the scrap pile");
        };
        let Some(client) = client else {
            bail!("No API key found. Run `scrapsmith --setup` or set GEMINI_API_KEY.");
        };
        tokio::spawn(pipeline::run_repair(client, settings, broken, scrap, tx))
    };

    let mut plan: Option<RepairPlan> = None;
    let mut session_dir: Option<PathBuf> = None;
    let mut failure: Option<String> = None;
    let mut tokens: u64 = 0;
    let mut rendered = 0usize;
    let mut blueprints = 0usize;

    loop {
        // Read the flag before draining so nothing sent just before the
        // task finished slips past the final pass.
        let finished = task.is_finished();
        while let Ok(msg) = rx.try_recv() {
            match msg {
                BackgroundMessage::StageChanged(stage) => {
                    let phrase = match stage {
                        PipelineStage::PreparingPhotos => "preparing photos",
                        PipelineStage::ConsultingAnalyst => "consulting the analyst",
                    };
                    eprintln!("  {phrase}...");
                }
                BackgroundMessage::PlanReady {
                    session,
                    plan: ready,
                    usage,
                } => {
                    eprintln!(
                        "  plan ready: {} ({} steps)",
                        ready.title,
                        ready.steps.len()
                    );
                    if let Some(u) = usage {
                        tokens += u.total;
                    }
                    session_dir = Some(session.dir.clone());
                    plan = Some(ready);
                }
                BackgroundMessage::PlanFailed { message, .. } => {
                    failure = Some(message);
                }
                BackgroundMessage::StepArtReady {
                    step_index,
                    source,
                    usage,
                    ..
                } => {
                    tokens += usage.total;
                    if source == ArtSource::Blueprint {
                        blueprints += 1;
                        eprintln!("  step {} fell back to a blueprint", step_index + 1);
                    } else {
                        rendered += 1;
                        eprintln!("  step {} illustrated ({})", step_index + 1, source.label());
                    }
                }
                BackgroundMessage::NarrationReady {
                    step_index,
                    duration_secs,
                    usage,
                    ..
                } => {
                    tokens += usage.total;
                    eprintln!(
                        "  step {} narrated ({})",
                        step_index + 1,
                        util::format_clock(duration_secs)
                    );
                }
                BackgroundMessage::NarrationFailed {
                    step_index,
                    message,
                } => {
                    eprintln!("  step {} narration failed: {}", step_index + 1, message);
                }
                BackgroundMessage::Error(message) => eprintln!("  {message}"),
                _ => {}
            }
        }
        if finished {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    if let Err(e) = task.await {
        bail!("pipeline task crashed: {e}");
    }

    match (plan, failure) {
        (Some(plan), _) => {
            print_plan_summary(&plan, session_dir.as_deref(), rendered, blueprints, tokens);
            Ok(())
        }
        (None, Some(message)) => bail!("{message}"),
        (None, None) => bail!("pipeline ended without producing a plan"),
    }
}

const SUMMARY_WIDTH: usize = 66;

fn print_plan_summary(
    plan: &RepairPlan,
    session_dir: Option<&Path>,
    rendered: usize,
    blueprints: usize,
    tokens: u64,
) {
    let inner = SUMMARY_WIDTH - 4;
    let rule = "─".repeat(SUMMARY_WIDTH - 2);

    println!();
    println!("┌{rule}┐");
    box_line(&format!("REPAIR PLAN · {}", plan.title));
    for line in wrap_text(&plan.summary, inner) {
        box_line(&line);
    }
    println!("├{rule}┤");
    for (i, step) in plan.steps.iter().enumerate() {
        box_line(&format!(
            " {:>2}. [{}] {}",
            i + 1,
            step.action.label(),
            step.title
        ));
    }
    println!("├{rule}┤");
    box_line(&format!(
        "{} steps · {} illustrated · {} blueprint · {} tokens",
        plan.steps.len(),
        rendered,
        blueprints,
        tokens
    ));
    if let Some(dir) = session_dir {
        box_line(&format!("artifacts: {}", dir.display()));
    }
    println!("└{rule}┘");
    println!();
}

fn box_line(text: &str) {
    let inner = SUMMARY_WIDTH - 4;
    let clipped = util::truncate(text, inner);
    let pad = inner.saturating_sub(clipped.chars().count());
    println!("│ {}{} │", clipped, " ".repeat(pad));
}
