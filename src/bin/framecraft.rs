use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use framecraft::encode::ffmpeg::is_ffmpeg_on_path;
use framecraft::{
    Composition, CompositionDocument, ElementKind, EncodingEngine, FfmpegEngine, InMemoryEngine,
    RenderEvent, effect_names, expand_effect,
};

#[derive(Parser, Debug)]
#[command(name = "framecraft", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a composition document to MP4 (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Check a composition document without rendering.
    Validate(ValidateArgs),
    /// List effect presets and how many animation descriptors each expands to.
    Effects,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input composition JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output MP4 path (overrides the document).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Maximum scene jobs encoding at once.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Directory for intermediate scene artifacts.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Print encoder invocations instead of running `ffmpeg`.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Input composition JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Validate(args) => cmd_validate(args),
        Command::Effects => cmd_effects(),
    }
}

fn load(path: &std::path::Path) -> anyhow::Result<CompositionDocument> {
    CompositionDocument::from_path(path)
        .with_context(|| format!("load composition '{}'", path.display()))
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut doc = load(&args.in_path)?;
    if let Some(n) = args.concurrency {
        doc.options.concurrency = n;
    }
    if let Some(dir) = &args.cache_dir {
        doc.options.cache_dir = dir.clone();
    }
    if args.dry_run {
        return dry_run(doc);
    }

    let mut comp = Composition::from_document(&doc, Arc::new(FfmpegEngine::new()))?;
    if let Some(out) = &args.out {
        let out = if out.is_relative() {
            std::env::current_dir()
                .context("resolve current directory")?
                .join(out)
        } else {
            out.clone()
        };
        comp.set_output(out)?;
    }

    let events = comp.start()?;
    for ev in events {
        match ev {
            RenderEvent::Start => eprintln!("rendering {} scene(s)", comp.scenes().len()),
            RenderEvent::Progress(p) => eprintln!("progress {:>5.1}%", p * 100.0),
            RenderEvent::Complete(report) => {
                let u = &report.usage;
                eprintln!(
                    "wrote {} ({:.2}s, {} bytes) in {:.2?}: {} encoder call(s), {} cache hit(s), {} retries",
                    report.output.display(),
                    u.output_duration_secs,
                    u.output_bytes,
                    u.elapsed,
                    u.encoder_invocations,
                    u.cache_hits,
                    u.retries
                );
                return Ok(());
            }
            RenderEvent::Error(err) => return Err(err).context("render failed"),
        }
    }
    anyhow::bail!("render ended without a result")
}

/// Run the whole pipeline against the in-memory engine in a scratch directory and print every
/// encoder invocation.
fn dry_run(mut doc: CompositionDocument) -> anyhow::Result<()> {
    let scratch = std::env::temp_dir().join(format!("framecraft-dry-run-{}", std::process::id()));
    doc.options.cache_dir = scratch.join("cache");
    doc.options.output_dir = scratch.clone();
    doc.output = None;

    let engine = Arc::new(InMemoryEngine::new());
    let result = Composition::from_document(&doc, engine.clone()).and_then(|mut c| {
        script_probes(&c, &engine);
        c.render()
    });
    for inv in engine.invocations() {
        println!("[{}] ffmpeg {}", inv.label, inv.args.join(" "));
    }
    let _ = std::fs::remove_dir_all(&scratch);
    result.context("dry run failed")?;
    Ok(())
}

/// Give the in-memory engine a duration for every looping video that wraps at the source end.
///
/// Real `ffprobe` answers when it can; otherwise the probe is reported as skipped and the clip is
/// assumed to run to the end of its scene.
fn script_probes(comp: &Composition, engine: &InMemoryEngine) {
    let ffprobe = is_ffmpeg_on_path().then(FfmpegEngine::new);
    for scene in comp.scenes() {
        for element in scene.elements() {
            let ElementKind::Video(v) = element.kind() else {
                continue;
            };
            if !v.looped || v.clip_end.is_some() || v.clip_start == 0.0 {
                continue;
            }
            let probed = match &ffprobe {
                Some(real) => real.probe_duration(&v.path).map_err(|e| e.to_string()),
                None => Err("ffprobe is not on PATH".to_owned()),
            };
            let secs = probed.unwrap_or_else(|reason| {
                eprintln!(
                    "[probe] skipped '{}' ({reason}); assuming it runs to the scene end",
                    v.path.display()
                );
                v.clip_start + scene.duration()
            });
            engine.set_probe(v.path.clone(), secs);
        }
    }
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let doc = load(&args.in_path)?;
    let comp = Composition::from_document(&doc, Arc::new(InMemoryEngine::new()))?;
    framecraft::eval::timing::check_transitions(comp.scenes())?;
    println!(
        "ok: {} scene(s), {:.3}s output",
        comp.scenes().len(),
        framecraft::eval::timing::output_duration(comp.scenes())
    );
    Ok(())
}

fn cmd_effects() -> anyhow::Result<()> {
    for name in effect_names() {
        let n = expand_effect(name, 1.0, 0.0)?.len();
        println!("{name:<14} {n}");
    }
    Ok(())
}
