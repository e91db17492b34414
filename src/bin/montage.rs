use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "montage", version)]
struct Cli {
    /// Log verbosity: -v info, -vv debug, -vvv trace.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the resolved schedule as JSON.
    Resolve(ResolveArgs),
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Render an MP4 video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Write the mixed audio as raw interleaved stereo f32le.
    Audio(AudioArgs),
}

#[derive(Parser, Debug)]
struct ResolveArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Render chunks of frames on a worker pool.
    #[arg(long)]
    parallel: bool,

    /// Worker count for `--parallel`.
    #[arg(long)]
    threads: Option<usize>,

    /// Frames per parallel chunk.
    #[arg(long)]
    chunk_size: Option<usize>,
}

#[derive(Parser, Debug)]
struct AudioArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output raw PCM path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Resolve(args) => cmd_resolve(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
        Command::Audio(args) => cmd_audio(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_resolve(args: ResolveArgs) -> anyhow::Result<()> {
    let project = montage::load_project(&args.in_path)?;
    let schedule = montage::resolve(&project.graph)?;
    let json = serde_json::to_string_pretty(&schedule).context("serialize schedule")?;
    println!("{json}");
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let session = montage::load_project(&args.in_path)?.session()?;
    let frame = session.render_frame(montage::FrameIndex(args.frame))?;

    montage::ensure_parent_dir(&args.out)?;
    image::save_buffer_with_format(
        &args.out,
        &frame.to_straight(),
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut project = montage::load_project(&args.in_path)?;
    if args.parallel {
        project.render.parallel = true;
    }
    if let Some(n) = args.threads {
        project.render.threads = Some(n);
    }
    if let Some(n) = args.chunk_size {
        project.render.chunk_size = n;
    }
    let session = project.session()?;

    let range = montage::FrameRange::new(
        montage::FrameIndex(0),
        montage::FrameIndex(session.frame_count()),
    )?;
    let mut sink = montage::FfmpegSink::new(montage::FfmpegSinkOpts::new(&args.out));
    let stats = session.render_range(range, &mut sink, &montage::CancelToken::new())?;

    tracing::info!(frames = stats.frames_rendered, "render finished");
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_audio(args: AudioArgs) -> anyhow::Result<()> {
    let session = montage::load_project(&args.in_path)?.session()?;
    let mix = session.mix_audio();
    montage::ensure_parent_dir(&args.out)?;
    montage::write_f32le_file(&mix, &args.out)?;

    eprintln!(
        "wrote {} ({} Hz, {} ch, {} frames)",
        args.out.display(),
        mix.sample_rate,
        mix.channels,
        mix.frames()
    );
    Ok(())
}
