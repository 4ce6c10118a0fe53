use anyhow::Context;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;

use captcha_pipeline::api::{self, AppState};
use captcha_pipeline::config::{Cli, Command, ServeArgs};
use captcha_pipeline::engine::{OcrsEngine, TemplateSlideMatcher, ocr};
use captcha_pipeline::logging;
use captcha_pipeline::processing::{ColorSpec, codec, color, split};
use captcha_pipeline::{CaptchaPipeline, ImageBytes};

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    logging::init(&args.log_level, &args.log_file)?;

    match args.command {
        None => serve(&args.serve),
        Some(Command::Split {
            image_path,
            y,
            out_dir,
        }) => split_file(&image_path, y, &out_dir),
        Some(Command::Isolate {
            image_path,
            colors,
            output,
        }) => isolate_file(&image_path, &colors, &output),
    }
}

fn serve(args: &ServeArgs) -> anyhow::Result<()> {
    let model_dir = match &args.model_dir {
        Some(dir) => dir.clone(),
        None => ocr::default_model_dir()?,
    };

    let engine = Arc::new(OcrsEngine::load(&model_dir)?);
    let pipeline = CaptchaPipeline::new(
        engine.clone(),
        engine,
        Arc::new(TemplateSlideMatcher::new()),
    );

    tracing::info!("Starting captcha-pipeline v{}", env!("CARGO_PKG_VERSION"));

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(api::serve(AppState::new(pipeline), args.addr()))
}

fn read_image(path: &Path) -> anyhow::Result<ImageBytes> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(ImageBytes::new(bytes))
}

fn split_file(image_path: &Path, y: i64, out_dir: &Path) -> anyhow::Result<()> {
    let image = read_image(image_path)?;
    let img = codec::decode(&image)?;
    let (upper, lower) = split::split_image(&img, y)?;

    std::fs::create_dir_all(out_dir)?;
    for (name, part) in [("sliding.png", &upper), ("back.png", &lower)] {
        let path = out_dir.join(name);
        std::fs::write(&path, codec::encode_png(part)?.as_slice())?;
        println!("{} ({}x{})", path.display(), part.width(), part.height());
    }

    Ok(())
}

fn isolate_file(image_path: &Path, colors: &[String], output: &Path) -> anyhow::Result<()> {
    let image = read_image(image_path)?;
    let specs: Vec<ColorSpec> = colors.iter().map(|c| ColorSpec::from(c.as_str())).collect();

    for spec in &specs {
        if spec.range().is_none() {
            tracing::warn!(?spec, "unknown colour skipped");
        }
    }

    let filtered = color::isolate(&image, &specs);
    std::fs::write(output, filtered.as_slice())?;
    println!("{}", output.display());

    Ok(())
}
