use anyhow::{bail, Context};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use viewport_units_buggyfill::core::dom::IE9_APP_VERSION;
use viewport_units_buggyfill::{
    BuggyfillConfig, EventSystem, InitOutcome, MemoryDocument, ViewportSize, ViewportUnitsBuggyfill,
};

#[derive(Debug, Clone)]
struct AppConfig {
    files: Vec<PathBuf>,
    width: f64,
    height: f64,
    app_version: String,
    force: bool,
    config_path: Option<PathBuf>,
    log_level: Level,
}

impl AppConfig {
    fn from_args() -> anyhow::Result<Self> {
        let args: Vec<String> = env::args().skip(1).collect();
        Self::parse(&args)
    }

    fn parse(args: &[String]) -> anyhow::Result<Self> {
        let mut config = Self::default();
        let mut args = args.iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--width" => config.width = parse_dimension("--width", flag_value("--width", args.next())?)?,
                "--height" => config.height = parse_dimension("--height", flag_value("--height", args.next())?)?,
                "--app-version" => config.app_version = flag_value("--app-version", args.next())?.clone(),
                "--config" => config.config_path = Some(PathBuf::from(flag_value("--config", args.next())?)),
                "--force" => config.force = true,
                "--debug" => config.log_level = Level::DEBUG,
                "--trace" => config.log_level = Level::TRACE,
                flag if flag.starts_with("--") => bail!("unknown flag {}", flag),
                file => config.files.push(PathBuf::from(file)),
            }
        }

        Ok(config)
    }

    fn buggyfill_config(&self) -> anyhow::Result<BuggyfillConfig> {
        let mut config = match &self.config_path {
            Some(path) => BuggyfillConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => BuggyfillConfig::default(),
        };
        config.force |= self.force;
        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            width: 1024.0,
            height: 768.0,
            app_version: IE9_APP_VERSION.to_string(),
            force: false,
            config_path: None,
            log_level: Level::INFO,
        }
    }
}

fn flag_value<'a>(flag: &str, value: Option<&'a String>) -> anyhow::Result<&'a String> {
    match value {
        Some(value) => Ok(value),
        None => bail!("{} expects a value", flag),
    }
}

fn parse_dimension(flag: &str, value: &str) -> anyhow::Result<f64> {
    value
        .parse()
        .with_context(|| format!("{} expects a number, got {:?}", flag, value))
}

fn setup_logging(level: Level) -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("setting tracing subscriber")?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let app_config = AppConfig::from_args()?;

    setup_logging(app_config.log_level)?;

    if app_config.files.is_empty() {
        bail!("usage: viewport-units-buggyfill [--width N] [--height N] [--app-version S] [--force] [--config FILE] [--debug|--trace] FILE...");
    }

    let document = Arc::new(MemoryDocument::new(
        app_config.app_version.clone(),
        ViewportSize::new(app_config.width, app_config.height),
    ));

    for path in &app_config.files {
        let css = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        document.append_style(&css);
    }

    let buggyfill = ViewportUnitsBuggyfill::new(Arc::clone(&document), Arc::new(EventSystem::new()));

    match buggyfill.initialize(&app_config.buggyfill_config()?)? {
        InitOutcome::NotApplicable => {
            info!("Environment is not affected, pass --force to rewrite anyway");
        }
        _ => {
            if let Some(node) = buggyfill.style_node() {
                println!("{}", document.style_text(node).unwrap_or_default());
            }
        }
    }

    Ok(())
}
