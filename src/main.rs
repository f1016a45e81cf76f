//! This module defines the main functionality of cropscan, a chilli crop disease detection client.

pub mod module; // Import the module submodule that contains other modules

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::module::define; // Import the define module that contains constants and types
use crate::module::device::camera::V4l2Camera;
use crate::module::device::library::Library;
use crate::module::device::permission::{DevicePermissions, PermissionGate, PermissionProvider};
use crate::module::device::{CapturedImage, KeepAll, MediaCapture, Review};
use crate::module::flow::{ResultRoute, ScanFlow, Source};
use crate::module::location::{LocationResolver, ResolvedLocation};
use crate::module::session::Session;
use crate::module::submit::{SubmissionResult, UploadClient};
use crate::module::util::init::{resource, AppProperty};

/// Chilli crop disease detection.
#[derive(Debug, Parser)]
#[command(name = "cropscan", version, about)]
struct Cli {
    /// Data directory (config, library and logs). Defaults to the local data directory.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Photograph a plant, upload it with the location and show the diagnosis.
    Scan {
        /// Take the photograph with the camera (default).
        #[arg(long, conflicts_with = "library")]
        camera: bool,
        /// Pick the photograph from the library. Without a file name a picker is shown.
        #[arg(long)]
        library: Option<Option<String>>,
        /// Location text to send instead of resolving the device location.
        #[arg(long)]
        location: Option<String>,
        /// Keep the camera photograph without asking.
        #[arg(short, long)]
        yes: bool,
    },
    /// Report camera, media library and location permissions.
    Permissions,
    /// Resolve and print the device location.
    Locate,
    /// List images in the library.
    Library,
}

// The main function of cropscan
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Prepare the resources by initializing the property struct
    let property = match &cli.data_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Can't create {}", dir.display()))?;
            resource::init_in(&dir.to_string_lossy())?
        }
        None => resource::init()?,
    };

    // Initialize the logging system with the log directory and the system name
    init_log(
        &property.path.dir.log,
        define::system::NAME,
        &property.conf.system.log_level,
    )?;
    log::info!("Starting cropscan..."); // Log an info message
    if property.created_conf {
        log::info!(
            "Default config written to {}",
            module::util::path::join(&[&property.path.dir.data, define::path::CONF_FILE])
        );
    }

    let client = reqwest::Client::builder()
        .user_agent(&property.conf.location.user_agent)
        .build()?;
    let session = Arc::new(Session::new(Arc::new(UploadClient::from_property(
        &property,
        client.clone(),
    )?)));
    let review: Box<dyn Review> = match &cli.command {
        Command::Scan { yes: false, .. } => Box::new(StdinReview),
        _ => Box::new(KeepAll),
    };
    let flow = build_flow(&property, client, session.clone(), review)?;

    let res = run(cli.command, &flow).await;

    // Tear the session down with the application.
    drop(flow);
    if let Ok(session) = Arc::try_unwrap(session) {
        session.close();
    }
    res
}

/// Wire the device services, the location resolver and the session together.
fn build_flow(
    property: &AppProperty,
    client: reqwest::Client,
    session: Arc<Session>,
    review: Box<dyn Review>,
) -> anyhow::Result<ScanFlow> {
    let permissions: Arc<dyn PermissionProvider> =
        Arc::new(DevicePermissions::from_property(property));
    let resolver = LocationResolver::from_property(property, permissions.clone(), client)?;
    let capture = MediaCapture::new(
        Box::new(V4l2Camera::new(property)),
        review,
        Library::new(PathBuf::from(&property.path.dir.img)),
    );
    Ok(ScanFlow::new(
        PermissionGate::new(permissions),
        resolver,
        capture,
        session,
    ))
}

async fn run(command: Command, flow: &ScanFlow) -> anyhow::Result<()> {
    match command {
        Command::Permissions => {
            let report = flow.prepare().await;
            println!("camera:        {:?}", report.camera);
            println!("media library: {:?}", report.media_library);
            println!("location:      {:?}", report.location);
        }
        Command::Locate => {
            let location = flow.locate().await.map_err(|e| anyhow!(e.user_message()))?;
            println!("{}", location.display);
        }
        Command::Library => {
            for path in flow.media().list_library().map_err(|e| anyhow!(e.to_string()))? {
                println!("{}", path.display());
            }
        }
        Command::Scan {
            library, location, ..
        } => {
            flow.prepare().await;
            let source = match library {
                Some(Some(name)) => Source::Library(Some(name)),
                Some(None) => Source::Library(pick_from_library(flow).await?),
                None => Source::Camera,
            };

            let (located, captured) = match location {
                Some(text) => (
                    Ok(flow.use_location(&text)),
                    flow.capture(&source).await,
                ),
                None => flow.locate_and_capture(&source).await,
            };
            match captured {
                Ok(_) => (),
                Err(e) if e.is_cancel() => {
                    println!("{}", e.user_message());
                    return Ok(());
                }
                Err(e) => return Err(anyhow!(e.user_message())),
            }
            let location: ResolvedLocation = located.map_err(|e| anyhow!(e.user_message()))?;

            println!("Analyzing {} ...", location.display);
            let (route, result) = flow.analyze().await.map_err(|e| anyhow!(e.user_message()))?;
            render(&route, &result, &location);
        }
    }
    Ok(())
}

/// Show the library and read a choice (number or file name). Empty input cancels.
async fn pick_from_library(flow: &ScanFlow) -> anyhow::Result<Option<String>> {
    let images = flow
        .media()
        .list_library()
        .map_err(|e| anyhow!(e.to_string()))?;
    for (i, path) in images.iter().enumerate() {
        println!("{:>3}  {}", i + 1, path.display());
    }
    println!("Select an image (empty to cancel):");

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    let choice = line.trim();
    if choice.is_empty() {
        return Ok(None);
    }
    let selection = match choice.parse::<usize>() {
        Ok(n) if (1..=images.len()).contains(&n) => images[n - 1].to_string_lossy().into_owned(),
        _ => choice.to_string(),
    };
    Ok(Some(selection))
}

/// Asks on the terminal whether to keep a fresh camera photograph.
struct StdinReview;

#[async_trait]
impl Review for StdinReview {
    async fn keep(&self, image: &CapturedImage) -> bool {
        println!("Use {}? [Y/n]", image);
        let mut line = String::new();
        match BufReader::new(tokio::io::stdin()).read_line(&mut line).await {
            Ok(_) => accepts(&line),
            Err(e) => {
                log::warn!("Can't read answer: {}", e);
                false
            }
        }
    }
}

/// Anything but an explicit no keeps the photograph.
fn accepts(answer: &str) -> bool {
    !matches!(answer.trim().to_lowercase().as_str(), "n" | "no")
}

/// Print the result screen.
fn render(route: &ResultRoute, result: &SubmissionResult, location: &ResolvedLocation) {
    println!("Image:    {}", route.image_uri);
    println!("Location: {}", location.display);
    println!(
        "Detected: {}",
        result.disease.as_deref().unwrap_or("no disease reported")
    );
    println!(
        "Solution: {}",
        result.solution.as_deref().unwrap_or("no solution reported")
    );
    if !result.image_url.is_empty() {
        println!("Stored:   {}", result.image_url);
    }
}

/// This function initializes the logger system using the log4rs crate.
///
/// # Arguments
/// * `dir` - The directory where the log file will be stored
/// * `name` - The name of the log file
/// * `level` - Level name from the config, `INFO` when not recognised
///
/// Everything at `level` goes to the file, warnings and errors also go to stderr.
fn init_log(dir: &str, name: &str, level: &str) -> anyhow::Result<()> {
    use crate::module::util::path::join;
    use log::LevelFilter;
    use log4rs::append::console::{ConsoleAppender, Target};
    use log4rs::append::file::FileAppender;
    use log4rs::config::{Appender, Config, Root};
    use log4rs::encode::pattern::PatternEncoder;
    use log4rs::filter::threshold::ThresholdFilter;

    let level = level.parse::<LevelFilter>().unwrap_or(LevelFilter::Info);

    let logfile = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d} - {l}: {m}{n}")))
        .build(join(&[dir, &format!("{}.log", name)]))?;

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{h({l}: {m}{n})}")))
        .build();

    let config = Config::builder()
        .appender(Appender::builder().build("logfile", Box::new(logfile)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Warn)))
                .build("stderr", Box::new(stderr)),
        )
        .build(
            Root::builder()
                .appender("logfile")
                .appender("stderr")
                .build(level),
        )?;
    log4rs::init_config(config)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use log::{debug, error, info, warn};
    use std::fs;

    #[test]
    fn test_log() {
        let dir = tempfile::tempdir().unwrap();
        let dir_str = dir.path().to_str().unwrap();

        init_log(dir_str, "test_log", "info").unwrap();

        debug!("Debug Message");
        info!("Info Message");
        warn!("Warning Message");
        error!("Error Message");

        let log_contents = fs::read_to_string(dir.path().join("test_log.log")).unwrap();
        assert!(!log_contents.contains("Debug Message"));
        assert!(log_contents.contains("Info Message"));
        assert!(log_contents.contains("Warning Message"));
        assert!(log_contents.contains("Error Message"));
    }

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn scan_arguments() {
        let cli = Cli::parse_from(["cropscan", "scan", "--library", "leaf.jpg"]);
        match cli.command {
            Command::Scan { library, .. } => assert_eq!(library, Some(Some("leaf.jpg".into()))),
            other => panic!("unexpected {:?}", other),
        }

        let cli = Cli::parse_from(["cropscan", "scan", "--library", "--location", "Varanasi"]);
        match cli.command {
            Command::Scan {
                library, location, ..
            } => {
                assert_eq!(library, Some(None));
                assert_eq!(location.as_deref(), Some("Varanasi"));
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(Cli::try_parse_from(["cropscan", "scan", "--camera", "--library"]).is_err());

        let cli = Cli::parse_from(["cropscan", "scan", "--camera", "-y"]);
        assert!(matches!(cli.command, Command::Scan { yes: true, .. }));
    }

    #[test]
    fn only_no_rejects_the_photo() {
        assert!(accepts("\n"));
        assert!(accepts("y\n"));
        assert!(accepts("Yes"));
        assert!(!accepts("n\n"));
        assert!(!accepts(" NO "));
    }

    #[test]
    fn flow_builds_from_default_config() {
        let tmp = tempfile::tempdir().unwrap();
        let property = resource::init_in(tmp.path().to_str().unwrap()).unwrap();
        let client = reqwest::Client::new();
        let session = Arc::new(Session::new(Arc::new(
            UploadClient::from_property(&property, client.clone()).unwrap(),
        )));
        let flow = build_flow(&property, client, session, Box::new(KeepAll)).unwrap();
        assert!(flow.media().list_library().unwrap().is_empty());
    }
}
