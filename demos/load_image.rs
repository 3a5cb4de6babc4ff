//! Load images with every concurrency mode
//!
//! Fetches a single painting once per mode, then shows a small gallery as a
//! promise chain. Set `RUST_LOG=pixfetch=debug` for more detail.
//!
//! ```bash
//! cargo run --example load_image
//! ```

use pixfetch::{ConcurrencyMode, Config, DisplayTarget, Event, Pipeline, RunId};
use std::time::Instant;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

const SCREAM: &str = "http://www.ibiblio.org/wm/paint/auth/munch/munch.scream.jpg";

const GALLERY: [&str; 4] = [
    "https://upload.wikimedia.org/wikipedia/commons/thumb/e/ea/Van_Gogh_-_Starry_Night_-_Google_Art_Project.jpg/2560px-Van_Gogh_-_Starry_Night_-_Google_Art_Project.jpg",
    "https://upload.wikimedia.org/wikipedia/commons/thumb/d/d7/Meisje_met_de_parel.jpg/1920px-Meisje_met_de_parel.jpg",
    "https://upload.wikimedia.org/wikipedia/commons/thumb/e/ec/Mona_Lisa%2C_by_Leonardo_da_Vinci%2C_from_C2RMF_retouched.jpg/1449px-Mona_Lisa%2C_by_Leonardo_da_Vinci%2C_from_C2RMF_retouched.jpg",
    "https://upload.wikimedia.org/wikipedia/commons/thumb/4/40/The_Kiss_-_Gustav_Klimt_-_Google_Cultural_Institute.jpg/1076px-The_Kiss_-_Gustav_Klimt_-_Google_Cultural_Institute.jpg",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pixfetch=info")),
        )
        .init();

    let pipeline = Pipeline::new(Config::default())?;
    let target = DisplayTarget::new("canvas");

    let mut events = pipeline.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::Displayed {
                    run, width, height, ..
                } => println!("[{run}] displayed {width}x{height}"),
                Event::FetchFailed { run, error, .. } => println!("[{run}] fetch failed: {error}"),
                Event::DecodeFailed { run, error, .. } => println!("[{run}] decode failed: {error}"),
                Event::ChainFailed { run, stage, error } => {
                    println!("[{run}] sequence stopped at stage {stage}: {error}")
                }
                Event::ChainFinished { run, stages } => {
                    println!("[{run}] sequence finished after {stages} images")
                }
                _ => {}
            }
        }
    });

    for mode in [
        ConcurrencyMode::Blocking,
        ConcurrencyMode::BackgroundSingle,
        ConcurrencyMode::BackgroundPool,
        ConcurrencyMode::PromiseChain,
    ] {
        let mut outcome = pipeline.subscribe();
        let start = Instant::now();
        let run = pipeline
            .load_and_display(pipeline.request(SCREAM)?, &target, mode)
            .await?;
        println!("{mode}: returned after {:?}", start.elapsed());

        wait_for_outcome(&mut outcome, run).await;
        println!("{mode}: finished after {:?}", start.elapsed());
    }

    let requests = GALLERY
        .iter()
        .map(|url| pipeline.request(url))
        .collect::<Result<Vec<_>, _>>()?;
    let sequence = pipeline.display_sequence(requests, &target)?;
    println!("gallery outcome: {:?}", sequence.finished().await);

    pipeline.shutdown().await;
    Ok(())
}

/// Wait until `run` has displayed its image or reported a failure
async fn wait_for_outcome(events: &mut broadcast::Receiver<Event>, run: RunId) {
    while let Ok(event) = events.recv().await {
        match event {
            Event::Displayed { run: r, .. }
            | Event::FetchFailed { run: r, .. }
            | Event::DecodeFailed { run: r, .. }
            | Event::Superseded { run: r, .. }
                if r == run =>
            {
                return;
            }
            _ => {}
        }
    }
}
