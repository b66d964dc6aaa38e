use std::fs::File;
use std::io::BufWriter;

use tracing::info;
use tracing_subscriber::EnvFilter;

use rps_arena::config::SimConfig;
use rps_arena::game::render::{FrameSink, JsonLinesSink, NullSink};
use rps_arena::game::scheduler::FrameScheduler;

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("RPS Arena v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = SimConfig::load_or_default();
    config.validate()?;
    info!(
        "Configuration loaded: {}x{} board, {} per kind, {} FPS, mode={}",
        config.board_width,
        config.board_height,
        config.objects_per_kind,
        config.desired_fps,
        config.movement_mode
    );

    let mut sink: Box<dyn FrameSink> = match &config.frame_output {
        Some(path) => {
            info!("Streaming frames to {}", path.display());
            Box::new(JsonLinesSink::new(BufWriter::new(File::create(path)?)))
        }
        None => Box::new(NullSink),
    };

    let mut scheduler = FrameScheduler::new(&config)?;
    scheduler.control_handle().start();

    let summary = scheduler.run(sink.as_mut(), config.max_ticks)?;
    let [rock, paper, scissor] = summary.population;
    info!(
        "Finished: {:?} after {} ticks (rock {}, paper {}, scissor {}), {:.1} FPS observed",
        summary.outcome, summary.ticks, rock, paper, scissor, summary.observed_fps
    );

    Ok(())
}
