use anyhow::{Context, Result};
use clap::Parser;
use futures::stream::{self, LocalBoxStream, StreamExt};
use log::{info, warn};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tripnav::formatter::DistanceFormatter;
use tripnav::highlight::route_highlight;
use tripnav::notification::LogNotifier;
use tripnav::route_model::Route;
use tripnav::source::StreamSensor;
use tripnav::{
    driver, ArrivalState, Configuration, NavigationEvent, NavigationListener, NavigationSnapshot,
    Navigator, Position, SensorError, SourceKind, SystemClock,
};

#[derive(Parser)]
#[command(name = "tripnav")]
#[command(about = "Replays a planned transit route through the live navigation engine")]
struct Args {
    /// Route JSON file
    route: PathBuf,
    /// Partial configuration JSON file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Simulator speed multiplier
    #[arg(short, long)]
    speed: Option<f64>,
    /// Read JSON positions, one per line, from stdin instead of simulating
    #[arg(long)]
    live: bool,
    /// Write the final route highlight as GeoJSON
    #[arg(long)]
    geojson: Option<PathBuf>,
    /// How often simulator time is advanced, in milliseconds
    #[arg(long, default_value = "100")]
    resolution_ms: u64,
}

/// Logs step changes and prints every event.
#[derive(Default)]
struct LogPresenter {
    last: Option<(usize, ArrivalState)>,
}

impl NavigationListener for LogPresenter {
    fn on_update(&mut self, snapshot: &NavigationSnapshot) {
        let current = (snapshot.current_step_index, snapshot.arrival_state);
        if self.last == Some(current) {
            return;
        }
        self.last = Some(current);
        match snapshot.distance_to_target_m {
            Some(distance) => info!(
                "Step {} {:?}, {} to go",
                snapshot.current_step_index,
                snapshot.arrival_state,
                DistanceFormatter(distance)
            ),
            None => info!(
                "Step {} {:?}",
                snapshot.current_step_index, snapshot.arrival_state
            ),
        }
    }

    fn on_event(&mut self, event: &NavigationEvent) {
        println!("[{}] {}: {}", event.key(), event.title, event.message);
    }
}

fn load_config(args: &Args) -> Result<Configuration> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => Configuration::default(),
    };
    if let Some(speed) = args.speed {
        config.simulator.initial_speed = speed;
    }
    Ok(config)
}

fn stdin_readings() -> LocalBoxStream<'static, Result<Position, SensorError>> {
    let lines = BufReader::new(tokio::io::stdin()).lines();
    stream::unfold(lines, |mut lines| async move {
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => {
                    let reading = serde_json::from_str::<Position>(&line)
                        .map_err(|e| SensorError::Unavailable(format!("unreadable position: {e}")));
                    return Some((reading, lines));
                }
                Ok(None) => return None,
                Err(e) => {
                    warn!("Reading positions from stdin failed: {e}");
                    return None;
                }
            }
        }
    })
    .boxed_local()
}

async fn navigate(args: Args) -> Result<()> {
    let route = Route::from_path(&args.route)
        .with_context(|| format!("loading route {}", args.route.display()))?;
    let config = load_config(&args)?;
    info!("Loaded route with {} step(s)", route.len());

    let mut navigator = Navigator::new(
        route,
        &config,
        StreamSensor::new(),
        LogNotifier,
        Box::new(SystemClock),
    );
    navigator.subscribe(Box::new(LogPresenter::default()));

    let (preferred, readings) = if args.live {
        (SourceKind::Live, stdin_readings())
    } else {
        (SourceKind::Simulated, stream::pending().boxed_local())
    };
    navigator.start(preferred);
    if let Some(banner) = navigator.banner() {
        println!("{banner}");
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for ctrl-c: {e}");
            futures::future::pending::<()>().await;
        }
    };
    let outcome = driver::run(
        &mut navigator,
        readings,
        Duration::from_millis(args.resolution_ms.max(1)),
        shutdown,
    )
    .await;
    println!("Finished: {outcome:?}");

    if let Some(path) = &args.geojson {
        let snapshot = navigator.snapshot();
        let collection = route_highlight(navigator.route(), snapshot.as_ref());
        let text = serde_json::to_string_pretty(&collection)?;
        std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
        info!("Wrote route highlight to {}", path.display());
    }

    navigator.stop();
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(navigate(args))
}
