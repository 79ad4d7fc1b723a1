use clap::{ArgAction, Parser};
use hexbugs_core::engine::Engine;
use hexbugs_core::params::Params;
use memory_stats::memory_stats;
use std::{
    fmt, io,
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
    sync::Arc,
    time::{Duration, Instant, SystemTime},
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
enum Args {
    New(NewCommand),
    Load(LoadCommand),
}

/// Genesis-seeds a fresh engine and runs it until stopped.
#[derive(Parser)]
struct NewCommand {
    #[arg(short, long)]
    seed: u64,
    /// Number of ticks to run. Runs until Ctrl-C if omitted.
    #[arg(short, long)]
    ticks: Option<u64>,
    /// If true, continuously checks memory in another thread and panics if it reaches maximum.
    #[arg(long, action = ArgAction::Set, default_value = "true")]
    check_memory_usage: bool,
}

/// Resumes a simulation from a JSON snapshot saved by this binary.
#[derive(Parser)]
struct LoadCommand {
    file: PathBuf,
    #[arg(short, long)]
    ticks: Option<u64>,
    #[arg(long, action = ArgAction::Set, default_value = "true")]
    check_memory_usage: bool,
}

/// Construction-time failure: a snapshot file couldn't be read or parsed.
/// No `thiserror`/`anyhow` here, just a plain manual impl.
#[derive(Debug)]
enum LoadError {
    Io(io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "couldn't read snapshot file: {e}"),
            LoadError::Parse(e) => write!(f, "couldn't parse snapshot json: {e}"),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<io::Error> for LoadError {
    fn from(e: io::Error) -> Self {
        LoadError::Io(e)
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(e: serde_json::Error) -> Self {
        LoadError::Parse(e)
    }
}

fn load_snapshot(path: &PathBuf) -> Result<Engine, LoadError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn save_snapshot(engine: &Engine) {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let save_path = exe_dir.join(format!("save_{now}_tick{}.json", engine.today()));
    println!("Saving into: {:?}", save_path);
    match serde_json::to_string_pretty(engine) {
        Ok(json) => {
            if let Err(e) = std::fs::write(&save_path, json) {
                eprintln!("failed to write snapshot: {e}");
            }
        }
        Err(e) => eprintln!("failed to serialize snapshot: {e}"),
    }
}

fn spawn_memory_watchdog() {
    std::thread::spawn(|| loop {
        if let Some(usage) = memory_stats() {
            if usage.physical_mem > 1024 * 1024 * 1024 {
                panic!("Current memory usage exceeds limit: {:?}", usage);
            }
        } else {
            panic!("Couldn't get the current memory usage");
        }
        std::thread::sleep(Duration::from_secs(1));
    });
}

fn main() {
    let args = Args::parse();

    let (mut engine, ticks, check_memory_usage) = match args {
        Args::New(command) => {
            println!("Run simulation with seed: {}", command.seed);
            (
                Engine::new(command.seed, Params::default()),
                command.ticks,
                command.check_memory_usage,
            )
        }
        Args::Load(command) => {
            println!("Run simulation from file: {:?}", command.file);
            match load_snapshot(&command.file) {
                Ok(engine) => (engine, command.ticks, command.check_memory_usage),
                Err(e) => {
                    eprintln!("error loading snapshot: {e}");
                    std::process::exit(1);
                }
            }
        }
    };

    if let Some(ticks) = ticks {
        println!("Running for {ticks} ticks");
    }
    println!("Check memory usage: {}", check_memory_usage);

    if check_memory_usage {
        spawn_memory_watchdog();
    }

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        let _ = ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst));
    }

    let mut last_log_instant = Instant::now();
    let mut last_save_instant = Instant::now();
    let mut ran = 0u64;

    while engine.world().len() > 0 && !stop.load(Ordering::SeqCst) {
        engine.tick();
        ran += 1;

        let now = Instant::now();
        if now - last_log_instant > Duration::from_secs(5) {
            let stats = engine.latest_stats();
            println!(
                "tick {}, population: {}, avgweight: {:.2}, avgfood: {:.2}, starvations: {}, births: {}",
                engine.today(),
                engine.world().len(),
                stats.avgweight as f64 / 1024.0,
                stats.avgfood as f64 / 1024.0,
                stats.starvations,
                stats.births,
            );
            for d in engine.diagnostics() {
                println!("  diagnostic: {d}");
            }
            last_log_instant = now;
        }

        if now - last_save_instant > Duration::from_secs(60 * 5) {
            save_snapshot(&engine);
            last_save_instant = now;
        }

        if let Some(limit) = ticks {
            if ran >= limit {
                save_snapshot(&engine);
                break;
            }
        }
    }

    if stop.load(Ordering::SeqCst) {
        println!("Interrupted, saving final snapshot");
        save_snapshot(&engine);
    }
}
