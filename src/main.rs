use std::process::ExitCode;

use tracing::debug;

use gator::{build_registry, Command, Config, Database, FeedFetcher, Renderer, Session, State};

const USAGE: &str = "usage: gator <command> [args...] (try `gator help`)";

#[tokio::main]
async fn main() -> ExitCode {
    let Some(cmd) = Command::from_args(std::env::args().skip(1)) else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };

    match run(cmd).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("gator: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cmd: Command) -> gator::Result<()> {
    // Load configuration
    let path = Config::default_path()?;
    let session = Session::load(&path)?;

    // Initialize logging
    let logging = &session.config().logging;
    if let Err(e) = gator::logging::init(logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        gator::logging::init_console_only(&logging.level);
    }
    debug!(config = %path.display(), "Configuration loaded");

    let database = &session.config().database;
    let db = Database::connect(&database.url, database.max_connections).await?;
    let fetcher = FeedFetcher::new(&session.config().aggregator)?;

    let mut state = State::new(db, session, fetcher, Renderer::stdout());
    let registry = build_registry();

    let result = registry.run(&mut state, cmd).await;
    state.ui.flush()?;
    result
}
