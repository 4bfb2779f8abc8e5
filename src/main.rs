use std::{
    fs,
    io::{self, BufWriter, Write},
    process,
};

use hookcache::{
    config::{self, Command, ReplayArgs},
    error::AppError,
    replay::{Replay, ReplayInput},
    telemetry,
};
use tracing::{Dispatch, Level, dispatcher, error};
use tracing_subscriber::fmt as tracing_fmt;

fn main() {
    if let Err(error) = run() {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    match cli_args.command {
        Command::Replay(args) => run_replay(&settings, &args),
    }
}

fn run_replay(settings: &config::Settings, args: &ReplayArgs) -> Result<(), AppError> {
    let text = fs::read_to_string(&args.file).map_err(|err| AppError::io(&args.file, err))?;
    let input: ReplayInput =
        serde_json::from_str(&text).map_err(|err| AppError::input(&args.file, err))?;

    let replay = Replay::new(&settings.cache, input.documents)?;
    let outcomes = replay.run_all(input.requests);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for outcome in &outcomes {
        serde_json::to_writer(&mut out, outcome).map_err(io::Error::from)?;
        writeln!(out)?;
    }
    if args.stats {
        writeln!(
            out,
            "{}",
            serde_json::json!({
                "cached_entries": replay.store().len(),
                "backend_calls": replay.backend_calls(),
            })
        )?;
    }
    out.flush()?;
    Ok(())
}
