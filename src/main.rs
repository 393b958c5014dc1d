use clap::Parser;
use moonlink::cli::{self, CliArgs};
use moonlink::config::{ClientConfig, format_escape_char};
use moonlink::errors::ClientResult;
use moonlink::logging::init_logging;
use moonlink::terminal::{RawModeGuard, Status, print_status};
use moonlink::{Session, SessionOptions, connect};
use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let mut config = match ClientConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {}. Using defaults.", e);
            ClientConfig::default()
        }
    };
    config.apply_args(&args);

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Logging disabled: {}", e);
    }

    match run(&args, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let mut stdout = io::stdout();
            let _ = print_status(&mut stdout, Status::Error, &e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CliArgs, config: &ClientConfig) -> ClientResult<()> {
    let mut stdout = io::stdout();
    let target = cli::resolve_target(args, config, &mut io::stdin().lock(), &mut stdout)?;

    print_status(&mut stdout, Status::Info, &format!("Trying {}...", target))?;
    let stream = connect(&target.host, target.port, config.connection.connect_timeout)?;

    let mut banner = format!("Connected to {}.", target);
    if let Some(c) = config.terminal.escape_char {
        banner.push_str(&format!(" Escape character is '{}'.", format_escape_char(Some(c))));
    }
    print_status(&mut stdout, Status::Success, &banner)?;

    let session = Session::new(stream, SessionOptions::from(&config.terminal));
    let summary = {
        let _raw = RawModeGuard::enable()?;
        session.run(io::stdin(), io::stdout())
    };

    // Stream errors end the session, not the process
    match summary {
        Ok(summary) => {
            let status = if summary.error.is_some() { Status::Error } else { Status::Info };
            print_status(&mut stdout, status, &summary.ended.to_string())?;
            if let Some(e) = &summary.error {
                print_status(&mut stdout, Status::Error, e)?;
            }
            summary.log();
            println!("{}", summary);
        }
        Err(e) => print_status(&mut stdout, Status::Error, &e.to_string())?,
    }
    stdout.flush()?;
    Ok(())
}
