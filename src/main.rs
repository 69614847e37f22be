use anyhow::{Context, Result};
use log::info;
use myshell::{BufferedLines, LineSource, Options, Readline, Shell};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode, WriteLogger};
use std::fs::File;
use std::io::BufReader;

fn init_logging(opts: &Options) -> Result<()> {
    match &opts.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            WriteLogger::init(opts.log_level, Config::default(), file)?;
        }
        None => TermLogger::init(
            opts.log_level,
            Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        )?,
    }
    Ok(())
}

fn main() -> Result<()> {
    let opts: Options = argh::from_env();
    init_logging(&opts)?;

    let config = opts.shell_config();
    let prompt = config.prompt.clone();
    let mut shell = Shell::new(config)?;
    let mut source: Box<dyn LineSource> = match (&opts.command, &opts.script) {
        (Some(line), _) => Box::new(BufferedLines::from_text(line.as_str())),
        (None, Some(path)) => {
            let file = File::open(path)
                .with_context(|| format!("opening script {}", path.display()))?;
            Box::new(BufferedLines::new(BufReader::new(file)))
        }
        (None, None) => Box::new(Readline::new(prompt)?),
    };
    info!("starting {} (interactive: {})", myshell::SHELL_NAME, opts.is_interactive());
    shell.run(source.as_mut())?;

    if opts.is_interactive() {
        return Ok(());
    }
    std::process::exit(shell.last_status());
}
