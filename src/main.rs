use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use treelox as lox;

use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Emit tokens as JSON objects, one per line
        #[arg(long)]
        json: bool,
    },

    /// Runs a Lox program from a file, or starts a REPL without one
    Run { filename: Option<PathBuf> },
}

/// Reads the contents of a file into a Vec<u8>
fn read_file(filename: &PathBuf) -> Result<Vec<u8>> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Configure env_logger to write to file with module path and source line
    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("treelox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Scan, parse, resolve, and interpret one source buffer against a
/// persistent interpreter.  Returns the process exit code on failure:
/// 65 for static (lex/parse/resolve) errors, 70 for runtime errors.
/// Static errors are all reported before giving up; execution never
/// starts if any occurred.
fn run(interpreter: &mut Interpreter, source: &[u8]) -> Option<i32> {
    let (tokens, lex_errors) = Scanner::new(source).scan_all();
    if !lex_errors.is_empty() {
        for e in &lex_errors {
            debug!("Lex error: {}", e);
            eprintln!("{}", e);
        }
        return Some(65);
    }

    let mut parser = Parser::new(&tokens);
    let statements = match parser.parse() {
        Ok(statements) => statements,
        Err(errors) => {
            for e in &errors {
                debug!("Parse error: {}", e);
                eprintln!("{}", e);
            }
            return Some(65);
        }
    };

    if let Err(errors) = Resolver::new(interpreter).resolve(&statements) {
        for e in &errors {
            debug!("Resolve error: {}", e);
            eprintln!("{}", e);
        }
        return Some(65);
    }

    if let Err(e) = interpreter.interpret(&statements) {
        debug!("Runtime error: {}", e);
        eprintln!("{}", e);
        return Some(70);
    }

    None
}

/// Interactive prompt.  One interpreter lives across inputs, so globals,
/// functions, and classes persist; errors of any kind leave the loop alive.
fn run_prompt() -> Result<()> {
    let mut interpreter = Interpreter::new();
    let stdin = io::stdin();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF
            return Ok(());
        }

        let _ = run(&mut interpreter, line.as_bytes());
    }
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => {
            info!("Running Tokenize subcommand");
            let buf = read_file(&filename)?;
            let mut tokenized = true;

            for token in Scanner::new(&buf) {
                match token {
                    Ok(token) => {
                        debug!("Scanned token: {}", token);
                        if json {
                            let line = serde_json::to_string(&token)
                                .context("Failed to serialize token")?;
                            println!("{}", line);
                        } else {
                            println!("{}", token);
                        }
                    }

                    Err(e) => {
                        tokenized = false;
                        debug!("Tokenization error: {}", e);
                        eprintln!("{}", e);
                    }
                }
            }

            if !tokenized {
                debug!("Tokenization failed, exiting with code 65");
                std::process::exit(65);
            }

            info!("Tokenization completed successfully");
        }

        Commands::Run { filename } => match filename {
            Some(filename) => {
                info!("Running Run subcommand on {:?}", filename);
                let buf = read_file(&filename)?;
                let mut interpreter = Interpreter::new();

                if let Some(code) = run(&mut interpreter, &buf) {
                    std::process::exit(code);
                }
            }

            None => {
                info!("No filepath provided, starting REPL");
                run_prompt()?;
            }
        },
    }

    Ok(())
}
