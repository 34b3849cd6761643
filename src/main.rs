use clap::Parser;
use dirs::home_dir;
use log::{debug, info};
use nu_ansi_term::{Color, Style};
use reedline::{DefaultHinter, FileBackedHistory, Reedline, Signal};
use rmonkey::{
    ast::Statement,
    cli::{Args, Commands},
    environment::Environment,
    error::{Error, Result},
    object::Object,
    parse,
    repl::{REPLPrompt, REPLValidator, SyntaxHighlighter},
    runtime::Evaluator,
    tokenizer::tokenize,
};
use std::{fs, path::PathBuf, process::ExitCode};

fn evaluator(max_steps: Option<usize>) -> Evaluator {
    let evaluator = Evaluator::new(Environment::root());
    match max_steps {
        Some(limit) => evaluator.with_step_limit(limit),
        None => evaluator,
    }
}

fn run_file(file: PathBuf, max_steps: Option<usize>) -> Result<()> {
    let source = fs::read_to_string(file)?;
    let program = parse(&source)?;

    match evaluator(max_steps).eval(&program) {
        Object::Error(message) => Err(Error::Runtime { message }),
        value => {
            println!("{}", value.inspect());
            Ok(())
        }
    }
}

fn check_file(file: PathBuf, show_tokens: bool) -> Result<()> {
    let source = fs::read_to_string(file)?;

    if show_tokens {
        for token in tokenize(&source) {
            println!("{:>4} {}", token.line, token);
        }
    }

    let program = parse(&source)?;
    println!("{}", program);

    Ok(())
}

fn run_repl(max_steps: Option<usize>) -> Result<()> {
    let mut line_editor = Reedline::create()
        .with_hinter(Box::new(
            DefaultHinter::default().with_style(Style::new().italic().fg(Color::LightGray)),
        ))
        .with_highlighter(Box::new(SyntaxHighlighter))
        .with_validator(Box::new(REPLValidator));

    // Add file-backed history if possible
    if let Some(history) = home_dir()
        .map(|home| home.join(".rmonkey_history"))
        .and_then(|path| FileBackedHistory::with_file(100, path).ok())
        .map(Box::new)
    {
        line_editor = line_editor.with_history(history);
    } else {
        eprintln!("NOTE: Failed to load history. Persistence is now disabled.")
    }

    let prompt = REPLPrompt;
    let mut evaluator = evaluator(max_steps);

    loop {
        match line_editor.read_line(&prompt)? {
            Signal::Success(buffer) => {
                let program = match parse(&buffer) {
                    Ok(program) => program,
                    Err(err) => {
                        eprintln!("{}", err);
                        continue;
                    }
                };

                let value = evaluator.eval(&program);
                let silent = matches!(
                    program.statements.last(),
                    None | Some(Statement::Let { .. })
                );
                if value.is_error() || !silent {
                    println!("{}", value.inspect());
                }
            }
            Signal::CtrlD | Signal::CtrlC => {
                break Ok(());
            }
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let result = match args.command {
        Commands::Run { file, max_steps } => {
            info!("FILE MODE");
            debug!("file: {:?}", file);
            debug!("max steps: {:?}", max_steps);

            run_file(file, max_steps)
        }
        Commands::Check { file, tokens } => {
            info!("CHECK MODE");
            debug!("file: {:?}", file);

            check_file(file, tokens)
        }
        Commands::Repl { max_steps } => {
            info!("REPL MODE");

            run_repl(max_steps)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
