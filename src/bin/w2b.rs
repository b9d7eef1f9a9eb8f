//! w2b CLI - wiki-style markup to LaTeX/Beamer converter

use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Read, Write};
use std::process;

use wikibeamer::{
    convert_to_beamer, include_file_recursive, join_lines, munge_input_lines, ConversionError,
    ConversionResult, FileCache,
};

#[derive(Parser)]
#[command(name = "w2b")]
#[command(version)]
#[command(
    about = "Wikibeamer - wiki-style markup to LaTeX/Beamer converter",
    long_about = None
)]
struct Cli {
    /// Input files (reads from stdin when none are given and input is
    /// piped)
    input_files: Vec<String>,

    /// Write output to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<String>,
}

/// Exit code for a usage error; file-read and syntax errors use the codes
/// from `ConversionError::exit_code`.
const EXIT_USAGE: i32 = -1;

fn gather_input(cli: &Cli, cache: &mut FileCache) -> ConversionResult<Vec<String>> {
    let mut input_files = Vec::new();

    if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        let raw: Vec<String> = buffer.lines().map(|l| l.to_string()).collect();
        cache.add_lines("stdin", join_lines(&raw));
        input_files.push("stdin".to_string());
    }
    input_files.extend(cli.input_files.iter().cloned());

    let mut lines = Vec::new();
    for file in &input_files {
        lines.extend(include_file_recursive(file, cache)?);
    }
    Ok(munge_input_lines(&lines))
}

fn print_result(lines: &[String], output: &Option<String>) -> ConversionResult<()> {
    let mut sink: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path).map_err(|_| {
            ConversionError::io(format!("Cannot write file: {}", path))
        })?)),
        None => Box::new(io::stdout().lock()),
    };
    for line in lines {
        writeln!(sink, "{}", line)?;
    }
    sink.flush()?;
    Ok(())
}

fn run(cli: &Cli) -> ConversionResult<()> {
    let mut cache = FileCache::new();
    let lines = gather_input(cli, &mut cache)?;
    let converted = convert_to_beamer(&lines)?;
    print_result(&converted, &cli.output)
}

fn main() {
    let cli = Cli::parse();

    if cli.input_files.is_empty() && io::stdin().is_terminal() {
        eprintln!("You supplied no files to convert!");
        process::exit(EXIT_USAGE);
    }

    if let Err(err) = run(&cli) {
        eprintln!("{}", err);
        process::exit(err.exit_code());
    }
}
