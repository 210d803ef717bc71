use color_print::cprintln;
use indexmap::IndexMap;
use m32asm::{util, Assembler, Error, Word};
use std::process::ExitCode;

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {author}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, clap::Parser)]
#[clap(author, version, about, help_template = HELP_TEMPLATE)]
struct Args {
    /// Input files, assembled in order as one program
    #[clap(default_value = "main.s")]
    input: Vec<String>,

    /// Output file
    #[clap(short, long, default_value = "main.bin")]
    output: String,

    /// Write binary-string text instead of raw bytes
    #[clap(long)]
    text: bool,

    /// Dump assembly listing
    #[clap(short, long)]
    dump: bool,

    /// Verbose logging
    #[clap(short, long)]
    verbose: bool,
}

fn read_files(paths: &[String]) -> Result<IndexMap<String, Vec<String>>, (String, Error)> {
    let mut files = IndexMap::new();
    for path in paths {
        let lines = util::read_source(path).map_err(|e| (path.clone(), e))?;
        files.insert(path.clone(), lines);
    }
    Ok(files)
}

/// Returns the words and the end address of each file's code.
fn run(
    args: &Args,
    files: &IndexMap<String, Vec<String>>,
) -> Result<(Vec<Word>, Vec<u32>), (String, Error)> {
    let mut asm = Assembler::new();
    let mut ends = vec![];
    for (path, lines) in files {
        println!("  < {}", path);
        for (idx, line) in lines.iter().enumerate() {
            asm.feed(idx + 1, line).map_err(|e| (path.clone(), e))?;
        }
        ends.push(asm.pc());
    }
    let last = files.keys().last().cloned().unwrap_or_default();
    let words = asm.finish().map_err(|e| (last, e))?;

    println!("  > {}", &args.output);
    let out = if args.text {
        util::to_bin_text(&words).into_bytes()
    } else {
        util::to_bytes(&words)
    };
    util::write_output(&args.output, &out).map_err(|e| (args.output.clone(), e))?;
    Ok((words, ends))
}

fn main() -> ExitCode {
    use clap::Parser;

    let args = Args::parse();
    if args.verbose {
        env_logger::init();
    }
    println!("M32 Assembler");

    let files = match read_files(&args.input) {
        Ok(files) => files,
        Err((_, err)) => {
            cprintln!("<red,bold>error</>: {}", err);
            return ExitCode::FAILURE;
        }
    };

    match run(&args, &files) {
        Ok((words, ends)) => {
            if args.dump {
                // Lines are numbered per file, so split the words back by address.
                let mut by_file: IndexMap<String, Vec<Word>> = IndexMap::new();
                for (path, end) in files.keys().zip(ends) {
                    let here = words.iter().filter(|w| w.addr < end).count();
                    let done: usize = by_file.values().map(Vec::len).sum();
                    by_file.insert(path.clone(), words[done..here].to_vec());
                }
                util::print_dump(&files, &by_file);
            }
            cprintln!("<green,bold>ok</>: {} words", words.len());
            ExitCode::SUCCESS
        }
        Err((path, err)) => {
            err.print_diag(&files, &path);
            ExitCode::FAILURE
        }
    }
}
