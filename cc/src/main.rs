use color_print::cprintln;
use m32cc::{driver, Config, Error};
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
    /// Source file
    #[clap(default_value = "main.c")]
    input: String,

    /// Assembly output
    #[clap(short, long, default_value = "main.s")]
    output: String,

    /// Also assemble into this binary
    #[clap(long)]
    bin: Option<String>,

    /// Memory map (YAML)
    #[clap(short, long)]
    config: Option<String>,

    /// Verbose logging
    #[clap(short, long)]
    verbose: bool,
}

fn run(args: &Args, source: &str) -> Result<(), Error> {
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    println!("  < {}", args.input);
    let asm = driver::compile(&args.input, source, config.map)?;
    println!("  > {}", args.output);
    std::fs::write(&args.output, &asm).map_err(|e| Error::FileWrite(args.output.clone(), e))?;

    if let Some(bin) = &args.bin {
        let words = m32asm::assemble(&asm)?;
        println!("  > {}", bin);
        std::fs::write(bin, m32asm::util::to_bytes(&words))
            .map_err(|e| Error::FileWrite(bin.clone(), e))?;
    }
    Ok(())
}

fn main() -> ExitCode {
    use clap::Parser;
    let args = Args::parse();
    if args.verbose {
        env_logger::init();
    }
    println!("M32 Compiler");

    let source = match std::fs::read_to_string(&args.input) {
        Ok(source) => source,
        Err(e) => {
            cprintln!("<red,bold>error</>: {}", Error::FileOpen(args.input.clone(), e));
            return ExitCode::FAILURE;
        }
    };

    match run(&args, &source) {
        Ok(()) => {
            cprintln!("<green,bold>ok</>");
            ExitCode::SUCCESS
        }
        Err(err) => {
            let lines = source.lines().collect::<Vec<_>>();
            err.print_diag(&lines);
            ExitCode::FAILURE
        }
    }
}
