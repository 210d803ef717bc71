use clap::Parser;
use color_print::cprintln;
use std::process::ExitCode;

use m32emu::{
    hooks::{dump::Dump, trace::Trace, Hook},
    image_from_bytes, image_from_text, Config, Error, Halt, Machine,
};

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {author}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Parser, Debug)]
#[clap(author, version, about, help_template = HELP_TEMPLATE)]
struct Args {
    /// Program image
    #[arg(default_value = "main.bin")]
    input_file: String,

    /// Image is binary-string text rather than raw bytes
    #[arg(long)]
    text: bool,

    /// Step budget (overrides the config file)
    #[arg(short = 't', long)]
    tmax: Option<u64>,

    /// YAML list of addresses at which to dump state
    #[arg(short, long)]
    dump_cfg: Option<String>,

    /// Dump registers after every step
    #[arg(short = 'a', long)]
    dump_all: bool,

    /// Print every executed instruction
    #[arg(long)]
    trace: bool,

    /// Machine configuration
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn run(args: &Args) -> Result<(Machine, Halt), Error> {
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let bytes = std::fs::read(&args.input_file)
        .map_err(|e| Error::FileOpen(args.input_file.clone(), e))?;
    let image = if args.text {
        image_from_text(&String::from_utf8_lossy(&bytes))?
    } else {
        image_from_bytes(&bytes)?
    };

    let mut machine = Machine::new(&config);
    machine.load(&image)?;
    println!("| {:<45} |", args.input_file);
    println!("| {:<45} |", format!("{} words", image.len()));
    println!("+-----------------------------------------------+");

    let mut hooks: Vec<Box<dyn Hook>> = vec![Box::new(Dump::arg(
        args.dump_cfg.clone(),
        args.dump_all,
    )?)];
    if args.trace {
        hooks.push(Box::new(Trace));
    }

    println!("[INIT]");
    let budget = args.tmax.unwrap_or(config.step_budget);
    let halt = machine.run(budget, &mut hooks)?;
    Ok((machine, halt))
}

fn main() -> ExitCode {
    let args = Args::parse();
    if args.verbose {
        env_logger::init();
    }
    println!("M32 Emulator");
    println!("+-----------------------------------------------+");

    match run(&args) {
        Ok((machine, halt)) => {
            println!("=================================================");
            cprintln!(
                "<green,bold>{}</> after {} steps at pc 0x{:08X}",
                halt,
                machine.steps(),
                machine.pc()
            );
            ExitCode::from(halt.exit_code())
        }
        Err(err) => {
            cprintln!("<red,bold>error</>: {}", err);
            ExitCode::FAILURE
        }
    }
}
