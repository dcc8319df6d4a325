use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::process;

use clap::{value_t, App, Arg, ArgGroup};
use tracing::info;
use tracing_subscriber::EnvFilter;

use brainiac::{CompileError, CompileOptions, Scanner};

enum Action {
    Run,
    DumpIr,
    DumpBytecode,
}

struct Options {
    action: Action,
    output: Option<String>,
    input: String,
    compile: CompileOptions,
}

impl Options {
    fn match_options() -> Self {
        let matches = App::new("brainiac")
            .version("0.1.0")
            .author("Ian D. Scott <ian@iandouglasscott.com>")
            .about("Brainfuck bytecode compiler and virtual machine")
            .arg(
                Arg::with_name("dump_ir")
                    .long("dump-ir")
                    .help("Dump intermediate representation; for debugging"),
            )
            .arg(
                Arg::with_name("dump_bytecode")
                    .long("dump-bytecode")
                    .help("Dump disassembled bytecode instead of running it"),
            )
            .group(ArgGroup::with_name("actions").args(&["dump_ir", "dump_bytecode"]))
            .arg(
                Arg::with_name("out_name")
                    .short("o")
                    .help("Output file name for dumps")
                    .takes_value(true)
                    .empty_values(false)
                    .value_name("file"),
            )
            .arg(
                Arg::with_name("level")
                    .short("O")
                    .help("Optimization level; 0 disables the optimizer")
                    .takes_value(true)
                    .default_value("1"),
            )
            .arg(
                Arg::with_name("max_depth")
                    .long("max-depth")
                    .help("Deepest loop nesting accepted")
                    .takes_value(true)
                    .empty_values(false)
                    .default_value("64")
                    .value_name("n"),
            )
            .arg(
                Arg::with_name("FILENAME")
                    .help("Source file to run")
                    .required(true)
                    .index(1),
            )
            .get_matches();

        let action = if matches.is_present("dump_ir") {
            Action::DumpIr
        } else if matches.is_present("dump_bytecode") {
            Action::DumpBytecode
        } else {
            Action::Run
        };

        let level = value_t!(matches, "level", u32).unwrap_or_else(|e| e.exit());
        let max_loop_depth = value_t!(matches, "max_depth", usize).unwrap_or_else(|e| e.exit());

        Options {
            action,
            output: matches.value_of("out_name").map(str::to_string),
            input: matches.value_of("FILENAME").unwrap_or_default().to_string(),
            compile: CompileOptions {
                max_loop_depth,
                ..CompileOptions::with_level(level)
            },
        }
    }

    fn get_output(&self) -> &str {
        self.output.as_deref().unwrap_or("-")
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let options = Options::match_options();
    if let Err(err) = run(&options) {
        eprintln!("brainiac: {}", err);
        process::exit(1);
    }
}

fn run(options: &Options) -> Result<(), Box<dyn Error>> {
    let mut file = File::open(&options.input)?;
    let mut code = Vec::new();
    file.read_to_end(&mut code)?;

    let program = match brainiac::compile_program(Scanner::new(&code), &options.compile) {
        Ok(program) => program,
        Err(CompileError::Parse(errors)) => {
            eprintln!("{}", errors.render(&code));
            process::exit(1);
        }
        Err(err) => return Err(err.into()),
    };

    if let Action::DumpIr = options.action {
        let mut irfile = open_output_file(options.get_output())?;
        writeln!(irfile, "{:#?}", program)?;
        return Ok(());
    }

    info!("Compiling...");
    let bytecode = brainiac::generate(&program)?;

    match options.action {
        Action::DumpBytecode => {
            let mut listing = open_output_file(options.get_output())?;
            write!(listing, "{}", bytecode)?;
        }
        _ => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            brainiac::execute(&bytecode, stdin.lock(), BufWriter::new(stdout.lock()))?;
        }
    }

    Ok(())
}

fn open_output_file(name: &str) -> io::Result<Box<dyn Write>> {
    if name == "-" {
        Ok(Box::new(io::stdout()))
    } else {
        Ok(Box::new(File::create(name)?))
    }
}
