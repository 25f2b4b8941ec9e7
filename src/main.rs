extern crate clap;
#[macro_use] extern crate log;
extern crate fern;
extern crate chrono;
extern crate term_grid;

pub mod translator;

use clap::{Arg, ArgMatches, App};
use term_grid::{Grid, GridOptions, Direction, Filling, Cell};

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use translator::emitter::Emitter;
use translator::error::TranslateError;
use translator::reader::{self, Reader};

const SOURCE_EXTENSION: &str = "vm";
const OUTPUT_EXTENSION: &str = "asm";

fn main() {
    let args = process_arguments();
    initialize_logging(args.occurrences_of("verbose"));

    debug!("Arguments:\n\tVerbosity: {}\n\tComments: {}\n\tNo Bootstrap: {}\n\tOutfile: {}\n\tInput: {}",
        match args.occurrences_of("verbose") {
            0 => log::LevelFilter::Error.to_string(),
            1 => log::LevelFilter::Warn.to_string(),
            2 => log::LevelFilter::Info.to_string(),
            3 => log::LevelFilter::Debug.to_string(),
            _ => log::LevelFilter::Trace.to_string(),
        },
        args.is_present("comments"),
        args.is_present("no-bootstrap"),
        args.value_of("output").unwrap_or("None"),
        args.value_of("INPUT").unwrap()
    );

    let ipath = Path::new(args.value_of("INPUT").unwrap());

    let sources = match discover_sources(ipath) {
        Err(err) => {
            error!("fatal: {}", err);
            std::process::exit(1);
        },
        Ok(sources) => sources,
    };

    let options = Options {
        bootstrap: ipath.is_dir() && !args.is_present("no-bootstrap"),
        comments: args.is_present("comments"),
    };

    let opath = match args.value_of("output") {
        Some(filename) => PathBuf::from(filename),
        None => output_path(ipath),
    };

    let ofile = match File::create(&opath) {
        Err(err) => {
            error!("fatal: unable to open output file `{}`: {}", opath.display(), err);
            std::process::exit(1);
        },
        Ok(file) => file,
    };

    let mut listing = Vec::new();
    // `translate` has already reported the failure with its location.
    if translate(&sources, BufWriter::new(ofile), &options, &mut listing).is_err() {
        error!("Stopped translation; `{}` was not written.", opath.display());
        // A partial output file is never usable.
        if let Err(err) = fs::remove_file(&opath) {
            warn!("unable to remove partial output file `{}`: {}", opath.display(), err);
        }
        std::process::exit(1);
    }
    info!("wrote {} module(s) to `{}`", sources.len(), opath.display());

    if args.is_present("print-debug") {
        let mut grid = Grid::new(GridOptions {
            filling:     Filling::Spaces(1),
            direction:   Direction::LeftToRight,
        });

        for entry in listing.iter() {
            grid.add(Cell::from(format!("0x{:04X}:", entry.address)));
            grid.add(Cell::from(format!("{}:{}", entry.module, entry.line)));
            grid.add(Cell::from("=>".to_string()));
            grid.add(Cell::from(entry.text.clone()));
        }

        println!("{}", grid.fit_into_columns(4));
    }
}

struct Options {
    /// Write the bootstrap before the first module.
    bootstrap: bool,
    /// Echo every VM command into the output as a comment.
    comments: bool,
}

/// Where a VM command landed in the output.
struct Listing {
    address: usize,
    module: String,
    line: usize,
    text: String,
}

/// Translates every source, in order, into one output stream.
fn translate<W: Write>(sources: &[PathBuf], writer: W, options: &Options, listing: &mut Vec<Listing>)
    -> Result<(), TranslateError> {
    let mut emitter = Emitter::new(writer);

    if options.bootstrap {
        if options.comments {
            emitter.comment("bootstrap").map_err(write_failed)?;
        }
        emitter.bootstrap().map_err(write_failed)?;
    }

    for source in sources {
        let module = match module_name(source) {
            Some(module) => module,
            None => {
                let reason = format!("`{}` does not name a valid module", source.display());
                error!("{}", reason);
                return Err(io::Error::new(io::ErrorKind::InvalidInput, reason).into());
            },
        };
        let ifile = match File::open(source) {
            Err(err) => {
                error!("unable to open input file `{}`: {}", source.display(), err);
                return Err(err.into());
            },
            Ok(file) => file,
        };

        info!("translating `{}` as module `{}`", source.display(), module);
        emitter.set_module(module);

        let mut reader = Reader::new(ifile);
        while let Some(statement) = reader.next() {
            let result = statement.and_then(|statement| {
                trace!("{}:{}: {} `{}`", module, statement.line, statement.instruction.kind(), statement.text);
                listing.push(Listing {
                    address: emitter.address(),
                    module: emitter.module().unwrap_or_default().to_owned(),
                    line: statement.line,
                    text: statement.text.clone(),
                });
                if options.comments {
                    emitter.comment(&statement.text)?;
                }
                emitter.instruction(&statement.instruction)
            });

            if let Err(err) = result {
                error!("{}:{}: {}", source.display(), reader.line(), err);
                return Err(err);
            }
        }
    }

    emitter.finish().map_err(write_failed)?;
    Ok(())
}

fn write_failed(err: TranslateError) -> TranslateError {
    error!("unable to write output: {}", err);
    err
}

/// Lists the sources to translate: the file itself, or every `.vm` file
/// directly inside a directory in lexical order.
fn discover_sources(input: &Path) -> Result<Vec<PathBuf>, String> {
    if input.is_dir() {
        let entries = match fs::read_dir(input) {
            Err(err) => return Err(format!("unable to read directory `{}`: {}", input.display(), err)),
            Ok(entries) => entries,
        };

        let mut sources: Vec<PathBuf> = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && has_source_extension(&path) {
                        sources.push(path);
                    }
                },
                Err(err) => return Err(format!("unable to read directory `{}`: {}", input.display(), err)),
            }
        }

        if sources.is_empty() {
            return Err(format!("no .{} files in `{}`", SOURCE_EXTENSION, input.display()));
        }
        sources.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        debug!("sources: {:?}", sources);
        Ok(sources)
    } else if input.is_file() {
        if !has_source_extension(input) {
            return Err(format!("`{}` is not a .{} file", input.display(), SOURCE_EXTENSION));
        }
        Ok(vec![input.to_path_buf()])
    } else {
        Err(format!("unable to open input `{}`: no such file or directory", input.display()))
    }
}

fn has_source_extension(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == SOURCE_EXTENSION)
}

/// `Foo.vm` translates to `Foo.asm`; a directory `Dir` to `Dir/Dir.asm`.
fn output_path(input: &Path) -> PathBuf {
    if input.is_dir() {
        let mut name = input
            .file_name()
            .map(|name| name.to_os_string())
            .or_else(|| input.canonicalize().ok().and_then(|p| p.file_name().map(|n| n.to_os_string())))
            .unwrap_or_else(|| "out".into());
        name.push(".");
        name.push(OUTPUT_EXTENSION);
        input.join(name)
    } else {
        input.with_extension(OUTPUT_EXTENSION)
    }
}

/// Modules are named after the file stem, which must be a valid Hack symbol
/// since it qualifies statics and labels.
fn module_name(path: &Path) -> Option<&str> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| reader::is_symbol(stem))
}

fn process_arguments() -> ArgMatches<'static> {
    App::new(option_env!("CARGO_PKG_NAME").unwrap())
        .version(option_env!("CARGO_PKG_VERSION").unwrap())
        .author(option_env!("CARGO_PKG_AUTHORS").unwrap())
        .about(option_env!("CARGO_PKG_DESCRIPTION").unwrap())
        .arg(Arg::with_name("INPUT")
            .help("Sets the input .vm file, or a directory of .vm files")
            .required(true)
            .multiple(false)
            .index(1))
        .arg(Arg::with_name("verbose")
            .short("v")
            .multiple(true)
            .takes_value(false)
            .help("Sets the level of verbosity"))
        .arg(Arg::with_name("output")
            .short("o")
            .takes_value(true)
            .help("write output to an outfile"))
        .arg(Arg::with_name("comments")
            .short("c")
            .takes_value(false)
            .help("echoes each VM command into the output as a comment"))
        .arg(Arg::with_name("no-bootstrap")
            .short("n")
            .takes_value(false)
            .help("omits the bootstrap code when translating a directory"))
        .arg(Arg::with_name("print-debug")
            .short("d")
            .alias("show")
            .alias("s")
            .takes_value(false)
            .help("prints the ROM address of every VM command to STDOUT"))
        .get_matches()
}

fn initialize_logging(verbosity: u64) {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(match verbosity {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Warn,
            2 => log::LevelFilter::Info,
            3 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        })
        .chain(std::io::stdout())
        .apply().ok();
}
