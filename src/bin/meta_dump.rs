use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use dialoguer::Confirm;
use indoc::indoc;
use log::Level;
use simplelog::{Config, SimpleLogger};

use metaextract::{
    AdapterRegistry, Extractor, ExtractorSettings, FileReport, Outcome, OutputFormat,
};

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

struct MetaDump {
    inputs: Vec<PathBuf>,
    settings: ExtractorSettings,
    output: Box<dyn Write>,
    verbosity_level: Option<Level>,
    list_adapters: bool,
}

impl MetaDump {
    pub fn from_cli_matches(matches: &ArgMatches) -> Result<Self> {
        let inputs = matches
            .get_many::<String>("INPUT")
            .map(|values| values.map(PathBuf::from).collect())
            .unwrap_or_default();

        let output_format = match matches
            .get_one::<String>("output-format")
            .map(String::as_str)
            .unwrap_or("xml")
        {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Xml,
        };

        let num_threads = *matches.get_one::<usize>("num-threads").unwrap_or(&0);
        let num_threads = match (cfg!(feature = "multithreading"), num_threads) {
            (true, number) => number,
            (false, 0 | 1) => 1,
            (false, _) => {
                eprintln!(
                    "turned on threads, but library was compiled without `multithreading` feature! processing files in order"
                );
                1
            }
        };

        let verbosity_level = match matches.get_count("verbose") {
            0 => None,
            1 => Some(Level::Info),
            2 => Some(Level::Debug),
            3 => Some(Level::Trace),
            _ => {
                eprintln!("using more than -vvv does not affect verbosity level");
                Some(Level::Trace)
            }
        };

        let output: Box<dyn Write> = match matches.get_one::<String>("output-target") {
            Some(path) => Box::new(Self::create_output_file(
                path,
                !matches.get_flag("no-confirm-overwrite"),
            )?),
            None => Box::new(io::stdout()),
        };

        Ok(MetaDump {
            inputs,
            settings: ExtractorSettings::new()
                .num_threads(num_threads)
                .indent(!matches.get_flag("no-indent"))
                .output_format(output_format),
            output,
            verbosity_level,
            list_adapters: matches.get_flag("list-adapters"),
        })
    }

    /// Main entry point for `MetaDump`
    pub fn run(&mut self) -> Result<()> {
        self.try_to_initialize_logging();

        let extractor = Extractor::new(
            AdapterRegistry::with_default_adapters(),
            self.settings.clone(),
        );

        if self.list_adapters {
            for adapter in extractor.registry().adapters() {
                writeln!(
                    self.output,
                    "{} {} ({}): {}",
                    adapter.name(),
                    adapter.version(),
                    adapter.input_media_type(),
                    adapter.description()
                )?;
            }
            return Ok(());
        }

        for report in extractor.process_files(&self.inputs) {
            self.dump_report(&extractor, &report)?;
        }
        self.output.flush()?;

        Ok(())
    }

    /// If `prompt` is passed, will display a confirmation prompt before overwriting files.
    fn create_output_file(path: impl AsRef<Path>, prompt: bool) -> Result<File> {
        let p = path.as_ref();

        if p.is_dir() {
            bail!(
                "There is a directory at {}, refusing to overwrite",
                p.display()
            );
        }

        if p.exists() {
            if prompt {
                match Confirm::new()
                    .with_prompt(format!(
                        "Are you sure you want to override output file at {}",
                        p.display()
                    ))
                    .default(false)
                    .interact()
                {
                    Ok(true) => Ok(File::create(p)?),
                    Ok(false) => bail!("Cancelled"),
                    Err(e) => bail!(
                        "Failed to write confirmation prompt to term caused by\n{}",
                        e
                    ),
                }
            } else {
                Ok(File::create(p)?)
            }
        } else {
            // Ok to assume p is not an existing directory
            match p.parent() {
                Some(parent) => {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        fs::create_dir_all(parent)?;
                    }
                    Ok(File::create(p)?)
                }
                None => bail!("Output file cannot be root."),
            }
        }
    }

    fn dump_report(&mut self, extractor: &Extractor, report: &FileReport) -> Result<()> {
        if let Outcome::Failed { kind, message } = &report.outcome {
            match report.adapter {
                Some(adapter) => eprintln!(
                    "error: {} [{}] {}: {}",
                    report.path.display(),
                    adapter,
                    kind,
                    message
                ),
                None => eprintln!("error: {} {}: {}", report.path.display(), kind, message),
            }
            // JSON output keeps a `failure` entry in line with the other files.
            if extractor.settings().get_output_format() != OutputFormat::Json {
                return Ok(());
            }
        }

        let rendered = extractor
            .render(report)
            .with_context(|| format!("failed to render output for {}", report.path.display()))?;
        writeln!(self.output, "{}", rendered).context("failed to write output")?;
        Ok(())
    }

    fn try_to_initialize_logging(&self) {
        if let Some(level) = self.verbosity_level {
            match SimpleLogger::init(level.to_level_filter(), Config::default()) {
                Ok(_) => {}
                Err(e) => eprintln!("Failed to initialize logging: {:?}", e),
            };
        }
    }
}

fn main() {
    let matches = Command::new("Metadata Extractor")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Utility to extract metadata from WAV, Word 1.x/2.x, WARC and ARC files")
        .arg(
            Arg::new("INPUT")
                .num_args(1..)
                .required_unless_present("list-adapters"),
        )
        .arg(
            Arg::new("num-threads")
                .short('t')
                .long("threads")
                .default_value("0")
                .value_parser(clap::value_parser!(usize))
                .help("Sets the number of worker threads, defaults to number of CPU cores."),
        )
        .arg(
            Arg::new("output-format")
                .short('o')
                .long("format")
                .value_parser(["xml", "json"])
                .default_value("xml")
                .help("Sets the output format")
                .long_help(indoc!(
                    r#"Sets the output format:
                        "xml"   - prints one XML document per file.
                        "json"  - prints one JSON object per file, repeated groups become arrays.
                                  Files that fail to parse print a `failure` object.
                    "#
                )),
        )
        .arg(
            Arg::new("output-target")
                .long("output")
                .short('f')
                .action(ArgAction::Set)
                .help(indoc!("Writes output to the file specified instead of stdout, errors will still be printed to stderr.
                       Will ask for confirmation before overwriting files, to allow overwriting, pass `--no-confirm-overwrite`
                       Will create parent directories if needed.")),
        )
        .arg(
            Arg::new("no-confirm-overwrite")
                .long("no-confirm-overwrite")
                .action(ArgAction::SetTrue)
                .help(indoc!("When set, will not ask for confirmation before overwriting files, useful for automation")),
        )
        .arg(
            Arg::new("no-indent")
                .long("no-indent")
                .action(ArgAction::SetTrue)
                .help("When set, output will not be indented."),
        )
        .arg(
            Arg::new("list-adapters")
                .long("list-adapters")
                .action(ArgAction::SetTrue)
                .help("Prints the registered adapters and exits."),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help(indoc!(r#"
                Sets debug prints level for the application:
                    -v   - info
                    -vv  - debug
                    -vvv - trace
                NOTE: trace output is only available in debug builds, as it is extremely verbose."#)),
        )
        .get_matches();

    let mut app = match MetaDump::from_cli_matches(&matches) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("An error occurred while setting up: {:#}", e);
            exit(1)
        }
    };

    if let Err(e) = app.run() {
        eprintln!("{:#}", e);
        exit(1)
    }
}
