use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::{Level, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use xbf::{HeaderVariant, ParserSettings, XbfParser};

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum XbfOutputFormat {
    Json,
    JsonL,
}

struct XbfDump {
    parser_settings: ParserSettings,
    input: PathBuf,
    output_format: XbfOutputFormat,
    output: Box<dyn Write>,
    verbosity_level: Option<Level>,
}

impl XbfDump {
    pub fn from_cli_matches(matches: &ArgMatches) -> Result<Self> {
        let input = PathBuf::from(
            matches
                .get_one::<String>("INPUT")
                .context("INPUT is a required argument")?,
        );

        let output_format = match matches.get_one::<String>("output-format").map(String::as_str) {
            Some("jsonl") => XbfOutputFormat::JsonL,
            _ => XbfOutputFormat::Json,
        };

        let header_variant = match matches.get_one::<String>("header").map(String::as_str) {
            Some("legacy") => HeaderVariant::Legacy,
            Some("versioned") => HeaderVariant::Versioned,
            _ => HeaderVariant::Detect,
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

        let output: Box<dyn Write> =
            if let Some(path) = matches.get_one::<String>("output-target") {
                let f = Self::create_output_file(path, !matches.get_flag("no-confirm-overwrite"))
                    .with_context(|| format!("An error occurred while creating output file at `{path}`"))?;
                Box::new(f)
            } else {
                Box::new(io::stdout())
            };

        Ok(XbfDump {
            parser_settings: ParserSettings::new()
                .header_variant(header_variant)
                .strict_trusted_indices(matches.get_flag("strict")),
            input,
            output_format,
            output,
            verbosity_level,
        })
    }

    /// Main entry point for `XbfDump`
    pub fn run(&mut self) -> Result<()> {
        self.try_to_initialize_logging();

        let mut parser = XbfParser::from_path(&self.input)
            .with_context(|| format!("Failed to open file {}", self.input.display()))?
            .with_configuration(self.parser_settings.clone());

        let file = parser
            .parse()
            .with_context(|| format!("Failed to parse {}", self.input.display()))?;

        let value = file.to_json_value();
        let rendered = match self.output_format {
            XbfOutputFormat::Json => serde_json::to_string_pretty(&value)?,
            XbfOutputFormat::JsonL => serde_json::to_string(&value)?,
        };

        writeln!(self.output, "{rendered}").context("Failed to write output")?;
        self.output.flush().context("Failed to flush output")?;

        Ok(())
    }

    /// Refuses to replace a directory, and replaces an existing file only when `confirm` is off.
    fn create_output_file(path: impl AsRef<Path>, confirm: bool) -> Result<File> {
        let p = path.as_ref();

        if p.is_dir() {
            bail!(
                "There is a directory at {}, refusing to overwrite",
                p.display()
            );
        }

        if p.exists() {
            if confirm {
                bail!(
                    "Output file at {} already exists, pass `--no-confirm-overwrite` to replace it",
                    p.display()
                );
            }
            return Ok(File::create(p)?);
        }

        match p.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
                fs::create_dir_all(parent)?;
                Ok(File::create(p)?)
            }
            Some(_) => Ok(File::create(p)?),
            None => bail!("Output file cannot be root."),
        }
    }

    fn try_to_initialize_logging(&self) {
        if let Some(level) = self.verbosity_level {
            if let Err(e) = TermLogger::init(
                level.to_level_filter(),
                Config::default(),
                TerminalMode::Stderr,
                ColorChoice::Auto,
            ) {
                eprintln!("Failed to initialize logging: {e:?}");
            }
        } else {
            log::set_max_level(LevelFilter::Off);
        }
    }
}

fn command() -> Command {
    Command::new("XBF Parser")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Utility to parse compiled XAML (XBF) files")
        .arg(Arg::new("INPUT").required(true))
        .arg(
            Arg::new("output-format")
                .short('o')
                .long("format")
                .value_parser(["json", "jsonl"])
                .default_value("json")
                .help("Sets the output format")
                .long_help(
                    "Sets the output format:
                        \"json\"  - pretty printed JSON document.
                        \"jsonl\" - the same document on a single line.",
                ),
        )
        .arg(
            Arg::new("output-target")
                .long("output")
                .short('f')
                .value_name("OUTPUT")
                .help("Writes output to the file specified instead of stdout, errors will still be printed to stderr. \
                       Will refuse to overwrite existing files, to allow overwriting, pass `--no-confirm-overwrite`. \
                       Will create parent directories if needed."),
        )
        .arg(
            Arg::new("no-confirm-overwrite")
                .long("no-confirm-overwrite")
                .action(ArgAction::SetTrue)
                .help("When set, existing output files are overwritten, useful for automation"),
        )
        .arg(
            Arg::new("header")
                .long("header")
                .value_parser(["detect", "legacy", "versioned"])
                .default_value("detect")
                .help("Header layout to expect. `detect` picks the one matching the file length."),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .action(ArgAction::SetTrue)
                .help("When set, trusted type and property indices unknown to this build fail the parse."),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("-v - info, -vv - debug, -vvv - trace."),
        )
}

fn main() {
    let matches = command().get_matches();

    let result = XbfDump::from_cli_matches(&matches).and_then(|mut app| app.run());

    if let Err(e) = result {
        eprintln!("{e:?}");
        exit(1);
    }
}
