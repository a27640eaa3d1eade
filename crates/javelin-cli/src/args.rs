use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for the javelin binary.
#[derive(Parser, Debug)]
#[command(
    name = "javelin",
    version,
    about = "javelin - a header compiler for Java: declarations in, class files out"
)]
pub struct CliArgs {
    /// Source files to compile.
    #[arg(required = true)]
    pub sources: Vec<PathBuf>,

    /// Where to write the result: a .jar file or a class directory.
    #[arg(short = 'o', long, default_value = "javelin-out")]
    pub output: PathBuf,

    /// Compilation classpath (host path-separator separated).
    #[arg(long = "classpath", alias = "cp")]
    pub classpath: Option<String>,

    /// Bootstrap classpath, searched before the classpath.
    #[arg(long = "bootclasspath")]
    pub bootclasspath: Option<String>,

    /// Target release (8-21); chooses the emitted class-file version.
    #[arg(long, default_value_t = 21)]
    pub release: u8,

    /// Path to search for annotation processors.
    #[arg(long = "processorpath")]
    pub processor_path: Option<String>,

    /// Annotation processor names to run, comma separated.
    #[arg(long = "processors", value_delimiter = ',')]
    pub processors: Vec<String>,

    /// Options passed to annotation processors (`-A key=value`).
    #[arg(short = 'A', value_parser = parse_key_value)]
    pub processor_options: Vec<(String, String)>,

    /// Report annotations whose @Target fits neither declarations nor type
    /// uses instead of silently dropping them.
    #[arg(long = "report-untargeted-annotations")]
    pub report_untargeted_annotations: bool,

    /// Emit diagnostics as a JSON array on stdout.
    #[arg(long = "diagnostics-json")]
    pub diagnostics_json: bool,

    /// Log filter (e.g. "info", "javelin_binder=debug").
    #[arg(long = "log-level")]
    pub log_level: Option<String>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) => Ok((key.to_string(), value.to_string())),
        None => Ok((raw.to_string(), String::new())),
    }
}

impl CliArgs {
    /// Class-file major version for the requested release.
    pub fn major_version(&self) -> u16 {
        // Release N maps to major 44 + N.
        44 + self.release.clamp(8, 21) as u16
    }
}
