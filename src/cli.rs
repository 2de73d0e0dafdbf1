use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Read, validate, and rewrite typed metric files", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the header a schema writes
    Header(HeaderArgs),
    /// Show how each schema field maps onto file columns
    Fields(FieldsArgs),
    /// Validate every row of one or more files against a schema
    Check(CheckArgs),
    /// Read typed records and rewrite them in canonical column order
    Convert(ConvertArgs),
    /// Print records as JSON lines
    Dump(DumpArgs),
}

#[derive(Debug, Args)]
pub struct HeaderArgs {
    /// Schema file (YAML) describing the record fields
    #[arg(short, long)]
    pub schema: PathBuf,
    /// Delimiter placed between columns (defaults to tab)
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
}

#[derive(Debug, Args)]
pub struct FieldsArgs {
    /// Schema file (YAML) describing the record fields
    #[arg(short, long)]
    pub schema: PathBuf,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Schema file (YAML) describing the record fields
    #[arg(short, long)]
    pub schema: PathBuf,
    /// One or more metric files to check (`-` reads stdin)
    #[arg(short = 'i', long = "input", required = true, action = clap::ArgAction::Append)]
    pub inputs: Vec<PathBuf>,
    /// Field delimiter (supports ',', 'tab', ';', '|'); defaults from the file extension
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Maximum failing rows to print per file (0 prints all)
    #[arg(long = "max-errors", default_value_t = 20)]
    pub max_errors: usize,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Schema file (YAML) describing the record fields
    #[arg(short, long)]
    pub schema: PathBuf,
    /// Input metric file (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Field delimiter for reading input; defaults from the file extension
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Delimiter to use for output (defaults from the output extension, then the input delimiter)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Drop rows that fail validation instead of stopping
    #[arg(long = "skip-invalid")]
    pub skip_invalid: bool,
}

#[derive(Debug, Args)]
pub struct DumpArgs {
    /// Schema file (YAML) describing the record fields
    #[arg(short, long)]
    pub schema: PathBuf,
    /// Input metric file (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Field delimiter; defaults from the file extension
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Stop after this many records
    #[arg(long)]
    pub limit: Option<usize>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" | "\\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            if first == '\n' || first == '\r' || first == '"' {
                return Err(format!("Delimiter cannot be {first:?}"));
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_delimiters_resolve() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("\\t"), Ok(b'\t'));
        assert_eq!(parse_delimiter("pipe"), Ok(b'|'));
        assert_eq!(parse_delimiter(":"), Ok(b':'));
    }

    #[test]
    fn unusable_delimiters_are_rejected() {
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("é").is_err());
        assert!(parse_delimiter("\"").is_err());
    }
}
