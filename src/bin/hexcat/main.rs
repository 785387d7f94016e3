//! Command-line front end: inspect and convert sparse byte images between
//! the formats the library supports.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hexcat::{AddressWidth, FillOptions, Format, LineTerminator, MemoryImage, WriteOptions};

#[derive(Parser)]
#[command(name = "hexcat", version, about = "Convert and inspect firmware image files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print address ranges and metadata of an image file.
    Info(InfoArgs),
    /// Convert an image file to another format.
    Convert(ConvertArgs),
    /// Fill gaps between data ranges, then write the image back out.
    Fill(FillArgs),
    /// Hex dump the data ranges of an image file.
    Pretty(PrettyArgs),
}

#[derive(Args)]
struct InfoArgs {
    /// Input files.
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Input format; guessed from each file extension when omitted.
    #[arg(short, long)]
    format: Option<Format>,
}

#[derive(Args)]
struct ConvertArgs {
    /// Input file.
    input: PathBuf,
    /// Output file, or `-` for standard output.
    output: PathBuf,
    /// Input format; guessed from the input extension when omitted.
    #[arg(short = 'i', long)]
    input_format: Option<Format>,
    /// Output format; guessed from the output extension when omitted.
    #[arg(short = 'o', long)]
    output_format: Option<Format>,
    #[command(flatten)]
    write: WriteArgs,
}

#[derive(Args)]
struct FillArgs {
    /// Input file.
    input: PathBuf,
    /// Output file, or `-` for standard output.
    output: PathBuf,
    /// Input format; guessed from the input extension when omitted.
    #[arg(short = 'i', long)]
    input_format: Option<Format>,
    /// Output format; guessed from the output extension when omitted.
    #[arg(short = 'o', long)]
    output_format: Option<Format>,
    /// Fill byte.
    #[arg(long, default_value = "0xFF", value_parser = parse_byte)]
    value: u8,
    /// Leave gaps wider than this many words untouched.
    #[arg(long)]
    max_words: Option<u64>,
    #[command(flatten)]
    write: WriteArgs,
}

#[derive(Args)]
struct PrettyArgs {
    /// Input file.
    file: PathBuf,
    /// Input format; guessed from the file extension when omitted.
    #[arg(short, long)]
    format: Option<Format>,
}

#[derive(Args)]
struct WriteArgs {
    /// Maximum data bytes per record.
    #[arg(long)]
    record_length: Option<usize>,
    /// Record address width: auto, 16, 24 or 32.
    #[arg(long, default_value = "32", value_parser = parse_address_width)]
    address_width: AddressWidth,
    /// Terminate lines with CRLF instead of LF.
    #[arg(long)]
    crlf: bool,
}

impl WriteArgs {
    fn options(&self) -> WriteOptions {
        WriteOptions {
            record_length: self.record_length,
            address_width: self.address_width,
            line_terminator: if self.crlf {
                LineTerminator::CrLf
            } else {
                LineTerminator::Lf
            },
        }
    }
}

fn parse_byte(s: &str) -> Result<u8, String> {
    let result = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    result.map_err(|_| format!("invalid byte value '{s}'"))
}

fn parse_address_width(s: &str) -> Result<AddressWidth, String> {
    match s {
        "auto" => Ok(AddressWidth::Auto),
        "16" => Ok(AddressWidth::Width16),
        "24" => Ok(AddressWidth::Width24),
        "32" => Ok(AddressWidth::Width32),
        _ => Err(format!("invalid address width '{s}', expected auto, 16, 24 or 32")),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Info(args) => info(&args),
        Command::Convert(args) => convert(&args),
        Command::Fill(args) => fill(&args),
        Command::Pretty(args) => pretty(&args),
    }
}

fn load(path: &Path, format: Option<Format>) -> Result<(MemoryImage, Format)> {
    if path == Path::new("-") {
        let mut buffer = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buffer)
            .context("failed to read standard input")?;
        let format = format.unwrap_or(Format::Binary);
        let mut image = MemoryImage::new();
        format
            .parse(&mut image, &buffer)
            .with_context(|| format!("failed to parse standard input as {format}"))?;
        Ok((image, format))
    } else {
        let input =
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let format = format.unwrap_or_else(|| Format::from_path(path));
        let mut image = MemoryImage::new();
        format
            .parse(&mut image, &input)
            .with_context(|| format!("failed to parse {} as {format}", path.display()))?;
        Ok((image, format))
    }
}

fn serialize(
    image: &MemoryImage,
    output: &Path,
    format: Option<Format>,
    options: &WriteOptions,
) -> Result<()> {
    if output == Path::new("-") {
        let format = format.unwrap_or_else(|| Format::from_path(output));
        let bytes = format
            .serialize(image, options)
            .with_context(|| format!("failed to serialize as {format}"))?;
        std::io::stdout()
            .write_all(&bytes)
            .context("failed to write standard output")
    } else {
        hexcat::save_file(output, image, format, options)
            .with_context(|| format!("failed to write {}", output.display()))
    }
}

fn info(args: &InfoArgs) -> Result<()> {
    let mut first = true;
    for file in &args.files {
        if !first {
            println!();
        }
        first = false;
        info_one(file, args.format)?;
    }
    Ok(())
}

fn info_one(file: &Path, format: Option<Format>) -> Result<()> {
    let (image, format) = load(file, format)?;

    println!("file:    {}", file.display());
    println!("format:  {format}");
    if let Some(header) = &image.header {
        println!("header:  \"{}\"", header.escape_ascii());
    }
    if let Some(address) = image.execution_start_address {
        println!("execution start address: {address:#010X}");
    }

    println!("data ranges:");
    for segment in image.segments() {
        println!(
            "    {:#010X} - {:#010X} ({} bytes)",
            segment.start_address,
            segment.end_address(),
            segment.len()
        );
    }

    let span = image.len();
    if span > 0 {
        let ratio = 100.0 * image.total_bytes() as f64 / span as f64;
        println!("data:    {} of {} bytes ({ratio:.1}%)", image.total_bytes(), span);
    }

    Ok(())
}

fn convert(args: &ConvertArgs) -> Result<()> {
    let (image, _) = load(&args.input, args.input_format)?;
    serialize(&image, &args.output, args.output_format, &args.write.options())
}

fn fill(args: &FillArgs) -> Result<()> {
    let (mut image, _) = load(&args.input, args.input_format)?;
    image.fill(&FillOptions {
        pattern: args.value,
        max_words: args.max_words,
    });
    serialize(&image, &args.output, args.output_format, &args.write.options())
}

fn pretty(args: &PrettyArgs) -> Result<()> {
    let (image, _) = load(&args.file, args.format)?;

    let mut first = true;
    for segment in image.segments() {
        if !first {
            println!();
        }
        first = false;

        let mut address = segment.start_address;
        for row in segment.data.chunks(16) {
            let hex: Vec<String> = row.iter().map(|b| format!("{b:02X}")).collect();
            let ascii: String = row
                .iter()
                .map(|&b| if (0x20..0x7F).contains(&b) { b as char } else { '.' })
                .collect();
            println!("{address:08X}  {:<47}  |{ascii}|", hex.join(" "));
            address += row.len() as u64;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_byte() {
        assert_eq!(parse_byte("0xFF").unwrap(), 0xFF);
        assert_eq!(parse_byte("0x00").unwrap(), 0x00);
        assert_eq!(parse_byte("170").unwrap(), 170);
        assert!(parse_byte("0x100").is_err());
        assert!(parse_byte("xyz").is_err());
    }

    #[test]
    fn test_parse_address_width() {
        assert_eq!(parse_address_width("auto").unwrap(), AddressWidth::Auto);
        assert_eq!(parse_address_width("16").unwrap(), AddressWidth::Width16);
        assert_eq!(parse_address_width("32").unwrap(), AddressWidth::Width32);
        assert!(parse_address_width("48").is_err());
    }
}
