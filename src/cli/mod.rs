//! The `tdc` driver: argument surface, header framing, and dispatch.
//!
//! Exit codes: `0` success, `1` runtime error (missing input, I/O failure,
//! unknown algorithm, existing target without `--force`), `2` usage error.
//!
//! Non-raw compressed files start with the normalised algorithm
//! configuration, a single `%`, then the payload; decompression reads the
//! header back (at most [`MAX_HEADER_LEN`] bytes) and selects the algorithm
//! from it unless `--algorithm` overrides.

use std::io::{Read, Write};
use std::path::Path;

use anyhow::Context;
use clap::Parser;

use crate::catalogue::{compressor_registry, generator_registry};
use crate::compressor::Compressor;
use crate::io::input::Input;
use crate::io::output::{Output, RestrictedOutput};
use crate::io::restrict::InputRestrictions;
use crate::registry::Selection;
use crate::stats::StatPhase;

/// File extension appended to compressed outputs.
pub const COMPRESSED_FILE_ENDING: &str = "tdc";

/// Maximum length of the algorithm header of a non-raw compressed file.
pub const MAX_HEADER_LEN: usize = 1024;

#[derive(Parser, Debug)]
#[command(
    name = "tdc",
    version,
    about = "Compresses and decompresses files with a configurable algorithm catalogue",
    disable_help_subcommand = true
)]
pub struct Args {
    /// Input file
    pub file: Option<String>,

    /// Algorithm specification, e.g. 'lz78(coder=ascii)'
    #[arg(short, long)]
    pub algorithm: Option<String>,

    /// Decompress instead of compress
    #[arg(short, long)]
    pub decompress: bool,

    /// Omit the algorithm header (decompression then requires --algorithm)
    #[arg(long)]
    pub raw: bool,

    /// Output path
    #[arg(short, long)]
    pub output: Option<String>,

    /// Overwrite an existing output file
    #[arg(short, long)]
    pub force: bool,

    /// Print statistics as JSON to stdout
    #[arg(long)]
    pub stats: bool,

    /// Title recorded in the statistics output
    #[arg(long, default_value = "tdc run")]
    pub stats_title: String,

    /// Write the result to stdout
    #[arg(long)]
    pub usestdout: bool,

    /// Read the input from stdin
    #[arg(long)]
    pub stdin: bool,

    /// List the registered algorithms and exit
    #[arg(long)]
    pub list: bool,

    /// Generate the input with a string generator, e.g. 'fib(n=10)'
    #[arg(short, long)]
    pub generator: Option<String>,
}

fn usage_error(msg: &str) -> ! {
    eprintln!("tdc: {msg}");
    eprintln!("Try 'tdc --help' for more information.");
    std::process::exit(2);
}

fn ternary_xor(a: bool, b: bool, c: bool) -> bool {
    (a ^ b ^ c) && !(a && b && c)
}

/// Entry point called by `main`; returns the process exit code.
pub fn run(args: Args) -> i32 {
    match run_checked(args) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {e:#}");
            1
        }
    }
}

fn run_checked(args: Args) -> anyhow::Result<()> {
    let compressors = compressor_registry();
    let generators = generator_registry();

    if args.list {
        println!("This build supports the following algorithms:\n");
        println!("Compressors:");
        for line in compressors.doc_lines() {
            println!("{line}");
        }
        println!("\nString generators:");
        for line in generators.doc_lines() {
            println!("{line}");
        }
        return Ok(());
    }

    let do_compress = !args.decompress;

    // ── validate the algorithm/generator combination ─────────────────────────
    if args.generator.is_none() && args.algorithm.is_none() {
        if do_compress {
            usage_error("missing compression algorithm");
        }
        if args.raw {
            usage_error("missing algorithm for raw decompression");
        }
    }
    if args.generator.is_some() && args.decompress {
        usage_error("trying to decompress a generated string");
    }

    // ── select the input ─────────────────────────────────────────────────────
    let has_file = args.file.is_some();
    let has_generator = args.generator.is_some();
    if !args.stdin && !has_generator && !has_file {
        usage_error("missing generator, input file or standard input");
    }
    if !ternary_xor(args.stdin, has_generator, has_file) {
        usage_error("trying to use multiple inputs");
    }

    // ── select the output ────────────────────────────────────────────────────
    if args.output.is_some() && args.usestdout {
        usage_error("trying to use multiple outputs");
    }
    let out_path: Option<String> = if args.usestdout {
        None
    } else if let Some(o) = &args.output {
        Some(o.clone())
    } else if do_compress && has_file {
        Some(format!("{}.{COMPRESSED_FILE_ENDING}", args.file.as_ref().unwrap()))
    } else {
        usage_error(
            "either specify a filename (-o filename) or state that the output \
             is standard output (--usestdout)",
        );
    };
    if let Some(p) = &out_path {
        if Path::new(p).exists() && !args.force {
            anyhow::bail!("output file already exists: {p}");
        }
    }

    // ── materialise the input ────────────────────────────────────────────────
    let input = if args.stdin {
        Input::from_stream(std::io::stdin().lock(), &InputRestrictions::none())?
    } else if let Some(gen_spec) = &args.generator {
        let sel = generators.select(gen_spec)?;
        Input::from_vec(sel.instance().generate())
    } else {
        Input::from_path(args.file.as_ref().unwrap())?
    };
    let in_size = input.size();

    let mut output = match &out_path {
        Some(p) => Output::create_path(p, args.force)?,
        None => Output::stdout(),
    };

    // ── run ──────────────────────────────────────────────────────────────────
    let (result, stats_json) = StatPhase::wrap_root("root", || -> anyhow::Result<String> {
        if do_compress {
            let sel =
                compressors.select(args.algorithm.as_ref().expect("validated above"))?;
            let id_string = sel.config().str();
            anyhow::ensure!(
                !id_string.contains('%'),
                "algorithm id string must not contain '%'"
            );

            if !args.raw {
                anyhow::ensure!(
                    id_string.len() <= MAX_HEADER_LEN,
                    "algorithm header exceeds {MAX_HEADER_LEN} bytes"
                );
                output.as_writer().write_all(id_string.as_bytes())?;
                output.as_writer().write_all(b"%")?;
            }

            let restrictions = sel.restrictions().clone();
            let input = if restrictions.has_restrictions() {
                input.clone().restricted(&restrictions)?
            } else {
                input.clone()
            };

            sel.instance().compress(&input, output.as_writer())?;
            output.flush()?;
            Ok(id_string)
        } else {
            // three cases:
            //   --decompress                   read and use the header
            //   --decompress --algorithm       read but ignore the header
            //   --decompress --raw --algorithm no header at all
            let mut input = input.clone();
            let mut header_bytes: Vec<u8> = Vec::new();
            if !args.raw {
                let mut stream = input.as_stream();
                let mut byte = [0u8; 1];
                loop {
                    if header_bytes.len() > MAX_HEADER_LEN {
                        anyhow::bail!("input did not have an algorithm header");
                    }
                    let n = stream.read(&mut byte)?;
                    anyhow::ensure!(n != 0, "input did not have an algorithm header");
                    if byte[0] == b'%' {
                        break;
                    }
                    header_bytes.push(byte[0]);
                }
                input = input.slice(header_bytes.len() + 1);
            }
            let header = String::from_utf8_lossy(&header_bytes).into_owned();

            let sel: Selection<dyn Compressor + Send + Sync> = match &args.algorithm {
                Some(spec) => compressors.select(spec)?,
                None => compressors
                    .select(&header)
                    .with_context(|| format!("header '{header}'"))?,
            };

            let restrictions = sel.restrictions().clone();
            if restrictions.has_restrictions() {
                let mut restricted = RestrictedOutput::new(output.as_writer(), &restrictions);
                sel.instance().decompress(&input, &mut restricted)?;
                restricted.finish()?;
            } else {
                sel.instance().decompress(&input, output.as_writer())?;
            }
            output.flush()?;
            Ok(sel.config().str())
        }
    });
    let config_str = result?;

    // ── statistics ───────────────────────────────────────────────────────────
    if args.stats {
        let out_size = out_path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .unwrap_or(0);
        let start_time = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let meta = serde_json::json!({
            "title": args.stats_title,
            "startTime": start_time,
            "config": config_str,
            "input": if args.stdin {
                "<stdin>".to_owned()
            } else if let Some(g) = &args.generator {
                g.clone()
            } else {
                args.file.clone().unwrap_or_default()
            },
            "inputSize": in_size,
            "output": out_path.as_deref().unwrap_or("<stdout>"),
            "outputSize": out_size,
            "rate": if in_size == 0 { 0.0 } else { out_size as f64 / in_size as f64 },
        });
        let stats = serde_json::json!({ "meta": meta, "data": stats_json });
        println!("{stats}");
    }

    Ok(())
}
