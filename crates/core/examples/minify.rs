use std::{fs, path::PathBuf};

use clap::Parser;
use minify_templates::{MinifyOptions, SourceType, SourcemapOptions, minify, minify_with_sourcemap};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "minify")]
#[command(about = "Collapse whitespace inside JavaScript template literals", long_about = None)]
struct Args {
    /// Path to the JavaScript file to transform
    input: PathBuf,

    /// Output path for transformed source (defaults to stdout)
    #[arg(long, short)]
    out: Option<PathBuf>,

    /// Output path for the sourcemap (defaults to <out>.map if --out is provided)
    #[arg(long)]
    out_sourcemap: Option<PathBuf>,

    /// Existing sourcemap for the input; the written map is composed with it
    #[arg(long)]
    input_sourcemap: Option<PathBuf>,

    /// Only minify tagged template literals
    #[arg(long)]
    tagged_only: bool,

    /// Keep HTML comments inside template literals
    #[arg(long)]
    keep_comments: bool,

    /// Parse the input as a classic script instead of a module
    #[arg(long)]
    script: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let source = fs::read_to_string(&args.input)?;
    let upstream = args
        .input_sourcemap
        .as_ref()
        .map(fs::read_to_string)
        .transpose()?;

    let options = MinifyOptions {
        tagged_only: args.tagged_only,
        keep_comments: args.keep_comments,
        source_type: if args.script {
            SourceType::Script
        } else {
            SourceType::Module
        },
    };

    let out_map_path = args.out_sourcemap.clone().or_else(|| {
        args.out
            .as_ref()
            .map(|out| PathBuf::from(format!("{}.map", out.display())))
    });

    let out_code = if let Some(out_map_path) = out_map_path {
        let source_name = args
            .input
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or("input path has no valid file name")?;
        let file_name = args
            .out
            .as_ref()
            .and_then(|out| out.file_name())
            .and_then(|n| n.to_str());

        let res = minify_with_sourcemap(
            &source,
            upstream.as_deref(),
            &options,
            &SourcemapOptions {
                source: source_name,
                file: file_name,
                include_content: true,
                hires: false,
            },
        )?;
        fs::write(out_map_path, res.sourcemap)?;

        res.code
    } else {
        minify(&source, &options)?.into_code()
    };

    match &args.out {
        None => {
            print!("{out_code}");
        }
        Some(out) => {
            fs::write(out, out_code)?;
        }
    }

    Ok(())
}
