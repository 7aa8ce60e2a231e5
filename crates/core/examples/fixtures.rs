use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::Parser;
use minify_templates::{CodeAndSourcemap, MinifyOptions, SourcemapOptions, minify_with_sourcemap};

#[derive(Parser, Debug)]
#[command(name = "fixtures")]
#[command(about = "Create or validate fixture files", long_about = None)]
struct Args {
    /// Write fixtures instead of validating them
    #[arg(long, short)]
    write: bool,

    /// Path to the fixtures directory (defaults to "./fixtures")
    #[arg(long, default_value = "fixtures")]
    dir: PathBuf,
}

/// Fixture inputs are `<name>.js`; outputs are `<name>.out.js` and `<name>.out.js.map`.
fn fixture_name(path: &Path) -> Option<&str> {
    let filename = path.file_name()?.to_str()?;
    let basename = filename.strip_suffix(".js")?;
    (!basename.ends_with(".out")).then_some(basename)
}

fn run(
    dir: &Path,
    basename: &str,
) -> Result<CodeAndSourcemap, Box<dyn std::error::Error + Send + Sync>> {
    let filename = format!("{basename}.js");
    let out_filename = format!("{basename}.out.js");
    let source = fs::read_to_string(dir.join(&filename))?;
    let res = minify_with_sourcemap(
        &source,
        None,
        &MinifyOptions::default(),
        &SourcemapOptions {
            source: &filename,
            file: Some(&out_filename),
            include_content: true,
            hires: false,
        },
    )?;
    Ok(res)
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let mut basenames = Vec::new();
    for entry in fs::read_dir(&args.dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(basename) = fixture_name(&path) {
            basenames.push(basename.to_string());
        }
    }
    basenames.sort();

    if args.write {
        println!("Creating fixtures...");
        for basename in &basenames {
            let res = run(&args.dir, basename)?;

            let out_path = args.dir.join(format!("{basename}.out.js"));
            let out_map_path = args.dir.join(format!("{basename}.out.js.map"));
            fs::write(&out_path, &res.code)?;
            fs::write(&out_map_path, &res.sourcemap)?;

            println!(
                "  Created {} and {}",
                out_path.display(),
                out_map_path.display()
            );
        }
        println!("Done creating {} fixtures.", basenames.len());
        return Ok(());
    }

    println!("Validating fixtures...");
    let mut mismatches = Vec::new();

    for basename in &basenames {
        let res = run(&args.dir, basename)?;
        let filename = format!("{basename}.js");

        let out_path = args.dir.join(format!("{basename}.out.js"));
        let out_map_path = args.dir.join(format!("{basename}.out.js.map"));

        match fs::read(&out_path) {
            Ok(expected) if res.code.as_bytes() == expected => {}
            Ok(_) => mismatches.push(format!("{filename}: code mismatch")),
            Err(_) => mismatches.push(format!(
                "{filename}: missing output file {}",
                out_path.display()
            )),
        }

        // Maps are optional fixtures; compare only when one was written.
        if let Ok(expected) = fs::read(&out_map_path)
            && res.sourcemap.as_bytes() != expected
        {
            mismatches.push(format!("{filename}: sourcemap mismatch"));
        }

        if !mismatches.iter().any(|m| m.starts_with(&filename)) {
            println!("  ✓ {filename}");
        }
    }

    if !mismatches.is_empty() {
        eprintln!("\nValidation failed:");
        for mismatch in &mismatches {
            eprintln!("  ✗ {mismatch}");
        }
        return Err(format!("{} validation error(s)", mismatches.len()).into());
    }

    println!("\nAll {} fixtures validated successfully!", basenames.len());

    Ok(())
}
