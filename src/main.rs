//! pd2model CLI - Command-line tool for inspecting and rewriting Diesel model files.
//!
//! This is the main entry point for the pd2model command-line application.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use pd2model::prelude::*;
use pd2model::sections::RawSection;

/// pd2model - Diesel model file inspection tool
#[derive(Parser)]
#[command(name = "pd2model")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Hashlist used to resolve object names (one name per line)
    #[arg(long, global = true, env = "PD2MODEL_HASHLIST")]
    hashlist: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the sections and objects of a model
    Info {
        /// Input model file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print the object hierarchy of a model
    Tree {
        /// Input model file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Read a model and write it back, reporting any byte differences
    Roundtrip {
        /// Input model file
        #[arg(short, long)]
        input: PathBuf,

        /// Output model file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let hashlist = load_hashlist(cli.hashlist.as_deref())?;

    match cli.command {
        Commands::Info { input } => {
            cmd_info(&input, &hashlist)?;
        }
        Commands::Tree { input } => {
            cmd_tree(&input, &hashlist)?;
        }
        Commands::Roundtrip { input, output } => {
            cmd_roundtrip(&input, &output)?;
        }
    }

    Ok(())
}

fn load_hashlist(path: Option<&Path>) -> Result<Hashlist> {
    let Some(path) = path else {
        return Ok(Hashlist::new());
    };

    let hashlist = Hashlist::load(path)
        .with_context(|| format!("Failed to load hashlist {}", path.display()))?;
    log::info!("loaded {} names from {}", hashlist.len(), path.display());
    Ok(hashlist)
}

fn open_model(input: &Path) -> Result<ModelFile> {
    let start = Instant::now();
    let model = ModelFile::open(input)
        .with_context(|| format!("Failed to read model {}", input.display()))?;
    log::debug!("loaded {} in {:?}", input.display(), start.elapsed());
    Ok(model)
}

fn cmd_info(input: &Path, hashlist: &Hashlist) -> Result<()> {
    let model = open_model(input)?;

    let raw: Vec<&RawSection> = model.raw_sections().collect();
    println!("Model: {}", input.display());
    println!(
        "Sections: {} ({} objects, {} other)",
        model.sections().len(),
        model.objects().len(),
        raw.len()
    );

    let mut tags: Vec<u32> = raw.iter().map(|s| s.type_code).collect();
    tags.sort_unstable();
    tags.dedup();
    for tag in tags {
        let count = raw.iter().filter(|s| s.type_code == tag).count();
        println!("  {:#010x}: {}", tag, count);
    }

    println!();
    for object in model.objects().iter() {
        println!("{}", object.summary(hashlist));
    }

    Ok(())
}

fn cmd_tree(input: &Path, hashlist: &Hashlist) -> Result<()> {
    let model = open_model(input)?;
    let objects = model.objects();

    for root in objects.roots() {
        walk_tree(objects, root.id(), |object, depth| {
            let position = object.world_transform().translation();
            println!(
                "{:indent$}{} [{}] @ ({:.3}, {:.3}, {:.3})",
                "",
                object.name().display_string(hashlist),
                object.id(),
                position.x,
                position.y,
                position.z,
                indent = depth * 2
            );
        });
    }

    Ok(())
}

/// Visit a subtree depth-first in link order, passing each object's depth.
fn walk_tree<F: FnMut(&Object3D, usize)>(objects: &ObjectTable, root: u32, mut visit: F) {
    let mut stack = vec![(root, 0usize)];
    while let Some((id, depth)) = stack.pop() {
        let Some(object) = objects.get(id) else {
            continue;
        };
        visit(object, depth);

        // Reversed so children are visited in link order.
        stack.extend(object.children().iter().rev().map(|&child| (child, depth + 1)));
    }
}

fn cmd_roundtrip(input: &Path, output: &Path) -> Result<()> {
    println!("Round-tripping: {} -> {}", input.display(), output.display());

    let original = fs::read(input).context("Failed to read input file")?;
    let model = ModelFile::parse(&original).context("Failed to parse model")?;
    let written = model.to_bytes().context("Failed to encode model")?;
    fs::write(output, &written).context("Failed to write output file")?;

    if written == original {
        println!("Output is byte-identical ({} bytes)", written.len());
        return Ok(());
    }

    let first_diff = original
        .iter()
        .zip(&written)
        .position(|(a, b)| a != b)
        .unwrap_or_else(|| original.len().min(written.len()));
    println!(
        "Output differs: {} -> {} bytes, first difference at {:#x}",
        original.len(),
        written.len(),
        first_diff
    );
    println!("(reserved bytes in Object3D child references are always written as zero)");

    Ok(())
}
