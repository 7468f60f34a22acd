use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use manifest_collapse::evaluate::Evaluator;
use manifest_collapse::node::Node;
use manifest_collapse::{
    CollapseOptions, IngestOptions, Manifest, RootPolicy, SerializationPolicy, storage,
};
use serde::Deserialize;
use std::fs;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mcollapse")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Input {
    file: String,
    /// Treat FILE as a plain JSON manifest instead of a graph document.
    #[arg(long)]
    json: bool,
    /// JSON settings file (collapse, ingest and policy sections).
    #[arg(long)]
    options: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    Collapse {
        #[command(flatten)]
        input: Input,
        #[arg(long)]
        keep_root: bool,
    },
    Inspect {
        #[command(flatten)]
        input: Input,
    },
    Import {
        input: String,
        output: String,
        #[arg(long)]
        preserve_key: Option<String>,
        /// Replace OUTPUT if it already exists.
        #[arg(long)]
        force: bool,
    },
    Digest {
        #[command(flatten)]
        input: Input,
        #[arg(long)]
        keep_root: bool,
    },
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Settings {
    collapse: CollapseOptions,
    ingest: IngestOptions,
    policy: Option<SerializationPolicy>,
}

impl Settings {
    fn read(path: Option<&str>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let data =
            fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))?;
        serde_json::from_str(&data).with_context(|| format!("Invalid settings file: {}", path))
    }

    fn policy(&self) -> SerializationPolicy {
        let base = self.ingest.policy();
        match &self.policy {
            Some(overrides) => base.merge(overrides),
            None => base,
        }
    }

    /// Collapse options carrying the encoding table, so excluded fields
    /// count as absent when deciding what is empty.
    fn collapse_options(&self, keep_root: bool) -> CollapseOptions {
        let mut options = self.collapse.clone().with_policy(self.policy());
        if keep_root {
            options.root = RootPolicy::Keep;
        }
        options
    }
}

fn open(input: &Input, settings: &Settings) -> Result<Manifest> {
    if input.json {
        storage::load_json(&input.file, &settings.ingest)
    } else {
        storage::load(&input.file)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Collapse { input, keep_root } => {
            let settings = Settings::read(input.options.as_deref())?;
            let options = settings.collapse_options(keep_root);
            let manifest = open(&input, &settings)?;
            match manifest.collapse(&options)? {
                Some(output) => {
                    let json = output.to_json(&options.policy);
                    println!("{}", serde_json::to_string_pretty(&json)?);
                }
                None => eprintln!("{}: document collapsed to nothing", input.file),
            }
        }
        Commands::Inspect { input } => {
            let settings = Settings::read(input.options.as_deref())?;
            let manifest = open(&input, &settings)?;
            let mut evaluator = Evaluator::with_policy(&manifest.graph, settings.policy());
            let root_empty = evaluator.is_empty(manifest.root)?;
            println!("root {} empty={}", manifest.root, root_empty);

            let mut verdicts: Vec<_> = evaluator.verdicts().iter().collect();
            verdicts.sort_unstable_by_key(|(id, _)| **id);
            for (id, empty) in verdicts {
                let shape = match manifest.graph.get(*id) {
                    Some(Node::Scalar(_)) => "scalar",
                    Some(Node::Collection(_)) => "collection",
                    Some(Node::Object(o)) if o.preserve == Some(true) => "object (preserve)",
                    Some(Node::Object(_)) => "object",
                    None => "missing",
                };
                println!("  node {} {} empty={}", id, shape, empty);
            }
        }
        Commands::Import {
            input,
            output,
            preserve_key,
            force,
        } => {
            if storage::exists(&output) && !force {
                println!("File already exists: {}", output);
                return Ok(());
            }
            let mut ingest = IngestOptions::default();
            if let Some(key) = preserve_key {
                ingest.preserve_key = key;
            }
            let manifest = storage::load_json(&input, &ingest)?;
            storage::save(&output, &manifest)?;
            println!(
                "Imported {} nodes from {} into {}",
                manifest.graph.nodes.len(),
                input,
                output
            );
        }
        Commands::Digest { input, keep_root } => {
            let settings = Settings::read(input.options.as_deref())?;
            let options = settings.collapse_options(keep_root);
            let manifest = open(&input, &settings)?;
            match manifest.collapse(&options)? {
                Some(output) => println!("{}", output.digest_hex()),
                None => println!("empty"),
            }
        }
    }

    Ok(())
}
