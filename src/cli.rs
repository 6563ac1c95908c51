//! Minimal CLI: load serialized type graphs → run the stage pipeline → write the result
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use crate::error::PipelineError;
use crate::graph::TypeGraph;
use crate::ident::IdentifierFactory;
use crate::pipeline::{Pipeline, PipelineReport};
use crate::stage::RunContext;
use crate::stages;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// transform resource type graphs through the generator's stage pipeline
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    /// debug-level logging (overridden by RUST_LOG)
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// run the pipeline and write the transformed graph
    Run(RunOut),
    /// print the stage execution order
    Stages(StageSelection),
    /// load and validate graphs without transforming them
    Check(InputSettings),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more serialized type graphs (JSON). May be literal paths or quoted glob patterns.
    /// Graphs are merged; an identifier defined twice is an error.
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct StageSelection {
    /// leave a stage out (repeatable)
    #[arg(long)]
    skip: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct RunOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    stages: StageSelection,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// worker threads for per-definition work (rayon default if omitted)
    #[arg(long)]
    jobs: Option<usize>,

    /// skip the dangling-reference check on input
    #[arg(long, default_value_t = false)]
    no_validate: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load(&self) -> Result<TypeGraph> {
        let source_paths = resolve_file_path_patterns(&self.input).context("failed to resolve input file paths")?;
        let mut graph = TypeGraph::new();
        for source_path in source_paths {
            let next = crate::path_de::read_graph(&source_path)?;
            tracing::debug!(path = %source_path.display(), definitions = next.len(), "loaded");
            graph = graph
                .merge(next)
                .with_context(|| format!("failed to merge {}", source_path.display()))?;
        }
        Ok(graph)
    }
}

impl StageSelection {
    fn pipeline(&self) -> Result<Pipeline> {
        let pipeline = stages::default_pipeline(IdentifierFactory::new())?;
        Ok(pipeline.without_stages(self.skip.as_slice())?)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Stages(selection) => {
                let pipeline = selection.pipeline()?;
                for (i, stage) in pipeline.stages().enumerate() {
                    println!("{:>2}. {}: {}", i + 1, stage.id().bold(), stage.description());
                    if !stage.dependencies().is_empty() {
                        println!("    after: {}", stage.dependencies().join(", "));
                    }
                }
                Ok(())
            }
            Command::Check(input_settings) => {
                let graph = input_settings.load()?;
                graph.validate()?;
                eprintln!("{} {} definition(s)", "ok".green().bold(), graph.len());
                Ok(())
            }
            Command::Run(target) => {
                // 1) load
                let graph = target.input_settings.load()?;
                if !target.no_validate {
                    graph.validate()?;
                }

                // 2) transform
                let pipeline = target.stages.pipeline()?;
                let ctx = RunContext::new();
                let pool = {
                    let mut builder = rayon::ThreadPoolBuilder::new();
                    if let Some(jobs) = target.jobs {
                        builder = builder.num_threads(jobs);
                    }
                    builder.build().context("failed to start worker pool")?
                };
                let output = match pool.install(|| pipeline.run(&ctx, graph)) {
                    Ok(output) => output,
                    Err(PipelineError::Failed(report)) => {
                        print_report(&report);
                        bail!("pipeline failed");
                    }
                    Err(other) => return Err(other.into()),
                };
                print_report(&output.report);

                // 3) write
                let graph_src = serde_json::to_string_pretty(&output.graph)?;
                if let Some(out) = target.out.as_ref() {
                    if let Some(parent) = out.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(out, &graph_src).with_context(|| format!("failed to write {}", out.display()))?;
                } else {
                    println!("{graph_src}");
                }
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn print_report(report: &PipelineReport) {
    for stage in &report.executed {
        match report.failed.iter().find(|f| &f.stage == stage) {
            Some(failure) => eprintln!("{} {stage}: {}", "failed ".red().bold(), failure.error),
            None => eprintln!("{} {stage}", "ok     ".green().bold()),
        }
    }
    for skipped in &report.skipped {
        eprintln!("{} {} (after {})", "skipped".yellow().bold(), skipped.stage, skipped.blocked_by);
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    // Deterministic merge order regardless of shell or glob ordering.
    out.sort();
    out.dedup();
    Ok(out)
}
