use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use log::warn;

use material_bridge::apply::{self, MemoryGraph};
use material_bridge::naming::NameRegistry;
use material_bridge::parser;
use material_bridge::record::{EXCHANGE_DIR_NAME, EXCHANGE_FILE_NAME, FORMAT_VERSION};
use material_bridge::report::{BatchReport, MaterialOutcome};
use material_bridge::resolver;
use material_bridge::scene;
use material_bridge::schema;
use material_bridge::serializer::{BakeOptions, serialize_scene};

const USAGE: &str = "material-bridge: move material descriptions between graph editors

  --export <scene.json>   serialize a scene description to the exchange file
  --import [file]         parse an exchange file and build the target graph
  --out <file>            exchange file to write (default: documents dir)
  --bake-dir <dir>        directory for baked gradient images
  --graph-out <file>      dump the constructed graph as JSON
  --help                  show this help";

#[derive(Debug, Default, Clone)]
struct Cli {
    export: Option<PathBuf>,
    import: bool,
    import_path: Option<PathBuf>,
    out: Option<PathBuf>,
    bake_dir: Option<PathBuf>,
    graph_out: Option<PathBuf>,
    help: bool,
}

fn parse_cli(args: &[String]) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--export" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --export"));
                };
                cli.export = Some(PathBuf::from(v));
                i += 2;
            }
            "--import" => {
                cli.import = true;
                // The file argument is optional; without it the well-known
                // exchange path is used.
                if let Some(v) = args.get(i + 1).filter(|v| !v.starts_with("--")) {
                    cli.import_path = Some(PathBuf::from(v));
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--out" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --out"));
                };
                cli.out = Some(PathBuf::from(v));
                i += 2;
            }
            "--bake-dir" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --bake-dir"));
                };
                cli.bake_dir = Some(PathBuf::from(v));
                i += 2;
            }
            "--graph-out" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --graph-out"));
                };
                cli.graph_out = Some(PathBuf::from(v));
                i += 2;
            }
            "--help" | "-h" => {
                cli.help = true;
                i += 1;
            }
            other => {
                return Err(anyhow!(
                    "unknown argument: {other} (supported: --export <scene.json>, --import [file], --out <file>, --bake-dir <dir>, --graph-out <file>)"
                ));
            }
        }
    }
    Ok(cli)
}

fn documents_dir() -> PathBuf {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    home.join("Documents")
}

/// The fixed path both editors agree on when no file argument is given.
fn default_exchange_path() -> PathBuf {
    documents_dir()
        .join(EXCHANGE_DIR_NAME)
        .join(EXCHANGE_FILE_NAME)
}

fn run_export(scene_path: &Path, cli: &Cli) -> Result<()> {
    let scene = scene::load_scene_from_path(scene_path)?;

    let out_path = cli.out.clone().unwrap_or_else(default_exchange_path);
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating exchange directory {}", parent.display()))?;
    }
    let bake_dir = cli
        .bake_dir
        .clone()
        .or_else(|| out_path.parent().map(ToOwned::to_owned))
        .unwrap_or_else(|| PathBuf::from("."));

    let opts = BakeOptions {
        dir: bake_dir,
        ..BakeOptions::default()
    };
    let mut names = NameRegistry::new();
    let batch = serialize_scene(&scene, &mut names, &opts)?;
    fs::write(&out_path, &batch.text)
        .with_context(|| format!("writing exchange file {}", out_path.display()))?;

    println!(
        "[export] {} material(s) -> {}",
        names.len(),
        out_path.display()
    );
    if !batch.baked.is_empty() {
        println!(
            "[export] baked {} gradient image(s) under {}",
            batch.baked.len(),
            opts.dir.display()
        );
    }
    Ok(())
}

fn run_import(path: &Path, graph_out: Option<&Path>) -> Result<()> {
    let batch = parser::parse_file(path)?;
    if let Some(v) = batch.format_version {
        if v != i64::from(FORMAT_VERSION) {
            warn!("exchange file declares format version {v}, this build expects {FORMAT_VERSION}");
        }
    }

    let schema = schema::load_default_schema()?;
    let mut graph = MemoryGraph::new();
    let mut report = BatchReport::new();

    for mat in &batch.materials {
        let resolution = resolver::resolve_material(mat);
        let applied = apply::apply_material(&mut graph, &schema, &mat.name, &resolution.directives);
        report.record(
            &mat.name,
            MaterialOutcome::Processed {
                directives: resolution.directives.len(),
                warnings: applied.warnings,
                notes: resolution.notes,
            },
        );
    }
    for failure in &batch.failures {
        report.record(
            &failure.material,
            MaterialOutcome::Failed {
                error: failure.error.to_string(),
            },
        );
    }

    if !report.is_empty() {
        println!("{}", report.render());
    }
    println!(
        "[import] {} processed, {} failed ({})",
        report.processed(),
        report.failed(),
        path.display()
    );

    if let Some(out) = graph_out {
        let json = serde_json::to_string_pretty(&graph)?;
        fs::write(out, json).with_context(|| format!("writing graph dump {}", out.display()))?;
        println!("[import] graph dump: {}", out.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_cli(&argv)?;

    if cli.help {
        println!("{USAGE}");
        return Ok(());
    }
    if let Some(scene_path) = cli.export.clone() {
        return run_export(&scene_path, &cli);
    }
    if cli.import {
        let path = cli.import_path.clone().unwrap_or_else(default_exchange_path);
        return run_import(&path, cli.graph_out.as_deref());
    }

    Err(anyhow!(
        "nothing to do (supported: --export <scene.json>, --import [file], --out <file>, --bake-dir <dir>, --graph-out <file>)"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cli_export_with_out_and_bake_dir() {
        let args = vec![
            "--export".to_string(),
            "scene.json".to_string(),
            "--out".to_string(),
            "exchange.txt".to_string(),
            "--bake-dir".to_string(),
            "bakes".to_string(),
        ];
        let cli = parse_cli(&args).unwrap();
        assert_eq!(cli.export.as_ref().unwrap(), &PathBuf::from("scene.json"));
        assert_eq!(cli.out.as_ref().unwrap(), &PathBuf::from("exchange.txt"));
        assert_eq!(cli.bake_dir.as_ref().unwrap(), &PathBuf::from("bakes"));
        assert!(!cli.import);
    }

    #[test]
    fn parse_cli_import_path_is_optional() {
        let cli = parse_cli(&["--import".to_string()]).unwrap();
        assert!(cli.import);
        assert_eq!(cli.import_path, None);

        let cli = parse_cli(&[
            "--import".to_string(),
            "exchange.txt".to_string(),
            "--graph-out".to_string(),
            "graph.json".to_string(),
        ])
        .unwrap();
        assert!(cli.import);
        assert_eq!(
            cli.import_path.as_ref().unwrap(),
            &PathBuf::from("exchange.txt")
        );
        assert_eq!(
            cli.graph_out.as_ref().unwrap(),
            &PathBuf::from("graph.json")
        );
    }

    #[test]
    fn parse_cli_rejects_unknown_flags() {
        let err = parse_cli(&["--frobnicate".to_string()]).unwrap_err();
        assert!(err.to_string().contains("unknown argument"));
    }

    #[test]
    fn parse_cli_help_flag() {
        assert!(parse_cli(&["--help".to_string()]).unwrap().help);
        assert!(parse_cli(&["-h".to_string()]).unwrap().help);
    }
}
