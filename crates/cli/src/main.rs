#![deny(unsafe_code)]
//! CLI binary for dry-running render-target plans.
//!
//! Subcommands:
//! - `trace <plan.json>`: replay a plan on a recording context, print the calls
//! - `formats`: print accepted pixel formats, pixel types and texture kinds

mod error;
mod trace;

use clap::{Parser, Subcommand};
use error::CliError;
use fbo_core::{PixelFormat, PixelType, TextureKind};
use std::path::PathBuf;
use std::process;
use trace::{CapabilityOverrides, PassTrace};

#[derive(Parser)]
#[command(name = "fbo", about = "Render-target plan tracer")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a plan and print the graphics calls of each pass.
    Trace {
        /// Path to the plan JSON file.
        plan: PathBuf,

        /// Treat the context as lacking depth-texture support.
        #[arg(long)]
        no_depth_texture: bool,

        /// Treat the context as lacking multiple draw buffers.
        #[arg(long)]
        no_draw_buffers: bool,

        /// Override the maximum number of color attachments.
        #[arg(long)]
        max_color_attachments: Option<u32>,
    },
    /// List accepted texture formats, pixel types, and kinds.
    Formats,
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Formats => {
            let formats = serde_json::to_value(PixelFormat::ALL)?;
            let pixel_types = serde_json::to_value(PixelType::ALL)?;
            let kinds = serde_json::to_value(TextureKind::ALL)?;
            if cli.json {
                let info = serde_json::json!({
                    "formats": formats,
                    "pixel_types": pixel_types,
                    "kinds": kinds,
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("Formats:");
                println!("  {}", names(&formats).join(", "));
                println!("Pixel types:");
                println!("  {}", names(&pixel_types).join(", "));
                println!("Kinds:");
                println!("  {}", names(&kinds).join(", "));
            }
        }
        Command::Trace {
            plan,
            no_depth_texture,
            no_draw_buffers,
            max_color_attachments,
        } => {
            let overrides = CapabilityOverrides {
                no_depth_texture,
                no_draw_buffers,
                max_color_attachments,
            };
            let parsed = trace::load_plan(&plan)?;
            log::debug!(
                "loaded {} textures and {} passes from {}",
                parsed.textures.len(),
                parsed.passes.len(),
                plan.display()
            );
            let traces = trace::trace(&parsed, &overrides)?;

            if cli.json {
                let passes = traces
                    .iter()
                    .map(pass_json)
                    .collect::<Result<Vec<_>, _>>()?;
                let info = serde_json::json!({
                    "plan": plan.display().to_string(),
                    "passes": passes,
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                for pass in &traces {
                    let state = if pass.rebuilt { "rebuilt" } else { "unchanged" };
                    println!(
                        "pass {}: {state}, {}x{}, {} calls",
                        pass.index,
                        pass.width,
                        pass.height,
                        pass.calls.len()
                    );
                    for call in &pass.calls {
                        println!("  {call:?}");
                    }
                }
            }
        }
    }

    Ok(())
}

fn pass_json(pass: &PassTrace) -> Result<serde_json::Value, serde_json::Error> {
    Ok(serde_json::json!({
        "index": pass.index,
        "rebuilt": pass.rebuilt,
        "width": pass.width,
        "height": pass.height,
        "calls": serde_json::to_value(&pass.calls)?,
    }))
}

fn names(value: &serde_json::Value) -> Vec<&str> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(serde_json::Value::as_str).collect())
        .unwrap_or_default()
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        if json_mode {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_flags_parse() {
        let cli = Cli::try_parse_from([
            "fbo",
            "trace",
            "plan.json",
            "--no-draw-buffers",
            "--max-color-attachments",
            "4",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Command::Trace {
                plan,
                no_depth_texture,
                no_draw_buffers,
                max_color_attachments,
            } => {
                assert_eq!(plan, PathBuf::from("plan.json"));
                assert!(!no_depth_texture);
                assert!(no_draw_buffers);
                assert_eq!(max_color_attachments, Some(4));
            }
            Command::Formats => panic!("expected trace"),
        }
    }

    #[test]
    fn trace_requires_plan_path() {
        assert!(Cli::try_parse_from(["fbo", "trace"]).is_err());
    }

    #[test]
    fn format_names_are_snake_case() {
        let value = serde_json::to_value(PixelType::ALL).unwrap();
        let names = names(&value);
        assert_eq!(names.len(), PixelType::ALL.len());
        assert!(names.contains(&"unsigned_int_24_8"));
        assert!(names.contains(&"half_float"));
    }

    #[test]
    fn pass_json_includes_calls() {
        let pass = PassTrace {
            index: 0,
            rebuilt: false,
            width: 32,
            height: 16,
            calls: vec![fbo_core::GlCall::QueryViewport],
        };
        let value = pass_json(&pass).unwrap();
        assert_eq!(value["width"], 32);
        assert_eq!(value["calls"][0], "query_viewport");
    }
}
