use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::{Context, IntoDiagnostic};

use hxsl_backend_core::{BackendOptions, BackendRegistry, ShaderStage};
use hxsl_backend_glsl::GlslBackend;
use hxsl_backend_hlsl::HlslBackend;

/// Translate HLSL shaders to GLSL.
#[derive(Parser)]
#[command(name = "hxsl", version, about)]
struct Cli {
    /// Input file name
    input: PathBuf,

    /// Entry point of the shader
    entry: String,

    /// Generate a fragment shader (default)
    #[arg(long, conflicts_with = "vs")]
    fs: bool,

    /// Generate a vertex shader
    #[arg(long)]
    vs: bool,

    /// Target language (default: glsl)
    #[arg(short, long, default_value = "glsl")]
    target: String,
}

impl Cli {
    fn stage(&self) -> ShaderStage {
        if self.vs {
            ShaderStage::Vertex
        } else {
            ShaderStage::Fragment
        }
    }
}

/// Maps the traditional single-dash stage flags onto clap long flags.
fn normalize_args(args: impl Iterator<Item = OsString>) -> Vec<OsString> {
    args.map(|arg| match arg.to_str() {
        Some("-fs") => OsString::from("--fs"),
        Some("-vs") => OsString::from("--vs"),
        _ => arg,
    })
    .collect()
}

fn build_registry() -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    registry.register(Box::new(GlslBackend));
    registry.register(Box::new(HlslBackend));
    registry
}

fn main() -> ExitCode {
    env_logger::try_init().ok();

    let cli = match Cli::try_parse_from(normalize_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(err) => {
            // Help and version go to stdout and exit 0; anything else
            // is a usage error.
            if err.use_stderr() {
                eprint!("{err}");
                return ExitCode::FAILURE;
            }
            print!("{err}");
            return ExitCode::SUCCESS;
        }
    };

    match run(&cli) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> miette::Result<String> {
    let file_name = cli.input.display().to_string();
    let source = std::fs::read_to_string(&cli.input)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {file_name}"))?;

    let module = hxsl_parser::parse(&source, &file_name).map_err(|e| miette::miette!("{e}"))?;

    log::debug!(
        "parsed {} functions, {} globals",
        module.functions.len(),
        module.globals.len()
    );

    let registry = build_registry();
    let backend = registry.find(&cli.target).ok_or_else(|| {
        let available = registry.list_targets().join(", ");
        miette::miette!("unknown target '{}' (available: {})", cli.target, available)
    })?;

    let opts = BackendOptions {
        stage: cli.stage(),
        entry_point: cli.entry.clone(),
        legacy: cli.target == "hlsl-legacy",
    };

    backend
        .compile(&module, &opts)
        .map_err(|e| miette::miette!("{e}"))
        .wrap_err("code generation failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_cli(args: &[&str]) -> Result<Cli, clap::Error> {
        let args = normalize_args(args.iter().map(OsString::from));
        Cli::try_parse_from(args)
    }

    #[test]
    fn cli_defaults_to_fragment() {
        let cli = parse_cli(&["hxsl", "shader.fx", "main"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("shader.fx"));
        assert_eq!(cli.entry, "main");
        assert_eq!(cli.stage(), ShaderStage::Fragment);
        assert_eq!(cli.target, "glsl");
    }

    #[test]
    fn cli_vertex_flag() {
        let cli = parse_cli(&["hxsl", "-vs", "shader.fx", "main"]).unwrap();
        assert_eq!(cli.stage(), ShaderStage::Vertex);
    }

    #[test]
    fn cli_fragment_flag() {
        let cli = parse_cli(&["hxsl", "-fs", "shader.fx", "main"]).unwrap();
        assert_eq!(cli.stage(), ShaderStage::Fragment);
    }

    #[test]
    fn cli_flags_after_positionals() {
        let cli = parse_cli(&["hxsl", "shader.fx", "main", "-vs"]).unwrap();
        assert_eq!(cli.stage(), ShaderStage::Vertex);
    }

    #[test]
    fn cli_missing_arguments() {
        assert!(parse_cli(&["hxsl"]).is_err());
        assert!(parse_cli(&["hxsl", "shader.fx"]).is_err());
    }

    #[test]
    fn cli_extra_arguments() {
        assert!(parse_cli(&["hxsl", "shader.fx", "main", "extra"]).is_err());
    }

    #[test]
    fn cli_conflicting_stages() {
        assert!(parse_cli(&["hxsl", "-fs", "-vs", "shader.fx", "main"]).is_err());
    }

    #[test]
    fn cli_hlsl_target() {
        let cli = parse_cli(&["hxsl", "-t", "hlsl", "shader.fx", "main"]).unwrap();
        assert_eq!(cli.target, "hlsl");
    }

    #[test]
    fn registry_has_both_backends() {
        let registry = build_registry();
        assert!(registry.find("glsl").is_some());
        assert!(registry.find("hlsl").is_some());
        assert!(registry.find("hlsl-legacy").is_some());
        assert!(registry.find("spirv").is_none());
    }

    #[test]
    fn normalize_leaves_other_args_alone() {
        let args = normalize_args(
            ["hxsl", "-vs", "--target", "glsl", "a.fx", "main"]
                .iter()
                .map(OsString::from),
        );
        assert_eq!(args[1], OsString::from("--vs"));
        assert_eq!(args[2], OsString::from("--target"));
    }
}
