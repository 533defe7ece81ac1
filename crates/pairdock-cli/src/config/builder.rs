use super::defaults::{DefaultsConfig, RuntimeDefaults};
use super::file::{FileConfig, FileRuntimeConfig, RuntimeKind};
use crate::cli::{DockArgs, MergeArgs, ToolName};
use crate::error::{CliError, Result};
use pairdock::core::models::score::SourceKind;
use pairdock::engine::config::{
    AlphaFoldConfig, DockConfig, DockConfigBuilder, HdockConfig, MegadockConfig, MergeConfig,
    Runtime, ToolConfig,
};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Layers explicit flags over `--set` values over the config file over defaults.
pub fn build_dock_config(args: &DockArgs) -> Result<DockConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let scheduler = file_config.scheduler.take().unwrap_or_default();
    let workers = args
        .workers
        .or(scheduler.workers)
        .unwrap_or(defaults.workers);
    let timeout_secs = args
        .timeout_secs
        .or(scheduler.timeout_secs)
        .unwrap_or(defaults.timeout_secs);
    let stage_timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));

    let tool = build_tool(args, file_config, &defaults)?;
    let result_file = args
        .result_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(args.tool.default_result_file()));

    DockConfigBuilder::new()
        .pair_list_path(args.pair_list.clone())
        .entity_input_path(args.input.clone())
        .output_dir(args.output_dir.clone())
        .result_file(result_file)
        .tool(tool)
        .workers(workers)
        .stage_timeout(stage_timeout)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))
}

pub fn build_merge_config(args: &MergeArgs) -> MergeConfig {
    let sources = [
        (SourceKind::Megadock, &args.megadock),
        (SourceKind::Hdock, &args.hdock),
        (SourceKind::AlphaFold, &args.alphafold),
    ]
    .into_iter()
    .filter_map(|(kind, path)| path.clone().map(|p| (kind, p)))
    .collect();

    MergeConfig {
        sources,
        output_path: args.output.clone(),
        write_legend: !args.no_legend,
    }
}

fn build_tool(
    args: &DockArgs,
    file_config: FileConfig,
    defaults: &DefaultsConfig,
) -> Result<ToolConfig> {
    let tool = match args.tool {
        ToolName::Megadock => {
            let file = file_config.megadock.unwrap_or_default();
            ToolConfig::Megadock(MegadockConfig {
                runtime: resolve_runtime(args, file.runtime, &defaults.megadock_runtime, defaults),
                decoys: file.decoys.unwrap_or(defaults.decoys),
                fft_threads: file.fft_threads.unwrap_or(defaults.fft_threads),
                omp_threads: file.omp_threads.unwrap_or(defaults.omp_threads),
            })
        }
        ToolName::Hdock => {
            let file = file_config.hdock.unwrap_or_default();
            ToolConfig::Hdock(HdockConfig {
                runtime: resolve_runtime(args, file.runtime, &defaults.hdock_runtime, defaults),
                spacing: file.spacing.unwrap_or(defaults.spacing),
                angle: file.angle.unwrap_or(defaults.angle),
            })
        }
        ToolName::AlphaFold => {
            let file = file_config.alphafold.unwrap_or_default();
            let required = |cli: &Option<PathBuf>, from_file: Option<PathBuf>, key: &str| {
                cli.clone().or(from_file).ok_or_else(|| {
                    CliError::Config(format!(
                        "A value for 'alphafold.{}' is required either in the config file or via --{}.",
                        key, key
                    ))
                })
            };
            ToolConfig::AlphaFold(AlphaFoldConfig {
                model_dir: required(&args.model_dir, file.model_dir, "model-dir")?,
                database_dir: required(&args.database_dir, file.database_dir, "database-dir")?,
                model_seeds: file
                    .model_seeds
                    .unwrap_or_else(|| defaults.model_seeds.clone()),
                runtime: resolve_runtime(
                    args,
                    file.runtime,
                    &defaults.alphafold_runtime,
                    defaults,
                ),
            })
        }
    };
    Ok(tool)
}

fn resolve_runtime(
    args: &DockArgs,
    file: Option<FileRuntimeConfig>,
    tool_defaults: &RuntimeDefaults,
    defaults: &DefaultsConfig,
) -> Runtime {
    let file = file.unwrap_or_default();
    let kind = if args.bin_dir.is_some() {
        RuntimeKind::Native
    } else if args.image.is_some() {
        RuntimeKind::Container
    } else {
        file.kind.unwrap_or(tool_defaults.kind)
    };

    match kind {
        RuntimeKind::Native => Runtime::Native {
            bin_dir: args.bin_dir.clone().or(file.bin_dir),
        },
        RuntimeKind::Container => Runtime::Container {
            engine: file
                .engine
                .unwrap_or_else(|| defaults.container_engine.to_string()),
            image: args
                .image
                .clone()
                .or(file.image)
                .unwrap_or_else(|| tool_defaults.image.to_string()),
            gpus: file.gpus.unwrap_or(tool_defaults.gpus),
        },
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CliError::Config(format!("Invalid value for {}: {}", key, value))
    })
}

fn apply_runtime_value(
    runtime: &mut Option<FileRuntimeConfig>,
    field: &str,
    key: &str,
    value: &str,
) -> Result<()> {
    let runtime = runtime.get_or_insert_with(Default::default);
    match field {
        "kind" => {
            runtime.kind = Some(
                value
                    .parse()
                    .map_err(|e| CliError::Config(format!("Invalid value for {}: {}", key, e)))?,
            )
        }
        "bin-dir" => runtime.bin_dir = Some(PathBuf::from(value)),
        "engine" => runtime.engine = Some(value.to_string()),
        "image" => runtime.image = Some(value.to_string()),
        "gpus" => runtime.gpus = Some(parse_value(key, value)?),
        _ => return Err(unsupported_key(key)),
    }
    Ok(())
}

fn unsupported_key(key: &str) -> CliError {
    CliError::Config(format!("Unsupported configuration key for --set: '{}'", key))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        let mut segments: Vec<&str> = key.split('.').collect();
        if let Some(kind) = SourceKind::from_name(segments[0]) {
            segments[0] = kind.name();
        }

        match segments.as_slice() {
            ["scheduler", "workers"] => {
                config
                    .scheduler
                    .get_or_insert_with(Default::default)
                    .workers = Some(parse_value(key, value)?);
            }
            ["scheduler", "timeout-secs"] => {
                config
                    .scheduler
                    .get_or_insert_with(Default::default)
                    .timeout_secs = Some(parse_value(key, value)?);
            }
            ["megadock", "decoys"] => {
                config.megadock.get_or_insert_with(Default::default).decoys =
                    Some(parse_value(key, value)?);
            }
            ["megadock", "fft-threads"] => {
                config
                    .megadock
                    .get_or_insert_with(Default::default)
                    .fft_threads = Some(parse_value(key, value)?);
            }
            ["megadock", "omp-threads"] => {
                config
                    .megadock
                    .get_or_insert_with(Default::default)
                    .omp_threads = Some(parse_value(key, value)?);
            }
            ["hdock", "spacing"] => {
                config.hdock.get_or_insert_with(Default::default).spacing =
                    Some(parse_value(key, value)?);
            }
            ["hdock", "angle"] => {
                config.hdock.get_or_insert_with(Default::default).angle =
                    Some(parse_value(key, value)?);
            }
            ["alphafold", "model-dir"] => {
                config.alphafold.get_or_insert_with(Default::default).model_dir =
                    Some(PathBuf::from(value));
            }
            ["alphafold", "database-dir"] => {
                config
                    .alphafold
                    .get_or_insert_with(Default::default)
                    .database_dir = Some(PathBuf::from(value));
            }
            ["megadock", "runtime", field] => {
                let section = config.megadock.get_or_insert_with(Default::default);
                apply_runtime_value(&mut section.runtime, field, key, value)?;
            }
            ["hdock", "runtime", field] => {
                let section = config.hdock.get_or_insert_with(Default::default);
                apply_runtime_value(&mut section.runtime, field, key, value)?;
            }
            ["alphafold", "runtime", field] => {
                let section = config.alphafold.get_or_insert_with(Default::default);
                apply_runtime_value(&mut section.runtime, field, key, value)?;
            }
            _ => return Err(unsupported_key(key)),
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn base_dock_args(tool: ToolName) -> DockArgs {
        DockArgs {
            tool,
            pair_list: PathBuf::from("pairs.txt"),
            input: PathBuf::from("pdb"),
            output_dir: PathBuf::from("out"),
            result_file: None,
            config: None,
            workers: None,
            timeout_secs: None,
            bin_dir: None,
            image: None,
            model_dir: None,
            database_dir: None,
            set_values: vec![],
        }
    }

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("pairdock.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn defaults_fill_everything_not_given() {
        let config = build_dock_config(&base_dock_args(ToolName::Megadock)).unwrap();

        assert_eq!(config.scheduler.workers, 4);
        assert_eq!(config.scheduler.stage_timeout, None);
        assert_eq!(config.result_file, PathBuf::from("megadock_result.txt"));
        assert_eq!(
            config.tool,
            ToolConfig::Megadock(MegadockConfig {
                runtime: Runtime::Container {
                    engine: "docker".to_string(),
                    image: "akiyamalab/megadock:gpu".to_string(),
                    gpus: true,
                },
                decoys: 10800,
                fft_threads: 3,
                omp_threads: 32,
            })
        );
    }

    #[test]
    fn cli_flags_override_file_values() {
        let dir = tempdir().unwrap();
        let mut args = base_dock_args(ToolName::Hdock);
        args.config = Some(write_config(
            dir.path(),
            r#"
            [scheduler]
            workers = 16
            timeout-secs = 600

            [hdock]
            angle = 10.0

            [hdock.runtime]
            bin-dir = "/opt/hdock"
            "#,
        ));
        args.workers = Some(2);
        args.result_file = Some(PathBuf::from("custom.txt"));

        let config = build_dock_config(&args).unwrap();

        assert_eq!(config.scheduler.workers, 2);
        assert_eq!(config.scheduler.stage_timeout, Some(Duration::from_secs(600)));
        assert_eq!(config.result_file, PathBuf::from("custom.txt"));
        assert_eq!(
            config.tool,
            ToolConfig::Hdock(HdockConfig {
                runtime: Runtime::Native {
                    bin_dir: Some(PathBuf::from("/opt/hdock")),
                },
                spacing: 1.2,
                angle: 10.0,
            })
        );
    }

    #[test]
    fn set_values_override_file_values() {
        let dir = tempdir().unwrap();
        let mut args = base_dock_args(ToolName::Megadock);
        args.config = Some(write_config(dir.path(), "[megadock]\ndecoys = 100\n"));
        args.set_values = vec![
            "megadock.decoys=3600".to_string(),
            "megadock.runtime.kind=native".to_string(),
            "scheduler.timeout-secs=0".to_string(),
        ];

        let config = build_dock_config(&args).unwrap();

        let ToolConfig::Megadock(megadock) = config.tool else {
            panic!("expected a MEGADOCK configuration");
        };
        assert_eq!(megadock.decoys, 3600);
        assert_eq!(megadock.runtime, Runtime::Native { bin_dir: None });
        assert_eq!(config.scheduler.stage_timeout, None);
    }

    #[test]
    fn image_flag_selects_a_container_runtime() {
        let mut args = base_dock_args(ToolName::Hdock);
        args.image = Some("registry/hdock:1".to_string());
        args.set_values = vec!["hdock.runtime.engine=podman".to_string()];

        let config = build_dock_config(&args).unwrap();

        assert_eq!(
            *config.tool.runtime(),
            Runtime::Container {
                engine: "podman".to_string(),
                image: "registry/hdock:1".to_string(),
                gpus: false,
            }
        );
    }

    #[test]
    fn alphafold_requires_model_and_database_dirs() {
        let mut args = base_dock_args(ToolName::AlphaFold);
        args.model_dir = Some(PathBuf::from("/models"));
        let err = build_dock_config(&args).unwrap_err();
        assert!(err.to_string().contains("alphafold.database-dir"));

        args.set_values = vec!["alphafold.database-dir=/dbs".to_string()];
        let config = build_dock_config(&args).unwrap();
        let ToolConfig::AlphaFold(alphafold) = config.tool else {
            panic!("expected an AlphaFold configuration");
        };
        assert_eq!(alphafold.database_dir, PathBuf::from("/dbs"));
        assert_eq!(alphafold.model_seeds, vec![1]);
        assert_eq!(config.result_file, PathBuf::from("alphafold_result.txt"));
    }

    #[test]
    fn set_keys_accept_tool_name_aliases() {
        let mut args = base_dock_args(ToolName::AlphaFold);
        args.set_values = vec![
            "AF3.model-dir=/models".to_string(),
            "af.database-dir=/db".to_string(),
            "AlphaFold3.runtime.image=alphafold3:cpu".to_string(),
            "alphafold.runtime.gpus=false".to_string(),
        ];

        let config = build_dock_config(&args).unwrap();

        let ToolConfig::AlphaFold(alphafold) = config.tool else {
            panic!("expected an AlphaFold configuration");
        };
        assert_eq!(alphafold.model_dir, PathBuf::from("/models"));
        assert_eq!(alphafold.database_dir, PathBuf::from("/db"));
        assert_eq!(
            alphafold.runtime,
            Runtime::Container {
                engine: "docker".to_string(),
                image: "alphafold3:cpu".to_string(),
                gpus: false,
            }
        );
    }

    #[test]
    fn malformed_or_unknown_set_values_are_rejected() {
        for bad in [
            "megadock.decoys",
            "hdock.unknown=1",
            "scheduler.workers=many",
            "zdock.runtime.kind=native",
        ] {
            let mut args = base_dock_args(ToolName::Hdock);
            args.set_values = vec![bad.to_string()];
            assert!(
                matches!(build_dock_config(&args), Err(CliError::Config(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn zero_workers_is_a_configuration_error() {
        let mut args = base_dock_args(ToolName::Hdock);
        args.workers = Some(0);
        assert!(matches!(build_dock_config(&args), Err(CliError::Config(_))));
    }

    #[test]
    fn merge_sources_keep_column_order() {
        let args = MergeArgs {
            megadock: None,
            hdock: Some(PathBuf::from("h.tsv")),
            alphafold: Some(PathBuf::from("af.tsv")),
            output: PathBuf::from("merged.tsv"),
            no_legend: true,
        };

        let config = build_merge_config(&args);

        assert_eq!(
            config.sources,
            vec![
                (SourceKind::Hdock, PathBuf::from("h.tsv")),
                (SourceKind::AlphaFold, PathBuf::from("af.tsv")),
            ]
        );
        assert!(!config.write_legend);
    }
}
