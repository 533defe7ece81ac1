use super::file::RuntimeKind;
use pairdock::engine::config::DEFAULT_WORKERS;
use pairdock::engine::tools::{alphafold, hdock, megadock};

pub struct RuntimeDefaults {
    pub kind: RuntimeKind,
    pub image: &'static str,
    pub gpus: bool,
}

pub struct DefaultsConfig {
    pub workers: usize,
    pub timeout_secs: u64,
    pub container_engine: &'static str,
    pub megadock_runtime: RuntimeDefaults,
    pub decoys: u32,
    pub fft_threads: u32,
    pub omp_threads: u32,
    pub hdock_runtime: RuntimeDefaults,
    pub spacing: f64,
    pub angle: f64,
    pub alphafold_runtime: RuntimeDefaults,
    pub model_seeds: Vec<u32>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            timeout_secs: 0,
            container_engine: "docker",
            megadock_runtime: RuntimeDefaults {
                kind: RuntimeKind::Container,
                image: megadock::DEFAULT_IMAGE,
                gpus: true,
            },
            decoys: megadock::DEFAULT_DECOYS,
            fft_threads: megadock::DEFAULT_FFT_THREADS,
            omp_threads: megadock::DEFAULT_OMP_THREADS,
            hdock_runtime: RuntimeDefaults {
                kind: RuntimeKind::Native,
                image: "hdock",
                gpus: false,
            },
            spacing: hdock::DEFAULT_SPACING,
            angle: hdock::DEFAULT_ANGLE,
            alphafold_runtime: RuntimeDefaults {
                kind: RuntimeKind::Container,
                image: alphafold::DEFAULT_IMAGE,
                gpus: true,
            },
            model_seeds: alphafold::DEFAULT_MODEL_SEEDS.to_vec(),
        }
    }
}
