use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Deserialize, Default)]
struct ConfigSection {
    retry_threshold: Option<u32>,
    max_backoff_log: Option<u32>,
    backoff_increment: Option<u32>,
    default_initial_capacity: Option<usize>,
    default_compress_threshold: Option<usize>,
}

#[derive(Deserialize, Default)]
struct Config {
    #[serde(default)]
    config: ConfigSection,
}

struct ResolvedConfig {
    retry_threshold: u32,
    max_backoff_log: u32,
    backoff_increment: u32,
    default_initial_capacity: usize,
    default_compress_threshold: usize,
}

fn resolve_config(cfg: &ConfigSection) -> ResolvedConfig {
    let retry_threshold = cfg.retry_threshold.unwrap_or(7);
    let max_backoff_log = cfg.max_backoff_log.unwrap_or(10);
    let backoff_increment = cfg.backoff_increment.unwrap_or(50);
    let default_initial_capacity = cfg.default_initial_capacity.unwrap_or(16);
    let default_compress_threshold = cfg.default_compress_threshold.unwrap_or(4);

    assert!(retry_threshold > 0, "retry_threshold must be > 0");
    assert!(
        max_backoff_log > 0 && max_backoff_log < 32,
        "max_backoff_log ({max_backoff_log}) must be in 1..32"
    );
    assert!(backoff_increment > 0, "backoff_increment must be > 0");
    assert!(
        default_initial_capacity > 0,
        "default_initial_capacity must be > 0"
    );
    assert!(
        default_compress_threshold > 0,
        "default_compress_threshold must be > 0"
    );

    ResolvedConfig {
        retry_threshold,
        max_backoff_log,
        backoff_increment,
        default_initial_capacity,
        default_compress_threshold,
    }
}

fn default_config_path() -> String {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    format!("{manifest_dir}/hatstack.toml")
}

fn generate_config(cfg: &ResolvedConfig, out_path: &Path) {
    let code = format!(
        "// Auto-generated by build.rs. Do not edit.\n\n\
         pub const RETRY_THRESHOLD: u32 = {};\n\
         pub const MAX_BACKOFF_LOG: u32 = {};\n\
         pub const BACKOFF_INCREMENT: u32 = {};\n\
         pub const DEFAULT_INITIAL_CAPACITY: usize = {};\n\
         pub const DEFAULT_COMPRESS_THRESHOLD: usize = {};\n",
        cfg.retry_threshold,
        cfg.max_backoff_log,
        cfg.backoff_increment,
        cfg.default_initial_capacity,
        cfg.default_compress_threshold,
    );
    fs::write(out_path, code).expect("failed to write config_gen.rs");
}

fn main() {
    println!("cargo:rerun-if-env-changed=HATSTACK_CONFIG");

    let out_dir = env::var("OUT_DIR").unwrap();

    let config_path = env::var("HATSTACK_CONFIG").unwrap_or_else(|_| default_config_path());
    println!("cargo:rerun-if-changed={config_path}");

    let config: Config = match fs::read_to_string(&config_path) {
        Ok(content) => toml::from_str(&content).expect("failed to parse TOML config"),
        Err(_) => Config::default(),
    };

    let resolved = resolve_config(&config.config);
    generate_config(&resolved, &Path::new(&out_dir).join("config_gen.rs"));
}
