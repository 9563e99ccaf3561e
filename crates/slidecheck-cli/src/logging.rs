//! Tracing setup. Logs go to stderr; stdout carries only the report.

use tracing_subscriber::EnvFilter;

const WORKSPACE_CRATES: [&str; 5] = [
    "slidecheck",
    "slidecheck_cli",
    "slidecheck_detector",
    "slidecheck_extractor",
    "slidecheck_llm",
];

/// Filter directives for the requested verbosity
pub fn directives(verbose: bool, debug: bool) -> String {
    if debug {
        return "trace".to_string();
    }
    if verbose {
        let crates: Vec<String> = WORKSPACE_CRATES
            .iter()
            .map(|c| format!("{}=debug", c))
            .collect();
        return format!("info,{}", crates.join(","));
    }
    "info".to_string()
}

/// Install the global subscriber; `RUST_LOG` takes precedence over the flags
pub fn init(verbose: bool, debug: bool, ansi: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directives(verbose, debug)));

    // A subscriber may already be installed (tests); keep it
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_ansi(ansi)
        .with_target(debug)
        .try_init();
}
