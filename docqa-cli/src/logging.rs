//! Log output to stderr.
//!
//! `RUST_LOG` takes precedence over `-v`:
//! ```bash
//! RUST_LOG=docqa_rag=debug docqa ask "what is this?"
//! ```

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Stdout stays reserved for answers.
pub fn init(verbosity: u8) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(default_directives(verbosity))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity > 1)
        .init();
}

fn default_directives(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    format!("warn,docqa={level},docqa_rag={level}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_crate_levels_only() {
        assert_eq!(default_directives(0), "warn,docqa=warn,docqa_rag=warn");
        assert_eq!(default_directives(1), "warn,docqa=info,docqa_rag=info");
        assert_eq!(default_directives(5), "warn,docqa=debug,docqa_rag=debug");
    }
}
