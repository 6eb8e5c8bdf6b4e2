use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
fn default_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("jtl_stats=debug,info")
    } else {
        EnvFilter::new("jtl_stats=info,warn")
    }
}

/// Installs the global subscriber. Logs go to stderr so that stdout only
/// carries the report.
///
/// `--quiet` always wins over `RUST_LOG`; otherwise `RUST_LOG` wins over
/// `--verbose`.
pub fn init_logging(verbose: bool, quiet: bool, json: bool) -> anyhow::Result<()> {
    let filter = if quiet {
        default_filter(false, true)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose, false))
    };

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose);

    let installed = if json {
        builder.json().flatten_event(true).try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_pick_the_level() {
        assert_eq!(default_filter(false, true).to_string(), "error");
        assert!(default_filter(true, false).to_string().contains("jtl_stats=debug"));
        assert!(default_filter(false, false).to_string().contains("jtl_stats=info"));
    }
}
