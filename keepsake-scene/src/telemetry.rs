//! Log output setup.

use tracing_subscriber::EnvFilter;

use keepsake_core::config::GeneralConfig;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `general.log_level` when set. Returns `false` if a
/// subscriber was already installed.
pub fn init_tracing(general: &GeneralConfig) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&general.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true);

    let installed = if general.json_logs {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_refused() {
        let general = GeneralConfig::default();
        init_tracing(&general);
        assert!(!init_tracing(&general));
    }
}
