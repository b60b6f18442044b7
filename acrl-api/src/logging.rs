use anyhow::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global fmt subscriber. `filter` uses `RUST_LOG` syntax, e.g. `info` or
/// `acrl_core=debug,info`.
pub fn init_tracing(filter: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_new(filter)?)
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_filters() {
        assert!(init_tracing("acrl_core=notalevel").is_err());
    }
}
