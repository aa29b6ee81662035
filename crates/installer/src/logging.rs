//! Tracing setup for binaries and demos

use tracing::Level;

/// Install a formatted tracing subscriber at INFO, or DEBUG when `debug` is set
///
/// Does nothing if a global subscriber is already installed.
pub fn init_tracing(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };

    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing(true);
        init_tracing(false);
        tracing::debug!("still logging");
    }
}
