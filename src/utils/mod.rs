use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initializes the global tracing subscriber with sensible defaults.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = match "tally_core=info".parse() {
            Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
            Err(_) => EnvFilter::from_default_env(),
        };

        // A host application may already own the global subscriber.
        let _ = fmt().with_env_filter(filter).try_init();
    });
}

/// Rounds a monetary value to two decimal places.
///
/// Applied once, where aggregates leave the engine; intermediate sums stay unrounded.
pub fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    // Normalizes `-0.0` so serialized output stays stable.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Formats a monetary value with exactly two decimals and no grouping.
pub fn format_amount(value: f64) -> String {
    format!("{:.2}", round2(value))
}
