use std::env;
use std::str::FromStr;
use tracing::warn;

pub const BUFFER_SIZE_VAR: &str = "GATEWAY_BUFFER_SIZE";
pub const WORKER_THREADS_VAR: &str = "GATEWAY_WORKER_THREADS";

/// Settings for [`GatewaySystem`](super::GatewaySystem).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Capacity of the store actor's request channel.
    pub buffer_size: usize,
    /// Worker threads of the runtime hosting the store actor.
    pub worker_threads: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            buffer_size: 32,
            worker_threads: 1,
        }
    }
}

impl GatewayConfig {
    /// Reads `GATEWAY_BUFFER_SIZE` and `GATEWAY_WORKER_THREADS`.
    ///
    /// Unset variables keep the default; unparsable or zero values are logged
    /// and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            buffer_size: positive(BUFFER_SIZE_VAR, lookup(BUFFER_SIZE_VAR))
                .unwrap_or(defaults.buffer_size),
            worker_threads: positive(WORKER_THREADS_VAR, lookup(WORKER_THREADS_VAR))
                .unwrap_or(defaults.worker_threads),
        }
    }
}

fn positive(name: &str, raw: Option<String>) -> Option<usize> {
    let raw = raw?;
    match usize::from_str(raw.trim()) {
        Ok(n) if n > 0 => Some(n),
        _ => {
            warn!(var = name, value = %raw, "Ignoring invalid setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_variables_keep_defaults() {
        assert_eq!(GatewayConfig::from_lookup(|_| None), GatewayConfig::default());
    }

    #[test]
    fn values_are_parsed() {
        let config = GatewayConfig::from_lookup(|name| match name {
            BUFFER_SIZE_VAR => Some("128".into()),
            WORKER_THREADS_VAR => Some(" 4 ".into()),
            _ => None,
        });
        assert_eq!(config.buffer_size, 128);
        assert_eq!(config.worker_threads, 4);
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = GatewayConfig::from_lookup(|name| match name {
            BUFFER_SIZE_VAR => Some("lots".into()),
            WORKER_THREADS_VAR => Some("0".into()),
            _ => None,
        });
        assert_eq!(config, GatewayConfig::default());
    }
}
