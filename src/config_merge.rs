//! Configuration merging and default values (Issue #39).
//!
//! This module implements configuration precedence:
//! Environment Variables > YAML File > Default Values

use std::collections::HashMap;
use std::env;
use std::time::Duration;

/// Default configuration values for all optional fields.
#[derive(Debug, Clone)]
pub struct ConfigDefaults {
    /// Default number of workers
    pub workers: usize,

    /// Default request timeout
    pub timeout: Duration,

    /// Default skip TLS verify
    pub skip_tls_verify: bool,

    /// Default scenario weight
    pub scenario_weight: f64,

    /// Default load model
    pub load_model: String,
}

impl Default for ConfigDefaults {
    fn default() -> Self {
        Self {
            workers: 10,
            timeout: Duration::from_secs(30),
            skip_tls_verify: false,
            scenario_weight: 1.0,
            load_model: "concurrent".to_string(),
        }
    }
}

impl ConfigDefaults {
    /// Get default configuration values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get default workers count.
    pub fn workers() -> usize {
        10
    }

    /// Get default timeout duration.
    pub fn timeout() -> Duration {
        Duration::from_secs(30)
    }

    /// Get default skip TLS verify flag.
    pub fn skip_tls_verify() -> bool {
        false
    }

    /// Get default scenario weight.
    pub fn scenario_weight() -> f64 {
        1.0
    }

    /// Get default load model.
    pub fn load_model() -> String {
        "concurrent".to_string()
    }
}

/// Configuration precedence resolver.
///
/// Resolves configuration values according to precedence:
/// 1. Environment variables (highest priority)
/// 2. YAML file values
/// 3. Default values (lowest priority)
pub struct ConfigMerger;

impl ConfigMerger {
    /// Merge workers with precedence: env > yaml > default.
    pub fn merge_workers(yaml_value: Option<usize>, env_var: &str) -> usize {
        // Check environment variable first
        if let Ok(env_val) = env::var(env_var) {
            if let Ok(parsed) = env_val.parse::<usize>() {
                return parsed;
            }
        }

        // Fall back to YAML value or default
        yaml_value.unwrap_or_else(ConfigDefaults::workers)
    }

    /// Merge timeout with precedence: env > yaml > default.
    pub fn merge_timeout(yaml_value: Option<Duration>, env_var: &str) -> Duration {
        // Check environment variable first
        if let Ok(env_val) = env::var(env_var) {
            if let Ok(parsed) = crate::utils::parse_duration_string(&env_val) {
                return parsed;
            }
        }

        // Fall back to YAML value or default
        yaml_value.unwrap_or_else(ConfigDefaults::timeout)
    }

    /// Merge skip TLS verify with precedence: env > yaml > default.
    pub fn merge_skip_tls_verify(yaml_value: Option<bool>, env_var: &str) -> bool {
        // Check environment variable first
        if let Ok(env_val) = env::var(env_var) {
            return env_val.to_lowercase() == "true";
        }

        // Fall back to YAML value or default
        yaml_value.unwrap_or_else(ConfigDefaults::skip_tls_verify)
    }

    /// Merge scenario weight with precedence: yaml > default.
    pub fn merge_scenario_weight(yaml_value: Option<f64>) -> f64 {
        yaml_value.unwrap_or_else(ConfigDefaults::scenario_weight)
    }

    /// Merge string value with precedence: env > yaml > default.
    pub fn merge_string(
        yaml_value: Option<String>,
        env_var: &str,
        default: String,
    ) -> String {
        // Check environment variable first
        if let Ok(env_val) = env::var(env_var) {
            if !env_val.is_empty() {
                return env_val;
            }
        }

        // Fall back to YAML value or default
        yaml_value.unwrap_or(default)
    }

    /// Merge optional string with precedence: env > yaml.
    pub fn merge_optional_string(
        yaml_value: Option<String>,
        env_var: &str,
    ) -> Option<String> {
        // Check environment variable first
        if let Ok(env_val) = env::var(env_var) {
            if !env_val.is_empty() {
                return Some(env_val);
            }
        }

        // Fall back to YAML value
        yaml_value
    }

    /// Merge RPS value with precedence: env > yaml.
    pub fn merge_rps(yaml_value: Option<f64>, env_var: &str) -> Option<f64> {
        // Check environment variable first
        if let Ok(env_val) = env::var(env_var) {
            if let Ok(parsed) = env_val.parse::<f64>() {
                return Some(parsed);
            }
        }

        // Fall back to YAML value
        yaml_value
    }
}

/// Configuration precedence documentation.
pub struct ConfigPrecedence;

impl ConfigPrecedence {
    /// Get documentation for configuration precedence.
    pub fn documentation() -> &'static str {
        r#"
# Configuration Precedence

Configuration values are resolved in the following order (highest to lowest priority):

1. **Environment Variables** (Highest Priority)
   - Override both YAML and defaults
   - Useful for CI/CD, Docker, Kubernetes
   - Example: NUM_CONCURRENT_TASKS=50

2. **YAML Configuration File**
   - Override defaults
   - Version-controlled test definitions
   - Example: config.workers: 20

3. **Default Values** (Lowest Priority)
   - Used when not specified in YAML or environment
   - Sensible defaults for common use cases

## Default Values

- workers: 10
- timeout: 30s
- skipTlsVerify: false
- scenario weight: 1.0
- load model: "concurrent"

## Environment Variable Mapping

| YAML Path         | Environment Variable      | Default |
|-------------------|---------------------------|---------|
| config.workers    | NUM_CONCURRENT_TASKS      | 10      |
| config.timeout    | REQUEST_TIMEOUT           | 30s     |
| config.skipTlsVerify | SKIP_TLS_VERIFY        | false   |
| config.baseUrl    | TARGET_URL                | (required) |
| config.duration   | TEST_DURATION             | (required) |
| load.target       | TARGET_RPS                | -       |

## Examples

### Example 1: All Defaults
```yaml
version: "1.0"
config:
  baseUrl: "https://api.example.com"
  duration: "5m"
  # workers: will use default 10
  # timeout: will use default 30s
load:
  model: "concurrent"  # default
scenarios:
  - name: "Test"
    # weight: will use default 1.0
    steps: [...]
```

### Example 2: YAML Overrides Defaults
```yaml
version: "1.0"
config:
  baseUrl: "https://api.example.com"
  workers: 50        # overrides default 10
  timeout: "60s"     # overrides default 30s
  duration: "5m"
load:
  model: "rps"
  target: 100
scenarios:
  - name: "Test"
    weight: 2.0      # overrides default 1.0
    steps: [...]
```

### Example 3: Environment Overrides Everything
```bash
# YAML has workers: 50
# Environment has NUM_CONCURRENT_TASKS=100
# Result: 100 workers (env wins)

NUM_CONCURRENT_TASKS=100 \
TARGET_RPS=200 \
rust_loadtest --config test.yaml
```

### Example 4: Mixed Precedence
```yaml
# test.yaml
config:
  baseUrl: "https://api.example.com"
  workers: 50        # from YAML
  timeout: "60s"     # from YAML
  duration: "5m"
```

```bash
# Run with environment override
NUM_CONCURRENT_TASKS=100 rust_loadtest --config test.yaml

# Result:
# - baseUrl: from YAML (https://api.example.com)
# - workers: 100 (from ENV, overrides YAML's 50)
# - timeout: 60s (from YAML)
# - duration: 5m (from YAML)
```

## Best Practices

1. **Use YAML for base configuration**
   - Version control your test definitions
   - Document test scenarios
   - Set reasonable defaults

2. **Use environment variables for overrides**
   - CI/CD pipeline customization
   - Container/Kubernetes configuration
   - Quick parameter changes

3. **Rely on defaults for common settings**
   - Timeout, workers, scenario weights
   - Reduces config file verbosity
   - Sensible defaults for most use cases
"#
    }

    /// Print precedence documentation to stdout.
    pub fn print_documentation() {
        println!("{}", Self::documentation());
    }
}
