//! Multi-step scenario definitions and execution context.
//!
//! This module provides the core data structures for defining and executing
//! multi-step load testing scenarios. A scenario consists of a sequence of steps
//! that can extract variables, make assertions, and maintain state across requests.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A multi-step test scenario representing a user journey.
///
/// # Example
/// ```
/// use rust_loadtest::scenario::{Scenario, Step, RequestConfig};
///
/// let scenario = Scenario {
///     name: "Shopping Flow".to_string(),
///     weight: 1.0,
///     steps: vec![
///         Step {
///             name: "Browse Products".to_string(),
///             request: RequestConfig {
///                 method: "GET".to_string(),
///                 path: "/products".to_string(),
///                 body: None,
///                 headers: HashMap::new(),
///             },
///             extractions: vec![],
///             assertions: vec![],
///             think_time: Some(rust_loadtest::scenario::ThinkTime::Fixed(Duration::from_secs(2))),
///             cache: None,
///         },
///     ],
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    /// Weight for traffic distribution (higher = more traffic)
    /// Used when running multiple scenarios: weight / sum(all_weights) = traffic percentage
    pub weight: f64,

    /// Sequential steps to execute
    pub steps: Vec<Step>,
}

/// A single step within a scenario.
#[derive(Debug, Clone)]
pub struct Step {
    /// Descriptive name for this step (e.g., "Login", "Add to Cart")
    pub name: String,

    /// HTTP request configuration
    pub request: RequestConfig,

    /// Variables to extract from the response
    pub extractions: Vec<VariableExtraction>,

    /// Assertions to validate the response
    pub assertions: Vec<Assertion>,

    /// Optional delay after this step completes (think time)
    pub think_time: Option<ThinkTime>,

    /// Optional session-cache config: replay extracted variables from a
    /// prior execution of this step instead of issuing a new request.
    pub cache: Option<CacheConfig>,
}

/// Session-cache settings for a step (see `executor::SessionStore`).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a cached result remains valid.
    pub ttl: Duration,
}

/// Delay applied after a step completes.
#[derive(Debug, Clone)]
pub enum ThinkTime {
    /// Sleep for exactly this long.
    Fixed(Duration),
    /// Sleep for a uniformly random duration in `[min, max]`.
    Random { min: Duration, max: Duration },
}

impl ThinkTime {
    /// Resolve this think-time spec to a concrete delay, sampling for `Random`.
    pub fn calculate_delay(&self) -> Duration {
        match self {
            ThinkTime::Fixed(d) => *d,
            ThinkTime::Random { min, max } => {
                if max <= min {
                    return *min;
                }
                let min_ms = min.as_millis() as u64;
                let max_ms = max.as_millis() as u64;
                let ms = rand::Rng::gen_range(&mut rand::thread_rng(), min_ms..=max_ms);
                Duration::from_millis(ms)
            }
        }
    }
}

/// HTTP request configuration for a step.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// HTTP method (GET, POST, PUT, DELETE, etc.)
    pub method: String,

    /// Request path (can contain variable references like "/products/${product_id}")
    pub path: String,

    /// Optional request body (can contain variable references)
    pub body: Option<String>,

    /// Request headers (values can contain variable references)
    pub headers: HashMap<String, String>,
}

/// Extract a variable from the response for use in subsequent steps.
#[derive(Debug, Clone)]
pub struct VariableExtraction {
    /// Name to store the extracted value under
    pub name: String,

    /// How to extract the value from the response
    pub extractor: Extractor,
}

/// Methods for extracting values from HTTP responses.
#[derive(Debug, Clone)]
pub enum Extractor {
    /// Extract from JSON response using JSONPath (e.g., "$.user.id")
    JsonPath(String),

    /// Extract using regex with named capture group
    Regex {
        pattern: String,
        group: String,
    },

    /// Extract from response header
    Header(String),

    /// Extract from cookie
    Cookie(String),
}

/// Assert conditions on the HTTP response.
#[derive(Debug, Clone)]
pub enum Assertion {
    /// Assert response status code equals expected value
    StatusCode(u16),

    /// Assert response time is below threshold
    ResponseTime(Duration),

    /// Assert JSON path exists and optionally matches value
    JsonPath {
        path: String,
        expected: Option<String>,
    },

    /// Assert response body contains substring
    BodyContains(String),

    /// Assert response body matches regex
    BodyMatches(String),

    /// Assert a response header is present
    HeaderExists(String),
}

/// Execution context maintained across steps in a scenario.
///
/// Each virtual user gets their own context to maintain state across
/// the steps in a scenario execution.
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    /// Extracted variables from previous steps
    variables: HashMap<String, String>,

    /// When this scenario execution started
    scenario_start: Instant,

    /// Current step index being executed
    current_step: usize,
}

impl ScenarioContext {
    /// Create a new scenario context.
    pub fn new() -> Self {
        Self {
            variables: HashMap::new(),
            scenario_start: Instant::now(),
            current_step: 0,
        }
    }

    /// Store a variable for use in subsequent steps.
    pub fn set_variable(&mut self, name: String, value: String) {
        self.variables.insert(name, value);
    }

    /// Get a previously stored variable.
    pub fn get_variable(&self, name: &str) -> Option<&String> {
        self.variables.get(name)
    }

    /// Replace variable references in a string with their values.
    ///
    /// Supports syntax:
    /// - ${variable_name} or $variable_name - Replace with stored variable
    /// - ${timestamp} - Replace with current Unix timestamp in milliseconds
    ///
    /// # Example
    /// ```
    /// use rust_loadtest::scenario::ScenarioContext;
    ///
    /// let mut ctx = ScenarioContext::new();
    /// ctx.set_variable("user_id".to_string(), "12345".to_string());
    ///
    /// let result = ctx.substitute_variables("/users/${user_id}/profile");
    /// assert_eq!(result, "/users/12345/profile");
    /// ```
    pub fn substitute_variables(&self, input: &str) -> String {
        let mut result = input.to_string();

        // Replace special ${timestamp} variable with current timestamp
        if result.contains("${timestamp}") {
            let timestamp = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_millis()
                .to_string();
            result = result.replace("${timestamp}", &timestamp);
        }

        // Replace ${var} syntax
        for (name, value) in &self.variables {
            let pattern = format!("${{{}}}", name);
            result = result.replace(&pattern, value);
        }

        // Replace $var syntax (for simple variable names)
        for (name, value) in &self.variables {
            let pattern = format!("${}", name);
            // Only replace if not followed by { (to avoid replacing ${var} twice)
            result = result.replace(&pattern, value);
        }

        result
    }

    /// Get elapsed time since scenario started.
    pub fn elapsed(&self) -> Duration {
        self.scenario_start.elapsed()
    }

    /// Get current step index.
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Advance to next step.
    pub fn next_step(&mut self) {
        self.current_step += 1;
    }

    /// Reset context for a new scenario execution.
    pub fn reset(&mut self) {
        self.variables.clear();
        self.scenario_start = Instant::now();
        self.current_step = 0;
    }
}

impl Default for ScenarioContext {
    fn default() -> Self {
        Self::new()
    }
}
