//! Agent argument parsing
//!
//! The argument string is `&`-separated. The first segment without `=` is
//! the mode, `mode[:selector[,selector...]]`; every other segment is a
//! `key=value` option:
//!
//! ```text
//! all:org.example.service,org.example.dao&heartbeatInterval=10&heartbeatUrl=http://monitor:8080/hb
//! ```
//!
//! Parsing never fails. Rejected pieces are returned as configuration errors
//! alongside the arguments, with defaults kept in their place.

use std::fmt;
use std::time::Duration;

use interpose_core::{ConfigurationError, InterceptionStrategy};
use interpose_dispatch::{AdvancedInterceptor, ControllerInterceptor, PackageInterceptor, TimingAdvice};
use interpose_matcher::{package_starts_with, web_entry_point};
use interpose_registry::{Binding, Registry, RegistryBuilder};

use crate::{HeartbeatConfig, LogFormat};

/// Selectors containing this get an extra `advanced` binding in `all` mode
const DAO_MARKER: &str = "dao";

/// Startup mode
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Web entry points with the controller interceptor
    #[default]
    Default,
    /// Types under a namespace, delegation
    Package(String),
    /// Types under a namespace, timing advice
    Advice(String),
    /// Types under a namespace, delegation with extended context
    Advanced(String),
    /// Default plus one package binding per selector
    All(Vec<String>),
    /// The named mode was missing its selector and installs nothing
    Incomplete(String),
}

impl Mode {
    /// Parse `mode[:selector[,selector...]]`
    fn parse(raw: &str, errors: &mut Vec<ConfigurationError>) -> Mode {
        let raw = raw.trim();
        if raw.is_empty() {
            return Mode::Default;
        }
        let (name, selectors) = match raw.split_once(':') {
            Some((name, rest)) => (name.trim(), rest),
            None => (raw, ""),
        };

        match name {
            "package" | "advice" | "advanced" => {
                let selector = match single_selector(name, selectors, errors) {
                    Some(selector) => selector,
                    None => return Mode::Incomplete(name.to_string()),
                };
                match name {
                    "package" => Mode::Package(selector),
                    "advice" => Mode::Advice(selector),
                    _ => Mode::Advanced(selector),
                }
            }
            "all" => {
                let selectors: Vec<String> = selectors
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .filter_map(|s| valid_selector(s, errors))
                    .collect();
                if selectors.is_empty() {
                    errors.push(ConfigurationError::MissingSelector(name.to_string()));
                }
                Mode::All(selectors)
            }
            _ => {
                errors.push(ConfigurationError::UnknownMode(name.to_string()));
                Mode::Default
            }
        }
    }

    /// Bindings this mode installs, in registration order
    pub fn bindings(&self) -> Vec<Binding> {
        match self {
            Mode::Default => vec![default_binding()],
            Mode::Package(prefix) => vec![package_binding(prefix)],
            Mode::Advice(prefix) => vec![advice_binding(prefix)],
            Mode::Advanced(prefix) => vec![advanced_binding(prefix)],
            Mode::All(selectors) => {
                let mut bindings = vec![default_binding()];
                bindings.extend(selectors.iter().map(|s| package_binding(s)));
                bindings.extend(
                    selectors
                        .iter()
                        .filter(|s| s.contains(DAO_MARKER))
                        .map(|s| advanced_binding(s)),
                );
                bindings
            }
            Mode::Incomplete(_) => Vec::new(),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Default => f.write_str("default"),
            Mode::Package(p) => write!(f, "package:{}", p),
            Mode::Advice(p) => write!(f, "advice:{}", p),
            Mode::Advanced(p) => write!(f, "advanced:{}", p),
            Mode::All(selectors) => write!(f, "all:{}", selectors.join(",")),
            Mode::Incomplete(name) => write!(f, "{} (no selector)", name),
        }
    }
}

fn single_selector(mode: &str, raw: &str, errors: &mut Vec<ConfigurationError>) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.push(ConfigurationError::MissingSelector(mode.to_string()));
        return None;
    }
    if raw.contains(',') {
        errors.push(ConfigurationError::MalformedSelector(raw.to_string()));
        return None;
    }
    valid_selector(raw, errors)
}

/// Namespace prefixes are identifier characters, dots and `$`
fn valid_selector(raw: &str, errors: &mut Vec<ConfigurationError>) -> Option<String> {
    let ok = raw
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '$' | ':'));
    if ok {
        Some(raw.to_string())
    } else {
        errors.push(ConfigurationError::MalformedSelector(raw.to_string()));
        None
    }
}

/// Web entry points, controller interceptor
pub fn default_binding() -> Binding {
    Binding::for_types(web_entry_point(), InterceptionStrategy::delegation(ControllerInterceptor))
}

pub fn package_binding(prefix: &str) -> Binding {
    Binding::for_types(package_starts_with(prefix), InterceptionStrategy::delegation(PackageInterceptor))
}

pub fn advice_binding(prefix: &str) -> Binding {
    Binding::for_types(package_starts_with(prefix), InterceptionStrategy::advice(TimingAdvice))
}

pub fn advanced_binding(prefix: &str) -> Binding {
    Binding::for_types(
        package_starts_with(prefix),
        InterceptionStrategy::delegation(AdvancedInterceptor::new()),
    )
}

/// Parsed agent arguments
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AgentArgs {
    pub mode: Mode,
    pub heartbeat: HeartbeatConfig,
    pub verbose: bool,
    pub log_format: LogFormat,
}

impl AgentArgs {
    pub fn parse(raw: Option<&str>) -> (AgentArgs, Vec<ConfigurationError>) {
        let mut args = AgentArgs::default();
        let mut errors = Vec::new();
        let mut mode_seen = false;
        let mut heartbeat_switch = None;

        for segment in raw.unwrap_or("").split('&').map(str::trim) {
            if segment.is_empty() {
                continue;
            }
            match segment.split_once('=') {
                None if !mode_seen => {
                    mode_seen = true;
                    args.mode = Mode::parse(segment, &mut errors);
                }
                None => errors.push(ConfigurationError::UnknownOption(segment.to_string())),
                Some((key, value)) => {
                    let (key, value) = (key.trim(), value.trim());
                    if let Err(e) = args.apply(key, value, &mut heartbeat_switch) {
                        errors.push(e);
                    }
                }
            }
        }

        args.heartbeat.enabled = heartbeat_switch.unwrap_or(args.heartbeat.url.is_some());
        (args, errors)
    }

    fn apply(
        &mut self,
        key: &str,
        value: &str,
        heartbeat_switch: &mut Option<bool>,
    ) -> Result<(), ConfigurationError> {
        let invalid = || ConfigurationError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            "heartbeatInterval" => {
                let interval = parse_seconds(value).ok_or_else(invalid)?;
                if interval.is_zero() {
                    return Err(invalid());
                }
                self.heartbeat.interval = interval;
            }
            "heartbeatDelay" => {
                self.heartbeat.initial_delay = parse_seconds(value).ok_or_else(invalid)?;
            }
            "heartbeatUrl" => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(invalid());
                }
                self.heartbeat.url = Some(value.to_string());
            }
            "heartbeat" => *heartbeat_switch = Some(parse_switch(value).ok_or_else(invalid)?),
            "verbose" => self.verbose = parse_switch(value).ok_or_else(invalid)?,
            "log" => self.log_format = value.parse()?,
            _ => return Err(ConfigurationError::UnknownOption(key.to_string())),
        }
        Ok(())
    }

    pub fn bindings(&self) -> Vec<Binding> {
        self.mode.bindings()
    }

    /// Freeze this configuration's bindings into a registry
    pub fn registry(&self) -> Registry {
        let mut builder = RegistryBuilder::new();
        for binding in self.bindings() {
            builder.register(binding);
        }
        builder.build()
    }
}

/// Whole seconds (`30`) or a humantime duration (`1m 30s`, `500ms`)
fn parse_seconds(value: &str) -> Option<Duration> {
    match value.parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(_) => humantime::parse_duration(value).ok(),
    }
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}
