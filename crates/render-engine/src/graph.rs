//! Typed ffmpeg filter graph.
//!
//! Filters and chains are built as values and only turned into
//! `-filter_complex` / `-af` text when the argv is assembled, so tests can
//! inspect structure (labels, filter order, arguments) directly.

use std::fmt;

/// Named stream pad, written as `[name]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamLabel(String);

impl StreamLabel {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Video stream of input `index` (`[N:v]`).
    pub fn video_input(index: usize) -> Self {
        Self(format!("{index}:v"))
    }

    /// Audio stream of input `index` (`[N:a]`).
    pub fn audio_input(index: usize) -> Self {
        Self(format!("{index}:a"))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Form used with `-map`.
    pub fn map_arg(&self) -> String {
        format!("[{}]", self.0)
    }
}

impl fmt::Display for StreamLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

/// One filter argument.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterArg {
    /// Bare positional value, emitted verbatim.
    Positional(String),
    /// `key=value`, escaped for the option parser and then the graph parser.
    KeyValue(String, String),
    /// `key='value'`: option-level escaping, then single-quoted at graph level
    /// so commas in expressions stay readable.
    Quoted(String, String),
    /// drawtext `text=`, escaped for `%` expansion before the two levels above.
    Text(String),
}

impl fmt::Display for FilterArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positional(value) => f.write_str(value),
            Self::KeyValue(key, value) => write!(f, "{key}={}", escape_filter_value(value)),
            Self::Quoted(key, value) => {
                write!(f, "{key}={}", quote_graph_value(&escape_option_value(value)))
            }
            Self::Text(value) => write!(f, "text={}", escape_drawtext_value(value)),
        }
    }
}

/// A single filter invocation, e.g. `scale=1080:1920`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub name: String,
    pub args: Vec<FilterArg>,
}

impl Filter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, value: impl fmt::Display) -> Self {
        self.args.push(FilterArg::Positional(value.to_string()));
        self
    }

    pub fn kv(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.args
            .push(FilterArg::KeyValue(key.into(), value.to_string()));
        self
    }

    pub fn quoted(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.args.push(FilterArg::Quoted(key.into(), value.to_string()));
        self
    }

    pub fn text(mut self, value: impl Into<String>) -> Self {
        self.args.push(FilterArg::Text(value.into()));
        self
    }

    /// Unescaped value of a keyed argument.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.args.iter().find_map(|arg| match arg {
            FilterArg::KeyValue(k, v) | FilterArg::Quoted(k, v) if k == key => Some(v.as_str()),
            FilterArg::Text(v) if key == "text" => Some(v.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            f.write_str(if i == 0 { "=" } else { ":" })?;
            write!(f, "{arg}")?;
        }
        Ok(())
    }
}

/// Linear chain of filters between input and output pads.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterChain {
    pub inputs: Vec<StreamLabel>,
    pub filters: Vec<Filter>,
    pub outputs: Vec<StreamLabel>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, label: StreamLabel) -> Self {
        self.inputs.push(label);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn output(mut self, label: StreamLabel) -> Self {
        self.outputs.push(label);
        self
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for label in &self.inputs {
            write!(f, "{label}")?;
        }
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{filter}")?;
        }
        for label in &self.outputs {
            write!(f, "{label}")?;
        }
        Ok(())
    }
}

/// Full `-filter_complex` graph.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterGraph {
    pub chains: Vec<FilterChain>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chain: FilterChain) {
        self.chains.push(chain);
    }

    pub fn extend(&mut self, other: FilterGraph) {
        self.chains.extend(other.chains);
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Every filter in graph order.
    pub fn filters(&self) -> impl Iterator<Item = &Filter> {
        self.chains.iter().flat_map(|chain| chain.filters.iter())
    }

    pub fn filter_names(&self) -> Vec<&str> {
        self.filters().map(|f| f.name.as_str()).collect()
    }

    pub fn find(&self, name: &str) -> Option<&Filter> {
        self.filters().find(|f| f.name == name)
    }

    /// Chain that produces `label`, if any.
    pub fn producer_of(&self, label: &StreamLabel) -> Option<&FilterChain> {
        self.chains.iter().find(|c| c.outputs.contains(label))
    }

    pub fn has_output(&self, label: &StreamLabel) -> bool {
        self.producer_of(label).is_some()
    }
}

impl fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, chain) in self.chains.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{chain}")?;
        }
        Ok(())
    }
}

/// Render a plain filter list as an `-af`/`-vf` chain.
pub fn chain_to_string(filters: &[Filter]) -> String {
    filters
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// First escaping level: the option parser splits `key=value` pairs on `:`
/// and unescapes `\` and `'`.
pub fn escape_option_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '\'' | ':') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Second escaping level: the graph parser reads each filter's arguments up
/// to `[`, `]`, `,` or `;` and strips one level of `\` and `'`.
pub fn escape_graph_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Graph-level single quoting. Nothing is special inside quotes except the
/// closing quote, so an embedded `'` closes the quote, is escaped, and reopens.
pub fn quote_graph_value(raw: &str) -> String {
    let parts: Vec<String> = raw.split('\'').map(|part| format!("'{part}'")).collect();
    parts.join(r"\'")
}

/// Both levels, for a value placed in `-filter_complex`, `-vf` or `-af`.
///
/// Windows paths carry `:` and `\`, so file names go through this too.
pub fn escape_filter_value(raw: &str) -> String {
    escape_graph_value(&escape_option_value(raw))
}

/// drawtext expands `%{...}` and treats `\` as its own escape; keep user text
/// literal, then apply both filtergraph levels.
pub fn escape_drawtext_value(raw: &str) -> String {
    let literal = raw.replace('\\', r"\\").replace('%', r"\%");
    escape_filter_value(&literal)
}

/// `#rrggbb` to ffmpeg's `0xRRGGBB[@alpha]` colour syntax.
pub fn ffmpeg_color(hex: &str, alpha: Option<f64>) -> String {
    let trimmed = hex.trim().trim_start_matches('#');
    let base = if trimmed.len() == 6 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        format!("0x{}", trimmed.to_ascii_uppercase())
    } else {
        trimmed.to_string()
    };
    match alpha {
        Some(a) => format!("{base}@{:.2}", a.clamp(0.0, 1.0)),
        None => base,
    }
}

/// Format seconds for filter arguments.
pub fn secs(value: f64) -> String {
    let s = format!("{value:.3}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}
