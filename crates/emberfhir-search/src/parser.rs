//! Raw query term parsing.
//!
//! [`QueryTermParser`] sorts a request's key-value pairs into the typed
//! fields of [`FhirQuery`]: paging, includes, sort order, `_has` trees,
//! result-shape switches and opaque whole-result filters. Anything it
//! does not recognize lands in the residual dictionary on purpose, so
//! unknown parameters are diagnosed later against the catalogue instead
//! of being rejected as syntax.

use std::fmt;

use indexmap::IndexMap;

/// One parsed `_include` or `_revinclude` instruction, still unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeTerm {
    /// The raw value, e.g. `Observation:subject` or `MedicationRequest:*`.
    pub raw: String,
    /// Set by an `:iterate` or `:recurse` suffix on the key.
    pub iterate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortTerm {
    pub code: String,
    pub direction: SortDirection,
}

/// One `_has` chain as written, before catalogue resolution.
///
/// Nested chains link through `child`; only the innermost node carries
/// the terminal parameter code and the request value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHasTerm {
    pub target_type: String,
    pub back_reference: String,
    pub code: Option<String>,
    pub value: Option<String>,
    pub child: Option<Box<RawHasTerm>>,
}

impl RawHasTerm {
    /// The request value carried by the innermost level.
    pub fn terminal_value(&self) -> Option<&str> {
        match &self.child {
            Some(child) => child.terminal_value(),
            None => self.value.as_deref(),
        }
    }
}

impl fmt::Display for RawHasTerm {
    /// Reconstructs the canonical key, without the request value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_has:{}:{}:", self.target_type, self.back_reference)?;
        match (&self.child, &self.code) {
            (Some(child), _) => write!(f, "{child}"),
            (None, Some(code)) => write!(f, "{code}"),
            (None, None) => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainedMode {
    False,
    True,
    Both,
}

impl ContainedMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "false" => Some(Self::False),
            "true" => Some(Self::True),
            "both" => Some(Self::Both),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainedTypeMode {
    Container,
    Contained,
}

impl ContainedTypeMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "container" => Some(Self::Container),
            "contained" => Some(Self::Contained),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryMode {
    True,
    Text,
    Data,
    Count,
    False,
}

impl SummaryMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "true" => Some(Self::True),
            "text" => Some(Self::Text),
            "data" => Some(Self::Data),
            "count" => Some(Self::Count),
            "false" => Some(Self::False),
            _ => None,
        }
    }
}

/// A term the parser understood structurally but could not accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTerm {
    pub name: String,
    pub value: String,
    pub message: String,
}

/// An earlier occurrence dropped by a later repeat of the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscardedTerm {
    pub name: String,
    pub value: String,
}

/// The parsed-term bag of one request.
///
/// Residual entries keep the order and repetition they arrived in; the
/// catalogue-aware layer decides later whether they are real search
/// parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FhirQuery {
    pub count: Option<u32>,
    pub page: Option<u32>,
    pub includes: Vec<IncludeTerm>,
    pub revincludes: Vec<IncludeTerm>,
    pub sort: Vec<SortTerm>,
    pub has: Vec<RawHasTerm>,
    pub contained: Option<ContainedMode>,
    pub contained_type: Option<ContainedTypeMode>,
    pub summary: Option<SummaryMode>,
    pub text: Option<String>,
    pub content: Option<String>,
    pub query: Option<String>,
    pub filter: Option<String>,
    pub residual: IndexMap<String, Vec<String>>,
    pub invalid: Vec<InvalidTerm>,
    pub discarded: Vec<DiscardedTerm>,
}

/// Sorts raw key-value pairs into a [`FhirQuery`].
#[derive(Debug, Default)]
pub struct QueryTermParser {
    query: FhirQuery,
}

impl QueryTermParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one request's terms, replacing any previous state.
    ///
    /// Returns false iff at least one term was recorded invalid.
    pub fn parse(&mut self, terms: &[(String, String)]) -> bool {
        self.query = FhirQuery::default();
        for (key, value) in terms {
            self.parse_term(key, value);
        }
        self.query.invalid.is_empty()
    }

    pub fn query(&self) -> &FhirQuery {
        &self.query
    }

    pub fn into_query(self) -> FhirQuery {
        self.query
    }

    fn parse_term(&mut self, key: &str, value: &str) {
        let query = &mut self.query;
        match key {
            "_count" | "page" => parse_paging(query, key, value),
            "_sort" => parse_sort(query, value),
            "_contained" => match ContainedMode::parse(value) {
                Some(mode) => query.contained = Some(mode),
                None => push_invalid(query, key, value, "expected false, true or both"),
            },
            "_containedType" => match ContainedTypeMode::parse(value) {
                Some(mode) => query.contained_type = Some(mode),
                None => push_invalid(query, key, value, "expected container or contained"),
            },
            "_summary" => match SummaryMode::parse(value) {
                Some(mode) => query.summary = Some(mode),
                None => push_invalid(query, key, value, "expected true, text, data, count or false"),
            },
            "_text" => query.text = Some(value.to_string()),
            "_content" => query.content = Some(value.to_string()),
            "_query" => query.query = Some(value.to_string()),
            "_filter" => query.filter = Some(value.to_string()),
            _ if key == "_include" || key.starts_with("_include:") => {
                parse_include(query, key, value, false);
            }
            _ if key == "_revinclude" || key.starts_with("_revinclude:") => {
                parse_include(query, key, value, true);
            }
            _ if key == "_has" || key.starts_with("_has:") => parse_has(query, key, value),
            _ => {
                query
                    .residual
                    .entry(key.to_string())
                    .or_default()
                    .push(value.to_string());
            }
        }
    }
}

fn push_invalid(query: &mut FhirQuery, name: &str, value: &str, message: impl Into<String>) {
    query.invalid.push(InvalidTerm {
        name: name.to_string(),
        value: value.to_string(),
        message: message.into(),
    });
}

/// `_count` and `page`: single non-negative integer, last occurrence wins.
fn parse_paging(query: &mut FhirQuery, name: &str, raw: &str) {
    let Ok(parsed) = raw.parse::<u32>() else {
        push_invalid(query, name, raw, "expected a non-negative integer");
        return;
    };
    let slot = if name == "_count" {
        &mut query.count
    } else {
        &mut query.page
    };
    if let Some(previous) = slot.replace(parsed) {
        query.discarded.push(DiscardedTerm {
            name: name.to_string(),
            value: previous.to_string(),
        });
    }
}

/// Each `_sort` instance contributes one term; `-` prefixes descending.
fn parse_sort(query: &mut FhirQuery, raw: &str) {
    let (direction, code) = match raw.strip_prefix('-') {
        Some(rest) => (SortDirection::Descending, rest),
        None => (SortDirection::Ascending, raw),
    };
    if code.is_empty() {
        push_invalid(query, "_sort", raw, "empty sort parameter");
        return;
    }
    query.sort.push(SortTerm {
        code: code.to_string(),
        direction,
    });
}

fn parse_include(query: &mut FhirQuery, key: &str, value: &str, reverse: bool) {
    let parts: Vec<&str> = key.split(':').collect();
    let iterate = match parts.as_slice() {
        [_] => false,
        [_, "iterate" | "recurse"] => true,
        _ => {
            push_invalid(
                query,
                key,
                value,
                "only a single ':iterate' or ':recurse' suffix is allowed",
            );
            return;
        }
    };
    let term = IncludeTerm {
        raw: value.to_string(),
        iterate,
    };
    if reverse {
        query.revincludes.push(term);
    } else {
        query.includes.push(term);
    }
}

/// `_has` keys split on the literal `_has`; every segment must carry
/// exactly four colon-delimited fields with an empty lead. An empty
/// fourth field continues nesting, a non-empty one is the terminal
/// parameter taking the request value. Any malformed segment invalidates
/// the whole term.
fn parse_has(query: &mut FhirQuery, key: &str, value: &str) {
    let mut links: Vec<(String, String, Option<String>)> = Vec::new();
    for segment in key.split("_has").skip(1) {
        let fields: Vec<&str> = segment.split(':').collect();
        let shaped = fields.len() == 4
            && fields[0].is_empty()
            && !fields[1].is_empty()
            && !fields[2].is_empty();
        if !shaped {
            push_invalid(
                query,
                key,
                value,
                format!("malformed _has segment '_has{segment}'"),
            );
            return;
        }
        links.push((
            fields[1].to_string(),
            fields[2].to_string(),
            (!fields[3].is_empty()).then(|| fields[3].to_string()),
        ));
    }

    let mut rev = links.into_iter().rev();
    let Some((target_type, back_reference, code)) = rev.next() else {
        push_invalid(query, key, value, "empty _has parameter");
        return;
    };
    if code.is_none() {
        push_invalid(query, key, value, "missing terminal search parameter");
        return;
    }
    let mut node = RawHasTerm {
        target_type,
        back_reference,
        code,
        value: Some(value.to_string()),
        child: None,
    };
    for (target_type, back_reference, code) in rev {
        if code.is_some() {
            push_invalid(
                query,
                key,
                value,
                "only the last _has segment may name a terminal parameter",
            );
            return;
        }
        node = RawHasTerm {
            target_type,
            back_reference,
            code: None,
            value: None,
            child: Some(Box::new(node)),
        };
    }
    query.has.push(node);
}
