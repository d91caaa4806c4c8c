//! Query predicates and options in the content service's query syntax

use std::fmt;

/// A single query predicate, e.g. `[at(document.type, "post")]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Field equals value
    At(String, String),
    /// Field differs from value
    Not(String, String),
    /// Field equals any of the values
    Any(String, Vec<String>),
}

impl Predicate {
    pub fn at(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::At(path.into(), value.into())
    }

    pub fn not(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Not(path.into(), value.into())
    }

    pub fn any<I, S>(path: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Any(path.into(), values.into_iter().map(Into::into).collect())
    }

    /// `at(document.type, "<doc_type>")`
    pub fn document_type(doc_type: &str) -> Self {
        Self::at("document.type", doc_type)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At(path, value) => write!(f, "[at({}, {})]", path, quote(value)),
            Self::Not(path, value) => write!(f, "[not({}, {})]", path, quote(value)),
            Self::Any(path, values) => {
                let values: Vec<String> = values.iter().map(|v| quote(v)).collect();
                write!(f, "[any({}, [{}])]", path, values.join(", "))
            }
        }
    }
}

/// Render a list of predicates as the `q` parameter: `[[a][b]]`
pub fn to_query(predicates: &[Predicate]) -> String {
    let inner: String = predicates.iter().map(ToString::to_string).collect();
    format!("[{}]", inner)
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Sort direction for an [`Ordering`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Sort expression, e.g. `[document.last_publication_date desc]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub field: String,
    pub direction: Direction,
}

impl Ordering {
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Asc => write!(f, "[{}]", self.field),
            Direction::Desc => write!(f, "[{} desc]", self.field),
        }
    }
}

/// Optional query filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Field projection, e.g. `post.title`
    pub fetch: Vec<String>,
    /// Version pin; overrides the client's preview/master ref
    pub r#ref: Option<String>,
    /// Resume after this document id
    pub after: Option<String>,
    /// Page size hint; the service default applies when absent
    pub page_size: Option<u32>,
    pub orderings: Option<Ordering>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetch<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fetch = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ref(mut self, r#ref: Option<String>) -> Self {
        self.r#ref = r#ref;
        self
    }

    pub fn after(mut self, id: impl Into<String>) -> Self {
        self.after = Some(id.into());
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn order_by(mut self, ordering: Ordering) -> Self {
        self.orderings = Some(ordering);
        self
    }

    /// Query-string pairs, excluding `ref` and `access_token`
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if !self.fetch.is_empty() {
            params.push(("fetch", self.fetch.join(",")));
        }
        if let Some(after) = &self.after {
            params.push(("after", after.clone()));
        }
        if let Some(size) = self.page_size {
            params.push(("pageSize", size.to_string()));
        }
        if let Some(ordering) = &self.orderings {
            params.push(("orderings", ordering.to_string()));
        }
        params
    }
}
