//! Structured queries understood by the search engines.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    Must,
    Should,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchQuery {
    Term { field: String, term: String },
    Prefix { field: String, prefix: String },
    /// Terms at consecutive positions
    Phrase { field: String, terms: Vec<String> },
    SpanTerm { field: String, term: String },
    SpanPrefix { field: String, prefix: String },
    /// Clause spans in order, with at most `slop` positions between them in total
    SpanNear { field: String, clauses: Vec<SearchQuery>, slop: u32 },
    /// Reports the spans of `query` as if they came from `field`
    FieldMask { query: Box<SearchQuery>, field: String },
    Boolean { clauses: Vec<(Occur, SearchQuery)>, minimum_should_match: usize },
}

impl SearchQuery {
    pub fn term(field: &str, term: &str) -> Self { SearchQuery::Term { field: field.to_string(), term: term.to_string() } }

    pub fn prefix(field: &str, prefix: &str) -> Self { SearchQuery::Prefix { field: field.to_string(), prefix: prefix.to_string() } }

    pub fn phrase(field: &str, terms: &[String]) -> Self { SearchQuery::Phrase { field: field.to_string(), terms: terms.to_vec() } }

    pub fn boolean(clauses: Vec<(Occur, SearchQuery)>, minimum_should_match: usize) -> Self {
        SearchQuery::Boolean { clauses, minimum_should_match }
    }

    /// `terms` immediately followed by a word starting with `prefix`, all within `field`
    pub fn phrase_prefix(field: &str, terms: &[String], prefix: &str) -> Self {
        let mut clauses: Vec<SearchQuery> =
            terms.iter().map(|term| SearchQuery::SpanTerm { field: field.to_string(), term: term.clone() }).collect();
        let last = SearchQuery::SpanPrefix { field: field.to_string(), prefix: prefix.to_string() };
        clauses.push(SearchQuery::FieldMask { query: Box::new(last), field: field.to_string() });
        SearchQuery::SpanNear { field: field.to_string(), clauses, slop: 0 }
    }
}

impl std::fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchQuery::Term { field, term } => write!(f, "{}:{}", field, term),
            SearchQuery::Prefix { field, prefix } => write!(f, "{}:{}*", field, prefix),
            SearchQuery::Phrase { field, terms } => write!(f, "{}:\"{}\"", field, terms.join(" ")),
            SearchQuery::SpanTerm { field, term } => write!(f, "{}:{}", field, term),
            SearchQuery::SpanPrefix { field, prefix } => write!(f, "SpanMultiTermQueryWrapper({}:{}*)", field, prefix),
            SearchQuery::SpanNear { clauses, slop, .. } => {
                write!(f, "spanNear([")?;
                for (i, clause) in clauses.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", clause)?;
                }
                write!(f, "], {}, true)", slop)
            }
            SearchQuery::FieldMask { query, field } => write!(f, "mask({}) as {}", query, field),
            SearchQuery::Boolean { clauses, minimum_should_match } => {
                write!(f, "(")?;
                for (i, (occur, clause)) in clauses.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    if *occur == Occur::Must {
                        write!(f, "+")?;
                    }
                    write!(f, "{}", clause)?;
                }
                write!(f, ")")?;
                if *minimum_should_match > 0 {
                    write!(f, "~{}", minimum_should_match)?;
                }
                Ok(())
            }
        }
    }
}
