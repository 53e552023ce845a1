use crate::indexing::loader::Coverage;
use crate::search::engine::MatchRecord;
use crate::search::highlight::{escape_html, highlight, segments_to_html, segments_to_text, Segment};
use std::fmt;

/// Shown above the results when only the open chapter could be searched
pub const RESTRICTED_NOTICE: &str = "Only this chapter was searched: the site is opened as a local file, \
so the other chapters cannot be loaded. Serve the site over HTTP to search every chapter.";

/// The single info line above the results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLine {
    Prompt { min_chars: usize },
    Loading,
    Count(usize),
    NoResults { query: String },
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLine::Prompt { min_chars } => {
                write!(f, "Type at least {} characters to search", min_chars)
            }
            StatusLine::Loading => write!(f, "Loading chapters..."),
            StatusLine::Count(1) => write!(f, "1 result"),
            StatusLine::Count(n) => write!(f, "{} results", n),
            StatusLine::NoResults { query } => write!(f, "No results for \"{}\"", query),
        }
    }
}

/// One rendered hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEntry {
    pub document_id: String,
    pub document_title: String,
    pub snippet: Vec<Segment>,
    pub match_offset: usize,
}

/// Everything the search modal shows at one moment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsView {
    pub query: String,
    pub status: StatusLine,
    pub notice: Option<String>,
    pub entries: Vec<ResultEntry>,
}

impl ResultsView {
    pub fn prompt(min_chars: usize) -> Self {
        Self {
            query: String::new(),
            status: StatusLine::Prompt { min_chars },
            notice: None,
            entries: Vec::new(),
        }
    }

    pub fn loading(query: &str) -> Self {
        Self {
            query: query.to_string(),
            status: StatusLine::Loading,
            notice: None,
            entries: Vec::new(),
        }
    }

    pub fn to_html(&self) -> String {
        let mut html = String::new();
        if let Some(notice) = &self.notice {
            html.push_str(&format!(
                "<div class=\"search-notice\">{}</div>\n",
                escape_html(notice)
            ));
        }
        html.push_str(&format!(
            "<div class=\"search-info\">{}</div>\n",
            escape_html(&self.status.to_string())
        ));
        for entry in &self.entries {
            html.push_str(&format!(
                "<a class=\"search-result\" href=\"{}\"><div class=\"search-result-title\">{}</div><div class=\"search-result-context\">{}</div></a>\n",
                escape_html(&entry.document_id),
                escape_html(&entry.document_title),
                segments_to_html(&entry.snippet)
            ));
        }
        html
    }
}

impl fmt::Display for ResultsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(notice) = &self.notice {
            writeln!(f, "! {}", notice)?;
        }
        writeln!(f, "{}", self.status)?;
        for (i, entry) in self.entries.iter().enumerate() {
            writeln!(f, "\n{}. {} ({})", i + 1, entry.document_title, entry.document_id)?;
            writeln!(f, "   {}", segments_to_text(&entry.snippet))?;
        }
        Ok(())
    }
}

/// Turn match records into a view, highlighting the query in each snippet
pub fn render(matches: &[MatchRecord], query: &str, coverage: Coverage) -> ResultsView {
    let notice = coverage
        .is_restricted()
        .then(|| RESTRICTED_NOTICE.to_string());

    let status = if matches.is_empty() {
        StatusLine::NoResults {
            query: query.to_string(),
        }
    } else {
        StatusLine::Count(matches.len())
    };

    let entries = matches
        .iter()
        .map(|m| ResultEntry {
            document_id: m.document_id.clone(),
            document_title: m.document_title.clone(),
            snippet: highlight(&m.context_text, query),
            match_offset: m.match_offset,
        })
        .collect();

    ResultsView {
        query: query.to_string(),
        status,
        notice,
        entries,
    }
}
