//! Presentation formatting for grant analysis results
//!
//! Turns a [`GrantAnalysisResult`] into display fragments: bulleted lists,
//! checklists, deadlines with canonical `MM/DD/YYYY` dates, and funding ranges
//! in USD. Every function is pure and total.
//!
//! Fragments keep their text unescaped and structured as spans; escaping
//! happens exactly once, when a fragment is rendered to markup. Both the
//! interactive view and the print exporter consume the same
//! [`FormattedSection`] values.

use crate::model::{FundingInfo, GrantAnalysisResult};
use chrono::NaiveDate;
use regex::Regex;

lazy_static::lazy_static! {
    static ref DATE_PATTERN: Regex = Regex::new(
        r"\b(?:\d{1,2}/\d{1,2}/\d{4}|\d{4}-\d{2}-\d{2}|(?i:january|february|march|april|may|june|july|august|september|october|november|december) \d{1,2}, \d{4})\b"
    )
    .unwrap();
    static ref LEADING_NUMBER: Regex = Regex::new(r"^-?(?:\d+\.?\d*|\.\d+)").unwrap();
}

/// Formats tried, in order, when canonicalizing a date.
const DATE_FORMATS: [&str; 7] = [
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%Y/%m/%d",
    "%m-%d-%Y",
];

/// Currency glyphs that mark an amount as already formatted.
const CURRENCY_GLYPHS: [char; 3] = ['$', '€', '£'];

// ============================================================================
// Fragments
// ============================================================================

/// Leading marker of a display fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    Bullet,
    Calendar,
    Money,
    FundingBullet,
    Checkbox,
}

impl Glyph {
    pub fn symbol(self) -> &'static str {
        match self {
            Glyph::Bullet | Glyph::FundingBullet => "•",
            Glyph::Calendar => "📅",
            Glyph::Money => "💵",
            Glyph::Checkbox => "☐",
        }
    }

    fn css_class(self) -> &'static str {
        match self {
            Glyph::Bullet => "bullet",
            Glyph::Calendar => "deadline",
            Glyph::Money => "funding-range",
            Glyph::FundingBullet => "funding",
            Glyph::Checkbox => "checklist",
        }
    }
}

/// A run of unescaped text inside a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Text(String),
    Emphasis(String),
}

impl Span {
    pub fn text(&self) -> &str {
        match self {
            Span::Text(s) | Span::Emphasis(s) => s,
        }
    }

    fn to_markup(&self) -> String {
        match self {
            Span::Text(s) => escape_html(s),
            Span::Emphasis(s) => format!("<strong class=\"highlight\">{}</strong>", escape_html(s)),
        }
    }
}

/// One displayable line: a glyph followed by spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub glyph: Glyph,
    pub spans: Vec<Span>,
}

impl Fragment {
    fn plain(glyph: Glyph, text: &str) -> Self {
        Self {
            glyph,
            spans: vec![Span::Text(text.to_string())],
        }
    }

    /// Escaped markup for this fragment.
    pub fn to_markup(&self) -> String {
        let body: String = self.spans.iter().map(Span::to_markup).collect();
        format!(
            "<div class=\"item item-{}\"><span class=\"glyph\">{}</span><span class=\"text\">{}</span></div>",
            self.glyph.css_class(),
            self.glyph.symbol(),
            body
        )
    }

    /// Text content without glyph or markup.
    pub fn to_plain_text(&self) -> String {
        self.spans.iter().map(Span::text).collect()
    }
}

fn render(fragments: &[Fragment]) -> String {
    fragments.iter().map(Fragment::to_markup).collect()
}

fn list_fragments<S: AsRef<str>>(items: &[S], glyph: Glyph) -> Vec<Fragment> {
    items
        .iter()
        .map(|item| Fragment::plain(glyph, item.as_ref()))
        .collect()
}

fn deadline_fragments<S: AsRef<str>>(items: &[S]) -> Vec<Fragment> {
    items
        .iter()
        .map(|item| Fragment {
            glyph: Glyph::Calendar,
            spans: deadline_spans(item.as_ref()),
        })
        .collect()
}

fn funding_fragments(funding: &FundingInfo) -> Vec<Fragment> {
    if funding.is_empty() {
        return Vec::new();
    }

    let mut fragments = Vec::new();
    if funding.minimum().is_some() || funding.maximum().is_some() {
        fragments.push(Fragment {
            glyph: Glyph::Money,
            spans: vec![Span::Emphasis(format_funding_range(
                funding.minimum(),
                funding.maximum(),
            ))],
        });
    }
    fragments.extend(list_fragments(&funding.details, Glyph::FundingBullet));
    fragments
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Eligibility,
    Deadlines,
    Funding,
    RequiredDocuments,
}

impl SectionKind {
    pub fn title(self) -> &'static str {
        match self {
            SectionKind::Eligibility => "Eligibility Checklist",
            SectionKind::Deadlines => "Key Deadlines",
            SectionKind::Funding => "Funding Details",
            SectionKind::RequiredDocuments => "Required Documents",
        }
    }
}

/// The formatter's output unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedSection {
    pub kind: SectionKind,
    pub fragments: Vec<Fragment>,
}

impl FormattedSection {
    /// An empty section renders as a placeholder.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn markup_fragments(&self) -> Vec<String> {
        self.fragments.iter().map(Fragment::to_markup).collect()
    }

    pub fn markup(&self) -> String {
        render(&self.fragments)
    }
}

/// All four sections derived from one result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedResults {
    pub eligibility: FormattedSection,
    pub deadlines: FormattedSection,
    pub funding: FormattedSection,
    pub required_documents: FormattedSection,
}

impl FormattedResults {
    /// Sections in display order.
    pub fn sections(&self) -> [&FormattedSection; 4] {
        [
            &self.eligibility,
            &self.deadlines,
            &self.funding,
            &self.required_documents,
        ]
    }
}

pub fn format_results(result: &GrantAnalysisResult) -> FormattedResults {
    FormattedResults {
        eligibility: FormattedSection {
            kind: SectionKind::Eligibility,
            fragments: list_fragments(&result.eligibility, Glyph::Bullet),
        },
        deadlines: FormattedSection {
            kind: SectionKind::Deadlines,
            fragments: deadline_fragments(&result.deadlines),
        },
        funding: FormattedSection {
            kind: SectionKind::Funding,
            fragments: funding_fragments(&result.funding),
        },
        required_documents: FormattedSection {
            kind: SectionKind::RequiredDocuments,
            fragments: list_fragments(&result.required_documents, Glyph::Checkbox),
        },
    }
}

// ============================================================================
// String formatters
// ============================================================================

/// Bulleted list markup. Empty input gives an empty string.
pub fn format_bullet_list<S: AsRef<str>>(items: &[S]) -> String {
    render(&list_fragments(items, Glyph::Bullet))
}

/// Checklist markup for required documents. Empty input gives an empty string.
pub fn format_checklist_items<S: AsRef<str>>(items: &[S]) -> String {
    render(&list_fragments(items, Glyph::Checkbox))
}

/// Deadline list markup with highlighted dates.
pub fn format_deadlines_list<S: AsRef<str>>(items: &[S]) -> String {
    render(&deadline_fragments(items))
}

/// Funding range line plus detail bullets; empty when there is nothing to show.
pub fn format_funding_details(funding: &FundingInfo) -> String {
    render(&funding_fragments(funding))
}

/// Escaped deadline text with every recognized date canonicalized and emphasized.
pub fn format_deadline_text(text: &str) -> String {
    deadline_spans(text).iter().map(Span::to_markup).collect()
}

// ============================================================================
// Deadline tokenizer
// ============================================================================

/// A piece of deadline text: literal text or a recognized date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeadlineToken<'a> {
    Literal(&'a str),
    Date { raw: &'a str, canonical: String },
}

/// Split text into non-overlapping literal and date tokens.
///
/// Concatenating the raw text of the tokens reproduces the input. A substring
/// shaped like a date that is not a real calendar date stays literal.
pub fn tokenize_deadline(text: &str) -> Vec<DeadlineToken<'_>> {
    let mut tokens = Vec::new();
    let mut last = 0;

    for m in DATE_PATTERN.find_iter(text) {
        let Some(date) = parse_date(m.as_str()) else {
            continue;
        };
        if m.start() > last {
            tokens.push(DeadlineToken::Literal(&text[last..m.start()]));
        }
        tokens.push(DeadlineToken::Date {
            raw: m.as_str(),
            canonical: date.format("%m/%d/%Y").to_string(),
        });
        last = m.end();
    }

    if last < text.len() {
        tokens.push(DeadlineToken::Literal(&text[last..]));
    }
    tokens
}

fn deadline_spans(text: &str) -> Vec<Span> {
    tokenize_deadline(text)
        .into_iter()
        .map(|token| match token {
            DeadlineToken::Literal(s) => Span::Text(s.to_string()),
            DeadlineToken::Date { canonical, .. } => Span::Emphasis(canonical),
        })
        .collect()
}

// ============================================================================
// Dates and currency
// ============================================================================

fn parse_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// Canonical `MM/DD/YYYY` form, or the input unchanged when it is not a date.
pub fn format_date(text: &str) -> String {
    match parse_date(text) {
        Some(date) => date.format("%m/%d/%Y").to_string(),
        None => text.to_string(),
    }
}

/// Normalize one funding amount.
///
/// Amounts that already carry a currency glyph are returned verbatim. Others
/// are stripped to their numeric characters and rendered as USD; when no
/// number can be read the input comes back unchanged.
pub fn format_currency(amount: &str) -> String {
    if amount.contains(CURRENCY_GLYPHS) {
        return amount.to_string();
    }

    let numeric: String = amount
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    LEADING_NUMBER
        .find(&numeric)
        .and_then(|m| m.as_str().trim_end_matches('.').parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .map(format_usd)
        .unwrap_or_else(|| amount.to_string())
}

/// `$1,234.50` style rendering with a leading minus for negatives.
fn format_usd(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value.is_sign_negative() { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, cents)
}

/// One-line summary of the funding bounds. Blank bounds count as absent.
pub fn format_funding_range(minimum: Option<&str>, maximum: Option<&str>) -> String {
    let present = |amount: Option<&str>| {
        amount
            .filter(|s| !s.trim().is_empty())
            .map(format_currency)
    };

    match (present(minimum), present(maximum)) {
        (Some(min), Some(max)) => format!("Funding Range: {} - {}", min, max),
        (Some(min), None) => format!("Minimum Funding: {}", min),
        (None, Some(max)) => format!("Maximum Funding: {}", max),
        (None, None) => "Funding amount to be determined".to_string(),
    }
}

/// Replace `& < > " '` with entities. Apply once; escaped input gets escaped again.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
