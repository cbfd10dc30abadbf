//! Structured grant analysis results
//!
//! These are the values the Analysis Service hands back. They are created once
//! per successful response and never mutated afterwards; every display form is
//! derived from them by the `formatter` module.

use serde::{Deserialize, Deserializer, Serialize};

/// Fields extracted from one grant-guidelines document.
///
/// Any sequence may be empty. An absent field in the JSON decodes to an empty
/// value, so absence and emptiness are indistinguishable downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GrantAnalysisResult {
    pub eligibility: Vec<String>,
    pub deadlines: Vec<String>,
    pub funding: FundingInfo,
    pub required_documents: Vec<String>,
}

/// Funding bounds and free-form notes.
///
/// Bounds may carry a currency symbol (`"$25,000"`) or be bare numerics
/// (`"25000"`). The decoder also accepts JSON numbers for the bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundingInfo {
    #[serde(deserialize_with = "amount_from_json")]
    pub minimum: Option<String>,
    #[serde(deserialize_with = "amount_from_json")]
    pub maximum: Option<String>,
    pub details: Vec<String>,
}

impl GrantAnalysisResult {
    /// True when no field carries any information at all.
    pub fn is_empty(&self) -> bool {
        self.eligibility.is_empty()
            && self.deadlines.is_empty()
            && self.funding.is_empty()
            && self.required_documents.is_empty()
    }
}

impl FundingInfo {
    /// Lower bound, treating an empty string as absent.
    pub fn minimum(&self) -> Option<&str> {
        self.minimum.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Upper bound, treating an empty string as absent.
    pub fn maximum(&self) -> Option<&str> {
        self.maximum.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.minimum().is_none() && self.maximum().is_none() && self.details.is_empty()
    }
}

/// Accept `"25000"`, `25000`, `25000.5` or `null` for a funding bound.
fn amount_from_json<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Demonstration grant used by the sample service.
pub fn sample_result() -> GrantAnalysisResult {
    let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    GrantAnalysisResult {
        eligibility: owned(&[
            "Must be a registered 501(c)(3) nonprofit organization",
            "Organization must have been in operation for at least 2 years",
            "Must serve communities with median household income below $50,000",
            "Previous grant recipients must wait 3 years before reapplying",
        ]),
        deadlines: owned(&[
            "Letter of Intent Due: March 15, 2024",
            "Full Application Due: April 30, 2024",
            "Award Notification: June 15, 2024",
            "Project Start Date: September 1, 2024",
        ]),
        funding: FundingInfo {
            minimum: Some("$25,000".to_string()),
            maximum: Some("$100,000".to_string()),
            details: owned(&[
                "Average award amount: $65,000",
                "Multi-year funding available (up to 3 years)",
                "Matching funds required: 25% of total project cost",
                "Administrative costs limited to 15% of total budget",
            ]),
        },
        required_documents: owned(&[
            "IRS determination letter (501c3 status)",
            "Audited financial statements (last 2 years)",
            "Board of directors list with contact information",
            "Project budget and budget narrative",
            "Letters of support from community partners",
            "Organizational chart and staff qualifications",
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_backend_placeholder() {
        let json = r#"{
            "eligibility": [],
            "deadlines": [],
            "funding": { "minimum": null, "maximum": null, "details": [] },
            "requiredDocuments": []
        }"#;
        let result: GrantAnalysisResult = serde_json::from_str(json).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_decode_missing_fields_as_empty() {
        let result: GrantAnalysisResult =
            serde_json::from_str(r#"{"eligibility": ["Nonprofits only"]}"#).unwrap();
        assert_eq!(result.eligibility, vec!["Nonprofits only"]);
        assert!(result.deadlines.is_empty());
        assert!(result.funding.is_empty());
        assert!(result.required_documents.is_empty());
    }

    #[test]
    fn test_decode_numeric_bounds() {
        let result: GrantAnalysisResult =
            serde_json::from_str(r#"{"funding": {"minimum": 25000, "maximum": "$100,000"}}"#)
                .unwrap();
        assert_eq!(result.funding.minimum(), Some("25000"));
        assert_eq!(result.funding.maximum(), Some("$100,000"));
    }

    #[test]
    fn test_blank_bound_is_absent() {
        let funding = FundingInfo {
            minimum: Some("  ".to_string()),
            maximum: None,
            details: Vec::new(),
        };
        assert_eq!(funding.minimum(), None);
        assert!(funding.is_empty());
    }

    #[test]
    fn test_sample_result_is_populated() {
        let sample = sample_result();
        assert_eq!(sample.eligibility.len(), 4);
        assert_eq!(sample.deadlines.len(), 4);
        assert_eq!(sample.funding.details.len(), 4);
        assert_eq!(sample.required_documents.len(), 6);
    }
}
