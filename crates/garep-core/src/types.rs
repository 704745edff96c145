//! Request and response bodies for `reports:batchGet`.
//!
//! Only the fields the client reads or sets are typed; everything else is
//! carried through `extra` so nothing the API accepts or returns is lost.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of a `reports:batchGet` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchGetRequest {
    /// Up to five report requests sharing view and date ranges.
    pub report_requests: Vec<ReportRequest>,
    /// Bill the request against resource-based quotas.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub use_resource_quotas: bool,
}

/// One report inside a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    /// Analytics view to query.
    pub view_id: String,
    /// Date ranges; at most two.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub date_ranges: Vec<DateRange>,
    /// Metrics such as `ga:sessions`.
    #[serde(default)]
    pub metrics: Vec<Metric>,
    /// Dimensions such as `ga:date`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<Dimension>,
    /// Requested sampling level; unset lets the API choose.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling_level: Option<SamplingLevel>,
    /// Continuation token from the previous page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
    /// Rows per page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    /// Filters, segments, orderings and other pass-through fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Inclusive date range, either ISO dates or relative forms like `yesterday`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// First day.
    pub start_date: String,
    /// Last day.
    pub end_date: String,
}

impl DateRange {
    /// Range covering `start..=end`.
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start_date: start.into(),
            end_date: end.into(),
        }
    }
}

/// Metric expression.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    /// Expression such as `ga:sessions` or `ga:goal1Completions/ga:users`.
    pub expression: String,
    /// Optional alias used in column headers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl From<&str> for Metric {
    fn from(expression: &str) -> Self {
        Self {
            expression: expression.to_string(),
            alias: None,
        }
    }
}

/// Dimension name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dimension {
    /// Name such as `ga:date`.
    pub name: String,
}

impl From<&str> for Dimension {
    fn from(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

/// Sampling level requested for a report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SamplingLevel {
    /// Let the API pick.
    SamplingUnspecified,
    /// Balance speed and accuracy.
    Default,
    /// Fast, smaller sample.
    Small,
    /// Slow, larger sample.
    Large,
}

impl SamplingLevel {
    /// Wire name of the level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SamplingUnspecified => "SAMPLING_UNSPECIFIED",
            Self::Default => "DEFAULT",
            Self::Small => "SMALL",
            Self::Large => "LARGE",
        }
    }
}

/// Response of a `reports:batchGet` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchGetResponse {
    /// One report per request, in order.
    #[serde(default)]
    pub reports: Vec<Report>,
    /// Remaining resource quota tokens, when resource quotas are in use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_quotas_remaining: Option<Value>,
    /// Unrecognised fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One report of a batch response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Names of the dimension and metric columns.
    #[serde(default)]
    pub column_header: ColumnHeader,
    /// Rows and sampling metadata.
    #[serde(default)]
    pub data: ReportData,
    /// Token for the next page, absent on the last one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Column names of a report.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnHeader {
    /// Dimension names in row order.
    #[serde(default)]
    pub dimensions: Vec<String>,
    /// Metric headers in value order.
    #[serde(default)]
    pub metric_header: MetricHeader,
}

/// Wrapper for the metric header entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetricHeader {
    /// One entry per requested metric.
    #[serde(default)]
    pub metric_header_entries: Vec<MetricHeaderEntry>,
}

/// Name and type of a metric column.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetricHeaderEntry {
    /// Metric name or alias.
    pub name: String,
    /// Value type such as `INTEGER`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub metric_type: Option<String>,
}

/// Report body: rows plus sampling and freshness metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    /// Rows of the current page. Absent when the page is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<ReportRow>>,
    /// Totals per date range.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub totals: Vec<DateRangeValues>,
    /// Total number of matching rows across all pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    /// Sessions read per date range when the report is sampled.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "string_numbers")]
    pub samples_read_counts: Option<Vec<u64>>,
    /// Sampling space per date range when the report is sampled.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "string_numbers")]
    pub sampling_space_sizes: Option<Vec<u64>>,
    /// True once the data will no longer change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_data_golden: Option<bool>,
}

impl ReportData {
    /// Rows of this page, empty when the API omitted them.
    #[must_use]
    pub fn rows(&self) -> &[ReportRow] {
        self.rows.as_deref().unwrap_or_default()
    }

    /// Whether the API marked this data as final.
    #[must_use]
    pub fn is_golden(&self) -> bool {
        self.is_data_golden.unwrap_or(false)
    }
}

/// One report row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    /// Dimension values in header order.
    #[serde(default)]
    pub dimensions: Vec<String>,
    /// Metric values, one entry per date range.
    #[serde(default)]
    pub metrics: Vec<DateRangeValues>,
}

/// Metric values for one date range.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeValues {
    /// Values in metric header order, as the API's decimal strings.
    #[serde(default)]
    pub values: Vec<String>,
}

/// The API encodes int64 as JSON strings; accept both forms.
mod string_numbers {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Int(u64),
        Text(String),
    }

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<Vec<u64>>, s: S) -> Result<S::Ok, S::Error> {
        value
            .as_ref()
            .map(|values| values.iter().map(u64::to_string).collect::<Vec<_>>())
            .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u64>>, D::Error> {
        let raw = Option::<Vec<Number>>::deserialize(d)?;
        raw.map(|numbers| {
            numbers
                .into_iter()
                .map(|n| match n {
                    Number::Int(v) => Ok(v),
                    Number::Text(s) => s.parse().map_err(serde::de::Error::custom),
                })
                .collect()
        })
        .transpose()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serializes_camel_case() {
        let request = BatchGetRequest {
            report_requests: vec![ReportRequest {
                view_id: "123".into(),
                date_ranges: vec![DateRange::new("2020-01-30", "2020-01-30")],
                metrics: vec![Metric::from("ga:sessions")],
                sampling_level: Some(SamplingLevel::Large),
                page_size: Some(1000),
                ..ReportRequest::default()
            }],
            use_resource_quotas: true,
        };

        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({
                "reportRequests": [{
                    "viewId": "123",
                    "dateRanges": [{"startDate": "2020-01-30", "endDate": "2020-01-30"}],
                    "metrics": [{"expression": "ga:sessions"}],
                    "samplingLevel": "LARGE",
                    "pageSize": 1000
                }],
                "useResourceQuotas": true
            })
        );
    }

    #[test]
    fn test_extra_request_fields_pass_through() {
        let raw = json!({
            "viewId": "1",
            "metrics": [{"expression": "ga:users"}],
            "filtersExpression": "ga:country==Russia"
        });

        let request: ReportRequest = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(
            request.extra.get("filtersExpression"),
            Some(&json!("ga:country==Russia"))
        );
        assert_eq!(serde_json::to_value(&request).unwrap(), raw);
    }

    #[test]
    fn test_response_parses_sampling_metadata() {
        let raw = json!({
            "reports": [{
                "columnHeader": {
                    "dimensions": ["ga:date"],
                    "metricHeader": {"metricHeaderEntries": [{"name": "ga:sessions", "type": "INTEGER"}]}
                },
                "data": {
                    "rows": [{"dimensions": ["20200130"], "metrics": [{"values": ["42"]}]}],
                    "samplesReadCounts": ["499630"],
                    "samplingSpaceSizes": ["15328013"],
                    "isDataGolden": true
                },
                "nextPageToken": "1000"
            }],
            "resourceQuotasRemaining": {"dailyQuotaTokensRemaining": 9999}
        });

        let response: BatchGetResponse = serde_json::from_value(raw).unwrap();
        let report = &response.reports[0];

        assert_eq!(report.data.samples_read_counts, Some(vec![499_630]));
        assert_eq!(report.data.sampling_space_sizes, Some(vec![15_328_013]));
        assert!(report.data.is_golden());
        assert_eq!(report.next_page_token.as_deref(), Some("1000"));
        assert_eq!(report.data.rows()[0].metrics[0].values, vec!["42"]);
        assert_eq!(
            report.column_header.metric_header.metric_header_entries[0].metric_type.as_deref(),
            Some("INTEGER")
        );
    }

    #[test]
    fn test_missing_rows_and_golden_flag() {
        let response: BatchGetResponse =
            serde_json::from_value(json!({"reports": [{"data": {"totals": []}}]})).unwrap();
        let data = &response.reports[0].data;

        assert!(data.rows().is_empty());
        assert!(!data.is_golden());
        assert!(response.reports[0].next_page_token.is_none());
    }
}
