//! Annotations attached to resources and pages, including the rate-limit
//! descriptor decoded from upstream response headers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::{HttpHeaders, header_get};

use super::ResourceTypeTag;

/// Side information carried next to resources and pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    /// Upstream request budget as of the call that produced the page.
    RateLimit(RateLimitDescription),
    /// Link to the resource in the upstream web UI.
    ExternalLink { url: String },
    /// Identifier in the legacy id scheme.
    V1Identifier { id: String },
    /// A resource type whose instances are children of this resource.
    ChildResourceType { resource_type: ResourceTypeTag },
}

/// Whether an upstream budget is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitStatus {
    Ok,
    Overlimit,
}

/// Remaining/limit/reset of an upstream request budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitDescription {
    pub limit: u64,
    pub remaining: u64,
    pub reset_at: Option<DateTime<Utc>>,
    pub status: RateLimitStatus,
}

#[derive(Debug, Error)]
#[error("invalid {header} header: {value:?}")]
pub struct InvalidRateLimitHeader {
    pub header: &'static str,
    pub value: String,
}

const LIMIT_HEADER: &str = "x-ratelimit-limit";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";

impl RateLimitDescription {
    #[must_use]
    pub fn new(limit: u64, remaining: u64, reset_at: Option<DateTime<Utc>>) -> Self {
        let status = if limit > 0 && remaining == 0 {
            RateLimitStatus::Overlimit
        } else {
            RateLimitStatus::Ok
        };
        Self {
            limit,
            remaining,
            reset_at,
            status,
        }
    }

    /// Decode the `x-ratelimit-*` response headers.
    ///
    /// Returns `Ok(None)` when the response carries none of them. A header
    /// that is present but not an integer is an error.
    pub fn from_headers(
        headers: &HttpHeaders,
    ) -> std::result::Result<Option<Self>, InvalidRateLimitHeader> {
        let limit = header_get(headers, LIMIT_HEADER);
        let remaining = header_get(headers, REMAINING_HEADER);
        let reset = header_get(headers, RESET_HEADER);

        if limit.is_none() && remaining.is_none() && reset.is_none() {
            return Ok(None);
        }

        let limit = parse_header::<u64>(LIMIT_HEADER, limit)?.unwrap_or(0);
        let remaining = parse_header::<u64>(REMAINING_HEADER, remaining)?.unwrap_or(0);
        let reset_at = match parse_header::<i64>(RESET_HEADER, reset)? {
            Some(epoch) => Some(DateTime::from_timestamp(epoch, 0).ok_or_else(|| {
                InvalidRateLimitHeader {
                    header: RESET_HEADER,
                    value: epoch.to_string(),
                }
            })?),
            None => None,
        };

        Ok(Some(Self::new(limit, remaining, reset_at)))
    }

    #[must_use]
    pub fn is_overlimit(&self) -> bool {
        self.status == RateLimitStatus::Overlimit
    }
}

fn parse_header<T: std::str::FromStr>(
    header: &'static str,
    value: Option<&str>,
) -> std::result::Result<Option<T>, InvalidRateLimitHeader> {
    value
        .map(|v| {
            v.trim().parse::<T>().map_err(|_| InvalidRateLimitHeader {
                header,
                value: v.to_string(),
            })
        })
        .transpose()
}

/// Iterate the rate-limit descriptors in a set of annotations.
pub fn rate_limits(annotations: &[Annotation]) -> impl Iterator<Item = &RateLimitDescription> {
    annotations.iter().filter_map(|a| match a {
        Annotation::RateLimit(desc) => Some(desc),
        _ => None,
    })
}

/// Iterate the child resource types declared in a set of annotations.
pub fn child_resource_types(annotations: &[Annotation]) -> impl Iterator<Item = ResourceTypeTag> + '_ {
    annotations.iter().filter_map(|a| match a {
        Annotation::ChildResourceType { resource_type } => Some(*resource_type),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HttpHeaders {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn decodes_rate_limit_headers() {
        let desc = RateLimitDescription::from_headers(&headers(&[
            ("X-RateLimit-Limit", "5000"),
            ("X-RateLimit-Remaining", "4999"),
            ("X-RateLimit-Reset", "1700000000"),
        ]))
        .unwrap()
        .unwrap();

        assert_eq!(desc.limit, 5000);
        assert_eq!(desc.remaining, 4999);
        assert_eq!(desc.reset_at.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(desc.status, RateLimitStatus::Ok);
    }

    #[test]
    fn exhausted_budget_is_overlimit() {
        let desc = RateLimitDescription::from_headers(&headers(&[
            ("x-ratelimit-limit", "60"),
            ("x-ratelimit-remaining", "0"),
        ]))
        .unwrap()
        .unwrap();
        assert!(desc.is_overlimit());
        assert_eq!(desc.reset_at, None);
    }

    #[test]
    fn missing_headers_yield_no_descriptor() {
        let desc = RateLimitDescription::from_headers(&headers(&[("etag", "abc")])).unwrap();
        assert!(desc.is_none());
    }

    #[test]
    fn malformed_header_is_an_error() {
        let err = RateLimitDescription::from_headers(&headers(&[
            ("x-ratelimit-limit", "5000"),
            ("x-ratelimit-remaining", "lots"),
        ]))
        .unwrap_err();
        assert_eq!(err.header, "x-ratelimit-remaining");
        assert!(err.to_string().contains("lots"));
    }

    #[test]
    fn zero_limit_is_not_overlimit() {
        assert_eq!(RateLimitDescription::new(0, 0, None).status, RateLimitStatus::Ok);
    }

    #[test]
    fn annotation_helpers_filter_by_kind() {
        let annotations = vec![
            Annotation::V1Identifier {
                id: "org:12".to_string(),
            },
            Annotation::ChildResourceType {
                resource_type: ResourceTypeTag::Team,
            },
            Annotation::RateLimit(RateLimitDescription::new(10, 5, None)),
            Annotation::ChildResourceType {
                resource_type: ResourceTypeTag::User,
            },
        ];

        let children: Vec<_> = child_resource_types(&annotations).collect();
        assert_eq!(children, vec![ResourceTypeTag::Team, ResourceTypeTag::User]);
        assert_eq!(rate_limits(&annotations).count(), 1);
    }

    #[test]
    fn annotations_serialize_with_a_kind_tag() {
        let json = serde_json::to_value(Annotation::ExternalLink {
            url: "https://github.com/acme".to_string(),
        })
        .unwrap();
        assert_eq!(json["kind"], "external_link");
        assert_eq!(json["url"], "https://github.com/acme");
    }
}
