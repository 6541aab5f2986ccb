//! Value objects for broker operations: creation arguments, accept options,
//! and validated query filters.

use super::entities::RequestData;
use super::errors::ApprovalError;

/// Arguments to `add` / `add_and_show`.
#[derive(Clone, Debug, Default)]
pub struct AddRequestArgs {
    /// Request id; a fresh unique token is generated when omitted.
    pub id: Option<String>,
    /// The requesting party.
    pub origin: String,
    /// Request category.
    pub kind: String,
    /// Opaque creation-time payload.
    pub request_data: Option<RequestData>,
    /// Opaque mutable payload.
    pub request_state: Option<RequestData>,
    /// Whether the creator expects a result envelope on acceptance.
    pub expects_result: bool,
}

impl AddRequestArgs {
    /// Minimal arguments: origin and kind only.
    pub fn new(origin: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Pins the request id instead of generating one.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Marks the request as expecting a result envelope.
    #[must_use]
    pub fn expecting_result(mut self) -> Self {
        self.expects_result = true;
        self
    }
}

/// Options to `accept`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AcceptOptions {
    /// Keep the acceptor's future pending until the creator reports the
    /// outcome of post-approval work through the result callbacks.
    pub wait_for_result: bool,
}

/// A validated existence query. Exactly one filter kind applies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HasFilter {
    /// Membership of the id in the callback registry.
    Id(String),
    /// Origin lookup in the index, optionally narrowed to a kind.
    Origin { origin: String, kind: Option<String> },
    /// Linear scan of the store for a matching kind.
    Kind(String),
}

impl HasFilter {
    /// Builds a filter from optional raw fields, enforcing that exactly one
    /// filter kind is supplied.
    ///
    /// # Errors
    /// `InvalidRequest` when no field is given, when `id` is combined with
    /// `origin`/`kind`, or when any supplied field is empty.
    pub fn from_fields(
        id: Option<String>,
        origin: Option<String>,
        kind: Option<String>,
    ) -> Result<Self, ApprovalError> {
        match (id, origin, kind) {
            (Some(id), None, None) => {
                super::entities::require_non_empty("id", &id)?;
                Ok(Self::Id(id))
            }
            (Some(_), _, _) => Err(ApprovalError::invalid(
                "exactly one filter kind: id cannot be combined with origin or kind",
            )),
            (None, Some(origin), kind) => {
                super::entities::require_non_empty("origin", &origin)?;
                if let Some(kind) = &kind {
                    super::entities::require_non_empty("kind", kind)?;
                }
                Ok(Self::Origin { origin, kind })
            }
            (None, None, Some(kind)) => {
                super::entities::require_non_empty("kind", &kind)?;
                Ok(Self::Kind(kind))
            }
            (None, None, None) => Err(ApprovalError::invalid(
                "has filter requires one of: id, origin, kind",
            )),
        }
    }
}

/// A validated count query. At least one field applies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CountFilter {
    /// O(1) index lookup for the exact pair.
    OriginAndKind { origin: String, kind: String },
    /// Sum of per-kind counts for the origin.
    Origin(String),
    /// Linear scan of the store counting matches.
    Kind(String),
}

impl CountFilter {
    /// Builds a filter from optional raw fields.
    ///
    /// # Errors
    /// `InvalidRequest` when neither field is given or a supplied field is
    /// empty.
    pub fn from_fields(
        origin: Option<String>,
        kind: Option<String>,
    ) -> Result<Self, ApprovalError> {
        match (origin, kind) {
            (Some(origin), Some(kind)) => {
                super::entities::require_non_empty("origin", &origin)?;
                super::entities::require_non_empty("kind", &kind)?;
                Ok(Self::OriginAndKind { origin, kind })
            }
            (Some(origin), None) => {
                super::entities::require_non_empty("origin", &origin)?;
                Ok(Self::Origin(origin))
            }
            (None, Some(kind)) => {
                super::entities::require_non_empty("kind", &kind)?;
                Ok(Self::Kind(kind))
            }
            (None, None) => Err(ApprovalError::invalid(
                "count filter requires origin, kind, or both",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // HAS FILTER TESTS
    // =========================================================================

    #[test]
    fn test_has_filter_by_id() {
        let filter = HasFilter::from_fields(Some("req-1".to_string()), None, None).unwrap();
        assert_eq!(filter, HasFilter::Id("req-1".to_string()));
    }

    #[test]
    fn test_has_filter_id_excludes_other_fields() {
        let result = HasFilter::from_fields(
            Some("req-1".to_string()),
            Some("https://x.test".to_string()),
            None,
        );
        assert!(matches!(result, Err(ApprovalError::InvalidRequest { .. })));
    }

    #[test]
    fn test_has_filter_origin_with_optional_kind() {
        let filter =
            HasFilter::from_fields(None, Some("https://x.test".to_string()), None).unwrap();
        assert_eq!(
            filter,
            HasFilter::Origin {
                origin: "https://x.test".to_string(),
                kind: None
            }
        );

        let filter = HasFilter::from_fields(
            None,
            Some("https://x.test".to_string()),
            Some("tx".to_string()),
        )
        .unwrap();
        assert_eq!(
            filter,
            HasFilter::Origin {
                origin: "https://x.test".to_string(),
                kind: Some("tx".to_string())
            }
        );
    }

    #[test]
    fn test_has_filter_empty_payload_rejected() {
        let result = HasFilter::from_fields(None, None, None);
        assert!(matches!(result, Err(ApprovalError::InvalidRequest { .. })));
    }

    #[test]
    fn test_has_filter_empty_string_rejected() {
        let result = HasFilter::from_fields(Some(String::new()), None, None);
        assert!(matches!(result, Err(ApprovalError::InvalidRequest { .. })));
    }

    // =========================================================================
    // COUNT FILTER TESTS
    // =========================================================================

    #[test]
    fn test_count_filter_both_fields() {
        let filter = CountFilter::from_fields(
            Some("https://x.test".to_string()),
            Some("tx".to_string()),
        )
        .unwrap();
        assert_eq!(
            filter,
            CountFilter::OriginAndKind {
                origin: "https://x.test".to_string(),
                kind: "tx".to_string()
            }
        );
    }

    #[test]
    fn test_count_filter_requires_a_field() {
        let result = CountFilter::from_fields(None, None);
        assert!(matches!(result, Err(ApprovalError::InvalidRequest { .. })));
    }

    #[test]
    fn test_add_args_builder() {
        let args = AddRequestArgs::new("https://x.test", "tx")
            .with_id("req-1")
            .expecting_result();
        assert_eq!(args.id.as_deref(), Some("req-1"));
        assert!(args.expects_result);
    }
}
