use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::models::EnrichedItem;

/// Bucket for items with no streaming sources
pub const NOT_AVAILABLE: &str = "Not Available";

/// Enriched items grouped by streaming service
///
/// Services iterate alphabetically; the "Not Available" bucket always comes
/// last. Within a bucket each item id appears once.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceGrouping {
    services: BTreeMap<String, Vec<EnrichedItem>>,
    not_available: Vec<EnrichedItem>,
}

impl ServiceGrouping {
    /// Items in a named bucket, `NOT_AVAILABLE` included
    pub fn get(&self, service: &str) -> Option<&[EnrichedItem]> {
        if service == NOT_AVAILABLE {
            return (!self.not_available.is_empty()).then_some(self.not_available.as_slice());
        }
        self.services.get(service).map(Vec::as_slice)
    }

    /// Buckets in display order
    pub fn sections(&self) -> impl Iterator<Item = (&str, &[EnrichedItem])> {
        let not_available = (!self.not_available.is_empty())
            .then_some((NOT_AVAILABLE, self.not_available.as_slice()));

        self.services
            .iter()
            .map(|(name, items)| (name.as_str(), items.as_slice()))
            .chain(not_available)
    }

    /// Bucket names in display order
    pub fn service_names(&self) -> Vec<&str> {
        self.sections().map(|(name, _)| name).collect()
    }

    pub fn len(&self) -> usize {
        self.services.len() + usize::from(!self.not_available.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_once(bucket: &mut Vec<EnrichedItem>, item: &EnrichedItem) {
        if !bucket.iter().any(|existing| existing.id() == item.id()) {
            bucket.push(item.clone());
        }
    }
}

/// Groups items by every distinct service they stream on
pub fn group_by_service(items: &[EnrichedItem]) -> ServiceGrouping {
    let mut grouping = ServiceGrouping::default();

    for item in items {
        // a service named like the bucket cannot get a section of its own
        let services: BTreeSet<&str> = item
            .streaming_sources
            .iter()
            .map(|source| source.name.as_str())
            .filter(|name| !name.eq_ignore_ascii_case(NOT_AVAILABLE))
            .collect();

        if services.is_empty() {
            ServiceGrouping::insert_once(&mut grouping.not_available, item);
            continue;
        }

        for service in services {
            let bucket = grouping.services.entry(service.to_string()).or_default();
            ServiceGrouping::insert_once(bucket, item);
        }
    }

    grouping
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccessType, StreamingSource, WatchlistItem};

    fn offer(name: &str, format: &str) -> StreamingSource {
        StreamingSource {
            source_id: 1,
            name: name.to_string(),
            access_type: AccessType::Subscription,
            region: "US".to_string(),
            web_url: String::new(),
            ios_url: None,
            android_url: None,
            format: Some(format.to_string()),
        }
    }

    fn enriched(id: i64, services: &[&str]) -> EnrichedItem {
        EnrichedItem::new(
            WatchlistItem::new(id, format!("Movie {}", id), None),
            services.iter().map(|name| offer(name, "HD")).collect(),
        )
    }

    fn ids(items: &[EnrichedItem]) -> Vec<i64> {
        items.iter().map(EnrichedItem::id).collect()
    }

    #[test]
    fn test_groups_by_each_service() {
        let grouping = group_by_service(&[enriched(1, &["Netflix", "Hulu"])]);

        assert_eq!(ids(grouping.get("Netflix").unwrap()), vec![1]);
        assert_eq!(ids(grouping.get("Hulu").unwrap()), vec![1]);
        assert_eq!(grouping.len(), 2);
        assert!(grouping.get(NOT_AVAILABLE).is_none());
    }

    #[test]
    fn test_duplicate_offers_counted_once() {
        let mut item = enriched(1, &["Netflix"]);
        item.streaming_sources.push(offer("Netflix", "4K"));

        let grouping = group_by_service(&[item]);
        assert_eq!(grouping.get("Netflix").unwrap().len(), 1);
    }

    #[test]
    fn test_unavailable_items_only_in_not_available() {
        let grouping = group_by_service(&[enriched(1, &[]), enriched(2, &["Max"])]);

        assert_eq!(ids(grouping.get(NOT_AVAILABLE).unwrap()), vec![1]);
        assert_eq!(ids(grouping.get("Max").unwrap()), vec![2]);
    }

    #[test]
    fn test_same_id_listed_twice_deduplicated() {
        let grouping = group_by_service(&[
            enriched(1, &["Netflix"]),
            enriched(1, &["Netflix"]),
            enriched(2, &[]),
            enriched(2, &[]),
        ]);

        assert_eq!(grouping.get("Netflix").unwrap().len(), 1);
        assert_eq!(grouping.get(NOT_AVAILABLE).unwrap().len(), 1);
    }

    #[test]
    fn test_service_named_not_available_folds_into_bucket() {
        let grouping = group_by_service(&[
            enriched(1, &[NOT_AVAILABLE]),
            enriched(2, &[]),
            enriched(3, &["Netflix", "not available"]),
        ]);

        assert_eq!(grouping.service_names(), vec!["Netflix", NOT_AVAILABLE]);
        assert_eq!(ids(grouping.get(NOT_AVAILABLE).unwrap()), vec![1, 2]);
        assert_eq!(ids(grouping.get("Netflix").unwrap()), vec![3]);
    }

    #[test]
    fn test_every_item_in_some_bucket() {
        let items = vec![
            enriched(1, &["Netflix"]),
            enriched(2, &[]),
            enriched(3, &["Hulu", "Disney+"]),
        ];
        let grouping = group_by_service(&items);

        for item in &items {
            assert!(grouping
                .sections()
                .any(|(_, bucket)| bucket.iter().any(|i| i.id() == item.id())));
        }
    }

    #[test]
    fn test_sections_sorted_with_not_available_last() {
        let grouping = group_by_service(&[
            enriched(1, &["Prime Video"]),
            enriched(2, &[]),
            enriched(3, &["Apple TV+", "Netflix"]),
            enriched(4, &["Zee5"]),
        ]);

        assert_eq!(
            grouping.service_names(),
            vec!["Apple TV+", "Netflix", "Prime Video", "Zee5", NOT_AVAILABLE]
        );
    }

    #[test]
    fn test_grouping_is_idempotent() {
        let items = vec![
            enriched(1, &["Netflix", "Hulu"]),
            enriched(2, &[]),
            enriched(3, &["Hulu"]),
        ];
        assert_eq!(group_by_service(&items), group_by_service(&items));
    }

    #[test]
    fn test_empty_input() {
        let grouping = group_by_service(&[]);
        assert!(grouping.is_empty());
        assert_eq!(grouping.sections().count(), 0);
    }
}
