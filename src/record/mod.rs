//! Output record model
//!
//! Every source writes rows over the same ordered set of columns (the union
//! schema). Columns a source does not produce stay empty strings so consumers
//! can rely on a fixed column set.

mod time;

pub use time::{format_crawl_timestamp, kst, normalize_posted_at};

use chrono::{DateTime, Utc};

macro_rules! unified_record {
    ($($field:ident),+ $(,)?) => {
        /// One extracted row over the union schema
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct Record {
            $(pub $field: String,)+
        }

        /// Column names of the union schema, in output order
        pub const UNIFIED_FIELDS: &[&str] = &[$(stringify!($field)),+];

        impl Record {
            /// Column values in [`UNIFIED_FIELDS`] order
            pub fn values(&self) -> Vec<&str> {
                vec![$(self.$field.as_str()),+]
            }

            /// Rebuilds a record from values in [`UNIFIED_FIELDS`] order.
            ///
            /// Missing trailing values become empty strings.
            pub fn from_values<I: IntoIterator<Item = String>>(values: I) -> Self {
                let mut values = values.into_iter();
                Self {
                    $($field: values.next().unwrap_or_default(),)+
                }
            }
        }
    };
}

unified_record!(
    source,
    record_type,
    id,
    company,
    website,
    country,
    address,
    size_bytes,
    size_gib,
    is_published,
    time_until_publication,
    posted_at_utc,
    crawled_at_utc,
    crawled_at_kst,
    ransomware_group,
    discovery_date,
    estimated_attack_date,
    details_url,
    description,
    files_api_present,
    forum,
    title,
    author,
    last_edited_info,
    author_rank,
    reputation,
    posts_count,
    threads_count,
    join_date,
    main_content,
);

/// Per-page labels applied to every record extracted from that page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordContext {
    pub source: String,
    pub record_type: String,
    pub forum: String,
    pub crawled_at_utc: String,
    pub crawled_at_kst: String,
}

impl RecordContext {
    /// Builds the context for a listing page visited at `now`
    pub fn new(source: &str, record_type: &str, forum: &str, now: DateTime<Utc>) -> Self {
        Self {
            source: source.to_string(),
            record_type: record_type.to_string(),
            forum: forum.to_string(),
            crawled_at_utc: format_crawl_timestamp(now),
            crawled_at_kst: format_crawl_timestamp(now.with_timezone(&kst())),
        }
    }
}

impl Record {
    /// Applies the page context. The record id defaults to its detail URL.
    pub fn stamp(mut self, context: &RecordContext) -> Self {
        self.source = context.source.clone();
        self.record_type = context.record_type.clone();
        self.forum = context.forum.clone();
        self.crawled_at_utc = context.crawled_at_utc.clone();
        self.crawled_at_kst = context.crawled_at_kst.clone();
        if self.id.is_empty() {
            self.id = self.details_url.clone();
        }
        self
    }
}

/// Derives the `forum` column from a section identifier,
/// e.g. `Forum-Source-Codes` with prefix `Forum-` becomes `source-codes`.
pub fn forum_label(section_identifier: &str, prefix: &str) -> String {
    section_identifier
        .strip_prefix(prefix)
        .unwrap_or(section_identifier)
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_field_order_is_stable() {
        assert_eq!(UNIFIED_FIELDS.len(), 30);
        assert_eq!(UNIFIED_FIELDS[0], "source");
        assert_eq!(UNIFIED_FIELDS[2], "id");
        assert_eq!(UNIFIED_FIELDS[20], "forum");
        assert_eq!(UNIFIED_FIELDS[29], "main_content");
    }

    #[test]
    fn test_values_follow_field_order() {
        let record = Record {
            id: "https://forum.example/Thread-1".to_string(),
            title: "Dump".to_string(),
            ..Record::default()
        };
        let values = record.values();
        assert_eq!(values.len(), UNIFIED_FIELDS.len());
        assert_eq!(values[2], "https://forum.example/Thread-1");
        assert_eq!(values[21], "Dump");
        assert!(values[3].is_empty());
    }

    #[test]
    fn test_from_values_pads_missing_columns() {
        let record = Record::from_values(vec!["src".to_string(), "leak_post".to_string()]);
        assert_eq!(record.source, "src");
        assert_eq!(record.record_type, "leak_post");
        assert_eq!(record.main_content, "");
    }

    #[test]
    fn test_stamp_fills_context_and_id() {
        let now = Utc.with_ymd_and_hms(2025, 5, 16, 14, 12, 0).unwrap();
        let context = RecordContext::new("darkforums.st", "leak_post", "databases", now);
        let record = Record {
            details_url: "https://forum.example/Thread-1".to_string(),
            ..Record::default()
        }
        .stamp(&context);

        assert_eq!(record.id, "https://forum.example/Thread-1");
        assert_eq!(record.source, "darkforums.st");
        assert_eq!(record.forum, "databases");
        assert_eq!(record.crawled_at_utc, "2025-05-16T14:12:00.000000+00:00");
        assert_eq!(record.crawled_at_kst, "2025-05-16T23:12:00.000000+09:00");
    }

    #[test]
    fn test_forum_label() {
        assert_eq!(forum_label("Forum-Source-Codes", "Forum-"), "source-codes");
        assert_eq!(forum_label("Leaks", "Forum-"), "leaks");
        assert_eq!(forum_label("Forum-OSINT", ""), "forum-osint");
    }
}
