//! Collection orchestrator.
//!
//! Walks the three resources of a Liferay site in a fixed order and yields
//! their records one at a time:
//! 1. Users, which also populate the identity index
//! 2. Blog entries, enriched with their author's identity
//! 3. Message board messages, category by category, enriched the same way

use crate::api::Transport;
use crate::error::Result;
use crate::fetcher::{PageCursor, PaginatedFetcher};
use crate::identity::IdentityIndex;
use crate::records::{parse_page, CategoryId, EntityRecord, GroupId, Item, ResourceKind};
use futures::stream::{self, Stream};
use std::collections::VecDeque;
use tracing::{debug, info};

/// Statistics for a collection run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectorStats {
    pub users: usize,
    pub identities: usize,
    pub blogs: usize,
    pub categories: usize,
    pub messages: usize,
    /// Blog entries and messages whose author was not in the index
    pub unenriched: usize,
}

/// Entry point of the connector
pub struct LiferayCollector<T> {
    fetcher: PaginatedFetcher<T>,
}

impl<T: Transport> LiferayCollector<T> {
    pub fn new(fetcher: PaginatedFetcher<T>) -> Self {
        Self { fetcher }
    }

    /// Server the items come from
    pub fn origin(&self) -> &str {
        self.fetcher.base_url()
    }

    /// Exchanges can be recorded and replayed by the transport
    pub fn has_archiving() -> bool {
        true
    }

    /// Every run starts again from the first user page
    pub fn has_resuming() -> bool {
        false
    }

    /// Lazily collect every item of a site
    pub fn run(&self, group: &GroupId) -> ItemStream<'_, T> {
        info!(origin = %self.origin(), group = %group, "Starting Liferay collection");
        ItemStream {
            fetcher: &self.fetcher,
            group: group.clone(),
            phase: Phase::Users,
            walk: None,
            categories: VecDeque::new(),
            pending: VecDeque::new(),
            identities: IdentityIndex::new(),
            stats: CollectorStats::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Users,
    Blogs,
    Categories,
    Messages,
    Done,
}

/// Items of one run, produced on demand
///
/// Holds only offsets, buffered records of the current page and the identity
/// index, so it can be dropped at any point.
pub struct ItemStream<'a, T> {
    fetcher: &'a PaginatedFetcher<T>,
    group: GroupId,
    phase: Phase,
    walk: Option<(ResourceKind, PageCursor<'a, T>)>,
    categories: VecDeque<CategoryId>,
    pending: VecDeque<EntityRecord>,
    identities: IdentityIndex,
    stats: CollectorStats,
}

impl<'a, T: Transport> ItemStream<'a, T> {
    pub fn stats(&self) -> &CollectorStats {
        &self.stats
    }

    pub fn identities(&self) -> &IdentityIndex {
        &self.identities
    }

    /// Next item, `None` when the run is complete
    ///
    /// After an error the stream is finished; items yielded before it stay
    /// valid.
    pub async fn next(&mut self) -> Result<Option<Item>> {
        let result = self.advance().await;
        if result.is_err() {
            self.phase = Phase::Done;
            self.walk = None;
            self.pending.clear();
        }
        result
    }

    async fn advance(&mut self) -> Result<Option<Item>> {
        let fetcher = self.fetcher;

        loop {
            if let Some(item) = self.pending.pop_front() {
                return Ok(Some(item));
            }

            if let Some((kind, cursor)) = self.walk.as_mut() {
                let kind = *kind;
                let page = cursor.next_page().await?;
                let url = cursor.url().to_string();
                match page {
                    Some(text) => self.absorb(kind, &url, &text)?,
                    None => self.finish_walk(),
                }
                continue;
            }

            match self.phase {
                Phase::Users => {
                    info!("Phase 1: Fetching users");
                    let cursor = fetcher.get_users(&self.group).await?;
                    self.walk = Some((ResourceKind::User, cursor));
                }
                Phase::Blogs => {
                    info!("Phase 2: Fetching blog entries");
                    let cursor = fetcher.get_blogs(&self.group).await?;
                    self.walk = Some((ResourceKind::BlogEntry, cursor));
                }
                Phase::Categories => {
                    info!("Phase 3: Fetching message board messages");
                    let categories = fetcher.list_category_ids(&self.group).await?;
                    self.stats.categories = categories.len();
                    self.categories = categories.into();
                    self.phase = Phase::Messages;
                }
                Phase::Messages => match self.categories.pop_front() {
                    Some(category) => {
                        debug!(category = %category, "Fetching category messages");
                        let cursor = fetcher.get_mbmessages(&self.group, &category).await?;
                        self.walk = Some((ResourceKind::Message, cursor));
                    }
                    None => {
                        self.phase = Phase::Done;
                        self.log_summary();
                    }
                },
                Phase::Done => return Ok(None),
            }
        }
    }

    /// Parse a page and queue its records, indexing or enriching them
    fn absorb(&mut self, kind: ResourceKind, url: &str, text: &str) -> Result<()> {
        for mut record in parse_page(url, text)? {
            match kind {
                ResourceKind::User => {
                    self.identities.observe(&record);
                    self.stats.users += 1;
                }
                ResourceKind::BlogEntry | ResourceKind::Message => {
                    if !self.identities.enrich(&mut record) {
                        self.stats.unenriched += 1;
                    }
                    if kind == ResourceKind::BlogEntry {
                        self.stats.blogs += 1;
                    } else {
                        self.stats.messages += 1;
                    }
                }
            }
            self.pending.push_back(record);
        }
        Ok(())
    }

    fn finish_walk(&mut self) {
        self.walk = None;
        self.phase = match self.phase {
            Phase::Users => {
                self.stats.identities = self.identities.len();
                info!(
                    users = self.stats.users,
                    identities = self.stats.identities,
                    "Identity index complete"
                );
                Phase::Blogs
            }
            Phase::Blogs => Phase::Categories,
            other => other,
        };
    }

    fn log_summary(&self) {
        info!(
            users = self.stats.users,
            identities = self.stats.identities,
            blogs = self.stats.blogs,
            categories = self.stats.categories,
            messages = self.stats.messages,
            unenriched = self.stats.unenriched,
            "Liferay collection complete"
        );
    }

    /// The remaining items as a stream
    pub fn into_stream(self) -> impl Stream<Item = Result<Item>> + 'a {
        stream::try_unfold(self, |mut items| async move {
            let item = items.next().await;
            item.map(|item| item.map(|item| (item, items)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::error::LiferayError;
    use crate::fetcher::MAX_RESULTS;
    use crate::test_helpers::ScriptedTransport;
    use futures::TryStreamExt;
    use serde_json::{json, Value};
    use std::sync::Arc;

    const BASE: &str = "http://liferay.test";
    const USER_COUNT: &str =
        "http://liferay.test/api/jsonws/user/get-group-users-count/group-id/10/status/0";
    const USER_LIST: &str = "http://liferay.test/api/jsonws/user/get-group-users";
    const BLOG_COUNT: &str =
        "http://liferay.test/api/jsonws/blogs.blogsentry/get-group-entries-count/group-id/10/status/0";
    const BLOG_LIST: &str = "http://liferay.test/api/jsonws/blogs.blogsentry/get-group-entries";
    const CATEGORIES: &str =
        "http://liferay.test/api/jsonws/mb.mbcategory/get-categories/group-id/10";
    const MESSAGE_LIST: &str = "http://liferay.test/api/jsonws/mb.mbmessage/get-category-messages";

    fn message_count(category: u64) -> String {
        format!(
            "http://liferay.test/api/jsonws/mb.mbmessage/get-category-messages-count/group-id/10/categoryId/{category}/status/0"
        )
    }

    fn collector(transport: Arc<ScriptedTransport>, page_size: u64) -> LiferayCollector<Arc<ScriptedTransport>> {
        LiferayCollector::new(PaginatedFetcher::new(transport, BASE, page_size).unwrap())
    }

    fn users_json() -> Value {
        json!([
            {"userId": 7, "screenName": "alice", "emailAddress": "a@x.com", "uuid": "user-7", "modifiedDate": 1000},
            {"userId": 8, "screenName": "bob", "emailAddress": "b@x.com", "uuid": "user-8", "modifiedDate": 2000},
            {"userId": 9, "screenName": "carol", "emailAddress": "c@x.com", "uuid": "user-9", "modifiedDate": 3000}
        ])
    }

    async fn collect(collector: &LiferayCollector<Arc<ScriptedTransport>>) -> Result<Vec<Item>> {
        collector.run(&GroupId::Int(10)).into_stream().try_collect().await
    }

    #[tokio::test]
    async fn test_users_only_site() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(Method::Get, USER_COUNT, "3");
        transport.respond(Method::Post, USER_LIST, &users_json().to_string());
        transport.respond(Method::Get, BLOG_COUNT, "0");
        transport.respond(Method::Get, CATEGORIES, r#"[{"categoryId": 5}]"#);
        transport.respond(Method::Get, &message_count(5), "0");
        let collector = collector(transport.clone(), MAX_RESULTS);

        let items = collect(&collector).await.unwrap();
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|item| item.category() == ResourceKind::User));

        assert_eq!(transport.requests_to("get-categories/group-id/10").len(), 1);
        assert_eq!(transport.requests_to("categoryId/5/status/0").len(), 1);
        assert!(transport.requests_to("get-group-entries").is_empty());
        assert!(transport.requests_to("get-category-messages").is_empty());
    }

    #[tokio::test]
    async fn test_blogs_and_messages_are_enriched() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(Method::Get, USER_COUNT, "3");
        transport.respond(Method::Post, USER_LIST, &users_json().to_string());
        transport.respond(Method::Get, BLOG_COUNT, "2");
        transport.respond(
            Method::Post,
            BLOG_LIST,
            &json!([
                {"entryId": 42, "userId": 7, "uuid": "u1", "modifiedDate": 1000000},
                {"entryId": 43, "userId": 99, "uuid": "u2", "modifiedDate": 1000000}
            ])
            .to_string(),
        );
        transport.respond(Method::Get, CATEGORIES, r#"[{"categoryId": 5}, {"categoryId": 6}]"#);
        transport.respond(Method::Get, &message_count(5), "1");
        transport.respond(
            Method::Post,
            MESSAGE_LIST,
            &json!([{"messageId": 1, "userId": 8, "uuid": "m1", "modifiedDate": 5}]).to_string(),
        );
        transport.respond(Method::Get, &message_count(6), "1");
        transport.respond(
            Method::Post,
            MESSAGE_LIST,
            &json!([{"messageId": 2, "userId": 9, "uuid": "m2", "modifiedDate": 6, "screenName": "old"}])
                .to_string(),
        );
        let collector = collector(transport.clone(), MAX_RESULTS);

        let mut items = collector.run(&GroupId::Int(10));
        let mut collected = Vec::new();
        while let Some(item) = items.next().await.unwrap() {
            collected.push(item);
        }

        let categories: Vec<ResourceKind> = collected.iter().map(|i| i.category()).collect();
        assert_eq!(
            categories,
            vec![
                ResourceKind::User,
                ResourceKind::User,
                ResourceKind::User,
                ResourceKind::BlogEntry,
                ResourceKind::BlogEntry,
                ResourceKind::Message,
                ResourceKind::Message,
            ]
        );

        let known = &collected[3];
        assert_eq!(known.screen_name(), Some("alice"));
        assert_eq!(known.email_address(), Some("a@x.com"));

        let unknown = &collected[4];
        assert_eq!(unknown.screen_name(), None);
        assert_eq!(unknown.email_address(), None);

        assert_eq!(collected[5].get("messageId"), Some(&json!(1)));
        assert_eq!(collected[5].screen_name(), Some("bob"));
        assert_eq!(collected[6].get("messageId"), Some(&json!(2)));
        assert_eq!(collected[6].screen_name(), Some("carol"));

        assert_eq!(
            items.stats(),
            &CollectorStats {
                users: 3,
                identities: 3,
                blogs: 2,
                categories: 2,
                messages: 2,
                unenriched: 1,
            }
        );

        let scopes: Vec<Option<u64>> = transport
            .requests_to("get-category-messages")
            .iter()
            .map(|r| r.field("categoryId"))
            .collect();
        assert_eq!(scopes, vec![Some(5), Some(6)]);
    }

    #[tokio::test]
    async fn test_users_are_paged() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(Method::Get, USER_COUNT, "3");
        let users = users_json();
        let users = users.as_array().unwrap();
        transport.respond(Method::Post, USER_LIST, &Value::Array(users[..2].to_vec()).to_string());
        transport.respond(Method::Post, USER_LIST, &Value::Array(users[2..].to_vec()).to_string());
        transport.respond(Method::Get, BLOG_COUNT, "0");
        transport.respond(Method::Get, CATEGORIES, "[]");
        let collector = collector(transport.clone(), 2);

        let items = collect(&collector).await.unwrap();
        assert_eq!(items.len(), 3);

        let starts: Vec<Option<u64>> = transport
            .requests_to("get-group-users")
            .iter()
            .map(|r| r.field("start"))
            .collect();
        assert_eq!(starts, vec![Some(0), Some(2)]);
        assert!(transport.requests_to("get-category-messages-count").is_empty());
    }

    #[tokio::test]
    async fn test_parse_error_keeps_earlier_items() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(Method::Get, USER_COUNT, "3");
        transport.respond(Method::Post, USER_LIST, &users_json().to_string());
        transport.respond(Method::Get, BLOG_COUNT, "1");
        transport.respond(Method::Post, BLOG_LIST, "<html>maintenance</html>");
        let collector = collector(transport.clone(), MAX_RESULTS);

        let mut items = collector.run(&GroupId::Int(10));
        for _ in 0..3 {
            assert!(items.next().await.unwrap().is_some());
        }
        assert!(matches!(items.next().await, Err(LiferayError::Parse { .. })));
        assert_eq!(items.next().await.unwrap(), None);
        assert!(transport.requests_to("get-categories/group-id/10").is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_aborts_run() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.fail(Method::Get, USER_COUNT);
        let collector = collector(transport.clone(), MAX_RESULTS);

        let result = collect(&collector).await;
        assert!(matches!(result, Err(LiferayError::Transport { .. })));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_users_are_emitted_but_not_indexed() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(Method::Get, USER_COUNT, "1");
        transport.respond(Method::Post, USER_LIST, r#"[{"userId": 7, "uuid": "x"}]"#);
        transport.respond(Method::Get, BLOG_COUNT, "1");
        transport.respond(Method::Post, BLOG_LIST, r#"[{"entryId": 1, "userId": 7}]"#);
        transport.respond(Method::Get, CATEGORIES, "[]");
        let collector = collector(transport, MAX_RESULTS);

        let mut items = collector.run(&GroupId::Int(10));
        let user = items.next().await.unwrap().unwrap();
        assert_eq!(user.category(), ResourceKind::User);
        let blog = items.next().await.unwrap().unwrap();
        assert!(blog.screen_name().is_none());
        assert!(items.identities().is_empty());
        assert_eq!(items.next().await.unwrap(), None);
    }

    #[test]
    fn test_capabilities() {
        assert!(LiferayCollector::<ScriptedTransport>::has_archiving());
        assert!(!LiferayCollector::<ScriptedTransport>::has_resuming());
    }
}
