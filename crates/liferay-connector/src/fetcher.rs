//! Paginated retrieval of Liferay resources.
//!
//! Each resource kind has a count endpoint (GET, scope embedded in the path)
//! and a list endpoint (POST, scope and offset window in the form payload).
//! A [`PageCursor`] walks the list endpoint in fixed-size windows until the
//! window covers the reported total or the server returns an empty page.

use crate::api::{urijoin, Method, Payload, Transport};
use crate::error::{LiferayError, Result};
use crate::records::{CategoryId, EntityId, GroupId, ResourceKind, CATEGORY_ID};
use futures::stream::{self, Stream};
use serde_json::Value;
use tracing::{debug, info};

/// Default number of items requested per page
pub const MAX_RESULTS: u64 = 100;

/// Root of the JSON web services
const RESOURCE: &str = "api/jsonws";
/// Workflow status filter; 0 is "approved"
const STATUS: u64 = 0;

const GROUP_ID_SEGMENT: &str = "group-id";
const CATEGORY_ID_SEGMENT: &str = "categoryId";
const STATUS_SEGMENT: &str = "status";

const MBCATEGORY: &str = "mb.mbcategory";

impl ResourceKind {
    /// Service the kind's endpoints live under
    fn service(&self) -> &'static str {
        match self {
            ResourceKind::User => "user",
            ResourceKind::BlogEntry => "blogs.blogsentry",
            ResourceKind::Message => "mb.mbmessage",
        }
    }

    fn count_operation(&self) -> &'static str {
        match self {
            ResourceKind::User => "get-group-users-count",
            ResourceKind::BlogEntry => "get-group-entries-count",
            ResourceKind::Message => "get-category-messages-count",
        }
    }

    fn list_operation(&self) -> &'static str {
        match self {
            ResourceKind::User => "get-group-users",
            ResourceKind::BlogEntry => "get-group-entries",
            ResourceKind::Message => "get-category-messages",
        }
    }
}

/// Fetches counts, category ids and pages for any resource kind
pub struct PaginatedFetcher<T> {
    transport: T,
    base_url: String,
    page_size: u64,
}

impl<T: Transport> PaginatedFetcher<T> {
    pub fn new(transport: T, base_url: impl Into<String>, page_size: u64) -> Result<Self> {
        if page_size == 0 {
            return Err(LiferayError::Config(
                "page size must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            transport,
            base_url: base_url.into(),
            page_size,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    fn count_url(&self, kind: ResourceKind, group: &GroupId, category: Option<&CategoryId>) -> String {
        let group = group.to_string();
        let category = category.map(|c| c.to_string());
        let status = STATUS.to_string();

        let mut parts = vec![
            self.base_url.as_str(),
            RESOURCE,
            kind.service(),
            kind.count_operation(),
            GROUP_ID_SEGMENT,
            group.as_str(),
        ];
        if let Some(category) = &category {
            parts.extend([CATEGORY_ID_SEGMENT, category.as_str()]);
        }
        parts.extend([STATUS_SEGMENT, status.as_str()]);
        urijoin(parts)
    }

    fn list_url(&self, kind: ResourceKind) -> String {
        urijoin([self.base_url.as_str(), RESOURCE, kind.service(), kind.list_operation()])
    }

    /// Total number of items of `kind` in the group, optionally within a category
    pub async fn count_for(
        &self,
        kind: ResourceKind,
        group: &GroupId,
        category: Option<&CategoryId>,
    ) -> Result<u64> {
        let url = self.count_url(kind, group, category);
        let response = self.transport.fetch(&url, Method::Get, None).await?;

        let total = response
            .text
            .trim()
            .parse::<u64>()
            .map_err(|e| LiferayError::parse(&url, format!("invalid count {:?}: {}", response.text, e)))?;
        debug!(kind = %kind, total = total, "Counted items");
        Ok(total)
    }

    /// Message board categories of the group, in API order
    pub async fn list_category_ids(&self, group: &GroupId) -> Result<Vec<CategoryId>> {
        let group_str = group.to_string();
        let url = urijoin([
            self.base_url.as_str(),
            RESOURCE,
            MBCATEGORY,
            "get-categories",
            GROUP_ID_SEGMENT,
            group_str.as_str(),
        ]);
        let response = self.transport.fetch(&url, Method::Get, None).await?;

        let categories: Vec<serde_json::Map<String, Value>> = serde_json::from_str(&response.text)
            .map_err(|e| LiferayError::parse(&url, e))?;

        let ids = categories
            .iter()
            .map(|category| {
                category
                    .get(CATEGORY_ID)
                    .and_then(EntityId::from_json)
                    .ok_or_else(|| LiferayError::parse(&url, "category without categoryId"))
            })
            .collect::<Result<Vec<_>>>()?;

        info!(group = %group, categories = ids.len(), "Discovered message board categories");
        Ok(ids)
    }

    /// Lazily walk the pages of a resource whose size is already known
    pub fn pages(
        &self,
        kind: ResourceKind,
        group: &GroupId,
        category: Option<&CategoryId>,
        total: u64,
    ) -> PageCursor<'_, T> {
        let url = self.list_url(kind);
        if total == 0 {
            info!(kind = %kind, url = %url, "No items were found");
        }
        PageCursor {
            fetcher: self,
            url,
            group: group.clone(),
            category: category.cloned(),
            total,
            start: 0,
            end: self.page_size,
            exhausted: total == 0,
        }
    }

    async fn walk(
        &self,
        kind: ResourceKind,
        group: &GroupId,
        category: Option<&CategoryId>,
    ) -> Result<PageCursor<'_, T>> {
        let total = self.count_for(kind, group, category).await?;
        Ok(self.pages(kind, group, category, total))
    }

    /// Pages of the group's users
    pub async fn get_users(&self, group: &GroupId) -> Result<PageCursor<'_, T>> {
        self.walk(ResourceKind::User, group, None).await
    }

    /// Pages of the group's blog entries
    pub async fn get_blogs(&self, group: &GroupId) -> Result<PageCursor<'_, T>> {
        self.walk(ResourceKind::BlogEntry, group, None).await
    }

    /// Pages of the messages in one message board category
    pub async fn get_mbmessages(
        &self,
        group: &GroupId,
        category: &CategoryId,
    ) -> Result<PageCursor<'_, T>> {
        self.walk(ResourceKind::Message, group, Some(category)).await
    }
}

/// Offset window over one list endpoint
///
/// Windows advance by the page size and are never requested twice. The
/// cursor is finished once the window start reaches the total or a page
/// comes back empty; the total reported by the server may be too high.
pub struct PageCursor<'a, T> {
    fetcher: &'a PaginatedFetcher<T>,
    url: String,
    group: GroupId,
    category: Option<CategoryId>,
    total: u64,
    start: u64,
    end: u64,
    exhausted: bool,
}

impl<'a, T: Transport> PageCursor<'a, T> {
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn payload(&self) -> Payload {
        let mut payload = Payload::new();
        payload.insert("groupId".to_string(), self.group.to_json());
        payload.insert(
            "categoryId".to_string(),
            self.category.as_ref().map_or(Value::from(0), EntityId::to_json),
        );
        payload.insert("status".to_string(), Value::from(STATUS));
        payload.insert("start".to_string(), Value::from(self.start));
        payload.insert("end".to_string(), Value::from(self.end));
        payload
    }

    /// Fetch the next page, or `None` once the resource is exhausted
    pub async fn next_page(&mut self) -> Result<Option<String>> {
        if self.exhausted || self.start >= self.total {
            self.exhausted = true;
            return Ok(None);
        }

        let payload = self.payload();
        let response = match self
            .fetcher
            .transport
            .fetch(&self.url, Method::Post, Some(&payload))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.exhausted = true;
                return Err(e);
            }
        };

        let requested = self.start;
        let page_size = self.fetcher.page_size;
        self.start = self.start.saturating_add(page_size);
        self.end = self.end.saturating_add(page_size);

        if is_empty_page(&response.text) {
            debug!(url = %self.url, start = requested, "Empty page, stopping");
            self.exhausted = true;
            return Ok(None);
        }

        info!(
            "Fetching {}/{} items from {}",
            self.start.min(self.total),
            self.total,
            self.url
        );
        Ok(Some(response.text))
    }

    /// The remaining pages as a stream
    pub fn into_stream(self) -> impl Stream<Item = Result<String>> + 'a {
        stream::try_unfold(self, |mut cursor| async move {
            let page = cursor.next_page().await;
            page.map(|page| page.map(|page| (page, cursor)))
        })
    }
}

/// A page with no records: blank or `[]`
fn is_empty_page(text: &str) -> bool {
    let text = text.trim();
    text.is_empty()
        || text
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .is_some_and(|inner| inner.trim().is_empty())
}
