//! Normalization of list responses.
//!
//! List endpoints answer with one of several shapes depending on the backend
//! resource: a bare array, `{ "data": [...] }`, a paginator object, or a
//! paginator nested under `data`. [`Envelope`] accepts all of them at the
//! gateway boundary and [`Page`] is the only shape callers see.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaginatedBody<T> {
    pub data: Vec<T>,
    pub current_page: u32,
    #[serde(default)]
    pub last_page: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// Every list shape the backend is known to produce.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Paginated(PaginatedBody<T>),
    Nested { data: PaginatedBody<T> },
    Wrapped { data: Vec<T> },
    Bare(Vec<T>),
}

/// A normalized page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub last_page: u32,
    pub total: u64,
}

impl<T> Page<T> {
    /// A single page holding every item.
    #[must_use]
    pub fn single(items: Vec<T>) -> Self {
        let total = items.len() as u64;
        Self {
            items,
            current_page: 1,
            last_page: 1,
            total,
        }
    }

    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.current_page < self.last_page
    }
}

impl<T> From<PaginatedBody<T>> for Page<T> {
    fn from(body: PaginatedBody<T>) -> Self {
        let total = body.total.unwrap_or(body.data.len() as u64);
        let last_page = body.last_page.unwrap_or(body.current_page).max(body.current_page);
        Self {
            items: body.data,
            current_page: body.current_page,
            last_page,
            total,
        }
    }
}

impl<T> From<Envelope<T>> for Page<T> {
    fn from(envelope: Envelope<T>) -> Self {
        match envelope {
            Envelope::Paginated(body) | Envelope::Nested { data: body } => body.into(),
            Envelope::Wrapped { data } | Envelope::Bare(data) => Self::single(data),
        }
    }
}

impl<T> Envelope<T> {
    #[must_use]
    pub fn into_page(self) -> Page<T> {
        self.into()
    }

    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.into_page().items
    }
}
