//! Resumable cursor stack for multi-page, multi-phase listings.
//!
//! A [`Bag`] is a LIFO stack of [`PageState`] frames. The top frame names the
//! phase in progress (which kind of upstream child is being enumerated, for
//! which resource) and the upstream page cursor within that phase. The whole
//! stack serializes to an opaque token handed back to the caller, so a
//! listing can resume after a process restart.
//!
//! Frames pushed last are consumed first: to run phase A before phase B,
//! push B and then A.
//!
//! # Example
//!
//! ```ignore
//! let (mut bag, page) = parse_page_token(&token.token, &resource.id)?;
//! let resp = client.list_collaborators(owner, repo, ListOptions::new(page, size)).await?;
//! let next_token = bag.next_token(&page_cursor(resp.next_page))?;
//! ```

use serde::{Deserialize, Serialize};

use crate::catalog::{ResourceId, ResourceTypeTag};
use crate::error::{ConnectorError, Result};

/// One frame of the cursor stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageState {
    pub resource_type: ResourceTypeTag,
    pub resource_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
}

impl PageState {
    /// A fresh frame for `resource_type` children of `resource_id`.
    #[must_use]
    pub fn new(resource_type: ResourceTypeTag, resource_id: impl Into<String>) -> Self {
        Self {
            resource_type,
            resource_id: resource_id.into(),
            token: String::new(),
        }
    }

    /// The frame as a resource id, for use in sub-calls.
    #[must_use]
    pub fn resource(&self) -> ResourceId {
        ResourceId::new(self.resource_type, self.resource_id.clone())
    }
}

/// The cursor stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bag {
    states: Vec<PageState>,
}

impl Bag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a token produced by [`Bag::marshal`]. The empty token is an
    /// empty stack.
    pub fn unmarshal(token: &str) -> Result<Self> {
        if token.is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(token).map_err(|e| ConnectorError::invalid_page_token(e.to_string()))
    }

    /// Encode the stack. The empty stack encodes to `""`, which tells the
    /// caller the listing is complete.
    pub fn marshal(&self) -> Result<String> {
        if self.states.is_empty() {
            return Ok(String::new());
        }
        serde_json::to_string(self).map_err(|e| ConnectorError::invalid_page_token(e.to_string()))
    }

    pub fn push(&mut self, state: PageState) {
        self.states.push(state);
    }

    pub fn pop(&mut self) -> Option<PageState> {
        self.states.pop()
    }

    #[must_use]
    pub fn current(&self) -> Option<&PageState> {
        self.states.last()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// The upstream cursor of the top frame, or `""` when the stack is empty.
    #[must_use]
    pub fn page_token(&self) -> &str {
        self.current().map(|s| s.token.as_str()).unwrap_or("")
    }

    /// Advance the top frame.
    ///
    /// A non-empty `next_page_token` replaces the top frame's cursor; an
    /// empty one means the phase is exhausted and the frame is popped.
    pub fn next(&mut self, next_page_token: &str) {
        if next_page_token.is_empty() {
            self.pop();
        } else if let Some(top) = self.states.last_mut() {
            top.token = next_page_token.to_string();
        }
    }

    /// [`Bag::next`] followed by [`Bag::marshal`].
    pub fn next_token(&mut self, next_page_token: &str) -> Result<String> {
        self.next(next_page_token);
        self.marshal()
    }
}

/// Decode a caller token, seeding the stack with `root` when it is empty,
/// and return the upstream page number for the top frame.
///
/// An empty upstream cursor is page 1.
pub fn parse_page_token(token: &str, root: &ResourceId) -> Result<(Bag, u32)> {
    let mut bag = Bag::unmarshal(token)?;
    if bag.is_empty() {
        bag.push(PageState::new(root.resource_type, root.resource.clone()));
    }
    let page = parse_page(bag.page_token())?;
    Ok((bag, page))
}

/// Translate an upstream cursor into the numeric page index.
pub fn parse_page(cursor: &str) -> Result<u32> {
    if cursor.is_empty() {
        return Ok(1);
    }
    cursor
        .parse::<u32>()
        .map_err(|_| ConnectorError::invalid_page_token(format!("bad page cursor {cursor:?}")))
}

/// Encode the upstream "next page" as a cursor; `None` is the empty cursor.
#[must_use]
pub fn page_cursor(next_page: Option<u32>) -> String {
    next_page.map(|p| p.to_string()).unwrap_or_default()
}
