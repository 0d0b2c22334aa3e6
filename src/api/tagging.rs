//! Purpose: Typed accessor for the generic tagging service.
//! Exports: `Tag`, `TagOutput`, `ResourceSelector`, `NameSelector`, `TagStore`, `TaggingClient`.
//! Role: Flat 5-tuple store API; higher layers build structure on top of it.
//! Invariants: Selector paths are progressive; a trailing field requires all earlier ones.
//! Invariants: Deletes remove everything under the selector prefix.
//! Invariants: Errors from the transport propagate unchanged; no retries.
#![allow(clippy::result_large_err)]

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::ServiceConfig;
use super::transport::ServiceClient;
use crate::core::error::{Error, ErrorKind};

type ApiResult<T> = Result<T, Error>;

pub const DEFAULT_TAG_TIMEOUT: Duration = Duration::from_millis(3000);

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub identity: String,
    pub resource_type: String,
    pub resource_name: String,
    pub tag_name: String,
    pub tag_value: String,
}

/// A tag as returned by the service. `created_at` is only present on
/// create and update responses, and may carry a fractional part.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TagOutput {
    #[serde(flatten)]
    pub tag: Tag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<f64>,
}

/// Selects tags by `identity[/resource_type[/resource_name[/tag_name]]]`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResourceSelector {
    pub identity: String,
    pub resource_type: Option<String>,
    pub resource_name: Option<String>,
    pub tag_name: Option<String>,
}

impl ResourceSelector {
    pub fn identity(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            ..Self::default()
        }
    }

    pub fn resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    pub fn resource_name(mut self, resource_name: impl Into<String>) -> Self {
        self.resource_name = Some(resource_name.into());
        self
    }

    pub fn tag_name(mut self, tag_name: impl Into<String>) -> Self {
        self.tag_name = Some(tag_name.into());
        self
    }

    fn segments(&self) -> ApiResult<Vec<&str>> {
        let mut segments = vec![required("identity", &self.identity)?];
        push_progressive(
            &mut segments,
            &[
                ("resource_type", self.resource_type.as_deref()),
                ("resource_name", self.resource_name.as_deref()),
                ("tag_name", self.tag_name.as_deref()),
            ],
        )?;
        Ok(segments)
    }
}

/// Selects tags by `identity/tag_name[/resource_type[/resource_name]]`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NameSelector {
    pub identity: String,
    pub tag_name: String,
    pub resource_type: Option<String>,
    pub resource_name: Option<String>,
}

impl NameSelector {
    pub fn new(identity: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            tag_name: tag_name.into(),
            ..Self::default()
        }
    }

    pub fn resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    pub fn resource_name(mut self, resource_name: impl Into<String>) -> Self {
        self.resource_name = Some(resource_name.into());
        self
    }

    fn segments(&self) -> ApiResult<Vec<&str>> {
        let mut segments = vec![
            required("identity", &self.identity)?,
            required("tag_name", &self.tag_name)?,
        ];
        push_progressive(
            &mut segments,
            &[
                ("resource_type", self.resource_type.as_deref()),
                ("resource_name", self.resource_name.as_deref()),
            ],
        )?;
        Ok(segments)
    }
}

fn required<'a>(field: &str, value: &'a str) -> ApiResult<&'a str> {
    if value.is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message(format!("tag {field} is required")));
    }
    Ok(value)
}

fn push_progressive<'a>(
    segments: &mut Vec<&'a str>,
    fields: &[(&str, Option<&'a str>)],
) -> ApiResult<()> {
    let mut gap: Option<&str> = None;
    for &(field, value) in fields {
        match (value.filter(|value| !value.is_empty()), gap) {
            (Some(_), Some(missing)) => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(format!("tag selector sets {field} without {missing}")));
            }
            (Some(value), None) => segments.push(value),
            (None, None) => gap = Some(field),
            (None, Some(_)) => {}
        }
    }
    Ok(())
}

/// The operations the folder engine needs from a tag store.
pub trait TagStore {
    fn create_tag(&self, tag: &Tag, timeout: Duration) -> ApiResult<TagOutput>;

    /// Replaces the mutable fields of the tag addressed by
    /// `(identity, resource_type, resource_name)`.
    fn update_tag(&self, tag: &Tag, timeout: Duration) -> ApiResult<TagOutput>;

    fn tags_by_resource(
        &self,
        selector: &ResourceSelector,
        timeout: Duration,
    ) -> ApiResult<Vec<TagOutput>>;

    fn tags_by_name(&self, selector: &NameSelector, timeout: Duration) -> ApiResult<Vec<TagOutput>>;

    /// Deletes every tag under the selector. A selector holding only the
    /// identity and resource type wipes that whole type for the identity.
    fn delete_tags(&self, selector: &ResourceSelector, timeout: Duration) -> ApiResult<()>;
}

#[derive(Clone)]
pub struct TaggingClient {
    service: ServiceClient,
}

impl TaggingClient {
    pub fn new(config: &ServiceConfig) -> ApiResult<Self> {
        Ok(Self {
            service: ServiceClient::new(config)?,
        })
    }
}

impl<T: TagStore + ?Sized> TagStore for &T {
    fn create_tag(&self, tag: &Tag, timeout: Duration) -> ApiResult<TagOutput> {
        (**self).create_tag(tag, timeout)
    }

    fn update_tag(&self, tag: &Tag, timeout: Duration) -> ApiResult<TagOutput> {
        (**self).update_tag(tag, timeout)
    }

    fn tags_by_resource(
        &self,
        selector: &ResourceSelector,
        timeout: Duration,
    ) -> ApiResult<Vec<TagOutput>> {
        (**self).tags_by_resource(selector, timeout)
    }

    fn tags_by_name(
        &self,
        selector: &NameSelector,
        timeout: Duration,
    ) -> ApiResult<Vec<TagOutput>> {
        (**self).tags_by_name(selector, timeout)
    }

    fn delete_tags(&self, selector: &ResourceSelector, timeout: Duration) -> ApiResult<()> {
        (**self).delete_tags(selector, timeout)
    }
}

impl TagStore for TaggingClient {
    fn create_tag(&self, tag: &Tag, timeout: Duration) -> ApiResult<TagOutput> {
        self.service.post_json(&["tags"], tag, timeout)
    }

    fn update_tag(&self, tag: &Tag, timeout: Duration) -> ApiResult<TagOutput> {
        self.service.put_json(&["tags"], tag, timeout)
    }

    fn tags_by_resource(
        &self,
        selector: &ResourceSelector,
        timeout: Duration,
    ) -> ApiResult<Vec<TagOutput>> {
        let mut segments = vec!["tags", "by_resource"];
        segments.extend(selector.segments()?);
        self.service.get_json(&segments, timeout)
    }

    fn tags_by_name(
        &self,
        selector: &NameSelector,
        timeout: Duration,
    ) -> ApiResult<Vec<TagOutput>> {
        let mut segments = vec!["tags", "by_tag_name"];
        segments.extend(selector.segments()?);
        self.service.get_json(&segments, timeout)
    }

    fn delete_tags(&self, selector: &ResourceSelector, timeout: Duration) -> ApiResult<()> {
        let mut segments = vec!["tags"];
        segments.extend(selector.segments()?);
        self.service.delete(&segments, timeout)
    }
}
