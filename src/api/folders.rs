//! Purpose: Present a per-user folder tree stored as flat tags in the tagging service.
//! Exports: `UserFolders`, `Folder`, `FolderContent`, `FolderEntry`, resource-type constants.
//! Role: Folder namespace engine; the only layer that knows how folders map onto tags.
//! Invariants: A folder is one tag of type `myaccount_user_folder`, named by a client-generated UUIDv4.
//! Invariants: `tag_name` holds the parent uuid (or `-` at the root); `tag_value` holds the payload.
//! Invariants: Content tags use the owning folder uuid as `tag_name`, so one by-name lookup
//! returns subfolders and content together; `resource_type` alone tells them apart.
//! Invariants: Deletes never cascade. Children and content of a deleted folder stay behind.
//! Invariants: Updates are read-modify-write without compare-and-swap. Two concurrent
//! updates of the same folder race and the later write wins, dropping the earlier change.
#![allow(clippy::result_large_err)]

use std::sync::OnceLock;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use super::config::ServiceConfig;
use super::tagging::{
    DEFAULT_TAG_TIMEOUT, NameSelector, ResourceSelector, Tag, TagOutput, TagStore, TaggingClient,
};
use crate::core::error::{Error, ErrorKind};
use crate::core::identity::identity_from_bearer;
use crate::core::payload::{FolderPayload, decode_payload, encode_payload};

type ApiResult<T> = Result<T, Error>;

pub const FOLDER_RESOURCE_TYPE: &str = "myaccount_user_folder";
pub const ROOT_SENTINEL: &str = "-";
pub const CONTENT_TAG_VALUE: &str = "MYACCOUNT_USER_FOLDER";
pub const INTERNETBOOK_RESOURCE_TYPE: &str = "internetbook";

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Folder {
    pub uuid: String,
    pub name: String,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FolderContent {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub identifier: String,
    pub folder_uuid: String,
}

/// One child of a folder: either a subfolder or an associated resource.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FolderEntry {
    Folder(Folder),
    Content(FolderContent),
}

impl FolderEntry {
    pub fn as_folder(&self) -> Option<&Folder> {
        match self {
            FolderEntry::Folder(folder) => Some(folder),
            FolderEntry::Content(_) => None,
        }
    }

    pub fn as_content(&self) -> Option<&FolderContent> {
        match self {
            FolderEntry::Folder(_) => None,
            FolderEntry::Content(content) => Some(content),
        }
    }
}

pub struct UserFolders<S = TaggingClient> {
    store: S,
    bearer_token: Option<String>,
    identity: OnceLock<String>,
    timeout: Duration,
}

impl UserFolders<TaggingClient> {
    /// Builds the engine over the HTTP tagging client. The bearer token in
    /// `config.credentials` is both the auth header and the identity source.
    pub fn from_config(config: &ServiceConfig) -> ApiResult<Self> {
        let store = TaggingClient::new(config)?;
        let token = config.credentials.bearer_token().map(str::to_string);
        Ok(Self::new(store, token))
    }
}

impl<S: TagStore> UserFolders<S> {
    pub fn new(store: S, bearer_token: Option<String>) -> Self {
        Self {
            store,
            bearer_token,
            identity: OnceLock::new(),
            timeout: DEFAULT_TAG_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Borrowed handle whose operations use `timeout` instead of the instance
    /// default, e.g. `folders.timed(Duration::from_millis(500)).list_all_folders()`.
    /// Shares the store and any identity already resolved.
    pub fn timed(&self, timeout: Duration) -> UserFolders<&S> {
        UserFolders {
            store: &self.store,
            bearer_token: self.bearer_token.clone(),
            identity: self.identity.clone(),
            timeout,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Identity all tags are scoped to. Resolved once, then cached for the
    /// lifetime of this instance.
    pub fn identity(&self) -> ApiResult<&str> {
        if let Some(identity) = self.identity.get() {
            return Ok(identity.as_str());
        }
        let resolved = identity_from_bearer(self.bearer_token.as_deref())?;
        Ok(self.identity.get_or_init(|| resolved).as_str())
    }

    pub fn create_folder(&self, name: &str, color: &str, parent: Option<&str>) -> ApiResult<Folder> {
        let parent = parent_link(parent)?;
        let tag = Tag {
            identity: self.identity()?.to_string(),
            resource_type: FOLDER_RESOURCE_TYPE.to_string(),
            resource_name: Uuid::new_v4().to_string(),
            tag_name: parent.unwrap_or(ROOT_SENTINEL).to_string(),
            tag_value: encode_payload(&FolderPayload::new(name, color)),
        };
        self.store.create_tag(&tag, self.timeout)?;
        tracing::info!(folder = %tag.resource_name, parent = %tag.tag_name, "created folder");
        Ok(Folder {
            uuid: tag.resource_name,
            name: name.to_string(),
            color: color.to_string(),
            parent: parent.map(str::to_string),
        })
    }

    /// Renames and/or recolors a folder. Fields passed as `None` keep their
    /// stored value; the parent link is never touched.
    ///
    /// Two round trips (read, then write) with no compare-and-swap: a
    /// concurrent update of the same folder can be silently overwritten.
    pub fn update_folder(
        &self,
        folder_uuid: &str,
        name: Option<&str>,
        color: Option<&str>,
    ) -> ApiResult<Folder> {
        let mut tag = self.folder_tag(folder_uuid)?;
        let mut payload = decode_folder_payload(&tag)?;
        if let Some(name) = name {
            payload.folder = name.to_string();
        }
        if let Some(color) = color {
            payload.color = color.to_string();
        }
        tag.tag_value = encode_payload(&payload);
        self.store.update_tag(&tag, self.timeout)?;
        tracing::info!(folder = %folder_uuid, "updated folder");
        Ok(folder_from_parts(&tag, payload))
    }

    /// Re-parents a folder in place by rewriting only its parent link, so the
    /// folder never disappears from listings. `None` moves it to the root.
    ///
    /// Only direct self-parenting is rejected; deeper cycles cannot be seen
    /// through single-level reads. Same lost-update race as `update_folder`.
    pub fn move_folder(&self, folder_uuid: &str, new_parent: Option<&str>) -> ApiResult<Folder> {
        let new_parent = parent_link(new_parent)?;
        if new_parent == Some(folder_uuid) {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("a folder cannot be its own parent")
                .with_resource(folder_uuid));
        }
        let mut tag = self.folder_tag(folder_uuid)?;
        let payload = decode_folder_payload(&tag)?;
        tag.tag_name = new_parent.unwrap_or(ROOT_SENTINEL).to_string();
        self.store.update_tag(&tag, self.timeout)?;
        tracing::info!(folder = %folder_uuid, parent = %tag.tag_name, "moved folder");
        Ok(folder_from_parts(&tag, payload))
    }

    pub fn get_folder(&self, folder_uuid: &str) -> ApiResult<Option<Folder>> {
        let folder_uuid = required_uuid(folder_uuid)?;
        let tags = self.store.tags_by_resource(
            &self.folder_selector()?.resource_name(folder_uuid),
            self.timeout,
        )?;
        match tags.into_iter().next() {
            Some(output) => Ok(Some(folder_from_tag(&output.tag)?)),
            None => Ok(None),
        }
    }

    pub fn list_all_folders(&self) -> ApiResult<Vec<Folder>> {
        let tags = self
            .store
            .tags_by_resource(&self.folder_selector()?, self.timeout)?;
        folders_from_tags(&tags)
    }

    /// Direct children of `parent` (or of the root when `None`). Walking
    /// deeper takes one call per level.
    pub fn list_next_folder_level(&self, parent: Option<&str>) -> ApiResult<Vec<Folder>> {
        let parent = parent_link(parent)?;
        let selector = NameSelector::new(self.identity()?, parent.unwrap_or(ROOT_SENTINEL))
            .resource_type(FOLDER_RESOURCE_TYPE);
        let tags = self.store.tags_by_name(&selector, self.timeout)?;
        folders_from_tags(&tags)
    }

    /// Subfolders and content of a folder, in one lookup.
    pub fn get_folder_content(&self, folder_uuid: &str) -> ApiResult<Vec<FolderEntry>> {
        let selector = NameSelector::new(self.identity()?, required_uuid(folder_uuid)?);
        let tags = self.store.tags_by_name(&selector, self.timeout)?;
        tags.iter().map(|output| entry_from_tag(&output.tag)).collect()
    }

    pub fn add_content_to_folder(
        &self,
        folder_uuid: &str,
        resource_type: &str,
        resource_name: &str,
    ) -> ApiResult<FolderContent> {
        let folder_uuid = required_uuid(folder_uuid)?;
        ensure_content_type(resource_type)?;
        let tag = Tag {
            identity: self.identity()?.to_string(),
            resource_type: resource_type.to_string(),
            resource_name: resource_name.to_string(),
            tag_name: folder_uuid.to_string(),
            tag_value: CONTENT_TAG_VALUE.to_string(),
        };
        self.store.create_tag(&tag, self.timeout)?;
        tracing::info!(folder = %folder_uuid, resource_type, resource_name, "added content to folder");
        Ok(content_from_tag(&tag))
    }

    pub fn add_internetbook_to_folder(&self, folder_uuid: &str, isbn: &str) -> ApiResult<FolderContent> {
        self.add_content_to_folder(folder_uuid, INTERNETBOOK_RESOURCE_TYPE, isbn)
    }

    pub fn remove_content_from_folder(
        &self,
        folder_uuid: &str,
        resource_type: &str,
        resource_name: &str,
    ) -> ApiResult<()> {
        let folder_uuid = required_uuid(folder_uuid)?;
        ensure_content_type(resource_type)?;
        let selector = ResourceSelector::identity(self.identity()?)
            .resource_type(resource_type)
            .resource_name(resource_name)
            .tag_name(folder_uuid);
        self.store.delete_tags(&selector, self.timeout)?;
        tracing::info!(folder = %folder_uuid, resource_type, resource_name, "removed content from folder");
        Ok(())
    }

    /// Deletes the folder's own tag only. Subfolders and content keep
    /// pointing at the deleted uuid; cleaning them up is up to the caller.
    pub fn delete_folder(&self, folder_uuid: &str) -> ApiResult<()> {
        let folder_uuid = required_uuid(folder_uuid)?;
        self.store.delete_tags(
            &self.folder_selector()?.resource_name(folder_uuid),
            self.timeout,
        )?;
        tracing::info!(folder = %folder_uuid, "deleted folder");
        Ok(())
    }

    /// Deletes every folder of this identity. Content tags are left alone.
    pub fn delete_all_folders(&self) -> ApiResult<()> {
        self.store.delete_tags(&self.folder_selector()?, self.timeout)?;
        tracing::info!("deleted all folders");
        Ok(())
    }

    fn folder_tag(&self, folder_uuid: &str) -> ApiResult<Tag> {
        let folder_uuid = required_uuid(folder_uuid)?;
        let tags = self.store.tags_by_resource(
            &self.folder_selector()?.resource_name(folder_uuid),
            self.timeout,
        )?;
        tags.into_iter()
            .next()
            .map(|output| output.tag)
            .ok_or_else(|| {
                Error::new(ErrorKind::NotFound)
                    .with_message(format!("folder with uuid {folder_uuid} not found"))
                    .with_resource(folder_uuid)
            })
    }

    fn folder_selector(&self) -> ApiResult<ResourceSelector> {
        Ok(ResourceSelector::identity(self.identity()?).resource_type(FOLDER_RESOURCE_TYPE))
    }
}

fn parent_link(parent: Option<&str>) -> ApiResult<Option<&str>> {
    match parent {
        None => Ok(None),
        Some(ROOT_SENTINEL) => Err(Error::new(ErrorKind::Usage)
            .with_message("`-` is reserved for the root level")
            .with_hint("Omit the parent to use the root level.")),
        Some(uuid) => required_uuid(uuid).map(Some),
    }
}

fn required_uuid(uuid: &str) -> ApiResult<&str> {
    if uuid.trim().is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message("folder uuid must not be empty"));
    }
    Ok(uuid)
}

fn ensure_content_type(resource_type: &str) -> ApiResult<()> {
    if resource_type == FOLDER_RESOURCE_TYPE {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("folder content cannot use the folder resource type")
            .with_resource(resource_type));
    }
    if resource_type.is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message("content resource type is required"));
    }
    Ok(())
}

fn decode_folder_payload(tag: &Tag) -> ApiResult<FolderPayload> {
    decode_payload(&tag.tag_value).map_err(|err| err.with_resource(tag.resource_name.clone()))
}

fn folder_from_parts(tag: &Tag, payload: FolderPayload) -> Folder {
    Folder {
        uuid: tag.resource_name.clone(),
        name: payload.folder,
        color: payload.color,
        parent: (tag.tag_name != ROOT_SENTINEL).then(|| tag.tag_name.clone()),
    }
}

fn folder_from_tag(tag: &Tag) -> ApiResult<Folder> {
    let payload = decode_folder_payload(tag)?;
    Ok(folder_from_parts(tag, payload))
}

fn content_from_tag(tag: &Tag) -> FolderContent {
    FolderContent {
        resource_type: tag.resource_type.clone(),
        identifier: tag.resource_name.clone(),
        folder_uuid: tag.tag_name.clone(),
    }
}

fn entry_from_tag(tag: &Tag) -> ApiResult<FolderEntry> {
    if tag.resource_type == FOLDER_RESOURCE_TYPE {
        folder_from_tag(tag).map(FolderEntry::Folder)
    } else {
        Ok(FolderEntry::Content(content_from_tag(tag)))
    }
}

fn folders_from_tags(tags: &[TagOutput]) -> ApiResult<Vec<Folder>> {
    tags.iter()
        .filter(|output| output.tag.resource_type == FOLDER_RESOURCE_TYPE)
        .map(|output| folder_from_tag(&output.tag))
        .collect()
}
