use chrono::Utc;
use uuid::Uuid;

use real_core::model::{Album, AlbumCounter, AlbumError, Post, UserError};

use super::{fail_soft, Repositories, Result};

/// Manages albums and the post membership bookkeeping on them.
///
/// A post belongs to an album while it is completed and carries the
/// album's id. Ranks are handed out from the album's rank counter, so
/// they grow monotonically and are never reused.
#[derive(Clone)]
pub struct AlbumManager {
    repos: Repositories,
}

impl AlbumManager {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn get_album(&self, album_id: &str) -> Result<Option<Album>> {
        Ok(self.repos.albums.get_album(album_id).await?)
    }

    pub async fn list_albums(&self, user_id: &str) -> Result<Vec<Album>> {
        Ok(self.repos.albums.list_albums_by_user(user_id).await?)
    }

    pub async fn add_album(
        &self,
        user_id: &str,
        name: &str,
        description: Option<String>,
    ) -> Result<Album> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AlbumError::EmptyName.into());
        }
        if self.repos.users.get_user(user_id).await?.is_none() {
            return Err(UserError::DoesNotExist(user_id.to_string()).into());
        }

        let album = Album {
            album_id: Uuid::new_v4().to_string(),
            owned_by_user_id: user_id.to_string(),
            name: name.to_string(),
            description,
            created_at: Utc::now(),
            art_hash: None,
            post_count: 0,
            rank_count: 0,
        };
        self.repos.albums.create_album(&album).await?;
        tracing::info!(album_id = %album.album_id, %user_id, "Album added");
        Ok(album)
    }

    async fn owned(&self, album_id: &str, user_id: &str) -> Result<Album> {
        let album = self
            .get_album(album_id)
            .await?
            .ok_or_else(|| AlbumError::DoesNotExist(album_id.to_string()))?;
        if album.owned_by_user_id != user_id {
            return Err(AlbumError::NotOwner {
                album_id: album_id.to_string(),
                user_id: user_id.to_string(),
            }
            .into());
        }
        Ok(album)
    }

    pub async fn update_album(
        &self,
        album_id: &str,
        user_id: &str,
        name: Option<&str>,
        description: Option<String>,
    ) -> Result<Album> {
        let mut album = self.owned(album_id, user_id).await?;
        if let Some(name) = name {
            let name = name.trim();
            if name.is_empty() {
                return Err(AlbumError::EmptyName.into());
            }
            album.name = name.to_string();
        }
        if description.is_some() {
            album.description = description;
        }
        self.repos.albums.update_album(&album).await?;
        Ok(album)
    }

    /// Deletes an album. Its posts are detached by the album-delete hook.
    pub async fn delete_album(&self, album_id: &str, user_id: &str) -> Result<()> {
        self.owned(album_id, user_id).await?;
        self.repos.albums.delete_album(album_id).await?;
        tracing::info!(%album_id, %user_id, "Album deleted");
        Ok(())
    }

    pub async fn delete_all_by_user(&self, user_id: &str) -> Result<()> {
        for album in self.repos.albums.list_albums_by_user(user_id).await? {
            self.repos.albums.delete_album(&album.album_id).await?;
        }
        Ok(())
    }

    /// Regenerates the art hash after the album's posts changed.
    async fn refresh_art_hash(&self, album_id: &str) -> Result<()> {
        let Some(mut album) = self.get_album(album_id).await? else {
            return Ok(());
        };
        album.art_hash = (album.post_count > 0).then(|| Uuid::new_v4().to_string());
        self.repos.albums.update_album(&album).await?;
        Ok(())
    }

    async fn set_rank(&self, post_id: &str, album_id: &str, rank: i64) -> Result<()> {
        let Some(mut post) = self.repos.posts.get_post(post_id).await? else {
            return Ok(());
        };
        if post.album_id.as_deref() != Some(album_id) {
            return Ok(());
        }
        post.album_rank = Some(rank);
        self.repos.posts.update_post(&post).await?;
        Ok(())
    }

    async fn remove_post(&self, album_id: &str, post_id: &str) -> Result<()> {
        if self.get_album(album_id).await?.is_none() {
            tracing::warn!(%album_id, %post_id, "Album missing while removing post");
            return Ok(());
        }
        let result = self
            .repos
            .albums
            .decrement_album_count(album_id, AlbumCounter::Post)
            .await;
        fail_soft(result, AlbumCounter::Post.attribute_name(), "album", album_id)?;
        self.set_rank(post_id, album_id, -1).await?;
        self.refresh_art_hash(album_id).await
    }

    async fn add_post(&self, album_id: &str, post_id: &str) -> Result<()> {
        if self.get_album(album_id).await?.is_none() {
            tracing::warn!(%album_id, %post_id, "Album missing while adding post");
            return Ok(());
        }
        let rank = self
            .repos
            .albums
            .increment_album_count(album_id, AlbumCounter::Rank)
            .await?;
        self.repos
            .albums
            .increment_album_count(album_id, AlbumCounter::Post)
            .await?;
        self.set_rank(post_id, album_id, i64::try_from(rank).unwrap_or(i64::MAX))
            .await?;
        self.refresh_art_hash(album_id).await
    }

    pub async fn on_post_change_sync_album(
        &self,
        old: Option<&Post>,
        new: Option<&Post>,
    ) -> Result<()> {
        let album_of = |post: Option<&Post>| {
            post.filter(|p| p.is_completed())
                .and_then(|p| p.album_id.clone())
        };
        let old_album_id = album_of(old);
        let new_album_id = album_of(new);
        if old_album_id == new_album_id {
            return Ok(());
        }
        let Some(post_id) = new.or(old).map(|p| p.post_id.as_str()) else {
            return Ok(());
        };

        if let Some(album_id) = old_album_id {
            self.remove_post(&album_id, post_id).await?;
        }
        if let Some(album_id) = new_album_id {
            self.add_post(&album_id, post_id).await?;
        }
        Ok(())
    }
}
