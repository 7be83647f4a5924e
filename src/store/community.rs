use chrono::{Duration, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::{
    error::StoreError,
    models::{CommunityPost, NewCommunityPost, NewUpcycleIdea, UpcycleIdea},
};

const DEFAULT_AUTHOR: &str = "CurrentUser";

pub struct CommunityFeed {
    posts: RwLock<Vec<CommunityPost>>,
}

impl CommunityFeed {
    pub fn new(posts: Vec<CommunityPost>) -> Self {
        Self { posts: RwLock::new(posts) }
    }

    pub fn seeded() -> Self {
        Self::new(seed_posts())
    }

    /// Posts whose content or author contains `term`, ignoring case.
    pub fn search(&self, term: Option<&str>) -> Vec<CommunityPost> {
        let term = term.map(|t| t.trim().to_lowercase()).unwrap_or_default();
        self.posts
            .read()
            .iter()
            .filter(|p| {
                term.is_empty()
                    || p.content.to_lowercase().contains(&term)
                    || p.author.to_lowercase().contains(&term)
            })
            .cloned()
            .collect()
    }

    pub fn add(&self, post: NewCommunityPost) -> Result<CommunityPost, StoreError> {
        let content = post.content.trim();
        if content.is_empty() {
            return Err(StoreError::InvalidInput("post content must not be empty".into()));
        }
        let author = post
            .author
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string());
        let created = CommunityPost {
            id: Uuid::new_v4(),
            avatar_url: avatar_for(&author),
            author,
            content: content.to_string(),
            timestamp: Utc::now(),
            likes: 0,
            comments: 0,
        };
        self.posts.write().insert(0, created.clone());
        Ok(created)
    }

    pub fn like(&self, id: Uuid) -> Result<CommunityPost, StoreError> {
        let mut posts = self.posts.write();
        let post = posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        post.likes += 1;
        Ok(post.clone())
    }
}

fn avatar_for(author: &str) -> String {
    format!("https://avatar.vercel.sh/{}.png", author.to_lowercase().replace(char::is_whitespace, "-"))
}

fn seed_posts() -> Vec<CommunityPost> {
    let now = Utc::now();
    [
        ("EcoWarriorJane", "Just turned my old jeans into a cool tote bag! So happy with how it turned out. #DIYReuse", Duration::hours(2), 15, 3),
        ("GreenThumbMike", "Any tips for composting in a small apartment? Trying to reduce my food waste.", Duration::hours(5), 8, 5),
        ("RecycleRita", "Found a new drop-off point for e-waste in the North District! Check EcoMap for details.", Duration::days(1), 22, 2),
    ]
    .into_iter()
    .map(|(author, content, age, likes, comments)| CommunityPost {
        id: Uuid::new_v4(),
        avatar_url: avatar_for(author),
        author: author.into(),
        content: content.into(),
        timestamp: now - age,
        likes,
        comments,
    })
    .collect()
}

/// Upcycle ideas shared from the studio, newest first.
pub struct UpcycleIdeas {
    ideas: RwLock<Vec<UpcycleIdea>>,
}

impl UpcycleIdeas {
    pub fn new() -> Self {
        Self { ideas: RwLock::new(Vec::new()) }
    }

    pub fn list(&self) -> Vec<UpcycleIdea> {
        self.ideas.read().clone()
    }

    pub fn add(&self, idea: NewUpcycleIdea) -> Result<UpcycleIdea, StoreError> {
        let item_name = idea.item_name.trim();
        let description = idea.idea_description.trim();
        if item_name.is_empty() || description.is_empty() {
            return Err(StoreError::InvalidInput("itemName and ideaDescription are required".into()));
        }
        let created = UpcycleIdea {
            id: Uuid::new_v4(),
            item_name: item_name.to_string(),
            idea_description: description.to_string(),
            submitted_by: idea.submitted_by.filter(|s| !s.trim().is_empty()),
            image_url: idea.image_url.filter(|s| !s.trim().is_empty()),
            submitted_at: Utc::now(),
        };
        self.ideas.write().insert(0, created.clone());
        Ok(created)
    }
}

impl Default for UpcycleIdeas {
    fn default() -> Self {
        Self::new()
    }
}
