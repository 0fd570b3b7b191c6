//! In-memory wiki and chat doubles for tests.

use std::sync::Mutex;

use anyhow::{anyhow, bail};
use async_trait::async_trait;

use teamops_types::WikiPage;

use crate::chat::ChatApi;
use crate::wiki::WikiApi;

#[derive(Debug, Clone)]
pub struct StoredPage {
    pub page: WikiPage,
    pub parent: Option<String>,
    pub body: String,
}

#[derive(Default)]
struct WikiState {
    pages: Vec<StoredPage>,
    next_id: u64,
    fail_all: bool,
    fail_copy: bool,
}

/// Wiki with a flat page table; copies are titled "Copy of ...".
#[derive(Default)]
pub struct FakeWiki {
    state: Mutex<WikiState>,
}

impl FakeWiki {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&self, parent: Option<&str>, title: &str) -> WikiPage {
        let mut state = self.state.lock().unwrap();
        insert(&mut state, parent, title, "")
    }

    pub fn pages(&self) -> Vec<StoredPage> {
        self.state.lock().unwrap().pages.clone()
    }

    pub fn page(&self, id: &str) -> Option<StoredPage> {
        self.pages().into_iter().find(|p| p.page.id == id)
    }

    pub fn child_titles(&self, parent_id: &str) -> Vec<String> {
        self.pages()
            .into_iter()
            .filter(|p| p.parent.as_deref() == Some(parent_id))
            .map(|p| p.page.title)
            .collect()
    }

    pub fn set_fail_all(&self, fail: bool) {
        self.state.lock().unwrap().fail_all = fail;
    }

    pub fn set_fail_copy(&self, fail: bool) {
        self.state.lock().unwrap().fail_copy = fail;
    }
}

fn insert(state: &mut WikiState, parent: Option<&str>, title: &str, body: &str) -> WikiPage {
    state.next_id += 1;
    let page = WikiPage {
        id: state.next_id.to_string(),
        title: title.to_string(),
        version: 1,
        web_ui: Some(format!("/spaces/TEAM/pages/{}", state.next_id)),
    };
    state.pages.push(StoredPage {
        page: page.clone(),
        parent: parent.map(String::from),
        body: body.to_string(),
    });
    page
}

#[async_trait]
impl WikiApi for FakeWiki {
    async fn find_page_by_title(&self, title: &str) -> anyhow::Result<Option<WikiPage>> {
        let state = self.state.lock().unwrap();
        if state.fail_all {
            bail!("wiki unavailable");
        }
        Ok(state
            .pages
            .iter()
            .find(|p| p.page.title == title)
            .map(|p| p.page.clone()))
    }

    async fn get_child_pages(&self, parent_id: &str) -> anyhow::Result<Vec<WikiPage>> {
        let state = self.state.lock().unwrap();
        if state.fail_all {
            bail!("wiki unavailable");
        }
        Ok(state
            .pages
            .iter()
            .filter(|p| p.parent.as_deref() == Some(parent_id))
            .map(|p| p.page.clone())
            .collect())
    }

    async fn create_page(
        &self,
        parent_id: Option<&str>,
        title: &str,
        body: &str,
    ) -> anyhow::Result<WikiPage> {
        let mut state = self.state.lock().unwrap();
        if state.fail_all {
            bail!("wiki unavailable");
        }
        Ok(insert(&mut state, parent_id, title, body))
    }

    async fn copy_page(
        &self,
        page_id: &str,
        destination_parent_id: &str,
    ) -> anyhow::Result<WikiPage> {
        let mut state = self.state.lock().unwrap();
        if state.fail_all || state.fail_copy {
            bail!("copy failed");
        }
        let source = state
            .pages
            .iter()
            .find(|p| p.page.id == page_id)
            .cloned()
            .ok_or_else(|| anyhow!("page {page_id} not found"))?;
        let title = format!("Copy of {}", source.page.title);
        Ok(insert(
            &mut state,
            Some(destination_parent_id),
            &title,
            &source.body,
        ))
    }

    async fn update_page(
        &self,
        page_id: &str,
        title: &str,
        version: u64,
    ) -> anyhow::Result<WikiPage> {
        let mut state = self.state.lock().unwrap();
        if state.fail_all {
            bail!("wiki unavailable");
        }
        let stored = state
            .pages
            .iter_mut()
            .find(|p| p.page.id == page_id)
            .ok_or_else(|| anyhow!("page {page_id} not found"))?;
        if version != stored.page.version + 1 {
            bail!(
                "version conflict: page is at {}, got {version}",
                stored.page.version
            );
        }
        stored.page.title = title.to_string();
        stored.page.version = version;
        Ok(stored.page.clone())
    }

    fn page_url(&self, page: &WikiPage) -> String {
        format!(
            "https://team.example.net/wiki{}",
            page.web_ui.as_deref().unwrap_or_default()
        )
    }
}

#[derive(Default)]
struct ChatState {
    messages: Vec<(String, String)>,
    topics: Vec<(String, String)>,
    fail_messages: bool,
    fail_topics: bool,
}

/// Records every message and topic change.
#[derive(Default)]
pub struct FakeChat {
    state: Mutex<ChatState>,
}

impl FakeChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().messages.clone()
    }

    pub fn topics(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().topics.clone()
    }

    pub fn set_fail_messages(&self, fail: bool) {
        self.state.lock().unwrap().fail_messages = fail;
    }

    pub fn set_fail_topics(&self, fail: bool) {
        self.state.lock().unwrap().fail_topics = fail;
    }
}

#[async_trait]
impl ChatApi for FakeChat {
    async fn post_message(&self, channel: &str, text: &str) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_messages {
            bail!("channel_not_found");
        }
        state.messages.push((channel.to_string(), text.to_string()));
        Ok(())
    }

    async fn set_channel_topic(&self, channel: &str, topic: &str) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_topics {
            bail!("not_in_channel");
        }
        state.topics.push((channel.to_string(), topic.to_string()));
        Ok(())
    }
}
