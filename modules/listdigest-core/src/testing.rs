// Test doubles for the digest pipeline.
//
// Two mocks matching the two trait boundaries:
// - MockListSource (ListSource) - scripted pages keyed by list and cursor
// - ScriptedGenerator (TextGenerator) - queued responses with call timing
//
// ScriptedProvider wraps a ScriptedGenerator so Summarizer can be driven
// through the Provider contract. Plus builders for raw payloads and posts.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use ai_client::{AiError, TextGenerator};
use async_trait::async_trait;
use listdigest_common::{Engagement, Post, ProviderOptions};
use tokio::time::Instant;
use x_client::{
    ListInfo, MembershipList, MembershipPage, PostPage, RawTweet, RawUser, XError,
};

use crate::prompt::PromptBudget;
use crate::provider::resilience::RetrySchedule;
use crate::provider::{Connection, Provider};
use crate::traits::ListSource;

fn not_found(what: &str) -> XError {
    XError::Api {
        status: 404,
        message: format!("MockListSource: no {what} registered"),
    }
}

// ---------------------------------------------------------------------------
// MockListSource
// ---------------------------------------------------------------------------

type PageKey = (String, Option<String>);

#[derive(Default)]
struct MockListSourceInner {
    pages: HashMap<PageKey, Result<PostPage, XError>>,
    latency: HashMap<Option<String>, Duration>,
    list_info: HashMap<String, ListInfo>,
    users: HashMap<String, RawUser>,
    memberships: HashMap<(String, String), Result<MembershipPage, XError>>,
    current_user: Option<Result<RawUser, XError>>,
    page_requests: Vec<(Option<String>, u32)>,
    user_lookups: usize,
    current_user_calls: usize,
}

/// Scripted list gateway. Unregistered pages come back empty, unregistered
/// lookups come back as 404. Clones share state so a test can keep a handle
/// for assertions after moving one into the code under test.
#[derive(Clone, Default)]
pub struct MockListSource {
    inner: Arc<Mutex<MockListSourceInner>>,
}

impl MockListSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockListSourceInner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn on_page(
        self,
        list_id: &str,
        cursor: Option<&str>,
        tweets: Vec<RawTweet>,
        next_cursor: Option<&str>,
    ) -> Self {
        let page = PostPage {
            tweets,
            next_cursor: next_cursor.map(String::from),
        };
        self.lock()
            .pages
            .insert((list_id.to_string(), cursor.map(String::from)), Ok(page));
        self
    }

    pub fn on_page_error(self, list_id: &str, cursor: Option<&str>, err: XError) -> Self {
        self.lock()
            .pages
            .insert((list_id.to_string(), cursor.map(String::from)), Err(err));
        self
    }

    /// Delay every page request made with `cursor`.
    pub fn with_latency(self, cursor: Option<&str>, delay: Duration) -> Self {
        self.lock().latency.insert(cursor.map(String::from), delay);
        self
    }

    pub fn on_list_info(self, info: ListInfo) -> Self {
        self.lock().list_info.insert(info.id.clone(), info);
        self
    }

    pub fn on_user(self, handle: &str, id: &str) -> Self {
        self.on_user_profile(RawUser {
            id: id.to_string(),
            screen_name: handle.to_string(),
            ..Default::default()
        })
    }

    pub fn on_user_profile(self, user: RawUser) -> Self {
        self.lock()
            .users
            .insert(user.screen_name.to_lowercase(), user);
        self
    }

    pub fn on_memberships(self, user_id: &str, cursor: &str, page: MembershipPage) -> Self {
        self.lock()
            .memberships
            .insert((user_id.to_string(), cursor.to_string()), Ok(page));
        self
    }

    pub fn on_memberships_error(self, user_id: &str, cursor: &str, err: XError) -> Self {
        self.lock()
            .memberships
            .insert((user_id.to_string(), cursor.to_string()), Err(err));
        self
    }

    /// Session owner returned by `current_user`. Defaults to `@tester`.
    pub fn with_current_user(self, result: Result<&str, XError>) -> Self {
        self.lock().current_user = Some(result.map(|handle| RawUser {
            id: "1".to_string(),
            screen_name: handle.to_string(),
            ..Default::default()
        }));
        self
    }

    /// `(cursor, count)` for every page request, in order.
    pub fn page_requests(&self) -> Vec<(Option<String>, u32)> {
        self.lock().page_requests.clone()
    }

    pub fn user_lookups(&self) -> usize {
        self.lock().user_lookups
    }

    pub fn current_user_calls(&self) -> usize {
        self.lock().current_user_calls
    }
}

#[async_trait]
impl ListSource for MockListSource {
    async fn list_page(
        &self,
        list_id: &str,
        count: u32,
        cursor: Option<&str>,
    ) -> Result<PostPage, XError> {
        let (delay, scripted) = {
            let mut inner = self.lock();
            inner.page_requests.push((cursor.map(String::from), count));
            let delay = inner.latency.get(&cursor.map(String::from)).copied();
            let scripted = inner
                .pages
                .get(&(list_id.to_string(), cursor.map(String::from)))
                .cloned();
            (delay, scripted)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        scripted.unwrap_or_else(|| Ok(PostPage::default()))
    }

    async fn list_info(&self, list_id: &str) -> Result<ListInfo, XError> {
        self.lock()
            .list_info
            .get(list_id)
            .cloned()
            .ok_or_else(|| not_found("list info"))
    }

    async fn user_by_handle(&self, handle: &str) -> Result<RawUser, XError> {
        let mut inner = self.lock();
        inner.user_lookups += 1;
        inner
            .users
            .get(&handle.to_lowercase())
            .cloned()
            .ok_or_else(|| not_found("user"))
    }

    async fn memberships(
        &self,
        user_id: &str,
        _count: u32,
        cursor: Option<&str>,
    ) -> Result<MembershipPage, XError> {
        let key = (user_id.to_string(), cursor.unwrap_or("-1").to_string());
        self.lock()
            .memberships
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Ok(MembershipPage::default()))
    }

    async fn current_user(&self) -> Result<RawUser, XError> {
        let mut inner = self.lock();
        inner.current_user_calls += 1;
        inner.current_user.clone().unwrap_or_else(|| {
            Ok(RawUser {
                id: "1".to_string(),
                screen_name: "tester".to_string(),
                ..Default::default()
            })
        })
    }
}

// ---------------------------------------------------------------------------
// ScriptedGenerator / ScriptedProvider
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ScriptedInner {
    responses: VecDeque<Result<String, AiError>>,
    health: Option<AiError>,
    calls: Vec<Instant>,
    prompts: Vec<String>,
}

/// Text generator answering from a queue. An exhausted queue answers with a
/// network error.
#[derive(Clone, Default)]
pub struct ScriptedGenerator {
    inner: Arc<Mutex<ScriptedInner>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptedInner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn then_ok(self, text: &str) -> Self {
        self.lock().responses.push_back(Ok(text.to_string()));
        self
    }

    pub fn then_err(self, err: AiError) -> Self {
        self.lock().responses.push_back(Err(err));
        self
    }

    /// Fail the next health check with `err`.
    pub fn with_unhealthy(self, err: AiError) -> Self {
        self.lock().health = Some(err);
        self
    }

    pub fn calls(&self) -> usize {
        self.lock().calls.len()
    }

    /// When each `generate` call started.
    pub fn call_times(&self) -> Vec<Instant> {
        self.lock().calls.clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.lock().prompts.clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn health_check(&self) -> ai_client::Result<()> {
        match self.lock().health.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn generate(&self, prompt: &str, _max_tokens: u32) -> ai_client::Result<String> {
        let mut inner = self.lock();
        inner.calls.push(Instant::now());
        inner.prompts.push(prompt.to_string());
        inner.responses.pop_front().unwrap_or_else(|| {
            Err(AiError::Network(
                "ScriptedGenerator: script exhausted".to_string(),
            ))
        })
    }
}

/// Provider that hands out a shared [`ScriptedGenerator`].
pub struct ScriptedProvider {
    pub generator: ScriptedGenerator,
    pub requires_credential: bool,
    pub retry: RetrySchedule,
}

impl ScriptedProvider {
    pub fn new(generator: ScriptedGenerator) -> Self {
        Self {
            generator,
            requires_credential: false,
            retry: RetrySchedule::default(),
        }
    }

    pub fn credential_required(mut self) -> Self {
        self.requires_credential = true;
        self
    }

    pub fn with_retry(mut self, retry: RetrySchedule) -> Self {
        self.retry = retry;
        self
    }
}

impl Provider for ScriptedProvider {
    fn id(&self) -> &str {
        "scripted"
    }

    fn label(&self) -> &str {
        "Scripted"
    }

    fn requires_credential(&self) -> bool {
        self.requires_credential
    }

    fn resolve(&self, options: &ProviderOptions) -> Connection {
        Connection {
            endpoint: options.endpoint().unwrap_or("http://scripted.local").to_string(),
            api_key: options.api_key().map(String::from),
            model: options.model().unwrap_or("scripted-model").to_string(),
        }
    }

    fn retry_schedule(&self) -> RetrySchedule {
        self.retry.clone()
    }

    fn prompt_budget(&self) -> PromptBudget {
        PromptBudget::default()
    }

    fn generator(&self, _connection: &Connection) -> ai_client::Result<Arc<dyn TextGenerator>> {
        Ok(Arc::new(self.generator.clone()))
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Raw payload authored by `@author` with the given id and no entities.
pub fn raw_tweet(id: &str) -> RawTweet {
    RawTweet {
        id: id.to_string(),
        text: format!("post {id}"),
        user: Some(RawUser {
            id: "100".to_string(),
            screen_name: "author".to_string(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Normalized post by `@author` carrying `links` and `likes`.
pub fn post(id: &str, links: &[&str], likes: u64) -> Post {
    Post {
        id: id.to_string(),
        author: "author".to_string(),
        text: format!("post {id}"),
        links: links.iter().map(|l| l.to_string()).collect(),
        media: Vec::new(),
        card: None,
        engagement: Engagement {
            likes,
            ..Default::default()
        },
    }
}

/// One memberships page of lists owned by `@owner`.
pub fn membership_page(names: &[&str], next_cursor: Option<&str>) -> MembershipPage {
    MembershipPage {
        lists: names
            .iter()
            .enumerate()
            .map(|(i, name)| MembershipList {
                id_str: format!("{}{i}", name.len()),
                name: name.to_string(),
                user: Some(RawUser {
                    id: "7".to_string(),
                    screen_name: "owner".to_string(),
                    ..Default::default()
                }),
            })
            .collect(),
        next_cursor_str: next_cursor.map(String::from),
    }
}
