// Trait seam between the pipeline and the list gateway.
//
// `XClient` implements it for real runs. `testing::MockListSource` implements
// it with scripted pages so fetch, memberships and orchestration can be
// exercised without network.

use async_trait::async_trait;
use x_client::{ListInfo, MembershipPage, PostPage, RawUser, XClient, XError};

#[async_trait]
pub trait ListSource: Send + Sync {
    /// One cursor page of posts in a list.
    async fn list_page(
        &self,
        list_id: &str,
        count: u32,
        cursor: Option<&str>,
    ) -> Result<PostPage, XError>;

    async fn list_info(&self, list_id: &str) -> Result<ListInfo, XError>;

    async fn user_by_handle(&self, handle: &str) -> Result<RawUser, XError>;

    async fn memberships(
        &self,
        user_id: &str,
        count: u32,
        cursor: Option<&str>,
    ) -> Result<MembershipPage, XError>;

    /// The account behind the session credential.
    async fn current_user(&self) -> Result<RawUser, XError>;
}

#[async_trait]
impl ListSource for XClient {
    async fn list_page(
        &self,
        list_id: &str,
        count: u32,
        cursor: Option<&str>,
    ) -> Result<PostPage, XError> {
        self.list_tweets(list_id, count, cursor).await
    }

    async fn list_info(&self, list_id: &str) -> Result<ListInfo, XError> {
        XClient::list_info(self, list_id).await
    }

    async fn user_by_handle(&self, handle: &str) -> Result<RawUser, XError> {
        self.user_by_screen_name(handle).await
    }

    async fn memberships(
        &self,
        user_id: &str,
        count: u32,
        cursor: Option<&str>,
    ) -> Result<MembershipPage, XError> {
        XClient::memberships(self, user_id, count, cursor).await
    }

    async fn current_user(&self) -> Result<RawUser, XError> {
        self.verify_credentials().await
    }
}
