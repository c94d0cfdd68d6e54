use async_trait::async_trait;
use reqwest::{Method, Request, Response, Url};

/// Sends dataset requests. [`super::BasicClient`] talks to the network;
/// tests substitute canned responses.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;

    /// Plain GET with no extra headers.
    async fn get(&self, url: Url) -> reqwest::Result<Response> {
        self.execute(Request::new(Method::GET, url)).await
    }
}
