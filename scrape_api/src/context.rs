use std::time::Duration;

use nipper::Document;
use tracing::debug;
use url::Url;

use crate::errors::FetchError;

/// Shared state for every fetch in a run: one configured HTTP client.
#[derive(Clone)]
pub struct ScrapeContext {
    pub http: reqwest::Client,
}

impl ScrapeContext {
    pub fn new() -> Result<ScrapeContext, reqwest::Error> {
        Ok(ScrapeContext {
            http: build_http()?,
        })
    }

    /// GET a page and hand back its body as text.
    ///
    /// `resource_name` names the request in the logs, nothing more.
    pub async fn get_body(&self, resource_name: &str, url: &Url) -> Result<String, FetchError> {
        debug!(resource = resource_name, %url, "fetching");
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.clone(),
                status,
            });
        }
        response.text().await.map_err(|source| FetchError::Transport {
            url: url.clone(),
            source,
        })
    }

    /// GET a page and parse it into a selector-queryable document.
    pub async fn fetch_document(
        &self,
        resource_name: &str,
        url: &Url,
    ) -> Result<Document, FetchError> {
        let body = self.get_body(resource_name, url).await?;
        Ok(Document::from(&body))
    }
}

pub fn build_http() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::ClientBuilder::new()
        .user_agent("Mozilla/5.0 (Linux x86_64; rv:102.0) Gecko/20100101 Firefox/102.0")
        .connect_timeout(Duration::from_secs(30))
        .build()
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::errors::FetchError;

    #[tokio::test]
    async fn get_body_returns_page_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>hi</p>"))
            .mount(&server)
            .await;

        let ctx = ScrapeContext::new().unwrap();
        let url = Url::parse(&format!("{}/page", server.uri())).unwrap();
        let body = ctx.get_body("page", &url).await.unwrap();
        assert_eq!(body, "<p>hi</p>");
    }

    #[tokio::test]
    async fn non_2xx_is_a_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let ctx = ScrapeContext::new().unwrap();
        let url = Url::parse(&format!("{}/gone", server.uri())).unwrap();
        match ctx.get_body("gone", &url).await {
            Err(FetchError::Status { status, .. }) => assert_eq!(status.as_u16(), 500),
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_document_is_queryable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/doc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<div id="EchoTopic"><h2>Some OST</h2></div>"#),
            )
            .mount(&server)
            .await;

        let ctx = ScrapeContext::new().unwrap();
        let url = Url::parse(&format!("{}/doc", server.uri())).unwrap();
        let document = ctx.fetch_document("doc", &url).await.unwrap();
        assert_eq!(document.select("#EchoTopic h2").text().to_string(), "Some OST");
    }
}
