use http::header::{CONTENT_TYPE, COOKIE, LOCATION};
use http::{HeaderMap, HeaderValue, Method};
use url::Url;

use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::net::Response;
use crate::session::SessionStore;

/// Issues requests on behalf of a [`SessionStore`].
///
/// Cookies are handled here rather than by `reqwest`: every request carries the
/// store's `Cookie` header for its URL, and the `Set-Cookie` headers of every
/// response, redirect hops included, are written back into the store. Redirects
/// are followed manually for that reason. Caller-supplied headers are only sent
/// while the redirect chain stays on the origin of the first request.
#[derive(Debug, Clone)]
pub struct Transport {
    http: reqwest::Client,
    base_url: Url,
    max_redirects: usize,
}

impl Transport {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            max_redirects: config.max_redirects,
        })
    }

    /// Site root that endpoint paths are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    /// GET `url`, whatever its status.
    pub async fn get(&self, store: &mut SessionStore, url: Url) -> Result<Response, ClientError> {
        self.execute(store, Method::GET, url, HeaderMap::new(), None).await
    }

    /// POST `form` URL-encoded to `url`, whatever the response status.
    pub async fn post_form(
        &self,
        store: &mut SessionStore,
        url: Url,
        headers: HeaderMap,
        form: &[(&str, &str)],
    ) -> Result<Response, ClientError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form)
            .finish();
        self.execute(store, Method::POST, url, headers, Some(body)).await
    }

    async fn execute(
        &self,
        store: &mut SessionStore,
        mut method: Method,
        mut url: Url,
        mut headers: HeaderMap,
        mut body: Option<String>,
    ) -> Result<Response, ClientError> {
        let origin = url.origin();

        for _ in 0..=self.max_redirects {
            let mut req = self.http.request(method.clone(), url.clone()).headers(headers.clone());
            if let Some(cookies) = store.request_header(&url) {
                req = req.header(COOKIE, cookies);
            }
            if let Some(body) = &body {
                req = req
                    .header(CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded"))
                    .body(body.clone());
            }

            log::debug!("{method} {url}");
            let res = req.send().await?;
            store.store_response_cookies(res.url(), res.headers());

            let status = res.status();
            let location = res
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);

            match location {
                Some(location) if status.is_redirection() => {
                    let next = url.join(&location)?;
                    log::debug!("{} redirect to {next}", status.as_u16());
                    if matches!(status.as_u16(), 301..=303) && method != Method::GET {
                        method = Method::GET;
                        body = None;
                    }
                    if !headers.is_empty() && next.origin() != origin {
                        log::debug!("dropping request headers for cross-origin redirect to {next}");
                        headers.clear();
                    }
                    url = next;
                }
                _ => return Response::read(res).await,
            }
        }

        Err(ClientError::TooManyRedirects(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(server: &MockServer) -> Transport {
        let config = ClientConfig::builder().base_url(server.uri()).build().unwrap();
        Transport::new(&config).unwrap()
    }

    #[tokio::test]
    async fn sends_and_captures_cookies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/first"))
            .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "a=1; Path=/"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/second"))
            .and(header("cookie", "a=1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let t = transport(&server);
        let mut store = SessionStore::new();
        t.get(&mut store, t.endpoint("first").unwrap()).await.unwrap();
        let res = t.get(&mut store, t.endpoint("second").unwrap()).await.unwrap();

        assert_eq!(res.status, 200);
        assert_eq!(res.text(), "ok");
    }

    #[tokio::test]
    async fn keeps_cookies_set_on_redirect_hops() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submit"))
            .and(body_string_contains("k=v"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", "/landing")
                    .insert_header("set-cookie", "hop=1; Path=/"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/landing"))
            .and(header("cookie", "hop=1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let t = transport(&server);
        let mut store = SessionStore::new();
        let res = t
            .post_form(&mut store, t.endpoint("submit").unwrap(), HeaderMap::new(), &[("k", "v")])
            .await
            .unwrap();

        assert_eq!(res.status, 200);
        assert_eq!(res.url.path(), "/landing");
        assert_eq!(store.jar().all_cookies().len(), 1);
    }

    fn token_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-token", HeaderValue::from_static("secret"));
        headers
    }

    #[tokio::test]
    async fn same_origin_redirects_keep_request_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submit"))
            .respond_with(ResponseTemplate::new(307).insert_header("location", "/again"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/again"))
            .and(header("x-token", "secret"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let t = transport(&server);
        let res = t
            .post_form(&mut SessionStore::new(), t.endpoint("submit").unwrap(), token_headers(), &[])
            .await
            .unwrap();
        assert_eq!(res.status, 200);
    }

    #[tokio::test]
    async fn cross_origin_redirects_drop_request_headers() {
        let first = MockServer::start().await;
        let second = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submit"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", format!("{}/landing", second.uri())))
            .mount(&first)
            .await;
        Mock::given(header_exists("x-token"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&second)
            .await;
        Mock::given(method("GET"))
            .and(path("/landing"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&second)
            .await;

        let t = transport(&first);
        let res = t
            .post_form(&mut SessionStore::new(), t.endpoint("submit").unwrap(), token_headers(), &[])
            .await
            .unwrap();
        assert_eq!(res.status, 200);

        let received = second.received_requests().await.unwrap();
        assert_eq!(received.len(), 1);
        assert!(!received[0].headers.contains_key("x-token"));
    }

    #[tokio::test]
    async fn gives_up_on_redirect_loops() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/loop"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop"))
            .mount(&server)
            .await;

        let config = ClientConfig::builder().base_url(server.uri()).max_redirects(3).build().unwrap();
        let t = Transport::new(&config).unwrap();
        let err = t.get(&mut SessionStore::new(), t.endpoint("loop").unwrap()).await.unwrap_err();
        assert!(matches!(err, ClientError::TooManyRedirects(_)));
    }

    #[tokio::test]
    async fn non_2xx_is_returned_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let t = transport(&server);
        let res = t.get(&mut SessionStore::new(), t.endpoint("missing").unwrap()).await.unwrap();
        assert_eq!(res.status, 404);
        assert!(!res.is_success());
    }
}
