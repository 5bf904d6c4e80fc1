//! Gallery HTTP service implementing the hyper `Service` trait.
//!
//! `GET /` lists the bucket and renders the image grid. A failed listing
//! still produces a `200` page with an error panel. Every other request
//! gets a plain-text `404`.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bucketview_listing::ObjectLister;
use bytes::Bytes;
use http::header::{CACHE_CONTROL, CONTENT_TYPE, HeaderName, SERVER};
use http::{HeaderValue, Method, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use tracing::{error, info};

use crate::render::{ImageEntry, render_error_panel, render_grid, render_page};

/// Response body used by the gallery.
pub type GalleryBody = Full<Bytes>;

/// Body of every `404` response.
pub const NOT_FOUND_BODY: &str = "The page you requested could not be found";

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
const PAGE_CACHE_CONTROL: &str = "public, max-age=300";
const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Settings the gallery needs at request time.
#[derive(Debug, Clone)]
pub struct GalleryConfig {
    /// Base URL of the image-resizing service.
    pub static_domain: String,
    /// Bucket name shown in the empty-state panel.
    pub bucket_name: String,
}

/// Hyper `Service` that serves the image gallery.
#[derive(Debug)]
pub struct GalleryService<L: ObjectLister> {
    lister: Arc<L>,
    config: Arc<GalleryConfig>,
}

impl<L: ObjectLister> GalleryService<L> {
    /// Create a new `GalleryService`.
    pub fn new(lister: Arc<L>, config: GalleryConfig) -> Self {
        Self {
            lister,
            config: Arc::new(config),
        }
    }
}

impl<L: ObjectLister> Clone for GalleryService<L> {
    fn clone(&self) -> Self {
        Self {
            lister: Arc::clone(&self.lister),
            config: Arc::clone(&self.config),
        }
    }
}

impl<L: ObjectLister> hyper::service::Service<http::Request<Incoming>> for GalleryService<L> {
    type Response = http::Response<GalleryBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let lister = Arc::clone(&self.lister);
        let config = Arc::clone(&self.config);
        let method = req.method().clone();
        let path = req.uri().path().to_owned();
        let request_id = uuid::Uuid::new_v4().to_string();

        Box::pin(async move {
            info!(%method, %path, %request_id, "handling request");
            let response = route(&method, &path, lister.as_ref(), &config).await;
            Ok(add_common_headers(response, &request_id))
        })
    }
}

/// Dispatch a request by method and path.
pub async fn route<L: ObjectLister>(
    method: &Method,
    path: &str,
    lister: &L,
    config: &GalleryConfig,
) -> http::Response<GalleryBody> {
    if method == Method::GET && path == "/" {
        render_gallery(lister, config).await
    } else {
        not_found()
    }
}

/// List the bucket and render the page, degrading to an error panel on failure.
async fn render_gallery<L: ObjectLister>(
    lister: &L,
    config: &GalleryConfig,
) -> http::Response<GalleryBody> {
    match lister.list_image_keys().await {
        Ok(keys) => {
            let entries: Vec<ImageEntry> = keys
                .iter()
                .map(|key| ImageEntry::new(&config.static_domain, key))
                .collect();
            let page = render_page(&render_grid(&entries, &config.bucket_name));

            let mut response = html_response(page);
            response
                .headers_mut()
                .insert(CACHE_CONTROL, HeaderValue::from_static(PAGE_CACHE_CONTROL));
            response
        }
        Err(err) => {
            error!(error = %err, "Error fetching objects");
            html_response(render_page(&render_error_panel(&err.to_string())))
        }
    }
}

fn html_response(page: String) -> http::Response<GalleryBody> {
    let mut response = http::Response::new(Full::new(Bytes::from(page)));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));
    response
}

fn not_found() -> http::Response<GalleryBody> {
    let mut response = http::Response::new(Full::new(Bytes::from_static(
        NOT_FOUND_BODY.as_bytes(),
    )));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Add headers shared by every response.
fn add_common_headers(
    mut response: http::Response<GalleryBody>,
    request_id: &str,
) -> http::Response<GalleryBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = HeaderValue::from_str(request_id) {
        headers.insert(X_REQUEST_ID, hv);
    }
    headers.insert(SERVER, HeaderValue::from_static("bucketview"));

    response
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use bucketview_auth::{Authorizer, Credentials};
    use bucketview_listing::{
        ListingClient, ListingError, ListingFuture, extract_keys, is_image_file,
    };
    use http_body_util::BodyExt;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper_util::rt::TokioIo;
    use tokio::net::TcpListener;

    use super::*;

    const DOMAIN: &str = "https://static.example.com";

    /// Lister that serves a canned `ListObjectsV2` document or a fixed upstream status.
    enum FakeLister {
        Xml(String),
        Status(u16, &'static str),
    }

    impl ObjectLister for FakeLister {
        fn list_image_keys(&self) -> ListingFuture<'_> {
            Box::pin(async move {
                match self {
                    Self::Xml(xml) => Ok(extract_keys(xml)?
                        .into_iter()
                        .filter(|key| is_image_file(key))
                        .collect()),
                    Self::Status(status, reason) => Err(ListingError::UpstreamStatus {
                        status: *status,
                        reason: (*reason).to_owned(),
                    }),
                }
            })
        }
    }

    fn test_config() -> GalleryConfig {
        GalleryConfig {
            static_domain: DOMAIN.to_owned(),
            bucket_name: "images".to_owned(),
        }
    }

    async fn body_text(response: http::Response<GalleryBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn listing_xml(keys: &[&str]) -> String {
        let contents: String = keys
            .iter()
            .map(|key| format!("<Contents><Key>{key}</Key><Size>1</Size></Contents>"))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Name>images</Name>{contents}</ListBucketResult>"#
        )
    }

    #[tokio::test]
    async fn test_should_render_only_image_keys() {
        let lister = FakeLister::Xml(listing_xml(&["a.jpg", "b.txt", "c.PNG"]));

        let response = route(&Method::GET, "/", &lister, &test_config()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], HTML_CONTENT_TYPE);
        assert_eq!(response.headers()[CACHE_CONTROL], PAGE_CACHE_CONTROL);

        let body = body_text(response).await;
        assert_eq!(body.matches("class=\"card ").count(), 2);
        assert!(body.contains("https://static.example.com/a.jpg?width=300&height=200"));
        assert!(body.contains("https://static.example.com/c.PNG?width=300&height=200"));
        assert!(!body.contains("b.txt"));
    }

    #[tokio::test]
    async fn test_should_render_empty_state_for_empty_bucket() {
        let lister = FakeLister::Xml(listing_xml(&[]));

        let response = route(&Method::GET, "/", &lister, &test_config()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_text(response).await;
        assert!(body.contains("No Images Found"));
        assert!(!body.contains("class=\"card "));
    }

    #[tokio::test]
    async fn test_should_render_error_panel_on_upstream_failure() {
        let lister = FakeLister::Status(500, "Internal Server Error");

        let response = route(&Method::GET, "/", &lister, &test_config()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(CACHE_CONTROL).is_none());

        let body = body_text(response).await;
        assert!(body.contains("Error loading images"));
        assert!(body.contains("Failed to list objects: 500 Internal Server Error"));
    }

    #[tokio::test]
    async fn test_should_return_not_found_for_other_paths() {
        let lister = FakeLister::Xml("<ListBucketResult/>".to_owned());

        let response = route(&Method::GET, "/favicon.ico", &lister, &test_config()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, NOT_FOUND_BODY);
    }

    #[tokio::test]
    async fn test_should_return_not_found_for_other_methods() {
        let lister = FakeLister::Xml("<ListBucketResult/>".to_owned());

        for method in [Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
            let response = route(&method, "/", &lister, &test_config()).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method}");
        }
    }

    #[test]
    fn test_should_add_common_headers() {
        let response = add_common_headers(not_found(), "req-123");
        assert_eq!(response.headers()[X_REQUEST_ID], "req-123");
        assert_eq!(response.headers()[SERVER], "bucketview");
    }

    #[tokio::test]
    async fn test_should_degrade_when_real_upstream_returns_server_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let svc = service_fn(|_req: http::Request<Incoming>| async {
                let mut response = http::Response::new(Full::new(Bytes::from_static(
                    b"<Error><Code>InternalError</Code></Error>",
                )));
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                Ok::<_, Infallible>(response)
            });
            http1::Builder::new()
                .serve_connection(TokioIo::new(stream), svc)
                .await
                .ok();
        });

        let authorizer = Arc::new(Authorizer::new(Credentials::new(
            "AKID",
            "secret",
            "eu-central",
        )));
        let client = ListingClient::new(&format!("http://{addr}"), "images", authorizer).unwrap();

        let response = route(&Method::GET, "/", &client, &test_config()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_text(response).await;
        assert!(body.contains("Error loading images"));
        assert!(body.contains("500 Internal Server Error"));
    }

    #[tokio::test]
    async fn test_should_degrade_when_upstream_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let authorizer = Arc::new(Authorizer::new(Credentials::new(
            "AKID",
            "secret",
            "eu-central",
        )));
        let client = ListingClient::new(&format!("http://{addr}"), "images", authorizer).unwrap();

        let response = route(&Method::GET, "/", &client, &test_config()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(CACHE_CONTROL).is_none());

        let body = body_text(response).await;
        assert!(body.contains("Error loading images"));
        assert!(body.contains("Unable to fetch images from object storage: "));
    }
}
