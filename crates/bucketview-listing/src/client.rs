//! Signed `ListObjectsV2` client.
//!
//! [`ListingClient`] issues a single signed `GET {endpoint}/{bucket}/?list-type=2`
//! per call. Signing always completes before the request is sent, and the
//! response is fully read before it is returned. Nothing is retried.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bucketview_auth::Authorizer;
use bytes::Bytes;
use tracing::{debug, info};

use crate::error::ListingError;
use crate::keys::{ObjectKeys, is_image_file};

/// Boxed future returned by [`ObjectLister::list_image_keys`].
pub type ListingFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<String>, ListingError>> + Send + 'a>>;

/// Source of image keys for the gallery.
///
/// This trait is the boundary between the HTTP front end and the object
/// store, so the front end can be exercised without a live bucket.
pub trait ObjectLister: Send + Sync + 'static {
    /// List the keys of every image object in the bucket.
    fn list_image_keys(&self) -> ListingFuture<'_>;
}

/// Client that lists one bucket of an S3-compatible object store.
#[derive(Debug, Clone)]
pub struct ListingClient {
    http: reqwest::Client,
    list_url: String,
    authorizer: Arc<Authorizer>,
}

impl ListingClient {
    /// Create a client for `bucket` on `endpoint`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use bucketview_auth::{Authorizer, Credentials};
    /// use bucketview_listing::ListingClient;
    ///
    /// let authorizer = Arc::new(Authorizer::new(Credentials::new("AKID", "secret", "eu-central")));
    /// let client = ListingClient::new("https://eu-central.object.fastlystorage.app/", "images", authorizer)
    ///     .unwrap();
    /// assert_eq!(
    ///     client.list_url(),
    ///     "https://eu-central.object.fastlystorage.app/images/?list-type=2"
    /// );
    /// ```
    pub fn new(
        endpoint: &str,
        bucket: &str,
        authorizer: Arc<Authorizer>,
    ) -> Result<Self, ListingError> {
        let http = reqwest::Client::builder().build()?;
        let list_url = format!(
            "{}/{}/?list-type=2",
            endpoint.trim_end_matches('/'),
            bucket.trim_matches('/'),
        );

        Ok(Self {
            http,
            list_url,
            authorizer,
        })
    }

    /// The URL requested by [`fetch_listing`](Self::fetch_listing).
    #[must_use]
    pub fn list_url(&self) -> &str {
        &self.list_url
    }

    /// Fetch the raw `ListObjectsV2` XML for the bucket.
    ///
    /// Any non-2xx response is returned as [`ListingError::UpstreamStatus`].
    pub async fn fetch_listing(&self) -> Result<String, ListingError> {
        let mut request = http::Request::get(self.list_url.as_str()).body(Bytes::new())?;
        self.authorizer.authorize(&mut request)?;
        let request = reqwest::Request::try_from(request)?;

        info!(url = %self.list_url, "Fetching objects");

        let response = self.http.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ListingError::UpstreamStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_owned(),
            });
        }

        let body = response.text().await?;
        debug!(length = body.len(), "Received XML response");
        Ok(body)
    }
}

impl ObjectLister for ListingClient {
    fn list_image_keys(&self) -> ListingFuture<'_> {
        Box::pin(async move {
            let xml = self.fetch_listing().await?;

            let mut images = Vec::new();
            for key in ObjectKeys::new(&xml) {
                let key = key?;
                if is_image_file(&key) {
                    images.push(key);
                }
            }

            info!(count = images.len(), "Found image objects");
            Ok(images)
        })
    }
}
