pub mod core;
pub mod registry;
pub mod travis;

use async_trait::async_trait;
use reqwest::header::HeaderMap;

use crate::models::Payload;

pub use self::core::ServiceSettings;
pub use registry::{define_services, ServiceMap};

/// A single upstream integration shown on the dashboard.
#[async_trait]
pub trait Service: Send + Sync {
    /// Display name shown next to the service's data.
    fn service_name(&self) -> &str;

    /// Name of the template that renders this service.
    fn template(&self) -> &'static str;

    fn headers(&self) -> HeaderMap {
        self::core::default_headers()
    }

    /// Fetch and normalize the latest upstream data.
    ///
    /// Upstream failures are logged and reported as an empty payload.
    async fn update(&self) -> Payload;
}
