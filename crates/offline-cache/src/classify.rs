//! Request classification.

use offline_core::{Destination, Request};
use serde::Serialize;
use url::Url;

use crate::partition::Purpose;

/// File extensions treated as images, compared case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg", "ico"];

/// Path segment marking an API request.
pub const API_SEGMENT: &str = "/api/";

/// How an intercepted request is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    /// Not intercepted; goes to the network untouched.
    Passthrough,
    /// Cache-first against the image partition.
    Image,
    /// Network-first against the API partition.
    Api,
    /// Network-first against the static shell partition.
    Static,
}

impl Route {
    /// Partition purpose for intercepted routes.
    pub fn purpose(&self) -> Option<Purpose> {
        match self {
            Self::Passthrough => None,
            Self::Image => Some(Purpose::Image),
            Self::Api => Some(Purpose::Api),
            Self::Static => Some(Purpose::StaticShell),
        }
    }
}

/// Classify a request relative to the worker's origin.
///
/// Cross-origin requests are always `Passthrough`. Image wins over API.
pub fn classify(request: &Request, origin: &Url) -> Route {
    if !request.is_same_origin(origin) {
        return Route::Passthrough;
    }
    if is_image(request) {
        Route::Image
    } else if request.path().contains(API_SEGMENT) {
        Route::Api
    } else {
        Route::Static
    }
}

fn is_image(request: &Request) -> bool {
    if request.destination == Destination::Image {
        return true;
    }
    request
        .path()
        .rsplit_once('.')
        .map(|(_, ext)| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    fn route(url: &str) -> Route {
        classify(&Request::parse(url).unwrap(), &origin())
    }

    #[test]
    fn test_image_by_extension() {
        assert_eq!(route("https://example.com/img/logo.png"), Route::Image);
        assert_eq!(route("https://example.com/photo.JPEG"), Route::Image);
        assert_eq!(route("https://example.com/favicon.ico?v=2"), Route::Image);
        assert_eq!(route("https://example.com/icons/x.svg"), Route::Image);
    }

    #[test]
    fn test_image_by_destination() {
        let request = Request::parse("https://example.com/avatar")
            .unwrap()
            .with_destination(Destination::Image);
        assert_eq!(classify(&request, &origin()), Route::Image);
    }

    #[test]
    fn test_extension_must_end_path() {
        assert_eq!(route("https://example.com/png/readme.txt"), Route::Static);
        assert_eq!(route("https://example.com/logo.png.html"), Route::Static);
    }

    #[test]
    fn test_api() {
        assert_eq!(route("https://example.com/api/users"), Route::Api);
        assert_eq!(route("https://example.com/v2/api/status"), Route::Api);
        assert_eq!(route("https://example.com/apis"), Route::Static);
    }

    #[test]
    fn test_image_wins_over_api() {
        assert_eq!(route("https://example.com/api/avatar.png"), Route::Image);
    }

    #[test]
    fn test_static_default() {
        assert_eq!(route("https://example.com/"), Route::Static);
        assert_eq!(route("https://example.com/main.js"), Route::Static);
    }

    #[test]
    fn test_cross_origin_passthrough() {
        assert_eq!(route("https://cdn.example.net/logo.png"), Route::Passthrough);
        assert_eq!(route("https://example.com:8443/api/x"), Route::Passthrough);
        assert_eq!(Route::Passthrough.purpose(), None);
        assert_eq!(Route::Static.purpose(), Some(Purpose::StaticShell));
    }
}
