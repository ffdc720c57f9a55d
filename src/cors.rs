use rocket::{
    Request, Response,
    fairing::{Fairing, Info, Kind},
    http::{Header, Method, Status},
};

const ALLOWED_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Authorization, Content-Type";
const PREFLIGHT_MAX_AGE: &str = "86400";

/// Adds `Access-Control-*` headers for the configured origins.
///
/// A `*` entry allows every origin without credentials. Named origins are
/// echoed back with `Access-Control-Allow-Credentials` so the session cookie
/// travels cross-site.
pub struct CorsFairing {
    origins: Vec<String>,
}

impl CorsFairing {
    pub fn new(allowed: &str) -> Self {
        let origins = allowed
            .split(',')
            .map(|origin| origin.trim().trim_end_matches('/'))
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        Self { origins }
    }

    fn allowed_origin(&self, origin: Option<&str>) -> Option<String> {
        if self.origins.iter().any(|o| o == "*") {
            return Some("*".to_string());
        }

        let origin = origin?;
        self.origins
            .iter()
            .any(|o| o == origin)
            .then(|| origin.to_string())
    }
}

#[rocket::async_trait]
impl Fairing for CorsFairing {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let Some(origin) = self.allowed_origin(request.headers().get_one("Origin")) else {
            return;
        };

        if origin != "*" {
            response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
            response.set_header(Header::new("Vary", "Origin"));
        }
        response.set_header(Header::new("Access-Control-Allow-Origin", origin));
        response.set_header(Header::new("Access-Control-Allow-Methods", ALLOWED_METHODS));
        response.set_header(Header::new("Access-Control-Allow-Headers", ALLOWED_HEADERS));

        if request.method() == Method::Options {
            response.set_header(Header::new("Access-Control-Max-Age", PREFLIGHT_MAX_AGE));
        }
    }
}

/// Answers every preflight; the fairing supplies the headers.
#[options("/<_..>")]
pub fn cors_preflight() -> Status {
    Status::NoContent
}
