//! Route classification: gate exclusions, public routes and the capability table.

use tracing::debug;

use crate::api::models::profiles::Role;
use crate::config::{AuthorizationConfig, GateConfig, RouteRule};

/// True if `path` equals `route` or lies beneath it (`/login/x` matches `/login`, `/loginx` does not)
pub fn matches_route(path: &str, route: &str) -> bool {
    let route = route.trim_end_matches('/');
    if route.is_empty() {
        return path.starts_with('/');
    }
    match path.strip_prefix(route) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// What the gate does with a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    /// Redirect to the login page, carrying the original path
    RedirectToLogin { location: String },
    /// Redirect an already signed-in caller away from the login page
    RedirectToLanding { location: String },
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    gate: GateConfig,
    /// Sorted longest prefix first
    rules: Vec<RouteRule>,
}

impl RouteTable {
    pub fn new(gate: &GateConfig, authorization: &AuthorizationConfig) -> Self {
        let mut rules = authorization.rules.clone();
        rules.sort_by(|a, b| b.prefix.trim_end_matches('/').len().cmp(&a.prefix.trim_end_matches('/').len()));
        Self {
            gate: gate.clone(),
            rules,
        }
    }

    pub fn login_path(&self) -> &str {
        &self.gate.login_path
    }

    pub fn landing_path(&self) -> &str {
        &self.gate.landing_path
    }

    /// Static assets and probes that bypass the gate entirely. Extensions match case-sensitively.
    ///
    /// Excluded requests never carry a `Session`, so any handler reached this way (an image-like
    /// segment under `/admin/api/profiles/{id}`, say) fails its own extractor and does nothing.
    pub fn is_excluded(&self, path: &str) -> bool {
        if self.gate.excluded_prefixes.iter().any(|prefix| matches_route(path, prefix)) {
            return true;
        }
        let file_name = path.rsplit('/').next().unwrap_or(path);
        match file_name.rsplit_once('.') {
            Some((stem, extension)) if !stem.is_empty() => self
                .gate
                .excluded_extensions
                .iter()
                .any(|excluded| excluded == extension),
            _ => false,
        }
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.gate.public_routes.iter().any(|route| matches_route(path, route))
    }

    /// Minimum role for `path` from the longest matching rule, if any
    pub fn required_role(&self, path: &str) -> Option<Role> {
        self.rules
            .iter()
            .find(|rule| matches_route(path, &rule.prefix))
            .map(|rule| rule.min_role)
    }

    /// `/login?redirect=<path>` with the original path form-url-encoded
    pub fn login_redirect_location(&self, original_path: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(original_path.as_bytes()).collect();
        format!("{}?redirect={}", self.gate.login_path, encoded)
    }

    /// Apply the gate's decision table for a (non-excluded) path
    pub fn decide(&self, path: &str, authenticated: bool) -> GateDecision {
        let public = self.is_public(path);
        let decision = match (authenticated, public) {
            (false, false) => GateDecision::RedirectToLogin {
                location: self.login_redirect_location(path),
            },
            (false, true) => GateDecision::Allow,
            (true, true) if path == self.gate.login_path => GateDecision::RedirectToLanding {
                location: self.gate.landing_path.clone(),
            },
            (true, _) => GateDecision::Allow,
        };
        debug!(path, authenticated, public, ?decision, "Gate decision");
        decision
    }
}
