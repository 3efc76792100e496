//! Request-scoped cookie jar for the session tokens.
//!
//! The jar is built from the inbound `Cookie` header. Mutations are recorded so they can be
//! mirrored both ways: onto the inbound request, so downstream handlers see the current tokens,
//! and onto the outbound response as `Set-Cookie` headers.

use axum::http::{HeaderMap, HeaderValue, header};
use std::time::Duration;
use tracing::warn;

use crate::config::IdentityConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
enum CookieChange {
    Set { name: String, value: String },
    Remove { name: String },
}

#[derive(Debug, Clone)]
pub struct SessionCookies {
    config: IdentityConfig,
    values: Vec<(String, String)>,
    changes: Vec<CookieChange>,
}

impl SessionCookies {
    /// Parse every `Cookie` header on the request. Malformed pairs are skipped.
    pub fn from_headers(headers: &HeaderMap, config: &IdentityConfig) -> Self {
        let mut values = Vec::new();
        for cookie_header in headers.get_all(header::COOKIE) {
            let Ok(cookie_str) = cookie_header.to_str() else {
                continue;
            };
            for cookie in cookie_str.split(';') {
                if let Some((name, value)) = cookie.trim().split_once('=') {
                    let name = name.trim();
                    if !name.is_empty() {
                        values.push((name.to_string(), value.trim().to_string()));
                    }
                }
            }
        }

        Self {
            config: config.clone(),
            values,
            changes: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.values.retain(|(n, _)| n != name);
        self.values.push((name.to_string(), value.to_string()));
        self.changes.retain(|c| !c.is_for(name));
        self.changes.push(CookieChange::Set {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    pub fn remove(&mut self, name: &str) {
        self.values.retain(|(n, _)| n != name);
        self.changes.retain(|c| !c.is_for(name));
        self.changes.push(CookieChange::Remove { name: name.to_string() });
    }

    pub fn access_token(&self) -> Option<&str> {
        self.get(&self.config.cookies.access_token_name)
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.get(&self.config.cookies.refresh_token_name)
    }

    pub fn code_verifier(&self) -> Option<&str> {
        self.get(&self.config.cookies.code_verifier_name)
    }

    pub fn set_session(&mut self, access_token: &str, refresh_token: &str) {
        let names = self.config.cookies.clone();
        self.set(&names.access_token_name, access_token);
        self.set(&names.refresh_token_name, refresh_token);
    }

    pub fn clear_session(&mut self) {
        let names = self.config.cookies.clone();
        self.remove(&names.access_token_name);
        self.remove(&names.refresh_token_name);
    }

    pub fn clear_code_verifier(&mut self) {
        let name = self.config.cookies.code_verifier_name.clone();
        self.remove(&name);
    }

    pub fn is_modified(&self) -> bool {
        !self.changes.is_empty()
    }

    /// The current jar contents in `Cookie` header form
    pub fn cookie_header(&self) -> String {
        self.values
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// `Set-Cookie` values for every recorded mutation, in order
    pub fn set_cookie_values(&self) -> Vec<String> {
        self.changes
            .iter()
            .map(|change| match change {
                CookieChange::Set { name, value } => self.format_cookie(name, value, self.config.session_max_age),
                CookieChange::Remove { name } => self.format_cookie(name, "", Duration::ZERO),
            })
            .collect()
    }

    fn format_cookie(&self, name: &str, value: &str, max_age: Duration) -> String {
        let cookies = &self.config.cookies;
        let secure = if cookies.secure { "; Secure" } else { "" };
        format!(
            "{name}={value}; Path=/; HttpOnly; SameSite={}; Max-Age={}{secure}",
            cookies.same_site.as_str(),
            max_age.as_secs()
        )
    }

    /// Rewrite the request's `Cookie` header to the jar contents, if anything changed
    pub fn apply_to_request(&self, headers: &mut HeaderMap) {
        if !self.is_modified() {
            return;
        }
        headers.remove(header::COOKIE);
        let cookie_header = self.cookie_header();
        if cookie_header.is_empty() {
            return;
        }
        match HeaderValue::from_str(&cookie_header) {
            Ok(value) => {
                headers.insert(header::COOKIE, value);
            }
            Err(e) => warn!("Dropping unrepresentable cookie header: {}", e),
        }
    }

    /// Append a `Set-Cookie` header per recorded mutation.
    ///
    /// Cookies the response already sets are left alone, so a handler's own cookie decisions win
    /// over changes recorded earlier in the request.
    pub fn apply_to_response(&self, headers: &mut HeaderMap) {
        let already_set: Vec<String> = headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split_once('=').map(|(name, _)| name.trim().to_string()))
            .collect();

        for (change, cookie) in self.changes.iter().zip(self.set_cookie_values()) {
            if already_set.iter().any(|name| change.is_for(name)) {
                continue;
            }
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    headers.append(header::SET_COOKIE, value);
                }
                Err(e) => warn!("Dropping unrepresentable Set-Cookie header: {}", e),
            }
        }
    }
}

impl CookieChange {
    fn is_for(&self, cookie: &str) -> bool {
        match self {
            CookieChange::Set { name, .. } | CookieChange::Remove { name } => name == cookie,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SameSite;

    fn config() -> IdentityConfig {
        let mut config = IdentityConfig::default();
        config.session_max_age = Duration::from_secs(3600);
        config
    }

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_parses_session_cookies() {
        let jar = SessionCookies::from_headers(
            &headers("theme=dark; sb-access-token=a1;sb-refresh-token=r1; broken"),
            &config(),
        );
        assert_eq!(jar.access_token(), Some("a1"));
        assert_eq!(jar.refresh_token(), Some("r1"));
        assert_eq!(jar.get("theme"), Some("dark"));
        assert_eq!(jar.code_verifier(), None);
        assert!(!jar.is_modified());
    }

    #[test]
    fn test_empty_value_reads_as_absent() {
        let jar = SessionCookies::from_headers(&headers("sb-access-token="), &config());
        assert_eq!(jar.access_token(), None);
    }

    #[test]
    fn test_multiple_cookie_headers() {
        let mut headers = headers("sb-access-token=a1");
        headers.append(header::COOKIE, HeaderValue::from_static("sb-refresh-token=r1"));
        let jar = SessionCookies::from_headers(&headers, &config());
        assert_eq!(jar.access_token(), Some("a1"));
        assert_eq!(jar.refresh_token(), Some("r1"));
    }

    #[test]
    fn test_set_session_mirrors_both_ways() {
        let mut jar = SessionCookies::from_headers(&headers("theme=dark; sb-access-token=old"), &config());
        jar.set_session("a2", "r2");

        let mut request_headers = headers("theme=dark; sb-access-token=old");
        jar.apply_to_request(&mut request_headers);
        assert_eq!(
            request_headers.get(header::COOKIE).unwrap(),
            "theme=dark; sb-access-token=a2; sb-refresh-token=r2"
        );

        let mut response_headers = HeaderMap::new();
        jar.apply_to_response(&mut response_headers);
        let set_cookies: Vec<_> = response_headers
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(
            set_cookies,
            vec![
                "sb-access-token=a2; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600; Secure",
                "sb-refresh-token=r2; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600; Secure",
            ]
        );
    }

    #[test]
    fn test_clear_session_expires_cookies() {
        let mut config = config();
        config.cookies.secure = false;
        config.cookies.same_site = SameSite::Strict;

        let mut jar = SessionCookies::from_headers(&headers("sb-access-token=a1; sb-refresh-token=r1"), &config);
        jar.clear_session();
        assert_eq!(jar.access_token(), None);

        let values = jar.set_cookie_values();
        assert_eq!(values[0], "sb-access-token=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0");
        assert_eq!(values[1], "sb-refresh-token=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0");

        let mut request_headers = headers("sb-access-token=a1; sb-refresh-token=r1");
        jar.apply_to_request(&mut request_headers);
        assert!(request_headers.get(header::COOKIE).is_none());
    }

    #[test]
    fn test_last_change_per_cookie_wins() {
        let mut jar = SessionCookies::from_headers(&HeaderMap::new(), &config());
        jar.set_session("a1", "r1");
        jar.clear_session();
        assert_eq!(jar.set_cookie_values().len(), 2);
        assert!(jar.set_cookie_values().iter().all(|c| c.contains("Max-Age=0")));
    }

    #[test]
    fn test_response_cookies_set_by_handler_win() {
        let mut jar = SessionCookies::from_headers(&HeaderMap::new(), &config());
        jar.set_session("a2", "r2");

        let mut response_headers = HeaderMap::new();
        response_headers.append(
            header::SET_COOKIE,
            HeaderValue::from_static("sb-access-token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
        );
        jar.apply_to_response(&mut response_headers);

        let set_cookies: Vec<_> = response_headers
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(set_cookies.len(), 2);
        assert!(set_cookies[0].contains("Max-Age=0"));
        assert!(set_cookies[1].starts_with("sb-refresh-token=r2;"));
    }

    #[test]
    fn test_unmodified_jar_leaves_request_alone() {
        let jar = SessionCookies::from_headers(&headers("sb-access-token=a1"), &config());
        let mut request_headers = headers("sb-access-token=a1");
        jar.apply_to_request(&mut request_headers);
        assert_eq!(request_headers.get(header::COOKIE).unwrap(), "sb-access-token=a1");

        let mut response_headers = HeaderMap::new();
        jar.apply_to_response(&mut response_headers);
        assert!(response_headers.is_empty());
    }
}
