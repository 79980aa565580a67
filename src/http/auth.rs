//! HTTP `Basic`/`Digest` authentication and the in-memory user store with
//! its htdigest-style file loader, including the nonce-freshness window
//! and the dual-HA2 accommodation for clients that disagree about whether
//! the query string belongs in the signed URI.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use md5::{Digest, Md5};

/// Ordered access groups: `anyone < user < power < admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UserGroup {
    Anyone,
    User,
    Power,
    Admin,
}

impl UserGroup {
    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            1 => Some(UserGroup::User),
            2 => Some(UserGroup::Power),
            3 => Some(UserGroup::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Basic,
    Digest,
}

fn md5_hex(input: &str) -> String {
    let digest = Md5::digest(input.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// `MD5_hex(user ":" domain ":" password)`.
pub fn digest_ha1(user: &str, domain: &str, password: &str) -> String {
    md5_hex(&format!("{user}:{domain}:{password}"))
}

struct UserRecord {
    ha1_hex: String,
    group: UserGroup,
}

/// `name -> (ha1, group)`. Loads are additive over the existing
/// in-memory contents.
pub struct UserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl UserStore {
    pub fn new() -> Self {
        UserStore {
            users: RwLock::new(HashMap::new()),
        }
    }

    pub fn add_user(&self, name: &str, ha1_hex: &str, group: UserGroup) {
        self.users.write().unwrap().insert(
            name.to_string(),
            UserRecord {
                ha1_hex: ha1_hex.to_string(),
                group,
            },
        );
    }

    pub fn remove_user(&self, name: &str) {
        self.users.write().unwrap().remove(name);
    }

    pub fn clear_users(&self) {
        self.users.write().unwrap().clear();
    }

    pub fn lookup(&self, name: &str) -> Option<(String, UserGroup)> {
        self.users
            .read()
            .unwrap()
            .get(name)
            .map(|r| (r.ha1_hex.clone(), r.group))
    }

    /// Load `name:domain:ha1[:group]` lines, admitting only those whose
    /// `domain` matches `active_domain`. Any line that doesn't parse into
    /// exactly 3 or 4 colon-separated fields or whose HA1
    /// is not exactly 32 hex characters is skipped. Returns the count of
    /// users admitted.
    pub fn load_from_file(&self, contents: &str, active_domain: &str) -> usize {
        let mut loaded = 0usize;
        for raw_line in contents.lines() {
            let line = raw_line.trim_end();
            if line.is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split(':').collect();
            let (name, domain, ha1, group_digit) = match parts.as_slice() {
                [name, domain, ha1] => (*name, *domain, *ha1, None),
                [name, domain, ha1, group] => (*name, *domain, *ha1, Some(*group)),
                _ => continue,
            };
            if domain != active_domain {
                continue;
            }
            if ha1.len() != 32 || !ha1.chars().all(|c| c.is_ascii_hexdigit()) {
                continue;
            }
            let group = match group_digit {
                Some(digit_str) => match digit_str.parse::<u8>().ok().and_then(UserGroup::from_digit) {
                    Some(g) => g,
                    None => continue,
                },
                None if name == "admin" => UserGroup::Admin,
                None => UserGroup::User,
            };
            self.add_user(name, ha1, group);
            loaded += 1;
        }
        loaded
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

/// `WWW-Authenticate` challenge value for the configured scheme.
pub fn challenge_header(scheme: AuthScheme, domain: &str) -> String {
    match scheme {
        AuthScheme::Basic => format!(r#"Basic realm="{domain}""#),
        AuthScheme::Digest => {
            let nonce = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or(Duration::ZERO)
                .as_secs();
            format!(r#"Digest qop="auth", realm="{domain}", nonce="{nonce:x}""#)
        }
    }
}

/// Verify a `Basic` `Authorization` header value (without the `Basic `
/// prefix already stripped by the caller) and return the authenticated
/// user's group.
pub fn check_basic(credentials_b64: &str, domain: &str, store: &UserStore) -> Option<UserGroup> {
    use base64::Engine;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(credentials_b64)
        .ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (user, password) = text.split_once(':')?;
    let expected_ha1 = digest_ha1(user, domain, password);
    let (stored_ha1, group) = store.lookup(user)?;
    if stored_ha1 == expected_ha1 {
        Some(group)
    } else {
        None
    }
}

/// Parse a `Digest ...` header's comma-separated `key=value` parameters
/// (quoted or bare) into a map.
fn parse_digest_params(value: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for part in value.split(',') {
        let part = part.trim();
        if let Some((key, raw_value)) = part.split_once('=') {
            let key = key.trim();
            let val = raw_value.trim().trim_matches('"');
            params.insert(key.to_string(), val.to_string());
        }
    }
    params
}

/// Verify a `Digest` `Authorization` header (value with the `Digest `
/// prefix already stripped) against the request's method, path, and
/// optional query string.
pub fn check_digest(
    header_value: &str,
    method: &str,
    path: &str,
    query: Option<&str>,
    store: &UserStore,
) -> Option<UserGroup> {
    let params = parse_digest_params(header_value);
    let username = params.get("username")?;
    let cnonce = params.get("cnonce")?;
    let response = params.get("response")?;
    let qop = params.get("qop")?;
    let nc = params.get("nc")?;
    let nonce = params.get("nonce")?;
    // `uri` is required by the protocol but the server recomputes its own
    // candidate digest URIs below rather than trusting the header's copy.
    params.get("uri")?;

    let nonce_value: u64 = u64::from_str_radix(nonce, 16).ok()?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()?
        .as_secs();
    if now < nonce_value || now - nonce_value >= 3600 {
        return None;
    }

    let (ha1, group) = store.lookup(username)?;

    let mut candidates = vec![path.to_string()];
    if let Some(q) = query {
        candidates.push(format!("{path}?{q}"));
    }

    for digest_uri in candidates {
        let ha2 = md5_hex(&format!("{method}:{digest_uri}"));
        let expected = md5_hex(&format!(
            "{ha1}:{nonce}:{nc}:{cnonce}:{qop}:{ha2}"
        ));
        if &expected == response {
            return Some(group);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_ha1_is_deterministic_and_32_hex_chars() {
        let a = digest_ha1("alice", "cam2web", "hunter2");
        let b = digest_ha1("alice", "cam2web", "hunter2");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn load_from_file_admits_matching_domain_only() {
        let store = UserStore::new();
        let ha1 = digest_ha1("alice", "cam2web", "hunter2");
        let contents = format!(
            "alice:cam2web:{ha1}:3\nbob:otherdomain:{ha1}:1\n"
        );
        let loaded = store.load_from_file(&contents, "cam2web");
        assert_eq!(loaded, 1);
        assert!(store.lookup("alice").is_some());
        assert!(store.lookup("bob").is_none());
    }

    #[test]
    fn load_from_file_defaults_admin_username_to_admin_group() {
        let store = UserStore::new();
        let ha1 = digest_ha1("admin", "cam2web", "pw");
        store.load_from_file(&format!("admin:cam2web:{ha1}\n"), "cam2web");
        let (_, group) = store.lookup("admin").unwrap();
        assert_eq!(group, UserGroup::Admin);
    }

    #[test]
    fn load_from_file_defaults_other_usernames_to_user_group() {
        let store = UserStore::new();
        let ha1 = digest_ha1("bob", "cam2web", "pw");
        store.load_from_file(&format!("bob:cam2web:{ha1}\n"), "cam2web");
        let (_, group) = store.lookup("bob").unwrap();
        assert_eq!(group, UserGroup::User);
    }

    #[test]
    fn load_from_file_rejects_bad_ha1_length() {
        let store = UserStore::new();
        let loaded = store.load_from_file("alice:cam2web:not32chars\n", "cam2web");
        assert_eq!(loaded, 0);
    }

    #[test]
    fn load_from_file_rejects_names_containing_colon() {
        let store = UserStore::new();
        let ha1 = digest_ha1("weird", "cam2web", "pw");
        // "a:li:ce" splits into 5 fields, never matching the 3/4 shape.
        let loaded = store.load_from_file(&format!("a:li:ce:cam2web:{ha1}\n"), "cam2web");
        assert_eq!(loaded, 0);
    }

    #[test]
    fn check_basic_accepts_correct_credentials() {
        use base64::Engine;
        let store = UserStore::new();
        let ha1 = digest_ha1("alice", "cam2web", "hunter2");
        store.add_user("alice", &ha1, UserGroup::Power);
        let encoded = base64::engine::general_purpose::STANDARD.encode("alice:hunter2");
        assert_eq!(
            check_basic(&encoded, "cam2web", &store),
            Some(UserGroup::Power)
        );
    }

    #[test]
    fn check_basic_rejects_wrong_password() {
        use base64::Engine;
        let store = UserStore::new();
        let ha1 = digest_ha1("alice", "cam2web", "hunter2");
        store.add_user("alice", &ha1, UserGroup::Power);
        let encoded = base64::engine::general_purpose::STANDARD.encode("alice:wrong");
        assert_eq!(check_basic(&encoded, "cam2web", &store), None);
    }

    #[test]
    fn check_digest_accepts_matching_response() {
        let store = UserStore::new();
        let ha1 = digest_ha1("alice", "cam2web", "hunter2");
        store.add_user("alice", &ha1, UserGroup::Admin);

        let nonce = format!("{:x}", SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs());
        let nc = "00000001";
        let cnonce = "abc123";
        let qop = "auth";
        let method = "GET";
        let path = "/camera/config";
        let ha2 = md5_hex(&format!("{method}:{path}"));
        let response = md5_hex(&format!("{ha1}:{nonce}:{nc}:{cnonce}:{qop}:{ha2}"));

        let header = format!(
            r#"username="alice", realm="cam2web", nonce="{nonce}", uri="{path}", qop={qop}, nc={nc}, cnonce="{cnonce}", response="{response}""#
        );
        assert_eq!(
            check_digest(&header, method, path, None, &store),
            Some(UserGroup::Admin)
        );
    }

    #[test]
    fn check_digest_rejects_stale_nonce() {
        let store = UserStore::new();
        let ha1 = digest_ha1("alice", "cam2web", "hunter2");
        store.add_user("alice", &ha1, UserGroup::Admin);
        let stale_nonce = format!(
            "{:x}",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs()
                .saturating_sub(7200)
        );
        let header = format!(
            r#"username="alice", nonce="{stale_nonce}", uri="/x", qop=auth, nc=1, cnonce="c", response="deadbeef""#
        );
        assert_eq!(check_digest(&header, "GET", "/x", None, &store), None);
    }
}
