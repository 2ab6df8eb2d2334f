/// HTTP forwarding proxy used to get around cross-origin restrictions.
#[derive(Debug, Clone, PartialEq)]
pub struct Proxy {
    base: String,
}

impl Proxy {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn wrap(&self, url: &str) -> String {
        format!("{}{}", self.base, urlencoding::encode(url))
    }

    pub fn is_wrapped(&self, url: &str) -> bool {
        url.starts_with(&self.base)
    }
}
