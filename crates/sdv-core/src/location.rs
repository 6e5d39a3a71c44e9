//! Simplified location (URL) parser
//!
//! Understands locations with a `"://"` behind the scheme, such as
//! `"http://somehost:1234/somePath"`, and also scheme-less forms like
//! `"//127.0.0.1:42"` or `"localhost:123"`. It does not understand URLs of
//! the `"mailto:someone@somewhere.io"` kind; those come back unchanged as
//! the network location.
//!
//! Only the scheme and the network location ("login" part) are extracted.
//! Parsing never fails: missing components are empty strings.

use std::fmt;

const SCHEME_SEPARATOR: &str = "://";
const SCHEME_PART_START: &str = "//";

/// Scheme and network location of a parsed location string
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LocationResult {
    scheme: String,
    network_location: String,
}

impl LocationResult {
    /// Parse `input` into scheme and network location.
    pub fn parse(input: &str) -> Self {
        let (scheme, search_from) = match input.find(SCHEME_SEPARATOR) {
            Some(idx) => (input[..idx].to_lowercase(), idx),
            None => (String::new(), 0),
        };

        let start = input[search_from..]
            .find(SCHEME_PART_START)
            .map(|idx| search_from + idx + SCHEME_PART_START.len())
            .unwrap_or(0);

        let end = input[start..]
            .find('/')
            .map(|idx| start + idx)
            .unwrap_or(input.len());

        Self {
            scheme,
            network_location: input[start..end].to_string(),
        }
    }

    /// Lower-cased scheme, empty if the input had none
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The part between the leading double slashes and the next slash.
    ///
    /// For `"http://user:pw@host:1234/path"` this is `"user:pw@host:1234"`.
    pub fn network_location(&self) -> &str {
        &self.network_location
    }
}

impl fmt::Display for LocationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scheme.is_empty() {
            write!(f, "{}", self.network_location)
        } else {
            write!(f, "{}://{}", self.scheme, self.network_location)
        }
    }
}
