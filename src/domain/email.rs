//! Normalized email addresses and the membership domain policy.

use std::fmt;

use serde::Serialize;

use crate::error::ServiceError;

/// Maximum accepted length of an email address (RFC 5321 path limit).
const MAX_EMAIL_LEN: usize = 254;

/// A syntactically valid, lower-cased email address.
///
/// Normalization happens once at construction so that lookups, uniqueness
/// and the domain check all agree on the same spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parses and normalizes a raw email string.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidRequest`] if the address is empty, too
    /// long, or not of the form `local@domain`.
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        let normalized = raw.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(ServiceError::InvalidRequest("email is required".to_string()));
        }
        if normalized.len() > MAX_EMAIL_LEN {
            return Err(ServiceError::InvalidRequest("email is too long".to_string()));
        }
        let Some((local, domain)) = normalized.split_once('@') else {
            return Err(ServiceError::InvalidRequest(format!(
                "malformed email: {normalized}"
            )));
        };
        if local.is_empty()
            || domain.is_empty()
            || domain.contains('@')
            || !domain.contains('.')
            || domain.starts_with('.')
            || domain.ends_with('.')
            || normalized.chars().any(char::is_whitespace)
        {
            return Err(ServiceError::InvalidRequest(format!(
                "malformed email: {normalized}"
            )));
        }
        Ok(Self(normalized))
    }

    /// Wraps an address read back from storage, which was normalized on the
    /// way in.
    #[must_use]
    pub(crate) const fn from_normalized(normalized: String) -> Self {
        Self(normalized)
    }

    /// Returns the part after the `@`.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map_or("", |(_, domain)| domain)
    }

    /// Returns the normalized address.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The set of email domains whose owners may join the community.
///
/// Matching is exact on the normalized domain; subdomains of an allowed
/// domain are not implicitly accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedDomains(Vec<String>);

impl AllowedDomains {
    /// Builds the policy from a list of domains, normalizing each entry and
    /// dropping blanks.
    #[must_use]
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list: Vec<String> = domains
            .into_iter()
            .map(|d| d.as_ref().trim().trim_start_matches('@').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        list.sort();
        list.dedup();
        Self(list)
    }

    /// Parses a comma-separated list such as `"uni.example, staff.uni.example"`.
    #[must_use]
    pub fn from_csv(csv: &str) -> Self {
        Self::new(csv.split(','))
    }

    /// Returns `true` if no domain is allowed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the allowed domains in sorted order.
    #[must_use]
    pub fn domains(&self) -> &[String] {
        &self.0
    }

    /// Checks the email against the policy.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::DomainRejected`] if the email's domain is not
    /// in the allowed set.
    pub fn check(&self, email: &EmailAddress) -> Result<(), ServiceError> {
        let domain = email.domain();
        if self.0.iter().any(|allowed| allowed == domain) {
            Ok(())
        } else {
            Err(ServiceError::DomainRejected(domain.to_string()))
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        let Ok(email) = EmailAddress::parse("  Alice@Allowed.Example ") else {
            panic!("valid email rejected");
        };
        assert_eq!(email.as_str(), "alice@allowed.example");
        assert_eq!(email.domain(), "allowed.example");
    }

    #[test]
    fn parse_rejects_malformed_input() {
        for raw in ["", "   ", "no-at-sign", "@allowed.example", "a@", "a@b@c.example", "a@nodot", "a b@x.example"] {
            assert!(
                matches!(EmailAddress::parse(raw), Err(ServiceError::InvalidRequest(_))),
                "accepted {raw:?}"
            );
        }
    }

    #[test]
    fn allowed_domains_match_exactly() {
        let policy = AllowedDomains::from_csv("allowed.example, @Staff.Example,,");
        assert_eq!(policy.domains(), ["allowed.example", "staff.example"]);

        let Ok(member) = EmailAddress::parse("a@allowed.example") else {
            panic!("valid email rejected");
        };
        assert!(policy.check(&member).is_ok());

        let Ok(sub) = EmailAddress::parse("a@mail.allowed.example") else {
            panic!("valid email rejected");
        };
        assert!(matches!(
            policy.check(&sub),
            Err(ServiceError::DomainRejected(d)) if d == "mail.allowed.example"
        ));
    }

    #[test]
    fn empty_policy_rejects_everyone() {
        let policy = AllowedDomains::from_csv(" , ");
        assert!(policy.is_empty());
        let Ok(email) = EmailAddress::parse("a@allowed.example") else {
            panic!("valid email rejected");
        };
        assert!(policy.check(&email).is_err());
    }
}
