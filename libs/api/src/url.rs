use crate::BusError;

/// Parsed topic address: `scheme://path[?key=value&...]`.
///
/// The scheme selects the driver; the path and query are interpreted
/// by the driver alone (topic name, project qualifiers, broker lists).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicUrl {
    scheme: String,
    path: String,
    query: Vec<(String, String)>,
}

impl TopicUrl {
    /// Build a URL from parts. Validates the same way `parse` does.
    pub fn new(scheme: impl Into<String>, path: impl Into<String>) -> Result<Self, BusError> {
        let scheme = scheme.into();
        let path = path.into();
        validate_scheme(&scheme)?;
        if path.is_empty() {
            return Err(BusError::config(format!("topic url '{scheme}://' has empty path")));
        }
        Ok(Self { scheme, path, query: Vec::new() })
    }

    /// Append a query parameter. Order is kept as inserted.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn parse(s: &str) -> Result<Self, BusError> {
        let (scheme, rest) = s
            .split_once("://")
            .ok_or_else(|| BusError::config(format!("topic url '{s}' has no scheme")))?;

        let (path, raw_query) = match rest.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (rest, None),
        };

        let mut url = Self::new(scheme, path)?;
        if let Some(raw_query) = raw_query {
            for pair in raw_query.split('&').filter(|p| !p.is_empty()) {
                let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                if k.is_empty() {
                    return Err(BusError::config(format!("topic url '{s}' has empty query key")));
                }
                url.query.push((k.to_string(), v.to_string()));
            }
        }
        Ok(url)
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// First value for a query key.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }
}

fn validate_scheme(scheme: &str) -> Result<(), BusError> {
    let valid = !scheme.is_empty()
        && scheme.starts_with(|c: char| c.is_ascii_lowercase())
        && scheme
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '+' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(BusError::config(format!("invalid topic url scheme '{scheme}'")))
    }
}

impl std::fmt::Display for TopicUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.scheme, self.path)?;
        for (i, (k, v)) in self.query.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{k}={v}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for TopicUrl {
    type Err = BusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn parses_scheme_and_path() {
        let url = TopicUrl::parse("gcppubsub://projects/acme/topics/attestations").unwrap();
        assert_eq!(url.scheme(), "gcppubsub");
        assert_eq!(url.path(), "projects/acme/topics/attestations");
        assert!(url.query().is_empty());
    }

    #[test]
    fn parses_query() {
        let url = TopicUrl::parse("kafka://builds?brokers=a:9092,b:9092").unwrap();
        assert_eq!(url.path(), "builds");
        assert_eq!(url.query_param("brokers"), Some("a:9092,b:9092"));
        assert_eq!(url.to_string(), "kafka://builds?brokers=a:9092,b:9092");
    }

    #[test]
    fn rejects_missing_scheme() {
        let err = TopicUrl::parse("builds").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn rejects_bad_scheme_and_empty_path() {
        assert!(TopicUrl::parse("Mem://test").is_err());
        assert!(TopicUrl::parse("://test").is_err());
        assert!(TopicUrl::parse("mem://").is_err());
        assert!(TopicUrl::parse("mem://t?=x").is_err());
    }
}
