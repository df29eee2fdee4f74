use chains_api::BusError;

#[derive(Debug, thiserror::Error)]
pub enum TopicError {
    #[error("topic '{0}' not found")]
    NotFound(String),

    #[error("no driver registered for scheme '{0}'")]
    NoDriver(String),

    #[error("url '{url}' is not served by the {expected} driver")]
    WrongScheme { url: String, expected: &'static str },

    #[error("{0} already shut down")]
    Closed(&'static str),
}

impl TopicError {
    /// Convert to BusError with the matching ErrorKind.
    ///
    /// `NotFound` → NotFound kind, `NoDriver`/`WrongScheme` → Config,
    /// `Closed` → Closed.
    pub fn into_bus_error(self) -> BusError {
        let msg = self.to_string();
        match self {
            TopicError::NotFound(_) => BusError::not_found(msg),
            TopicError::NoDriver(_) | TopicError::WrongScheme { .. } => BusError::config(msg),
            TopicError::Closed(_) => BusError::closed(msg),
        }
    }
}

impl From<TopicError> for BusError {
    fn from(e: TopicError) -> Self {
        e.into_bus_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chains_api::ErrorKind;

    #[test]
    fn kinds_are_preserved() {
        assert_eq!(TopicError::NotFound("t".into()).into_bus_error().kind(), ErrorKind::NotFound);
        assert_eq!(TopicError::NoDriver("nats".into()).into_bus_error().kind(), ErrorKind::Config);
        let closed = TopicError::Closed("topic handle").into_bus_error();
        assert_eq!(closed.kind(), ErrorKind::Closed);
        assert_eq!(closed.message(), "topic handle already shut down");
    }
}
