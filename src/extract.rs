/// A trait to extract required information from a request in order to resolve the client address
pub trait RequestInformation {
    /// Get the values of a header, `name` is always lowercase
    ///
    /// A double-ended iterator is returned to allow the implementation to optimize the iteration in
    /// case of multiple values
    fn header_values(&self, name: &str) -> impl DoubleEndedIterator<Item = &str>;

    /// Get the client address reported by the proxy in the given header
    ///
    /// Proxies are expected to send a single value, if the header is repeated the last one wins
    /// as it is the one added by the closest proxy.
    fn client_ip_header(&self, name: &str) -> Option<&str> {
        self.header_values(name)
            .map(|value| value.trim())
            .next_back()
    }
}

#[cfg(feature = "http")]
mod http {
    use super::RequestInformation;

    impl<T> RequestInformation for http::Request<T> {
        fn header_values(&self, name: &str) -> impl DoubleEndedIterator<Item = &str> {
            self.headers()
                .get_all(name)
                .iter()
                .filter_map(|value| value.to_str().ok())
        }
    }

    impl RequestInformation for http::request::Parts {
        fn header_values(&self, name: &str) -> impl DoubleEndedIterator<Item = &str> {
            self.headers
                .get_all(name)
                .iter()
                .filter_map(|value| value.to_str().ok())
        }
    }

    impl RequestInformation for http::HeaderMap {
        fn header_values(&self, name: &str) -> impl DoubleEndedIterator<Item = &str> {
            self.get_all(name)
                .iter()
                .filter_map(|value| value.to_str().ok())
        }
    }
}
