// Assertions for mock transports and request errors

use crate::mock::MockRequestor;
use strata_core::{ErrorKind, Method, RequestError};

/// Assert that the mock received exactly `expected` calls
pub fn assert_call_count(mock: &MockRequestor, expected: usize) {
    let actual = mock.call_count();
    assert_eq!(
        actual, expected,
        "Expected {} call(s) to reach the transport, got {}",
        expected, actual
    );
}

/// Assert that the calls reached the transport with these URLs, in order
pub fn assert_call_order(mock: &MockRequestor, expected: &[&str]) {
    let actual: Vec<String> = mock.calls().into_iter().map(|c| c.url).collect();
    assert_eq!(actual, expected, "Calls reached the transport out of order");
}

/// Assert that a call was made with the given method and URL
pub fn assert_called_with(mock: &MockRequestor, method: Method, url: &str) {
    let calls = mock.calls();
    assert!(
        calls.iter().any(|c| c.method == method && c.url == url),
        "Expected a {} {} call, got {:?}",
        method,
        url,
        calls
            .iter()
            .map(|c| format!("{} {}", c.method, c.url))
            .collect::<Vec<_>>()
    );
}

/// Assert that an error has the expected kind
pub fn assert_error_kind(error: &RequestError, expected: ErrorKind) {
    assert_eq!(
        error.kind(),
        expected,
        "Expected {} error, got {}: {}",
        expected,
        error.kind(),
        error
    );
}

/// Assert that concurrency never exceeded `limit`
pub fn assert_max_concurrency(mock: &MockRequestor, limit: usize) {
    let peak = mock.peak_concurrency();
    assert!(
        peak <= limit,
        "Expected at most {} concurrent call(s), observed {}",
        limit,
        peak
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{RequestOptions, Requestor};

    #[tokio::test]
    async fn test_call_assertions() {
        let mock = MockRequestor::new();
        mock.get("/a", RequestOptions::new()).await.unwrap();
        mock.delete("/b", RequestOptions::new()).await.unwrap();

        assert_call_count(&mock, 2);
        assert_call_order(&mock, &["/a", "/b"]);
        assert_called_with(&mock, Method::DELETE, "/b");
        assert_max_concurrency(&mock, 1);
    }

    #[test]
    fn test_error_kind() {
        assert_error_kind(&RequestError::http(404, "Not Found"), ErrorKind::Http { status: 404 });
    }

    #[test]
    #[should_panic(expected = "Expected 3 call(s)")]
    fn test_call_count_mismatch_panics() {
        assert_call_count(&MockRequestor::new(), 3);
    }
}
