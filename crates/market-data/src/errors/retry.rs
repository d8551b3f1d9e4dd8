/// Classification for retry policy.
///
/// Used by the fetch client to decide whether another attempt is worth making.
///
/// | Class | Consumes an attempt? | Waits before retrying? |
/// |-------|----------------------|------------------------|
/// | `Never` | No further attempts | No |
/// | `WithBackoff` | Yes | Fixed backoff |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - hard API error, malformed payload or invalid request.
    /// The same request would fail the same way again.
    Never,

    /// Retry after the configured backoff while attempts remain.
    ///
    /// Used for in-band rate-limit notes and transport failures. Each retry
    /// consumes one attempt of the shared budget.
    WithBackoff,
}
