/// Classification for the orchestrator's failure policy.
///
/// # Behavior Summary
///
/// | Class | Retried? | Effect on the run |
/// |-------|----------|-------------------|
/// | `Format` | No | Surfaced immediately as a stream error |
/// | `Transient` | Yes, with backoff | Counted as a per-item failure if retries are exhausted |
/// | `Permanent` | No | Aborts the listing phase; tallied in the per-item phase |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FetchClass {
    /// The symbol does not match the provider's convention.
    /// A caller error: never retried, never cached.
    Format,

    /// Timeout, rate limit or 5xx. Worth a small fixed number of retries
    /// with backoff before giving up on the item.
    Transient,

    /// Not found, unsupported or unparseable. Retrying won't help.
    Permanent,
}
