//! Ordered-candidate selection, independent of any network call.

/// Run `attempt` over `candidates` in order and return the first success.
///
/// On total failure the last error is returned, or `None` when there were
/// no candidates at all.
pub fn first_success<C, T, E, F>(
    candidates: impl IntoIterator<Item = C>,
    mut attempt: F,
) -> Result<T, Option<E>>
where
    F: FnMut(C) -> Result<T, E>,
{
    let mut last_error = None;
    for candidate in candidates {
        match attempt(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = Some(e),
        }
    }
    Err(last_error)
}

/// Preferred names that the directory reports, in preference order.
pub fn preferred_in_directory<'a>(
    preferred: &'a [String],
    directory: &'a [String],
) -> impl Iterator<Item = &'a str> + 'a {
    preferred
        .iter()
        .filter(move |name| directory.iter().any(|d| d == *name))
        .map(String::as_str)
}
