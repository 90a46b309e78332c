//! A computed value paired with the diagnostics collected while computing it.

use crate::diagnostic::Diagnostic;

/// The return shape of every fallible pipeline stage.
///
/// Stages never abort on routine problems; they produce a best-effort value
/// and report what went wrong alongside it. [`and_then`](Self::and_then)
/// chains stages while concatenating their diagnostics in order.
///
/// # Example
///
/// ```
/// use cobol_lsp_core::{Diagnostic, ErrorKind, Locality, Position, ResultWithErrors};
///
/// let at = Locality::point("main", Position::new(1, 1));
/// let first = ResultWithErrors::new(2, vec![Diagnostic::error(ErrorKind::SyntaxError, "a", at.clone())]);
/// let chained = first.and_then(|n| {
///     ResultWithErrors::new(n * 10, vec![Diagnostic::error(ErrorKind::SemanticError, "b", at)])
/// });
///
/// assert_eq!(chained.result, 20);
/// assert_eq!(chained.errors.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultWithErrors<T> {
    /// The computed value.
    pub result: T,
    /// Diagnostics in the order they were produced.
    pub errors: Vec<Diagnostic>,
}

impl<T> ResultWithErrors<T> {
    /// Pair a value with diagnostics.
    pub fn new(result: T, errors: Vec<Diagnostic>) -> Self {
        Self { result, errors }
    }

    /// A value with no diagnostics.
    pub fn of(result: T) -> Self {
        Self::new(result, Vec::new())
    }

    /// Transform the value, keeping the diagnostics.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResultWithErrors<U> {
        ResultWithErrors::new(f(self.result), self.errors)
    }

    /// Feed the value into the next stage and concatenate diagnostics.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> ResultWithErrors<U>) -> ResultWithErrors<U> {
        let mut errors = self.errors;
        let next = f(self.result);
        errors.extend(next.errors);
        ResultWithErrors::new(next.result, errors)
    }

    /// Move the diagnostics into `sink` and return the value.
    pub fn accumulate_errors(self, sink: &mut Vec<Diagnostic>) -> T {
        sink.extend(self.errors);
        self.result
    }

    /// Append one more diagnostic.
    pub fn with_error(mut self, error: Diagnostic) -> Self {
        self.errors.push(error);
        self
    }

    /// Whether any diagnostic of error severity was recorded.
    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(Diagnostic::is_error)
    }

    /// Split into the value and its diagnostics.
    pub fn into_parts(self) -> (T, Vec<Diagnostic>) {
        (self.result, self.errors)
    }
}

impl<T> FromIterator<ResultWithErrors<T>> for ResultWithErrors<Vec<T>> {
    fn from_iter<I: IntoIterator<Item = ResultWithErrors<T>>>(iter: I) -> Self {
        let mut values = Vec::new();
        let mut errors = Vec::new();
        for item in iter {
            values.push(item.accumulate_errors(&mut errors));
        }
        ResultWithErrors::new(values, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::ErrorKind;
    use crate::locality::{Locality, Position};

    fn diag(msg: &str) -> Diagnostic {
        Diagnostic::warning(
            ErrorKind::SyntaxError,
            msg,
            Locality::point("main", Position::new(1, 1)),
        )
    }

    #[test]
    fn test_of_has_no_errors() {
        let r = ResultWithErrors::of("x");
        assert!(r.errors.is_empty());
        assert!(!r.has_errors());
    }

    #[test]
    fn test_map_keeps_errors() {
        let r = ResultWithErrors::new(1, vec![diag("a")]).map(|n| n + 1);
        assert_eq!(r.result, 2);
        assert_eq!(r.errors.len(), 1);
    }

    #[test]
    fn test_and_then_concatenates_in_order() {
        let r = ResultWithErrors::new(1, vec![diag("first")])
            .and_then(|n| ResultWithErrors::new(n, vec![diag("second")]));
        let messages: Vec<_> = r.errors.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[test]
    fn test_accumulate_errors() {
        let mut sink = vec![diag("existing")];
        let value = ResultWithErrors::new("v", vec![diag("new")]).accumulate_errors(&mut sink);
        assert_eq!(value, "v");
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_has_errors_ignores_warnings() {
        let r = ResultWithErrors::new((), vec![diag("only a warning")]);
        assert!(!r.has_errors());
    }

    #[test]
    fn test_collect() {
        let collected: ResultWithErrors<Vec<i32>> = vec![
            ResultWithErrors::new(1, vec![diag("a")]),
            ResultWithErrors::of(2),
            ResultWithErrors::new(3, vec![diag("b")]),
        ]
        .into_iter()
        .collect();
        assert_eq!(collected.result, vec![1, 2, 3]);
        assert_eq!(collected.errors.len(), 2);
    }
}
