//! Headless rendering of field values according to their render strategy.
use crate::schema::RenderStrategy;
use std::borrow::Cow;

/// Maximum characters shown for ellipsis text inside a list cell.
///
/// Headless stand-in for the fixed 200px cell width used by the admin UI.
pub const ELLIPSIS_MAX_CHARS: usize = 32;
const ELLIPSIS: char = '…';

/// Where a value is being displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayContext {
    /// A cell in a resource list view.
    ListCell,
    /// The show or edit view of a single record.
    Detail,
}

impl RenderStrategy {
    /// Format `value` for display. Ellipsis text only truncates inside list cells.
    pub fn display<'a>(
        &self,
        value: &'a str,
        field_name: &str,
        context: DisplayContext,
    ) -> Cow<'a, str> {
        let shown = match (self, context) {
            (RenderStrategy::EllipsisText, DisplayContext::ListCell) => {
                ellipsize(&flatten_lines(value), ELLIPSIS_MAX_CHARS)
            }
            (RenderStrategy::Plain, _) => flatten_lines(value),
            _ => Cow::Borrowed(value),
        };
        tracing::trace!(field = field_name, strategy = self.as_str(), "display value");
        shown
    }
}

fn flatten_lines(value: &str) -> Cow<'_, str> {
    if !value.contains(['\n', '\r']) {
        return Cow::Borrowed(value);
    }
    Cow::Owned(value.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn ellipsize<'a>(value: &Cow<'a, str>, max_chars: usize) -> Cow<'a, str> {
    if value.chars().count() <= max_chars {
        return value.clone();
    }
    let mut truncated: String = value.chars().take(max_chars.saturating_sub(1)).collect();
    truncated.push(ELLIPSIS);
    Cow::Owned(truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ellipsis_text_truncates_only_in_list_cells() {
        let long = "Codex Coloniensis with marginal glosses in several hands";
        let cell = RenderStrategy::EllipsisText.display(long, "title", DisplayContext::ListCell);
        assert_eq!(cell.chars().count(), ELLIPSIS_MAX_CHARS);
        assert!(cell.ends_with(ELLIPSIS));

        let detail = RenderStrategy::EllipsisText.display(long, "title", DisplayContext::Detail);
        assert_eq!(detail, long);
    }

    #[test]
    fn short_values_are_borrowed_unchanged() {
        let shown =
            RenderStrategy::EllipsisText.display("Psalter", "title", DisplayContext::ListCell);
        assert!(matches!(shown, Cow::Borrowed("Psalter")));
    }

    #[test]
    fn multibyte_values_truncate_on_char_boundaries() {
        let value = "ü".repeat(ELLIPSIS_MAX_CHARS * 2);
        let shown = RenderStrategy::EllipsisText.display(&value, "name", DisplayContext::ListCell);
        assert_eq!(shown.chars().count(), ELLIPSIS_MAX_CHARS);
    }

    #[test]
    fn plain_and_ellipsis_flatten_newlines() {
        let value = "first line\nsecond  line";
        assert_eq!(
            RenderStrategy::Plain.display(value, "notes", DisplayContext::Detail),
            "first line second line"
        );
        assert_eq!(
            RenderStrategy::EllipsisText.display(value, "notes", DisplayContext::ListCell),
            "first line second line"
        );
        assert_eq!(
            RenderStrategy::RichText.display(value, "notes", DisplayContext::ListCell),
            value
        );
    }
}
