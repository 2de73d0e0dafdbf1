//! Delimited list columns: a sequence of scalars packed into one cell.
//!
//! No escaping is performed. An element whose text contains the delimiter cannot be told apart
//! from an element boundary on decode, so [`find_collision`] lets the encoder reject such lists
//! up front. A list holding one empty or null element encodes to the empty string, which decodes
//! as the empty list; [`is_lone_empty`] flags that case.

use itertools::Itertools;

/// Joins element texts with `delimiter`; a null element becomes an empty segment and an empty
/// sequence becomes the empty string.
pub fn encode<'a, I>(elements: I, delimiter: &str) -> String
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    elements
        .into_iter()
        .map(|element| element.unwrap_or(""))
        .join(delimiter)
}

/// Splits a cell on `delimiter`, preserving empty segments. The empty string decodes to an
/// empty sequence.
pub fn decode<'a>(text: &'a str, delimiter: &str) -> Vec<&'a str> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split(delimiter).collect()
}

/// Index of the first element whose text contains `delimiter`.
pub fn find_collision<'a, I>(elements: I, delimiter: &str) -> Option<usize>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    elements
        .into_iter()
        .position(|element| element.is_some_and(|text| text.contains(delimiter)))
}

/// True when the sequence is exactly one empty or null element.
pub fn is_lone_empty<'a, I>(elements: I) -> bool
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut elements = elements.into_iter();
    matches!(
        (elements.next(), elements.next()),
        (Some(None | Some("")), None)
    )
}
