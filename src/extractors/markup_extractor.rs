//! Attribute-keyed markup queries
//!
//! Uses the scraper crate to partition the elements of one tag by the value
//! of an attribute and to read the text under each partition.

use std::collections::BTreeSet;

use indexmap::IndexSet;
use scraper::{ElementRef, Html, Selector};

use crate::config::TagName;

/// Parsed snapshot of one page.
pub struct MarkupQuery {
    document: Html,
}

impl MarkupQuery {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    /// Distinct values of `attribute` on `tag` elements, in first-seen order.
    ///
    /// `class` is split into its whitespace-separated tokens, so an element
    /// with `class="card price"` contributes both `card` and `price`.
    pub fn find_groups_by_attribute(&self, tag: TagName, attribute: &str) -> Vec<String> {
        let mut values: IndexSet<String> = IndexSet::new();

        for el in self.elements(tag) {
            if is_class(attribute) {
                values.extend(class_tokens(&el).map(String::from));
            } else if let Some(value) = el.value().attr(attribute) {
                values.insert(value.to_string());
            }
        }

        values.into_iter().collect()
    }

    /// Trimmed text of every `tag` element whose `attribute` matches `value`,
    /// in document order.
    pub fn fragments_for_attribute_value(
        &self,
        tag: TagName,
        attribute: &str,
        value: &str,
    ) -> Vec<String> {
        self.elements(tag)
            .into_iter()
            .filter(|el| {
                if is_class(attribute) {
                    class_tokens(el).any(|c| c == value)
                } else {
                    el.value().attr(attribute) == Some(value)
                }
            })
            .map(|el| el.text().collect::<String>().trim().to_string())
            .collect()
    }

    /// Every tag name used in the document.
    pub fn tag_names(&self) -> BTreeSet<String> {
        let selector = match Selector::parse("*") {
            Ok(s) => s,
            Err(_) => return BTreeSet::new(),
        };

        self.document
            .select(&selector)
            .map(|el| el.value().name().to_string())
            .collect()
    }

    fn elements(&self, tag: TagName) -> Vec<ElementRef<'_>> {
        let selector = match Selector::parse(tag.as_str()) {
            Ok(s) => s,
            Err(_) => return vec![],
        };

        self.document.select(&selector).collect()
    }
}

fn is_class(attribute: &str) -> bool {
    attribute.eq_ignore_ascii_case("class")
}

fn class_tokens<'a>(el: &ElementRef<'a>) -> impl Iterator<Item = &'a str> {
    el.value().attr("class").unwrap_or("").split_whitespace()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html>
        <head><title>Laptops</title></head>
        <body>
            <div class="nav">Home</div>
            <div class="card name">Laptop A</div>
            <div class="card name">Laptop B</div>
            <div class="price" data-kind="cost">  $999 </div>
            <div class="price" data-kind="cost">$1,299</div>
            <span class="price">ignored span</span>
            <div data-kind="rating"><b>4.5</b> stars</div>
        </body>
        </html>
    "#;

    #[test]
    fn test_find_groups_by_class() {
        let query = MarkupQuery::parse(PAGE);
        let groups = query.find_groups_by_attribute(TagName::Div, "class");
        assert_eq!(groups, vec!["nav", "card", "name", "price"]);
    }

    #[test]
    fn test_find_groups_by_other_attribute() {
        let query = MarkupQuery::parse(PAGE);
        let groups = query.find_groups_by_attribute(TagName::Div, "data-kind");
        assert_eq!(groups, vec!["cost", "rating"]);
    }

    #[test]
    fn test_fragments_for_class_token() {
        let query = MarkupQuery::parse(PAGE);
        assert_eq!(
            query.fragments_for_attribute_value(TagName::Div, "class", "price"),
            vec!["$999", "$1,299"]
        );
        assert_eq!(
            query.fragments_for_attribute_value(TagName::Div, "class", "card"),
            vec!["Laptop A", "Laptop B"]
        );
        assert!(query
            .fragments_for_attribute_value(TagName::Div, "class", "missing")
            .is_empty());
    }

    #[test]
    fn test_fragment_text_includes_descendants() {
        let query = MarkupQuery::parse(PAGE);
        assert_eq!(
            query.fragments_for_attribute_value(TagName::Div, "data-kind", "rating"),
            vec!["4.5 stars"]
        );
    }

    #[test]
    fn test_tag_names() {
        let query = MarkupQuery::parse(PAGE);
        let tags = query.tag_names();
        for tag in ["html", "head", "title", "body", "div", "span", "b"] {
            assert!(tags.contains(tag), "missing {}", tag);
        }
    }
}
