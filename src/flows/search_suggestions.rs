//! Search suggestions: refine a partial query into likely searches

use lazy_static::lazy_static;

use crate::flows::Flow;
use crate::models::{SearchSuggestionsRequest, SearchSuggestionsResult};
use crate::prompts::PromptTemplate;
use crate::schema::{FieldKind, FieldShape, ShapeDeclaration};

lazy_static! {
    static ref INPUT: ShapeDeclaration = ShapeDeclaration::new(
        "SearchSuggestionsRequest",
        vec![FieldShape::required("query", FieldKind::Text, "What the user has typed so far.")],
    );
    static ref OUTPUT: ShapeDeclaration = ShapeDeclaration::new(
        "SearchSuggestionsResult",
        vec![FieldShape::required(
            "suggestions",
            FieldKind::TextList,
            "Search phrases for found items, most relevant first.",
        )],
    );
}

static TEMPLATE: PromptTemplate = PromptTemplate::new(
    "getSmartSearchSuggestions",
    r#"A user is searching a catalogue of found items (electronics, accessories, clothing, documents, keys and other belongings) and has typed a partial query.

Suggest up to five short search phrases that complete or refine the query, for example by adding a colour, a material, a brand or a campus location. Order them from most to least relevant.

Search query: {{{query}}}"#,
);

pub struct SearchSuggestionsFlow;

impl Flow for SearchSuggestionsFlow {
    type Input = SearchSuggestionsRequest;
    type Output = SearchSuggestionsResult;

    const NAME: &'static str = "getSmartSearchSuggestions";

    fn input_shape() -> &'static ShapeDeclaration {
        &INPUT
    }

    fn output_shape() -> &'static ShapeDeclaration {
        &OUTPUT
    }

    fn template() -> &'static PromptTemplate {
        &TEMPLATE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_line_is_rendered() {
        let request = serde_json::json!({ "query": "wallet" });
        let text = SearchSuggestionsFlow::template().render(&request).unwrap().text();
        assert!(text.ends_with("Search query: wallet"));
    }
}
